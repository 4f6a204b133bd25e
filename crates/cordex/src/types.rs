use crate::errors::Result;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use optex_gp::{GaussianProcess, Surrogate};
use serde::{Deserialize, Serialize};

/// Optimization result
#[derive(Clone, Debug)]
pub struct OptimResult {
    /// Best design found, a (runs, settings) matrix
    pub design: Array2<f64>,
    /// Criterion value of the best design, sign-corrected to its natural
    /// non-negative scale
    pub value: f64,
}

/// Optimality criterion used to rank candidate designs.
///
/// Each kind has its own scalar formula on the information matrix and its own
/// maximize/minimize convention. All comparisons inside the search use a
/// single internal minimize frame defined by this type, so sign handling is
/// never re-derived at call sites.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Optimality {
    /// Trace of the inverse information matrix (minimized)
    A,
    /// Determinant of the information matrix (maximized)
    D,
    /// Largest eigenvalue of the information matrix (minimized)
    E,
    /// Smallest eigenvalue of the information matrix (maximized)
    I,
}

impl Optimality {
    /// Sign relating the internal minimize frame to the natural criterion
    /// scale: `raw = sign * internal`.
    pub(crate) fn sign(&self) -> f64 {
        match self {
            Optimality::A | Optimality::E => 1.,
            Optimality::D | Optimality::I => -1.,
        }
    }

    /// Maps a raw criterion value (det, trace of inverse, eigenvalue) into
    /// the internal minimize frame.
    pub(crate) fn internal(&self, raw: f64) -> f64 {
        self.sign() * raw
    }

    /// Worst possible value in the internal frame, returned for singular
    /// information matrices. Never accepted by [`Optimality::is_better`].
    pub fn sentinel(&self) -> f64 {
        f64::INFINITY
    }

    /// Whether an internal value corresponds to a statistically usable
    /// design: a positive raw criterion value.
    pub(crate) fn is_feasible(&self, internal: f64) -> bool {
        internal.is_finite()
            && match self {
                // trace of inverse and largest eigenvalue are positive
                Optimality::A | Optimality::E => internal > 0.,
                // determinant and smallest eigenvalue are negated internally
                Optimality::D | Optimality::I => internal < 0.,
            }
    }

    /// Acceptance rule of the running best: feasible and strictly better in
    /// the internal minimize frame.
    pub(crate) fn is_better(&self, new: f64, best: f64) -> bool {
        self.is_feasible(new) && new < best
    }

    /// Sign-corrects an internal value back to the natural criterion scale.
    pub fn output(&self, internal: f64) -> f64 {
        self.sign() * internal
    }
}

/// Numerical method used for the bounded one-dimensional line search of the
/// coordinate exchange and for acquisition refinement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineSearch {
    /// Cobyla optimizer (gradient free)
    Cobyla,
    /// SLSQP optimizer (gradient from finite differences)
    Slsqp,
}

/// Acquisition function used to select the next promising designs during
/// surrogate refinement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum InfillStrategy {
    /// Expected Improvement
    EI,
    /// Probability of Improvement
    PI,
    /// Upper Confidence Bound
    UCB,
}

/// A trait for functions used by internal optimizers
/// Functions are expected to be defined as `g(x, g, u)` where
/// * `x` is the input information,
/// * `g` an optional gradient information to be updated if present
/// * `u` information provided by the user
pub trait ObjFn<U>: Fn(&[f64], Option<&mut [f64]>, &mut U) -> f64 {}
impl<T, U> ObjFn<U> for T where T: Fn(&[f64], Option<&mut [f64]>, &mut U) -> f64 {}

/// A trait for surrogate training
///
/// The output surrogate is expected to model the design criterion over
/// flattened design vectors; it may fail and the refinement loop treats that
/// failure as a recoverable round-level event.
pub trait SurrogateBuilder: Sync {
    /// Train the surrogate with given training dataset (x, y)
    fn fit(&self, xt: &ArrayView2<f64>, yt: &ArrayView1<f64>) -> Result<Box<dyn Surrogate>>;
}

/// Default surrogate builder backed by the ordinary-kriging Gaussian process
/// of [optex_gp].
#[derive(Clone, Debug, Default)]
pub struct GpSurrogateBuilder;

impl SurrogateBuilder for GpSurrogateBuilder {
    fn fit(&self, xt: &ArrayView2<f64>, yt: &ArrayView1<f64>) -> Result<Box<dyn Surrogate>> {
        let gp = GaussianProcess::params().fit(xt, yt)?;
        Ok(Box::new(gp))
    }
}

/// A linear inequality constraint `coeffs . x >= rhs` on flattened design
/// vectors, checked on candidates proposed by the acquisition step.
#[derive(Clone, Debug)]
pub struct LinearCstr {
    /// Constraint coefficients, one per flattened design component
    pub coeffs: Array1<f64>,
    /// Right-hand side of the inequality
    pub rhs: f64,
}

impl LinearCstr {
    /// Whether the constraint holds at `x`
    pub fn holds(&self, x: &ArrayView1<f64>) -> bool {
        self.coeffs.dot(x) >= self.rhs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_table_round_trip() {
        for opt in [Optimality::A, Optimality::D, Optimality::E, Optimality::I] {
            let raw = 3.5;
            assert_eq!(opt.output(opt.internal(raw)), raw);
        }
    }

    #[test]
    fn test_sentinel_never_accepted() {
        for opt in [Optimality::A, Optimality::D, Optimality::E, Optimality::I] {
            assert!(!opt.is_better(opt.sentinel(), f64::INFINITY));
            assert!(!opt.is_better(opt.sentinel(), 0.));
        }
    }

    #[test]
    fn test_acceptance_rules_match_criterion_direction() {
        // A stores the positive trace of the inverse: smaller is better
        assert!(Optimality::A.is_better(1.0, 2.0));
        assert!(!Optimality::A.is_better(-1.0, 2.0));
        // D stores the negated determinant: only negative values are feasible
        assert!(Optimality::D.is_better(-5.0, f64::INFINITY));
        assert!(Optimality::D.is_better(-5.0, -2.0));
        assert!(!Optimality::D.is_better(0.5, f64::INFINITY));
        // I stores the negated smallest eigenvalue
        assert!(Optimality::I.is_better(-0.4, -0.1));
        assert!(!Optimality::I.is_better(0.4, f64::INFINITY));
    }

    #[test]
    fn test_linear_cstr() {
        let cstr = LinearCstr {
            coeffs: ndarray::array![1., 1.],
            rhs: 0.5,
        };
        assert!(cstr.holds(&ndarray::array![1., 0.].view()));
        assert!(!cstr.holds(&ndarray::array![-1., 0.].view()));
    }
}
