//! Criterion evaluation: maps a design matrix to a scalar optimality value.
//!
//! The evaluator builds the augmented regressor matrix
//! `Z = [1 | Gamma . J_cb | X]` from the transformed-factor block `Gamma` and
//! the scalar block `X`, forms the information matrix `M = Z^t Z`, optionally
//! regularizes it into `P = M + smooth * R0 + ridge * I` and scores the
//! sandwich matrix `M* = P^-1 M P^-1` with the configured criterion formula.
//!
//! A singular information matrix is an expected event during search: every
//! numerical failure (factorization, inversion, eigendecomposition) yields
//! the sentinel value of the criterion, which no acceptance rule ever takes.

use crate::errors::{DexError, Result};
use crate::types::Optimality;
use linfa_linalg::{cholesky::*, eigh::*, triangular::*};
use ndarray::{concatenate, s, Array2, ArrayView1, ArrayView2, Axis};

use crate::utils::reshape_design;

/// Relative tolerance under which an eigenvalue is treated as zero
const SINGULARITY_TOL: f64 = 1e-12;

/// Additive regularization of the information matrix: an optional smoothness
/// penalty matrix with its weight, and a ridge weight. An absent matrix is
/// treated as the zero matrix.
#[derive(Clone, Debug, Default)]
pub struct Penalization {
    /// m-th order smoothness penalty matrix R0
    pub r0: Option<Array2<f64>>,
    /// Weight of the smoothness penalty
    pub smooth_weight: f64,
    /// Ridge weight for numerical stability
    pub ridge_weight: f64,
}

impl Penalization {
    fn validate(&self, dim: usize) -> Result<()> {
        if self.smooth_weight < 0. || self.ridge_weight < 0. {
            return Err(DexError::InvalidConfigError(format!(
                "Penalization weights must be non negative, got smooth {} ridge {}",
                self.smooth_weight, self.ridge_weight
            )));
        }
        if let Some(r0) = &self.r0 {
            if r0.dim() != (dim, dim) {
                return Err(DexError::InvalidConfigError(format!(
                    "Smoothness penalty matrix must be ({dim}, {dim}), got {:?}",
                    r0.dim()
                )));
            }
        }
        Ok(())
    }

    /// Whether any regularization term is configured
    fn is_active(&self) -> bool {
        self.r0.is_some() || self.ridge_weight > 0.
    }
}

/// Criterion evaluator for design matrices partitioned into a
/// transformed-factor block of width `n_coeffs` (mapped through the fixed
/// basis expansion `j_cb` when present) and a scalar block of width
/// `scalars`.
#[derive(Clone, Debug)]
pub struct DesignObjective {
    runs: usize,
    n_coeffs: usize,
    scalars: usize,
    j_cb: Option<Array2<f64>>,
    optimality: Optimality,
    penal: Penalization,
}

impl DesignObjective {
    /// Builds an evaluator, checking estimability and penalization shapes.
    ///
    /// A design is estimable only when `runs >= n_coeffs + scalars`; anything
    /// less is a configuration error raised before any search work.
    pub fn new(
        runs: usize,
        n_coeffs: usize,
        scalars: usize,
        optimality: Optimality,
        j_cb: Option<Array2<f64>>,
        penal: Option<Penalization>,
    ) -> Result<DesignObjective> {
        if runs < n_coeffs + scalars {
            return Err(DexError::InvalidConfigError(format!(
                "Design not estimable: runs {} < parameters {}",
                runs,
                n_coeffs + scalars
            )));
        }
        if let Some(j_cb) = &j_cb {
            if j_cb.nrows() != n_coeffs {
                return Err(DexError::InvalidConfigError(format!(
                    "Basis expansion matrix must have {} rows, got {}",
                    n_coeffs,
                    j_cb.nrows()
                )));
            }
        }
        let obj = DesignObjective {
            runs,
            n_coeffs,
            scalars,
            j_cb,
            optimality,
            penal: penal.unwrap_or_default(),
        };
        obj.penal.validate(obj.z_width())?;
        Ok(obj)
    }

    /// Number of runs of the evaluated designs
    pub fn runs(&self) -> usize {
        self.runs
    }

    /// Number of columns of the evaluated designs
    pub fn settings(&self) -> usize {
        self.n_coeffs + self.scalars
    }

    /// Criterion kind of this evaluator
    pub fn optimality(&self) -> Optimality {
        self.optimality
    }

    fn z_width(&self) -> usize {
        let expanded = self
            .j_cb
            .as_ref()
            .map_or(self.n_coeffs, |j_cb| j_cb.ncols());
        1 + expanded + self.scalars
    }

    /// Augmented regressor matrix `Z = [1 | Gamma . J_cb | X]`
    pub fn regressors(&self, design: &ArrayView2<f64>) -> Array2<f64> {
        let ones = Array2::ones((self.runs, 1));
        let gamma = design.slice(s![.., ..self.n_coeffs]);
        let x = design.slice(s![.., self.n_coeffs..]);
        match &self.j_cb {
            Some(j_cb) => concatenate![Axis(1), ones, gamma.dot(j_cb), x],
            None => concatenate![Axis(1), ones, gamma, x],
        }
    }

    /// Information matrix `M = Z^t Z`
    pub fn information(&self, design: &ArrayView2<f64>) -> Array2<f64> {
        let z = self.regressors(design);
        z.t().dot(&z)
    }

    /// Internal-frame criterion value of a design; the criterion sentinel on
    /// any numerical failure.
    pub fn value(&self, design: &ArrayView2<f64>) -> f64 {
        let m = self.information(design);
        let raw = match self.optimality {
            Optimality::D => self.sandwich(&m).and_then(|ms| determinant(&ms)),
            Optimality::A => self.sandwich(&m).and_then(|ms| trace_inverse(&ms)),
            Optimality::E => extreme_eigenvalue(&m, true),
            Optimality::I => extreme_eigenvalue(&m, false),
        };
        match raw {
            Some(v) if v.is_finite() && v > 0. => self.optimality.internal(v),
            _ => self.optimality.sentinel(),
        }
    }

    /// Internal-frame criterion value of a flattened design vector
    pub fn value_flat(&self, x: &ArrayView1<f64>) -> f64 {
        match reshape_design(x, self.runs, self.settings()) {
            Ok(design) => self.value(&design.view()),
            Err(_) => self.optimality.sentinel(),
        }
    }

    /// Sandwich matrix `M* = P^-1 M P^-1` with `P = M + smooth * R0 + ridge * I`;
    /// the plain information matrix when no regularization is configured.
    fn sandwich(&self, m: &Array2<f64>) -> Option<Array2<f64>> {
        if !self.penal.is_active() {
            return Some(m.to_owned());
        }
        let dim = m.nrows();
        let mut p = m.to_owned();
        if let Some(r0) = &self.penal.r0 {
            p.scaled_add(self.penal.smooth_weight, r0);
        }
        if self.penal.ridge_weight > 0. {
            p.scaled_add(self.penal.ridge_weight, &Array2::eye(dim));
        }
        let p_inv = inverse_spd(&p)?;
        Some(p_inv.dot(m).dot(&p_inv))
    }
}

/// Inverse of a symmetric positive definite matrix through its Cholesky
/// factorization; `None` when the factorization fails.
fn inverse_spd(a: &Array2<f64>) -> Option<Array2<f64>> {
    let l = a.cholesky().ok()?;
    let li = l
        .solve_triangular(&Array2::eye(a.nrows()), UPLO::Lower)
        .ok()?;
    Some(li.t().dot(&li))
}

/// Determinant of a symmetric positive definite matrix: the squared product
/// of the diagonal of its Cholesky factor.
fn determinant(a: &Array2<f64>) -> Option<f64> {
    let l = a.cholesky().ok()?;
    let prod: f64 = l.diag().product();
    Some(prod * prod)
}

/// Trace of the inverse of a symmetric positive definite matrix
fn trace_inverse(a: &Array2<f64>) -> Option<f64> {
    inverse_spd(a).map(|inv| inv.diag().sum())
}

/// Largest (`largest = true`) or smallest eigenvalue of a symmetric matrix;
/// `None` when the matrix is numerically singular.
fn extreme_eigenvalue(a: &Array2<f64>, largest: bool) -> Option<f64> {
    let (vals, _) = a.to_owned().eigh_into().ok()?;
    let max = vals.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let min = vals.iter().cloned().fold(f64::INFINITY, f64::min);
    if min <= SINGULARITY_TOL * max.abs().max(1.) {
        return None;
    }
    Some(if largest { max } else { min })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn full_rank_design() -> Array2<f64> {
        array![[-1., -1.], [1., -1.], [-1., 1.], [1., 1.]]
    }

    fn singular_design() -> Array2<f64> {
        // identical rows: rank one regressor matrix
        array![[0.5, 0.5], [0.5, 0.5], [0.5, 0.5], [0.5, 0.5]]
    }

    fn evaluator(optimality: Optimality, penal: Option<Penalization>) -> DesignObjective {
        DesignObjective::new(4, 0, 2, optimality, None, penal).expect("evaluator")
    }

    #[test]
    fn test_singular_designs_hit_the_sentinel() {
        for opt in [Optimality::A, Optimality::D, Optimality::E, Optimality::I] {
            let obj = evaluator(opt, None);
            let value = obj.value(&singular_design().view());
            assert_eq!(value, opt.sentinel(), "criterion {opt:?}");
        }
    }

    #[test]
    fn test_full_rank_design_is_feasible() {
        for opt in [Optimality::A, Optimality::D, Optimality::E, Optimality::I] {
            let obj = evaluator(opt, None);
            let value = obj.value(&full_rank_design().view());
            assert!(opt.is_feasible(value), "criterion {opt:?} value {value}");
            assert!(opt.output(value) > 0.);
        }
    }

    #[test]
    fn test_d_value_matches_information_determinant() {
        let obj = evaluator(Optimality::D, None);
        let design = full_rank_design();
        // full factorial 2^2: M = 4 I, det = 64
        let value = obj.value(&design.view());
        assert_abs_diff_eq!(Optimality::D.output(value), 64., epsilon = 1e-9);
    }

    #[test]
    fn test_identity_expansion_matches_scalar_block() {
        let design = full_rank_design();
        let through_jcb =
            DesignObjective::new(4, 2, 0, Optimality::D, Some(Array2::eye(2)), None)
                .expect("evaluator");
        let scalars_only = evaluator(Optimality::D, None);
        assert_abs_diff_eq!(
            through_jcb.value(&design.view()),
            scalars_only.value(&design.view()),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_ridge_penalization_changes_the_value() {
        let design = full_rank_design();
        let plain = evaluator(Optimality::A, None);
        let ridged = evaluator(
            Optimality::A,
            Some(Penalization {
                ridge_weight: 0.5,
                ..Default::default()
            }),
        );
        let v_plain = plain.value(&design.view());
        let v_ridged = ridged.value(&design.view());
        assert!(Optimality::A.is_feasible(v_plain));
        assert!(Optimality::A.is_feasible(v_ridged));
        assert!((v_plain - v_ridged).abs() > 1e-6);
    }

    #[test]
    fn test_negative_weights_are_rejected() {
        let penal = Penalization {
            smooth_weight: -1.,
            ..Default::default()
        };
        assert!(DesignObjective::new(4, 0, 2, Optimality::A, None, Some(penal)).is_err());
    }

    #[test]
    fn test_estimability_boundary() {
        // runs = parameters - 1 is rejected
        assert!(DesignObjective::new(2, 2, 1, Optimality::D, None, None).is_err());
        // runs = parameters is accepted
        assert!(DesignObjective::new(3, 2, 1, Optimality::D, None, None).is_ok());
    }

    #[test]
    fn test_value_flat_round_trip() {
        let obj = evaluator(Optimality::D, None);
        let design = full_rank_design();
        let flat = crate::utils::flatten_design(&design.view());
        assert_abs_diff_eq!(
            obj.value_flat(&flat.view()),
            obj.value(&design.view()),
            epsilon = 1e-12
        );
    }
}
