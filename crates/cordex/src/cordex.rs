//! Continuous coordinate-exchange search for optimal experimental designs.
//!
//! Each epoch starts from a random or warm-started design and sweeps every
//! (run, coordinate) pair once, replacing the coordinate with the result of a
//! bounded one-dimensional minimization of the criterion over `[-1, 1]`.
//! Epochs are independent and feed one shared best-result pair.

use finitediff::FiniteDiff;
use log::{debug, info};
use ndarray::{array, Array2};
use ndarray_rand::rand::{Rng, SeedableRng};
use optex_doe::sample_design;
use rand_xoshiro::Xoshiro256Plus;

use crate::criterion::{DesignObjective, Penalization};
use crate::discrete::{discrete_search, WARM_START_EPOCHS, WARM_START_LEVELS};
use crate::errors::{DexError, Result};
use crate::scheduler;
use crate::types::{LineSearch, OptimResult, Optimality};
use crate::optimizers::Optimizer;

/// Default number of search epochs
pub const EPOCHS_DEFAULT: usize = 20;
/// Default number of polish sweeps after the epoch loop
pub const FINAL_PASS_ITERS_DEFAULT: usize = 5;

const COORD_MAX_EVAL: usize = 30;
const COORD_FTOL_REL: f64 = 1e-6;

/// Continuous coordinate-exchange optimizer, configured builder style.
///
/// ```no_run
/// # use optex_cordex::{Cordex, Optimality};
/// let result = Cordex::new(6, &[1], 0)
///     .optimality(Optimality::D)
///     .epochs(50)
///     .seed(42)
///     .run()
///     .expect("design search");
/// println!("best D value: {}", result.value);
/// ```
#[derive(Clone, Debug)]
pub struct Cordex {
    pub(crate) runs: usize,
    pub(crate) factor_sizes: Vec<usize>,
    pub(crate) scalars: usize,
    pub(crate) optimality: Optimality,
    pub(crate) penal: Option<Penalization>,
    pub(crate) j_cb: Option<Array2<f64>>,
    pub(crate) epochs: usize,
    pub(crate) line_search: LineSearch,
    pub(crate) random_start: bool,
    pub(crate) final_pass_iters: usize,
    pub(crate) workers: Option<usize>,
    pub(crate) seed: Option<u64>,
}

impl Cordex {
    /// Creates an optimizer for designs of `runs` rows whose columns are the
    /// per-factor basis coefficients given by `factor_sizes` followed by
    /// `scalars` plain scalar settings.
    pub fn new(runs: usize, factor_sizes: &[usize], scalars: usize) -> Self {
        Cordex {
            runs,
            factor_sizes: factor_sizes.to_vec(),
            scalars,
            optimality: Optimality::A,
            penal: None,
            j_cb: None,
            epochs: EPOCHS_DEFAULT,
            line_search: LineSearch::Cobyla,
            random_start: false,
            final_pass_iters: FINAL_PASS_ITERS_DEFAULT,
            workers: None,
            seed: None,
        }
    }

    /// Sets the optimality criterion (default A)
    pub fn optimality(mut self, optimality: Optimality) -> Self {
        self.optimality = optimality;
        self
    }

    /// Sets the penalization of the information matrix
    pub fn penalization(mut self, penal: Penalization) -> Self {
        self.penal = Some(penal);
        self
    }

    /// Sets the fixed basis expansion matrix applied to the factor block
    pub fn transform(mut self, j_cb: Array2<f64>) -> Self {
        self.j_cb = Some(j_cb);
        self
    }

    /// Sets the number of randomized epochs
    pub fn epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    /// Sets the one-dimensional line-search backend (default Cobyla)
    pub fn line_search(mut self, line_search: LineSearch) -> Self {
        self.line_search = line_search;
        self
    }

    /// Starts epochs from uniform random designs instead of the discrete
    /// warm start. Faster per epoch, usually worse starting points.
    pub fn random_start(mut self, random_start: bool) -> Self {
        self.random_start = random_start;
        self
    }

    /// Sets the number of polish sweeps run from the best design after the
    /// epoch loop; 0 disables the final pass.
    pub fn final_pass(mut self, iters: usize) -> Self {
        self.final_pass_iters = iters;
        self
    }

    /// Distributes epochs over a worker pool of the given size; without this
    /// the epochs run sequentially.
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }

    /// Fixes the base random seed; epoch seeds derive from it so sequential
    /// and parallel runs explore identical starting designs.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Runs the search and returns the best design with its criterion value
    /// on the natural scale of the configured optimality.
    pub fn run(&self) -> Result<OptimResult> {
        let objective = self.objective()?;
        info!(
            "cordex {:?}-optimal search: {} runs, {} settings, {} epochs",
            self.optimality,
            self.runs,
            objective.settings(),
            self.epochs
        );
        let (mut best_value, mut best_design) = scheduler::run_epochs(self, &objective)?;

        if self.final_pass_iters > 0 {
            if let Some(design) = best_design.as_ref() {
                let mut polished = design.clone();
                let mut value = best_value;
                for _ in 0..self.final_pass_iters {
                    value = self.sweep(&objective, &mut polished);
                }
                if self.optimality.is_better(value, best_value) {
                    debug!("final pass improved {best_value} -> {value}");
                    best_value = value;
                    best_design = Some(polished);
                }
            }
        }

        match best_design {
            Some(design) => Ok(OptimResult {
                design,
                value: self.optimality.output(best_value),
            }),
            None => Err(DexError::InvalidValue(
                "no estimable design found within the epoch budget".to_string(),
            )),
        }
    }

    /// Builds the criterion evaluator, surfacing configuration errors
    /// (estimability, penalization shapes) before any search work.
    pub(crate) fn objective(&self) -> Result<DesignObjective> {
        let n_coeffs = self.factor_sizes.iter().sum();
        DesignObjective::new(
            self.runs,
            n_coeffs,
            self.scalars,
            self.optimality,
            self.j_cb.clone(),
            self.penal.clone(),
        )
    }

    pub(crate) fn base_seed(&self) -> u64 {
        self.seed
            .unwrap_or_else(|| Xoshiro256Plus::from_entropy().gen())
    }

    /// One full epoch: starting design plus a single sweep; returns the swept
    /// design and its internal-frame value.
    pub(crate) fn run_epoch(
        &self,
        objective: &DesignObjective,
        seed: u64,
    ) -> (Array2<f64>, f64) {
        let mut rng = Xoshiro256Plus::seed_from_u64(seed);
        let mut design = if self.random_start {
            sample_design(self.runs, objective.settings(), &mut rng)
        } else {
            discrete_search(objective, &WARM_START_LEVELS, WARM_START_EPOCHS, &mut rng).0
        };
        let value = self.sweep(objective, &mut design);
        debug!("epoch seed {seed}: value {value}");
        (design, value)
    }

    /// Sweeps every (run, coordinate) pair once, in row-major order; updates
    /// are visible to the remaining coordinates of the same sweep.
    pub(crate) fn sweep(&self, objective: &DesignObjective, design: &mut Array2<f64>) -> f64 {
        for run in 0..objective.runs() {
            for col in 0..objective.settings() {
                self.optimize_coordinate(objective, design, run, col);
            }
        }
        objective.value(&design.view())
    }

    /// Bounded 1-D minimization of the criterion over a single coordinate,
    /// all others held fixed. The update is kept only when it does not worsen
    /// the full objective, so a failed line search leaves the design intact.
    fn optimize_coordinate(
        &self,
        objective: &DesignObjective,
        design: &mut Array2<f64>,
        run: usize,
        col: usize,
    ) {
        let before = objective.value(&design.view());
        let bounds = array![[-1., 1.]];
        let xinit = array![design[[run, col]]];
        let work = design.clone();

        let fun = |x: &[f64], g: Option<&mut [f64]>, w: &mut Array2<f64>| {
            if let Some(g) = g {
                let f = |v: &Vec<f64>| {
                    let mut probe = work.clone();
                    probe[[run, col]] = v[0].clamp(-1., 1.);
                    objective.value(&probe.view())
                };
                g.copy_from_slice(&x.to_vec().central_diff(&f));
            }
            w[[run, col]] = x[0].clamp(-1., 1.);
            objective.value(&w.view())
        };

        let (_, x_opt) = Optimizer::new(self.line_search, &fun, &[], &work, &bounds)
            .xinit(&xinit.view())
            .max_eval(COORD_MAX_EVAL)
            .ftol_rel(COORD_FTOL_REL)
            .minimize();

        design[[run, col]] = x_opt[0].clamp(-1., 1.);
        let after = objective.value(&design.view());
        if !(after <= before) {
            design[[run, col]] = xinit[0];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d_cordex(epochs: usize) -> Cordex {
        Cordex::new(6, &[1], 0)
            .optimality(Optimality::D)
            .epochs(epochs)
            .random_start(true)
            .final_pass(0)
            .seed(42)
    }

    #[test]
    fn test_d_optimal_beats_its_random_start() {
        let cordex = d_cordex(3);
        let objective = cordex.objective().expect("objective");
        let mut rng = Xoshiro256Plus::seed_from_u64(cordex.base_seed());
        let start = sample_design(6, 1, &mut rng);
        let start_det = Optimality::D.output(objective.value(&start.view()));

        let result = cordex.run().expect("search");
        // full rank regressors and a clear improvement on the random start
        assert!(Optimality::D.is_feasible(Optimality::D.internal(result.value)));
        assert!(result.value > start_det + 1.);
        // 6 runs, Z = [1 | x]: det M = 6 sum(x^2) - (sum x)^2 <= 36
        assert!(result.value > 30.);
        assert!(result.value <= 36. + 1e-6);
    }

    #[test]
    fn test_more_epochs_never_lose_ground() {
        let short = d_cordex(2).run().expect("short run");
        let long = d_cordex(5).run().expect("long run");
        // epoch seeds derive from the base seed: a longer run replays the
        // shorter run's epochs first
        assert!(long.value >= short.value - 1e-9);
    }

    #[test]
    fn test_sweep_never_worsens_the_objective() {
        let cordex = Cordex::new(4, &[], 2).optimality(Optimality::A);
        let objective = cordex.objective().expect("objective");
        let mut rng = Xoshiro256Plus::seed_from_u64(7);
        let mut design = sample_design(4, 2, &mut rng);
        let before = objective.value(&design.view());
        let after = cordex.sweep(&objective, &mut design);
        assert!(after <= before);
    }

    #[test]
    fn test_non_estimable_configuration_is_rejected() {
        // runs = parameters - 1
        let err = Cordex::new(2, &[2], 1).optimality(Optimality::D).run();
        assert!(matches!(err, Err(DexError::InvalidConfigError(_))));
        // runs = parameters passes the configuration check
        assert!(Cordex::new(3, &[2], 1).objective().is_ok());
    }

    #[test]
    fn test_slsqp_line_search_runs_end_to_end() {
        let result = Cordex::new(4, &[], 2)
            .optimality(Optimality::D)
            .line_search(LineSearch::Slsqp)
            .epochs(2)
            .random_start(true)
            .final_pass(0)
            .seed(5)
            .run()
            .expect("slsqp search");
        assert!(result.value > 0.);
        assert!(result.design.iter().all(|&v| (-1. ..=1.).contains(&v)));
    }

    #[test]
    fn test_warm_started_search_runs() {
        let result = Cordex::new(4, &[], 2)
            .optimality(Optimality::D)
            .epochs(2)
            .final_pass(1)
            .seed(0)
            .run()
            .expect("warm started search");
        assert!(result.value > 0.);
        assert!(result.design.iter().all(|&v| (-1. ..=1.).contains(&v)));
    }
}
