//! Surrogate-driven refinement of designs.
//!
//! The refiner treats whole design matrices as points of a `runs * settings`
//! dimensional box, keeps an append-only history of (flattened design,
//! internal objective) observations, and alternates between fitting a
//! probabilistic surrogate to the history and maximizing an acquisition
//! criterion to propose the next designs to evaluate.
//!
//! Rounds are sequential: each one depends on the full history. A failed
//! surrogate fit or acquisition round drops the most recent observation and
//! moves on; one bad round never halts the search.

use log::{debug, warn};
use ndarray::{Array1, Array2};
use ndarray_rand::rand::{Rng, SeedableRng};
use ndarray_stats::QuantileExt;
use optex_doe::sample_design;
use optex_gp::Surrogate;
use rand_xoshiro::Xoshiro256Plus;

use crate::cordex::Cordex;
use crate::criteria::{infill_criterion, InfillCriterion};
use crate::criterion::DesignObjective;
use crate::errors::{DexError, Result};
use crate::optimizers::Optimizer;
use crate::types::{
    GpSurrogateBuilder, InfillStrategy, LineSearch, LinearCstr, OptimResult, SurrogateBuilder,
};
use crate::utils::{flatten_design, reshape_design};

/// Default number of refinement rounds
pub const ROUNDS_DEFAULT: usize = 20;
/// Default number of random observations used to bootstrap the history
pub const INIT_OBS_DEFAULT: usize = 5;

const NB_RANDOM_CANDIDATES: usize = 100;
const NB_REFINE_STARTS: usize = 5;
const ACQ_MAX_EVAL: usize = 100;

/// Surrogate refinement loop over flattened designs, configured builder
/// style around a criterion evaluator.
pub struct Refiner {
    objective: DesignObjective,
    rounds: usize,
    batch: usize,
    strategy: InfillStrategy,
    cstrs: Vec<LinearCstr>,
    init_obs: usize,
    bootstrap: Option<Cordex>,
    seed: Option<u64>,
    surrogate: Box<dyn SurrogateBuilder>,
}

impl Refiner {
    /// Creates a refiner for the designs scored by `objective`
    pub fn new(objective: DesignObjective) -> Self {
        Refiner {
            objective,
            rounds: ROUNDS_DEFAULT,
            batch: 1,
            strategy: InfillStrategy::EI,
            cstrs: Vec::new(),
            init_obs: INIT_OBS_DEFAULT,
            bootstrap: None,
            seed: None,
            surrogate: Box::new(GpSurrogateBuilder),
        }
    }

    /// Sets the round budget
    pub fn rounds(mut self, rounds: usize) -> Self {
        self.rounds = rounds;
        self
    }

    /// Sets the number of candidates proposed per round
    pub fn batch(mut self, batch: usize) -> Self {
        self.batch = batch;
        self
    }

    /// Sets the acquisition family (default Expected Improvement)
    pub fn strategy(mut self, strategy: InfillStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Adds linear inequality constraints checked on proposed candidates
    pub fn constraints(mut self, cstrs: Vec<LinearCstr>) -> Self {
        self.cstrs = cstrs;
        self
    }

    /// Sets the number of random observations used to bootstrap the history
    /// when no coordinate-exchange bootstrap is configured
    pub fn initial_observations(mut self, init_obs: usize) -> Self {
        self.init_obs = init_obs;
        self
    }

    /// Bootstraps the history from a short coordinate-exchange run instead
    /// of random designs. The run must target the same design shape and
    /// criterion as this refiner's evaluator.
    pub fn bootstrap(mut self, cordex: Cordex) -> Self {
        self.bootstrap = Some(cordex);
        self
    }

    /// Fixes the random seed of the candidate sampling
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Replaces the default Gaussian-process surrogate builder
    pub fn surrogate(mut self, surrogate: Box<dyn SurrogateBuilder>) -> Self {
        self.surrogate = surrogate;
        self
    }

    /// Runs the refinement rounds and returns the best observed design with
    /// its criterion value on the natural scale.
    pub fn run(&self) -> Result<OptimResult> {
        let (xhist, yhist) = self.collect()?;
        let optimality = self.objective.optimality();
        let y = Array1::from_vec(yhist);
        let ibest = y
            .argmin()
            .map_err(|err| DexError::InvalidValue(err.to_string()))?;
        let best = y[ibest];
        if !optimality.is_feasible(best) {
            return Err(DexError::InvalidValue(
                "no estimable design observed during refinement".to_string(),
            ));
        }
        let design = reshape_design(
            &xhist[ibest].view(),
            self.objective.runs(),
            self.objective.settings(),
        )?;
        Ok(OptimResult {
            design,
            value: optimality.output(best),
        })
    }

    /// Runs the round loop and returns the full observation history as
    /// parallel (flattened design, internal value) vectors.
    pub(crate) fn collect(&self) -> Result<(Vec<Array1<f64>>, Vec<f64>)> {
        let (runs, settings) = (self.objective.runs(), self.objective.settings());
        let mut rng = Xoshiro256Plus::seed_from_u64(
            self.seed
                .unwrap_or_else(|| Xoshiro256Plus::from_entropy().gen()),
        );

        let mut xhist: Vec<Array1<f64>> = Vec::new();
        let mut yhist: Vec<f64> = Vec::new();
        match &self.bootstrap {
            Some(cordex) => {
                let result = cordex.run()?;
                let x = flatten_design(&result.design.view());
                let y = self.objective.value_flat(&x.view());
                xhist.push(x);
                yhist.push(y);
            }
            None => {
                for _ in 0..self.init_obs {
                    let design = sample_design(runs, settings, &mut rng);
                    let x = flatten_design(&design.view());
                    let y = self.objective.value_flat(&x.view());
                    xhist.push(x);
                    yhist.push(y);
                }
            }
        }

        let infill = infill_criterion(self.strategy);
        let dim = runs * settings;
        for round in 0..self.rounds {
            let fmin = yhist.iter().cloned().fold(f64::INFINITY, f64::min);
            let mut xt = Array2::zeros((xhist.len(), dim));
            for (i, x) in xhist.iter().enumerate() {
                xt.row_mut(i).assign(x);
            }
            let yt = Array1::from_vec(yhist.clone());

            let model = match self.surrogate.fit(&xt.view(), &yt.view()) {
                Ok(model) => model,
                Err(err) => {
                    warn!("round {round}: surrogate fit failed ({err}), dropping last observation");
                    xhist.pop();
                    yhist.pop();
                    continue;
                }
            };
            let candidates = match self.propose(&*model, &*infill, fmin, &mut rng) {
                Ok(candidates) => candidates,
                Err(err) => {
                    warn!("round {round}: acquisition failed ({err}), dropping last observation");
                    xhist.pop();
                    yhist.pop();
                    continue;
                }
            };
            for x in candidates {
                let y = self.objective.value_flat(&x.view());
                debug!("round {round}: observed {y}");
                xhist.push(x);
                yhist.push(y);
            }
        }
        Ok((xhist, yhist))
    }

    /// Proposes a batch of candidates by multi-start maximization of the
    /// acquisition criterion: random candidates inside the box (filtered by
    /// the linear constraints), best few refined with a bounded Cobyla run.
    fn propose(
        &self,
        model: &dyn Surrogate,
        infill: &dyn InfillCriterion,
        fmin: f64,
        rng: &mut Xoshiro256Plus,
    ) -> Result<Vec<Array1<f64>>> {
        let dim = self.objective.runs() * self.objective.settings();
        let bounds = Array2::from_shape_fn((dim, 2), |(_, j)| if j == 0 { -1. } else { 1. });
        let mut batch = Vec::with_capacity(self.batch);

        for _ in 0..self.batch {
            let mut scored: Vec<(f64, Array1<f64>)> = (0..NB_RANDOM_CANDIDATES)
                .map(|_| Array1::from_shape_fn(dim, |_| rng.gen_range(-1.0..1.0)))
                .filter(|x| self.satisfies(x))
                .map(|x| {
                    let score = infill.value(x.as_slice().unwrap_or(&[]), model, fmin);
                    (score, x)
                })
                .collect();
            if scored.is_empty() {
                return Err(DexError::InvalidValue(
                    "no candidate satisfies the linear constraints".to_string(),
                ));
            }
            scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
            scored.truncate(NB_REFINE_STARTS);

            let obj =
                |x: &[f64], _g: Option<&mut [f64]>, _u: &mut ()| -infill.value(x, model, fmin);
            let mut best: Option<(f64, Array1<f64>)> = None;
            for (start_score, start) in scored {
                let (_, x_opt) = Optimizer::new(LineSearch::Cobyla, &obj, &[], &(), &bounds)
                    .xinit(&start.view())
                    .max_eval(ACQ_MAX_EVAL)
                    .minimize();
                let x_opt = x_opt.mapv(|v| v.clamp(-1., 1.));
                let (score, candidate) = if self.satisfies(&x_opt) {
                    let refined = infill.value(x_opt.as_slice().unwrap_or(&[]), model, fmin);
                    select_refined(start_score, start, refined, x_opt)
                } else {
                    (start_score, start)
                };
                if best.as_ref().map_or(true, |(s, _)| score > *s) {
                    best = Some((score, candidate));
                }
            }
            match best {
                Some((_, candidate)) => batch.push(candidate),
                None => {
                    return Err(DexError::InvalidValue(
                        "acquisition refinement produced no candidate".to_string(),
                    ))
                }
            }
        }
        Ok(batch)
    }

    fn satisfies(&self, x: &Array1<f64>) -> bool {
        self.cstrs.iter().all(|cstr| cstr.holds(&x.view()))
    }
}

/// Keeps the refined point only when refinement did not degrade the
/// acquisition value; a failed or worsening line search falls back on the
/// start point with its own score.
fn select_refined(
    start_score: f64,
    start: Array1<f64>,
    refined_score: f64,
    refined: Array1<f64>,
) -> (f64, Array1<f64>) {
    if refined_score >= start_score {
        (refined_score, refined)
    } else {
        (start_score, start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Optimality;

    fn d_objective() -> DesignObjective {
        DesignObjective::new(3, 0, 1, Optimality::D, None, None).expect("evaluator")
    }

    #[test]
    fn test_history_grows_by_one_per_round() {
        let refiner = Refiner::new(d_objective())
            .rounds(10)
            .batch(1)
            .initial_observations(5)
            .seed(42);
        let (xhist, yhist) = refiner.collect().expect("refinement history");
        assert_eq!(xhist.len(), yhist.len());
        // 5 initial observations plus one per round, minus dropped rounds
        assert!(yhist.len() <= 15);
        assert!(yhist.len() >= 2);

        // the running best never regresses
        let mut best = f64::INFINITY;
        let mut bests = Vec::new();
        for &y in &yhist {
            best = best.min(y);
            bests.push(best);
        }
        assert!(bests.windows(2).all(|w| w[1] <= w[0]));
    }

    #[test]
    fn test_refinement_returns_a_feasible_design() {
        let result = Refiner::new(d_objective())
            .rounds(5)
            .initial_observations(5)
            .seed(0)
            .run()
            .expect("refinement");
        assert_eq!(result.design.dim(), (3, 1));
        assert!(result.value > 0.);
        assert!(result.design.iter().all(|&v| (-1. ..=1.).contains(&v)));
    }

    #[test]
    fn test_unsatisfiable_constraints_drop_rounds_not_the_loop() {
        // sum of coordinates >= 10 can never hold inside the box
        let cstr = LinearCstr {
            coeffs: Array1::ones(3),
            rhs: 10.,
        };
        let refiner = Refiner::new(d_objective())
            .rounds(3)
            .initial_observations(5)
            .constraints(vec![cstr])
            .seed(7);
        let (_, yhist) = refiner.collect().expect("history");
        // every round failed and dropped one observation
        assert_eq!(yhist.len(), 2);
    }

    #[test]
    fn test_degraded_refinement_keeps_the_start_point() {
        let start = Array1::from_vec(vec![0.5, 0.5, 0.5]);
        let refined = Array1::from_vec(vec![-0.5, -0.5, -0.5]);

        // worse acquisition value after refinement: the start point wins
        let (score, candidate) = select_refined(0.8, start.clone(), 0.2, refined.clone());
        assert_eq!(score, 0.8);
        assert_eq!(candidate, start);

        // improvement is kept
        let (score, candidate) = select_refined(0.2, start, 0.8, refined.clone());
        assert_eq!(score, 0.8);
        assert_eq!(candidate, refined);
    }

    #[test]
    fn test_bootstrap_from_coordinate_exchange() {
        let cordex = Cordex::new(3, &[], 1)
            .optimality(Optimality::D)
            .epochs(2)
            .random_start(true)
            .final_pass(0)
            .seed(3);
        let result = Refiner::new(d_objective())
            .rounds(3)
            .bootstrap(cordex)
            .seed(3)
            .run()
            .expect("bootstrapped refinement");
        assert!(result.value > 0.);
    }
}
