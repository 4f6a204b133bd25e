//! Discrete coordinate exchange over a fixed set of factor levels.
//!
//! A coarse but cheap search used to seed the continuous optimizer with a
//! better-than-random starting design. Each epoch starts from a random
//! level assignment and sweeps every (run, coordinate) pair once, swapping
//! in the level that most improves the criterion.

use ndarray::Array2;
use ndarray_rand::rand::Rng;

use crate::criterion::DesignObjective;

/// Factor levels tried by the warm start
pub const WARM_START_LEVELS: [f64; 2] = [-1., 1.];

/// Epoch budget of the warm start
pub const WARM_START_EPOCHS: usize = 10;

/// Runs a bounded discrete coordinate-exchange search and returns the best
/// design found with its internal-frame criterion value.
///
/// The returned value is the sentinel when no level assignment produced a
/// non-singular information matrix; callers treat that start as random.
pub fn discrete_search<R: Rng>(
    objective: &DesignObjective,
    levels: &[f64],
    epochs: usize,
    rng: &mut R,
) -> (Array2<f64>, f64) {
    let (runs, settings) = (objective.runs(), objective.settings());
    let optimality = objective.optimality();

    let mut best_value = optimality.sentinel();
    let mut best_design = random_levels(runs, settings, levels, rng);

    for _ in 0..epochs {
        let mut design = random_levels(runs, settings, levels, rng);
        let mut value = objective.value(&design.view());
        for run in 0..runs {
            for col in 0..settings {
                let mut best_level = design[[run, col]];
                // the incumbent level is the baseline, so a sweep step never
                // worsens the criterion
                let mut best_local = value;
                for &level in levels {
                    design[[run, col]] = level;
                    let v = objective.value(&design.view());
                    if v < best_local {
                        best_local = v;
                        best_level = level;
                    }
                }
                design[[run, col]] = best_level;
                value = best_local;
            }
        }
        if optimality.is_better(value, best_value) {
            best_value = value;
            best_design = design;
        }
    }
    (best_design, best_value)
}

fn random_levels<R: Rng>(
    runs: usize,
    settings: usize,
    levels: &[f64],
    rng: &mut R,
) -> Array2<f64> {
    Array2::from_shape_fn((runs, settings), |_| levels[rng.gen_range(0..levels.len())])
}
