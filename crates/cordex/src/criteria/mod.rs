//! Available infill criteria used by the surrogate refinement loop
mod ei;
mod pi;
mod ucb;

pub use ei::{ExpectedImprovement, EI};
pub use pi::{ProbabilityOfImprovement, PI};
pub use ucb::UpperConfidenceBound;

use crate::types::InfillStrategy;
use optex_gp::Surrogate;

/// A trait for infill criterion which maximum location will
/// determine the next most promising point expected to be the
/// optimum location of the objective function.
///
/// The objective is minimize-framed: `fmin` is the smallest observed value
/// and a larger criterion value marks a more promising point.
pub trait InfillCriterion: Sync {
    /// Name of the infill criterion
    fn name(&self) -> &'static str;

    /// Criterion value at given point x with regards to given
    /// surrogate of the objective function and the current found min
    fn value(&self, x: &[f64], obj_model: &dyn Surrogate, fmin: f64) -> f64;
}

impl std::fmt::Debug for dyn InfillCriterion {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Maps an infill strategy onto its criterion implementation
pub(crate) fn infill_criterion(strategy: InfillStrategy) -> Box<dyn InfillCriterion> {
    match strategy {
        InfillStrategy::EI => Box::new(EI),
        InfillStrategy::PI => Box::new(PI),
        InfillStrategy::UCB => Box::new(UpperConfidenceBound::default()),
    }
}
