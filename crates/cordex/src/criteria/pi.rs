use crate::criteria::InfillCriterion;
use crate::utils::norm_cdf;
use ndarray::ArrayView;
use optex_gp::Surrogate;
use serde::{Deserialize, Serialize};

/// A structure for Probability of Improvement implementation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProbabilityOfImprovement;

impl InfillCriterion for ProbabilityOfImprovement {
    fn name(&self) -> &'static str {
        "PI"
    }

    /// Probability that the surrogate at `x` improves on the current minimum
    fn value(&self, x: &[f64], obj_model: &dyn Surrogate, fmin: f64) -> f64 {
        let pt = match ArrayView::from_shape((1, x.len()), x) {
            Ok(pt) => pt,
            Err(_) => return 0.0,
        };
        match (obj_model.predict(&pt), obj_model.predict_variances(&pt)) {
            (Ok(p), Ok(s)) => {
                if s[0] < f64::EPSILON {
                    0.0
                } else {
                    norm_cdf((fmin - p[0]) / s[0].sqrt())
                }
            }
            _ => 0.0,
        }
    }
}

/// Probability of Improvement infill criterion
pub const PI: ProbabilityOfImprovement = ProbabilityOfImprovement {};
