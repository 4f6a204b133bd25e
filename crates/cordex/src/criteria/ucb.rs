use crate::criteria::InfillCriterion;
use ndarray::ArrayView;
use optex_gp::Surrogate;
use serde::{Deserialize, Serialize};

/// Default exploration weight of the confidence bound
pub const UCB_BETA_DEFAULT: f64 = 0.3;

/// A structure for (minimize-framed) Upper Confidence Bound implementation:
/// the criterion value is `sqrt(beta) * sigma - mean`, so maximizing it
/// favours low predicted values and unexplored regions.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UpperConfidenceBound {
    /// Exploration weight beta
    pub beta: f64,
}

impl Default for UpperConfidenceBound {
    fn default() -> Self {
        UpperConfidenceBound {
            beta: UCB_BETA_DEFAULT,
        }
    }
}

impl InfillCriterion for UpperConfidenceBound {
    fn name(&self) -> &'static str {
        "UCB"
    }

    fn value(&self, x: &[f64], obj_model: &dyn Surrogate, _fmin: f64) -> f64 {
        let pt = match ArrayView::from_shape((1, x.len()), x) {
            Ok(pt) => pt,
            Err(_) => return f64::MIN,
        };
        match (obj_model.predict(&pt), obj_model.predict_variances(&pt)) {
            (Ok(p), Ok(s)) => self.beta.sqrt() * s[0].max(0.).sqrt() - p[0],
            _ => f64::MIN,
        }
    }
}
