use crate::criteria::InfillCriterion;
use crate::utils::{norm_cdf, norm_pdf};
use ndarray::ArrayView;
use optex_gp::Surrogate;
use serde::{Deserialize, Serialize};

/// A structure for Expected Improvement implementation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExpectedImprovement;

impl InfillCriterion for ExpectedImprovement {
    fn name(&self) -> &'static str {
        "EI"
    }

    /// Compute EI infill criterion at given `x` point using the surrogate model `obj_model`
    /// and the current minimum of the objective function.
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
                    let pred = p[0];
                    let sigma = s[0].sqrt();
                    let args0 = (fmin - pred) / sigma;
                    let args1 = args0 * norm_cdf(args0);
                    let args2 = norm_pdf(args0);
                    sigma * (args1 + args2)
                }
            }
            _ => 0.0,
        }
    }
}

/// Expected Improvement infill criterion
pub const EI: ExpectedImprovement = ExpectedImprovement {};
