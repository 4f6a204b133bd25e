use crate::errors::{GpError, Result};
use linfa_linalg::{cholesky::*, triangular::*};
use log::debug;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

/// Default correlation length candidates (log-spaced grid)
const DEFAULT_THETAS: [f64; 5] = [0.01, 0.1, 1., 10., 100.];

/// Nugget factor added to the correlation diagonal for numerical stability
const DEFAULT_NUGGET: f64 = 100.0 * f64::EPSILON;

/// An interface for a trained probabilistic surrogate: mean prediction and
/// prediction variance at arbitrary points of the input space.
pub trait Surrogate: Send + Sync {
    /// Predicted mean values at the given `(n, nx)` points
    fn predict(&self, x: &ArrayView2<f64>) -> Result<Array1<f64>>;
    /// Predicted variances at the given `(n, nx)` points
    fn predict_variances(&self, x: &ArrayView2<f64>) -> Result<Array1<f64>>;
}

/// Gaussian process parameters: the theta candidates tried during the
/// likelihood maximization and the stabilizing nugget.
#[derive(Clone, Debug)]
pub struct GpParams {
    thetas: Vec<f64>,
    nugget: f64,
}

impl Default for GpParams {
    fn default() -> Self {
        GpParams {
            thetas: DEFAULT_THETAS.to_vec(),
            nugget: DEFAULT_NUGGET,
        }
    }
}

impl GpParams {
    /// Sets the candidate correlation lengths
    pub fn thetas(mut self, thetas: Vec<f64>) -> Self {
        self.thetas = thetas;
        self
    }

    /// Sets the nugget added to the correlation diagonal
    pub fn nugget(mut self, nugget: f64) -> Self {
        self.nugget = nugget;
        self
    }

    /// Trains an ordinary-kriging model on the `(n, nx)` inputs `xt` and
    /// the `n` outputs `yt`.
    ///
    /// The correlation length maximizing the reduced likelihood over the
    /// candidate grid is retained. Fails when outputs are not finite or when
    /// no candidate produces a positive-definite correlation matrix.
    pub fn fit(&self, xt: &ArrayView2<f64>, yt: &ArrayView1<f64>) -> Result<GaussianProcess> {
        let n = xt.nrows();
        if n == 0 || n != yt.len() {
            return Err(GpError::InvalidValue(format!(
                "Training set mismatch: {} inputs for {} outputs",
                n,
                yt.len()
            )));
        }
        if yt.iter().any(|v| !v.is_finite()) {
            return Err(GpError::InvalidValue(
                "Non finite output in training data".to_string(),
            ));
        }

        let mut best: Option<(f64, GaussianProcess)> = None;
        for &theta in &self.thetas {
            match self.fit_with_theta(xt, yt, theta) {
                Ok((rlf, gp)) => {
                    if best.as_ref().map_or(true, |(b, _)| rlf > *b) {
                        best = Some((rlf, gp));
                    }
                }
                Err(err) => debug!("Skip theta={}: {}", theta, err),
            }
        }
        best.map(|(_, gp)| gp).ok_or_else(|| {
            GpError::LikelihoodComputationError(
                "No valid Cholesky factorization over the theta grid".to_string(),
            )
        })
    }

    fn fit_with_theta(
        &self,
        xt: &ArrayView2<f64>,
        yt: &ArrayView1<f64>,
        theta: f64,
    ) -> Result<(f64, GaussianProcess)> {
        let n = xt.nrows();
        let mut r_mx = Array2::eye(n).mapv(|v: f64| v * (1. + self.nugget));
        for i in 0..n {
            for j in (i + 1)..n {
                let r = correlation(&xt.row(i), &xt.row(j), theta);
                r_mx[[i, j]] = r;
                r_mx[[j, i]] = r;
            }
        }
        let r_chol = r_mx.cholesky()?;

        let ones = Array2::ones((n, 1));
        let y_col = yt.to_owned().insert_axis(Axis(1));
        let z1 = r_chol.solve_triangular(&ones, UPLO::Lower)?;
        let zy = r_chol.solve_triangular(&y_col, UPLO::Lower)?;

        // Generalized least squares estimate of the constant mean
        let denom = z1.mapv(|v| v * v).sum();
        let mu = (&z1 * &zy).sum() / denom;

        let resid = &y_col - mu * &ones;
        let zr = r_chol.solve_triangular(&resid, UPLO::Lower)?;
        let sigma2 = zr.mapv(|v| v * v).sum() / n as f64;
        let gamma = r_chol.t().solve_triangular_into(zr, UPLO::Upper)?;
        // The determinant of R is the squared product of the diagonal
        // elements of its Cholesky decomposition
        let logdet = r_chol.diag().mapv(|v| v.ln()).sum() * 2.;
        let rlf = if sigma2 > 0. {
            -(n as f64) * sigma2.ln() - logdet
        } else {
            f64::INFINITY
        };

        Ok((
            rlf,
            GaussianProcess {
                xtrain: xt.to_owned(),
                theta,
                mu,
                sigma2,
                gamma,
                r_chol,
                z1,
            },
        ))
    }
}

/// An ordinary-kriging Gaussian process with constant mean and isotropic
/// squared-exponential correlation.
pub struct GaussianProcess {
    /// Training inputs (n, nx)
    xtrain: Array2<f64>,
    /// Correlation length retained by likelihood maximization
    theta: f64,
    /// Constant mean estimate
    mu: f64,
    /// Process variance estimate
    sigma2: f64,
    /// Kriging weights R^-1 (y - mu)
    gamma: Array2<f64>,
    /// Lower Cholesky factor of the correlation matrix
    r_chol: Array2<f64>,
    /// Half-solve of the unit vector, L^-1 1
    z1: Array2<f64>,
}

impl GaussianProcess {
    /// Default parameters constructor
    pub fn params() -> GpParams {
        GpParams::default()
    }

    /// Retained correlation length
    pub fn theta(&self) -> f64 {
        self.theta
    }

    fn correlations(&self, x: &ArrayView1<f64>) -> Array2<f64> {
        let n = self.xtrain.nrows();
        let mut k = Array2::zeros((n, 1));
        for i in 0..n {
            k[[i, 0]] = correlation(&self.xtrain.row(i), x, self.theta);
        }
        k
    }
}

impl Surrogate for GaussianProcess {
    fn predict(&self, x: &ArrayView2<f64>) -> Result<Array1<f64>> {
        let mut mean = Array1::zeros(x.nrows());
        for (i, xi) in x.rows().into_iter().enumerate() {
            let k = self.correlations(&xi);
            mean[i] = self.mu + (&k * &self.gamma).sum();
        }
        Ok(mean)
    }

    fn predict_variances(&self, x: &ArrayView2<f64>) -> Result<Array1<f64>> {
        let mut var = Array1::zeros(x.nrows());
        let denom = self.z1.mapv(|v| v * v).sum();
        for (i, xi) in x.rows().into_iter().enumerate() {
            let k = self.correlations(&xi);
            let v = self.r_chol.solve_triangular(&k, UPLO::Lower)?;
            let kt_rinv_k = v.mapv(|w| w * w).sum();
            let ones_rinv_k = (&self.z1 * &v).sum();
            let value = self.sigma2 * (1. - kt_rinv_k + (1. - ones_rinv_k).powi(2) / denom);
            var[i] = value.max(0.);
        }
        Ok(var)
    }
}

fn correlation(a: &ArrayView1<f64>, b: &ArrayView1<f64>, theta: f64) -> f64 {
    let sq_dist = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>();
    (-theta * sq_dist).exp()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn train_1d() -> (Array2<f64>, Array1<f64>) {
        let xt = array![[0.0], [1.0], [2.0], [3.0], [4.0]];
        let yt = xt.column(0).mapv(|v: f64| (v - 2.).sin() + 1.);
        (xt, yt)
    }

    #[test]
    fn test_gp_interpolates_training_points() {
        let (xt, yt) = train_1d();
        let gp = GaussianProcess::params()
            .fit(&xt.view(), &yt.view())
            .expect("GP fit");
        let mean = gp.predict(&xt.view()).expect("prediction");
        for (pred, truth) in mean.iter().zip(yt.iter()) {
            assert_abs_diff_eq!(pred, truth, epsilon = 1e-4);
        }
        let var = gp.predict_variances(&xt.view()).expect("variances");
        for v in var.iter() {
            assert_abs_diff_eq!(*v, 0., epsilon = 1e-4);
        }
    }

    #[test]
    fn test_gp_variance_grows_away_from_data() {
        let (xt, yt) = train_1d();
        let gp = GaussianProcess::params()
            .fit(&xt.view(), &yt.view())
            .expect("GP fit");
        let var = gp
            .predict_variances(&array![[2.0], [10.0]].view())
            .expect("variances");
        assert!(var[1] > var[0]);
    }

    #[test]
    fn test_gp_rejects_non_finite_outputs() {
        let xt = array![[0.0], [1.0]];
        let yt = array![0.0, f64::INFINITY];
        assert!(GaussianProcess::params().fit(&xt.view(), &yt.view()).is_err());
    }

    #[test]
    fn test_gp_rejects_mismatched_shapes() {
        let xt = array![[0.0], [1.0]];
        let yt = array![0.0];
        assert!(GaussianProcess::params().fit(&xt.view(), &yt.view()).is_err());
    }
}
