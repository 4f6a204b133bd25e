use linfa::Float;
use ndarray::Array2;

/// Sampling method allowing to draw designs in a given sample space
///
/// A sampling method generates a set of `ns` samples within a sample space
/// defined by `[lower_bound_xi, upper_bound_xi]^nx` in `R^nx`, where `nx` is
/// the dimension of the space: x = (x_i) with i in [1, nx]. For experimental
/// designs each sample is one run and each component one factor setting.
pub trait SamplingMethod<F: Float> {
    /// Returns the bounds of the sample space
    ///
    /// # Returns
    ///
    /// * A (nx, 2) matrix where the ith row is the interval of the ith components of a sample.
    fn sampling_space(&self) -> &Array2<F>;

    /// Generates a (ns, nx)-shaped array of samples belonging to `[0., 1.]^nx`
    ///
    /// # Parameters
    ///
    /// * `ns`: number of samples
    fn normalized_sample(&self, ns: usize) -> Array2<F>;

    /// Generates a (ns, nx)-shaped array of samples belonging to
    /// `[lower_bound_xi, upper_bound_xi]^nx` where bounds are the returned
    /// values of the `sampling_space` function.
    ///
    /// # Parameters
    ///
    /// * `ns`: number of samples
    fn sample(&self, ns: usize) -> Array2<F> {
        let xlimits = self.sampling_space();
        let lower = xlimits.column(0);
        let scaler = &xlimits.column(1) - &lower;
        self.normalized_sample(ns) * scaler + lower
    }
}
