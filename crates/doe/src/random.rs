use crate::SamplingMethod;
use linfa::Float;
use ndarray::{Array, Array2, ArrayBase, Data, Ix2};
use ndarray_rand::{rand::Rng, rand::SeedableRng, rand_distr::Uniform, RandomExt};
use rand_xoshiro::Xoshiro256Plus;

/// The Random design consists in drawing samples uniformly.
pub struct Random<F: Float, R: Rng + Clone> {
    /// Sampling space definition as a (nx, 2) matrix
    /// The ith row is the [lower_bound, upper_bound] of xi, the ith component of x
    xlimits: Array2<F>,
    /// Random generator used for reproducibility
    rng: R,
}

impl<F: Float> Random<F, Xoshiro256Plus> {
    /// Constructor given a design space as a (nx, 2) matrix \[\[lower bound, upper bound\], ...\]
    ///
    /// ```
    /// use optex_doe::Random;
    /// use ndarray::arr2;
    ///
    /// let doe = Random::new(&arr2(&[[-1.0, 1.0], [-1.0, 1.0]]));
    /// ```
    pub fn new(xlimits: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Self {
        Self::new_with_rng(xlimits, Xoshiro256Plus::from_entropy())
    }
}

impl<F: Float, R: Rng + Clone> Random<F, R> {
    /// Constructor given a design space as a (nx, 2) matrix \[\[lower bound, upper bound\], ...\]
    /// and a random generator for reproducibility
    ///
    /// **Panics** if xlimits number of columns is different from 2.
    pub fn new_with_rng(xlimits: &ArrayBase<impl Data<Elem = F>, Ix2>, rng: R) -> Self {
        if xlimits.ncols() != 2 {
            panic!("xlimits must have 2 columns (lower, upper)");
        }
        Random {
            xlimits: xlimits.to_owned(),
            rng,
        }
    }

    /// Set random generator
    pub fn with_rng<R2: Rng + Clone>(self, rng: R2) -> Random<F, R2> {
        Random {
            xlimits: self.xlimits,
            rng,
        }
    }
}

impl<F: Float, R: Rng + Clone> SamplingMethod<F> for Random<F, R> {
    fn sampling_space(&self) -> &Array2<F> {
        &self.xlimits
    }

    fn normalized_sample(&self, ns: usize) -> Array2<F> {
        let mut rng = self.rng.clone();
        let nx = self.xlimits.nrows();
        Array::random_using((ns, nx), Uniform::new(0., 1.), &mut rng).mapv(|v| F::cast(v))
    }
}

/// Draws a `(runs, factors)` design matrix with every entry independently
/// uniform in `[-1., 1.]`, the canonical coded-factor box.
///
/// The draw goes through the [`Random`] sampler over the `[-1., 1.]^factors`
/// space, seeded from `rng`; `rng` advances, so successive calls produce
/// distinct designs.
pub fn sample_design<R: Rng>(runs: usize, factors: usize, rng: &mut R) -> Array2<f64> {
    let xlimits = Array2::from_shape_fn((factors, 2), |(_, j)| if j == 0 { -1. } else { 1. });
    Random::new_with_rng(&xlimits, Xoshiro256Plus::seed_from_u64(rng.gen())).sample(runs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr2;

    #[test]
    fn test_random_within_bounds() {
        let xlimits = arr2(&[[-1., 1.], [0., 1.]]);
        let actual = Random::new(&xlimits)
            .with_rng(Xoshiro256Plus::seed_from_u64(42))
            .sample(20);
        assert_eq!(actual.dim(), (20, 2));
        for row in actual.rows() {
            assert!(row[0] >= -1. && row[0] <= 1.);
            assert!(row[1] >= 0. && row[1] <= 1.);
        }
    }

    #[test]
    fn test_random_reproducibility() {
        let xlimits = arr2(&[[-1., 1.]]);
        let first = Random::new(&xlimits)
            .with_rng(Xoshiro256Plus::seed_from_u64(0))
            .sample(5);
        let second = Random::new(&xlimits)
            .with_rng(Xoshiro256Plus::seed_from_u64(0))
            .sample(5);
        assert_eq!(first, second);
    }

    #[test]
    fn test_sample_design_box() {
        let mut rng = Xoshiro256Plus::seed_from_u64(42);
        let design = sample_design(10, 3, &mut rng);
        assert_eq!(design.dim(), (10, 3));
        assert!(design.iter().all(|&v| (-1. ..=1.).contains(&v)));
    }

    #[test]
    fn test_sample_design_advances_the_rng() {
        let mut rng = Xoshiro256Plus::seed_from_u64(1);
        let first = sample_design(4, 2, &mut rng);
        let second = sample_design(4, 2, &mut rng);
        assert_ne!(first, second);
    }

    #[test]
    fn test_sample_design_goes_through_the_sampler() {
        let mut rng = Xoshiro256Plus::seed_from_u64(9);
        let design = sample_design(4, 2, &mut rng);

        let mut mirror = Xoshiro256Plus::seed_from_u64(9);
        let expected = Random::new_with_rng(
            &arr2(&[[-1., 1.], [-1., 1.]]),
            Xoshiro256Plus::seed_from_u64(mirror.gen()),
        )
        .sample(4);
        assert_eq!(design, expected);
    }
}
