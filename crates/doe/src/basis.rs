//! Basis-function families and construction of the basis expansion matrix
//! `J_cb` whose entries are pairwise integrals of basis functions.
//!
//! Functional factors are modelled through a finite basis: a factor with
//! `n` coefficients is expanded on the first `n` functions of a family.
//! The design criteria consume the Gram matrix of that expansion,
//! `J_cb[i, j] = integral of b_i(t) * b_j(t) over [0, 1]`, block-diagonal
//! across factors.

use ndarray::{s, Array2};

#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};

/// Number of subintervals of the composite Simpson rule used for the
/// pairwise integrals. Must be even.
const QUADRATURE_STEPS: usize = 1024;

/// Supported basis-function families.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub enum BasisFamily {
    /// Indicator step functions on uniform subintervals of [0, 1]
    Step,
    /// Monomials t^p, p = 0, 1, 2, ...
    Polynomial,
    /// Fourier functions: sqrt(1/2), then cos(p.pi.t) for even p,
    /// sin((p+1).pi.t) for odd p
    Fourier,
}

/// Indicator of `[l, u)`, closed at 1 so that the last step of a
/// partition of [0, 1] captures the right endpoint.
fn indicator(t: f64, l: f64, u: f64) -> f64 {
    if (t == u && u == 1.) || (t >= l && t < u) {
        1.
    } else {
        0.
    }
}

/// Value of the `p`-th basis function of `family` at `t`, for a factor
/// expanded on `size` functions.
pub fn basis_value(family: BasisFamily, size: usize, p: usize, t: f64) -> f64 {
    match family {
        BasisFamily::Step => {
            let width = 1. / size as f64;
            indicator(t, p as f64 * width, (p + 1) as f64 * width)
        }
        BasisFamily::Polynomial => t.powi(p as i32),
        BasisFamily::Fourier => {
            if p == 0 {
                (1f64 / 2.).sqrt()
            } else if p % 2 == 0 {
                (p as f64 * std::f64::consts::PI * t).cos()
            } else {
                ((p + 1) as f64 * std::f64::consts::PI * t).sin()
            }
        }
    }
}

/// Pairwise integral of two basis functions over [0, 1] by composite Simpson.
fn pairwise_integral(family: BasisFamily, size: usize, i: usize, j: usize) -> f64 {
    let h = 1. / QUADRATURE_STEPS as f64;
    let f = |t: f64| basis_value(family, size, i, t) * basis_value(family, size, j, t);
    let mut acc = f(0.) + f(1.);
    for k in 1..QUADRATURE_STEPS {
        let w = if k % 2 == 0 { 2. } else { 4. };
        acc += w * f(k as f64 * h);
    }
    acc * h / 3.
}

/// Gram matrix of the first `size` functions of `family`,
/// `G[i, j] = integral of b_i(t) * b_j(t) over [0, 1]`.
pub fn basis_gram(family: BasisFamily, size: usize) -> Array2<f64> {
    let mut gram = Array2::zeros((size, size));
    for i in 0..size {
        for j in i..size {
            let v = pairwise_integral(family, size, i, j);
            gram[[i, j]] = v;
            gram[[j, i]] = v;
        }
    }
    gram
}

/// Builds the basis expansion matrix `J_cb` for a set of functional factors
/// with the given per-factor basis `sizes`: the block-diagonal assembly of
/// each factor's Gram matrix. The result is a square
/// `(sum(sizes), sum(sizes))` matrix, read-only for the search engine.
pub fn build_transform(family: BasisFamily, sizes: &[usize]) -> Array2<f64> {
    let n: usize = sizes.iter().sum();
    let mut j_cb = Array2::zeros((n, n));
    let mut offset = 0;
    for &size in sizes {
        let gram = basis_gram(family, size);
        j_cb.slice_mut(s![offset..offset + size, offset..offset + size])
            .assign(&gram);
        offset += size;
    }
    j_cb
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_step_gram_is_diagonal() {
        let gram = basis_gram(BasisFamily::Step, 3);
        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j { 1. / 3. } else { 0. };
                assert_abs_diff_eq!(gram[[i, j]], expected, epsilon = 1e-2);
            }
        }
    }

    #[test]
    fn test_polynomial_gram_matches_closed_form() {
        // integral of t^i * t^j over [0, 1] is 1 / (i + j + 1)
        let gram = basis_gram(BasisFamily::Polynomial, 4);
        for i in 0..4 {
            for j in 0..4 {
                assert_abs_diff_eq!(gram[[i, j]], 1. / (i + j + 1) as f64, epsilon = 1e-8);
            }
        }
    }

    #[test]
    fn test_fourier_gram_is_orthogonal() {
        // (sqrt(1/2), sin(2.pi.t), cos(2.pi.t)) is orthogonal over [0, 1]
        // with squared norms 1/2
        let gram = basis_gram(BasisFamily::Fourier, 3);
        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j { 0.5 } else { 0. };
                assert_abs_diff_eq!(gram[[i, j]], expected, epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn test_block_diagonal_assembly() {
        let j_cb = build_transform(BasisFamily::Polynomial, &[2, 3]);
        assert_eq!(j_cb.dim(), (5, 5));
        // off-diagonal blocks are zero
        assert_abs_diff_eq!(j_cb[[0, 2]], 0., epsilon = 1e-12);
        assert_abs_diff_eq!(j_cb[[4, 1]], 0., epsilon = 1e-12);
        // first block is the 2x2 polynomial Gram
        assert_abs_diff_eq!(j_cb[[0, 0]], 1., epsilon = 1e-8);
        assert_abs_diff_eq!(j_cb[[0, 1]], 0.5, epsilon = 1e-8);
    }
}
