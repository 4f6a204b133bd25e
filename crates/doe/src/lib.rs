/*!
This library provides the sampling and model-expansion building blocks used by
the optimal design search engine of [optex-cordex](https://github.com/optex-rs/optex).

A design is a `(runs, factors)` matrix of treatment settings, each setting
lying in `[-1., 1.]`. Random designs are drawn through the [`SamplingMethod`]
trait implemented by the [`Random`] sampler, while the [`basis`] module builds
the fixed basis-expansion matrix `J_cb` consumed by the design criteria.

Example:
```
use optex_doe::{sample_design, BasisFamily, build_transform};
use ndarray_rand::rand::SeedableRng;
use rand_xoshiro::Xoshiro256Plus;

// A 6-run, 2-factor random design with settings in [-1., 1.]
let mut rng = Xoshiro256Plus::seed_from_u64(42);
let design = sample_design(6, 2, &mut rng);
assert_eq!(design.dim(), (6, 2));

// The Gram matrix of a cubic polynomial basis
let j_cb = build_transform(BasisFamily::Polynomial, &[4]);
assert_eq!(j_cb.dim(), (4, 4));
```
*/
#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]
mod basis;
mod random;
mod traits;

pub use basis::*;
pub use random::*;
pub use traits::*;
