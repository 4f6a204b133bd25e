//! This library implements design-of-experiments search algorithms that look
//! for (near) optimal experimental designs: matrices of treatment settings,
//! one row per experimental run, every coordinate inside `[-1, 1]`, ranked by
//! an information criterion (A-, D-, E- or I-optimality) of the regression
//! model they support.
//!
//! Two search engines are provided:
//!
//! * [`Cordex`], a continuous coordinate-exchange optimizer: many randomized
//!   epochs, each sweeping every design coordinate with a bounded
//!   one-dimensional line search, run sequentially or on a worker pool with a
//!   shared best result, optionally polished by a final pass;
//! * [`Refiner`], a surrogate-driven loop treating whole flattened designs as
//!   points of a high-dimensional box, alternating Gaussian-process fits with
//!   acquisition-function maximization (expected improvement, probability of
//!   improvement or confidence bound).
//!
//! Model expansions through basis functions (see `optex-doe`) and smoothness
//! or ridge penalization of the information matrix are supported through
//! [`Penalization`] and the `transform` configuration.
//!
//! ```
//! use optex_cordex::{Cordex, Optimality};
//!
//! // D-optimal design with 4 runs and 2 scalar factors
//! let result = Cordex::new(4, &[], 2)
//!     .optimality(Optimality::D)
//!     .epochs(2)
//!     .random_start(true)
//!     .final_pass(0)
//!     .seed(42)
//!     .run()
//!     .expect("design search");
//! assert!(result.value > 0.);
//! assert_eq!(result.design.dim(), (4, 2));
//! ```
#![warn(missing_docs)]

mod cordex;
pub mod criteria;
mod criterion;
mod discrete;
mod errors;
mod optimizers;
mod refine;
mod scheduler;
mod types;
mod utils;

pub use crate::cordex::{Cordex, EPOCHS_DEFAULT, FINAL_PASS_ITERS_DEFAULT};
pub use crate::criterion::{DesignObjective, Penalization};
pub use crate::discrete::{discrete_search, WARM_START_EPOCHS, WARM_START_LEVELS};
pub use crate::errors::{DexError, Result};
pub use crate::refine::{Refiner, INIT_OBS_DEFAULT, ROUNDS_DEFAULT};
pub use crate::types::{
    GpSurrogateBuilder, InfillStrategy, LineSearch, LinearCstr, ObjFn, OptimResult, Optimality,
    SurrogateBuilder,
};
pub use crate::utils::{flatten_design, reshape_design};
