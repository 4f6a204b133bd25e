/*!
This library implements a compact ordinary-kriging Gaussian process used as
the probabilistic surrogate of the design-space refinement loop in
`optex-cordex`.

The model uses a constant mean and an isotropic squared-exponential
correlation; the correlation length is selected by maximizing the reduced
likelihood over a small log-spaced grid. Training relies on a Cholesky
factorization of the correlation matrix, so an ill-conditioned or singular
kernel surfaces as a [`GpError`] which the caller is expected to treat as a
recoverable event.

Example:
```
use ndarray::{array, Array1};
use optex_gp::{GaussianProcess, Surrogate};

let xt = array![[0.0], [1.0], [2.0], [3.0], [4.0]];
let yt = array![0.0, 1.0, 1.5, 0.9, 1.0];
let gp = GaussianProcess::params().fit(&xt.view(), &yt.view()).expect("GP fit");
let mean = gp.predict(&array![[2.5]].view()).expect("prediction");
assert_eq!(mean.len(), 1);
```
*/
mod algorithm;
mod errors;

pub use algorithm::*;
pub use errors::*;
