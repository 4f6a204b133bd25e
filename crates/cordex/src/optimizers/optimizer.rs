use crate::types::{LineSearch, ObjFn};
use cobyla::RhoBeg;
use ndarray::{arr1, Array1, Array2, ArrayView1};

pub(crate) const LINESEARCH_MAX_EVAL_DEFAULT: usize = 200;

/// Facade for the bounded minimization algorithms used by the coordinate
/// exchange and the acquisition refinement.
///
/// Both backends minimize; a failed run reports `f64::INFINITY` together with
/// the last iterate so callers can fall back on their incumbent.
pub(crate) struct Optimizer<'a, U: Clone> {
    algo: LineSearch,
    fun: &'a (dyn ObjFn<U> + Sync),
    cons: Vec<&'a (dyn ObjFn<U> + Sync)>,
    bounds: Array2<f64>,
    user_data: &'a U,
    max_eval: usize,
    xinit: Option<Array1<f64>>,
    ftol_abs: Option<f64>,
    ftol_rel: Option<f64>,
}

impl<'a, U: Clone> Optimizer<'a, U> {
    pub fn new(
        algo: LineSearch,
        fun: &'a (dyn ObjFn<U> + Sync),
        cons: &[&'a (dyn ObjFn<U> + Sync)],
        user_data: &'a U,
        bounds: &Array2<f64>,
    ) -> Self {
        Optimizer {
            algo,
            fun,
            cons: cons.to_vec(),
            bounds: bounds.clone(),
            user_data,
            max_eval: LINESEARCH_MAX_EVAL_DEFAULT,
            xinit: None,
            ftol_abs: None,
            ftol_rel: None,
        }
    }

    pub fn ftol_abs(&mut self, ftol_abs: f64) -> &mut Self {
        self.ftol_abs = Some(ftol_abs);
        self
    }

    pub fn ftol_rel(&mut self, ftol_rel: f64) -> &mut Self {
        self.ftol_rel = Some(ftol_rel);
        self
    }

    pub fn max_eval(&mut self, max_eval: usize) -> &mut Self {
        self.max_eval = max_eval;
        self
    }

    pub fn xinit(&mut self, xinit: &ArrayView1<f64>) -> &mut Self {
        self.xinit = Some(xinit.to_owned());
        self
    }

    pub fn minimize(&self) -> (f64, Array1<f64>) {
        let xinit = self
            .xinit
            .clone()
            .unwrap_or_else(|| self.bounds.map_axis(ndarray::Axis(1), |row| 0.5 * (row[0] + row[1])))
            .to_vec();
        let bounds: Vec<_> = self
            .bounds
            .outer_iter()
            .map(|row| (row[0], row[1]))
            .collect();
        match self.algo {
            LineSearch::Cobyla => {
                let cstrs: Vec<_> = self
                    .cons
                    .iter()
                    .map(|f| move |x: &[f64], u: &mut U| -(*f)(x, None, u))
                    .collect();
                let res = cobyla::minimize(
                    |x: &[f64], u: &mut U| (self.fun)(x, None, u),
                    &xinit,
                    &bounds,
                    &cstrs,
                    self.user_data.clone(),
                    self.max_eval,
                    RhoBeg::All(0.5),
                    Some(cobyla::StopTols {
                        ftol_rel: self.ftol_rel.unwrap_or(0.0),
                        ftol_abs: self.ftol_abs.unwrap_or(0.0),
                        ..cobyla::StopTols::default()
                    }),
                );
                match res {
                    Ok((_, x_opt, y_opt)) => (y_opt, arr1(&x_opt)),
                    Err((_, x_opt, _)) => (f64::INFINITY, arr1(&x_opt)),
                }
            }
            LineSearch::Slsqp => {
                let cstrs: Vec<_> = self
                    .cons
                    .iter()
                    .map(|f| {
                        move |x: &[f64], g: Option<&mut [f64]>, u: &mut U| (*f)(x, g, u)
                    })
                    .collect();
                let res = slsqp::minimize(
                    self.fun,
                    &xinit,
                    &bounds,
                    &cstrs,
                    self.user_data.clone(),
                    self.max_eval,
                    Some(slsqp::StopTols {
                        ftol_rel: self.ftol_rel.unwrap_or(0.0),
                        ftol_abs: self.ftol_abs.unwrap_or(0.0),
                        ..slsqp::StopTols::default()
                    }),
                );
                match res {
                    Ok((_, x_opt, y_opt)) => (y_opt, arr1(&x_opt)),
                    Err((_, x_opt, _)) => (f64::INFINITY, arr1(&x_opt)),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn quadratic(x: &[f64], _g: Option<&mut [f64]>, _u: &mut ()) -> f64 {
        (x[0] - 0.25) * (x[0] - 0.25)
    }

    #[test]
    fn test_cobyla_minimizes_bounded_quadratic() {
        let bounds = array![[-1., 1.]];
        let (y_opt, x_opt) = Optimizer::new(LineSearch::Cobyla, &quadratic, &[], &(), &bounds)
            .xinit(&array![-0.5].view())
            .ftol_abs(1e-10)
            .minimize();
        assert_abs_diff_eq!(x_opt[0], 0.25, epsilon = 1e-3);
        assert!(y_opt < 1e-6);
    }

    #[test]
    fn test_slsqp_respects_bounds() {
        // minimum of (x + 2)^2 over [-1, 1] sits on the lower bound
        fn shifted(x: &[f64], g: Option<&mut [f64]>, _u: &mut ()) -> f64 {
            if let Some(g) = g {
                g[0] = 2. * (x[0] + 2.);
            }
            (x[0] + 2.) * (x[0] + 2.)
        }
        let bounds = array![[-1., 1.]];
        let (_, x_opt) = Optimizer::new(LineSearch::Slsqp, &shifted, &[], &(), &bounds)
            .xinit(&array![0.5].view())
            .ftol_rel(1e-8)
            .minimize();
        assert_abs_diff_eq!(x_opt[0], -1., epsilon = 1e-4);
    }
}
