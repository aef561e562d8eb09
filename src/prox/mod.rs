//! Minimization for Composite Functions consisting of
//! L-smooth _f_ and non-smooth prox-friendly _g_
//!
//! This includes common objective functions such as the LASSO
//! as well as smooth constrained methods, as a projection is
//! the proximal operator of a constraint set.
//!
//! The solvers here work on any [`Composite`] problem and are what a
//! [`Seminorm`](crate::seminorm::Seminorm) runs on its dual problem.

mod fista;
pub use fista::*;

mod ista;
pub use ista::*;

use ndarray::prelude::*;

use crate::problem::{Composite, Mode};

/// Lipschitz estimates grow by this factor while backtracking
const BACKTRACK_FACTOR: f64 = 1.5;
/// Upper bound on backtracking steps per iteration
const MAX_BACKTRACKS: usize = 60;

/// Stopping and step-size settings for [`ProblemSolver::fit`]
#[derive(Clone, Debug, PartialEq)]
pub struct FitOptions {
    /// number of iterations after which to stop regardless of progress
    pub max_its: usize,
    /// number of iterations before the stopping rule is checked
    pub min_its: usize,
    /// relative change of the objective below which to stop
    pub tol: f64,
    /// search for a larger Lipschitz constant when the current one is too small
    pub backtrack: bool,
}

impl Default for FitOptions {
    fn default() -> Self {
        FitOptions {
            max_its: 10000,
            min_its: 5,
            tol: 1e-5,
            backtrack: true,
        }
    }
}

/// Which proximal-gradient method to run
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SolverKind {
    Fista,
    Ista,
}

/// An iterative solver bound to one [`Composite`] problem
pub trait ProblemSolver {
    /// Iterate until converged or out of iterations; returns the objective history.
    ///
    /// Running out of iterations is not a failure, the last iterate is kept.
    fn fit(&mut self, opts: &FitOptions) -> Vec<f64>;

    /// Current iterate
    fn coefs(&self) -> &Array1<f64>;

    /// Current Lipschitz estimate, larger than the initial one after backtracking
    fn lipschitz(&self) -> f64;
}

/// Build a solver of `kind` for `problem`, starting at `problem.initial()`.
pub fn solver_for<'a, P: Composite>(
    kind: SolverKind,
    problem: &'a P,
    lipschitz: f64,
) -> Box<dyn ProblemSolver + 'a> {
    match kind {
        SolverKind::Fista => Box::new(Fista::new(problem, lipschitz)),
        SolverKind::Ista => Box::new(Ista::new(problem, lipschitz)),
    }
}

/// Relative change stopping rule
fn converged(old: f64, new: f64, tol: f64) -> bool {
    if !old.is_finite() || !new.is_finite() {
        return false;
    }
    (old - new).abs() <= tol * old.abs().max(f64::MIN_POSITIVE)
}

/// One proximal gradient step from `y`, increasing `lipschitz` until the
/// quadratic upper bound holds when `backtrack` is set.
fn prox_step<P: Composite>(
    problem: &P,
    y: ArrayView1<f64>,
    lipschitz: &mut f64,
    backtrack: bool,
) -> Array1<f64> {
    let mult = problem.smooth_multiplier();
    let eval = problem.smooth_objective(y, if backtrack { Mode::Both } else { Mode::Grad });
    let f_y = eval.value().map(|v| v * mult);
    let grad = eval.into_grad().unwrap_or_else(|| Array1::zeros(y.len())) * mult;

    let mut count = 0;
    loop {
        let step = 1. / *lipschitz;
        let x = problem.proximal((&y - &(&grad * step)).view(), *lipschitz);
        let f_y = match f_y {
            Some(f_y) if backtrack && count < MAX_BACKTRACKS => f_y,
            _ => return x,
        };
        let f_x = problem.smooth_objective(x.view(), Mode::Func).value().unwrap_or(0.) * mult;
        let d = &x - &y;
        // small slack for rounding
        if f_x <= f_y + grad.dot(&d) + *lipschitz / 2. * d.dot(&d) + 1e-12 * f_y.abs() {
            return x;
        }
        *lipschitz *= BACKTRACK_FACTOR;
        count += 1;
    }
}

#[allow(non_snake_case)]
#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::problem::Evaluation;

    /// 1/2 ||A x - b||^2 + lambda ||x||_1
    pub(crate) struct Lasso {
        pub A: Array2<f64>,
        pub b: Array1<f64>,
        pub lambda: f64,
        pub x0: Array1<f64>,
    }

    impl Composite for Lasso {
        fn smooth_objective(&self, x: ArrayView1<f64>, mode: Mode) -> Evaluation {
            let r = self.A.dot(&x) - &self.b;
            Evaluation::build(mode, || r.dot(&r) / 2., || self.A.t().dot(&r))
        }

        fn nonsmooth_objective(&self, x: ArrayView1<f64>) -> f64 {
            self.lambda * x.fold(0., |acc, v| acc + v.abs())
        }

        fn proximal(&self, v: ArrayView1<f64>, lipschitz: f64) -> Array1<f64> {
            let t = self.lambda / lipschitz;
            v.mapv(|vi| vi.signum() * (vi.abs() - t).max(0.))
        }

        fn initial(&self) -> ArrayView1<'_, f64> {
            self.x0.view()
        }
    }

    /// Separable LASSO with solution (4, 4.75)
    pub(crate) fn diagonal_lasso() -> Lasso {
        Lasso {
            A: array![[10., 0.], [0., 20.]],
            b: array![50., 100.],
            lambda: 100.,
            x0: array![19., 44.],
        }
    }

    #[test]
    fn converged_rule() {
        assert!(converged(1., 1., 0.));
        assert!(converged(0., 0., 1e-14));
        assert!(!converged(1., 0.5, 1e-3));
        assert!(!converged(f64::INFINITY, f64::INFINITY, 1e-3));
    }

    #[test]
    fn solver_for_kind() {
        let problem = diagonal_lasso();
        for &kind in &[SolverKind::Fista, SolverKind::Ista] {
            let mut solver = solver_for(kind, &problem, 400.);
            solver.fit(&FitOptions {
                max_its: 20000,
                min_its: 5,
                tol: 1e-15,
                backtrack: false,
            });
            approx::assert_abs_diff_eq!(*solver.coefs(), array![4., 4.75], epsilon = 1e-5);
        }
    }
}
