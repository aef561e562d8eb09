//! Fast Iterative Shrinking/Thresholding Algorithm

use log::debug;
use ndarray::prelude::*;

use super::{converged, prox_step, FitOptions, ProblemSolver};
use crate::problem::Composite;

/// Fast Iterative Shrinking/Thresholding Algorithm
///
/// Algorithm
/// ---------
/// ```math
/// \begin{aligned}
/// x_i &= \mathrm{prox}_{g/L}\left(y_{i-1} - \frac{1}{L} \nabla f(y_{i-1})\right) \\
/// \theta_i &= \frac{1 + \sqrt{4 \theta_{i-1}^2 + 1}}{2} \\
/// y_i &= x_i + \frac{\theta_{i-1} - 1}{\theta_i} (x_i - x_{i-1})
/// \end{aligned}
/// ```
/// With `restart`, momentum is reset whenever the step points against the
/// last update (adaptive restart of O'Donoghue and Candès).
pub struct Fista<'a, P> {
    problem: &'a P,
    coefs: Array1<f64>,
    lipschitz: f64,
    restart: bool,
}

impl<'a, P: Composite> Fista<'a, P> {
    pub fn new(problem: &'a P, lipschitz: f64) -> Fista<'a, P> {
        Fista {
            problem,
            coefs: problem.initial().to_owned(),
            lipschitz,
            restart: false,
        }
    }

    #[must_use]
    pub fn with_restart(mut self, restart: bool) -> Self {
        self.restart = restart;
        self
    }
}

impl<'a, P: Composite> ProblemSolver for Fista<'a, P> {
    fn fit(&mut self, opts: &FitOptions) -> Vec<f64> {
        let problem = self.problem;
        let mut x = self.coefs.to_owned();
        let mut y = x.to_owned();
        let mut theta = 1f64;

        let mut obj = problem.objective(x.view());
        let mut history = vec![obj];

        let mut done = false;
        for iter in 1..=opts.max_its {
            // save last iter
            let y_old = y.to_owned();
            let x_old = x.to_owned();
            let theta_old = theta;

            theta = (1. + (4. * theta.powi(2) + 1.).sqrt()) / 2.;
            let beta = (theta_old - 1.) / theta; // "nesterov" momentum

            x = prox_step(problem, y.view(), &mut self.lipschitz, opts.backtrack);
            y = &x + &((&x - &x_old) * beta);

            // restart momentum if needed
            if self.restart {
                let g: Array1<f64> = (&y_old - &x) * self.lipschitz;
                if g.dot(&(&x - &x_old)) > 0. {
                    theta = 1.;
                    y = x.to_owned();
                }
            }

            let new_obj = problem.objective(x.view());
            history.push(new_obj);
            if iter >= opts.min_its && converged(obj, new_obj, opts.tol) {
                debug!("fista converged after {} iterations, objective {:e}", iter, new_obj);
                done = true;
                break;
            }
            obj = new_obj;
        }
        if !done {
            debug!("fista stopped at max_its = {}, objective {:e}", opts.max_its, obj);
        }
        self.coefs = x;
        history
    }

    fn coefs(&self) -> &Array1<f64> {
        &self.coefs
    }

    fn lipschitz(&self) -> f64 {
        self.lipschitz
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prox::testing::diagonal_lasso;
    use approx::assert_abs_diff_eq;

    #[test]
    fn fista_diagonal_lasso() {
        // coordinatewise: argmin a^2/2 (x - 5)^2 + 100 |x| = 5 - 100 / a^2
        let problem = diagonal_lasso();
        let mut solver = Fista::new(&problem, 400.);
        let history = solver.fit(&FitOptions {
            max_its: 2000,
            min_its: 5,
            tol: 1e-14,
            backtrack: false,
        });
        assert_abs_diff_eq!(*solver.coefs(), array![4., 4.75], epsilon = 1e-6);
        assert!(history.len() > 5);
        assert!(history.last().unwrap() <= &history[0]);
    }

    #[test]
    fn fista_restart() {
        let problem = diagonal_lasso();
        let mut solver = Fista::new(&problem, 400.).with_restart(true);
        solver.fit(&FitOptions {
            max_its: 2000,
            min_its: 5,
            tol: 1e-14,
            backtrack: false,
        });
        assert_abs_diff_eq!(*solver.coefs(), array![4., 4.75], epsilon = 1e-6);
    }

    #[test]
    fn fista_backtracks_from_small_lipschitz() {
        let problem = diagonal_lasso();
        let mut solver = Fista::new(&problem, 1.);
        solver.fit(&FitOptions {
            max_its: 2000,
            min_its: 5,
            tol: 1e-14,
            backtrack: true,
        });
        assert!(solver.lipschitz() >= 100.);
        assert_abs_diff_eq!(*solver.coefs(), array![4., 4.75], epsilon = 1e-5);
    }

    #[test]
    fn fista_stops_at_max_its() {
        let problem = diagonal_lasso();
        let mut solver = Fista::new(&problem, 400.);
        let history = solver.fit(&FitOptions {
            max_its: 3,
            min_its: 5,
            tol: 1e-14,
            backtrack: false,
        });
        // initial objective plus one entry per iteration
        assert_eq!(history.len(), 4);
        assert!(solver.coefs().iter().all(|v| v.is_finite()));
    }
}
