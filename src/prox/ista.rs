//! Iterative Shrinking/Thresholding Algorithm

use log::debug;
use ndarray::prelude::*;

use super::{converged, prox_step, FitOptions, ProblemSolver};
use crate::problem::Composite;

/// Iterative Shrinking/Thresholding Algorithm, the proximal gradient method
///
/// ```math
/// x_i = \mathrm{prox}_{g/L}\left(x_{i-1} - \frac{1}{L} \nabla f(x_{i-1})\right)
/// ```
/// Slower than [`Fista`](super::Fista) but monotone in the objective.
pub struct Ista<'a, P> {
    problem: &'a P,
    coefs: Array1<f64>,
    lipschitz: f64,
}

impl<'a, P: Composite> Ista<'a, P> {
    pub fn new(problem: &'a P, lipschitz: f64) -> Ista<'a, P> {
        Ista {
            problem,
            coefs: problem.initial().to_owned(),
            lipschitz,
        }
    }
}

impl<'a, P: Composite> ProblemSolver for Ista<'a, P> {
    fn fit(&mut self, opts: &FitOptions) -> Vec<f64> {
        let problem = self.problem;
        let mut x = self.coefs.to_owned();
        let mut obj = problem.objective(x.view());
        let mut history = vec![obj];

        for iter in 1..=opts.max_its {
            x = prox_step(problem, x.view(), &mut self.lipschitz, opts.backtrack);
            let new_obj = problem.objective(x.view());
            history.push(new_obj);
            if iter >= opts.min_its && converged(obj, new_obj, opts.tol) {
                debug!("ista converged after {} iterations, objective {:e}", iter, new_obj);
                self.coefs = x;
                return history;
            }
            obj = new_obj;
        }
        debug!("ista stopped at max_its = {}, objective {:e}", opts.max_its, obj);
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
