//! Problems built by a [`Seminorm`] for the proximal solvers

use ndarray::prelude::*;

use super::Seminorm;
use crate::problem::{Composite, Evaluation, Mode};

/// Dual of the proximal problem of a seminorm
///
/// For the prox at _y_ with step $`1/L`$,
/// ```math
/// \text{minimize}_u \ \frac12 \|L y - \textstyle\sum_i D_i^T u_i\|_2^2
/// + L \textstyle\sum_i h_i^*(u_i)
/// ```
/// The non-smooth part is the indicator of the dual feasible set, which
/// does not change under scaling and separates over the atom segments.
#[derive(Debug)]
pub struct DualProblem<'a> {
    seminorm: &'a Seminorm,
    center: Array1<f64>,
    lipschitz: f64,
    initial: Array1<f64>,
}

impl<'a> DualProblem<'a> {
    pub(crate) fn new(
        seminorm: &'a Seminorm,
        center: Array1<f64>,
        lipschitz: f64,
        initial: Array1<f64>,
    ) -> Self {
        DualProblem {
            seminorm,
            center,
            lipschitz,
            initial,
        }
    }

    /// Step parameter _L_ of the primal prox
    #[must_use]
    pub fn lipschitz(&self) -> f64 {
        self.lipschitz
    }

    #[must_use]
    pub fn center(&self) -> ArrayView1<'_, f64> {
        self.center.view()
    }

    /// Primal point for a dual iterate, $`y - D^T u / L`$
    #[must_use]
    pub fn primal(&self, u: ArrayView1<f64>) -> Array1<f64> {
        self.seminorm.primal_from_dual(self.center.view(), u) / self.lipschitz
    }
}

impl<'a> Composite for DualProblem<'a> {
    fn smooth_objective(&self, u: ArrayView1<f64>, mode: Mode) -> Evaluation {
        self.seminorm
            .dual_smooth_eval(self.center.view(), self.lipschitz, u, mode)
    }

    fn nonsmooth_objective(&self, u: ArrayView1<f64>) -> f64 {
        self.seminorm.evaluate_dual_constraint(u)
    }

    fn proximal(&self, u: ArrayView1<f64>, lipschitz: f64) -> Array1<f64> {
        self.seminorm.dual_prox(u, lipschitz)
    }

    fn initial(&self) -> ArrayView1<'_, f64> {
        self.initial.view()
    }
}

/// `multiplier * f(x) + seminorm(x)` for a user supplied smooth _f_
///
/// The proximal step is [`Seminorm::primal_prox`], so every solver
/// iteration runs an inner dual solve.
pub struct PrimalProblem<'a, F> {
    seminorm: &'a Seminorm,
    smooth: F,
    multiplier: f64,
    initial: Array1<f64>,
}

impl<'a, F> PrimalProblem<'a, F>
where
    F: Fn(ArrayView1<f64>, Mode) -> Evaluation,
{
    pub(crate) fn new(seminorm: &'a Seminorm, smooth: F, multiplier: f64, initial: Array1<f64>) -> Self {
        PrimalProblem {
            seminorm,
            smooth,
            multiplier,
            initial,
        }
    }

    #[must_use]
    pub fn seminorm(&self) -> &Seminorm {
        self.seminorm
    }
}

impl<'a, F> Composite for PrimalProblem<'a, F>
where
    F: Fn(ArrayView1<f64>, Mode) -> Evaluation,
{
    fn smooth_objective(&self, x: ArrayView1<f64>, mode: Mode) -> Evaluation {
        (self.smooth)(x, mode)
    }

    fn nonsmooth_objective(&self, x: ArrayView1<f64>) -> f64 {
        self.seminorm.evaluate_seminorm(x)
    }

    fn proximal(&self, v: ArrayView1<f64>, lipschitz: f64) -> Array1<f64> {
        self.seminorm.primal_prox(v, lipschitz)
    }

    fn initial(&self) -> ArrayView1<'_, f64> {
        self.initial.view()
    }

    fn smooth_multiplier(&self) -> f64 {
        self.multiplier
    }
}
