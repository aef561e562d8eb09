//! Composite objectives `f(x) + g(x)` with smooth _f_ and prox-friendly _g_
//!
//! The proximal solvers in [`crate::prox`] only ever see a problem through
//! the [`Composite`] trait, so a seminorm can hand them its dual problem
//! and a user can hand them a primal one.

use std::str::FromStr;

use ndarray::prelude::*;

use crate::error::{Error, Result};

/// What a smooth objective should compute
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// value only
    Func,
    /// gradient only
    Grad,
    /// value and gradient
    Both,
}

impl FromStr for Mode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Mode> {
        match s {
            "func" => Ok(Mode::Func),
            "grad" => Ok(Mode::Grad),
            "both" => Ok(Mode::Both),
            other => Err(Error::InvalidMode(other.to_owned())),
        }
    }
}

/// Output of a smooth objective, shaped by the requested [`Mode`]
#[derive(Clone, Debug, PartialEq)]
pub enum Evaluation {
    Func(f64),
    Grad(Array1<f64>),
    Both(f64, Array1<f64>),
}

impl Evaluation {
    /// Assemble the output for `mode`, computing only what is asked for.
    pub fn build(
        mode: Mode,
        value: impl FnOnce() -> f64,
        grad: impl FnOnce() -> Array1<f64>,
    ) -> Evaluation {
        match mode {
            Mode::Func => Evaluation::Func(value()),
            Mode::Grad => Evaluation::Grad(grad()),
            Mode::Both => Evaluation::Both(value(), grad()),
        }
    }

    #[must_use]
    pub fn value(&self) -> Option<f64> {
        match *self {
            Evaluation::Func(v) | Evaluation::Both(v, _) => Some(v),
            Evaluation::Grad(_) => None,
        }
    }

    #[must_use]
    pub fn grad(&self) -> Option<ArrayView1<'_, f64>> {
        match self {
            Evaluation::Grad(g) | Evaluation::Both(_, g) => Some(g.view()),
            Evaluation::Func(_) => None,
        }
    }

    #[must_use]
    pub fn into_grad(self) -> Option<Array1<f64>> {
        match self {
            Evaluation::Grad(g) | Evaluation::Both(_, g) => Some(g),
            Evaluation::Func(_) => None,
        }
    }
}

/// A differentiable objective
pub trait Smooth {
    fn smooth_objective(&self, x: ArrayView1<f64>, mode: Mode) -> Evaluation;
}

/// Minimize `smooth_multiplier * f(x) + g(x)`
pub trait Composite {
    /// Evaluate the smooth part _f_ (without the multiplier)
    fn smooth_objective(&self, x: ArrayView1<f64>, mode: Mode) -> Evaluation;

    /// Evaluate the non-smooth part _g_, possibly `+inf`
    fn nonsmooth_objective(&self, x: ArrayView1<f64>) -> f64;

    /// Minimizer of `L/2 ||x - v||^2 + g(x)`
    fn proximal(&self, v: ArrayView1<f64>, lipschitz: f64) -> Array1<f64>;

    /// Starting point for a solver
    fn initial(&self) -> ArrayView1<'_, f64>;

    fn smooth_multiplier(&self) -> f64 {
        1.
    }

    /// `smooth_multiplier * f(x) + g(x)`
    fn objective(&self, x: ArrayView1<f64>) -> f64 {
        let f = self
            .smooth_objective(x, Mode::Func)
            .value()
            .unwrap_or(0.);
        self.smooth_multiplier() * f + self.nonsmooth_objective(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_from_str() {
        assert_eq!("func".parse::<Mode>().unwrap(), Mode::Func);
        assert_eq!("grad".parse::<Mode>().unwrap(), Mode::Grad);
        assert_eq!("both".parse::<Mode>().unwrap(), Mode::Both);
        match "hessian".parse::<Mode>() {
            Err(Error::InvalidMode(m)) => assert_eq!(m, "hessian"),
            other => panic!("expected InvalidMode, got {:?}", other),
        }
    }

    #[test]
    fn evaluation_only_computes_requested() {
        let e = Evaluation::build(Mode::Func, || 2., || panic!("grad not requested"));
        assert_eq!(e.value(), Some(2.));
        assert!(e.grad().is_none());

        let e = Evaluation::build(Mode::Grad, || panic!("value not requested"), || array![1., 2.]);
        assert_eq!(e.into_grad(), Some(array![1., 2.]));
    }
}
