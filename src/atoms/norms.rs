//! Norm penalties in Lagrange form
//!
//! $`\lambda \|D x\|_1`$ and $`\lambda \|D x\|_2`$. Both are support functions
//! of a ball, $`\lambda\|z\| = \sup_{\|u\|_* \leq \lambda} \langle u, z \rangle`$,
//! so on the dual side they become box and ball constraints.

use ndarray::prelude::*;
use ndarray_linalg::Norm;

use super::cones::TOL;
use super::SeminormAtom;
use crate::error::{Error, Result};
use crate::linop::LinearTransform;
use crate::shape::Shape;

fn check_lagrange(lagrange: f64) -> Result<f64> {
    if lagrange >= 0. {
        Ok(lagrange)
    } else {
        Err(Error::InvalidLagrange(lagrange))
    }
}

/// $`\lambda \|Dx\|_1`$, e.g. the LASSO penalty or, with a difference
/// matrix, the fused LASSO
#[derive(Clone, Debug)]
pub struct L1Norm {
    lagrange: f64,
    transform: LinearTransform,
}

impl L1Norm {
    pub fn new(lagrange: f64, transform: LinearTransform) -> Result<L1Norm> {
        Ok(L1Norm {
            lagrange: check_lagrange(lagrange)?,
            transform,
        })
    }

    #[must_use]
    pub fn lagrange(&self) -> f64 {
        self.lagrange
    }
}

impl SeminormAtom for L1Norm {
    fn primal_shape(&self) -> Shape {
        self.transform.input_shape()
    }

    fn dual_shape(&self) -> Shape {
        self.transform.output_shape()
    }

    fn linear_map(&self, x: ArrayView1<f64>) -> Array1<f64> {
        self.transform.linear_map(x)
    }

    fn adjoint_map(&self, u: ArrayView1<f64>) -> Array1<f64> {
        self.transform.adjoint_map(u)
    }

    fn evaluate_seminorm(&self, x: ArrayView1<f64>) -> f64 {
        self.lagrange * self.linear_map(x).norm_l1()
    }

    fn evaluate_dual_constraint(&self, u: ArrayView1<f64>) -> f64 {
        if u.norm_max() <= self.lagrange * (1. + TOL) {
            0.
        } else {
            f64::INFINITY
        }
    }

    fn dual_prox(&self, u: ArrayView1<f64>, _lipschitz: f64) -> Array1<f64> {
        let l = self.lagrange;
        u.mapv(|v| v.max(-l).min(l))
    }
}

/// $`\lambda \|Dx\|_2`$, the group LASSO penalty for a single group
#[derive(Clone, Debug)]
pub struct L2Norm {
    lagrange: f64,
    transform: LinearTransform,
}

impl L2Norm {
    pub fn new(lagrange: f64, transform: LinearTransform) -> Result<L2Norm> {
        Ok(L2Norm {
            lagrange: check_lagrange(lagrange)?,
            transform,
        })
    }

    #[must_use]
    pub fn lagrange(&self) -> f64 {
        self.lagrange
    }
}

impl SeminormAtom for L2Norm {
    fn primal_shape(&self) -> Shape {
        self.transform.input_shape()
    }

    fn dual_shape(&self) -> Shape {
        self.transform.output_shape()
    }

    fn linear_map(&self, x: ArrayView1<f64>) -> Array1<f64> {
        self.transform.linear_map(x)
    }

    fn adjoint_map(&self, u: ArrayView1<f64>) -> Array1<f64> {
        self.transform.adjoint_map(u)
    }

    fn evaluate_seminorm(&self, x: ArrayView1<f64>) -> f64 {
        self.lagrange * self.linear_map(x).norm_l2()
    }

    fn evaluate_dual_constraint(&self, u: ArrayView1<f64>) -> f64 {
        if u.norm_l2() <= self.lagrange * (1. + TOL) {
            0.
        } else {
            f64::INFINITY
        }
    }

    fn dual_prox(&self, u: ArrayView1<f64>, _lipschitz: f64) -> Array1<f64> {
        let norm = u.norm_l2();
        if norm <= self.lagrange {
            u.to_owned()
        } else {
            &u * (self.lagrange / norm)
        }
    }
}
