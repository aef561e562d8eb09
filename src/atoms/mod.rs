//! Penalty atoms with closed-form dual proximal operators
//!
//! An atom is one term $`h(D x)`$ of a sum of penalties. It is seen by
//! a [`Seminorm`](crate::seminorm::Seminorm) only through its linear map _D_,
//! the adjoint $`D^T`$, and the conjugate $`h^*`$ acting on one segment of the
//! dual vector. The conjugate of every atom here is the indicator of a
//! closed convex set (plus a linear term), so its prox is a projection.

pub mod affine;
pub mod cones;
pub mod norms;
pub mod projl1;

pub use affine::{AffineCone, AffineSmooth, SmoothConjugate};
pub use cones::{Cone, ConeKind, Conjugate, CONJUGATE_PAIRS};
pub use norms::{L1Norm, L2Norm};
pub use projl1::proj_l1_epigraph;

use std::fmt::Debug;

use ndarray::prelude::*;

use crate::shape::Shape;

/// One term of a seminorm, as seen from the dual problem
///
/// Implementations must satisfy the adjoint identity
/// $`\langle D x, z \rangle = \langle x, D^T z \rangle`$.
pub trait SeminormAtom: Debug {
    /// Shape of the shared primal variable
    fn primal_shape(&self) -> Shape;

    /// Shape of this atom's segment of the dual vector
    fn dual_shape(&self) -> Shape;

    /// $`Dx`$
    fn linear_map(&self, x: ArrayView1<f64>) -> Array1<f64>;

    /// $`D^T u`$
    fn adjoint_map(&self, u: ArrayView1<f64>) -> Array1<f64>;

    /// $`Dx + \alpha`$, the negative dual gradient at residual _x_
    fn affine_map(&self, x: ArrayView1<f64>) -> Array1<f64> {
        self.linear_map(x)
    }

    /// Linear part of the conjugate, $`-\langle u, \alpha \rangle`$
    fn affine_objective(&self, _u: ArrayView1<f64>) -> f64 {
        0.
    }

    /// $`h(Dx + \alpha)`$
    fn evaluate_seminorm(&self, x: ArrayView1<f64>) -> f64;

    /// Indicator of the dual feasible set, `0` or `+inf`
    fn evaluate_dual_constraint(&self, u: ArrayView1<f64>) -> f64;

    /// Projection of `u` onto the dual feasible set
    fn dual_prox(&self, u: ArrayView1<f64>, lipschitz: f64) -> Array1<f64>;
}
