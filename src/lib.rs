//! The `ndarray-seminorm` crate provides proximal operators for sums of
//! convex penalties on an `ndarray`, built from their duals.
//!
//! It includes:
//! - Cone constraints and their polars, with exact projections
//!   (non-negative orthant, second-order cone, l1 and l-infinity epigraphs)
//! - Cones and norms composed with linear or affine maps
//! - Nesterov smoothing of cone constraints
//! - A [`Seminorm`](seminorm::Seminorm) container whose proximal operator
//!   is computed by FISTA on the dual
//! - FISTA and ISTA for any composite problem
//!
//! A seminorm is built from atoms, each seen only through its linear map,
//! the adjoint, and the projection onto the feasible set of its conjugate.
//! Because that projection separates over the atoms, the proximal operator
//! of a sum of penalties reduces to a smooth dual problem with a cheap
//! projection step.
//!
//! This crate is in the early development stage and is actively changing.

#![cfg_attr(all(rustc_nightly, test), feature(test))]
#[cfg(all(rustc_nightly, test))]
extern crate test;

#[cfg(test)]
extern crate intel_mkl_src;

pub mod atoms;
pub mod error;
pub mod linop;
pub mod problem;
pub mod prox;
pub mod quadratic;
pub mod seminorm;
pub mod shape;

pub use error::{Error, Result};
pub use seminorm::{Seminorm, SeminormConfig};
pub use shape::Shape;
