//! Error types for seminorm and cone operations.

use thiserror::Error;

use crate::shape::Shape;

/// Error type for ndarray-seminorm operations.
///
/// Failure to converge is not an error: solvers and power iterations
/// return their last iterate when they hit the iteration cap.
#[derive(Debug, Error)]
pub enum Error {
    /// Atoms combined into one seminorm disagree on the primal shape.
    #[error("Shape mismatch: expected {expected}, got {got}")]
    ShapeMismatch { expected: Shape, got: Shape },

    /// The combined quadratic of a proximal step has a non-positive coefficient.
    #[error("Lipschitz + quadratic coefficient must be positive, got {0}")]
    InvalidProxCoefficient(f64),

    /// The quadratic added by `smoothed` leaves a zero coefficient.
    #[error("Quadratic term of the smoothing quadratic must be nonzero")]
    InvalidSmoothingCoefficient,

    /// Unknown evaluation mode for a smooth objective.
    #[error("Mode not specified correctly: {0:?}")]
    InvalidMode(String),

    /// The initial point of a primal problem has infinite objective.
    #[error("Initial point is not feasible")]
    InfeasibleInitialPoint,

    /// A cone carrying a strongly convex quadratic was composed with a linear map.
    #[error("Cone quadratic must have zero coefficient to be composed with a linear map")]
    SmoothCone,

    /// Norm atoms need a non-negative bound.
    #[error("Lagrange parameter must be non-negative, got {0}")]
    InvalidLagrange(f64),

    /// A seminorm needs at least one atom to know its primal shape.
    #[error("Seminorm needs at least one atom")]
    Empty,
}

/// Result type for ndarray-seminorm operations.
pub type Result<T> = std::result::Result<T, Error>;
