//! Array shapes of primal and dual variables
//!
//! Atoms store their variables flat, in row-major order. The shape is
//! kept alongside so that atoms sharing a seminorm can be checked for
//! agreement and so that dual segments remember how they were laid out.

use std::fmt;

/// Immutable list of dimensions
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Shape(Box<[usize]>);

impl Shape {
    #[must_use]
    pub fn new(dims: &[usize]) -> Shape {
        Shape(dims.into())
    }

    /// Total number of entries
    #[must_use]
    pub fn size(&self) -> usize {
        self.0.iter().product()
    }

    #[must_use]
    pub fn dims(&self) -> &[usize] {
        &self.0
    }

    #[must_use]
    pub fn ndim(&self) -> usize {
        self.0.len()
    }
}

impl From<usize> for Shape {
    fn from(n: usize) -> Shape {
        Shape::new(&[n])
    }
}

impl From<(usize, usize)> for Shape {
    fn from((m, n): (usize, usize)) -> Shape {
        Shape::new(&[m, n])
    }
}

impl From<&[usize]> for Shape {
    fn from(dims: &[usize]) -> Shape {
        Shape::new(dims)
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, d) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", d)?;
        }
        if self.0.len() == 1 {
            write!(f, ",")?;
        }
        write!(f, ")")
    }
}
