//! Linear and Affine Transforms with Adjoints
//! building upon ndarray_linalg::operator
//!
//! Every atom that sits in a seminorm sees the shared primal variable
//! through a [`LinearTransform`] _D_, and the dual problem needs both
//! $`Dx`$ and $`D^T u`$. The adjoint identity
//! ```math
//! \langle D x, z \rangle = \langle x, D^T z \rangle
//! ```
//! holds for all transforms defined here.

use ndarray::prelude::*;
use ndarray::{Data, DataMut, NdFloat};
pub use ndarray_linalg::diagonal::{AsDiagonal, Diagonal};
pub use ndarray_linalg::operator::LinearOperator;

use crate::shape::Shape;

pub trait Adjoint<'a> {
    type Output;
    fn adj(&'a self) -> Self::Output;
}

impl<'a, A, S> Adjoint<'a> for ArrayBase<S, Ix2>
where
    A: 'a + NdFloat,
    S: Data<Elem = A>,
{
    type Output = ArrayView<'a, A, Ix2>;

    fn adj(&'a self) -> Self::Output {
        self.t()
    }
}

impl<'a, A, Sa> Adjoint<'a> for Diagonal<Sa>
where
    A: 'a + NdFloat,
    Sa: 'a + Data<Elem = A>,
{
    type Output = &'a Diagonal<Sa>;

    fn adj(&'a self) -> Self::Output {
        self
    }
}

/// A linear map between flat vectors
#[derive(Clone, Debug, PartialEq)]
pub enum LinearTransform {
    /// identity on vectors of the given shape
    Identity(Shape),
    /// elementwise scaling
    Diagonal(Array1<f64>),
    /// dense matrix, output shape `(m,)` and input shape `(n,)` for an `m x n` matrix
    Dense(Array2<f64>),
}

impl LinearTransform {
    #[must_use]
    pub fn identity<S: Into<Shape>>(shape: S) -> LinearTransform {
        LinearTransform::Identity(shape.into())
    }

    #[must_use]
    pub fn input_shape(&self) -> Shape {
        match self {
            LinearTransform::Identity(s) => s.clone(),
            LinearTransform::Diagonal(d) => Shape::from(d.len()),
            LinearTransform::Dense(m) => Shape::from(m.ncols()),
        }
    }

    #[must_use]
    pub fn output_shape(&self) -> Shape {
        match self {
            LinearTransform::Identity(s) => s.clone(),
            LinearTransform::Diagonal(d) => Shape::from(d.len()),
            LinearTransform::Dense(m) => Shape::from(m.nrows()),
        }
    }

    /// $`Dx`$
    pub fn linear_map(&self, x: ArrayView1<f64>) -> Array1<f64> {
        self.apply(&x)
    }

    /// $`D^T z`$
    pub fn adjoint_map(&self, z: ArrayView1<f64>) -> Array1<f64> {
        self.adj().apply(&z)
    }
}

impl From<Array2<f64>> for LinearTransform {
    fn from(m: Array2<f64>) -> LinearTransform {
        LinearTransform::Dense(m)
    }
}

impl LinearOperator for LinearTransform {
    type Elem = f64;

    /// Apply operator out-place
    fn apply<S>(&self, a: &ArrayBase<S, Ix1>) -> Array1<S::Elem>
    where
        S: Data<Elem = Self::Elem>,
    {
        match self {
            LinearTransform::Identity(_) => a.to_owned(),
            LinearTransform::Diagonal(d) => d.as_diagonal().apply(a),
            LinearTransform::Dense(m) => m.apply(a),
        }
    }

    /// Apply operator in-place
    fn apply_mut<S>(&self, a: &mut ArrayBase<S, Ix1>)
    where
        S: DataMut<Elem = Self::Elem>,
    {
        match self {
            LinearTransform::Identity(_) => {}
            LinearTransform::Diagonal(d) => *a *= d,
            LinearTransform::Dense(m) => {
                let b = m.dot(&*a);
                a.assign(&b);
            }
        }
    }
}

/// The transpose of a [`LinearTransform`]
#[derive(Clone, Copy, Debug)]
pub struct AdjointTransform<'a>(&'a LinearTransform);

impl<'a> LinearOperator for AdjointTransform<'a> {
    type Elem = f64;

    fn apply<S>(&self, a: &ArrayBase<S, Ix1>) -> Array1<S::Elem>
    where
        S: Data<Elem = Self::Elem>,
    {
        match self.0 {
            LinearTransform::Identity(_) => a.to_owned(),
            LinearTransform::Diagonal(d) => d.as_diagonal().adj().apply(a),
            LinearTransform::Dense(m) => m.adj().apply(a),
        }
    }
}

impl<'a> Adjoint<'a> for LinearTransform {
    type Output = AdjointTransform<'a>;

    fn adj(&'a self) -> Self::Output {
        AdjointTransform(self)
    }
}

/// A linear transform followed by an optional offset, $`x \mapsto Dx + \alpha`$
#[derive(Clone, Debug, PartialEq)]
pub struct AffineTransform {
    pub linear: LinearTransform,
    pub offset: Option<Array1<f64>>,
}

impl AffineTransform {
    #[must_use]
    pub fn new(linear: LinearTransform, offset: Option<Array1<f64>>) -> AffineTransform {
        AffineTransform { linear, offset }
    }

    /// $`Dx + \alpha`$
    pub fn affine_map(&self, x: ArrayView1<f64>) -> Array1<f64> {
        let mut y = self.linear.linear_map(x);
        if let Some(o) = &self.offset {
            y += o;
        }
        y
    }
}

impl From<LinearTransform> for AffineTransform {
    fn from(linear: LinearTransform) -> AffineTransform {
        AffineTransform::new(linear, None)
    }
}

#[allow(non_snake_case)]
#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray_rand::rand::rngs::StdRng;
    use ndarray_rand::rand::SeedableRng;
    use ndarray_rand::rand_distr::StandardNormal;
    use ndarray_rand::RandomExt;
    use proptest::prelude::*;

    #[test]
    fn ndarray_adj() {
        let A = array![[1., 2.], [3., 4.]];
        let B = array![[1., 3.], [2., 4.]];
        assert!(A.adj() == B);
        assert!(A.adj().adj() == A);
    }

    #[test]
    fn diagonal_adj() {
        let d = array![1., 2., 3., 4.];
        let D = d.as_diagonal();
        assert!(D.adj().apply(&array![1., 1., 1., 1.]) == d);
    }

    #[test]
    fn transform_shapes() {
        let D = LinearTransform::from(Array2::<f64>::zeros((3, 5)));
        assert_eq!(D.input_shape(), Shape::from(5));
        assert_eq!(D.output_shape(), Shape::from(3));
        let I = LinearTransform::identity(4);
        assert_eq!(I.linear_map(array![1., 2., 3., 4.].view()), array![1., 2., 3., 4.]);
        assert_eq!(I.adjoint_map(array![1., 2., 3., 4.].view()), array![1., 2., 3., 4.]);
    }

    #[test]
    fn apply_mut_matches_apply() {
        let D = LinearTransform::from(array![[1., 2.], [0., -1.]]);
        let mut x = array![3., 4.];
        let y = D.apply(&x);
        D.apply_mut(&mut x);
        assert_eq!(x, y);
        assert_eq!(x, array![11., -4.]);
    }

    #[test]
    fn affine_map_adds_offset() {
        let T = AffineTransform::new(
            LinearTransform::Diagonal(array![2., 3.]),
            Some(array![1., -1.]),
        );
        assert_eq!(T.affine_map(array![1., 1.].view()), array![3., 2.]);
    }

    proptest! {
        #[test]
        fn adjoint_identity(seed in any::<u64>(), m in 1usize..8, n in 1usize..8) {
            let mut rng = StdRng::seed_from_u64(seed);
            let transforms = vec![
                LinearTransform::Dense(Array2::random_using((m, n), StandardNormal, &mut rng)),
                LinearTransform::Diagonal(Array1::random_using(n, StandardNormal, &mut rng)),
                LinearTransform::identity(n),
            ];
            for D in &transforms {
                let x = Array1::<f64>::random_using(D.input_shape().size(), StandardNormal, &mut rng);
                let z = Array1::<f64>::random_using(D.output_shape().size(), StandardNormal, &mut rng);
                let lhs = D.linear_map(x.view()).dot(&z);
                let rhs = x.dot(&D.adjoint_map(z.view()));
                assert_abs_diff_eq!(lhs, rhs, epsilon = 1e-8);
            }
        }
    }
}
