//! Cones Composed with Linear Maps
//!
//! Given a cone constraint $`h_K`$, an [`AffineCone`] evaluates
//! $`h_K(D\beta + \alpha)`$. It has no prox of its own, but its dual does:
//! ```math
//! \text{minimize}_u \ \frac12 \|y - D^T u\|_2^2 - \langle u, \alpha \rangle
//! \ \text{s.t.} \ u \in K^\circ
//! ```
//! which is how it takes part in a [`Seminorm`](crate::seminorm::Seminorm).
//!
//! Adding a strongly convex quadratic to the conjugate and conjugating
//! back gives a smooth surrogate, the Moreau envelope of the constraint
//! (Nesterov smoothing).

use ndarray::prelude::*;

use super::cones::Cone;
use super::SeminormAtom;
use crate::error::{Error, Result};
use crate::linop::{AffineTransform, LinearTransform};
use crate::problem::{Evaluation, Mode, Smooth};
use crate::quadratic::IdentityQuadratic;
use crate::shape::Shape;

/// A cone constraint evaluated at $`D\beta + \alpha`$
#[derive(Clone, Debug)]
pub struct AffineCone {
    cone: Cone,
    conjugate: Cone,
    transform: LinearTransform,
}

impl AffineCone {
    /// Compose `cone` with `transform`.
    ///
    /// An affine offset of the transform is folded into the offset of the
    /// cone, so the stored transform is always linear.
    pub fn new(cone: Cone, transform: AffineTransform) -> Result<AffineCone> {
        if cone.quadratic().coef != 0. {
            return Err(Error::SmoothCone);
        }
        let AffineTransform { linear, offset } = transform;
        if linear.output_shape().size() != cone.shape().size() {
            return Err(Error::ShapeMismatch {
                expected: cone.shape().clone(),
                got: linear.output_shape(),
            });
        }
        let cone = match offset {
            Some(o) => {
                let folded = match cone.offset() {
                    Some(c) => c + &o,
                    None => o,
                };
                cone.with_offset(Some(folded))
            }
            None => cone,
        };
        let conjugate = cone.conjugate().into_cone().ok_or(Error::SmoothCone)?;
        Ok(AffineCone {
            cone,
            conjugate,
            transform: linear,
        })
    }

    /// The cone with the identity map
    pub fn identity(cone: Cone) -> Result<AffineCone> {
        let transform = LinearTransform::Identity(cone.shape().clone());
        AffineCone::new(cone, transform.into())
    }

    #[must_use]
    pub fn cone(&self) -> &Cone {
        &self.cone
    }

    #[must_use]
    pub fn linear_transform(&self) -> &LinearTransform {
        &self.transform
    }

    /// The polar cone that constrains the dual variable
    #[must_use]
    pub fn conjugate(&self) -> &Cone {
        &self.conjugate
    }

    #[must_use]
    pub fn dual(&self) -> (&LinearTransform, &Cone) {
        (&self.transform, &self.conjugate)
    }

    #[must_use]
    pub fn shape(&self) -> Shape {
        self.transform.output_shape()
    }

    pub fn nonsmooth_objective(&self, x: ArrayView1<f64>, check_feasibility: bool) -> f64 {
        self.cone
            .nonsmooth_objective(self.transform.linear_map(x).view(), check_feasibility)
    }

    /// Smooth surrogate obtained by adding `smoothing_quadratic` to the conjugate.
    ///
    /// The conjugate held by `self` is left untouched; the quadratic is
    /// attached to a copy.
    pub fn smoothed(&self, smoothing_quadratic: &IdentityQuadratic) -> Result<AffineSmooth> {
        let total = smoothing_quadratic + self.conjugate.quadratic();
        if total.coef <= 0. {
            return Err(Error::InvalidSmoothingCoefficient);
        }
        let conjugate = self.conjugate.clone().with_quadratic(total);
        let smoothed = conjugate
            .conjugate()
            .into_smooth()
            .ok_or(Error::InvalidSmoothingCoefficient)?;
        Ok(AffineSmooth::new(smoothed, self.transform.clone()))
    }
}

impl SeminormAtom for AffineCone {
    fn primal_shape(&self) -> Shape {
        self.transform.input_shape()
    }

    fn dual_shape(&self) -> Shape {
        self.cone.shape().clone()
    }

    fn linear_map(&self, x: ArrayView1<f64>) -> Array1<f64> {
        self.transform.linear_map(x)
    }

    fn adjoint_map(&self, u: ArrayView1<f64>) -> Array1<f64> {
        self.transform.adjoint_map(u)
    }

    fn affine_map(&self, x: ArrayView1<f64>) -> Array1<f64> {
        self.cone.apply_offset(self.transform.linear_map(x).view())
    }

    fn affine_objective(&self, u: ArrayView1<f64>) -> f64 {
        self.conjugate.quadratic().value(u)
    }

    fn evaluate_seminorm(&self, x: ArrayView1<f64>) -> f64 {
        self.nonsmooth_objective(x, true)
    }

    fn evaluate_dual_constraint(&self, u: ArrayView1<f64>) -> f64 {
        self.conjugate
            .constraint(self.conjugate.apply_offset(u).view())
    }

    fn dual_prox(&self, u: ArrayView1<f64>, _lipschitz: f64) -> Array1<f64> {
        match self.conjugate.offset() {
            Some(o) => self.conjugate.cone_prox((&u + o).view()) - o,
            None => self.conjugate.cone_prox(u),
        }
    }
}

/// Conjugate of a cone carrying a strongly convex quadratic
///
/// For $`h(x) = I_K(x + \alpha) + q(x)`$ with $`q`$ of positive coefficient,
/// ```math
/// h^*(u) = \langle u, x^*(u) \rangle - q(x^*(u)), \quad
/// x^*(u) = \mathrm{arg}\!\min_x h(x) - \langle u, x \rangle
/// ```
/// and $`\nabla h^*(u) = x^*(u)`$.
#[derive(Clone, Debug)]
pub struct SmoothConjugate {
    atom: Cone,
}

impl SmoothConjugate {
    pub(crate) fn wrap(atom: Cone) -> SmoothConjugate {
        debug_assert!(atom.quadratic().coef > 0.);
        SmoothConjugate { atom }
    }

    /// The cone whose conjugate this is
    #[must_use]
    pub fn conjugate(&self) -> &Cone {
        &self.atom
    }

    fn argmax(&self, u: ArrayView1<f64>) -> Array1<f64> {
        let tilt = IdentityQuadratic::new(0., None, Some(-&u), 0.);
        self.atom.minimize_with(&(self.atom.quadratic() + &tilt))
    }
}

impl Smooth for SmoothConjugate {
    fn smooth_objective(&self, u: ArrayView1<f64>, mode: Mode) -> Evaluation {
        let x = self.argmax(u);
        Evaluation::build(
            mode,
            || u.dot(&x) - self.atom.quadratic().value(x.view()),
            || x.clone(),
        )
    }
}

/// A smooth function composed with a linear map, $`f(Dx)`$
#[derive(Clone, Debug)]
pub struct AffineSmooth {
    smooth: SmoothConjugate,
    transform: LinearTransform,
}

impl AffineSmooth {
    #[must_use]
    pub fn new(smooth: SmoothConjugate, transform: LinearTransform) -> AffineSmooth {
        AffineSmooth { smooth, transform }
    }

    #[must_use]
    pub fn atom(&self) -> &SmoothConjugate {
        &self.smooth
    }

    #[must_use]
    pub fn linear_transform(&self) -> &LinearTransform {
        &self.transform
    }
}

impl Smooth for AffineSmooth {
    fn smooth_objective(&self, x: ArrayView1<f64>, mode: Mode) -> Evaluation {
        let z = self.transform.linear_map(x);
        match self.smooth.smooth_objective(z.view(), mode) {
            Evaluation::Func(v) => Evaluation::Func(v),
            Evaluation::Grad(g) => Evaluation::Grad(self.transform.adjoint_map(g.view())),
            Evaluation::Both(v, g) => Evaluation::Both(v, self.transform.adjoint_map(g.view())),
        }
    }
}

#[allow(non_snake_case)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::atoms::cones::ConeKind;
    use approx::assert_abs_diff_eq;

    fn difference_matrix(n: usize) -> Array2<f64> {
        let mut D = Array2::zeros((n - 1, n));
        for i in 0..n - 1 {
            D[[i, i]] = -1.;
            D[[i, i + 1]] = 1.;
        }
        D
    }

    #[test]
    fn linear_factory_uses_output_shape() {
        let ac = Cone::linear(ConeKind::NonNegative, difference_matrix(5).into()).unwrap();
        assert_eq!(ac.shape(), Shape::from(4));
        assert_eq!(ac.primal_shape(), Shape::from(5));
        assert_eq!(ac.dual_shape(), Shape::from(4));
        assert_eq!(ac.conjugate().kind(), ConeKind::NonPositive);
    }

    #[test]
    fn transform_offset_is_folded_into_cone() {
        let cone = Cone::new(ConeKind::NonNegative, 2).with_offset(Some(array![1., 1.]));
        let T = AffineTransform::new(LinearTransform::identity(2), Some(array![0.5, -2.]));
        let ac = AffineCone::new(cone, T).unwrap();
        assert_eq!(ac.cone().offset(), Some(&array![1.5, -1.]));
        assert_eq!(ac.linear_transform(), &LinearTransform::identity(2));

        let ac = Cone::affine(ConeKind::NonNegative, LinearTransform::identity(2), array![3., 4.]).unwrap();
        assert_eq!(ac.cone().offset(), Some(&array![3., 4.]));
    }

    #[test]
    fn stored_conjugate_is_reused() {
        let ac = Cone::affine(ConeKind::L2Epigraph, LinearTransform::identity(3), array![1., 0., -2.]).unwrap();
        assert!(std::ptr::eq(ac.conjugate(), ac.dual().1));
        assert_eq!(ac.conjugate(), &ac.cone().conjugate().into_cone().unwrap());
        assert_eq!(&ac.conjugate().conjugate().into_cone().unwrap(), ac.cone());
    }

    #[test]
    fn monotone_constraint() {
        let ac = Cone::linear(ConeKind::NonNegative, difference_matrix(4).into()).unwrap();
        assert_eq!(ac.nonsmooth_objective(array![1., 2., 2., 5.].view(), true), 0.);
        assert_eq!(ac.nonsmooth_objective(array![1., 2., 1., 5.].view(), true), f64::INFINITY);
        assert_eq!(ac.evaluate_seminorm(array![1., 2., 1., 5.].view()), f64::INFINITY);
    }

    #[test]
    fn shape_mismatch_is_rejected() {
        let cone = Cone::new(ConeKind::NonNegative, 3);
        match AffineCone::new(cone, LinearTransform::identity(4).into()) {
            Err(Error::ShapeMismatch { .. }) => {}
            other => panic!("expected ShapeMismatch, got {:?}", other),
        }
    }

    #[test]
    fn strongly_convex_cone_cannot_be_composed() {
        let cone = Cone::new(ConeKind::NonNegative, 2)
            .with_quadratic(IdentityQuadratic::new(1., None, None, 0.));
        assert!(matches!(AffineCone::identity(cone), Err(Error::SmoothCone)));
    }

    #[test]
    fn dual_prox_projects_onto_polar() {
        let ac = AffineCone::identity(Cone::new(ConeKind::NonNegative, 3)).unwrap();
        let u = array![-1., 2., -3.];
        assert_eq!(ac.dual_prox(u.view(), 1.), array![-1., 0., -3.]);
        assert_eq!(ac.evaluate_dual_constraint(array![-1., 0., -3.].view()), 0.);
        assert_eq!(ac.evaluate_dual_constraint(u.view()), f64::INFINITY);
    }

    #[test]
    fn affine_terms_follow_offset() {
        let ac = Cone::affine(ConeKind::NonNegative, LinearTransform::identity(2), array![1., -1.]).unwrap();
        let x = array![2., 3.];
        assert_eq!(ac.affine_map(x.view()), array![3., 2.]);
        // the conjugate carries -<u, offset>
        assert_abs_diff_eq!(ac.affine_objective(array![1., 1.].view()), 0.);
        assert_abs_diff_eq!(ac.affine_objective(array![2., 1.].view()), -1.);
    }

    #[test]
    fn smoothed_nonnegative_is_moreau_envelope() {
        // smoothing I(x >= 0) with eps/2 ||u||^2 gives ||min(x, 0)||^2 / (2 eps)
        let eps = 0.5;
        let ac = AffineCone::identity(Cone::new(ConeKind::NonNegative, 3)).unwrap();
        let smooth = ac
            .smoothed(&IdentityQuadratic::new(eps, None, None, 0.))
            .unwrap();
        let x = array![-1., 2., -0.5];
        let neg = x.mapv(|v: f64| v.min(0.));
        match smooth.smooth_objective(x.view(), Mode::Both) {
            Evaluation::Both(v, g) => {
                assert_abs_diff_eq!(v, neg.dot(&neg) / (2. * eps), epsilon = 1e-12);
                assert_abs_diff_eq!(g, &neg / eps, epsilon = 1e-12);
            }
            other => panic!("unexpected {:?}", other),
        }
        // the conjugate stored in the affine cone is unchanged
        assert!(ac.conjugate().quadratic().is_zero());
    }

    #[test]
    fn smoothed_gradient_goes_through_adjoint() {
        let D = difference_matrix(4);
        let ac = Cone::linear(ConeKind::NonNegative, D.clone().into()).unwrap();
        let smooth = ac
            .smoothed(&IdentityQuadratic::new(1., None, None, 0.))
            .unwrap();
        let x = array![3., 1., 2., 0.];
        let neg = D.dot(&x).mapv(|v| v.min(0.));
        let g = smooth
            .smooth_objective(x.view(), Mode::Grad)
            .into_grad()
            .unwrap();
        assert_abs_diff_eq!(g, D.t().dot(&neg), epsilon = 1e-12);
    }

    #[test]
    fn zero_smoothing_is_rejected() {
        let ac = AffineCone::identity(Cone::new(ConeKind::NonNegative, 2)).unwrap();
        assert!(matches!(
            ac.smoothed(&IdentityQuadratic::zero()),
            Err(Error::InvalidSmoothingCoefficient)
        ));
    }

    #[test]
    fn smooth_conjugate_points_back() {
        let cone = Cone::new(ConeKind::NonPositive, 2)
            .with_quadratic(IdentityQuadratic::new(2., None, None, 0.));
        let sc = cone.conjugate().into_smooth().unwrap();
        assert_eq!(sc.conjugate(), &cone);
    }
}
