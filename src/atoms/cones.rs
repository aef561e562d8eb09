//! Closed Convex Cone Constraints
//!
//! A [`Cone`] is the indicator of a closed convex cone $`K`$, shifted by an
//! optional offset and carrying an optional quadratic:
//! ```math
//! h(x) = I_K(x + \alpha) + q(x)
//! ```
//! The proximal operator of an indicator is the Euclidean projection onto
//! the cone, and every [`ConeKind`] has that projection in closed form.
//!
//! Each kind is paired with the kind of its polar cone, which is what the
//! Fenchel conjugate of $`I_K`$ turns into:
//! ```math
//! I_K^*(u) = \sup_{x \in K} \langle u, x \rangle = I_{K^\circ}(u)
//! ```
//!
//! References
//! ----------
//! - Parikh and Boyd, "Proximal Algorithms", Foundations and Trends in Optimization 1(3), 2014.

use std::fmt;

use log::debug;
use ndarray::prelude::*;
use ndarray_linalg::Norm;

use super::affine::{AffineCone, SmoothConjugate};
use super::projl1::proj_l1_epigraph;
use crate::error::{Error, Result};
use crate::linop::{AffineTransform, LinearTransform};
use crate::quadratic::{work_out_conjugate, IdentityQuadratic};
use crate::shape::Shape;

/// Default relative tolerance of membership tests
pub const TOL: f64 = 1.0e-05;

/// The elementary cones and their polars
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ConeKind {
    /// $`\{x : x \succeq 0\}`$
    NonNegative,
    /// $`\{x : x \preceq 0\}`$
    NonPositive,
    /// all of $`\mathbb{R}^p`$, the constraint that is always satisfied
    Zero,
    /// $`\{0\}`$
    ZeroConstraint,
    /// $`\{x : \|x_{1:}\|_1 \leq x_0\}`$
    L1Epigraph,
    /// $`\{x : \|x_{1:}\|_\infty \leq -x_0\}`$
    L1EpigraphPolar,
    /// $`\{x : \|x_{1:}\|_2 \leq x_0\}`$
    L2Epigraph,
    /// $`\{x : \|x_{1:}\|_2 \leq -x_0\}`$
    L2EpigraphPolar,
    /// $`\{x : \|x_{1:}\|_\infty \leq x_0\}`$
    LInfEpigraph,
    /// $`\{x : \|x_{1:}\|_1 \leq -x_0\}`$
    LInfEpigraphPolar,
}

/// Every kind next to the kind of its conjugate
pub const CONJUGATE_PAIRS: [(ConeKind, ConeKind); 5] = [
    (ConeKind::NonNegative, ConeKind::NonPositive),
    (ConeKind::Zero, ConeKind::ZeroConstraint),
    (ConeKind::L1Epigraph, ConeKind::L1EpigraphPolar),
    (ConeKind::L2Epigraph, ConeKind::L2EpigraphPolar),
    (ConeKind::LInfEpigraph, ConeKind::LInfEpigraphPolar),
];

/// `norm <= t` relaxed by `tol`, relative to `t` and to the size of the input
fn epigraph_test(norm: f64, t: f64, tol: f64, scale: f64) -> bool {
    norm <= (1. + tol) * t + tol * scale
}

fn max_abs(x: ArrayView1<f64>) -> f64 {
    x.fold(0., |acc, v| f64::max(acc, v.abs()))
}

/// Projection onto the second-order cone $`\{x : \|x_{1:}\|_2 \leq x_0\}`$
fn proj_l2_epigraph(x: ArrayView1<f64>) -> Array1<f64> {
    if x.is_empty() {
        return x.to_owned();
    }
    let t = x[0];
    let v = x.slice(s![1..]);
    let norm = v.norm_l2();
    if norm <= t {
        return x.to_owned();
    }
    if norm <= -t {
        return Array1::zeros(x.len());
    }
    let scale = (norm + t) / 2.;
    let mut out = Array1::zeros(x.len());
    out[0] = scale;
    out.slice_mut(s![1..]).assign(&(&v * (scale / norm)));
    out
}

impl ConeKind {
    pub const ALL: [ConeKind; 10] = [
        ConeKind::NonNegative,
        ConeKind::NonPositive,
        ConeKind::Zero,
        ConeKind::ZeroConstraint,
        ConeKind::L1Epigraph,
        ConeKind::L1EpigraphPolar,
        ConeKind::L2Epigraph,
        ConeKind::L2EpigraphPolar,
        ConeKind::LInfEpigraph,
        ConeKind::LInfEpigraphPolar,
    ];

    /// Kind of the polar cone, an involution
    #[must_use]
    pub const fn conjugate(self) -> ConeKind {
        match self {
            ConeKind::NonNegative => ConeKind::NonPositive,
            ConeKind::NonPositive => ConeKind::NonNegative,
            ConeKind::Zero => ConeKind::ZeroConstraint,
            ConeKind::ZeroConstraint => ConeKind::Zero,
            ConeKind::L1Epigraph => ConeKind::L1EpigraphPolar,
            ConeKind::L1EpigraphPolar => ConeKind::L1Epigraph,
            ConeKind::L2Epigraph => ConeKind::L2EpigraphPolar,
            ConeKind::L2EpigraphPolar => ConeKind::L2Epigraph,
            ConeKind::LInfEpigraph => ConeKind::LInfEpigraphPolar,
            ConeKind::LInfEpigraphPolar => ConeKind::LInfEpigraph,
        }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            ConeKind::NonNegative => "nonnegative",
            ConeKind::NonPositive => "nonpositive",
            ConeKind::Zero => "zero",
            ConeKind::ZeroConstraint => "zero_constraint",
            ConeKind::L1Epigraph => "l1_epigraph",
            ConeKind::L1EpigraphPolar => "l1_epigraph_polar",
            ConeKind::L2Epigraph => "l2_epigraph",
            ConeKind::L2EpigraphPolar => "l2_epigraph_polar",
            ConeKind::LInfEpigraph => "linf_epigraph",
            ConeKind::LInfEpigraphPolar => "linf_epigraph_polar",
        }
    }

    /// Membership test, accepting points within `tol` of the boundary
    pub fn contains(self, x: ArrayView1<f64>, tol: f64) -> bool {
        let scale = max_abs(x);
        let tail = || x.slice_move(s![1..]);
        match self {
            ConeKind::NonNegative => x.iter().all(|&v| v >= -scale * tol),
            ConeKind::NonPositive => x.iter().all(|&v| v <= scale * tol),
            ConeKind::Zero => true,
            ConeKind::ZeroConstraint => x.norm_l2() <= tol,
            _ if x.is_empty() => true,
            ConeKind::L1Epigraph => epigraph_test(tail().norm_l1(), x[0], tol, scale),
            ConeKind::L1EpigraphPolar => epigraph_test(tail().norm_max(), -x[0], tol, scale),
            ConeKind::L2Epigraph => epigraph_test(tail().norm_l2(), x[0], tol, scale),
            ConeKind::L2EpigraphPolar => epigraph_test(tail().norm_l2(), -x[0], tol, scale),
            ConeKind::LInfEpigraph => epigraph_test(tail().norm_max(), x[0], tol, scale),
            ConeKind::LInfEpigraphPolar => epigraph_test(tail().norm_l1(), -x[0], tol, scale),
        }
    }

    /// Euclidean projection onto the cone
    pub fn project(self, x: ArrayView1<f64>) -> Array1<f64> {
        match self {
            ConeKind::NonNegative => x.mapv(|v| v.max(0.)),
            ConeKind::NonPositive => x.mapv(|v| v.min(0.)),
            ConeKind::Zero => x.to_owned(),
            ConeKind::ZeroConstraint => Array1::zeros(x.len()),
            ConeKind::L1Epigraph => proj_l1_epigraph(x),
            // Moreau: x = P_K(x) + P_{K°}(x)
            ConeKind::L1EpigraphPolar => &x - &proj_l1_epigraph(x),
            ConeKind::L2Epigraph => proj_l2_epigraph(x),
            ConeKind::L2EpigraphPolar => -proj_l2_epigraph((-&x).view()),
            // the polar of the linf epigraph is the negative of the l1 epigraph
            ConeKind::LInfEpigraph => &x + &proj_l1_epigraph((-&x).view()),
            ConeKind::LInfEpigraphPolar => -proj_l1_epigraph((-&x).view()),
        }
    }
}

impl fmt::Display for ConeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A cone constraint atom, $`I_K(x + \alpha) + q(x)`$
#[derive(Clone, Debug)]
pub struct Cone {
    kind: ConeKind,
    shape: Shape,
    offset: Option<Array1<f64>>,
    quadratic: IdentityQuadratic,
    tol: f64,
}

/// Two cones are equal when they are the same kind of cone on the same shape.
impl PartialEq for Cone {
    fn eq(&self, other: &Cone) -> bool {
        self.kind == other.kind && self.shape == other.shape
    }
}

/// The Fenchel conjugate of a [`Cone`]
#[derive(Clone, Debug)]
pub enum Conjugate {
    /// the polar cone, when the quadratic has zero coefficient
    Cone(Cone),
    /// otherwise the conjugate is smooth
    Smooth(SmoothConjugate),
}

impl Conjugate {
    #[must_use]
    pub fn into_cone(self) -> Option<Cone> {
        match self {
            Conjugate::Cone(c) => Some(c),
            Conjugate::Smooth(_) => None,
        }
    }

    #[must_use]
    pub fn into_smooth(self) -> Option<SmoothConjugate> {
        match self {
            Conjugate::Smooth(s) => Some(s),
            Conjugate::Cone(_) => None,
        }
    }
}

impl Cone {
    #[must_use]
    pub fn new<S: Into<Shape>>(kind: ConeKind, shape: S) -> Cone {
        Cone {
            kind,
            shape: shape.into(),
            offset: None,
            quadratic: IdentityQuadratic::zero(),
            tol: TOL,
        }
    }

    #[must_use]
    pub fn with_offset(mut self, offset: Option<Array1<f64>>) -> Cone {
        self.offset = offset;
        self
    }

    #[must_use]
    pub fn with_quadratic(mut self, quadratic: IdentityQuadratic) -> Cone {
        self.quadratic = quadratic;
        self
    }

    #[must_use]
    pub fn with_tol(mut self, tol: f64) -> Cone {
        self.tol = tol;
        self
    }

    #[must_use]
    pub fn kind(&self) -> ConeKind {
        self.kind
    }

    #[must_use]
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    #[must_use]
    pub fn offset(&self) -> Option<&Array1<f64>> {
        self.offset.as_ref()
    }

    #[must_use]
    pub fn quadratic(&self) -> &IdentityQuadratic {
        &self.quadratic
    }

    #[must_use]
    pub fn tol(&self) -> f64 {
        self.tol
    }

    /// $`x + \alpha`$
    pub fn apply_offset(&self, x: ArrayView1<f64>) -> Array1<f64> {
        match &self.offset {
            Some(o) => &x + o,
            None => x.to_owned(),
        }
    }

    /// Indicator of the cone: `0` inside, `+inf` outside.
    ///
    /// The offset is not applied here.
    pub fn constraint(&self, x: ArrayView1<f64>) -> f64 {
        if self.kind.contains(x, self.tol) {
            0.
        } else {
            f64::INFINITY
        }
    }

    /// $`q(x)`$, plus $`I_K(x + \alpha)`$ when `check_feasibility` is set
    pub fn nonsmooth_objective(&self, x: ArrayView1<f64>, check_feasibility: bool) -> f64 {
        let mut v = self.quadratic.value(x);
        if check_feasibility {
            v += self.constraint(self.apply_offset(x).view());
        }
        v
    }

    /// Minimizer of $`\frac12\|z - x\|_2^2 + I_K(z)`$
    pub fn cone_prox(&self, x: ArrayView1<f64>) -> Array1<f64> {
        self.kind.project(x)
    }

    /// Minimizer of $`h(x) + p(x)`$ for a quadratic $`p`$, typically the
    /// proximal term $`\frac{L}{2}\|x - v\|_2^2`$ of an outer algorithm.
    pub fn proximal(&self, proxq: &IdentityQuadratic) -> Result<Array1<f64>> {
        let total = &self.quadratic + proxq;
        if total.coef <= 0. {
            return Err(Error::InvalidProxCoefficient(total.coef));
        }
        Ok(self.minimize_with(&total))
    }

    /// Minimizer of $`I_K(x + \alpha) + q(x)`$ for `q` with positive coefficient
    pub(crate) fn minimize_with(&self, total: &IdentityQuadratic) -> Array1<f64> {
        let (offset, totalq) = total.recenter(self.offset.as_ref());
        let prox_arg = match &totalq.linear_term {
            Some(l) => l * (-1. / totalq.coef),
            None => Array1::zeros(self.shape.size()),
        };
        let eta = self.cone_prox(prox_arg.view());
        match offset {
            Some(o) => eta - &o,
            None => eta,
        }
    }

    /// The Fenchel conjugate.
    ///
    /// Without a strongly convex quadratic this is the paired polar cone
    /// with the offset and linear term exchanged. It is rebuilt on every
    /// call, and taking it twice gives back a cone equal by value. An
    /// [`AffineCone`] builds its conjugate once and keeps it.
    #[must_use]
    pub fn conjugate(&self) -> Conjugate {
        if self.quadratic.coef == 0. {
            let (offset, outq) = work_out_conjugate(self.offset.as_ref(), &self.quadratic);
            Conjugate::Cone(Cone {
                kind: self.kind.conjugate(),
                shape: self.shape.clone(),
                offset,
                quadratic: outq,
                tol: self.tol,
            })
        } else {
            debug!("conjugate of {} with quadratic coefficient {} is smooth", self.kind, self.quadratic.coef);
            Conjugate::Smooth(SmoothConjugate::wrap(self.clone()))
        }
    }

    /// The transform and conjugate that express this atom on the dual side
    #[must_use]
    pub fn dual(&self) -> (LinearTransform, Conjugate) {
        (LinearTransform::Identity(self.shape.clone()), self.conjugate())
    }

    /// The cone of `kind` evaluated at $`Dx`$
    pub fn linear(kind: ConeKind, transform: LinearTransform) -> Result<AffineCone> {
        let cone = Cone::new(kind, transform.output_shape());
        AffineCone::new(cone, transform.into())
    }

    /// The cone of `kind` evaluated at $`Dx + \alpha`$
    pub fn affine(
        kind: ConeKind,
        transform: LinearTransform,
        offset: Array1<f64>,
    ) -> Result<AffineCone> {
        let cone = Cone::new(kind, transform.output_shape()).with_offset(Some(offset));
        AffineCone::new(cone, AffineTransform::from(transform))
    }
}

impl fmt::Display for Cone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}, offset=", self.kind, self.shape)?;
        match &self.offset {
            Some(o) => write!(f, "{}", o)?,
            None => write!(f, "None")?,
        }
        if !self.quadratic.is_zero() {
            write!(f, ", quadratic={:?}", self.quadratic)?;
        }
        write!(f, ")")
    }
}
