//! Quadratic terms attached to atoms
//!
//! An [`IdentityQuadratic`] represents
//! ```math
//! q(x) = \frac{c}{2} \|x - \mu\|_2^2 + \langle \eta, x \rangle + \gamma
//! ```
//! with coefficient $`c`$, center $`\mu`$, linear term $`\eta`$ and constant $`\gamma`$.
//! A missing center or linear term stands for zero.
//!
//! The proximal step of an outer algorithm is itself such a term,
//! $`\frac{L}{2}\|x - v\|_2^2`$, so the prox of an atom carrying its own
//! quadratic is computed by adding the two and projecting.

use std::ops::Add;

use ndarray::prelude::*;

use crate::problem::{Evaluation, Mode};

#[derive(Clone, Debug, PartialEq)]
pub struct IdentityQuadratic {
    pub coef: f64,
    pub center: Option<Array1<f64>>,
    pub linear_term: Option<Array1<f64>>,
    pub constant: f64,
}

impl Default for IdentityQuadratic {
    fn default() -> Self {
        IdentityQuadratic::zero()
    }
}

impl IdentityQuadratic {
    #[must_use]
    pub fn new(
        coef: f64,
        center: Option<Array1<f64>>,
        linear_term: Option<Array1<f64>>,
        constant: f64,
    ) -> IdentityQuadratic {
        IdentityQuadratic {
            coef,
            center,
            linear_term,
            constant,
        }
    }

    #[must_use]
    pub fn zero() -> IdentityQuadratic {
        IdentityQuadratic::new(0., None, None, 0.)
    }

    /// The proximal quadratic $`\frac{L}{2}\|x - v\|_2^2`$
    #[must_use]
    pub fn prox_step(lipschitz: f64, v: ArrayView1<f64>) -> IdentityQuadratic {
        IdentityQuadratic::new(lipschitz, Some(v.to_owned()), None, 0.)
    }

    /// Neutral term, adding it changes nothing
    #[must_use]
    pub fn is_zero(&self) -> bool {
        let zero_arr = |a: &Option<Array1<f64>>| a.as_ref().map_or(true, |a| a.iter().all(|&v| v == 0.));
        self.coef == 0. && self.constant == 0. && zero_arr(&self.linear_term)
    }

    pub fn objective(&self, x: ArrayView1<f64>, mode: Mode) -> Evaluation {
        let resid = || match &self.center {
            Some(c) => &x - c,
            None => x.to_owned(),
        };
        Evaluation::build(
            mode,
            || {
                let mut v = self.constant;
                if self.coef != 0. {
                    let r = resid();
                    v += self.coef / 2. * r.dot(&r);
                }
                if let Some(l) = &self.linear_term {
                    v += l.dot(&x);
                }
                v
            },
            || {
                let mut g = if self.coef != 0. {
                    resid() * self.coef
                } else {
                    Array1::zeros(x.len())
                };
                if let Some(l) = &self.linear_term {
                    g += l;
                }
                g
            },
        )
    }

    /// Value of the quadratic at `x`
    pub fn value(&self, x: ArrayView1<f64>) -> f64 {
        self.objective(x, Mode::Func).value().unwrap_or(0.)
    }

    /// Fold the center into the linear term and the constant.
    #[must_use]
    pub fn collapsed(&self) -> IdentityQuadratic {
        match &self.center {
            Some(c) if self.coef != 0. => {
                let mut linear = c * (-self.coef);
                if let Some(l) = &self.linear_term {
                    linear += l;
                }
                IdentityQuadratic::new(
                    self.coef,
                    None,
                    Some(linear),
                    self.constant + self.coef / 2. * c.dot(c),
                )
            }
            _ => IdentityQuadratic::new(self.coef, None, self.linear_term.clone(), self.constant),
        }
    }

    /// Re-express the quadratic in the shifted variable `z = x + offset`.
    ///
    /// Returns the offset together with the collapsed quadratic in `z`, so
    /// that `q(x) = q'(x + offset)`.
    #[must_use]
    pub fn recenter(
        &self,
        offset: Option<&Array1<f64>>,
    ) -> (Option<Array1<f64>>, IdentityQuadratic) {
        let q = self.collapsed();
        let offset = match offset {
            None => return (None, q),
            Some(o) => o,
        };
        // q(z - a) = c/2 ||z||^2 + <l - c a, z> + c/2 ||a||^2 - <l, a> + k
        let mut linear = offset * (-q.coef);
        let mut constant = q.constant + q.coef / 2. * offset.dot(offset);
        if let Some(l) = &q.linear_term {
            linear += l;
            constant -= l.dot(offset);
        }
        (
            Some(offset.to_owned()),
            IdentityQuadratic::new(q.coef, None, Some(linear), constant),
        )
    }
}

fn add_opt(a: Option<Array1<f64>>, b: Option<Array1<f64>>) -> Option<Array1<f64>> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a + b),
        (a, None) => a,
        (None, b) => b,
    }
}

impl<'a> Add<&'a IdentityQuadratic> for &'a IdentityQuadratic {
    type Output = IdentityQuadratic;

    fn add(self, other: &'a IdentityQuadratic) -> IdentityQuadratic {
        let (a, b) = (self.collapsed(), other.collapsed());
        IdentityQuadratic::new(
            a.coef + b.coef,
            None,
            add_opt(a.linear_term, b.linear_term),
            a.constant + b.constant,
        )
    }
}

/// Offset and quadratic of the conjugate of `I_K(x + offset) + q(x)`.
///
/// Only valid when `q` has zero coefficient, i.e. `q(x) = <eta, x> + k`.
/// The conjugate is `I_{K°}(u - eta) - <u, offset> + <eta, offset> - k`,
/// which maps `(offset, eta, k)` to `(-eta, -offset, <eta, offset> - k)`.
/// Applying the rule twice gives back the input.
#[must_use]
pub fn work_out_conjugate(
    offset: Option<&Array1<f64>>,
    quadratic: &IdentityQuadratic,
) -> (Option<Array1<f64>>, IdentityQuadratic) {
    debug_assert!(quadratic.coef == 0.);
    let q = quadratic.collapsed();
    let mut constant = -q.constant;
    if let (Some(l), Some(o)) = (&q.linear_term, offset) {
        constant += l.dot(o);
    }
    let out_offset = q.linear_term.map(|l| -l);
    let linear = offset.map(|o| -o);
    (out_offset, IdentityQuadratic::new(0., None, linear, constant))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn sample() -> IdentityQuadratic {
        IdentityQuadratic::new(2., Some(array![1., -1., 0.5]), Some(array![0.3, 0.2, -0.4]), 1.5)
    }

    #[test]
    fn zero_is_neutral() {
        assert!(IdentityQuadratic::zero().is_zero());
        assert!(!sample().is_zero());
        let x = array![0.1, 0.2, 0.3];
        assert_abs_diff_eq!(IdentityQuadratic::zero().value(x.view()), 0.);
        let q = &sample() + &IdentityQuadratic::zero();
        assert_abs_diff_eq!(q.value(x.view()), sample().value(x.view()), epsilon = 1e-12);
    }

    #[test]
    fn objective_and_gradient() {
        let q = sample();
        let x = array![0., 1., 2.];
        // 2/2 * (1 + 4 + 2.25) + (0 + 0.2 - 0.8) + 1.5
        assert_abs_diff_eq!(q.value(x.view()), 7.25 - 0.6 + 1.5, epsilon = 1e-12);
        let g = q.objective(x.view(), Mode::Grad).into_grad().unwrap();
        assert_abs_diff_eq!(g, array![-2. + 0.3, 4. + 0.2, 3. - 0.4], epsilon = 1e-12);
    }

    #[test]
    fn collapse_preserves_values() {
        let q = sample();
        let c = q.collapsed();
        assert!(c.center.is_none());
        for x in &[array![0., 0., 0.], array![1., 2., 3.], array![-4., 0.5, 1.]] {
            assert_abs_diff_eq!(q.value(x.view()), c.value(x.view()), epsilon = 1e-12);
        }
    }

    #[test]
    fn sum_of_quadratics() {
        let p = IdentityQuadratic::prox_step(3., array![1., 1., 1.].view());
        let q = sample();
        let s = &p + &q;
        assert_abs_diff_eq!(s.coef, 5.);
        let x = array![0.5, -2., 4.];
        assert_abs_diff_eq!(
            s.value(x.view()),
            p.value(x.view()) + q.value(x.view()),
            epsilon = 1e-10
        );
    }

    #[test]
    fn recenter_shifts_variable() {
        let q = sample();
        let offset = array![0.7, -0.1, 2.];
        let (o, r) = q.recenter(Some(&offset));
        assert_eq!(o, Some(offset.clone()));
        let x = array![1., -3., 0.25];
        let z = &x + &offset;
        assert_abs_diff_eq!(q.value(x.view()), r.value(z.view()), epsilon = 1e-10);
    }

    #[test]
    fn conjugate_rule_is_an_involution() {
        let offset = array![1., 2., -1.];
        let q = IdentityQuadratic::new(0., None, Some(array![0.5, 0., -2.]), 0.75);
        let (o1, q1) = work_out_conjugate(Some(&offset), &q);
        let (o2, q2) = work_out_conjugate(o1.as_ref(), &q1);
        assert_eq!(o2, Some(offset));
        assert_abs_diff_eq!(q2.linear_term.unwrap(), q.linear_term.unwrap());
        assert_abs_diff_eq!(q2.constant, q.constant, epsilon = 1e-12);
    }
}
