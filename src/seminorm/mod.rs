//! Sums of penalty atoms sharing one primal variable
//!
//! A [`Seminorm`] represents
//! ```math
//! h(x) = \sum_i h_i(D_i x + \alpha_i)
//! ```
//! where each $`h_i`$ has a cheap projection onto the feasible set of its
//! conjugate. The proximal operator of the sum has no closed form, but its
//! dual at step $`1/L`$
//! ```math
//! \text{minimize}_u \ \frac12 \|L y - D^T u\|_2^2 + L \sum_i h_i^*(u_i)
//! ```
//! has a smooth part with Lipschitz gradient $`\|D^T D\|_2`$ and a
//! non-smooth part that separates over the atoms. [`Seminorm::primal_prox`]
//! solves it with [`Fista`](crate::prox::Fista) and maps the dual solution
//! back through $`x = y - D^T u / L`$.

mod dual;
mod layout;

pub use dual::{DualProblem, PrimalProblem};
pub use layout::{DualLayout, Segment};

use std::cell::RefCell;
use std::fmt;
use std::ops::Add;
use std::rc::Rc;

use log::{debug, trace};
use ndarray::prelude::*;
use ndarray_linalg::Norm;
use ndarray_rand::rand::rngs::StdRng;
use ndarray_rand::rand::{Rng, SeedableRng};
use ndarray_rand::rand_distr::StandardNormal;
use ndarray_rand::RandomExt;

use crate::atoms::SeminormAtom;
use crate::error::{Error, Result};
use crate::problem::{Evaluation, Mode};
use crate::prox::{solver_for, FitOptions, SolverKind};
use crate::shape::Shape;

/// Per-call settings of [`Seminorm::primal_prox_with_history`]
#[derive(Clone, Debug, PartialEq)]
pub struct ProxOptions {
    /// inner solver iteration cap
    pub max_its: usize,
    /// relative change of the dual objective at which the inner solver stops
    pub tol: f64,
}

impl Default for ProxOptions {
    fn default() -> Self {
        ProxOptions {
            max_its: 5000,
            tol: 1e-14,
        }
    }
}

/// Settings of a [`Seminorm`]
#[derive(Clone, Debug, PartialEq)]
pub struct SeminormConfig {
    /// power iteration cap for the Lipschitz estimate
    pub power_max_its: usize,
    /// relative change at which the power iteration stops
    pub power_tol: f64,
    /// the power iteration estimate is multiplied by this before use
    pub lipschitz_inflation: f64,
    /// inner solver settings used by [`Seminorm::primal_prox`]
    pub prox: ProxOptions,
    /// iterations before the inner stopping rule is checked
    pub min_its: usize,
    pub solver: SolverKind,
    /// seed of the random starting points; drawn from the OS when `None`
    pub seed: Option<u64>,
}

impl Default for SeminormConfig {
    fn default() -> Self {
        SeminormConfig {
            power_max_its: 50,
            power_tol: 1e-5,
            lipschitz_inflation: 1.1,
            prox: ProxOptions::default(),
            min_its: 5,
            solver: SolverKind::Fista,
            seed: None,
        }
    }
}

/// Inner solver state kept between calls of [`Seminorm::primal_prox`]
#[derive(Clone, Debug)]
struct DualCache {
    lipschitz: f64,
    coefs: Array1<f64>,
}

/// A sum of [`SeminormAtom`]s over one primal variable
///
/// Atom order fixes the order of the dual segments. Adding two seminorms
/// concatenates their atoms, left operand first.
pub struct Seminorm {
    atoms: Vec<Rc<dyn SeminormAtom>>,
    primal_shape: Shape,
    layout: DualLayout,
    config: SeminormConfig,
    rng: RefCell<StdRng>,
    cache: RefCell<Option<DualCache>>,
}

fn seeded(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

impl Seminorm {
    /// Combine `atoms`, which must agree on the primal shape.
    pub fn new(atoms: Vec<Rc<dyn SeminormAtom>>) -> Result<Seminorm> {
        Seminorm::with_config(atoms, SeminormConfig::default())
    }

    pub fn with_config(atoms: Vec<Rc<dyn SeminormAtom>>, config: SeminormConfig) -> Result<Seminorm> {
        let primal_shape = match atoms.first() {
            Some(atom) => atom.primal_shape(),
            None => return Err(Error::Empty),
        };
        for atom in &atoms[1..] {
            let got = atom.primal_shape();
            if got != primal_shape {
                return Err(Error::ShapeMismatch {
                    expected: primal_shape,
                    got,
                });
            }
        }
        let layout = DualLayout::from_shapes(atoms.iter().map(|a| a.dual_shape()));
        let rng = RefCell::new(seeded(config.seed));
        Ok(Seminorm {
            atoms,
            primal_shape,
            layout,
            config,
            rng,
            cache: RefCell::new(None),
        })
    }

    /// A seminorm with a single atom
    pub fn single<A: SeminormAtom + 'static>(atom: A) -> Result<Seminorm> {
        Seminorm::new(vec![Rc::new(atom)])
    }

    /// Append `atom`; its dual segment goes last.
    pub fn push<A: SeminormAtom + 'static>(&mut self, atom: A) -> Result<()> {
        let got = atom.primal_shape();
        if got != self.primal_shape {
            return Err(Error::ShapeMismatch {
                expected: self.primal_shape.clone(),
                got,
            });
        }
        self.atoms.push(Rc::new(atom));
        self.layout = DualLayout::from_shapes(self.atoms.iter().map(|a| a.dual_shape()));
        self.cache.replace(None);
        Ok(())
    }

    #[must_use]
    pub fn atoms(&self) -> &[Rc<dyn SeminormAtom>] {
        &self.atoms
    }

    #[must_use]
    pub fn primal_shape(&self) -> &Shape {
        &self.primal_shape
    }

    #[must_use]
    pub fn layout(&self) -> &DualLayout {
        &self.layout
    }

    #[must_use]
    pub fn config(&self) -> &SeminormConfig {
        &self.config
    }

    /// $`\sum_i h_i(D_i x + \alpha_i)`$
    pub fn evaluate_seminorm(&self, x: ArrayView1<f64>) -> f64 {
        self.atoms.iter().map(|a| a.evaluate_seminorm(x)).sum()
    }

    /// Indicator of the dual feasible set, summed over the segments of `u`
    pub fn evaluate_dual_constraint(&self, u: ArrayView1<f64>) -> f64 {
        self.atoms
            .iter()
            .enumerate()
            .map(|(i, a)| a.evaluate_dual_constraint(self.layout.segment(u, i)))
            .sum()
    }

    /// Projection onto the dual feasible set, one segment at a time
    pub fn dual_prox(&self, u: ArrayView1<f64>, lipschitz: f64) -> Array1<f64> {
        let mut v = Array1::zeros(self.layout.total_len());
        for (i, atom) in self.atoms.iter().enumerate() {
            let seg = atom.dual_prox(self.layout.segment(u, i), lipschitz);
            self.layout.segment_mut(v.view_mut(), i).assign(&seg);
        }
        v
    }

    /// Power iteration for $`\|D^T D\|_2`$ where _D_ stacks the linear maps
    /// of all atoms.
    pub fn power_ld(&self, max_its: usize, tol: f64) -> f64 {
        let mut rng = self.rng.borrow_mut();
        self.power_ld_using(max_its, tol, &mut *rng)
    }

    /// [`Seminorm::power_ld`] starting from a draw of `rng`
    pub fn power_ld_using<R: Rng + ?Sized>(&self, max_its: usize, tol: f64, rng: &mut R) -> f64 {
        let mut v: Array1<f64> = Array::random_using(self.primal_shape.size(), StandardNormal, rng);
        let start = v.norm_l2();
        if start > 0. {
            v /= start;
        }

        let mut old_norm: f64 = 0.;
        let mut norm: f64 = 1.;
        let mut its = 0;
        while (norm - old_norm).abs() / norm > tol && its < max_its {
            let mut w = Array1::zeros(v.len());
            for atom in &self.atoms {
                let z = atom.linear_map(v.view());
                w += &atom.adjoint_map(z.view());
            }
            old_norm = norm;
            norm = w.norm_l2();
            its += 1;
            trace!("power iteration {}: L = {:e}", its, norm);
            if norm == 0. {
                break;
            }
            v = w / norm;
        }
        debug!("Lipschitz estimate {:e} after {} power iterations", norm, its);
        norm
    }

    /// $`x = y - \sum_i D_i^T u_i`$
    pub fn primal_from_dual(&self, y: ArrayView1<f64>, u: ArrayView1<f64>) -> Array1<f64> {
        let mut x = y.to_owned();
        for (i, atom) in self.atoms.iter().enumerate() {
            x -= &atom.adjoint_map(self.layout.segment(u, i));
        }
        x
    }

    /// Smooth part of the dual objective at `v` for prox center `center`
    /// and primal step `1 / lipschitz`
    ///
    /// The value is $`\frac12\|r\|^2 + L \sum_i h_i^*(v_i)`$ with residual
    /// $`r = \mathrm{center} - D^T v`$; the gradient on segment _i_ is
    /// $`-(D_i r + L \alpha_i)`$. The center is $`L y`$ for the prox at _y_.
    pub fn dual_smooth_eval(
        &self,
        center: ArrayView1<f64>,
        lipschitz: f64,
        v: ArrayView1<f64>,
        mode: Mode,
    ) -> Evaluation {
        let residual = self.primal_from_dual(center, v);
        Evaluation::build(
            mode,
            || {
                let affine: f64 = self
                    .atoms
                    .iter()
                    .enumerate()
                    .map(|(i, a)| a.affine_objective(self.layout.segment(v, i)))
                    .sum();
                residual.dot(&residual) / 2. + lipschitz * affine
            },
            || {
                // D r + L alpha = L (D (r / L) + alpha)
                let scaled = &residual / lipschitz;
                let mut g = Array1::zeros(self.layout.total_len());
                for (i, atom) in self.atoms.iter().enumerate() {
                    let seg = atom.affine_map(scaled.view()) * (-lipschitz);
                    self.layout.segment_mut(g.view_mut(), i).assign(&seg);
                }
                g
            },
        )
    }

    /// Dual of the proximal problem at `y` with step `1 / lipschitz`
    ///
    /// The dual is centered at `lipschitz * y`. Without `initial`, the solver
    /// starts from a Gaussian draw projected onto the dual feasible set.
    pub fn dual_problem(
        &self,
        y: ArrayView1<f64>,
        lipschitz: f64,
        initial: Option<Array1<f64>>,
    ) -> DualProblem<'_> {
        let mut rng = self.rng.borrow_mut();
        self.dual_problem_using(y, lipschitz, initial, &mut *rng)
    }

    pub fn dual_problem_using<R: Rng + ?Sized>(
        &self,
        y: ArrayView1<f64>,
        lipschitz: f64,
        initial: Option<Array1<f64>>,
        rng: &mut R,
    ) -> DualProblem<'_> {
        let initial = initial.unwrap_or_else(|| self.random_dual(rng));
        DualProblem::new(self, &y * lipschitz, lipschitz, initial)
    }

    fn random_dual<R: Rng + ?Sized>(&self, rng: &mut R) -> Array1<f64> {
        let pieces: Vec<Array1<f64>> = self
            .layout
            .segments()
            .iter()
            .map(|seg| Array::random_using(seg.len, StandardNormal, &mut *rng))
            .collect();
        self.dual_prox(self.layout.pack(&pieces).view(), 1.)
    }

    /// Proximal operator of the seminorm with step `1 / lipschitz`,
    /// $`\mathrm{arg}\!\min_x \frac{L}{2}\|x - y\|^2 + h(x)`$
    pub fn primal_prox(&self, y: ArrayView1<f64>, lipschitz: f64) -> Array1<f64> {
        self.primal_prox_with_history(y, lipschitz, &self.config.prox).0
    }

    /// [`Seminorm::primal_prox`] with explicit inner solver settings, also
    /// returning the dual objective history.
    ///
    /// The dual Lipschitz constant and the last dual solution are kept and
    /// reused by later calls until the atoms change.
    pub fn primal_prox_with_history(
        &self,
        y: ArrayView1<f64>,
        lipschitz: f64,
        opts: &ProxOptions,
    ) -> (Array1<f64>, Vec<f64>) {
        let cached = self.cache.borrow_mut().take();
        let cache = match cached {
            Some(cache) => cache,
            None => self.build_cache(),
        };

        let problem = DualProblem::new(self, &y * lipschitz, lipschitz, cache.coefs);
        let mut solver = solver_for(self.config.solver, &problem, cache.lipschitz);
        let history = solver.fit(&FitOptions {
            max_its: opts.max_its,
            min_its: self.config.min_its,
            tol: opts.tol,
            backtrack: false,
        });
        let coefs = solver.coefs().to_owned();

        let x = problem.primal(coefs.view());
        self.cache.replace(Some(DualCache {
            lipschitz: cache.lipschitz,
            coefs,
        }));
        (x, history)
    }

    fn build_cache(&self) -> DualCache {
        let estimate = self.power_ld(self.config.power_max_its, self.config.power_tol);
        let lipschitz = if estimate > 0. {
            self.config.lipschitz_inflation * estimate
        } else {
            1.
        };
        let coefs = self.random_dual(&mut *self.rng.borrow_mut());
        debug!(
            "new dual solver state: {} atoms, {} dual coefficients, L = {:e}",
            self.atoms.len(),
            coefs.len(),
            lipschitz
        );
        DualCache { lipschitz, coefs }
    }

    /// `multiplier * smooth(x) + self(x)` as a problem for the proximal solvers
    ///
    /// Without `initial`, starts from a Gaussian draw. Fails with
    /// [`Error::InfeasibleInitialPoint`] if the objective is infinite there.
    pub fn primal_problem<F>(
        &self,
        smooth: F,
        multiplier: f64,
        initial: Option<Array1<f64>>,
    ) -> Result<PrimalProblem<'_, F>>
    where
        F: Fn(ArrayView1<f64>, Mode) -> Evaluation,
    {
        let initial = match initial {
            Some(x) => x,
            None => Array::random_using(
                self.primal_shape.size(),
                StandardNormal,
                &mut *self.rng.borrow_mut(),
            ),
        };
        let f = smooth(initial.view(), Mode::Func).value().unwrap_or(0.);
        if !(f + self.evaluate_seminorm(initial.view())).is_finite() {
            return Err(Error::InfeasibleInitialPoint);
        }
        Ok(PrimalProblem::new(self, smooth, multiplier, initial))
    }
}

impl fmt::Debug for Seminorm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Seminorm")
            .field("atoms", &self.atoms)
            .field("primal_shape", &self.primal_shape)
            .field("layout", &self.layout)
            .field("config", &self.config)
            .finish()
    }
}

impl<'a, 'b> Add<&'b Seminorm> for &'a Seminorm {
    type Output = Result<Seminorm>;

    fn add(self, other: &'b Seminorm) -> Result<Seminorm> {
        let atoms = self.atoms.iter().chain(other.atoms.iter()).cloned().collect();
        Seminorm::with_config(atoms, self.config.clone())
    }
}

impl Add for Seminorm {
    type Output = Result<Seminorm>;

    fn add(self, other: Seminorm) -> Result<Seminorm> {
        &self + &other
    }
}


#[cfg(all(rustc_nightly, test))]
mod benches {
    use super::*;
    use crate::atoms::L1Norm;
    use crate::linop::LinearTransform;
    use test::Bencher;

    #[allow(non_snake_case)]
    #[bench]
    fn fused_lasso_prox(b: &mut Bencher) {
        let n = 100;
        let mut D = Array2::zeros((n - 1, n));
        for i in 0..n - 1 {
            D[[i, i]] = -1.;
            D[[i, i + 1]] = 1.;
        }
        let config = SeminormConfig {
            seed: Some(0),
            ..SeminormConfig::default()
        };
        let sn = Seminorm::with_config(
            vec![
                Rc::new(L1Norm::new(1., LinearTransform::identity(n)).unwrap()),
                Rc::new(L1Norm::new(2., D.into()).unwrap()),
            ],
            config,
        )
        .unwrap();
        let y = Array1::linspace(-5., 5., n);
        b.iter(|| sn.primal_prox(y.view(), 1.));
    }
}
