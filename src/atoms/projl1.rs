//! Euclidean projection onto the epigraph of the $`\ell_1`$ norm
//!
//! ```math
//! \mathbf{epi}(\ell_1) = \{ (t, v) : \|v\|_1 \leq t \}
//! ```
//! The first entry of the input is the epigraph coordinate $`t`$.
//!
//! Outside the cone and its polar, the projection is
//! $`(t + \lambda, \mathrm{soft}(v, \lambda))`$ for the unique $`\lambda > 0`$ with
//! $`\sum_i (|v_i| - \lambda)_+ = t + \lambda`$. Sorting $`|v|`$ in decreasing order
//! turns this into a search over the number of active coordinates.

use ndarray::prelude::*;
use ndarray::NdFloat;
use num_traits::Float;

/// Projection of `x = (t, v)` onto $`\{ \|v\|_1 \leq t \}`$
pub fn proj_l1_epigraph<A: NdFloat>(x: ArrayView1<A>) -> Array1<A> {
    if x.is_empty() {
        return x.to_owned();
    }
    let t = x[0];
    let v = x.slice(s![1..]);

    let l1 = v.fold(A::zero(), |acc, &vi| acc + vi.abs());
    if l1 <= t {
        return x.to_owned();
    }
    // polar cone is { (s, w) : ||w||_inf <= -s }
    let linf = v.fold(A::zero(), |acc, &vi| Float::max(acc, vi.abs()));
    if linf <= -t {
        return Array1::zeros(x.len());
    }

    let mut mags: Vec<A> = v.iter().map(|vi| vi.abs()).collect();
    mags.sort_unstable_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));

    // with k active coordinates, lambda = (sum_{i<k} |v|_(i) - t) / (k + 1)
    let mut lambda = A::zero();
    let mut cumsum = A::zero();
    for (k, &m) in mags.iter().enumerate() {
        cumsum = cumsum + m;
        let candidate = (cumsum - t) / A::from(k + 2).unwrap_or_else(A::one);
        let next = mags.get(k + 1).copied().unwrap_or_else(A::zero);
        if candidate < m && candidate >= next {
            lambda = candidate;
            break;
        }
        lambda = candidate;
    }
    let lambda = Float::max(lambda, A::zero());

    let mut out = Array1::zeros(x.len());
    out[0] = t + lambda;
    for (o, &vi) in out.slice_mut(s![1..]).iter_mut().zip(v.iter()) {
        *o = vi.signum() * Float::max(vi.abs() - lambda, A::zero());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray_rand::rand::rngs::StdRng;
    use ndarray_rand::rand::SeedableRng;
    use ndarray_rand::rand_distr::Normal;
    use ndarray_rand::RandomExt;

    fn in_epigraph(x: &Array1<f64>) -> bool {
        x.slice(s![1..]).fold(0., |acc, v| acc + v.abs()) <= x[0] + 1e-10
    }

    #[test]
    fn inside_is_fixed() {
        let x = array![3., 1., -1., 0.5];
        assert_eq!(proj_l1_epigraph(x.view()), x);
    }

    #[test]
    fn polar_goes_to_zero() {
        let x = array![-3., 1., -2., 0.5];
        assert_eq!(proj_l1_epigraph(x.view()), Array1::zeros(4));
    }

    #[test]
    fn known_answer() {
        // |v| = (2, 2), t = 0: lambda = (4 - 0) / 3 = 4/3, result (4/3, 2/3, -2/3)
        let x = array![0., 2., -2.];
        let p = proj_l1_epigraph(x.view());
        assert_abs_diff_eq!(p, array![4. / 3., 2. / 3., -2. / 3.], epsilon = 1e-12);

        // only the largest coordinate is active: lambda = (5 - 1) / 2 = 2
        let x = array![1., 5., 0.5];
        let p = proj_l1_epigraph(x.view());
        assert_abs_diff_eq!(p, array![3., 3., 0.], epsilon = 1e-12);
    }

    #[test]
    fn optimality_conditions() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let x = Array1::random_using(6, Normal::new(0., 3.).unwrap(), &mut rng);
            let p = proj_l1_epigraph(x.view());
            assert!(in_epigraph(&p));
            // residual lies in the polar cone and is orthogonal to the projection
            let r = &x - &p;
            let rmax = r.slice(s![1..]).fold(0f64, |acc, v| acc.max(v.abs()));
            assert!(rmax <= -r[0] + 1e-9);
            assert_abs_diff_eq!(r.dot(&p), 0., epsilon = 1e-9);
            assert_abs_diff_eq!(proj_l1_epigraph(p.view()), p, epsilon = 1e-12);
        }
    }

    #[test]
    fn single_precision() {
        let x = array![0f32, 2., -2.];
        let p = proj_l1_epigraph(x.view());
        assert_abs_diff_eq!(p, array![4f32 / 3., 2. / 3., -2. / 3.], epsilon = 1e-6);
    }
}
