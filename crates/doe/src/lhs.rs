use crate::SamplingMethod;
use crate::utils::{pdist, squared_distance};
use linfa::Float;
use ndarray::{Array1, Array2, ArrayBase, Data, Ix2};
use ndarray_rand::{
    RandomExt, rand::Rng, rand::SeedableRng, rand::seq::SliceRandom, rand_distr::Uniform,
};
use ndarray_stats::QuantileExt;
use rand_xoshiro::Xoshiro256Plus;
use std::cmp;
use std::sync::{Arc, PoisonError, RwLock};

#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};

/// Exponent of the phi_p space-filling criterion minimized by the ESE algorithm
const ESE_PHIP_EXPONENT: f64 = 10.;
/// Number of candidate designs built at each ESE inner iteration
const ESE_N_CANDIDATES: usize = 20;
/// Number of random designs drawn by maximin kinds, the best one is kept
const MAXIMIN_N_DRAWS: usize = 5;

/// Kinds of Latin Hypercube Design
#[derive(Clone, Debug, Default, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub enum LhsKind {
    /// sample is drawn uniformly within its stratum
    Classic,
    /// sample is the middle of its stratum
    Centered,
    /// best of several classic designs wrt the minimal distance between points
    Maximin,
    /// best of several centered designs wrt the minimal distance between points
    CenteredMaximin,
    /// classic design improved by the Enhanced Stochastic Evolutionary algorithm (ESE)
    /// See Jin, R. and Chen, W. and Sudjianto, A. (2005), “An efficient algorithm for constructing
    /// optimal design of computer experiments.” Journal of Statistical Planning and Inference, 134:268-287.
    #[default]
    Optimized,
}

type RngRef<R> = Arc<RwLock<R>>;

/// Latin hypercube design: each component range is divided into `ns` strata of equal width,
/// `ns` being the number of samples, and every stratum of every component holds exactly one sample.
///
/// How a sample is placed within its stratum depends on the [LhsKind].
/// Clones share the same random generator, hence successive samplings always differ.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct Lhs<F: Float, R: Rng> {
    /// Sampling space as a (nx, 2) matrix, ith row is [lower_bound, upper_bound] of xi
    xlimits: Array2<F>,
    kind: LhsKind,
    rng: RngRef<R>,
}

impl<F: Float> Lhs<F, Xoshiro256Plus> {
    /// Constructor given a sampling space as a (nx, 2) matrix \[\[lower bound, upper bound\], ...\]
    /// using a random generator seeded from entropy.
    ///
    /// ```
    /// use exauq_doe::Lhs;
    /// use ndarray::arr2;
    ///
    /// let doe = Lhs::new(&arr2(&[[0.0, 1.0], [5.0, 10.0]]));
    /// ```
    pub fn new(xlimits: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Self {
        Self::new_with_rng(xlimits, Xoshiro256Plus::from_entropy())
    }
}

impl<F: Float, R: Rng> SamplingMethod<F> for Lhs<F, R> {
    fn sampling_space(&self) -> &Array2<F> {
        &self.xlimits
    }

    fn normalized_sample(&self, ns: usize) -> Array2<F> {
        match self.kind {
            LhsKind::Classic => self.classic(ns),
            LhsKind::Centered => self.centered(ns),
            LhsKind::Maximin => self.maximin(ns, false),
            LhsKind::CenteredMaximin => self.maximin(ns, true),
            LhsKind::Optimized => {
                let nx = self.xlimits.nrows();
                let outer_loop = cmp::min((1.5 * nx as f64) as usize, 30);
                let inner_loop = cmp::min(20 * nx, 100);
                self.ese(self.classic(ns), outer_loop, inner_loop)
            }
        }
    }
}

impl<F: Float, R: Rng> Lhs<F, R> {
    /// Constructor with given sampling space and random generator.
    /// * `xlimits`: (nx, 2) matrix where nx is the dimension of the samples and the ith row
    ///   is the definition interval of the ith component of x.
    /// * `rng`: random generator, used by every kind (strata shuffling)
    ///
    /// **Panics** if `xlimits` does not have 2 columns.
    pub fn new_with_rng(xlimits: &ArrayBase<impl Data<Elem = F>, Ix2>, rng: R) -> Self {
        assert_eq!(xlimits.ncols(), 2, "xlimits must have 2 columns (lower, upper)");
        Lhs {
            xlimits: xlimits.to_owned(),
            kind: LhsKind::default(),
            rng: Arc::new(RwLock::new(rng)),
        }
    }

    /// Sets the kind of LHS
    pub fn kind(mut self, kind: LhsKind) -> Self {
        self.kind = kind;
        self
    }

    /// Sets the random generator
    pub fn with_rng<R2: Rng>(self, rng: R2) -> Lhs<F, R2> {
        Lhs {
            xlimits: self.xlimits,
            kind: self.kind,
            rng: Arc::new(RwLock::new(rng)),
        }
    }

    /// Places one sample per stratum at `(k + offset(i, j)) / ns` and shuffles
    /// the strata independently for each component.
    fn stratified(&self, ns: usize, jittered: bool) -> Array2<F> {
        let nx = self.xlimits.nrows();
        let mut rng = self.rng.write().unwrap_or_else(PoisonError::into_inner);
        let offsets = if jittered {
            Array2::random_using((ns, nx), Uniform::new(0., 1.), &mut *rng)
        } else {
            Array2::from_elem((ns, nx), 0.5)
        };

        let width = 1. / ns as f64;
        let mut strata: Vec<usize> = (0..ns).collect();
        let mut doe = Array2::zeros((ns, nx));
        for (j, mut column) in doe.columns_mut().into_iter().enumerate() {
            strata.shuffle(&mut *rng);
            for (i, k) in strata.iter().enumerate() {
                column[i] = F::cast((*k as f64 + offsets[[i, j]]) * width);
            }
        }
        doe
    }

    fn classic(&self, ns: usize) -> Array2<F> {
        self.stratified(ns, true)
    }

    fn centered(&self, ns: usize) -> Array2<F> {
        self.stratified(ns, false)
    }

    fn maximin(&self, ns: usize, centered: bool) -> Array2<F> {
        let draw = || {
            if centered {
                self.centered(ns)
            } else {
                self.classic(ns)
            }
        };
        let mut best = draw();
        if ns < 2 {
            return best;
        }
        let mut best_dist = min_distance(&best);
        for _ in 1..MAXIMIN_N_DRAWS {
            let doe = draw();
            let dist = min_distance(&doe);
            if dist > best_dist {
                best_dist = dist;
                best = doe;
            }
        }
        best
    }

    /// Enhanced Stochastic Evolutionary optimization of a design wrt the phi_p criterion.
    /// Candidate designs are obtained by swapping two elements of one column,
    /// which keeps the latin hypercube structure.
    fn ese(&self, doe: Array2<F>, outer_loop: usize, inner_loop: usize) -> Array2<F> {
        if doe.nrows() < 2 || doe.ncols() == 0 {
            return doe;
        }
        let nx = doe.ncols();
        let p = F::cast(ESE_PHIP_EXPONENT);
        let tol = F::cast(1e-3);

        let mut phip_current = phip(&doe, p);
        let mut threshold = F::cast(0.005) * phip_current;
        let mut best = doe.to_owned();
        let mut phip_best = phip_current;
        let mut current = doe;

        for _ in 0..outer_loop {
            let mut n_accepted = 0usize;
            let mut n_improved = 0usize;

            for i in 0..inner_loop {
                let column = (i + 1) % nx;
                let mut rng = self.rng.write().unwrap_or_else(PoisonError::into_inner);

                let mut candidates = Vec::with_capacity(ESE_N_CANDIDATES);
                let mut candidate_phips = Array1::<F>::zeros(ESE_N_CANDIDATES);
                for phip_c in candidate_phips.iter_mut() {
                    let mut candidate = current.to_owned();
                    *phip_c = swap_in_column(&mut candidate, column, phip_current, p, &mut *rng);
                    candidates.push(candidate);
                }
                let Ok(k) = candidate_phips.argmin() else {
                    continue;
                };

                let phip_try = candidate_phips[k];
                if phip_try - phip_current <= threshold * F::cast(rng.r#gen::<f64>()) {
                    phip_current = phip_try;
                    current = candidates.swap_remove(k);
                    n_accepted += 1;

                    if phip_current < phip_best {
                        best = current.to_owned();
                        phip_best = phip_current;
                        n_improved += 1;
                    }
                }
            }

            let p_accept = n_accepted as f64 / inner_loop as f64;
            let p_improve = n_improved as f64 / inner_loop as f64;
            if phip_current - phip_best > tol {
                if p_accept >= 0.1 && p_improve < p_accept {
                    threshold *= F::cast(0.8);
                } else if !(p_accept >= 0.1 && (p_improve - p_accept).abs() < f64::EPSILON) {
                    threshold /= F::cast(0.8);
                }
            } else if p_accept <= 0.1 {
                threshold /= F::cast(0.7);
            } else {
                threshold *= F::cast(0.9);
            }
        }
        best
    }
}

fn min_distance<F: Float>(doe: &Array2<F>) -> F {
    pdist(doe).fold(F::infinity(), |acc, &d| acc.min(d))
}

/// phi_p = (sum_{i<j} d_ij^-p)^(1/p), smaller is better spread
fn phip<F: Float>(doe: &Array2<F>, p: F) -> F {
    pdist(doe).mapv(|d| d.powf(-p)).sum().powf(F::one() / p)
}

/// Swaps the `column` components of two distinct random rows of `doe` and returns
/// the updated phi_p criterion, computed incrementally from the current value `phip`:
/// only the distances from the two swapped rows to the others change.
fn swap_in_column<F: Float, R: Rng + ?Sized>(
    doe: &mut Array2<F>,
    column: usize,
    phip: F,
    p: F,
    rng: &mut R,
) -> F {
    let n = doe.nrows();
    let i1 = rng.gen_range(0..n);
    let mut i2 = rng.gen_range(0..n);
    while i2 == i1 {
        i2 = rng.gen_range(0..n);
    }

    let half_p = p / F::cast(2.);
    let (a1, a2) = (doe[[i1, column]], doe[[i2, column]]);
    let mut delta = F::zero();
    for r in (0..n).filter(|&r| r != i1 && r != i2) {
        let b = doe[[r, column]];
        let (c1, c2) = ((a1 - b) * (a1 - b), (a2 - b) * (a2 - b));
        let d1 = squared_distance(doe.row(i1), doe.row(r));
        let d2 = squared_distance(doe.row(i2), doe.row(r));
        delta += (d1 - c1 + c2).powf(-half_p) - d1.powf(-half_p);
        delta += (d2 - c2 + c1).powf(-half_p) - d2.powf(-half_p);
    }

    doe.swap([i1, column], [i2, column]);
    (phip.powf(p) + delta).powf(F::one() / p)
}
