use exauq_doe::{Lhs, LhsKind, SamplingMethod};
use ndarray::{Array1, Array2, s};
use ndarray_rand::rand::SeedableRng;
use rand_xoshiro::Xoshiro256Plus;
use rayon::prelude::*;

pub(crate) struct CobylaParams {
    pub rhobeg: f64,
    pub ftol_rel: f64,
    pub maxeval: usize,
}

impl Default for CobylaParams {
    fn default() -> Self {
        CobylaParams {
            rhobeg: 0.5,
            ftol_rel: 1e-4,
            maxeval: 200,
        }
    }
}

/// Starting points of the likelihood optimization as a (n_start + 1, nx) matrix:
/// the given `x0` followed by `n_start` points spread over `bounds` with a maximin LHS.
pub(crate) fn prepare_multistart(
    n_start: usize,
    x0: &Array1<f64>,
    bounds: &[(f64, f64)],
    seed: Option<u64>,
) -> Array2<f64> {
    let mut starts = Array2::zeros((n_start + 1, x0.len()));
    starts.row_mut(0).assign(x0);

    if n_start > 0 {
        let xlimits = Array2::from_shape_fn((bounds.len(), 2), |(i, j)| {
            if j == 0 { bounds[i].0 } else { bounds[i].1 }
        });
        let rng = match seed {
            Some(seed) => Xoshiro256Plus::seed_from_u64(seed),
            None => Xoshiro256Plus::from_entropy(),
        };
        let spread = Lhs::new(&xlimits)
            .kind(LhsKind::Maximin)
            .with_rng(rng)
            .sample(n_start);
        starts.slice_mut(s![1.., ..]).assign(&spread);
    }
    starts
}

/// Minimize `objfn` with COBYLA from every row of `starts`, in parallel.
/// Returns the best (value, point) found, value is infinite when every run failed.
pub(crate) fn optimize_multistart<ObjF>(
    objfn: ObjF,
    starts: &Array2<f64>,
    bounds: &[(f64, f64)],
    cobyla: &CobylaParams,
) -> (f64, Array1<f64>)
where
    ObjF: Fn(&[f64]) -> f64 + Sync,
{
    (0..starts.nrows())
        .into_par_iter()
        .map(|i| optimize_params(&objfn, starts.row(i).to_vec(), bounds, cobyla))
        .reduce(
            || (f64::INFINITY, starts.row(0).to_owned()),
            |a, b| if b.0 < a.0 { b } else { a },
        )
}

/// Optimize gp hyper parameters given an initial guess and bounds with cobyla
pub(crate) fn optimize_params<ObjF>(
    objfn: &ObjF,
    param0: Vec<f64>,
    bounds: &[(f64, f64)],
    cobyla: &CobylaParams,
) -> (f64, Array1<f64>)
where
    ObjF: Fn(&[f64]) -> f64,
{
    use cobyla::{Func, StopTols, minimize};

    let cons: Vec<&dyn Func<()>> = vec![];
    match minimize(
        |x: &[f64], _: &mut ()| objfn(x),
        &param0,
        bounds,
        &cons,
        (),
        cobyla.maxeval,
        cobyla::RhoBeg::All(cobyla.rhobeg),
        Some(StopTols {
            ftol_rel: cobyla.ftol_rel,
            ..StopTols::default()
        }),
    ) {
        Ok((_, x_opt, fval)) => {
            let fval = if fval.is_nan() { f64::INFINITY } else { fval };
            (fval, Array1::from(x_opt))
        }
        Err((status, x_opt, _)) => {
            log::warn!("Cobyla optimizer failed in GP likelihood optimization, status={status:?}");
            (f64::INFINITY, Array1::from(x_opt))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_multistart_points_within_bounds() {
        let bounds = [(-2., 1.), (0., 3.)];
        let starts = prepare_multistart(5, &array![-1., 1.], &bounds, Some(42));
        assert_eq!(starts.shape(), &[6, 2]);
        assert_eq!(starts.row(0), array![-1., 1.]);
        for row in starts.rows() {
            assert!((-2. ..=1.).contains(&row[0]));
            assert!((0. ..=3.).contains(&row[1]));
        }
    }

    #[test]
    fn test_multistart_seeded() {
        let bounds = [(-2., 1.)];
        let s1 = prepare_multistart(4, &array![0.], &bounds, Some(3));
        let s2 = prepare_multistart(4, &array![0.], &bounds, Some(3));
        assert_eq!(s1, s2);
    }

    #[test]
    fn test_optimize_multistart_quadratic() {
        let objfn = |x: &[f64]| (x[0] - 0.5).powi(2) + (x[1] + 1.).powi(2);
        let bounds = [(-2., 2.), (-2., 2.)];
        let starts = prepare_multistart(3, &array![1.5, 1.5], &bounds, Some(0));
        let (fmin, xmin) = optimize_multistart(objfn, &starts, &bounds, &CobylaParams::default());
        assert_abs_diff_eq!(fmin, 0., epsilon = 1e-4);
        assert_abs_diff_eq!(xmin, array![0.5, -1.], epsilon = 1e-2);
    }
}
