use linfa::Float;
use ndarray::{Array1, Array2, ArrayBase, Axis, Data, Ix2, Zip};
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};

/// A (n, nx) matrix standardized column-wise along with the mean and
/// standard deviation used to do it.
///
/// Constant columns get a unit standard deviation.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct NormalizedData<F: Float> {
    /// normalized data
    pub data: Array2<F>,
    /// mean vector computed from data
    pub mean: Array1<F>,
    /// standard deviation vector computed from data
    pub std: Array1<F>,
}

impl<F: Float> NormalizedData<F> {
    /// Constructor
    pub fn new(x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> NormalizedData<F> {
        let mean = x
            .mean_axis(Axis(0))
            .unwrap_or_else(|| Array1::zeros(x.ncols()));
        let ddof = if x.nrows() > 1 { F::one() } else { F::zero() };
        let std = x
            .std_axis(Axis(0), ddof)
            .mapv(|v| if v > F::zero() { v } else { F::one() });
        let data = (x - &mean) / &std;
        NormalizedData { data, mean, std }
    }

    /// Dimension of data points
    pub fn ncols(&self) -> usize {
        self.data.ncols()
    }

    /// Normalize other points with the mean and deviation of this data
    pub fn normalize(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Array2<F> {
        (x - &self.mean) / &self.std
    }

    /// Map normalized points back to the original scale
    pub fn denormalize(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Array2<F> {
        x * &self.std + &self.mean
    }
}

/// Componentwise absolute differences between every pair of distinct rows of a
/// (n_obs, nx) matrix, used to build the correlation matrix.
#[derive(Debug)]
pub struct DiffMatrix<F: Float> {
    /// Differences as (n_obs * (n_obs-1))/2, nx) array
    pub d: Array2<F>,
    /// Row indices (i, j), i < j, of each difference in the original data array
    pub d_indices: Array2<usize>,
    /// Number of observations
    pub n_obs: usize,
}

impl<F: Float> DiffMatrix<F> {
    /// Compute differences given points given as an array (n_obs, nx)
    pub fn new(x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> DiffMatrix<F> {
        let n_obs = x.nrows();
        let n_pairs = n_obs * n_obs.saturating_sub(1) / 2;
        let mut d = Array2::zeros((n_pairs, x.ncols()));
        let mut d_indices = Array2::<usize>::zeros((n_pairs, 2));

        let pairs = (0..n_obs).flat_map(|i| ((i + 1)..n_obs).map(move |j| (i, j)));
        for (r, (i, j)) in pairs.enumerate() {
            Zip::from(d.row_mut(r))
                .and(x.row(i))
                .and(x.row(j))
                .for_each(|dk, &a, &b| *dk = (a - b).abs());
            d_indices[[r, 0]] = i;
            d_indices[[r, 1]] = j;
        }

        DiffMatrix {
            d,
            d_indices,
            n_obs,
        }
    }
}
