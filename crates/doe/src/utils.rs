use linfa::Float;
use ndarray::{Array1, ArrayBase, ArrayView1, Data, Ix2, Zip};
use rayon::prelude::*;

/// Squared euclidean distance between two points
pub(crate) fn squared_distance<F: Float>(a: ArrayView1<F>, b: ArrayView1<F>) -> F {
    Zip::from(&a)
        .and(&b)
        .fold(F::zero(), |acc, &u, &v| acc + (u - v) * (u - v))
}

/// Euclidean distances between every pair of rows `(i, j)` with `i < j` of a `(n, nx)` matrix.
///
/// Distances are returned in row-major pair order: (0, 1), (0, 2), ..., (1, 2), ...
pub fn pdist<F: Float>(x: &ArrayBase<impl Data<Elem = F> + Sync, Ix2>) -> Array1<F> {
    let n = x.nrows();
    let pairs: Vec<(usize, usize)> = (0..n)
        .flat_map(|i| ((i + 1)..n).map(move |j| (i, j)))
        .collect();

    let distances: Vec<F> = pairs
        .par_iter()
        .map(|&(i, j)| squared_distance(x.row(i), x.row(j)).sqrt())
        .collect();

    Array1::from_vec(distances)
}
