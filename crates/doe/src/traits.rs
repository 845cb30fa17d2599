use linfa::Float;
use ndarray::Array2;

/// A way of drawing a design of experiments in a box-shaped sample space.
///
/// The sample space is `[lower_1, upper_1] x ... x [lower_nx, upper_nx]`, stored as a
/// `(nx, 2)` matrix. Implementors only produce points of the unit hypercube,
/// the scaling onto the sample space is shared.
pub trait SamplingMethod<F: Float> {
    /// Bounds of the sample space as a `(nx, 2)` matrix of `[lower, upper]` rows.
    fn sampling_space(&self) -> &Array2<F>;

    /// Draws `ns` samples of the unit hypercube `[0, 1]^nx` as a `(ns, nx)` matrix.
    fn normalized_sample(&self, ns: usize) -> Array2<F>;

    /// Draws `ns` samples of the sample space as a `(ns, nx)` matrix.
    ///
    /// Each normalized coordinate `t` is mapped to `lower + t * (upper - lower)`.
    fn sample(&self, ns: usize) -> Array2<F> {
        let xlimits = self.sampling_space();
        let lower = xlimits.column(0);
        let width = &xlimits.column(1) - &lower;
        self.normalized_sample(ns) * width + lower
    }
}
