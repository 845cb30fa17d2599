//! Correlation models (kernels) for the error term of the GP.
//!
//! All models are stationary products over input components of a one dimensional
//! correlation of `theta_j * |x_j - x'_j|`, `theta` being the inverse of the
//! correlation lengths in normalized input units:
//! * squared exponential,
//! * absolute exponential,
//! * matern 3/2,
//! * matern 5/2.

use linfa::Float;
use ndarray::{Array1, Array2, ArrayBase, Axis, Data, Ix1, Ix2};
use paste::paste;
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};
use std::convert::TryFrom;
use std::fmt;

/// A trait for using a correlation model in GP regression
pub trait CorrelationModel<F: Float>: Clone + Copy + Default + fmt::Display + Sync {
    /// Compute correlation values r(x, x') given componentwise differences `d` (n, nx)
    /// between points x and x' and `theta` (nx,) parameters.
    /// Returns a (n, 1) column.
    fn value(
        &self,
        d: &ArrayBase<impl Data<Elem = F>, Ix2>,
        theta: &ArrayBase<impl Data<Elem = F>, Ix1>,
    ) -> Array2<F>;
}

/// `theta_j * |d_ij|`
fn scaled_distances<F: Float>(
    d: &ArrayBase<impl Data<Elem = F>, Ix2>,
    theta: &ArrayBase<impl Data<Elem = F>, Ix1>,
) -> Array2<F> {
    d.mapv(|v| v.abs()) * theta
}

fn as_column<F: Float>(r: Array1<F>) -> Array2<F> {
    r.insert_axis(Axis(1))
}

/// Squared exponential correlation models
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "serializable",
    derive(Serialize, Deserialize),
    serde(into = "String"),
    serde(try_from = "String")
)]
pub struct SquaredExponentialCorr();

impl<F: Float> CorrelationModel<F> for SquaredExponentialCorr {
    /// exp( - sum_j (theta_j * d_j)^2 / 2 )
    fn value(
        &self,
        d: &ArrayBase<impl Data<Elem = F>, Ix2>,
        theta: &ArrayBase<impl Data<Elem = F>, Ix1>,
    ) -> Array2<F> {
        let half = F::cast(0.5);
        let r = scaled_distances(d, theta)
            .mapv(|v| v * v)
            .sum_axis(Axis(1))
            .mapv(|s| F::exp(-half * s));
        as_column(r)
    }
}

/// Absolute exponential correlation models
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "serializable",
    derive(Serialize, Deserialize),
    serde(into = "String"),
    serde(try_from = "String")
)]
pub struct AbsoluteExponentialCorr();

impl<F: Float> CorrelationModel<F> for AbsoluteExponentialCorr {
    /// exp( - sum_j theta_j * |d_j| )
    fn value(
        &self,
        d: &ArrayBase<impl Data<Elem = F>, Ix2>,
        theta: &ArrayBase<impl Data<Elem = F>, Ix1>,
    ) -> Array2<F> {
        let r = scaled_distances(d, theta)
            .sum_axis(Axis(1))
            .mapv(|s| F::exp(-s));
        as_column(r)
    }
}

/// Matern 3/2 correlation model
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "serializable",
    derive(Serialize, Deserialize),
    serde(into = "String"),
    serde(try_from = "String")
)]
pub struct Matern32Corr();

impl<F: Float> CorrelationModel<F> for Matern32Corr {
    /// prod_j (1 + sqrt(3) * theta_j * |d_j|) * exp( - sqrt(3) * sum_j theta_j * |d_j| )
    fn value(
        &self,
        d: &ArrayBase<impl Data<Elem = F>, Ix2>,
        theta: &ArrayBase<impl Data<Elem = F>, Ix1>,
    ) -> Array2<F> {
        let sqrt3 = F::cast(3.).sqrt();
        let scaled = scaled_distances(d, theta);
        let poly = scaled
            .mapv(|v| F::one() + sqrt3 * v)
            .map_axis(Axis(1), |row| row.product());
        let decay = scaled.sum_axis(Axis(1)).mapv(|s| F::exp(-sqrt3 * s));
        as_column(poly * decay)
    }
}

/// Matern 5/2 correlation model
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "serializable",
    derive(Serialize, Deserialize),
    serde(into = "String"),
    serde(try_from = "String")
)]
pub struct Matern52Corr();

impl<F: Float> CorrelationModel<F> for Matern52Corr {
    /// prod_j (1 + sqrt(5) * theta_j * |d_j| + 5/3 * (theta_j * d_j)^2) * exp( - sqrt(5) * sum_j theta_j * |d_j| )
    fn value(
        &self,
        d: &ArrayBase<impl Data<Elem = F>, Ix2>,
        theta: &ArrayBase<impl Data<Elem = F>, Ix1>,
    ) -> Array2<F> {
        let sqrt5 = F::cast(5.).sqrt();
        let five_thirds = F::cast(5. / 3.);
        let scaled = scaled_distances(d, theta);
        let poly = scaled
            .mapv(|v| F::one() + sqrt5 * v + five_thirds * v * v)
            .map_axis(Axis(1), |row| row.product());
        let decay = scaled.sum_axis(Axis(1)).mapv(|s| F::exp(-sqrt5 * s));
        as_column(poly * decay)
    }
}

macro_rules! declare_corr_util_impls {
    ($corr:ident) => {
        paste! {
            impl fmt::Display for [<$corr Corr>] {
                fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                    write!(f, "{}", stringify!($corr))
                }
            }

            impl From<[<$corr Corr>]> for String {
                fn from(item: [<$corr Corr>]) -> Self {
                    item.to_string()
                }
            }

            impl TryFrom<String> for [<$corr Corr>] {
                type Error = String;
                fn try_from(s: String) -> Result<Self, Self::Error> {
                    if s == stringify!($corr) {
                        Ok(Self::default())
                    } else {
                        Err(format!("expected '{}', got '{s}'", stringify!($corr)))
                    }
                }
            }
        }
    };
}

declare_corr_util_impls!(SquaredExponential);
declare_corr_util_impls!(AbsoluteExponential);
declare_corr_util_impls!(Matern32);
declare_corr_util_impls!(Matern52);
