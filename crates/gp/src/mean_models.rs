//! Regression models for the mean (trend) term of the GP.
//!
//! The trend only captures the large scale behaviour of the simulator output,
//! the correlated error term does the rest. Available models:
//! * constant, the default, which gives ordinary kriging,
//! * linear,
//! * quadratic.

use linfa::Float;
use ndarray::{Array2, ArrayBase, Axis, Data, Ix2, concatenate};
use paste::paste;
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};
use std::convert::TryFrom;
use std::fmt;

/// A trait for mean models used in GP regression
pub trait RegressionModel<F: Float>: Clone + Copy + Default + fmt::Display + Sync {
    /// Regression basis functions evaluated at the `x` points given as a (n, nx) matrix.
    /// Returns a (n, p) matrix where p is the number of basis functions.
    fn value(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Array2<F>;

    /// Number of basis functions for inputs of dimension `nx`
    fn n_basis(&self, nx: usize) -> usize;
}

/// A constant function as mean of the GP
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "serializable",
    derive(Serialize, Deserialize),
    serde(into = "String"),
    serde(try_from = "String")
)]
pub struct ConstantMean();

impl<F: Float> RegressionModel<F> for ConstantMean {
    /// regr(x) = [1]
    fn value(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Array2<F> {
        Array2::ones((x.nrows(), 1))
    }

    fn n_basis(&self, _nx: usize) -> usize {
        1
    }
}

/// An affine function as mean of the GP
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "serializable",
    derive(Serialize, Deserialize),
    serde(into = "String"),
    serde(try_from = "String")
)]
pub struct LinearMean();

impl<F: Float> RegressionModel<F> for LinearMean {
    /// regr(x) = [1, x_1, ..., x_nx]
    fn value(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Array2<F> {
        concatenate![Axis(1), Array2::ones((x.nrows(), 1)), x.view()]
    }

    fn n_basis(&self, nx: usize) -> usize {
        1 + nx
    }
}

/// A 2-degree polynomial as mean of the GP
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "serializable",
    derive(Serialize, Deserialize),
    serde(into = "String"),
    serde(try_from = "String")
)]
pub struct QuadraticMean();

impl<F: Float> RegressionModel<F> for QuadraticMean {
    /// regr(x) = [1, x_1, ..., x_nx, x_i * x_j for 1 <= i <= j <= nx]
    fn value(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Array2<F> {
        let nx = x.ncols();
        let mut res = Array2::zeros((x.nrows(), RegressionModel::<F>::n_basis(self, nx)));
        res.column_mut(0).fill(F::one());
        res.slice_mut(ndarray::s![.., 1..=nx]).assign(x);
        let mut col = 1 + nx;
        for i in 0..nx {
            for j in i..nx {
                let prod = &x.column(i) * &x.column(j);
                res.column_mut(col).assign(&prod);
                col += 1;
            }
        }
        res
    }

    fn n_basis(&self, nx: usize) -> usize {
        1 + nx + nx * (nx + 1) / 2
    }
}

macro_rules! declare_mean_util_impls {
    ($regr:ident) => {
        paste! {
            impl fmt::Display for [<$regr Mean>] {
                fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                    write!(f, "{}Mean", stringify!($regr))
                }
            }

            impl From<[<$regr Mean>]> for String {
                fn from(item: [<$regr Mean>]) -> Self {
                    item.to_string()
                }
            }

            impl TryFrom<String> for [<$regr Mean>] {
                type Error = String;
                fn try_from(s: String) -> Result<Self, Self::Error> {
                    if s == stringify!([<$regr Mean>]) {
                        Ok(Self::default())
                    } else {
                        Err(format!("expected '{}', got '{s}'", stringify!([<$regr Mean>])))
                    }
                }
            }
        }
    };
}

declare_mean_util_impls!(Constant);
declare_mean_util_impls!(Linear);
declare_mean_util_impls!(Quadratic);

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_linear() {
        let a = array![[1., 2.], [3., 4.]];
        let actual = LinearMean::default().value(&a);
        assert_abs_diff_eq!(array![[1., 1., 2.], [1., 3., 4.]], actual);
    }

    #[test]
    fn test_quadratic() {
        let a = array![[1., 2., 3.], [3., 4., 5.]];
        let actual = QuadraticMean::default().value(&a);
        let expected = array![
            [1.0, 1.0, 2.0, 3.0, 1.0, 2.0, 3.0, 4.0, 6.0, 9.0],
            [1.0, 3.0, 4.0, 5.0, 9.0, 12.0, 15.0, 16.0, 20.0, 25.0]
        ];
        assert_abs_diff_eq!(expected, actual);
        assert_eq!(RegressionModel::<f64>::n_basis(&QuadraticMean(), 3), 10);
    }

    #[test]
    fn test_quadratic_1d() {
        let a = array![[0.], [7.], [25.]];
        let actual = QuadraticMean::default().value(&a);
        let expected = array![[1., 0., 0.], [1., 7., 49.], [1., 25., 625.]];
        assert_abs_diff_eq!(expected, actual);
    }

    #[test]
    fn test_string_conversions() {
        assert_eq!("ConstantMean", ConstantMean().to_string());
        assert_eq!(
            LinearMean::try_from("LinearMean".to_string()),
            Ok(LinearMean())
        );
        assert!(QuadraticMean::try_from("LinearMean".to_string()).is_err());
    }
}
