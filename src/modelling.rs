//! Basic objects for modelling a simulator: its input domain, inputs, training
//! data and emulator predictions.

use crate::errors::{ExauqError, Result};
use crate::numerics::{all_equal_within_tolerance, equal_to_tolerance};

use ndarray::{Array1, Array2, ArrayBase, ArrayView1, Data, Ix1, Ix2};
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Index;

/// The input domain of a simulator, a product of closed intervals `[lower, upper]`.
///
/// ```
/// use exauq::SimulatorDomain;
///
/// let domain = SimulatorDomain::new(vec![(0., 1.), (-5., 5.)]).unwrap();
/// assert_eq!(domain.dim(), 2);
/// ```
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct SimulatorDomain {
    bounds: Vec<(f64, f64)>,
}

impl SimulatorDomain {
    /// Build a domain given `(lower, upper)` bounds of each coordinate
    pub fn new(bounds: Vec<(f64, f64)>) -> Result<Self> {
        if bounds.is_empty() {
            return Err(ExauqError::InvalidDomain(
                "a domain needs at least one dimension".to_string(),
            ));
        }
        for (i, (lower, upper)) in bounds.iter().enumerate() {
            if !lower.is_finite() || !upper.is_finite() {
                return Err(ExauqError::InvalidDomain(format!(
                    "bounds of coordinate {i} should be finite, got ({lower}, {upper})"
                )));
            }
            if lower > upper {
                return Err(ExauqError::InvalidDomain(format!(
                    "lower bound {lower} of coordinate {i} is greater than its upper bound {upper}"
                )));
            }
        }
        Ok(SimulatorDomain { bounds })
    }

    /// Number of coordinates of the inputs
    pub fn dim(&self) -> usize {
        self.bounds.len()
    }

    /// `(lower, upper)` bounds of each coordinate
    pub fn bounds(&self) -> &[(f64, f64)] {
        &self.bounds
    }

    pub fn lower_bounds(&self) -> Vec<f64> {
        self.bounds.iter().map(|b| b.0).collect()
    }

    pub fn upper_bounds(&self) -> Vec<f64> {
        self.bounds.iter().map(|b| b.1).collect()
    }

    /// Whether `x` has the domain dimension and lies within the bounds
    pub fn contains(&self, x: &Input) -> bool {
        x.len() == self.dim()
            && x
                .iter()
                .zip(&self.bounds)
                .all(|(v, (lower, upper))| lower <= v && v <= upper)
    }

    /// Map a point of the unit hypercube onto the domain
    pub fn scale(&self, unit: &[f64]) -> Result<Input> {
        if unit.len() != self.dim() {
            return Err(ExauqError::InvalidValue(format!(
                "expected {} coordinates to scale, got {}",
                self.dim(),
                unit.len()
            )));
        }
        Input::new(
            unit.iter()
                .zip(&self.bounds)
                .map(|(t, (lower, upper))| lower + t * (upper - lower))
                .collect(),
        )
    }

    /// Bounds as a (dim, 2) matrix \[\[lower, upper\], ...\]
    pub fn xlimits(&self) -> Array2<f64> {
        Array2::from_shape_fn((self.dim(), 2), |(i, j)| {
            if j == 0 {
                self.bounds[i].0
            } else {
                self.bounds[i].1
            }
        })
    }
}

/// A point of a simulator domain: an immutable sequence of finite coordinates.
///
/// Inputs are compared coordinatewise up to [FLOAT_TOLERANCE](crate::numerics::FLOAT_TOLERANCE).
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct Input(Vec<f64>);

/// Coordinates of an [Input] as returned by [Input::value]
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum InputValue<'a> {
    /// One dimensional input
    Single(f64),
    /// Input with several coordinates
    Many(&'a [f64]),
}

impl Input {
    /// Build an input, coordinates have to be finite
    pub fn new(coordinates: Vec<f64>) -> Result<Self> {
        if let Some(v) = coordinates.iter().find(|v| !v.is_finite()) {
            return Err(ExauqError::InvalidInput(format!(
                "coordinates should be finite numbers, got {v}"
            )));
        }
        Ok(Input(coordinates))
    }

    pub fn from_slice(coordinates: &[f64]) -> Result<Self> {
        Self::new(coordinates.to_vec())
    }

    pub fn from_array(coordinates: ArrayView1<f64>) -> Result<Self> {
        Self::new(coordinates.to_vec())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, i: usize) -> Option<f64> {
        self.0.get(i).copied()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, f64> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn to_array(&self) -> Array1<f64> {
        Array1::from(self.0.clone())
    }

    /// `None` for the empty input, the coordinate for a one dimensional input,
    /// the slice of coordinates otherwise.
    pub fn value(&self) -> Option<InputValue<'_>> {
        match self.0.as_slice() {
            [] => None,
            [v] => Some(InputValue::Single(*v)),
            many => Some(InputValue::Many(many)),
        }
    }
}

impl TryFrom<&[f64]> for Input {
    type Error = ExauqError;
    fn try_from(coordinates: &[f64]) -> Result<Self> {
        Self::from_slice(coordinates)
    }
}

impl TryFrom<Vec<f64>> for Input {
    type Error = ExauqError;
    fn try_from(coordinates: Vec<f64>) -> Result<Self> {
        Self::new(coordinates)
    }
}

impl PartialEq for Input {
    fn eq(&self, other: &Self) -> bool {
        all_equal_within_tolerance(&self.0, &other.0)
    }
}

impl Index<usize> for Input {
    type Output = f64;
    fn index(&self, i: usize) -> &f64 {
        &self.0[i]
    }
}

impl<'a> IntoIterator for &'a Input {
    type Item = &'a f64;
    type IntoIter = std::slice::Iter<'a, f64>;
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Display for Input {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let coords: Vec<String> = self.0.iter().map(|v| format!("{v:?}")).collect();
        write!(f, "Input({})", coords.join(", "))
    }
}

/// A simulator input along with the simulator output at this input
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct TrainingDatum {
    input: Input,
    output: f64,
}

impl TrainingDatum {
    /// Build a datum, output has to be finite
    pub fn new(input: Input, output: f64) -> Result<Self> {
        if !output.is_finite() {
            return Err(ExauqError::InvalidValue(format!(
                "simulator output should be a finite number, got {output}"
            )));
        }
        Ok(TrainingDatum { input, output })
    }

    pub fn input(&self) -> &Input {
        &self.input
    }

    pub fn output(&self) -> f64 {
        self.output
    }

    /// Build training data from inputs as rows of a (n, d) matrix and outputs as a (n,) vector
    pub fn list_from_arrays(
        inputs: &ArrayBase<impl Data<Elem = f64>, Ix2>,
        outputs: &ArrayBase<impl Data<Elem = f64>, Ix1>,
    ) -> Result<Vec<TrainingDatum>> {
        if inputs.nrows() != outputs.len() {
            return Err(ExauqError::InvalidValue(format!(
                "{} inputs but {} outputs",
                inputs.nrows(),
                outputs.len()
            )));
        }
        inputs
            .rows()
            .into_iter()
            .zip(outputs)
            .map(|(x, y)| TrainingDatum::new(Input::from_array(x)?, *y))
            .collect()
    }

    /// Inputs as rows of a (n, d) matrix and outputs as a (n,) vector.
    /// Every input has to have the same dimension.
    pub fn to_arrays(data: &[TrainingDatum]) -> Result<(Array2<f64>, Array1<f64>)> {
        let dim = data.first().map_or(0, |d| d.input.len());
        let mut inputs = Array2::zeros((data.len(), dim));
        for (mut row, datum) in inputs.rows_mut().into_iter().zip(data) {
            if datum.input.len() != dim {
                return Err(ExauqError::InvalidInput(format!(
                    "training inputs should all have {dim} coordinates, got {}",
                    datum.input
                )));
            }
            row.assign(&ArrayView1::from(datum.input.as_slice()));
        }
        let outputs = data.iter().map(|d| d.output).collect();
        Ok((inputs, outputs))
    }
}

impl fmt::Display for TrainingDatum {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({}, {:?})", self.input, self.output)
    }
}

/// The prediction of a simulator output by an emulator
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct Prediction {
    estimate: f64,
    variance: f64,
}

impl Prediction {
    /// Build a prediction, the variance has to be non negative
    pub fn new(estimate: f64, variance: f64) -> Result<Self> {
        if !estimate.is_finite() {
            return Err(ExauqError::InvalidValue(format!(
                "estimate should be a finite number, got {estimate}"
            )));
        }
        if !(variance.is_finite() && variance >= 0.) {
            return Err(ExauqError::InvalidValue(format!(
                "variance should be a non negative finite number, got {variance}"
            )));
        }
        Ok(Prediction { estimate, variance })
    }

    pub fn estimate(&self) -> f64 {
        self.estimate
    }

    pub fn variance(&self) -> f64 {
        self.variance
    }

    pub fn standard_deviation(&self) -> f64 {
        self.variance.sqrt()
    }

    /// Normalised expected square error of this prediction wrt the `observed` output.
    ///
    /// With `se = (estimate - observed)^2`, this is the expected square error
    /// `variance + se` divided by its standard deviation `sqrt(2 variance^2 + 4 variance se)`.
    /// A zero variance prediction gives `0` when exact and `+inf` otherwise.
    ///
    /// ```
    /// use exauq::Prediction;
    ///
    /// let pred = Prediction::new(1.0, 0.5).unwrap();
    /// assert!((pred.nes_error(1.0) - 1. / 2f64.sqrt()).abs() < 1e-12);
    /// assert_eq!(Prediction::new(1.0, 0.).unwrap().nes_error(2.0), f64::INFINITY);
    /// ```
    pub fn nes_error(&self, observed: f64) -> f64 {
        let square_err = (self.estimate - observed).powi(2);
        let expected = self.variance + square_err;
        let sd = (2. * self.variance.powi(2) + 4. * self.variance * square_err).sqrt();
        if sd == 0. {
            if expected == 0. { 0. } else { f64::INFINITY }
        } else {
            expected / sd
        }
    }
}

impl PartialEq for Prediction {
    fn eq(&self, other: &Self) -> bool {
        equal_to_tolerance(self.estimate, other.estimate)
            && equal_to_tolerance(self.variance, other.variance)
    }
}

impl fmt::Display for Prediction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Prediction(estimate={:?}, variance={:?})",
            self.estimate, self.variance
        )
    }
}

/// A surrogate of a simulator trained on simulator input/output pairs
pub trait Emulator {
    /// Data the emulator has been trained on, empty before any training
    fn training_data(&self) -> &[TrainingDatum];

    /// Train the emulator on the given data
    fn fit(&mut self, data: &[TrainingDatum]) -> Result<()>;

    /// Predict the simulator output at `x`
    fn predict(&self, x: &Input) -> Result<Prediction>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_domain_errors() {
        assert!(matches!(
            SimulatorDomain::new(vec![]),
            Err(ExauqError::InvalidDomain(_))
        ));
        assert!(SimulatorDomain::new(vec![(1., 0.)]).is_err());
        assert!(SimulatorDomain::new(vec![(0., f64::INFINITY)]).is_err());
        assert!(SimulatorDomain::new(vec![(0., 0.)]).is_ok());
    }

    #[test]
    fn test_domain_contains() {
        let domain = SimulatorDomain::new(vec![(0., 1.), (-1., 1.)]).unwrap();
        assert!(domain.contains(&Input::new(vec![0., 1.]).unwrap()));
        assert!(domain.contains(&Input::new(vec![0.5, -0.3]).unwrap()));
        assert!(!domain.contains(&Input::new(vec![1.5, 0.]).unwrap()));
        assert!(!domain.contains(&Input::new(vec![0.5]).unwrap()));
        assert_eq!(domain.lower_bounds(), vec![0., -1.]);
        assert_eq!(domain.upper_bounds(), vec![1., 1.]);
        assert_eq!(domain.xlimits(), array![[0., 1.], [-1., 1.]]);
    }

    #[test]
    fn test_domain_scale() {
        let domain = SimulatorDomain::new(vec![(0., 2.), (-1., 1.)]).unwrap();
        let x = domain.scale(&[0.5, 0.25]).unwrap();
        assert_eq!(x, Input::new(vec![1., -0.5]).unwrap());
        assert!(domain.scale(&[0.5]).is_err());
    }

    #[test]
    fn test_input() {
        let x = Input::try_from(&[0.1, 0.2][..]).unwrap();
        assert_eq!(x.len(), 2);
        assert_eq!(x[1], 0.2);
        assert_eq!(x.get(2), None);
        assert_eq!(x.to_string(), "Input(0.1, 0.2)");
        assert_eq!(x.value(), Some(InputValue::Many(&[0.1, 0.2])));
        assert_eq!(Input::new(vec![3.]).unwrap().value(), Some(InputValue::Single(3.)));
        assert_eq!(Input::default().value(), None);
        assert!(Input::default().is_empty());
        assert_eq!(x.iter().sum::<f64>(), x.to_array().sum());
    }

    #[test]
    fn test_input_not_finite() {
        assert!(matches!(
            Input::new(vec![0., f64::NAN]),
            Err(ExauqError::InvalidInput(_))
        ));
        assert!(Input::new(vec![f64::NEG_INFINITY]).is_err());
    }

    #[test]
    fn test_input_equality_within_tolerance() {
        let x = Input::new(vec![1., 2.]).unwrap();
        assert_eq!(x, Input::new(vec![1. + 1e-12, 2.]).unwrap());
        assert_ne!(x, Input::new(vec![1. + 1e-6, 2.]).unwrap());
        assert_ne!(x, Input::new(vec![1.]).unwrap());
    }

    #[test]
    fn test_training_data_arrays() {
        let inputs = array![[0., 1.], [2., 3.], [4., 5.]];
        let outputs = array![1., 2., 3.];
        let data = TrainingDatum::list_from_arrays(&inputs, &outputs).unwrap();
        assert_eq!(data.len(), 3);
        assert_eq!(data[1].to_string(), "(Input(2.0, 3.0), 2.0)");
        let (x, y) = TrainingDatum::to_arrays(&data).unwrap();
        assert_eq!(x, inputs);
        assert_eq!(y, outputs);

        assert!(TrainingDatum::list_from_arrays(&inputs, &array![1.]).is_err());
        assert!(TrainingDatum::new(Input::default(), f64::NAN).is_err());
    }

    #[test]
    fn test_to_arrays_inconsistent_dims() {
        let data = vec![
            TrainingDatum::new(Input::new(vec![0.]).unwrap(), 1.).unwrap(),
            TrainingDatum::new(Input::new(vec![0., 1.]).unwrap(), 1.).unwrap(),
        ];
        assert!(TrainingDatum::to_arrays(&data).is_err());
    }

    #[test]
    fn test_prediction() {
        assert!(Prediction::new(1., -1e-3).is_err());
        assert!(Prediction::new(f64::NAN, 1.).is_err());
        let pred = Prediction::new(2., 4.).unwrap();
        assert_eq!(pred.standard_deviation(), 2.);
        assert_eq!(pred, Prediction::new(2. + 1e-12, 4.).unwrap());
        assert_ne!(pred, Prediction::new(2., 4.1).unwrap());
    }

    #[test]
    fn test_nes_error() {
        let exact = Prediction::new(1., 0.).unwrap();
        assert_eq!(exact.nes_error(1.), 0.);
        assert_eq!(exact.nes_error(1.5), f64::INFINITY);

        let pred = Prediction::new(1., 2.).unwrap();
        // se = 4, expected = 6, sd = sqrt(8 + 32)
        assert_abs_diff_eq!(pred.nes_error(3.), 6. / 40f64.sqrt(), epsilon = 1e-12);
        assert_abs_diff_eq!(pred.nes_error(-1.), pred.nes_error(3.), epsilon = 1e-12);
    }
}
