//! Gaussian process emulators.

use crate::errors::{ExauqError, Result};
use crate::modelling::{Emulator, Input, Prediction, TrainingDatum};
use crate::numerics::{all_equal_within_tolerance, equal_to_tolerance};

use exauq_gp::correlation_models::{CorrelationModel, SquaredExponentialCorr};
use exauq_gp::mean_models::{ConstantMean, RegressionModel};
use exauq_gp::{
    GaussianProcess, GpParams, NormalizedData, NuggetTuning, ThetaTuning, VarianceTuning,
};
use linfa::prelude::{Dataset, Fit};
use linfa::ParamGuard;
use log::info;
use ndarray::{Array1, Array2, Axis};

/// Hyperparameters of a GP emulator expressed in simulator units:
/// * `corr`: correlation lengths, one per input coordinate,
/// * `cov`: process variance,
/// * `nugget`: value added to the correlation matrix diagonal, if any.
///
/// Hyperparameters are compared up to [FLOAT_TOLERANCE](crate::numerics::FLOAT_TOLERANCE).
#[derive(Clone, Debug)]
pub struct GpHyperparameters {
    corr: Vec<f64>,
    cov: f64,
    nugget: Option<f64>,
}

fn check_positive(name: &str, value: f64) -> Result<f64> {
    if value > 0. && value.is_finite() {
        Ok(value)
    } else {
        Err(ExauqError::InvalidValue(format!(
            "Expected '{name}' to be a positive real number, but received {value}."
        )))
    }
}

impl GpHyperparameters {
    pub fn new(corr: Vec<f64>, cov: f64, nugget: Option<f64>) -> Result<Self> {
        for c in &corr {
            check_positive("corr", *c)?;
        }
        check_positive("cov", cov)?;
        if let Some(n) = nugget {
            if !(n >= 0. && n.is_finite()) {
                return Err(ExauqError::InvalidValue(format!(
                    "Expected 'nugget' to be a non negative real number, but received {n}."
                )));
            }
        }
        Ok(GpHyperparameters { corr, cov, nugget })
    }

    pub fn corr(&self) -> &[f64] {
        &self.corr
    }

    pub fn cov(&self) -> f64 {
        self.cov
    }

    pub fn nugget(&self) -> Option<f64> {
        self.nugget
    }

    /// `-2 ln(corr)`, the log-scale parameterization of a correlation length
    pub fn transform_corr(corr: f64) -> Result<f64> {
        Ok(-2. * check_positive("corr", corr)?.ln())
    }

    /// `ln(cov)`
    pub fn transform_cov(cov: f64) -> Result<f64> {
        Ok(check_positive("cov", cov)?.ln())
    }

    /// `ln(nugget)`
    pub fn transform_nugget(nugget: f64) -> Result<f64> {
        Ok(check_positive("nugget", nugget)?.ln())
    }
}

impl PartialEq for GpHyperparameters {
    fn eq(&self, other: &Self) -> bool {
        let nuggets_equal = match (self.nugget, other.nugget) {
            (None, None) => true,
            (Some(a), Some(b)) => equal_to_tolerance(a, b),
            _ => false,
        };
        nuggets_equal
            && all_equal_within_tolerance(&self.corr, &other.corr)
            && equal_to_tolerance(self.cov, other.cov)
    }
}

/// Bounds on a hyperparameter, `None` meaning unbounded
pub type HyperparameterBounds = (Option<f64>, Option<f64>);

/// An emulator based on a Gaussian process from the `exauq-gp` crate.
///
/// Hyperparameters are estimated by maximum likelihood each time the emulator
/// is fitted, unless given with [GpEmulator::fit_with_hyperparameters].
///
/// ```no_run
/// use exauq::{Emulator, GpEmulator, Input, TrainingDatum};
///
/// let data: Vec<TrainingDatum> = [0., 0.25, 0.5, 0.75, 1.]
///     .iter()
///     .map(|x| TrainingDatum::new(Input::new(vec![*x]).unwrap(), x.sin()).unwrap())
///     .collect();
/// let mut emulator: GpEmulator = GpEmulator::default();
/// emulator.fit(&data).unwrap();
/// let prediction = emulator.predict(&Input::new(vec![0.6]).unwrap()).unwrap();
/// ```
#[derive(Clone, Debug)]
pub struct GpEmulator<Mean = ConstantMean, Corr = SquaredExponentialCorr>
where
    Mean: RegressionModel<f64>,
    Corr: CorrelationModel<f64>,
{
    params: GpParams<f64, Mean, Corr>,
    gp: Option<GaussianProcess<f64, Mean, Corr>>,
    training_data: Vec<TrainingDatum>,
    fit_hyperparameters: Option<GpHyperparameters>,
}

impl<Mean: RegressionModel<f64>, Corr: CorrelationModel<f64>> Default for GpEmulator<Mean, Corr> {
    /// Adaptive nugget, other parameters are [GpParams] defaults
    fn default() -> Self {
        GpEmulator::new(
            GpParams::new(Mean::default(), Corr::default()).nugget_tuning(NuggetTuning::Adaptive),
        )
    }
}

impl<Mean: RegressionModel<f64>, Corr: CorrelationModel<f64>> GpEmulator<Mean, Corr> {
    /// An untrained emulator fitting GPs with the given parameters
    pub fn new(params: GpParams<f64, Mean, Corr>) -> Self {
        GpEmulator {
            params,
            gp: None,
            training_data: vec![],
            fit_hyperparameters: None,
        }
    }

    pub fn params(&self) -> &GpParams<f64, Mean, Corr> {
        &self.params
    }

    /// The underlying GP, `None` before training
    pub fn gp(&self) -> Option<&GaussianProcess<f64, Mean, Corr>> {
        self.gp.as_ref()
    }

    /// Hyperparameters of the last fit, `None` before training
    pub fn fit_hyperparameters(&self) -> Option<&GpHyperparameters> {
        self.fit_hyperparameters.as_ref()
    }

    /// Train the emulator estimating hyperparameters within the given bounds.
    ///
    /// `bounds` holds `(lower, upper)` bounds of each correlation length followed by
    /// the bounds of the process variance. Non positive lower bounds are ignored,
    /// upper bounds have to be positive.
    pub fn fit_with_bounds(
        &mut self,
        data: &[TrainingDatum],
        bounds: &[HyperparameterBounds],
    ) -> Result<()> {
        if data.is_empty() {
            return Ok(());
        }
        if bounds.iter().any(|(_, upper)| upper.is_some_and(|u| u <= 0.)) {
            return Err(ExauqError::InvalidValue(
                "Upper bounds must be positive numbers".to_string(),
            ));
        }
        if bounds
            .iter()
            .any(|bnd| matches!(bnd, (Some(lo), Some(up)) if lo > up))
        {
            return Err(ExauqError::InvalidValue(
                "Lower bounds must not exceed upper bounds".to_string(),
            ));
        }
        let (x, y) = TrainingDatum::to_arrays(data)?;
        let dim = x.ncols();
        if bounds.len() != dim + 1 {
            return Err(ExauqError::InvalidValue(format!(
                "Expected {} bounds (one per input coordinate then the variance), got {}",
                dim + 1,
                bounds.len()
            )));
        }

        let x_std = NormalizedData::new(&x).std;
        let (corr_bounds, cov_bounds) = bounds.split_at(dim);
        let (init, theta_bounds): (Vec<f64>, Vec<(f64, f64)>) = corr_bounds
            .iter()
            .zip(x_std.iter())
            .map(|(bnd, std)| theta_bounds_from_corr(*bnd, *std))
            .unzip();
        let params = self
            .params
            .clone()
            .theta_tuning(ThetaTuning::Full {
                init: Array1::from(init),
                bounds: Array1::from(theta_bounds),
            })
            .variance_tuning(variance_from_cov_bounds(cov_bounds[0]));
        self.train(params, x, y, data)
    }

    /// Train the emulator with given hyperparameters.
    ///
    /// When `hyperparameters` has no nugget, the nugget handling of the emulator
    /// parameters is used, which cannot be an estimation.
    pub fn fit_with_hyperparameters(
        &mut self,
        data: &[TrainingDatum],
        hyperparameters: &GpHyperparameters,
    ) -> Result<()> {
        if data.is_empty() {
            return Ok(());
        }
        let nugget_tuning = match hyperparameters.nugget {
            Some(nugget) => NuggetTuning::Fixed(nugget),
            None => match self.params.check_ref()?.nugget_tuning() {
                NuggetTuning::Estimated { .. } => {
                    return Err(ExauqError::InvalidValue(
                        "The emulator estimates its nugget, but the nugget supplied during \
                         fitting is None, when it should instead be a number."
                            .to_string(),
                    ));
                }
                tuning => *tuning,
            },
        };
        let (x, y) = TrainingDatum::to_arrays(data)?;
        if hyperparameters.corr.len() != x.ncols() {
            return Err(ExauqError::InvalidValue(format!(
                "Expected {} correlation lengths, got {}",
                x.ncols(),
                hyperparameters.corr.len()
            )));
        }
        let theta = NormalizedData::new(&x).std / Array1::from(hyperparameters.corr.clone());
        let params = self
            .params
            .clone()
            .theta_tuning(ThetaTuning::Fixed(theta))
            .variance_tuning(VarianceTuning::Fixed(hyperparameters.cov))
            .nugget_tuning(nugget_tuning);
        self.train(params, x, y, data)
    }

    fn train(
        &mut self,
        params: GpParams<f64, Mean, Corr>,
        x: Array2<f64>,
        y: Array1<f64>,
        data: &[TrainingDatum],
    ) -> Result<()> {
        let gp = params.fit(&Dataset::new(x, y))?;
        info!("GP emulator trained on {} points: {gp}", data.len());
        self.fit_hyperparameters = Some(GpHyperparameters::new(
            gp.length_scales().to_vec(),
            gp.variance(),
            Some(gp.nugget()),
        )?);
        self.gp = Some(gp);
        self.training_data = data.to_vec();
        Ok(())
    }
}

/// Theta initial value and bounds in normalized units given correlation length bounds.
/// theta = x_std / corr is decreasing in corr, unbounded sides get the default theta bounds.
fn theta_bounds_from_corr((lower, upper): HyperparameterBounds, x_std: f64) -> (f64, (f64, f64)) {
    let (default_lo, default_up) = ThetaTuning::<f64>::DEFAULT_BOUNDS;
    let lower = lower.filter(|v| *v > 0.);
    let theta_lo = upper.map(|u| x_std / u);
    let theta_up = lower.map(|l| x_std / l);
    let (theta_lo, theta_up) = match (theta_lo, theta_up) {
        (Some(lo), Some(up)) => (lo, up),
        (Some(lo), None) => (lo, default_up.max(lo)),
        (None, Some(up)) => (default_lo.min(up), up),
        (None, None) => (default_lo, default_up),
    };
    let init = ThetaTuning::<f64>::DEFAULT_INIT.clamp(theta_lo, theta_up);
    (init, (theta_lo, theta_up))
}

fn variance_from_cov_bounds((lower, upper): HyperparameterBounds) -> VarianceTuning<f64> {
    let lower = lower.filter(|v| *v > 0.);
    match (lower, upper) {
        (None, None) => VarianceTuning::Estimated,
        (lower, upper) => VarianceTuning::Bounded(
            lower.unwrap_or(f64::MIN_POSITIVE),
            upper.unwrap_or(f64::MAX),
        ),
    }
}

impl<Mean: RegressionModel<f64>, Corr: CorrelationModel<f64>> Emulator for GpEmulator<Mean, Corr> {
    fn training_data(&self) -> &[TrainingDatum] {
        &self.training_data
    }

    /// Train the emulator estimating its hyperparameters, empty data is ignored
    fn fit(&mut self, data: &[TrainingDatum]) -> Result<()> {
        if data.is_empty() {
            return Ok(());
        }
        let (x, y) = TrainingDatum::to_arrays(data)?;
        self.train(self.params.clone(), x, y, data)
    }

    fn predict(&self, x: &Input) -> Result<Prediction> {
        let Some(gp) = &self.gp else {
            return Err(ExauqError::NotTrained);
        };
        let (expected, _) = gp.dims();
        if x.len() != expected {
            return Err(ExauqError::DimensionMismatch {
                expected,
                actual: x.len(),
            });
        }
        let (mean, variance) = gp.predict_valvar(&x.to_array().insert_axis(Axis(0)))?;
        Prediction::new(mean[0], variance[0])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{SimulatorDomain, oneshot_lhs};
    use approx::assert_abs_diff_eq;
    use exauq_gp::correlation_models::Matern52Corr;
    use paste::paste;

    fn simulator(x: &Input) -> f64 {
        x.iter()
            .enumerate()
            .map(|(i, v)| (i as f64 + 1.) * v.sin())
            .sum::<f64>()
            + 2.
    }

    fn training_data(dim: usize, n: usize) -> Vec<TrainingDatum> {
        let domain = SimulatorDomain::new(vec![(0., 3.); dim]).unwrap();
        oneshot_lhs(&domain, n, Some(42))
            .unwrap()
            .into_iter()
            .map(|x| {
                let y = simulator(&x);
                TrainingDatum::new(x, y).unwrap()
            })
            .collect()
    }

    fn seeded() -> GpEmulator {
        GpEmulator::new(
            GpParams::new(ConstantMean(), SquaredExponentialCorr())
                .nugget_tuning(NuggetTuning::Adaptive)
                .seed(Some(42)),
        )
    }

    #[test]
    fn test_untrained_emulator() {
        let emulator = GpEmulator::<ConstantMean, SquaredExponentialCorr>::default();
        assert!(emulator.training_data().is_empty());
        assert!(emulator.fit_hyperparameters().is_none());
        let err = emulator.predict(&Input::new(vec![0.5]).unwrap()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Cannot make prediction because emulator has not been trained on any data."
        );
    }

    #[test]
    fn test_fit_empty_data_is_noop() {
        let mut emulator = seeded();
        emulator.fit(&[]).unwrap();
        assert!(emulator.training_data().is_empty());
        assert!(emulator.gp().is_none());
    }

    macro_rules! test_emulator_interpolates {
        ($corr:ident) => {
            paste! {
                #[test]
                fn [<test_emulator_interpolates_ $corr:snake>]() {
                    let data = training_data(2, 15);
                    let mut emulator = GpEmulator::new(
                        GpParams::new(ConstantMean(), [<$corr Corr>]())
                            .nugget_tuning(NuggetTuning::Adaptive)
                            .seed(Some(42)),
                    );
                    emulator.fit(&data).unwrap();
                    assert_eq!(emulator.training_data(), &data[..]);
                    for datum in &data {
                        let pred = emulator.predict(datum.input()).unwrap();
                        assert_abs_diff_eq!(pred.estimate(), datum.output(), epsilon = 1e-2);
                        assert!(pred.variance() < 1e-2);
                    }
                    let away = Input::new(vec![10., -5.]).unwrap();
                    assert!(emulator.predict(&away).unwrap().variance() > 0.);
                }
            }
        };
    }

    test_emulator_interpolates!(SquaredExponential);
    test_emulator_interpolates!(Matern52);

    #[test]
    fn test_fit_constant_outputs() {
        let data: Vec<TrainingDatum> = training_data(2, 8)
            .into_iter()
            .map(|d| TrainingDatum::new(d.input().clone(), 3.).unwrap())
            .collect();
        let mut emulator: GpEmulator = GpEmulator::default();
        emulator.fit(&data).unwrap();
        assert!(emulator.fit_hyperparameters().unwrap().cov() > 0.);
        let pred = emulator.predict(&Input::new(vec![1.2, 2.9]).unwrap()).unwrap();
        assert_abs_diff_eq!(pred.estimate(), 3., epsilon = 1e-6);
    }

    #[test]
    fn test_fit_single_datum() {
        let x = Input::new(vec![0.3, 0.4]).unwrap();
        let data = vec![TrainingDatum::new(x.clone(), 1.5).unwrap()];
        let mut emulator: GpEmulator = GpEmulator::default();
        emulator.fit(&data).unwrap();
        let hp = emulator.fit_hyperparameters().unwrap();
        assert!(hp.cov() > 0.);
        assert!(hp.corr().iter().all(|c| *c > 0.));
        let pred = emulator.predict(&x).unwrap();
        assert_abs_diff_eq!(pred.estimate(), 1.5, epsilon = 1e-6);
        assert!(pred.variance() >= 0.);
    }

    #[test]
    fn test_fit_duplicated_inputs() {
        let mut data = training_data(1, 6);
        data.push(data[2].clone());
        data.push(data[4].clone());
        let mut emulator: GpEmulator = GpEmulator::default();
        emulator.fit(&data).unwrap();
        let nugget = emulator.fit_hyperparameters().unwrap().nugget().unwrap();
        assert!(nugget <= NuggetTuning::<f64>::ADAPTIVE_MAX);
        let pred = emulator.predict(data[2].input()).unwrap();
        assert_abs_diff_eq!(pred.estimate(), data[2].output(), epsilon = 5e-2);
    }

    #[test]
    fn test_fit_with_bounds_constant_input_column() {
        // second coordinate never varies, its unit std maps corr bounds to theta bounds
        let data: Vec<TrainingDatum> = training_data(1, 8)
            .into_iter()
            .map(|d| {
                let x = Input::new(vec![d.input()[0], 0.5]).unwrap();
                TrainingDatum::new(x, d.output()).unwrap()
            })
            .collect();
        let bounds = [(None, None), (Some(0.5), Some(2.)), (None, None)];
        let mut emulator = seeded();
        emulator.fit_with_bounds(&data, &bounds).unwrap();
        let hp = emulator.fit_hyperparameters().unwrap();
        let tol = 1e-10;
        assert!(hp.corr()[1] >= 0.5 * (1. - tol) && hp.corr()[1] <= 2. * (1. + tol));
        let pred = emulator.predict(data[3].input()).unwrap();
        assert_abs_diff_eq!(pred.estimate(), data[3].output(), epsilon = 1e-2);
    }

    #[test]
    fn test_predict_wrong_dimension() {
        let mut emulator = seeded();
        emulator.fit(&training_data(2, 8)).unwrap();
        let err = emulator
            .predict(&Input::new(vec![0.5, 0.5, 0.5]).unwrap())
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Expected 'x' to be an Input with 2 coordinates, but it has 3 instead."
        );
    }

    #[test]
    fn test_fit_hyperparameters_available_after_fit() {
        let mut emulator = seeded();
        emulator.fit(&training_data(2, 10)).unwrap();
        let hp = emulator.fit_hyperparameters().unwrap();
        assert_eq!(hp.corr().len(), 2);
        assert!(hp.cov() > 0.);
        assert!(hp.nugget().is_some());
    }

    #[test]
    fn test_fit_with_bounds_respected() {
        let data = training_data(2, 12);
        let bounds = [
            (Some(0.5), Some(1.)),
            (None, Some(2.)),
            (Some(0.1), Some(0.2)),
        ];
        let mut emulator = seeded();
        emulator.fit_with_bounds(&data, &bounds).unwrap();
        let hp = emulator.fit_hyperparameters().unwrap();
        let tol = 1e-10;
        assert!(hp.corr()[0] >= 0.5 * (1. - tol) && hp.corr()[0] <= 1. * (1. + tol));
        assert!(hp.corr()[1] <= 2. * (1. + tol));
        assert!(hp.cov() >= 0.1 * (1. - tol) && hp.cov() <= 0.2 * (1. + tol));
    }

    #[test]
    fn test_fit_with_bounds_errors() {
        let data = training_data(1, 5);
        let mut emulator = seeded();
        let err = emulator
            .fit_with_bounds(&data, &[(None, Some(0.)), (None, None)])
            .unwrap_err();
        assert_eq!(err.to_string(), "Value error: Upper bounds must be positive numbers");
        assert!(emulator.fit_with_bounds(&data, &[(None, None)]).is_err());
        assert!(emulator
            .fit_with_bounds(&data, &[(Some(2.), Some(1.)), (None, None)])
            .is_err());
        // non positive lower bounds are unbounded
        emulator
            .fit_with_bounds(&data, &[(Some(-1.), None), (Some(0.), None)])
            .unwrap();
        assert_eq!(emulator.training_data().len(), 5);
    }

    #[test]
    fn test_fit_with_hyperparameters_round_trip() {
        let data = training_data(2, 10);
        let hp = GpHyperparameters::new(vec![0.8, 1.5], 2.5, Some(1e-8)).unwrap();
        let mut emulator = seeded();
        emulator.fit_with_hyperparameters(&data, &hp).unwrap();
        assert_eq!(emulator.fit_hyperparameters(), Some(&hp));
    }

    #[test]
    fn test_fit_with_hyperparameters_nugget_conflict() {
        let data = training_data(1, 5);
        let hp = GpHyperparameters::new(vec![0.8], 2.5, None).unwrap();
        let mut emulator = GpEmulator::new(
            GpParams::new(ConstantMean(), SquaredExponentialCorr()).nugget_tuning(
                NuggetTuning::Estimated {
                    init: 1e-6,
                    bounds: (1e-10, 1e-2),
                },
            ),
        );
        assert!(emulator.fit_with_hyperparameters(&data, &hp).is_err());
        assert!(emulator.training_data().is_empty());

        let mut emulator = seeded();
        emulator.fit_with_hyperparameters(&data, &hp).unwrap();
        let fitted = emulator.fit_hyperparameters().unwrap();
        assert_abs_diff_eq!(fitted.cov(), 2.5, epsilon = 1e-9);
    }

    #[test]
    fn test_hyperparameters() {
        assert!(GpHyperparameters::new(vec![1., 0.], 1., None).is_err());
        assert!(GpHyperparameters::new(vec![1.], -1., None).is_err());
        assert!(GpHyperparameters::new(vec![1.], 1., Some(-1e-3)).is_err());
        assert!(GpHyperparameters::new(vec![1.], 1., Some(0.)).is_ok());

        let hp = GpHyperparameters::new(vec![1., 2.], 1.5, None).unwrap();
        assert_eq!(
            hp,
            GpHyperparameters::new(vec![1. + 1e-12, 2.], 1.5, None).unwrap()
        );
        assert_ne!(hp, GpHyperparameters::new(vec![1., 2.], 1.5, Some(0.)).unwrap());
    }

    #[test]
    fn test_transforms() {
        assert_abs_diff_eq!(GpHyperparameters::transform_corr(1.).unwrap(), 0.);
        assert_abs_diff_eq!(
            GpHyperparameters::transform_corr(std::f64::consts::E).unwrap(),
            -2.,
            epsilon = 1e-12
        );
        assert_abs_diff_eq!(GpHyperparameters::transform_cov(1.).unwrap(), 0.);
        assert_abs_diff_eq!(
            GpHyperparameters::transform_nugget(std::f64::consts::E).unwrap(),
            1.,
            epsilon = 1e-12
        );
        assert!(GpHyperparameters::transform_corr(0.).is_err());
        assert!(GpHyperparameters::transform_cov(-1.).is_err());
        assert!(GpHyperparameters::transform_nugget(0.).is_err());
    }

    #[test]
    fn test_theta_bounds_from_corr() {
        let (init, (lo, up)) = theta_bounds_from_corr((Some(0.5), Some(2.)), 1.);
        assert_abs_diff_eq!(lo, 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(up, 2., epsilon = 1e-12);
        assert_abs_diff_eq!(init, 0.5, epsilon = 1e-12);
        let (_, (lo, up)) = theta_bounds_from_corr((None, Some(1e-3)), 1.);
        assert_abs_diff_eq!(lo, 1e3, epsilon = 1e-9);
        assert_abs_diff_eq!(up, 1e3, epsilon = 1e-9);
        let (_, (lo, up)) = theta_bounds_from_corr((Some(0.), None), 1.);
        assert_eq!((lo, up), ThetaTuning::<f64>::DEFAULT_BOUNDS);
    }
}
