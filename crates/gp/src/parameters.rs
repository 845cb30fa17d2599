use crate::correlation_models::CorrelationModel;
use crate::errors::{GpError, Result};
use crate::mean_models::RegressionModel;
use crate::{GP_COBYLA_MAX_EVAL, GP_COBYLA_MIN_EVAL, GP_OPTIM_N_START};
use linfa::{Float, ParamGuard};

use ndarray::{Array1, array};
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};

/// An enum to represent a n-dim hyper parameter tuning
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub enum ThetaTuning<F: Float> {
    /// Constant parameter (ie given not estimated)
    Fixed(Array1<F>),
    /// Parameter is optimized between given bounds (lower, upper) starting from the inital guess
    Full {
        /// Initial guess for the parameter
        init: Array1<F>,
        /// Bounds for the parameter array(lower, upper)
        bounds: Array1<(F, F)>,
    },
    /// Parameter is partially optimized on specified active components,
    /// the other components keep their initial value
    Partial {
        /// Initial guess for the parameter
        init: Array1<F>,
        /// Bounds for the parameter array(lower, upper)
        bounds: Array1<(F, F)>,
        /// Active components for the parameter optimization
        active: Vec<usize>,
    },
}

impl<F: Float> Default for ThetaTuning<F> {
    fn default() -> Self {
        ThetaTuning::Full {
            init: array![F::cast(ThetaTuning::<F>::DEFAULT_INIT)],
            bounds: array![(
                F::cast(ThetaTuning::<F>::DEFAULT_BOUNDS.0),
                F::cast(ThetaTuning::<F>::DEFAULT_BOUNDS.1),
            )],
        }
    }
}

impl<F: Float> ThetaTuning<F> {
    /// Default initial theta value
    pub const DEFAULT_INIT: f64 = 1e-1;
    /// Default bounds for theta values
    pub const DEFAULT_BOUNDS: (f64, f64) = (1e-2, 1e1);

    /// Get initial theta value
    pub fn init(&self) -> &Array1<F> {
        match self {
            ThetaTuning::Full { init, .. } | ThetaTuning::Partial { init, .. } => init,
            ThetaTuning::Fixed(init) => init,
        }
    }

    /// Get bounds for theta value
    pub fn bounds(&self) -> Option<&Array1<(F, F)>> {
        match self {
            ThetaTuning::Full { bounds, .. } | ThetaTuning::Partial { bounds, .. } => Some(bounds),
            ThetaTuning::Fixed(_) => None,
        }
    }
}

/// Process variance `sigma^2` handling, values are expressed in output units.
///
/// When estimated, the variance is the profile likelihood optimum `rho^2 / n`
/// given the correlation parameters.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub enum VarianceTuning<F: Float> {
    /// Profile likelihood optimum
    #[default]
    Estimated,
    /// Profile likelihood optimum clamped to (lower, upper)
    Bounded(F, F),
    /// Given variance
    Fixed(F),
}

/// Nugget handling: the nugget is added to the diagonal of the correlation matrix
/// to improve its conditioning.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub enum NuggetTuning<F: Float> {
    /// Given nugget
    Fixed(F),
    /// Start from the default nugget and multiply it by 10 each time the
    /// correlation matrix factorization fails, up to [NuggetTuning::ADAPTIVE_MAX]
    Adaptive,
    /// Nugget is optimized along with theta between given bounds (lower, upper)
    Estimated {
        /// Initial guess
        init: F,
        /// Bounds (lower, upper), lower has to be strictly positive
        bounds: (F, F),
    },
}

impl<F: Float> Default for NuggetTuning<F> {
    fn default() -> Self {
        NuggetTuning::Fixed(Self::default_nugget())
    }
}

impl<F: Float> NuggetTuning<F> {
    /// Largest nugget tried by the adaptive strategy
    pub const ADAPTIVE_MAX: f64 = 1e-2;

    /// Nugget used by default: `100 * epsilon`
    pub fn default_nugget() -> F {
        F::cast(100.0) * F::epsilon()
    }

    /// Nugget value used to start fitting
    pub fn init(&self) -> F {
        match self {
            NuggetTuning::Fixed(v) => *v,
            NuggetTuning::Adaptive => Self::default_nugget(),
            NuggetTuning::Estimated { init, .. } => *init,
        }
    }
}

/// A set of validated GP parameters.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serializable",
    derive(Serialize, Deserialize),
    serde(bound(
        serialize = "F: Serialize, Mean: Serialize, Corr: Serialize",
        deserialize = "F: Deserialize<'de>, Mean: Deserialize<'de>, Corr: Deserialize<'de>"
    ))
)]
pub struct GpValidParams<F: Float, Mean: RegressionModel<F>, Corr: CorrelationModel<F>> {
    /// Parameter tuning hint of the autocorrelation model
    pub(crate) theta_tuning: ThetaTuning<F>,
    /// Process variance handling
    pub(crate) variance_tuning: VarianceTuning<F>,
    /// Nugget handling
    pub(crate) nugget_tuning: NuggetTuning<F>,
    /// Regression model representing the mean(x)
    pub(crate) mean: Mean,
    /// Correlation model representing the spatial correlation between errors at e(x) and e(x')
    pub(crate) corr: Corr,
    /// Number of internal likelihood optimization restart
    pub(crate) n_start: usize,
    /// Max number of internal likelihood evaluation during optimization
    pub(crate) max_eval: usize,
    /// Seed of the multistart initial points generator
    pub(crate) seed: Option<u64>,
}

impl<F: Float, Mean: RegressionModel<F>, Corr: CorrelationModel<F>> Default
    for GpValidParams<F, Mean, Corr>
{
    fn default() -> GpValidParams<F, Mean, Corr> {
        GpValidParams {
            theta_tuning: ThetaTuning::default(),
            variance_tuning: VarianceTuning::default(),
            nugget_tuning: NuggetTuning::default(),
            mean: Mean::default(),
            corr: Corr::default(),
            n_start: GP_OPTIM_N_START,
            max_eval: GP_COBYLA_MAX_EVAL,
            seed: None,
        }
    }
}

impl<F: Float, Mean: RegressionModel<F>, Corr: CorrelationModel<F>> GpValidParams<F, Mean, Corr> {
    /// Get mean model
    pub fn mean(&self) -> &Mean {
        &self.mean
    }

    /// Get correlation corr k(x, x')
    pub fn corr(&self) -> &Corr {
        &self.corr
    }

    /// Get starting theta value for optimization
    pub fn theta_tuning(&self) -> &ThetaTuning<F> {
        &self.theta_tuning
    }

    /// Get process variance handling
    pub fn variance_tuning(&self) -> &VarianceTuning<F> {
        &self.variance_tuning
    }

    /// Get nugget handling
    pub fn nugget_tuning(&self) -> &NuggetTuning<F> {
        &self.nugget_tuning
    }

    /// Get the number of internal optimization restart
    pub fn n_start(&self) -> usize {
        self.n_start
    }

    /// Get the max number of internal likelihood evaluations during one optimization
    pub fn max_eval(&self) -> usize {
        self.max_eval
    }

    /// Get the seed of multistart points generation
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }
}

#[derive(Clone, Debug)]
/// The set of hyperparameters that can be specified for the execution of
/// the [GP algorithm](struct.GaussianProcess.html).
pub struct GpParams<F: Float, Mean: RegressionModel<F>, Corr: CorrelationModel<F>>(
    GpValidParams<F, Mean, Corr>,
);

impl<F: Float, Mean: RegressionModel<F>, Corr: CorrelationModel<F>> GpParams<F, Mean, Corr> {
    /// A constructor for GP parameters given mean and correlation models
    pub fn new(mean: Mean, corr: Corr) -> GpParams<F, Mean, Corr> {
        Self(GpValidParams {
            mean,
            corr,
            ..Default::default()
        })
    }

    /// A constructor for GP parameters from validated parameters
    pub fn new_from_valid(params: &GpValidParams<F, Mean, Corr>) -> Self {
        Self(params.clone())
    }

    /// Set mean model.
    pub fn mean(mut self, mean: Mean) -> Self {
        self.0.mean = mean;
        self
    }

    /// Set correlation model.
    pub fn corr(mut self, corr: Corr) -> Self {
        self.0.corr = corr;
        self
    }

    /// Set value for theta hyper parameter.
    ///
    /// When theta is optimized, the internal optimization is started from `theta_init`.
    /// When theta is fixed, this set theta constant value.
    pub fn theta_init(mut self, theta_init: Array1<F>) -> Self {
        self.0.theta_tuning = match self.0.theta_tuning {
            ThetaTuning::Full { bounds, .. } | ThetaTuning::Partial { bounds, .. } => {
                ThetaTuning::Full {
                    init: theta_init,
                    bounds,
                }
            }
            ThetaTuning::Fixed(_) => ThetaTuning::Fixed(theta_init),
        };
        self
    }

    /// Set theta hyper parameter search space.
    ///
    /// This function is no-op when theta tuning is fixed
    pub fn theta_bounds(mut self, theta_bounds: Array1<(F, F)>) -> Self {
        self.0.theta_tuning = match self.0.theta_tuning {
            ThetaTuning::Full { init, .. } | ThetaTuning::Partial { init, .. } => {
                ThetaTuning::Full {
                    init,
                    bounds: theta_bounds,
                }
            }
            fixed => fixed,
        };
        self
    }

    /// Set theta hyper parameter tuning
    pub fn theta_tuning(mut self, theta_tuning: ThetaTuning<F>) -> Self {
        self.0.theta_tuning = theta_tuning;
        self
    }

    /// Set process variance handling
    pub fn variance_tuning(mut self, variance_tuning: VarianceTuning<F>) -> Self {
        self.0.variance_tuning = variance_tuning;
        self
    }

    /// Set a fixed nugget.
    ///
    /// Nugget is used to improve numerical stability
    pub fn nugget(mut self, nugget: F) -> Self {
        self.0.nugget_tuning = NuggetTuning::Fixed(nugget);
        self
    }

    /// Set nugget handling
    pub fn nugget_tuning(mut self, nugget_tuning: NuggetTuning<F>) -> Self {
        self.0.nugget_tuning = nugget_tuning;
        self
    }

    /// Set the number of internal GP hyperparameter theta optimization restarts
    pub fn n_start(mut self, n_start: usize) -> Self {
        self.0.n_start = n_start;
        self
    }

    /// Set the max number of internal likelihood evaluations during one optimization
    /// Given max_eval has to be greater than [crate::GP_COBYLA_MIN_EVAL] otherwise
    /// max_eval is set to [crate::GP_COBYLA_MIN_EVAL].
    pub fn max_eval(mut self, max_eval: usize) -> Self {
        self.0.max_eval = GP_COBYLA_MIN_EVAL.max(max_eval);
        self
    }

    /// Set the seed used to generate multistart initial points.
    /// When `None`, the generator is seeded from entropy.
    pub fn seed(mut self, seed: Option<u64>) -> Self {
        self.0.seed = seed;
        self
    }
}

impl<F: Float, Mean: RegressionModel<F>, Corr: CorrelationModel<F>>
    From<GpValidParams<F, Mean, Corr>> for GpParams<F, Mean, Corr>
{
    fn from(valid: GpValidParams<F, Mean, Corr>) -> Self {
        GpParams(valid)
    }
}

fn check_positive_bounds<F: Float>(name: &str, lo: F, up: F) -> Result<()> {
    if !(lo > F::zero() && up >= lo && up.is_finite()) {
        return Err(GpError::InvalidValueError(format!(
            "`{name}` bounds should satisfy 0 < lower <= upper < inf, got ({lo}, {up})"
        )));
    }
    Ok(())
}

impl<F: Float, Mean: RegressionModel<F>, Corr: CorrelationModel<F>> ParamGuard
    for GpParams<F, Mean, Corr>
{
    type Checked = GpValidParams<F, Mean, Corr>;
    type Error = GpError;

    fn check_ref(&self) -> Result<&Self::Checked> {
        let theta_tuning = self.0.theta_tuning();
        if theta_tuning.init().iter().any(|t| !(*t > F::zero())) {
            return Err(GpError::InvalidValueError(format!(
                "`theta` initial values should be positive, got {}",
                theta_tuning.init()
            )));
        }
        if let Some(bounds) = theta_tuning.bounds() {
            for (lo, up) in bounds.iter() {
                check_positive_bounds("theta", *lo, *up)?;
            }
        }
        if let ThetaTuning::Partial { init, active, .. } = theta_tuning {
            if let Some(i) = active.iter().find(|&&i| init.len() > 1 && i >= init.len()) {
                return Err(GpError::InvalidValueError(format!(
                    "active component {i} out of theta range (len = {})",
                    init.len()
                )));
            }
        }

        match self.0.variance_tuning {
            VarianceTuning::Estimated => (),
            VarianceTuning::Bounded(lo, up) => check_positive_bounds("variance", lo, up)?,
            VarianceTuning::Fixed(v) => {
                if !(v > F::zero() && v.is_finite()) {
                    return Err(GpError::InvalidValueError(format!(
                        "fixed variance should be positive, got {v}"
                    )));
                }
            }
        }

        match self.0.nugget_tuning {
            NuggetTuning::Fixed(v) => {
                if !(v >= F::zero() && v.is_finite()) {
                    return Err(GpError::InvalidValueError(format!(
                        "nugget should be non negative, got {v}"
                    )));
                }
            }
            NuggetTuning::Adaptive => (),
            NuggetTuning::Estimated { init, bounds } => {
                check_positive_bounds("nugget", bounds.0, bounds.1)?;
                if init < bounds.0 || init > bounds.1 {
                    return Err(GpError::InvalidValueError(format!(
                        "nugget initial value {init} out of bounds ({}, {})",
                        bounds.0, bounds.1
                    )));
                }
            }
        }
        Ok(&self.0)
    }

    fn check(self) -> Result<Self::Checked> {
        self.check_ref()?;
        Ok(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Kriging;

    #[test]
    fn test_default_params_valid() {
        let params = Kriging::<f64>::params().check().expect("valid");
        assert_eq!(params.n_start(), GP_OPTIM_N_START);
        assert_eq!(params.variance_tuning(), &VarianceTuning::Estimated);
        assert_eq!(
            params.nugget_tuning(),
            &NuggetTuning::Fixed(100. * f64::EPSILON)
        );
    }

    #[test]
    fn test_invalid_theta() {
        assert!(
            Kriging::<f64>::params()
                .theta_init(array![-1.])
                .check()
                .is_err()
        );
        assert!(
            Kriging::<f64>::params()
                .theta_bounds(array![(1., 0.1)])
                .check()
                .is_err()
        );
    }

    #[test]
    fn test_invalid_variance_and_nugget() {
        assert!(
            Kriging::<f64>::params()
                .variance_tuning(VarianceTuning::Bounded(0., 1.))
                .check()
                .is_err()
        );
        assert!(
            Kriging::<f64>::params()
                .variance_tuning(VarianceTuning::Fixed(-2.))
                .check()
                .is_err()
        );
        assert!(Kriging::<f64>::params().nugget(-1e-3).check().is_err());
        assert!(
            Kriging::<f64>::params()
                .nugget_tuning(NuggetTuning::Estimated {
                    init: 1.,
                    bounds: (1e-8, 1e-2)
                })
                .check()
                .is_err()
        );
    }

    #[test]
    fn test_theta_bounds_kept_when_fixed() {
        let params = Kriging::<f64>::params()
            .theta_tuning(ThetaTuning::Fixed(array![0.5]))
            .theta_bounds(array![(0.1, 1.)])
            .check()
            .expect("valid");
        assert_eq!(params.theta_tuning(), &ThetaTuning::Fixed(array![0.5]));
    }

    #[test]
    fn test_max_eval_lower_bound() {
        let params = Kriging::<f64>::params().max_eval(3).check().expect("valid");
        assert_eq!(params.max_eval(), GP_COBYLA_MIN_EVAL);
    }
}
