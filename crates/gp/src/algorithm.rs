use crate::correlation_models::*;
use crate::errors::{GpError, Result};
use crate::mean_models::*;
use crate::optimization::{CobylaParams, optimize_multistart, prepare_multistart};
use crate::parameters::{GpParams, GpValidParams, NuggetTuning, ThetaTuning, VarianceTuning};
use crate::utils::{DiffMatrix, NormalizedData};

use linfa::prelude::{DatasetBase, Fit, Float, PredictInplace};
use linfa_linalg::{cholesky::*, qr::*, svd::*, triangular::*};
use ndarray::{Array1, Array2, ArrayBase, Axis, Data, Ix1, Ix2, Zip};
use ndarray_stats::QuantileExt;

use log::{debug, warn};
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;

/// Default number of multistart for hyperparameters optimization
pub const GP_OPTIM_N_START: usize = 10;
/// Minimum of function evaluations for COBYLA optimizer
pub const GP_COBYLA_MIN_EVAL: usize = 25;
/// Maximum of function evaluations for COBYLA optimizer
pub const GP_COBYLA_MAX_EVAL: usize = 1000;

/// Internal parameters computed Gp during training
/// used later on in prediction computations
#[derive(Clone, Debug)]
#[cfg_attr(
    feature = "serializable",
    derive(Serialize, Deserialize),
    serde(bound(deserialize = "F: Deserialize<'de>"))
)]
pub(crate) struct GpInnerParams<F: Float> {
    /// Gaussian process variance in output units
    sigma2: F,
    /// Generalized least-squares regression weights
    beta: Array2<F>,
    /// Gaussian Process weights
    gamma: Array2<F>,
    /// Cholesky decomposition of the correlation matrix \[R\]
    r_chol: Array2<F>,
    /// Solution of the linear equation system : \[R\] x Ft = y
    ft: Array2<F>,
    /// R upper triangle matrix of QR decomposition of the matrix Ft
    ft_qr_r: Array2<F>,
}

/// A GP regression is an interpolation method where the
/// interpolated values are modeled by a Gaussian process with a mean and
/// governed by a prior covariance kernel, which depends on some
/// parameters to be determined.
///
/// The interpolated output is modeled as stochastic process as follows:
///
/// `Y(x) = mu(x) + Z(x)`
///
/// where:
/// * `mu(x)` is the trend i.e. the mean of the gaussian process
/// * `Z(x)` the realization of stochastic gaussian process ~ `Normal(0, sigma^2)`
///
/// which in turn is written as:
///
/// `Y(x) = betas.regr(x) + sigma^2*corr(x, x')`
///
/// where:
/// * `betas` is a vector of linear regression parameters to be determined
/// * `regr(x)` a vector of polynomial basis functions
/// * `sigma^2` is the process variance
/// * `corr(x, x')` is a correlation function which depends on `distance(x, x')`
///   and a set of unknown parameters `thetas` to be determined.
///
/// Inputs and outputs are standardized before fitting, `theta` is thus expressed
/// in normalized input units, see [GaussianProcess::length_scales] for the
/// correlation lengths in input units.
///
/// # Hyperparameters
///
/// * `theta` is estimated by maximizing the reduced likelihood with COBYLA
///   from several starting points (see [GpParams::n_start]), or fixed.
/// * `sigma^2` is the profile likelihood optimum, possibly clamped or fixed,
///   see [VarianceTuning].
/// * the nugget added to the correlation matrix diagonal is fixed, adapted to
///   the conditioning of the matrix, or estimated along with theta,
///   see [NuggetTuning].
///
/// # Features
///
/// ## serializable
///
/// The `serializable` feature enables the serialization of GP models using the [`serde crate`](https://serde.rs/).
///
/// # Example
///
/// ```no_run
/// use exauq_gp::{correlation_models::*, mean_models::*, GaussianProcess};
/// use linfa::prelude::*;
/// use ndarray::{arr2, Array, Array1, Array2, Axis};
///
/// // one-dimensional test function to approximate
/// fn xsinx(x: &Array2<f64>) -> Array1<f64> {
///     ((x - 3.5) * ((x - 3.5) / std::f64::consts::PI).mapv(|v| v.sin())).remove_axis(Axis(1))
/// }
///
/// // training data
/// let xt = arr2(&[[0.0], [5.0], [10.0], [15.0], [18.0], [20.0], [25.0]]);
/// let yt = xsinx(&xt);
///
/// // GP with constant mean model and squared exponential correlation model
/// // i.e. Oridinary Kriging model
/// let kriging = GaussianProcess::<f64, ConstantMean, SquaredExponentialCorr>::params(
///                 ConstantMean::default(),
///                 SquaredExponentialCorr::default())
///                 .fit(&Dataset::new(xt, yt))
///                 .expect("Kriging trained");
///
/// // Use trained model for making predictions
/// let xtest = Array::linspace(0., 25., 26).insert_axis(Axis(1));
///
/// let (ypred, yvariances) = kriging.predict_valvar(&xtest).expect("Kriging prediction");
///```
///
/// # Reference:
///
/// Mohamed Amine Bouhlel, John T. Hwang, Nathalie Bartoli, Rémi Lafage, Joseph Morlier, Joaquim R.R.A. Martins,
/// [A Python surrogate modeling framework with derivatives](https://doi.org/10.1016/j.advengsoft.2019.03.005),
/// Advances in Engineering Software, Volume 135, 2019, 102662, ISSN 0965-9978.
#[derive(Clone, Debug)]
#[cfg_attr(
    feature = "serializable",
    derive(Serialize, Deserialize),
    serde(bound(
        serialize = "F: Serialize, Mean: Serialize, Corr: Serialize",
        deserialize = "F: Deserialize<'de>, Mean: Deserialize<'de>, Corr: Deserialize<'de>"
    ))
)]
pub struct GaussianProcess<F: Float, Mean: RegressionModel<F>, Corr: CorrelationModel<F>> {
    /// Parameter of the autocorrelation model equal to the inverse of length scale
    theta: Array1<F>,
    /// Nugget added to the correlation matrix diagonal
    nugget: F,
    /// Reduced likelihood value (result from internal optimization)
    /// Maybe used to compare different trained models
    likelihood: F,
    /// Gaussian process internal fitted params
    inner_params: GpInnerParams<F>,
    /// Training inputs
    xt_norm: NormalizedData<F>,
    /// Training outputs
    yt_norm: NormalizedData<F>,
    /// Training dataset (input, output)
    pub(crate) training_data: (Array2<F>, Array1<F>),
    /// Parameters used to fit this model
    pub(crate) params: GpValidParams<F, Mean, Corr>,
}

/// Kriging as GP special case when using constant mean and squared exponential correlation
pub type Kriging<F> = GpParams<F, ConstantMean, SquaredExponentialCorr>;

impl<F: Float> Kriging<F> {
    /// Kriging parameters constructor
    pub fn params() -> GpParams<F, ConstantMean, SquaredExponentialCorr> {
        GpParams::new(ConstantMean(), SquaredExponentialCorr())
    }
}

impl<F: Float, Mean: RegressionModel<F>, Corr: CorrelationModel<F>> fmt::Display
    for GaussianProcess<F, Mean, Corr>
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "GP(mean={}, corr={}, theta={}, variance={}, nugget={:e}, likelihood={})",
            self.params.mean,
            self.params.corr,
            self.theta,
            self.inner_params.sigma2,
            self.nugget,
            self.likelihood,
        )
    }
}

impl<F: Float, Mean: RegressionModel<F>, Corr: CorrelationModel<F>> GaussianProcess<F, Mean, Corr> {
    /// Gp parameters contructor
    pub fn params<NewMean: RegressionModel<F>, NewCorr: CorrelationModel<F>>(
        mean: NewMean,
        corr: NewCorr,
    ) -> GpParams<F, NewMean, NewCorr> {
        GpParams::new(mean, corr)
    }

    /// Predict output values at n given `x` points of nx components specified as a (n, nx) matrix.
    /// Returns n scalar output values as a vector (n,).
    pub fn predict(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<Array1<F>> {
        let xnorm = self.normalize_inputs(x)?;
        let corr = self.correlation(&xnorm);
        Ok(self.mean_at(&xnorm, &corr))
    }

    /// Predict variance values at n given `x` points of nx components specified as a (n, nx) matrix.
    /// Returns n variance values as (n,) column vector.
    pub fn predict_var(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<Array1<F>> {
        let xnorm = self.normalize_inputs(x)?;
        let corr = self.correlation(&xnorm);
        self.variance_at(&xnorm, &corr)
    }

    /// Predict both output values and variance at n given `x` points of nx components
    pub fn predict_valvar(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ) -> Result<(Array1<F>, Array1<F>)> {
        let xnorm = self.normalize_inputs(x)?;
        let corr = self.correlation(&xnorm);
        Ok((self.mean_at(&xnorm, &corr), self.variance_at(&xnorm, &corr)?))
    }

    fn normalize_inputs(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<Array2<F>> {
        if x.ncols() != self.xt_norm.ncols() {
            return Err(GpError::InvalidValueError(format!(
                "expected points with {} components, got {}",
                self.xt_norm.ncols(),
                x.ncols()
            )));
        }
        Ok(self.xt_norm.normalize(x))
    }

    /// Correlations between normalized points and training points as a (n, nt) matrix
    fn correlation(&self, xnorm: &Array2<F>) -> Array2<F> {
        let xt = &self.xt_norm.data;
        let mut r = Array2::zeros((xnorm.nrows(), xt.nrows()));
        Zip::from(r.rows_mut())
            .and(xnorm.rows())
            .par_for_each(|mut r_i, x_i| {
                let d = xt - &x_i;
                r_i.assign(&self.params.corr.value(&d, &self.theta).column(0));
            });
        r
    }

    fn mean_at(&self, xnorm: &Array2<F>, corr: &Array2<F>) -> Array1<F> {
        let inners = &self.inner_params;
        let f = self.params.mean.value(xnorm);
        let y_ = f.dot(&inners.beta) + corr.dot(&inners.gamma);
        self.yt_norm.denormalize(&y_).remove_axis(Axis(1))
    }

    /// Kriging mean squared error: sigma2 * (1 - r'R^-1r + u'(F'R^-1F)^-1u)
    fn variance_at(&self, xnorm: &Array2<F>, corr: &Array2<F>) -> Result<Array1<F>> {
        let inners = &self.inner_params;
        let rt = inners.r_chol.solve_triangular(&corr.t(), UPLO::Lower)?;
        let rhs = inners.ft.t().dot(&rt) - self.params.mean.value(xnorm).t();
        let u = inners.ft_qr_r.t().solve_triangular(&rhs, UPLO::Lower)?;

        let r_part = rt.mapv(|v| v * v).sum_axis(Axis(0));
        let u_part = u.mapv(|v| v * v).sum_axis(Axis(0));
        // may be slightly negative due to machine precision
        Ok(Zip::from(&r_part)
            .and(&u_part)
            .map_collect(|&r2, &u2| (inners.sigma2 * (F::one() - r2 + u2)).max(F::zero())))
    }

    /// Retrieve optimized hyperparameters theta
    pub fn theta(&self) -> &Array1<F> {
        &self.theta
    }

    /// Correlation lengths in input units, i.e. `x_std / theta` componentwise
    pub fn length_scales(&self) -> Array1<F> {
        &self.xt_norm.std / &self.theta
    }

    /// Estimated variance
    pub fn variance(&self) -> F {
        self.inner_params.sigma2
    }

    /// Nugget used to factorize the correlation matrix
    pub fn nugget(&self) -> F {
        self.nugget
    }

    /// Retrieve reduced likelihood value
    pub fn likelihood(&self) -> F {
        self.likelihood
    }

    /// Retrieve input and output dimensions
    pub fn dims(&self) -> (usize, usize) {
        (self.xt_norm.ncols(), self.yt_norm.ncols())
    }

    /// Training inputs (n, nx) and outputs (n,)
    pub fn training_data(&self) -> &(Array2<F>, Array1<F>) {
        &self.training_data
    }

    /// Parameters used to fit this model
    pub fn params_used(&self) -> &GpValidParams<F, Mean, Corr> {
        &self.params
    }
}

impl<F, D, Mean, Corr> PredictInplace<ArrayBase<D, Ix2>, Array1<F>>
    for GaussianProcess<F, Mean, Corr>
where
    F: Float,
    D: Data<Elem = F>,
    Mean: RegressionModel<F>,
    Corr: CorrelationModel<F>,
{
    fn predict_inplace(&self, x: &ArrayBase<D, Ix2>, y: &mut Array1<F>) {
        assert_eq!(
            x.nrows(),
            y.len(),
            "The number of data points must match the number of output targets."
        );
        match self.predict(x) {
            Ok(values) => *y = values,
            Err(err) => {
                warn!("GP prediction failed: {err}");
                y.fill(F::nan());
            }
        }
    }

    fn default_target(&self, x: &ArrayBase<D, Ix2>) -> Array1<F> {
        Array1::zeros((x.nrows(),))
    }
}

fn check_training_data<F: Float>(
    x: &ArrayBase<impl Data<Elem = F>, Ix2>,
    y: &ArrayBase<impl Data<Elem = F>, Ix1>,
    n_basis: usize,
) -> Result<()> {
    if x.nrows() == 0 {
        return Err(GpError::TrainingDataError("no training points".to_string()));
    }
    if x.nrows() != y.len() {
        return Err(GpError::TrainingDataError(format!(
            "{} input points but {} output values",
            x.nrows(),
            y.len()
        )));
    }
    if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
        return Err(GpError::TrainingDataError(
            "training data contain non finite values".to_string(),
        ));
    }
    if x.nrows() < n_basis {
        return Err(GpError::TrainingDataError(format!(
            "at least {n_basis} training points are required by the mean model, got {}",
            x.nrows()
        )));
    }
    Ok(())
}

/// Broadcast a one element array to `dim` elements, or check it has `dim` elements
fn expand_to_dim<T: Clone>(name: &str, values: &Array1<T>, dim: usize) -> Result<Array1<T>> {
    match values.len() {
        1 => Ok(Array1::from_elem(dim, values[0].clone())),
        n if n == dim => Ok(values.to_owned()),
        n => Err(GpError::InvalidValueError(format!(
            "{name} should have either 1 or {dim} (input dimension) elements, got {n}"
        ))),
    }
}

fn as_f64<F: Float>(v: F) -> f64 {
    v.to_f64().unwrap_or(f64::NAN)
}

/// Express the variance tuning wrt normalized outputs of standard deviation `ystd`
fn normalized_variance<F: Float>(tuning: &VarianceTuning<F>, ystd: F) -> VarianceTuning<F> {
    let scale = ystd * ystd;
    match *tuning {
        VarianceTuning::Estimated => VarianceTuning::Estimated,
        VarianceTuning::Bounded(lo, up) => VarianceTuning::Bounded(lo / scale, up / scale),
        VarianceTuning::Fixed(v) => VarianceTuning::Fixed(v / scale),
    }
}

impl<F: Float, Mean: RegressionModel<F>, Corr: CorrelationModel<F>, D: Data<Elem = F>>
    Fit<ArrayBase<D, Ix2>, ArrayBase<D, Ix1>, GpError> for GpValidParams<F, Mean, Corr>
{
    type Object = GaussianProcess<F, Mean, Corr>;

    /// Fit GP parameters using maximum likelihood
    fn fit(
        &self,
        dataset: &DatasetBase<ArrayBase<D, Ix2>, ArrayBase<D, Ix1>>,
    ) -> Result<Self::Object> {
        let x = dataset.records();
        let y = dataset.targets();
        let dim = x.ncols();
        check_training_data(x, y, self.mean().n_basis(dim))?;

        let theta0 = expand_to_dim("theta initial guess", self.theta_tuning().init(), dim)?;
        let (active, theta_bounds) = match self.theta_tuning() {
            ThetaTuning::Fixed(_) => (vec![], vec![]),
            ThetaTuning::Full { bounds, .. } => (
                (0..dim).collect::<Vec<_>>(),
                expand_to_dim("theta bounds", bounds, dim)?.to_vec(),
            ),
            ThetaTuning::Partial { bounds, active, .. } => {
                if let Some(i) = active.iter().find(|&&i| i >= dim) {
                    return Err(GpError::InvalidValueError(format!(
                        "active component {i} out of input dimension {dim}"
                    )));
                }
                let bounds = expand_to_dim("theta bounds", bounds, dim)?;
                (active.to_vec(), active.iter().map(|&i| bounds[i]).collect())
            }
        };

        let xtrain = NormalizedData::new(x);
        let ytrain = NormalizedData::new(&y.view().insert_axis(Axis(1)));
        let x_distances = DiffMatrix::new(&xtrain.data);
        if x_distances
            .d
            .rows()
            .into_iter()
            .any(|row| row.iter().all(|v| *v == F::zero()))
        {
            warn!("Training inputs contain the same point several times");
        }
        let fx = self.mean().value(&xtrain.data);
        let variance = normalized_variance(self.variance_tuning(), ytrain.std[0]);

        let likelihood = |theta: &Array1<F>, nugget: F| -> Result<(F, F, GpInnerParams<F>)> {
            let rxx = self.corr().value(&x_distances.d, theta);
            match self.nugget_tuning() {
                NuggetTuning::Adaptive => {
                    adaptive_likelihood(&fx, &rxx, &x_distances, &ytrain, &variance)
                }
                _ => reduced_likelihood(&fx, &rxx, &x_distances, &ytrain, nugget, &variance)
                    .map(|(lkh, inners)| (lkh, nugget, inners)),
            }
        };

        // Optimization is done wrt log10 of active theta components then log10 nugget if estimated
        let nugget0 = self.nugget_tuning().init();
        let nugget_bounds = match self.nugget_tuning() {
            NuggetTuning::Estimated { bounds, .. } => Some(*bounds),
            _ => None,
        };
        let mut x0: Vec<f64> = active.iter().map(|&i| as_f64(theta0[i]).log10()).collect();
        let mut bounds: Vec<(f64, f64)> = theta_bounds
            .iter()
            .map(|(lo, up)| (as_f64(*lo).log10(), as_f64(*up).log10()))
            .collect();
        if let Some((lo, up)) = nugget_bounds {
            x0.push(as_f64(nugget0).log10());
            bounds.push((as_f64(lo).log10(), as_f64(up).log10()));
        }
        // COBYLA may end slightly outside of the bounds
        let unpack = |params: &[f64]| -> (Array1<F>, F) {
            let clamped: Vec<f64> = params
                .iter()
                .zip(&bounds)
                .map(|(v, (lo, up))| v.clamp(*lo, *up))
                .collect();
            let mut theta = theta0.to_owned();
            for (&i, v) in active.iter().zip(&clamped) {
                theta[i] = F::cast(10f64.powf(*v));
            }
            let nugget = match nugget_bounds {
                Some(_) => F::cast(10f64.powf(clamped[active.len()])),
                None => nugget0,
            };
            (theta, nugget)
        };

        let (theta, nugget) = if x0.is_empty() {
            (theta0.to_owned(), nugget0)
        } else {
            let objfn = |params: &[f64]| -> f64 {
                // optimizer may return nan values
                if params.iter().any(|v| v.is_nan()) {
                    return f64::INFINITY;
                }
                let (theta, nugget) = unpack(params);
                match likelihood(&theta, nugget) {
                    Ok((lkh, _, _)) => {
                        let lkh = as_f64(lkh);
                        if lkh.is_finite() { -lkh } else { f64::INFINITY }
                    }
                    Err(_) => f64::INFINITY,
                }
            };

            let starts = prepare_multistart(self.n_start(), &Array1::from(x0), &bounds, self.seed());
            debug!("Optimize with multistart {starts:?} and bounds = {bounds:?}");
            let cobyla = CobylaParams {
                maxeval: (10 * bounds.len()).clamp(GP_COBYLA_MIN_EVAL, self.max_eval()),
                ..CobylaParams::default()
            };
            let now = Instant::now();
            let (fmin, best) = optimize_multistart(objfn, &starts, &bounds, &cobyla);
            debug!(
                "Likelihood optimization: best = {fmin}, elapsed = {}ms",
                now.elapsed().as_millis()
            );
            unpack(&best.to_vec())
        };

        let (likelihood, nugget, inner_params) = likelihood(&theta, nugget)?;
        if nugget > nugget0 && matches!(self.nugget_tuning(), NuggetTuning::Adaptive) {
            warn!("Correlation matrix ill-conditioned, nugget raised to {nugget:e}");
        }
        Ok(GaussianProcess {
            theta,
            nugget,
            likelihood,
            inner_params,
            xt_norm: xtrain,
            yt_norm: ytrain,
            training_data: (x.to_owned(), y.to_owned()),
            params: self.clone(),
        })
    }
}

/// Reduced likelihood where the nugget starts from its default value and is
/// multiplied by 10 on each factorization failure.
/// Returns (likelihood, nugget used, inner params)
fn adaptive_likelihood<F: Float>(
    fx: &Array2<F>,
    rxx: &Array2<F>,
    x_distances: &DiffMatrix<F>,
    ytrain: &NormalizedData<F>,
    variance: &VarianceTuning<F>,
) -> Result<(F, F, GpInnerParams<F>)> {
    let max_nugget = F::cast(NuggetTuning::<F>::ADAPTIVE_MAX);
    let ten = F::cast(10.);
    let mut nugget = NuggetTuning::<F>::default_nugget();
    loop {
        match reduced_likelihood(fx, rxx, x_distances, ytrain, nugget, variance) {
            Ok((lkh, inners)) => return Ok((lkh, nugget, inners)),
            Err(GpError::LinalgError(err)) if nugget * ten <= max_nugget => {
                debug!("Factorization failed with nugget {nugget:e} ({err}), retry");
                nugget *= ten;
            }
            Err(err) => return Err(err),
        }
    }
}

/// Compute reduced likelihood function
/// fx: mean factors term at x samples,
/// rxx: correlation factors at x samples,
/// x_distances: pairwise distances between x samples
/// ytrain: normalized output training values
/// nugget: factor to improve numerical stability
/// variance: process variance handling wrt normalized outputs
///
/// With `rho^2` the generalized least squares residual, the log10 likelihood up to constants is
/// `-(n log10(sigma2) + log10|R| + (rho^2 / sigma2 - n) / ln(10))`
/// which reduces to `-n (log10(sigma2) + log10|R| / n)` at the optimum `sigma2 = rho^2 / n`.
fn reduced_likelihood<F: Float>(
    fx: &Array2<F>,
    rxx: &Array2<F>,
    x_distances: &DiffMatrix<F>,
    ytrain: &NormalizedData<F>,
    nugget: F,
    variance: &VarianceTuning<F>,
) -> Result<(F, GpInnerParams<F>)> {
    let n = x_distances.n_obs;
    let mut r_mx = Array2::<F>::eye(n) * (F::one() + nugget);
    for (k, ij) in x_distances.d_indices.rows().into_iter().enumerate() {
        r_mx[[ij[0], ij[1]]] = rxx[[k, 0]];
        r_mx[[ij[1], ij[0]]] = rxx[[k, 0]];
    }

    let r_chol = r_mx.cholesky()?;
    // Solve generalized least squared problem
    let ft = r_chol.solve_triangular(fx, UPLO::Lower)?;
    let (ft_qr_q, ft_qr_r) = ft.qr()?.into_decomp();

    // Check whether we have an ill-conditionned problem
    let (_, sv_qr_r, _) = ft_qr_r.svd(false, false)?;
    let to_err = |e: ndarray_stats::errors::MinMaxError| {
        GpError::LikelihoodComputationError(format!("singular values: {e}"))
    };
    let cond_ft = *sv_qr_r.min().map_err(to_err)? / *sv_qr_r.max().map_err(to_err)?;
    if !(cond_ft >= F::cast(1e-10)) {
        return Err(GpError::LikelihoodComputationError(
            "Regression matrix too ill conditioned, try other correlation parameters".to_string(),
        ));
    }

    let yt = r_chol.solve_triangular(&ytrain.data, UPLO::Lower)?;
    let beta = ft_qr_r.solve_triangular_into(ft_qr_q.t().dot(&yt), UPLO::Upper)?;
    let rho = yt - ft.dot(&beta);
    let rho_sqr = rho.mapv(|v| v * v).sum();
    let gamma = r_chol.t().solve_triangular_into(rho, UPLO::Upper)?;

    // The determinant of R is equal to the squared product of
    // the diagonal elements of its Cholesky decomposition r_chol
    let n_obs = F::cast(n);
    let log10_det = r_chol.diag().mapv(|v| v.log10()).sum() * F::cast(2.);

    // zero residuals (constant outputs, single point) keep a tiny positive variance
    let sigma2_opt = (rho_sqr / n_obs).max(F::epsilon());
    let sigma2 = match *variance {
        VarianceTuning::Estimated => sigma2_opt,
        VarianceTuning::Bounded(lo, up) => sigma2_opt.max(lo).min(up),
        VarianceTuning::Fixed(v) => v,
    };
    let misfit = if sigma2 == sigma2_opt {
        F::zero()
    } else {
        (rho_sqr / sigma2 - n_obs) / F::cast(std::f64::consts::LN_10)
    };
    let reduced_likelihood = -(n_obs * sigma2.log10() + log10_det + misfit);

    Ok((
        reduced_likelihood,
        GpInnerParams {
            sigma2: sigma2 * ytrain.std[0] * ytrain.std[0],
            beta,
            gamma,
            r_chol,
            ft,
            ft_qr_r,
        },
    ))
}
