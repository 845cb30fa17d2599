//! This library implements [Gaussian Process](https://en.wikipedia.org/wiki/Gaussian_process) regression
//! also known as [Kriging](https://en.wikipedia.org/wiki/Kriging) models, used as emulators
//! of expensive computer simulations.
//!
//! GP methods are implemented by [GaussianProcess] parameterized by [GpParams].
//! Hyperparameters are estimated by maximizing the reduced likelihood with a
//! multistart COBYLA optimization, see [ThetaTuning], [VarianceTuning] and [NuggetTuning]
//! to control what is estimated.
//!
//! Quality of a fitted model can be assessed by cross validation with the
//! [metrics::PredictScore] trait.
#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]
mod algorithm;
pub mod correlation_models;
mod errors;
pub mod mean_models;
pub mod metrics;

mod parameters;
mod utils;

mod optimization;

pub use algorithm::*;
pub use errors::*;
pub use parameters::*;
pub use utils::{DiffMatrix, NormalizedData};
