//! A toolkit to emulate expensive deterministic simulators with Gaussian processes.
//!
//! The workflow is the following:
//! * define the simulator input domain with [SimulatorDomain],
//! * choose inputs to run the simulator at with a one-shot Latin hypercube design [oneshot_lhs],
//! * train a [GpEmulator] on the resulting [TrainingDatum]s,
//! * make [Prediction]s at new inputs, with a variance and a normalised expected
//!   square error against true simulator outputs.
//!
//! ```no_run
//! use exauq::{Emulator, GpEmulator, SimulatorDomain, TrainingDatum, Input, oneshot_lhs};
//!
//! fn simulator(x: &Input) -> f64 {
//!     x[0] + x[1].powi(2) + x[0] * x[1].sin()
//! }
//!
//! let domain = SimulatorDomain::new(vec![(-1., 1.), (0., 100.)]).unwrap();
//! let design = oneshot_lhs(&domain, 20, Some(1)).unwrap();
//! let data: Vec<TrainingDatum> = design
//!     .into_iter()
//!     .map(|x| { let y = simulator(&x); TrainingDatum::new(x, y).unwrap() })
//!     .collect();
//!
//! let mut gp: GpEmulator = GpEmulator::default();
//! gp.fit(&data).unwrap();
//!
//! let x = Input::new(vec![0.5, 50.]).unwrap();
//! let prediction = gp.predict(&x).unwrap();
//! println!("{prediction}, nes error = {}", prediction.nes_error(simulator(&x)));
//! ```
//!
//! GP regression itself is implemented in the `exauq-gp` crate and Latin hypercube
//! sampling in the `exauq-doe` crate.

mod designers;
mod emulators;
mod errors;
mod modelling;
pub mod numerics;

pub use designers::*;
pub use emulators::*;
pub use errors::*;
pub use modelling::*;
