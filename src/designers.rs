//! Experimental designs to choose the simulator inputs to run.

use crate::errors::{ExauqError, Result};
use crate::modelling::{Input, SimulatorDomain};

use exauq_doe::{Lhs, LhsKind, SamplingMethod};
use log::debug;
use ndarray::Array2;
use ndarray_rand::rand::SeedableRng;
use rand_xoshiro::Xoshiro256Plus;

/// Create a one-shot design of `batch_size` inputs of `domain` by Latin hypercube sampling.
///
/// A classic LHS is drawn in the unit hypercube then scaled onto the domain.
/// Giving the same `seed` gives the same design, otherwise the random generator
/// is seeded from entropy.
///
/// ```
/// use exauq::{SimulatorDomain, oneshot_lhs};
///
/// let domain = SimulatorDomain::new(vec![(-1., 1.), (0., 100.)]).unwrap();
/// let design = oneshot_lhs(&domain, 8, Some(1)).unwrap();
/// assert_eq!(design.len(), 8);
/// assert!(design.iter().all(|x| domain.contains(x)));
/// ```
pub fn oneshot_lhs(
    domain: &SimulatorDomain,
    batch_size: usize,
    seed: Option<u64>,
) -> Result<Vec<Input>> {
    if batch_size == 0 {
        return Err(ExauqError::InvalidValue(
            "batch size should be a positive integer, got 0".to_string(),
        ));
    }
    let unit_cube = Array2::from_shape_fn((domain.dim(), 2), |(_, j)| j as f64);
    let rng = match seed {
        Some(seed) => Xoshiro256Plus::seed_from_u64(seed),
        None => Xoshiro256Plus::from_entropy(),
    };
    let doe = Lhs::new(&unit_cube)
        .kind(LhsKind::Classic)
        .with_rng(rng)
        .sample(batch_size);
    debug!(
        "LHS of {batch_size} points in dimension {} (seed = {seed:?})",
        domain.dim()
    );

    doe.rows()
        .into_iter()
        .map(|row| domain.scale(&row.to_vec()))
        .collect()
}
