/*!
This library implements [Latin Hypercube sampling](https://en.wikipedia.org/wiki/Latin_hypercube_sampling)
designs used to build one-shot experimental designs for simulator emulators.

A design is generated within a sampling space `xlimits`, a 2D ndarray `(nx, 2)` giving
the lower bound and upper bound of each of the `nx` components of the samples `x`.

Example:
```
use exauq_doe::{Lhs, LhsKind, SamplingMethod};
use ndarray::arr2;
use ndarray_rand::rand::SeedableRng;
use rand_xoshiro::Xoshiro256Plus;

// Sampling space is [5., 10.] x [0., 1.], samples are 2-dimensional.
let xlimits = arr2(&[[5., 10.], [0., 1.]]);
// Five samples, one per stratum of each component, repeatable thanks to the seeded generator.
let samples = Lhs::new(&xlimits)
    .kind(LhsKind::Classic)
    .with_rng(Xoshiro256Plus::seed_from_u64(42))
    .sample(5);
assert_eq!(samples.shape(), &[5, 2]);
```

The available designs are described by [LhsKind].
*/
#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]
mod lhs;
mod traits;
mod utils;

pub use lhs::*;
pub use traits::*;
pub use utils::pdist;
