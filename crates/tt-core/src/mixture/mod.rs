//! Gaussian finite mixture estimation by Expectation-Maximization.
//!
//! - [`params`]: the parameter set of one mixture
//! - [`estep`]: log-domain responsibilities and log-likelihood
//! - [`mstep`]: structure-constrained updates with a variance floor
//! - [`init`]: random-partition and k-means++ starting points
//! - [`em`]: one EM run from one starting point
//! - [`estimator`]: seeded restarts in parallel, best run kept
//!
//! Class indices are arbitrary: two fits of the same data may number the
//! same latent classes differently (label switching). Nothing here imposes
//! a canonical ordering.

pub mod em;
pub mod estep;
pub mod estimator;
pub mod init;
pub mod mstep;
pub mod params;

pub use em::{run_em, run_em_from, EmOptions, EmRun};
pub use estep::{e_step, EStep};
pub use estimator::{restart_seed, EstimatorOptions, FittedModel, MixtureModelEstimator};
pub use init::initialize;
pub use mstep::{m_step, MStep};
pub use params::MixtureParams;
