//! Consensus bandwidth weights.
//!
//! Clients pick relays for each circuit position with probabilities scaled
//! by the bandwidth weights published in the consensus. This module computes
//! those weights from the aggregate guard, middle, exit and guard+exit
//! capacity of a network so the scaled network can be compared with the
//! full-size sample it came from.
//!
//! - `cases`: the closed-form formula of every load case
//! - `checks`: sum, range and balance identities a result must satisfy
//! - `solver`: regime detection, fallback chains and result selection

pub mod cases;
pub mod checks;
pub mod solver;

pub use cases::{Coefficients, WeightCase};
pub use checks::{check_weights, WeightCheck};
pub use solver::{
    fallback_chain, log_bandwidth_weights, BandwidthWeightSolver, BandwidthWeights, BwWeightError,
    LoadRegime, NetworkLoad, DEFAULT_WEIGHTSCALE,
};
