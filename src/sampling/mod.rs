//! Relay sampling module.
//!
//! This module turns the relay catalogue into the relay set of a scaled
//! simulation network:
//!
//! - `position`: position labels and the probabilistic flag classifier
//! - `sampler`: frequency-weighted draw of a full-size network
//! - `selector`: bin-median scale-down preserving per-position weight shares
//! - `naming`: nicknames and emission order of the chosen relays

pub mod naming;
pub mod position;
pub mod sampler;
pub mod selector;

pub use naming::{emission_order, name_relays, ScaledRelay};
pub use position::{classify, consensus_bandwidth, ByPosition, Position};
pub use sampler::{sample_network, RoleBucket, SampleSet, SamplerOptions};
pub use selector::{scaled_relay_count, select_scaled, ScaledSet};

/// Errors raised while sampling or scaling the relay set.
#[derive(Debug, thiserror::Error)]
pub enum SamplingError {
    #[error("Cannot sample {requested} relays, only {eligible} relays are eligible")]
    SampleTooLarge { requested: usize, eligible: usize },
    #[error("Requested an empty sample")]
    EmptySample,
    #[error("Sampled relays have zero total weight")]
    ZeroTotalWeight,
    #[error("Weighted relay draw failed: {0}")]
    WeightedDraw(String),
    #[error("Renormalized weights sum to {total}, expected 1.0")]
    RenormalizationFailed { total: f64 },
}
