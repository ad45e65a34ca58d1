use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::bwweights::DEFAULT_WEIGHTSCALE;
use crate::catalog::RelayCatalog;
use crate::sampling::sampler::{
    DEFAULT_GUARD_MIN_CONSENSUS_BANDWIDTH, DEFAULT_RUNNING_FREQUENCY_THRESHOLD,
};
use crate::sampling::SamplerOptions;

/// How many bins each position gets when the sample is scaled down
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum BinRatio {
    /// Proportional to the position's share of sampled weight
    #[default]
    Weight,
    /// Proportional to the position's share of sampled relays
    Count,
}

impl fmt::Display for BinRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BinRatio::Count => f.write_str("count"),
            BinRatio::Weight => f.write_str("weight"),
        }
    }
}

/// Settings of one network generation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Staged relay catalogue (JSON, optionally zstd-compressed)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog: Option<PathBuf>,
    /// Fraction of the full network to keep, in (0, 1]
    #[serde(default = "default_network_scale")]
    pub network_scale: f64,
    /// Minimum consensus bandwidth (in units of the smallest relay) for the guard trait
    #[serde(default = "default_guard_min_consensus_bandwidth")]
    pub guard_min_consensus_bandwidth: u64,
    /// Relays running in fewer consensuses than this are never sampled
    #[serde(default = "default_running_frequency_threshold")]
    pub running_frequency_threshold: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub random_seed: Option<u64>,
    #[serde(default = "default_weightscale")]
    pub weightscale: u32,
    #[serde(default)]
    pub bin_ratio: BinRatio,
    /// Size of the full network sample; defaults to the catalogue's median relay count
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_size: Option<usize>,
    /// Where the scaled network is written
    #[serde(default = "default_output")]
    pub output: PathBuf,
}

fn default_network_scale() -> f64 {
    1.0
}

fn default_guard_min_consensus_bandwidth() -> u64 {
    DEFAULT_GUARD_MIN_CONSENSUS_BANDWIDTH
}

fn default_running_frequency_threshold() -> f64 {
    DEFAULT_RUNNING_FREQUENCY_THRESHOLD
}

fn default_weightscale() -> u32 {
    DEFAULT_WEIGHTSCALE
}

fn default_output() -> PathBuf {
    PathBuf::from("tornet_output/relays.json")
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            catalog: None,
            network_scale: default_network_scale(),
            guard_min_consensus_bandwidth: default_guard_min_consensus_bandwidth(),
            running_frequency_threshold: default_running_frequency_threshold(),
            random_seed: None,
            weightscale: default_weightscale(),
            bin_ratio: BinRatio::default(),
            sample_size: None,
            output: default_output(),
        }
    }
}

impl GenerationConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.network_scale.is_finite() || self.network_scale <= 0.0 || self.network_scale > 1.0 {
            return Err(ValidationError::InvalidScale(self.network_scale));
        }

        let threshold = self.running_frequency_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ValidationError::InvalidSampling(format!(
                "running_frequency_threshold must be in [0, 1], got {}",
                threshold
            )));
        }

        if self.sample_size == Some(0) {
            return Err(ValidationError::InvalidSampling(
                "sample_size must be positive".to_string(),
            ));
        }

        if self.weightscale == 0 {
            return Err(ValidationError::InvalidWeights(
                "weightscale must be positive".to_string(),
            ));
        }

        if self.output.as_os_str().is_empty() {
            return Err(ValidationError::InvalidOutput(
                "output path cannot be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// The catalogue path, which must be set by now
    pub fn catalog_path(&self) -> Result<&Path, ValidationError> {
        self.catalog.as_deref().ok_or(ValidationError::MissingCatalog)
    }

    /// Number of relays to draw for the full-size network
    pub fn effective_sample_size(&self, catalog: &RelayCatalog) -> usize {
        self.sample_size
            .unwrap_or(catalog.network_stats.med_count_total)
    }

    pub fn sampler_options(&self) -> SamplerOptions {
        SamplerOptions {
            running_frequency_threshold: self.running_frequency_threshold,
            guard_min_consensus_bandwidth: self.guard_min_consensus_bandwidth,
        }
    }
}

/// Configuration validation errors
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ValidationError {
    #[error("network_scale must be in (0, 1], got {0}")]
    InvalidScale(f64),
    #[error("Invalid sampling configuration: {0}")]
    InvalidSampling(String),
    #[error("Invalid bandwidth weight configuration: {0}")]
    InvalidWeights(String),
    #[error("Invalid output configuration: {0}")]
    InvalidOutput(String),
    #[error("No relay catalogue given (set `catalog` in the config or pass --catalog)")]
    MissingCatalog,
}
