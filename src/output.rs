//! Hand-off file for the downstream config emitter.
//!
//! The scaled network is written as a single pretty-printed JSON document:
//! run metadata, the chosen relays grouped by position and the bandwidth
//! weights of both the full sample and the scaled network.

use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::bwweights::BandwidthWeights;
use crate::config::BinRatio;
use crate::sampling::{emission_order, ByPosition, Position, ScaledRelay};

/// Parameters and summary figures of a generation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationMetadata {
    /// Seed the run was generated with; rerunning with it reproduces the file
    pub seed: u64,
    pub network_scale: f64,
    pub bin_ratio: BinRatio,
    /// Relays in the full-size sample
    pub sample_size: usize,
    /// Relays in the scaled network
    pub scaled_size: usize,
    /// Largest per-position weight share difference between scaled and full network
    pub divergence: f64,
    /// Weight share of each position in the full-size sample
    pub target_ratios: ByPosition<f64>,
    /// Weight share of each position in the scaled network
    pub realized_ratios: ByPosition<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observation_window: Option<String>,
}

/// The generated network
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScaledNetwork {
    pub metadata: GenerationMetadata,
    /// Chosen relays per position, keyed by fingerprint
    pub relays: ByPosition<BTreeMap<String, ScaledRelay>>,
    pub sampled_bandwidth_weights: BandwidthWeights,
    pub scaled_bandwidth_weights: BandwidthWeights,
}

impl ScaledNetwork {
    pub fn relay_count(&self) -> usize {
        self.relays.iter().map(|(_, relays)| relays.len()).sum()
    }

    /// Relays in the order the emitter writes them
    pub fn ordered_relays(&self) -> Vec<(Position, &String, &ScaledRelay)> {
        emission_order(&self.relays)
    }
}

/// Write the scaled network as pretty JSON, creating parent directories
pub fn write_scaled_network(network: &ScaledNetwork, output_path: &Path) -> Result<()> {
    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).wrap_err_with(|| {
                format!("Failed to create output directory '{}'", parent.display())
            })?;
        }
    }

    let json = serde_json::to_string_pretty(network)?;
    fs::write(output_path, json)
        .wrap_err_with(|| format!("Failed to write scaled network to '{}'", output_path.display()))?;

    info!(
        "Wrote {} relays to {:?}",
        network.relay_count(),
        output_path
    );
    Ok(())
}

/// Read a previously written scaled network
pub fn read_scaled_network(path: &Path) -> Result<ScaledNetwork> {
    let content = fs::read_to_string(path)
        .wrap_err_with(|| format!("Failed to read scaled network '{}'", path.display()))?;
    let network = serde_json::from_str(&content)
        .wrap_err_with(|| format!("Failed to parse scaled network '{}'", path.display()))?;
    Ok(network)
}
