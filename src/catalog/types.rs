//! Relay catalogue type definitions.
//!
//! The catalogue is produced by the staging step from archived consensuses
//! and server descriptors. Each relay record aggregates how often the relay
//! was seen, how often it carried the Guard and Exit flags, its median
//! normalized consensus weight and its advertised bandwidth figures.

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::OnceLock;

use crate::sampling::Position;

/// A single relay observed in the measured network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relay {
    /// Fingerprints of all relays clustered into this record (same family and address)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fingerprints: Vec<String>,
    /// Network address of the relay
    pub address: String,
    /// Two-letter country code, if geolocation was available during staging
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
    /// Fraction of consensuses in which the relay appeared
    pub running_frequency: f64,
    /// Fraction of running consensuses in which the relay had the Guard flag
    pub guard_frequency: f64,
    /// Fraction of running consensuses in which the relay had the Exit flag
    pub exit_frequency: f64,
    /// Median share of total consensus weight
    pub weight: f64,
    /// Maximum observed bandwidth, bytes per second
    #[serde(default)]
    pub bandwidth_capacity: u64,
    /// Median advertised rate, bytes per second
    #[serde(default)]
    pub bandwidth_rate: u64,
    /// Median advertised burst, bytes per second
    #[serde(default)]
    pub bandwidth_burst: u64,
}

/// Median statistics of the measured network over all staged consensuses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkStats {
    pub med_count_total: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub med_count_guard: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub med_count_exit: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub med_count_exitguard: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub med_count_middle: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub med_weight_guard: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub med_weight_exit: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub med_weight_exitguard: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub med_weight_middle: Option<f64>,
}

impl NetworkStats {
    pub fn new(med_count_total: usize) -> Self {
        Self {
            med_count_total,
            med_count_guard: None,
            med_count_exit: None,
            med_count_exitguard: None,
            med_count_middle: None,
            med_weight_guard: None,
            med_weight_exit: None,
            med_weight_exitguard: None,
            med_weight_middle: None,
        }
    }

    /// Measured median relay count for a position, if staged
    pub fn median_count(&self, position: Position) -> Option<usize> {
        match position {
            Position::Guard => self.med_count_guard,
            Position::Exit => self.med_count_exit,
            Position::GuardExit => self.med_count_exitguard,
            Position::Middle => self.med_count_middle,
        }
    }

    /// Measured median weight share for a position, if staged
    pub fn median_weight(&self, position: Position) -> Option<f64> {
        match position {
            Position::Guard => self.med_weight_guard,
            Position::Exit => self.med_weight_exit,
            Position::GuardExit => self.med_weight_exitguard,
            Position::Middle => self.med_weight_middle,
        }
    }
}

/// The staged relay catalogue, keyed by relay fingerprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayCatalog {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_unix_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_unix_time: Option<f64>,
    pub network_stats: NetworkStats,
    pub relays: BTreeMap<String, Relay>,
}

/// Errors describing an inconsistent relay catalogue.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Relay catalogue contains no relays")]
    Empty,
    #[error("Invalid relay fingerprint '{0}' (expected 40 hex characters)")]
    InvalidFingerprint(String),
    #[error("Relay {fingerprint}: {field} = {value} is outside [0, 1]")]
    FrequencyOutOfRange {
        fingerprint: String,
        field: &'static str,
        value: f64,
    },
    #[error("Relay {fingerprint}: weight {value} must be finite and non-negative")]
    InvalidWeight { fingerprint: String, value: f64 },
    #[error("Measured median relay count is zero")]
    ZeroMedianCount,
}

fn fingerprint_regex() -> &'static Regex {
    static FINGERPRINT: OnceLock<Regex> = OnceLock::new();
    FINGERPRINT.get_or_init(|| {
        Regex::new(r"^[0-9A-Fa-f]{40}$").expect("fingerprint pattern is a valid regex")
    })
}

/// Returns true if `fingerprint` is a 40 character hex relay identity
pub fn is_valid_fingerprint(fingerprint: &str) -> bool {
    fingerprint_regex().is_match(fingerprint)
}

impl RelayCatalog {
    /// Check the catalogue for values the sampler cannot work with.
    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.relays.is_empty() {
            return Err(CatalogError::Empty);
        }
        if self.network_stats.med_count_total == 0 {
            return Err(CatalogError::ZeroMedianCount);
        }

        for (fingerprint, relay) in &self.relays {
            if !is_valid_fingerprint(fingerprint) {
                return Err(CatalogError::InvalidFingerprint(fingerprint.clone()));
            }

            let frequencies = [
                ("running_frequency", relay.running_frequency),
                ("guard_frequency", relay.guard_frequency),
                ("exit_frequency", relay.exit_frequency),
            ];
            for (field, value) in frequencies {
                if !(0.0..=1.0).contains(&value) {
                    return Err(CatalogError::FrequencyOutOfRange {
                        fingerprint: fingerprint.clone(),
                        field,
                        value,
                    });
                }
            }

            if !relay.weight.is_finite() || relay.weight < 0.0 {
                return Err(CatalogError::InvalidWeight {
                    fingerprint: fingerprint.clone(),
                    value: relay.weight,
                });
            }
        }

        Ok(())
    }

    /// Start and end of the staged consensus window, if recorded
    pub fn observation_window(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let start = DateTime::<Utc>::from_timestamp(self.min_unix_time? as i64, 0)?;
        let end = DateTime::<Utc>::from_timestamp(self.max_unix_time? as i64, 0)?;
        Some((start, end))
    }

    /// Human readable form of [`RelayCatalog::observation_window`]
    pub fn observation_window_label(&self) -> Option<String> {
        self.observation_window().map(|(start, end)| {
            format!(
                "{} to {}",
                start.format("%Y-%m-%d %H:%M:%S UTC"),
                end.format("%Y-%m-%d %H:%M:%S UTC")
            )
        })
    }
}
