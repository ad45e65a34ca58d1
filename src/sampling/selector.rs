//! Scaling the full-size sample down to the requested network size.
//!
//! Each position is handled independently: its relays are sorted by weight,
//! split into contiguous bins and the median relay of every bin is kept.
//! Taking the bin median keeps the shape of the weight distribution without
//! leaning towards the fastest or slowest relay of each bin.
//!
//! The selection is a single pass. The realized per-position weight shares
//! are compared against the full sample's shares and the largest absolute
//! difference is reported as the divergence; no rebalancing is attempted.

use log::{info, warn};
use std::collections::BTreeMap;

use super::position::{ByPosition, Position};
use super::sampler::SampleSet;
use super::SamplingError;
use crate::catalog::Relay;
use crate::config::BinRatio;

/// Tolerance for the renormalized weights summing to one
pub const RENORMALIZATION_TOLERANCE: f64 = 1e-6;

/// The scaled-down network before naming.
#[derive(Debug, Clone, PartialEq)]
pub struct ScaledSet {
    /// Chosen relays per position, weights renormalized to sum to one overall
    pub buckets: ByPosition<BTreeMap<String, Relay>>,
    /// Weight share each position should have had
    pub target_ratios: ByPosition<f64>,
    /// Weight share each position actually received
    pub realized_ratios: ByPosition<f64>,
    /// Largest absolute difference between realized and target shares
    pub divergence: f64,
    /// Summed weight of the chosen relays before renormalization
    pub total_weight_before: f64,
}

impl ScaledSet {
    pub fn len(&self) -> usize {
        self.buckets.iter().map(|(_, relays)| relays.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Smallest renormalized weight among the chosen relays
    pub fn min_weight(&self) -> Option<f64> {
        self.buckets
            .iter()
            .flat_map(|(_, relays)| relays.values())
            .map(|relay| relay.weight)
            .reduce(f64::min)
    }

    /// Summed renormalized weight of each position
    pub fn position_weights(&self) -> ByPosition<f64> {
        self.buckets
            .map(|_, relays| relays.values().map(|relay| relay.weight).sum())
    }
}

/// Number of relays to keep in the scaled network.
pub fn scaled_relay_count(sample_len: usize, network_scale: f64) -> usize {
    (sample_len as f64 * network_scale).round_ties_even() as usize
}

/// Number of bins for a position: at least one, never more than its relays
pub fn bin_count(target_count: usize, ratio: f64, available: usize) -> usize {
    let wanted = ((target_count as f64) * ratio).round_ties_even() as usize;
    wanted.max(1).min(available)
}

/// Split `items` into `bins` contiguous slices whose lengths differ by at
/// most one, longer slices first.
pub fn split_bins<T>(items: &[T], bins: usize) -> Vec<&[T]> {
    if bins == 0 {
        return Vec::new();
    }
    let base = items.len() / bins;
    let extra = items.len() % bins;

    let mut result = Vec::with_capacity(bins);
    let mut start = 0;
    for i in 0..bins {
        let size = base + usize::from(i < extra);
        result.push(&items[start..start + size]);
        start += size;
    }
    result
}

/// Pick the bin-median representatives of one position.
fn choose_position<'a>(
    relays: &'a BTreeMap<String, Relay>,
    bins: usize,
) -> Vec<(&'a String, &'a Relay)> {
    let mut sorted: Vec<(&String, &Relay)> = relays.iter().collect();
    sorted.sort_by(|a, b| a.1.weight.total_cmp(&b.1.weight));

    split_bins(&sorted, bins)
        .into_iter()
        .filter(|bin| !bin.is_empty())
        .map(|bin| bin[bin.len() / 2])
        .collect()
}

/// Shrink `sample` to roughly `target_count` relays.
pub fn select_scaled(
    sample: &SampleSet,
    target_count: usize,
    bin_ratio: BinRatio,
) -> Result<ScaledSet, SamplingError> {
    let bin_ratios = match bin_ratio {
        BinRatio::Count => sample.count_ratios(),
        BinRatio::Weight => sample.target_ratios.clone(),
    };

    let mut chosen = ByPosition::<BTreeMap<String, Relay>>::default();
    let mut chosen_weights = ByPosition::<f64>::default();

    for position in Position::ALL {
        let bucket = &sample.buckets[position];
        if bucket.is_empty() {
            warn!("No sampled relays in position {}, it contributes nothing to the scaled network", position);
            continue;
        }

        let bins = bin_count(target_count, bin_ratios[position], bucket.len());
        for (fingerprint, relay) in choose_position(&bucket.relays, bins) {
            chosen_weights[position] += relay.weight;
            chosen[position].insert(fingerprint.clone(), relay.clone());
        }
    }

    let total_weight_before: f64 = chosen_weights.iter().map(|(_, w)| w).sum();
    if total_weight_before <= 0.0 {
        return Err(SamplingError::ZeroTotalWeight);
    }

    let realized_ratios = chosen_weights.map(|_, weight| weight / total_weight_before);
    let divergence = Position::ALL
        .iter()
        .map(|&p| (realized_ratios[p] - sample.target_ratios[p]).abs())
        .fold(0.0, f64::max);

    info!("{} relays: relative position weights:", target_count);
    for position in Position::ALL {
        info!(
            "{}: chosen={}, target={}, diff={}",
            position,
            realized_ratios[position],
            sample.target_ratios[position],
            realized_ratios[position] - sample.target_ratios[position]
        );
    }
    info!("The max weight divergence between positions is {}", divergence);

    info!("Renormalizing weights for scaled network using total weight={}", total_weight_before);
    let mut total_weight_after = 0.0;
    for position in Position::ALL {
        for relay in chosen[position].values_mut() {
            relay.weight /= total_weight_before;
            total_weight_after += relay.weight;
        }
    }
    if (total_weight_after - 1.0).abs() > RENORMALIZATION_TOLERANCE {
        return Err(SamplingError::RenormalizationFailed {
            total: total_weight_after,
        });
    }

    Ok(ScaledSet {
        buckets: chosen,
        target_ratios: sample.target_ratios.clone(),
        realized_ratios,
        divergence,
        total_weight_before,
    })
}
