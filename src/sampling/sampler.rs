//! Full-size network sampling.
//!
//! Draws a sample the size of a typical consensus from the catalogue. Relays
//! are picked without replacement with probability proportional to how often
//! they were running, so long-lived relays dominate the sample the same way
//! they dominate real consensuses. Each sampled relay is then classified into
//! a position and the per-position weight shares of the sample become the
//! targets the scaled network tries to preserve.

use log::{debug, info};
use rand::seq::index::sample_weighted;
use rand::Rng;
use std::collections::BTreeMap;

use super::position::{classify, ByPosition, Position};
use super::SamplingError;
use crate::catalog::{Relay, RelayCatalog};

/// Default minimum fraction of consensuses a relay must appear in to be sampled
pub const DEFAULT_RUNNING_FREQUENCY_THRESHOLD: f64 = 0.01;

/// Default minimum consensus bandwidth for the guard trait
pub const DEFAULT_GUARD_MIN_CONSENSUS_BANDWIDTH: u64 = 2000;

/// Knobs for [`sample_network`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplerOptions {
    pub running_frequency_threshold: f64,
    pub guard_min_consensus_bandwidth: u64,
}

impl Default for SamplerOptions {
    fn default() -> Self {
        Self {
            running_frequency_threshold: DEFAULT_RUNNING_FREQUENCY_THRESHOLD,
            guard_min_consensus_bandwidth: DEFAULT_GUARD_MIN_CONSENSUS_BANDWIDTH,
        }
    }
}

/// Relays of one position plus their summed weight.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoleBucket {
    pub relays: BTreeMap<String, Relay>,
    pub weight: f64,
}

impl RoleBucket {
    pub fn insert(&mut self, fingerprint: String, relay: Relay) {
        self.weight += relay.weight;
        self.relays.insert(fingerprint, relay);
    }

    pub fn len(&self) -> usize {
        self.relays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.relays.is_empty()
    }
}

/// The full-size sample, partitioned by position.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleSet {
    pub buckets: ByPosition<RoleBucket>,
    /// Fingerprints in the order they were drawn and classified
    pub sampled_order: Vec<String>,
    /// Sum of all sampled relay weights
    pub total_weight: f64,
    /// Smallest sampled relay weight
    pub min_weight: f64,
    /// Share of the total sampled weight held by each position
    pub target_ratios: ByPosition<f64>,
}

impl SampleSet {
    pub fn len(&self) -> usize {
        self.sampled_order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sampled_order.is_empty()
    }

    /// Share of the sampled relay count held by each position
    pub fn count_ratios(&self) -> ByPosition<f64> {
        let total = self.len() as f64;
        self.buckets.map(|_, bucket| {
            if total > 0.0 {
                bucket.len() as f64 / total
            } else {
                0.0
            }
        })
    }

    /// Summed bandwidth capacity of the sample, bytes per second
    pub fn total_capacity(&self) -> u64 {
        self.buckets
            .iter()
            .flat_map(|(_, bucket)| bucket.relays.values())
            .map(|relay| relay.bandwidth_capacity)
            .sum()
    }
}

/// Returns true if the relay may be drawn at all
pub fn is_eligible(relay: &Relay, running_frequency_threshold: f64) -> bool {
    relay.running_frequency >= running_frequency_threshold
        && relay.running_frequency > 0.0
        && relay.weight > 0.0
}

/// Draw `sample_size` distinct relays and classify them into positions.
///
/// Randomness is consumed in a fixed order: first the weighted draw over the
/// eligible relays (taken in fingerprint order), then for each sampled relay
/// in draw order its guard draw (guard candidates only) and its exit draw.
pub fn sample_network<R: Rng + ?Sized>(
    catalog: &RelayCatalog,
    sample_size: usize,
    options: &SamplerOptions,
    rng: &mut R,
) -> Result<SampleSet, SamplingError> {
    if sample_size == 0 {
        return Err(SamplingError::EmptySample);
    }

    let eligible: Vec<(&String, &Relay)> = catalog
        .relays
        .iter()
        .filter(|(_, relay)| is_eligible(relay, options.running_frequency_threshold))
        .collect();

    debug!(
        "{} of {} relays are eligible for sampling (running frequency >= {}, non-zero weight)",
        eligible.len(),
        catalog.relays.len(),
        options.running_frequency_threshold
    );

    if sample_size > eligible.len() {
        return Err(SamplingError::SampleTooLarge {
            requested: sample_size,
            eligible: eligible.len(),
        });
    }

    let frequency_sum: f64 = eligible.iter().map(|(_, relay)| relay.running_frequency).sum();
    let probabilities: Vec<f64> = eligible
        .iter()
        .map(|(_, relay)| relay.running_frequency / frequency_sum)
        .collect();

    let drawn = sample_weighted(rng, eligible.len(), |i| probabilities[i], sample_size)
        .map_err(|e| SamplingError::WeightedDraw(e.to_string()))?;
    let sampled: Vec<(&String, &Relay)> = drawn.into_iter().map(|i| eligible[i]).collect();

    let min_weight = sampled
        .iter()
        .map(|(_, relay)| relay.weight)
        .fold(f64::INFINITY, f64::min);

    let mut buckets = ByPosition::<RoleBucket>::default();
    let mut sampled_order = Vec::with_capacity(sampled.len());
    let mut total_weight = 0.0;

    for (fingerprint, relay) in sampled {
        let position = classify(
            relay,
            min_weight,
            options.guard_min_consensus_bandwidth,
            || rng.gen::<f64>(),
        );
        debug!("Sampled relay {} -> {}", fingerprint, position);

        total_weight += relay.weight;
        sampled_order.push(fingerprint.clone());
        buckets[position].insert(fingerprint.clone(), relay.clone());
    }

    if total_weight <= 0.0 {
        return Err(SamplingError::ZeroTotalWeight);
    }

    let target_ratios = buckets.map(|_, bucket| bucket.weight / total_weight);

    for position in Position::ALL {
        info!(
            "Sampled {}: {} relays, weight share {:.6}",
            position,
            buckets[position].len(),
            target_ratios[position]
        );
    }

    Ok(SampleSet {
        buckets,
        sampled_order,
        total_weight,
        min_weight,
        target_ratios,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::NetworkStats;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::BTreeSet;

    fn fingerprint(i: usize) -> String {
        format!("{:040X}", i)
    }

    fn relay(running_frequency: f64, weight: f64, guard: f64, exit: f64) -> Relay {
        Relay {
            fingerprints: Vec::new(),
            address: "10.0.0.1".to_string(),
            country_code: None,
            running_frequency,
            guard_frequency: guard,
            exit_frequency: exit,
            weight,
            bandwidth_capacity: 1000,
            bandwidth_rate: 1000,
            bandwidth_burst: 1000,
        }
    }

    fn mixed_catalog(n: usize) -> RelayCatalog {
        let relays = (0..n)
            .map(|i| {
                let weight = 0.0001 * (1 + i % 50) as f64;
                let guard = (i % 3) as f64 / 2.0;
                let exit = (i % 4) as f64 / 3.0;
                (fingerprint(i), relay(0.5 + (i % 5) as f64 / 10.0, weight, guard, exit))
            })
            .collect();
        RelayCatalog {
            min_unix_time: None,
            max_unix_time: None,
            network_stats: NetworkStats::new(n / 2),
            relays,
        }
    }

    fn low_threshold() -> SamplerOptions {
        SamplerOptions {
            running_frequency_threshold: 0.01,
            guard_min_consensus_bandwidth: 1,
        }
    }

    #[test]
    fn test_partition_invariant() {
        let catalog = mixed_catalog(200);
        for seed in 0..5 {
            let mut rng = StdRng::seed_from_u64(seed);
            let sample = sample_network(&catalog, 100, &low_threshold(), &mut rng).unwrap();
            assert_eq!(sample.len(), 100);

            let mut union = BTreeSet::new();
            let mut bucket_total = 0;
            for (_, bucket) in sample.buckets.iter() {
                bucket_total += bucket.len();
                for fp in bucket.relays.keys() {
                    assert!(union.insert(fp.clone()), "relay {} in two buckets", fp);
                }
            }
            assert_eq!(bucket_total, 100);
            let drawn: BTreeSet<String> = sample.sampled_order.iter().cloned().collect();
            assert_eq!(union, drawn);
        }
    }

    #[test]
    fn test_target_ratios_sum_to_one() {
        let catalog = mixed_catalog(120);
        let mut rng = StdRng::seed_from_u64(7);
        let sample = sample_network(&catalog, 60, &low_threshold(), &mut rng).unwrap();
        let sum: f64 = sample.target_ratios.iter().map(|(_, r)| r).sum();
        assert!((sum - 1.0).abs() < 1e-9);

        let weight_sum: f64 = sample.buckets.iter().map(|(_, b)| b.weight).sum();
        assert!((weight_sum - sample.total_weight).abs() < 1e-12);
    }

    #[test]
    fn test_ineligible_relays_never_sampled() {
        let mut relays = BTreeMap::new();
        relays.insert(fingerprint(1), relay(1.0, 0.0, 0.0, 0.0));
        relays.insert(fingerprint(2), relay(0.001, 0.5, 0.0, 0.0));
        relays.insert(fingerprint(3), relay(0.9, 0.2, 0.0, 0.0));
        relays.insert(fingerprint(4), relay(0.8, 0.3, 0.0, 0.0));
        let catalog = RelayCatalog {
            min_unix_time: None,
            max_unix_time: None,
            network_stats: NetworkStats::new(2),
            relays,
        };

        let mut rng = StdRng::seed_from_u64(1);
        let sample = sample_network(&catalog, 2, &SamplerOptions::default(), &mut rng).unwrap();
        let drawn: BTreeSet<String> = sample.sampled_order.iter().cloned().collect();
        assert_eq!(drawn, [fingerprint(3), fingerprint(4)].into_iter().collect());
        assert!((sample.min_weight - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_sample_larger_than_eligible_is_fatal() {
        let catalog = mixed_catalog(10);
        let mut rng = StdRng::seed_from_u64(1);
        let result = sample_network(&catalog, 11, &low_threshold(), &mut rng);
        assert!(matches!(
            result,
            Err(SamplingError::SampleTooLarge { requested: 11, eligible: 10 })
        ));
    }

    #[test]
    fn test_empty_sample_is_fatal() {
        let catalog = mixed_catalog(10);
        let mut rng = StdRng::seed_from_u64(1);
        assert!(matches!(
            sample_network(&catalog, 0, &low_threshold(), &mut rng),
            Err(SamplingError::EmptySample)
        ));
    }

    #[test]
    fn test_same_seed_same_sample() {
        let catalog = mixed_catalog(300);
        let mut rng_a = StdRng::seed_from_u64(42);
        let mut rng_b = StdRng::seed_from_u64(42);
        let a = sample_network(&catalog, 150, &low_threshold(), &mut rng_a).unwrap();
        let b = sample_network(&catalog, 150, &low_threshold(), &mut rng_b).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_guard_threshold_blocks_small_relays() {
        let mut relays = BTreeMap::new();
        // consensus bandwidths 1 and 3 against a threshold of 2
        relays.insert(fingerprint(1), relay(1.0, 0.1, 1.0, 0.0));
        relays.insert(fingerprint(2), relay(1.0, 0.3, 1.0, 0.0));
        let catalog = RelayCatalog {
            min_unix_time: None,
            max_unix_time: None,
            network_stats: NetworkStats::new(2),
            relays,
        };
        let options = SamplerOptions {
            running_frequency_threshold: 0.01,
            guard_min_consensus_bandwidth: 2,
        };

        let mut rng = StdRng::seed_from_u64(3);
        let sample = sample_network(&catalog, 2, &options, &mut rng).unwrap();
        assert!(sample.buckets.middle.relays.contains_key(&fingerprint(1)));
        assert!(sample.buckets.guard.relays.contains_key(&fingerprint(2)));
    }

    #[test]
    fn test_count_ratios() {
        let catalog = mixed_catalog(80);
        let mut rng = StdRng::seed_from_u64(9);
        let sample = sample_network(&catalog, 40, &low_threshold(), &mut rng).unwrap();
        let ratios = sample.count_ratios();
        let sum: f64 = ratios.iter().map(|(_, r)| r).sum();
        assert!((sum - 1.0).abs() < 1e-9);
        assert_eq!(sample.total_capacity(), 40 * 1000);
    }
}
