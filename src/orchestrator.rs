//! Generation pipeline orchestration.
//!
//! Ties the catalogue, the sampler, the scale selector and the bandwidth
//! weight solver together into a single run producing a [`ScaledNetwork`].

use color_eyre::eyre::{eyre, WrapErr};
use color_eyre::Result;
use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::bwweights::{log_bandwidth_weights, BandwidthWeightSolver, NetworkLoad};
use crate::catalog::{load_catalog, NetworkStats, RelayCatalog};
use crate::config::GenerationConfig;
use crate::output::{write_scaled_network, GenerationMetadata, ScaledNetwork};
use crate::sampling::{
    name_relays, sample_network, scaled_relay_count, select_scaled, Position, SampleSet,
};

const BYTES_PER_GBIT: f64 = 1_000_000_000.0 / 8.0;

/// The configured seed, or a fresh one from the OS-seeded generator
pub fn resolve_seed(config: &GenerationConfig) -> u64 {
    let seed = match config.random_seed {
        Some(seed) => seed,
        None => {
            let seed = rand::thread_rng().gen();
            info!("No random seed configured, drew a fresh one");
            seed
        }
    };
    info!("Using random seed: {}", seed);
    seed
}

fn log_sample_summary(catalog: &RelayCatalog, sample: &SampleSet) {
    let capacity_gbit = sample.total_capacity() as f64 / BYTES_PER_GBIT;
    info!(
        "A full network has {} relays with total capacity {:.3} Gbit/s",
        sample.len(),
        capacity_gbit
    );

    for position in Position::ALL {
        let summary = position_summary(
            &catalog.network_stats,
            position,
            sample.buckets[position].len(),
            sample.target_ratios[position],
        );
        info!("{}", summary);
    }
}

/// One position of the sample next to the measured network's medians
fn position_summary(stats: &NetworkStats, position: Position, count: usize, weight_share: f64) -> String {
    let mut summary = format!(
        "The sample has {} {} relays with weight share {:.4}",
        count, position, weight_share
    );
    if let Some(median) = stats.median_count(position) {
        summary.push_str(&format!(", measured median count {}", median));
    }
    if let Some(median) = stats.median_weight(position) {
        summary.push_str(&format!(", measured median weight share {:.4}", median));
    }
    summary
}

/// Run sampling, scaling, naming and both weight computations.
///
/// All randomness comes from `rng`; `seed` is only recorded in the output.
pub fn generate_network<R: Rng + ?Sized>(
    catalog: &RelayCatalog,
    config: &GenerationConfig,
    seed: u64,
    rng: &mut R,
) -> Result<ScaledNetwork> {
    let sample_size = config.effective_sample_size(catalog);
    info!(
        "Generating network: seed={}, scale={}, sample_size={}, running_frequency_threshold={}, guard_min_consensus_bandwidth={}, bin_ratio={}",
        seed,
        config.network_scale,
        sample_size,
        config.running_frequency_threshold,
        config.guard_min_consensus_bandwidth,
        config.bin_ratio
    );

    let sample = sample_network(catalog, sample_size, &config.sampler_options(), rng)
        .wrap_err("Failed to sample the full-size network")?;
    log_sample_summary(catalog, &sample);

    let solver = BandwidthWeightSolver::new(config.weightscale);

    let sampled_weights = sample.buckets.map(|_, bucket| bucket.weight);
    let sampled_load = NetworkLoad::from_position_weights(&sampled_weights, sample.min_weight);
    let sampled_bandwidth_weights =
        log_bandwidth_weights(&solver, "sampled network", &sampled_load)
            .wrap_err("Failed to compute bandwidth weights of the sampled network")?;

    let target_count = scaled_relay_count(sample.len(), config.network_scale);
    info!(
        "Scaling {} sampled relays down to {} (scale {})",
        sample.len(),
        target_count,
        config.network_scale
    );
    let scaled = select_scaled(&sample, target_count, config.bin_ratio)
        .wrap_err("Failed to scale down the sampled network")?;

    let relays = name_relays(&scaled);

    let min_chosen_weight = scaled
        .min_weight()
        .ok_or_else(|| eyre!("The scaled network contains no relays"))?;
    let scaled_load = NetworkLoad::from_position_weights(&scaled.position_weights(), min_chosen_weight);
    let scaled_bandwidth_weights = log_bandwidth_weights(&solver, "scaled network", &scaled_load)
        .wrap_err("Failed to compute bandwidth weights of the scaled network")?;

    let metadata = GenerationMetadata {
        seed,
        network_scale: config.network_scale,
        bin_ratio: config.bin_ratio,
        sample_size: sample.len(),
        scaled_size: scaled.len(),
        divergence: scaled.divergence,
        target_ratios: scaled.target_ratios.clone(),
        realized_ratios: scaled.realized_ratios.clone(),
        observation_window: catalog.observation_window_label(),
    };

    Ok(ScaledNetwork {
        metadata,
        relays,
        sampled_bandwidth_weights,
        scaled_bandwidth_weights,
    })
}

/// Load the catalogue, generate the network and write it to the configured output.
pub fn run_generation(config: &GenerationConfig) -> Result<ScaledNetwork> {
    let catalog_path = config.catalog_path()?;
    let catalog = load_catalog(catalog_path)?;

    let seed = resolve_seed(config);
    let mut rng = StdRng::seed_from_u64(seed);

    let network = generate_network(&catalog, config, seed, &mut rng)?;
    write_scaled_network(&network, &config.output)?;

    info!(
        "Generated {} relays with max weight divergence {}",
        network.relay_count(),
        network.metadata.divergence
    );
    Ok(network)
}
