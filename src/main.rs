use clap::Parser;
use color_eyre::Result;
use env_logger::Env;
use log::info;
use std::path::PathBuf;

use tornetsim::config::{BinRatio, GenerationConfig};
use tornetsim::config_loader::{self, CliOverrides};
use tornetsim::orchestrator;

/// Relay sampling and scaling utility for Tor network simulations in Shadow
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the staged relay catalogue (JSON or .json.zst)
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Path to a generation configuration YAML file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Where to write the scaled network [default: tornet_output/relays.json]
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Fraction of the full network to keep, in (0, 1]
    #[arg(long)]
    network_scale: Option<f64>,

    /// Seed for all random draws
    #[arg(long)]
    seed: Option<u64>,

    /// Minimum consensus bandwidth for a relay to be eligible for the guard position
    #[arg(long)]
    guard_min_consensus_bandwidth: Option<u64>,

    /// Minimum fraction of consensuses a relay must appear in to be sampled
    #[arg(long)]
    running_frequency_threshold: Option<f64>,

    /// Fixed-point scale of the bandwidth weights
    #[arg(long)]
    weightscale: Option<u32>,

    /// How bins are allocated to positions when scaling down
    #[arg(long, value_enum)]
    bin_ratio: Option<BinRatio>,
}

impl Args {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            catalog: self.catalog.clone(),
            output: self.output.clone(),
            network_scale: self.network_scale,
            seed: self.seed,
            guard_min_consensus_bandwidth: self.guard_min_consensus_bandwidth,
            running_frequency_threshold: self.running_frequency_threshold,
            weightscale: self.weightscale,
            bin_ratio: self.bin_ratio,
        }
    }
}

fn main() -> Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    let args = Args::parse();

    // Initialize logging with default filter level of "info"
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    info!("Starting TorNetSim network generation");

    let mut config = match &args.config {
        Some(path) => config_loader::load_config(path)?,
        None => GenerationConfig::default(),
    };
    config_loader::apply_overrides(&mut config, &args.overrides())?;

    info!("Relay catalogue: {:?}", config.catalog);
    info!("Output file: {:?}", config.output);

    let network = orchestrator::run_generation(&config)?;

    info!(
        "Scaled network with {} relays written to {:?}",
        network.relay_count(),
        config.output
    );
    Ok(())
}
