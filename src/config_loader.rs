use crate::config::{BinRatio, GenerationConfig};
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use log::info;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Load and parse configuration from a YAML file
pub fn load_config(config_path: &Path) -> Result<GenerationConfig> {
    info!("Loading configuration from: {:?}", config_path);

    let file = File::open(config_path)
        .wrap_err_with(|| format!("Failed to open config file '{}'", config_path.display()))?;

    let config: GenerationConfig = serde_yaml::from_reader(file)
        .wrap_err_with(|| format!("Failed to parse config file '{}'", config_path.display()))?;

    config.validate()?;

    Ok(config)
}

/// CLI arguments that override YAML settings
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub catalog: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub network_scale: Option<f64>,
    pub seed: Option<u64>,
    pub guard_min_consensus_bandwidth: Option<u64>,
    pub running_frequency_threshold: Option<f64>,
    pub weightscale: Option<u32>,
    pub bin_ratio: Option<BinRatio>,
}

/// Apply CLI overrides to a configuration
pub fn apply_overrides(config: &mut GenerationConfig, overrides: &CliOverrides) -> Result<()> {
    if let Some(catalog) = &overrides.catalog {
        config.catalog = Some(catalog.clone());
    }
    if let Some(output) = &overrides.output {
        config.output = output.clone();
    }
    if let Some(scale) = overrides.network_scale {
        info!("Network scale override: {}", scale);
        config.network_scale = scale;
    }
    if let Some(seed) = overrides.seed {
        info!("Random seed override: {}", seed);
        config.random_seed = Some(seed);
    }
    if let Some(bandwidth) = overrides.guard_min_consensus_bandwidth {
        config.guard_min_consensus_bandwidth = bandwidth;
    }
    if let Some(threshold) = overrides.running_frequency_threshold {
        config.running_frequency_threshold = threshold;
    }
    if let Some(weightscale) = overrides.weightscale {
        config.weightscale = weightscale;
    }
    if let Some(bin_ratio) = overrides.bin_ratio {
        config.bin_ratio = bin_ratio;
    }

    // Re-validate after applying overrides
    config.validate()?;

    Ok(())
}
