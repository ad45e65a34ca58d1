//! # TorNetSim - Relay sampling and scaling for Tor network simulations in Shadow
//!
//! This library turns a staged catalogue of relays observed in the live Tor
//! network into a smaller, statistically representative relay set that a
//! Shadow simulation can run.
//!
//! ## Overview
//!
//! A generation run draws a full-size network from the catalogue, assigns
//! every sampled relay a position (guard, exit, guard+exit or middle), scales
//! the network down while keeping each position's share of the total weight,
//! and computes the consensus bandwidth weights of both networks so the
//! scaled one can be checked against the sample it came from.
//!
//! ## Key Features
//!
//! - **Frequency-weighted sampling**: long-lived relays appear as often as they do in real consensuses
//! - **Probabilistic positions**: flag frequencies become flag probabilities
//! - **Bin-median scaling**: keeps the shape of each position's weight distribution
//! - **Bandwidth weights**: full case analysis with fallback and consistency checks
//! - **Reproducible**: every run is driven by a single recorded seed
//!
//! ## Architecture
//!
//! - `catalog`: relay catalogue types, validation and (zstd) loading
//! - `config`: type-safe generation settings and validation
//! - `config_loader`: YAML loading and CLI overrides
//! - `sampling`: position classification, sampling, scaling and naming
//! - `bwweights`: consensus bandwidth weight computation
//! - `output`: the JSON hand-off file for the config emitter
//! - `orchestrator`: the end-to-end generation pipeline
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::path::Path;
//! use tornetsim::{config_loader, orchestrator};
//!
//! let config = config_loader::load_config(Path::new("tornet.yaml"))?;
//! let network = orchestrator::run_generation(&config)?;
//! println!("{} relays, divergence {}", network.relay_count(), network.metadata.divergence);
//! # Ok::<(), color_eyre::eyre::Error>(())
//! ```
//!
//! ## Configuration Format
//!
//! ```yaml
//! catalog: "relayinfo_staging_2023-04-01--2023-04-30.json.zst"
//! network_scale: 0.05
//! random_seed: 42
//! guard_min_consensus_bandwidth: 2000
//! running_frequency_threshold: 0.01
//! weightscale: 10000
//! bin_ratio: weight     # or count
//! output: "tornet_output/relays.json"
//! ```
//!
//! ## Error Handling
//!
//! Library modules report typed errors built with `thiserror`; the loader,
//! orchestrator and binary wrap them with `color_eyre` context.

pub mod bwweights;
pub mod catalog;
pub mod config;
pub mod config_loader;
pub mod orchestrator;
pub mod output;
pub mod sampling;
