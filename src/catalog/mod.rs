//! Relay catalogue module.
//!
//! The catalogue is the staged summary of the measured network that all
//! sampling starts from: one record per relay plus the network's median
//! statistics.

pub mod loader;
pub mod types;

pub use loader::{load_catalog, parse_catalog};
pub use types::{is_valid_fingerprint, CatalogError, NetworkStats, Relay, RelayCatalog};
