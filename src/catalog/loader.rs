//! Relay catalogue loading.
//!
//! Catalogues are JSON files written by the staging step. Large catalogues
//! are usually stored zstd-compressed; a path ending in `.zst` is decoded
//! transparently, and a missing plain path falls back to its `.zst` sibling.

use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use log::{debug, info};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use super::types::RelayCatalog;

const ZSTD_EXTENSION: &str = "zst";

/// Resolve the on-disk catalogue path, preferring the exact path given
fn resolve_catalog_path(path: &Path) -> PathBuf {
    if path.exists() || is_compressed(path) {
        return path.to_path_buf();
    }

    let mut compressed = path.as_os_str().to_owned();
    compressed.push(".");
    compressed.push(ZSTD_EXTENSION);
    let compressed = PathBuf::from(compressed);
    if compressed.exists() {
        debug!("{:?} not found, using compressed catalogue {:?}", path, compressed);
        compressed
    } else {
        path.to_path_buf()
    }
}

fn is_compressed(path: &Path) -> bool {
    path.extension().map_or(false, |ext| ext == ZSTD_EXTENSION)
}

/// Parse a catalogue from any reader producing JSON
pub fn parse_catalog<R: Read>(reader: R) -> Result<RelayCatalog> {
    let catalog: RelayCatalog =
        serde_json::from_reader(reader).wrap_err("Failed to parse relay catalogue JSON")?;
    Ok(catalog)
}

/// Load and validate a relay catalogue from disk.
pub fn load_catalog(path: &Path) -> Result<RelayCatalog> {
    let path = resolve_catalog_path(path);
    info!("Loading relay catalogue from: {:?}", path);

    let file = File::open(&path)
        .wrap_err_with(|| format!("Failed to open relay catalogue '{}'", path.display()))?;

    let catalog = if is_compressed(&path) {
        let decoder = zstd::stream::read::Decoder::new(file)
            .wrap_err_with(|| format!("Failed to start zstd decoder for '{}'", path.display()))?;
        parse_catalog(BufReader::new(decoder))?
    } else {
        parse_catalog(BufReader::new(file))?
    };

    catalog
        .validate()
        .wrap_err_with(|| format!("Relay catalogue '{}' is inconsistent", path.display()))?;

    info!(
        "Loaded {} relays, measured median network size is {} relays",
        catalog.relays.len(),
        catalog.network_stats.med_count_total
    );
    if let Some(window) = catalog.observation_window_label() {
        info!("Catalogue covers consensuses from {}", window);
    }

    Ok(catalog)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{Builder, NamedTempFile};

    const CATALOG: &str = r#"{
        "min_unix_time": 1577836800.0,
        "max_unix_time": 1580515200.0,
        "network_stats": { "med_count_total": 1 },
        "relays": {
            "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA": {
                "address": "192.0.2.1",
                "country_code": "DE",
                "running_frequency": 1.0,
                "guard_frequency": 1.0,
                "exit_frequency": 0.0,
                "weight": 1.0,
                "bandwidth_capacity": 1000,
                "bandwidth_rate": 1000,
                "bandwidth_burst": 1000
            }
        }
    }"#;

    #[test]
    fn test_load_plain_catalog() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "{}", CATALOG).unwrap();

        let catalog = load_catalog(temp_file.path()).unwrap();
        assert_eq!(catalog.relays.len(), 1);
        assert!(catalog.observation_window().is_some());
    }

    #[test]
    fn test_load_compressed_catalog() {
        let temp_file = Builder::new().suffix(".json.zst").tempfile().unwrap();
        let compressed = zstd::stream::encode_all(CATALOG.as_bytes(), 3).unwrap();
        std::fs::write(temp_file.path(), compressed).unwrap();

        let catalog = load_catalog(temp_file.path()).unwrap();
        assert_eq!(catalog.network_stats.med_count_total, 1);
    }

    #[test]
    fn test_falls_back_to_compressed_sibling() {
        let dir = tempfile::tempdir().unwrap();
        let plain = dir.path().join("relayinfo.json");
        let compressed = dir.path().join("relayinfo.json.zst");
        std::fs::write(&compressed, zstd::stream::encode_all(CATALOG.as_bytes(), 3).unwrap()).unwrap();

        let catalog = load_catalog(&plain).unwrap();
        assert_eq!(catalog.relays.len(), 1);
    }

    #[test]
    fn test_rejects_inconsistent_catalog() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "{}", CATALOG.replace("\"weight\": 1.0", "\"weight\": -1.0")).unwrap();

        assert!(load_catalog(temp_file.path()).is_err());
    }

    #[test]
    fn test_missing_file() {
        assert!(load_catalog(Path::new("/nonexistent/relayinfo.json")).is_err());
    }
}
