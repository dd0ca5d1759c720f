/// `load_config` module: reads an optional YAML file into a [`SyncConfig`].
///
/// Every key is optional; anything left out keeps the built-in default
/// (upstream URL, `lectures/` content directory, ...). Command-line flags are
/// applied on top by the CLI.
///
/// ```yaml
/// source_url: https://github.com/QuantEcon/lecture-python-intro/archive/refs/heads/wasm.zip
/// archive_path: qe-lecture-intro-wasm.zip
/// extracted_dir: lecture-python-intro-wasm
/// content_dir: lectures
/// overwrite: false
/// fetch_timeout_secs: 120
/// ```
use anyhow::Result;
use lecture_sync_core::config::SyncConfig;
use std::fs;
use std::path::Path;
use tracing::{error, info};

/// Loads a YAML config file and fills unspecified keys with defaults.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<SyncConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => {
            info!(config_path = ?path_ref, "Config file read successfully");
            content
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    // An empty file is a valid "all defaults" config.
    if config_content.trim().is_empty() {
        return Ok(SyncConfig::default());
    }

    let config: SyncConfig = match serde_yaml::from_str(&config_content) {
        Ok(conf) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            conf
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            return Err(anyhow::anyhow!("Failed to parse config YAML: {e}"));
        }
    };

    Ok(config)
}
