//! Core TOML config loading: read from path or platform default.

use crate::schema::RelayConfig;
use crate::validation;
use signalhub_common::ConfigError;
use std::path::Path;
use tracing::{info, warn};

use super::paths::{create_default_config, default_config_path};

/// Load config from a specific TOML file path.
///
/// Missing fields take their serde defaults. The parsed config must pass
/// validation; a relay with out-of-range limits refuses to start.
pub fn load_from_path(path: &Path) -> Result<RelayConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ConfigError::FileNotFound(path.to_path_buf())
        } else {
            ConfigError::ParseError(format!("failed to read {}: {e}", path.display()))
        }
    })?;

    let config: RelayConfig = toml::from_str(&content)
        .map_err(|e| ConfigError::ParseError(format!("failed to parse TOML: {e}")))?;

    validation::validate(&config)?;

    info!("loaded config from {}", path.display());
    Ok(config)
}

/// Load config from the platform-specific default path.
///
/// On Linux: `~/.config/signalhub/relay.toml`
///
/// If the file does not exist, a commented default file is written there and
/// defaults are returned. A read-only config directory is not an error.
pub fn load_default() -> Result<RelayConfig, ConfigError> {
    let path = match default_config_path() {
        Ok(path) => path,
        Err(e) => {
            warn!("{e}; using built-in defaults");
            return Ok(RelayConfig::default());
        }
    };

    match load_from_path(&path) {
        Ok(config) => Ok(config),
        Err(ConfigError::FileNotFound(_)) => {
            match create_default_config(&path) {
                Ok(true) => info!("created default config at {}", path.display()),
                Ok(false) => {}
                Err(e) => warn!("{e}; using built-in defaults"),
            }
            Ok(RelayConfig::default())
        }
        Err(e) => Err(e),
    }
}
