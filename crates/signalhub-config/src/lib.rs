//! signalhub relay configuration.
//!
//! TOML-based configuration with full validation. All sections use
//! defaults so partial configs work out of the box.

pub mod schema;
pub mod toml_loader;
pub mod validation;

pub use schema::{LimitsConfig, LogLevel, LoggingConfig, RelayConfig, ServerConfig, StatusConfig};

use signalhub_common::ConfigError;
use std::path::Path;

/// Load config from an explicit path, or from the platform default.
///
/// An explicit path must exist. The default path is created on first run.
pub fn load_config(path: Option<&Path>) -> Result<RelayConfig, ConfigError> {
    match path {
        Some(path) => toml_loader::load_from_path(path),
        None => toml_loader::load_default(),
    }
}

/// Serialize a config to a pretty-printed JSON string.
pub fn config_to_json(config: &RelayConfig) -> String {
    serde_json::to_string_pretty(config)
        .unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize config: {e}\"}}"))
}
