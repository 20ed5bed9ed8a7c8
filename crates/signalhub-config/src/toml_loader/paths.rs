//! Where the relay looks for its config file, and first-run creation.

use signalhub_common::ConfigError;
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use super::template::default_config_toml;

const APP_DIR: &str = "signalhub";
const FILE_NAME: &str = "relay.toml";

/// `<config dir>/signalhub/relay.toml`, or `~/.config/...` on platforms
/// without a config dir.
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    dirs::config_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
        .map(|base| base.join(APP_DIR).join(FILE_NAME))
        .ok_or_else(|| ConfigError::ParseError("no config or home directory for this user".into()))
}

/// Write the commented template to `path` unless a file is already there.
///
/// Returns `Ok(false)` when another process created the file first; an
/// existing config is never overwritten.
pub fn create_default_config(path: &Path) -> Result<bool, ConfigError> {
    let write_err = |e: std::io::Error| {
        ConfigError::ParseError(format!("cannot write {}: {e}", path.display()))
    };

    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(write_err)?;
    }

    let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => return Ok(false),
        Err(e) => return Err(write_err(e)),
    };
    file.write_all(default_config_toml().as_bytes())
        .map_err(write_err)?;
    Ok(true)
}
