//! Configuration schema types for the relay.
//!
//! All structs use `serde(default)` so partial configs work correctly.

mod limits;
mod logging;
mod server;
mod status;

pub use limits::*;
pub use logging::*;
pub use server::*;
pub use status::*;

use serde::{Deserialize, Serialize};

/// Root configuration for the signaling relay.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RelayConfig {
    pub server: ServerConfig,
    pub status: StatusConfig,
    pub limits: LimitsConfig,
    pub logging: LoggingConfig,
}
