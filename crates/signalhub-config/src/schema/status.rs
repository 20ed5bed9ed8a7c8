use serde::{Deserialize, Serialize};

/// HTTP status surface (`/health`, `/meeting/{id}`, `/meetings`).
///
/// When enabled the routes answer on the signaling port next to the
/// WebSocket endpoint. Setting `port` also opens a dedicated listener on
/// `bind_address:port`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusConfig {
    pub enabled: bool,
    pub bind_address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind_address: "0.0.0.0".into(),
            port: None,
        }
    }
}
