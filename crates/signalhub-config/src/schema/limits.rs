use serde::{Deserialize, Serialize};

/// Upper bound on `max_message_bytes`, and on the transport ceiling.
pub const MAX_MESSAGE_BYTES_LIMIT: usize = 16 * 1024 * 1024;

/// Per-connection resource limits and shutdown timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Outbound frames buffered per connection before new ones are dropped
    /// (valid range: 1-65536).
    pub outbound_queue: usize,
    /// Largest accepted inbound text frame in bytes (valid range: 1024-16777216).
    pub max_message_bytes: usize,
    /// Seconds to wait for connections to drain on shutdown (valid range: 0-300).
    pub shutdown_grace_secs: u64,
}

impl LimitsConfig {
    /// Hard cap enforced by the WebSocket reader. Frames above
    /// `max_message_bytes` but under this still get an `error` reply;
    /// anything larger closes the connection before it is buffered.
    pub fn transport_ceiling(&self) -> usize {
        self.max_message_bytes
            .saturating_mul(4)
            .min(MAX_MESSAGE_BYTES_LIMIT)
            .max(self.max_message_bytes)
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            outbound_queue: 256,
            max_message_bytes: 64 * 1024,
            shutdown_grace_secs: 5,
        }
    }
}
