//! Default TOML config template with inline documentation comments.

/// Generate the default TOML config content with comments.
pub(crate) fn default_config_toml() -> String {
    r##"# signalhub relay configuration
# Only override what you want to change -- missing fields use defaults.

[server]
# bind_address = "0.0.0.0"
# port = 3001              # WebSocket signaling port (env: PORT)

[status]
# /health, /meeting/{id} and /meetings answer on the signaling port.
# enabled = true
# Uncomment to also serve them on a dedicated listener (env: STATUS_PORT).
# bind_address = "0.0.0.0"
# port = 3002

[limits]
# outbound_queue = 256           # 1-65536 frames buffered per connection
# max_message_bytes = 65536      # 1024-16777216; frames over 4x this close the connection
# shutdown_grace_secs = 5        # 0-300

[logging]
# level = "info"           # trace, debug, info, warn, error (RUST_LOG wins)
"##
    .to_string()
}
