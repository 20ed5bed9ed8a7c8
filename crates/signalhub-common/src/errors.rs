use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("config parse error: {0}")]
    ParseError(String),

    #[error("config validation error: {0}")]
    ValidationError(String),
}

/// Problems with a single inbound frame. The `Display` text is what the
/// sender sees in the `error` reply.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    #[error("Invalid message format: {0}")]
    InvalidFormat(String),

    #[error("Invalid join-meeting: {0}")]
    InvalidJoin(String),

    #[error("Invalid message format: binary frames are not supported")]
    BinaryFrame,

    #[error("Message too large: {size} bytes exceeds limit of {limit}")]
    MessageTooLarge { size: usize, limit: usize },
}

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid listen address: {0}")]
    Address(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
