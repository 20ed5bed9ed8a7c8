pub mod errors;
pub mod id;

pub use errors::{ConfigError, ProtocolError, RelayError};
pub use id::ConnectionId;
