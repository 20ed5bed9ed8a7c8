//! Resource limit validation.

use super::helpers::validate_range;
use crate::schema::{RelayConfig, MAX_MESSAGE_BYTES_LIMIT};

pub(super) fn validate_limits(errors: &mut Vec<String>, config: &RelayConfig) {
    let limits = &config.limits;
    validate_range(
        errors,
        "limits.outbound_queue",
        limits.outbound_queue as u64,
        1,
        65_536,
    );
    validate_range(
        errors,
        "limits.max_message_bytes",
        limits.max_message_bytes as u64,
        1024,
        MAX_MESSAGE_BYTES_LIMIT as u64,
    );
    validate_range(
        errors,
        "limits.shutdown_grace_secs",
        limits.shutdown_grace_secs,
        0,
        300,
    );
}
