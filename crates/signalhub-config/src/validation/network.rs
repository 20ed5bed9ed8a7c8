//! Listener address validation.

use std::net::IpAddr;

use super::helpers::validate_ip;
use crate::schema::RelayConfig;

pub(super) fn validate_server(errors: &mut Vec<String>, config: &RelayConfig) {
    validate_ip(errors, "server.bind_address", &config.server.bind_address);
    if config.server.port == 0 {
        errors.push("server.port must be non-zero".into());
    }
}

pub(super) fn validate_status(errors: &mut Vec<String>, config: &RelayConfig) {
    // Without a dedicated port the routes share the signaling listener.
    let Some(port) = config.status.port.filter(|_| config.status.enabled) else {
        return;
    };

    validate_ip(errors, "status.bind_address", &config.status.bind_address);
    if port == 0 {
        errors.push("status.port must be non-zero".into());
    }

    if port == config.server.port
        && listeners_overlap(&config.server.bind_address, &config.status.bind_address)
    {
        errors.push(format!("status.port = {port} collides with server.port"));
    }
}

/// Two bind addresses overlap if they are equal or either is unspecified.
fn listeners_overlap(a: &str, b: &str) -> bool {
    match (a.parse::<IpAddr>(), b.parse::<IpAddr>()) {
        (Ok(a), Ok(b)) => a == b || a.is_unspecified() || b.is_unspecified(),
        _ => a == b,
    }
}
