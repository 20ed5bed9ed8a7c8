//! Shared validation helpers used by all domain validators.

use std::net::IpAddr;

/// Push an error if `value` is outside `[min, max]`.
pub(crate) fn validate_range(errors: &mut Vec<String>, name: &str, value: u64, min: u64, max: u64) {
    if value < min || value > max {
        errors.push(format!("{name} = {value} is out of range [{min}, {max}]"));
    }
}

/// Push an error if `value` is not a literal IPv4/IPv6 address.
pub(crate) fn validate_ip(errors: &mut Vec<String>, name: &str, value: &str) {
    if value.parse::<IpAddr>().is_err() {
        errors.push(format!("{name} = {value:?} is not an IP address"));
    }
}
