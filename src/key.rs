//! Routing key extraction from the request host.
//!
//! [`extract_key`] turns a `Host` value such as `App1.Example.com.:8443`
//! into the lookup key `app1`. Hosts with fewer than two labels or an
//! empty first label are rejected before any lookup happens.

use std::fmt;

/// Normalized first label of a request host. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RouteKey(String);

impl RouteKey {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Extract the routing key from a host value, or `None` if the host is
/// not routable.
#[must_use]
pub fn extract_key(host: &str) -> Option<RouteKey> {
    let host = strip_port(host);
    let host = host.strip_suffix('.').unwrap_or(host);

    let mut labels = host.split('.');
    let first = labels.next()?;
    if first.is_empty() || labels.next().is_none() {
        return None;
    }

    Some(RouteKey(first.to_ascii_lowercase()))
}

/// Remove a `:port` suffix. `[addr]:port` yields the bare address; a
/// bracketed host without a port, or anything with more than one
/// unbracketed colon, is returned unchanged.
fn strip_port(host: &str) -> &str {
    if let Some(rest) = host.strip_prefix('[') {
        return match rest.split_once(']') {
            Some((addr, tail)) if tail.starts_with(':') => addr,
            _ => host,
        };
    }

    match host.split_once(':') {
        Some((name, port)) if !port.contains(':') => name,
        _ => host,
    }
}
