//! Header construction, forwarding, and hop-by-hop stripping.
//!
//! [`build_forwarded_headers`] clones the original client headers (when
//! forwarding is enabled), strips hop-by-hop headers, rewrites `Host`,
//! adds proxy metadata (`X-Forwarded-For`, `X-Real-IP`, `Via`,
//! `X-Correlation-Id`), and applies the configured header rules.

use std::sync::LazyLock;

use axum::http::{HeaderMap, HeaderName, HeaderValue};

use crate::config::model::ProxyConfig;

static HOP_BY_HOP: LazyLock<Vec<HeaderName>> = LazyLock::new(|| {
    [
        "connection",
        "keep-alive",
        "transfer-encoding",
        "te",
        "trailer",
        "upgrade",
        "proxy-authorization",
        "proxy-authenticate",
    ]
    .iter()
    .filter_map(|name| name.parse::<HeaderName>().ok())
    .collect()
});

/// Strip hop-by-hop headers and `content-length` from an upstream response.
///
/// The body has already been fully collected, so `transfer-encoding` and
/// `content-length` from the origin are no longer accurate.
pub fn strip_response_hop_by_hop(headers: &mut HeaderMap) {
    for name in HOP_BY_HOP.iter() {
        headers.remove(name);
    }
    headers.remove(hyper::header::CONTENT_LENGTH);
}

pub fn build_forwarded_headers(
    original: &HeaderMap,
    client_ip: Option<&str>,
    target_url: &url::Url,
    config: &ProxyConfig,
    correlation_id: &str,
) -> HeaderMap {
    let mut headers = if config.forward_headers {
        original.clone()
    } else {
        HeaderMap::new()
    };

    if config.strip_hop_by_hop {
        for header_name in HOP_BY_HOP.iter() {
            headers.remove(header_name);
        }
    }

    // Rewrite Host
    if let Some(host) = target_url.host_str() {
        let host_value = target_url
            .port()
            .map_or_else(|| host.to_string(), |port| format!("{host}:{port}"));
        if let Ok(val) = HeaderValue::from_str(&host_value) {
            headers.insert("host", val);
        }
    }

    if config.proxy_headers {
        if let Some(client_ip) = client_ip {
            // X-Forwarded-For: append to chain
            let xff = headers
                .get("x-forwarded-for")
                .and_then(|v| v.to_str().ok())
                .map_or_else(
                    || client_ip.to_string(),
                    |existing| format!("{existing}, {client_ip}"),
                );
            if let Ok(val) = HeaderValue::from_str(&xff) {
                headers.insert("x-forwarded-for", val);
            }

            // X-Real-IP (first IP in chain)
            let real_ip = xff.split(',').next().unwrap_or(client_ip).trim();
            if let Ok(val) = HeaderValue::from_str(real_ip) {
                headers.insert("x-real-ip", val);
            }
        }

        if let Ok(val) = HeaderValue::from_str(target_url.scheme()) {
            headers.insert("x-forwarded-proto", val);
        }

        // X-Forwarded-Host carries the routed host the client asked for
        if let Some(original_host) = original.get("host") {
            headers.insert("x-forwarded-host", original_host.clone());
        }

        headers.insert("via", HeaderValue::from_static("1.1 sqlrouter"));

        if let Ok(val) = HeaderValue::from_str(correlation_id) {
            headers.insert("x-correlation-id", val);
        }
    }

    for (key, value) in &config.headers.add {
        match (key.parse::<HeaderName>(), HeaderValue::from_str(value)) {
            (Ok(name), Ok(val)) => {
                headers.insert(name, val);
            }
            _ => {
                tracing::warn!(header = %key, "invalid header name or value in proxy.headers.add, skipping");
            }
        }
    }

    for key in &config.headers.strip {
        if let Ok(name) = key.parse::<HeaderName>() {
            headers.remove(&name);
        }
    }

    headers
}
