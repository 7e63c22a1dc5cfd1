//! Serde data structures for the sqlrouter configuration file.
//!
//! Contains [`Config`] (the root), [`StoreConfig`] for the lookup store,
//! [`ProxyConfig`] for the forwarding stage and [`HeaderRules`]. All types
//! derive `Serialize` and `Deserialize` with `deny_unknown_fields` for
//! strict parsing. Durations are milliseconds.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::store::{self, KeyCollation, StoreSettings};

pub const DEFAULT_QUERY: &str = "SELECT host, port FROM route WHERE domain = ? COLLATE route_key";

const fn default_busy_timeout() -> u64 {
    3000
}

const fn default_acquire_timeout() -> u64 {
    3000
}

const fn default_connect_timeout() -> u64 {
    5000
}

const fn default_lookup_timeout() -> u64 {
    5000
}

const fn default_close_timeout() -> u64 {
    5000
}

const fn default_proxy_timeout() -> u64 {
    30_000
}

const fn default_true() -> bool {
    true
}

fn is_true(v: &bool) -> bool {
    *v
}

fn is_default_proxy(v: &ProxyConfig) -> bool {
    v.scheme == UpstreamScheme::Http
        && v.timeout == default_proxy_timeout()
        && v.forward_headers
        && v.proxy_headers
        && v.strip_hop_by_hop
        && v.headers.is_default()
}

fn is_default_collation(v: &KeyCollation) -> bool {
    *v == KeyCollation::default()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub store: StoreConfig,

    #[serde(default, skip_serializing_if = "is_default_proxy")]
    pub proxy: ProxyConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    pub path: PathBuf,

    pub query: String,

    #[serde(default = "default_busy_timeout")]
    pub busy_timeout: u64,

    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout: u64,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64,

    #[serde(default = "default_lookup_timeout")]
    pub lookup_timeout: u64,

    #[serde(default = "default_close_timeout")]
    pub close_timeout: u64,

    /// Defaults to the number of logical CPUs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_connections: Option<u32>,

    #[serde(default, skip_serializing_if = "is_default_collation")]
    pub key_collation: KeyCollation,
}

impl StoreConfig {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, query: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            query: query.into(),
            busy_timeout: default_busy_timeout(),
            acquire_timeout: default_acquire_timeout(),
            connect_timeout: default_connect_timeout(),
            lookup_timeout: default_lookup_timeout(),
            close_timeout: default_close_timeout(),
            max_connections: None,
            key_collation: KeyCollation::default(),
        }
    }

    #[must_use]
    pub fn to_settings(&self) -> StoreSettings {
        StoreSettings {
            path: self.path.clone(),
            query: self.query.clone(),
            busy_timeout: Duration::from_millis(self.busy_timeout),
            max_connections: self
                .max_connections
                .unwrap_or_else(store::default_max_connections),
            acquire_timeout: Duration::from_millis(self.acquire_timeout),
            connect_timeout: Duration::from_millis(self.connect_timeout),
            lookup_timeout: Duration::from_millis(self.lookup_timeout),
            close_timeout: Duration::from_millis(self.close_timeout),
            key_collation: self.key_collation,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UpstreamScheme {
    #[default]
    Http,
    Https,
}

impl fmt::Display for UpstreamScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http => f.write_str("http"),
            Self::Https => f.write_str("https"),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ProxyConfig {
    #[serde(default)]
    pub scheme: UpstreamScheme,

    #[serde(default = "default_proxy_timeout")]
    pub timeout: u64,

    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub forward_headers: bool,

    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub proxy_headers: bool,

    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub strip_hop_by_hop: bool,

    #[serde(default, skip_serializing_if = "HeaderRules::is_default")]
    pub headers: HeaderRules,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            scheme: UpstreamScheme::default(),
            timeout: default_proxy_timeout(),
            forward_headers: default_true(),
            proxy_headers: default_true(),
            strip_hop_by_hop: default_true(),
            headers: HeaderRules::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct HeaderRules {
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub add: HashMap<String, String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub strip: Vec<String>,
}

impl HeaderRules {
    fn is_default(&self) -> bool {
        self.add.is_empty() && self.strip.is_empty()
    }
}
