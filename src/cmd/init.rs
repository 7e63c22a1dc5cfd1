//! `sqlrouter init`: generate a starter configuration file.
//!
//! Creates a YAML, JSON, or TOML config file with either minimal
//! or fully documented templates.

use std::path::PathBuf;

use crate::cli::{ConfigFormat, InitArgs};
use crate::error::SqlRouterError;

pub fn execute(args: &InitArgs) -> Result<(), SqlRouterError> {
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(format!("sqlrouter.{}", args.format.extension())));

    if output.exists() {
        return Err(SqlRouterError::FileExists { path: output });
    }

    std::fs::write(&output, template(&args.format, args.full))?;
    println!("Created {}", output.display());
    Ok(())
}

#[must_use]
pub const fn template(format: &ConfigFormat, full: bool) -> &'static str {
    match (format, full) {
        (ConfigFormat::Yaml, false) => YAML_MINIMAL,
        (ConfigFormat::Yaml, true) => YAML_FULL,
        (ConfigFormat::Json, false) => JSON_MINIMAL,
        (ConfigFormat::Json, true) => JSON_FULL,
        (ConfigFormat::Toml, false) => TOML_MINIMAL,
        (ConfigFormat::Toml, true) => TOML_FULL,
    }
}

const YAML_MINIMAL: &str = r#"# sqlrouter config
#
# Table layout expected by the query below:
#   CREATE TABLE route (domain TEXT PRIMARY KEY, host TEXT, port INTEGER);

store:
  path: "routes.db"
  query: "SELECT host, port FROM route WHERE domain = ? COLLATE route_key"
"#;

const YAML_FULL: &str = r#"# sqlrouter config
#
# All values shown are defaults unless marked otherwise.

store:
  # SQLite database, opened read-only. Required.
  path: "routes.db"

  # One placeholder for the routing key (first host label, lower-cased).
  # Must project (host TEXT, port INTEGER). Required.
  query: "SELECT host, port FROM route WHERE domain = ? COLLATE route_key"

  # busy_timeout: 3000         # ms to wait on a locked database
  # acquire_timeout: 3000      # ms to wait for a pooled connection
  # connect_timeout: 5000      # ms allowed for the startup health check
  # lookup_timeout: 5000       # ms allowed per lookup
  # close_timeout: 5000        # ms allowed to close the pool on shutdown
  # max_connections: 8         # default: one per CPU
  # key_collation: binary      # binary | nocase, used by COLLATE route_key

proxy:
  # scheme: http               # http | https for upstream requests
  # timeout: 30000             # upstream timeout in ms
  # forward_headers: true      # Forward client headers to the upstream
  # proxy_headers: true        # Add X-Forwarded-*, Via headers
  # strip_hop_by_hop: true     # Strip Connection, TE, etc.
  # headers:
  #   add: {}                  # Headers to add to forwarded requests
  #   strip: []                # Headers to remove from forwarded requests
"#;

const JSON_MINIMAL: &str = r#"{
  "store": {
    "path": "routes.db",
    "query": "SELECT host, port FROM route WHERE domain = ? COLLATE route_key"
  }
}
"#;

const JSON_FULL: &str = r#"{
  "store": {
    "path": "routes.db",
    "query": "SELECT host, port FROM route WHERE domain = ? COLLATE route_key",
    "busy_timeout": 3000,
    "acquire_timeout": 3000,
    "connect_timeout": 5000,
    "lookup_timeout": 5000,
    "close_timeout": 5000,
    "key_collation": "binary"
  },
  "proxy": {
    "scheme": "http",
    "timeout": 30000,
    "forward_headers": true,
    "proxy_headers": true,
    "strip_hop_by_hop": true,
    "headers": {
      "add": {},
      "strip": []
    }
  }
}
"#;

const TOML_MINIMAL: &str = r#"# sqlrouter config

[store]
path = "routes.db"
query = "SELECT host, port FROM route WHERE domain = ? COLLATE route_key"
"#;

const TOML_FULL: &str = r#"# sqlrouter config
#
# All values shown are defaults unless marked otherwise.

[store]
path = "routes.db"
query = "SELECT host, port FROM route WHERE domain = ? COLLATE route_key"
# busy_timeout = 3000
# acquire_timeout = 3000
# connect_timeout = 5000
# lookup_timeout = 5000
# close_timeout = 5000
# max_connections = 8
# key_collation = "binary"

[proxy]
# scheme = "http"
# timeout = 30000
# forward_headers = true
# proxy_headers = true
# strip_hop_by_hop = true

# [proxy.headers]
# add = {}
# strip = []
"#;
