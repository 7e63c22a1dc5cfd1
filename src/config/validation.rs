//! Configuration validation with detailed error reporting.
//!
//! The [`validate`] function checks a parsed [`Config`] for structural
//! errors such as an empty store path, a lookup query that is not a
//! single `SELECT` with one positional placeholder, zero timeouts or pool sizes, and malformed header
//! rules. Returns a list of [`ValidationError`] values with per-field
//! suggestions. Whether the query actually compiles is only known once
//! the store is opened.

use axum::http::{HeaderName, HeaderValue};

use super::model::Config;
use crate::error::ValidationError;
use crate::query;

/// Validate the lookup query text. Returns `Ok(())` or a human-readable error.
pub fn validate_query(sql: &str) -> Result<(), String> {
    if sql.trim().is_empty() {
        return Err("query cannot be empty".into());
    }
    let is_select = query::leading_keyword(sql)
        .is_some_and(|kw| kw.eq_ignore_ascii_case("select") || kw.eq_ignore_ascii_case("with"));
    if !is_select {
        return Err("query must be a single SELECT statement".into());
    }
    if query::statement_count(sql) != 1 {
        return Err("query must contain exactly one statement".into());
    }
    if let Some(name) = query::named_parameter(sql) {
        return Err(format!(
            "named parameter '{name}' is not supported, use a positional '?'"
        ));
    }
    Ok(())
}

fn push(errors: &mut Vec<ValidationError>, section: &str, field: &str, message: impl Into<String>) {
    errors.push(ValidationError {
        section: section.into(),
        field: field.into(),
        message: message.into(),
        suggestion: None,
    });
}

pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let store = &config.store;

    if store.path.as_os_str().is_empty() {
        push(&mut errors, "store", "path", "path cannot be empty");
    }

    if let Err(msg) = validate_query(&store.query) {
        errors.push(ValidationError {
            section: "store".into(),
            field: "query".into(),
            message: msg,
            suggestion: Some("e.g. SELECT host, port FROM route WHERE domain = ?".into()),
        });
    }

    for (field, value) in [
        ("busy_timeout", store.busy_timeout),
        ("acquire_timeout", store.acquire_timeout),
        ("connect_timeout", store.connect_timeout),
        ("lookup_timeout", store.lookup_timeout),
        ("close_timeout", store.close_timeout),
    ] {
        if value == 0 {
            push(&mut errors, "store", field, "timeout must be greater than 0 ms");
        }
    }

    if store.max_connections == Some(0) {
        errors.push(ValidationError {
            section: "store".into(),
            field: "max_connections".into(),
            message: "pool needs at least one connection".into(),
            suggestion: Some("omit it to use one connection per CPU".into()),
        });
    }

    let proxy = &config.proxy;
    if proxy.timeout == 0 {
        push(&mut errors, "proxy", "timeout", "timeout must be greater than 0 ms");
    }

    for (key, value) in &proxy.headers.add {
        if key.parse::<HeaderName>().is_err() {
            push(&mut errors, "proxy", "headers.add", format!("'{key}' is not a valid header name"));
        } else if HeaderValue::from_str(value).is_err() {
            push(&mut errors, "proxy", "headers.add", format!("value for '{key}' is not a valid header value"));
        }
    }

    for key in &proxy.headers.strip {
        if key.parse::<HeaderName>().is_err() {
            push(&mut errors, "proxy", "headers.strip", format!("'{key}' is not a valid header name"));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[must_use]
pub fn format_validation_report(path: &str, config: &Config) -> String {
    let store = &config.store;
    let pool = store
        .max_connections
        .map_or_else(|| "one per CPU".to_string(), |n| n.to_string());

    let lines = [
        format!("  store:   {}", store.path.display()),
        format!("  query:   {}", store.query.trim()),
        format!("  pool:    {pool} connections"),
        format!("  keys:    {:?} collation", store.key_collation),
        format!(
            "  proxy:   {} upstreams, {}ms timeout",
            config.proxy.scheme, config.proxy.timeout
        ),
    ];

    format!("{} is valid\n{}", path, lines.join("\n"))
}
