//! Unified error types for sqlrouter.
//!
//! Defines [`SqlRouterError`] (the top-level CLI error), the lookup store
//! lifecycle errors ([`ProvisionError`], [`ResolveError`] / [`StoreError`],
//! [`TeardownError`]) and [`ValidationError`] for config validation
//! failures. All use `thiserror` for `Display` and `Error` derives.

use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub section: String,
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "  {}.{}: {}", self.section, self.field, self.message)?;
        if let Some(ref suggestion) = self.suggestion {
            write!(f, " ({suggestion})")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

fn format_errors(errors: &[ValidationError]) -> String {
    use std::fmt::Write;
    let mut buf = String::new();
    for (i, e) in errors.iter().enumerate() {
        if i > 0 {
            buf.push('\n');
        }
        // write! to String is infallible (only fails on OOM which is unrecoverable)
        let _ = write!(buf, "{e}");
    }
    buf
}

/// Failure to bring the lookup store into service. Always fatal.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ProvisionError {
    #[error("failed to open lookup store {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: sqlx::Error,
    },

    #[error("lookup store health check failed: {0}")]
    HealthCheck(#[source] sqlx::Error),

    #[error("lookup store health check timed out after {0:?}")]
    HealthCheckTimeout(Duration),

    #[error("failed to compile lookup query: {0}")]
    Compile(#[source] sqlx::Error),

    #[error("lookup query uses named parameter '{0}'; only positional '?' placeholders can be bound")]
    NamedParameter(String),

    #[error("lookup query must take exactly one parameter, found {0}")]
    ParameterCount(usize),

    #[error("lookup query must project (host, port), found {0} column(s)")]
    ColumnCount(usize),
}

/// Per-request store failure. Always mapped to 502 and never shown to clients.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum StoreError {
    #[error("lookup timed out after {0:?}")]
    Timeout(Duration),

    #[error("lookup query failed: {0}")]
    Query(#[source] sqlx::Error),

    #[error("failed to decode column '{column}': {source}")]
    Decode {
        column: &'static str,
        #[source]
        source: sqlx::Error,
    },

    #[error("port {0} is out of range")]
    PortOutOfRange(i64),
}

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("no route for key")]
    NotFound,

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum TeardownError {
    #[error("lookup store did not close within {0:?}")]
    CloseTimeout(Duration),
}

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum SqlRouterError {
    #[error("No config source found.\n\n  {hint}")]
    NoConfigSource { hint: String },

    #[error("Config file not found: {}", path.display())]
    ConfigFileNotFound { path: PathBuf },

    #[error("Config parse error in {path}:\n  {source}")]
    ConfigParse {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Config validation failed:\n{}", format_errors(.errors))]
    ConfigValidation { errors: Vec<ValidationError> },

    #[error("Unsupported config format: '{0}'")]
    UnsupportedFormat(String),

    #[error("Invalid address: {0}")]
    AddressParse(#[from] std::net::AddrParseError),

    #[error("Invalid URI: {source}")]
    UriParse {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("HTTP request failed: {source}")]
    HttpRequest {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("File already exists: {}", path.display())]
    FileExists { path: PathBuf },

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("Health check failed with status {0}")]
    HealthCheckFailed(hyper::StatusCode),

    #[error("Provisioning failed: {0}")]
    Provision(#[from] ProvisionError),

    #[error("Teardown failed: {0}")]
    Teardown(#[from] TeardownError),

    #[error("Lookup failed: {0}")]
    Resolve(#[from] ResolveError),
}
