//! Configuration loading and validation.
//!
//! Config is read once at startup: the lookup store is opened and its
//! query compiled a single time, so there is no hot-reloading. Files are
//! YAML, JSON or TOML depending on extension and enabled features.
//! Submodules provide the data model and validation logic.

pub mod model;
pub mod validation;

use std::path::{Path, PathBuf};

use crate::error::SqlRouterError;
use model::Config;

/// File names probed in the working directory when no `--config` is given.
pub const CANDIDATES: &[&str] = &[
    "sqlrouter.yaml",
    "sqlrouter.yml",
    "sqlrouter.json",
    "sqlrouter.toml",
];

/// Parse a config string based on file extension.
pub fn parse_config_str(
    ext: &str,
    content: &str,
    path_display: &str,
) -> Result<Config, SqlRouterError> {
    match ext {
        #[cfg(feature = "yaml")]
        "yaml" | "yml" => serde_yml::from_str(content).map_err(|e| SqlRouterError::ConfigParse {
            path: path_display.to_string(),
            source: Box::new(e),
        }),

        #[cfg(feature = "json")]
        "json" => serde_json::from_str(content).map_err(|e| SqlRouterError::ConfigParse {
            path: path_display.to_string(),
            source: Box::new(e),
        }),

        #[cfg(feature = "toml")]
        "toml" => toml::from_str(content).map_err(|e| SqlRouterError::ConfigParse {
            path: path_display.to_string(),
            source: Box::new(e),
        }),

        other => Err(SqlRouterError::UnsupportedFormat(other.to_string())),
    }
}

/// Read, parse and validate a config file.
pub async fn load_file(path: &Path) -> Result<Config, SqlRouterError> {
    let content = tokio::fs::read_to_string(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            SqlRouterError::ConfigFileNotFound {
                path: path.to_path_buf(),
            }
        } else {
            SqlRouterError::Io(e)
        }
    })?;

    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    let config = parse_config_str(ext, &content, &path.display().to_string())?;

    validation::validate(&config).map_err(|errors| SqlRouterError::ConfigValidation { errors })?;
    Ok(config)
}

/// The explicit path if given, otherwise the first candidate that exists.
pub async fn locate(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    for name in CANDIDATES {
        let path = PathBuf::from(name);
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            tracing::info!(path = %path.display(), "auto-detected config file");
            return Some(path);
        }
    }

    None
}
