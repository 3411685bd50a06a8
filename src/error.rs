use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading the service configuration.
///
/// These are fatal: the process must not start serving with a configuration
/// it could not read or parse.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file could not be read
    #[error("cannot read configuration file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration file is not valid JSON or does not match the schema
    #[error("cannot parse configuration file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors from a tile store backend.
///
/// The distinction between variants matters for request handling:
/// `Query` is a hard failure (the fallback tile must not be served),
/// while a clean miss is not an error at all (`Ok(None)` from the query).
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    /// The connection spec could not be interpreted
    #[error("invalid connection spec: {0}")]
    InvalidSpec(String),

    /// The store could not be reached or opened
    #[error("connection failed: {0}")]
    Connect(String),

    /// The store was reachable but the query failed
    #[error("query failed: {0}")]
    Query(String),
}
