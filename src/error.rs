use std::path::PathBuf;

use thiserror::Error;

/// Failures of a score record source. Averages are never computed from a
/// partial or substituted record set, so these always reach the caller.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("score records unavailable: {0}")]
    Unavailable(#[from] sqlx::Error),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode grade records from {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("DATABASE_URL must be set to a Postgres instance")]
    MissingDatabaseUrl,

    #[error("invalid value {value:?} for {name}")]
    Invalid { name: &'static str, value: String },
}
