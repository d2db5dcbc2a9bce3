//! Error types for the shared catalog plumbing

use thiserror::Error;

/// Result alias used throughout pim-common
pub type Result<T> = std::result::Result<T, Error>;

/// Failures of configuration, database setup and schema maintenance
#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Unreadable or invalid configuration file
    #[error("Configuration error: {0}")]
    Config(String),

    /// A channel or language code that cannot be turned into a column name
    #[error("Invalid identifier: '{0}'")]
    InvalidIdentifier(String),
}
