//! Error types for completeness scoring
//!
//! Any error aborts scoring of the affected record only; nothing is persisted
//! for a record whose pass failed.

use thiserror::Error;

/// Completeness scoring error
#[derive(Debug, Error)]
pub enum CompletenessError {
    /// The record to score does not exist
    #[error("Record not found: {0}")]
    RecordNotFound(String),

    /// An entity reference could not be resolved to a record
    #[error("Scoring target not found: {0}")]
    TargetNotFound(String),

    /// Stored catalog data or catalog settings cannot be interpreted
    #[error("Invalid catalog data: {0}")]
    InvalidData(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// pim-common error (schema maintenance, settings)
    #[error("Common error: {0}")]
    Common(#[from] pim_common::Error),
}

/// Result type for completeness operations
pub type Result<T> = std::result::Result<T, CompletenessError>;
