//! Error handling for the risk segmentation pipeline.

pub mod util;

/// Failures the pipeline can report on its own behalf.
///
/// I/O, Parquet and Arrow failures are not wrapped here; they travel through
/// [`Result`] with `anyhow` context naming the file involved.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// None of the configured input sources could be read
    #[error("No readable input sources (attempted {attempted})")]
    NoReadableSources { attempted: usize },

    /// A required column is missing from an input batch
    #[error("Column '{column}' not found in record batch")]
    ColumnNotFound { column: String },

    /// A column exists but cannot be interpreted as the expected type
    #[error("Column '{column}' has unsupported type {actual}")]
    InvalidColumnType { column: String, actual: String },

    /// A stage received no rows to work with
    #[error("No providers left to process at stage: {stage}")]
    EmptyPopulation { stage: &'static str },

    /// Configuration values are out of range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type used throughout the crate
pub type Result<T> = anyhow::Result<T>;
