//! Error types for the loanflow crate

use thiserror::Error;

/// Errors surfaced by the preprocessing, training, and inference layers.
#[derive(Error, Debug)]
pub enum LoanflowError {
    /// Malformed or unusable data
    #[error("Data error: {0}")]
    DataError(String),

    /// A required column is missing (fatal at fit time for the target)
    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    /// A fitted object was used before `fit`
    #[error("Pipeline or model is not fitted")]
    NotFitted,

    /// Model training failed
    #[error("Training error: {0}")]
    TrainingError(String),

    /// A persisted pipeline or model artifact could not be read or written
    #[error("Artifact error: {0}")]
    ArtifactError(String),

    /// Serialization failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO failure
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, LoanflowError>;
