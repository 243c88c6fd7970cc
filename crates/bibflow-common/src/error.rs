//! Error types for bibflow

use thiserror::Error;

/// Result type alias for bibflow operations
pub type Result<T> = std::result::Result<T, BibflowError>;

/// Main error type for bibflow
#[derive(Error, Debug)]
pub enum BibflowError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Job execution not found: {0}")]
    JobExecutionNotFound(String),

    #[error("Invalid status transition: {0}")]
    InvalidTransition(String),

    #[error("Record parse error: {0}")]
    Parse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Event publish error: {0}")]
    Publish(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}
