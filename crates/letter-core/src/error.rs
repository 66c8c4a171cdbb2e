//! Error types for the letter generator

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for all letter generation operations
#[derive(Error, Debug)]
pub enum LetterError {
    #[error("Database connection failed: {0}")]
    Connection(String),

    #[error("Database query failed: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Malformed row: {0}")]
    Mapping(String),

    #[error("No collection schedule found for property {0}")]
    MissingSchedule(String),

    #[error("File system error: {0}")]
    Io(#[from] std::io::Error),

    #[error("PDF rendering failed for {path}: {reason}")]
    RenderFailed { path: PathBuf, reason: String },

    #[error("PDF merge failed: {0}")]
    Merge(String),

    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for letter generation operations
pub type Result<T> = std::result::Result<T, LetterError>;
