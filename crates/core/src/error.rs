//! Error types for tripweave.
//!
//! One enum covers every failure category in the pipeline: configuration,
//! I/O, generative/embedding backends, the knowledge store and prompts.

use thiserror::Error;

/// Unified error type for tripweave.
///
/// All fallible functions return `Result<T, AppError>`; library code does not
/// panic on bad input.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generative or embedding backend errors
    #[error("LLM error: {0}")]
    Llm(String),

    /// Corpus, index and retrieval errors
    #[error("Knowledge error: {0}")]
    Knowledge(String),

    /// A required persisted artifact is missing
    #[error("Not found: {0}")]
    NotFound(String),

    /// Prompt definition and rendering errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
