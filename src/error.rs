//! Error types for the transcription pipeline.

use thiserror::Error;

/// Library-level error type.
#[derive(Error, Debug)]
pub enum TranscribeError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Audio file not found: {0}")]
    InputNotFound(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),

    #[error("External tool not found: {0}. Please install it and ensure it's in your PATH.")]
    ToolNotFound(String),

    #[error("External tool failed: {0}")]
    ToolFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to move report into place: {0}")]
    Persist(#[from] tempfile::PersistError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Invalid rewrite pattern: {0}")]
    Regex(#[from] regex::Error),
}

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, TranscribeError>;
