//! Error types for agent-relay.

use thiserror::Error;

/// Library-level error type for relay operations.
#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),

    #[error("Agent error: {0}")]
    Agent(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Task cannot be canceled: {0}")]
    TaskNotCancelable(String),

    #[error("Task already reached a terminal state: {0}")]
    TaskClosed(String),

    #[error("{0}")]
    Unsupported(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

/// Result type alias for relay operations.
pub type Result<T> = std::result::Result<T, RelayError>;
