//! Error types for the calendar agent.

use std::time::Duration;

/// Top-level error type for the agent.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Inbox error: {0}")]
    Inbox(#[from] InboxError),

    #[error("Calendar error: {0}")]
    Calendar(#[from] CalendarError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Inbox collaborator errors.
#[derive(Debug, thiserror::Error)]
pub enum InboxError {
    #[error("Inbox request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Inbox API returned status {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Invalid inbox response: {0}")]
    InvalidResponse(String),
}

/// Calendar collaborator errors.
#[derive(Debug, thiserror::Error)]
pub enum CalendarError {
    #[error("Calendar request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Calendar API returned status {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Invalid calendar URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid calendar response: {0}")]
    InvalidResponse(String),
}

/// Extraction (classification) errors.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("Extraction request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Extraction provider returned status {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Invalid extraction response: {0}")]
    InvalidResponse(String),

    #[error("Extraction timed out after {0:?}")]
    Timeout(Duration),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for the agent.
pub type Result<T> = std::result::Result<T, Error>;
