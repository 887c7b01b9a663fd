//! Error types for restsnap

use thiserror::Error;

/// Result type alias for collector operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced while loading declarations or talking to a controller
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Endpoint declaration file error
    #[error("Declaration error: {0}")]
    Declaration(#[from] serde_yaml::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// API error response
    #[error("API error: {message} (status: {status})")]
    Api {
        /// Error message from the controller
        message: String,
        /// HTTP status code
        status: u16,
    },

    /// Authentication error
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// Network error
    #[error("Network error: {0}")]
    Network(String),
}

impl Error {
    /// HTTP status carried by the error, when one exists.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api { status, .. } => Some(*status),
            Error::Http(err) => err.status().map(|code| code.as_u16()),
            _ => None,
        }
    }
}
