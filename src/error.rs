// src/error.rs

//! Unified error handling for the supporter cache.

use std::fmt;

use thiserror::Error;

/// Result type alias for supporter cache operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP client could not be built or a request failed outside pagination
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration value out of range
    #[error("Validation error: {0}")]
    Validation(String),

    /// Network failure or non-success response while paginating
    #[error("Remote fetch failed for {url}: {message}")]
    RemoteFetch { url: String, message: String },

    /// The remote kept returning next-links past the page guard
    #[error("Pagination exceeded {max_pages} pages")]
    PageLimitExceeded { max_pages: usize },

    /// A raw item was missing a required attribute or relationship
    #[error("Malformed {kind} item '{id}': {message}")]
    Normalization {
        kind: String,
        id: String,
        message: String,
    },

    /// Webhook payload failed authentication
    #[error("Webhook signature mismatch")]
    Signature,

    /// Operation requires a completed bulk load
    #[error("Precondition failed: {0}")]
    Precondition(String),

    /// Another bulk load currently owns the store
    #[error("A bulk load is already in progress")]
    LoadInProgress,

    /// Event-kind header not understood
    #[error("Unsupported webhook event: {0}")]
    UnsupportedEvent(String),
}

impl AppError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a remote fetch error for the given URL.
    pub fn remote_fetch(url: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::RemoteFetch {
            url: url.into(),
            message: message.to_string(),
        }
    }

    /// Create a normalization error for one raw item.
    pub fn normalization(
        kind: impl Into<String>,
        id: impl Into<String>,
        message: impl fmt::Display,
    ) -> Self {
        Self::Normalization {
            kind: kind.into(),
            id: id.into(),
            message: message.to_string(),
        }
    }

    /// Create a precondition error.
    pub fn precondition(message: impl Into<String>) -> Self {
        Self::Precondition(message.into())
    }
}
