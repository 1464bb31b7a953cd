//! # Client Error Types
//!
//! Error types for everything with a side effect.
//!
//! ## Error Taxonomy and Presentation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     How each error reaches the user                     │
//! │                                                                         │
//! │  Validation / NotFound / Http 4xx ──► Inline     (next to the field)   │
//! │  Transport / Timeout / Server 5xx ──► Retryable  (message + "retry")   │
//! │  Unauthorized                     ──► Redirect("/login"), no message   │
//! │  Forbidden                        ──► Redirect("/"), no message        │
//! │  Unavailable (missing exporter)   ──► Notice     (toast / banner)      │
//! │  Export / Storage / Config / Decode ► Notice                           │
//! │                                                                         │
//! │  Nothing here is fatal: the worst case is a bounded loading state.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Errors are `Clone` because the query cache keeps the last one next to
//! the stale data it failed to refresh.

use std::time::Duration;

use estoque_core::{CoreError, ValidationError};
use estoque_core::guard::{HOME_PATH, LOGIN_PATH};
use thiserror::Error;

use crate::export::ExportError;

/// Result type alias for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Client error type covering all possible failures.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClientError {
    // =========================================================================
    // Input Errors
    // =========================================================================
    /// Malformed user input, caught before any request.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Business rule violation (insufficient stock, empty sale).
    #[error("{0}")]
    Rule(CoreError),

    // =========================================================================
    // Remote Errors
    // =========================================================================
    /// The remote record does not exist (HTTP 404).
    #[error("Not found: {0}")]
    NotFound(String),

    /// No valid session (HTTP 401).
    #[error("Authentication required")]
    Unauthorized,

    /// Session lacks the required role (HTTP 403).
    #[error("Permission denied")]
    Forbidden,

    /// Any other 4xx rejected by the API.
    #[error("Request rejected ({status}): {message}")]
    Http { status: u16, message: String },

    /// 5xx from the API; transient.
    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// Network-level failure (DNS, connection reset, TLS).
    #[error("Transport error: {0}")]
    Transport(String),

    /// The operation did not finish in time.
    #[error("Timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// Response body did not match the expected shape.
    #[error("Invalid response: {0}")]
    Decode(String),

    // =========================================================================
    // Local Errors
    // =========================================================================
    /// An optional capability (document generator) is not available.
    #[error("Unavailable: {0}")]
    Unavailable(String),

    /// A document could not be rendered or saved.
    #[error("{0}")]
    Export(ExportError),

    /// Preference storage failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Configuration could not be loaded, saved or validated.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// How the UI should surface an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Presentation {
    /// Message next to the offending input.
    Inline,
    /// Message with a retry affordance.
    Retryable,
    /// Silent navigation, nothing shown.
    Redirect(String),
    /// User-visible notice (toast / banner).
    Notice,
}

impl ClientError {
    /// Maps the error onto the presentation table in the module docs.
    pub fn presentation(&self) -> Presentation {
        match self {
            ClientError::Validation(_)
            | ClientError::Rule(_)
            | ClientError::NotFound(_)
            | ClientError::Http { .. } => Presentation::Inline,
            ClientError::Server { .. } | ClientError::Transport(_) | ClientError::Timeout(_) => {
                Presentation::Retryable
            }
            ClientError::Unauthorized => Presentation::Redirect(LOGIN_PATH.to_string()),
            ClientError::Forbidden => Presentation::Redirect(HOME_PATH.to_string()),
            ClientError::Unavailable(_)
            | ClientError::Decode(_)
            | ClientError::Export(_)
            | ClientError::Storage(_)
            | ClientError::Config(_) => Presentation::Notice,
        }
    }

    /// Whether retrying the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ClientError::Server { .. } | ClientError::Transport(_) | ClientError::Timeout(_)
        )
    }

    /// Builds the error for a non-success HTTP status.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 => ClientError::Unauthorized,
            403 => ClientError::Forbidden,
            404 => ClientError::NotFound(message),
            500..=599 => ClientError::Server { status, message },
            _ => ClientError::Http { status, message },
        }
    }
}

impl From<CoreError> for ClientError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(v) => ClientError::Validation(v),
            other => ClientError::Rule(other),
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Decode(err.to_string())
    }
}

impl From<toml::de::Error> for ClientError {
    fn from(err: toml::de::Error) -> Self {
        ClientError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for ClientError {
    fn from(err: toml::ser::Error) -> Self {
        ClientError::Config(err.to_string())
    }
}

impl From<url::ParseError> for ClientError {
    fn from(err: url::ParseError) -> Self {
        ClientError::Config(format!("invalid URL: {err}"))
    }
}

// =============================================================================
// Storage Error
// =============================================================================

/// Preference storage failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    #[error("I/O error on {path}: {message}")]
    Io { path: String, message: String },

    /// The backing file is not a JSON object of strings.
    #[error("Corrupt preference file {path}: {message}")]
    Corrupt { path: String, message: String },
}
