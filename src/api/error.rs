//! Error taxonomy for backend calls.
//!
//! The client classifies every failure once; endpoint methods and controllers
//! pass these values along unchanged.

use std::time::Duration;
use thiserror::Error;

/// Result type alias for backend operations.
pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    /// No response within the configured timeout.
    #[error("{method} {path} timed out after {}ms", timeout.as_millis())]
    Timeout {
        method: String,
        path: String,
        timeout: Duration,
    },

    /// No response was received at all (refused, DNS, reset).
    #[error("{method} {path} failed: {message}")]
    Network {
        method: String,
        path: String,
        message: String,
    },

    #[error("{path} was not found (HTTP 404)")]
    NotFound { path: String },

    #[error("server error on {path} (HTTP 500)")]
    Server { path: String },

    /// Any other non-2xx response, status and body untouched.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("failed to decode response from {path}: {message}")]
    Decode { path: String, message: String },

    #[error("invalid client configuration: {0}")]
    Configuration(String),
}

impl ApiError {
    /// HTTP status of the response, when one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::NotFound { .. } => Some(404),
            ApiError::Server { .. } => Some(500),
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ApiError::Timeout { .. })
    }

    /// Sentence suitable for showing to the person at the terminal.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Timeout { .. } => "Request timeout. Please check your connection.".to_string(),
            ApiError::Network { .. } => "Network error. Please check if the server is running.".to_string(),
            ApiError::NotFound { .. } => "The requested resource was not found.".to_string(),
            ApiError::Server { .. } => "Server error. Please try again later.".to_string(),
            ApiError::Http { status, .. } => format!("Request failed with status {}.", status),
            ApiError::Decode { .. } => "Received an unreadable response from the server.".to_string(),
            ApiError::Configuration(message) => format!("Client misconfigured: {}", message),
        }
    }
}
