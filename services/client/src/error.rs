//! services/client/src/error.rs
//!
//! Defines the primary error type for the client and the normalizer that turns
//! any of its variants into a message fit for a notification.

use crate::config::ConfigError;
use habit_tracker_core::ports::PortError;
use serde_json::Value;

/// The primary error type for the `client` service.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from one of the core ports.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// Malformed input caught locally, before any network call.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The backend rejected the submitted credentials.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// An authenticated call was rejected with 401 or 403. The HTTP client has
    /// already applied the session side effects by the time a caller sees this.
    #[error("Not authorized (HTTP {status})")]
    Authorization { status: u16 },

    /// The request did not complete within the configured timeout.
    #[error("Request timed out")]
    Timeout,

    /// The request could not be delivered or the connection dropped.
    #[error("Network error: {0}")]
    Network(String),

    /// Any other non-success response. `body` holds the parsed JSON when there was
    /// one, or the raw text as a JSON string.
    #[error("API error: HTTP {status}")]
    Api { status: u16, body: Option<Value> },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ClientError::Timeout
        } else if e.is_decode() {
            ClientError::Internal(format!("Failed to decode response: {}", e))
        } else {
            ClientError::Network(e.to_string())
        }
    }
}

/// A convenience type alias for `Result<T, ClientError>`.
pub type ClientResult<T> = Result<T, ClientError>;

//=========================================================================================
// Error Normalization
//=========================================================================================

pub const FALLBACK_MESSAGE: &str = "Something went wrong. Please try again.";
pub const UNEXPECTED_MESSAGE: &str = "An unexpected error occurred.";
pub const TIMEOUT_MESSAGE: &str =
    "Request took too long. Please check your connection and try again.";
pub const NETWORK_MESSAGE: &str = "Network error. Please check your connection and try again.";
pub const UNAUTHORIZED_MESSAGE: &str = "You are not authorized to perform this action.";
pub const VALIDATION_FAILED_MESSAGE: &str = "Validation failed.";

/// Turns an error into a human-readable, non-empty message.
///
/// `None` stands for "an error with no information at all".
pub fn error_message(error: Option<&ClientError>) -> String {
    let message = match error {
        None => FALLBACK_MESSAGE.to_string(),
        Some(ClientError::Timeout) => TIMEOUT_MESSAGE.to_string(),
        Some(ClientError::Network(_)) => NETWORK_MESSAGE.to_string(),
        Some(ClientError::Authorization { .. }) => UNAUTHORIZED_MESSAGE.to_string(),
        Some(ClientError::Api { status, body }) => body_message(*status, body.as_ref()),
        Some(ClientError::Validation(msg)) | Some(ClientError::Authentication(msg)) => {
            msg.trim().to_string()
        }
        Some(_) => UNEXPECTED_MESSAGE.to_string(),
    };

    if message.is_empty() {
        UNEXPECTED_MESSAGE.to_string()
    } else {
        message
    }
}

/// Reads the message out of an error response body.
///
/// Order: a plain string body, then the `error`, `message` and `title` strings, then
/// a field map under `errors`, then a list under `errors`.
pub fn body_message(status: u16, body: Option<&Value>) -> String {
    let server_error = || format!("Server error: {}", status);

    let object = match body {
        Some(Value::String(text)) if !text.trim().is_empty() => return text.trim().to_string(),
        Some(Value::Object(object)) => object,
        _ => return server_error(),
    };

    for key in ["error", "message", "title"] {
        if let Some(text) = object.get(key).and_then(Value::as_str) {
            if !text.trim().is_empty() {
                return text.trim().to_string();
            }
        }
    }

    match object.get("errors") {
        Some(Value::Object(fields)) => {
            let parts: Vec<String> = fields
                .values()
                .map(|messages| match messages {
                    Value::Array(items) => items
                        .iter()
                        .map(value_text)
                        .filter(|s| !s.is_empty())
                        .collect::<Vec<_>>()
                        .join(" "),
                    other => value_text(other),
                })
                .filter(|s| !s.is_empty())
                .collect();
            if parts.is_empty() {
                VALIDATION_FAILED_MESSAGE.to_string()
            } else {
                parts.join(". ")
            }
        }
        Some(Value::Array(items)) => {
            let parts: Vec<&str> = items
                .iter()
                .filter_map(|item| {
                    item.get("description")
                        .or_else(|| item.get("errorMessage"))
                        .and_then(Value::as_str)
                })
                .collect();
            if parts.is_empty() {
                VALIDATION_FAILED_MESSAGE.to_string()
            } else {
                parts.join(". ")
            }
        }
        _ => server_error(),
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
