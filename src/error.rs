//! Domain-specific error types for readmission-client

use thiserror::Error;

/// Main error type for the readmission client
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Request could not be sent or no response was received.
    #[error("Transport failure: {message}")]
    TransportFailure { message: String },

    /// Response received but not the expected structured payload.
    #[error("Malformed response: {message}")]
    MalformedResponse { message: String },

    #[error("Invalid form field: {message}")]
    InvalidField { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl ClientError {
    /// Diagnostic class of this error when it ends a submission attempt.
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            ClientError::TransportFailure { .. } => FailureKind::Transport,
            ClientError::MalformedResponse { .. } => FailureKind::MalformedResponse,
            _ => FailureKind::Internal,
        }
    }
}

/// Diagnostic classification of a failed attempt. Every kind renders the
/// same notice to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Transport,
    MalformedResponse,
    /// Request body could not be built.
    Internal,
    /// The attempt task ended without producing a result (cancelled runtime
    /// or panic inside the view).
    Aborted,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::Transport => f.write_str("transport"),
            FailureKind::MalformedResponse => f.write_str("malformed_response"),
            FailureKind::Internal => f.write_str("internal"),
            FailureKind::Aborted => f.write_str("aborted"),
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::TransportFailure {
            message: format!("HTTP request failed: {}", err),
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::MalformedResponse {
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for ClientError {
    fn from(err: toml::de::Error) -> Self {
        ClientError::Config {
            message: err.to_string(),
        }
    }
}

impl From<serde_urlencoded::ser::Error> for ClientError {
    fn from(err: serde_urlencoded::ser::Error) -> Self {
        ClientError::Internal {
            message: format!("Form encoding failed: {}", err),
        }
    }
}

/// Result type alias for readmission client operations
pub type Result<T> = std::result::Result<T, ClientError>;
