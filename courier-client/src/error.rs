//! Error types for the Courier gateway client

use courier_core::BackendError;
use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur when using the gateway client
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// API returned an error status code
    #[error("API error (status {status}): {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error message from the API
        message: String,
    },

    /// Failed to parse response
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Invalid request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ClientError {
    /// Create an API error from status code and message
    pub fn api_error(status: u16, message: impl Into<String>) -> Self {
        Self::ApiError {
            status,
            message: message.into(),
        }
    }

    /// Check if this error is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ApiError { status: 404, .. })
    }

    /// Check if this error reports an existing resource (conflict or failed precondition)
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::ApiError { status: 409 | 412, .. })
    }

    /// Check if this error is a client error (4xx status)
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::ApiError { status, .. } if *status >= 400 && *status < 500)
    }

    /// Check if this error is a server error (5xx status)
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::ApiError { status, .. } if *status >= 500)
    }
}

impl From<ClientError> for BackendError {
    fn from(err: ClientError) -> Self {
        if err.is_not_found() {
            return BackendError::NotFound(err.to_string());
        }
        if err.is_conflict() {
            return BackendError::AlreadyExists(err.to_string());
        }
        match err {
            ClientError::RequestFailed(e) => BackendError::Transport(e.to_string()),
            ClientError::ApiError { status, message } => BackendError::Rejected { status, message },
            ClientError::ParseError(msg) => BackendError::Malformed(msg),
            ClientError::InvalidRequest(msg) => BackendError::Internal(msg),
        }
    }
}
