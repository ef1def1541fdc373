//! Error types shared by every collaborator backend

use thiserror::Error;

/// Result type alias for collaborator operations
pub type Result<T> = std::result::Result<T, BackendError>;

/// Errors reported by blob store, queue and fleet backends
///
/// Backends map their native failures onto this taxonomy so the orchestrator
/// can tell retryable conditions (`NotFound` on a result that is not yet
/// published) from tolerated ones (`AlreadyExists` on bucket creation) and
/// fatal ones (everything else).
#[derive(Debug, Error)]
pub enum BackendError {
    /// Object, queue, message or node does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Resource already exists (bucket, queue, or a guarded blob write)
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Backend refused the request
    #[error("Backend rejected request (status {status}): {message}")]
    Rejected {
        /// Status code reported by the backend
        status: u16,
        /// Error message from the backend
        message: String,
    },

    /// Backend could not be reached
    #[error("Transport failure: {0}")]
    Transport(String),

    /// Backend answered with something we could not interpret
    #[error("Malformed response: {0}")]
    Malformed(String),

    /// Internal error inside the backend implementation
    #[error("Internal error: {0}")]
    Internal(String),
}

impl BackendError {
    /// Check if this error is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Check if this error is an "already exists" error
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists(_))
    }
}
