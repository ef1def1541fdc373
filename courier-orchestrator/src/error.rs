//! Orchestrator error types
//!
//! Every fatal error carries the phase it happened in and, once a job
//! exists, its correlation key, so the operator can tell where a run stopped.

use courier_core::BackendError;
use courier_core::domain::CorrelationKey;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for orchestrator operations
pub type Result<T> = std::result::Result<T, OrchestratorError>;

/// Phase of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Init,
    Discovery,
    Bootstrap,
    Submit,
    Rendezvous,
    Retrieve,
    Render,
    Terminate,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Init => write!(f, "init"),
            Phase::Discovery => write!(f, "discovery"),
            Phase::Bootstrap => write!(f, "bootstrap"),
            Phase::Submit => write!(f, "submit"),
            Phase::Rendezvous => write!(f, "rendezvous"),
            Phase::Retrieve => write!(f, "retrieve"),
            Phase::Render => write!(f, "render"),
            Phase::Terminate => write!(f, "terminate"),
        }
    }
}

/// Fatal errors of a run
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// The requested input does not exist or is not a file
    #[error("Input not found: {}", .0.display())]
    InputNotFound(PathBuf),

    /// No coordinator was running and none could be launched
    #[error("Coordinator launch failed: {0}")]
    LaunchFailed(#[source] BackendError),

    /// A collaborator call failed
    #[error("{phase} failed{}: {source}", job_suffix(.key))]
    Backend {
        phase: Phase,
        key: Option<CorrelationKey>,
        #[source]
        source: BackendError,
    },

    /// A bounded wait ran out
    #[error("{phase} timed out after {waited:?}{}", job_suffix(.key))]
    Timeout {
        phase: Phase,
        key: Option<CorrelationKey>,
        waited: Duration,
    },

    /// Every drawn correlation key was already taken
    #[error("No free correlation key after {attempts} attempts")]
    KeyCollision { attempts: u32 },

    /// Local file access failed
    #[error("{phase} failed on {}: {source}", path.display())]
    Io {
        phase: Phase,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration is invalid
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl OrchestratorError {
    /// Wrap a collaborator failure with phase and job context
    pub fn backend(phase: Phase, key: Option<&CorrelationKey>, source: BackendError) -> Self {
        Self::Backend {
            phase,
            key: key.cloned(),
            source,
        }
    }

    pub fn io(phase: Phase, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            phase,
            path: path.into(),
            source,
        }
    }

    /// Phase the error happened in
    pub fn phase(&self) -> Option<Phase> {
        match self {
            Self::InputNotFound(_) | Self::KeyCollision { .. } => Some(Phase::Submit),
            Self::LaunchFailed(_) => Some(Phase::Bootstrap),
            Self::Backend { phase, .. } | Self::Timeout { phase, .. } | Self::Io { phase, .. } => {
                Some(*phase)
            }
            Self::Config(_) => None,
        }
    }
}

fn job_suffix(key: &Option<CorrelationKey>) -> String {
    match key {
        Some(key) => format!(" for job {}", key),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_error_mentions_phase_and_key() {
        let key = CorrelationKey::parse("42").unwrap();
        let err = OrchestratorError::backend(
            Phase::Retrieve,
            Some(&key),
            BackendError::NotFound("courier-jobs/42".to_string()),
        );
        let message = err.to_string();
        assert!(message.starts_with("retrieve failed for job 42"));
        assert_eq!(err.phase(), Some(Phase::Retrieve));
    }

    #[test]
    fn test_timeout_without_key() {
        let err = OrchestratorError::Timeout {
            phase: Phase::Rendezvous,
            key: None,
            waited: Duration::from_secs(5),
        };
        assert_eq!(err.to_string(), "rendezvous timed out after 5s");
    }

    #[test]
    fn test_phase_of_submit_errors() {
        let err = OrchestratorError::InputNotFound(PathBuf::from("missing.txt"));
        assert_eq!(err.phase(), Some(Phase::Submit));
        assert_eq!(err.to_string(), "Input not found: missing.txt");
    }
}
