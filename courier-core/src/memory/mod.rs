//! In-memory collaborators
//!
//! Thread-safe doubles for the blob store, message queue and compute fleet.
//! They behave like the real services where the orchestrator depends on it
//! (at-least-once delivery, guarded writes, idempotent bucket creation) and
//! record every call in a shared [`Journal`] so tests can assert ordering.
//! Not suitable for production.

mod blob;
mod fleet;
mod queue;

pub use blob::MemoryBlobStore;
pub use fleet::MemoryFleet;
pub use queue::MemoryQueue;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::BackendError;

/// One recorded collaborator call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    CreateBucket { bucket: String },
    Put { bucket: String, key: String },
    Get { bucket: String, key: String },
    Copy { src_key: String, dst_key: String },
    DeleteBlob { bucket: String, key: String },
    ResolveQueue { name: String },
    Send { queue: String, body: String },
    Receive {
        queue: String,
        visibility_timeout: Duration,
    },
    DeleteMessage { queue: String, receipt: String },
    Describe,
    Run { tag: String },
    Tag { id: String, key: String, value: String },
    Terminate { id: String },
}

/// Ordered log of calls shared by several doubles
#[derive(Debug, Clone, Default)]
pub struct Journal {
    calls: Arc<Mutex<Vec<Call>>>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, call: Call) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }

    /// Snapshot of every call recorded so far
    pub fn calls(&self) -> Vec<Call> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    /// Number of recorded calls matching `predicate`
    pub fn count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|call| predicate(call)).count()
    }

    /// Index of the first call matching `predicate`
    pub fn position(&self, predicate: impl Fn(&Call) -> bool) -> Option<usize> {
        self.calls().iter().position(predicate)
    }
}

pub(crate) fn poisoned<T>(_: T) -> BackendError {
    BackendError::Internal("lock poisoned".to_string())
}
