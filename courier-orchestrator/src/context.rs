//! Run context
//!
//! Holds the collaborator handles a run talks to, and the queue handles
//! resolved during initialisation.

use courier_core::repository::{BlobStore, ComputeFleet, MessageQueue, QueueRef};
use std::sync::Arc;

/// Collaborator handles shared by every phase of a run
#[derive(Clone)]
pub struct Collaborators {
    pub blobs: Arc<dyn BlobStore>,
    pub queue: Arc<dyn MessageQueue>,
    pub fleet: Arc<dyn ComputeFleet>,
}

impl Collaborators {
    pub fn new(
        blobs: Arc<dyn BlobStore>,
        queue: Arc<dyn MessageQueue>,
        fleet: Arc<dyn ComputeFleet>,
    ) -> Self {
        Self { blobs, queue, fleet }
    }

    /// Uses one backend that fronts all three collaborators
    pub fn shared<B>(backend: Arc<B>) -> Self
    where
        B: BlobStore + MessageQueue + ComputeFleet + 'static,
    {
        Self {
            blobs: backend.clone(),
            queue: backend.clone(),
            fleet: backend,
        }
    }
}

/// Queue handles resolved at initialisation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channels {
    /// Orchestrator -> coordinator
    pub intake: QueueRef,
    /// Coordinator -> orchestrator
    pub results: QueueRef,
}
