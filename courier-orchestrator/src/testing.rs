//! Shared fixtures for in-crate tests

use courier_core::memory::{Journal, MemoryBlobStore, MemoryFleet, MemoryQueue};
use courier_core::repository::QueueRef;
use std::sync::Arc;

use crate::context::{Channels, Collaborators};

pub const BUCKET: &str = "courier-jobs";
pub const INTAKE: &str = "local_manager_queue";
pub const RESULTS: &str = "manager_local_queue";

/// In-memory cloud with one journal across all collaborators
pub struct FakeCloud {
    pub journal: Journal,
    pub blobs: MemoryBlobStore,
    pub queue: MemoryQueue,
    pub fleet: MemoryFleet,
}

impl FakeCloud {
    pub fn new() -> Self {
        Self::with_fleet(MemoryFleet::new())
    }

    pub fn with_fleet(fleet: MemoryFleet) -> Self {
        let journal = Journal::new();
        Self {
            blobs: MemoryBlobStore::new().with_journal(journal.clone()),
            queue: MemoryQueue::new().with_journal(journal.clone()),
            fleet: fleet.with_journal(journal.clone()),
            journal,
        }
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators::new(
            Arc::new(self.blobs.clone()),
            Arc::new(self.queue.clone()),
            Arc::new(self.fleet.clone()),
        )
    }

    pub fn channels(&self) -> Channels {
        Channels {
            intake: QueueRef::new(INTAKE),
            results: QueueRef::new(RESULTS),
        }
    }
}
