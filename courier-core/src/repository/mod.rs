//! Collaborator layer
//!
//! The orchestrator talks to three external collaborators: a blob store,
//! a message queue and a compute fleet. Each is described by a trait so the
//! orchestrator can be driven by the gateway client in production and by the
//! in-memory doubles in tests.

mod blob;
mod fleet;
mod queue;

pub use blob::{BlobStore, PutOptions, WritePrecondition};
pub use fleet::{ComputeFleet, LaunchRequest};
pub use queue::{MessageQueue, QueueRef, ReceivedMessage};
