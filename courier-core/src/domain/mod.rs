//! Core domain types
//!
//! This module contains the domain structures shared between the
//! orchestrator (which drives a job) and the collaborator backends
//! (which persist blobs, carry messages and run nodes).

pub mod job;
pub mod node;
pub mod summary;

pub use job::{CorrelationKey, Job};
pub use node::{CoordinatorNode, FleetNode, NodeState, ROLE_TAG_KEY};
pub use summary::SummaryRecord;
