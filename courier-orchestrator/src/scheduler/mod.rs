//! Scheduler layer
//!
//! Waits on the result queue for this job's completion signal,
//! tolerating duplicate and foreign deliveries.

pub mod dedup;
pub mod rendezvous;

pub use dedup::DedupSet;
pub use rendezvous::{Completion, Rendezvous, RendezvousSettings, RendezvousState};
