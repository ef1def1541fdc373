//! Courier Orchestrator
//!
//! Drives one data-processing job through the remote pipeline:
//!
//! 1. Discovery/Bootstrap: find the live coordinator node or launch one
//! 2. Submit: upload the input blob, then announce it on the intake queue
//! 3. Rendezvous: poll the result queue until this job's completion arrives
//! 4. Retrieve: read the summary blob, archive it, delete the original
//! 5. Render: turn summary records into an HTML document
//! 6. Terminate (optional): collect run statistics and reclaim the coordinator
//!
//! Collaborators (blob store, queues, fleet) are injected through
//! [`context::Collaborators`], so every phase can run against in-memory doubles.

pub mod config;
pub mod context;
pub mod error;
pub mod orchestrator;
pub mod render;
pub mod retry;
pub mod scheduler;
pub mod service;

#[cfg(test)]
pub(crate) mod testing;

pub use config::Config;
pub use context::{Channels, Collaborators};
pub use error::{OrchestratorError, Phase, Result};
pub use orchestrator::{Orchestrator, RunReport, RunRequest};
