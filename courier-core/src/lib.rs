//! Courier Core
//!
//! Core types and abstractions for the Courier job relay.
//!
//! This crate contains:
//! - Domain types: jobs, correlation keys, fleet nodes, summary records
//! - The queue wire codec shared with the remote coordinator
//! - Collaborator traits for blob storage, message queues and the compute fleet
//! - In-memory collaborators used as test doubles

pub mod domain;
pub mod error;
pub mod memory;
pub mod message;
pub mod repository;

pub use error::{BackendError, Result};
pub use message::{Message, MessageError};
