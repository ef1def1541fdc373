//! Message queue contract

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::error::Result;

/// Backend-specific handle of a resolved queue (name or URL)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueueRef(String);

impl QueueRef {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QueueRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A delivered message together with its acknowledgement token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceivedMessage {
    pub body: String,
    /// Token to pass to [`MessageQueue::delete`]
    pub receipt: String,
}

/// At-least-once queue with explicit delete-acknowledgement
///
/// A message stays on the queue until deleted. Every receive may return a
/// message again, so consumers must be idempotent.
#[async_trait]
pub trait MessageQueue: Send + Sync {
    /// Looks up a queue by name, creating it if it does not exist
    async fn resolve_queue(&self, name: &str) -> Result<QueueRef>;

    /// Sends one message
    async fn send(&self, queue: &QueueRef, body: &str) -> Result<()>;

    /// Receives up to `max_batch` messages
    ///
    /// Delivered messages are hidden from other consumers for
    /// `visibility_timeout`; a zero timeout keeps them visible to everyone.
    /// An empty vector means nothing is outstanding.
    async fn receive(
        &self,
        queue: &QueueRef,
        max_batch: usize,
        visibility_timeout: Duration,
    ) -> Result<Vec<ReceivedMessage>>;

    /// Acknowledges (deletes) a delivered message
    async fn delete(&self, queue: &QueueRef, receipt: &str) -> Result<()>;
}
