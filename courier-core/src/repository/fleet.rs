//! Compute fleet contract

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::node::FleetNode;
use crate::error::Result;

/// Request to boot one node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchRequest {
    /// Script the node runs on first boot
    pub payload: String,
    /// Role tag the node should carry
    pub tag: String,
}

/// Lists, launches, tags and terminates remote compute nodes
#[async_trait]
pub trait ComputeFleet: Send + Sync {
    /// Lists every node visible to this account
    async fn describe(&self) -> Result<Vec<FleetNode>>;

    /// Launches one node and returns its id once the request is accepted
    ///
    /// The node is usually still pending when this returns.
    async fn run(&self, request: LaunchRequest) -> Result<String>;

    /// Sets a tag on a node
    async fn tag(&self, id: &str, key: &str, value: &str) -> Result<()>;

    /// Terminates a node
    async fn terminate(&self, id: &str) -> Result<()>;
}
