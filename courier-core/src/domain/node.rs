//! Compute fleet node model
//!
//! Represents the nodes the compute fleet reports, and the coordinator
//! node the orchestrator looks for among them.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Tag key holding a node's role
pub const ROLE_TAG_KEY: &str = "Name";

/// Lifecycle state of a fleet node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeState {
    Pending,
    Running,
    ShuttingDown,
    Terminated,
    Stopping,
    Stopped,
}

impl NodeState {
    /// Pending or running nodes count as live for discovery
    pub fn is_live(&self) -> bool {
        matches!(self, NodeState::Pending | NodeState::Running)
    }
}

impl std::fmt::Display for NodeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeState::Pending => write!(f, "pending"),
            NodeState::Running => write!(f, "running"),
            NodeState::ShuttingDown => write!(f, "shutting-down"),
            NodeState::Terminated => write!(f, "terminated"),
            NodeState::Stopping => write!(f, "stopping"),
            NodeState::Stopped => write!(f, "stopped"),
        }
    }
}

/// A node as reported by the compute fleet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FleetNode {
    pub id: String,
    pub state: NodeState,
    #[serde(default)]
    pub tags: HashMap<String, String>,
}

impl FleetNode {
    /// Value of the role tag, if present
    pub fn role(&self) -> Option<&str> {
        self.tags.get(ROLE_TAG_KEY).map(String::as_str)
    }
}

/// The remote coordinator process's node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorNode {
    pub id: String,
    pub state: NodeState,
    pub role_tag: String,
}

impl CoordinatorNode {
    /// Interprets a fleet node as a coordinator if it is live and carries `role`
    pub fn from_fleet_node(node: &FleetNode, role: &str) -> Option<Self> {
        if !node.state.is_live() || node.role() != Some(role) {
            return None;
        }
        Some(Self {
            id: node.id.clone(),
            state: node.state,
            role_tag: role.to_string(),
        })
    }
}
