//! In-memory compute fleet

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use super::{Call, Journal, poisoned};
use crate::domain::node::{FleetNode, NodeState, ROLE_TAG_KEY};
use crate::error::{BackendError, Result};
use crate::repository::{ComputeFleet, LaunchRequest};

#[derive(Debug, Default)]
struct State {
    nodes: Vec<FleetNode>,
    payloads: HashMap<String, String>,
    next_id: u64,
}

/// In-memory compute fleet for testing
///
/// Launched nodes start `Pending` and never progress on their own.
#[derive(Debug, Clone, Default)]
pub struct MemoryFleet {
    state: Arc<Mutex<State>>,
    journal: Journal,
    fail_launches: Arc<AtomicBool>,
}

impl MemoryFleet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records calls into a shared journal
    pub fn with_journal(mut self, journal: Journal) -> Self {
        self.journal = journal;
        self
    }

    /// Seeds a node without recording a call
    pub fn with_node(self, node: FleetNode) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state.nodes.push(node);
        }
        self
    }

    /// Makes every subsequent launch fail
    pub fn fail_launches(&self, fail: bool) {
        self.fail_launches.store(fail, Ordering::SeqCst);
    }

    /// Snapshot of a node by id
    pub fn node(&self, id: &str) -> Option<FleetNode> {
        let state = self.state.lock().ok()?;
        state.nodes.iter().find(|n| n.id == id).cloned()
    }

    /// Boot payload a node was launched with
    pub fn payload(&self, id: &str) -> Option<String> {
        let state = self.state.lock().ok()?;
        state.payloads.get(id).cloned()
    }

    pub fn journal(&self) -> &Journal {
        &self.journal
    }
}

#[async_trait]
impl ComputeFleet for MemoryFleet {
    async fn describe(&self) -> Result<Vec<FleetNode>> {
        self.journal.record(Call::Describe);
        Ok(self.state.lock().map_err(poisoned)?.nodes.clone())
    }

    async fn run(&self, request: LaunchRequest) -> Result<String> {
        self.journal.record(Call::Run {
            tag: request.tag.clone(),
        });
        if self.fail_launches.load(Ordering::SeqCst) {
            return Err(BackendError::Rejected {
                status: 400,
                message: "launch quota exceeded".to_string(),
            });
        }

        let mut state = self.state.lock().map_err(poisoned)?;
        state.next_id += 1;
        let id = format!("node-{:04}", state.next_id);

        let mut tags = HashMap::new();
        tags.insert(ROLE_TAG_KEY.to_string(), request.tag);
        state.nodes.push(FleetNode {
            id: id.clone(),
            state: NodeState::Pending,
            tags,
        });
        state.payloads.insert(id.clone(), request.payload);
        Ok(id)
    }

    async fn tag(&self, id: &str, key: &str, value: &str) -> Result<()> {
        self.journal.record(Call::Tag {
            id: id.to_string(),
            key: key.to_string(),
            value: value.to_string(),
        });
        let mut state = self.state.lock().map_err(poisoned)?;
        let node = state
            .nodes
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or_else(|| BackendError::NotFound(format!("node {}", id)))?;
        node.tags.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn terminate(&self, id: &str) -> Result<()> {
        self.journal.record(Call::Terminate { id: id.to_string() });
        let mut state = self.state.lock().map_err(poisoned)?;
        let node = state
            .nodes
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or_else(|| BackendError::NotFound(format!("node {}", id)))?;
        node.state = NodeState::Terminated;
        Ok(())
    }
}
