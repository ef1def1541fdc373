//! Coordinator discovery and bootstrap
//!
//! Finds the live coordinator node, or launches one when none exists.
//! A launch returns as soon as the fleet accepts the request; the node's
//! warm-up is absorbed by the rendezvous wait.

use bytes::Bytes;
use courier_core::domain::{CoordinatorNode, ROLE_TAG_KEY};
use courier_core::repository::{BlobStore, ComputeFleet, LaunchRequest, PutOptions};
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::context::Collaborators;
use crate::error::{OrchestratorError, Phase, Result};

/// Launch artifacts the coordinator fetches on boot
const ARTIFACTS: [&str; 2] = ["worker.enc", "manager.enc"];

/// Environment variable carrying the tasks-per-worker ratio into the boot script
pub const TASKS_PER_WORKER_VAR: &str = "COURIER_TASKS_PER_WORKER";

/// Coordinator the run talks to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Located {
    pub id: String,
    /// The node was launched by this run
    pub launched: bool,
}

/// Discovers or launches the coordinator node
pub struct CoordinatorService {
    blobs: Arc<dyn BlobStore>,
    fleet: Arc<dyn ComputeFleet>,
    bucket: String,
    role: String,
    artifact_dir: PathBuf,
    bootstrap_script: PathBuf,
    tasks_per_worker: u32,
}

impl CoordinatorService {
    pub fn new(collaborators: &Collaborators, config: &Config) -> Self {
        Self {
            blobs: collaborators.blobs.clone(),
            fleet: collaborators.fleet.clone(),
            bucket: config.bucket.clone(),
            role: config.coordinator_tag.clone(),
            artifact_dir: config.artifact_dir.clone(),
            bootstrap_script: config.bootstrap_script.clone(),
            tasks_per_worker: config.tasks_per_worker,
        }
    }

    /// Returns the first pending or running node carrying the coordinator role
    ///
    /// At most one coordinator is assumed to exist; extra matches are ignored.
    pub async fn discover(&self) -> Result<Option<CoordinatorNode>> {
        let nodes = self
            .fleet
            .describe()
            .await
            .map_err(|e| OrchestratorError::backend(Phase::Discovery, None, e))?;

        let found = nodes
            .iter()
            .find_map(|node| CoordinatorNode::from_fleet_node(node, &self.role));

        match &found {
            Some(node) => info!("Found coordinator {} ({})", node.id, node.state),
            None => info!("No live coordinator among {} nodes", nodes.len()),
        }
        Ok(found)
    }

    /// Publishes the launch artifacts and launches a new coordinator
    pub async fn bootstrap(&self) -> Result<String> {
        self.publish_artifacts().await?;

        let script = tokio::fs::read_to_string(&self.bootstrap_script)
            .await
            .map_err(|e| OrchestratorError::io(Phase::Bootstrap, &self.bootstrap_script, e))?;

        let request = LaunchRequest {
            payload: build_payload(&script, self.tasks_per_worker),
            tag: self.role.clone(),
        };
        let id = self
            .fleet
            .run(request)
            .await
            .map_err(OrchestratorError::LaunchFailed)?;

        if let Err(e) = self.fleet.tag(&id, ROLE_TAG_KEY, &self.role).await {
            warn!("Failed to tag coordinator {}: {}", id, e);
        }

        info!("Launched coordinator {}", id);
        Ok(id)
    }

    /// Discovers the coordinator, launching one if needed
    pub async fn locate(&self) -> Result<Located> {
        if let Some(node) = self.discover().await? {
            return Ok(Located {
                id: node.id,
                launched: false,
            });
        }
        Ok(Located {
            id: self.bootstrap().await?,
            launched: true,
        })
    }

    async fn publish_artifacts(&self) -> Result<()> {
        for name in ARTIFACTS {
            let path = self.artifact_dir.join(name);
            let data = match tokio::fs::read(&path).await {
                Ok(data) => data,
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    warn!("Launch artifact {} is missing, skipping upload", path.display());
                    continue;
                }
                Err(e) => return Err(OrchestratorError::io(Phase::Bootstrap, path, e)),
            };

            self.blobs
                .put(&self.bucket, name, Bytes::from(data), PutOptions::public_read())
                .await
                .map_err(|e| OrchestratorError::backend(Phase::Bootstrap, None, e))?;
            debug!("Published {} to {}", name, self.bucket);
        }
        Ok(())
    }
}

/// Injects the tasks-per-worker export right after the shebang line
pub fn build_payload(script: &str, tasks_per_worker: u32) -> String {
    let export = format!("export {}={}\n", TASKS_PER_WORKER_VAR, tasks_per_worker);

    if !script.starts_with("#!") {
        return format!("{}{}", export, script);
    }
    match script.split_once('\n') {
        Some((shebang, rest)) => format!("{}\n{}{}", shebang, export, rest),
        None => format!("{}\n{}", script, export),
    }
}
