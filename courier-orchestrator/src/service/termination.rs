//! Termination handler
//!
//! Used only when the job was submitted with the terminate flag. The
//! coordinator publishes `<key>|STATS` once it has shut its workers down;
//! the handler collects that report, stores it locally, and reclaims the
//! coordinator node.

use bytes::{Bytes, BytesMut};
use courier_core::domain::CorrelationKey;
use courier_core::repository::{BlobStore, ComputeFleet};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::Config;
use crate::context::Collaborators;
use crate::error::{OrchestratorError, Phase, Result};
use crate::retry::{Backoff, Deadline};

pub struct TerminationHandler {
    blobs: Arc<dyn BlobStore>,
    fleet: Arc<dyn ComputeFleet>,
    bucket: String,
    stats_timeout: Duration,
}

impl TerminationHandler {
    pub fn new(collaborators: &Collaborators, config: &Config) -> Self {
        Self {
            blobs: collaborators.blobs.clone(),
            fleet: collaborators.fleet.clone(),
            bucket: config.bucket.clone(),
            stats_timeout: config.stats_timeout,
        }
    }

    /// Waits for the stats blob, reads it and deletes it
    ///
    /// Every failed read is retried until `stats_timeout` runs out.
    pub async fn collect_stats(&self, key: &CorrelationKey) -> Result<Bytes> {
        let stats_key = key.stats_key();
        let deadline = Deadline::new(Some(self.stats_timeout));
        let mut backoff = Backoff::default();

        let data = loop {
            match self.blobs.get(&self.bucket, &stats_key).await {
                Ok(data) => break data,
                Err(e) => {
                    if !e.is_not_found() {
                        warn!("Reading stats for job {} failed, retrying: {}", key, e);
                    }
                    let Some(remaining) = deadline.remaining().filter(|r| !r.is_zero()) else {
                        return Err(OrchestratorError::Timeout {
                            phase: Phase::Terminate,
                            key: Some(key.clone()),
                            waited: deadline.elapsed(),
                        });
                    };
                    tokio::time::sleep(backoff.next_delay().min(remaining)).await;
                }
            }
        };

        if let Err(e) = self.blobs.delete(&self.bucket, &stats_key).await {
            warn!("Could not delete stats blob {}: {}", stats_key, e);
        }

        info!("Collected stats for job {} ({} bytes)", key, data.len());
        Ok(data)
    }

    /// Terminates the coordinator node
    pub async fn terminate(&self, key: &CorrelationKey, node_id: &str) -> Result<()> {
        self.fleet
            .terminate(node_id)
            .await
            .map_err(|e| OrchestratorError::backend(Phase::Terminate, Some(key), e))?;
        info!("Terminated coordinator {}", node_id);
        Ok(())
    }
}

/// Writes the stats report, newline-terminated
pub async fn write_stats(path: &Path, data: &[u8]) -> Result<()> {
    let mut contents = BytesMut::from(data);
    if !contents.is_empty() && !contents.ends_with(b"\n") {
        contents.extend_from_slice(b"\n");
    }
    tokio::fs::write(path, &contents)
        .await
        .map_err(|e| OrchestratorError::io(Phase::Terminate, path, e))
}
