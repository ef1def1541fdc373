//! Job submitter
//!
//! Uploads the input under a fresh correlation key and announces it on the
//! intake queue. The announcement is sent only after the blob write returned,
//! so no consumer can see the key before its input is durable.

use bytes::Bytes;
use courier_core::domain::{CorrelationKey, Job};
use courier_core::repository::{BlobStore, MessageQueue, PutOptions, QueueRef};
use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::Config;
use crate::context::{Channels, Collaborators};
use crate::error::{OrchestratorError, Phase, Result};

/// Key draws before a submit gives up on collisions
pub const MAX_KEY_ATTEMPTS: u32 = 3;

/// Produces candidate correlation keys
pub type KeySource = Arc<dyn Fn() -> CorrelationKey + Send + Sync>;

pub struct Submitter {
    blobs: Arc<dyn BlobStore>,
    queue: Arc<dyn MessageQueue>,
    bucket: String,
    intake: QueueRef,
    keys: KeySource,
}

impl Submitter {
    pub fn new(collaborators: &Collaborators, channels: &Channels, config: &Config) -> Self {
        Self {
            blobs: collaborators.blobs.clone(),
            queue: collaborators.queue.clone(),
            bucket: config.bucket.clone(),
            intake: channels.intake.clone(),
            keys: Arc::new(CorrelationKey::generate),
        }
    }

    /// Replaces the random key generator
    pub fn with_key_source(mut self, keys: KeySource) -> Self {
        self.keys = keys;
        self
    }

    /// Uploads `input` and announces the job
    ///
    /// Fails with `InputNotFound` before touching the store if `input` is
    /// missing or not a regular file.
    pub async fn submit(&self, input: &Path, terminate: bool) -> Result<Job> {
        let data = read_input(input).await?;
        let size = data.len();
        let key = self.upload(data).await?;

        let job = Job::new(key, input.to_path_buf(), terminate);
        let body = job.submit_message().to_string();
        self.queue
            .send(&self.intake, &body)
            .await
            .map_err(|e| OrchestratorError::backend(Phase::Submit, Some(&job.key), e))?;

        info!(
            "Submitted job {} ({} bytes from {}, terminate: {})",
            job.key,
            size,
            input.display(),
            terminate
        );
        Ok(job)
    }

    /// Writes the input under a key nobody holds yet
    async fn upload(&self, data: Bytes) -> Result<CorrelationKey> {
        for attempt in 1..=MAX_KEY_ATTEMPTS {
            let key = (self.keys)();
            match self
                .blobs
                .put(&self.bucket, key.as_str(), data.clone(), PutOptions::create_only())
                .await
            {
                Ok(()) => return Ok(key),
                Err(e) if e.is_already_exists() => {
                    warn!(
                        "Correlation key {} is taken (attempt {}/{})",
                        key, attempt, MAX_KEY_ATTEMPTS
                    );
                }
                Err(e) => return Err(OrchestratorError::backend(Phase::Submit, Some(&key), e)),
            }
        }
        Err(OrchestratorError::KeyCollision {
            attempts: MAX_KEY_ATTEMPTS,
        })
    }
}

async fn read_input(input: &Path) -> Result<Bytes> {
    match tokio::fs::metadata(input).await {
        Ok(meta) if meta.is_file() => {}
        Ok(_) => return Err(OrchestratorError::InputNotFound(input.to_path_buf())),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(OrchestratorError::InputNotFound(input.to_path_buf()));
        }
        Err(e) => return Err(OrchestratorError::io(Phase::Submit, input, e)),
    }

    tokio::fs::read(input)
        .await
        .map(Bytes::from)
        .map_err(|e| OrchestratorError::io(Phase::Submit, input, e))
}
