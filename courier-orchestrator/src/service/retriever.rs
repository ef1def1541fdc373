//! Result retrieval and cleanup
//!
//! After a completion signal the summary blob is read, copied into the
//! archive namespace, and then deleted. The steps are not transactional:
//! a crash between copy and delete leaves a duplicate archive entry, never
//! a lost summary.

use bytes::Bytes;
use courier_core::domain::CorrelationKey;
use courier_core::repository::BlobStore;
use std::borrow::Cow;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::context::Collaborators;
use crate::error::{OrchestratorError, Phase, Result};
use crate::retry::Backoff;

pub struct Retriever {
    blobs: Arc<dyn BlobStore>,
    bucket: String,
    archive_prefix: String,
    fetch_attempts: u32,
    backoff: Backoff,
}

impl Retriever {
    pub fn new(collaborators: &Collaborators, config: &Config) -> Self {
        Self {
            blobs: collaborators.blobs.clone(),
            bucket: config.bucket.clone(),
            archive_prefix: config.archive_prefix.clone(),
            fetch_attempts: config.fetch_attempts.max(1),
            backoff: Backoff::default(),
        }
    }

    /// Reads the summary blob, retrying failed reads up to `fetch_attempts` times
    pub async fn fetch(&self, key: &CorrelationKey) -> Result<Bytes> {
        let mut backoff = self.backoff.clone();
        let mut attempt = 1;

        loop {
            match self.blobs.get(&self.bucket, key.as_str()).await {
                Ok(data) => {
                    debug!("Fetched summary {} ({} bytes)", key, data.len());
                    return Ok(data);
                }
                Err(e) if attempt < self.fetch_attempts => {
                    let delay = backoff.next_delay();
                    if e.is_not_found() {
                        warn!(
                            "Summary {} not published yet (attempt {}/{}), retrying in {:?}",
                            key, attempt, self.fetch_attempts, delay
                        );
                    } else {
                        warn!(
                            "Reading summary {} failed (attempt {}/{}), retrying in {:?}: {}",
                            key, attempt, self.fetch_attempts, delay, e
                        );
                    }
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(OrchestratorError::backend(Phase::Retrieve, Some(key), e)),
            }
        }
    }

    /// Copies the summary into the archive, then deletes the original
    ///
    /// Returns the archive key. A failed delete leaves the original behind
    /// and is only logged.
    pub async fn archive(&self, key: &CorrelationKey) -> Result<String> {
        let archive_key = key.archive_key(&self.archive_prefix);
        self.blobs
            .copy(&self.bucket, key.as_str(), &self.bucket, &archive_key)
            .await
            .map_err(|e| OrchestratorError::backend(Phase::Retrieve, Some(key), e))?;

        if let Err(e) = self.blobs.delete(&self.bucket, key.as_str()).await {
            warn!("Archived {} but could not delete the original: {}", key, e);
        }

        debug!("Archived summary {} as {}", key, archive_key);
        Ok(archive_key)
    }

    /// Fetches and archives the summary, returning its lines
    pub async fn retrieve(&self, key: &CorrelationKey) -> Result<Vec<String>> {
        let data = self.fetch(key).await?;
        self.archive(key).await?;

        let text = String::from_utf8_lossy(&data);
        if let Cow::Owned(_) = text {
            warn!("Summary {} is not valid UTF-8; invalid bytes were replaced", key);
        }

        let lines: Vec<String> = text
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(str::to_string)
            .collect();

        info!("Retrieved {} summary lines for job {}", lines.len(), key);
        Ok(lines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{BUCKET, FakeCloud};
    use courier_core::memory::Call;
    use std::time::Duration;

    fn key(raw: &str) -> CorrelationKey {
        CorrelationKey::parse(raw).unwrap()
    }

    fn gets(cloud: &FakeCloud) -> usize {
        cloud.journal.count(|c| matches!(c, Call::Get { .. }))
    }

    #[tokio::test]
    async fn test_archive_round_trip() {
        let cloud = FakeCloud::new();
        let summary = "42|5|[Rust]|great\n42|1|[]|awful\n";
        cloud.blobs.insert(BUCKET, "42", summary);
        let retriever = Retriever::new(&cloud.collaborators(), &Config::default());

        let lines = retriever.retrieve(&key("42")).await.unwrap();
        assert_eq!(lines, vec!["42|5|[Rust]|great", "42|1|[]|awful"]);

        let archived = cloud
            .blobs
            .get(BUCKET, "ZZZ_oldSummaries/42")
            .await
            .unwrap();
        assert_eq!(archived, Bytes::from_static(summary.as_bytes()));
        assert!(cloud.blobs.get(BUCKET, "42").await.unwrap_err().is_not_found());

        let copy = cloud.journal.position(|c| matches!(c, Call::Copy { .. })).unwrap();
        let delete = cloud
            .journal
            .position(|c| matches!(c, Call::DeleteBlob { .. }))
            .unwrap();
        assert!(copy < delete);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_waits_for_late_summary() {
        let cloud = FakeCloud::new();
        let blobs = cloud.blobs.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(1200)).await;
            blobs.insert(BUCKET, "42", "42|3|[]|late");
        });
        let retriever = Retriever::new(&cloud.collaborators(), &Config::default());

        let data = retriever.fetch(&key("42")).await.unwrap();

        assert_eq!(data, Bytes::from_static(b"42|3|[]|late"));
        // Attempts at t = 0, 0.5 and 1.5 seconds.
        assert_eq!(gets(&cloud), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_gives_up_after_attempts() {
        let cloud = FakeCloud::new();
        let config = Config {
            fetch_attempts: 3,
            ..Config::default()
        };
        let retriever = Retriever::new(&cloud.collaborators(), &config);

        let err = retriever.fetch(&key("42")).await.unwrap_err();

        assert_eq!(err.phase(), Some(Phase::Retrieve));
        assert!(matches!(
            err,
            OrchestratorError::Backend { ref source, .. } if source.is_not_found()
        ));
        assert_eq!(gets(&cloud), 3);
    }

    #[tokio::test]
    async fn test_archive_of_missing_summary_fails() {
        let cloud = FakeCloud::new();
        let retriever = Retriever::new(&cloud.collaborators(), &Config::default());

        assert!(retriever.archive(&key("42")).await.is_err());
        assert_eq!(cloud.journal.count(|c| matches!(c, Call::DeleteBlob { .. })), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_retries_failed_read() {
        let cloud = FakeCloud::new();
        cloud.blobs.insert(BUCKET, "42", "42|4|[]|fine");
        cloud.blobs.fail_gets(1);
        let retriever = Retriever::new(&cloud.collaborators(), &Config::default());

        let data = retriever.fetch(&key("42")).await.unwrap();

        assert_eq!(data, Bytes::from_static(b"42|4|[]|fine"));
        assert_eq!(gets(&cloud), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_persistent_failure_surfaces_after_attempts() {
        let cloud = FakeCloud::new();
        cloud.blobs.insert(BUCKET, "42", "42|4|[]|fine");
        cloud.blobs.fail_gets(10);
        let config = Config {
            fetch_attempts: 2,
            ..Config::default()
        };
        let retriever = Retriever::new(&cloud.collaborators(), &config);

        let err = retriever.fetch(&key("42")).await.unwrap_err();

        assert!(matches!(
            err,
            OrchestratorError::Backend {
                source: courier_core::BackendError::Rejected { status: 503, .. },
                ..
            }
        ));
        assert_eq!(gets(&cloud), 2);
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_replaced() {
        let cloud = FakeCloud::new();
        cloud
            .blobs
            .insert(BUCKET, "42", Bytes::from_static(b"42|3|[]|caf\xff\n"));
        let retriever = Retriever::new(&cloud.collaborators(), &Config::default());

        let lines = retriever.retrieve(&key("42")).await.unwrap();
        assert_eq!(lines, vec!["42|3|[]|caf\u{fffd}"]);
    }
}
