//! In-memory blob store

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::{Call, Journal, poisoned};
use crate::error::{BackendError, Result};
use crate::repository::{BlobStore, PutOptions, WritePrecondition};

#[derive(Debug, Default)]
struct State {
    buckets: HashSet<String>,
    objects: HashMap<(String, String), StoredObject>,
}

#[derive(Debug, Clone)]
struct StoredObject {
    data: Bytes,
    public_read: bool,
}

/// In-memory blob store for testing
///
/// Writes to a bucket that was never created are accepted.
#[derive(Debug, Clone, Default)]
pub struct MemoryBlobStore {
    state: Arc<Mutex<State>>,
    journal: Journal,
    failing_gets: Arc<AtomicUsize>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records calls into a shared journal
    pub fn with_journal(mut self, journal: Journal) -> Self {
        self.journal = journal;
        self
    }

    /// Seeds an object without recording a call
    pub fn insert(&self, bucket: &str, key: &str, data: impl Into<Bytes>) {
        if let Ok(mut state) = self.state.lock() {
            state.objects.insert(
                (bucket.to_string(), key.to_string()),
                StoredObject {
                    data: data.into(),
                    public_read: false,
                },
            );
        }
    }

    /// Reads an object without recording a call
    pub fn object(&self, bucket: &str, key: &str) -> Option<Bytes> {
        let state = self.state.lock().ok()?;
        state
            .objects
            .get(&(bucket.to_string(), key.to_string()))
            .map(|o| o.data.clone())
    }

    /// Whether an object was written public-readable
    pub fn is_public(&self, bucket: &str, key: &str) -> bool {
        self.state
            .lock()
            .ok()
            .and_then(|state| {
                state
                    .objects
                    .get(&(bucket.to_string(), key.to_string()))
                    .map(|o| o.public_read)
            })
            .unwrap_or(false)
    }

    /// Makes the next `count` reads fail with a 503 rejection
    pub fn fail_gets(&self, count: usize) {
        self.failing_gets.store(count, Ordering::SeqCst);
    }

    pub fn journal(&self) -> &Journal {
        &self.journal
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn create_bucket(&self, bucket: &str) -> Result<()> {
        self.journal.record(Call::CreateBucket {
            bucket: bucket.to_string(),
        });
        let mut state = self.state.lock().map_err(poisoned)?;
        if !state.buckets.insert(bucket.to_string()) {
            return Err(BackendError::AlreadyExists(format!("bucket {}", bucket)));
        }
        Ok(())
    }

    async fn put(&self, bucket: &str, key: &str, data: Bytes, options: PutOptions) -> Result<()> {
        self.journal.record(Call::Put {
            bucket: bucket.to_string(),
            key: key.to_string(),
        });
        let mut state = self.state.lock().map_err(poisoned)?;
        let path = (bucket.to_string(), key.to_string());

        if options.precondition == WritePrecondition::DoesNotExist
            && state.objects.contains_key(&path)
        {
            return Err(BackendError::AlreadyExists(format!("{}/{}", bucket, key)));
        }

        state.objects.insert(
            path,
            StoredObject {
                data,
                public_read: options.public_read,
            },
        );
        Ok(())
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<Bytes> {
        self.journal.record(Call::Get {
            bucket: bucket.to_string(),
            key: key.to_string(),
        });
        if self
            .failing_gets
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(BackendError::Rejected {
                status: 503,
                message: "service unavailable".to_string(),
            });
        }
        let state = self.state.lock().map_err(poisoned)?;
        state
            .objects
            .get(&(bucket.to_string(), key.to_string()))
            .map(|o| o.data.clone())
            .ok_or_else(|| BackendError::NotFound(format!("object not found: {}/{}", bucket, key)))
    }

    async fn copy(
        &self,
        bucket: &str,
        src_key: &str,
        dst_bucket: &str,
        dst_key: &str,
    ) -> Result<()> {
        self.journal.record(Call::Copy {
            src_key: src_key.to_string(),
            dst_key: dst_key.to_string(),
        });
        let mut state = self.state.lock().map_err(poisoned)?;
        let source = state
            .objects
            .get(&(bucket.to_string(), src_key.to_string()))
            .cloned()
            .ok_or_else(|| {
                BackendError::NotFound(format!("object not found: {}/{}", bucket, src_key))
            })?;
        state
            .objects
            .insert((dst_bucket.to_string(), dst_key.to_string()), source);
        Ok(())
    }

    async fn delete(&self, bucket: &str, key: &str) -> Result<()> {
        self.journal.record(Call::DeleteBlob {
            bucket: bucket.to_string(),
            key: key.to_string(),
        });
        self.state
            .lock()
            .map_err(poisoned)?
            .objects
            .remove(&(bucket.to_string(), key.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_get_delete() {
        let store = MemoryBlobStore::new();
        store
            .put("b", "k", Bytes::from_static(b"hello"), PutOptions::default())
            .await
            .unwrap();
        assert_eq!(store.get("b", "k").await.unwrap(), Bytes::from_static(b"hello"));

        store.delete("b", "k").await.unwrap();
        assert!(store.get("b", "k").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_create_only_put_rejects_existing_key() {
        let store = MemoryBlobStore::new();
        store.insert("b", "k", "first");

        let err = store
            .put("b", "k", Bytes::from_static(b"second"), PutOptions::create_only())
            .await
            .unwrap_err();
        assert!(err.is_already_exists());
        assert_eq!(store.object("b", "k"), Some(Bytes::from_static(b"first")));
    }

    #[tokio::test]
    async fn test_create_bucket_twice_reports_already_exists() {
        let store = MemoryBlobStore::new();
        store.create_bucket("b").await.unwrap();
        assert!(store.create_bucket("b").await.unwrap_err().is_already_exists());
    }

    #[tokio::test]
    async fn test_copy_missing_source() {
        let store = MemoryBlobStore::new();
        let err = store.copy("b", "missing", "b", "dst").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_public_flag_is_kept() {
        let store = MemoryBlobStore::new();
        store
            .put("b", "worker.enc", Bytes::from_static(b"x"), PutOptions::public_read())
            .await
            .unwrap();
        assert!(store.is_public("b", "worker.enc"));
    }

    #[tokio::test]
    async fn test_injected_get_failures_run_out() {
        let store = MemoryBlobStore::new();
        store.insert("b", "k", "data");
        store.fail_gets(1);

        let err = store.get("b", "k").await.unwrap_err();
        assert!(matches!(err, BackendError::Rejected { status: 503, .. }));
        assert_eq!(store.get("b", "k").await.unwrap(), Bytes::from_static(b"data"));
    }
}
