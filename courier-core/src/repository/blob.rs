//! Blob store contract

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;

/// Precondition for blob writes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WritePrecondition {
    /// Write unconditionally, overwriting any existing object
    #[default]
    None,
    /// Write only if no object exists under the key
    DoesNotExist,
}

/// Options for a single blob write
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PutOptions {
    /// Make the object readable without credentials
    pub public_read: bool,
    pub precondition: WritePrecondition,
}

impl PutOptions {
    /// Public-readable, unconditional write (launch artifacts)
    pub fn public_read() -> Self {
        Self {
            public_read: true,
            precondition: WritePrecondition::None,
        }
    }

    /// Private write that fails if the key is taken
    pub fn create_only() -> Self {
        Self {
            public_read: false,
            precondition: WritePrecondition::DoesNotExist,
        }
    }
}

/// Durable key/value object storage
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Creates a bucket
    ///
    /// Returns `BackendError::AlreadyExists` if the bucket is already there;
    /// callers usually treat that as success.
    async fn create_bucket(&self, bucket: &str) -> Result<()>;

    /// Writes an object
    ///
    /// Returns `BackendError::AlreadyExists` when `options.precondition` is
    /// `DoesNotExist` and the key is taken. The write is durable once this
    /// returns `Ok`.
    async fn put(&self, bucket: &str, key: &str, data: Bytes, options: PutOptions) -> Result<()>;

    /// Reads an entire object
    ///
    /// Returns `BackendError::NotFound` if the object does not exist.
    async fn get(&self, bucket: &str, key: &str) -> Result<Bytes>;

    /// Copies an object to another key
    async fn copy(&self, bucket: &str, src_key: &str, dst_bucket: &str, dst_key: &str)
    -> Result<()>;

    /// Deletes an object
    async fn delete(&self, bucket: &str, key: &str) -> Result<()>;
}
