//! Blob storage endpoints

use async_trait::async_trait;
use bytes::Bytes;
use courier_core::repository::{BlobStore, PutOptions, WritePrecondition};
use serde::Serialize;

use crate::GatewayClient;
use crate::error::Result;

impl GatewayClient {
    // =============================================================================
    // Buckets & Objects
    // =============================================================================

    /// Create a bucket
    ///
    /// The gateway answers 409 if the bucket already exists.
    pub async fn put_bucket(&self, bucket: &str) -> Result<()> {
        let url = self.endpoint(&["buckets", bucket])?;
        let response = self.client.put(url).send().await?;

        self.handle_empty_response(response).await
    }

    /// Upload an object
    ///
    /// # Arguments
    /// * `bucket` - Target bucket
    /// * `key` - Object key (may contain `/` and `|`)
    /// * `data` - Object content
    /// * `options` - Visibility and write precondition
    pub async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        options: PutOptions,
    ) -> Result<()> {
        let url = self.endpoint(&["buckets", bucket, "objects", key])?;
        let if_absent = options.precondition == WritePrecondition::DoesNotExist;
        let response = self
            .client
            .put(url)
            .query(&[("public_read", options.public_read), ("if_absent", if_absent)])
            .body(data)
            .send()
            .await?;

        self.handle_empty_response(response).await
    }

    /// Download an object
    pub async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes> {
        let url = self.endpoint(&["buckets", bucket, "objects", key])?;
        let response = self.client.get(url).send().await?;

        self.handle_bytes_response(response).await
    }

    /// Copy an object server-side
    pub async fn copy_object(
        &self,
        bucket: &str,
        src_key: &str,
        dst_bucket: &str,
        dst_key: &str,
    ) -> Result<()> {
        let url = self.endpoint(&["buckets", bucket, "objects", src_key, "copy"])?;
        let response = self
            .client
            .post(url)
            .json(&CopyObjectRequest { dst_bucket, dst_key })
            .send()
            .await?;

        self.handle_empty_response(response).await
    }

    /// Delete an object
    pub async fn delete_object(&self, bucket: &str, key: &str) -> Result<()> {
        let url = self.endpoint(&["buckets", bucket, "objects", key])?;
        let response = self.client.delete(url).send().await?;

        self.handle_empty_response(response).await
    }
}

#[async_trait]
impl BlobStore for GatewayClient {
    async fn create_bucket(&self, bucket: &str) -> courier_core::Result<()> {
        Ok(self.put_bucket(bucket).await?)
    }

    async fn put(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        options: PutOptions,
    ) -> courier_core::Result<()> {
        Ok(self.put_object(bucket, key, data, options).await?)
    }

    async fn get(&self, bucket: &str, key: &str) -> courier_core::Result<Bytes> {
        Ok(self.get_object(bucket, key).await?)
    }

    async fn copy(
        &self,
        bucket: &str,
        src_key: &str,
        dst_bucket: &str,
        dst_key: &str,
    ) -> courier_core::Result<()> {
        Ok(self.copy_object(bucket, src_key, dst_bucket, dst_key).await?)
    }

    async fn delete(&self, bucket: &str, key: &str) -> courier_core::Result<()> {
        Ok(self.delete_object(bucket, key).await?)
    }
}

#[derive(Debug, Serialize)]
struct CopyObjectRequest<'a> {
    dst_bucket: &'a str,
    dst_key: &'a str,
}
