//! Message queue endpoints

use async_trait::async_trait;
use courier_core::repository::{MessageQueue, QueueRef, ReceivedMessage};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::GatewayClient;
use crate::error::Result;

impl GatewayClient {
    // =============================================================================
    // Queues
    // =============================================================================

    /// Get or create a queue by name
    ///
    /// # Returns
    /// The gateway's handle for the queue
    pub async fn get_or_create_queue(&self, name: &str) -> Result<QueueRef> {
        let url = self.endpoint(&["queues"])?;
        let response = self
            .client
            .post(url)
            .json(&ResolveQueueRequest { name })
            .send()
            .await?;

        let resolved: ResolveQueueResponse = self.handle_response(response).await?;
        Ok(QueueRef::new(resolved.queue_ref))
    }

    /// Send a message body to a queue
    pub async fn send_message(&self, queue: &QueueRef, body: &str) -> Result<()> {
        let url = self.endpoint(&["queues", queue.as_str(), "messages"])?;
        let response = self
            .client
            .post(url)
            .json(&SendMessageRequest { body })
            .send()
            .await?;

        self.handle_empty_response(response).await
    }

    /// Receive a batch of messages
    ///
    /// # Arguments
    /// * `queue` - Queue handle
    /// * `max` - Maximum number of messages to return
    /// * `visibility_timeout` - How long delivered messages stay hidden (whole seconds)
    pub async fn receive_messages(
        &self,
        queue: &QueueRef,
        max: usize,
        visibility_timeout: Duration,
    ) -> Result<Vec<ReceivedMessage>> {
        let url = self.endpoint(&["queues", queue.as_str(), "messages"])?;
        let response = self
            .client
            .get(url)
            .query(&[
                ("max", max as u64),
                ("visibility_timeout", visibility_timeout.as_secs()),
            ])
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Delete a delivered message by its receipt
    pub async fn delete_message(&self, queue: &QueueRef, receipt: &str) -> Result<()> {
        let url = self.endpoint(&["queues", queue.as_str(), "messages", receipt])?;
        let response = self.client.delete(url).send().await?;

        self.handle_empty_response(response).await
    }
}

#[async_trait]
impl MessageQueue for GatewayClient {
    async fn resolve_queue(&self, name: &str) -> courier_core::Result<QueueRef> {
        Ok(self.get_or_create_queue(name).await?)
    }

    async fn send(&self, queue: &QueueRef, body: &str) -> courier_core::Result<()> {
        Ok(self.send_message(queue, body).await?)
    }

    async fn receive(
        &self,
        queue: &QueueRef,
        max_batch: usize,
        visibility_timeout: Duration,
    ) -> courier_core::Result<Vec<ReceivedMessage>> {
        Ok(self
            .receive_messages(queue, max_batch, visibility_timeout)
            .await?)
    }

    async fn delete(&self, queue: &QueueRef, receipt: &str) -> courier_core::Result<()> {
        Ok(self.delete_message(queue, receipt).await?)
    }
}

#[derive(Debug, Serialize)]
struct ResolveQueueRequest<'a> {
    name: &'a str,
}

#[derive(Debug, Deserialize)]
struct ResolveQueueResponse {
    queue_ref: String,
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    body: &'a str,
}
