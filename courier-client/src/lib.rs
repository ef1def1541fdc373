//! Courier Gateway Client
//!
//! A small, type-safe HTTP client for the cloud gateway that fronts the
//! blob store, the message queues and the compute fleet.
//!
//! The client implements the three collaborator traits from
//! `courier_core::repository`, so the orchestrator can run against it
//! without knowing anything about HTTP.
//!
//! # Example
//!
//! ```no_run
//! use courier_client::GatewayClient;
//! use courier_core::repository::MessageQueue;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = GatewayClient::new("http://localhost:9000");
//!
//!     let queue = client.resolve_queue("local_manager_queue").await?;
//!     client.send(&queue, "TERMINATE").await?;
//!     Ok(())
//! }
//! ```

pub mod error;
mod blobs;
mod nodes;
mod queues;

// Re-export commonly used types
pub use error::{ClientError, Result};

use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

/// HTTP client for the cloud gateway API
///
/// Endpoints are grouped by collaborator:
/// - Blob storage (buckets and objects)
/// - Message queues (resolve, send, receive, delete)
/// - Compute fleet (describe, launch, tag, terminate)
#[derive(Debug, Clone)]
pub struct GatewayClient {
    /// Base URL of the gateway (e.g., "http://localhost:9000")
    base_url: String,
    /// HTTP client instance
    client: Client,
}

impl GatewayClient {
    /// Create a new gateway client
    ///
    /// # Arguments
    /// * `base_url` - The base URL of the gateway API (e.g., "http://localhost:9000")
    ///
    /// # Example
    /// ```
    /// use courier_client::GatewayClient;
    ///
    /// let client = GatewayClient::new("http://localhost:9000");
    /// ```
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    /// Create a new gateway client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    ///
    /// # Example
    /// ```
    /// use courier_client::GatewayClient;
    /// use reqwest::Client;
    /// use std::time::Duration;
    ///
    /// let http_client = Client::builder()
    ///     .timeout(Duration::from_secs(30))
    ///     .build()
    ///     .unwrap();
    ///
    /// let client = GatewayClient::with_client("http://localhost:9000", http_client);
    /// ```
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Get the base URL of the gateway
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build an endpoint URL from raw path segments
    ///
    /// Segments are percent-encoded individually, so blob keys containing
    /// `/` or `|` stay a single segment.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.base_url).map_err(|e| {
            ClientError::InvalidRequest(format!("Invalid base URL {}: {}", self.base_url, e))
        })?;

        url.path_segments_mut()
            .map_err(|_| {
                ClientError::InvalidRequest(format!("Base URL cannot carry a path: {}", self.base_url))
            })?
            .pop_if_empty()
            .push("api")
            .extend(segments);

        Ok(url)
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Check the status code and turn failures into `ClientError::ApiError`
    async fn check_status(&self, response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            debug!("Gateway answered {}: {}", status, error_text);
            return Err(ClientError::api_error(status.as_u16(), error_text));
        }

        Ok(response)
    }

    /// Handle an API response and deserialize JSON
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        self.check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }

    /// Handle an API response that returns raw bytes (object reads)
    async fn handle_bytes_response(&self, response: reqwest::Response) -> Result<bytes::Bytes> {
        Ok(self.check_status(response).await?.bytes().await?)
    }

    /// Handle an API response that returns no content (e.g., DELETE operations)
    async fn handle_empty_response(&self, response: reqwest::Response) -> Result<()> {
        self.check_status(response).await?;
        Ok(())
    }
}
