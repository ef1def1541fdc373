//! Compute fleet endpoints

use async_trait::async_trait;
use courier_core::domain::node::FleetNode;
use courier_core::repository::{ComputeFleet, LaunchRequest};
use serde::{Deserialize, Serialize};

use crate::GatewayClient;
use crate::error::Result;

impl GatewayClient {
    // =============================================================================
    // Nodes
    // =============================================================================

    /// List all nodes
    pub async fn list_nodes(&self) -> Result<Vec<FleetNode>> {
        let url = self.endpoint(&["nodes"])?;
        let response = self.client.get(url).send().await?;

        self.handle_response(response).await
    }

    /// Launch a node with a boot payload
    ///
    /// # Returns
    /// The id of the new node (usually still pending)
    pub async fn launch_node(&self, request: &LaunchRequest) -> Result<String> {
        let url = self.endpoint(&["nodes"])?;
        let response = self.client.post(url).json(request).send().await?;

        let launched: LaunchResponse = self.handle_response(response).await?;
        Ok(launched.id)
    }

    /// Set a tag on a node
    pub async fn tag_node(&self, id: &str, key: &str, value: &str) -> Result<()> {
        let url = self.endpoint(&["nodes", id, "tags"])?;
        let response = self
            .client
            .post(url)
            .json(&TagRequest { key, value })
            .send()
            .await?;

        self.handle_empty_response(response).await
    }

    /// Terminate a node
    pub async fn terminate_node(&self, id: &str) -> Result<()> {
        let url = self.endpoint(&["nodes", id])?;
        let response = self.client.delete(url).send().await?;

        self.handle_empty_response(response).await
    }
}

#[async_trait]
impl ComputeFleet for GatewayClient {
    async fn describe(&self) -> courier_core::Result<Vec<FleetNode>> {
        Ok(self.list_nodes().await?)
    }

    async fn run(&self, request: LaunchRequest) -> courier_core::Result<String> {
        Ok(self.launch_node(&request).await?)
    }

    async fn tag(&self, id: &str, key: &str, value: &str) -> courier_core::Result<()> {
        Ok(self.tag_node(id, key, value).await?)
    }

    async fn terminate(&self, id: &str) -> courier_core::Result<()> {
        Ok(self.terminate_node(id).await?)
    }
}

#[derive(Debug, Deserialize)]
struct LaunchResponse {
    id: String,
}

#[derive(Debug, Serialize)]
struct TagRequest<'a> {
    key: &'a str,
    value: &'a str,
}
