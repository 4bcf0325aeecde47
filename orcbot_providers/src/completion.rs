use async_trait::async_trait;
use orcbot_config::CompletionConfig;
use orcbot_core::{CompletionModel, CompletionRequest};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

use crate::{endpoint, http_client};

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    generation: String,
}

/// Client for the second-stage completion model.
///
/// Sends `{prompt, temperature, top_p}` and reads `{generation}`. Never
/// retried.
pub struct CompletionClient {
    client: Client,
    config: CompletionConfig,
}

impl CompletionClient {
    pub fn new(config: CompletionConfig, timeout: Duration) -> anyhow::Result<Self> {
        info!("Creating CompletionClient for model {}", config.model_id);
        Ok(Self {
            client: http_client(timeout)?,
            config,
        })
    }

    #[must_use]
    pub fn model_id(&self) -> &str {
        &self.config.model_id
    }
}

#[async_trait]
impl CompletionModel for CompletionClient {
    async fn complete(&self, request: &CompletionRequest) -> anyhow::Result<String> {
        debug!(
            "raw request {}",
            serde_json::to_string(request).unwrap_or_default()
        );
        info!("Sending request to completion model: model={}", self.model_id());

        let url = endpoint(
            &self.config.endpoint,
            &format!("model/{}/invoke", self.config.model_id),
        );
        let mut builder = self.client.post(url).json(request);
        if !self.config.api_key.is_empty() {
            builder = builder.bearer_auth(&self.config.api_key);
        }

        let body = builder.send().await?.error_for_status()?.text().await?;
        debug!("raw response {body}");

        let response: CompletionResponse = serde_json::from_str(&body)
            .map_err(|e| anyhow::anyhow!("Invalid response format: {e}"))?;

        info!("Received response from completion model");
        Ok(response.generation)
    }
}
