use async_trait::async_trait;
use orcbot_config::KnowledgeConfig;
use orcbot_core::{KnowledgeAnswer, KnowledgeService};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use crate::{endpoint, http_client};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RetrieveAndGenerateRequest<'a> {
    input: TextInput<'a>,
    retrieve_and_generate_configuration: RetrieveAndGenerateConfiguration<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    session_id: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct TextInput<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RetrieveAndGenerateConfiguration<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    knowledge_base_configuration: KnowledgeBaseConfiguration<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct KnowledgeBaseConfiguration<'a> {
    knowledge_base_id: &'a str,
    model_arn: &'a str,
    retrieval_configuration: RetrievalConfiguration<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RetrievalConfiguration<'a> {
    vector_search_configuration: VectorSearchConfiguration<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VectorSearchConfiguration<'a> {
    number_of_results: u32,
    override_search_type: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RetrieveAndGenerateResponse {
    output: Option<TextOutput>,
    session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TextOutput {
    text: Option<String>,
}

/// Client for a managed retrieve-and-generate knowledge base endpoint.
pub struct KnowledgeBaseClient {
    client: Client,
    config: KnowledgeConfig,
}

impl KnowledgeBaseClient {
    pub fn new(config: KnowledgeConfig, timeout: Duration) -> anyhow::Result<Self> {
        info!(
            "Creating KnowledgeBaseClient for knowledge base {}",
            config.knowledge_base_id
        );
        Ok(Self {
            client: http_client(timeout)?,
            config,
        })
    }

    fn request<'a>(
        &'a self,
        prompt: &'a str,
        session_id: Option<&'a str>,
    ) -> RetrieveAndGenerateRequest<'a> {
        RetrieveAndGenerateRequest {
            input: TextInput { text: prompt },
            retrieve_and_generate_configuration: RetrieveAndGenerateConfiguration {
                kind: "KNOWLEDGE_BASE",
                knowledge_base_configuration: KnowledgeBaseConfiguration {
                    knowledge_base_id: &self.config.knowledge_base_id,
                    model_arn: &self.config.model_arn,
                    retrieval_configuration: RetrievalConfiguration {
                        vector_search_configuration: VectorSearchConfiguration {
                            number_of_results: self.config.number_of_results,
                            override_search_type: &self.config.search_type,
                        },
                    },
                },
            },
            session_id,
        }
    }
}

#[async_trait]
impl KnowledgeService for KnowledgeBaseClient {
    async fn retrieve_and_generate(
        &self,
        prompt: &str,
        session_id: Option<&str>,
    ) -> anyhow::Result<KnowledgeAnswer> {
        let request = self.request(prompt, session_id);
        debug!(
            "Knowledge request: {}",
            serde_json::to_string(&request).unwrap_or_default()
        );

        let mut builder = self
            .client
            .post(endpoint(&self.config.endpoint, "retrieveAndGenerate"))
            .json(&request);
        if !self.config.api_key.is_empty() {
            builder = builder.bearer_auth(&self.config.api_key);
        }

        let response = builder
            .send()
            .await?
            .error_for_status()?
            .json::<RetrieveAndGenerateResponse>()
            .await?;

        let text = response
            .output
            .and_then(|o| o.text)
            .ok_or_else(|| anyhow::anyhow!("Invalid response format: missing output text"))?;

        info!("Received knowledge base answer ({} chars)", text.len());
        Ok(KnowledgeAnswer {
            text,
            session_id: response.session_id.or_else(|| session_id.map(str::to_string)),
        })
    }
}
