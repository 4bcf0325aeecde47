use async_trait::async_trait;
use orcbot_config::TrackerConfig;
use orcbot_core::{IssueDetails, IssueTracker, retry_with_backoff};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::info;
use url::Url;

use crate::{endpoint, http_client};

#[derive(Debug, Deserialize)]
struct CreatedIssue {
    key: String,
}

#[derive(Debug, Deserialize)]
struct IssueResponse {
    fields: IssueFields,
}

#[derive(Debug, Deserialize)]
struct IssueFields {
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

/// Jira REST client using basic auth.
pub struct JiraClient {
    client: Client,
    base_url: String,
    username: String,
    api_token: String,
    project_key: String,
    issue_type: String,
    retry_delays: Vec<Duration>,
}

impl JiraClient {
    pub fn new(config: &TrackerConfig, timeout: Duration) -> anyhow::Result<Self> {
        let base = Url::parse(&config.base_url)
            .map_err(|e| anyhow::anyhow!("Invalid tracker base_url {}: {e}", config.base_url))?;
        info!("Creating JiraClient for project {}", config.project_key);

        Ok(Self {
            client: http_client(timeout)?,
            base_url: base.as_str().trim_end_matches('/').to_string(),
            username: config.username.clone(),
            api_token: config.api_token.clone(),
            project_key: config.project_key.clone(),
            issue_type: config.issue_type.clone(),
            retry_delays: vec![Duration::from_millis(200), Duration::from_millis(800)],
        })
    }

    /// Backoff schedule for issue lookups. Creation is never retried.
    #[must_use]
    pub fn with_retry_delays(mut self, retry_delays: Vec<Duration>) -> Self {
        self.retry_delays = retry_delays;
        self
    }

    async fn fetch_issue(&self, key: &str) -> anyhow::Result<IssueDetails> {
        let response = self
            .client
            .get(endpoint(
                &self.base_url,
                &format!("rest/api/2/issue/{key}?fields=summary,description"),
            ))
            .basic_auth(&self.username, Some(&self.api_token))
            .header("Accept", "application/json")
            .send()
            .await?
            .error_for_status()?
            .json::<IssueResponse>()
            .await?;

        Ok(IssueDetails {
            summary: response.fields.summary.unwrap_or_default(),
            description: response.fields.description.unwrap_or_default(),
        })
    }
}

#[async_trait]
impl IssueTracker for JiraClient {
    async fn create_issue(&self, summary: &str, description: &str) -> anyhow::Result<String> {
        let body = json!({
            "fields": {
                "project": { "key": self.project_key },
                "summary": summary,
                "description": description,
                "issuetype": { "name": self.issue_type },
            }
        });

        let created = self
            .client
            .post(endpoint(&self.base_url, "rest/api/2/issue"))
            .basic_auth(&self.username, Some(&self.api_token))
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json::<CreatedIssue>()
            .await?;

        info!("Created issue {}", created.key);
        Ok(created.key)
    }

    async fn get_issue(&self, key: &str) -> anyhow::Result<IssueDetails> {
        retry_with_backoff(|| self.fetch_issue(key), &self.retry_delays).await
    }

    fn browse_url(&self, key: &str) -> Option<String> {
        Some(endpoint(&self.base_url, &format!("browse/{key}")))
    }
}
