use async_trait::async_trait;
use orcbot_config::SlackConfig;
use orcbot_core::{ChatMessage, ChatTransport};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::{Error, Result};

const REPLIES_PAGE_LIMIT: u32 = 1000;

#[derive(Debug, Serialize)]
struct PostMessage<'a> {
    channel: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    thread_ts: Option<&'a str>,
}

/// Every Web API response carries `ok` and, on failure, an `error` code.
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(flatten)]
    body: T,
}

#[derive(Debug, Deserialize)]
struct Replies {
    #[serde(default)]
    messages: Vec<ReplyMessage>,
    #[serde(default)]
    response_metadata: ResponseMetadata,
}

#[derive(Debug, Default, Deserialize)]
struct ResponseMetadata {
    #[serde(default)]
    next_cursor: String,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    user: Option<String>,
    #[serde(default)]
    bot_id: Option<String>,
    #[serde(default)]
    text: String,
    ts: String,
    #[serde(default)]
    thread_ts: Option<String>,
}

impl From<ReplyMessage> for ChatMessage {
    fn from(message: ReplyMessage) -> Self {
        Self {
            author: message
                .user
                .or(message.bot_id)
                .unwrap_or_else(|| "unknown".to_string()),
            text: message.text,
            timestamp: message.ts,
            thread_timestamp: message.thread_ts.unwrap_or_default(),
        }
    }
}

/// Identity of the bot user, from `auth.test`.
#[derive(Debug, Clone, Deserialize)]
pub struct BotIdentity {
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub team: String,
}

#[derive(Debug, Deserialize)]
struct Empty {}

/// Slack Web API client authenticated with a bot token.
pub struct SlackClient {
    client: Client,
    api_base_url: String,
    token: String,
}

impl SlackClient {
    pub fn new(config: &SlackConfig, timeout: Duration) -> Result<Self> {
        let token = config
            .resolve_token()
            .map_err(|e| Error::Config(e.to_string()))?;
        Self::with_token(&config.api_base_url, token, timeout)
    }

    pub fn with_token(
        api_base_url: &str,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    fn url(&self, method: &str) -> String {
        format!("{}/{method}", self.api_base_url)
    }

    async fn unpack<T: DeserializeOwned>(
        method: &'static str,
        response: reqwest::Response,
    ) -> Result<T> {
        let response: ApiResponse<T> = response.error_for_status()?.json().await?;
        if !response.ok {
            return Err(Error::Api {
                method,
                code: response.error.unwrap_or_else(|| "unknown_error".to_string()),
            });
        }
        Ok(response.body)
    }

    pub async fn auth_test(&self) -> Result<BotIdentity> {
        let response = self
            .client
            .post(self.url("auth.test"))
            .bearer_auth(&self.token)
            .send()
            .await?;
        Self::unpack("auth.test", response).await
    }

    pub async fn post_message(&self, channel: &str, text: &str, thread_ts: &str) -> Result<()> {
        let response = self
            .client
            .post(self.url("chat.postMessage"))
            .bearer_auth(&self.token)
            .json(&PostMessage {
                channel,
                text,
                thread_ts: (!thread_ts.is_empty()).then_some(thread_ts),
            })
            .send()
            .await?;
        Self::unpack::<Empty>("chat.postMessage", response).await?;
        debug!("Posted message to {channel} (thread {thread_ts})");
        Ok(())
    }

    /// Messages of the thread rooted at `thread_ts`, oldest first.
    ///
    /// Follows `next_cursor` until the whole thread has been read.
    pub async fn replies(&self, channel: &str, thread_ts: &str) -> Result<Vec<ChatMessage>> {
        let mut messages = Vec::new();
        let mut cursor = String::new();

        loop {
            let mut url = Url::parse(&self.url("conversations.replies"))?;
            {
                let mut query = url.query_pairs_mut();
                query
                    .append_pair("channel", channel)
                    .append_pair("ts", thread_ts)
                    .append_pair("limit", &REPLIES_PAGE_LIMIT.to_string());
                if !cursor.is_empty() {
                    query.append_pair("cursor", &cursor);
                }
            }

            let response = self
                .client
                .get(url)
                .bearer_auth(&self.token)
                .send()
                .await?;
            let page: Replies = Self::unpack("conversations.replies", response).await?;
            messages.extend(page.messages.into_iter().map(ChatMessage::from));

            cursor = page.response_metadata.next_cursor;
            if cursor.is_empty() {
                break;
            }
        }

        debug!("Fetched {} messages of thread {thread_ts}", messages.len());
        Ok(messages)
    }
}

#[async_trait]
impl ChatTransport for SlackClient {
    async fn post_reply(&self, channel: &str, text: &str, thread_key: &str) -> anyhow::Result<()> {
        Ok(self.post_message(channel, text, thread_key).await?)
    }

    async fn fetch_thread_replies(
        &self,
        channel: &str,
        thread_key: &str,
    ) -> anyhow::Result<Vec<ChatMessage>> {
        Ok(self.replies(channel, thread_key).await?)
    }
}
