#![deny(
    clippy::all,
    clippy::nursery,
    clippy::pedantic,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::correctness,
    clippy::suspicious,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(
    clippy::similar_names,
    clippy::missing_safety_doc,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod retry;
pub mod thread;

pub use retry::retry_with_backoff;
pub use thread::{ConversationHistory, ConversationThread};

/// A single message as delivered by the chat transport.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub author: String,
    pub text: String,
    pub timestamp: String,
    /// Empty when the message is not part of a thread.
    #[serde(default)]
    pub thread_timestamp: String,
}

impl ChatMessage {
    #[must_use]
    pub fn is_thread_reply(&self) -> bool {
        !self.thread_timestamp.is_empty()
    }

    /// The key of the conversation this message belongs to: the parent
    /// thread timestamp for replies, the message's own timestamp otherwise.
    #[must_use]
    pub fn thread_key(&self) -> &str {
        if self.is_thread_reply() {
            &self.thread_timestamp
        } else {
            &self.timestamp
        }
    }
}

/// Input to the second-stage completion pass.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub prompt: String,
    pub knowledge_answer: String,
    pub history: String,
    pub user: String,
}

/// Outcome of a successful two-stage generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationResult {
    pub session_id: String,
    pub reply: String,
}

/// An issue-tracker key found in a prompt, e.g. `ABC-123`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IssueReference {
    pub key: String,
}

/// Summary and description fetched for an issue.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssueDetails {
    pub summary: String,
    pub description: String,
}

/// Answer returned by the knowledge retrieval service.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeAnswer {
    pub text: String,
    pub session_id: Option<String>,
}

/// Prompt plus sampling configuration for the completion model.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest {
    pub prompt: String,
    pub temperature: f32,
    pub top_p: f32,
}

#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn post_reply(&self, channel: &str, text: &str, thread_key: &str) -> anyhow::Result<()>;

    /// Every message of the thread, oldest first.
    async fn fetch_thread_replies(
        &self,
        channel: &str,
        thread_key: &str,
    ) -> anyhow::Result<Vec<ChatMessage>>;
}

#[async_trait]
pub trait KnowledgeService: Send + Sync {
    async fn retrieve_and_generate(
        &self,
        prompt: &str,
        session_id: Option<&str>,
    ) -> anyhow::Result<KnowledgeAnswer>;
}

#[async_trait]
pub trait CompletionModel: Send + Sync {
    /// Returns the raw generation text.
    async fn complete(&self, request: &CompletionRequest) -> anyhow::Result<String>;
}

#[async_trait]
pub trait IssueTracker: Send + Sync {
    /// Creates an issue and returns its key.
    async fn create_issue(&self, summary: &str, description: &str) -> anyhow::Result<String>;

    async fn get_issue(&self, key: &str) -> anyhow::Result<IssueDetails>;

    /// Link a user can follow to view the issue, when the tracker knows one.
    fn browse_url(&self, _key: &str) -> Option<String> {
        None
    }
}

/// Raw persistence for conversation threads.
#[async_trait]
pub trait ThreadStore: Send + Sync {
    async fn load(&self, key: &str) -> anyhow::Result<Option<ConversationThread>>;
    async fn save(&self, thread: &ConversationThread) -> anyhow::Result<()>;
}
