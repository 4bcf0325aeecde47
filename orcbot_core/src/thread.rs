//! Conversation thread state and the per-turn transcript.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Session state kept for one chat thread.
///
/// The key is the timestamp of the first message in the thread. The
/// session id is the opaque continuity token handed out by the knowledge
/// service and is empty until the first successful generation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationThread {
    pub key: String,
    pub session_id: String,
    pub updated_at: Option<DateTime<Utc>>,
}

impl ConversationThread {
    /// An empty thread for `key` with no session token.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Self::default()
        }
    }

    /// The stored token, or `None` when the thread has not been answered yet.
    #[must_use]
    pub fn session_token(&self) -> Option<&str> {
        if self.session_id.is_empty() {
            None
        } else {
            Some(&self.session_id)
        }
    }

    /// Record the token returned by the latest generation.
    pub fn record_session(&mut self, session_id: impl Into<String>) {
        self.session_id = session_id.into();
        self.updated_at = Some(Utc::now());
    }
}

/// Ordered `author: text` lines, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationHistory {
    lines: Vec<String>,
}

impl ConversationHistory {
    #[must_use]
    pub const fn new(lines: Vec<String>) -> Self {
        Self { lines }
    }

    #[must_use]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    #[must_use]
    pub fn joined(&self) -> String {
        self.lines.join("\n")
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}
