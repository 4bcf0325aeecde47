//! Events API payloads.

use orcbot_conversation::IncomingMessage;
use orcbot_core::ChatMessage;
use serde::Deserialize;

/// Outer envelope of an Events API request.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SlackEnvelope {
    UrlVerification {
        challenge: String,
    },
    EventCallback {
        event: EventPayload,
        #[serde(default)]
        event_id: Option<String>,
    },
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    Message(MessageEvent),
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageEvent {
    #[serde(default)]
    pub channel: String,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub ts: String,
    #[serde(default)]
    pub thread_ts: Option<String>,
    #[serde(default)]
    pub client_msg_id: Option<String>,
    #[serde(default)]
    pub subtype: Option<String>,
    #[serde(default)]
    pub bot_id: Option<String>,
}

impl MessageEvent {
    /// Edits, joins, bot posts and other subtyped events are not typed by a
    /// person and never start a turn.
    #[must_use]
    pub const fn is_automated(&self) -> bool {
        self.subtype.is_some() || self.bot_id.is_some()
    }

    #[must_use]
    pub fn into_incoming(self) -> IncomingMessage {
        let client_msg_id = if self.is_automated() {
            None
        } else {
            self.client_msg_id
        };

        IncomingMessage {
            channel: self.channel,
            client_msg_id,
            message: ChatMessage {
                author: self.user.unwrap_or_else(|| "unknown".to_string()),
                text: self.text.unwrap_or_default(),
                timestamp: self.ts,
                thread_timestamp: self.thread_ts.unwrap_or_default(),
            },
        }
    }
}
