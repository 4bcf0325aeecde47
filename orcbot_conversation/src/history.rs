//! Conversation history assembly.
//!
//! Turns the messages of a chat thread into an ordered, bounded transcript
//! and decides which message the bot is answering.

use orcbot_core::{ChatMessage, ConversationHistory};

/// Configuration for history assembly.
#[derive(Debug, Clone)]
pub struct HistoryConfig {
    /// Maximum number of transcript lines to keep
    pub max_messages: usize,
    /// Maximum characters across kept lines (approximate token limit)
    pub max_chars: usize,
    /// Case-insensitive marker that opts the thread out of replies
    pub suppression_marker: String,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_messages: 50,
            max_chars: 12_000,
            suppression_marker: "no_orc".to_string(),
        }
    }
}

impl HistoryConfig {
    #[must_use]
    pub const fn with_max_messages(mut self, max: usize) -> Self {
        self.max_messages = max;
        self
    }

    #[must_use]
    pub const fn with_max_chars(mut self, max: usize) -> Self {
        self.max_chars = max;
        self
    }

    #[must_use]
    pub fn with_suppression_marker(mut self, marker: impl Into<String>) -> Self {
        self.suppression_marker = marker.into();
        self
    }
}

/// Everything the orchestrator needs from the thread for one turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledTurn {
    pub history: ConversationHistory,
    /// Some message in the thread carries the opt-out marker.
    pub suppressed: bool,
    /// Text of the message being answered.
    pub prompt: String,
    /// Author of the message being answered.
    pub author: String,
}

#[derive(Debug, Clone, Default)]
pub struct HistoryAssembler {
    config: HistoryConfig,
}

impl HistoryAssembler {
    #[must_use]
    pub const fn new(config: HistoryConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub const fn config(&self) -> &HistoryConfig {
        &self.config
    }

    /// Assemble the turn for `trigger`.
    ///
    /// `thread_messages` are the messages already in the trigger's thread,
    /// oldest first, and are ignored for top-level messages. For thread
    /// replies the most recent message of the thread is answered, which is
    /// not necessarily the trigger itself.
    #[must_use]
    pub fn assemble(
        &self,
        trigger: &ChatMessage,
        thread_messages: &[ChatMessage],
    ) -> AssembledTurn {
        let mut messages: Vec<&ChatMessage> = Vec::new();
        if trigger.is_thread_reply() {
            messages.extend(thread_messages);
            if !thread_messages
                .iter()
                .any(|m| m.timestamp == trigger.timestamp)
            {
                messages.push(trigger);
            }
        } else {
            messages.push(trigger);
        }

        let marker = self.config.suppression_marker.to_lowercase();
        let suppressed = !marker.is_empty()
            && messages
                .iter()
                .any(|m| m.text.to_lowercase().contains(&marker));

        let latest = messages.last().copied().unwrap_or(trigger);

        let lines: Vec<String> = messages
            .iter()
            .map(|m| format!("{}: {}", m.author, m.text))
            .collect();

        AssembledTurn {
            history: ConversationHistory::new(self.bound(lines)),
            suppressed,
            prompt: latest.text.clone(),
            author: latest.author.clone(),
        }
    }

    /// Keep the newest lines within the message and character limits.
    /// The newest line is always kept.
    fn bound(&self, mut lines: Vec<String>) -> Vec<String> {
        let start = lines.len().saturating_sub(self.config.max_messages.max(1));
        lines.drain(..start);

        let char_count = |line: &String| line.chars().count();
        let mut total_chars: usize = lines.iter().map(char_count).sum();
        while lines.len() > 1 && total_chars > self.config.max_chars {
            total_chars -= char_count(&lines.remove(0));
        }

        lines
    }
}
