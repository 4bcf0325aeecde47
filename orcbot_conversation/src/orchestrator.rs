use orcbot_core::{ChatMessage, ChatTransport, ConversationThread};
use orcbot_store::ThreadRepository;
use std::sync::Arc;
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use crate::enricher::{CreateCommandOutcome, IssueEnricher};
use crate::error::TurnError;
use crate::generator::KnowledgeGenerator;
use crate::history::HistoryAssembler;

/// A message event as delivered by the chat platform.
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    pub channel: String,
    /// Present only on messages typed by a human client. Events without it
    /// are the bot's own posts or other automated messages.
    pub client_msg_id: Option<String>,
    pub message: ChatMessage,
}

impl IncomingMessage {
    #[must_use]
    pub fn is_from_client(&self) -> bool {
        self.client_msg_id.as_deref().is_some_and(|id| !id.is_empty())
    }
}

/// How a turn ended.
#[derive(Debug)]
pub enum TurnOutcome {
    Replied { thread_key: String },
    /// The thread opted out of bot replies.
    Suppressed,
    /// A tracker command was handled without generation.
    ShortCircuited(CreateCommandOutcome),
    /// No reply was produced. `None` for ignored events.
    Aborted(Option<TurnError>),
}

impl TurnOutcome {
    #[must_use]
    pub const fn is_replied(&self) -> bool {
        matches!(self, Self::Replied { .. })
    }
}

/// Runs one conversational turn per inbound message.
pub struct Orchestrator {
    transport: Arc<dyn ChatTransport>,
    threads: ThreadRepository,
    history: HistoryAssembler,
    enricher: IssueEnricher,
    generator: KnowledgeGenerator,
    failure_notice: Option<String>,
}

impl Orchestrator {
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        threads: ThreadRepository,
        history: HistoryAssembler,
        enricher: IssueEnricher,
        generator: KnowledgeGenerator,
    ) -> Self {
        Self {
            transport,
            threads,
            history,
            enricher,
            generator,
            failure_notice: None,
        }
    }

    /// Post `notice` in the thread when generation fails.
    #[must_use]
    pub fn with_failure_notice(mut self, notice: Option<String>) -> Self {
        self.failure_notice = notice.filter(|n| !n.trim().is_empty());
        self
    }

    #[must_use]
    pub const fn threads(&self) -> &ThreadRepository {
        &self.threads
    }

    pub async fn handle(&self, incoming: IncomingMessage) -> TurnOutcome {
        let turn_id = Uuid::now_v7();
        let span = info_span!(
            "turn",
            %turn_id,
            channel = %incoming.channel,
            ts = %incoming.message.timestamp
        );
        self.run_turn(incoming).instrument(span).await
    }

    async fn run_turn(&self, incoming: IncomingMessage) -> TurnOutcome {
        if !incoming.is_from_client() {
            debug!("Ignoring message without client id");
            return TurnOutcome::Aborted(None);
        }

        let channel = incoming.channel.as_str();
        let trigger = &incoming.message;
        let thread_key = trigger.thread_key().to_string();

        let thread_messages = if trigger.is_thread_reply() {
            match self
                .transport
                .fetch_thread_replies(channel, &thread_key)
                .await
            {
                Ok(messages) => messages,
                Err(e) => {
                    warn!("Failed to fetch thread {thread_key}, using trigger only: {e}");
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };

        let turn = self.history.assemble(trigger, &thread_messages);
        if turn.suppressed {
            info!("Thread {thread_key} opted out of replies");
            return TurnOutcome::Suppressed;
        }

        // Commands are matched on the unaugmented prompt, ahead of issue
        // lookup, so a command turn posts one reply and fetches no issue.
        if let Some(outcome) = self
            .enricher
            .try_create_command(&turn.prompt, &turn.history.joined())
            .await
        {
            info!("Handled create command in thread {thread_key}");
            if let Err(e) = self
                .transport
                .post_reply(channel, outcome.reply(), &thread_key)
                .await
            {
                warn!("Failed to post command reply in thread {thread_key}: {e}");
            }
            return TurnOutcome::ShortCircuited(outcome);
        }

        let prompt = self.enricher.augment(&turn.prompt).await;

        // held until the updated token is written
        let _guard = self.threads.lock(&thread_key).await;
        let mut thread = self.threads.resolve(&thread_key).await;

        let result = match self
            .generator
            .generate(&thread, &turn.history, &turn.author, &prompt)
            .await
        {
            Ok(result) => result,
            Err(e) => {
                warn!("Generation failed for thread {thread_key}: {e}");
                self.post_failure_notice(channel, &thread_key).await;
                return TurnOutcome::Aborted(Some(e.into()));
            }
        };

        let posted = self
            .transport
            .post_reply(channel, &result.reply, &thread_key)
            .await;

        thread.record_session(result.session_id);
        self.save(&thread).await;

        match posted {
            Ok(()) => {
                info!("Replied in thread {thread_key}");
                TurnOutcome::Replied { thread_key }
            }
            Err(e) => {
                warn!("Failed to post reply in thread {thread_key}: {e}");
                TurnOutcome::Aborted(Some(TurnError::Transport(e)))
            }
        }
    }

    async fn save(&self, thread: &ConversationThread) {
        if thread.key.is_empty() {
            return;
        }
        if let Err(e) = self.threads.persist(thread).await {
            warn!("Failed to persist thread {}: {e}", thread.key);
        }
    }

    async fn post_failure_notice(&self, channel: &str, thread_key: &str) {
        let Some(notice) = &self.failure_notice else {
            return;
        };
        if let Err(e) = self.transport.post_reply(channel, notice, thread_key).await {
            warn!("Failed to post failure notice in thread {thread_key}: {e}");
        }
    }
}
