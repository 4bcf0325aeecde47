use orcbot_config::Config;
use orcbot_conversation::{
    GeneratorConfig, HistoryAssembler, HistoryConfig, IssueEnricher, KnowledgeGenerator,
    Orchestrator,
};
use orcbot_core::ChatTransport;
use orcbot_providers::{CompletionClient, JiraClient, KnowledgeBaseClient};
use orcbot_slack::{SlackBot, SlackClient, TurnDispatcher};
use orcbot_store::{SeaOrmThreadStore, ThreadRepository};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

/// Connect to the thread store with exponential backoff retry.
///
/// # Retry Behavior
/// - First retry: 1s
/// - Second retry: 2s
/// - Third and beyond: 3s (capped)
/// - Retries indefinitely until connection succeeds
async fn connect_store_with_retry(database_url: &str) -> SeaOrmThreadStore {
    const MAX_DELAY: Duration = Duration::from_secs(3);
    const INITIAL_DELAY: Duration = Duration::from_secs(1);

    let mut attempt = 0u32;
    let mut delay = INITIAL_DELAY;

    loop {
        attempt += 1;
        match SeaOrmThreadStore::connect(database_url).await {
            Ok(store) => {
                info!("Thread store connected on attempt {attempt}");
                return store;
            }
            Err(e) => {
                warn!(
                    "Failed to connect to thread store (attempt {attempt}): {e}. Retrying in {}s...",
                    delay.as_secs()
                );
                sleep(delay).await;
                delay = (delay * 2).min(MAX_DELAY);
            }
        }
    }
}

fn build_enricher(config: &Config) -> anyhow::Result<IssueEnricher> {
    let Some(tracker) = &config.tracker else {
        info!("No issue tracker configured");
        return Ok(IssueEnricher::disabled());
    };

    let client = JiraClient::new(tracker, config.runtime.call_timeout())?
        .with_retry_delays(config.runtime.read_retry_delays());
    Ok(IssueEnricher::new(Arc::new(client), tracker))
}

fn build_history(config: &Config) -> HistoryAssembler {
    let conversation = &config.conversation;
    HistoryAssembler::new(
        HistoryConfig::default()
            .with_max_messages(conversation.history_max_messages)
            .with_max_chars(conversation.history_max_chars)
            .with_suppression_marker(conversation.suppression_marker.clone()),
    )
}

/// Input for the serve command.
pub struct ServeInput {
    pub config_path: Option<PathBuf>,
    /// Overrides `slack.listen_addr`
    pub listen_addr: Option<String>,
}

/// Strategy for running the Slack webhook server.
pub struct ServeStrategy;

impl super::CommandStrategy for ServeStrategy {
    type Input = ServeInput;

    async fn execute(&self, input: Self::Input) -> anyhow::Result<()> {
        let config = super::load_config(input.config_path.as_deref())?;
        let call_timeout = config.runtime.call_timeout();

        Config::ensure_config_dir()?;
        let store = connect_store_with_retry(&config.store.database_url).await;
        let threads = ThreadRepository::new(Arc::new(store))
            .with_call_timeout(call_timeout)
            .with_retry_delays(config.runtime.read_retry_delays());

        let slack = Arc::new(SlackClient::new(&config.slack, call_timeout)?);
        let knowledge = KnowledgeBaseClient::new(config.knowledge.clone(), call_timeout)?;
        let completion = CompletionClient::new(config.completion.clone(), call_timeout)?;
        info!("Using completion model {}", completion.model_id());

        let generator = KnowledgeGenerator::new(
            Arc::new(knowledge),
            Arc::new(completion),
            GeneratorConfig::from_config(&config.completion, &config.conversation),
        );

        let transport: Arc<dyn ChatTransport> = slack.clone();
        let failure_notice = config
            .conversation
            .notify_on_failure
            .then(|| config.conversation.failure_notice.clone());
        let orchestrator = Orchestrator::new(
            transport,
            threads,
            build_history(&config),
            build_enricher(&config)?,
            generator,
        )
        .with_failure_notice(failure_notice);

        let dispatcher = TurnDispatcher::new(
            Arc::new(orchestrator),
            config.runtime.max_concurrent_turns,
            config.runtime.turn_timeout(),
        );

        let listen_addr = input
            .listen_addr
            .unwrap_or_else(|| config.slack.listen_addr.clone());
        let bot = SlackBot::new(slack, dispatcher, listen_addr, config.slack.events_path.clone());

        info!("orcbot is running. Press Ctrl+C to stop.");
        bot.run().await?;

        Ok(())
    }
}
