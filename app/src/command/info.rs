use orcbot_store::SeaOrmThreadStore;
use std::path::PathBuf;
use tracing::info;

/// Strategy for displaying configuration information.
///
/// Prints the effective configuration with secrets masked and checks that
/// the thread store is reachable.
#[derive(Debug, Clone, Copy)]
pub struct InfoStrategy;

impl super::CommandStrategy for InfoStrategy {
    type Input = Option<PathBuf>;

    async fn execute(&self, input: Self::Input) -> anyhow::Result<()> {
        let config = super::load_config(input.as_deref())?;

        println!("=== orcbot Configuration ===\n");

        println!("Slack:");
        let token = config.slack.resolve_token().unwrap_or_default();
        println!("  Bot Token: {}", mask_secret(&token));
        println!("  Listen: {}{}", config.slack.listen_addr, config.slack.events_path);
        println!("  API: {}", config.slack.api_base_url);
        println!();

        println!("Knowledge Base:");
        println!("  Endpoint: {}", config.knowledge.endpoint);
        println!("  ID: {}", config.knowledge.knowledge_base_id);
        println!("  Model: {}", config.knowledge.model_arn);
        println!(
            "  Retrieval: {} results, {} search",
            config.knowledge.number_of_results, config.knowledge.search_type
        );
        println!();

        println!("Completion:");
        println!("  Endpoint: {}", config.completion.endpoint);
        println!("  Model: {}", config.completion.model_id);
        println!("  Temperature: {}", config.completion.temperature);
        println!("  Top P: {}", config.completion.top_p);
        println!();

        println!("Issue Tracker:");
        match &config.tracker {
            Some(tracker) => {
                println!("  URL: {}", tracker.base_url);
                println!("  Project: {} ({})", tracker.project_key, tracker.issue_type);
                println!("  API Token: {}", mask_secret(&tracker.api_token));
                println!("  Create Command: {}", tracker.create_command_prefix);
            }
            None => println!("  (disabled)"),
        }
        println!();

        println!("Conversation:");
        println!("  Opt-out Marker: {}", config.conversation.suppression_marker);
        println!(
            "  History Limit: {} messages / {} chars",
            config.conversation.history_max_messages, config.conversation.history_max_chars
        );
        println!("  Failure Notice: {}", config.conversation.notify_on_failure);
        println!();

        println!("Thread Store:");
        let db_url = &config.store.database_url;
        println!("  URL: {}", mask_database_url(db_url));

        info!("Testing thread store connection");
        match SeaOrmThreadStore::connect(db_url).await {
            Ok(_) => println!("  Status: Connected"),
            Err(e) => {
                println!("  Status: Connection failed");
                println!("  Error: {e}");
            }
        }

        Ok(())
    }
}

fn mask_secret(secret: &str) -> String {
    if secret.is_empty() {
        "(not set)".to_string()
    } else if secret.len() > 8 {
        secret
            .get(..8)
            .map_or_else(|| "***".to_string(), |prefix| format!("{prefix}...***"))
    } else {
        "***".to_string()
    }
}

fn mask_database_url(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };

    let Some((credentials, after_at)) = rest.split_once('@') else {
        return url.to_string();
    };

    let Some((username, _password)) = credentials.split_once(':') else {
        return url.to_string();
    };

    format!("{scheme}://{username}:***@{after_at}")
}
