use crate::{Result, SlackClient, TurnDispatcher, events_router};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::time::sleep;
use tracing::{info, warn};

/// Events API webhook server wired to the turn dispatcher.
pub struct SlackBot {
    client: Arc<SlackClient>,
    dispatcher: TurnDispatcher,
    listen_addr: String,
    events_path: String,
}

impl SlackBot {
    pub fn new(
        client: Arc<SlackClient>,
        dispatcher: TurnDispatcher,
        listen_addr: impl Into<String>,
        events_path: impl Into<String>,
    ) -> Self {
        Self {
            client,
            dispatcher,
            listen_addr: listen_addr.into(),
            events_path: events_path.into(),
        }
    }

    /// Verify the bot token against `auth.test`.
    /// Starts at 2s, increases by 2s each attempt, max 10s delay.
    /// Retries indefinitely until the API answers.
    async fn test_connection(&self) {
        const INITIAL_DELAY_SECS: u64 = 2;
        const MAX_DELAY_SECS: u64 = 10;

        let mut attempt = 1u64;
        loop {
            match self.client.auth_test().await {
                Ok(identity) => {
                    info!(
                        "Connected to Slack API as @{} (id: {}) in {}",
                        identity.user, identity.user_id, identity.team
                    );
                    return;
                }
                Err(e) => {
                    let delay_secs = (INITIAL_DELAY_SECS * attempt).min(MAX_DELAY_SECS);
                    warn!("Connection attempt {attempt} failed: {e}. Retrying in {delay_secs}s...");

                    if attempt == 1 {
                        warn!("This may be due to:");
                        warn!("  - Network connectivity issues");
                        warn!("  - An invalid or revoked bot token");
                        warn!("  - Slack API being temporarily unavailable");
                    }

                    sleep(Duration::from_secs(delay_secs)).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Serve the webhook until Ctrl-C.
    pub async fn run(self) -> Result<()> {
        self.test_connection().await;

        let app = events_router(self.dispatcher, &self.events_path);
        let listener = TcpListener::bind(&self.listen_addr).await?;
        info!(
            "Listening for Slack events on {}{}",
            self.listen_addr, self.events_path
        );

        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    warn!("Failed to listen for shutdown signal: {e}");
                    std::future::pending::<()>().await;
                }
                info!("Shutdown signal received");
            })
            .await?;

        Ok(())
    }
}
