use orcbot_conversation::{IncomingMessage, Orchestrator, TurnError, TurnOutcome};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Runs turns in the background so webhook requests are acknowledged
/// immediately.
///
/// At most `max_concurrent` turns run at once; further events wait for a
/// permit. Each turn is bounded by `turn_timeout`.
#[derive(Clone)]
pub struct TurnDispatcher {
    orchestrator: Arc<Orchestrator>,
    permits: Arc<Semaphore>,
    turn_timeout: Duration,
}

impl TurnDispatcher {
    pub fn new(
        orchestrator: Arc<Orchestrator>,
        max_concurrent: usize,
        turn_timeout: Duration,
    ) -> Self {
        Self {
            orchestrator,
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
            turn_timeout,
        }
    }

    pub fn dispatch(&self, incoming: IncomingMessage) -> JoinHandle<TurnOutcome> {
        let orchestrator = Arc::clone(&self.orchestrator);
        let permits = Arc::clone(&self.permits);
        let turn_timeout = self.turn_timeout;

        tokio::spawn(async move {
            let Ok(_permit) = permits.acquire_owned().await else {
                warn!("Turn dispatcher closed, dropping event");
                return TurnOutcome::Aborted(None);
            };

            match timeout(turn_timeout, orchestrator.handle(incoming)).await {
                Ok(outcome) => {
                    debug!("Turn finished: {outcome:?}");
                    outcome
                }
                Err(_) => {
                    warn!("Turn timed out after {}s", turn_timeout.as_secs());
                    TurnOutcome::Aborted(Some(TurnError::Timeout(turn_timeout)))
                }
            }
        })
    }
}
