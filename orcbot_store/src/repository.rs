use orcbot_core::{ConversationThread, ThreadStore, retry_with_backoff};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::locks::{ThreadGuard, ThreadLocks};

const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(10);

/// Thread state access used by the orchestrator.
///
/// Lookups never fail: an empty key, a missing record or an unavailable
/// backend all yield an empty thread, trading continuity for availability.
#[derive(Clone)]
pub struct ThreadRepository {
    store: Arc<dyn ThreadStore>,
    locks: ThreadLocks,
    call_timeout: Duration,
    retry_delays: Vec<Duration>,
}

impl ThreadRepository {
    #[must_use]
    pub fn new(store: Arc<dyn ThreadStore>) -> Self {
        Self {
            store,
            locks: ThreadLocks::new(),
            call_timeout: DEFAULT_CALL_TIMEOUT,
            retry_delays: vec![Duration::from_millis(200), Duration::from_millis(800)],
        }
    }

    #[must_use]
    pub const fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    #[must_use]
    pub fn with_retry_delays(mut self, retry_delays: Vec<Duration>) -> Self {
        self.retry_delays = retry_delays;
        self
    }

    /// Take the per-thread lock. Hold it from `resolve` until `persist`.
    pub async fn lock(&self, key: &str) -> ThreadGuard {
        self.locks.acquire(key).await
    }

    #[must_use]
    pub const fn locks(&self) -> &ThreadLocks {
        &self.locks
    }

    pub async fn resolve(&self, key: &str) -> ConversationThread {
        if key.is_empty() {
            return ConversationThread::default();
        }

        match retry_with_backoff(|| self.load_once(key), &self.retry_delays).await {
            Ok(Some(thread)) => thread,
            Ok(None) => {
                debug!("No stored state for thread {key}, starting fresh");
                ConversationThread::new(key)
            }
            Err(e) => {
                warn!("Unable to find history of thread {key}: {e}");
                ConversationThread::new(key)
            }
        }
    }

    /// Upsert the thread. Never retried.
    pub async fn persist(&self, thread: &ConversationThread) -> anyhow::Result<()> {
        timeout(self.call_timeout, self.store.save(thread))
            .await
            .map_err(|_| {
                anyhow::anyhow!(
                    "thread store write timed out after {}ms",
                    self.call_timeout.as_millis()
                )
            })?
    }

    async fn load_once(&self, key: &str) -> anyhow::Result<Option<ConversationThread>> {
        timeout(self.call_timeout, self.store.load(key))
            .await
            .map_err(|_| {
                anyhow::anyhow!(
                    "thread store read timed out after {}ms",
                    self.call_timeout.as_millis()
                )
            })?
    }
}
