use async_trait::async_trait;
use orcbot_core::{ConversationThread, ThreadStore};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// In-memory thread store for tests and local runs.
#[derive(Default)]
pub struct MemoryThreadStore {
    entries: RwLock<HashMap<String, ConversationThread>>,
}

impl MemoryThreadStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl ThreadStore for MemoryThreadStore {
    async fn load(&self, key: &str) -> anyhow::Result<Option<ConversationThread>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn save(&self, thread: &ConversationThread) -> anyhow::Result<()> {
        self.entries
            .write()
            .await
            .insert(thread.key.clone(), thread.clone());
        Ok(())
    }
}
