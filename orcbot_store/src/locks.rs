use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::OwnedMutexGuard;

type Slots = Arc<Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>>;

/// One async mutex per thread key.
///
/// Holding a `ThreadGuard` gives exclusive access to a thread's
/// read-modify-write cycle. Slots are removed once nobody holds or waits
/// on them.
#[derive(Clone, Default)]
pub struct ThreadLocks {
    slots: Slots,
}

impl ThreadLocks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, key: &str) -> ThreadGuard {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(slots.entry(key.to_string()).or_default())
        };

        // Cleans up the slot if this future is dropped while waiting.
        let mut waiting = Waiting {
            key,
            slots: &self.slots,
            armed: true,
        };
        let guard = slot.lock_owned().await;
        waiting.armed = false;

        ThreadGuard {
            key: key.to_string(),
            guard: Some(guard),
            slots: Arc::clone(&self.slots),
        }
    }

    /// Number of keys currently held or awaited.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Remove `key` once no guard or waiter refers to its slot.
fn release_idle(slots: &Slots, key: &str) {
    let mut slots = slots.lock().unwrap_or_else(PoisonError::into_inner);
    if slots
        .get(key)
        .is_some_and(|slot| Arc::strong_count(slot) == 1)
    {
        slots.remove(key);
    }
}

struct Waiting<'a> {
    key: &'a str,
    slots: &'a Slots,
    armed: bool,
}

impl Drop for Waiting<'_> {
    fn drop(&mut self) {
        if self.armed {
            release_idle(self.slots, self.key);
        }
    }
}

pub struct ThreadGuard {
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
    slots: Slots,
}

impl ThreadGuard {
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for ThreadGuard {
    fn drop(&mut self) {
        self.guard.take();
        release_idle(&self.slots, &self.key);
    }
}
