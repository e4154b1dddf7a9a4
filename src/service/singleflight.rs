//! One upstream fetch per cache key at a time.
//!
//! Callers for the same key queue on a per-key async mutex. Each key also
//! carries a generation counter bumped by every successful fetch, so a
//! caller that waited can tell someone else already refreshed the entry and
//! read the cache instead of fetching again.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

#[derive(Default)]
struct Slot {
    lock: Arc<AsyncMutex<()>>,
    generation: AtomicU64,
}

#[derive(Default)]
pub(crate) struct KeyedLocks {
    slots: Mutex<HashMap<String, Weak<Slot>>>,
}

/// Exclusive right to fetch one key. Dropping it without calling
/// [`complete`](Flight::complete) records nothing.
pub(crate) struct Flight {
    slot: Arc<Slot>,
    joined: bool,
    _guard: OwnedMutexGuard<()>,
}

impl Flight {
    /// Another caller finished a fetch for this key while we were waiting.
    pub(crate) fn joined(&self) -> bool {
        self.joined
    }

    /// Record a successful fetch so queued callers reuse its result.
    pub(crate) fn complete(self) {
        self.slot.generation.fetch_add(1, Ordering::AcqRel);
    }
}

impl KeyedLocks {
    pub(crate) async fn begin(&self, key: &str) -> Flight {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
            slots.retain(|_, weak| weak.strong_count() > 0);
            match slots.get(key).and_then(Weak::upgrade) {
                Some(slot) => slot,
                None => {
                    let slot = Arc::new(Slot::default());
                    slots.insert(key.to_string(), Arc::downgrade(&slot));
                    slot
                }
            }
        };

        let seen = slot.generation.load(Ordering::Acquire);
        let guard = slot.lock.clone().lock_owned().await;
        let joined = slot.generation.load(Ordering::Acquire) != seen;
        Flight {
            slot,
            joined,
            _guard: guard,
        }
    }

    #[cfg(test)]
    fn live_keys(&self) -> usize {
        let slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots.values().filter(|w| w.strong_count() > 0).count()
    }
}
