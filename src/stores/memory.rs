use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::error::CacheError;
use crate::store::Store;
use crate::utils::{duration_ms, now_ms, rand_simple};

/// Configuration for eviction on set operations.
#[derive(Debug, Clone)]
pub struct EvictOnSetConfig {
    /// Probability in `[0, 1]` that a given `set` triggers a sweep.
    /// `1.0` sweeps on every write, `0.0` never sweeps.
    pub frequency: f64,

    /// Upper bound on records left after a sweep.
    pub max_items: usize,
}

/// Configuration for HashMapStore.
#[derive(Debug, Clone, Default)]
pub struct HashMapStoreConfig {
    /// Sweep expired (and, past `max_items`, soonest-expiring) entries on `set`.
    pub evict_on_set: Option<EvictOnSetConfig>,
}

#[derive(Clone)]
struct Slot {
    expires: i64,
    value: String,
}

/// Thread-safe in-memory store using HashMap with RwLock.
///
/// Expired records are dropped lazily on read and, when configured, swept on
/// write. Suitable for tests and small single-process caches; for bounded
/// high-concurrency workloads use `MokaStore`.
pub struct HashMapStore {
    state: RwLock<HashMap<String, Slot>>,
    evict_on_set: Option<EvictOnSetConfig>,
}

impl HashMapStore {
    /// Create a new HashMapStore with the given configuration.
    pub fn new(config: HashMapStoreConfig) -> Self {
        HashMapStore {
            state: RwLock::new(HashMap::new()),
            evict_on_set: config.evict_on_set,
        }
    }

    /// Number of records currently held, including not-yet-swept expired ones.
    pub async fn len(&self) -> usize {
        self.state.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Sweep on `set` when evict-on-set is configured and this write is sampled.
    async fn maybe_evict(&self) {
        let Some(config) = self.evict_on_set.as_ref().filter(|c| c.sampled()) else {
            return;
        };

        let mut state = self.state.write().await;
        sweep(&mut state, now_ms(), config.max_items);
    }
}

impl EvictOnSetConfig {
    fn sampled(&self) -> bool {
        match self.frequency {
            f if f <= 0.0 => false,
            f if f >= 1.0 => true,
            f => rand_simple() < f,
        }
    }
}

/// Drop expired records, then the soonest-expiring ones until at most
/// `max_items` remain.
fn sweep(state: &mut HashMap<String, Slot>, now: i64, max_items: usize) {
    state.retain(|_, slot| slot.expires > now);

    let excess = state.len().saturating_sub(max_items);
    if excess == 0 {
        return;
    }

    let mut by_expiry: Vec<(i64, String)> = state
        .iter()
        .map(|(key, slot)| (slot.expires, key.clone()))
        .collect();
    by_expiry.sort_unstable();

    for (_, key) in by_expiry.into_iter().take(excess) {
        state.remove(&key);
    }
}

#[async_trait]
impl Store for HashMapStore {
    fn name(&self) -> &'static str {
        "hashmap"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let state = self.state.read().await;

        let Some(slot) = state.get(key) else {
            return Ok(None);
        };

        if slot.expires <= now_ms() {
            drop(state);
            let mut state = self.state.write().await;
            // Re-check: a writer may have replaced the slot in between.
            if state.get(key).is_some_and(|s| s.expires <= now_ms()) {
                state.remove(key);
            }
            return Ok(None);
        }

        Ok(Some(slot.value.clone()))
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let expires = now_ms().saturating_add(duration_ms(ttl));

        {
            let mut state = self.state.write().await;
            state.insert(key.to_string(), Slot { expires, value });
        }

        self.maybe_evict().await;
        Ok(())
    }

    async fn remove(&self, keys: &[&str]) -> Result<(), CacheError> {
        let mut state = self.state.write().await;

        for key in keys {
            state.remove(*key);
        }

        Ok(())
    }
}
