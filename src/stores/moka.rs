use async_trait::async_trait;
use moka::Expiry;
use moka::future::Cache;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::CacheError;
use crate::store::Store;

/// Configuration for MokaStore.
#[derive(Debug, Clone)]
pub struct MokaStoreConfig {
    /// Maximum number of entries the cache can hold.
    pub max_capacity: u64,

    /// Time to idle: entries are expired if not accessed within this duration.
    /// `None` means entries only expire through their own TTL or the size limit.
    pub time_to_idle: Option<Duration>,
}

impl Default for MokaStoreConfig {
    fn default() -> Self {
        MokaStoreConfig {
            max_capacity: 10_000,
            time_to_idle: None,
        }
    }
}

#[derive(Clone)]
struct Slot {
    value: Arc<str>,
    ttl: Duration,
}

/// Applies the TTL passed to each `set` call.
struct PerEntryTtl;

impl Expiry<String, Slot> for PerEntryTtl {
    fn expire_after_create(&self, _key: &String, slot: &Slot, _created_at: Instant) -> Option<Duration> {
        Some(slot.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        slot: &Slot,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(slot.ttl)
    }
}

/// High-performance concurrent cache store using Moka.
///
/// MokaStore provides:
/// - Lock-free concurrent access for reads and writes
/// - Size-bounded eviction (TinyLFU admission, LRU eviction)
/// - Per-entry expiry driven by the TTL given to `set`
///
/// This is the recommended store for production use inside one process.
pub struct MokaStore {
    cache: Cache<String, Slot>,
}

impl MokaStore {
    /// Create a new MokaStore with the given configuration.
    ///
    /// # Example
    /// ```ignore
    /// let store = MokaStore::new(MokaStoreConfig {
    ///     max_capacity: 50_000,
    ///     time_to_idle: Some(Duration::from_secs(600)),
    /// });
    /// ```
    pub fn new(config: MokaStoreConfig) -> Self {
        let mut builder = Cache::builder()
            .max_capacity(config.max_capacity)
            .expire_after(PerEntryTtl);

        if let Some(tti) = config.time_to_idle {
            builder = builder.time_to_idle(tti);
        }

        MokaStore {
            cache: builder.build(),
        }
    }

    /// Get cache statistics (for monitoring/debugging).
    ///
    /// Moka updates these counters lazily, so they may lag recent writes.
    pub fn stats(&self) -> (u64, u64) {
        (self.cache.entry_count(), self.cache.weighted_size())
    }
}

#[async_trait]
impl Store for MokaStore {
    fn name(&self) -> &'static str {
        "moka"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self.cache.get(key).await.map(|slot| slot.value.to_string()))
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let slot = Slot {
            value: Arc::from(value),
            ttl,
        };
        self.cache.insert(key.to_string(), slot).await;
        Ok(())
    }

    async fn remove(&self, keys: &[&str]) -> Result<(), CacheError> {
        for key in keys {
            self.cache.invalidate(*key).await;
        }

        Ok(())
    }
}
