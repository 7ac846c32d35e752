//! Builder API for composing an [`SwrCache`].
//!
//! The builder is the composition root for the cache's shared state: by
//! default every cache gets its own in-flight registry and deferred queue, but
//! both can be injected so several caches share them.

use serde::{Serialize, de::DeserializeOwned};
use std::sync::Arc;
use std::time::Duration;

use crate::config::SwrConfig;
use crate::entry_store::EntryStore;
use crate::inflight::InflightRegistry;
use crate::logger::{CacheLogger, LoggerSource};
use crate::queue::DeferredQueue;
use crate::store::Store;
use crate::swr::SwrCache;

/// Builder for [`SwrCache`].
///
/// # Example
///
/// ```ignore
/// use swr_dedupe::{MokaStore, MokaStoreConfig, SwrCache};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// let store = Arc::new(MokaStore::new(MokaStoreConfig::default()));
///
/// let cache: SwrCache<User> = SwrCache::builder(store)
///     .fresh(Duration::from_secs(60))
///     .stale(Duration::from_secs(600))
///     .build();
/// ```
pub struct SwrCacheBuilder<V> {
    store: Arc<dyn Store>,
    config: SwrConfig,
    registry: Option<Arc<InflightRegistry<V>>>,
    queue: Option<Arc<DeferredQueue>>,
}

impl<V> SwrCacheBuilder<V>
where
    V: Clone + Send + Sync + Serialize + DeserializeOwned + 'static,
{
    /// Create a new builder with the default configuration.
    pub fn new(store: Arc<dyn Store>) -> Self {
        SwrCacheBuilder {
            store,
            config: SwrConfig::default(),
            registry: None,
            queue: None,
        }
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: SwrConfig) -> Self {
        self.config = config;
        self
    }

    pub fn fresh(mut self, fresh: Duration) -> Self {
        self.config.fresh = fresh;
        self
    }

    pub fn stale(mut self, stale: Duration) -> Self {
        self.config.stale = stale;
        self
    }

    pub fn logger(mut self, logger: impl CacheLogger + 'static) -> Self {
        self.config.logger = LoggerSource::fixed(logger);
        self
    }

    /// Build a fresh logger for every cache operation.
    pub fn logger_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Arc<dyn CacheLogger> + Send + Sync + 'static,
    {
        self.config.logger = LoggerSource::factory(factory);
        self
    }

    /// Share an in-flight registry with other caches. Keys embed the identity,
    /// so caches with different identities never join each other's flights.
    pub fn registry(mut self, registry: Arc<InflightRegistry<V>>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Share a deferred queue with other caches.
    pub fn queue(mut self, queue: Arc<DeferredQueue>) -> Self {
        self.queue = Some(queue);
        self
    }

    pub fn build(self) -> SwrCache<V> {
        SwrCache::from_parts(
            EntryStore::new(self.store),
            self.registry
                .unwrap_or_else(|| Arc::new(InflightRegistry::new())),
            self.queue.unwrap_or_else(|| Arc::new(DeferredQueue::new())),
            self.config,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::Identity;
    use crate::logger::NoopLogger;
    use crate::stores::memory::{HashMapStore, HashMapStoreConfig};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_builder_applies_settings() {
        let store = Arc::new(HashMapStore::new(HashMapStoreConfig::default()));
        let cache: SwrCache<String> = SwrCache::builder(store)
            .fresh(Duration::from_secs(5))
            .stale(Duration::from_secs(50))
            .logger(NoopLogger)
            .build();

        assert_eq!(cache.config().fresh, Duration::from_secs(5));
        assert_eq!(cache.config().stale, Duration::from_secs(50));
        assert_eq!(cache.config().ttl(), Duration::from_secs(55));
    }

    #[tokio::test]
    async fn test_builder_shares_injected_registry() {
        let store: Arc<dyn Store> = Arc::new(HashMapStore::new(HashMapStoreConfig::default()));
        let registry = Arc::new(InflightRegistry::<String>::new());

        let users: SwrCache<String> = SwrCache::builder(store.clone())
            .registry(registry.clone())
            .build();
        let accounts: SwrCache<String> = SwrCache::builder(store)
            .registry(registry.clone())
            .build();

        assert!(Arc::ptr_eq(users.registry(), accounts.registry()));

        let value = users
            .request(&Identity::new("users", "get"), &1, || async {
                Ok::<_, std::convert::Infallible>("u".to_string())
            })
            .await
            .unwrap();
        assert_eq!(value, "u");
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_logger_factory_called_per_operation() {
        let store = Arc::new(HashMapStore::new(HashMapStoreConfig::default()));
        let built = Arc::new(AtomicUsize::new(0));
        let built_clone = built.clone();

        let cache: SwrCache<String> = SwrCache::builder(store)
            .logger_factory(move || {
                built_clone.fetch_add(1, Ordering::SeqCst);
                Arc::new(NoopLogger) as Arc<dyn CacheLogger>
            })
            .build();

        let identity = Identity::new("users", "get");
        for _ in 0..3 {
            cache
                .request(&identity, &"k", || async {
                    Ok::<_, std::convert::Infallible>("v".to_string())
                })
                .await
                .unwrap();
        }

        assert_eq!(built.load(Ordering::SeqCst), 3);
    }
}
