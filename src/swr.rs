use serde::{Serialize, de::DeserializeOwned};
use std::error::Error as StdError;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::builder::SwrCacheBuilder;
use crate::config::SwrConfig;
use crate::entry::{CacheEntry, Freshness};
use crate::entry_store::EntryStore;
use crate::error::CacheError;
use crate::inflight::InflightRegistry;
use crate::key::{CacheKey, Identity, KeyBuilder};
use crate::logger::CacheLogger;
use crate::memoize::SwrFn;
use crate::queue::DeferredQueue;
use crate::store::Store;
use crate::utils::now_ms;

/// How a request was answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// Served from cache, no revalidation.
    Fresh,
    /// Served from cache, revalidation deferred to the background.
    Stale,
    /// Produced synchronously and cached.
    Miss,
}

/// Stale-while-revalidate cache with single-flight revalidation.
///
/// Every request resolves to one of three paths:
/// - fresh hit: return the cached value
/// - stale hit: return the cached value, revalidate after the caller yields
/// - miss: run the producer (deduplicated per key), cache and return its value
///
/// Clones share the store, the in-flight registry and the deferred queue.
pub struct SwrCache<V> {
    entries: EntryStore,
    registry: Arc<InflightRegistry<V>>,
    queue: Arc<DeferredQueue>,
    config: SwrConfig,
}

impl<V> Clone for SwrCache<V> {
    fn clone(&self) -> Self {
        SwrCache {
            entries: self.entries.clone(),
            registry: Arc::clone(&self.registry),
            queue: Arc::clone(&self.queue),
            config: self.config.clone(),
        }
    }
}

impl<V> SwrCache<V>
where
    V: Clone + Send + Sync + Serialize + DeserializeOwned + 'static,
{
    /// Create a cache over `store` with its own registry and queue.
    ///
    /// # Example
    /// ```ignore
    /// let store = Arc::new(MokaStore::new(MokaStoreConfig::default()));
    /// let cache: SwrCache<User> = SwrCache::new(store, SwrConfig::new(
    ///     Duration::from_secs(60),
    ///     Duration::from_secs(300),
    /// ));
    /// ```
    pub fn new(store: Arc<dyn Store>, config: SwrConfig) -> Self {
        SwrCache::from_parts(
            EntryStore::new(store),
            Arc::new(InflightRegistry::new()),
            Arc::new(DeferredQueue::new()),
            config,
        )
    }

    pub fn builder(store: Arc<dyn Store>) -> SwrCacheBuilder<V> {
        SwrCacheBuilder::new(store)
    }

    pub(crate) fn from_parts(
        entries: EntryStore,
        registry: Arc<InflightRegistry<V>>,
        queue: Arc<DeferredQueue>,
        config: SwrConfig,
    ) -> Self {
        SwrCache {
            entries,
            registry,
            queue,
            config,
        }
    }

    pub fn config(&self) -> &SwrConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<InflightRegistry<V>> {
        &self.registry
    }

    /// Get the value for `(identity, args)`, producing it on a miss.
    ///
    /// `producer` is only invoked if this call ends up running the
    /// revalidation; concurrent callers for the same key share one run.
    ///
    /// # Example
    /// ```ignore
    /// let user = cache
    ///     .request(&Identity::new("users", "get"), &("user:123",), move || async move {
    ///         db.get_user("user:123").await
    ///     })
    ///     .await?;
    /// ```
    pub async fn request<A, F, Fut, E>(
        &self,
        identity: &Identity,
        args: &A,
        producer: F,
    ) -> Result<V, CacheError>
    where
        A: Serialize + ?Sized,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
        E: Into<Box<dyn StdError + Send + Sync>> + 'static,
    {
        self.request_with_status(identity, args, producer)
            .await
            .map(|(value, _)| value)
    }

    /// Like [`request`](Self::request), also reporting which path answered.
    pub async fn request_with_status<A, F, Fut, E>(
        &self,
        identity: &Identity,
        args: &A,
        producer: F,
    ) -> Result<(V, CacheStatus), CacheError>
    where
        A: Serialize + ?Sized,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
        E: Into<Box<dyn StdError + Send + Sync>> + 'static,
    {
        let logger = self.config.logger.resolve();
        let key = KeyBuilder::build(identity, args)?;

        if let Some(entry) = self.lookup(&key, logger.as_ref()).await {
            match entry.freshness(now_ms()) {
                Freshness::Fresh => {
                    logger.debug(&format!("Fresh hit: identity={}, key={}", identity, key));
                    return Ok((entry.value, CacheStatus::Fresh));
                }
                Freshness::Stale => {
                    logger.debug(&format!(
                        "Stale hit, revalidating in background: identity={}, key={}",
                        identity, key
                    ));
                    self.revalidate_in_background(key, producer, logger);
                    return Ok((entry.value, CacheStatus::Stale));
                }
                // Crossed expires_at since it was loaded.
                Freshness::Expired => {}
            }
        }

        logger.debug(&format!("Miss, loading from producer: identity={}, key={}", identity, key));
        let value = self.revalidate(&key, producer, &logger).await?;
        Ok((value, CacheStatus::Miss))
    }

    /// Return the cached value without revalidating, stale or not.
    ///
    /// The response will be `None` for cache misses.
    pub async fn get<A>(&self, identity: &Identity, args: &A) -> Result<Option<V>, CacheError>
    where
        A: Serialize + ?Sized,
    {
        let key = KeyBuilder::build(identity, args)?;
        let entry: Option<CacheEntry<V>> = self.entries.load(&key).await?;
        Ok(entry.map(|e| e.value))
    }

    /// Set the value in the cache using the configured windows.
    pub async fn set<A>(&self, identity: &Identity, args: &A, value: V) -> Result<(), CacheError>
    where
        A: Serialize + ?Sized,
    {
        self.set_with_options(identity, args, value, self.config.fresh, self.config.stale)
            .await
    }

    /// Set the value in the cache with custom windows.
    pub async fn set_with_options<A>(
        &self,
        identity: &Identity,
        args: &A,
        value: V,
        fresh: Duration,
        stale: Duration,
    ) -> Result<(), CacheError>
    where
        A: Serialize + ?Sized,
    {
        let key = KeyBuilder::build(identity, args)?;
        self.entries.save(&key, &value, fresh, stale).await
    }

    /// Removes the value from the cache.
    pub async fn remove<A>(&self, identity: &Identity, args: &A) -> Result<(), CacheError>
    where
        A: Serialize + ?Sized,
    {
        let key = KeyBuilder::build(identity, args)?;
        self.entries.remove(&key).await
    }

    /// Wrap `producer` so every call goes through this cache under `identity`.
    ///
    /// # Example
    /// ```ignore
    /// let fetch_user = cache.wrap(Identity::of::<UserClient>("fetch_user"), move |id: u64| {
    ///     let client = client.clone();
    ///     async move { client.fetch_user(id).await }
    /// });
    /// let user = fetch_user.call(42).await?;
    /// ```
    pub fn wrap<A, F, Fut, E>(&self, identity: Identity, producer: F) -> SwrFn<V, A, F>
    where
        A: Serialize + Clone + Send + 'static,
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
        E: Into<Box<dyn StdError + Send + Sync>> + 'static,
    {
        SwrFn::new(self.clone(), identity, producer)
    }

    /// Wait until all background revalidations queued so far have finished.
    pub async fn settled(&self) {
        self.queue.settled().await;
    }

    /// Number of background revalidations queued or running.
    pub fn pending_revalidations(&self) -> usize {
        self.queue.pending()
    }

    /// Read the entry, treating store and decode failures as a miss.
    async fn lookup(&self, key: &CacheKey, logger: &dyn CacheLogger) -> Option<CacheEntry<V>> {
        match self.entries.load(key).await {
            Ok(entry) => entry,
            Err(e) => {
                logger.warn(&format!(
                    "Unreadable cache entry, treating as miss: store={}, key={}, error={}",
                    self.entries.store_name(),
                    key,
                    e
                ));
                None
            }
        }
    }

    /// Run the producer through the registry and cache its value.
    ///
    /// The save happens inside the shared flight, once per run, before the
    /// key is released.
    async fn revalidate<F, Fut, E>(
        &self,
        key: &CacheKey,
        producer: F,
        logger: &Arc<dyn CacheLogger>,
    ) -> Result<V, CacheError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
        E: Into<Box<dyn StdError + Send + Sync>> + 'static,
    {
        let entries = self.entries.clone();
        let (fresh, stale) = (self.config.fresh, self.config.stale);
        let flight_key = key.clone();
        let logger = Arc::clone(logger);

        self.registry
            .run_exclusive(key, move || async move {
                let value = producer()
                    .await
                    .map_err(|e| CacheError::producer(flight_key.as_str(), e))?;

                if let Err(e) = entries.save(&flight_key, &value, fresh, stale).await {
                    logger.warn(&format!(
                        "Failed to cache produced value: store={}, key={}, error={}",
                        entries.store_name(),
                        flight_key,
                        e
                    ));
                }

                Ok(value)
            })
            .await
    }

    /// Queue a revalidation to run after the current task yields. Errors are
    /// logged and dropped: the caller already has a value.
    fn revalidate_in_background<F, Fut, E>(
        &self,
        key: CacheKey,
        producer: F,
        logger: Arc<dyn CacheLogger>,
    ) where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
        E: Into<Box<dyn StdError + Send + Sync>> + 'static,
    {
        let cache = self.clone();
        let job_key = key.clone();
        let job_logger = Arc::clone(&logger);

        let deferred = self.queue.defer(async move {
            let (key, logger) = (job_key, job_logger);
            match cache.revalidate(&key, producer, &logger).await {
                Ok(_) => logger.debug(&format!("Background revalidation finished: key={}", key)),
                Err(e) => logger.error(&format!(
                    "Background revalidation failed: key={}, error={}",
                    key, e
                )),
            }
        });

        if let Err(e) = deferred {
            logger.error(&format!(
                "Background revalidation not scheduled: key={}, error={}",
                key, e
            ));
        }
    }
}
