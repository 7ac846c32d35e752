use async_trait::async_trait;
use std::time::Duration;

use crate::error::CacheError;

/// A store is a common interface for storing, reading and deleting key-value pairs.
///
/// Stores hold opaque strings; encoding entries is the caller's job. The store
/// implementation is responsible for evicting data once its TTL has elapsed,
/// and for any size bound it wants to enforce.
#[async_trait]
pub trait Store: Send + Sync {
    /// A name for logs and error messages.
    ///
    /// # Example
    /// - "hashmap"
    /// - "moka"
    /// - "redis"
    fn name(&self) -> &'static str;

    /// Return the stored value.
    ///
    /// The response must be `None` for missing or evicted keys.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Sets the value for the given key.
    ///
    /// The value must not be returned by `get` once `ttl` has elapsed.
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;

    /// Removes the key(s) from the store.
    async fn remove(&self, keys: &[&str]) -> Result<(), CacheError>;
}
