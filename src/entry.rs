use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::time::Duration;

use crate::error::CacheError;
use crate::utils::duration_ms;

/// A cache entry containing a value and its expiration times.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<V> {
    /// The cached value.
    pub value: V,

    /// Unix timestamp in milliseconds.
    /// Before this time the entry is considered fresh and valid.
    pub fresh_until: i64,

    /// Unix timestamp in milliseconds.
    /// Between `fresh_until` and this point the entry may be served while it is
    /// revalidated. The backing store evicts the record at this time.
    pub expires_at: i64,
}

/// Where an entry sits on its timeline at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// `now < fresh_until`
    Fresh,
    /// `fresh_until <= now < expires_at`
    Stale,
    /// `now >= expires_at`
    Expired,
}

impl<V> CacheEntry<V> {
    /// Create a new cache entry.
    pub fn new(value: V, fresh_until: i64, expires_at: i64) -> Self {
        CacheEntry {
            value,
            fresh_until,
            expires_at: expires_at.max(fresh_until),
        }
    }

    /// Create an entry written at `now_ms` with the given windows.
    pub fn created_at(value: V, now_ms: i64, fresh: Duration, stale: Duration) -> Self {
        let fresh_until = now_ms.saturating_add(duration_ms(fresh));
        let expires_at = fresh_until.saturating_add(duration_ms(stale));
        CacheEntry::new(value, fresh_until, expires_at)
    }

    /// Classify the entry. Boundaries are half-open: `now == fresh_until` is
    /// stale and `now == expires_at` is expired.
    pub fn freshness(&self, now_ms: i64) -> Freshness {
        if now_ms < self.fresh_until {
            Freshness::Fresh
        } else if now_ms < self.expires_at {
            Freshness::Stale
        } else {
            Freshness::Expired
        }
    }

    /// Check if the entry is still fresh (not yet stale).
    pub fn is_fresh(&self, now_ms: i64) -> bool {
        self.freshness(now_ms) == Freshness::Fresh
    }

    /// Check if the entry is stale but still usable.
    pub fn is_stale(&self, now_ms: i64) -> bool {
        self.freshness(now_ms) == Freshness::Stale
    }

    /// Check if the entry has expired and should not be used.
    pub fn is_expired(&self, now_ms: i64) -> bool {
        self.freshness(now_ms) == Freshness::Expired
    }

    /// Remaining time until the store should evict this entry.
    pub fn ttl(&self, now_ms: i64) -> Duration {
        let remaining = self.expires_at.saturating_sub(now_ms).max(0);
        Duration::from_millis(remaining as u64)
    }
}

impl<V> CacheEntry<V>
where
    V: Serialize,
{
    /// Serialize the entry to the JSON string handed to the backing store.
    pub fn encode(&self) -> Result<String, CacheError> {
        serde_json::to_string(self)
            .map_err(|e| CacheError::Serialization(format!("Serialization failed: {}", e)))
    }
}

impl<V> CacheEntry<V>
where
    V: DeserializeOwned,
{
    /// Parse an entry previously produced by [`CacheEntry::encode`].
    pub fn decode(data: &str) -> Result<Self, CacheError> {
        serde_json::from_str(data)
            .map_err(|e| CacheError::Serialization(format!("Deserialization failed: {}", e)))
    }
}
