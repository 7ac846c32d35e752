use serde::{Serialize, de::DeserializeOwned};
use std::sync::Arc;
use std::time::Duration;

use crate::entry::CacheEntry;
use crate::error::CacheError;
use crate::key::CacheKey;
use crate::store::Store;
use crate::utils::now_ms;

/// Encodes entries for a [`Store`] and stamps their freshness windows.
///
/// Physical eviction is left to the store: every record is written with a TTL
/// of `fresh + stale`, so it disappears exactly when the entry hard-expires.
#[derive(Clone)]
pub struct EntryStore {
    store: Arc<dyn Store>,
}

impl EntryStore {
    pub fn new(store: Arc<dyn Store>) -> Self {
        EntryStore { store }
    }

    /// Name of the underlying store, for log messages.
    pub fn store_name(&self) -> &'static str {
        self.store.name()
    }

    /// Load the entry for `key`.
    ///
    /// Returns `Ok(None)` when the key is absent or past `expires_at` (a store
    /// that evicts lazily may still hold it), and `CacheError::Serialization`
    /// when the stored payload cannot be decoded as `V`.
    pub async fn load<V>(&self, key: &CacheKey) -> Result<Option<CacheEntry<V>>, CacheError>
    where
        V: DeserializeOwned,
    {
        let Some(data) = self.store.get(key.as_str()).await? else {
            return Ok(None);
        };

        let entry = CacheEntry::<V>::decode(&data)?;
        if entry.is_expired(now_ms()) {
            return Ok(None);
        }

        Ok(Some(entry))
    }

    /// Write `value` as fresh for `fresh`, then serveable-but-stale for
    /// `stale`.
    pub async fn save<V>(
        &self,
        key: &CacheKey,
        value: &V,
        fresh: Duration,
        stale: Duration,
    ) -> Result<(), CacheError>
    where
        V: Serialize,
    {
        let entry = CacheEntry::created_at(value, now_ms(), fresh, stale);
        let data = entry.encode()?;
        self.store
            .set(key.as_str(), data, fresh.saturating_add(stale))
            .await
    }

    pub async fn remove(&self, key: &CacheKey) -> Result<(), CacheError> {
        self.store.remove(&[key.as_str()]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::Freshness;
    use crate::key::{Identity, KeyBuilder};
    use crate::stores::memory::{HashMapStore, HashMapStoreConfig};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records what the adapter hands to the store.
    #[derive(Default)]
    struct SpyStore {
        writes: Mutex<Vec<(String, String, Duration)>>,
        canned: Mutex<Option<String>>,
    }

    #[async_trait]
    impl Store for SpyStore {
        fn name(&self) -> &'static str {
            "spy"
        }

        async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
            Ok(self.canned.lock().unwrap().clone())
        }

        async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
            self.writes
                .lock()
                .unwrap()
                .push((key.to_string(), value, ttl));
            Ok(())
        }

        async fn remove(&self, _keys: &[&str]) -> Result<(), CacheError> {
            Ok(())
        }
    }

    fn key() -> CacheKey {
        KeyBuilder::build(&Identity::new("users", "get"), &("a", 2)).unwrap()
    }

    #[tokio::test]
    async fn test_save_uses_fresh_plus_stale_ttl() {
        let spy = Arc::new(SpyStore::default());
        let entries = EntryStore::new(spy.clone());

        let before = now_ms();
        entries
            .save(&key(), &"v".to_string(), Duration::from_secs(60), Duration::from_secs(300))
            .await
            .unwrap();

        let writes = spy.writes.lock().unwrap();
        let (stored_key, data, ttl) = &writes[0];
        assert_eq!(stored_key, key().as_str());
        assert_eq!(*ttl, Duration::from_secs(360));

        let entry = CacheEntry::<String>::decode(data).unwrap();
        assert_eq!(entry.value, "v");
        assert!(entry.fresh_until >= before + 60_000);
        assert_eq!(entry.expires_at - entry.fresh_until, 300_000);
    }

    #[tokio::test]
    async fn test_load_round_trip_and_miss() {
        let store = Arc::new(HashMapStore::new(HashMapStoreConfig::default()));
        let entries = EntryStore::new(store);

        assert!(entries.load::<u32>(&key()).await.unwrap().is_none());

        entries
            .save(&key(), &7u32, Duration::from_secs(60), Duration::from_secs(60))
            .await
            .unwrap();

        let entry = entries.load::<u32>(&key()).await.unwrap().unwrap();
        assert_eq!(entry.value, 7);
        assert_eq!(entry.freshness(now_ms()), Freshness::Fresh);

        entries.remove(&key()).await.unwrap();
        assert!(entries.load::<u32>(&key()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_load_treats_expired_record_as_missing() {
        let spy = Arc::new(SpyStore::default());
        let past = now_ms() - 10_000;
        *spy.canned.lock().unwrap() = Some(CacheEntry::new(1u8, past, past + 1).encode().unwrap());

        let entries = EntryStore::new(spy);
        assert!(entries.load::<u8>(&key()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_load_surfaces_undecodable_payload() {
        let spy = Arc::new(SpyStore::default());
        *spy.canned.lock().unwrap() = Some("{\"garbage\":true}".to_string());

        let entries = EntryStore::new(spy);
        let err = entries.load::<u8>(&key()).await.unwrap_err();
        assert!(matches!(err, CacheError::Serialization(_)));
    }
}
