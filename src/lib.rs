//! swr-dedupe - A stale-while-revalidate (SWR) caching engine for Rust
//!
//! This library provides:
//! - Stale-while-revalidate semantics over any key-value store with TTLs
//! - Single-flight deduplication of concurrent revalidations per key
//! - Deferred background revalidation that never delays the caller
//! - Deterministic cache keys from an identity and structured arguments
//!
//! # Example
//!
//! ```ignore
//! use swr_dedupe::{Identity, MokaStore, MokaStoreConfig, SwrCache};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), swr_dedupe::CacheError> {
//!     let store = Arc::new(MokaStore::new(MokaStoreConfig::default()));
//!     let cache: SwrCache<String> = SwrCache::builder(store)
//!         .fresh(Duration::from_secs(60))
//!         .stale(Duration::from_secs(300))
//!         .build();
//!
//!     let identity = Identity::new("users", "get");
//!     let user = cache
//!         .request(&identity, &("user:123",), || async {
//!             Ok::<_, std::io::Error>("User data for user:123".to_string())
//!         })
//!         .await?;
//!     Ok(())
//! }
//! ```

mod builder;
mod config;
mod entry;
mod entry_store;
mod error;
mod inflight;
mod key;
mod logger;
mod memoize;
mod queue;
mod store;
pub mod stores;
mod swr;
mod utils;

// Re-export public API
pub use builder::SwrCacheBuilder;
pub use config::{DEFAULT_STALE, FRESH_SECONDS_ENV, STALE_SECONDS_ENV, SwrConfig};
pub use entry::{CacheEntry, Freshness};
pub use entry_store::EntryStore;
pub use error::CacheError;
pub use inflight::InflightRegistry;
pub use key::{CacheKey, Identity, KeyBuilder};
pub use logger::{CacheLogger, LoggerSource, NoopLogger, TracingLogger};
pub use memoize::SwrFn;
pub use queue::DeferredQueue;
pub use store::Store;
pub use stores::memory::{EvictOnSetConfig, HashMapStore, HashMapStoreConfig};
pub use stores::moka::{MokaStore, MokaStoreConfig};
pub use stores::redis::{RedisStore, RedisStoreConfig};
pub use swr::{CacheStatus, SwrCache};
