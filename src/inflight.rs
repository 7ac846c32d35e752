//! Single-flight registry for revalidations.
//!
//! At most one producer runs per [`CacheKey`] at a time; every concurrent
//! caller for that key awaits the same [`Shared`] result.

use futures::FutureExt as _;
use futures::future::{BoxFuture, Shared};
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;

use crate::error::CacheError;
use crate::key::CacheKey;

type SharedResult<V> = Shared<BoxFuture<'static, Result<V, CacheError>>>;

struct Flight<V> {
    /// Distinguishes successive flights for the same key.
    generation: u64,
    result: SharedResult<V>,
}

type FlightMap<V> = Arc<Mutex<HashMap<CacheKey, Flight<V>>>>;

/// Registry of in-progress producer calls, keyed by cache key.
///
/// The producer runs on its own Tokio task, so it completes (and releases its
/// registration) even if every caller awaiting it is dropped. Registration is
/// released on every outcome: success, error, or panic. A producer that never
/// completes keeps its key registered; there is no timeout.
pub struct InflightRegistry<V> {
    flights: FlightMap<V>,
    next_generation: AtomicU64,
}

impl<V> Default for InflightRegistry<V> {
    fn default() -> Self {
        InflightRegistry {
            flights: Arc::new(Mutex::new(HashMap::new())),
            next_generation: AtomicU64::new(0),
        }
    }
}

impl<V> InflightRegistry<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `producer` for `key` unless a run is already in flight, in which
    /// case await that run's result instead. `producer` is only called by the
    /// caller that creates the flight.
    pub async fn run_exclusive<F, Fut>(&self, key: &CacheKey, producer: F) -> Result<V, CacheError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, CacheError>> + Send + 'static,
    {
        let shared = {
            let mut flights = self.flights.lock().await;

            match flights.get(key) {
                Some(flight) => flight.result.clone(),
                None => {
                    let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
                    let result = self.launch(key.clone(), generation, producer());
                    flights.insert(
                        key.clone(),
                        Flight {
                            generation,
                            result: result.clone(),
                        },
                    );
                    result
                }
            }
        };

        shared.await
    }

    /// Whether a producer is currently running for `key`.
    pub async fn is_inflight(&self, key: &CacheKey) -> bool {
        self.flights.lock().await.contains_key(key)
    }

    /// Number of keys with a producer currently running.
    pub async fn len(&self) -> usize {
        self.flights.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Spawn the producer. Must be called with the flight map locked so the
    /// task cannot release its registration before it is inserted.
    fn launch<Fut>(&self, key: CacheKey, generation: u64, fut: Fut) -> SharedResult<V>
    where
        Fut: Future<Output = Result<V, CacheError>> + Send + 'static,
    {
        let flights = Arc::clone(&self.flights);
        let task_key = key.clone();

        let handle = tokio::spawn(async move {
            let result = match AssertUnwindSafe(fut).catch_unwind().await {
                Ok(result) => result,
                Err(panic) => Err(CacheError::producer(
                    task_key.as_str(),
                    format!("producer panicked: {}", panic_message(&*panic)),
                )),
            };
            release(&flights, &task_key, generation).await;
            result
        });

        let flights = Arc::clone(&self.flights);
        async move {
            match handle.await {
                Ok(result) => result,
                Err(join_error) => {
                    // Only reachable if the runtime is shutting down.
                    release(&flights, &key, generation).await;
                    Err(CacheError::producer(
                        key.as_str(),
                        format!("producer task aborted: {}", join_error),
                    ))
                }
            }
        }
        .boxed()
        .shared()
    }
}

async fn release<V>(flights: &Mutex<HashMap<CacheKey, Flight<V>>>, key: &CacheKey, generation: u64) {
    let mut flights = flights.lock().await;
    if flights.get(key).is_some_and(|f| f.generation == generation) {
        flights.remove(key);
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}
