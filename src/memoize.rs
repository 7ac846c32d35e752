//! Explicit higher-order wrapping of a producer function.

use serde::{Serialize, de::DeserializeOwned};
use std::error::Error as StdError;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::error::CacheError;
use crate::key::Identity;
use crate::swr::{CacheStatus, SwrCache};

/// A producer bound to a cache and an identity.
///
/// Calling it has the same signature as the wrapped function, except that the
/// result comes from the cache when possible. Created by
/// [`SwrCache::wrap`].
pub struct SwrFn<V, A, F> {
    cache: SwrCache<V>,
    identity: Identity,
    producer: Arc<F>,
    _args: PhantomData<fn(A)>,
}

impl<V, A, F> Clone for SwrFn<V, A, F> {
    fn clone(&self) -> Self {
        SwrFn {
            cache: self.cache.clone(),
            identity: self.identity.clone(),
            producer: Arc::clone(&self.producer),
            _args: PhantomData,
        }
    }
}

impl<V, A, F, Fut, E> SwrFn<V, A, F>
where
    V: Clone + Send + Sync + Serialize + DeserializeOwned + 'static,
    A: Serialize + Clone + Send + 'static,
    F: Fn(A) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<V, E>> + Send + 'static,
    E: Into<Box<dyn StdError + Send + Sync>> + 'static,
{
    pub(crate) fn new(cache: SwrCache<V>, identity: Identity, producer: F) -> Self {
        SwrFn {
            cache,
            identity,
            producer: Arc::new(producer),
            _args: PhantomData,
        }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub async fn call(&self, args: A) -> Result<V, CacheError> {
        self.call_with_status(args).await.map(|(value, _)| value)
    }

    pub async fn call_with_status(&self, args: A) -> Result<(V, CacheStatus), CacheError> {
        let producer = Arc::clone(&self.producer);
        let owned = args.clone();
        self.cache
            .request_with_status(&self.identity, &args, move || (*producer)(owned))
            .await
    }
}
