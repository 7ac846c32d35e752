use std::error::Error as StdError;
use std::sync::Arc;

/// Error type for cache operations.
///
/// Cheap to clone so that a single producer outcome can be handed to every
/// caller waiting on the same in-flight revalidation.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CacheError {
    /// A backing store operation failed.
    #[error("[{tier}] cache error for key '{key}': {message}")]
    Operation {
        tier: String,
        key: String,
        message: String,
    },
    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// The producer behind a cache key failed or panicked.
    #[error("producer failed for key '{key}': {source}")]
    Producer {
        key: String,
        #[source]
        source: Arc<dyn StdError + Send + Sync>,
    },
    /// Configuration could not be parsed or is out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl CacheError {
    /// Create a new operation error.
    pub fn operation(
        tier: impl Into<String>,
        key: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        CacheError::Operation {
            tier: tier.into(),
            key: key.into(),
            message: message.into(),
        }
    }

    /// Wrap a producer's own error.
    pub fn producer<E>(key: impl Into<String>, source: E) -> Self
    where
        E: Into<Box<dyn StdError + Send + Sync>>,
    {
        CacheError::Producer {
            key: key.into(),
            source: Arc::from(source.into()),
        }
    }

    /// Returns `true` if this error came from the producer rather than the cache.
    pub fn is_producer(&self) -> bool {
        matches!(self, CacheError::Producer { .. })
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(e: serde_json::Error) -> Self {
        CacheError::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_producer_error_keeps_source() {
        let err = CacheError::producer("users::get::abc", "upstream timed out");
        assert!(err.is_producer());
        assert_eq!(
            err.to_string(),
            "producer failed for key 'users::get::abc': upstream timed out"
        );
        assert!(StdError::source(&err).is_some());

        // Clones share the same source.
        let cloned = err.clone();
        assert_eq!(cloned.to_string(), err.to_string());
    }

    #[test]
    fn test_operation_error_display() {
        let err = CacheError::operation("redis", "k", "GET failed");
        assert!(!err.is_producer());
        assert_eq!(err.to_string(), "[redis] cache error for key 'k': GET failed");
    }
}
