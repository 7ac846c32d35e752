//! Leveled log sinks used by the cache.
//!
//! The cache never talks to `tracing` directly; it goes through a
//! [`CacheLogger`] so hosts can route cache diagnostics into their own
//! request-scoped loggers. The default [`TracingLogger`] forwards to
//! `tracing`, which is silent until a subscriber is installed.

use std::fmt;
use std::sync::Arc;

/// Four independent leveled sinks, each consuming one formatted message.
pub trait CacheLogger: Send + Sync {
    fn debug(&self, message: &str);
    fn info(&self, message: &str);
    fn warn(&self, message: &str);
    fn error(&self, message: &str);
}

/// Forwards to the `tracing` macros under the `swr_dedupe` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl CacheLogger for TracingLogger {
    fn debug(&self, message: &str) {
        tracing::debug!(target: "swr_dedupe", "{}", message);
    }

    fn info(&self, message: &str) {
        tracing::info!(target: "swr_dedupe", "{}", message);
    }

    fn warn(&self, message: &str) {
        tracing::warn!(target: "swr_dedupe", "{}", message);
    }

    fn error(&self, message: &str) {
        tracing::error!(target: "swr_dedupe", "{}", message);
    }
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLogger;

impl CacheLogger for NoopLogger {
    fn debug(&self, _message: &str) {}
    fn info(&self, _message: &str) {}
    fn warn(&self, _message: &str) {}
    fn error(&self, _message: &str) {}
}

type LoggerFactory = dyn Fn() -> Arc<dyn CacheLogger> + Send + Sync;

/// Where the cache gets its logger from.
///
/// A factory is invoked once per cache operation, which lets hosts hand out a
/// logger bound to the current request.
#[derive(Clone)]
pub enum LoggerSource {
    Static(Arc<dyn CacheLogger>),
    Factory(Arc<LoggerFactory>),
}

impl LoggerSource {
    pub fn fixed(logger: impl CacheLogger + 'static) -> Self {
        LoggerSource::Static(Arc::new(logger))
    }

    pub fn factory<F>(factory: F) -> Self
    where
        F: Fn() -> Arc<dyn CacheLogger> + Send + Sync + 'static,
    {
        LoggerSource::Factory(Arc::new(factory))
    }

    pub fn noop() -> Self {
        LoggerSource::fixed(NoopLogger)
    }

    /// The logger for one operation.
    pub fn resolve(&self) -> Arc<dyn CacheLogger> {
        match self {
            LoggerSource::Static(logger) => Arc::clone(logger),
            LoggerSource::Factory(factory) => factory(),
        }
    }
}

impl Default for LoggerSource {
    fn default() -> Self {
        LoggerSource::fixed(TracingLogger)
    }
}

impl fmt::Debug for LoggerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoggerSource::Static(_) => f.write_str("LoggerSource::Static"),
            LoggerSource::Factory(_) => f.write_str("LoggerSource::Factory"),
        }
    }
}

impl<L> From<Arc<L>> for LoggerSource
where
    L: CacheLogger + 'static,
{
    fn from(logger: Arc<L>) -> Self {
        LoggerSource::Static(logger)
    }
}


#[cfg(test)]
mod tests {
    use super::testing::RecordingLogger;
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_static_source_returns_same_logger() {
        let recorder = Arc::new(RecordingLogger::default());
        let source = LoggerSource::from(recorder.clone());

        source.resolve().info("one");
        source.resolve().warn("two");

        assert_eq!(recorder.lines("info"), vec!["one"]);
        assert_eq!(recorder.lines("warn"), vec!["two"]);
    }

    #[test]
    fn test_factory_invoked_per_resolve() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        let source = LoggerSource::factory(move || {
            calls_clone.fetch_add(1, Ordering::SeqCst);
            Arc::new(NoopLogger) as Arc<dyn CacheLogger>
        });

        source.resolve().debug("a");
        source.resolve().debug("b");

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
