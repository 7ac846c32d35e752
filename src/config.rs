use std::env;
use std::time::Duration;

use crate::error::CacheError;
use crate::logger::{CacheLogger, LoggerSource};

/// Environment variable holding the fresh window in (fractional) seconds.
pub const FRESH_SECONDS_ENV: &str = "SWR_FRESH_SECONDS";
/// Environment variable holding the stale window in (fractional) seconds.
pub const STALE_SECONDS_ENV: &str = "SWR_STALE_SECONDS";

/// Default stale window: one hour.
pub const DEFAULT_STALE: Duration = Duration::from_secs(3600);

/// Timing and logging configuration for an [`SwrCache`](crate::SwrCache).
#[derive(Debug, Clone)]
pub struct SwrConfig {
    /// How long an entry is served without triggering revalidation.
    ///
    /// Default: `0` (every hit revalidates in the background).
    pub fresh: Duration,

    /// How long after `fresh` elapses an entry stays serveable while it is
    /// revalidated. Past that, it is treated as a full miss.
    ///
    /// Default: one hour.
    pub stale: Duration,

    /// Where log output goes. Default: `tracing`.
    pub logger: LoggerSource,
}

impl Default for SwrConfig {
    fn default() -> Self {
        SwrConfig {
            fresh: Duration::ZERO,
            stale: DEFAULT_STALE,
            logger: LoggerSource::default(),
        }
    }
}

impl SwrConfig {
    pub fn new(fresh: Duration, stale: Duration) -> Self {
        SwrConfig {
            fresh,
            stale,
            ..Default::default()
        }
    }

    /// Build from fractional seconds, e.g. `from_secs_f64(0.05, 1.0)`.
    pub fn from_secs_f64(fresh_seconds: f64, stale_seconds: f64) -> Result<Self, CacheError> {
        Ok(SwrConfig::new(
            parse_seconds("fresh", fresh_seconds)?,
            parse_seconds("stale", stale_seconds)?,
        ))
    }

    /// Read `SWR_FRESH_SECONDS` / `SWR_STALE_SECONDS`, falling back to the
    /// defaults for unset variables.
    pub fn from_env() -> Result<Self, CacheError> {
        let mut config = SwrConfig::default();

        if let Some(fresh) = read_env_seconds(FRESH_SECONDS_ENV)? {
            config.fresh = fresh;
        }
        if let Some(stale) = read_env_seconds(STALE_SECONDS_ENV)? {
            config.stale = stale;
        }

        Ok(config)
    }

    pub fn with_fresh(mut self, fresh: Duration) -> Self {
        self.fresh = fresh;
        self
    }

    pub fn with_stale(mut self, stale: Duration) -> Self {
        self.stale = stale;
        self
    }

    pub fn with_logger(mut self, logger: impl CacheLogger + 'static) -> Self {
        self.logger = LoggerSource::fixed(logger);
        self
    }

    pub fn with_logger_source(mut self, logger: LoggerSource) -> Self {
        self.logger = logger;
        self
    }

    /// Total lifetime of an entry in the backing store.
    pub fn ttl(&self) -> Duration {
        self.fresh.saturating_add(self.stale)
    }
}

fn parse_seconds(name: &str, seconds: f64) -> Result<Duration, CacheError> {
    Duration::try_from_secs_f64(seconds).map_err(|e| {
        CacheError::InvalidConfig(format!("{} window of {}s is invalid: {}", name, seconds, e))
    })
}

fn read_env_seconds(var: &str) -> Result<Option<Duration>, CacheError> {
    let Ok(raw) = env::var(var) else {
        return Ok(None);
    };

    let seconds: f64 = raw
        .trim()
        .parse()
        .map_err(|_| CacheError::InvalidConfig(format!("{} is not a number: {:?}", var, raw)))?;

    parse_seconds(var, seconds).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SwrConfig::default();
        assert_eq!(config.fresh, Duration::ZERO);
        assert_eq!(config.stale, Duration::from_secs(3600));
        assert_eq!(config.ttl(), Duration::from_secs(3600));
    }

    #[test]
    fn test_from_secs_f64() {
        let config = SwrConfig::from_secs_f64(0.05, 1.0).unwrap();
        assert_eq!(config.fresh, Duration::from_millis(50));
        assert_eq!(config.stale, Duration::from_secs(1));
        assert_eq!(config.ttl(), Duration::from_millis(1050));
    }

    #[test]
    fn test_rejects_negative_and_nan() {
        assert!(matches!(
            SwrConfig::from_secs_f64(-1.0, 1.0),
            Err(CacheError::InvalidConfig(_))
        ));
        assert!(SwrConfig::from_secs_f64(1.0, f64::NAN).is_err());
    }

    #[test]
    fn test_from_env() {
        // Only this test touches these variables.
        unsafe {
            env::set_var(FRESH_SECONDS_ENV, "2.5");
            env::remove_var(STALE_SECONDS_ENV);
        }
        let config = SwrConfig::from_env().unwrap();
        assert_eq!(config.fresh, Duration::from_millis(2500));
        assert_eq!(config.stale, DEFAULT_STALE);

        unsafe {
            env::set_var(STALE_SECONDS_ENV, "soon");
        }
        assert!(SwrConfig::from_env().is_err());

        unsafe {
            env::remove_var(FRESH_SECONDS_ENV);
            env::remove_var(STALE_SECONDS_ENV);
        }
    }
}
