//! Shared utilities for the cache library.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Build a composite cache key from its parts.
///
/// Format: `{part}::{part}::...`
pub fn build_cache_key(parts: &[&str]) -> String {
    parts.join("::")
}

/// Get the current time in milliseconds since UNIX epoch.
pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

/// Convert a duration to whole milliseconds, saturating at `i64::MAX`.
pub fn duration_ms(d: Duration) -> i64 {
    i64::try_from(d.as_millis()).unwrap_or(i64::MAX)
}

/// Simple pseudo-random number generator (0.0 to 1.0).
pub fn rand_simple() -> f64 {
    use std::collections::hash_map::RandomState;
    use std::hash::{BuildHasher, Hasher};

    let state = RandomState::new();
    let mut hasher = state.build_hasher();
    hasher.write_u64(
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or_default(),
    );
    (hasher.finish() as f64) / (u64::MAX as f64)
}
