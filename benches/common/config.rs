use std::env;

/// Benchmark knobs, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct BenchConfig {
    /// Simulated origin latency in milliseconds (DB_LATENCY_MS, defaults to 5)
    pub db_latency_ms: u64,

    /// Sample size for benchmarks (BENCH_SAMPLE_SIZE, defaults to 100)
    pub sample_size: usize,

    /// Concurrent callers per key in the single-flight group (BENCH_FANOUT, defaults to 64)
    pub fanout: usize,
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            db_latency_ms: env_or("DB_LATENCY_MS", 5),
            sample_size: env_or("BENCH_SAMPLE_SIZE", 100),
            fanout: env_or("BENCH_FANOUT", 64),
        }
    }
}

impl BenchConfig {
    pub fn new() -> Self {
        let config = Self::default();
        eprintln!("Benchmark Configuration:");
        eprintln!("  DB Latency: {}ms", config.db_latency_ms);
        eprintln!("  Sample Size: {}", config.sample_size);
        eprintln!("  Fanout: {}", config.fanout);
        config
    }
}
