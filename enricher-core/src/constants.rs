//! Central Configuration Constants
//!
//! Single source of truth for all configuration defaults.
//! Every value can be overridden through the environment at startup.

/// Process-wide ceiling on in-flight provider calls
pub const DEFAULT_MAX_CONCURRENT_REQUESTS: usize = 20;

/// Aggregate cache lifetime (seconds)
pub const DEFAULT_CACHE_TTL_SECS: u64 = 3600;

/// Per-attempt timeout for outbound calls (seconds)
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 10;

/// Extra attempts after a 5xx response
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Upper bound of the in-process cache
pub const CACHE_MAX_ENTRIES: usize = 10_000;

/// Prefix for every cache key
pub const CACHE_KEY_PREFIX: &str = "enrich:";

/// User agent sent to every provider
pub const USER_AGENT: &str = concat!("ioc-enricher/", env!("CARGO_PKG_VERSION"));

// ============================================
// Helper functions to read from env with fallback
// ============================================

/// Get the concurrency ceiling from environment or use default
pub fn get_max_concurrent_requests() -> usize {
    std::env::var("ENRICHER_MAX_CONCURRENT_REQUESTS")
        .ok()
        .and_then(|s| s.parse().ok())
        .filter(|n| *n > 0)
        .unwrap_or(DEFAULT_MAX_CONCURRENT_REQUESTS)
}

/// Get cache TTL from environment or use default
pub fn get_cache_ttl_secs() -> u64 {
    std::env::var("ENRICHER_CACHE_TTL_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_CACHE_TTL_SECS)
}

/// Get per-attempt fetch timeout from environment or use default
pub fn get_fetch_timeout_secs() -> u64 {
    std::env::var("ENRICHER_FETCH_TIMEOUT_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_FETCH_TIMEOUT_SECS)
}

/// Get retry budget from environment or use default
pub fn get_max_retries() -> u32 {
    std::env::var("ENRICHER_MAX_RETRIES")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_MAX_RETRIES)
}
