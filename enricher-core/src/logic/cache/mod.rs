//! Cache Module - TTL-bounded storage for serialized aggregate results
//!
//! # Components
//! - `memory.rs`: in-process store, default backend
//! - `redis.rs`: shared Redis store (feature `redis`)

pub mod memory;
#[cfg(feature = "redis")]
pub mod redis;

use std::time::Duration;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::constants::CACHE_KEY_PREFIX;

pub use memory::MemoryCache;
#[cfg(feature = "redis")]
pub use self::redis::RedisCache;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend unavailable: {0}")]
    Backend(String),
}

#[cfg(feature = "redis")]
impl From<::redis::RedisError> for CacheError {
    fn from(e: ::redis::RedisError) -> Self {
        CacheError::Backend(e.to_string())
    }
}

/// Key-value store with per-entry expiry
#[async_trait]
pub trait ResultCache: Send + Sync {
    /// `None` on miss or expiry
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError>;

    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    async fn flush_all(&self) -> Result<(), CacheError>;
}

/// Cache key for an indicator: prefixed SHA-256 hex of the trimmed value
pub fn cache_key(indicator: &str) -> String {
    let digest = Sha256::digest(indicator.trim().as_bytes());
    format!("{}{}", CACHE_KEY_PREFIX, hex::encode(digest))
}
