//! In-process result cache

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{CacheError, ResultCache};
use crate::constants::CACHE_MAX_ENTRIES;

struct CachedEntry {
    value: Vec<u8>,
    stored_at: Instant,
    expires_at: Instant,
}

pub struct MemoryCache {
    entries: RwLock<HashMap<String, CachedEntry>>,
    max_entries: usize,
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(CACHE_MAX_ENTRIES)
    }
}

impl MemoryCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            max_entries: max_entries.max(1),
        }
    }

    /// Live and expired entries currently held
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Drop expired entries, then the oldest tenth if still full
    fn make_room(entries: &mut HashMap<String, CachedEntry>, max_entries: usize) {
        let now = Instant::now();
        entries.retain(|_, entry| entry.expires_at > now);

        if entries.len() < max_entries {
            return;
        }

        let mut by_age: Vec<(String, Instant)> = entries
            .iter()
            .map(|(key, entry)| (key.clone(), entry.stored_at))
            .collect();
        by_age.sort_by(|a, b| a.1.cmp(&b.1));

        let evict = (max_entries / 10).max(1);
        for (key, _) in by_age.into_iter().take(evict) {
            entries.remove(&key);
        }
        log::debug!("Result cache full, evicted {} entries", evict);
    }
}

#[async_trait]
impl ResultCache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let entries = self.entries.read();
        Ok(entries
            .get(key)
            .filter(|entry| entry.expires_at > Instant::now())
            .map(|entry| entry.value.clone()))
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        let mut entries = self.entries.write();
        if !entries.contains_key(key) && entries.len() >= self.max_entries {
            Self::make_room(&mut entries, self.max_entries);
        }

        let now = Instant::now();
        entries.insert(
            key.to_string(),
            CachedEntry { value, stored_at: now, expires_at: now + ttl },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.entries.write().remove(key);
        Ok(())
    }

    async fn flush_all(&self) -> Result<(), CacheError> {
        self.entries.write().clear();
        Ok(())
    }
}
