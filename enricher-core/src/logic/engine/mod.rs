//! Engine Module - Cache-first, bounded fan-out enrichment
//!
//! One `handle` call classifies the indicator, answers from cache when it
//! can, and otherwise queries every registered provider concurrently under
//! a process-wide permit pool.
//!
//! # Components
//! - `types.rs`: `AggregateResult`, `EnrichError`
//! - `Enricher`: the aggregation engine
//! - `EnricherBuilder`: wires registry, cache, credentials and limits

pub mod types;

#[cfg(test)]
mod tests;

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::{self, JoinSet};

use crate::constants;
use crate::logic::cache::{cache_key, MemoryCache, ResultCache};
use crate::logic::credentials::{CredentialStore, EnvCredentials};
use crate::logic::fetch::{FetchClient, FetchConfig};
use crate::logic::indicator::Indicator;
use crate::logic::registry::{SourceDescriptor, SourceRegistry};
use crate::logic::sources::{Envelope, SourceContext};

pub use types::{AggregateResult, EnrichError};

// ============================================================================
// ENGINE
// ============================================================================

/// Aggregation engine. Share it behind an `Arc`; every request on the same
/// instance draws from one permit pool.
pub struct Enricher {
    registry: Arc<SourceRegistry>,
    cache: Arc<dyn ResultCache>,
    ctx: SourceContext,
    limiter: Arc<Semaphore>,
    max_concurrent: usize,
    cache_ttl: Duration,
}

impl Enricher {
    pub fn builder() -> EnricherBuilder {
        EnricherBuilder::default()
    }

    /// Enrich one raw indicator
    pub async fn handle(&self, raw: &str) -> Result<AggregateResult, EnrichError> {
        let indicator = Indicator::parse(raw);
        if !indicator.is_valid() {
            log::warn!("Rejected unclassifiable indicator '{}'", indicator.value);
            return Err(EnrichError::BadIndicator(indicator.value));
        }

        let key = cache_key(&indicator.value);
        if let Some(hit) = self.lookup(&key).await {
            log::debug!("Cache hit for {}", indicator.value);
            return Ok(hit);
        }

        if self.registry.is_empty() {
            return Err(EnrichError::NoSources);
        }

        let sources = self.dispatch(&indicator).await;
        let result = AggregateResult {
            indicator: indicator.value,
            indicator_type: indicator.kind,
            sources,
        };

        if result.is_cacheable() {
            self.store(&key, &result).await?;
        } else {
            log::info!(
                "Not caching {} ({} answers, errors: {})",
                result.indicator,
                result.sources.len(),
                result.has_errors()
            );
        }

        Ok(result)
    }

    /// Remove the cached aggregate for one indicator
    pub async fn invalidate(&self, raw: &str) -> Result<(), EnrichError> {
        let indicator = Indicator::parse(raw);
        if !indicator.is_valid() {
            return Err(EnrichError::BadIndicator(indicator.value));
        }
        self.cache.delete(&cache_key(&indicator.value)).await?;
        log::info!("Invalidated cached result for {}", indicator.value);
        Ok(())
    }

    pub async fn flush_cache(&self) -> Result<(), EnrichError> {
        self.cache.flush_all().await?;
        log::info!("Flushed result cache");
        Ok(())
    }

    /// Registered providers and whether each can run
    pub fn sources(&self) -> Vec<SourceDescriptor> {
        self.registry.descriptors(self.ctx.credentials.as_ref())
    }

    /// Provider calls currently holding a permit
    pub fn in_flight(&self) -> usize {
        self.max_concurrent.saturating_sub(self.limiter.available_permits())
    }

    pub fn available_permits(&self) -> usize {
        self.limiter.available_permits()
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    // ========================================================================
    // INTERNALS
    // ========================================================================

    /// Cache read; any failure counts as a miss
    async fn lookup(&self, key: &str) -> Option<AggregateResult> {
        match self.cache.get(key).await {
            Ok(Some(bytes)) => match serde_json::from_slice(&bytes) {
                Ok(result) => Some(result),
                Err(e) => {
                    log::warn!("Discarding undecodable cache entry {}: {}", key, e);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                log::warn!("Cache read failed for {}: {}", key, e);
                None
            }
        }
    }

    /// Cache write; backend failures are logged only
    async fn store(&self, key: &str, result: &AggregateResult) -> Result<(), EnrichError> {
        let bytes = serde_json::to_vec(result)?;
        match self.cache.set(key, bytes, self.cache_ttl).await {
            Ok(()) => log::debug!("Cached result for {}", result.indicator),
            Err(e) => log::error!("Cache write failed for {}: {}", result.indicator, e),
        }
        Ok(())
    }

    /// One task per provider, all joined before returning
    ///
    /// Dropping this future drops the `JoinSet`, which aborts every task
    /// still running and returns its permit.
    async fn dispatch(&self, indicator: &Indicator) -> BTreeMap<String, Envelope> {
        let mut tasks = JoinSet::new();
        let mut names: HashMap<task::Id, String> = HashMap::new();

        for (name, provider) in self.registry.get_all() {
            let provider = Arc::clone(provider);
            let limiter = Arc::clone(&self.limiter);
            let ctx = self.ctx.clone();
            let value = indicator.value.clone();
            let kind = indicator.kind;

            let handle = tasks.spawn(async move {
                let _permit = limiter.acquire_owned().await.ok()?;
                provider.fetch_for_type(&ctx, &value, kind).await
            });
            names.insert(handle.id(), name.clone());
        }

        let mut sources = BTreeMap::new();
        while let Some(joined) = tasks.join_next_with_id().await {
            match joined {
                Ok((id, Some(envelope))) => {
                    if let Some(name) = names.remove(&id) {
                        sources.insert(name, envelope);
                    }
                }
                Ok((id, None)) => {
                    names.remove(&id);
                }
                Err(e) => {
                    let name = names.remove(&e.id()).unwrap_or_default();
                    if e.is_panic() {
                        log::error!("Provider {} panicked on {}", name, indicator.value);
                    } else {
                        log::warn!("Provider {} was cancelled on {}", name, indicator.value);
                    }
                }
            }
        }

        log::info!(
            "Enriched {} ({}) with {} answers",
            indicator.value,
            indicator.kind,
            sources.len()
        );
        sources
    }
}

// ============================================================================
// BUILDER
// ============================================================================

/// Defaults: built-in providers, in-process cache, keys from the
/// environment, limits from `constants`.
#[derive(Default)]
pub struct EnricherBuilder {
    registry: Option<SourceRegistry>,
    cache: Option<Arc<dyn ResultCache>>,
    credentials: Option<Arc<dyn CredentialStore>>,
    client: Option<FetchClient>,
    max_concurrent: Option<usize>,
    cache_ttl: Option<Duration>,
}

impl EnricherBuilder {
    pub fn registry(mut self, registry: SourceRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn cache(mut self, cache: Arc<dyn ResultCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn credentials(mut self, credentials: Arc<dyn CredentialStore>) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn fetch_client(mut self, client: FetchClient) -> Self {
        self.client = Some(client);
        self
    }

    /// Zero is raised to one
    pub fn max_concurrent(mut self, permits: usize) -> Self {
        self.max_concurrent = Some(permits.max(1));
        self
    }

    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }

    pub fn build(self) -> Result<Enricher, EnrichError> {
        let client = match self.client {
            Some(client) => client,
            None => FetchClient::new(FetchConfig::from_env())?,
        };
        let credentials = self
            .credentials
            .unwrap_or_else(|| Arc::new(EnvCredentials));
        let max_concurrent = self
            .max_concurrent
            .unwrap_or_else(constants::get_max_concurrent_requests);

        log::info!("Enricher ready with {} permits", max_concurrent);

        Ok(Enricher {
            registry: Arc::new(self.registry.unwrap_or_else(SourceRegistry::with_builtin)),
            cache: self.cache.unwrap_or_else(|| Arc::new(MemoryCache::default())),
            ctx: SourceContext::new(client, credentials),
            limiter: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
            cache_ttl: self
                .cache_ttl
                .unwrap_or_else(|| Duration::from_secs(constants::get_cache_ttl_secs())),
        })
    }
}
