//! IOC Enricher core library
//!
//! Classifies an indicator of compromise and aggregates verdicts from
//! external threat-intelligence providers.

pub mod constants;
pub mod logic;

#[cfg(test)]
mod test_support;

pub use logic::cache::{cache_key, CacheError, MemoryCache, ResultCache};
#[cfg(feature = "redis")]
pub use logic::cache::RedisCache;
pub use logic::credentials::{CredentialStore, EnvCredentials, StaticCredentials};
pub use logic::engine::{AggregateResult, EnrichError, Enricher, EnricherBuilder};
pub use logic::fetch::{FetchClient, FetchConfig, FetchError, FetchRequest, FetchResponse};
pub use logic::indicator::{classify, is_valid, Indicator, IndicatorType};
pub use logic::registry::{SourceDescriptor, SourceRegistry};
pub use logic::sources::{Envelope, IntelSource, SourceContext, Verdict};
