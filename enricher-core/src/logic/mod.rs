//! Logic Module - Indicator enrichment pipeline
//!
//! ## Flow
//! raw string -> `indicator` -> `engine` (cache, `registry` fan-out) ->
//! `sources` over `fetch` -> `AggregateResult`
//!
//! - `indicator/` - classification
//! - `fetch/` - retrying HTTP client
//! - `sources/` - provider contract and providers
//! - `registry.rs` - provider registration
//! - `cache/` - result cache backends
//! - `credentials.rs` - API key lookup
//! - `engine/` - aggregation

pub mod cache;
pub mod credentials;
pub mod engine;
pub mod fetch;
pub mod indicator;
pub mod registry;
pub mod sources;
