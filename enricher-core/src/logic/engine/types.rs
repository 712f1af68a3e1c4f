//! Engine Types - aggregate result and engine errors

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::logic::cache::CacheError;
use crate::logic::indicator::IndicatorType;
use crate::logic::sources::Envelope;

/// Every provider's answer for one indicator
///
/// `sources` holds only providers that returned data, keyed by provider name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateResult {
    pub indicator: String,
    #[serde(rename = "type")]
    pub indicator_type: IndicatorType,
    pub sources: BTreeMap<String, Envelope>,
}

impl AggregateResult {
    /// Worth caching: at least one answer and no provider failed
    pub fn is_cacheable(&self) -> bool {
        !self.sources.is_empty() && !self.sources.values().any(Envelope::is_error)
    }

    pub fn has_errors(&self) -> bool {
        self.sources.values().any(Envelope::is_error)
    }
}

#[derive(Debug, Error)]
pub enum EnrichError {
    #[error("indicator '{0}' is not an IP, domain, URL or hash")]
    BadIndicator(String),

    #[error("no intelligence sources registered")]
    NoSources,

    #[error("result serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}
