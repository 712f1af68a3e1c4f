//! Sources Module - External threat intelligence providers
//!
//! Every provider implements `IntelSource`: it builds its own request,
//! routes it through the shared `FetchClient` and maps the raw answer onto
//! an `Envelope`. Provider-specific parsing stays private to each file.
//!
//! # Components
//! - `types.rs`: `Verdict`, `Envelope`
//! - one file per provider
//!
//! Adding a provider means one file plus one line in `register_builtin`.

pub mod abuseipdb;
pub mod alienvault;
pub mod greynoise;
pub mod maltiverse;
pub mod stopforumspam;
pub mod threatminer;
pub mod tranco;
pub mod types;
pub mod virustotal;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::credentials::CredentialStore;
use super::fetch::{FetchClient, FetchError};
use super::indicator::IndicatorType;
use super::registry::SourceRegistry;

pub use abuseipdb::AbuseIpDbSource;
pub use alienvault::AlienVaultSource;
pub use greynoise::GreyNoiseSource;
pub use maltiverse::MaltiverseSource;
pub use stopforumspam::StopForumSpamSource;
pub use threatminer::ThreatMinerSource;
pub use tranco::TrancoSource;
pub use types::{Envelope, Verdict};
pub use virustotal::VirusTotalSource;

// ============================================================================
// CONTEXT
// ============================================================================

/// Shared collaborators handed to every provider call
#[derive(Clone)]
pub struct SourceContext {
    pub client: FetchClient,
    pub credentials: Arc<dyn CredentialStore>,
}

impl SourceContext {
    pub fn new(client: FetchClient, credentials: Arc<dyn CredentialStore>) -> Self {
        Self { client, credentials }
    }
}

// ============================================================================
// PROVIDER CONTRACT
// ============================================================================

/// One external intelligence source
///
/// Implementations hold only immutable endpoint configuration, so one
/// instance serves concurrent lookups for different indicators.
#[async_trait]
pub trait IntelSource: Send + Sync {
    /// Unique display name, used as the key in aggregate results
    fn name(&self) -> &str;

    fn requires_api_key(&self) -> bool;

    /// Look up `indicator` of type `kind`
    ///
    /// `None` when the source does not handle this type or is not
    /// configured. Call failures come back as an ERROR envelope.
    async fn fetch_for_type(
        &self,
        ctx: &SourceContext,
        indicator: &str,
        kind: IndicatorType,
    ) -> Option<Envelope> {
        let api_key = if self.requires_api_key() {
            match ctx.credentials.get_key(self.name()) {
                Some(key) => Some(key),
                None => {
                    log::debug!("{} has no API key configured, skipping", self.name());
                    return None;
                }
            }
        } else {
            None
        };

        self.query(ctx, api_key.as_deref(), indicator, kind).await
    }

    /// Provider-specific request and parsing, key already resolved
    async fn query(
        &self,
        ctx: &SourceContext,
        api_key: Option<&str>,
        indicator: &str,
        kind: IndicatorType,
    ) -> Option<Envelope>;
}

// ============================================================================
// REGISTRATION
// ============================================================================

/// Register every built-in provider
pub fn register_builtin(registry: &mut SourceRegistry) {
    registry.register("abuseipdb", || Arc::new(AbuseIpDbSource::default()));
    registry.register("alienvault", || Arc::new(AlienVaultSource::default()));
    registry.register("greynoise", || Arc::new(GreyNoiseSource::default()));
    registry.register("maltiverse", || Arc::new(MaltiverseSource::default()));
    registry.register("stopforumspam", || Arc::new(StopForumSpamSource::default()));
    registry.register("threatminer", || Arc::new(ThreatMinerSource::default()));
    registry.register("tranco", || Arc::new(TrancoSource::default()));
    registry.register("virustotal", || Arc::new(VirusTotalSource::default()));
}

// ============================================================================
// HELPERS
// ============================================================================

/// Convert a fetch failure into the provider's ERROR envelope
pub(crate) fn failure_envelope(source: &str, url: impl Into<String>, err: &FetchError) -> Envelope {
    log::error!("{}: {}", source, err);
    Envelope::error(url, err.to_string(), err.status())
}

/// Integer from a JSON number or a numeric string
pub(crate) fn lenient_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Body of a rejected call, parsed as JSON when possible
pub(crate) fn error_body(err: &FetchError) -> Value {
    match err.body() {
        Some(body) => serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_string())),
        None => Value::Object(Default::default()),
    }
}

/// Non-empty array, object or string
pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}
