//! Test fixtures: an engine over one in-process provider

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use enricher_core::{
    Enricher, Envelope, FetchClient, FetchConfig, IndicatorType, IntelSource, MemoryCache, SourceContext,
    SourceRegistry, StaticCredentials, Verdict,
};
use serde_json::json;

use crate::config::Config;
use crate::jobs::JobStore;
use crate::AppState;

#[derive(Clone, Copy)]
pub enum Fake {
    /// Answers SUSPICIOUS immediately
    Quick,
    /// Never answers within a test's lifetime
    Hanging,
}

struct FakeSource(Fake);

#[async_trait]
impl IntelSource for FakeSource {
    fn name(&self) -> &str {
        "Fake"
    }

    fn requires_api_key(&self) -> bool {
        false
    }

    async fn query(
        &self,
        _ctx: &SourceContext,
        _api_key: Option<&str>,
        indicator: &str,
        _kind: IndicatorType,
    ) -> Option<Envelope> {
        if let Fake::Hanging = self.0 {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        Some(Envelope::new(
            "seen once",
            Verdict::Suspicious,
            format!("https://fake.test/{}", indicator),
            json!({"hits": 1}),
        ))
    }
}

pub fn enricher(fake: Fake) -> Arc<Enricher> {
    let mut registry = SourceRegistry::new();
    registry.register("fake", move || Arc::new(FakeSource(fake)));

    let client = FetchClient::new(FetchConfig { timeout: Duration::from_secs(1), max_retries: 0 }).unwrap();
    let enricher = Enricher::builder()
        .registry(registry)
        .cache(Arc::new(MemoryCache::default()))
        .credentials(Arc::new(StaticCredentials::new()))
        .fetch_client(client)
        .max_concurrent(4)
        .build()
        .unwrap();
    Arc::new(enricher)
}

pub fn state(fake: Fake) -> AppState {
    let config = Config { job_timeout_secs: 1, ..Config::default() };
    AppState {
        enricher: enricher(fake),
        jobs: Arc::new(JobStore::new(config.job_timeout(), config.job_retention())),
        config,
    }
}
