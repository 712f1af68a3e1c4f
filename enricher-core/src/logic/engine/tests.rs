use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use super::*;
use crate::logic::cache::CacheError;
use crate::logic::credentials::StaticCredentials;
use crate::logic::indicator::IndicatorType;
use crate::logic::sources::{IntelSource, Verdict};
use crate::test_support::{fetch_client, init_logging};

// ============================================================================
// FAKES
// ============================================================================

#[derive(Clone, Copy)]
enum Behavior {
    Answer(Verdict),
    Skip,
    Fail,
    Panic,
}

/// Shared instrumentation across every fake in one test
#[derive(Default)]
struct Probe {
    calls: AtomicUsize,
    current: AtomicUsize,
    peak: AtomicUsize,
}

struct FakeSource {
    name: &'static str,
    behavior: Behavior,
    delay: Duration,
    probe: Arc<Probe>,
}

#[async_trait]
impl IntelSource for FakeSource {
    fn name(&self) -> &str {
        self.name
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
        self.probe.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.probe.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.probe.peak.fetch_max(now, Ordering::SeqCst);

        tokio::time::sleep(self.delay).await;
        self.probe.current.fetch_sub(1, Ordering::SeqCst);

        match self.behavior {
            Behavior::Answer(verdict) => Some(Envelope::new(
                format!("{} says {}", self.name, verdict.as_str()),
                verdict,
                format!("https://{}.test/{}", self.name, indicator),
                json!({}),
            )),
            Behavior::Skip => None,
            Behavior::Fail => Some(Envelope::error("https://fail.test", "503 Service Unavailable", Some(503))),
            Behavior::Panic => panic!("provider blew up"),
        }
    }
}

fn registry(probe: &Arc<Probe>, fakes: &[(&'static str, Behavior)], delay: Duration) -> SourceRegistry {
    let mut registry = SourceRegistry::new();
    for &(name, behavior) in fakes {
        let probe = Arc::clone(probe);
        registry.register(name, move || {
            Arc::new(FakeSource { name, behavior, delay, probe: Arc::clone(&probe) })
        });
    }
    registry
}

fn enricher(registry: SourceRegistry, permits: usize) -> Enricher {
    init_logging();
    Enricher::builder()
        .registry(registry)
        .cache(Arc::new(MemoryCache::default()))
        .credentials(Arc::new(StaticCredentials::new()))
        .fetch_client(fetch_client())
        .max_concurrent(permits)
        .cache_ttl(Duration::from_secs(60))
        .build()
        .unwrap()
}

fn simple(fakes: &[(&'static str, Behavior)]) -> (Enricher, Arc<Probe>) {
    let probe = Arc::new(Probe::default());
    let engine = enricher(registry(&probe, fakes, Duration::ZERO), 20);
    (engine, probe)
}

/// Cache that refuses every operation
struct BrokenCache;

#[async_trait]
impl ResultCache for BrokenCache {
    async fn get(&self, _: &str) -> Result<Option<Vec<u8>>, CacheError> {
        Err(CacheError::Backend("down".into()))
    }
    async fn set(&self, _: &str, _: Vec<u8>, _: Duration) -> Result<(), CacheError> {
        Err(CacheError::Backend("down".into()))
    }
    async fn delete(&self, _: &str) -> Result<(), CacheError> {
        Err(CacheError::Backend("down".into()))
    }
    async fn flush_all(&self) -> Result<(), CacheError> {
        Err(CacheError::Backend("down".into()))
    }
}

// ============================================================================
// CLASSIFICATION
// ============================================================================

#[tokio::test]
async fn test_unclassifiable_input_is_rejected_before_dispatch() {
    let (engine, probe) = simple(&[("A", Behavior::Answer(Verdict::Benign))]);

    for raw in ["not-a-thing!!", "", "   ", "hello", "1234"] {
        let err = engine.handle(raw).await.unwrap_err();
        assert!(matches!(err, EnrichError::BadIndicator(_)), "{raw:?}");
    }
    assert_eq!(probe.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_empty_registry_is_no_sources() {
    let engine = enricher(SourceRegistry::new(), 4);
    assert!(matches!(engine.handle("8.8.8.8").await, Err(EnrichError::NoSources)));
}

// ============================================================================
// AGGREGATION
// ============================================================================

#[tokio::test]
async fn test_only_answering_providers_appear() {
    let (engine, _) = simple(&[
        ("A", Behavior::Answer(Verdict::Suspicious)),
        ("B", Behavior::Skip),
    ]);

    let result = engine.handle("8.8.8.8").await.unwrap();

    assert_eq!(
        serde_json::to_value(&result).unwrap(),
        json!({
            "indicator": "8.8.8.8",
            "type": "IPv4",
            "sources": {
                "A": {
                    "summary": "A says SUSPICIOUS",
                    "verdict": "SUSPICIOUS",
                    "url": "https://A.test/8.8.8.8",
                    "data": {}
                }
            }
        })
    );
}

#[tokio::test]
async fn test_indicator_is_trimmed() {
    let (engine, _) = simple(&[("A", Behavior::Answer(Verdict::Benign))]);

    let result = engine.handle("  example.com\n").await.unwrap();
    assert_eq!(result.indicator, "example.com");
    assert_eq!(result.indicator_type, IndicatorType::Domain);
}

#[tokio::test]
async fn test_failing_and_panicking_providers_are_isolated() {
    let (engine, _) = simple(&[
        ("Healthy", Behavior::Answer(Verdict::Malicious)),
        ("Other", Behavior::Answer(Verdict::Benign)),
        ("Broken", Behavior::Fail),
        ("Crashy", Behavior::Panic),
    ]);

    let result = engine.handle("44d88612fea8a8f36de82e1278abb02f").await.unwrap();

    assert_eq!(result.indicator_type, IndicatorType::Hash);
    assert_eq!(result.sources["Healthy"].verdict, Verdict::Malicious);
    assert_eq!(result.sources["Other"].verdict, Verdict::Benign);
    assert_eq!(result.sources["Broken"].verdict, Verdict::Error);
    assert_eq!(result.sources["Broken"].status_code, Some(503));
    assert!(!result.sources.contains_key("Crashy"));
}

// ============================================================================
// CACHING
// ============================================================================

#[tokio::test]
async fn test_repeat_within_ttl_is_served_from_cache() {
    let (engine, probe) = simple(&[
        ("A", Behavior::Answer(Verdict::Benign)),
        ("B", Behavior::Answer(Verdict::Suspicious)),
    ]);

    let first = engine.handle("example.com").await.unwrap();
    let second = engine.handle("example.com").await.unwrap();

    assert_eq!(first, second);
    assert_eq!(probe.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_error_answer_suppresses_caching() {
    let (engine, probe) = simple(&[
        ("A", Behavior::Answer(Verdict::Benign)),
        ("B", Behavior::Fail),
    ]);

    engine.handle("example.com").await.unwrap();
    engine.handle("example.com").await.unwrap();

    assert_eq!(probe.calls.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn test_empty_aggregate_is_not_cached() {
    let (engine, probe) = simple(&[("A", Behavior::Skip), ("B", Behavior::Skip)]);

    let result = engine.handle("http://example.com/login").await.unwrap();
    assert!(result.sources.is_empty());
    assert_eq!(result.indicator_type, IndicatorType::Url);

    engine.handle("http://example.com/login").await.unwrap();
    assert_eq!(probe.calls.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn test_invalidate_and_flush_force_redispatch() {
    let (engine, probe) = simple(&[("A", Behavior::Answer(Verdict::Benign))]);

    engine.handle("1.1.1.1").await.unwrap();
    engine.handle("1.1.1.1").await.unwrap();
    assert_eq!(probe.calls.load(Ordering::SeqCst), 1);

    engine.invalidate(" 1.1.1.1 ").await.unwrap();
    engine.handle("1.1.1.1").await.unwrap();
    assert_eq!(probe.calls.load(Ordering::SeqCst), 2);

    engine.flush_cache().await.unwrap();
    engine.handle("1.1.1.1").await.unwrap();
    assert_eq!(probe.calls.load(Ordering::SeqCst), 3);

    assert!(matches!(engine.invalidate("???").await, Err(EnrichError::BadIndicator(_))));
}

#[tokio::test]
async fn test_undecodable_entry_is_a_miss() {
    let cache = Arc::new(MemoryCache::default());
    cache
        .set(&cache_key("8.8.4.4"), b"not json".to_vec(), Duration::from_secs(60))
        .await
        .unwrap();

    let probe = Arc::new(Probe::default());
    let engine = Enricher::builder()
        .registry(registry(&probe, &[("A", Behavior::Answer(Verdict::Benign))], Duration::ZERO))
        .cache(cache.clone())
        .credentials(Arc::new(StaticCredentials::new()))
        .fetch_client(fetch_client())
        .build()
        .unwrap();

    let result = engine.handle("8.8.4.4").await.unwrap();
    assert_eq!(result.sources.len(), 1);
    assert_eq!(probe.calls.load(Ordering::SeqCst), 1);

    let stored = cache.get(&cache_key("8.8.4.4")).await.unwrap().unwrap();
    let decoded: AggregateResult = serde_json::from_slice(&stored).unwrap();
    assert_eq!(decoded, result);
}

#[tokio::test]
async fn test_broken_cache_degrades_to_live_lookups() {
    let probe = Arc::new(Probe::default());
    let engine = Enricher::builder()
        .registry(registry(&probe, &[("A", Behavior::Answer(Verdict::Benign))], Duration::ZERO))
        .cache(Arc::new(BrokenCache))
        .credentials(Arc::new(StaticCredentials::new()))
        .fetch_client(fetch_client())
        .build()
        .unwrap();

    engine.handle("8.8.8.8").await.unwrap();
    engine.handle("8.8.8.8").await.unwrap();
    assert_eq!(probe.calls.load(Ordering::SeqCst), 2);

    assert!(matches!(engine.flush_cache().await, Err(EnrichError::Cache(_))));
}

// ============================================================================
// CONCURRENCY
// ============================================================================

#[tokio::test]
async fn test_permits_bound_calls_across_requests() {
    let probe = Arc::new(Probe::default());
    let fakes = [
        ("A", Behavior::Answer(Verdict::Benign)),
        ("B", Behavior::Answer(Verdict::Benign)),
        ("C", Behavior::Answer(Verdict::Benign)),
        ("D", Behavior::Answer(Verdict::Benign)),
        ("E", Behavior::Answer(Verdict::Benign)),
    ];
    let engine = Arc::new(enricher(registry(&probe, &fakes, Duration::from_millis(20)), 3));

    let mut requests = JoinSet::new();
    for ip in ["10.0.0.1", "10.0.0.2", "10.0.0.3", "10.0.0.4"] {
        let engine = Arc::clone(&engine);
        requests.spawn(async move { engine.handle(ip).await });
    }
    while let Some(joined) = requests.join_next().await {
        assert_eq!(joined.unwrap().unwrap().sources.len(), 5);
    }

    assert_eq!(probe.calls.load(Ordering::SeqCst), 20);
    assert!(probe.peak.load(Ordering::SeqCst) <= 3);
    assert_eq!(engine.available_permits(), 3);
    assert_eq!(engine.in_flight(), 0);
}

#[tokio::test]
async fn test_cancellation_releases_permits() {
    let probe = Arc::new(Probe::default());
    let fakes = [
        ("A", Behavior::Answer(Verdict::Benign)),
        ("B", Behavior::Answer(Verdict::Benign)),
        ("C", Behavior::Answer(Verdict::Benign)),
    ];
    let engine = Arc::new(enricher(registry(&probe, &fakes, Duration::from_secs(30)), 2));

    let running = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move { engine.handle("9.9.9.9").await })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(engine.in_flight(), 2);

    running.abort();
    assert!(running.await.unwrap_err().is_cancelled());
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(engine.available_permits(), 2);
    assert_eq!(engine.in_flight(), 0);
}

#[tokio::test]
async fn test_deadline_drops_inflight_work() {
    let probe = Arc::new(Probe::default());
    let engine = enricher(
        registry(&probe, &[("Slow", Behavior::Answer(Verdict::Benign))], Duration::from_secs(30)),
        1,
    );

    let outcome = tokio::time::timeout(Duration::from_millis(50), engine.handle("9.9.9.9")).await;
    assert!(outcome.is_err());

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(engine.available_permits(), 1);
}

// ============================================================================
// INTROSPECTION
// ============================================================================

#[test]
fn test_sources_lists_registered_providers() {
    let (engine, _) = simple(&[
        ("B", Behavior::Skip),
        ("A", Behavior::Skip),
    ]);

    let names: Vec<String> = engine.sources().into_iter().map(|d| d.name).collect();
    assert_eq!(names, vec!["A", "B"]);
    assert!(engine.sources().iter().all(|d| d.configured));
    assert_eq!(engine.max_concurrent(), 20);
}
