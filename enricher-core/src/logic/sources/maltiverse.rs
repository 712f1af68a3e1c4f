//! Maltiverse - aggregated blacklists and threat flags

use async_trait::async_trait;
use serde_json::Value;
use sha2::{Digest, Sha256};

use super::{error_body, failure_envelope, is_truthy, Envelope, IntelSource, SourceContext, Verdict};
use crate::logic::fetch::FetchRequest;
use crate::logic::indicator::{HashKind, IndicatorType};

const API_BASE: &str = "https://api.maltiverse.com";

/// Each flag present in a response adds one to the score
const THREAT_FLAGS: [&str; 9] = [
    "is_cnc",
    "is_distributing_malware",
    "is_iot_threat",
    "is_mining_pool",
    "is_phishing",
    "is_storing_phishing",
    "is_known_attacker",
    "is_known_scanner",
    "is_tor_node",
];

const INDICATOR_FIELDS: [&str; 4] = ["ip_addr", "hostname", "url", "sha256"];

pub struct MaltiverseSource {
    api_base: String,
}

impl Default for MaltiverseSource {
    fn default() -> Self {
        Self { api_base: API_BASE.to_string() }
    }
}

impl MaltiverseSource {
    pub const NAME: &'static str = "Maltiverse";

    pub fn with_api_base(api_base: impl Into<String>) -> Self {
        Self { api_base: api_base.into() }
    }
}

/// Resource path and lookup id; URLs are addressed by their SHA-256
fn endpoint(indicator: &str, kind: IndicatorType) -> Option<(&'static str, String)> {
    match kind {
        IndicatorType::IPv4 => Some(("ip", indicator.to_string())),
        IndicatorType::Domain => Some(("hostname", indicator.to_string())),
        IndicatorType::Url => Some(("url", hex::encode(Sha256::digest(indicator.as_bytes())))),
        IndicatorType::Hash => match HashKind::from_digest(indicator)? {
            HashKind::Sha256 => Some(("sample", indicator.to_string())),
            HashKind::Sha1 => Some(("sha1", indicator.to_string())),
            HashKind::Md5 => Some(("md5", indicator.to_string())),
        },
        IndicatorType::IPv6 | IndicatorType::Unknown => None,
    }
}

fn search_url(indicator: &str) -> String {
    format!("https://maltiverse.com/intelligence/search;query={}", indicator)
}

#[async_trait]
impl IntelSource for MaltiverseSource {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn requires_api_key(&self) -> bool {
        true
    }

    async fn query(
        &self,
        ctx: &SourceContext,
        api_key: Option<&str>,
        indicator: &str,
        kind: IndicatorType,
    ) -> Option<Envelope> {
        let (resource, id) = endpoint(indicator, kind)?;

        let request = FetchRequest::get(format!("{}/{}/{}", self.api_base, resource, id))
            .header("accept", "application/json")
            .header("Authorization", format!("Bearer {}", api_key.unwrap_or_default()));

        match ctx.client.execute(request).await {
            Ok(response) => Some(parse_intel(&response.data, indicator)),
            Err(e) => match e.status() {
                Some(429) => {
                    log::error!("Maltiverse rate-limit exceeded: {}", e);
                    Some(Envelope::error(search_url(indicator), e.to_string(), Some(429)))
                }
                Some(404) => {
                    log::info!("Indicator {} not found in Maltiverse", indicator);
                    Some(Envelope::new(
                        "Indicator not observed by Maltiverse",
                        Verdict::Benign,
                        search_url(indicator),
                        error_body(&e),
                    ))
                }
                _ => Some(failure_envelope(Self::NAME, search_url(indicator), &e)),
            },
        }
    }
}

/// Score = threat flags present + 1 if blacklisted; more than two blacklist
/// entries or a malicious classification force malicious.
fn parse_intel(intel: &Value, requested: &str) -> Envelope {
    let empty = serde_json::Map::new();
    let fields = intel.as_object().unwrap_or(&empty);

    let mut score = THREAT_FLAGS.iter().filter(|flag| fields.contains_key(**flag)).count() as i64;

    let blacklist = &intel["blacklist"];
    if is_truthy(blacklist) {
        score += 1;
        let entries = blacklist.as_array().map(Vec::len).unwrap_or(1);
        if entries > 2 {
            score = 2;
        }
    }

    let classification = intel["classification"].as_str();
    if classification == Some("malicious") {
        score = 2;
    }

    let indicator = INDICATOR_FIELDS
        .iter()
        .filter_map(|field| fields.get(*field).and_then(Value::as_str))
        .last()
        .unwrap_or(requested);

    Envelope::new(
        format!("Classification: {}", classification.unwrap_or("unknown")),
        Verdict::from_score(score),
        search_url(indicator),
        intel.clone(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_endpoints() {
        assert_eq!(endpoint("1.2.3.4", IndicatorType::IPv4), Some(("ip", "1.2.3.4".to_string())));
        assert_eq!(endpoint("::1", IndicatorType::IPv6), None);
        assert_eq!(endpoint("d41d8cd98f00b204e9800998ecf8427e", IndicatorType::Hash).unwrap().0, "md5");

        let (resource, id) = endpoint("http://example.com/", IndicatorType::Url).unwrap();
        assert_eq!(resource, "url");
        assert_eq!(id.len(), 64);
        assert_eq!(id, hex::encode(Sha256::digest(b"http://example.com/")));
    }

    #[test]
    fn test_flags_accumulate() {
        let env = parse_intel(&json!({"ip_addr": "1.2.3.4", "is_tor_node": true, "classification": "suspicious"}), "1.2.3.4");
        assert_eq!(env.verdict, Verdict::Suspicious);
        assert_eq!(env.summary, "Classification: suspicious");
        assert_eq!(env.url, "https://maltiverse.com/intelligence/search;query=1.2.3.4");

        let env = parse_intel(&json!({"is_cnc": true, "is_phishing": true}), "x.com");
        assert_eq!(env.verdict, Verdict::Malicious);
    }

    #[test]
    fn test_blacklist_rules() {
        let one = json!({"hostname": "bad.com", "blacklist": [{"source": "a"}]});
        assert_eq!(parse_intel(&one, "bad.com").verdict, Verdict::Suspicious);

        let many = json!({"hostname": "bad.com", "blacklist": [{"source": "a"}, {"source": "b"}, {"source": "c"}]});
        assert_eq!(parse_intel(&many, "bad.com").verdict, Verdict::Malicious);

        let none = json!({"hostname": "ok.com", "blacklist": [], "classification": "neutral"});
        assert_eq!(parse_intel(&none, "ok.com").verdict, Verdict::Benign);
    }

    #[test]
    fn test_malicious_classification_wins() {
        let env = parse_intel(&json!({"classification": "malicious"}), "evil.com");
        assert_eq!(env.verdict, Verdict::Malicious);
    }

    #[tokio::test]
    async fn test_not_found_and_rate_limit() {
        use crate::logic::credentials::StaticCredentials;
        use crate::test_support::{context, serve};
        use axum::extract::Path;
        use axum::http::{HeaderMap, StatusCode};
        use axum::response::IntoResponse;
        use axum::routing::get;
        use axum::Router;

        async fn lookup(Path(ip): Path<String>, headers: HeaderMap) -> axum::response::Response {
            assert_eq!(headers["authorization"], "Bearer k");
            match ip.as_str() {
                "10.0.0.1" => (
                    StatusCode::NOT_FOUND,
                    axum::Json(json!({"status": "error", "message": "Not found"})),
                )
                    .into_response(),
                _ => (StatusCode::TOO_MANY_REQUESTS, "quota exceeded").into_response(),
            }
        }
        let base = serve(Router::new().route("/ip/:ip", get(lookup))).await;
        let source = MaltiverseSource::with_api_base(base);
        let ctx = context(StaticCredentials::new().with_key(MaltiverseSource::NAME, "k"));

        let env = source.fetch_for_type(&ctx, "10.0.0.1", IndicatorType::IPv4).await.unwrap();
        assert_eq!(env.verdict, Verdict::Benign);
        assert_eq!(env.summary, "Indicator not observed by Maltiverse");
        assert_eq!(env.data["message"], json!("Not found"));
        assert_eq!(env.url, "https://maltiverse.com/intelligence/search;query=10.0.0.1");

        let env = source.fetch_for_type(&ctx, "10.0.0.2", IndicatorType::IPv4).await.unwrap();
        assert_eq!(env.verdict, Verdict::Error);
        assert_eq!(env.status_code, Some(429));
    }
}
