//! ThreatMiner - report mentions for hosts, domains and samples

use async_trait::async_trait;
use serde_json::Value;

use super::{failure_envelope, lenient_int, Envelope, IntelSource, SourceContext, Verdict};
use crate::logic::fetch::FetchRequest;
use crate::logic::indicator::IndicatorType;

const API_BASE: &str = "https://api.threatminer.org/v2";
const REFERENCE_PAGE: &str = "https://www.threatminer.org/index.php";

pub struct ThreatMinerSource {
    api_base: String,
}

impl Default for ThreatMinerSource {
    fn default() -> Self {
        Self { api_base: API_BASE.to_string() }
    }
}

impl ThreatMinerSource {
    pub const NAME: &'static str = "ThreatMiner";

    pub fn with_api_base(api_base: impl Into<String>) -> Self {
        Self { api_base: api_base.into() }
    }

    fn search_url(&self, indicator: &str, kind: IndicatorType) -> Option<String> {
        let (endpoint, report_type) = match kind {
            IndicatorType::IPv4 | IndicatorType::IPv6 => ("host.php", 6),
            IndicatorType::Domain => ("domain.php", 6),
            IndicatorType::Hash => ("sample.php", 7),
            IndicatorType::Url | IndicatorType::Unknown => return None,
        };
        Some(format!("{}/{}?q={}&rt={}", self.api_base, endpoint, indicator, report_type))
    }
}

#[async_trait]
impl IntelSource for ThreatMinerSource {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn requires_api_key(&self) -> bool {
        false
    }

    async fn query(
        &self,
        ctx: &SourceContext,
        _api_key: Option<&str>,
        indicator: &str,
        kind: IndicatorType,
    ) -> Option<Envelope> {
        let url = self.search_url(indicator, kind)?;

        let response = match ctx.client.execute(FetchRequest::get(&url)).await {
            Ok(response) => response,
            Err(e) => return Some(failure_envelope(Self::NAME, url, &e)),
        };

        Some(interpret(&response.data, &url))
    }
}

/// The API answers HTTP 200 and carries the real status in the body
fn interpret(intel: &Value, request_url: &str) -> Envelope {
    let status = match &intel["status_code"] {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    };

    match status.as_str() {
        "200" | "404" => parse_intel(intel),
        _ => {
            let message = intel["status_message"].as_str().unwrap_or("Error");
            log::error!("ThreatMiner returned status {:?}: {}", status, message);
            let code = lenient_int(&intel["status_code"]).and_then(|c| u16::try_from(c).ok());
            Envelope::error(request_url, message, code)
        }
    }
}

/// Any report mention is suspicious
fn parse_intel(intel: &Value) -> Envelope {
    let results = &intel["results"];
    let count = results.as_array().map(Vec::len).unwrap_or(0);

    let (summary, verdict) = if count > 0 {
        (format!("Appears in {} reports", count), Verdict::Suspicious)
    } else {
        ("No results".to_string(), Verdict::Benign)
    };

    Envelope::new(summary, verdict, REFERENCE_PAGE, results.clone())
}
