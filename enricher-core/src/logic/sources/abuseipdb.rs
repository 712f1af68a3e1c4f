//! AbuseIPDB - community abuse reports for IP addresses

use async_trait::async_trait;
use serde_json::Value;

use super::{failure_envelope, Envelope, IntelSource, SourceContext, Verdict};
use crate::logic::fetch::FetchRequest;
use crate::logic::indicator::IndicatorType;

const API_URL: &str = "https://api.abuseipdb.com/api/v2/check";
const MAX_AGE_DAYS: &str = "90";

pub struct AbuseIpDbSource {
    api_url: String,
}

impl Default for AbuseIpDbSource {
    fn default() -> Self {
        Self { api_url: API_URL.to_string() }
    }
}

impl AbuseIpDbSource {
    pub const NAME: &'static str = "AbuseIPDB";

    pub fn with_api_url(api_url: impl Into<String>) -> Self {
        Self { api_url: api_url.into() }
    }
}

#[async_trait]
impl IntelSource for AbuseIpDbSource {
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
        if !kind.is_ip() {
            return None;
        }

        let request = FetchRequest::get(&self.api_url)
            .header("Accept", "application/json")
            .header("Key", api_key.unwrap_or_default())
            .query("ipAddress", indicator)
            .query("maxAgeInDays", MAX_AGE_DAYS);

        match ctx.client.execute(request).await {
            Ok(response) => Some(parse_intel(&response.data)),
            Err(e) => Some(failure_envelope(Self::NAME, report_url(indicator), &e)),
        }
    }
}

fn report_url(ip: &str) -> String {
    format!("https://www.abuseipdb.com/check/{}", ip)
}

/// Confidence > 49 is malicious, any confidence or any report is suspicious
fn parse_intel(intel: &Value) -> Envelope {
    let data = &intel["data"];

    let confidence = data["abuseConfidenceScore"].as_i64().unwrap_or(0);
    let total_reports = data["totalReports"].as_i64().unwrap_or(0);

    let mut verdict = if confidence > 49 {
        Verdict::Malicious
    } else if confidence > 0 {
        Verdict::Suspicious
    } else {
        Verdict::Benign
    };

    if verdict == Verdict::Benign && total_reports > 0 {
        verdict = Verdict::Suspicious;
    }

    Envelope::new(
        format!("Confidence: {}, total reports: {}", confidence, total_reports),
        verdict,
        report_url(data["ipAddress"].as_str().unwrap_or_default()),
        data.clone(),
    )
}
