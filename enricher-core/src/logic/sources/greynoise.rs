//! GreyNoise Community - internet background noise classification

use async_trait::async_trait;
use serde_json::Value;

use super::{error_body, failure_envelope, is_truthy, Envelope, IntelSource, SourceContext, Verdict};
use crate::logic::fetch::FetchRequest;
use crate::logic::indicator::IndicatorType;

const API_BASE: &str = "https://api.greynoise.io/v3/community";

pub struct GreyNoiseSource {
    api_base: String,
}

impl Default for GreyNoiseSource {
    fn default() -> Self {
        Self { api_base: API_BASE.to_string() }
    }
}

impl GreyNoiseSource {
    pub const NAME: &'static str = "GreyNoise Community";

    pub fn with_api_base(api_base: impl Into<String>) -> Self {
        Self { api_base: api_base.into() }
    }
}

fn viz_url(ip: &str) -> String {
    format!("https://viz.greynoise.io/ip/{}", ip)
}

#[async_trait]
impl IntelSource for GreyNoiseSource {
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
        log::debug!("Searching GreyNoise for indicator {}", indicator);

        let request = FetchRequest::get(format!("{}/{}", self.api_base, indicator))
            .header("accept", "application/json")
            .header("key", api_key.unwrap_or_default());

        match ctx.client.execute(request).await {
            Ok(response) => Some(parse_intel(&response.data, indicator)),
            Err(e) => match e.status() {
                Some(429) => {
                    log::error!("GreyNoise rate-limit exceeded: {}", e);
                    Some(Envelope::error(viz_url(indicator), e.to_string(), Some(429)))
                }
                // unknown to GreyNoise means not seen scanning
                Some(404) => {
                    log::info!("Indicator {} not found in GreyNoise", indicator);
                    Some(Envelope::new(
                        "IP not observed scanning the internet",
                        Verdict::Benign,
                        viz_url(indicator),
                        error_body(&e),
                    ))
                }
                _ => Some(failure_envelope(Self::NAME, viz_url(indicator), &e)),
            },
        }
    }
}

/// Noise is suspicious, a malicious classification is malicious
fn parse_intel(intel: &Value, indicator: &str) -> Envelope {
    let classification = intel["classification"].as_str();

    let mut verdict = Verdict::Benign;
    if is_truthy(&intel["noise"]) {
        verdict = Verdict::Suspicious;
    }
    if classification == Some("malicious") {
        verdict = Verdict::Malicious;
    }

    let summary = format!(
        "Classification: {}, last seen {}",
        classification.unwrap_or("unknown"),
        intel["last_seen"].as_str().unwrap_or("unknown"),
    );

    let url = intel["link"]
        .as_str()
        .map(str::to_string)
        .unwrap_or_else(|| viz_url(indicator));

    Envelope::new(summary, verdict, url, intel.clone())
}
