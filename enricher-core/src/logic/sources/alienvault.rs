//! AlienVault Open Threat Exchange - pulse counts per indicator

use async_trait::async_trait;
use serde_json::Value;

use super::{failure_envelope, Envelope, IntelSource, SourceContext, Verdict};
use crate::logic::fetch::FetchRequest;
use crate::logic::indicator::IndicatorType;

const API_BASE: &str = "https://otx.alienvault.com/api/v1/indicators";
const MALICIOUS_PULSES: i64 = 10;

pub struct AlienVaultSource {
    api_base: String,
}

impl Default for AlienVaultSource {
    fn default() -> Self {
        Self { api_base: API_BASE.to_string() }
    }
}

impl AlienVaultSource {
    pub const NAME: &'static str = "Open Threat Exchange";

    pub fn with_api_base(api_base: impl Into<String>) -> Self {
        Self { api_base: api_base.into() }
    }
}

/// OTX path section for each indicator type
fn section(kind: IndicatorType) -> Option<&'static str> {
    match kind {
        IndicatorType::IPv4 => Some("IPv4"),
        IndicatorType::IPv6 => Some("IPv6"),
        IndicatorType::Domain => Some("domain"),
        IndicatorType::Url => Some("url"),
        IndicatorType::Hash => Some("file"),
        IndicatorType::Unknown => None,
    }
}

fn page_url(section: &str, indicator: &str) -> String {
    format!("https://otx.alienvault.com/indicator/{}/{}", section, indicator)
}

#[async_trait]
impl IntelSource for AlienVaultSource {
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
        let section = section(kind)?;
        log::debug!("Searching OTX for indicator {}", indicator);

        let request = FetchRequest::get(format!("{}/{}/{}/general/", self.api_base, section, indicator))
            .header("X-OTX-API-KEY", api_key.unwrap_or_default())
            .header("Content-Type", "application/json");

        match ctx.client.execute(request).await {
            Ok(response) => Some(parse_intel(&response.data, section, indicator)),
            Err(e) => Some(failure_envelope(Self::NAME, page_url(section, indicator), &e)),
        }
    }
}

/// More than 10 pulses is malicious, any pulse is suspicious. A whitelist
/// validation caps a positive verdict at suspicious.
fn parse_intel(intel: &Value, section: &str, indicator: &str) -> Envelope {
    let pulse_count = intel["pulse_info"]["count"].as_i64().unwrap_or(0);
    let mut summary = format!("No. of pulses: {}", pulse_count);

    let mut verdict = if pulse_count > MALICIOUS_PULSES {
        Verdict::Malicious
    } else if pulse_count > 0 {
        Verdict::Suspicious
    } else {
        Verdict::Benign
    };

    let whitelisted = intel["validation"].as_array().map(|v| !v.is_empty()).unwrap_or(false);
    if whitelisted {
        if verdict != Verdict::Benign {
            verdict = Verdict::Suspicious;
        }
        summary = format!("Accepted whitelist on indicator. No. of pulses: {}", pulse_count);
    }

    let url = page_url(
        intel["type"].as_str().unwrap_or(section),
        intel["indicator"].as_str().unwrap_or(indicator),
    );

    Envelope::new(summary, verdict, url, intel.clone())
}
