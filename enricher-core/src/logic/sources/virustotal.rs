//! VirusTotal - multi-engine analysis for IPs, domains, URLs and files

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use serde_json::Value;

use super::{failure_envelope, Envelope, IntelSource, SourceContext, Verdict};
use crate::logic::fetch::FetchRequest;
use crate::logic::indicator::IndicatorType;

const VT_API_BASE: &str = "https://www.virustotal.com/api/v3";

pub struct VirusTotalSource {
    api_base: String,
}

impl Default for VirusTotalSource {
    fn default() -> Self {
        Self { api_base: VT_API_BASE.to_string() }
    }
}

impl VirusTotalSource {
    pub const NAME: &'static str = "VirusTotal";

    pub fn with_api_base(api_base: impl Into<String>) -> Self {
        Self { api_base: api_base.into() }
    }

    fn object_url(&self, indicator: &str, kind: IndicatorType) -> Option<String> {
        let path = match kind {
            IndicatorType::IPv4 | IndicatorType::IPv6 => format!("ip_addresses/{}", indicator),
            IndicatorType::Domain => format!("domains/{}", indicator),
            // URL objects are addressed by unpadded base64url of the URL
            IndicatorType::Url => format!("urls/{}", URL_SAFE_NO_PAD.encode(indicator)),
            IndicatorType::Hash => format!("files/{}", indicator),
            IndicatorType::Unknown => return None,
        };
        Some(format!("{}/{}", self.api_base, path))
    }
}

fn gui_url(id: &str) -> String {
    format!("https://www.virustotal.com/gui/search/{}", id)
}

#[async_trait]
impl IntelSource for VirusTotalSource {
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
        let url = self.object_url(indicator, kind)?;

        let request = FetchRequest::get(url)
            .header("accept", "application/json")
            .header("x-apikey", api_key.unwrap_or_default());

        match ctx.client.execute(request).await {
            Ok(response) if response.is_empty() => None,
            Ok(response) => Some(parse_intel(&response.data)),
            Err(e) => Some(failure_envelope(Self::NAME, gui_url(indicator), &e)),
        }
    }
}

/// Score: negative community reputation +1, more than two malicious engines
/// +2, any malicious or suspicious engine +1.
fn parse_intel(intel: &Value) -> Envelope {
    let data = &intel["data"];
    let attributes = &data["attributes"];
    let stats = &attributes["last_analysis_stats"];

    let engines: i64 = stats
        .as_object()
        .map(|s| s.values().filter_map(Value::as_i64).sum())
        .unwrap_or(0);
    let malicious = stats["malicious"].as_i64().unwrap_or(0);
    let suspicious = stats["suspicious"].as_i64().unwrap_or(0);

    let reputation = attributes["reputation"]
        .as_i64()
        .or_else(|| data["reputation"].as_i64())
        .unwrap_or(0);

    let mut score = 0;
    if reputation < 0 {
        score += 1;
    }
    if malicious > 2 {
        score += 2;
    }
    if suspicious > 0 || malicious > 0 {
        score += 1;
    }

    Envelope::new(
        format!("{}/{}, community: {}", malicious + suspicious, engines, reputation),
        Verdict::from_score(score),
        gui_url(data["id"].as_str().unwrap_or_default()),
        data.clone(),
    )
}
