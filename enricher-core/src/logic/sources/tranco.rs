//! Tranco - domain popularity ranking

use async_trait::async_trait;
use serde_json::Value;

use super::{failure_envelope, Envelope, IntelSource, SourceContext, Verdict};
use crate::logic::fetch::FetchRequest;
use crate::logic::indicator::IndicatorType;

const API_BASE: &str = "https://tranco-list.eu/api/ranks/domain";
const QUERY_PAGE: &str = "https://tranco-list.eu/query";
const RANK_THRESHOLD: i64 = 750_000;

pub struct TrancoSource {
    api_base: String,
}

impl Default for TrancoSource {
    fn default() -> Self {
        Self { api_base: API_BASE.to_string() }
    }
}

impl TrancoSource {
    pub const NAME: &'static str = "Tranco";

    pub fn with_api_base(api_base: impl Into<String>) -> Self {
        Self { api_base: api_base.into() }
    }
}

#[async_trait]
impl IntelSource for TrancoSource {
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
        if kind != IndicatorType::Domain {
            return None;
        }

        let request = FetchRequest::get(format!("{}/{}", self.api_base, indicator));

        match ctx.client.execute(request).await {
            Ok(response) if response.is_empty() => None,
            Ok(response) => Some(parse_intel(&response.data)),
            Err(e) => Some(failure_envelope(Self::NAME, QUERY_PAGE, &e)),
        }
    }
}

/// A best rank within the threshold is suspicious, and so is an unranked domain
fn parse_intel(intel: &Value) -> Envelope {
    let ranks: Vec<i64> = intel["ranks"]
        .as_array()
        .map(|entries| entries.iter().filter_map(|e| e["rank"].as_i64()).collect())
        .unwrap_or_default();

    let (summary, verdict) = match ranks.iter().min() {
        Some(&best) => {
            let average = (ranks.iter().sum::<i64>() as f64 / ranks.len() as f64).round_ties_even();
            let verdict = if best <= RANK_THRESHOLD { Verdict::Suspicious } else { Verdict::Benign };
            (format!("Rank: {}", average as i64), verdict)
        }
        None => ("No ranking".to_string(), Verdict::Suspicious),
    };

    Envelope::new(summary, verdict, QUERY_PAGE, intel.clone())
}
