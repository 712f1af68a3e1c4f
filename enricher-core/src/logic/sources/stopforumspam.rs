//! Stop Forum Spam - spammer IP database (XML API)

use async_trait::async_trait;
use serde_json::Value;

use super::{failure_envelope, lenient_int, Envelope, IntelSource, SourceContext, Verdict};
use crate::logic::fetch::FetchRequest;
use crate::logic::indicator::IndicatorType;

const API_URL: &str = "https://api.stopforumspam.org/api";
const SEARCH_PAGE: &str = "https://www.stopforumspam.com/search";
const FREQUENT_SPAMMER: i64 = 5;

pub struct StopForumSpamSource {
    api_url: String,
}

impl Default for StopForumSpamSource {
    fn default() -> Self {
        Self { api_url: API_URL.to_string() }
    }
}

impl StopForumSpamSource {
    pub const NAME: &'static str = "Stop Forum Spam";

    pub fn with_api_url(api_url: impl Into<String>) -> Self {
        Self { api_url: api_url.into() }
    }
}

#[async_trait]
impl IntelSource for StopForumSpamSource {
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
        if !kind.is_ip() {
            return None;
        }

        let request = FetchRequest::get(&self.api_url).query("ip", indicator);

        match ctx.client.execute(request).await {
            Ok(response) if response.is_empty() => None,
            Ok(response) => Some(parse_intel(&response.data)),
            Err(e) => Some(failure_envelope(
                Self::NAME,
                format!("{}?ip={}", self.api_url, indicator),
                &e,
            )),
        }
    }
}

/// Listed is suspicious; more than five sightings adds one level
fn parse_intel(intel: &Value) -> Envelope {
    let response = &intel["response"];

    let frequency = lenient_int(&response["frequency"]).unwrap_or(0);
    let mut score = 0;
    let mut summary = "No results".to_string();

    if response["appears"].as_str() == Some("yes") {
        summary = format!(
            "Last seen: {}, frequency: {}",
            response["lastseen"].as_str().unwrap_or("unknown"),
            frequency
        );
        score = 1;
    }

    if frequency > FREQUENT_SPAMMER {
        score += 1;
    }

    Envelope::new(summary, Verdict::from_score(score), SEARCH_PAGE, response.clone())
}
