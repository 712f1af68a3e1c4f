//! Fetch Client
//!
//! Retry policy:
//! - 500/502/503/504: retried immediately, `max_retries` extra attempts, then `Transient`
//! - any other error status: `Permanent`, no retry
//! - connection failures (DNS, reset, TLS): `Permanent`, no retry
//! - attempt deadline exceeded: `Timeout`, no retry

use std::time::Duration;

use reqwest::StatusCode;

use super::decode::decode_body;
use super::types::{FetchError, FetchRequest, FetchResponse};
use crate::constants;

const RETRYABLE_STATUSES: [StatusCode; 4] = [
    StatusCode::INTERNAL_SERVER_ERROR,
    StatusCode::BAD_GATEWAY,
    StatusCode::SERVICE_UNAVAILABLE,
    StatusCode::GATEWAY_TIMEOUT,
];

/// Client-wide defaults, overridable per request
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub timeout: Duration,
    pub max_retries: u32,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(constants::DEFAULT_FETCH_TIMEOUT_SECS),
            max_retries: constants::DEFAULT_MAX_RETRIES,
        }
    }
}

impl FetchConfig {
    /// Defaults with environment overrides applied
    pub fn from_env() -> Self {
        Self {
            timeout: Duration::from_secs(constants::get_fetch_timeout_secs()),
            max_retries: constants::get_max_retries(),
        }
    }
}

/// Shared outbound HTTP client. Cheap to clone.
#[derive(Debug, Clone)]
pub struct FetchClient {
    http: reqwest::Client,
    config: FetchConfig,
}

impl FetchClient {
    pub fn new(config: FetchConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .user_agent(constants::USER_AGENT)
            .build()?;

        Ok(Self { http, config })
    }

    /// Wrap an existing reqwest client
    pub fn with_client(http: reqwest::Client, config: FetchConfig) -> Self {
        Self { http, config }
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Send a request under the retry/timeout policy and decode the body
    pub async fn execute(&self, request: FetchRequest) -> Result<FetchResponse, FetchError> {
        let timeout = request.timeout.unwrap_or(self.config.timeout);
        let max_retries = request.max_retries.unwrap_or(self.config.max_retries);
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;

            let response = match self.build(&request, timeout).send().await {
                Ok(response) => response,
                Err(e) => return Err(self.connection_error(&request.url, e, timeout)),
            };

            let status = response.status();

            if status.is_success() {
                return self.read_success(&request.url, response, timeout).await;
            }

            if RETRYABLE_STATUSES.contains(&status) {
                if attempt > max_retries {
                    log::error!(
                        "URL: {}, HTTP Error: {} | giving up after {} attempts",
                        request.url, status.as_u16(), attempt
                    );
                    return Err(FetchError::Transient { status: status.as_u16(), attempts: attempt });
                }
                log::warn!(
                    "URL: {}, HTTP Error: {} | Retrying... ({}/{})",
                    request.url, status.as_u16(), attempt, max_retries
                );
                continue;
            }

            let message = status.canonical_reason().unwrap_or("HTTP error").to_string();
            let body = response.text().await.ok();
            log::error!("URL: {}, HTTP Error: {} - {}", request.url, status.as_u16(), message);

            return Err(FetchError::Permanent { status: Some(status.as_u16()), message, body });
        }
    }

    fn build(&self, request: &FetchRequest, timeout: Duration) -> reqwest::RequestBuilder {
        let mut builder = self
            .http
            .request(request.method.clone(), &request.url)
            .timeout(timeout);

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        builder
    }

    async fn read_success(
        &self,
        url: &str,
        response: reqwest::Response,
        timeout: Duration,
    ) -> Result<FetchResponse, FetchError> {
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.connection_error(url, e, timeout))?;

        let data = decode_body(url, content_type.as_deref(), &bytes)?;

        Ok(FetchResponse { status, content_type, data })
    }

    fn connection_error(&self, url: &str, e: reqwest::Error, timeout: Duration) -> FetchError {
        if e.is_timeout() {
            log::error!("URL: {}, timed out after {:?}", url, timeout);
            return FetchError::Timeout { url: url.to_string(), after: timeout };
        }

        log::error!("URL: {}, Connection error: {}", url, e);
        FetchError::Permanent {
            status: e.status().map(|s| s.as_u16()),
            message: e.to_string(),
            body: None,
        }
    }
}
