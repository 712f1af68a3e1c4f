//! Fetch Types

use std::time::Duration;

use reqwest::Method;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// REQUEST
// ============================================================================

/// One outbound call, built fluently by a provider
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub url: String,
    pub method: Method,
    pub headers: Vec<(String, String)>,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    /// Per-attempt timeout, client default when unset
    pub timeout: Option<Duration>,
    /// Extra attempts on 5xx, client default when unset
    pub max_retries: Option<u32>,
}

impl FetchRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method,
            headers: Vec::new(),
            query: Vec::new(),
            body: None,
            timeout: None,
            max_retries: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = Some(retries);
        self
    }
}

// ============================================================================
// RESPONSE
// ============================================================================

/// Decoded successful response
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: u16,
    pub content_type: Option<String>,
    /// Structural view of the body, empty object when undecodable
    pub data: Value,
}

impl FetchResponse {
    /// True for `{}`, `[]`, `null` and `""`
    pub fn is_empty(&self) -> bool {
        match &self.data {
            Value::Null => true,
            Value::Object(map) => map.is_empty(),
            Value::Array(items) => items.is_empty(),
            Value::String(s) => s.is_empty(),
            _ => false,
        }
    }
}

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum FetchError {
    /// 5xx still failing after every retry
    #[error("HTTP {status} after {attempts} attempts")]
    Transient { status: u16, attempts: u32 },

    /// Non-retryable HTTP status, connection failure or malformed body
    #[error("{message}")]
    Permanent {
        status: Option<u16>,
        message: String,
        body: Option<String>,
    },

    /// A single attempt exceeded its deadline
    #[error("request to {url} timed out after {after:?}")]
    Timeout { url: String, after: Duration },
}

impl FetchError {
    /// HTTP status, when one was received
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Transient { status, .. } => Some(*status),
            FetchError::Permanent { status, .. } => *status,
            FetchError::Timeout { .. } => None,
        }
    }

    /// Response body text of a rejected request
    pub fn body(&self) -> Option<&str> {
        match self {
            FetchError::Permanent { body, .. } => body.as_deref(),
            _ => None,
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, FetchError::Transient { .. })
    }
}
