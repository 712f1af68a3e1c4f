//! Source Types - the normalized verdict schema

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// VERDICT
// ============================================================================

/// Normalized risk classification
///
/// BENIGN < SUSPICIOUS < MALICIOUS is an ordered scale. ERROR and NONE sit
/// outside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Error,
    None,
    Benign,
    Suspicious,
    Malicious,
}

impl Verdict {
    /// Map an accumulated provider score onto the scale, clamping at both ends
    pub fn from_score(score: i64) -> Self {
        match score {
            i64::MIN..=0 => Verdict::Benign,
            1 => Verdict::Suspicious,
            _ => Verdict::Malicious,
        }
    }

    /// Numeric code: -100 error, -1 none, 0..=2 scale
    pub fn code(&self) -> i32 {
        match self {
            Verdict::Error => -100,
            Verdict::None => -1,
            Verdict::Benign => 0,
            Verdict::Suspicious => 1,
            Verdict::Malicious => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Error => "ERROR",
            Verdict::None => "NONE",
            Verdict::Benign => "BENIGN",
            Verdict::Suspicious => "SUSPICIOUS",
            Verdict::Malicious => "MALICIOUS",
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Verdict::Error)
    }
}

// ============================================================================
// ENVELOPE
// ============================================================================

/// One provider's normalized answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub summary: String,
    pub verdict: Verdict,
    /// Human-facing reference page on the provider's site
    pub url: String,
    /// Raw provider payload
    #[serde(default)]
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
}

impl Envelope {
    pub fn new(summary: impl Into<String>, verdict: Verdict, url: impl Into<String>, data: Value) -> Self {
        Self {
            summary: summary.into(),
            verdict,
            url: url.into(),
            data,
            status_code: None,
        }
    }

    /// ERROR envelope for a failed call
    pub fn error(url: impl Into<String>, message: impl Into<String>, status_code: Option<u16>) -> Self {
        Self {
            summary: message.into(),
            verdict: Verdict::Error,
            url: url.into(),
            data: Value::Object(Default::default()),
            status_code,
        }
    }

    pub fn is_error(&self) -> bool {
        self.verdict.is_error()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_score_clamps() {
        assert_eq!(Verdict::from_score(-3), Verdict::Benign);
        assert_eq!(Verdict::from_score(0), Verdict::Benign);
        assert_eq!(Verdict::from_score(1), Verdict::Suspicious);
        assert_eq!(Verdict::from_score(2), Verdict::Malicious);
        assert_eq!(Verdict::from_score(4), Verdict::Malicious);
    }

    #[test]
    fn test_verdict_wire_names() {
        assert_eq!(serde_json::to_value(Verdict::Suspicious).unwrap(), json!("SUSPICIOUS"));
        assert_eq!(serde_json::to_value(Verdict::Error).unwrap(), json!("ERROR"));
        assert_eq!(Verdict::Error.code(), -100);
    }

    #[test]
    fn test_error_envelope_shape() {
        let env = Envelope::error("https://example.test/x", "Service Unavailable", Some(503));
        let value = serde_json::to_value(&env).unwrap();
        assert_eq!(value["verdict"], json!("ERROR"));
        assert_eq!(value["status_code"], json!(503));
        assert_eq!(value["summary"], json!("Service Unavailable"));

        let ok = Envelope::new("fine", Verdict::Benign, "u", json!({}));
        let value = serde_json::to_value(&ok).unwrap();
        assert!(value.get("status_code").is_none());
    }
}
