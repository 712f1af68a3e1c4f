//! Indicator Types

use serde::{Deserialize, Serialize};

use super::classifier::classify;

/// Category of an indicator of compromise
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndicatorType {
    IPv4,
    IPv6,
    Domain,
    #[serde(rename = "URL")]
    Url,
    Hash,
    Unknown,
}

impl IndicatorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            IndicatorType::IPv4 => "IPv4",
            IndicatorType::IPv6 => "IPv6",
            IndicatorType::Domain => "Domain",
            IndicatorType::Url => "URL",
            IndicatorType::Hash => "Hash",
            IndicatorType::Unknown => "Unknown",
        }
    }

    pub fn is_ip(&self) -> bool {
        matches!(self, IndicatorType::IPv4 | IndicatorType::IPv6)
    }
}

impl std::fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hash algorithm, inferred from digest length
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashKind {
    Md5,
    Sha1,
    Sha256,
}

impl HashKind {
    pub fn from_digest(hash: &str) -> Option<Self> {
        match hash.len() {
            32 => Some(HashKind::Md5),
            40 => Some(HashKind::Sha1),
            64 => Some(HashKind::Sha256),
            _ => None,
        }
    }
}

/// A trimmed indicator together with its classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Indicator {
    pub value: String,
    pub kind: IndicatorType,
}

impl Indicator {
    /// Trim and classify a raw string
    pub fn parse(raw: &str) -> Self {
        let value = raw.trim().to_string();
        let kind = classify(&value);
        Self { value, kind }
    }

    pub fn is_valid(&self) -> bool {
        self.kind != IndicatorType::Unknown
    }
}
