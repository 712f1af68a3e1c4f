//! Indicator Classifier
//!
//! Pure, deterministic, no I/O. Checks run in a fixed order:
//! IP literal, domain, URL, hash. First match wins.

use std::net::IpAddr;

use once_cell::sync::Lazy;
use regex::Regex;

use super::types::IndicatorType;

static DOMAIN_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("valid domain regex"));

static URL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^https?://").expect("valid url regex"));

// ============================================================================
// MAIN CLASSIFICATION FUNCTION
// ============================================================================

/// Categorize a string as an indicator type, `Unknown` if unsupported
pub fn classify(raw: &str) -> IndicatorType {
    if let Ok(ip) = raw.parse::<IpAddr>() {
        return match ip {
            IpAddr::V4(_) => IndicatorType::IPv4,
            IpAddr::V6(_) => IndicatorType::IPv6,
        };
    }

    if DOMAIN_PATTERN.is_match(raw) {
        IndicatorType::Domain
    } else if URL_PATTERN.is_match(raw) {
        IndicatorType::Url
    } else if is_hash(raw) {
        IndicatorType::Hash
    } else {
        IndicatorType::Unknown
    }
}

/// Admission gate: anything but `Unknown`
pub fn is_valid(raw: &str) -> bool {
    classify(raw) != IndicatorType::Unknown
}

/// MD5 = 32, SHA1 = 40, SHA256 = 64 hex chars
fn is_hash(s: &str) -> bool {
    matches!(s.len(), 32 | 40 | 64) && s.chars().all(|c| c.is_ascii_hexdigit())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ip_literals() {
        assert_eq!(classify("8.8.8.8"), IndicatorType::IPv4);
        assert_eq!(classify("2001:4860:4860::8888"), IndicatorType::IPv6);
        assert_eq!(classify("::1"), IndicatorType::IPv6);
        assert_ne!(classify("999.1.1.1"), IndicatorType::IPv4);
    }

    #[test]
    fn test_domains() {
        assert_eq!(classify("example.com"), IndicatorType::Domain);
        assert_eq!(classify("sub.evil-site.co.uk"), IndicatorType::Domain);
        assert_eq!(classify("localhost"), IndicatorType::Unknown);
        assert_eq!(classify("example.c"), IndicatorType::Unknown);
    }

    #[test]
    fn test_urls() {
        assert_eq!(classify("http://evil.com/payload.exe"), IndicatorType::Url);
        assert_eq!(classify("https://example.com"), IndicatorType::Url);
        assert_eq!(classify("ftp://example.com/file"), IndicatorType::Unknown);
    }

    #[test]
    fn test_hashes() {
        assert_eq!(classify("d41d8cd98f00b204e9800998ecf8427e"), IndicatorType::Hash);
        assert_eq!(classify("da39a3ee5e6b4b0d3255bfef95601890afd80709"), IndicatorType::Hash);
        assert_eq!(
            classify("E3B0C44298FC1C149AFBF4C8996FB92427AE41E4649B934CA495991B7852B855"),
            IndicatorType::Hash
        );
        // right length, not hex
        assert_eq!(classify("z41d8cd98f00b204e9800998ecf8427e"), IndicatorType::Unknown);
        assert_eq!(classify("d41d8cd98f00b204e9800998ecf8427"), IndicatorType::Unknown);
    }

    #[test]
    fn test_rejects_garbage() {
        assert_eq!(classify("not-a-thing!!"), IndicatorType::Unknown);
        assert_eq!(classify(""), IndicatorType::Unknown);
        assert!(!is_valid("not-a-thing!!"));
        assert!(is_valid("example.org"));
    }

    #[test]
    fn test_is_deterministic() {
        for raw in ["1.2.3.4", "example.com", "https://x.io/a", "nope"] {
            assert_eq!(classify(raw), classify(raw));
        }
    }
}
