//! Credential lookup for providers that need an API key
//!
//! Only a synchronous "fetch key for provider" capability. Storage,
//! encryption and rotation live outside this crate.

use std::collections::HashMap;

use parking_lot::RwLock;

/// Resolve the API key of a provider by its display name
pub trait CredentialStore: Send + Sync {
    fn get_key(&self, source_name: &str) -> Option<String>;
}

// ============================================================================
// STATIC (IN-MEMORY) STORE
// ============================================================================

/// Keys held in memory, set by the embedding application
#[derive(Default)]
pub struct StaticCredentials {
    keys: RwLock<HashMap<String, String>>,
}

impl StaticCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key(self, source_name: &str, key: &str) -> Self {
        self.set_key(source_name, key);
        self
    }

    /// Set a key, an empty key removes it
    pub fn set_key(&self, source_name: &str, key: &str) {
        let mut keys = self.keys.write();
        if key.is_empty() {
            keys.remove(source_name);
        } else {
            keys.insert(source_name.to_string(), key.to_string());
        }
    }

    pub fn remove_key(&self, source_name: &str) {
        self.keys.write().remove(source_name);
    }
}

impl CredentialStore for StaticCredentials {
    fn get_key(&self, source_name: &str) -> Option<String> {
        self.keys.read().get(source_name).cloned()
    }
}

// ============================================================================
// ENVIRONMENT STORE
// ============================================================================

/// Reads `<NAME>_API_KEY` on every lookup, so rotated keys are picked up
#[derive(Debug, Default, Clone)]
pub struct EnvCredentials;

impl EnvCredentials {
    /// "Open Threat Exchange" -> "OPEN_THREAT_EXCHANGE_API_KEY"
    pub fn var_name(source_name: &str) -> String {
        let mut name: String = source_name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
            .collect();
        name.push_str("_API_KEY");
        name
    }
}

impl CredentialStore for EnvCredentials {
    fn get_key(&self, source_name: &str) -> Option<String> {
        std::env::var(Self::var_name(source_name))
            .ok()
            .filter(|k| !k.trim().is_empty())
    }
}
