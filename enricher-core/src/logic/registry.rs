//! Source Registry - explicit provider registration with lazy, one-time construction
//!
//! Factories are registered up front (`&mut self`), then the registry is
//! shared read-only. The provider set is built on first use and memoized
//! for the life of the registry.

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use serde::Serialize;

use super::credentials::CredentialStore;
use super::sources::{self, IntelSource};

type SourceFactory = Box<dyn Fn() -> Arc<dyn IntelSource> + Send + Sync>;

/// Public description of one provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceDescriptor {
    pub name: String,
    pub requires_api_key: bool,
    /// Keyless providers are always configured
    pub configured: bool,
}

#[derive(Default)]
pub struct SourceRegistry {
    factories: Vec<(String, SourceFactory)>,
    built: OnceCell<HashMap<String, Arc<dyn IntelSource>>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in provider
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        sources::register_builtin(&mut registry);
        registry
    }

    /// Register a provider constructor under `id`
    ///
    /// Re-registering an id replaces the earlier factory. Has no effect
    /// once the provider set has been built.
    pub fn register<F>(&mut self, id: impl Into<String>, factory: F)
    where
        F: Fn() -> Arc<dyn IntelSource> + Send + Sync + 'static,
    {
        let id = id.into();
        if self.built.get().is_some() {
            log::warn!("Provider '{}' registered after first use, ignoring", id);
            return;
        }

        match self.factories.iter_mut().find(|(existing, _)| *existing == id) {
            Some(slot) => slot.1 = Box::new(factory),
            None => self.factories.push((id, Box::new(factory))),
        }
    }

    /// Every provider keyed by display name, constructed exactly once
    pub fn get_all(&self) -> &HashMap<String, Arc<dyn IntelSource>> {
        self.built.get_or_init(|| {
            let mut providers: HashMap<String, Arc<dyn IntelSource>> = HashMap::new();

            for (id, factory) in &self.factories {
                let provider = factory();
                let name = provider.name().to_string();
                if providers.contains_key(&name) {
                    log::warn!("Duplicate provider name '{}' from '{}', keeping the first", name, id);
                    continue;
                }
                providers.insert(name, provider);
            }

            log::info!("Built {} intelligence providers", providers.len());
            providers
        })
    }

    pub fn len(&self) -> usize {
        self.get_all().len()
    }

    pub fn is_empty(&self) -> bool {
        self.get_all().is_empty()
    }

    /// Providers sorted by name, with credential status
    pub fn descriptors(&self, credentials: &dyn CredentialStore) -> Vec<SourceDescriptor> {
        let mut descriptors: Vec<SourceDescriptor> = self
            .get_all()
            .values()
            .map(|provider| SourceDescriptor {
                name: provider.name().to_string(),
                requires_api_key: provider.requires_api_key(),
                configured: !provider.requires_api_key() || credentials.get_key(provider.name()).is_some(),
            })
            .collect();
        descriptors.sort_by(|a, b| a.name.cmp(&b.name));
        descriptors
    }
}
