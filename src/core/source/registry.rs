//! Lookup of configured sources by id.

use super::{LocalSource, SourceAdapter};
use crate::config::{SourceConfig, SourceKind};
use crate::core::exclusion::ExclusionStore;
use crate::core::fingerprint::FingerprintCache;
use crate::error::{ConfigError, SourceError};
use std::sync::Arc;
use tracing::debug;

/// Enabled adapters, in configuration order
#[derive(Default)]
pub struct SourceRegistry {
    adapters: Vec<Arc<dyn SourceAdapter>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build adapters for every enabled source in the configuration
    pub fn from_config(
        sources: &[SourceConfig],
        store: Arc<ExclusionStore>,
        fingerprints: Arc<FingerprintCache>,
    ) -> Result<Self, ConfigError> {
        let mut registry = Self::new();

        for config in sources.iter().filter(|s| s.enabled) {
            let root = config.resolved_path()?;
            let source = LocalSource::new(
                config.id.clone(),
                root,
                store.clone(),
                fingerprints.clone(),
            )
            .include_hidden(config.include_hidden);

            // Download folders are flat; plugins write straight into them
            let source = match config.kind {
                SourceKind::Local => source.recursive(config.recursive),
                SourceKind::DownloadDir => source.recursive(false),
            };

            debug!(source = %config.id, root = %source.root().display(), "Registered source");
            registry.register(Arc::new(source))?;
        }

        Ok(registry)
    }

    /// Add an adapter. Ids must be unique.
    pub fn register(&mut self, adapter: Arc<dyn SourceAdapter>) -> Result<(), ConfigError> {
        if self.get(adapter.identity()).is_some() {
            return Err(ConfigError::Invalid(format!(
                "source id '{}' is registered more than once",
                adapter.identity()
            )));
        }
        self.adapters.push(adapter);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn SourceAdapter>> {
        self.adapters
            .iter()
            .find(|adapter| adapter.identity() == id)
            .cloned()
    }

    /// Like [`get`](Self::get), but an unknown id is an error
    pub fn require(&self, id: &str) -> Result<Arc<dyn SourceAdapter>, SourceError> {
        self.get(id).ok_or_else(|| SourceError::UnknownSource {
            source_id: id.to_string(),
        })
    }

    pub fn ids(&self) -> Vec<&str> {
        self.adapters.iter().map(|a| a.identity()).collect()
    }

    pub fn adapters(&self) -> &[Arc<dyn SourceAdapter>] {
        &self.adapters
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}
