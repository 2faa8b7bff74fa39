//! Built-in local provider
//!
//! Mediates between one offline and one online store in the same process.
//! Deployment-specific providers implement [`Provider`] out of tree and are
//! resolved by qualified name through [`provider_resolver`].

use crate::memory::{MemoryOfflineStore, MemoryOnlineStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use featherstore_core::resolver::{PluginKind, PluginResolver};
use featherstore_core::{
    EntityKey, FeatureRow, FeatureValue, FeatureViewSpec, OfflineStore, OnlineStore, Provider,
    Result,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Provider wiring an offline store to an online store directly
pub struct LocalProvider {
    offline: Arc<dyn OfflineStore>,
    online: Arc<dyn OnlineStore>,
}

impl LocalProvider {
    pub fn new(offline: Arc<dyn OfflineStore>, online: Arc<dyn OnlineStore>) -> Self {
        Self { offline, online }
    }

    /// Local provider over fresh in-memory stores
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(MemoryOfflineStore::new()),
            Arc::new(MemoryOnlineStore::new()),
        )
    }

    pub fn offline(&self) -> &Arc<dyn OfflineStore> {
        &self.offline
    }

    pub fn online(&self) -> &Arc<dyn OnlineStore> {
        &self.online
    }
}

#[async_trait]
impl Provider for LocalProvider {
    fn provider_type(&self) -> &'static str {
        "local"
    }

    async fn materialize(
        &self,
        view: &FeatureViewSpec,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<usize> {
        let rows = self.offline.pull_latest(view, start, end).await?;
        let written = rows.len();
        self.online.online_write(&view.name, rows).await?;

        info!(
            view = %view.name,
            start = %start,
            end = %end,
            rows = written,
            "Synced window from {} offline store to {} online store",
            self.offline.store_type(),
            self.online.store_type()
        );
        Ok(written)
    }

    async fn online_read(
        &self,
        view: &str,
        entity_keys: &[EntityKey],
        features: &[String],
    ) -> Result<Vec<HashMap<String, FeatureValue>>> {
        self.online.online_read(view, entity_keys, features).await
    }

    async fn online_write(&self, view: &str, rows: Vec<FeatureRow>) -> Result<()> {
        self.online.online_write(view, rows).await
    }
}

/// Resolver preloaded with the built-in providers
///
/// Unknown aliases surface the same not-implemented message format used for
/// registry stores; both are parsed by calling tooling.
pub fn provider_resolver() -> PluginResolver<Arc<dyn Provider>> {
    let mut resolver = PluginResolver::new(PluginKind::Provider);
    resolver.register_builtin(
        "local",
        Arc::new(|_| Ok(Arc::new(LocalProvider::in_memory()) as Arc<dyn Provider>)),
    );
    resolver
}

#[cfg(test)]
mod tests {
    use super::*;
    use featherstore_core::RepoConfig;

    #[test]
    fn test_local_provider_resolves() {
        let config = RepoConfig::new("demo");
        let provider = provider_resolver().resolve("local", &config).unwrap();
        assert_eq!(provider.provider_type(), "local");
    }

    #[test]
    fn test_unknown_provider_message() {
        let config = RepoConfig::new("demo");
        let err = provider_resolver().resolve("acme123", &config).unwrap_err();
        assert_eq!(err.to_string(), "Provider 'acme123' is not implemented");
    }
}
