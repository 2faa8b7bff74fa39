//! FeatureStore facade
//!
//! The entry point a calling process drives: construction resolves the
//! registry store and provider from the repo config through the plugin
//! resolvers, then `apply` and the materialization operations run against
//! the bound project.
//!
//! The facade never reads files or environment variables; configuration
//! loading is the caller's concern.

use crate::engine::{MaterializationEngine, MaterializationRun};
use crate::provider::provider_resolver;
use chrono::{DateTime, Utc};
use featherstore_core::resolver::PluginResolver;
use featherstore_core::types::{
    DataSourceSpec, EntitySpec, FcoRecord, FeatureServiceSpec, FeatureViewSpec,
    OnDemandFeatureViewSpec,
};
use featherstore_core::{
    EntityKey, FeatureValue, Provider, RegistryStore, RepoConfig, RepoContents, Result,
};
use featherstore_registry::{registry_store_resolver, ApplyDiff, Registry};
use std::collections::HashMap;
use std::sync::Arc;

pub struct FeatureStore {
    config: RepoConfig,
    registry: Arc<Registry>,
    provider: Arc<dyn Provider>,
    engine: MaterializationEngine,
}

impl std::fmt::Debug for FeatureStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeatureStore")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl FeatureStore {
    /// Build a store from a resolved repo config using the built-in plugin
    /// tables
    pub fn from_config(config: RepoConfig) -> Result<Self> {
        Self::from_config_with_resolvers(config, registry_store_resolver(), provider_resolver())
    }

    /// Build a store with caller-extended plugin tables
    ///
    /// Third-party backends register their module/class constructors on the
    /// resolvers before construction.
    pub fn from_config_with_resolvers(
        config: RepoConfig,
        store_resolver: PluginResolver<Arc<dyn RegistryStore>>,
        provider_resolver: PluginResolver<Arc<dyn Provider>>,
    ) -> Result<Self> {
        let store = store_resolver.resolve(&config.registry.store_type, &config)?;
        let provider = provider_resolver.resolve(&config.provider, &config)?;
        Ok(Self::with_components(config, store, provider))
    }

    /// Build a store from already-constructed components
    pub fn with_components(
        config: RepoConfig,
        store: Arc<dyn RegistryStore>,
        provider: Arc<dyn Provider>,
    ) -> Self {
        let registry = Arc::new(Registry::new(store));
        let engine = MaterializationEngine::new(registry.clone(), provider.clone());
        Self {
            config,
            registry,
            provider,
            engine,
        }
    }

    pub fn project(&self) -> &str {
        &self.config.project
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn provider(&self) -> &Arc<dyn Provider> {
        &self.provider
    }

    /// Diff-and-persist the declared object set for this project
    pub async fn apply(&self, contents: &RepoContents) -> Result<ApplyDiff> {
        self.registry.apply(&self.config.project, contents).await
    }

    pub async fn list_entities(&self) -> Result<Vec<FcoRecord<EntitySpec>>> {
        self.registry.list_entities(&self.config.project).await
    }

    pub async fn get_entity(&self, name: &str) -> Result<FcoRecord<EntitySpec>> {
        self.registry.get_entity(&self.config.project, name).await
    }

    pub async fn list_data_sources(&self) -> Result<Vec<FcoRecord<DataSourceSpec>>> {
        self.registry.list_data_sources(&self.config.project).await
    }

    pub async fn get_data_source(&self, name: &str) -> Result<FcoRecord<DataSourceSpec>> {
        self.registry
            .get_data_source(&self.config.project, name)
            .await
    }

    pub async fn list_feature_views(&self) -> Result<Vec<FcoRecord<FeatureViewSpec>>> {
        self.registry.list_feature_views(&self.config.project).await
    }

    pub async fn get_feature_view(&self, name: &str) -> Result<FcoRecord<FeatureViewSpec>> {
        self.registry
            .get_feature_view(&self.config.project, name)
            .await
    }

    pub async fn list_on_demand_feature_views(
        &self,
    ) -> Result<Vec<FcoRecord<OnDemandFeatureViewSpec>>> {
        self.registry
            .list_on_demand_feature_views(&self.config.project)
            .await
    }

    pub async fn get_on_demand_feature_view(
        &self,
        name: &str,
    ) -> Result<FcoRecord<OnDemandFeatureViewSpec>> {
        self.registry
            .get_on_demand_feature_view(&self.config.project, name)
            .await
    }

    pub async fn list_feature_services(&self) -> Result<Vec<FcoRecord<FeatureServiceSpec>>> {
        self.registry
            .list_feature_services(&self.config.project)
            .await
    }

    pub async fn get_feature_service(&self, name: &str) -> Result<FcoRecord<FeatureServiceSpec>> {
        self.registry
            .get_feature_service(&self.config.project, name)
            .await
    }

    /// Sync a caller-supplied range for the named feature views
    pub async fn materialize(
        &self,
        views: &[&str],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<MaterializationRun>> {
        self.engine
            .materialize(&self.config.project, views, start, end)
            .await
    }

    /// Sync from each view's watermark up to `end`
    pub async fn materialize_incremental(
        &self,
        views: &[&str],
        end: DateTime<Utc>,
    ) -> Result<Vec<MaterializationRun>> {
        self.engine
            .materialize_incremental(&self.config.project, views, end)
            .await
    }

    /// Latest online values for each entity key
    pub async fn get_online_features(
        &self,
        view: &str,
        entity_keys: &[EntityKey],
        features: &[String],
    ) -> Result<Vec<HashMap<String, FeatureValue>>> {
        self.provider.online_read(view, entity_keys, features).await
    }

    /// Remove this project's registry snapshot
    pub async fn teardown(&self) -> Result<()> {
        self.registry.teardown(&self.config.project).await
    }
}
