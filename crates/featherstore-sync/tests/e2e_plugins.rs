//! End-to-end tests for provider and registry-store plugin resolution
//!
//! Exercises `FeatureStore::from_config` construction across the built-in
//! backends and caller-registered third-party classes, including the exact
//! error wording each failure mode surfaces.

use chrono::Utc;
use featherstore_core::types::{DataSourceSpec, EntitySpec, FeatureViewSpec, RepoContents};
use featherstore_core::{Provider, RegistryStore, RegistryStoreConfig, RepoConfig};
use featherstore_registry::{registry_store_resolver, MemoryRegistryStore};
use featherstore_sync::{provider_resolver, FeatureStore, LocalProvider};
use std::sync::Arc;

fn tiny_repo() -> RepoContents {
    RepoContents::default()
        .with_entity(EntitySpec::new("driver", "driver_id"))
        .with_data_source(DataSourceSpec::new(
            "driver_source",
            "data/drivers",
            "event_timestamp",
        ))
        .with_feature_view(FeatureViewSpec::new(
            "driver_stats",
            vec!["driver".to_string()],
            vec!["trips".to_string()],
            "driver_source",
        ))
}

#[tokio::test]
async fn test_default_config_resolves_memory_and_local() {
    let store = FeatureStore::from_config(RepoConfig::new("plugin_project")).unwrap();
    assert_eq!(store.provider().provider_type(), "local");

    let diff = store.apply(&tiny_repo()).await.unwrap();
    assert_eq!(diff.inserted, 3);
}

#[tokio::test]
async fn test_unknown_provider_message() {
    let config = RepoConfig::new("p").with_provider("gcp");
    let err = FeatureStore::from_config(config).unwrap_err();
    assert_eq!(err.to_string(), "Provider 'gcp' is not implemented");
    assert_eq!(err.exit_code(), 1);
}

#[tokio::test]
async fn test_unknown_registry_store_message() {
    let config = RepoConfig::new("p").with_registry(RegistryStoreConfig {
        store_type: "NopeRegistryStore".to_string(),
        path: None,
    });
    let err = FeatureStore::from_config(config).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Registry store 'NopeRegistryStore' is not implemented"
    );
}

#[tokio::test]
async fn test_registry_store_suffix_checked_before_lookup() {
    // A dotless name that is no registered builtin still fails the naming
    // rule first
    let config = RepoConfig::new("p").with_registry(RegistryStoreConfig {
        store_type: "acme123".to_string(),
        path: None,
    });
    let err = FeatureStore::from_config(config).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Registry store class name should end with \"RegistryStore\""
    );
}

#[tokio::test]
async fn test_unregistered_provider_module_message() {
    let config = RepoConfig::new("p").with_provider("foo.provider.FooProvider");
    let err = FeatureStore::from_config(config).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Could not import module 'foo.provider' while attempting to load class 'FooProvider'"
    );
}

#[tokio::test]
async fn test_wrong_class_in_registered_module_message() {
    let mut providers = provider_resolver();
    providers.register_class(
        "acme.providers",
        "AcmeProvider",
        Arc::new(|_config| Ok(Arc::new(LocalProvider::in_memory()) as Arc<dyn Provider>)),
    );

    let config = RepoConfig::new("p").with_provider("acme.providers.OtherProvider");
    let err = FeatureStore::from_config_with_resolvers(
        config,
        registry_store_resolver(),
        providers,
    )
    .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Could not import class 'OtherProvider' from module 'acme.providers'"
    );
}

#[tokio::test]
async fn test_third_party_provider_full_lifecycle() {
    let mut providers = provider_resolver();
    providers.register_class(
        "acme.providers",
        "AcmeProvider",
        Arc::new(|_config| Ok(Arc::new(LocalProvider::in_memory()) as Arc<dyn Provider>)),
    );

    let config = RepoConfig::new("p").with_provider("acme.providers.AcmeProvider");
    let store =
        FeatureStore::from_config_with_resolvers(config, registry_store_resolver(), providers)
            .unwrap();

    assert_eq!(store.provider().provider_type(), "local");
    store.apply(&tiny_repo()).await.unwrap();
    let snapshot = store.registry().snapshot("p").await.unwrap().unwrap();
    assert_eq!(snapshot.version, 1);
}

#[tokio::test]
async fn test_third_party_registry_store_resolves() {
    let mut stores = registry_store_resolver();
    stores.register_class(
        "acme.stores",
        "AcmeRegistryStore",
        Arc::new(|_config| Ok(Arc::new(MemoryRegistryStore::new()) as Arc<dyn RegistryStore>)),
    );

    let config = RepoConfig::new("p").with_registry(RegistryStoreConfig {
        store_type: "acme.stores.AcmeRegistryStore".to_string(),
        path: None,
    });
    let store =
        FeatureStore::from_config_with_resolvers(config, stores, provider_resolver()).unwrap();
    store.apply(&tiny_repo()).await.unwrap();
}

#[tokio::test]
async fn test_file_registry_store_from_config() {
    let dir = tempfile::tempdir().unwrap();
    let config = |project: &str| {
        RepoConfig::new(project).with_registry(RegistryStoreConfig::file(dir.path()))
    };

    let store = FeatureStore::from_config(config("file_project")).unwrap();
    store.apply(&tiny_repo()).await.unwrap();
    drop(store);

    // A fresh store over the same directory sees the persisted snapshot
    let store = FeatureStore::from_config(config("file_project")).unwrap();
    let views = store.list_feature_views().await.unwrap();
    assert_eq!(views.len(), 1);
    assert_eq!(views[0].spec.name, "driver_stats");
}

#[tokio::test]
async fn test_sqlite_registry_store_from_config() {
    let dir = tempfile::tempdir().unwrap();
    let config = RepoConfig::new("sqlite_project")
        .with_registry(RegistryStoreConfig::sqlite(dir.path().join("registry.db")));

    let store = FeatureStore::from_config(config).unwrap();
    store.apply(&tiny_repo()).await.unwrap();

    let entity = store.get_entity("driver").await.unwrap();
    assert_eq!(entity.spec.join_key, "driver_id");
    assert!(entity.meta.created_at <= Utc::now());
}

#[tokio::test]
async fn test_file_registry_store_requires_path() {
    let config = RepoConfig::new("p").with_registry(RegistryStoreConfig {
        store_type: "FileRegistryStore".to_string(),
        path: None,
    });
    let err = FeatureStore::from_config(config).unwrap_err();
    assert!(err
        .to_string()
        .contains("FileRegistryStore requires registry.path"));
}
