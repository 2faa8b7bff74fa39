//! Repo configuration types
//!
//! The calling process owns configuration loading (YAML parsing, environment
//! handling); the core only consumes a fully resolved `RepoConfig`. Nothing
//! in this crate reads files or environment variables.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Fully resolved configuration for one feature repo
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoConfig {
    /// Project name; the unit of snapshot isolation
    pub project: String,

    /// Provider identifier: a built-in alias ("local") or a qualified
    /// `module.ClassName` resolved through the plugin resolver
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Registry store configuration
    #[serde(default)]
    pub registry: RegistryStoreConfig,

    /// Per-environment offline store parameters, passed through to the
    /// resolved provider untouched
    #[serde(default)]
    pub offline_params: HashMap<String, serde_json::Value>,

    /// Per-environment online store parameters
    #[serde(default)]
    pub online_params: HashMap<String, serde_json::Value>,
}

fn default_provider() -> String {
    "local".to_string()
}

impl RepoConfig {
    pub fn new(project: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            provider: default_provider(),
            registry: RegistryStoreConfig::default(),
            offline_params: HashMap::new(),
            online_params: HashMap::new(),
        }
    }

    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = provider.into();
        self
    }

    pub fn with_registry(mut self, registry: RegistryStoreConfig) -> Self {
        self.registry = registry;
        self
    }
}

/// Registry store selection and backend parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryStoreConfig {
    /// Registry store identifier: a built-in class name
    /// ("FileRegistryStore", "SqliteRegistryStore", "MemoryRegistryStore")
    /// or a qualified `module.ClassName`. Custom class names must end with
    /// `RegistryStore`.
    pub store_type: String,

    /// Backend location for the file and SQLite stores
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl Default for RegistryStoreConfig {
    fn default() -> Self {
        Self {
            store_type: "MemoryRegistryStore".to_string(),
            path: None,
        }
    }
}

impl RegistryStoreConfig {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            store_type: "FileRegistryStore".to_string(),
            path: Some(path.into()),
        }
    }

    pub fn sqlite(path: impl Into<PathBuf>) -> Self {
        Self {
            store_type: "SqliteRegistryStore".to_string(),
            path: Some(path.into()),
        }
    }

    pub fn memory() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let json = r#"{"project": "driver_project"}"#;
        let config: RepoConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.project, "driver_project");
        assert_eq!(config.provider, "local");
        assert_eq!(config.registry.store_type, "MemoryRegistryStore");
    }

    #[test]
    fn test_registry_store_config_builders() {
        let config = RegistryStoreConfig::sqlite("/tmp/registry.db");
        assert_eq!(config.store_type, "SqliteRegistryStore");
        assert_eq!(config.path, Some(PathBuf::from("/tmp/registry.db")));
    }
}
