//! In-memory registry store
//!
//! Keeps snapshots in a process-local map. Used for tests and for callers
//! that manage persistence themselves.

use async_trait::async_trait;
use featherstore_core::{recover_mutex, RegistrySnapshot, RegistryStore, Result};
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Default)]
pub struct MemoryRegistryStore {
    snapshots: Mutex<HashMap<String, RegistrySnapshot>>,
}

impl MemoryRegistryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RegistryStore for MemoryRegistryStore {
    async fn load(&self, project: &str) -> Result<Option<RegistrySnapshot>> {
        let snapshots = recover_mutex(&self.snapshots, "MemoryRegistryStore");
        Ok(snapshots.get(project).cloned())
    }

    async fn save(&self, snapshot: &RegistrySnapshot) -> Result<()> {
        let mut snapshots = recover_mutex(&self.snapshots, "MemoryRegistryStore");
        snapshots.insert(snapshot.project.clone(), snapshot.clone());
        Ok(())
    }

    async fn teardown(&self, project: &str) -> Result<()> {
        let mut snapshots = recover_mutex(&self.snapshots, "MemoryRegistryStore");
        snapshots.remove(project);
        Ok(())
    }

    fn store_type(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[tokio::test]
    async fn test_load_missing_project_is_none() {
        let store = MemoryRegistryStore::new();
        assert!(store.load("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_load_teardown() {
        let store = MemoryRegistryStore::new();
        let snapshot = RegistrySnapshot::empty("demo", Utc::now());

        store.save(&snapshot).await.unwrap();
        assert_eq!(store.load("demo").await.unwrap(), Some(snapshot));

        store.teardown("demo").await.unwrap();
        assert!(store.load("demo").await.unwrap().is_none());

        // Teardown of a torn-down project is a no-op
        store.teardown("demo").await.unwrap();
    }
}
