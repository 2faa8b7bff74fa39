//! File-backed registry store
//!
//! One JSON document per project under a root directory. Saves go through a
//! temp file in the same directory followed by a rename, so concurrent
//! readers observe either the old or the new snapshot, never a torn write.

use anyhow::Context;
use async_trait::async_trait;
use featherstore_core::{RegistrySnapshot, RegistryStore, Result};
use std::io::Write;
use std::path::PathBuf;
use tracing::debug;

pub struct FileRegistryStore {
    root: PathBuf,
}

impl FileRegistryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn project_path(&self, project: &str) -> PathBuf {
        self.root.join(format!("{project}.json"))
    }
}

#[async_trait]
impl RegistryStore for FileRegistryStore {
    async fn load(&self, project: &str) -> Result<Option<RegistrySnapshot>> {
        let path = self.project_path(project);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(anyhow::Error::new(e)
                    .context(format!("Failed to read registry file {}", path.display()))
                    .into())
            }
        };
        let snapshot = serde_json::from_slice(&bytes)?;
        Ok(Some(snapshot))
    }

    async fn save(&self, snapshot: &RegistrySnapshot) -> Result<()> {
        std::fs::create_dir_all(&self.root)
            .with_context(|| format!("Failed to create registry dir {}", self.root.display()))?;

        let path = self.project_path(&snapshot.project);
        let payload = serde_json::to_vec_pretty(snapshot)?;

        // Write-then-rename within the root dir keeps the replace atomic on
        // the same filesystem
        let mut tmp = tempfile::NamedTempFile::new_in(&self.root)
            .context("Failed to create temp registry file")?;
        tmp.write_all(&payload)
            .context("Failed to write registry snapshot")?;
        tmp.persist(&path)
            .with_context(|| format!("Failed to replace registry file {}", path.display()))?;

        debug!(project = %snapshot.project, version = snapshot.version, "Saved registry snapshot");
        Ok(())
    }

    async fn teardown(&self, project: &str) -> Result<()> {
        let path = self.project_path(project);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(anyhow::Error::new(e)
                .context(format!("Failed to remove registry file {}", path.display()))
                .into()),
        }
    }

    fn store_type(&self) -> &'static str {
        "file"
    }
}
