//! SQLite-backed registry store with WAL mode
//!
//! Stores the serialized snapshot per project in a single table. WAL mode
//! keeps concurrent readers from blocking the writer, which makes the store
//! safe to share across a handful of worker processes. Suitable for:
//! - Small to medium deployments (<10 concurrent workers)
//! - Embedded deployments (no external dependencies)
//! - Development and testing

use anyhow::Context;
use async_trait::async_trait;
use featherstore_core::{recover_mutex, RegistrySnapshot, RegistryStore, Result};
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info};

pub struct SqliteRegistryStore {
    db: Mutex<Connection>,
}

impl SqliteRegistryStore {
    /// Open or create a file-backed store
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db = Connection::open_with_flags(
            path.as_ref(),
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_FULL_MUTEX,
        )
        .context("Failed to open SQLite connection for registry")?;

        // WAL for multi-process safe concurrent access; wait on locks
        // instead of failing immediately
        db.pragma_update(None, "journal_mode", "WAL")
            .context("Failed to enable WAL mode")?;
        db.pragma_update(None, "busy_timeout", 5000)
            .context("Failed to set busy timeout")?;
        db.pragma_update(None, "synchronous", "NORMAL")
            .context("Failed to set synchronous mode")?;

        create_schema(&db)?;
        info!("Initialized SQLite registry at {:?} with WAL mode", path.as_ref());

        Ok(Self { db: Mutex::new(db) })
    }

    /// In-memory store for testing
    pub fn in_memory() -> Result<Self> {
        let db =
            Connection::open_in_memory().context("Failed to create in-memory SQLite connection")?;
        create_schema(&db)?;
        debug!("Initialized in-memory SQLite registry");
        Ok(Self { db: Mutex::new(db) })
    }
}

fn create_schema(db: &Connection) -> Result<()> {
    db.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS registry_snapshots (
            project TEXT PRIMARY KEY,
            version INTEGER NOT NULL,
            payload TEXT NOT NULL,
            updated_at BIGINT NOT NULL
        );
        "#,
    )
    .context("Failed to create registry schema")?;
    Ok(())
}

#[async_trait]
impl RegistryStore for SqliteRegistryStore {
    async fn load(&self, project: &str) -> Result<Option<RegistrySnapshot>> {
        let db = recover_mutex(&self.db, "SqliteRegistryStore");

        let payload: Option<String> = db
            .query_row(
                "SELECT payload FROM registry_snapshots WHERE project = ?",
                params![project],
                |row| row.get(0),
            )
            .optional()
            .context("Failed to load registry snapshot")?;

        match payload {
            Some(payload) => Ok(Some(serde_json::from_str(&payload)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, snapshot: &RegistrySnapshot) -> Result<()> {
        let payload = serde_json::to_string(snapshot)?;
        let db = recover_mutex(&self.db, "SqliteRegistryStore");

        db.execute(
            r#"
            INSERT OR REPLACE INTO registry_snapshots (project, version, payload, updated_at)
            VALUES (?, ?, ?, ?)
            "#,
            params![
                &snapshot.project,
                snapshot.version as i64,
                payload,
                snapshot.last_updated.timestamp(),
            ],
        )
        .context("Failed to save registry snapshot")?;

        debug!(project = %snapshot.project, version = snapshot.version, "Saved registry snapshot");
        Ok(())
    }

    async fn teardown(&self, project: &str) -> Result<()> {
        let db = recover_mutex(&self.db, "SqliteRegistryStore");
        db.execute(
            "DELETE FROM registry_snapshots WHERE project = ?",
            params![project],
        )
        .context("Failed to tear down registry snapshot")?;
        Ok(())
    }

    fn store_type(&self) -> &'static str {
        "sqlite"
    }
}
