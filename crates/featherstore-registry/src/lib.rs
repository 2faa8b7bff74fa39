//! Feature Registry for Featherstore
//!
//! Durable, versioned metadata store over the feature-coupled object family
//! with diff-based, idempotent apply semantics. The registry owns a working
//! copy of the project snapshot during an operation and reconciles it
//! against its backing [`RegistryStore`] at commit time; readers never
//! observe a partially applied snapshot.
//!
//! Built-in store backends: in-memory, JSON file with atomic replace, and
//! SQLite with WAL. Out-of-tree backends are resolved by qualified name
//! through [`registry_store_resolver`].
//!
//! # Examples
//!
//! ```rust,ignore
//! use featherstore_registry::{Registry, MemoryRegistryStore};
//! use featherstore_core::{RepoContents, EntitySpec};
//! use std::sync::Arc;
//!
//! let registry = Registry::new(Arc::new(MemoryRegistryStore::new()));
//! let contents = RepoContents::default()
//!     .with_entity(EntitySpec::new("driver", "driver_id"));
//! let diff = registry.apply("driver_project", &contents).await?;
//! assert_eq!(diff.inserted, 1);
//! ```

use chrono::{DateTime, Utc};
use featherstore_core::error::{Error, Result};
use featherstore_core::resolver::{PluginKind, PluginResolver};
use featherstore_core::types::{
    DataSourceSpec, EntitySpec, FcoKind, FcoRecord, FeatureServiceSpec, FeatureViewSpec,
    OnDemandFeatureViewSpec, RegistrySnapshot, RepoContents,
};
use featherstore_core::{recover_mutex, RegistryStore};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

pub mod diff;
mod file_store;
mod memory_store;
mod sqlite_store;
pub mod validate;

pub use diff::DiffCounts;
pub use file_store::FileRegistryStore;
pub use memory_store::MemoryRegistryStore;
pub use sqlite_store::SqliteRegistryStore;

/// Summary of one apply: how many objects fell into each diff class
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyDiff {
    pub inserted: usize,
    pub updated: usize,
    pub deleted: usize,
    pub unchanged: usize,
}

impl ApplyDiff {
    /// True when the declared set matched the snapshot exactly and nothing
    /// was persisted
    pub fn is_noop(&self) -> bool {
        self.inserted + self.updated + self.deleted == 0
    }
}

/// In-memory object model plus diff/merge logic over the FCO family
///
/// One instance serves any number of projects; `apply`, watermark updates
/// and teardown hold an exclusive per-project section so concurrent calls
/// on the same project cannot interleave into a torn snapshot. The calling
/// process owns the registry's lifetime; there is no process-wide
/// singleton.
pub struct Registry {
    store: Arc<dyn RegistryStore>,
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl Registry {
    pub fn new(store: Arc<dyn RegistryStore>) -> Self {
        Self {
            store,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Backing store for this registry
    pub fn store(&self) -> &Arc<dyn RegistryStore> {
        &self.store
    }

    fn project_lock(&self, project: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = recover_mutex(&self.locks, "Registry");
        locks
            .entry(project.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    /// Diff the declared object set against the current snapshot and persist
    /// the result
    ///
    /// Referential validation runs before any mutation; a failure aborts
    /// the whole apply with no partial effect. A second apply with an
    /// unchanged declared set is a no-op: nothing is written, the stored
    /// snapshot stays byte-for-byte equal and all watermarks untouched.
    pub async fn apply(&self, project: &str, contents: &RepoContents) -> Result<ApplyDiff> {
        validate::validate_contents(contents)?;

        let lock = self.project_lock(project);
        let _guard = lock.lock().await;

        let now = Utc::now();
        let old = self
            .store
            .load(project)
            .await?
            .unwrap_or_else(|| RegistrySnapshot::empty(project, now));

        let mut total = DiffCounts::default();
        let (entities, counts) = diff::reconcile(&old.entities, &contents.entities, now);
        total += counts;
        let (data_sources, counts) = diff::reconcile(&old.data_sources, &contents.data_sources, now);
        total += counts;
        let (feature_views, counts) =
            diff::reconcile(&old.feature_views, &contents.feature_views, now);
        total += counts;
        let (on_demand_feature_views, counts) = diff::reconcile(
            &old.on_demand_feature_views,
            &contents.on_demand_feature_views,
            now,
        );
        total += counts;
        let (feature_services, counts) =
            diff::reconcile(&old.feature_services, &contents.feature_services, now);
        total += counts;

        let summary = ApplyDiff {
            inserted: total.inserted,
            updated: total.updated,
            deleted: total.deleted,
            unchanged: total.unchanged,
        };

        if summary.is_noop() {
            debug!(project, "Apply is a no-op, snapshot unchanged");
            return Ok(summary);
        }

        let snapshot = RegistrySnapshot {
            project: project.to_string(),
            version: old.version + 1,
            last_updated: now,
            entities,
            data_sources,
            feature_views,
            on_demand_feature_views,
            feature_services,
        };
        self.store.save(&snapshot).await?;

        info!(
            project,
            version = snapshot.version,
            inserted = summary.inserted,
            updated = summary.updated,
            deleted = summary.deleted,
            "Applied registry diff"
        );
        Ok(summary)
    }

    /// Current snapshot for a project, if it was ever applied to
    pub async fn snapshot(&self, project: &str) -> Result<Option<RegistrySnapshot>> {
        self.store.load(project).await
    }

    async fn load_or_empty(&self, project: &str) -> Result<RegistrySnapshot> {
        Ok(self
            .store
            .load(project)
            .await?
            .unwrap_or_else(|| RegistrySnapshot::empty(project, Utc::now())))
    }

    /// All entities in insertion order; empty is valid
    pub async fn list_entities(&self, project: &str) -> Result<Vec<FcoRecord<EntitySpec>>> {
        Ok(self.load_or_empty(project).await?.entities)
    }

    pub async fn list_data_sources(&self, project: &str) -> Result<Vec<FcoRecord<DataSourceSpec>>> {
        Ok(self.load_or_empty(project).await?.data_sources)
    }

    pub async fn list_feature_views(
        &self,
        project: &str,
    ) -> Result<Vec<FcoRecord<FeatureViewSpec>>> {
        Ok(self.load_or_empty(project).await?.feature_views)
    }

    pub async fn list_on_demand_feature_views(
        &self,
        project: &str,
    ) -> Result<Vec<FcoRecord<OnDemandFeatureViewSpec>>> {
        Ok(self.load_or_empty(project).await?.on_demand_feature_views)
    }

    pub async fn list_feature_services(
        &self,
        project: &str,
    ) -> Result<Vec<FcoRecord<FeatureServiceSpec>>> {
        Ok(self.load_or_empty(project).await?.feature_services)
    }

    /// Full spec and metadata for a single entity
    pub async fn get_entity(&self, project: &str, name: &str) -> Result<FcoRecord<EntitySpec>> {
        let snapshot = self.load_or_empty(project).await?;
        find(&snapshot.entities, FcoKind::Entity, name)
    }

    pub async fn get_data_source(
        &self,
        project: &str,
        name: &str,
    ) -> Result<FcoRecord<DataSourceSpec>> {
        let snapshot = self.load_or_empty(project).await?;
        find(&snapshot.data_sources, FcoKind::DataSource, name)
    }

    pub async fn get_feature_view(
        &self,
        project: &str,
        name: &str,
    ) -> Result<FcoRecord<FeatureViewSpec>> {
        let snapshot = self.load_or_empty(project).await?;
        find(&snapshot.feature_views, FcoKind::FeatureView, name)
    }

    pub async fn get_on_demand_feature_view(
        &self,
        project: &str,
        name: &str,
    ) -> Result<FcoRecord<OnDemandFeatureViewSpec>> {
        let snapshot = self.load_or_empty(project).await?;
        find(
            &snapshot.on_demand_feature_views,
            FcoKind::OnDemandFeatureView,
            name,
        )
    }

    pub async fn get_feature_service(
        &self,
        project: &str,
        name: &str,
    ) -> Result<FcoRecord<FeatureServiceSpec>> {
        let snapshot = self.load_or_empty(project).await?;
        find(&snapshot.feature_services, FcoKind::FeatureService, name)
    }

    /// Explicitly delete one FCO
    ///
    /// Fails with `NotFound` for absent names and with a validation error
    /// when the object is still referenced by another object in the
    /// snapshot.
    pub async fn delete(&self, project: &str, kind: FcoKind, name: &str) -> Result<()> {
        let lock = self.project_lock(project);
        let _guard = lock.lock().await;

        let mut snapshot = self
            .store
            .load(project)
            .await?
            .ok_or_else(|| Error::NotFound {
                kind,
                name: name.to_string(),
            })?;

        validate::validate_delete(&snapshot, kind, name)?;

        let removed = match kind {
            FcoKind::Entity => remove_by_name(&mut snapshot.entities, name),
            FcoKind::DataSource => remove_by_name(&mut snapshot.data_sources, name),
            FcoKind::FeatureView => remove_by_name(&mut snapshot.feature_views, name),
            FcoKind::OnDemandFeatureView => {
                remove_by_name(&mut snapshot.on_demand_feature_views, name)
            }
            FcoKind::FeatureService => remove_by_name(&mut snapshot.feature_services, name),
        };
        if !removed {
            return Err(Error::NotFound {
                kind,
                name: name.to_string(),
            });
        }

        snapshot.version += 1;
        snapshot.last_updated = Utc::now();
        self.store.save(&snapshot).await?;
        info!(project, %kind, name, "Deleted registry object");
        Ok(())
    }

    /// Remove the project's snapshot entirely
    ///
    /// Safe to call on an already-torn-down or never-initialized project.
    pub async fn teardown(&self, project: &str) -> Result<()> {
        let lock = self.project_lock(project);
        let _guard = lock.lock().await;
        self.store.teardown(project).await?;
        info!(project, "Tore down registry");
        Ok(())
    }

    /// Advance a feature view's materialization watermark
    ///
    /// Max-merge policy: the stored watermark only ever moves forward, so a
    /// stale run committing an older end time cannot roll it back. Returns
    /// the effective watermark after the merge.
    pub async fn update_watermark(
        &self,
        project: &str,
        view: &str,
        end: DateTime<Utc>,
    ) -> Result<DateTime<Utc>> {
        let lock = self.project_lock(project);
        let _guard = lock.lock().await;

        let mut snapshot = self
            .store
            .load(project)
            .await?
            .ok_or_else(|| Error::NotFound {
                kind: FcoKind::FeatureView,
                name: view.to_string(),
            })?;

        let record = snapshot
            .feature_view_mut(view)
            .ok_or_else(|| Error::NotFound {
                kind: FcoKind::FeatureView,
                name: view.to_string(),
            })?;

        match record.meta.watermark {
            Some(existing) if existing >= end => {
                debug!(project, view, %existing, %end, "Watermark already ahead, keeping it");
                Ok(existing)
            }
            _ => {
                record.meta.watermark = Some(end);
                snapshot.version += 1;
                snapshot.last_updated = Utc::now();
                self.store.save(&snapshot).await?;
                info!(project, view, watermark = %end, "Advanced materialization watermark");
                Ok(end)
            }
        }
    }
}

fn find<S: Clone + featherstore_core::FcoSpec>(
    records: &[FcoRecord<S>],
    kind: FcoKind,
    name: &str,
) -> Result<FcoRecord<S>> {
    records
        .iter()
        .find(|r| r.name() == name)
        .cloned()
        .ok_or_else(|| Error::NotFound {
            kind,
            name: name.to_string(),
        })
}

fn remove_by_name<S: featherstore_core::FcoSpec>(records: &mut Vec<FcoRecord<S>>, name: &str) -> bool {
    let before = records.len();
    records.retain(|r| r.name() != name);
    records.len() != before
}

/// Resolver preloaded with the built-in registry store backends
///
/// Out-of-tree backends register their module/class constructors on top;
/// custom class names must end with `RegistryStore`.
pub fn registry_store_resolver() -> PluginResolver<Arc<dyn RegistryStore>> {
    let mut resolver = PluginResolver::new(PluginKind::RegistryStore);

    resolver.register_builtin(
        "MemoryRegistryStore",
        Arc::new(|_| Ok(Arc::new(MemoryRegistryStore::new()) as Arc<dyn RegistryStore>)),
    );
    resolver.register_builtin(
        "FileRegistryStore",
        Arc::new(|config| {
            let path = config.registry.path.clone().ok_or_else(|| {
                Error::validation("FileRegistryStore requires registry.path in the repo config")
            })?;
            Ok(Arc::new(FileRegistryStore::new(path)) as Arc<dyn RegistryStore>)
        }),
    );
    resolver.register_builtin(
        "SqliteRegistryStore",
        Arc::new(|config| {
            let path = config.registry.path.clone().ok_or_else(|| {
                Error::validation("SqliteRegistryStore requires registry.path in the repo config")
            })?;
            Ok(Arc::new(SqliteRegistryStore::new(path)?) as Arc<dyn RegistryStore>)
        }),
    );

    resolver
}
