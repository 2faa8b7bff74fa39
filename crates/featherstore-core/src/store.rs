//! Registry store contract
//!
//! A registry store persists and retrieves the serialized metadata snapshot
//! for a project. It owns the snapshot exclusively; the registry holds a
//! working copy during a session and reconciles it at commit time.
//!
//! Implementations are pluggable (file, embedded database, remote service)
//! and resolved by name through the plugin resolver.

use crate::error::Result;
use crate::types::RegistrySnapshot;
use async_trait::async_trait;

/// Storage backend for registry snapshots
///
/// ## Implementation requirements
///
/// - `save` replaces the stored snapshot atomically: a concurrent `load`
///   observes either the previous or the new snapshot, never a torn write.
/// - `teardown` is idempotent; tearing down a project that was never
///   initialized is a no-op.
#[async_trait]
pub trait RegistryStore: Send + Sync {
    /// Load the snapshot for a project, or None if the project has never
    /// been applied to
    async fn load(&self, project: &str) -> Result<Option<RegistrySnapshot>>;

    /// Atomically replace the stored snapshot for `snapshot.project`
    async fn save(&self, snapshot: &RegistrySnapshot) -> Result<()>;

    /// Remove the project's snapshot; safe to call repeatedly
    async fn teardown(&self, project: &str) -> Result<()>;

    /// Name of this store type (for logging)
    fn store_type(&self) -> &'static str;
}

impl std::fmt::Debug for dyn RegistryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryStore")
            .field("store_type", &self.store_type())
            .finish_non_exhaustive()
    }
}
