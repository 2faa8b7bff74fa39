//! Provider contract
//!
//! A provider mediates all I/O between the core and the concrete
//! offline/online stores. The materialization engine drives it through
//! time windows; serving paths use its online read/write primitives.
//!
//! Third-party providers are resolved by name exactly like registry store
//! plugins; see [`crate::resolver`].

use crate::error::Result;
use crate::types::{EntityKey, FeatureRow, FeatureValue, FeatureViewSpec};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Pluggable mediator implementing offline/online I/O
#[async_trait]
pub trait Provider: Send + Sync {
    /// Name of this provider (for logging)
    fn provider_type(&self) -> &'static str;

    /// Copy feature values for the window from the offline collaborator to
    /// the online collaborator, latest row per entity key. Returns the
    /// number of rows written.
    ///
    /// Must not acknowledge success before all online writes are durably
    /// acknowledged; the engine advances the watermark only afterwards.
    async fn materialize(
        &self,
        view: &FeatureViewSpec,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<usize>;

    /// Read the latest online values for each entity key; absent values
    /// come back as `FeatureValue::Null`
    async fn online_read(
        &self,
        view: &str,
        entity_keys: &[EntityKey],
        features: &[String],
    ) -> Result<Vec<HashMap<String, FeatureValue>>>;

    /// Write rows directly to the online store (last-write-wins by event
    /// time)
    async fn online_write(&self, view: &str, rows: Vec<FeatureRow>) -> Result<()>;
}

impl std::fmt::Debug for dyn Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Provider")
            .field("provider_type", &self.provider_type())
            .finish_non_exhaustive()
    }
}
