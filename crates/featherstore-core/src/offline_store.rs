//! Offline store contract
//!
//! The offline store is the historical source of truth for feature values
//! over time. The core only needs a narrow read surface from it: the latest
//! row per entity key inside a time window. Concrete warehouse connectors
//! live outside the core and implement this trait.

use crate::error::Result;
use crate::types::{FeatureRow, FeatureViewSpec};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Historical, queryable feature source
#[async_trait]
pub trait OfflineStore: Send + Sync {
    /// Pull the latest row per entity key with an event timestamp in
    /// `start..=end`.
    ///
    /// The materialization window is half-open at `end`, but a row at
    /// exactly `end` is included when it is the latest available for its
    /// key, so implementations filter with an inclusive upper bound and
    /// deduplicate to the newest row per key.
    async fn pull_latest(
        &self,
        view: &FeatureViewSpec,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<FeatureRow>>;

    /// Name of this store type (for logging)
    fn store_type(&self) -> &'static str;
}
