//! Materialization engine
//!
//! Computes the time window to sync per feature view and drives the
//! provider through it, persisting new watermarks on success.
//!
//! ## State machine per view, per invocation
//!
//! ```text
//! Idle ──window──► Windowing ──provider──► Running ──commit──► Committed
//!                     │                       │
//!                 InvalidWindow            store error
//!                     ▼                       ▼
//!                  Failed (provider       Failed (watermark
//!                  never contacted)       untouched, retry resumes)
//! ```
//!
//! The watermark is advanced only after the provider has acknowledged all
//! writes for the window, and only forward (max-merge), so a stale run
//! never rolls it back. Writes are idempotent under replay (last-write-wins
//! by event time), giving at-least-once semantics per window.

use chrono::{DateTime, Utc};
use featherstore_core::error::{Error, Result};
use featherstore_core::time::clamp_start_to_ttl;
use featherstore_core::types::{FcoRecord, FeatureViewSpec};
use featherstore_core::{recover_mutex, Provider};
use featherstore_registry::Registry;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{info, warn};

/// Result of one synchronized window for one feature view
#[derive(Debug, Clone)]
pub struct MaterializationRun {
    pub feature_view: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub rows_written: usize,
    pub duration: std::time::Duration,
}

/// Windowed, resumable offline-to-online synchronization
pub struct MaterializationEngine {
    registry: Arc<Registry>,
    provider: Arc<dyn Provider>,
    // Serializes runs per (project, view): concurrent runs against the same
    // online destination would race on the watermark
    locks: Mutex<HashMap<(String, String), Arc<tokio::sync::Mutex<()>>>>,
}

impl MaterializationEngine {
    pub fn new(registry: Arc<Registry>, provider: Arc<dyn Provider>) -> Self {
        Self {
            registry,
            provider,
            locks: Mutex::new(HashMap::new()),
        }
    }

    fn view_lock(&self, project: &str, view: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = recover_mutex(&self.locks, "MaterializationEngine");
        locks
            .entry((project.to_string(), view.to_string()))
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    /// Sync a caller-supplied range for each view
    ///
    /// The start is clamped to no earlier than `end - ttl` for views with a
    /// TTL. An inverted range fails with `InvalidWindow` before the
    /// provider is contacted.
    pub async fn materialize(
        &self,
        project: &str,
        views: &[&str],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<MaterializationRun>> {
        if start > end {
            return Err(Error::invalid_window(format!(
                "start {} is after end {}",
                start, end
            )));
        }

        let mut runs = Vec::with_capacity(views.len());
        for name in views {
            let record = self.registry.get_feature_view(project, name).await?;
            let start = clamp_start_to_ttl(start, end, record.spec.ttl);
            runs.push(self.run_window(project, &record, start, end).await?);
        }
        Ok(runs)
    }

    /// Sync from each view's stored watermark up to `end`
    ///
    /// A view with no watermark yet falls back to `end - ttl`; a view with
    /// neither cannot derive a lower bound and fails with `InvalidWindow`.
    pub async fn materialize_incremental(
        &self,
        project: &str,
        views: &[&str],
        end: DateTime<Utc>,
    ) -> Result<Vec<MaterializationRun>> {
        let mut runs = Vec::with_capacity(views.len());
        for name in views {
            let record = self.registry.get_feature_view(project, name).await?;
            let start = incremental_start(&record, end)?;
            if start > end {
                return Err(Error::invalid_window(format!(
                    "feature view '{}': watermark {} is after end {}",
                    name, start, end
                )));
            }
            runs.push(self.run_window(project, &record, start, end).await?);
        }
        Ok(runs)
    }

    async fn run_window(
        &self,
        project: &str,
        record: &FcoRecord<FeatureViewSpec>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<MaterializationRun> {
        let view = &record.spec;
        let lock = self.view_lock(project, &view.name);
        let _guard = lock.lock().await;

        let started = Instant::now();
        let rows_written = match self.provider.materialize(view, start, end).await {
            Ok(rows) => rows,
            Err(e) => {
                // Watermark untouched: a retry resumes from the last
                // committed point
                warn!(
                    project,
                    view = %view.name,
                    start = %start,
                    end = %end,
                    error = %e,
                    "Materialization window failed"
                );
                return Err(e);
            }
        };

        // All writes acknowledged; only now may the watermark move
        self.registry
            .update_watermark(project, &view.name, end)
            .await?;

        let duration = started.elapsed();
        info!(
            project,
            view = %view.name,
            start = %start,
            end = %end,
            rows = rows_written,
            ?duration,
            "Materialization window committed"
        );

        Ok(MaterializationRun {
            feature_view: view.name.clone(),
            start,
            end,
            rows_written,
            duration,
        })
    }
}

fn incremental_start(
    record: &FcoRecord<FeatureViewSpec>,
    end: DateTime<Utc>,
) -> Result<DateTime<Utc>> {
    if let Some(watermark) = record.meta.watermark {
        return Ok(watermark);
    }
    match record
        .spec
        .ttl
        .and_then(|t| chrono::Duration::from_std(t).ok())
    {
        // A TTL reaching before representable time syncs from the earliest
        // representable instant
        Some(ttl) => Ok(end
            .checked_sub_signed(ttl)
            .unwrap_or(DateTime::<Utc>::MIN_UTC)),
        None => Err(Error::invalid_window(format!(
            "feature view '{}' has no materialization watermark and no ttl to derive a start from",
            record.spec.name
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use featherstore_core::types::FcoMeta;
    use std::time::Duration;

    fn record(ttl: Option<Duration>, watermark: Option<DateTime<Utc>>) -> FcoRecord<FeatureViewSpec> {
        let mut spec = FeatureViewSpec::new(
            "driver_locations",
            vec!["driver".to_string()],
            vec!["value".to_string()],
            "driver_locations_source",
        );
        spec.ttl = ttl;
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        FcoRecord {
            spec,
            meta: FcoMeta {
                created_at: now,
                updated_at: now,
                watermark,
            },
        }
    }

    #[test]
    fn test_incremental_start_prefers_watermark() {
        let wm = Utc.with_ymd_and_hms(2024, 5, 1, 6, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let record = record(Some(Duration::from_secs(86400)), Some(wm));
        assert_eq!(incremental_start(&record, end).unwrap(), wm);
    }

    #[test]
    fn test_incremental_start_falls_back_to_ttl() {
        let end = Utc.with_ymd_and_hms(2024, 5, 2, 0, 0, 0).unwrap();
        let record = record(Some(Duration::from_secs(86400)), None);
        assert_eq!(
            incremental_start(&record, end).unwrap(),
            Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_incremental_start_with_oversized_ttl_does_not_panic() {
        let end = Utc.with_ymd_and_hms(2024, 5, 2, 0, 0, 0).unwrap();
        let millennia = Duration::from_secs(500_000 * 365 * 86400);
        let record = record(Some(millennia), None);
        assert_eq!(
            incremental_start(&record, end).unwrap(),
            DateTime::<Utc>::MIN_UTC
        );
    }

    #[test]
    fn test_incremental_start_without_bounds_is_invalid_window() {
        let end = Utc.with_ymd_and_hms(2024, 5, 2, 0, 0, 0).unwrap();
        let err = incremental_start(&record(None, None), end).unwrap_err();
        assert!(matches!(err, Error::InvalidWindow(_)));
    }
}
