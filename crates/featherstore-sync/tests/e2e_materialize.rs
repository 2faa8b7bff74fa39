//! End-to-end tests for the materialization engine
//!
//! Drives the full path: apply a feature repo, seed the offline store, sync
//! windows through the local provider, and read back from the online store.
//! Covers watermark monotonicity, incremental resume, window validation and
//! failure semantics.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use featherstore_core::types::{DataSourceSpec, EntitySpec, FeatureViewSpec, RepoContents};
use featherstore_core::{
    EntityKey, Error, FeatureRow, FeatureValue, OfflineStore, Provider, RepoConfig, Result,
};
use featherstore_registry::MemoryRegistryStore;
use featherstore_sync::{FeatureStore, LocalProvider, MemoryOfflineStore, MemoryOnlineStore};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const VIEW: &str = "driver_locations";

fn at(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, hour, 0, 0).unwrap()
}

fn row(driver: &str, value: i64, ts: DateTime<Utc>) -> FeatureRow {
    FeatureRow::new(vec![EntityKey::new("driver_id", driver)], ts)
        .with_feature("value", FeatureValue::Int(value))
}

fn driver_repo(ttl: Option<Duration>) -> RepoContents {
    let mut view = FeatureViewSpec::new(
        VIEW,
        vec!["driver".to_string()],
        vec!["value".to_string()],
        "driver_locations_source",
    );
    view.ttl = ttl;
    RepoContents::default()
        .with_entity(EntitySpec::new("driver", "driver_id"))
        .with_data_source(DataSourceSpec::new(
            "driver_locations_source",
            "data/driver_locations",
            "event_timestamp",
        ))
        .with_feature_view(view)
}

struct Fixture {
    store: FeatureStore,
    offline: Arc<MemoryOfflineStore>,
}

async fn fixture(ttl: Option<Duration>) -> Fixture {
    let offline = Arc::new(MemoryOfflineStore::new());
    let online = Arc::new(MemoryOnlineStore::new());
    let provider = LocalProvider::new(offline.clone(), online);

    let store = FeatureStore::with_components(
        RepoConfig::new("driver_project"),
        Arc::new(MemoryRegistryStore::new()),
        Arc::new(provider),
    );
    store.apply(&driver_repo(ttl)).await.unwrap();
    Fixture { store, offline }
}

async fn online_value(store: &FeatureStore, driver: &str) -> FeatureValue {
    let values = store
        .get_online_features(
            VIEW,
            &[EntityKey::new("driver_id", driver)],
            &["value".to_string()],
        )
        .await
        .unwrap();
    values[0]["value"].clone()
}

#[tokio::test]
async fn test_materialize_syncs_latest_per_key() {
    let fx = fixture(None).await;
    fx.offline.append(
        VIEW,
        vec![row("1", 1, at(2)), row("1", 3, at(4)), row("2", 7, at(3))],
    );

    let runs = fx.store.materialize(&[VIEW], at(0), at(6)).await.unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].rows_written, 2);

    assert_eq!(online_value(&fx.store, "1").await, FeatureValue::Int(3));
    assert_eq!(online_value(&fx.store, "2").await, FeatureValue::Int(7));
    assert_eq!(online_value(&fx.store, "99").await, FeatureValue::Null);

    // Committed run advanced the watermark to the window end
    let view = fx.store.get_feature_view(VIEW).await.unwrap();
    assert_eq!(view.meta.watermark, Some(at(6)));
}

#[tokio::test]
async fn test_incremental_resume_scenario() {
    // driver 3 has value 4 at T0; after T0 a new row with value 5 lands at T1
    let t0 = at(6);
    let t1 = at(12);

    let fx = fixture(None).await;
    fx.offline.append(VIEW, vec![row("3", 4, t0)]);

    fx.store.materialize(&[VIEW], at(0), t0).await.unwrap();
    assert_eq!(online_value(&fx.store, "3").await, FeatureValue::Int(4));

    fx.offline.append(VIEW, vec![row("3", 5, t1)]);

    // Incremental picks up from the watermark (t0) to now (t1)
    let runs = fx
        .store
        .materialize_incremental(&[VIEW], t1)
        .await
        .unwrap();
    assert_eq!(runs[0].start, t0);
    assert_eq!(runs[0].end, t1);

    assert_eq!(online_value(&fx.store, "3").await, FeatureValue::Int(5));

    // A point-in-time offline read at t0 still yields the old value
    let spec = fx.store.get_feature_view(VIEW).await.unwrap().spec;
    let historical = fx.offline.pull_latest(&spec, at(0), t0).await.unwrap();
    assert_eq!(historical.len(), 1);
    assert_eq!(
        historical[0].get_feature("value"),
        Some(&FeatureValue::Int(4))
    );
}

#[tokio::test]
async fn test_union_of_windows_has_no_lww_corruption() {
    let fx = fixture(None).await;
    fx.offline.append(
        VIEW,
        vec![
            row("1", 10, at(1)),
            row("1", 20, at(5)),
            row("2", 30, at(3)),
            row("2", 40, at(9)),
        ],
    );

    // [0, 6) then incremental [6, 12): together they cover everything once
    fx.store.materialize(&[VIEW], at(0), at(6)).await.unwrap();
    fx.store.materialize_incremental(&[VIEW], at(12)).await.unwrap();

    assert_eq!(online_value(&fx.store, "1").await, FeatureValue::Int(20));
    assert_eq!(online_value(&fx.store, "2").await, FeatureValue::Int(40));
}

#[tokio::test]
async fn test_update_exactly_at_window_end_is_included() {
    let fx = fixture(None).await;
    let end = at(8);

    // The view's only update sits exactly at the queried event time
    fx.offline.append(VIEW, vec![row("3", 4, end)]);

    fx.store.materialize(&[VIEW], at(0), end).await.unwrap();
    assert_eq!(online_value(&fx.store, "3").await, FeatureValue::Int(4));
}

#[tokio::test]
async fn test_stale_run_does_not_roll_back_watermark() {
    let fx = fixture(None).await;
    fx.offline.append(VIEW, vec![row("1", 1, at(1))]);

    let e1 = at(4);
    let e2 = at(10);

    // Newer window commits first, then a stale run with the older end
    fx.store.materialize(&[VIEW], at(0), e2).await.unwrap();
    fx.store.materialize(&[VIEW], at(0), e1).await.unwrap();

    let view = fx.store.get_feature_view(VIEW).await.unwrap();
    assert_eq!(view.meta.watermark, Some(e2));
}

#[tokio::test]
async fn test_ttl_clamps_materialize_start() {
    // 2h TTL: rows older than end - 2h are outside the synced window
    let fx = fixture(Some(Duration::from_secs(2 * 3600))).await;
    fx.offline
        .append(VIEW, vec![row("1", 1, at(1)), row("1", 2, at(9))]);

    let runs = fx.store.materialize(&[VIEW], at(0), at(10)).await.unwrap();
    assert_eq!(runs[0].start, at(8));
    assert_eq!(runs[0].rows_written, 1);
    assert_eq!(online_value(&fx.store, "1").await, FeatureValue::Int(2));
}

#[tokio::test]
async fn test_incremental_without_watermark_falls_back_to_ttl() {
    let fx = fixture(Some(Duration::from_secs(4 * 3600))).await;
    fx.offline.append(VIEW, vec![row("1", 9, at(7))]);

    let runs = fx
        .store
        .materialize_incremental(&[VIEW], at(8))
        .await
        .unwrap();
    assert_eq!(runs[0].start, at(4));
    assert_eq!(online_value(&fx.store, "1").await, FeatureValue::Int(9));
}

#[tokio::test]
async fn test_incremental_without_bounds_is_invalid_window() {
    let fx = fixture(None).await;
    let err = fx
        .store
        .materialize_incremental(&[VIEW], at(8))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidWindow(_)));
    assert_eq!(err.exit_code(), 1);
}

#[tokio::test]
async fn test_materialize_unknown_view_is_not_found() {
    let fx = fixture(None).await;
    let err = fx
        .store
        .materialize(&["nonexistent"], at(0), at(1))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Feature view 'nonexistent' not found");
}

/// Provider wrapper that counts materialize calls
struct CountingProvider {
    inner: Arc<dyn Provider>,
    calls: AtomicUsize,
}

#[async_trait]
impl Provider for CountingProvider {
    fn provider_type(&self) -> &'static str {
        "counting"
    }

    async fn materialize(
        &self,
        view: &FeatureViewSpec,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<usize> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.materialize(view, start, end).await
    }

    async fn online_read(
        &self,
        view: &str,
        entity_keys: &[EntityKey],
        features: &[String],
    ) -> Result<Vec<HashMap<String, FeatureValue>>> {
        self.inner.online_read(view, entity_keys, features).await
    }

    async fn online_write(&self, view: &str, rows: Vec<FeatureRow>) -> Result<()> {
        self.inner.online_write(view, rows).await
    }
}

#[tokio::test]
async fn test_invalid_window_never_contacts_provider() {
    let counting = Arc::new(CountingProvider {
        inner: Arc::new(LocalProvider::in_memory()),
        calls: AtomicUsize::new(0),
    });
    let store = FeatureStore::with_components(
        RepoConfig::new("driver_project"),
        Arc::new(MemoryRegistryStore::new()),
        counting.clone(),
    );
    store.apply(&driver_repo(None)).await.unwrap();

    // Inverted caller-supplied range
    let err = store.materialize(&[VIEW], at(5), at(1)).await.unwrap_err();
    assert!(matches!(err, Error::InvalidWindow(_)));

    // Incremental with end behind the watermark
    store.materialize(&[VIEW], at(0), at(8)).await.unwrap();
    let before = counting.calls.load(Ordering::SeqCst);
    let err = store
        .materialize_incremental(&[VIEW], at(2))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidWindow(_)));
    assert_eq!(counting.calls.load(Ordering::SeqCst), before);
}

/// Offline store that fails a configurable number of pulls before recovering
struct FlakyOfflineStore {
    inner: MemoryOfflineStore,
    failures_left: AtomicUsize,
}

#[async_trait]
impl OfflineStore for FlakyOfflineStore {
    async fn pull_latest(
        &self,
        view: &FeatureViewSpec,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<FeatureRow>> {
        if self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(Error::StoreIo(anyhow::anyhow!("offline store unavailable")));
        }
        self.inner.pull_latest(view, start, end).await
    }

    fn store_type(&self) -> &'static str {
        "flaky"
    }
}

#[tokio::test]
async fn test_failed_run_leaves_watermark_for_retry() {
    let flaky = Arc::new(FlakyOfflineStore {
        inner: MemoryOfflineStore::new(),
        failures_left: AtomicUsize::new(1),
    });
    flaky.inner.append(VIEW, vec![row("3", 4, at(3))]);

    let provider = LocalProvider::new(flaky.clone(), Arc::new(MemoryOnlineStore::new()));
    let store = FeatureStore::with_components(
        RepoConfig::new("driver_project"),
        Arc::new(MemoryRegistryStore::new()),
        Arc::new(provider),
    );
    store.apply(&driver_repo(None)).await.unwrap();

    // First run fails; the watermark must stay unset
    let err = store.materialize(&[VIEW], at(0), at(6)).await.unwrap_err();
    assert!(matches!(err, Error::StoreIo(_)));
    let view = store.get_feature_view(VIEW).await.unwrap();
    assert_eq!(view.meta.watermark, None);

    // Retrying the same window succeeds and commits
    let runs = store.materialize(&[VIEW], at(0), at(6)).await.unwrap();
    assert_eq!(runs[0].rows_written, 1);
    let view = store.get_feature_view(VIEW).await.unwrap();
    assert_eq!(view.meta.watermark, Some(at(6)));
}
