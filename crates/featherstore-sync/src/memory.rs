//! In-memory offline and online stores
//!
//! Back the built-in local provider and the test suites. The online store
//! is the reference implementation of the last-write-wins contract: a key
//! only moves forward in event time, regardless of write order.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use featherstore_core::{
    build_online_key, recover_mutex, EntityKey, FeatureRow, FeatureValue, FeatureViewSpec,
    OfflineStore, OnlineStore, Result,
};
use std::collections::HashMap;
use std::sync::Mutex;

/// Offline store over per-view row lists
///
/// Rows are appended by tests or by the hosting process; `pull_latest`
/// scans the window and keeps the newest row per entity key.
#[derive(Default)]
pub struct MemoryOfflineStore {
    rows: Mutex<HashMap<String, Vec<FeatureRow>>>,
}

impl MemoryOfflineStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append source rows for a feature view
    pub fn append(&self, view: &str, rows: Vec<FeatureRow>) {
        let mut map = recover_mutex(&self.rows, "MemoryOfflineStore");
        map.entry(view.to_string()).or_default().extend(rows);
    }
}

#[async_trait]
impl OfflineStore for MemoryOfflineStore {
    async fn pull_latest(
        &self,
        view: &FeatureViewSpec,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<FeatureRow>> {
        let map = recover_mutex(&self.rows, "MemoryOfflineStore");
        let rows = map.get(&view.name).map(|v| v.as_slice()).unwrap_or(&[]);

        // Inclusive upper bound: the row at exactly `end` is the one a
        // point-in-time read at `end` must see when it is the latest
        let mut latest: HashMap<String, &FeatureRow> = HashMap::new();
        for row in rows {
            if row.event_timestamp < start || row.event_timestamp > end {
                continue;
            }
            let key = build_online_key(&row.entities);
            match latest.get(&key) {
                Some(existing) if existing.event_timestamp > row.event_timestamp => {}
                _ => {
                    latest.insert(key, row);
                }
            }
        }

        let mut result: Vec<FeatureRow> = latest.into_values().cloned().collect();
        result.sort_by_key(|r| r.event_timestamp);
        Ok(result)
    }

    fn store_type(&self) -> &'static str {
        "memory"
    }
}

/// Online key-value store keeping only the newest row per entity key
#[derive(Default)]
pub struct MemoryOnlineStore {
    views: Mutex<HashMap<String, HashMap<String, FeatureRow>>>,
}

impl MemoryOnlineStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OnlineStore for MemoryOnlineStore {
    async fn online_read(
        &self,
        view: &str,
        entity_keys: &[EntityKey],
        features: &[String],
    ) -> Result<Vec<HashMap<String, FeatureValue>>> {
        let views = recover_mutex(&self.views, "MemoryOnlineStore");
        let table = views.get(view);

        let mut result = Vec::with_capacity(entity_keys.len());
        for key in entity_keys {
            let stored = table.and_then(|t| t.get(&build_online_key(std::slice::from_ref(key))));
            let mut values = HashMap::with_capacity(features.len());
            for feature in features {
                let value = stored
                    .and_then(|row| row.features.get(feature))
                    .cloned()
                    .unwrap_or(FeatureValue::Null);
                values.insert(feature.clone(), value);
            }
            result.push(values);
        }
        Ok(result)
    }

    async fn online_write(&self, view: &str, rows: Vec<FeatureRow>) -> Result<()> {
        let mut views = recover_mutex(&self.views, "MemoryOnlineStore");
        let table = views.entry(view.to_string()).or_default();

        for row in rows {
            let key = build_online_key(&row.entities);
            match table.get(&key) {
                // Last-write-wins by event time: never roll a key back
                Some(existing) if existing.event_timestamp > row.event_timestamp => {}
                _ => {
                    table.insert(key, row);
                }
            }
        }
        Ok(())
    }

    async fn teardown(&self, view: &str) -> Result<()> {
        let mut views = recover_mutex(&self.views, "MemoryOnlineStore");
        views.remove(view);
        Ok(())
    }

    fn store_type(&self) -> &'static str {
        "memory"
    }
}
