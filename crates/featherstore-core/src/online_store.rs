//! Online store contract
//!
//! Online stores hold the latest materialized feature values per entity key
//! for low-latency reads. Only the newest value by event time survives:
//! writes are last-write-wins ordered by event timestamp, not by write
//! order, which makes materialization replays idempotent.

use crate::error::Result;
use crate::types::{EntityKey, FeatureRow, FeatureValue};
use async_trait::async_trait;
use std::collections::HashMap;

/// Low-latency key-value destination for materialized features
#[async_trait]
pub trait OnlineStore: Send + Sync {
    /// Read the latest feature values for each entity key
    ///
    /// The result is aligned with `entity_keys`: one map per key, with
    /// `FeatureValue::Null` for requested features that have no stored
    /// value (including entirely unknown entities).
    async fn online_read(
        &self,
        view: &str,
        entity_keys: &[EntityKey],
        features: &[String],
    ) -> Result<Vec<HashMap<String, FeatureValue>>>;

    /// Upsert rows, keeping only the newest row per entity key
    ///
    /// A stored row is replaced only by a row with an equal or newer event
    /// timestamp. Out-of-order or replayed writes must not roll a key back
    /// to an older value.
    async fn online_write(&self, view: &str, rows: Vec<FeatureRow>) -> Result<()>;

    /// Drop all rows for a feature view; idempotent
    async fn teardown(&self, view: &str) -> Result<()>;

    /// Name of this store type (for logging)
    fn store_type(&self) -> &'static str;
}

/// Build a composite key from entity keys
///
/// Format: `{key1_name}={key1_value}:{key2_name}={key2_value}`, segments
/// sorted by key name so composite keys are order-independent.
pub fn build_online_key(entity_keys: &[EntityKey]) -> String {
    let mut sorted: Vec<_> = entity_keys.iter().collect();
    sorted.sort_by_key(|k| &k.name);
    sorted
        .iter()
        .map(|k| format!("{}={}", k.name, k.value))
        .collect::<Vec<_>>()
        .join(":")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_online_key_single_entity() {
        let key = build_online_key(&[EntityKey::new("driver_id", "3")]);
        assert_eq!(key, "driver_id=3");
    }

    #[test]
    fn test_build_online_key_composite_is_order_independent() {
        let a = build_online_key(&[
            EntityKey::new("user_id", "123"),
            EntityKey::new("product_id", "456"),
        ]);
        let b = build_online_key(&[
            EntityKey::new("product_id", "456"),
            EntityKey::new("user_id", "123"),
        ]);
        assert_eq!(a, b);
        assert_eq!(a, "product_id=456:user_id=123");
    }
}
