//! Snapshot diffing
//!
//! `apply` computes the symmetric difference between a declared object set
//! and the current snapshot: name-keyed maps on both sides, each name
//! classified as inserted, updated, deleted, or unchanged. The old snapshot
//! is never mutated in place; reconciliation builds a fresh record list and
//! the registry swaps the whole snapshot at commit.

use chrono::{DateTime, Utc};
use featherstore_core::types::{FcoMeta, FcoRecord, FcoSpec};
use std::collections::HashMap;

/// Classification counts for one FCO kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffCounts {
    pub inserted: usize,
    pub updated: usize,
    pub deleted: usize,
    pub unchanged: usize,
}

impl DiffCounts {
    pub fn changed(&self) -> bool {
        self.inserted + self.updated + self.deleted > 0
    }
}

impl std::ops::AddAssign for DiffCounts {
    fn add_assign(&mut self, rhs: Self) {
        self.inserted += rhs.inserted;
        self.updated += rhs.updated;
        self.deleted += rhs.deleted;
        self.unchanged += rhs.unchanged;
    }
}

/// Reconcile one kind's stored records against its declared specs
///
/// Survivors keep their position (list order is insertion order); new
/// objects are appended in declared order. Unchanged records are carried
/// over untouched so a no-op apply stays byte-identical. Updated records
/// keep `created_at` and the materialization watermark; only `updated_at`
/// refreshes. Records absent from the declared set are pruned.
pub fn reconcile<S>(
    old: &[FcoRecord<S>],
    declared: &[S],
    now: DateTime<Utc>,
) -> (Vec<FcoRecord<S>>, DiffCounts)
where
    S: FcoSpec + Clone + PartialEq,
{
    let declared_by_name: HashMap<&str, &S> = declared.iter().map(|s| (s.name(), s)).collect();
    let old_names: HashMap<&str, ()> = old.iter().map(|r| (r.name(), ())).collect();

    let mut records = Vec::with_capacity(declared.len());
    let mut counts = DiffCounts::default();

    for record in old {
        match declared_by_name.get(record.name()) {
            Some(spec) if **spec == record.spec => {
                records.push(record.clone());
                counts.unchanged += 1;
            }
            Some(spec) => {
                records.push(FcoRecord {
                    spec: (*spec).clone(),
                    meta: FcoMeta {
                        created_at: record.meta.created_at,
                        updated_at: now,
                        watermark: record.meta.watermark,
                    },
                });
                counts.updated += 1;
            }
            None => {
                counts.deleted += 1;
            }
        }
    }

    for spec in declared {
        if !old_names.contains_key(spec.name()) {
            records.push(FcoRecord::new(spec.clone(), now));
            counts.inserted += 1;
        }
    }

    (records, counts)
}
