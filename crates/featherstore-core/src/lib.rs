//! # Featherstore Core Library
//!
//! Foundation crate for Featherstore: the shared data model, error taxonomy,
//! plugin resolution, and the trait contracts the rest of the system plugs
//! into.
//!
//! This crate intentionally has minimal dependencies and defines clean
//! interfaces rather than implementations. The goal is to make it easy to:
//! - Add new registry store backends and providers
//! - Test components in isolation
//!
//! ## Key components
//!
//! - **Types**: the feature-coupled object family, feature values, registry
//!   snapshots
//! - **Errors**: strongly-typed failures with a stable message surface
//! - **Resolver**: qualified-name plugin lookup for providers and registry
//!   stores
//! - **Traits**: `RegistryStore`, `Provider`, `OfflineStore`, `OnlineStore`

pub use config::{RegistryStoreConfig, RepoConfig};
pub use error::{Error, Result};
pub use offline_store::OfflineStore;
pub use online_store::{build_online_key, OnlineStore};
pub use provider::Provider;
pub use store::RegistryStore;
pub use types::{
    DataSourceSpec, EntityKey, EntitySpec, FcoKind, FcoMeta, FcoRecord, FcoSpec, FeatureRow,
    FeatureServiceSpec, FeatureValue, FeatureViewSpec, OnDemandFeatureViewSpec, RegistrySnapshot,
    RepoContents,
};

pub mod config;
pub mod error;
pub mod offline_store;
pub mod online_store;
pub mod provider;
pub mod resolver;
pub mod store;
pub mod time;
pub mod types;

use std::sync::{Mutex, MutexGuard};

/// Lock a mutex, recovering from poisoning
///
/// A thread panicking while holding the lock poisons it; the guarded data
/// here (connections, snapshots) stays usable, so recover the guard and log
/// instead of propagating the panic to every later caller.
pub fn recover_mutex<'a, T>(mutex: &'a Mutex<T>, owner: &str) -> MutexGuard<'a, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::warn!("{} mutex poisoned by a panicking thread, recovering", owner);
            poisoned.into_inner()
        }
    }
}
