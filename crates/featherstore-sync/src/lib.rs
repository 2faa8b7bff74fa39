//! Offline-to-online materialization for Featherstore
//!
//! This crate drives feature values from the historical offline store into
//! the low-latency online store:
//!
//! - **MaterializationEngine**: per-view window computation (full range and
//!   incremental-from-watermark), provider orchestration, watermark commit
//! - **LocalProvider**: built-in provider wiring an offline store to an
//!   online store in-process
//! - **Memory stores**: reference offline/online implementations of the
//!   last-write-wins contract
//! - **FeatureStore**: the facade a calling process drives, built from a
//!   resolved repo config
//!
//! ## Example
//!
//! ```rust,ignore
//! use featherstore_sync::FeatureStore;
//! use featherstore_core::RepoConfig;
//!
//! let store = FeatureStore::from_config(RepoConfig::new("driver_project"))?;
//! store.apply(&contents).await?;
//! store.materialize(&["driver_locations"], start, end).await?;
//! store.materialize_incremental(&["driver_locations"], now).await?;
//! ```

pub use engine::{MaterializationEngine, MaterializationRun};
pub use memory::{MemoryOfflineStore, MemoryOnlineStore};
pub use provider::{provider_resolver, LocalProvider};
pub use store::FeatureStore;

pub mod engine;
pub mod memory;
pub mod provider;
pub mod store;
