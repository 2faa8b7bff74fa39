//! Error types for Featherstore
//!
//! All failure modes in the core are modeled as variants of a single
//! `thiserror` enum so callers can inspect the kind of failure and convert
//! it to a message or process exit code.
//!
//! Several display strings here are a compatibility surface: external tooling
//! matches on them byte-for-byte. Those variants carry their message text in
//! the `#[error(...)]` attribute and must not be reworded.

use crate::types::FcoKind;
use thiserror::Error;

/// Result type alias for operations that can fail
pub type Result<T> = std::result::Result<T, Error>;

/// All possible errors that can occur in Featherstore
#[derive(Error, Debug)]
pub enum Error {
    /// An object was looked up by name and does not exist in the project.
    ///
    /// This is an expected, reportable condition (describe/get on an absent
    /// name), not a programming error.
    #[error("{kind} '{name}' not found")]
    NotFound { kind: FcoKind, name: String },

    /// Referential integrity violation at apply time.
    ///
    /// Aborts the whole apply with no mutation of the snapshot.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A built-in plugin alias was requested that does not exist.
    ///
    /// `kind` is the human-readable plugin kind ("Provider", "Registry
    /// store"). The message format is parsed by calling tooling.
    #[error("{kind} '{name}' is not implemented")]
    NotImplemented { kind: &'static str, name: String },

    /// A qualified plugin name referenced a module that is not registered.
    #[error("Could not import module '{module}' while attempting to load class '{class}'")]
    ModuleImport { module: String, class: String },

    /// A qualified plugin name referenced a class absent from its module.
    #[error("Could not import class '{class}' from module '{module}'")]
    ClassImport { module: String, class: String },

    /// A custom registry store class violated the naming convention.
    ///
    /// Checked before any lookup is attempted.
    #[error("Registry store class name should end with \"RegistryStore\"")]
    RegistryStoreNaming,

    /// A materialization window could not be computed or is inverted.
    ///
    /// Aborts that run only; the provider is never contacted.
    #[error("Invalid materialization window: {0}")]
    InvalidWindow(String),

    /// Offline/online/registry store I/O failure.
    ///
    /// Aborts the current window; the watermark is left unchanged so a retry
    /// resumes from the last committed point.
    #[error("Store error: {0}")]
    StoreIo(#[from] anyhow::Error),

    /// Snapshot or feature value (de)serialization failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Creates a Validation error from a string
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Creates an InvalidWindow error from a string
    pub fn invalid_window(msg: impl Into<String>) -> Self {
        Self::InvalidWindow(msg.into())
    }

    /// Creates a StoreIo error from any error type
    pub fn store_io<E: std::error::Error + Send + Sync + 'static>(err: E) -> Self {
        Self::StoreIo(anyhow::Error::new(err))
    }

    /// Process exit code for this error at the call boundary.
    ///
    /// Every user-facing failure maps to 1; success (no error) is 0 by
    /// convention. Kept as a method so the mapping stays next to the
    /// taxonomy if it ever grows distinct codes.
    pub fn exit_code(&self) -> i32 {
        1
    }
}
