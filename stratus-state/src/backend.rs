//! State backend trait and error types

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::lock::LockInfo;
use crate::state::StateFile;

/// Environment variable overriding the local state file path
pub const STATE_PATH_ENV: &str = "STRATUS_STATE_PATH";

/// Errors that can occur when interacting with a state backend
#[derive(Debug, Error)]
pub enum BackendError {
    /// The state is locked by another process
    #[error("State is locked by {owner} (lock ID: {lock_id}, operation: {operation}, since {created})")]
    Locked {
        lock_id: String,
        owner: String,
        operation: String,
        created: String,
    },

    /// The lock was not found (for release/force-unlock operations)
    #[error("Lock not found: {0}")]
    LockNotFound(String),

    /// Lock ID mismatch when trying to release
    #[error("Lock ID mismatch: expected {expected}, got {actual}")]
    LockMismatch { expected: String, actual: String },

    #[error("Unsupported backend type: {0}")]
    UnsupportedBackend(String),

    #[error("Backend configuration error: {0}")]
    Configuration(String),

    /// State file is corrupted or invalid
    #[error("Invalid state file {path}: {message}")]
    InvalidState { path: String, message: String },

    /// The stored state belongs to a different lineage
    #[error("State lineage mismatch: expected {expected}, got {actual}")]
    LineageMismatch { expected: String, actual: String },

    /// The stored state is newer than the one being written
    #[error("State serial {stored} is newer than {writing}; refresh before writing")]
    StaleSerial { stored: u64, writing: u64 },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl BackendError {
    /// Create a Locked error from a LockInfo
    pub fn locked(lock: &LockInfo) -> Self {
        Self::Locked {
            lock_id: lock.id.clone(),
            owner: lock.owner.clone(),
            operation: lock.operation.clone(),
            created: lock.created.to_rfc3339(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into().display().to_string(),
            source,
        }
    }
}

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Trait for state storage backends
///
/// Writers hold the lock from [`StateBackend::acquire_lock`] while they read,
/// modify and write the state.
#[async_trait]
pub trait StateBackend: Send + Sync {
    /// Read the current state, `None` on first use
    async fn read_state(&self) -> BackendResult<Option<StateFile>>;

    /// Write the state.
    ///
    /// Fails if the stored state has another lineage or a higher serial.
    async fn write_state(&self, state: &StateFile) -> BackendResult<()>;

    /// Acquire the lock for an operation.
    ///
    /// Fails while another unexpired lock is held.
    async fn acquire_lock(&self, operation: &str) -> BackendResult<LockInfo>;

    /// Release a lock acquired by this process
    async fn release_lock(&self, lock: &LockInfo) -> BackendResult<()>;

    /// Remove a lock by ID regardless of owner
    async fn force_unlock(&self, lock_id: &str) -> BackendResult<()>;

    /// Prepare the storage location
    async fn init(&self) -> BackendResult<()>;
}

fn default_backend_type() -> String {
    "local".to_string()
}

/// `backend` section of the configuration file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Backend type; only "local" is built in
    #[serde(rename = "type", default = "default_backend_type")]
    pub backend_type: String,
    /// State file path for the local backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl BackendConfig {
    pub fn local(path: impl Into<PathBuf>) -> Self {
        Self {
            backend_type: default_backend_type(),
            path: Some(path.into()),
        }
    }

    /// Configured path, then `STRATUS_STATE_PATH`, then `default`
    pub fn resolved_path(&self, default: &str) -> PathBuf {
        self.path
            .clone()
            .or_else(|| std::env::var_os(STATE_PATH_ENV).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(default))
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            backend_type: default_backend_type(),
            path: None,
        }
    }
}
