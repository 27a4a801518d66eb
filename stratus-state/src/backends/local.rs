//! Local file backend for state storage
//!
//! State lives in a JSON file (default: stratus.state.json) next to a
//! `.lock` file holding the current [`LockInfo`]. Writes go to a temporary
//! file that is renamed over the state file.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::backend::{BackendConfig, BackendError, BackendResult, StateBackend};
use crate::lock::LockInfo;
use crate::state::StateFile;

pub struct LocalBackend {
    state_path: PathBuf,
    lock_path: PathBuf,
}

impl LocalBackend {
    pub const DEFAULT_STATE_FILE: &'static str = "stratus.state.json";

    pub fn with_path(state_path: impl Into<PathBuf>) -> Self {
        let state_path = state_path.into();
        let lock_path = state_path.with_extension("lock");
        Self {
            state_path,
            lock_path,
        }
    }

    pub fn from_config(config: &BackendConfig) -> Self {
        Self::with_path(config.resolved_path(Self::DEFAULT_STATE_FILE))
    }

    pub fn state_path(&self) -> &Path {
        &self.state_path
    }

    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }

    async fn read_lock(&self) -> BackendResult<Option<LockInfo>> {
        match tokio::fs::read_to_string(&self.lock_path).await {
            Ok(content) => {
                let lock = serde_json::from_str(&content).map_err(|e| {
                    BackendError::InvalidState {
                        path: self.lock_path.display().to_string(),
                        message: e.to_string(),
                    }
                })?;
                Ok(Some(lock))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(BackendError::io(&self.lock_path, e)),
        }
    }

    async fn remove_lock(&self) -> BackendResult<()> {
        tokio::fs::remove_file(&self.lock_path)
            .await
            .map_err(|e| BackendError::io(&self.lock_path, e))
    }

    /// Create the lock file, failing if it already exists
    async fn create_lock(&self, lock: &LockInfo) -> BackendResult<bool> {
        let content = serde_json::to_string_pretty(lock)?;
        let file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.lock_path)
            .await;
        let mut file = match file {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => return Ok(false),
            Err(e) => return Err(BackendError::io(&self.lock_path, e)),
        };
        file.write_all(content.as_bytes())
            .await
            .map_err(|e| BackendError::io(&self.lock_path, e))?;
        file.flush()
            .await
            .map_err(|e| BackendError::io(&self.lock_path, e))?;
        Ok(true)
    }
}

impl Default for LocalBackend {
    fn default() -> Self {
        Self::with_path(Self::DEFAULT_STATE_FILE)
    }
}

#[async_trait]
impl StateBackend for LocalBackend {
    async fn read_state(&self) -> BackendResult<Option<StateFile>> {
        let content = match tokio::fs::read_to_string(&self.state_path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(BackendError::io(&self.state_path, e)),
        };

        let state = serde_json::from_str(&content).map_err(|e| BackendError::InvalidState {
            path: self.state_path.display().to_string(),
            message: e.to_string(),
        })?;
        Ok(Some(state))
    }

    async fn write_state(&self, state: &StateFile) -> BackendResult<()> {
        if let Some(stored) = self.read_state().await? {
            if stored.lineage != state.lineage {
                return Err(BackendError::LineageMismatch {
                    expected: stored.lineage,
                    actual: state.lineage.clone(),
                });
            }
            if stored.serial > state.serial {
                return Err(BackendError::StaleSerial {
                    stored: stored.serial,
                    writing: state.serial,
                });
            }
        }

        let content = serde_json::to_string_pretty(state)?;
        let tmp_path = self.state_path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, content)
            .await
            .map_err(|e| BackendError::io(&tmp_path, e))?;
        tokio::fs::rename(&tmp_path, &self.state_path)
            .await
            .map_err(|e| BackendError::io(&self.state_path, e))?;
        log::debug!(
            "wrote state serial {} to {}",
            state.serial,
            self.state_path.display()
        );
        Ok(())
    }

    async fn acquire_lock(&self, operation: &str) -> BackendResult<LockInfo> {
        let lock = LockInfo::new(operation);
        if self.create_lock(&lock).await? {
            return Ok(lock);
        }

        match self.read_lock().await? {
            Some(existing) if !existing.is_expired() => Err(BackendError::locked(&existing)),
            _ => {
                log::warn!(
                    "replacing expired lock at {}",
                    self.lock_path.display()
                );
                self.remove_lock().await?;
                if self.create_lock(&lock).await? {
                    Ok(lock)
                } else {
                    let holder = self.read_lock().await?;
                    Err(holder.map_or_else(
                        || BackendError::LockNotFound(lock.id.clone()),
                        |h| BackendError::locked(&h),
                    ))
                }
            }
        }
    }

    async fn release_lock(&self, lock: &LockInfo) -> BackendResult<()> {
        let Some(existing) = self.read_lock().await? else {
            return Err(BackendError::LockNotFound(lock.id.clone()));
        };
        if existing.id != lock.id {
            return Err(BackendError::LockMismatch {
                expected: lock.id.clone(),
                actual: existing.id,
            });
        }
        self.remove_lock().await
    }

    async fn force_unlock(&self, lock_id: &str) -> BackendResult<()> {
        let Some(existing) = self.read_lock().await? else {
            return Err(BackendError::LockNotFound(lock_id.to_string()));
        };
        if existing.id != lock_id {
            return Err(BackendError::LockMismatch {
                expected: lock_id.to_string(),
                actual: existing.id,
            });
        }
        self.remove_lock().await
    }

    async fn init(&self) -> BackendResult<()> {
        if let Some(parent) = self.state_path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| BackendError::io(parent, e))?;
        }
        Ok(())
    }
}
