//! State lock records

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Locks older than this are considered abandoned
pub const DEFAULT_LOCK_TTL_SECS: i64 = 15 * 60;

/// Holder of the state lock
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockInfo {
    pub id: String,
    /// Command holding the lock (e.g., "apply", "destroy", "import")
    pub operation: String,
    /// `user@host` of the holder
    pub owner: String,
    pub created: DateTime<Utc>,
    pub expires: DateTime<Utc>,
}

impl LockInfo {
    pub fn new(operation: impl Into<String>) -> Self {
        Self::with_ttl(operation, Duration::seconds(DEFAULT_LOCK_TTL_SECS))
    }

    pub fn with_ttl(operation: impl Into<String>, ttl: Duration) -> Self {
        let created = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            operation: operation.into(),
            owner: lock_owner(),
            created,
            expires: created + ttl,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires
    }
}

fn lock_owner() -> String {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string());
    let host = hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string());
    format!("{}@{}", user, host)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_lock_is_live() {
        let lock = LockInfo::new("apply");
        assert_eq!(lock.operation, "apply");
        assert!(lock.owner.contains('@'));
        assert_eq!((lock.expires - lock.created).num_seconds(), DEFAULT_LOCK_TTL_SECS);
        assert!(!lock.is_expired());
    }

    #[test]
    fn expires_after_ttl() {
        let lock = LockInfo::with_ttl("destroy", Duration::seconds(30));
        assert!(!lock.is_expired_at(lock.created + Duration::seconds(29)));
        assert!(lock.is_expired_at(lock.created + Duration::seconds(30)));
    }

    #[test]
    fn ids_are_unique() {
        assert_ne!(LockInfo::new("apply").id, LockInfo::new("apply").id);
    }
}
