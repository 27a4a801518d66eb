//! Stratus State Management
//!
//! Records which cloud objects a configuration manages: for every resource,
//! its cloud identifier and the attributes last read back from the provider.
//!
//! - **StateFile**: all managed resources, versioned by `serial` and tied to
//!   one `lineage`
//! - **StateBackend**: storage for state files, with locking
//! - **LockInfo**: who holds the state lock and until when
//!
//! # Example
//!
//! ```ignore
//! use stratus_state::{create_backend, BackendConfig};
//!
//! let backend = create_backend(&BackendConfig::local("stratus.state.json")).await?;
//! let lock = backend.acquire_lock("apply").await?;
//! let mut state = backend.read_state().await?.unwrap_or_default();
//! // ... apply changes ...
//! state.increment_serial();
//! backend.write_state(&state).await?;
//! backend.release_lock(&lock).await?;
//! ```

pub mod backend;
pub mod backends;
pub mod lock;
pub mod state;

pub use backend::{BackendConfig, BackendError, BackendResult, StateBackend};
pub use backends::{LocalBackend, create_backend};
pub use lock::LockInfo;
pub use state::{ResourceState, StateFile};
