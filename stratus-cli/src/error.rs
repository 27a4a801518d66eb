use thiserror::Error;

use stratus_core::provider::ProviderError;
use stratus_state::BackendError;

use crate::config::ConfigError;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("Validation failed:\n{0}")]
    Validation(String),

    #[error("{0}")]
    Usage(String),

    #[error("{failed} of {total} changes failed")]
    ApplyFailed { failed: usize, total: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type CliResult<T> = Result<T, CliError>;
