//! Provider configuration
//!
//! Deserialized from the `provider` section of the configuration file.
//! Durations are whole seconds.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use stratus_core::waiter::Timeouts;

pub const DEFAULT_REGION: &str = "us-east-1";
const DEFAULT_MIN_TIMEOUT_SECS: u64 = 1;

/// Per-operation timeout overrides
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutsConfig {
    pub create_secs: Option<u64>,
    pub update_secs: Option<u64>,
    pub delete_secs: Option<u64>,
}

impl TimeoutsConfig {
    fn apply(&self, defaults: Timeouts) -> Timeouts {
        Timeouts {
            create: self
                .create_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.create),
            update: self
                .update_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.update),
            delete: self
                .delete_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.delete),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// AWS region; falls back to `AWS_REGION`, then us-east-1
    pub region: Option<String>,
    /// Wait before the first status check
    pub poll_delay_secs: Option<u64>,
    /// Smallest wait between status checks
    pub min_timeout_secs: Option<u64>,
    /// Fixed wait between status checks instead of exponential backoff
    pub poll_interval_secs: Option<u64>,
    /// Timeout overrides keyed by resource type (e.g., "pipes_pipe")
    pub timeouts: HashMap<String, TimeoutsConfig>,
}

impl ProviderConfig {
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn region(&self) -> String {
        self.region
            .clone()
            .or_else(|| std::env::var("AWS_REGION").ok())
            .unwrap_or_else(|| DEFAULT_REGION.to_string())
    }

    pub fn poll_delay(&self) -> Duration {
        Duration::from_secs(self.poll_delay_secs.unwrap_or(0))
    }

    pub fn min_timeout(&self) -> Duration {
        Duration::from_secs(self.min_timeout_secs.unwrap_or(DEFAULT_MIN_TIMEOUT_SECS))
    }

    pub fn poll_interval(&self) -> Option<Duration> {
        self.poll_interval_secs.map(Duration::from_secs)
    }

    /// Timeouts for a resource type, starting from the type's defaults
    pub fn timeouts_for(&self, resource_type: &str, defaults: Timeouts) -> Timeouts {
        match self.timeouts.get(resource_type) {
            Some(overrides) => overrides.apply(defaults),
            None => defaults,
        }
    }
}
