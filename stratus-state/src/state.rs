//! State file structures for persisting infrastructure state

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use stratus_core::resource::{ResourceId, State, Value};

/// The main state file structure that persists to the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateFile {
    /// State file format version
    pub version: u32,
    /// Incremented on every write
    pub serial: u64,
    /// Identifies one state history; writes across lineages are refused
    pub lineage: String,
    /// Version of Stratus that last wrote this state
    pub stratus_version: String,
    /// Managed resources in the order they were applied
    pub resources: Vec<ResourceState>,
}

impl StateFile {
    pub const CURRENT_VERSION: u32 = 1;

    pub fn new() -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            serial: 0,
            lineage: uuid::Uuid::new_v4().to_string(),
            stratus_version: env!("CARGO_PKG_VERSION").to_string(),
            resources: Vec::new(),
        }
    }

    /// Bump the serial before a write
    pub fn increment_serial(&mut self) {
        self.serial += 1;
        self.stratus_version = env!("CARGO_PKG_VERSION").to_string();
    }

    pub fn find_resource(&self, id: &ResourceId) -> Option<&ResourceState> {
        self.resources.iter().find(|r| r.matches(id))
    }

    /// Add a resource, or replace the entry with the same type and name
    pub fn upsert_resource(&mut self, resource: ResourceState) {
        match self.resources.iter_mut().find(|r| r.matches(&resource.id())) {
            Some(existing) => *existing = resource,
            None => self.resources.push(resource),
        }
    }

    pub fn remove_resource(&mut self, id: &ResourceId) -> Option<ResourceState> {
        let pos = self.resources.iter().position(|r| r.matches(id))?;
        Some(self.resources.remove(pos))
    }

    /// Core states for every recorded resource, in stored order
    pub fn states(&self) -> Vec<State> {
        self.resources.iter().map(ResourceState::to_state).collect()
    }
}

impl Default for StateFile {
    fn default() -> Self {
        Self::new()
    }
}

/// State of a single managed resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceState {
    /// Resource type (e.g., "pipes_pipe")
    pub resource_type: String,
    /// Resource name from configuration
    pub name: String,
    /// Provider name (e.g., "awscc")
    pub provider: String,
    /// Cloud primary identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    /// Attributes as last read from the provider
    #[serde(default)]
    pub attributes: BTreeMap<String, serde_json::Value>,
    /// Protected resources are never deleted by destroy
    #[serde(default)]
    pub protected: bool,
}

impl ResourceState {
    pub fn new(
        resource_type: impl Into<String>,
        name: impl Into<String>,
        provider: impl Into<String>,
    ) -> Self {
        Self {
            resource_type: resource_type.into(),
            name: name.into(),
            provider: provider.into(),
            identifier: None,
            attributes: BTreeMap::new(),
            protected: false,
        }
    }

    /// Record a provider state
    pub fn from_state(state: &State, provider: impl Into<String>) -> Self {
        let mut resource = Self::new(
            state.id.resource_type.clone(),
            state.id.name.clone(),
            provider,
        );
        resource.identifier = state.identifier.clone();
        resource.attributes = state
            .attributes
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect();
        resource
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    pub fn with_protected(mut self, protected: bool) -> Self {
        self.protected = protected;
        self
    }

    pub fn id(&self) -> ResourceId {
        ResourceId::new(self.resource_type.clone(), self.name.clone())
    }

    fn matches(&self, id: &ResourceId) -> bool {
        self.resource_type == id.resource_type && self.name == id.name
    }

    /// Recorded attributes as a core state (null attributes are dropped)
    pub fn to_state(&self) -> State {
        let attributes = self
            .attributes
            .iter()
            .filter_map(|(k, v)| Value::from_json(v).map(|v| (k.clone(), v)))
            .collect();
        let state = State::existing(self.id(), attributes);
        match &self.identifier {
            Some(identifier) => state.with_identifier(identifier.clone()),
            None => state,
        }
    }
}
