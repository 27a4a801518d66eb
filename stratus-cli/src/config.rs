//! Configuration file loading
//!
//! The configuration is a JSON document with `provider`, `backend` and
//! `resources` sections. Attribute values may reference other resources as
//! `{"$ref": "binding.attribute"}`, where the binding defaults to the
//! referenced resource's name.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use stratus_core::resource::{BINDING_ATTRIBUTE, Resource, ResourceId, Value};
use stratus_provider_awscc::ProviderConfig;
use stratus_state::BackendConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Resource {0} is declared more than once")]
    DuplicateResource(ResourceId),

    #[error("Binding '{binding}' is used by both {first} and {second}")]
    DuplicateBinding {
        binding: String,
        first: ResourceId,
        second: ResourceId,
    },

    #[error("{id}: references unknown resource '{binding}'")]
    UnknownReference { id: ResourceId, binding: String },

    #[error("Dependency cycle through {0}")]
    DependencyCycle(ResourceId),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub resources: Vec<ResourceConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResourceConfig {
    #[serde(rename = "type")]
    pub resource_type: String,
    pub name: String,
    /// Name other resources use in `$ref`; defaults to `name`
    #[serde(default)]
    pub binding: Option<String>,
    #[serde(default)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
    /// Read an existing object by `attributes.identifier` instead of managing it
    #[serde(default)]
    pub read_only: bool,
    /// Never deleted by destroy or as an orphan
    #[serde(default)]
    pub protected: bool,
}

impl ResourceConfig {
    pub fn id(&self) -> ResourceId {
        ResourceId::new(self.resource_type.clone(), self.name.clone())
    }

    pub fn binding(&self) -> &str {
        self.binding.as_deref().unwrap_or(&self.name)
    }

    pub fn to_resource(&self) -> Resource {
        let mut resource = Resource::new(self.resource_type.clone(), self.name.clone())
            .with_read_only(self.read_only)
            .with_attribute(BINDING_ATTRIBUTE, Value::String(self.binding().to_string()));
        for (key, value) in &self.attributes {
            if let Some(value) = Value::from_json(value) {
                resource.attributes.insert(key.clone(), value);
            }
        }
        resource
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn parse(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }

    /// Desired resources in declaration order
    ///
    /// Fails on duplicate ids or bindings and on references to bindings
    /// that no resource declares.
    pub fn resources(&self) -> Result<Vec<Resource>, ConfigError> {
        let mut ids = HashSet::new();
        let mut bindings: HashMap<&str, ResourceId> = HashMap::new();
        for resource in &self.resources {
            let id = resource.id();
            if !ids.insert(id.clone()) {
                return Err(ConfigError::DuplicateResource(id));
            }
            if let Some(first) = bindings.insert(resource.binding(), id.clone()) {
                return Err(ConfigError::DuplicateBinding {
                    binding: resource.binding().to_string(),
                    first,
                    second: id,
                });
            }
        }

        let resources: Vec<Resource> = self.resources.iter().map(|r| r.to_resource()).collect();
        for resource in &resources {
            for binding in crate::deps::dependencies(resource) {
                if !bindings.contains_key(binding.as_str()) {
                    return Err(ConfigError::UnknownReference {
                        id: resource.id.clone(),
                        binding,
                    });
                }
            }
        }
        Ok(resources)
    }

    /// Whether the resource is marked protected
    pub fn is_protected(&self, id: &ResourceId) -> bool {
        self.resources
            .iter()
            .any(|r| r.protected && r.resource_type == id.resource_type && r.name == id.name)
    }
}
