//! Resource type definitions for AWS Cloud Control API
//!
//! This module defines:
//! - The [`ResourceDefinition`] trait each supported resource type implements
//! - Resource type wrappers implementing [`ResourceType`]
//! - The registry mapping type names to definitions

use std::collections::HashMap;
use std::time::Duration;

use stratus_core::provider::{ProviderResult, ResourceType};
use stratus_core::resource::Value;
use stratus_core::schema::ResourceSchema;
use stratus_core::waiter::Timeouts;

use crate::flex::TagFormat;

pub mod pipes;
pub mod securitylake;
pub mod ssmsap;

type Json = serde_json::Value;

/// Lifecycle operation a waiter runs after
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Update,
    Delete,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::Create => write!(f, "create"),
            Operation::Update => write!(f, "update"),
            Operation::Delete => write!(f, "delete"),
        }
    }
}

/// Pending and target values of a resource's status property
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusWaiter {
    pub pending: &'static [&'static str],
    /// Empty for deletions: the wait ends once the resource is gone
    pub target: &'static [&'static str],
}

/// Status reported for resources without a status property
pub const STATUS_PRESENT: &str = "PRESENT";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// A resource type managed through Cloud Control.
///
/// The provider drives every type through the same lifecycle; the hooks
/// here cover what differs between types.
pub trait ResourceDefinition: Send + Sync {
    /// Type name used in configuration (e.g., "pipes_pipe")
    fn resource_type(&self) -> &'static str;

    /// CloudFormation type name (e.g., "AWS::Pipes::Pipe")
    fn aws_type_name(&self) -> &'static str;

    fn schema(&self) -> ResourceSchema;

    /// Wire form of the `tags` attribute, `None` if the type has no tags
    fn tag_format(&self) -> Option<TagFormat> {
        Some(TagFormat::KeyValueList)
    }

    fn default_timeouts(&self) -> Timeouts {
        Timeouts::uniform(DEFAULT_TIMEOUT)
    }

    /// Pass a property document through the type's typed model
    fn normalize(&self, doc: Json) -> ProviderResult<Json>;

    /// Fill in attributes derived at create time (e.g., generated names)
    fn prepare_create(&self, _attributes: &mut HashMap<String, Value>) {}

    /// Derive attributes the API does not return
    fn post_read(&self, _attributes: &mut HashMap<String, Value>) {}

    /// Current value of the status property, if the type has one
    fn status(&self, _props: &Json) -> Option<String> {
        None
    }

    fn status_waiter(&self, _operation: Operation) -> Option<StatusWaiter> {
        None
    }

    /// Human-readable reason attached to a failed status
    fn status_reason(&self, _props: &Json) -> Option<String> {
        None
    }

    /// Adjust the update patch computed from the previous and desired documents
    fn adjust_patch(&self, _previous: &Json, _desired: &Json, _ops: &mut Vec<Json>) {}
}

/// Key/value tag in CloudFormation list form
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Tag {
    pub key: String,
    pub value: String,
}

// =============================================================================
// Resource Type Definitions
// =============================================================================

macro_rules! define_resource_type {
    ($name:ident, $definition:expr) => {
        pub struct $name;
        impl ResourceType for $name {
            fn name(&self) -> &'static str {
                $definition.resource_type()
            }
            fn schema(&self) -> ResourceSchema {
                $definition.schema()
            }
        }
    };
}

define_resource_type!(PipeType, pipes::PipeDefinition);
define_resource_type!(DataLakeType, securitylake::DataLakeDefinition);
define_resource_type!(AwsLogSourceType, securitylake::AwsLogSourceDefinition);
define_resource_type!(SubscriberType, securitylake::SubscriberDefinition);
define_resource_type!(ApplicationType, ssmsap::ApplicationDefinition);

/// Returns all resource types supported by this provider
pub fn resource_types() -> Vec<Box<dyn ResourceType>> {
    vec![
        Box::new(PipeType),
        Box::new(DataLakeType),
        Box::new(AwsLogSourceType),
        Box::new(SubscriberType),
        Box::new(ApplicationType),
    ]
}

/// Returns all resource definitions
pub fn definitions() -> Vec<&'static dyn ResourceDefinition> {
    vec![
        &pipes::PipeDefinition,
        &securitylake::DataLakeDefinition,
        &securitylake::AwsLogSourceDefinition,
        &securitylake::SubscriberDefinition,
        &ssmsap::ApplicationDefinition,
    ]
}

/// Look up the definition for a configuration type name
pub fn definition(resource_type: &str) -> Option<&'static dyn ResourceDefinition> {
    definitions()
        .into_iter()
        .find(|d| d.resource_type() == resource_type)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_matches_resource_types() {
        let names: Vec<&str> = resource_types().iter().map(|t| t.name()).collect();
        let defs: Vec<&str> = definitions().iter().map(|d| d.resource_type()).collect();
        assert_eq!(names, defs);
        assert_eq!(
            names,
            vec![
                "pipes_pipe",
                "securitylake_data_lake",
                "securitylake_aws_log_source",
                "securitylake_subscriber",
                "ssmsap_application",
            ]
        );
    }

    #[test]
    fn lookup_by_type_name() {
        let def = definition("securitylake_subscriber").unwrap();
        assert_eq!(def.aws_type_name(), "AWS::SecurityLake::Subscriber");
        assert!(definition("ec2_vpc").is_none());
    }

    #[test]
    fn schemas_are_keyed_by_type_name() {
        for def in definitions() {
            assert_eq!(def.schema().resource_type, def.resource_type());
        }
    }
}
