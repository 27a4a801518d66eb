//! pipes_pipe: EventBridge Pipes (`AWS::Pipes::Pipe`)
//!
//! A pipe connects an event source to a target, with optional filtering
//! and enrichment. Pipes report a `CurrentState` that moves through
//! transitional states after every change, so the provider waits on it in
//! addition to the Cloud Control request.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::json;
use stratus_core::provider::ProviderResult;
use stratus_core::resource::Value;
use stratus_core::schema::{AttributeSchema, AttributeType, ResourceSchema, Validator, types};

use super::{Operation, ResourceDefinition, StatusWaiter};
use crate::flex::{self, TagFormat};
use crate::utils::{UNIQUE_ID_SUFFIX_LENGTH, name_prefix_from_name, prefixed_unique_id};

pub mod enrichment;
pub mod source_parameters;
pub mod target_parameters;

use enrichment::{
    PipeEnrichmentParameters, PipeLogConfiguration, enrichment_parameters_block,
    log_configuration_block,
};
use source_parameters::{PipeSourceParameters, source_parameters_block};
use target_parameters::{PipeTargetParameters, target_parameters_block};

type Json = serde_json::Value;

const NAME_MAX_LENGTH: usize = 64;
const NAME_PATTERN: &str = r"^[\.\-_A-Za-z0-9]+$";
const DEFAULT_NAME_PREFIX: &str = "stratus-";

pub const STATE_RUNNING: &str = "RUNNING";
pub const STATE_STOPPED: &str = "STOPPED";

const CREATE_WAITER: StatusWaiter = StatusWaiter {
    pending: &["CREATING", "STARTING", "STOPPING"],
    target: &[STATE_RUNNING, STATE_STOPPED],
};
const UPDATE_WAITER: StatusWaiter = StatusWaiter {
    pending: &["UPDATING", "STARTING", "STOPPING"],
    target: &[STATE_RUNNING, STATE_STOPPED],
};
const DELETE_WAITER: StatusWaiter = StatusWaiter {
    pending: &["DELETING"],
    target: &[],
};

pub struct PipeDefinition;

impl ResourceDefinition for PipeDefinition {
    fn resource_type(&self) -> &'static str {
        "pipes_pipe"
    }

    fn aws_type_name(&self) -> &'static str {
        "AWS::Pipes::Pipe"
    }

    fn schema(&self) -> ResourceSchema {
        pipe_schema()
    }

    fn tag_format(&self) -> Option<TagFormat> {
        Some(TagFormat::Map)
    }

    fn normalize(&self, doc: Json) -> ProviderResult<Json> {
        flex::through_model::<PipeProperties>(doc)
    }

    fn prepare_create(&self, attributes: &mut HashMap<String, Value>) {
        if attributes.contains_key("name") {
            return;
        }
        let prefix = attributes
            .get("name_prefix")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_NAME_PREFIX);
        let name = prefixed_unique_id(prefix);
        attributes.insert("name".to_string(), Value::String(name));
    }

    fn post_read(&self, attributes: &mut HashMap<String, Value>) {
        let prefix = attributes
            .get("name")
            .and_then(Value::as_str)
            .and_then(name_prefix_from_name);
        if let Some(prefix) = prefix {
            attributes.insert("name_prefix".to_string(), Value::String(prefix));
        }
    }

    fn status(&self, props: &Json) -> Option<String> {
        props
            .get("CurrentState")
            .and_then(|v| v.as_str())
            .map(str::to_string)
    }

    fn status_waiter(&self, operation: Operation) -> Option<StatusWaiter> {
        Some(match operation {
            Operation::Create => CREATE_WAITER,
            Operation::Update => UPDATE_WAITER,
            Operation::Delete => DELETE_WAITER,
        })
    }

    fn status_reason(&self, props: &Json) -> Option<String> {
        props
            .get("StateReason")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }

    /// A filter is only removed when an empty `FilterCriteria` is sent
    fn adjust_patch(&self, previous: &Json, desired: &Json, ops: &mut Vec<Json>) {
        let had_filter = previous
            .pointer("/SourceParameters/FilterCriteria")
            .is_some();
        let has_filter = desired
            .pointer("/SourceParameters/FilterCriteria")
            .is_some();
        if !had_filter || has_filter {
            return;
        }

        let base = desired
            .get("SourceParameters")
            .or_else(|| previous.get("SourceParameters"));
        let mut source_parameters = match base {
            Some(Json::Object(map)) => map.clone(),
            _ => serde_json::Map::new(),
        };
        source_parameters.insert("FilterCriteria".to_string(), json!({}));

        ops.retain(|op| op.get("path").and_then(|p| p.as_str()) != Some("/SourceParameters"));
        ops.push(json!({
            "op": "replace",
            "path": "/SourceParameters",
            "value": Json::Object(source_parameters),
        }));
    }
}

fn pipe_schema() -> ResourceSchema {
    ResourceSchema::new("pipes_pipe")
        .with_description("Connects an event source to a target through EventBridge Pipes.")
        .attribute(
            AttributeSchema::new("arn", AttributeType::String)
                .computed()
                .with_description("ARN of the pipe."),
        )
        .attribute(AttributeSchema::new("creation_time", AttributeType::String).computed())
        .attribute(AttributeSchema::new("current_state", AttributeType::String).computed())
        .attribute(
            AttributeSchema::new("description", AttributeType::String)
                .validator(Validator::StringLenBetween(0, 512))
                .with_description("Description of the pipe."),
        )
        .attribute(
            AttributeSchema::new(
                "desired_state",
                types::enum_of(&[STATE_RUNNING, STATE_STOPPED]),
            )
            .with_default(Value::String(STATE_RUNNING.to_string()))
            .with_description("The state the pipe should be in."),
        )
        .attribute(
            AttributeSchema::new("enrichment", AttributeType::String)
                .validator(Validator::StringLenBetween(0, 1600))
                .validator(Validator::Arn)
                .with_description("ARN of the enrichment resource."),
        )
        .attribute(AttributeSchema::new(
            "enrichment_parameters",
            AttributeType::Block(enrichment_parameters_block()),
        ))
        .attribute(
            AttributeSchema::new("kms_key_identifier", AttributeType::String)
                .validator(Validator::StringLenBetween(0, 2048))
                .with_description("KMS key used to encrypt pipe data."),
        )
        .attribute(AttributeSchema::new("last_modified_time", AttributeType::String).computed())
        .attribute(AttributeSchema::new(
            "log_configuration",
            AttributeType::Block(log_configuration_block()),
        ))
        .attribute(
            AttributeSchema::new("name", AttributeType::String)
                .optional_computed()
                .force_new()
                .validator(Validator::StringLenBetween(1, NAME_MAX_LENGTH))
                .validator(Validator::matches(NAME_PATTERN, "is not a valid pipe name"))
                .with_description("Name of the pipe. Generated when not set."),
        )
        .attribute(
            AttributeSchema::new("name_prefix", AttributeType::String)
                .optional_computed()
                .force_new()
                .validator(Validator::StringLenBetween(
                    1,
                    NAME_MAX_LENGTH - UNIQUE_ID_SUFFIX_LENGTH,
                ))
                .with_description("Creates a unique name beginning with the specified prefix."),
        )
        .attribute(
            AttributeSchema::new("role_arn", types::arn())
                .required()
                .with_description("ARN of the role that allows the pipe to send data to the target."),
        )
        .attribute(
            AttributeSchema::new("source", AttributeType::String)
                .required()
                .force_new()
                .validator(Validator::StringLenBetween(1, 1600))
                .with_description("Source resource of the pipe, such as an SQS queue ARN."),
        )
        .attribute(
            AttributeSchema::new(
                "source_parameters",
                AttributeType::Block(source_parameters_block()),
            )
            .optional_computed(),
        )
        .attribute(AttributeSchema::new("state_reason", AttributeType::String).computed())
        .attribute(AttributeSchema::new("tags", types::tags()))
        .attribute(
            AttributeSchema::new("target", AttributeType::String)
                .required()
                .validator(Validator::StringLenBetween(1, 1600))
                .with_description("Target resource of the pipe."),
        )
        .attribute(AttributeSchema::new(
            "target_parameters",
            AttributeType::Block(target_parameters_block()),
        ))
        .conflicting(&["name", "name_prefix"])
}

// =============================================================================
// Typed model
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PipeProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desired_state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enrichment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enrichment_parameters: Option<PipeEnrichmentParameters>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kms_key_identifier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_configuration: Option<PipeLogConfiguration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub role_arn: String,
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_parameters: Option<PipeSourceParameters>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_reason: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
    pub target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_parameters: Option<PipeTargetParameters>,
}
