//! Target parameters of a pipe

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use stratus_core::schema::{AttributeSchema, AttributeType, BlockSchema, Validator, types};

use super::enrichment::{HttpParameters, http_parameters_block};
use crate::resources::Tag;

const JSON_PATH_PATTERN: &str = r"^\$(\.[\w/_-]+(\[(\d+|\*)\])*)*$";

const TARGET_BLOCKS: &[&str] = &[
    "batch_job_parameters",
    "cloudwatch_logs_parameters",
    "ecs_task_parameters",
    "eventbridge_event_bus_parameters",
    "http_parameters",
    "kinesis_stream_parameters",
    "lambda_function_parameters",
    "redshift_data_parameters",
    "sagemaker_pipeline_parameters",
    "sqs_queue_parameters",
    "step_function_state_machine_parameters",
];

const INVOCATION_TYPES: &[&str] = &["REQUEST_RESPONSE", "FIRE_AND_FORGET"];

// =============================================================================
// Schema
// =============================================================================

fn string(name: &str) -> AttributeSchema {
    AttributeSchema::new(name, AttributeType::String)
}

fn int(name: &str) -> AttributeSchema {
    AttributeSchema::new(name, AttributeType::Int)
}

fn block(name: &str, block: BlockSchema) -> AttributeSchema {
    AttributeSchema::new(name, AttributeType::Block(block))
}

fn block_list(name: &str, block: BlockSchema) -> AttributeSchema {
    AttributeSchema::new(name, types::block_list(block))
}

fn json_path(name: &str) -> AttributeSchema {
    string(name)
        .validator(Validator::StringLenBetween(1, 256))
        .validator(Validator::matches(JSON_PATH_PATTERN, "is not a JSON path"))
}

fn name_value() -> BlockSchema {
    BlockSchema::new()
        .attribute(string("name"))
        .attribute(string("value"))
}

fn typed_value(kinds: &[&str]) -> BlockSchema {
    BlockSchema::new()
        .attribute(AttributeSchema::new("type", types::enum_of(kinds)).required())
        .attribute(string("value").required())
}

fn invocation() -> BlockSchema {
    BlockSchema::new().attribute(
        AttributeSchema::new("invocation_type", types::enum_of(INVOCATION_TYPES)).required(),
    )
}

fn batch_job_block() -> BlockSchema {
    let container_overrides = BlockSchema::new()
        .attribute(AttributeSchema::new("command", types::string_list()))
        .attribute(block_list("environment", name_value()))
        .attribute(string("instance_type"))
        .attribute(
            block_list("resource_requirement", typed_value(&["GPU", "VCPU", "MEMORY"]))
                .with_provider_name("ResourceRequirements"),
        );
    let depends_on = BlockSchema::new()
        .attribute(string("job_id"))
        .attribute(AttributeSchema::new("type", types::enum_of(&["N_TO_N", "SEQUENTIAL"])));

    BlockSchema::new()
        .attribute(block(
            "array_properties",
            BlockSchema::new().attribute(int("size").validator(Validator::IntBetween(2, 10000))),
        ))
        .attribute(block("container_overrides", container_overrides))
        .attribute(block_list("depends_on", depends_on).with_max_items(20))
        .attribute(string("job_definition").required())
        .attribute(
            string("job_name")
                .required()
                .validator(Validator::StringLenBetween(1, 128)),
        )
        .attribute(AttributeSchema::new("parameters", types::tags()))
        .attribute(block(
            "retry_strategy",
            BlockSchema::new().attribute(int("attempts").validator(Validator::IntBetween(1, 10))),
        ))
}

fn cloudwatch_logs_block() -> BlockSchema {
    BlockSchema::new()
        .attribute(string("log_stream_name").validator(Validator::StringLenBetween(0, 256)))
        .attribute(json_path("timestamp"))
}

fn ecs_container_override() -> BlockSchema {
    let environment_file = BlockSchema::new()
        .attribute(AttributeSchema::new("type", types::enum_of(&["s3"])).required())
        .attribute(string("value").required().validator(Validator::Arn));
    BlockSchema::new()
        .attribute(AttributeSchema::new("command", types::string_list()))
        .attribute(int("cpu"))
        .attribute(block_list("environment", name_value()))
        .attribute(
            block_list("environment_file", environment_file).with_provider_name("EnvironmentFiles"),
        )
        .attribute(int("memory"))
        .attribute(int("memory_reservation"))
        .attribute(string("name"))
        .attribute(
            block_list("resource_requirement", typed_value(&["GPU", "InferenceAccelerator"]))
                .with_provider_name("ResourceRequirements"),
        )
}

fn ecs_task_block() -> BlockSchema {
    let capacity_provider = BlockSchema::new()
        .attribute(int("base").validator(Validator::IntBetween(0, 100_000)))
        .attribute(
            string("capacity_provider")
                .required()
                .validator(Validator::StringLenBetween(1, 255)),
        )
        .attribute(int("weight").validator(Validator::IntBetween(0, 1000)));

    let awsvpc = BlockSchema::new()
        .attribute(AttributeSchema::new(
            "assign_public_ip",
            types::enum_of(&["ENABLED", "DISABLED"]),
        ))
        .attribute(
            AttributeSchema::new("security_groups", types::string_set())
                .with_max_items(5)
                .validator(Validator::StringLenBetween(1, 1024)),
        )
        .attribute(
            AttributeSchema::new("subnets", types::string_set())
                .with_max_items(16)
                .validator(Validator::StringLenBetween(1, 1024)),
        );
    let network = BlockSchema::new()
        .attribute(block("aws_vpc_configuration", awsvpc).with_provider_name("AwsvpcConfiguration"));

    let inference_accelerator = BlockSchema::new()
        .attribute(string("device_name"))
        .attribute(string("device_type"));
    let overrides = BlockSchema::new()
        .attribute(
            block_list("container_override", ecs_container_override())
                .with_provider_name("ContainerOverrides"),
        )
        .attribute(string("cpu"))
        .attribute(block(
            "ephemeral_storage",
            BlockSchema::new().attribute(
                int("size_in_gib")
                    .required()
                    .with_provider_name("SizeInGiB")
                    .validator(Validator::IntBetween(21, 200)),
            ),
        ))
        .attribute(string("execution_role_arn").validator(Validator::Arn))
        .attribute(
            block_list("inference_accelerator_override", inference_accelerator)
                .with_provider_name("InferenceAcceleratorOverrides"),
        )
        .attribute(string("memory"))
        .attribute(string("task_role_arn").validator(Validator::Arn));

    let placement_constraint = BlockSchema::new()
        .attribute(string("expression").validator(Validator::StringLenBetween(1, 2000)))
        .attribute(AttributeSchema::new(
            "type",
            types::enum_of(&["distinctInstance", "memberOf"]),
        ));
    let placement_strategy = BlockSchema::new()
        .attribute(string("field").validator(Validator::StringLenBetween(1, 255)))
        .attribute(AttributeSchema::new(
            "type",
            types::enum_of(&["random", "spread", "binpack"]),
        ));
    let tag = BlockSchema::new()
        .attribute(string("key").required())
        .attribute(string("value").required());

    BlockSchema::new()
        .attribute(block_list("capacity_provider_strategy", capacity_provider).with_max_items(6))
        .attribute(
            AttributeSchema::new("enable_ecs_managed_tags", AttributeType::Bool)
                .with_provider_name("EnableECSManagedTags"),
        )
        .attribute(AttributeSchema::new("enable_execute_command", AttributeType::Bool))
        .attribute(string("group").validator(Validator::StringLenBetween(1, 255)))
        .attribute(AttributeSchema::new(
            "launch_type",
            types::enum_of(&["EC2", "FARGATE", "EXTERNAL"]),
        ))
        .attribute(block("network_configuration", network))
        .attribute(block("overrides", overrides))
        .attribute(
            block_list("placement_constraint", placement_constraint)
                .with_provider_name("PlacementConstraints")
                .with_max_items(10),
        )
        .attribute(block_list("placement_strategy", placement_strategy).with_max_items(5))
        .attribute(string("platform_version"))
        .attribute(AttributeSchema::new(
            "propagate_tags",
            types::enum_of(&["TASK_DEFINITION"]),
        ))
        .attribute(string("reference_id").validator(Validator::StringLenBetween(1, 1024)))
        .attribute(block_list("tag", tag).with_provider_name("Tags"))
        .attribute(int("task_count"))
        .attribute(
            string("task_definition_arn")
                .required()
                .validator(Validator::Arn),
        )
}

fn eventbridge_block() -> BlockSchema {
    BlockSchema::new()
        .attribute(string("detail_type").validator(Validator::StringLenBetween(0, 128)))
        .attribute(
            string("endpoint_id")
                .validator(Validator::StringLenBetween(1, 50))
                .validator(Validator::matches(
                    r"^[0-9A-Za-z-]+[\.][0-9A-Za-z-]+$",
                    "is not a valid endpoint ID",
                )),
        )
        .attribute(
            AttributeSchema::new("resources", types::string_set())
                .with_max_items(10)
                .validator(Validator::Arn),
        )
        .attribute(string("source").validator(Validator::StringLenBetween(1, 256)))
        .attribute(json_path("time"))
}

fn redshift_data_block() -> BlockSchema {
    BlockSchema::new()
        .attribute(
            string("database")
                .required()
                .validator(Validator::StringLenBetween(1, 64)),
        )
        .attribute(string("db_user").validator(Validator::StringLenBetween(1, 128)))
        .attribute(string("secret_manager_arn").validator(Validator::Arn))
        .attribute(
            AttributeSchema::new("sqls", types::string_set())
                .required()
                .validator(Validator::StringLenBetween(1, 100_000)),
        )
        .attribute(string("statement_name").validator(Validator::StringLenBetween(1, 500)))
        .attribute(AttributeSchema::new("with_event", AttributeType::Bool))
}

fn sagemaker_pipeline_block() -> BlockSchema {
    let parameter = BlockSchema::new()
        .attribute(
            string("name")
                .required()
                .validator(Validator::StringLenBetween(1, 256)),
        )
        .attribute(
            string("value")
                .required()
                .validator(Validator::StringLenBetween(1, 1024)),
        );
    BlockSchema::new().attribute(
        block_list("pipeline_parameter", parameter)
            .with_provider_name("PipelineParameterList")
            .with_max_items(200),
    )
}

/// Schema of the `target_parameters` block
pub fn target_parameters_block() -> BlockSchema {
    let sqs = BlockSchema::new()
        .attribute(string("message_deduplication_id").validator(Validator::StringLenBetween(1, 100)))
        .attribute(string("message_group_id").validator(Validator::StringLenBetween(1, 100)));
    let kinesis = BlockSchema::new().attribute(
        string("partition_key")
            .required()
            .validator(Validator::StringLenBetween(1, 256)),
    );

    BlockSchema::new()
        .attribute(block("batch_job_parameters", batch_job_block()))
        .attribute(
            block("cloudwatch_logs_parameters", cloudwatch_logs_block())
                .with_provider_name("CloudWatchLogsParameters"),
        )
        .attribute(block("ecs_task_parameters", ecs_task_block()))
        .attribute(
            block("eventbridge_event_bus_parameters", eventbridge_block())
                .with_provider_name("EventBridgeEventBusParameters"),
        )
        .attribute(block("http_parameters", http_parameters_block()))
        .attribute(string("input_template").validator(Validator::StringLenBetween(0, 8192)))
        .attribute(block("kinesis_stream_parameters", kinesis))
        .attribute(block("lambda_function_parameters", invocation()))
        .attribute(block("redshift_data_parameters", redshift_data_block()))
        .attribute(
            block("sagemaker_pipeline_parameters", sagemaker_pipeline_block())
                .with_provider_name("SageMakerPipelineParameters"),
        )
        .attribute(block("sqs_queue_parameters", sqs))
        .attribute(block("step_function_state_machine_parameters", invocation()))
        .conflicting(TARGET_BLOCKS)
}

// =============================================================================
// Typed model
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PipeTargetParameters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_job_parameters: Option<BatchJobParameters>,
    #[serde(rename = "CloudWatchLogsParameters", skip_serializing_if = "Option::is_none")]
    pub cloudwatch_logs_parameters: Option<CloudWatchLogsParameters>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ecs_task_parameters: Option<EcsTaskParameters>,
    #[serde(rename = "EventBridgeEventBusParameters", skip_serializing_if = "Option::is_none")]
    pub eventbridge_event_bus_parameters: Option<EventBridgeEventBusParameters>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_parameters: Option<HttpParameters>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_template: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kinesis_stream_parameters: Option<KinesisStreamParameters>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lambda_function_parameters: Option<InvocationParameters>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redshift_data_parameters: Option<RedshiftDataParameters>,
    #[serde(rename = "SageMakerPipelineParameters", skip_serializing_if = "Option::is_none")]
    pub sagemaker_pipeline_parameters: Option<SageMakerPipelineParameters>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sqs_queue_parameters: Option<SqsQueueTargetParameters>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_function_state_machine_parameters: Option<InvocationParameters>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BatchJobParameters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub array_properties: Option<BatchArrayProperties>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container_overrides: Option<BatchContainerOverrides>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<BatchJobDependency>,
    pub job_definition: String,
    pub job_name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_strategy: Option<BatchRetryStrategy>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BatchArrayProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BatchContainerOverrides {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub environment: Vec<NameValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance_type: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resource_requirements: Vec<TypedValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BatchJobDependency {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r#type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BatchRetryStrategy {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempts: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NameValue {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TypedValue {
    pub r#type: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CloudWatchLogsParameters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_stream_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EcsTaskParameters {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub capacity_provider_strategy: Vec<CapacityProviderStrategyItem>,
    #[serde(rename = "EnableECSManagedTags", skip_serializing_if = "Option::is_none")]
    pub enable_ecs_managed_tags: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_execute_command: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub launch_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_configuration: Option<NetworkConfiguration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overrides: Option<EcsTaskOverride>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub placement_constraints: Vec<PlacementConstraint>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub placement_strategy: Vec<PlacementStrategy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub propagate_tags: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_count: Option<i64>,
    pub task_definition_arn: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CapacityProviderStrategyItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base: Option<i64>,
    pub capacity_provider: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NetworkConfiguration {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub awsvpc_configuration: Option<AwsVpcConfiguration>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AwsVpcConfiguration {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assign_public_ip: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub security_groups: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subnets: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EcsTaskOverride {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub container_overrides: Vec<EcsContainerOverride>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ephemeral_storage: Option<EcsEphemeralStorage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_role_arn: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inference_accelerator_overrides: Vec<EcsInferenceAcceleratorOverride>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_role_arn: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EcsContainerOverride {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu: Option<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub environment: Vec<NameValue>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub environment_files: Vec<TypedValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_reservation: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resource_requirements: Vec<TypedValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EcsEphemeralStorage {
    #[serde(rename = "SizeInGiB")]
    pub size_in_gib: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EcsInferenceAcceleratorOverride {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PlacementConstraint {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r#type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PlacementStrategy {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r#type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EventBridgeEventBusParameters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct KinesisStreamParameters {
    pub partition_key: String,
}

/// Lambda and Step Functions targets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InvocationParameters {
    pub invocation_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RedshiftDataParameters {
    pub database: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_manager_arn: Option<String>,
    pub sqls: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statement_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub with_event: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SageMakerPipelineParameters {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pipeline_parameter_list: Vec<SageMakerPipelineParameter>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SageMakerPipelineParameter {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SqsQueueTargetParameters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_deduplication_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_group_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flex;
    use serde_json::json;
    use std::collections::HashMap;
    use stratus_core::resource::Value;

    fn s(v: &str) -> Value {
        Value::String(v.to_string())
    }

    fn map(entries: Vec<(&str, Value)>) -> Value {
        Value::Map(entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
    }

    fn ecs_task() -> HashMap<String, Value> {
        HashMap::from([(
            "ecs_task_parameters".to_string(),
            map(vec![
                (
                    "task_definition_arn",
                    s("arn:aws:ecs:us-east-1:123456789012:task-definition/worker:1"),
                ),
                ("enable_ecs_managed_tags", Value::Bool(true)),
                (
                    "network_configuration",
                    map(vec![(
                        "aws_vpc_configuration",
                        map(vec![
                            ("assign_public_ip", s("DISABLED")),
                            ("subnets", Value::List(vec![s("subnet-1234")])),
                        ]),
                    )]),
                ),
                (
                    "overrides",
                    map(vec![(
                        "ephemeral_storage",
                        map(vec![("size_in_gib", Value::Int(32))]),
                    )]),
                ),
                (
                    "tag",
                    Value::List(vec![map(vec![("key", s("team")), ("value", s("core"))])]),
                ),
            ]),
        )])
    }

    #[test]
    fn ecs_task_expands_to_cloud_shape() {
        let block = target_parameters_block();
        let attrs = ecs_task();
        assert!(block.validate(&attrs).is_ok());

        let doc = flex::expand(&block, &attrs).unwrap();
        let normalized =
            flex::through_model::<PipeTargetParameters>(serde_json::Value::Object(doc)).unwrap();
        assert_eq!(
            normalized,
            json!({
                "EcsTaskParameters": {
                    "EnableECSManagedTags": true,
                    "NetworkConfiguration": {
                        "AwsvpcConfiguration": {
                            "AssignPublicIp": "DISABLED",
                            "Subnets": ["subnet-1234"]
                        }
                    },
                    "Overrides": { "EphemeralStorage": { "SizeInGiB": 32 } },
                    "Tags": [{ "Key": "team", "Value": "core" }],
                    "TaskDefinitionArn": "arn:aws:ecs:us-east-1:123456789012:task-definition/worker:1"
                }
            })
        );
    }

    #[test]
    fn flatten_restores_ecs_task_attributes() {
        let block = target_parameters_block();
        let doc = flex::expand(&block, &ecs_task()).unwrap();
        let attrs = flex::flatten(&block, &doc);
        assert_eq!(attrs, ecs_task());
    }

    #[test]
    fn one_target_block_at_a_time() {
        let attrs = HashMap::from([
            (
                "lambda_function_parameters".to_string(),
                map(vec![("invocation_type", s("FIRE_AND_FORGET"))]),
            ),
            (
                "sqs_queue_parameters".to_string(),
                map(vec![("message_group_id", s("orders"))]),
            ),
        ]);
        assert!(target_parameters_block().validate(&attrs).is_err());
    }

    #[test]
    fn validates_nested_limits() {
        let attrs = HashMap::from([(
            "cloudwatch_logs_parameters".to_string(),
            map(vec![("timestamp", s("not-a-path"))]),
        )]);
        assert!(target_parameters_block().validate(&attrs).is_err());

        let attrs = HashMap::from([(
            "batch_job_parameters".to_string(),
            map(vec![
                ("job_definition", s("worker")),
                ("job_name", s("nightly")),
                ("retry_strategy", map(vec![("attempts", Value::Int(11))])),
            ]),
        )]);
        assert!(target_parameters_block().validate(&attrs).is_err());
    }

    #[test]
    fn invocation_type_is_an_enum() {
        let attrs = HashMap::from([(
            "step_function_state_machine_parameters".to_string(),
            map(vec![("invocation_type", s("SYNC"))]),
        )]);
        assert!(target_parameters_block().validate(&attrs).is_err());
    }
}
