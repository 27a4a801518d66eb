//! Enrichment parameters and log configuration of a pipe

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use stratus_core::schema::{AttributeSchema, AttributeType, BlockSchema, Validator, types};

pub const LOG_LEVELS: &[&str] = &["OFF", "ERROR", "INFO", "TRACE"];
const S3_OUTPUT_FORMATS: &[&str] = &["json", "plain", "w3c"];

/// HTTP request settings for API destination and API Gateway targets
pub fn http_parameters_block() -> BlockSchema {
    BlockSchema::new()
        .attribute(AttributeSchema::new("header_parameters", types::tags()))
        .attribute(
            AttributeSchema::new("path_parameter_values", types::string_list()).with_max_items(1),
        )
        .attribute(AttributeSchema::new("query_string_parameters", types::tags()))
}

pub fn enrichment_parameters_block() -> BlockSchema {
    BlockSchema::new()
        .attribute(AttributeSchema::new(
            "http_parameters",
            AttributeType::Block(http_parameters_block()),
        ))
        .attribute(
            AttributeSchema::new("input_template", AttributeType::String)
                .validator(Validator::StringLenBetween(0, 8192)),
        )
}

pub fn log_configuration_block() -> BlockSchema {
    let cloudwatch = BlockSchema::new().attribute(
        AttributeSchema::new("log_group_arn", AttributeType::String)
            .required()
            .validator(Validator::Arn),
    );
    let firehose = BlockSchema::new().attribute(
        AttributeSchema::new("delivery_stream_arn", AttributeType::String)
            .required()
            .validator(Validator::Arn),
    );
    let s3 = BlockSchema::new()
        .attribute(AttributeSchema::new("bucket_name", AttributeType::String).required())
        .attribute(AttributeSchema::new("bucket_owner", types::account_id()).required())
        .attribute(AttributeSchema::new(
            "output_format",
            types::enum_of(S3_OUTPUT_FORMATS),
        ))
        .attribute(AttributeSchema::new("prefix", AttributeType::String));

    BlockSchema::new()
        .attribute(AttributeSchema::new(
            "cloudwatch_logs_log_destination",
            AttributeType::Block(cloudwatch),
        ))
        .attribute(AttributeSchema::new(
            "firehose_log_destination",
            AttributeType::Block(firehose),
        ))
        .attribute(AttributeSchema::new(
            "include_execution_data",
            AttributeType::Set(Box::new(types::enum_of(&["ALL"]))),
        ))
        .attribute(AttributeSchema::new("level", types::enum_of(LOG_LEVELS)).required())
        .attribute(AttributeSchema::new("s3_log_destination", AttributeType::Block(s3)))
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HttpParameters {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub header_parameters: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub path_parameter_values: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub query_string_parameters: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PipeEnrichmentParameters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_parameters: Option<HttpParameters>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_template: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PipeLogConfiguration {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cloudwatch_logs_log_destination: Option<CloudwatchLogsLogDestination>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub firehose_log_destination: Option<FirehoseLogDestination>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include_execution_data: Vec<String>,
    pub level: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub s3_log_destination: Option<S3LogDestination>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CloudwatchLogsLogDestination {
    pub log_group_arn: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FirehoseLogDestination {
    pub delivery_stream_arn: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct S3LogDestination {
    pub bucket_name: String,
    pub bucket_owner: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
}
