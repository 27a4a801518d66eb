//! securitylake_subscriber (`AWS::SecurityLake::Subscriber`)
//!
//! Each entry of `sources` is either a native AWS log source or a custom
//! one. The typed model carries that choice as [`SubscriberSource`].

use serde::{Deserialize, Serialize};
use stratus_core::provider::ProviderResult;
use stratus_core::schema::{AttributeSchema, AttributeType, BlockSchema, ResourceSchema, types};

use super::AWS_LOG_SOURCE_NAMES;
use crate::flex;
use crate::resources::{ResourceDefinition, Tag};

type Json = serde_json::Value;

const ACCESS_TYPES: &[&str] = &["LAKEFORMATION", "S3"];

pub struct SubscriberDefinition;

impl ResourceDefinition for SubscriberDefinition {
    fn resource_type(&self) -> &'static str {
        "securitylake_subscriber"
    }

    fn aws_type_name(&self) -> &'static str {
        "AWS::SecurityLake::Subscriber"
    }

    fn schema(&self) -> ResourceSchema {
        let identity = BlockSchema::new()
            .attribute(AttributeSchema::new("external_id", AttributeType::String).required())
            .attribute(AttributeSchema::new("principal", types::account_id()).required());

        let aws_log_source = BlockSchema::new()
            .attribute(
                AttributeSchema::new("source_name", types::enum_of(AWS_LOG_SOURCE_NAMES))
                    .required(),
            )
            .attribute(AttributeSchema::new("source_version", AttributeType::String));
        let custom_log_source = BlockSchema::new()
            .attribute(AttributeSchema::new("source_name", AttributeType::String).required())
            .attribute(AttributeSchema::new("source_version", AttributeType::String));
        let source = BlockSchema::new()
            .attribute(
                AttributeSchema::new("aws_log_source_resource", AttributeType::Block(aws_log_source))
                    .with_provider_name("AwsLogSource"),
            )
            .attribute(
                AttributeSchema::new(
                    "custom_log_source_resource",
                    AttributeType::Block(custom_log_source),
                )
                .with_provider_name("CustomLogSource"),
            )
            .exactly_one_of(&["aws_log_source_resource", "custom_log_source_resource"]);

        ResourceSchema::new("securitylake_subscriber")
            .with_description("Grants an account access to Security Lake data.")
            .attribute(
                AttributeSchema::new(
                    "access_types",
                    AttributeType::Set(Box::new(types::enum_of(ACCESS_TYPES))),
                )
                .required()
                .with_description("How the subscriber consumes data: Lake Formation or S3."),
            )
            .attribute(
                AttributeSchema::new("data_lake_arn", types::arn())
                    .required()
                    .force_new()
                    .with_provider_name("DataLake"),
            )
            .attribute(AttributeSchema::new("resource_share_arn", AttributeType::String).computed())
            .attribute(AttributeSchema::new("resource_share_name", AttributeType::String).computed())
            .attribute(AttributeSchema::new("s3_bucket_arn", AttributeType::String).computed())
            .attribute(
                AttributeSchema::new("sources", types::block_set(source))
                    .required()
                    .with_min_items(1),
            )
            .attribute(AttributeSchema::new("subscriber_arn", AttributeType::String).computed())
            .attribute(AttributeSchema::new("subscriber_description", AttributeType::String))
            .attribute(
                AttributeSchema::new("subscriber_identity", AttributeType::Block(identity))
                    .required(),
            )
            .attribute(
                AttributeSchema::new("subscriber_name", AttributeType::String)
                    .required()
                    .with_description("Name of the subscriber."),
            )
            .attribute(
                AttributeSchema::new("subscriber_role_arn", AttributeType::String).computed(),
            )
            .attribute(AttributeSchema::new("tags", types::tags()))
    }

    /// Sources are unordered, so the canonical document sorts them
    fn normalize(&self, doc: Json) -> ProviderResult<Json> {
        flex::through_model_with::<SubscriberProperties>(doc, |props| {
            props.sources.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SubscriberProperties {
    pub access_types: Vec<String>,
    pub data_lake: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_share_arn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_share_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub s3_bucket_arn: Option<String>,
    pub sources: Vec<SubscriberSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscriber_arn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscriber_description: Option<String>,
    pub subscriber_identity: SubscriberIdentity,
    pub subscriber_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscriber_role_arn: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SubscriberSource {
    AwsLogSource(LogSourceResource),
    CustomLogSource(LogSourceResource),
}

impl SubscriberSource {
    fn sort_key(&self) -> (u8, &str) {
        match self {
            SubscriberSource::AwsLogSource(source) => (0, &source.source_name),
            SubscriberSource::CustomLogSource(source) => (1, &source.source_name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LogSourceResource {
    pub source_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SubscriberIdentity {
    pub external_id: String,
    pub principal: String,
}
