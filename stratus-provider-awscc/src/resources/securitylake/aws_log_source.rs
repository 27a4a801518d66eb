//! securitylake_aws_log_source (`AWS::SecurityLake::AwsLogSource`)

use serde::{Deserialize, Serialize};
use stratus_core::provider::ProviderResult;
use stratus_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

use super::AWS_LOG_SOURCE_NAMES;
use crate::flex::{self, TagFormat};
use crate::resources::ResourceDefinition;

type Json = serde_json::Value;

pub struct AwsLogSourceDefinition;

impl ResourceDefinition for AwsLogSourceDefinition {
    fn resource_type(&self) -> &'static str {
        "securitylake_aws_log_source"
    }

    fn aws_type_name(&self) -> &'static str {
        "AWS::SecurityLake::AwsLogSource"
    }

    fn schema(&self) -> ResourceSchema {
        ResourceSchema::new("securitylake_aws_log_source")
            .with_description("Adds a natively supported AWS service as a Security Lake source.")
            .attribute(
                AttributeSchema::new("accounts", AttributeType::Set(Box::new(types::account_id())))
                    .with_description("Accounts to collect logs from."),
            )
            .attribute(
                AttributeSchema::new("data_lake_arn", types::arn())
                    .required()
                    .force_new(),
            )
            .attribute(
                AttributeSchema::new("source_name", types::enum_of(AWS_LOG_SOURCE_NAMES))
                    .required()
                    .force_new(),
            )
            .attribute(
                AttributeSchema::new("source_version", AttributeType::String)
                    .force_new()
                    .optional_computed(),
            )
    }

    fn tag_format(&self) -> Option<TagFormat> {
        None
    }

    fn normalize(&self, doc: Json) -> ProviderResult<Json> {
        flex::through_model::<AwsLogSourceProperties>(doc)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AwsLogSourceProperties {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub accounts: Vec<String>,
    pub data_lake_arn: String,
    pub source_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_version: Option<String>,
}
