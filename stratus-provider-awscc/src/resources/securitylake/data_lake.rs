//! securitylake_data_lake (`AWS::SecurityLake::DataLake`)

use serde::{Deserialize, Serialize};
use stratus_core::provider::ProviderResult;
use stratus_core::schema::{AttributeSchema, AttributeType, BlockSchema, ResourceSchema, types};

use crate::flex;
use crate::resources::{ResourceDefinition, Tag};

type Json = serde_json::Value;

pub struct DataLakeDefinition;

impl ResourceDefinition for DataLakeDefinition {
    fn resource_type(&self) -> &'static str {
        "securitylake_data_lake"
    }

    fn aws_type_name(&self) -> &'static str {
        "AWS::SecurityLake::DataLake"
    }

    fn schema(&self) -> ResourceSchema {
        let encryption = BlockSchema::new().attribute(
            AttributeSchema::new("kms_key_id", AttributeType::String)
                .with_description("KMS key ID, or S3_MANAGED_KEY for S3-managed encryption."),
        );
        let expiration = BlockSchema::new()
            .attribute(AttributeSchema::new("days", types::positive_int()));
        let transition = BlockSchema::new()
            .attribute(AttributeSchema::new("days", types::positive_int()))
            .attribute(AttributeSchema::new("storage_class", AttributeType::String));
        let lifecycle = BlockSchema::new()
            .attribute(AttributeSchema::new("expiration", AttributeType::Block(expiration)))
            .attribute(AttributeSchema::new("transitions", types::block_list(transition)));
        let replication = BlockSchema::new()
            .attribute(AttributeSchema::new("regions", types::string_set()))
            .attribute(AttributeSchema::new("role_arn", types::arn()));

        ResourceSchema::new("securitylake_data_lake")
            .with_description("Initializes Security Lake in the provider's region.")
            .attribute(AttributeSchema::new("arn", AttributeType::String).computed())
            .attribute(
                AttributeSchema::new("encryption_configuration", AttributeType::Block(encryption))
                    .optional_computed(),
            )
            .attribute(
                AttributeSchema::new("lifecycle_configuration", AttributeType::Block(lifecycle))
                    .with_description("Retention and storage class transitions for lake data."),
            )
            .attribute(
                AttributeSchema::new("meta_store_manager_role_arn", types::arn())
                    .force_new()
                    .with_description("Role used to create and update the Glue table partitions."),
            )
            .attribute(
                AttributeSchema::new("replication_configuration", AttributeType::Block(replication))
                    .with_description("Regions to replicate data to and the role used for it."),
            )
            .attribute(AttributeSchema::new("s3_bucket_arn", AttributeType::String).computed())
            .attribute(AttributeSchema::new("tags", types::tags()))
    }

    fn normalize(&self, doc: Json) -> ProviderResult<Json> {
        flex::through_model::<DataLakeProperties>(doc)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DataLakeProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encryption_configuration: Option<EncryptionConfiguration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lifecycle_configuration: Option<LifecycleConfiguration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta_store_manager_role_arn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replication_configuration: Option<ReplicationConfiguration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub s3_bucket_arn: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EncryptionConfiguration {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kms_key_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LifecycleConfiguration {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiration: Option<Expiration>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub transitions: Vec<Transition>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Expiration {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Transition {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_class: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ReplicationConfiguration {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub regions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role_arn: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::Operation;
    use serde_json::json;
    use std::collections::HashMap;
    use stratus_core::resource::Value;

    #[test]
    fn lifecycle_expands_to_cloud_shape() {
        let def = DataLakeDefinition;
        let attrs = HashMap::from([(
            "lifecycle_configuration".to_string(),
            Value::Map(HashMap::from([
                (
                    "expiration".to_string(),
                    Value::Map(HashMap::from([("days".to_string(), Value::Int(365))])),
                ),
                (
                    "transitions".to_string(),
                    Value::List(vec![Value::Map(HashMap::from([
                        ("days".to_string(), Value::Int(31)),
                        (
                            "storage_class".to_string(),
                            Value::String("STANDARD_IA".to_string()),
                        ),
                    ]))]),
                ),
            ])),
        )]);
        assert!(def.schema().validate(&attrs).is_ok());

        let doc = flex::expand(&def.schema().block, &attrs).unwrap();
        assert_eq!(
            def.normalize(Json::Object(doc)).unwrap(),
            json!({
                "LifecycleConfiguration": {
                    "Expiration": { "Days": 365 },
                    "Transitions": [{ "Days": 31, "StorageClass": "STANDARD_IA" }]
                }
            })
        );
    }

    #[test]
    fn rejects_non_positive_retention() {
        let attrs = HashMap::from([(
            "lifecycle_configuration".to_string(),
            Value::Map(HashMap::from([(
                "expiration".to_string(),
                Value::Map(HashMap::from([("days".to_string(), Value::Int(0))])),
            )])),
        )]);
        assert!(DataLakeDefinition.schema().validate(&attrs).is_err());
    }

    #[test]
    fn waits_only_on_the_request() {
        let def = DataLakeDefinition;
        assert!(def.status_waiter(Operation::Create).is_none());
        assert_eq!(def.tag_format(), Some(flex::TagFormat::KeyValueList));
    }
}
