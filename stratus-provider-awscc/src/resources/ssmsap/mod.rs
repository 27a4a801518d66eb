//! ssmsap_application (`AWS::SystemsManagerSAP::Application`)
//!
//! Registers an SAP application with Systems Manager for SAP. Database
//! credentials and component details are accepted on create but never
//! returned by reads.

use serde::{Deserialize, Serialize};
use stratus_core::provider::ProviderResult;
use stratus_core::schema::{
    AttributeSchema, AttributeType, BlockSchema, ResourceSchema, Validator, types,
};

use crate::flex;
use crate::resources::{ResourceDefinition, Tag};

type Json = serde_json::Value;

const APPLICATION_TYPES: &[&str] = &["HANA", "SAP_ABAP"];
const CREDENTIAL_TYPES: &[&str] = &["ADMIN"];
const COMPONENT_TYPES: &[&str] = &[
    "HANA", "HANA_NODE", "ABAP", "ASCS", "DIALOG", "WEBDISP", "WD", "ERS",
];

pub struct ApplicationDefinition;

impl ResourceDefinition for ApplicationDefinition {
    fn resource_type(&self) -> &'static str {
        "ssmsap_application"
    }

    fn aws_type_name(&self) -> &'static str {
        "AWS::SystemsManagerSAP::Application"
    }

    fn schema(&self) -> ResourceSchema {
        let credential = BlockSchema::new()
            .attribute(
                AttributeSchema::new("credential_type", types::enum_of(CREDENTIAL_TYPES))
                    .required(),
            )
            .attribute(
                AttributeSchema::new("database_name", AttributeType::String)
                    .required()
                    .validator(Validator::StringLenBetween(1, 100)),
            )
            .attribute(
                AttributeSchema::new("secret_id", AttributeType::String)
                    .required()
                    .validator(Validator::StringLenBetween(1, 100)),
            );
        let component = BlockSchema::new()
            .attribute(
                AttributeSchema::new("component_type", types::enum_of(COMPONENT_TYPES))
                    .required(),
            )
            .attribute(
                AttributeSchema::new("ec2_instance_id", AttributeType::String)
                    .required()
                    .validator(Validator::matches(
                        r"^i-[\w\d]{8}$|^i-[\w\d]{17}$",
                        "must be an EC2 instance ID",
                    )),
            )
            .attribute(
                AttributeSchema::new("sid", AttributeType::String)
                    .required()
                    .validator(sid_validator()),
            );

        ResourceSchema::new("ssmsap_application")
            .with_description("SAP application registered with Systems Manager for SAP.")
            .attribute(
                AttributeSchema::new("application_id", AttributeType::String)
                    .required()
                    .force_new()
                    .validator(Validator::matches(
                        r"^[\w\d\.-]{1,60}$",
                        "must be 1-60 letters, digits, periods or hyphens",
                    )),
            )
            .attribute(
                AttributeSchema::new("application_type", types::enum_of(APPLICATION_TYPES))
                    .required()
                    .force_new(),
            )
            .attribute(AttributeSchema::new("arn", AttributeType::String).computed())
            .attribute(
                AttributeSchema::new("components_info", types::block_list(component))
                    .force_new()
                    .write_only()
                    .with_min_items(1),
            )
            .attribute(
                AttributeSchema::new("credentials", types::block_list(credential))
                    .write_only()
                    .sensitive()
                    .with_min_items(1),
            )
            .attribute(
                AttributeSchema::new("database_arn", types::arn())
                    .with_description("ARN of the SAP HANA database."),
            )
            .attribute(
                AttributeSchema::new("instances", types::string_set())
                    .with_min_items(1)
                    .validator(Validator::matches(
                        r"^i-[\w\d]{8}$|^i-[\w\d]{17}$",
                        "must be an EC2 instance ID",
                    )),
            )
            .attribute(
                AttributeSchema::new("sap_instance_number", AttributeType::String)
                    .validator(Validator::matches(r"^[0-9]{2}$", "must be two digits")),
            )
            .attribute(AttributeSchema::new("sid", AttributeType::String).validator(sid_validator()))
            .attribute(AttributeSchema::new("tags", types::tags()))
    }

    fn normalize(&self, doc: Json) -> ProviderResult<Json> {
        flex::through_model::<ApplicationProperties>(doc)
    }
}

fn sid_validator() -> Validator {
    Validator::matches(r"^[A-Z][A-Z0-9]{2}$", "must be a three character SAP system ID")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ApplicationProperties {
    pub application_id: String,
    pub application_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arn: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components_info: Vec<ComponentInfo>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub credentials: Vec<Credential>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_arn: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub instances: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sap_instance_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Credential {
    pub credential_type: String,
    pub database_name: String,
    pub secret_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ComponentInfo {
    pub component_type: String,
    pub ec2_instance_id: String,
    pub sid: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::Operation;
    use serde_json::json;
    use std::collections::HashMap;
    use stratus_core::resource::Value;

    fn s(v: &str) -> Value {
        Value::String(v.to_string())
    }

    fn hana() -> HashMap<String, Value> {
        HashMap::from([
            ("application_id".to_string(), s("erp-prod")),
            ("application_type".to_string(), s("HANA")),
            ("sid".to_string(), s("HDB")),
            ("sap_instance_number".to_string(), s("00")),
            (
                "instances".to_string(),
                Value::List(vec![s("i-0123456789abcdef0")]),
            ),
            (
                "credentials".to_string(),
                Value::List(vec![Value::Map(HashMap::from([
                    ("credential_type".to_string(), s("ADMIN")),
                    ("database_name".to_string(), s("SYSTEMDB")),
                    ("secret_id".to_string(), s("hana-admin")),
                ]))]),
            ),
            (
                "tags".to_string(),
                Value::Map(HashMap::from([("env".to_string(), s("prod"))])),
            ),
        ])
    }

    #[test]
    fn expands_credentials_and_tags() {
        let def = ApplicationDefinition;
        assert!(def.schema().validate(&hana()).is_ok());

        let mut doc = flex::expand(&def.schema().block, &hana()).unwrap();
        flex::tags_to_key_value_list(&mut doc);
        let doc = def.normalize(Json::Object(doc)).unwrap();
        assert_eq!(
            doc["Credentials"],
            json!([{ "CredentialType": "ADMIN", "DatabaseName": "SYSTEMDB", "SecretId": "hana-admin" }])
        );
        assert_eq!(doc["Tags"], json!([{ "Key": "env", "Value": "prod" }]));
        assert_eq!(doc["Instances"], json!(["i-0123456789abcdef0"]));
    }

    #[test]
    fn rejects_malformed_identifiers() {
        let mut attrs = hana();
        attrs.insert("application_id".to_string(), s("erp prod"));
        attrs.insert("sid".to_string(), s("hdb"));
        attrs.insert("instances".to_string(), Value::List(vec![s("vm-1")]));
        let errors = ApplicationDefinition.schema().validate(&attrs).unwrap_err();
        let paths: Vec<&str> = errors.iter().filter_map(|e| e.path()).collect();
        assert_eq!(paths, vec!["application_id", "instances[0]", "sid"]);
    }

    #[test]
    fn secrets_are_write_only() {
        let schema = ApplicationDefinition.schema();
        let credentials = schema.get("credentials").unwrap();
        assert!(credentials.write_only && credentials.sensitive);
        assert!(schema.get("components_info").unwrap().force_new);
        assert!(ApplicationDefinition.status_waiter(Operation::Delete).is_none());
    }
}
