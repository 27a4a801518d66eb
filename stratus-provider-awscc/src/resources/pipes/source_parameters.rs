//! Source parameters of a pipe
//!
//! Holds a filter and at most one event-source specific block. Credentials
//! for broker and Kafka sources are one-of variants, modelled as enums.

use serde::{Deserialize, Serialize};
use stratus_core::schema::{AttributeSchema, AttributeType, BlockSchema, Validator, types};

const SECRETS_MANAGER_ARN_PATTERN: &str = r"^(^arn:aws([a-z]|\-)*:secretsmanager:([a-z]{2}((-gov)|(-iso(b?)))?-[a-z]+-\d{1,2}):(\d{12}):secret:.+)$";
const TOPIC_NAME_PATTERN: &str = r"^[^.]([0-9A-Za-z_.-]+)$";
const BROKER_NAME_PATTERN: &str = r"^[0-9A-Za-z_\/*:+=.@-]*$";
const BOOTSTRAP_SERVER_PATTERN: &str = r"^(([0-9A-Za-z]|[0-9A-Za-z][0-9A-Za-z-]*[0-9A-Za-z])\.)*([0-9A-Za-z]|[0-9A-Za-z][0-9A-Za-z-]*[0-9A-Za-z]):[0-9]{1,5}$";

const SOURCE_BLOCKS: &[&str] = &[
    "activemq_broker_parameters",
    "dynamodb_stream_parameters",
    "kinesis_stream_parameters",
    "managed_streaming_kafka_parameters",
    "rabbitmq_broker_parameters",
    "self_managed_kafka_parameters",
    "sqs_queue_parameters",
];

const DYNAMODB_START_POSITIONS: &[&str] = &["TRIM_HORIZON", "LATEST"];
const KINESIS_START_POSITIONS: &[&str] = &["TRIM_HORIZON", "LATEST", "AT_TIMESTAMP"];
const KAFKA_START_POSITIONS: &[&str] = &["TRIM_HORIZON", "LATEST"];
const PARTIAL_BATCH_ITEM_FAILURES: &[&str] = &["AUTOMATIC_BISECT"];

// =============================================================================
// Schema
// =============================================================================

fn secret_arn(name: &str) -> AttributeSchema {
    AttributeSchema::new(name, AttributeType::String).validator(Validator::matches(
        SECRETS_MANAGER_ARN_PATTERN,
        "is not a Secrets Manager secret ARN",
    ))
}

fn batch_size() -> AttributeSchema {
    AttributeSchema::new("batch_size", AttributeType::Int)
        .optional_computed()
        .validator(Validator::IntBetween(1, 10000))
}

fn batching_window() -> AttributeSchema {
    AttributeSchema::new("maximum_batching_window_in_seconds", AttributeType::Int)
        .optional_computed()
        .validator(Validator::IntBetween(0, 300))
}

fn topic_name() -> AttributeSchema {
    AttributeSchema::new("topic_name", AttributeType::String)
        .required()
        .force_new()
        .validator(Validator::StringLenBetween(1, 249))
        .validator(Validator::matches(TOPIC_NAME_PATTERN, "is not a valid topic name"))
}

fn queue_name() -> AttributeSchema {
    AttributeSchema::new("queue_name", AttributeType::String)
        .required()
        .force_new()
        .validator(Validator::StringLenBetween(1, 1000))
}

fn basic_auth_credentials() -> AttributeSchema {
    AttributeSchema::new(
        "credentials",
        AttributeType::Block(BlockSchema::new().attribute(secret_arn("basic_auth").required())),
    )
    .required()
}

/// Stream settings shared by DynamoDB and Kinesis sources
fn stream_block(start_positions: &[&str]) -> BlockSchema {
    let dead_letter = BlockSchema::new()
        .attribute(AttributeSchema::new("arn", AttributeType::String).validator(Validator::Arn));
    BlockSchema::new()
        .attribute(batch_size())
        .attribute(AttributeSchema::new(
            "dead_letter_config",
            AttributeType::Block(dead_letter),
        ))
        .attribute(batching_window())
        .attribute(
            AttributeSchema::new("maximum_record_age_in_seconds", AttributeType::Int)
                .optional_computed()
                .validator(Validator::Any(vec![
                    Validator::IntOneOf(vec![-1]),
                    Validator::IntBetween(60, 604_800),
                ])),
        )
        .attribute(
            AttributeSchema::new("maximum_retry_attempts", AttributeType::Int)
                .validator(Validator::IntBetween(-1, 10_000)),
        )
        .attribute(AttributeSchema::new(
            "on_partial_batch_item_failure",
            types::enum_of(PARTIAL_BATCH_ITEM_FAILURES),
        ))
        .attribute(
            AttributeSchema::new("parallelization_factor", AttributeType::Int)
                .optional_computed()
                .validator(Validator::IntBetween(1, 10)),
        )
        .attribute(
            AttributeSchema::new("starting_position", types::enum_of(start_positions))
                .required()
                .force_new(),
        )
}

fn activemq_block() -> BlockSchema {
    BlockSchema::new()
        .attribute(batch_size())
        .attribute(basic_auth_credentials())
        .attribute(batching_window())
        .attribute(queue_name())
}

fn rabbitmq_block() -> BlockSchema {
    activemq_block().attribute(
        AttributeSchema::new("virtual_host", AttributeType::String)
            .force_new()
            .validator(Validator::StringLenBetween(1, 200))
            .validator(Validator::matches(BROKER_NAME_PATTERN, "is not a valid virtual host")),
    )
}

fn managed_kafka_block() -> BlockSchema {
    let credentials = BlockSchema::new()
        .attribute(secret_arn("client_certificate_tls_auth"))
        .attribute(secret_arn("sasl_scram_512_auth"))
        .exactly_one_of(&["client_certificate_tls_auth", "sasl_scram_512_auth"]);
    BlockSchema::new()
        .attribute(batch_size())
        .attribute(
            AttributeSchema::new("consumer_group_id", AttributeType::String)
                .with_provider_name("ConsumerGroupID")
                .force_new()
                .validator(Validator::StringLenBetween(1, 200))
                .validator(Validator::matches(TOPIC_NAME_PATTERN, "is not a valid consumer group")),
        )
        .attribute(AttributeSchema::new("credentials", AttributeType::Block(credentials)))
        .attribute(batching_window())
        .attribute(
            AttributeSchema::new("starting_position", types::enum_of(KAFKA_START_POSITIONS))
                .force_new(),
        )
        .attribute(topic_name())
}

fn self_managed_kafka_block() -> BlockSchema {
    let credentials = BlockSchema::new()
        .attribute(secret_arn("basic_auth"))
        .attribute(secret_arn("client_certificate_tls_auth"))
        .attribute(secret_arn("sasl_scram_256_auth"))
        .attribute(secret_arn("sasl_scram_512_auth"))
        .exactly_one_of(&[
            "basic_auth",
            "client_certificate_tls_auth",
            "sasl_scram_256_auth",
            "sasl_scram_512_auth",
        ]);
    let vpc = BlockSchema::new()
        .attribute(
            AttributeSchema::new("security_groups", types::string_set())
                .with_provider_name("SecurityGroup")
                .with_max_items(5)
                .validator(Validator::StringLenBetween(1, 1024))
                .validator(Validator::matches(r"^sg-[0-9A-Za-z]*$", "is not a security group ID")),
        )
        .attribute(
            AttributeSchema::new("subnets", types::string_set())
                .with_max_items(16)
                .validator(Validator::StringLenBetween(1, 1024))
                .validator(Validator::matches(r"^subnet-[0-9a-z]*$", "is not a subnet ID")),
        );
    BlockSchema::new()
        .attribute(
            AttributeSchema::new("additional_bootstrap_servers", types::string_set())
                .force_new()
                .with_max_items(2)
                .validator(Validator::StringLenBetween(1, 300))
                .validator(Validator::matches(
                    BOOTSTRAP_SERVER_PATTERN,
                    "is not a host:port bootstrap server",
                )),
        )
        .attribute(batch_size())
        .attribute(
            AttributeSchema::new("consumer_group_id", AttributeType::String)
                .with_provider_name("ConsumerGroupID")
                .force_new()
                .validator(Validator::StringLenBetween(1, 200))
                .validator(Validator::matches(BROKER_NAME_PATTERN, "is not a valid consumer group")),
        )
        .attribute(AttributeSchema::new("credentials", AttributeType::Block(credentials)))
        .attribute(batching_window())
        .attribute(
            AttributeSchema::new("server_root_ca_certificate", AttributeType::String)
                .validator(Validator::Arn),
        )
        .attribute(
            AttributeSchema::new("starting_position", types::enum_of(KAFKA_START_POSITIONS))
                .force_new(),
        )
        .attribute(topic_name())
        .attribute(AttributeSchema::new("vpc", AttributeType::Block(vpc)))
}

/// Schema of the `source_parameters` block
pub fn source_parameters_block() -> BlockSchema {
    let filter = BlockSchema::new().attribute(
        AttributeSchema::new("pattern", AttributeType::String)
            .required()
            .validator(Validator::StringLenBetween(1, 4096)),
    );
    let filter_criteria = BlockSchema::new().attribute(
        AttributeSchema::new("filter", types::block_list(filter))
            .with_provider_name("Filters")
            .with_max_items(5),
    );
    let sqs = BlockSchema::new()
        .attribute(batch_size())
        .attribute(batching_window());

    BlockSchema::new()
        .attribute(
            AttributeSchema::new("activemq_broker_parameters", AttributeType::Block(activemq_block()))
                .with_provider_name("ActiveMQBrokerParameters")
                .optional_computed(),
        )
        .attribute(
            AttributeSchema::new(
                "dynamodb_stream_parameters",
                AttributeType::Block(stream_block(DYNAMODB_START_POSITIONS)),
            )
            .with_provider_name("DynamoDBStreamParameters")
            .optional_computed(),
        )
        .attribute(AttributeSchema::new(
            "filter_criteria",
            AttributeType::Block(filter_criteria),
        ))
        .attribute(
            AttributeSchema::new(
                "kinesis_stream_parameters",
                AttributeType::Block(stream_block(KINESIS_START_POSITIONS).attribute(
                    AttributeSchema::new("starting_position_timestamp", AttributeType::String)
                        .force_new(),
                )),
            )
            .optional_computed(),
        )
        .attribute(
            AttributeSchema::new(
                "managed_streaming_kafka_parameters",
                AttributeType::Block(managed_kafka_block()),
            )
            .optional_computed(),
        )
        .attribute(
            AttributeSchema::new("rabbitmq_broker_parameters", AttributeType::Block(rabbitmq_block()))
                .with_provider_name("RabbitMQBrokerParameters")
                .optional_computed(),
        )
        .attribute(
            AttributeSchema::new(
                "self_managed_kafka_parameters",
                AttributeType::Block(self_managed_kafka_block()),
            )
            .optional_computed(),
        )
        .attribute(
            AttributeSchema::new("sqs_queue_parameters", AttributeType::Block(sqs))
                .optional_computed(),
        )
        .conflicting(SOURCE_BLOCKS)
}

// =============================================================================
// Typed model
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PipeSourceParameters {
    #[serde(rename = "ActiveMQBrokerParameters", skip_serializing_if = "Option::is_none")]
    pub activemq_broker_parameters: Option<MqBrokerParameters>,
    #[serde(rename = "DynamoDBStreamParameters", skip_serializing_if = "Option::is_none")]
    pub dynamodb_stream_parameters: Option<StreamParameters>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_criteria: Option<FilterCriteria>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kinesis_stream_parameters: Option<StreamParameters>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub managed_streaming_kafka_parameters: Option<ManagedStreamingKafkaParameters>,
    #[serde(rename = "RabbitMQBrokerParameters", skip_serializing_if = "Option::is_none")]
    pub rabbitmq_broker_parameters: Option<MqBrokerParameters>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub self_managed_kafka_parameters: Option<SelfManagedKafkaParameters>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sqs_queue_parameters: Option<SqsQueueParameters>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FilterCriteria {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<Filter>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Filter {
    pub pattern: String,
}

/// ActiveMQ and RabbitMQ broker source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MqBrokerParameters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<i64>,
    pub credentials: MqBrokerAccessCredentials,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum_batching_window_in_seconds: Option<i64>,
    pub queue_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub virtual_host: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MqBrokerAccessCredentials {
    BasicAuth(String),
}

/// DynamoDB and Kinesis stream source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StreamParameters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dead_letter_config: Option<DeadLetterConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum_batching_window_in_seconds: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum_record_age_in_seconds: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum_retry_attempts: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_partial_batch_item_failure: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parallelization_factor: Option<i64>,
    pub starting_position: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub starting_position_timestamp: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeadLetterConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arn: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ManagedStreamingKafkaParameters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<i64>,
    #[serde(rename = "ConsumerGroupID", skip_serializing_if = "Option::is_none")]
    pub consumer_group_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credentials: Option<MskAccessCredentials>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum_batching_window_in_seconds: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub starting_position: Option<String>,
    pub topic_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MskAccessCredentials {
    ClientCertificateTlsAuth(String),
    SaslScram512Auth(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SelfManagedKafkaParameters {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub additional_bootstrap_servers: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<i64>,
    #[serde(rename = "ConsumerGroupID", skip_serializing_if = "Option::is_none")]
    pub consumer_group_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credentials: Option<SelfManagedKafkaAccessCredentials>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum_batching_window_in_seconds: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_root_ca_certificate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub starting_position: Option<String>,
    pub topic_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vpc: Option<SelfManagedKafkaVpc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelfManagedKafkaAccessCredentials {
    BasicAuth(String),
    ClientCertificateTlsAuth(String),
    SaslScram256Auth(String),
    SaslScram512Auth(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SelfManagedKafkaVpc {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub security_group: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subnets: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SqsQueueParameters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum_batching_window_in_seconds: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use stratus_core::resource::Value;
    use stratus_core::schema::TypeError;

    fn s(v: &str) -> Value {
        Value::String(v.to_string())
    }

    fn map(entries: Vec<(&str, Value)>) -> Value {
        Value::Map(entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
    }

    const SECRET: &str = "arn:aws:secretsmanager:us-east-1:123456789012:secret:kafka";

    #[test]
    fn only_one_source_block() {
        let attrs: HashMap<String, Value> = HashMap::from([
            (
                "sqs_queue_parameters".to_string(),
                map(vec![("batch_size", Value::Int(10))]),
            ),
            (
                "managed_streaming_kafka_parameters".to_string(),
                map(vec![("topic_name", s("orders"))]),
            ),
        ]);
        let errors = source_parameters_block().validate(&attrs).unwrap_err();
        assert!(
            errors
                .iter()
                .any(|e| matches!(e, TypeError::ConflictingAttributes { .. }))
        );
    }

    #[test]
    fn validates_ranges_and_patterns() {
        let attrs: HashMap<String, Value> = HashMap::from([(
            "kinesis_stream_parameters".to_string(),
            map(vec![
                ("starting_position", s("AT_TIMESTAMP")),
                ("maximum_record_age_in_seconds", Value::Int(30)),
                ("parallelization_factor", Value::Int(11)),
            ]),
        )]);
        let errors = source_parameters_block().validate(&attrs).unwrap_err();
        let paths: Vec<&str> = errors.iter().filter_map(|e| e.path()).collect();
        assert!(paths.contains(&"kinesis_stream_parameters.maximum_record_age_in_seconds"));
        assert!(paths.contains(&"kinesis_stream_parameters.parallelization_factor"));

        let ok: HashMap<String, Value> = HashMap::from([(
            "kinesis_stream_parameters".to_string(),
            map(vec![
                ("starting_position", s("LATEST")),
                ("maximum_record_age_in_seconds", Value::Int(-1)),
            ]),
        )]);
        assert!(source_parameters_block().validate(&ok).is_ok());
    }

    #[test]
    fn kafka_credentials_need_exactly_one_secret() {
        let both: HashMap<String, Value> = HashMap::from([(
            "self_managed_kafka_parameters".to_string(),
            map(vec![
                ("topic_name", s("orders")),
                (
                    "credentials",
                    map(vec![("basic_auth", s(SECRET)), ("sasl_scram_256_auth", s(SECRET))]),
                ),
            ]),
        )]);
        assert!(source_parameters_block().validate(&both).is_err());

        let bad_secret: HashMap<String, Value> = HashMap::from([(
            "managed_streaming_kafka_parameters".to_string(),
            map(vec![
                ("topic_name", s("orders")),
                (
                    "credentials",
                    map(vec![(
                        "sasl_scram_512_auth",
                        s("arn:aws:kms:us-east-1:123456789012:key/1"),
                    )]),
                ),
            ]),
        )]);
        assert!(source_parameters_block().validate(&bad_secret).is_err());
    }

    #[test]
    fn credential_variants_serialize_as_single_key() {
        let params = PipeSourceParameters {
            managed_streaming_kafka_parameters: Some(ManagedStreamingKafkaParameters {
                batch_size: None,
                consumer_group_id: Some("consumers".to_string()),
                credentials: Some(MskAccessCredentials::SaslScram512Auth(SECRET.to_string())),
                maximum_batching_window_in_seconds: None,
                starting_position: None,
                topic_name: "orders".to_string(),
            }),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&params).unwrap(),
            serde_json::json!({
                "ManagedStreamingKafkaParameters": {
                    "ConsumerGroupID": "consumers",
                    "Credentials": { "SaslScram512Auth": SECRET },
                    "TopicName": "orders"
                }
            })
        );
    }

    #[test]
    fn rejects_two_credential_variants() {
        let doc = serde_json::json!({
            "RabbitMQBrokerParameters": {
                "QueueName": "orders",
                "Credentials": { "BasicAuth": SECRET, "Other": SECRET }
            }
        });
        assert!(serde_json::from_value::<PipeSourceParameters>(doc).is_err());
    }
}
