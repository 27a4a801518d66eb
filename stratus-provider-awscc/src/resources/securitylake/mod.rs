//! Amazon Security Lake resources
//!
//! Security Lake resources have no status property; the Cloud Control
//! request settles once the service has finished provisioning.

mod aws_log_source;
mod data_lake;
mod subscriber;

pub use aws_log_source::AwsLogSourceDefinition;
pub use data_lake::DataLakeDefinition;
pub use subscriber::SubscriberDefinition;

/// Log sources Security Lake collects natively
pub const AWS_LOG_SOURCE_NAMES: &[&str] = &[
    "ROUTE53",
    "VPC_FLOW",
    "SH_FINDINGS",
    "CLOUD_TRAIL_MGMT",
    "LAMBDA_EXECUTION",
    "S3_DATA",
    "EKS_AUDIT",
    "WAF",
];
