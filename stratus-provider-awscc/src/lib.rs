//! Stratus AWS Cloud Control Provider
//!
//! Manages EventBridge Pipes, Security Lake and Systems Manager for SAP
//! resources through the AWS Cloud Control API.
//!
//! ## Module Structure
//!
//! - `client` - Cloud Control API seam and its AWS SDK implementation
//! - `config` - Provider configuration
//! - `flex` - Schema-driven expand/flatten between attributes and properties
//! - `provider` - AwsccProvider implementation
//! - `resources` - Resource type definitions
//! - `utils` - Naming helpers

pub mod client;
pub mod config;
pub mod flex;
pub mod provider;
pub mod resources;
pub mod utils;

#[cfg(test)]
mod testing;

// Re-export main types
pub use client::{CloudControlApi, SdkCloudControl};
pub use config::ProviderConfig;
pub use provider::AwsccProvider;

use stratus_core::provider::{BoxFuture, Provider, ProviderResult, ResourceType};
use stratus_core::resource::{Resource, ResourceId, State};

use resources::resource_types;

// =============================================================================
// Provider Trait Implementation
// =============================================================================

impl<C: CloudControlApi> Provider for AwsccProvider<C> {
    fn name(&self) -> &'static str {
        "awscc"
    }

    fn resource_types(&self) -> Vec<Box<dyn ResourceType>> {
        resource_types()
    }

    fn read(
        &self,
        id: &ResourceId,
        identifier: Option<&str>,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        let id = id.clone();
        let identifier = identifier.map(|s| s.to_string());
        Box::pin(async move { self.read_resource(&id, identifier.as_deref()).await })
    }

    fn create(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
        let resource = resource.clone();
        Box::pin(async move { self.create_resource(&resource).await })
    }

    fn update(
        &self,
        id: &ResourceId,
        identifier: &str,
        from: &State,
        to: &Resource,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        let id = id.clone();
        let identifier = identifier.to_string();
        let from = from.clone();
        let to = to.clone();
        Box::pin(async move { self.update_resource(&id, &identifier, &from, &to).await })
    }

    fn delete(&self, id: &ResourceId, identifier: &str) -> BoxFuture<'_, ProviderResult<()>> {
        let id = id.clone();
        let identifier = identifier.to_string();
        Box::pin(async move { self.delete_resource(&id, &identifier).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeCloudControl;
    use stratus_core::resource::Value;

    #[tokio::test(start_paused = true)]
    async fn import_reads_existing_resource() {
        let fake = FakeCloudControl::new();
        fake.insert(
            "AWS::SecurityLake::AwsLogSource",
            "arn:aws:securitylake:us-east-1:123456789012:data-lake/default|VPC_FLOW|2.0",
            serde_json::json!({
                "DataLakeArn": "arn:aws:securitylake:us-east-1:123456789012:data-lake/default",
                "SourceName": "VPC_FLOW",
                "SourceVersion": "2.0",
                "Accounts": ["123456789012"]
            }),
        );
        let provider = AwsccProvider::with_client(fake, ProviderConfig::default());
        let id = ResourceId::new("securitylake_aws_log_source", "flow_logs");

        let state = provider
            .import(
                &id,
                "arn:aws:securitylake:us-east-1:123456789012:data-lake/default|VPC_FLOW|2.0",
            )
            .await
            .unwrap();
        assert!(state.exists);
        assert_eq!(state.attributes.get("source_name"), Some(&Value::String("VPC_FLOW".into())));
        assert_eq!(
            state.attributes.get("accounts"),
            Some(&Value::List(vec![Value::String("123456789012".into())]))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn import_of_missing_resource_fails() {
        let provider = AwsccProvider::with_client(FakeCloudControl::new(), ProviderConfig::default());
        let id = ResourceId::new("securitylake_subscriber", "analytics");
        let err = provider
            .import(&id, "arn:aws:securitylake:us-east-1:123456789012:subscriber/missing")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn exposes_every_resource_type() {
        let provider = AwsccProvider::with_client(FakeCloudControl::new(), ProviderConfig::default());
        assert_eq!(provider.name(), "awscc");
        assert_eq!(provider.resource_types().len(), 5);
    }
}
