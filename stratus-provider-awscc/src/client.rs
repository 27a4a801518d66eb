//! Cloud Control API client seam
//!
//! The provider talks to AWS through [`CloudControlApi`] so lifecycle logic
//! can run against an in-memory fake in tests. [`SdkCloudControl`] is the
//! real implementation on top of `aws-sdk-cloudcontrol`.

use async_trait::async_trait;
use aws_sdk_cloudcontrol::Client as CloudControlClient;
use aws_sdk_cloudcontrol::error::DisplayErrorContext;
use aws_sdk_cloudcontrol::types::ProgressEvent as SdkProgressEvent;
use stratus_core::provider::{ProviderError, ProviderResult};

/// Status of an asynchronous Cloud Control request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationStatus {
    Pending,
    InProgress,
    Success,
    Failed,
    CancelInProgress,
    CancelComplete,
}

impl OperationStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            OperationStatus::Pending => "PENDING",
            OperationStatus::InProgress => "IN_PROGRESS",
            OperationStatus::Success => "SUCCESS",
            OperationStatus::Failed => "FAILED",
            OperationStatus::CancelInProgress => "CANCEL_IN_PROGRESS",
            OperationStatus::CancelComplete => "CANCEL_COMPLETE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(OperationStatus::Pending),
            "IN_PROGRESS" => Some(OperationStatus::InProgress),
            "SUCCESS" => Some(OperationStatus::Success),
            "FAILED" => Some(OperationStatus::Failed),
            "CANCEL_IN_PROGRESS" => Some(OperationStatus::CancelInProgress),
            "CANCEL_COMPLETE" => Some(OperationStatus::CancelComplete),
            _ => None,
        }
    }
}

/// Handler error code reported for resources that do not exist
pub const HANDLER_ERROR_NOT_FOUND: &str = "NotFound";

/// Progress of a create, update or delete request
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressEvent {
    pub request_token: Option<String>,
    pub operation_status: Option<OperationStatus>,
    /// Primary identifier of the resource, once known
    pub identifier: Option<String>,
    pub status_message: Option<String>,
    pub error_code: Option<String>,
}

impl ProgressEvent {
    pub fn new(status: OperationStatus) -> Self {
        Self {
            request_token: None,
            operation_status: Some(status),
            identifier: None,
            status_message: None,
            error_code: None,
        }
    }

    pub fn with_request_token(mut self, token: impl Into<String>) -> Self {
        self.request_token = Some(token.into());
        self
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    pub fn with_error(mut self, code: impl Into<String>, message: impl Into<String>) -> Self {
        self.error_code = Some(code.into());
        self.status_message = Some(message.into());
        self
    }

    /// Status string used by waiters
    pub fn status(&self) -> &'static str {
        self.operation_status
            .map(|s| s.as_str())
            .unwrap_or("UNKNOWN")
    }
}

impl From<&SdkProgressEvent> for ProgressEvent {
    fn from(event: &SdkProgressEvent) -> Self {
        Self {
            request_token: event.request_token().map(str::to_string),
            operation_status: event
                .operation_status()
                .and_then(|s| OperationStatus::parse(s.as_str())),
            identifier: event.identifier().map(str::to_string),
            status_message: event.status_message().map(str::to_string),
            error_code: event.error_code().map(|c| c.as_str().to_string()),
        }
    }
}

/// Operations of the Cloud Control API used by the provider
#[async_trait]
pub trait CloudControlApi: Send + Sync {
    /// Current properties of a resource, `None` if it does not exist
    async fn get_resource(
        &self,
        type_name: &str,
        identifier: &str,
    ) -> ProviderResult<Option<serde_json::Value>>;

    async fn create_resource(
        &self,
        type_name: &str,
        desired_state: &serde_json::Value,
    ) -> ProviderResult<ProgressEvent>;

    /// Apply JSON Patch operations to a resource
    async fn update_resource(
        &self,
        type_name: &str,
        identifier: &str,
        patch: &[serde_json::Value],
    ) -> ProviderResult<ProgressEvent>;

    /// Returns a `NotFound` error if the resource does not exist
    async fn delete_resource(
        &self,
        type_name: &str,
        identifier: &str,
    ) -> ProviderResult<ProgressEvent>;

    async fn get_resource_request_status(
        &self,
        request_token: &str,
    ) -> ProviderResult<ProgressEvent>;
}

/// Cloud Control client backed by the AWS SDK
pub struct SdkCloudControl {
    client: CloudControlClient,
}

impl SdkCloudControl {
    pub fn new(config: &aws_config::SdkConfig) -> Self {
        Self {
            client: CloudControlClient::new(config),
        }
    }

    fn progress(
        event: Option<&SdkProgressEvent>,
        operation: &str,
    ) -> ProviderResult<ProgressEvent> {
        event.map(ProgressEvent::from).ok_or_else(|| {
            ProviderError::api(format!("No progress event returned by {}", operation))
        })
    }
}

#[async_trait]
impl CloudControlApi for SdkCloudControl {
    async fn get_resource(
        &self,
        type_name: &str,
        identifier: &str,
    ) -> ProviderResult<Option<serde_json::Value>> {
        let result = self
            .client
            .get_resource()
            .type_name(type_name)
            .identifier(identifier)
            .send()
            .await;

        match result {
            Ok(response) => {
                let Some(props_str) = response
                    .resource_description()
                    .and_then(|desc| desc.properties())
                else {
                    return Ok(None);
                };
                let props = serde_json::from_str(props_str).map_err(|e| {
                    ProviderError::api(format!("Invalid resource properties for {}", type_name))
                        .with_cause(e)
                })?;
                Ok(Some(props))
            }
            Err(e)
                if e.as_service_error()
                    .is_some_and(|se| se.is_resource_not_found_exception()) =>
            {
                Ok(None)
            }
            Err(e) => Err(ProviderError::api(format!(
                "Failed to get resource: {}",
                DisplayErrorContext(&e)
            ))),
        }
    }

    async fn create_resource(
        &self,
        type_name: &str,
        desired_state: &serde_json::Value,
    ) -> ProviderResult<ProgressEvent> {
        let result = self
            .client
            .create_resource()
            .type_name(type_name)
            .desired_state(desired_state.to_string())
            .send()
            .await
            .map_err(|e| {
                ProviderError::api(format!(
                    "Failed to create resource: {}",
                    DisplayErrorContext(&e)
                ))
            })?;

        Self::progress(result.progress_event(), "CreateResource")
    }

    async fn update_resource(
        &self,
        type_name: &str,
        identifier: &str,
        patch: &[serde_json::Value],
    ) -> ProviderResult<ProgressEvent> {
        let patch_document = serde_json::to_string(patch).map_err(|e| {
            ProviderError::new("Failed to build patch document").with_cause(e)
        })?;

        let result = self
            .client
            .update_resource()
            .type_name(type_name)
            .identifier(identifier)
            .patch_document(patch_document)
            .send()
            .await;

        match result {
            Ok(output) => Self::progress(output.progress_event(), "UpdateResource"),
            Err(e)
                if e.as_service_error()
                    .is_some_and(|se| se.is_resource_not_found_exception()) =>
            {
                Err(ProviderError::not_found(format!(
                    "Resource {} not found",
                    identifier
                )))
            }
            Err(e) => Err(ProviderError::api(format!(
                "Failed to update resource: {}",
                DisplayErrorContext(&e)
            ))),
        }
    }

    async fn delete_resource(
        &self,
        type_name: &str,
        identifier: &str,
    ) -> ProviderResult<ProgressEvent> {
        let result = self
            .client
            .delete_resource()
            .type_name(type_name)
            .identifier(identifier)
            .send()
            .await;

        match result {
            Ok(output) => Self::progress(output.progress_event(), "DeleteResource"),
            Err(e)
                if e.as_service_error()
                    .is_some_and(|se| se.is_resource_not_found_exception()) =>
            {
                Err(ProviderError::not_found(format!(
                    "Resource {} not found",
                    identifier
                )))
            }
            Err(e) => Err(ProviderError::api(format!(
                "Failed to delete resource: {}",
                DisplayErrorContext(&e)
            ))),
        }
    }

    async fn get_resource_request_status(
        &self,
        request_token: &str,
    ) -> ProviderResult<ProgressEvent> {
        let status = self
            .client
            .get_resource_request_status()
            .request_token(request_token)
            .send()
            .await
            .map_err(|e| {
                ProviderError::api(format!(
                    "Failed to get operation status: {}",
                    DisplayErrorContext(&e)
                ))
            })?;

        Self::progress(status.progress_event(), "GetResourceRequestStatus")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_status_round_trips_wire_names() {
        for status in [
            OperationStatus::Pending,
            OperationStatus::InProgress,
            OperationStatus::Success,
            OperationStatus::Failed,
            OperationStatus::CancelInProgress,
            OperationStatus::CancelComplete,
        ] {
            assert_eq!(OperationStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(OperationStatus::parse("DONE"), None);
    }

    #[test]
    fn unknown_status_string() {
        let event = ProgressEvent {
            operation_status: None,
            ..ProgressEvent::new(OperationStatus::Pending)
        };
        assert_eq!(event.status(), "UNKNOWN");
    }

    #[test]
    fn converts_sdk_progress_event() {
        let sdk = SdkProgressEvent::builder()
            .request_token("token-1")
            .operation_status(aws_sdk_cloudcontrol::types::OperationStatus::Failed)
            .identifier("orders")
            .status_message("Pipe already exists")
            .error_code(aws_sdk_cloudcontrol::types::HandlerErrorCode::AlreadyExists)
            .build();

        let event = ProgressEvent::from(&sdk);
        assert_eq!(event.request_token.as_deref(), Some("token-1"));
        assert_eq!(event.operation_status, Some(OperationStatus::Failed));
        assert_eq!(event.error_code.as_deref(), Some("AlreadyExists"));
    }
}
