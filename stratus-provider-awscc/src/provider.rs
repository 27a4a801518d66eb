//! AWS Cloud Control Provider implementation
//!
//! Every resource type goes through the same lifecycle: validate the desired
//! attributes, expand them through the type's model, call Cloud Control,
//! wait for the request and then for the resource status, and read the
//! result back into state.

use std::collections::HashMap;
use std::time::Duration;

use aws_config::{BehaviorVersion, Region};
use stratus_core::provider::{ProviderError, ProviderResult};
use stratus_core::resource::{Resource, ResourceId, State, Value};
use stratus_core::schema::ResourceSchema;
use stratus_core::waiter::{StateChangeConf, Timeouts, WaitError};

use crate::client::{
    CloudControlApi, HANDLER_ERROR_NOT_FOUND, OperationStatus, ProgressEvent, SdkCloudControl,
};
use crate::config::ProviderConfig;
use crate::flex::{self, TagFormat};
use crate::resources::{self, Operation, ResourceDefinition, STATUS_PRESENT};

type Json = serde_json::Value;

const REQUEST_PENDING: &[&str] = &[
    OperationStatus::Pending.as_str(),
    OperationStatus::InProgress.as_str(),
    OperationStatus::CancelInProgress.as_str(),
];
const REQUEST_TARGET: &[&str] = &[OperationStatus::Success.as_str()];

/// AWS Cloud Control Provider
pub struct AwsccProvider<C: CloudControlApi = SdkCloudControl> {
    client: C,
    config: ProviderConfig,
    region: String,
}

impl AwsccProvider<SdkCloudControl> {
    /// Create a provider talking to the real Cloud Control API
    pub async fn new(config: ProviderConfig) -> Self {
        let region = config.region();
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.clone()))
            .load()
            .await;

        Self {
            client: SdkCloudControl::new(&sdk_config),
            config,
            region,
        }
    }
}

impl<C: CloudControlApi> AwsccProvider<C> {
    pub fn with_client(client: C, config: ProviderConfig) -> Self {
        let region = config.region();
        Self {
            client,
            config,
            region,
        }
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    fn definition(&self, id: &ResourceId) -> ProviderResult<&'static dyn ResourceDefinition> {
        resources::definition(&id.resource_type).ok_or_else(|| {
            ProviderError::validation(format!("Unknown resource type: {}", id.resource_type))
                .for_resource(id.clone())
        })
    }

    fn timeouts(&self, def: &dyn ResourceDefinition) -> Timeouts {
        self.config
            .timeouts_for(def.resource_type(), def.default_timeouts())
    }

    fn state_change(&self, pending: &[&str], target: &[&str], timeout: Duration) -> StateChangeConf {
        let conf = StateChangeConf::new(pending, target, timeout)
            .with_delay(self.config.poll_delay())
            .with_min_timeout(self.config.min_timeout());
        match self.config.poll_interval() {
            Some(interval) => conf.with_poll_interval(interval),
            None => conf,
        }
    }

    // =========================================================================
    // Waiters
    // =========================================================================

    /// Wait for a Cloud Control request to finish and return its final event
    async fn wait_for_request(
        &self,
        event: ProgressEvent,
        timeout: Duration,
    ) -> ProviderResult<ProgressEvent> {
        let Some(token) = event.request_token.clone() else {
            return match event.operation_status {
                Some(OperationStatus::Success) => Ok(event),
                Some(OperationStatus::Failed) => Err(request_failed(&event)),
                _ => Err(ProviderError::api(format!(
                    "Request in state {} has no request token",
                    event.status()
                ))),
            };
        };

        log::debug!("waiting for request {}", token);
        let client = &self.client;
        let token = token.as_str();
        let finished = self
            .state_change(REQUEST_PENDING, REQUEST_TARGET, timeout)
            .wait_for_state(move || async move {
                let event = client.get_resource_request_status(token).await?;
                if event.operation_status == Some(OperationStatus::Failed) {
                    return Err(request_failed(&event));
                }
                let status = event.status().to_string();
                Ok::<_, ProviderError>(Some((event, status)))
            })
            .await?;

        finished.ok_or_else(|| ProviderError::api(format!("Request {} vanished", token)))
    }

    /// Wait for the resource's status property to settle after `operation`
    async fn wait_for_status(
        &self,
        def: &'static dyn ResourceDefinition,
        identifier: &str,
        operation: Operation,
        timeout: Duration,
    ) -> ProviderResult<()> {
        let Some(waiter) = def.status_waiter(operation) else {
            return Ok(());
        };

        let client = &self.client;
        let type_name = def.aws_type_name();
        let result = self
            .state_change(waiter.pending, waiter.target, timeout)
            .wait_for_state(move || async move {
                let props = client.get_resource(type_name, identifier).await?;
                Ok::<_, ProviderError>(props.map(|props| {
                    let status = def
                        .status(&props)
                        .unwrap_or_else(|| STATUS_PRESENT.to_string());
                    (props, status)
                }))
            })
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(err @ WaitError::UnexpectedState { .. }) => {
                let mut error = ProviderError::from(err);
                let reason = self
                    .client
                    .get_resource(type_name, identifier)
                    .await
                    .ok()
                    .flatten()
                    .and_then(|props| def.status_reason(&props));
                if let Some(reason) = reason {
                    error.message = format!("{}: {}", error.message, reason);
                }
                Err(error)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Wait until reads no longer find the resource
    async fn wait_for_deletion(
        &self,
        def: &'static dyn ResourceDefinition,
        identifier: &str,
        timeout: Duration,
    ) -> ProviderResult<()> {
        let mut pending = vec![STATUS_PRESENT];
        if let Some(waiter) = def.status_waiter(Operation::Delete) {
            pending.extend_from_slice(waiter.pending);
        }

        let client = &self.client;
        let type_name = def.aws_type_name();
        self.state_change(&pending, &[], timeout)
            .wait_for_state(move || async move {
                let props = client.get_resource(type_name, identifier).await?;
                Ok::<_, ProviderError>(props.map(|props| {
                    let status = def
                        .status(&props)
                        .unwrap_or_else(|| STATUS_PRESENT.to_string());
                    ((), status)
                }))
            })
            .await?;
        Ok(())
    }

    // =========================================================================
    // Expand / Flatten
    // =========================================================================

    fn validate(
        &self,
        id: &ResourceId,
        schema: &ResourceSchema,
        attributes: &HashMap<String, Value>,
    ) -> ProviderResult<()> {
        schema.validate(attributes).map_err(|errors| {
            let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            ProviderError::validation(messages.join("; ")).for_resource(id.clone())
        })
    }

    /// Attributes to cloud property document, through the type's model
    fn expand(
        &self,
        def: &dyn ResourceDefinition,
        schema: &ResourceSchema,
        attributes: &HashMap<String, Value>,
    ) -> ProviderResult<Json> {
        let mut doc = flex::expand(&schema.block, attributes)?;
        if def.tag_format() == Some(TagFormat::KeyValueList) {
            flex::tags_to_key_value_list(&mut doc);
        }
        def.normalize(Json::Object(doc))
    }

    /// Cloud property document to attributes
    fn flatten(
        &self,
        def: &dyn ResourceDefinition,
        schema: &ResourceSchema,
        props: Json,
    ) -> HashMap<String, Value> {
        let props = match def.normalize(props.clone()) {
            Ok(normalized) => normalized,
            Err(e) => {
                log::warn!(
                    "{} properties do not match the resource model: {}",
                    def.aws_type_name(),
                    e
                );
                props
            }
        };
        let Json::Object(mut doc) = props else {
            return HashMap::new();
        };
        if def.tag_format() == Some(TagFormat::KeyValueList) {
            flex::key_value_list_to_tags(&mut doc);
        }
        let mut attributes = flex::flatten(&schema.block, &doc);
        def.post_read(&mut attributes);
        attributes
    }

    /// Carry write-only values over from the desired attributes
    fn with_write_only(
        schema: &ResourceSchema,
        mut state: State,
        desired: &HashMap<String, Value>,
    ) -> State {
        for (name, attr) in schema.attributes() {
            if attr.write_only
                && !state.attributes.contains_key(name)
                && let Some(value) = desired.get(name)
            {
                state.attributes.insert(name.clone(), value.clone());
            }
        }
        state
    }

    /// Re-read after a mutation; the resource must exist
    async fn read_back(&self, id: &ResourceId, identifier: &str) -> ProviderResult<State> {
        let state = self.read_resource(id, Some(identifier)).await?;
        if !state.exists {
            return Err(ProviderError::not_found(format!(
                "Resource {} disappeared while being applied",
                identifier
            ))
            .for_resource(id.clone()));
        }
        Ok(state)
    }

    // =========================================================================
    // Resource Operations
    // =========================================================================

    /// Read a resource by its cloud identifier
    pub async fn read_resource(
        &self,
        id: &ResourceId,
        identifier: Option<&str>,
    ) -> ProviderResult<State> {
        let def = self.definition(id)?;
        let Some(identifier) = identifier else {
            return Ok(State::not_found(id.clone()));
        };

        let props = self
            .client
            .get_resource(def.aws_type_name(), identifier)
            .await
            .map_err(|e| e.for_resource(id.clone()))?;
        let Some(props) = props else {
            log::debug!("{} {} not found", def.aws_type_name(), identifier);
            return Ok(State::not_found(id.clone()));
        };

        let schema = def.schema();
        let attributes = self.flatten(def, &schema, props);
        Ok(State::existing(id.clone(), attributes).with_identifier(identifier))
    }

    /// Create a resource and wait for it to become ready
    pub async fn create_resource(&self, resource: &Resource) -> ProviderResult<State> {
        let id = &resource.id;
        let def = self.definition(id)?;
        let schema = def.schema();
        let timeouts = self.timeouts(def);

        let mut attributes = resource.user_attributes();
        self.validate(id, &schema, &attributes)?;
        def.prepare_create(&mut attributes);
        let desired = self
            .expand(def, &schema, &attributes)
            .map_err(|e| e.for_resource(id.clone()))?;

        log::info!("creating {} ({})", id, def.aws_type_name());
        let event = self
            .client
            .create_resource(def.aws_type_name(), &desired)
            .await
            .map_err(|e| e.for_resource(id.clone()))?;
        let event = self
            .wait_for_request(event, timeouts.create)
            .await
            .map_err(|e| e.for_resource(id.clone()))?;
        let identifier = event.identifier.ok_or_else(|| {
            ProviderError::api("Create request returned no identifier").for_resource(id.clone())
        })?;

        self.wait_for_status(def, &identifier, Operation::Create, timeouts.create)
            .await
            .map_err(|e| e.for_resource(id.clone()))?;

        let state = self.read_back(id, &identifier).await?;
        log::info!("created {} ({})", id, identifier);
        Ok(Self::with_write_only(&schema, state, &attributes))
    }

    /// Update a resource in place with a JSON Patch
    pub async fn update_resource(
        &self,
        id: &ResourceId,
        identifier: &str,
        from: &State,
        to: &Resource,
    ) -> ProviderResult<State> {
        let def = self.definition(id)?;
        let schema = def.schema();
        let timeouts = self.timeouts(def);

        let attributes = to.user_attributes();
        self.validate(id, &schema, &attributes)?;
        // Reads never return write-only values; an unknown one counts as unchanged
        let from = Self::with_write_only(&schema, from.clone(), &attributes);
        let previous = self
            .expand(def, &schema, &from.attributes)
            .map_err(|e| e.for_resource(id.clone()))?;
        let desired = self
            .expand(def, &schema, &attributes)
            .map_err(|e| e.for_resource(id.clone()))?;

        let (Json::Object(prev_doc), Json::Object(desired_doc)) = (&previous, &desired) else {
            return Err(ProviderError::new("Resource model is not an object").for_resource(id.clone()));
        };
        let mut ops = flex::patch_document(&schema.block, prev_doc, desired_doc);
        def.adjust_patch(&previous, &desired, &mut ops);

        if ops.is_empty() {
            log::info!("{} is up to date", id);
        } else {
            log::info!("updating {} ({} patch operations)", id, ops.len());
            log::debug!("patch for {}: {}", id, Json::Array(ops.clone()));
            let event = self
                .client
                .update_resource(def.aws_type_name(), identifier, &ops)
                .await
                .map_err(|e| e.for_resource(id.clone()))?;
            self.wait_for_request(event, timeouts.update)
                .await
                .map_err(|e| e.for_resource(id.clone()))?;
            self.wait_for_status(def, identifier, Operation::Update, timeouts.update)
                .await
                .map_err(|e| e.for_resource(id.clone()))?;
        }

        let state = self.read_back(id, identifier).await?;
        log::info!("updated {}", id);
        Ok(Self::with_write_only(&schema, state, &attributes))
    }

    /// Delete a resource and wait until it is gone
    pub async fn delete_resource(&self, id: &ResourceId, identifier: &str) -> ProviderResult<()> {
        let def = self.definition(id)?;
        let timeouts = self.timeouts(def);

        log::info!("deleting {} ({})", id, identifier);
        let event = match self
            .client
            .delete_resource(def.aws_type_name(), identifier)
            .await
        {
            Ok(event) => event,
            Err(e) if e.is_not_found() => {
                log::info!("{} already deleted", id);
                return Ok(());
            }
            Err(e) => return Err(e.for_resource(id.clone())),
        };

        match self.wait_for_request(event, timeouts.delete).await {
            Ok(_) => {}
            Err(e) if e.is_not_found() => {
                log::info!("{} already deleted", id);
                return Ok(());
            }
            Err(e) => return Err(e.for_resource(id.clone())),
        }

        self.wait_for_deletion(def, identifier, timeouts.delete)
            .await
            .map_err(|e| e.for_resource(id.clone()))?;
        log::info!("deleted {}", id);
        Ok(())
    }
}

/// Error for a request that ended in `FAILED`
fn request_failed(event: &ProgressEvent) -> ProviderError {
    let message = event.status_message.as_deref().unwrap_or("Unknown error");
    match event.error_code.as_deref() {
        Some(HANDLER_ERROR_NOT_FOUND) => ProviderError::not_found(message.to_string()),
        Some(code) => ProviderError::api(format!("Operation failed ({}): {}", code, message)),
        None => ProviderError::api(format!("Operation failed: {}", message)),
    }
}
