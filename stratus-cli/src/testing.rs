//! In-memory provider for command tests

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use stratus_core::provider::{BoxFuture, Provider, ProviderError, ProviderResult, ResourceType};
use stratus_core::resource::{Resource, ResourceId, State, Value};
use stratus_provider_awscc::resources::resource_types;

#[derive(Default)]
struct Inner {
    objects: HashMap<String, HashMap<String, Value>>,
    next_id: usize,
    calls: Vec<String>,
    failing_types: HashSet<String>,
}

/// Stores objects by identifier and serves the awscc resource types.
///
/// Clones share the same store, so a test can keep a handle after moving
/// one into an engine.
#[derive(Clone, Default)]
pub struct MemoryProvider {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every create of this type fail
    pub fn fail_creates_of(&self, resource_type: &str) {
        self.lock().failing_types.insert(resource_type.to_string());
    }

    /// Store an object as if created outside of stratus
    pub fn insert(&self, identifier: &str, attributes: HashMap<String, Value>) {
        self.lock().objects.insert(identifier.to_string(), attributes);
    }

    pub fn remove(&self, identifier: &str) {
        self.lock().objects.remove(identifier);
    }

    pub fn object(&self, identifier: &str) -> Option<HashMap<String, Value>> {
        self.lock().objects.get(identifier).cloned()
    }

    pub fn object_count(&self) -> usize {
        self.lock().objects.len()
    }

    /// Mutating calls in order, e.g. "create pipes_pipe.orders"
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap()
    }

    fn arn(resource_type: &str, identifier: &str) -> String {
        format!(
            "arn:aws:test:us-east-1:123456789012:{}/{}",
            resource_type, identifier
        )
    }
}

impl Provider for MemoryProvider {
    fn name(&self) -> &'static str {
        "memory"
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
        let identifier = identifier.map(str::to_string);
        Box::pin(async move {
            let attributes = identifier
                .as_ref()
                .and_then(|identifier| self.lock().objects.get(identifier).cloned());
            Ok(match (identifier, attributes) {
                (Some(identifier), Some(attributes)) => {
                    State::existing(id, attributes).with_identifier(identifier)
                }
                _ => State::not_found(id),
            })
        })
    }

    fn create(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
        let resource = resource.clone();
        Box::pin(async move {
            let mut inner = self.lock();
            inner.calls.push(format!("create {}", resource.id));
            if inner.failing_types.contains(&resource.id.resource_type) {
                return Err(ProviderError::api("simulated create failure")
                    .for_resource(resource.id.clone()));
            }

            inner.next_id += 1;
            let identifier = match resource.attributes.get("name").and_then(Value::as_str) {
                Some(name) => name.to_string(),
                None => format!("{}-{}", resource.id.name, inner.next_id),
            };
            let mut attributes = resource.user_attributes();
            attributes.insert(
                "arn".to_string(),
                Value::String(Self::arn(&resource.id.resource_type, &identifier)),
            );
            inner.objects.insert(identifier.clone(), attributes.clone());
            Ok(State::existing(resource.id.clone(), attributes).with_identifier(identifier))
        })
    }

    fn update(
        &self,
        id: &ResourceId,
        identifier: &str,
        _from: &State,
        to: &Resource,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        let id = id.clone();
        let identifier = identifier.to_string();
        let to = to.clone();
        Box::pin(async move {
            let mut inner = self.lock();
            inner.calls.push(format!("update {}", id));
            let Some(existing) = inner.objects.get_mut(&identifier) else {
                return Err(ProviderError::not_found(format!("{} not found", identifier))
                    .for_resource(id));
            };
            let arn = existing.get("arn").cloned();
            *existing = to.user_attributes();
            if let Some(arn) = arn {
                existing.insert("arn".to_string(), arn);
            }
            let attributes = existing.clone();
            Ok(State::existing(id, attributes).with_identifier(identifier))
        })
    }

    fn delete(&self, id: &ResourceId, identifier: &str) -> BoxFuture<'_, ProviderResult<()>> {
        let id = id.clone();
        let identifier = identifier.to_string();
        Box::pin(async move {
            let mut inner = self.lock();
            inner.calls.push(format!("delete {}", id));
            inner.objects.remove(&identifier);
            Ok(())
        })
    }
}
