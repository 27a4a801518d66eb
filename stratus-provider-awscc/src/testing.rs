//! In-memory Cloud Control used by lifecycle tests

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::json;
use stratus_core::provider::{ProviderError, ProviderResult};

use crate::client::{CloudControlApi, OperationStatus, ProgressEvent};

type Json = serde_json::Value;

const FAKE_ACCOUNT: &str = "123456789012";

#[derive(Default)]
struct Inner {
    /// Resources keyed by (type name, identifier)
    resources: HashMap<(String, String), Json>,
    /// Remaining request status events per request token
    requests: HashMap<String, VecDeque<ProgressEvent>>,
    /// `CurrentState` values served by successive reads, per identifier
    status_scripts: HashMap<String, VecDeque<String>>,
    /// Reads that still return a deleted resource, per identifier
    lingering: HashMap<String, usize>,
    deleted: HashMap<(String, String), Json>,
    /// Extra properties merged into reads, per identifier
    overlays: HashMap<String, serde_json::Map<String, Json>>,
    created: Vec<Json>,
    patches: Vec<Vec<Json>>,
}

/// Fake [`CloudControlApi`] that keeps resources in memory.
///
/// Requests report `IN_PROGRESS` for `pending_polls` status checks before
/// succeeding. Resources without a `Name` property get a generated `Arn`
/// as their identifier, and a `DesiredState` becomes the `CurrentState`.
pub struct FakeCloudControl {
    inner: Mutex<Inner>,
    pending_polls: usize,
    write_only: Vec<String>,
    linger_after_delete: usize,
    next_token: AtomicUsize,
    next_outcome: Mutex<Option<ProgressEvent>>,
    pub get_calls: AtomicUsize,
}

impl FakeCloudControl {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            pending_polls: 1,
            write_only: Vec::new(),
            linger_after_delete: 0,
            next_token: AtomicUsize::new(1),
            next_outcome: Mutex::new(None),
            get_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_pending_polls(mut self, polls: usize) -> Self {
        self.pending_polls = polls;
        self
    }

    /// Properties accepted on create but never stored
    pub fn with_write_only(mut self, properties: &[&str]) -> Self {
        self.write_only = properties.iter().map(|p| p.to_string()).collect();
        self
    }

    pub fn with_linger_after_delete(mut self, reads: usize) -> Self {
        self.linger_after_delete = reads;
        self
    }

    /// Make the next mutating request end in `FAILED` with the given handler error
    pub fn fail_next_request(&self, code: &str, message: &str) {
        *self.next_outcome.lock().unwrap() =
            Some(ProgressEvent::new(OperationStatus::Failed).with_error(code, message));
    }

    /// Make the next mutating request end in `CANCEL_COMPLETE`
    pub fn cancel_next_request(&self) {
        *self.next_outcome.lock().unwrap() =
            Some(ProgressEvent::new(OperationStatus::CancelComplete));
    }

    /// Serve these `CurrentState` values on successive reads of `identifier`.
    /// The last value sticks.
    pub fn script_status(&self, identifier: &str, states: &[&str]) {
        self.inner.lock().unwrap().status_scripts.insert(
            identifier.to_string(),
            states.iter().map(|s| s.to_string()).collect(),
        );
    }

    /// Merge `value` into every read of `identifier`
    pub fn overlay(&self, identifier: &str, property: &str, value: Json) {
        self.inner
            .lock()
            .unwrap()
            .overlays
            .entry(identifier.to_string())
            .or_default()
            .insert(property.to_string(), value);
    }

    pub fn insert(&self, type_name: &str, identifier: &str, props: Json) {
        self.inner
            .lock()
            .unwrap()
            .resources
            .insert((type_name.to_string(), identifier.to_string()), props);
    }

    pub fn resource(&self, type_name: &str, identifier: &str) -> Option<Json> {
        self.inner
            .lock()
            .unwrap()
            .resources
            .get(&(type_name.to_string(), identifier.to_string()))
            .cloned()
    }

    /// Desired state documents passed to create, in call order
    pub fn created(&self) -> Vec<Json> {
        self.inner.lock().unwrap().created.clone()
    }

    /// Patch documents passed to update, in call order
    pub fn patches(&self) -> Vec<Vec<Json>> {
        self.inner.lock().unwrap().patches.clone()
    }

    /// Queue the status events for a new request and return its first event
    fn start_request(&self, inner: &mut Inner, identifier: &str) -> ProgressEvent {
        let token = format!(
            "token-{}",
            self.next_token.fetch_add(1, Ordering::SeqCst)
        );
        let mut events: VecDeque<ProgressEvent> = (0..self.pending_polls)
            .map(|_| ProgressEvent::new(OperationStatus::InProgress).with_identifier(identifier))
            .collect();
        let last = self
            .next_outcome
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(|| ProgressEvent::new(OperationStatus::Success));
        events.push_back(last.with_identifier(identifier));
        for event in events.iter_mut() {
            event.request_token = Some(token.clone());
        }
        inner.requests.insert(token.clone(), events);
        ProgressEvent::new(OperationStatus::Pending).with_request_token(token)
    }
}

fn apply_patch(props: &mut Json, patch: &[Json]) {
    let Json::Object(map) = props else {
        return;
    };
    for op in patch {
        let key = op["path"]
            .as_str()
            .unwrap_or_default()
            .trim_start_matches('/')
            .to_string();
        match op["op"].as_str() {
            Some("add") | Some("replace") => {
                map.insert(key, op["value"].clone());
            }
            Some("remove") => {
                map.remove(&key);
            }
            _ => {}
        }
    }
}

#[async_trait]
impl CloudControlApi for FakeCloudControl {
    async fn get_resource(
        &self,
        type_name: &str,
        identifier: &str,
    ) -> ProviderResult<Option<Json>> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        let mut inner = self.inner.lock().unwrap();
        let key = (type_name.to_string(), identifier.to_string());

        if let Some(remaining) = inner.lingering.get_mut(identifier)
            && *remaining > 0
        {
            *remaining -= 1;
            let mut props = inner.deleted.get(&key).cloned();
            if let Some(Json::Object(map)) = props.as_mut()
                && map.contains_key("CurrentState")
            {
                map.insert("CurrentState".to_string(), json!("DELETING"));
            }
            return Ok(props);
        }

        let state = match inner.status_scripts.get_mut(identifier) {
            Some(script) if script.len() > 1 => script.pop_front(),
            Some(script) => script.front().cloned(),
            None => None,
        };
        let overlay = inner.overlays.get(identifier).cloned().unwrap_or_default();
        let Some(props) = inner.resources.get_mut(&key) else {
            return Ok(None);
        };
        if let Json::Object(map) = props {
            if let Some(state) = state {
                map.insert("CurrentState".to_string(), Json::String(state));
            }
            map.extend(overlay);
        }
        Ok(Some(props.clone()))
    }

    async fn create_resource(
        &self,
        type_name: &str,
        desired_state: &Json,
    ) -> ProviderResult<ProgressEvent> {
        let mut inner = self.inner.lock().unwrap();
        inner.created.push(desired_state.clone());

        let mut props = desired_state.clone();
        if let Json::Object(map) = &mut props {
            for property in &self.write_only {
                map.remove(property);
            }
            if let Some(state) = map.get("DesiredState").cloned() {
                map.insert("CurrentState".to_string(), state);
            }
        }
        let identifier = match props.get("Name").and_then(|v| v.as_str()) {
            Some(name) => name.to_string(),
            None => {
                let n = inner.created.len();
                let service = type_name.split("::").nth(1).unwrap_or("fake").to_lowercase();
                let arn = format!(
                    "arn:aws:{}:us-east-1:{}:resource/{}",
                    service, FAKE_ACCOUNT, n
                );
                if let Json::Object(map) = &mut props {
                    map.insert("Arn".to_string(), Json::String(arn.clone()));
                }
                arn
            }
        };

        let event = self.start_request(&mut inner, &identifier);
        let succeeds = inner
            .requests
            .get(event.request_token.as_deref().unwrap_or_default())
            .and_then(|events| events.back())
            .is_some_and(|e| e.operation_status == Some(OperationStatus::Success));
        if succeeds {
            inner
                .resources
                .insert((type_name.to_string(), identifier), props);
        }
        Ok(event)
    }

    async fn update_resource(
        &self,
        type_name: &str,
        identifier: &str,
        patch: &[Json],
    ) -> ProviderResult<ProgressEvent> {
        let mut inner = self.inner.lock().unwrap();
        let key = (type_name.to_string(), identifier.to_string());
        let Some(props) = inner.resources.get_mut(&key) else {
            return Err(ProviderError::not_found(format!(
                "Resource {} not found",
                identifier
            )));
        };
        apply_patch(props, patch);
        inner.patches.push(patch.to_vec());
        Ok(self.start_request(&mut inner, identifier))
    }

    async fn delete_resource(
        &self,
        type_name: &str,
        identifier: &str,
    ) -> ProviderResult<ProgressEvent> {
        let mut inner = self.inner.lock().unwrap();
        let key = (type_name.to_string(), identifier.to_string());
        let Some(props) = inner.resources.remove(&key) else {
            return Err(ProviderError::not_found(format!(
                "Resource {} not found",
                identifier
            )));
        };
        inner.deleted.insert(key, props);
        inner
            .lingering
            .insert(identifier.to_string(), self.linger_after_delete);
        Ok(self.start_request(&mut inner, identifier))
    }

    async fn get_resource_request_status(&self, request_token: &str) -> ProviderResult<ProgressEvent> {
        let mut inner = self.inner.lock().unwrap();
        let Some(events) = inner.requests.get_mut(request_token) else {
            return Err(ProviderError::api(format!(
                "Unknown request token {}",
                request_token
            )));
        };
        let event = if events.len() > 1 {
            events.pop_front()
        } else {
            events.front().cloned()
        };
        event.ok_or_else(|| ProviderError::api("Request has no status"))
    }
}
