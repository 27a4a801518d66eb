//! Resource - Representing resources and their state

use std::collections::HashMap;

/// Attribute key naming a resource for references from other resources
pub const BINDING_ATTRIBUTE: &str = "_binding";

/// JSON object key marking a reference (`{"$ref": "binding.attribute"}`)
pub const REF_KEY: &str = "$ref";

/// Unique identifier for a resource
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId {
    /// Resource type (e.g., "pipes_pipe", "securitylake_subscriber")
    pub resource_type: String,
    /// Resource name (identifier given in configuration)
    pub name: String,
}

impl ResourceId {
    pub fn new(resource_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.resource_type, self.name)
    }
}

/// Attribute value of a resource
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Int(i64),
    Bool(bool),
    List(Vec<Value>),
    Map(HashMap<String, Value>),
    /// Reference to another resource's attribute (binding_name, attribute_name)
    ResourceRef(String, String),
}

impl Value {
    /// Convert a JSON value into an attribute value.
    ///
    /// Returns `None` for `null`. Objects of the form `{"$ref": "a.b"}` become
    /// [`Value::ResourceRef`]. Floats are truncated.
    pub fn from_json(json: &serde_json::Value) -> Option<Value> {
        match json {
            serde_json::Value::Null => None,
            serde_json::Value::Bool(b) => Some(Value::Bool(*b)),
            serde_json::Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f as i64))
                .map(Value::Int),
            serde_json::Value::String(s) => Some(Value::String(s.clone())),
            serde_json::Value::Array(items) => Some(Value::List(
                items.iter().filter_map(Value::from_json).collect(),
            )),
            serde_json::Value::Object(map) => {
                if map.len() == 1
                    && let Some(serde_json::Value::String(target)) = map.get(REF_KEY)
                    && let Some((binding, attr)) = target.split_once('.')
                {
                    return Some(Value::ResourceRef(binding.to_string(), attr.to_string()));
                }
                Some(Value::Map(
                    map.iter()
                        .filter_map(|(k, v)| Value::from_json(v).map(|v| (k.clone(), v)))
                        .collect(),
                ))
            }
        }
    }

    /// Convert an attribute value into JSON.
    ///
    /// References are written back in their `{"$ref": ...}` form.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Int(i) => serde_json::Value::Number((*i).into()),
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::List(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Map(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
            Value::ResourceRef(binding, attr) => {
                serde_json::json!({ REF_KEY: format!("{}.{}", binding, attr) })
            }
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// True when the value or anything nested in it is an unresolved reference
    pub fn contains_ref(&self) -> bool {
        match self {
            Value::ResourceRef(_, _) => true,
            Value::List(items) => items.iter().any(Value::contains_ref),
            Value::Map(map) => map.values().any(Value::contains_ref),
            _ => false,
        }
    }
}

/// Desired state declared in configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    pub id: ResourceId,
    pub attributes: HashMap<String, Value>,
    /// If true, this is a data source (read-only) that won't be modified
    pub read_only: bool,
}

impl Resource {
    pub fn new(resource_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: ResourceId::new(resource_type, name),
            attributes: HashMap::new(),
            read_only: false,
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    /// Returns true if this resource is a data source (read-only)
    pub fn is_data_source(&self) -> bool {
        self.read_only
    }

    /// Binding name used by other resources to reference this one
    pub fn binding(&self) -> Option<&str> {
        self.attributes.get(BINDING_ATTRIBUTE).and_then(Value::as_str)
    }

    /// Attributes sent to the provider (internal `_` keys stripped)
    pub fn user_attributes(&self) -> HashMap<String, Value> {
        self.attributes
            .iter()
            .filter(|(k, _)| !k.starts_with('_'))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

/// Current state fetched from actual infrastructure
#[derive(Debug, Clone, PartialEq)]
pub struct State {
    pub id: ResourceId,
    /// Cloud primary identifier (e.g., pipe name, subscriber ARN)
    pub identifier: Option<String>,
    pub attributes: HashMap<String, Value>,
    /// Whether this state exists
    pub exists: bool,
}

impl State {
    pub fn not_found(id: ResourceId) -> Self {
        Self {
            id,
            identifier: None,
            attributes: HashMap::new(),
            exists: false,
        }
    }

    pub fn existing(id: ResourceId, attributes: HashMap<String, Value>) -> Self {
        Self {
            id,
            identifier: None,
            attributes,
            exists: true,
        }
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn from_json_skips_nulls_and_detects_refs() {
        let value = Value::from_json(&json!({
            "name": "orders",
            "description": null,
            "role_arn": { "$ref": "role.arn" },
            "batch_size": 10
        }))
        .unwrap();

        let Value::Map(map) = value else {
            panic!("expected map");
        };
        assert_eq!(map.len(), 3);
        assert_eq!(
            map.get("role_arn"),
            Some(&Value::ResourceRef("role".to_string(), "arn".to_string()))
        );
        assert_eq!(map.get("batch_size"), Some(&Value::Int(10)));
    }

    #[test]
    fn ref_object_with_extra_keys_is_a_map() {
        let value = Value::from_json(&json!({ "$ref": "a.b", "other": 1 })).unwrap();
        assert!(matches!(value, Value::Map(_)));
    }

    #[test]
    fn contains_ref_looks_inside_collections() {
        let value = Value::List(vec![Value::Map(HashMap::from([(
            "arn".to_string(),
            Value::ResourceRef("lake".to_string(), "arn".to_string()),
        )]))]);
        assert!(value.contains_ref());
        assert!(!Value::String("x".to_string()).contains_ref());
    }

    #[test]
    fn user_attributes_strip_internal_keys() {
        let resource = Resource::new("pipes_pipe", "orders")
            .with_attribute("_binding", Value::String("orders".to_string()))
            .with_attribute("name", Value::String("orders".to_string()));
        assert_eq!(resource.binding(), Some("orders"));
        let attrs = resource.user_attributes();
        assert_eq!(attrs.len(), 1);
        assert!(attrs.contains_key("name"));
    }
}
