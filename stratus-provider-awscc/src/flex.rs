//! Expand / Flatten
//!
//! Schema-driven conversion between configuration attributes (snake_case
//! names, [`Value`] trees) and Cloud Control property documents (PascalCase
//! names, JSON). Each attribute maps to its `provider_property()`, and nested
//! blocks, lists of blocks and maps recurse.

use std::collections::HashMap;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, json};
use stratus_core::provider::{ProviderError, ProviderResult};
use stratus_core::resource::Value;
use stratus_core::schema::{AttributeType, BlockSchema};

type Json = serde_json::Value;

pub const TAGS_PROPERTY: &str = "Tags";

/// How a resource type represents tags on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagFormat {
    /// `{"key": "value"}`
    Map,
    /// `[{"Key": "key", "Value": "value"}]`
    KeyValueList,
}

// =============================================================================
// Expand
// =============================================================================

/// Convert configuration attributes into a property document.
///
/// Computed attributes are skipped and defaults are filled in. Empty blocks
/// and empty lists are omitted.
pub fn expand(
    block: &BlockSchema,
    attributes: &HashMap<String, Value>,
) -> ProviderResult<Map<String, Json>> {
    expand_block("", block, attributes)
}

fn expand_block(
    path: &str,
    block: &BlockSchema,
    attributes: &HashMap<String, Value>,
) -> ProviderResult<Map<String, Json>> {
    let mut doc = Map::new();

    for (name, attr) in &block.attributes {
        if attr.computed {
            continue;
        }
        let Some(value) = attributes.get(name).or(attr.default.as_ref()) else {
            continue;
        };
        let attr_path = join(path, name);
        if let Some(json) = expand_value(&attr_path, &attr.attr_type, value)? {
            doc.insert(attr.provider_property(), json);
        }
    }

    Ok(doc)
}

fn expand_value(
    path: &str,
    attr_type: &AttributeType,
    value: &Value,
) -> ProviderResult<Option<Json>> {
    match (attr_type, value) {
        (_, Value::ResourceRef(binding, attr)) => Err(ProviderError::validation(format!(
            "{}: unresolved reference to {}.{}",
            path, binding, attr
        ))),
        (AttributeType::Block(block), Value::Map(map)) => {
            let doc = expand_block(path, block, map)?;
            Ok((!doc.is_empty()).then_some(Json::Object(doc)))
        }
        (AttributeType::List(inner) | AttributeType::Set(inner), Value::List(items)) => {
            let mut out = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                let item_path = format!("{}[{}]", path, i);
                match expand_value(&item_path, inner, item)? {
                    Some(json) => out.push(json),
                    // An empty block in a list still occupies its position
                    None if inner.block().is_some() => out.push(Json::Object(Map::new())),
                    None => {}
                }
            }
            Ok((!out.is_empty()).then_some(Json::Array(out)))
        }
        (AttributeType::Map(inner), Value::Map(map)) => {
            let mut out = Map::new();
            for (k, v) in map {
                if let Some(json) = expand_value(&join(path, k), inner, v)? {
                    out.insert(k.clone(), json);
                }
            }
            Ok((!out.is_empty()).then_some(Json::Object(out)))
        }
        (AttributeType::Custom { base, .. }, v) => expand_value(path, base, v),
        (_, v) => Ok(Some(v.to_json())),
    }
}

// =============================================================================
// Flatten
// =============================================================================

/// Convert a property document into configuration attributes.
///
/// Properties the schema does not know are dropped; empty values are omitted.
pub fn flatten(block: &BlockSchema, props: &Map<String, Json>) -> HashMap<String, Value> {
    let mut attributes = HashMap::new();

    for (name, attr) in &block.attributes {
        if let Some(json) = props.get(&attr.provider_property())
            && let Some(value) = flatten_value(&attr.attr_type, json)
        {
            attributes.insert(name.clone(), value);
        }
    }

    attributes
}

fn flatten_value(attr_type: &AttributeType, json: &Json) -> Option<Value> {
    match (attr_type, json) {
        (_, Json::Null) => None,
        (AttributeType::Block(block), Json::Object(props)) => {
            let map = flatten(block, props);
            (!map.is_empty()).then_some(Value::Map(map))
        }
        (AttributeType::List(inner) | AttributeType::Set(inner), Json::Array(items)) => {
            let values: Vec<Value> = items
                .iter()
                .map(|item| {
                    flatten_value(inner, item).unwrap_or_else(|| Value::Map(HashMap::new()))
                })
                .collect();
            (!values.is_empty()).then_some(Value::List(values))
        }
        (AttributeType::Map(inner), Json::Object(map)) => {
            let values: HashMap<String, Value> = map
                .iter()
                .filter_map(|(k, v)| flatten_value(inner, v).map(|v| (k.clone(), v)))
                .collect();
            (!values.is_empty()).then_some(Value::Map(values))
        }
        (AttributeType::Custom { base, .. }, v) => flatten_value(base, v),
        (AttributeType::Int, Json::String(s)) => s.parse().ok().map(Value::Int),
        (AttributeType::Bool, Json::String(s)) => s.parse().ok().map(Value::Bool),
        (AttributeType::String | AttributeType::Enum(_), Json::Number(n)) => {
            Some(Value::String(n.to_string()))
        }
        (AttributeType::String | AttributeType::Enum(_), Json::Bool(b)) => {
            Some(Value::String(b.to_string()))
        }
        (_, v) => Value::from_json(v),
    }
}

// =============================================================================
// Tags
// =============================================================================

/// Rewrite a `Tags` map into the `[{Key, Value}]` list form, sorted by key
pub fn tags_to_key_value_list(doc: &mut Map<String, Json>) {
    if let Some(Json::Object(tags)) = doc.get(TAGS_PROPERTY) {
        let mut keys: Vec<&String> = tags.keys().collect();
        keys.sort();
        let list: Vec<Json> = keys
            .into_iter()
            .map(|k| json!({ "Key": k, "Value": tags[k] }))
            .collect();
        doc.insert(TAGS_PROPERTY.to_string(), Json::Array(list));
    }
}

/// Rewrite a `[{Key, Value}]` tag list into map form
pub fn key_value_list_to_tags(doc: &mut Map<String, Json>) {
    if let Some(Json::Array(list)) = doc.get(TAGS_PROPERTY) {
        let mut tags = Map::new();
        for tag in list {
            if let (Some(key), Some(value)) = (
                tag.get("Key").and_then(|v| v.as_str()),
                tag.get("Value").and_then(|v| v.as_str()),
            ) {
                tags.insert(key.to_string(), Json::String(value.to_string()));
            }
        }
        doc.insert(TAGS_PROPERTY.to_string(), Json::Object(tags));
    }
}

// =============================================================================
// Typed model
// =============================================================================

/// Pass a property document through a typed model.
///
/// Fails with a validation error when the document does not have the
/// model's shape. The result is serialized back in canonical form.
pub fn through_model<T>(doc: Json) -> ProviderResult<Json>
where
    T: DeserializeOwned + Serialize,
{
    through_model_with::<T>(doc, |_| {})
}

/// Like [`through_model`], canonicalizing the model with `adjust` first
pub fn through_model_with<T>(doc: Json, adjust: impl FnOnce(&mut T)) -> ProviderResult<Json>
where
    T: DeserializeOwned + Serialize,
{
    let mut model: T = serde_json::from_value(doc).map_err(|e| {
        ProviderError::validation(format!("Invalid resource properties: {}", e)).with_cause(e)
    })?;
    adjust(&mut model);
    serde_json::to_value(&model)
        .map_err(|e| ProviderError::new("Failed to serialize resource properties").with_cause(e))
}

// =============================================================================
// Update patches
// =============================================================================

/// JSON Patch operations turning `previous` into `desired`.
///
/// Create-only (force-new) properties are never patched. Properties the
/// cloud fills in on its own are not removed when absent from `desired`.
pub fn patch_document(
    block: &BlockSchema,
    previous: &Map<String, Json>,
    desired: &Map<String, Json>,
) -> Vec<Json> {
    let mut ops = Vec::new();

    let mut keys: Vec<&String> = desired.keys().collect();
    keys.sort();
    for key in keys {
        if block.by_provider_name(key).is_some_and(|a| a.force_new) {
            continue;
        }
        let value = &desired[key];
        let op = match previous.get(key) {
            Some(prev) if prev == value => continue,
            Some(_) => "replace",
            None => "add",
        };
        ops.push(json!({ "op": op, "path": format!("/{}", key), "value": value }));
    }

    let mut removed: Vec<&String> = previous
        .keys()
        .filter(|k| !desired.contains_key(k.as_str()))
        .collect();
    removed.sort();
    for key in removed {
        let removable = block
            .by_provider_name(key)
            .is_some_and(|a| !a.computed && !a.optional_computed && !a.force_new);
        if removable {
            ops.push(json!({ "op": "remove", "path": format!("/{}", key) }));
        }
    }

    ops
}

fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", prefix, name)
    }
}
