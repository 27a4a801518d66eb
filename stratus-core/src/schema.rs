//! Schema - Define type schemas for resources
//!
//! Providers define schemas for each resource type: nested attribute and
//! block trees with validation rules. Schemas drive validation of desired
//! state, the mapping to cloud property names, and plan computation
//! (computed, force-new and set semantics).

use std::collections::HashMap;
use std::fmt;

use heck::ToUpperCamelCase;
use regex::Regex;

use crate::resource::Value;

/// Attribute type
#[derive(Debug, Clone)]
pub enum AttributeType {
    /// String
    String,
    /// Integer
    Int,
    /// Boolean
    Bool,
    /// Enum (list of allowed values)
    Enum(Vec<String>),
    /// Custom type (with validation function)
    Custom {
        name: String,
        base: Box<AttributeType>,
        validate: fn(&Value) -> Result<(), String>,
    },
    /// Ordered list
    List(Box<AttributeType>),
    /// Unordered collection; compared without regard to order
    Set(Box<AttributeType>),
    /// Map with string keys
    Map(Box<AttributeType>),
    /// Nested block with its own attributes
    Block(BlockSchema),
}

impl AttributeType {
    /// Check if a value conforms to this type
    pub fn validate(&self, value: &Value) -> Result<(), TypeError> {
        let mut errors = Vec::new();
        self.collect_errors("", value, &mut errors);
        match errors.into_iter().next() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn collect_errors(&self, path: &str, value: &Value, errors: &mut Vec<TypeError>) {
        match (self, value) {
            // ResourceRef values resolve at apply time, so they're accepted for scalar types
            (
                AttributeType::String
                | AttributeType::Int
                | AttributeType::Enum(_)
                | AttributeType::Custom { .. },
                Value::ResourceRef(_, _),
            ) => {}
            (AttributeType::String, Value::String(_)) => {}
            (AttributeType::Int, Value::Int(_)) => {}
            (AttributeType::Bool, Value::Bool(_)) => {}

            (AttributeType::Enum(variants), Value::String(s)) => {
                if !variants.iter().any(|v| v == s) {
                    errors.push(at_path(
                        path,
                        TypeError::InvalidEnumVariant {
                            value: s.clone(),
                            expected: variants.clone(),
                        },
                    ));
                }
            }

            (AttributeType::Custom { validate, base, .. }, v) => {
                let before = errors.len();
                base.collect_errors(path, v, errors);
                if errors.len() == before
                    && let Err(message) = validate(v)
                {
                    errors.push(at_path(path, TypeError::ValidationFailed { message }));
                }
            }

            (AttributeType::List(inner) | AttributeType::Set(inner), Value::List(items)) => {
                for (i, item) in items.iter().enumerate() {
                    inner.collect_errors(&format!("{}[{}]", path, i), item, errors);
                }
            }

            (AttributeType::Map(inner), Value::Map(map)) => {
                for (k, v) in map {
                    inner.collect_errors(&join_path(path, k), v, errors);
                }
            }

            (AttributeType::Block(block), Value::Map(map)) => {
                block.collect_errors(path, map, errors);
            }

            _ => errors.push(at_path(
                path,
                TypeError::TypeMismatch {
                    expected: self.type_name(),
                    got: value.type_name(),
                },
            )),
        }
    }

    fn type_name(&self) -> String {
        match self {
            AttributeType::String => "String".to_string(),
            AttributeType::Int => "Int".to_string(),
            AttributeType::Bool => "Bool".to_string(),
            AttributeType::Enum(variants) => format!("Enum({})", variants.join(" | ")),
            AttributeType::Custom { name, .. } => name.clone(),
            AttributeType::List(inner) => format!("List<{}>", inner.type_name()),
            AttributeType::Set(inner) => format!("Set<{}>", inner.type_name()),
            AttributeType::Map(inner) => format!("Map<{}>", inner.type_name()),
            AttributeType::Block(_) => "Block".to_string(),
        }
    }

    /// Nested block schema, for blocks and lists/sets of blocks
    pub fn block(&self) -> Option<&BlockSchema> {
        match self {
            AttributeType::Block(block) => Some(block),
            AttributeType::List(inner) | AttributeType::Set(inner) => inner.block(),
            _ => None,
        }
    }

    pub fn is_set(&self) -> bool {
        matches!(self, AttributeType::Set(_))
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_name())
    }
}

/// Type error
#[derive(Debug, Clone, thiserror::Error)]
pub enum TypeError {
    #[error("Type mismatch: expected {expected}, got {got}")]
    TypeMismatch { expected: String, got: String },

    #[error("Invalid enum variant '{value}', expected one of: {}", expected.join(", "))]
    InvalidEnumVariant {
        value: String,
        expected: Vec<String>,
    },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    #[error("Required attribute '{name}' is missing")]
    MissingRequired { name: String },

    #[error("Unknown attribute '{name}'")]
    UnknownAttribute { name: String },

    #[error("Attribute '{name}' is computed and cannot be set")]
    ComputedAttribute { name: String },

    #[error("Expected at most {max} items, got {got}")]
    TooManyItems { max: usize, got: usize },

    #[error("Expected at least {min} items, got {got}")]
    TooFewItems { min: usize, got: usize },

    #[error("Only one of {} can be set", names.join(", "))]
    ConflictingAttributes { names: Vec<String> },

    #[error("Exactly one of {} must be set", names.join(", "))]
    MissingOneOf { names: Vec<String> },

    #[error("{path}: {inner}")]
    AtPath { path: String, inner: Box<TypeError> },
}

impl TypeError {
    /// Dotted attribute path the error applies to, if any
    pub fn path(&self) -> Option<&str> {
        match self {
            TypeError::AtPath { path, .. } => Some(path),
            _ => None,
        }
    }
}

fn at_path(path: &str, error: TypeError) -> TypeError {
    if path.is_empty() {
        error
    } else {
        TypeError::AtPath {
            path: path.to_string(),
            inner: Box::new(error),
        }
    }
}

fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", prefix, name)
    }
}

impl Value {
    pub(crate) fn type_name(&self) -> String {
        match self {
            Value::String(_) => "String".to_string(),
            Value::Int(_) => "Int".to_string(),
            Value::Bool(_) => "Bool".to_string(),
            Value::List(_) => "List".to_string(),
            Value::Map(_) => "Map".to_string(),
            Value::ResourceRef(binding, attr) => format!("ResourceRef({}.{})", binding, attr),
        }
    }
}

/// Value-level validation rule attached to an attribute
#[derive(Debug, Clone)]
pub enum Validator {
    /// Inclusive integer range
    IntBetween(i64, i64),
    /// Integer from a fixed set
    IntOneOf(Vec<i64>),
    /// Inclusive string length range (in characters)
    StringLenBetween(usize, usize),
    /// String matching a regular expression, compiled once by [`Validator::matches`]
    Matches {
        pattern: String,
        regex: Result<Regex, regex::Error>,
        message: String,
    },
    /// String in AWS ARN form
    Arn,
    /// Passes if any of the inner validators pass
    Any(Vec<Validator>),
}

impl Validator {
    pub fn matches(pattern: impl Into<String>, message: impl Into<String>) -> Self {
        let pattern = pattern.into();
        Validator::Matches {
            regex: Regex::new(&pattern),
            pattern,
            message: message.into(),
        }
    }

    /// Check a scalar value. Values of the wrong kind are left to type checking.
    pub fn check(&self, value: &Value) -> Result<(), String> {
        match (self, value) {
            (Validator::IntBetween(min, max), Value::Int(n)) => {
                if n < min || n > max {
                    return Err(format!("expected {} to be in the range ({} - {})", n, min, max));
                }
                Ok(())
            }
            (Validator::IntOneOf(allowed), Value::Int(n)) => {
                if !allowed.contains(n) {
                    return Err(format!("expected {} to be one of {:?}", n, allowed));
                }
                Ok(())
            }
            (Validator::StringLenBetween(min, max), Value::String(s)) => {
                let len = s.chars().count();
                if len < *min || len > *max {
                    return Err(format!(
                        "expected length of '{}' to be in the range ({} - {}), got {}",
                        s, min, max, len
                    ));
                }
                Ok(())
            }
            (
                Validator::Matches {
                    pattern,
                    regex,
                    message,
                },
                Value::String(s),
            ) => {
                let re = regex
                    .as_ref()
                    .map_err(|e| format!("invalid pattern '{}': {}", pattern, e))?;
                if re.is_match(s) {
                    Ok(())
                } else {
                    Err(format!("'{}' {}", s, message))
                }
            }
            (Validator::Arn, Value::String(s)) => validate_arn(s),
            (Validator::Any(validators), v) => {
                let mut messages = Vec::new();
                for validator in validators {
                    match validator.check(v) {
                        Ok(()) => return Ok(()),
                        Err(m) => messages.push(m),
                    }
                }
                if messages.is_empty() {
                    Ok(())
                } else {
                    Err(messages.join("; or "))
                }
            }
            _ => Ok(()),
        }
    }
}

/// Validate AWS ARN format (arn:partition:service:region:account:resource)
pub fn validate_arn(arn: &str) -> Result<(), String> {
    let parts: Vec<&str> = arn.splitn(6, ':').collect();
    if parts.len() != 6 || parts[0] != "arn" {
        return Err(format!(
            "'{}' is an invalid ARN: expected arn:partition:service:region:account:resource",
            arn
        ));
    }
    if parts[1].is_empty() || !parts[1].starts_with("aws") {
        return Err(format!("'{}' is an invalid ARN: invalid partition", arn));
    }
    if parts[2].is_empty() {
        return Err(format!("'{}' is an invalid ARN: missing service", arn));
    }
    if !parts[4].is_empty() && !(parts[4].len() == 12 && parts[4].chars().all(|c| c.is_ascii_digit()))
    {
        return Err(format!("'{}' is an invalid ARN: invalid account ID", arn));
    }
    if parts[5].is_empty() {
        return Err(format!("'{}' is an invalid ARN: missing resource", arn));
    }
    Ok(())
}

/// Attribute schema
#[derive(Debug, Clone)]
pub struct AttributeSchema {
    pub name: String,
    pub attr_type: AttributeType,
    pub required: bool,
    /// Set by the cloud provider and never by the user
    pub computed: bool,
    /// May be set by the user; the cloud fills it in otherwise
    pub optional_computed: bool,
    /// Changing this attribute requires replacing the resource
    pub force_new: bool,
    /// Sent to the cloud but never returned by reads
    pub write_only: bool,
    /// Value is masked in plan output
    pub sensitive: bool,
    pub default: Option<Value>,
    pub description: Option<String>,
    /// Provider-side property name (e.g., "SourceParameters" for Cloud Control)
    pub provider_name: Option<String>,
    pub min_items: Option<usize>,
    pub max_items: Option<usize>,
    pub validators: Vec<Validator>,
}

impl AttributeSchema {
    pub fn new(name: impl Into<String>, attr_type: AttributeType) -> Self {
        Self {
            name: name.into(),
            attr_type,
            required: false,
            computed: false,
            optional_computed: false,
            force_new: false,
            write_only: false,
            sensitive: false,
            default: None,
            description: None,
            provider_name: None,
            min_items: None,
            max_items: None,
            validators: Vec::new(),
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn computed(mut self) -> Self {
        self.computed = true;
        self
    }

    pub fn optional_computed(mut self) -> Self {
        self.optional_computed = true;
        self
    }

    pub fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    pub fn write_only(mut self) -> Self {
        self.write_only = true;
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    pub fn with_provider_name(mut self, name: impl Into<String>) -> Self {
        self.provider_name = Some(name.into());
        self
    }

    pub fn with_max_items(mut self, max: usize) -> Self {
        self.max_items = Some(max);
        self
    }

    pub fn with_min_items(mut self, min: usize) -> Self {
        self.min_items = Some(min);
        self
    }

    pub fn validator(mut self, validator: Validator) -> Self {
        self.validators.push(validator);
        self
    }

    /// Cloud property name: explicit provider name or the PascalCase form of the name
    pub fn provider_property(&self) -> String {
        self.provider_name
            .clone()
            .unwrap_or_else(|| self.name.to_upper_camel_case())
    }

    fn collect_errors(&self, path: &str, value: &Value, errors: &mut Vec<TypeError>) {
        self.attr_type.collect_errors(path, value, errors);

        if let Value::List(items) = value {
            if let Some(max) = self.max_items
                && items.len() > max
            {
                errors.push(at_path(
                    path,
                    TypeError::TooManyItems {
                        max,
                        got: items.len(),
                    },
                ));
            }
            if let Some(min) = self.min_items
                && items.len() < min
            {
                errors.push(at_path(
                    path,
                    TypeError::TooFewItems {
                        min,
                        got: items.len(),
                    },
                ));
            }
        }

        let scalars: Vec<(String, &Value)> = match value {
            Value::List(items) => items
                .iter()
                .enumerate()
                .map(|(i, v)| (format!("{}[{}]", path, i), v))
                .collect(),
            Value::Map(_) => Vec::new(),
            v => vec![(path.to_string(), v)],
        };
        for validator in &self.validators {
            for (item_path, v) in &scalars {
                if let Err(message) = validator.check(v) {
                    errors.push(at_path(item_path, TypeError::ValidationFailed { message }));
                }
            }
        }
    }
}

/// Attribute tree of a resource or nested block
#[derive(Debug, Clone, Default)]
pub struct BlockSchema {
    pub attributes: HashMap<String, AttributeSchema>,
    /// Groups where at most one attribute may be set
    pub conflicts: Vec<Vec<String>>,
    /// Groups where exactly one attribute must be set
    pub exactly_one_of: Vec<Vec<String>>,
}

impl BlockSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attribute(mut self, schema: AttributeSchema) -> Self {
        self.attributes.insert(schema.name.clone(), schema);
        self
    }

    pub fn conflicting(mut self, names: &[&str]) -> Self {
        self.conflicts
            .push(names.iter().map(|n| n.to_string()).collect());
        self
    }

    pub fn exactly_one_of(mut self, names: &[&str]) -> Self {
        self.exactly_one_of
            .push(names.iter().map(|n| n.to_string()).collect());
        self
    }

    pub fn get(&self, name: &str) -> Option<&AttributeSchema> {
        self.attributes.get(name)
    }

    /// Find an attribute by its cloud property name
    pub fn by_provider_name(&self, property: &str) -> Option<&AttributeSchema> {
        self.attributes
            .values()
            .find(|a| a.provider_property() == property)
    }

    /// Validate a map of attributes against this block
    pub fn validate(&self, attributes: &HashMap<String, Value>) -> Result<(), Vec<TypeError>> {
        let mut errors = Vec::new();
        self.collect_errors("", attributes, &mut errors);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn collect_errors(
        &self,
        path: &str,
        attributes: &HashMap<String, Value>,
        errors: &mut Vec<TypeError>,
    ) {
        let mut names: Vec<&String> = self.attributes.keys().collect();
        names.sort();
        for name in names {
            let schema = &self.attributes[name];
            if schema.required && !attributes.contains_key(name) && schema.default.is_none() {
                errors.push(at_path(path, TypeError::MissingRequired { name: name.clone() }));
            }
        }

        let mut keys: Vec<&String> = attributes.keys().collect();
        keys.sort();
        for name in keys {
            // Internal attributes (prefixed with _) carry tool metadata
            if name.starts_with('_') {
                continue;
            }
            let value = &attributes[name];
            match self.attributes.get(name) {
                Some(schema) if schema.computed => {
                    errors.push(at_path(path, TypeError::ComputedAttribute { name: name.clone() }));
                }
                Some(schema) => schema.collect_errors(&join_path(path, name), value, errors),
                None => {
                    errors.push(at_path(path, TypeError::UnknownAttribute { name: name.clone() }))
                }
            }
        }

        for group in &self.conflicts {
            let set: Vec<String> = group
                .iter()
                .filter(|n| attributes.contains_key(n.as_str()))
                .cloned()
                .collect();
            if set.len() > 1 {
                errors.push(at_path(path, TypeError::ConflictingAttributes { names: set }));
            }
        }

        for group in &self.exactly_one_of {
            let set = group
                .iter()
                .filter(|n| attributes.contains_key(n.as_str()))
                .count();
            if set == 0 {
                errors.push(at_path(
                    path,
                    TypeError::MissingOneOf {
                        names: group.clone(),
                    },
                ));
            } else if set > 1 {
                errors.push(at_path(
                    path,
                    TypeError::ConflictingAttributes {
                        names: group.clone(),
                    },
                ));
            }
        }
    }
}

/// Resource schema
#[derive(Debug, Clone)]
pub struct ResourceSchema {
    pub resource_type: String,
    pub block: BlockSchema,
    pub description: Option<String>,
}

impl ResourceSchema {
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            block: BlockSchema::new(),
            description: None,
        }
    }

    pub fn attribute(mut self, schema: AttributeSchema) -> Self {
        self.block = self.block.attribute(schema);
        self
    }

    pub fn conflicting(mut self, names: &[&str]) -> Self {
        self.block = self.block.conflicting(names);
        self
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    pub fn attributes(&self) -> &HashMap<String, AttributeSchema> {
        &self.block.attributes
    }

    pub fn get(&self, name: &str) -> Option<&AttributeSchema> {
        self.block.get(name)
    }

    /// Validate resource attributes
    pub fn validate(&self, attributes: &HashMap<String, Value>) -> Result<(), Vec<TypeError>> {
        self.block.validate(attributes)
    }
}

/// Helper functions for common types
pub mod types {
    use super::*;

    /// Positive integer type
    pub fn positive_int() -> AttributeType {
        AttributeType::Custom {
            name: "PositiveInt".to_string(),
            base: Box::new(AttributeType::Int),
            validate: |value| {
                if let Value::Int(n) = value {
                    if *n > 0 {
                        Ok(())
                    } else {
                        Err("Value must be positive".to_string())
                    }
                } else {
                    Ok(())
                }
            },
        }
    }

    /// ARN string type
    pub fn arn() -> AttributeType {
        AttributeType::Custom {
            name: "Arn".to_string(),
            base: Box::new(AttributeType::String),
            validate: |value| match value {
                Value::String(s) => validate_arn(s),
                _ => Ok(()),
            },
        }
    }

    /// 12-digit AWS account ID
    pub fn account_id() -> AttributeType {
        AttributeType::Custom {
            name: "AccountId".to_string(),
            base: Box::new(AttributeType::String),
            validate: |value| match value {
                Value::String(s) if s.len() == 12 && s.chars().all(|c| c.is_ascii_digit()) => {
                    Ok(())
                }
                Value::String(s) => Err(format!("'{}' is not a valid AWS account ID", s)),
                _ => Ok(()),
            },
        }
    }

    /// Tag map (string keys and values)
    pub fn tags() -> AttributeType {
        AttributeType::Map(Box::new(AttributeType::String))
    }

    pub fn enum_of(values: &[&str]) -> AttributeType {
        AttributeType::Enum(values.iter().map(|v| v.to_string()).collect())
    }

    pub fn string_list() -> AttributeType {
        AttributeType::List(Box::new(AttributeType::String))
    }

    pub fn string_set() -> AttributeType {
        AttributeType::Set(Box::new(AttributeType::String))
    }

    pub fn block_list(block: BlockSchema) -> AttributeType {
        AttributeType::List(Box::new(AttributeType::Block(block)))
    }

    /// Blocks compared without regard to order
    pub fn block_set(block: BlockSchema) -> AttributeType {
        AttributeType::Set(Box::new(AttributeType::Block(block)))
    }
}
