//! Differ - Compare desired state with current state to generate a Plan
//!
//! Compares the "desired state" declared in configuration with the "current
//! state" fetched from the Provider, and generates a list of required Effects (Plan).

use std::collections::{HashMap, HashSet};

use crate::effect::Effect;
use crate::plan::Plan;
use crate::resource::{Resource, ResourceId, State, Value};
use crate::schema::{AttributeType, BlockSchema, ResourceSchema};

/// Result of a diff operation
#[derive(Debug, Clone, PartialEq)]
pub enum Diff {
    /// Resource does not exist -> needs creation
    Create(Resource),
    /// Resource exists with differences -> needs update
    Update {
        id: ResourceId,
        from: State,
        to: Resource,
        changed_attributes: Vec<String>,
    },
    /// A create-only attribute changed -> needs replacement
    Replace {
        id: ResourceId,
        from: State,
        to: Resource,
        changed_attributes: Vec<String>,
    },
    /// Resource exists with no differences -> no action needed
    NoChange(ResourceId),
}

impl Diff {
    /// Returns whether this Diff involves a change
    pub fn is_change(&self) -> bool {
        !matches!(self, Diff::NoChange(_))
    }
}

/// Compare desired state with current state to compute a Diff
pub fn diff(desired: &Resource, current: &State, schema: Option<&ResourceSchema>) -> Diff {
    if !current.exists {
        return Diff::Create(desired.clone());
    }

    let (changed, replace) = find_changed_attributes(
        &desired.attributes,
        &current.attributes,
        schema.map(|s| &s.block),
    );

    if changed.is_empty() {
        Diff::NoChange(desired.id.clone())
    } else if replace {
        Diff::Replace {
            id: desired.id.clone(),
            from: current.clone(),
            to: desired.clone(),
            changed_attributes: changed,
        }
    } else {
        Diff::Update {
            id: desired.id.clone(),
            from: current.clone(),
            to: desired.clone(),
            changed_attributes: changed,
        }
    }
}

/// Find changed attributes between desired and current state.
///
/// Returns the changed top-level names and whether any change touches a
/// force-new attribute.
fn find_changed_attributes(
    desired: &HashMap<String, Value>,
    current: &HashMap<String, Value>,
    block: Option<&BlockSchema>,
) -> (Vec<String>, bool) {
    let mut changed = Vec::new();
    let mut replace = false;

    for (key, desired_value) in desired {
        // Skip internal attributes (starting with _)
        if key.starts_with('_') {
            continue;
        }
        let attr = block.and_then(|b| b.get(key));
        if attr.is_some_and(|a| a.computed) {
            continue;
        }

        let mut nested_replace = false;
        let same = match current.get(key) {
            Some(current_value) => values_match(
                desired_value,
                current_value,
                attr.map(|a| &a.attr_type),
                &mut nested_replace,
            ),
            // Write-only values never come back from reads
            None => is_empty(desired_value) || attr.is_some_and(|a| a.write_only),
        };
        if !same {
            changed.push(key.clone());
            if nested_replace || attr.is_some_and(|a| a.force_new) {
                replace = true;
            }
        }
    }

    // Attributes the user removed from configuration
    if let Some(block) = block {
        for (key, current_value) in current {
            if desired.contains_key(key) || key.starts_with('_') || is_empty(current_value) {
                continue;
            }
            let Some(attr) = block.get(key) else {
                continue;
            };
            if attr.computed || attr.optional_computed {
                continue;
            }
            if attr.default.as_ref() == Some(current_value) {
                continue;
            }
            changed.push(key.clone());
            if attr.force_new {
                replace = true;
            }
        }
    }

    changed.sort();
    (changed, replace)
}

/// Compare a desired value with the current one under the attribute's type.
///
/// Nested blocks compare only the keys the user set, since the cloud fills in
/// defaults for the rest. Sets compare without regard to order.
fn values_match(
    desired: &Value,
    current: &Value,
    attr_type: Option<&AttributeType>,
    replace: &mut bool,
) -> bool {
    match (attr_type, desired, current) {
        (Some(AttributeType::Block(block)), Value::Map(d), Value::Map(c)) => {
            let mut all = true;
            for (key, dv) in d {
                let sub = block.get(key);
                if sub.is_some_and(|s| s.computed) {
                    continue;
                }
                let mut nested_replace = false;
                let same = match c.get(key) {
                    Some(cv) => {
                        values_match(dv, cv, sub.map(|s| &s.attr_type), &mut nested_replace)
                    }
                    None => is_empty(dv) || sub.is_some_and(|s| s.write_only),
                };
                if !same {
                    all = false;
                    if nested_replace || sub.is_some_and(|s| s.force_new) {
                        *replace = true;
                    }
                }
            }
            all
        }
        (Some(AttributeType::List(inner)), Value::List(d), Value::List(c)) => {
            d.len() == c.len()
                && d
                    .iter()
                    .zip(c)
                    .all(|(dv, cv)| values_match(dv, cv, Some(inner), replace))
        }
        (Some(AttributeType::Set(inner)), Value::List(d), Value::List(c)) => {
            if d.len() != c.len() {
                return false;
            }
            let mut used = HashSet::new();
            d.iter().all(|dv| {
                let found = c.iter().enumerate().find(|(i, cv)| {
                    !used.contains(i) && values_match(dv, cv, Some(inner), &mut false)
                });
                match found {
                    Some((i, _)) => {
                        used.insert(i);
                        true
                    }
                    None => false,
                }
            })
        }
        _ => desired == current,
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::List(items) => items.is_empty(),
        Value::Map(map) => map.is_empty(),
        _ => false,
    }
}

/// Compute Diff for multiple resources and generate a Plan
///
/// Current states present in `current_states` but absent from `desired`
/// are orphans and get deleted.
pub fn create_plan(
    desired: &[Resource],
    current_states: &HashMap<ResourceId, State>,
    schemas: &HashMap<String, ResourceSchema>,
) -> Plan {
    let mut plan = Plan::new();

    for resource in desired {
        if resource.read_only {
            plan.add(Effect::Read {
                resource: resource.clone(),
            });
            continue;
        }

        let current = current_states
            .get(&resource.id)
            .cloned()
            .unwrap_or_else(|| State::not_found(resource.id.clone()));

        let d = diff(resource, &current, schemas.get(&resource.id.resource_type));

        match d {
            Diff::Create(r) => plan.add(Effect::Create(r)),
            Diff::Update { id, from, to, .. } => {
                plan.add(Effect::Update { id, from, to });
            }
            Diff::Replace { id, from, to, .. } => {
                plan.add(Effect::Replace { id, from, to });
            }
            Diff::NoChange(_) => {}
        }
    }

    let desired_ids: HashSet<&ResourceId> = desired.iter().map(|r| &r.id).collect();
    let mut orphans: Vec<&State> = current_states
        .values()
        .filter(|s| s.exists && !desired_ids.contains(&s.id))
        .collect();
    orphans.sort_by(|a, b| a.id.cmp(&b.id));
    for state in orphans {
        if let Some(identifier) = &state.identifier {
            plan.add(Effect::Delete {
                id: state.id.clone(),
                identifier: identifier.clone(),
            });
        }
    }

    plan
}

/// Plan deletion of every existing resource, in reverse order
pub fn destroy_plan(states: &[State]) -> Plan {
    let mut plan = Plan::new();
    for state in states.iter().rev() {
        if state.exists
            && let Some(identifier) = &state.identifier
        {
            plan.add(Effect::Delete {
                id: state.id.clone(),
                identifier: identifier.clone(),
            });
        }
    }
    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{AttributeSchema, types};

    fn s(v: &str) -> Value {
        Value::String(v.to_string())
    }

    fn pipe_schema() -> ResourceSchema {
        let sqs = BlockSchema::new()
            .attribute(AttributeSchema::new("batch_size", AttributeType::Int))
            .attribute(
                AttributeSchema::new("starting_position", AttributeType::String).force_new(),
            );
        ResourceSchema::new("pipes_pipe")
            .attribute(AttributeSchema::new("name", AttributeType::String).force_new())
            .attribute(AttributeSchema::new("description", AttributeType::String))
            .attribute(
                AttributeSchema::new("desired_state", AttributeType::String)
                    .with_default(s("RUNNING")),
            )
            .attribute(AttributeSchema::new("arn", AttributeType::String).computed())
            .attribute(
                AttributeSchema::new("kms_key_identifier", AttributeType::String)
                    .optional_computed(),
            )
            .attribute(AttributeSchema::new("source", AttributeType::Block(sqs)))
            .attribute(AttributeSchema::new("security_groups", types::string_set()))
            .attribute(AttributeSchema::new("tags", types::tags()))
    }

    fn existing(attrs: Vec<(&str, Value)>) -> State {
        State::existing(
            ResourceId::new("pipes_pipe", "orders"),
            attrs
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        )
    }

    #[test]
    fn diff_create_when_not_exists() {
        let desired = Resource::new("pipes_pipe", "orders");
        let current = State::not_found(ResourceId::new("pipes_pipe", "orders"));

        let result = diff(&desired, &current, None);
        assert!(matches!(result, Diff::Create(_)));
    }

    #[test]
    fn diff_no_change_ignores_computed_and_defaults() {
        let schema = pipe_schema();
        let desired = Resource::new("pipes_pipe", "orders")
            .with_attribute("name", s("orders"))
            .with_attribute("_binding", s("orders"));
        let current = existing(vec![
            ("name", s("orders")),
            ("arn", s("arn:aws:pipes:us-east-1:123456789012:pipe/orders")),
            ("desired_state", s("RUNNING")),
            ("kms_key_identifier", s("alias/aws/pipes")),
        ]);

        let result = diff(&desired, &current, Some(&schema));
        assert!(matches!(result, Diff::NoChange(_)));
    }

    #[test]
    fn diff_update_when_different() {
        let desired = Resource::new("pipes_pipe", "orders").with_attribute("description", s("new"));
        let current = existing(vec![("description", s("old"))]);

        let result = diff(&desired, &current, Some(&pipe_schema()));
        match result {
            Diff::Update {
                changed_attributes, ..
            } => {
                assert_eq!(changed_attributes, vec!["description".to_string()]);
            }
            _ => panic!("Expected Update"),
        }
    }

    #[test]
    fn removed_attribute_is_a_change() {
        let desired = Resource::new("pipes_pipe", "orders");
        let current = existing(vec![("description", s("old"))]);

        let result = diff(&desired, &current, Some(&pipe_schema()));
        assert!(matches!(result, Diff::Update { .. }));
    }

    #[test]
    fn force_new_change_requires_replace() {
        let desired = Resource::new("pipes_pipe", "orders").with_attribute("name", s("orders-v2"));
        let current = existing(vec![("name", s("orders"))]);

        let result = diff(&desired, &current, Some(&pipe_schema()));
        assert!(matches!(result, Diff::Replace { .. }));
    }

    #[test]
    fn nested_blocks_compare_user_keys_only() {
        let schema = pipe_schema();
        let desired = Resource::new("pipes_pipe", "orders").with_attribute(
            "source",
            Value::Map(HashMap::from([("batch_size".to_string(), Value::Int(10))])),
        );
        let current = existing(vec![(
            "source",
            Value::Map(HashMap::from([
                ("batch_size".to_string(), Value::Int(10)),
                ("starting_position".to_string(), s("LATEST")),
            ])),
        )]);
        assert!(matches!(
            diff(&desired, &current, Some(&schema)),
            Diff::NoChange(_)
        ));

        let desired = Resource::new("pipes_pipe", "orders").with_attribute(
            "source",
            Value::Map(HashMap::from([(
                "starting_position".to_string(),
                s("TRIM_HORIZON"),
            )])),
        );
        assert!(matches!(
            diff(&desired, &current, Some(&schema)),
            Diff::Replace { .. }
        ));
    }

    #[test]
    fn write_only_attributes_missing_from_reads() {
        let schema = ResourceSchema::new("ssmsap_application")
            .attribute(AttributeSchema::new("credentials", types::string_list()).write_only())
            .attribute(AttributeSchema::new("sid", AttributeType::String));
        let desired = Resource::new("ssmsap_application", "hana")
            .with_attribute("credentials", Value::List(vec![s("secret")]))
            .with_attribute("sid", s("HDB"));
        let current = State::existing(
            ResourceId::new("ssmsap_application", "hana"),
            HashMap::from([("sid".to_string(), s("HDB"))]),
        );
        assert!(matches!(
            diff(&desired, &current, Some(&schema)),
            Diff::NoChange(_)
        ));
    }

    #[test]
    fn sets_ignore_order() {
        let desired = Resource::new("pipes_pipe", "orders").with_attribute(
            "security_groups",
            Value::List(vec![s("sg-1"), s("sg-2")]),
        );
        let current = existing(vec![(
            "security_groups",
            Value::List(vec![s("sg-2"), s("sg-1")]),
        )]);
        assert!(matches!(
            diff(&desired, &current, Some(&pipe_schema())),
            Diff::NoChange(_)
        ));
    }

    #[test]
    fn tag_maps_compare_exactly() {
        let desired = Resource::new("pipes_pipe", "orders").with_attribute(
            "tags",
            Value::Map(HashMap::from([("env".to_string(), s("prod"))])),
        );
        let current = existing(vec![(
            "tags",
            Value::Map(HashMap::from([
                ("env".to_string(), s("prod")),
                ("team".to_string(), s("core")),
            ])),
        )]);
        assert!(matches!(
            diff(&desired, &current, Some(&pipe_schema())),
            Diff::Update { .. }
        ));
    }

    #[test]
    fn create_plan_from_resources() {
        let resources = vec![
            Resource::new("pipes_pipe", "new"),
            Resource::new("pipes_pipe", "orders").with_attribute("description", s("v2")),
        ];

        let mut current_states = HashMap::new();
        current_states.insert(
            ResourceId::new("pipes_pipe", "orders"),
            existing(vec![("description", s("v1"))]),
        );
        current_states.insert(
            ResourceId::new("pipes_pipe", "orphan"),
            State::existing(ResourceId::new("pipes_pipe", "orphan"), HashMap::new())
                .with_identifier("orphan"),
        );

        let schemas = HashMap::from([("pipes_pipe".to_string(), pipe_schema())]);
        let plan = create_plan(&resources, &current_states, &schemas);

        assert_eq!(plan.effects().len(), 3);
        assert!(matches!(plan.effects()[0], Effect::Create(_)));
        assert!(matches!(plan.effects()[1], Effect::Update { .. }));
        assert!(matches!(
            &plan.effects()[2],
            Effect::Delete { identifier, .. } if identifier == "orphan"
        ));
    }

    #[test]
    fn destroy_plan_reverses_order() {
        let states = vec![
            State::existing(ResourceId::new("securitylake_data_lake", "lake"), HashMap::new())
                .with_identifier("arn:lake"),
            State::existing(ResourceId::new("securitylake_subscriber", "sub"), HashMap::new())
                .with_identifier("arn:sub"),
            State::not_found(ResourceId::new("pipes_pipe", "gone")),
        ];
        let plan = destroy_plan(&states);
        assert_eq!(plan.effects().len(), 2);
        assert_eq!(plan.effects()[0].resource_id().name, "sub");
        assert_eq!(plan.effects()[1].resource_id().name, "lake");
    }
}
