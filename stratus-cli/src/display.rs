//! Plan and state output

use std::collections::HashMap;

use colored::Colorize;

use stratus_core::effect::Effect;
use stratus_core::plan::Plan;
use stratus_core::resource::{Resource, Value};
use stratus_core::schema::ResourceSchema;
use stratus_state::ResourceState;

const SENSITIVE: &str = "(sensitive value)";
const KNOWN_AFTER_APPLY: &str = "(known after apply)";

pub fn print_plan(plan: &Plan, schemas: &HashMap<String, ResourceSchema>) {
    if plan.is_empty() {
        println!("{}", "No changes. Infrastructure is up-to-date.".green());
        return;
    }

    println!("{}", "Execution Plan:".cyan().bold());
    println!();

    for effect in plan.effects() {
        let schema = schemas.get(&effect.resource_id().resource_type);
        match effect {
            Effect::Read { resource } => {
                println!("  {} {}", "<=".cyan().bold(), resource.id.to_string().cyan().bold());
            }
            Effect::Create(resource) => {
                println!("  {} {}", "+".green().bold(), resource.id.to_string().cyan().bold());
                for key in sorted_keys(resource) {
                    let value = format_attribute(schema, key, &resource.attributes[key]);
                    println!("      {}: {}", key, value.green());
                }
            }
            Effect::Update { id, from, to } | Effect::Replace { id, from, to } => {
                let replace = matches!(effect, Effect::Replace { .. });
                let symbol = if replace {
                    "-/+".red().bold()
                } else {
                    "~".yellow().bold()
                };
                println!("  {} {}", symbol, id.to_string().cyan().bold());
                for key in sorted_keys(to) {
                    let new_value = &to.attributes[key];
                    let old_value = from.attributes.get(key);
                    if old_value == Some(new_value) {
                        continue;
                    }
                    let old_str = old_value
                        .map(|v| format_attribute(schema, key, v))
                        .unwrap_or_else(|| "(none)".to_string());
                    let forces = replace
                        && schema
                            .and_then(|s| s.get(key))
                            .is_some_and(|a| a.force_new);
                    println!(
                        "      {}: {} → {}{}",
                        key,
                        old_str.red(),
                        format_attribute(schema, key, new_value).green(),
                        if forces {
                            " (forces replacement)".red().to_string()
                        } else {
                            String::new()
                        }
                    );
                }
            }
            Effect::Delete { id, identifier } => {
                println!("  {} {}", "-".red().bold(), id.to_string().cyan().bold());
                println!("      identifier: {}", identifier.red());
            }
        }
    }

    println!();
    let summary = plan.summary();
    println!(
        "Plan: {} to create, {} to update, {} to replace, {} to delete.",
        summary.create.to_string().green(),
        summary.update.to_string().yellow(),
        summary.replace.to_string().red(),
        summary.delete.to_string().red()
    );
}

fn sorted_keys(resource: &Resource) -> Vec<&String> {
    let mut keys: Vec<_> = resource
        .attributes
        .keys()
        .filter(|k| !k.starts_with('_'))
        .collect();
    keys.sort_by(|a, b| match (a.as_str(), b.as_str()) {
        ("name", _) => std::cmp::Ordering::Less,
        (_, "name") => std::cmp::Ordering::Greater,
        _ => a.cmp(b),
    });
    keys
}

fn format_attribute(schema: Option<&ResourceSchema>, key: &str, value: &Value) -> String {
    if schema.and_then(|s| s.get(key)).is_some_and(|a| a.sensitive) {
        return SENSITIVE.to_string();
    }
    format_value(value)
}

pub fn format_effect(effect: &Effect) -> String {
    match effect {
        Effect::Read { resource } => format!("Read {}", resource.id),
        Effect::Create(r) => format!("Create {}", r.id),
        Effect::Update { id, .. } => format!("Update {}", id),
        Effect::Replace { id, .. } => format!("Replace {}", id),
        Effect::Delete { id, .. } => format!("Delete {}", id),
    }
}

pub fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => format!("\"{}\"", s),
        Value::Int(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::List(items) => {
            let strs: Vec<_> = items.iter().map(format_value).collect();
            format!("[{}]", strs.join(", "))
        }
        Value::Map(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let strs: Vec<_> = entries
                .into_iter()
                .map(|(k, v)| format!("{}: {}", k, format_value(v)))
                .collect();
            format!("{{{}}}", strs.join(", "))
        }
        Value::ResourceRef(binding, attr) => format!("{}.{} {}", binding, attr, KNOWN_AFTER_APPLY),
    }
}

/// One line per recorded resource
pub fn format_state_line(resource: &ResourceState) -> String {
    let protected = if resource.protected { " [protected]" } else { "" };
    match &resource.identifier {
        Some(identifier) => format!("{}  ({}){}", resource.id(), identifier, protected),
        None => format!("{}{}", resource.id(), protected),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_nested_values_deterministically() {
        let value = Value::Map(HashMap::from([
            ("sid".to_string(), Value::String("HDB".to_string())),
            (
                "instances".to_string(),
                Value::List(vec![Value::String("i-0123456789abcdef0".to_string())]),
            ),
            ("enabled".to_string(), Value::Bool(true)),
        ]));
        assert_eq!(
            format_value(&value),
            r#"{enabled: true, instances: ["i-0123456789abcdef0"], sid: "HDB"}"#
        );
    }

    #[test]
    fn unresolved_refs_are_known_after_apply() {
        let value = Value::ResourceRef("lake".to_string(), "arn".to_string());
        assert_eq!(format_value(&value), "lake.arn (known after apply)");
    }

    #[test]
    fn sensitive_attributes_are_masked() {
        let schema = stratus_provider_awscc::resources::definition("ssmsap_application")
            .map(|d| d.schema());
        let credentials = Value::List(vec![Value::Map(HashMap::from([(
            "secret_id".to_string(),
            Value::String("hana-admin".to_string()),
        )]))]);
        assert_eq!(
            format_attribute(schema.as_ref(), "credentials", &credentials),
            SENSITIVE
        );
        assert_eq!(
            format_attribute(schema.as_ref(), "sid", &Value::String("HDB".to_string())),
            "\"HDB\""
        );
    }

    #[test]
    fn state_lines_show_identifier_and_protection() {
        let resource = ResourceState::new("pipes_pipe", "orders", "awscc")
            .with_identifier("orders-pipe")
            .with_protected(true);
        assert_eq!(
            format_state_line(&resource),
            "pipes_pipe.orders  (orders-pipe) [protected]"
        );
        let pending = ResourceState::new("securitylake_data_lake", "lake", "awscc");
        assert_eq!(format_state_line(&pending), "securitylake_data_lake.lake");
    }
}
