//! Resource references and dependency ordering

use std::collections::{BTreeSet, HashMap, HashSet};

use stratus_core::resource::{Resource, ResourceId, State, Value};

use crate::config::ConfigError;

/// Attributes known for each binding, from configuration merged with state
pub type Bindings = HashMap<String, HashMap<String, Value>>;

/// Binding names a resource references
pub fn dependencies(resource: &Resource) -> BTreeSet<String> {
    let mut deps = BTreeSet::new();
    for value in resource.attributes.values() {
        collect_dependencies(value, &mut deps);
    }
    deps
}

fn collect_dependencies(value: &Value, deps: &mut BTreeSet<String>) {
    match value {
        Value::ResourceRef(binding, _) => {
            deps.insert(binding.clone());
        }
        Value::List(items) => {
            for item in items {
                collect_dependencies(item, deps);
            }
        }
        Value::Map(map) => {
            for v in map.values() {
                collect_dependencies(v, deps);
            }
        }
        _ => {}
    }
}

/// Sort resources so that every resource comes after the ones it references
///
/// Declaration order is kept among independent resources.
pub fn sort_by_dependencies(resources: &[Resource]) -> Result<Vec<Resource>, ConfigError> {
    let by_binding: HashMap<&str, &Resource> = resources
        .iter()
        .filter_map(|r| r.binding().map(|b| (b, r)))
        .collect();

    fn visit<'a>(
        resource: &'a Resource,
        by_binding: &HashMap<&str, &'a Resource>,
        visited: &mut HashSet<&'a ResourceId>,
        visiting: &mut Vec<&'a ResourceId>,
        sorted: &mut Vec<Resource>,
    ) -> Result<(), ConfigError> {
        if visited.contains(&resource.id) {
            return Ok(());
        }
        if visiting.contains(&&resource.id) {
            return Err(ConfigError::DependencyCycle(resource.id.clone()));
        }

        visiting.push(&resource.id);
        for dep in dependencies(resource) {
            if let Some(&dep_resource) = by_binding.get(dep.as_str()) {
                visit(dep_resource, by_binding, visited, visiting, sorted)?;
            }
        }
        visiting.pop();
        visited.insert(&resource.id);
        sorted.push(resource.clone());
        Ok(())
    }

    let mut sorted = Vec::with_capacity(resources.len());
    let mut visited = HashSet::new();
    let mut visiting = Vec::new();
    for resource in resources {
        visit(resource, &by_binding, &mut visited, &mut visiting, &mut sorted)?;
    }
    Ok(sorted)
}

/// Bindings for desired resources, with attributes from existing state
/// filling in what configuration leaves out (ARNs, generated names)
pub fn bindings_from(resources: &[Resource], states: &HashMap<ResourceId, State>) -> Bindings {
    let mut bindings = Bindings::new();
    for resource in resources {
        if let Some(binding) = resource.binding() {
            let mut attrs = resource.user_attributes();
            if let Some(state) = states.get(&resource.id)
                && state.exists
            {
                for (k, v) in &state.attributes {
                    attrs.entry(k.clone()).or_insert_with(|| v.clone());
                }
            }
            bindings.insert(binding.to_string(), attrs);
        }
    }
    bindings
}

/// Record the state produced by applying a resource
pub fn record_binding(bindings: &mut Bindings, resource: &Resource, state: &State) {
    if let Some(binding) = resource.binding() {
        let mut attrs = resource.user_attributes();
        for (k, v) in &state.attributes {
            attrs.insert(k.clone(), v.clone());
        }
        bindings.insert(binding.to_string(), attrs);
    }
}

/// Replace references whose target attribute is known
///
/// Bindings must be acyclic, which [`sort_by_dependencies`] checks.
pub fn resolve_value(value: &Value, bindings: &Bindings) -> Value {
    match value {
        Value::ResourceRef(binding, attr) => match bindings.get(binding).and_then(|a| a.get(attr)) {
            Some(target) => resolve_value(target, bindings),
            None => value.clone(),
        },
        Value::List(items) => {
            Value::List(items.iter().map(|v| resolve_value(v, bindings)).collect())
        }
        Value::Map(map) => Value::Map(
            map.iter()
                .map(|(k, v)| (k.clone(), resolve_value(v, bindings)))
                .collect(),
        ),
        _ => value.clone(),
    }
}

pub fn resolve_resource(resource: &Resource, bindings: &Bindings) -> Resource {
    let mut resolved = resource.clone();
    for value in resolved.attributes.values_mut() {
        *value = resolve_value(value, bindings);
    }
    resolved
}
