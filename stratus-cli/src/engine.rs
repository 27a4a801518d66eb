//! Plan, apply, destroy and import against a provider and a state backend
//!
//! Every command that changes infrastructure or state holds the backend
//! lock for its whole run, and the state file is written after each
//! applied effect so a failure part way through loses nothing.

use std::collections::{HashMap, HashSet};

use colored::Colorize;

use stratus_core::differ::{create_plan, destroy_plan};
use stratus_core::effect::Effect;
use stratus_core::interpreter::{EffectOutcome, Interpreter};
use stratus_core::plan::Plan;
use stratus_core::provider::Provider;
use stratus_core::resource::{Resource, ResourceId, State, Value};
use stratus_core::schema::ResourceSchema;
use stratus_state::{LockInfo, ResourceState, StateBackend, StateFile};

use crate::config::Config;
use crate::deps::{self, Bindings};
use crate::display::format_effect;
use crate::error::{CliError, CliResult};

/// Attribute naming the object a read-only resource refers to
const IDENTIFIER_ATTRIBUTE: &str = "identifier";

/// Plan computed against refreshed state
pub struct PreparedPlan {
    pub plan: Plan,
    current: HashMap<ResourceId, State>,
    /// Known attributes per binding, excluding resources being replaced
    bindings: Bindings,
    state: StateFile,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ApplyReport {
    pub succeeded: usize,
    pub failed: usize,
}

impl ApplyReport {
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

pub struct Engine {
    interpreter: Interpreter<Box<dyn Provider>>,
    backend: Box<dyn StateBackend>,
    schemas: HashMap<String, ResourceSchema>,
}

impl Engine {
    pub fn new(provider: Box<dyn Provider>, backend: Box<dyn StateBackend>) -> Self {
        let schemas = provider
            .resource_types()
            .into_iter()
            .map(|t| (t.name().to_string(), t.schema()))
            .collect();
        Self {
            interpreter: Interpreter::new(provider),
            backend,
            schemas,
        }
    }

    pub fn schemas(&self) -> &HashMap<String, ResourceSchema> {
        &self.schemas
    }

    fn provider(&self) -> &dyn Provider {
        self.interpreter.provider().as_ref()
    }

    /// Validate every resource and return them in dependency order
    pub fn validate(&self, config: &Config) -> CliResult<Vec<Resource>> {
        let resources = config.resources()?;
        let mut errors = Vec::new();

        for resource in &resources {
            let Some(schema) = self.schemas.get(&resource.id.resource_type) else {
                errors.push(format!(
                    "{}: unknown resource type '{}'",
                    resource.id, resource.id.resource_type
                ));
                continue;
            };
            if resource.read_only {
                if read_only_identifier(resource).is_none() {
                    errors.push(format!(
                        "{}: read-only resources need a string '{}' attribute",
                        resource.id, IDENTIFIER_ATTRIBUTE
                    ));
                }
                continue;
            }
            if let Err(type_errors) = schema.validate(&resource.attributes) {
                for error in type_errors {
                    errors.push(format!("{}: {}", resource.id, error));
                }
            }
        }

        if !errors.is_empty() {
            return Err(CliError::Validation(errors.join("\n")));
        }
        Ok(deps::sort_by_dependencies(&resources)?)
    }

    pub async fn read_state(&self) -> CliResult<StateFile> {
        Ok(self.backend.read_state().await?.unwrap_or_default())
    }

    /// Read the current state of every desired and recorded resource
    async fn refresh(
        &self,
        desired: &[Resource],
        state: &StateFile,
    ) -> CliResult<HashMap<ResourceId, State>> {
        let mut current = HashMap::new();
        for resource in desired {
            let identifier = if resource.read_only {
                read_only_identifier(resource).map(str::to_string)
            } else {
                state
                    .find_resource(&resource.id)
                    .and_then(|r| r.identifier.clone())
            };
            let found = self
                .provider()
                .read(&resource.id, identifier.as_deref())
                .await?;
            current.insert(resource.id.clone(), found);
        }

        for recorded in &state.resources {
            let id = recorded.id();
            if current.contains_key(&id) {
                continue;
            }
            let found = self
                .provider()
                .read(&id, recorded.identifier.as_deref())
                .await?;
            current.insert(id, found);
        }
        Ok(current)
    }

    /// Diff the configuration against refreshed state
    ///
    /// Attributes of resources planned for replacement are unknown until
    /// they are re-created, so references to them stay unresolved and their
    /// dependents are planned as changed too.
    pub async fn plan(&self, config: &Config) -> CliResult<PreparedPlan> {
        let desired = self.validate(config)?;
        let state = self.read_state().await?;
        let current = self.refresh(&desired, &state).await?;

        let mut replaced: HashSet<ResourceId> = HashSet::new();
        let (full, bindings) = loop {
            let known: HashMap<ResourceId, State> = current
                .iter()
                .filter(|(id, _)| !replaced.contains(*id))
                .map(|(id, s)| (id.clone(), s.clone()))
                .collect();
            let bindings = deps::bindings_from(&desired, &known);
            let resolved: Vec<Resource> = desired
                .iter()
                .map(|r| deps::resolve_resource(r, &bindings))
                .collect();

            let full = create_plan(&resolved, &current, &self.schemas);
            let before = replaced.len();
            replaced.extend(
                full.effects()
                    .iter()
                    .filter(|e| matches!(e, Effect::Replace { .. }))
                    .map(|e| e.resource_id().clone()),
            );
            if replaced.len() == before {
                break (full, bindings);
            }
        };

        let mut plan = Plan::new();
        for effect in full.effects() {
            if let Effect::Delete { id, .. } = effect
                && state.find_resource(id).is_some_and(|r| r.protected)
            {
                log::warn!("{} is protected and stays although it is no longer configured", id);
                continue;
            }
            plan.add(effect.clone());
        }

        Ok(PreparedPlan {
            plan,
            current,
            bindings,
            state,
        })
    }

    /// Plan and, once `approve` accepts the plan, apply it.
    ///
    /// Returns `None` when the plan was not approved.
    pub async fn apply<F>(&self, config: &Config, approve: F) -> CliResult<Option<ApplyReport>>
    where
        F: FnOnce(&Plan, &HashMap<String, ResourceSchema>) -> CliResult<bool>,
    {
        let lock = self.backend.acquire_lock("apply").await?;
        let result = self.apply_locked(config, approve).await;
        self.release(&lock, result).await
    }

    async fn apply_locked<F>(&self, config: &Config, approve: F) -> CliResult<Option<ApplyReport>>
    where
        F: FnOnce(&Plan, &HashMap<String, ResourceSchema>) -> CliResult<bool>,
    {
        let mut prepared = self.plan(config).await?;
        let approved = approve(&prepared.plan, &self.schemas)?;
        if prepared.plan.is_empty() {
            self.prune(&mut prepared.state, &prepared.current).await?;
            return Ok(Some(ApplyReport::default()));
        }
        if !approved {
            return Ok(None);
        }
        self.execute(config, prepared).await.map(Some)
    }

    async fn execute(&self, config: &Config, prepared: PreparedPlan) -> CliResult<ApplyReport> {
        let PreparedPlan {
            plan,
            current,
            mut bindings,
            mut state,
        } = prepared;
        self.prune(&mut state, &current).await?;

        let mut report = ApplyReport::default();

        for effect in plan.effects() {
            let effect = resolve_effect(effect, &bindings);
            let unresolved = effect_resource(&effect)
                .is_some_and(|r| r.attributes.values().any(Value::contains_ref));
            if unresolved {
                println!(
                    "  {} {} - depends on a resource that was not applied",
                    "✗".red(),
                    format_effect(&effect)
                );
                report.failed += 1;
                continue;
            }

            match self.interpreter.execute_effect(&effect).await {
                Ok(outcome) => {
                    println!("  {} {}", "✓".green(), format_effect(&effect));
                    report.succeeded += 1;
                    self.record(config, &mut state, &mut bindings, &effect, outcome)
                        .await?;
                }
                Err(e) => {
                    println!("  {} {} - {}", "✗".red(), format_effect(&effect), e);
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }

    /// Fold an effect's outcome into bindings and the state file
    async fn record(
        &self,
        config: &Config,
        state: &mut StateFile,
        bindings: &mut Bindings,
        effect: &Effect,
        outcome: EffectOutcome,
    ) -> CliResult<()> {
        match outcome {
            EffectOutcome::Read { state: read } => {
                if let Some(resource) = effect_resource(effect) {
                    deps::record_binding(bindings, resource, &read);
                }
                Ok(())
            }
            EffectOutcome::Created { state: applied }
            | EffectOutcome::Updated { state: applied }
            | EffectOutcome::Replaced { state: applied } => {
                if let Some(resource) = effect_resource(effect) {
                    deps::record_binding(bindings, resource, &applied);
                }
                let mut recorded = ResourceState::from_state(&applied, self.provider().name())
                    .with_protected(config.is_protected(&applied.id));
                if recorded.identifier.is_none()
                    && let Some(previous) = state.find_resource(&applied.id)
                {
                    recorded.identifier = previous.identifier.clone();
                }
                state.upsert_resource(recorded);
                self.save(state).await
            }
            EffectOutcome::Deleted { id } => {
                state.remove_resource(&id);
                self.save(state).await
            }
            EffectOutcome::Skipped { .. } => Ok(()),
        }
    }

    /// Drop recorded resources that no longer exist
    async fn prune(
        &self,
        state: &mut StateFile,
        current: &HashMap<ResourceId, State>,
    ) -> CliResult<()> {
        let gone: Vec<ResourceId> = state
            .resources
            .iter()
            .map(ResourceState::id)
            .filter(|id| current.get(id).is_some_and(|s| !s.exists))
            .collect();
        if gone.is_empty() {
            return Ok(());
        }
        for id in &gone {
            log::info!("{} no longer exists, removing it from state", id);
            state.remove_resource(id);
        }
        self.save(state).await
    }

    async fn save(&self, state: &mut StateFile) -> CliResult<()> {
        save(self.backend.as_ref(), state).await
    }

    async fn release<T>(&self, lock: &LockInfo, result: CliResult<T>) -> CliResult<T> {
        release(self.backend.as_ref(), lock, result).await
    }

    /// Delete every recorded resource that is not protected, newest first
    pub async fn destroy<F>(&self, approve: F) -> CliResult<Option<ApplyReport>>
    where
        F: FnOnce(&Plan) -> CliResult<bool>,
    {
        let lock = self.backend.acquire_lock("destroy").await?;
        let result = self.destroy_locked(approve).await;
        self.release(&lock, result).await
    }

    async fn destroy_locked<F>(&self, approve: F) -> CliResult<Option<ApplyReport>>
    where
        F: FnOnce(&Plan) -> CliResult<bool>,
    {
        let mut state = self.read_state().await?;
        let current = self.refresh(&[], &state).await?;
        self.prune(&mut state, &current).await?;

        let mut targets = Vec::new();
        for recorded in &state.resources {
            if recorded.protected {
                println!(
                    "  {} {} is protected and will be kept",
                    "!".yellow(),
                    recorded.id()
                );
                continue;
            }
            if let Some(found) = current.get(&recorded.id()) {
                targets.push(found.clone());
            }
        }

        let plan = destroy_plan(&targets);
        if !approve(&plan)? {
            return Ok(None);
        }

        let mut report = ApplyReport::default();
        for effect in plan.effects() {
            match self.interpreter.execute_effect(effect).await {
                Ok(EffectOutcome::Deleted { id }) => {
                    println!("  {} {}", "✓".green(), format_effect(effect));
                    report.succeeded += 1;
                    state.remove_resource(&id);
                    self.save(&mut state).await?;
                }
                Ok(_) => report.succeeded += 1,
                Err(e) => {
                    println!("  {} {} - {}", "✗".red(), format_effect(effect), e);
                    report.failed += 1;
                }
            }
        }
        Ok(Some(report))
    }

    /// Adopt an existing object into state
    pub async fn import(
        &self,
        config: &Config,
        id: &ResourceId,
        identifier: &str,
    ) -> CliResult<State> {
        if !self.schemas.contains_key(&id.resource_type) {
            return Err(CliError::Usage(format!(
                "Unknown resource type '{}'",
                id.resource_type
            )));
        }

        let lock = self.backend.acquire_lock("import").await?;
        let result = self.import_locked(config, id, identifier).await;
        self.release(&lock, result).await
    }

    async fn import_locked(
        &self,
        config: &Config,
        id: &ResourceId,
        identifier: &str,
    ) -> CliResult<State> {
        let mut state = self.read_state().await?;
        if let Some(existing) = state.find_resource(id) {
            return Err(CliError::Usage(format!(
                "{} is already managed (identifier {})",
                id,
                existing.identifier.as_deref().unwrap_or("unknown")
            )));
        }

        let imported = self.provider().import(id, identifier).await?;
        state.upsert_resource(
            ResourceState::from_state(&imported, self.provider().name())
                .with_protected(config.is_protected(id)),
        );
        self.save(&mut state).await?;
        Ok(imported)
    }
}

async fn save(backend: &dyn StateBackend, state: &mut StateFile) -> CliResult<()> {
    state.increment_serial();
    backend.write_state(state).await?;
    Ok(())
}

/// Release the lock, keeping the first error
async fn release<T>(
    backend: &dyn StateBackend,
    lock: &LockInfo,
    result: CliResult<T>,
) -> CliResult<T> {
    let released = backend.release_lock(lock).await;
    match (result, released) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(e)) => Err(e.into()),
        (Err(e), released) => {
            if let Err(release_error) = released {
                log::warn!("failed to release state lock {}: {}", lock.id, release_error);
            }
            Err(e)
        }
    }
}

/// Forget a resource without deleting it
pub async fn remove_from_state(
    backend: &dyn StateBackend,
    id: &ResourceId,
) -> CliResult<ResourceState> {
    let lock = backend.acquire_lock("state rm").await?;
    let result = async {
        let mut state = backend.read_state().await?.unwrap_or_default();
        let removed = state
            .remove_resource(id)
            .ok_or_else(|| CliError::Usage(format!("{} is not in state", id)))?;
        save(backend, &mut state).await?;
        Ok::<_, CliError>(removed)
    }
    .await;
    release(backend, &lock, result).await
}

fn read_only_identifier(resource: &Resource) -> Option<&str> {
    resource
        .attributes
        .get(IDENTIFIER_ATTRIBUTE)
        .and_then(Value::as_str)
}

/// Resource carried by a create, update, replace or read
fn effect_resource(effect: &Effect) -> Option<&Resource> {
    match effect {
        Effect::Read { resource } | Effect::Create(resource) => Some(resource),
        Effect::Update { to, .. } | Effect::Replace { to, .. } => Some(to),
        Effect::Delete { .. } => None,
    }
}

/// Resolve references against bindings known so far
fn resolve_effect(effect: &Effect, bindings: &Bindings) -> Effect {
    match effect {
        Effect::Create(resource) => Effect::Create(deps::resolve_resource(resource, bindings)),
        Effect::Update { id, from, to } => Effect::Update {
            id: id.clone(),
            from: from.clone(),
            to: deps::resolve_resource(to, bindings),
        },
        Effect::Replace { id, from, to } => Effect::Replace {
            id: id.clone(),
            from: from.clone(),
            to: deps::resolve_resource(to, bindings),
        },
        other => other.clone(),
    }
}
