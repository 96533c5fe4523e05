//! Resolution strategy attached to a resolvable configuration.

use crate::dependency::ModuleDependency;
use crate::error::{ConfigurationError, ConfigurationResult};
use crate::mutation::{MutationType, MutationValidator};
use crate::settings::DependencyManagementSettings;
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use std::time::Duration;

/// How version conflicts are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConflictResolution {
    /// Newest version wins.
    #[default]
    Latest,
    /// Fail the resolution.
    Strict,
}

/// Order of resolved files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Default,
    ConsumerFirst,
    DependencyFirst,
}

/// Builds a fresh strategy the first time a configuration needs one.
pub type ResolutionStrategyFactory = Arc<dyn Fn() -> ResolutionStrategy + Send + Sync>;

#[derive(Debug, Clone)]
struct StrategyState {
    conflict_resolution: ConflictResolution,
    sort_order: SortOrder,
    forced_modules: Vec<ModuleDependency>,
    cache_dynamic_versions_for: Duration,
    cache_changing_modules_for: Duration,
    dependency_locking: bool,
    resolve_graph_to_determine_task_dependencies: bool,
    keep_state_required_for_graph_resolution: bool,
    /// Rules compiled for graph resolution, dropped once the graph is done.
    graph_state: Option<Vec<String>>,
}

impl Default for StrategyState {
    fn default() -> Self {
        Self {
            conflict_resolution: ConflictResolution::Latest,
            sort_order: SortOrder::Default,
            forced_modules: Vec::new(),
            cache_dynamic_versions_for: Duration::from_secs(24 * 60 * 60),
            cache_changing_modules_for: Duration::from_secs(24 * 60 * 60),
            dependency_locking: false,
            resolve_graph_to_determine_task_dependencies: false,
            keep_state_required_for_graph_resolution: false,
            graph_state: Some(Vec::new()),
        }
    }
}

/// Tunes how a configuration is resolved. Every setter is a `Strategy`
/// mutation of the owning configuration.
pub struct ResolutionStrategy {
    state: Mutex<StrategyState>,
    validator: Mutex<Option<Weak<dyn MutationValidator>>>,
}

impl Default for ResolutionStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ResolutionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolutionStrategy")
            .field("state", &*self.state.lock())
            .finish_non_exhaustive()
    }
}

impl ResolutionStrategy {
    pub fn new() -> Self {
        Self::with_state(StrategyState::default())
    }

    /// Strategy initialised from the build's dependency management settings.
    pub fn from_settings(settings: &DependencyManagementSettings) -> Self {
        let state = StrategyState {
            conflict_resolution: if settings.fail_on_version_conflict {
                ConflictResolution::Strict
            } else {
                ConflictResolution::Latest
            },
            cache_dynamic_versions_for: Duration::from_secs(settings.cache_dynamic_versions_secs),
            cache_changing_modules_for: Duration::from_secs(settings.cache_changing_modules_secs),
            dependency_locking: settings.dependency_locking,
            resolve_graph_to_determine_task_dependencies: settings
                .resolve_graph_for_task_dependencies,
            ..StrategyState::default()
        };
        Self::with_state(state)
    }

    /// Factory producing strategies from `settings`.
    pub fn factory(settings: DependencyManagementSettings) -> ResolutionStrategyFactory {
        Arc::new(move || ResolutionStrategy::from_settings(&settings))
    }

    fn with_state(state: StrategyState) -> Self {
        Self {
            state: Mutex::new(state),
            validator: Mutex::new(None),
        }
    }

    pub(crate) fn set_mutation_validator(&self, validator: Weak<dyn MutationValidator>) {
        *self.validator.lock() = Some(validator);
    }

    fn mutate(&self, f: impl FnOnce(&mut StrategyState)) -> ConfigurationResult<()> {
        let validator = self.validator.lock().as_ref().and_then(Weak::upgrade);
        if let Some(validator) = validator {
            validator.validate_mutation(MutationType::Strategy)?;
        }
        f(&mut self.state.lock());
        Ok(())
    }

    pub fn fail_on_version_conflict(&self) -> ConfigurationResult<()> {
        self.mutate(|s| s.conflict_resolution = ConflictResolution::Strict)
    }

    pub fn conflict_resolution(&self) -> ConflictResolution {
        self.state.lock().conflict_resolution
    }

    pub fn sort_by_consumer_first(&self) -> ConfigurationResult<()> {
        self.set_sort_order(SortOrder::ConsumerFirst)
    }

    pub fn sort_by_dependency_first(&self) -> ConfigurationResult<()> {
        self.set_sort_order(SortOrder::DependencyFirst)
    }

    pub fn set_sort_order(&self, order: SortOrder) -> ConfigurationResult<()> {
        self.mutate(|s| s.sort_order = order)
    }

    pub fn sort_order(&self) -> SortOrder {
        self.state.lock().sort_order
    }

    /// Force `group:name:version` regardless of what the graph selects.
    pub fn force(&self, notation: &str) -> ConfigurationResult<()> {
        let module = match crate::dependency::Dependency::parse(notation)? {
            crate::dependency::Dependency::Module(module) if module.version.is_some() => module,
            _ => {
                return Err(ConfigurationError::notation(
                    notation,
                    "forced modules need 'group:name:version'",
                ))
            }
        };
        self.mutate(|s| {
            s.forced_modules.retain(|m| m.module_id() != module.module_id());
            if let Some(rules) = s.graph_state.as_mut() {
                rules.push(format!("force {module}"));
            }
            s.forced_modules.push(module);
        })
    }

    pub fn forced_modules(&self) -> Vec<ModuleDependency> {
        self.state.lock().forced_modules.clone()
    }

    pub fn cache_dynamic_versions_for(&self, duration: Duration) -> ConfigurationResult<()> {
        self.mutate(|s| s.cache_dynamic_versions_for = duration)
    }

    pub fn dynamic_versions_cache_duration(&self) -> Duration {
        self.state.lock().cache_dynamic_versions_for
    }

    pub fn cache_changing_modules_for(&self, duration: Duration) -> ConfigurationResult<()> {
        self.mutate(|s| s.cache_changing_modules_for = duration)
    }

    pub fn changing_modules_cache_duration(&self) -> Duration {
        self.state.lock().cache_changing_modules_for
    }

    pub fn activate_dependency_locking(&self) -> ConfigurationResult<()> {
        self.mutate(|s| s.dependency_locking = true)
    }

    pub fn deactivate_dependency_locking(&self) -> ConfigurationResult<()> {
        self.mutate(|s| s.dependency_locking = false)
    }

    pub fn is_dependency_locking_enabled(&self) -> bool {
        self.state.lock().dependency_locking
    }

    pub fn set_resolve_graph_to_determine_task_dependencies(
        &self,
        enabled: bool,
    ) -> ConfigurationResult<()> {
        self.mutate(|s| s.resolve_graph_to_determine_task_dependencies = enabled)
    }

    /// Whether build dependencies need the full graph.
    pub fn resolve_graph_to_determine_task_dependencies(&self) -> bool {
        self.state.lock().resolve_graph_to_determine_task_dependencies
    }

    pub(crate) fn set_keep_state_required_for_graph_resolution(&self, keep: bool) {
        self.state.lock().keep_state_required_for_graph_resolution = keep;
    }

    pub fn keeps_state_required_for_graph_resolution(&self) -> bool {
        self.state.lock().keep_state_required_for_graph_resolution
    }

    /// Drop the state only graph resolution needs, unless asked to keep it.
    pub fn maybe_discard_state_required_for_graph_resolution(&self) {
        let mut state = self.state.lock();
        if !state.keep_state_required_for_graph_resolution {
            state.graph_state = None;
        }
    }

    pub fn has_state_required_for_graph_resolution(&self) -> bool {
        self.state.lock().graph_state.is_some()
    }

    /// Independent copy. The copy is not attached to any configuration.
    pub fn copy(&self) -> ResolutionStrategy {
        let mut state = self.state.lock().clone();
        state.keep_state_required_for_graph_resolution = false;
        if state.graph_state.is_none() {
            state.graph_state = Some(
                state
                    .forced_modules
                    .iter()
                    .map(|module| format!("force {module}"))
                    .collect(),
            );
        }
        Self::with_state(state)
    }
}
