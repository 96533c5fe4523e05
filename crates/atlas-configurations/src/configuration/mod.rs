//! The configuration entity.
//!
//! A [`Configuration`] is a cheap, clonable handle. Clones share the same
//! state; equality and hashing are by identity. State is split over several
//! small locks which are never held across calls into parents, children,
//! listeners or the resolver.

mod copy;
mod hierarchy;
mod incoming;
mod observation;
mod resolution;
mod usage;
mod views;

pub use incoming::{ArtifactCollection, ResolvableDependencies, ResolvedConfiguration};
pub use resolution::ConfigurationState;
pub use views::{ArtifactSetView, CompositeView, DependencyConstraintSetView, DependencySetView, ViewItem};

pub(crate) use hierarchy::CompositeKind;

use crate::attributes::{AttributeContainer, Attributes};
use crate::calculated::CalculatedModelValue;
use crate::context::{DomainObjectContext, IdentityPath};
use crate::dependency::{Dependency, DependencyConstraint, ExcludeRule, PublishArtifact};
use crate::error::{ConfigurationError, ConfigurationResult};
use crate::factory::{ConfigurationFactory, ConfigurationServices, ConfigurationsProvider};
use crate::listeners::{DependencyResolutionListener, ListenerBroadcast};
use crate::mutation::{MutationType, MutationValidator, ObservationState};
use crate::problems::{Problem, ProblemReporter};
use crate::publications::ConfigurationPublications;
use crate::results::ResolverResults;
use crate::role::{ConfigurationRole, ProperMethodUsage};
use crate::strategy::{ResolutionStrategy, ResolutionStrategyFactory};
use hierarchy::CompositeSources;
use indexmap::IndexSet;
use parking_lot::{Mutex, ReentrantMutex};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, AtomicUsize};
use std::sync::{Arc, Weak};

const RESOLUTION_ATTRIBUTES_REQUESTED: &str = "resolution attributes requested";

/// Action run against the own dependencies of a configuration before it is
/// resolved.
pub type DependencyAction = Arc<dyn Fn(&DependencySetView) -> ConfigurationResult<()> + Send + Sync>;

/// The resolution strategy of a configuration, created on first access.
pub(crate) enum StrategySlot {
    Pending(ResolutionStrategyFactory),
    Realized(Arc<ResolutionStrategy>),
}

/// Current usage flags.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Usage {
    pub(crate) consumable: bool,
    pub(crate) resolvable: bool,
    pub(crate) declarable: bool,
    pub(crate) consumption_deprecated: bool,
    pub(crate) resolution_deprecated: bool,
    pub(crate) declaration_deprecated: bool,
    pub(crate) mutable: bool,
}

impl Usage {
    fn from_role(role: &ConfigurationRole, lock_usage: bool) -> Self {
        Self {
            consumable: role.is_consumable(),
            resolvable: role.is_resolvable(),
            declarable: role.is_declarable(),
            consumption_deprecated: role.is_consumption_deprecated(),
            resolution_deprecated: role.is_resolution_deprecated(),
            declaration_deprecated: role.is_declaration_deprecated(),
            mutable: !lock_usage,
        }
    }

    pub(crate) fn describe(&self) -> String {
        crate::role::describe_usage(
            self.consumable,
            self.resolvable,
            self.declarable,
            self.consumption_deprecated,
            self.resolution_deprecated,
            self.declaration_deprecated,
        )
    }

    pub(crate) fn permits(&self, usage: ProperMethodUsage) -> bool {
        match usage {
            ProperMethodUsage::Consumable => self.consumable,
            ProperMethodUsage::Resolvable => self.resolvable,
            ProperMethodUsage::DeclarableAgainst => self.declarable,
        }
    }

    pub(crate) fn deprecates(&self, usage: ProperMethodUsage) -> bool {
        match usage {
            ProperMethodUsage::Consumable => self.consumption_deprecated,
            ProperMethodUsage::Resolvable => self.resolution_deprecated,
            ProperMethodUsage::DeclarableAgainst => self.declaration_deprecated,
        }
    }
}

pub(crate) struct DeclaredState {
    pub(crate) description: Option<String>,
    pub(crate) visible: bool,
    pub(crate) transitive: bool,
    pub(crate) dependencies: IndexSet<Dependency>,
    pub(crate) constraints: IndexSet<DependencyConstraint>,
    pub(crate) artifacts: IndexSet<PublishArtifact>,
    pub(crate) exclude_rules: IndexSet<ExcludeRule>,
    pub(crate) parents: Vec<Configuration>,
    pub(crate) attributes: AttributeContainer,
    pub(crate) outgoing: ConfigurationPublications,
    pub(crate) usage: Usage,
    pub(crate) default_dependency_actions: Vec<DependencyAction>,
    pub(crate) with_dependency_actions: Vec<DependencyAction>,
    pub(crate) declaration_alternatives: Vec<String>,
    pub(crate) resolution_alternatives: Vec<String>,
    pub(crate) consistent_resolution_source: Option<Configuration>,
}

pub(crate) struct ConfigurationInner {
    name: String,
    identity_path: IdentityPath,
    display_name: String,
    context: DomainObjectContext,
    provider: Option<Weak<dyn ConfigurationsProvider>>,
    factory: Arc<ConfigurationFactory>,
    role_at_creation: ConfigurationRole,
    self_ref: Weak<ConfigurationInner>,
    state: Mutex<DeclaredState>,
    observation: Mutex<ObservationState>,
    results: CalculatedModelValue<Option<Arc<ResolverResults>>>,
    listeners: Mutex<Option<ListenerBroadcast>>,
    composites: Mutex<CompositeSources>,
    strategy: Mutex<StrategySlot>,
    copy_count: AtomicUsize,
    inside_before_resolve: AtomicBool,
    children: Mutex<Vec<Weak<ConfigurationInner>>>,
    /// Serializes attribute and publication actions.
    configuring: ReentrantMutex<()>,
}

impl ConfigurationInner {
    fn handle(&self) -> Option<Configuration> {
        self.self_ref.upgrade().map(|inner| Configuration { inner })
    }
}

impl MutationValidator for ConfigurationInner {
    fn validate_mutation(&self, mutation: MutationType) -> ConfigurationResult<()> {
        match self.handle() {
            Some(configuration) => configuration.validate_mutation(mutation),
            None => Ok(()),
        }
    }
}

/// A named bucket of dependencies with a usage role.
#[derive(Clone)]
pub struct Configuration {
    inner: Arc<ConfigurationInner>,
}

impl Configuration {
    pub(crate) fn new(
        name: &str,
        context: DomainObjectContext,
        provider: Option<Weak<dyn ConfigurationsProvider>>,
        factory: Arc<ConfigurationFactory>,
        strategy: StrategySlot,
        role: ConfigurationRole,
        lock_usage: bool,
    ) -> Self {
        let identity_path = context.identity_path(name);
        let display_name = format!("configuration '{identity_path}'");
        let inner = Arc::new_cyclic(|weak: &Weak<ConfigurationInner>| {
            if let StrategySlot::Realized(strategy) = &strategy {
                let validator: Weak<dyn MutationValidator> = weak.clone();
                strategy.set_mutation_validator(validator);
            }
            ConfigurationInner {
                name: name.to_string(),
                state: Mutex::new(DeclaredState {
                    description: None,
                    visible: true,
                    transitive: true,
                    dependencies: IndexSet::new(),
                    constraints: IndexSet::new(),
                    artifacts: IndexSet::new(),
                    exclude_rules: IndexSet::new(),
                    parents: Vec::new(),
                    attributes: AttributeContainer::new(display_name.clone()),
                    outgoing: ConfigurationPublications::new(display_name.clone()),
                    usage: Usage::from_role(&role, lock_usage),
                    default_dependency_actions: Vec::new(),
                    with_dependency_actions: Vec::new(),
                    declaration_alternatives: Vec::new(),
                    resolution_alternatives: Vec::new(),
                    consistent_resolution_source: None,
                }),
                results: CalculatedModelValue::new(format!("resolution results of {display_name}"), None),
                identity_path,
                display_name,
                context,
                provider,
                factory,
                role_at_creation: role,
                self_ref: weak.clone(),
                observation: Mutex::new(ObservationState::Unobserved),
                listeners: Mutex::new(Some(ListenerBroadcast::new())),
                composites: Mutex::new(CompositeSources::default()),
                strategy: Mutex::new(strategy),
                copy_count: AtomicUsize::new(0),
                inside_before_resolve: AtomicBool::new(false),
                children: Mutex::new(Vec::new()),
                configuring: ReentrantMutex::new(()),
            }
        });
        Configuration { inner }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Path of the owning context followed by the name, e.g. `:app:compileClasspath`.
    pub fn identity_path(&self) -> &IdentityPath {
        &self.inner.identity_path
    }

    /// `configuration ':app:compileClasspath'`
    pub fn display_name(&self) -> &str {
        &self.inner.display_name
    }

    pub fn context(&self) -> &DomainObjectContext {
        &self.inner.context
    }

    pub fn role_at_creation(&self) -> ConfigurationRole {
        self.inner.role_at_creation
    }

    /// Whether this configuration lives outside of any container.
    pub fn is_detached(&self) -> bool {
        self.inner.provider.is_none()
    }

    /// Every configuration of the registry this one belongs to. A detached
    /// configuration is the only member of its own registry.
    pub fn all(&self) -> ConfigurationResult<Vec<Configuration>> {
        match self.inner.provider.as_ref().and_then(Weak::upgrade) {
            Some(provider) => provider.all(),
            None => Ok(vec![self.clone()]),
        }
    }

    pub(crate) fn services(&self) -> &ConfigurationServices {
        self.inner.factory.services()
    }

    pub(crate) fn factory(&self) -> &Arc<ConfigurationFactory> {
        &self.inner.factory
    }

    pub(crate) fn problems(&self) -> &Arc<dyn ProblemReporter> {
        &self.services().problems
    }

    /// Report `error` as a problem labelled `label` and return it.
    pub(crate) fn fail<T>(&self, label: impl Into<String>, error: ConfigurationError) -> ConfigurationResult<T> {
        self.problems().report(Problem::error(label).with_cause(&error));
        Err(error)
    }

    pub(crate) fn downgrade(&self) -> Weak<ConfigurationInner> {
        Arc::downgrade(&self.inner)
    }

    pub(crate) fn same_as(&self, inner: &Weak<ConfigurationInner>) -> bool {
        std::ptr::eq(Arc::as_ptr(&self.inner), inner.as_ptr())
    }

    // Declared state

    pub fn description(&self) -> Option<String> {
        self.inner.state.lock().description.clone()
    }

    pub fn set_description(&self, description: impl Into<String>) {
        self.inner.state.lock().description = Some(description.into());
    }

    pub fn is_visible(&self) -> bool {
        self.inner.state.lock().visible
    }

    pub fn set_visible(&self, visible: bool) -> ConfigurationResult<()> {
        self.validate_mutation(MutationType::Dependencies)?;
        self.inner.state.lock().visible = visible;
        Ok(())
    }

    pub fn is_transitive(&self) -> bool {
        self.inner.state.lock().transitive
    }

    pub fn set_transitive(&self, transitive: bool) -> ConfigurationResult<()> {
        self.validate_mutation(MutationType::Dependencies)?;
        self.inner.state.lock().transitive = transitive;
        Ok(())
    }

    /// Dependencies declared directly on this configuration.
    pub fn dependencies(&self) -> DependencySetView {
        CompositeView::own(self.clone())
    }

    /// Dependencies of this configuration and all of its parents.
    pub fn all_dependencies(&self) -> DependencySetView {
        CompositeView::inherited(self.clone())
    }

    pub fn dependency_constraints(&self) -> DependencyConstraintSetView {
        CompositeView::own(self.clone())
    }

    pub fn all_dependency_constraints(&self) -> DependencyConstraintSetView {
        CompositeView::inherited(self.clone())
    }

    /// Artifacts this configuration publishes.
    pub fn artifacts(&self) -> ArtifactSetView {
        CompositeView::own(self.clone())
    }

    pub fn all_artifacts(&self) -> ArtifactSetView {
        CompositeView::inherited(self.clone())
    }

    /// Declare `dependency`. Adding an equal dependency twice keeps one.
    pub fn add_dependency(&self, dependency: Dependency) -> ConfigurationResult<()> {
        self.assert_is_declarable("Declaring dependencies")?;
        self.validate_mutation(MutationType::Dependencies)?;
        self.inner.state.lock().dependencies.insert(dependency);
        Ok(())
    }

    /// Declare a dependency from its string notation.
    pub fn dependency(&self, notation: &str) -> ConfigurationResult<()> {
        self.add_dependency(Dependency::parse(notation)?)
    }

    pub fn remove_dependency(&self, dependency: &Dependency) -> ConfigurationResult<bool> {
        self.validate_mutation(MutationType::Dependencies)?;
        Ok(self.inner.state.lock().dependencies.shift_remove(dependency))
    }

    pub fn add_dependency_constraint(&self, constraint: DependencyConstraint) -> ConfigurationResult<()> {
        self.assert_is_declarable("Declaring dependency constraints")?;
        self.validate_mutation(MutationType::Dependencies)?;
        self.inner.state.lock().constraints.insert(constraint);
        Ok(())
    }

    /// Declare a constraint from its `group:name:version` notation.
    pub fn constraint(&self, notation: &str) -> ConfigurationResult<()> {
        self.add_dependency_constraint(DependencyConstraint::parse(notation)?)
    }

    pub fn remove_dependency_constraint(&self, constraint: &DependencyConstraint) -> ConfigurationResult<bool> {
        self.validate_mutation(MutationType::Dependencies)?;
        Ok(self.inner.state.lock().constraints.shift_remove(constraint))
    }

    /// Set an attribute on every own module dependency with the given
    /// `group:name`. Returns how many dependencies were changed.
    pub fn set_dependency_attribute(&self, module_id: &str, key: &str, value: &str) -> ConfigurationResult<usize> {
        self.validate_mutation(MutationType::DependencyAttributes)?;
        let mut state = self.inner.state.lock();
        let mut changed = 0;
        state.dependencies = state
            .dependencies
            .drain(..)
            .map(|mut dependency| {
                if let Some(module) = dependency.as_module_mut() {
                    if module.module_id() == module_id {
                        module.attributes = with_attribute(&module.attributes, key, value);
                        changed += 1;
                    }
                }
                dependency
            })
            .collect();
        Ok(changed)
    }

    /// Set an attribute on every own constraint with the given `group:name`.
    pub fn set_dependency_constraint_attribute(
        &self,
        module_id: &str,
        key: &str,
        value: &str,
    ) -> ConfigurationResult<usize> {
        self.validate_mutation(MutationType::DependencyConstraintAttributes)?;
        let mut state = self.inner.state.lock();
        let mut changed = 0;
        state.constraints = state
            .constraints
            .drain(..)
            .map(|mut constraint| {
                if constraint.module_id() == module_id {
                    constraint.attributes = with_attribute(&constraint.attributes, key, value);
                    changed += 1;
                }
                constraint
            })
            .collect();
        Ok(changed)
    }

    pub fn add_artifact(&self, artifact: PublishArtifact) -> ConfigurationResult<()> {
        self.validate_mutation(MutationType::Artifacts)?;
        self.inner.state.lock().artifacts.insert(artifact);
        Ok(())
    }

    pub fn remove_artifact(&self, artifact: &PublishArtifact) -> ConfigurationResult<bool> {
        self.validate_mutation(MutationType::Artifacts)?;
        Ok(self.inner.state.lock().artifacts.shift_remove(artifact))
    }

    pub(crate) fn own_dependencies(&self) -> Vec<Dependency> {
        self.inner.state.lock().dependencies.iter().cloned().collect()
    }

    pub(crate) fn own_constraints(&self) -> Vec<DependencyConstraint> {
        self.inner.state.lock().constraints.iter().cloned().collect()
    }

    pub(crate) fn own_artifacts(&self) -> Vec<PublishArtifact> {
        self.inner.state.lock().artifacts.iter().cloned().collect()
    }

    /// Exclude matching modules from the graph of this configuration and its
    /// children.
    pub fn exclude(&self, rule: ExcludeRule) -> ConfigurationResult<()> {
        self.validate_mutation(MutationType::Dependencies)?;
        self.inner.state.lock().exclude_rules.insert(rule);
        Ok(())
    }

    pub fn exclude_rules(&self) -> Vec<ExcludeRule> {
        self.inner.state.lock().exclude_rules.iter().cloned().collect()
    }

    /// Replace the own exclude rules. Internal API.
    pub fn set_exclude_rules(&self, rules: Vec<ExcludeRule>) -> ConfigurationResult<()> {
        self.check_proper_usage(
            "setExcludeRules(Set)",
            true,
            &[ProperMethodUsage::DeclarableAgainst, ProperMethodUsage::Resolvable],
        )?;
        self.validate_mutation(MutationType::Dependencies)?;
        self.inner.state.lock().exclude_rules = rules.into_iter().collect();
        Ok(())
    }

    // Attributes and publications

    /// Configure the attributes of this configuration.
    pub fn attributes(
        &self,
        configure: impl FnOnce(&mut AttributeContainer) -> ConfigurationResult<()>,
    ) -> ConfigurationResult<()> {
        self.check_proper_usage(
            "attributes(Action)",
            false,
            &[ProperMethodUsage::Consumable, ProperMethodUsage::Resolvable],
        )?;
        let _configuring = self.inner.configuring.lock();
        let before = self.inner.state.lock().attributes.clone();
        let mut attributes = before.clone();
        // the container is configured unlocked so the action may read this configuration
        if let Err(error) = configure(&mut attributes) {
            return self.report_frozen("attributes", error);
        }

        let mut state = self.inner.state.lock();
        if let Some(reason) = state.attributes.frozen_reason().map(str::to_string) {
            let changed = attributes
                .keys()
                .find(|key| attributes.get(key) != before.get(key))
                .map(str::to_string);
            drop(state);
            return match changed {
                Some(key) => self.fail(
                    format!("Changing the attributes of {}", self.display_name()),
                    ConfigurationError::attributes_frozen(self.display_name(), key, reason),
                ),
                None => Ok(()),
            };
        }
        state.attributes = attributes;
        Ok(())
    }

    /// Current attribute values.
    pub fn attribute_values(&self) -> Attributes {
        self.inner.state.lock().attributes.as_immutable()
    }

    /// Attributes requested when resolving. Reading them freezes the
    /// attribute container.
    pub fn resolution_attributes(&self) -> Attributes {
        let mut state = self.inner.state.lock();
        state.attributes.freeze(RESOLUTION_ATTRIBUTES_REQUESTED);
        state.attributes.as_immutable()
    }

    /// Configure the outgoing publications.
    pub fn outgoing(
        &self,
        configure: impl FnOnce(&mut ConfigurationPublications) -> ConfigurationResult<()>,
    ) -> ConfigurationResult<()> {
        let _configuring = self.inner.configuring.lock();
        let before = self.inner.state.lock().outgoing.clone();
        let mut outgoing = before.clone();
        if let Err(error) = configure(&mut outgoing) {
            return self.report_frozen("outgoing publications", error);
        }

        let mut state = self.inner.state.lock();
        if let Some(reason) = state.outgoing.frozen_reason().map(str::to_string) {
            drop(state);
            if outgoing == before {
                return Ok(());
            }
            return self.fail(
                format!("Changing the outgoing publications of {}", self.display_name()),
                ConfigurationError::publications_frozen(self.display_name(), "outgoing publications", reason),
            );
        }
        state.outgoing = outgoing;
        Ok(())
    }

    /// Read the outgoing publications.
    pub fn with_outgoing<R>(&self, read: impl FnOnce(&ConfigurationPublications) -> R) -> R {
        let outgoing = self.inner.state.lock().outgoing.clone();
        read(&outgoing)
    }

    /// Report a change rejected by frozen attributes or publications.
    /// Other errors are returned untouched.
    fn report_frozen(&self, what: &str, error: ConfigurationError) -> ConfigurationResult<()> {
        match error {
            ConfigurationError::AttributesFrozen { .. } | ConfigurationError::PublicationsFrozen { .. } => {
                self.fail(format!("Changing the {what} of {}", self.display_name()), error)
            }
            error => Err(error),
        }
    }

    // Dependency actions

    /// Run `action` before resolution, if the configuration has no
    /// dependencies by then.
    pub fn default_dependencies(
        &self,
        action: impl Fn(&DependencySetView) -> ConfigurationResult<()> + Send + Sync + 'static,
    ) -> ConfigurationResult<()> {
        self.check_proper_usage("defaultDependencies(Action)", false, &[ProperMethodUsage::DeclarableAgainst])?;
        self.validate_mutation(MutationType::Dependencies)?;
        let action: DependencyAction = Arc::new(move |dependencies: &DependencySetView| {
            if dependencies.is_empty() {
                action(dependencies)?;
            }
            Ok(())
        });
        self.inner.state.lock().default_dependency_actions.push(action);
        Ok(())
    }

    /// Run `action` against the declared dependencies before resolution.
    pub fn with_dependencies(
        &self,
        action: impl Fn(&DependencySetView) -> ConfigurationResult<()> + Send + Sync + 'static,
    ) -> ConfigurationResult<()> {
        self.validate_mutation(MutationType::Dependencies)?;
        self.inner.state.lock().with_dependency_actions.push(Arc::new(action));
        Ok(())
    }

    /// Run the pending dependency actions of this configuration and its
    /// parents. Each action runs at most once.
    pub fn run_dependency_actions(&self) -> ConfigurationResult<()> {
        self.run_in_hierarchy(|configuration| {
            let (defaults, withs) = {
                let mut state = configuration.inner.state.lock();
                (
                    std::mem::take(&mut state.default_dependency_actions),
                    std::mem::take(&mut state.with_dependency_actions),
                )
            };
            let dependencies = configuration.dependencies();
            for action in defaults.iter().chain(withs.iter()) {
                action(&dependencies)?;
            }
            Ok(())
        })
    }

    // Alternatives

    pub fn add_declaration_alternatives(&self, alternatives: &[&str]) {
        let mut state = self.inner.state.lock();
        state
            .declaration_alternatives
            .extend(alternatives.iter().map(|alternative| alternative.to_string()));
    }

    pub fn declaration_alternatives(&self) -> Vec<String> {
        self.inner.state.lock().declaration_alternatives.clone()
    }

    pub fn add_resolution_alternatives(&self, alternatives: &[&str]) {
        let mut state = self.inner.state.lock();
        state
            .resolution_alternatives
            .extend(alternatives.iter().map(|alternative| alternative.to_string()));
    }

    pub fn resolution_alternatives(&self) -> Vec<String> {
        self.inner.state.lock().resolution_alternatives.clone()
    }

    // Resolution strategy and listeners

    /// The resolution strategy, created on first access.
    pub fn resolution_strategy(&self) -> Arc<ResolutionStrategy> {
        let mut slot = self.inner.strategy.lock();
        match &*slot {
            StrategySlot::Realized(strategy) => strategy.clone(),
            StrategySlot::Pending(factory) => {
                let strategy = Arc::new(factory());
                let validator: Weak<dyn MutationValidator> = self.inner.self_ref.clone();
                strategy.set_mutation_validator(validator);
                *slot = StrategySlot::Realized(strategy.clone());
                strategy
            }
        }
    }

    /// Configure the resolution strategy.
    pub fn configure_resolution_strategy(
        &self,
        configure: impl FnOnce(&ResolutionStrategy) -> ConfigurationResult<()>,
    ) -> ConfigurationResult<()> {
        configure(&self.resolution_strategy())
    }

    pub(crate) fn realized_strategy(&self) -> Option<Arc<ResolutionStrategy>> {
        match &*self.inner.strategy.lock() {
            StrategySlot::Realized(strategy) => Some(strategy.clone()),
            StrategySlot::Pending(_) => None,
        }
    }

    pub(crate) fn strategy_for_copy(&self) -> StrategySlot {
        match &*self.inner.strategy.lock() {
            StrategySlot::Realized(strategy) => StrategySlot::Realized(Arc::new(strategy.copy())),
            StrategySlot::Pending(factory) => StrategySlot::Pending(factory.clone()),
        }
    }

    /// Register a listener for the next resolution of this configuration.
    pub fn add_resolution_listener(&self, listener: Arc<dyn DependencyResolutionListener>) {
        self.inner
            .listeners
            .lock()
            .get_or_insert_with(ListenerBroadcast::new)
            .add(listener);
    }

    /// Number of listeners waiting for the next resolution.
    pub fn pending_listener_count(&self) -> usize {
        self.inner.listeners.lock().as_ref().map_or(0, ListenerBroadcast::len)
    }

    pub(crate) fn with_listeners(&self, configure: impl FnOnce(&mut ListenerBroadcast)) {
        configure(self.inner.listeners.lock().get_or_insert_with(ListenerBroadcast::new));
    }

    pub(crate) fn listeners_snapshot(&self) -> Option<ListenerBroadcast> {
        self.inner.listeners.lock().clone()
    }
}

fn with_attribute(attributes: &Attributes, key: &str, value: &str) -> Attributes {
    attributes
        .iter()
        .filter(|(existing, _)| *existing != key)
        .chain(std::iter::once((key, value)))
        .collect()
}

impl PartialEq for Configuration {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Configuration {}

impl Hash for Configuration {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::ptr::hash(Arc::as_ptr(&self.inner), state);
    }
}

impl fmt::Display for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inner.display_name)
    }
}

impl fmt::Debug for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Configuration")
            .field("path", &self.inner.identity_path.path())
            .field("role", &self.inner.role_at_creation.name())
            .field("detached", &self.is_detached())
            .finish()
    }
}
