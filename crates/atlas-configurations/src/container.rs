//! The registry that names, creates and detaches configurations.

use crate::configuration::Configuration;
use crate::context::DomainObjectContext;
use crate::dependency::Dependency;
use crate::error::{ConfigurationError, ConfigurationResult};
use crate::factory::{ConfigurationFactory, ConfigurationServices, ConfigurationsProvider};
use crate::problems::Problem;
use crate::role::ConfigurationRole;
use indexmap::map::Entry as MapEntry;
use indexmap::IndexMap;
use parking_lot::Mutex;
use regex::Regex;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock, Weak};

const DETACHED_CONFIGURATION_DEFAULT_NAME: &str = "detachedConfiguration";

static RESERVED_NAMES: OnceLock<Regex> = OnceLock::new();

/// Names taken by detached configurations.
///
/// # Panics
/// Panics if the built-in pattern does not compile
fn reserved_names() -> &'static Regex {
    RESERVED_NAMES.get_or_init(|| {
        Regex::new(r"^detachedConfiguration\d*$").expect("reserved configuration name pattern is valid")
    })
}

/// Kind a configuration is registered with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigurationKind {
    Legacy,
    Consumable,
    Resolvable,
    DependencyScope,
}

impl ConfigurationKind {
    pub fn role(self) -> ConfigurationRole {
        match self {
            ConfigurationKind::Legacy => ConfigurationRole::LEGACY,
            ConfigurationKind::Consumable => ConfigurationRole::CONSUMABLE,
            ConfigurationKind::Resolvable => ConfigurationRole::RESOLVABLE,
            ConfigurationKind::DependencyScope => ConfigurationRole::DEPENDENCY_SCOPE,
        }
    }

    /// Whether a configuration of this kind may ever be consumable. Only
    /// legacy configurations can change their usage after creation.
    fn may_be_consumable(self) -> bool {
        matches!(self, ConfigurationKind::Legacy | ConfigurationKind::Consumable)
    }
}

type ConfigureAction = Box<dyn FnOnce(&Configuration) -> ConfigurationResult<()> + Send>;

enum Entry {
    Realized(Configuration),
    Pending {
        kind: ConfigurationKind,
        actions: Vec<ConfigureAction>,
    },
}

struct ContainerInner {
    context: DomainObjectContext,
    factory: Arc<ConfigurationFactory>,
    entries: Mutex<IndexMap<String, Entry>>,
    detached_counter: AtomicUsize,
    self_ref: Weak<ContainerInner>,
}

impl ContainerInner {
    fn provider(&self) -> Weak<dyn ConfigurationsProvider> {
        self.self_ref.clone()
    }

    /// Realize `name` if it was registered lazily, then run its pending
    /// configure actions.
    fn realize(&self, name: &str) -> ConfigurationResult<Option<Configuration>> {
        let (configuration, actions) = {
            let mut entries = self.entries.lock();
            let Some(entry) = entries.get_mut(name) else {
                return Ok(None);
            };
            match entry {
                Entry::Realized(configuration) => return Ok(Some(configuration.clone())),
                Entry::Pending { kind, actions } => {
                    let actions = std::mem::take(actions);
                    let configuration = self.factory.create(
                        name,
                        &self.context,
                        Some(self.provider()),
                        self.factory.default_strategy(),
                        kind.role(),
                        true,
                    );
                    *entry = Entry::Realized(configuration.clone());
                    (configuration, actions)
                }
            }
        };
        tracing::debug!(configuration = %configuration.identity_path(), "realized configuration");
        for action in actions {
            if let Err(error) = action(&configuration) {
                tracing::debug!(configuration = %name, %error, "configure action failed");
                return Err(error);
            }
        }
        Ok(Some(configuration))
    }

    fn names(&self) -> Vec<String> {
        self.entries.lock().keys().cloned().collect()
    }

    fn realize_all(&self) -> ConfigurationResult<Vec<Configuration>> {
        let mut configurations = Vec::new();
        for name in self.names() {
            configurations.extend(self.realize(&name)?);
        }
        Ok(configurations)
    }
}

impl ConfigurationsProvider for ContainerInner {
    fn all(&self) -> ConfigurationResult<Vec<Configuration>> {
        self.realize_all()
    }

    fn find_by_name(&self, name: &str) -> ConfigurationResult<Option<Configuration>> {
        self.realize(name)
    }
}

/// The configurations of one project or script.
///
/// Names are unique. Configurations with a locked role are registered lazily
/// and created on first access; everything else is created eagerly.
#[derive(Clone)]
pub struct ConfigurationContainer {
    inner: Arc<ContainerInner>,
}

impl ConfigurationContainer {
    pub fn new(context: DomainObjectContext, services: ConfigurationServices) -> Self {
        Self::with_factory(context, ConfigurationFactory::new(services))
    }

    pub fn with_factory(context: DomainObjectContext, factory: Arc<ConfigurationFactory>) -> Self {
        let inner = Arc::new_cyclic(|self_ref| ContainerInner {
            context,
            factory,
            entries: Mutex::new(IndexMap::new()),
            detached_counter: AtomicUsize::new(1),
            self_ref: self_ref.clone(),
        });
        Self { inner }
    }

    pub fn context(&self) -> &DomainObjectContext {
        &self.inner.context
    }

    pub fn factory(&self) -> &Arc<ConfigurationFactory> {
        &self.inner.factory
    }

    fn fail<T>(&self, label: impl Into<String>, error: ConfigurationError) -> ConfigurationResult<T> {
        self.inner
            .factory
            .services()
            .problems
            .report(Problem::error(label).with_cause(&error));
        Err(error)
    }

    /// Claim `name` and insert the entry built by `make`. The name checks and
    /// the insert happen under one lock.
    fn insert_new<T>(&self, name: &str, make: impl FnOnce() -> (Entry, T)) -> ConfigurationResult<T> {
        let rejected = {
            let mut entries = self.inner.entries.lock();
            if reserved_names().is_match(name) {
                ConfigurationError::ReservedName(name.to_string())
            } else {
                match entries.entry(name.to_string()) {
                    MapEntry::Occupied(_) => ConfigurationError::AlreadyExists(name.to_string()),
                    MapEntry::Vacant(slot) => {
                        let (entry, value) = make();
                        slot.insert(entry);
                        return Ok(value);
                    }
                }
            }
        };
        self.fail(format!("Creating configuration '{name}'"), rejected)
    }

    fn create_unlocked(&self, name: &str, role: ConfigurationRole) -> ConfigurationResult<Configuration> {
        self.insert_new(name, || {
            let configuration = self.inner.factory.create(
                name,
                &self.inner.context,
                Some(self.inner.provider()),
                self.inner.factory.default_strategy(),
                role,
                false,
            );
            (Entry::Realized(configuration.clone()), configuration)
        })
    }

    fn register(&self, name: &str, kind: ConfigurationKind) -> ConfigurationResult<NamedConfigurationProvider> {
        self.insert_new(name, || {
            let pending = Entry::Pending {
                kind,
                actions: Vec::new(),
            };
            (pending, ())
        })?;
        tracing::debug!(configuration = %self.inner.context.identity_path(name), ?kind, "registered configuration");
        Ok(NamedConfigurationProvider {
            container: self.clone(),
            name: name.to_string(),
        })
    }

    // Legacy factories

    /// Create a configuration with the legacy role, which permits every
    /// usage and can be changed freely.
    pub fn create(&self, name: &str) -> ConfigurationResult<Configuration> {
        self.create_unlocked(name, ConfigurationRole::LEGACY)
    }

    /// Create a legacy configuration and configure it.
    pub fn create_with(
        &self,
        name: &str,
        configure: impl FnOnce(&Configuration) -> ConfigurationResult<()>,
    ) -> ConfigurationResult<Configuration> {
        let configuration = self.create(name)?;
        configure(&configuration)?;
        Ok(configuration)
    }

    /// The configuration called `name`, created with the legacy role if
    /// missing.
    pub fn maybe_create(&self, name: &str) -> ConfigurationResult<Configuration> {
        match self.find_by_name(name)? {
            Some(configuration) => Ok(configuration),
            None => self.create(name),
        }
    }

    // Locked factories

    pub fn resolvable(&self, name: &str) -> ConfigurationResult<NamedConfigurationProvider> {
        self.register(name, ConfigurationKind::Resolvable)
    }

    pub fn consumable(&self, name: &str) -> ConfigurationResult<NamedConfigurationProvider> {
        self.register(name, ConfigurationKind::Consumable)
    }

    pub fn dependency_scope(&self, name: &str) -> ConfigurationResult<NamedConfigurationProvider> {
        self.register(name, ConfigurationKind::DependencyScope)
    }

    // Unlocked factories

    pub fn resolvable_unlocked(&self, name: &str) -> ConfigurationResult<Configuration> {
        self.create_unlocked(name, ConfigurationRole::RESOLVABLE)
    }

    pub fn consumable_unlocked(&self, name: &str) -> ConfigurationResult<Configuration> {
        self.create_unlocked(name, ConfigurationRole::CONSUMABLE)
    }

    pub fn dependency_scope_unlocked(&self, name: &str) -> ConfigurationResult<Configuration> {
        self.create_unlocked(name, ConfigurationRole::DEPENDENCY_SCOPE)
    }

    pub fn resolvable_dependency_scope_unlocked(&self, name: &str) -> ConfigurationResult<Configuration> {
        self.create_unlocked(name, ConfigurationRole::RESOLVABLE_DEPENDENCY_SCOPE)
    }

    /// Create a configuration with one of the migration roles.
    pub fn migrating_unlocked(&self, name: &str, role: ConfigurationRole) -> ConfigurationResult<Configuration> {
        if !role.is_migration_role() {
            return self.fail(
                format!("Creating configuration '{name}'"),
                ConfigurationError::UnknownMigrationRole(role.to_string()),
            );
        }
        self.create_unlocked(name, role)
    }

    pub fn maybe_create_resolvable_unlocked(&self, name: &str) -> ConfigurationResult<Configuration> {
        self.maybe_create_with_role(name, ConfigurationRole::RESOLVABLE, true)
    }

    pub fn maybe_create_consumable_unlocked(&self, name: &str) -> ConfigurationResult<Configuration> {
        self.maybe_create_with_role(name, ConfigurationRole::CONSUMABLE, true)
    }

    /// Like the other `maybe_create` variants; `verify_existing` can be
    /// turned off to accept an existing configuration whatever its usage.
    pub fn maybe_create_dependency_scope_unlocked(
        &self,
        name: &str,
        verify_existing: bool,
    ) -> ConfigurationResult<Configuration> {
        self.maybe_create_with_role(name, ConfigurationRole::DEPENDENCY_SCOPE, verify_existing)
    }

    pub fn maybe_create_resolvable_dependency_scope_unlocked(&self, name: &str) -> ConfigurationResult<Configuration> {
        self.maybe_create_with_role(name, ConfigurationRole::RESOLVABLE_DEPENDENCY_SCOPE, true)
    }

    pub fn maybe_create_migrating_unlocked(
        &self,
        name: &str,
        role: ConfigurationRole,
    ) -> ConfigurationResult<Configuration> {
        match self.find_by_name(name)? {
            Some(existing) => self.verify_existing_usage(existing, role),
            None => self.migrating_unlocked(name, role),
        }
    }

    fn maybe_create_with_role(
        &self,
        name: &str,
        role: ConfigurationRole,
        verify_existing: bool,
    ) -> ConfigurationResult<Configuration> {
        if let Some(existing) = self.find_by_name(name)? {
            if verify_existing {
                return self.verify_existing_usage(existing, role);
            }
            return Ok(existing);
        }
        if !ConfigurationRole::MAYBE_CREATE_ROLES.contains(&role) {
            return self.fail(
                format!("Creating configuration '{name}'"),
                ConfigurationError::InvalidMaybeCreateRole(role.to_string()),
            );
        }
        self.create_unlocked(name, role)
    }

    /// Accept `existing` for a request for `role`. A legacy configuration
    /// is switched over to the role with a warning; any other usage
    /// mismatch fails.
    fn verify_existing_usage(
        &self,
        existing: Configuration,
        role: ConfigurationRole,
    ) -> ConfigurationResult<Configuration> {
        let current = existing.usage_role();
        if current.has_same_usage(&role) {
            return Ok(existing);
        }
        if existing.role_at_creation().is_legacy() && existing.usage_can_be_mutated() {
            self.inner.factory.services().problems.report(
                Problem::warning(format!(
                    "Configuration '{}' already exists and is being repurposed as a {} configuration",
                    existing.name(),
                    role.name()
                ))
                .with_details(format!("Its usage was:\n{}", current.describe_usage())),
            );
            existing.set_allowed_usage_from_role(&role)?;
            return Ok(existing);
        }
        self.fail(
            format!("Requesting configuration '{}' as {}", existing.name(), role.name()),
            ConfigurationError::UnexpectedUsage {
                name: existing.name().to_string(),
                current_usage: current.describe_usage(),
                requested_role: role.name().to_string(),
            },
        )
    }

    // Direct additions

    pub fn add(&self, configuration: &Configuration) -> ConfigurationResult<()> {
        self.fail(
            format!("Adding {}", configuration.display_name()),
            ConfigurationError::DirectAdd("Adding a configuration".to_string()),
        )
    }

    pub fn add_all(&self, _configurations: &[Configuration]) -> ConfigurationResult<()> {
        self.fail(
            "Adding configurations",
            ConfigurationError::DirectAdd("Adding a collection of configurations".to_string()),
        )
    }

    pub fn add_later(&self, provider: &NamedConfigurationProvider) -> ConfigurationResult<()> {
        self.fail(
            format!("Adding configuration provider '{}'", provider.name()),
            ConfigurationError::DirectAdd("Adding a configuration provider".to_string()),
        )
    }

    // Detached configurations

    /// A configuration outside of this container, holding copies of
    /// `dependencies`. Detached configurations are named
    /// `detachedConfiguration1`, `detachedConfiguration2`, ...
    pub fn detached_configuration(&self, dependencies: &[Dependency]) -> ConfigurationResult<Configuration> {
        let name = format!(
            "{DETACHED_CONFIGURATION_DEFAULT_NAME}{}",
            self.inner.detached_counter.fetch_add(1, Ordering::SeqCst)
        );
        let configuration = self.inner.factory.create(
            &name,
            &self.inner.context,
            None,
            self.inner.factory.default_strategy(),
            ConfigurationRole::LEGACY_TO_RESOLVABLE_DEPENDENCY_SCOPE,
            false,
        );
        for dependency in dependencies {
            configuration.add_dependency(dependency.clone())?;
        }
        Ok(configuration)
    }

    // Lookup

    /// The configuration called `name`, realizing it if needed.
    pub fn find_by_name(&self, name: &str) -> ConfigurationResult<Option<Configuration>> {
        self.inner.realize(name)
    }

    pub fn get_by_name(&self, name: &str) -> ConfigurationResult<Configuration> {
        match self.find_by_name(name)? {
            Some(configuration) => Ok(configuration),
            None => self.fail(
                format!("Looking up configuration '{name}'"),
                ConfigurationError::UnknownConfiguration(name.to_string()),
            ),
        }
    }

    /// Provider for a configuration already in the container.
    pub fn named(&self, name: &str) -> ConfigurationResult<NamedConfigurationProvider> {
        if self.contains(name) {
            return Ok(NamedConfigurationProvider {
                container: self.clone(),
                name: name.to_string(),
            });
        }
        self.fail(
            format!("Looking up configuration '{name}'"),
            ConfigurationError::UnknownConfiguration(name.to_string()),
        )
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.entries.lock().contains_key(name)
    }

    /// Names in registration order, without realizing anything.
    pub fn names(&self) -> Vec<String> {
        self.inner.names()
    }

    pub fn len(&self) -> usize {
        self.inner.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.lock().is_empty()
    }

    /// Every configuration, realizing lazy registrations. Fails with the
    /// first configure action that fails.
    pub fn all(&self) -> ConfigurationResult<Vec<Configuration>> {
        self.inner.realize_all()
    }

    /// Visit the consumable configurations. Lazy registrations whose kind
    /// can never be consumable are skipped without realizing them.
    pub fn visit_consumable(&self, mut visitor: impl FnMut(&Configuration)) -> ConfigurationResult<()> {
        let candidates: Vec<String> = self
            .inner
            .entries
            .lock()
            .iter()
            .filter(|(_, entry)| match entry {
                Entry::Realized(_) => true,
                Entry::Pending { kind, .. } => kind.may_be_consumable(),
            })
            .map(|(name, _)| name.clone())
            .collect();

        for name in candidates {
            if let Some(configuration) = self.inner.realize(&name)? {
                if configuration.is_can_be_consumed() {
                    visitor(&configuration);
                }
            }
        }
        Ok(())
    }

    /// Whether `name` is registered but not created yet.
    pub fn is_pending(&self, name: &str) -> bool {
        matches!(self.inner.entries.lock().get(name), Some(Entry::Pending { .. }))
    }
}

impl fmt::Debug for ConfigurationContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigurationContainer")
            .field("context", &self.inner.context.display_name())
            .field("names", &self.names())
            .finish()
    }
}

/// Handle on a configuration of a container, which may not be created yet.
#[derive(Clone)]
pub struct NamedConfigurationProvider {
    container: ConfigurationContainer,
    name: String,
}

impl NamedConfigurationProvider {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_present(&self) -> bool {
        self.container.contains(&self.name)
    }

    /// The configuration, creating it on first access.
    pub fn get(&self) -> ConfigurationResult<Configuration> {
        self.container.get_by_name(&self.name)
    }

    /// Configure the configuration once it is created, or now if it already
    /// is.
    pub fn configure(
        &self,
        action: impl FnOnce(&Configuration) -> ConfigurationResult<()> + Send + 'static,
    ) -> ConfigurationResult<()> {
        {
            let mut entries = self.container.inner.entries.lock();
            if let Some(Entry::Pending { actions, .. }) = entries.get_mut(&self.name) {
                actions.push(Box::new(action));
                return Ok(());
            }
        }
        action(&self.get()?)
    }
}

impl fmt::Debug for NamedConfigurationProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NamedConfigurationProvider")
            .field("name", &self.name)
            .finish()
    }
}
