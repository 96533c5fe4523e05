//! Shared services and the factory every configuration is created through.

use crate::build_operation::{BuildOperationListener, BuildOperationRunner};
use crate::configuration::{Configuration, StrategySlot};
use crate::context::DomainObjectContext;
use crate::error::ConfigurationResult;
use crate::problems::{CollectingProblemReporter, ProblemReporter};
use crate::resolver::{ConfigurationResolver, DependencyLockingProvider, NoDependencyLocking};
use crate::role::ConfigurationRole;
use crate::settings::DependencyManagementSettings;
use crate::strategy::{ResolutionStrategy, ResolutionStrategyFactory};
use std::sync::{Arc, Weak};

/// The registry a configuration belongs to.
pub trait ConfigurationsProvider: Send + Sync {
    fn all(&self) -> ConfigurationResult<Vec<Configuration>>;

    fn find_by_name(&self, name: &str) -> ConfigurationResult<Option<Configuration>>;
}

/// Collaborators shared by the configurations of a container.
#[derive(Clone)]
pub struct ConfigurationServices {
    pub resolver: Arc<dyn ConfigurationResolver>,
    pub locking: Arc<dyn DependencyLockingProvider>,
    pub problems: Arc<dyn ProblemReporter>,
    pub build_operations: BuildOperationRunner,
    pub settings: Arc<DependencyManagementSettings>,
    pub strategy_factory: ResolutionStrategyFactory,
}

impl ConfigurationServices {
    /// Services with default settings, no dependency locking, no build
    /// operation listener and problems collected in memory.
    pub fn new(resolver: Arc<dyn ConfigurationResolver>) -> Self {
        let settings = DependencyManagementSettings::default();
        Self {
            resolver,
            locking: Arc::new(NoDependencyLocking),
            problems: Arc::new(CollectingProblemReporter::new()),
            build_operations: BuildOperationRunner::new(),
            strategy_factory: ResolutionStrategy::factory(settings.clone()),
            settings: Arc::new(settings),
        }
    }

    /// Use `settings`, rebuilding the default strategy factory from them.
    pub fn with_settings(mut self, settings: DependencyManagementSettings) -> Self {
        self.strategy_factory = ResolutionStrategy::factory(settings.clone());
        self.settings = Arc::new(settings);
        self
    }

    pub fn with_problems(mut self, problems: Arc<dyn ProblemReporter>) -> Self {
        self.problems = problems;
        self
    }

    pub fn with_locking(mut self, locking: Arc<dyn DependencyLockingProvider>) -> Self {
        self.locking = locking;
        self
    }

    pub fn with_build_operation_listener(mut self, listener: Arc<dyn BuildOperationListener>) -> Self {
        self.build_operations = BuildOperationRunner::with_listener(listener);
        self
    }

    pub fn with_strategy_factory(mut self, factory: ResolutionStrategyFactory) -> Self {
        self.strategy_factory = factory;
        self
    }
}

/// Creates configurations. Held by the container and by every configuration
/// it creates, so copies are built the same way.
pub struct ConfigurationFactory {
    services: ConfigurationServices,
}

impl ConfigurationFactory {
    pub fn new(services: ConfigurationServices) -> Arc<Self> {
        Arc::new(Self { services })
    }

    pub fn services(&self) -> &ConfigurationServices {
        &self.services
    }

    /// Create `name` in `context`. `provider` is `None` for detached
    /// configurations.
    pub(crate) fn create(
        self: &Arc<Self>,
        name: &str,
        context: &DomainObjectContext,
        provider: Option<Weak<dyn ConfigurationsProvider>>,
        strategy: StrategySlot,
        role: ConfigurationRole,
        lock_usage: bool,
    ) -> Configuration {
        tracing::debug!(
            configuration = %context.identity_path(name),
            role = %role,
            locked = lock_usage,
            detached = provider.is_none(),
            "creating configuration"
        );
        Configuration::new(
            name,
            context.clone(),
            provider,
            self.clone(),
            strategy,
            role,
            lock_usage,
        )
    }

    pub(crate) fn default_strategy(&self) -> StrategySlot {
        StrategySlot::Pending(self.services.strategy_factory.clone())
    }
}

impl std::fmt::Debug for ConfigurationFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigurationFactory").finish_non_exhaustive()
    }
}
