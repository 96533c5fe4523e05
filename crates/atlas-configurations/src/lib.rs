//! Atlas dependency configurations
//!
//! Models the named dependency buckets a build declares (`implementation`,
//! `compileClasspath`, ...) and the lifecycle that takes them from freely
//! mutable declarations to observed, resolved and memoized results:
//! - Configurations with usage roles (consumable / resolvable / declarable)
//! - Hierarchies via `extends_from` with live inherited views
//! - Observation and mutation validation
//! - Exactly-once, memoized resolution through an external resolver
//! - A container that names, registers and detaches configurations
//!
//! The graph algorithm itself lives behind [`ConfigurationResolver`].
//!
//! # Example
//!
//! ```no_run
//! use atlas_configurations::{ConfigurationContainer, ConfigurationServices, DomainObjectContext};
//! # fn resolver() -> std::sync::Arc<dyn atlas_configurations::ConfigurationResolver> { unimplemented!() }
//!
//! let context = DomainObjectContext::project(":app");
//! let services = ConfigurationServices::new(resolver());
//! let configurations = ConfigurationContainer::new(context.clone(), services);
//!
//! let implementation = configurations.dependency_scope("implementation").unwrap();
//! let classpath = configurations.resolvable("compileClasspath").unwrap();
//! classpath.get().unwrap().extends_from(&[&implementation.get().unwrap()]).unwrap();
//!
//! let _lock = context.model().lock();
//! let files = classpath.get().unwrap().files().unwrap();
//! ```

pub mod attributes;
pub mod build_operation;
pub mod calculated;
pub mod configuration;
pub mod container;
pub mod context;
pub mod dependency;
pub mod error;
pub mod factory;
pub mod host;
pub mod listeners;
pub mod mutation;
pub mod problems;
pub mod publications;
pub mod resolver;
pub mod results;
pub mod role;
pub mod settings;
pub mod strategy;

pub use attributes::{AttributeContainer, Attributes};
pub use build_operation::{
    BuildOperationContext, BuildOperationDescriptor, BuildOperationListener, BuildOperationRunner,
    ResolveConfigurationDetails, ResolveConfigurationResult,
};
pub use calculated::CalculatedModelValue;
pub use configuration::{
    ArtifactCollection, ArtifactSetView, CompositeView, Configuration, ConfigurationState, DependencyAction,
    DependencyConstraintSetView, DependencySetView, ResolvableDependencies, ResolvedConfiguration, ViewItem,
};
pub use container::{ConfigurationContainer, ConfigurationKind, NamedConfigurationProvider};
pub use context::{DomainObjectContext, IdentityPath, ModelLockGuard, ProjectModel};
pub use dependency::{
    Capability, Dependency, DependencyConstraint, ExcludeRule, ModuleDependency, PublishArtifact,
};
pub use error::{ConfigurationError, ConfigurationResult};
pub use factory::{ConfigurationFactory, ConfigurationServices, ConfigurationsProvider};
pub use host::{FailureResolutions, ResolutionHost};
pub use listeners::{DependencyResolutionListener, ListenerBroadcast};
pub use mutation::{MutationType, MutationValidator, ObservationState};
pub use problems::{CollectingProblemReporter, Problem, ProblemReporter, Severity};
pub use publications::{ConfigurationPublications, ConfigurationVariant};
pub use resolver::{ConfigurationResolver, DependencyLockingProvider, LockState, LockedModule, NoDependencyLocking};
pub use results::{
    ComponentIdentifier, FailureKind, FutureCompleteResults, MinimalResolutionResult,
    ResolveFailure, ResolvedArtifact, ResolvedComponent, ResolverResults, VisitedGraphResults,
};
pub use role::{ConfigurationRole, ProperMethodUsage};
pub use settings::{DependencyManagementSettings, SettingsError};
pub use strategy::{ConflictResolution, ResolutionStrategy, ResolutionStrategyFactory, SortOrder};
