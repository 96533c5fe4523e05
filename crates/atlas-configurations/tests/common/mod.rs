//! Shared fixtures for the integration tests: a stub resolver that counts
//! its invocations, recording listeners and a ready-made container.

#![allow(dead_code)]

use atlas_configurations::{
    BuildOperationDescriptor, BuildOperationListener, CollectingProblemReporter, ComponentIdentifier,
    Configuration, ConfigurationContainer, ConfigurationResolver, ConfigurationServices, ConflictResolution,
    Dependency, DependencyConstraint, DependencyLockingProvider, DependencyManagementSettings,
    DependencyResolutionListener, DomainObjectContext, FailureKind, FutureCompleteResults, LockState,
    MinimalResolutionResult, ResolvableDependencies, ResolveConfigurationDetails, ResolveConfigurationResult,
    ResolveFailure, ResolvedArtifact, ResolvedComponent, ResolverResults, VisitedGraphResults,
};
use indexmap::IndexMap;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Modules in this group are never found.
pub const MISSING_GROUP: &str = "org.missing";

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Resolver resolving every declared module to itself, with one jar each.
#[derive(Default)]
pub struct StubResolver {
    graph_calls: AtomicUsize,
    build_calls: AtomicUsize,
    fail_whole_graph: AtomicBool,
    refuse: AtomicBool,
    evaluate_future: AtomicBool,
    resolved: Mutex<Vec<String>>,
    seen_constraints: Mutex<Vec<DependencyConstraint>>,
}

impl StubResolver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn graph_calls(&self) -> usize {
        self.graph_calls.load(Ordering::SeqCst)
    }

    pub fn build_calls(&self) -> usize {
        self.build_calls.load(Ordering::SeqCst)
    }

    /// Record a failure of the whole graph on every following resolution.
    pub fn fail_whole_graph(&self) {
        self.fail_whole_graph.store(true, Ordering::SeqCst);
    }

    /// Return `Err` from every following resolution.
    pub fn refuse(&self) {
        self.refuse.store(true, Ordering::SeqCst);
    }

    /// Evaluate the future complete results while computing build
    /// dependencies.
    pub fn evaluate_future(&self) {
        self.evaluate_future.store(true, Ordering::SeqCst);
    }

    /// Names of the configurations resolved, in order.
    pub fn resolved(&self) -> Vec<String> {
        self.resolved.lock().clone()
    }

    /// Synthetic constraints seen by the last graph resolution.
    pub fn seen_constraints(&self) -> Vec<DependencyConstraint> {
        self.seen_constraints.lock().clone()
    }

    fn visit(&self, configuration: &Configuration) -> Result<(VisitedGraphResults, Vec<ResolvedArtifact>), ResolveFailure> {
        let synthetic = configuration
            .synthetic_dependencies()
            .map_err(|error| ResolveFailure::other(error.to_string()))?;
        *self.seen_constraints.lock() = synthetic.clone();

        let excludes = configuration.all_exclude_rules();
        let constraints: Vec<DependencyConstraint> = configuration
            .all_dependency_constraints()
            .iter()
            .chain(synthetic)
            .collect();
        let strict_conflicts =
            configuration.resolution_strategy().conflict_resolution() == ConflictResolution::Strict;

        let mut failures = Vec::new();
        let mut modules: IndexMap<(String, String), Vec<String>> = IndexMap::new();
        let mut components = Vec::new();
        let mut artifacts = Vec::new();

        for dependency in configuration.all_dependencies().iter() {
            match dependency {
                Dependency::Module(module) => {
                    if excludes.iter().any(|rule| rule.matches(&module.group, &module.name)) {
                        continue;
                    }
                    if module.group == MISSING_GROUP {
                        failures.push(ResolveFailure::new(
                            FailureKind::ModuleNotFound {
                                selector: module.to_string(),
                            },
                            format!("Could not find {module}."),
                        ));
                        continue;
                    }
                    let version = module.version.clone().unwrap_or_else(|| "latest".to_string());
                    modules
                        .entry((module.group.clone(), module.name.clone()))
                        .or_default()
                        .push(version);
                }
                Dependency::Project { path, .. } => {
                    components.push(ResolvedComponent::new(ComponentIdentifier::Project { path }));
                }
                Dependency::Files { files } => {
                    for file in files {
                        artifacts.push(ResolvedArtifact {
                            component: ComponentIdentifier::Root {
                                path: configuration.identity_path().path(),
                            },
                            name: file.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default(),
                            extension: file.extension().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default(),
                            classifier: None,
                            file,
                        });
                    }
                }
            }
        }

        for ((group, name), mut versions) in modules {
            let forced = constraints
                .iter()
                .find(|constraint| constraint.strict && constraint.group == group && constraint.name == name);
            versions.sort();
            versions.dedup();
            let version = match forced {
                Some(constraint) => constraint.version.clone(),
                None if versions.len() > 1 && strict_conflicts => {
                    failures.push(ResolveFailure::new(
                        FailureKind::VersionConflict {
                            module: format!("{group}:{name}"),
                            versions: versions.clone(),
                        },
                        format!("Conflict found for module '{group}:{name}': versions {}", versions.join(", ")),
                    ));
                    continue;
                }
                None => versions.last().cloned().unwrap_or_default(),
            };
            let id = ComponentIdentifier::module(&group, &name, &version);
            artifacts.push(ResolvedArtifact {
                component: id.clone(),
                name: name.clone(),
                extension: "jar".to_string(),
                classifier: None,
                file: PathBuf::from(format!("/repo/{group}/{name}-{version}.jar")),
            });
            components.push(ResolvedComponent::new(id));
        }

        let root = ComponentIdentifier::Root {
            path: configuration.identity_path().path(),
        };
        let result = MinimalResolutionResult::new(root, configuration.resolution_attributes(), components);
        let mut graph = VisitedGraphResults::new(result);
        for failure in failures {
            graph = graph.with_unresolved(failure);
        }
        if self.fail_whole_graph.load(Ordering::SeqCst) {
            graph = graph.with_resolution_failure(ResolveFailure::other("Resolution of the graph was aborted."));
        }
        Ok((graph, artifacts))
    }
}

impl ConfigurationResolver for StubResolver {
    fn resolve_graph(&self, configuration: &Configuration) -> Result<ResolverResults, ResolveFailure> {
        self.graph_calls.fetch_add(1, Ordering::SeqCst);
        self.resolved.lock().push(configuration.name().to_string());
        if self.refuse.load(Ordering::SeqCst) {
            return Err(ResolveFailure::other("resolver unavailable"));
        }
        let (graph, artifacts) = self.visit(configuration)?;
        Ok(ResolverResults::graph_resolved(graph, artifacts))
    }

    fn resolve_build_dependencies(
        &self,
        configuration: &Configuration,
        future: FutureCompleteResults,
    ) -> Result<ResolverResults, ResolveFailure> {
        self.build_calls.fetch_add(1, Ordering::SeqCst);
        if self.refuse.load(Ordering::SeqCst) {
            return Err(ResolveFailure::other("resolver unavailable"));
        }
        if self.evaluate_future.load(Ordering::SeqCst) {
            future.get().map_err(|error| ResolveFailure::other(error.to_string()))?;
        }
        let projects = configuration
            .all_dependencies()
            .iter()
            .filter_map(|dependency| match dependency {
                Dependency::Project { path, .. } => {
                    Some(ResolvedComponent::new(ComponentIdentifier::Project { path }))
                }
                _ => None,
            })
            .collect();
        let root = ComponentIdentifier::Root {
            path: configuration.identity_path().path(),
        };
        let graph = VisitedGraphResults::new(MinimalResolutionResult::new(
            root,
            configuration.resolution_attributes(),
            projects,
        ));
        Ok(ResolverResults::build_dependencies_resolved(graph, future))
    }

    fn repositories(&self) -> Vec<String> {
        vec!["stub".to_string()]
    }
}

/// Lock state handed out for every configuration.
pub struct FixedLocking {
    pub state: LockState,
}

impl DependencyLockingProvider for FixedLocking {
    fn load_lock_state(&self, _lock_id: &str, _display_name: &str) -> LockState {
        self.state.clone()
    }
}

/// Records `before:<name>` and `after:<name>` events.
#[derive(Default)]
pub struct RecordingListener {
    events: Mutex<Vec<String>>,
}

impl RecordingListener {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }
}

impl DependencyResolutionListener for RecordingListener {
    fn before_resolve(&self, dependencies: &ResolvableDependencies) {
        self.events.lock().push(format!("before:{}", dependencies.name()));
    }

    fn after_resolve(&self, dependencies: &ResolvableDependencies) {
        self.events.lock().push(format!("after:{}", dependencies.name()));
    }
}

#[derive(Debug, Clone)]
pub struct FinishedOperation {
    pub display_name: String,
    pub details: ResolveConfigurationDetails,
    pub result: Option<ResolveConfigurationResult>,
    pub failure: Option<String>,
}

/// Keeps every finished build operation.
#[derive(Default)]
pub struct RecordingOperations {
    started: AtomicUsize,
    finished: Mutex<Vec<FinishedOperation>>,
}

impl RecordingOperations {
    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    pub fn finished(&self) -> Vec<FinishedOperation> {
        self.finished.lock().clone()
    }
}

impl BuildOperationListener for RecordingOperations {
    fn started(&self, _descriptor: &BuildOperationDescriptor) {
        self.started.fetch_add(1, Ordering::SeqCst);
    }

    fn finished(
        &self,
        descriptor: &BuildOperationDescriptor,
        result: Option<&ResolveConfigurationResult>,
        failure: Option<&str>,
    ) {
        self.finished.lock().push(FinishedOperation {
            display_name: descriptor.display_name.clone(),
            details: descriptor.details.clone(),
            result: result.cloned(),
            failure: failure.map(str::to_string),
        });
    }
}

/// A project `:app` with its container and the collaborators behind it.
pub struct Fixture {
    pub context: DomainObjectContext,
    pub resolver: Arc<StubResolver>,
    pub problems: Arc<CollectingProblemReporter>,
    pub operations: Arc<RecordingOperations>,
    pub container: ConfigurationContainer,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_services(|services| services)
    }

    pub fn with_settings(settings: DependencyManagementSettings) -> Self {
        Self::with_services(|services| services.with_settings(settings))
    }

    pub fn with_services(configure: impl FnOnce(ConfigurationServices) -> ConfigurationServices) -> Self {
        init_tracing();
        let context = DomainObjectContext::project(":app");
        let resolver = StubResolver::new();
        let problems = Arc::new(CollectingProblemReporter::new());
        let operations = Arc::new(RecordingOperations::default());
        let services = configure(
            ConfigurationServices::new(resolver.clone())
                .with_problems(problems.clone())
                .with_build_operation_listener(operations.clone()),
        );
        let container = ConfigurationContainer::new(context.clone(), services);
        Self {
            context,
            resolver,
            problems,
            operations,
            container,
        }
    }

    /// A legacy configuration of the container.
    pub fn legacy(&self, name: &str) -> Configuration {
        self.container.create(name).unwrap()
    }

    pub fn error_labels(&self) -> Vec<String> {
        self.problems.errors().into_iter().map(|problem| problem.label).collect()
    }

    pub fn warning_labels(&self) -> Vec<String> {
        self.problems.warnings().into_iter().map(|problem| problem.label).collect()
    }
}

pub fn module(notation: &str) -> Dependency {
    Dependency::parse(notation).unwrap()
}
