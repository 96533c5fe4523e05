//! Results handed back by a [`ConfigurationResolver`](crate::resolver::ConfigurationResolver).

use crate::attributes::Attributes;
use crate::error::{ConfigurationError, ConfigurationResult};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock, Weak};
use thiserror::Error;

/// Identifies a node of the resolved graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ComponentIdentifier {
    Module {
        group: String,
        name: String,
        version: String,
    },
    Project {
        path: String,
    },
    /// The configuration being resolved.
    Root {
        path: String,
    },
}

impl ComponentIdentifier {
    pub fn module(group: &str, name: &str, version: &str) -> Self {
        ComponentIdentifier::Module {
            group: group.to_string(),
            name: name.to_string(),
            version: version.to_string(),
        }
    }

    pub fn is_module(&self) -> bool {
        matches!(self, ComponentIdentifier::Module { .. })
    }
}

impl fmt::Display for ComponentIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComponentIdentifier::Module {
                group,
                name,
                version,
            } => write!(f, "{group}:{name}:{version}"),
            ComponentIdentifier::Project { path } => write!(f, "project {path}"),
            ComponentIdentifier::Root { path } => write!(f, "root {path}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedComponent {
    pub id: ComponentIdentifier,
    pub dependencies: Vec<ComponentIdentifier>,
    pub selection_reason: Option<String>,
}

impl ResolvedComponent {
    pub fn new(id: ComponentIdentifier) -> Self {
        Self {
            id,
            dependencies: Vec::new(),
            selection_reason: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolvedArtifact {
    pub component: ComponentIdentifier,
    pub name: String,
    pub extension: String,
    pub classifier: Option<String>,
    pub file: PathBuf,
}

/// What went wrong while resolving.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    ModuleNotFound { selector: String },
    /// Several versions of `module` were requested and none could be selected.
    VersionConflict { module: String, versions: Vec<String> },
    ArtifactNotFound { artifact: String },
    Other,
}

/// A failure recorded by the resolver. Kept inside memoized results, so it
/// is cloneable and can be surfaced any number of times.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ResolveFailure {
    kind: FailureKind,
    message: String,
}

impl ResolveFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Other, message)
    }

    pub fn kind(&self) -> &FailureKind {
        &self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Minimal view of the resolved graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinimalResolutionResult {
    root: ComponentIdentifier,
    requested_attributes: Attributes,
    components: Vec<ResolvedComponent>,
}

impl MinimalResolutionResult {
    pub fn new(
        root: ComponentIdentifier,
        requested_attributes: Attributes,
        components: Vec<ResolvedComponent>,
    ) -> Self {
        Self {
            root,
            requested_attributes,
            components,
        }
    }

    pub fn root_source(&self) -> &ComponentIdentifier {
        &self.root
    }

    pub fn requested_attributes(&self) -> &Attributes {
        &self.requested_attributes
    }

    /// Every component except the root.
    pub fn all_components(&self) -> &[ResolvedComponent] {
        &self.components
    }
}

/// Outcome of visiting the dependency graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisitedGraphResults {
    resolution_result: MinimalResolutionResult,
    unresolved: Vec<ResolveFailure>,
    resolution_failure: Option<ResolveFailure>,
}

impl VisitedGraphResults {
    pub fn new(resolution_result: MinimalResolutionResult) -> Self {
        Self {
            resolution_result,
            unresolved: Vec::new(),
            resolution_failure: None,
        }
    }

    /// Record a dependency that could not be resolved.
    pub fn with_unresolved(mut self, failure: ResolveFailure) -> Self {
        self.unresolved.push(failure);
        self
    }

    /// Record a failure of the resolution as a whole.
    pub fn with_resolution_failure(mut self, failure: ResolveFailure) -> Self {
        self.resolution_failure = Some(failure);
        self
    }

    pub fn has_any_failure(&self) -> bool {
        self.resolution_failure.is_some() || !self.unresolved.is_empty()
    }

    pub fn resolution_failure(&self) -> Option<&ResolveFailure> {
        self.resolution_failure.as_ref()
    }

    pub fn unresolved_dependencies(&self) -> &[ResolveFailure] {
        &self.unresolved
    }

    /// Resolution failure first, then unresolved dependencies.
    pub fn all_failures(&self) -> Vec<ResolveFailure> {
        self.resolution_failure
            .iter()
            .chain(self.unresolved.iter())
            .cloned()
            .collect()
    }

    pub fn resolution_result(&self) -> &MinimalResolutionResult {
        &self.resolution_result
    }
}

/// What a resolver produced for a configuration.
#[derive(Debug, Clone)]
pub struct ResolverResults {
    visited_graph: VisitedGraphResults,
    artifacts: Vec<ResolvedArtifact>,
    artifact_failures: Vec<ResolveFailure>,
    fully_resolved: bool,
    complete_results: Option<FutureCompleteResults>,
}

impl ResolverResults {
    /// Results of a full graph resolution.
    pub fn graph_resolved(visited_graph: VisitedGraphResults, artifacts: Vec<ResolvedArtifact>) -> Self {
        Self {
            visited_graph,
            artifacts,
            artifact_failures: Vec::new(),
            fully_resolved: true,
            complete_results: None,
        }
    }

    /// Results good enough to compute build dependencies. `complete` produces
    /// the full results on demand.
    pub fn build_dependencies_resolved(
        visited_graph: VisitedGraphResults,
        complete: FutureCompleteResults,
    ) -> Self {
        Self {
            visited_graph,
            artifacts: Vec::new(),
            artifact_failures: Vec::new(),
            fully_resolved: false,
            complete_results: Some(complete),
        }
    }

    pub fn with_artifact_failure(mut self, failure: ResolveFailure) -> Self {
        self.artifact_failures.push(failure);
        self
    }

    pub fn visited_graph(&self) -> &VisitedGraphResults {
        &self.visited_graph
    }

    pub fn is_fully_resolved(&self) -> bool {
        self.fully_resolved
    }

    pub fn artifacts(&self) -> &[ResolvedArtifact] {
        &self.artifacts
    }

    pub fn artifact_failures(&self) -> &[ResolveFailure] {
        &self.artifact_failures
    }

    pub fn complete_results(&self) -> Option<&FutureCompleteResults> {
        self.complete_results.as_ref()
    }
}

/// Produces full results for a configuration on demand.
pub(crate) trait CompleteResultsSource: Send + Sync {
    fn resolve_complete_results(&self) -> ConfigurationResult<Arc<ResolverResults>>;
}

struct FutureInner {
    description: String,
    source: Weak<dyn CompleteResultsSource>,
    value: OnceLock<Arc<ResolverResults>>,
}

/// One-shot handle on the full results of a configuration, given to the
/// resolver while it only computes build dependencies. Evaluating it runs
/// (or reuses) the full resolution without checking the model lock.
#[derive(Clone)]
pub struct FutureCompleteResults {
    inner: Arc<FutureInner>,
}

impl FutureCompleteResults {
    pub(crate) fn new(description: String, source: Weak<dyn CompleteResultsSource>) -> Self {
        Self {
            inner: Arc::new(FutureInner {
                description,
                source,
                value: OnceLock::new(),
            }),
        }
    }

    pub fn description(&self) -> &str {
        &self.inner.description
    }

    pub fn is_evaluated(&self) -> bool {
        self.inner.value.get().is_some()
    }

    pub fn get(&self) -> ConfigurationResult<Arc<ResolverResults>> {
        if let Some(value) = self.inner.value.get() {
            return Ok(value.clone());
        }
        let source = self
            .inner
            .source
            .upgrade()
            .ok_or_else(|| ConfigurationError::ResultsUnavailable(self.inner.description.clone()))?;
        let results = source.resolve_complete_results()?;
        Ok(self.inner.value.get_or_init(|| results).clone())
    }
}

impl fmt::Debug for FutureCompleteResults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FutureCompleteResults")
            .field("description", &self.inner.description)
            .field("evaluated", &self.is_evaluated())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn root() -> ComponentIdentifier {
        ComponentIdentifier::Root {
            path: ":app:runtimeClasspath".to_string(),
        }
    }

    fn empty_graph() -> VisitedGraphResults {
        VisitedGraphResults::new(MinimalResolutionResult::new(root(), Attributes::empty(), Vec::new()))
    }

    struct CountingSource {
        calls: AtomicUsize,
    }

    impl CompleteResultsSource for CountingSource {
        fn resolve_complete_results(&self) -> ConfigurationResult<Arc<ResolverResults>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(ResolverResults::graph_resolved(empty_graph(), Vec::new())))
        }
    }

    #[test]
    fn test_failures_are_aggregated() {
        let graph = empty_graph()
            .with_unresolved(ResolveFailure::new(
                FailureKind::ModuleNotFound {
                    selector: "org:a:1".to_string(),
                },
                "Could not find org:a:1.",
            ))
            .with_resolution_failure(ResolveFailure::other("graph broken"));

        assert!(graph.has_any_failure());
        let messages: Vec<String> = graph.all_failures().iter().map(ToString::to_string).collect();
        assert_eq!(messages, vec!["graph broken", "Could not find org:a:1."]);
    }

    #[test]
    fn test_clean_graph_has_no_failure() {
        let graph = empty_graph();
        assert!(!graph.has_any_failure());
        assert!(graph.resolution_failure().is_none());
    }

    #[test]
    fn test_future_results_evaluated_once() {
        let source: Arc<CountingSource> = Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
        });
        let weak = Arc::downgrade(&source) as Weak<dyn CompleteResultsSource>;
        let future = FutureCompleteResults::new("Full results for runtimeClasspath".to_string(), weak);

        assert!(!future.is_evaluated());
        let first = future.get().unwrap();
        let second = future.clone().get().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        assert!(first.is_fully_resolved());
    }

    #[test]
    fn test_future_results_without_owner() {
        let source: Arc<CountingSource> = Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
        });
        let weak = Arc::downgrade(&source) as Weak<dyn CompleteResultsSource>;
        drop(source);

        let future = FutureCompleteResults::new("Full results for gone".to_string(), weak);
        assert!(matches!(
            future.get(),
            Err(ConfigurationError::ResultsUnavailable(_))
        ));
    }

    #[test]
    fn test_build_dependency_results_are_partial() {
        let source: Arc<CountingSource> = Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
        });
        let future = FutureCompleteResults::new(
            "Full results for app".to_string(),
            Arc::downgrade(&source) as Weak<dyn CompleteResultsSource>,
        );
        let results = ResolverResults::build_dependencies_resolved(empty_graph(), future);
        assert!(!results.is_fully_resolved());
        assert!(results.complete_results().is_some());
    }
}
