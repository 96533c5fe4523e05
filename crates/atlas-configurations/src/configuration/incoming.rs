//! The incoming side of a configuration: what resolving it produces.

use super::{Configuration, DependencyConstraintSetView, DependencySetView};
use crate::attributes::Attributes;
use crate::error::ConfigurationResult;
use crate::listeners::DependencyResolutionListener;
use crate::results::{ComponentIdentifier, MinimalResolutionResult, ResolveFailure, ResolvedArtifact, ResolverResults};
use crate::role::ProperMethodUsage;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// The dependencies of a configuration as handed to resolution listeners,
/// and the entry point to what resolving them produces.
#[derive(Clone, Debug)]
pub struct ResolvableDependencies {
    configuration: Configuration,
}

impl ResolvableDependencies {
    pub fn name(&self) -> &str {
        self.configuration.name()
    }

    /// Identity path of the configuration, e.g. `:app:runtimeClasspath`.
    pub fn path(&self) -> String {
        self.configuration.identity_path().path()
    }

    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    pub fn attributes(&self) -> Attributes {
        self.configuration.resolution_attributes()
    }

    /// All dependencies to resolve, after running pending dependency actions.
    pub fn dependencies(&self) -> ConfigurationResult<DependencySetView> {
        self.configuration.run_dependency_actions()?;
        Ok(self.configuration.all_dependencies())
    }

    pub fn dependency_constraints(&self) -> ConfigurationResult<DependencyConstraintSetView> {
        self.configuration.run_dependency_actions()?;
        Ok(self.configuration.all_dependency_constraints())
    }

    pub fn before_resolve(&self, hook: impl Fn(&ResolvableDependencies) + Send + Sync + 'static) {
        self.configuration.with_listeners(|listeners| listeners.add_before_resolve(hook));
    }

    pub fn after_resolve(&self, hook: impl Fn(&ResolvableDependencies) + Send + Sync + 'static) {
        self.configuration.with_listeners(|listeners| listeners.add_after_resolve(hook));
    }

    pub fn add_listener(&self, listener: Arc<dyn DependencyResolutionListener>) {
        self.configuration.add_resolution_listener(listener);
    }

    /// The resolved graph. Fails if the graph as a whole could not be
    /// resolved; unresolved dependencies are part of the result.
    pub fn resolution_result(&self) -> ConfigurationResult<MinimalResolutionResult> {
        let results = self.configuration.resolve_graph_if_required()?;
        if let Some(failure) = results.visited_graph().resolution_failure() {
            self.configuration
                .resolution_host()
                .rethrow_failures("dependencies", std::slice::from_ref(failure))?;
        }
        Ok(results.visited_graph().resolution_result().clone())
    }

    /// Artifacts of the resolved graph, failing on any resolution failure.
    pub fn artifacts(&self) -> ArtifactCollection {
        ArtifactCollection {
            configuration: self.configuration.clone(),
            lenient: false,
        }
    }

    /// Artifacts of the resolved graph. A lenient view skips whatever could
    /// not be resolved instead of failing.
    pub fn artifact_view(&self, lenient: bool) -> ArtifactCollection {
        ArtifactCollection {
            configuration: self.configuration.clone(),
            lenient,
        }
    }

    pub fn files(&self) -> ConfigurationResult<Vec<PathBuf>> {
        self.artifacts().files()
    }
}

/// Resolved artifacts of a configuration.
#[derive(Clone, Debug)]
pub struct ArtifactCollection {
    configuration: Configuration,
    lenient: bool,
}

impl ArtifactCollection {
    pub fn is_lenient(&self) -> bool {
        self.lenient
    }

    pub fn artifacts(&self) -> ConfigurationResult<Vec<ResolvedArtifact>> {
        let results = self.configuration.resolve_graph_if_required()?;
        if !self.lenient {
            self.configuration
                .resolution_host()
                .rethrow_failures("artifacts", &failures_of(&results))?;
        }
        Ok(results.artifacts().to_vec())
    }

    pub fn files(&self) -> ConfigurationResult<Vec<PathBuf>> {
        let results = self.configuration.resolve_graph_if_required()?;
        if !self.lenient {
            self.configuration
                .resolution_host()
                .rethrow_failures("files", &failures_of(&results))?;
        }
        Ok(results.artifacts().iter().map(|artifact| artifact.file.clone()).collect())
    }

    /// Everything that went wrong resolving the graph and its artifacts.
    pub fn failures(&self) -> ConfigurationResult<Vec<ResolveFailure>> {
        let results = self.configuration.resolve_graph_if_required()?;
        Ok(failures_of(&results))
    }
}

fn failures_of(results: &ResolverResults) -> Vec<ResolveFailure> {
    let mut failures = results.visited_graph().all_failures();
    failures.extend(results.artifact_failures().iter().cloned());
    failures
}

/// Legacy view on fully resolved results.
#[derive(Clone, Debug)]
pub struct ResolvedConfiguration {
    configuration: Configuration,
    results: Arc<ResolverResults>,
}

impl ResolvedConfiguration {
    pub fn has_error(&self) -> bool {
        !failures_of(&self.results).is_empty()
    }

    pub fn rethrow_failure(&self) -> ConfigurationResult<()> {
        self.configuration
            .resolution_host()
            .rethrow_failures("dependencies", &failures_of(&self.results))
    }

    pub fn unresolved_failures(&self) -> Vec<ResolveFailure> {
        failures_of(&self.results)
    }

    pub fn resolved_artifacts(&self) -> ConfigurationResult<Vec<ResolvedArtifact>> {
        self.configuration
            .resolution_host()
            .rethrow_failures("artifacts", &failures_of(&self.results))?;
        Ok(self.results.artifacts().to_vec())
    }

    pub fn files(&self) -> ConfigurationResult<Vec<PathBuf>> {
        self.configuration
            .resolution_host()
            .rethrow_failures("files", &failures_of(&self.results))?;
        Ok(self.lenient_files())
    }

    /// Files of every artifact that did resolve.
    pub fn lenient_files(&self) -> Vec<PathBuf> {
        self.results.artifacts().iter().map(|artifact| artifact.file.clone()).collect()
    }
}

impl Configuration {
    pub fn incoming(&self) -> ResolvableDependencies {
        ResolvableDependencies {
            configuration: self.clone(),
        }
    }

    /// Resolve and return the files of every artifact.
    pub fn files(&self) -> ConfigurationResult<Vec<PathBuf>> {
        self.check_proper_usage("getFiles()", false, &[ProperMethodUsage::Resolvable])?;
        self.incoming().files()
    }

    /// Same as [`files`](Self::files), under the legacy name.
    pub fn resolve(&self) -> ConfigurationResult<Vec<PathBuf>> {
        self.check_proper_usage("resolve()", false, &[ProperMethodUsage::Resolvable])?;
        self.incoming().files()
    }

    pub fn contains(&self, file: &Path) -> ConfigurationResult<bool> {
        self.check_proper_usage("contains(File)", true, &[ProperMethodUsage::Resolvable])?;
        Ok(self.incoming().files()?.iter().any(|candidate| candidate == file))
    }

    pub fn is_empty(&self) -> ConfigurationResult<bool> {
        self.check_proper_usage("isEmpty()", true, &[ProperMethodUsage::Resolvable])?;
        Ok(self.incoming().files()?.is_empty())
    }

    pub fn resolved_configuration(&self) -> ConfigurationResult<ResolvedConfiguration> {
        self.check_proper_usage("getResolvedConfiguration()", false, &[ProperMethodUsage::Resolvable])?;
        let results = self.resolve_graph_if_required()?;
        Ok(ResolvedConfiguration {
            configuration: self.clone(),
            results,
        })
    }

    /// Projects whose outputs must be built before the files of this
    /// configuration can be used.
    pub fn build_dependencies(&self) -> ConfigurationResult<Vec<ComponentIdentifier>> {
        let results = self.resolve_graph_for_build_dependencies_if_required()?;
        let resolution = results.visited_graph().resolution_result();
        Ok(resolution
            .all_components()
            .iter()
            .filter(|component| matches!(component.id, ComponentIdentifier::Project { .. }))
            .map(|component| component.id.clone())
            .collect())
    }
}
