use super::{Configuration, ConfigurationInner};
use crate::build_operation::{BuildOperationDescriptor, ResolveConfigurationDetails, ResolveConfigurationResult};
use crate::context::IdentityPath;
use crate::dependency::DependencyConstraint;
use crate::error::{ConfigurationError, ConfigurationResult, UNSAFE_RESOLUTION_DOCS};
use crate::host::{FailureResolutions, ResolutionHost};
use crate::results::{CompleteResultsSource, ComponentIdentifier, FutureCompleteResults, ResolverResults};
use crate::role::ProperMethodUsage;
use crate::strategy::ResolutionStrategy;
use indexmap::IndexSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

/// Resolution state of a configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigurationState {
    Unresolved,
    Resolved,
    ResolvedWithFailures,
}

const GRAPH_RESOLVED: &str = "graph resolved";

impl CompleteResultsSource for ConfigurationInner {
    fn resolve_complete_results(&self) -> ConfigurationResult<Arc<ResolverResults>> {
        match self.handle() {
            // the model lock is not checked here; whoever asked for build
            // dependencies already went through that check
            Some(configuration) => configuration.resolve_exclusively(),
            None => Err(ConfigurationError::ResultsUnavailable(self.display_name.clone())),
        }
    }
}

/// Forgets the resolution results and restores the keep-state flag of the
/// strategy when dropped, whether or not the guarded call returned.
struct ResetResolutionGuard<'a> {
    configuration: &'a Configuration,
    strategy: Arc<ResolutionStrategy>,
    previous: bool,
}

impl Drop for ResetResolutionGuard<'_> {
    fn drop(&mut self) {
        self.configuration.inner.results.set(None);
        self.strategy.set_keep_state_required_for_graph_resolution(self.previous);
    }
}

/// Clears the inside-before-resolve flag when dropped.
struct BeforeResolveGuard<'a>(&'a AtomicBool);

impl Drop for BeforeResolveGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl Configuration {
    pub fn state(&self) -> ConfigurationState {
        match self.inner.results.get() {
            Some(results) if results.is_fully_resolved() => {
                if results.visited_graph().has_any_failure() {
                    ConfigurationState::ResolvedWithFailures
                } else {
                    ConfigurationState::Resolved
                }
            }
            _ => ConfigurationState::Unresolved,
        }
    }

    pub(crate) fn is_fully_resolved(&self) -> bool {
        self.inner
            .results
            .get()
            .is_some_and(|results| results.is_fully_resolved())
    }

    /// The memoized results, full or partial.
    pub fn resolver_results(&self) -> Option<Arc<ResolverResults>> {
        self.inner.results.get()
    }

    /// Name lock files use for this configuration.
    pub fn dependency_locking_id(&self) -> &str {
        self.name()
    }

    /// Host through which resolution failures of this configuration are
    /// reported.
    pub fn resolution_host(&self) -> ResolutionHost {
        ResolutionHost::new(
            self.display_name(),
            self.problems().clone(),
            FailureResolutions::new(self.context(), self.name()),
        )
    }

    /// Resolve the full graph unless it already is.
    ///
    /// The caller must hold the lock of the owning project model. The
    /// resolver runs at most once until the resolution state is reset;
    /// later calls return the same results.
    pub fn resolve_graph_if_required(&self) -> ConfigurationResult<Arc<ResolverResults>> {
        self.assert_is_resolvable()?;
        self.assert_resolution_is_safe()?;
        self.resolve_exclusively()
    }

    fn assert_resolution_is_safe(&self) -> ConfigurationResult<()> {
        if self.context().model().has_mutable_state() {
            return Ok(());
        }
        self.fail(
            format!("Resolving {} without the model lock", self.display_name()),
            ConfigurationError::IllegalResolution {
                path: self.identity_path().to_string(),
                documentation: UNSAFE_RESOLUTION_DOCS.to_string(),
            },
        )
    }

    fn resolve_exclusively(&self) -> ConfigurationResult<Arc<ResolverResults>> {
        let results = self.inner.results.update(|current| match current {
            Some(results) if results.is_fully_resolved() => Ok(Some(results)),
            _ => self.resolve_graph_in_build_operation().map(Some),
        })?;
        results.ok_or_else(|| ConfigurationError::ResultsUnavailable(self.display_name().to_string()))
    }

    fn resolve_graph_in_build_operation(&self) -> ConfigurationResult<Arc<ResolverResults>> {
        let services = self.services().clone();
        let descriptor = BuildOperationDescriptor::new(
            format!("Resolve dependencies of {}", self.identity_path()),
            self.resolve_details(),
        );

        services.build_operations.call(descriptor, |operation| {
            self.run_dependency_actions()?;
            let incoming = self.incoming();
            self.fire_before_resolve(&incoming);

            let results = match services.resolver.resolve_graph(self) {
                Ok(results) => Arc::new(results),
                Err(source) => {
                    return self.fail(
                        format!("Resolving {}", self.display_name()),
                        ConfigurationError::ResolverFailed {
                            display_name: self.display_name().to_string(),
                            source,
                        },
                    )
                }
            };

            // listeners may read the new results
            self.inner.results.set(Some(results.clone()));
            self.mark_as_observed(GRAPH_RESOLVED);

            let graph = results.visited_graph();
            if graph.resolution_failure().is_none() {
                if let Some(listeners) = self.listeners_snapshot() {
                    listeners.after_resolve(&incoming);
                }
            }
            self.inner.listeners.lock().take();
            if let Some(strategy) = self.realized_strategy() {
                strategy.maybe_discard_state_required_for_graph_resolution();
            }

            if let Some(failure) = graph.resolution_failure() {
                operation.failed(failure);
            }
            let resolution = graph.resolution_result();
            operation.set_result(ResolveConfigurationResult {
                root_component: resolution.root_source().to_string(),
                requested_attributes: resolution.requested_attributes().clone(),
            });
            tracing::debug!(
                configuration = %self.identity_path(),
                components = resolution.all_components().len(),
                failed = graph.has_any_failure(),
                "resolved configuration"
            );
            Ok(results)
        })
    }

    fn fire_before_resolve(&self, incoming: &super::ResolvableDependencies) {
        let Some(listeners) = self.listeners_snapshot() else {
            return;
        };
        self.inner.inside_before_resolve.store(true, Ordering::SeqCst);
        let _inside = BeforeResolveGuard(&self.inner.inside_before_resolve);
        listeners.before_resolve(incoming);
    }

    fn resolve_details(&self) -> ResolveConfigurationDetails {
        let context = self.context();
        ResolveConfigurationDetails {
            configuration_name: self.name().to_string(),
            is_script_configuration: context.is_script(),
            configuration_description: self.description(),
            build_path: context.build_path().path(),
            project_path: context.project_path().map(IdentityPath::path),
            is_configuration_visible: self.is_visible(),
            is_configuration_transitive: self.is_transitive(),
            repositories: self.services().resolver.repositories(),
        }
    }

    /// Resolve just enough to know the build dependencies, unless results
    /// are already memoized. The resolver receives a handle that performs
    /// the full resolution if it turns out to be needed.
    pub fn resolve_graph_for_build_dependencies_if_required(&self) -> ConfigurationResult<Arc<ResolverResults>> {
        self.assert_is_resolvable()?;
        if self.resolution_strategy().resolve_graph_to_determine_task_dependencies() {
            return self.resolve_graph_if_required();
        }

        let results = self.inner.results.update(|current| {
            if let Some(results) = current {
                return Ok(Some(results));
            }
            let source: Weak<dyn CompleteResultsSource> = self.inner.self_ref.clone();
            let future = FutureCompleteResults::new(format!("Full results for {}", self.name()), source);
            let partial = match self.services().resolver.resolve_build_dependencies(self, future) {
                Ok(partial) => partial,
                Err(source) => {
                    return self.fail(
                        format!("Resolving build dependencies of {}", self.display_name()),
                        ConfigurationError::ResolverFailed {
                            display_name: self.display_name().to_string(),
                            source,
                        },
                    )
                }
            };
            // the resolver may have asked for the full results meanwhile
            match self.inner.results.get() {
                Some(full) if full.is_fully_resolved() => Ok(Some(full)),
                _ => Ok(Some(Arc::new(partial))),
            }
        })?;
        results.ok_or_else(|| ConfigurationError::ResultsUnavailable(self.display_name().to_string()))
    }

    /// Run `factory`, then forget any resolution results so the next request
    /// resolves again, even if `factory` panics. Graph state of the strategy
    /// is kept while `factory` runs.
    pub fn call_and_reset_resolution_state<T>(&self, factory: impl FnOnce() -> T) -> ConfigurationResult<T> {
        self.check_proper_usage("callAndResetResolutionState()", true, &[ProperMethodUsage::Resolvable])?;
        let strategy = self.resolution_strategy();
        let _reset = ResetResolutionGuard {
            configuration: self,
            previous: strategy.keeps_state_required_for_graph_resolution(),
            strategy: strategy.clone(),
        };
        strategy.set_keep_state_required_for_graph_resolution(true);
        Ok(factory())
    }

    // Consistent resolution

    /// Align versions with those resolved in `source`.
    pub fn should_resolve_consistently_with(&self, source: &Configuration) -> ConfigurationResult<()> {
        self.check_proper_usage(
            "shouldResolveConsistentlyWith(Configuration)",
            false,
            &[ProperMethodUsage::Resolvable],
        )?;
        self.inner.state.lock().consistent_resolution_source = Some(source.clone());
        Ok(())
    }

    pub fn disable_consistent_resolution(&self) -> ConfigurationResult<()> {
        self.check_proper_usage("disableConsistentResolution()", false, &[ProperMethodUsage::Resolvable])?;
        self.inner.state.lock().consistent_resolution_source = None;
        Ok(())
    }

    pub fn consistent_resolution_source(&self) -> Option<Configuration> {
        self.inner.state.lock().consistent_resolution_source.clone()
    }

    /// Constraints the resolver adds on top of the declared ones: versions
    /// pinned by dependency locking, then versions resolved in the
    /// consistent resolution source.
    pub fn synthetic_dependencies(&self) -> ConfigurationResult<Vec<DependencyConstraint>> {
        self.check_proper_usage("getSyntheticDependencies()", true, &[ProperMethodUsage::Resolvable])?;
        let mut constraints = Vec::new();

        if self.resolution_strategy().is_dependency_locking_enabled() {
            let lock_state = self
                .services()
                .locking
                .load_lock_state(self.dependency_locking_id(), self.display_name());
            let strict = lock_state.must_validate;
            for locked in lock_state.locked {
                let constraint = if strict {
                    DependencyConstraint::strictly(locked.group, locked.module, locked.version.clone())
                } else {
                    DependencyConstraint::prefer(locked.group, locked.module, locked.version.clone())
                };
                constraints.push(constraint.because(lock_reason(strict, &locked.version)));
            }
        }

        constraints.extend(self.consistent_resolution_constraints()?);
        Ok(constraints)
    }

    fn consistent_resolution_constraints(&self) -> ConfigurationResult<Vec<DependencyConstraint>> {
        let Some(source) = self.consistent_resolution_source() else {
            return Ok(Vec::new());
        };
        if !source.is_can_be_resolved() {
            return self.fail(
                format!("Resolving {} consistently", self.display_name()),
                ConfigurationError::InvalidConsistentResolutionSource {
                    source_name: source.display_name().to_string(),
                    display_name: self.display_name().to_string(),
                },
            );
        }
        self.assert_no_consistent_resolution_cycle()?;

        let reason = format!("version resolved in {} by consistent resolution", source.display_name());
        let results = source.resolve_graph_if_required()?;
        Ok(results
            .visited_graph()
            .resolution_result()
            .all_components()
            .iter()
            .filter_map(|component| match &component.id {
                ComponentIdentifier::Module { group, name, version } => Some(
                    DependencyConstraint::strictly(group.clone(), name.clone(), version.clone())
                        .because(reason.clone()),
                ),
                _ => None,
            })
            .collect())
    }

    fn assert_no_consistent_resolution_cycle(&self) -> ConfigurationResult<()> {
        let mut sources = IndexSet::new();
        let mut current = Some(self.clone());
        while let Some(configuration) = current {
            if !sources.insert(configuration.clone()) {
                let cycle = sources
                    .iter()
                    .map(|source: &Configuration| source.name())
                    .chain(std::iter::once(self.name()))
                    .collect::<Vec<_>>()
                    .join(" -> ");
                return self.fail(
                    format!("Resolving {} consistently", self.display_name()),
                    ConfigurationError::ConsistentResolutionCycle(cycle),
                );
            }
            current = configuration.consistent_resolution_source();
        }
        Ok(())
    }
}

fn lock_reason(strict: bool, version: &str) -> String {
    if strict {
        format!("dependency was locked to version '{version}'")
    } else {
        format!("dependency was locked to version '{version}' (update/lenient mode)")
    }
}
