//! Collaborators that compute graphs and lock states. The graph algorithm
//! itself is not part of this crate.

use crate::configuration::Configuration;
use crate::results::{FutureCompleteResults, ResolveFailure, ResolverResults};

/// Resolves configurations into dependency graphs.
///
/// The resolver reads what it needs from the configuration: its inherited
/// dependencies and constraints, exclude rules, resolution attributes,
/// resolution strategy and synthetic dependencies. Failures inside the
/// graph belong in the returned [`ResolverResults`]; an `Err` means the
/// resolver could not produce any result at all.
pub trait ConfigurationResolver: Send + Sync {
    /// Resolve the full graph, including artifacts.
    fn resolve_graph(&self, configuration: &Configuration) -> Result<ResolverResults, ResolveFailure>;

    /// Resolve just enough to know the build dependencies of `configuration`.
    /// `future` evaluates to the full results if they turn out to be needed.
    fn resolve_build_dependencies(
        &self,
        configuration: &Configuration,
        future: FutureCompleteResults,
    ) -> Result<ResolverResults, ResolveFailure>;

    /// Repositories used for resolution, for build operation details.
    fn repositories(&self) -> Vec<String>;
}

/// A module version pinned by a lock file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockedModule {
    pub group: String,
    pub module: String,
    pub version: String,
}

impl LockedModule {
    pub fn new(group: &str, module: &str, version: &str) -> Self {
        Self {
            group: group.to_string(),
            module: module.to_string(),
            version: version.to_string(),
        }
    }
}

/// Lock state of one configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LockState {
    /// Strict mode. When false, locked versions are only preferred
    /// (update/lenient mode).
    pub must_validate: bool,
    pub locked: Vec<LockedModule>,
}

/// Loads lock states for configurations with dependency locking enabled.
pub trait DependencyLockingProvider: Send + Sync {
    fn load_lock_state(&self, lock_id: &str, display_name: &str) -> LockState;
}

/// Provider used when the build has no lock files.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoDependencyLocking;

impl DependencyLockingProvider for NoDependencyLocking {
    fn load_lock_state(&self, _lock_id: &str, _display_name: &str) -> LockState {
        LockState::default()
    }
}
