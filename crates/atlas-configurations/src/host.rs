//! Failure consolidation for a configuration being resolved.

use crate::context::{DomainObjectContext, IdentityPath};
use crate::error::{ConfigurationError, ConfigurationResult};
use crate::problems::{Problem, ProblemReporter};
use crate::results::{FailureKind, ResolveFailure};
use std::sync::Arc;

/// Suggestions attached to resolution failures.
#[derive(Debug, Clone)]
pub struct FailureResolutions {
    project_path: Option<IdentityPath>,
    configuration_name: String,
}

impl FailureResolutions {
    pub fn new(context: &DomainObjectContext, configuration_name: &str) -> Self {
        Self {
            project_path: context.project_path().cloned(),
            configuration_name: configuration_name.to_string(),
        }
    }

    /// Suggest the `dependencyInsight` task for a conflict on `module`
    /// (`group:name`). Nothing is suggested outside of projects.
    pub fn for_version_conflict(&self, module: &str) -> Vec<String> {
        let Some(project_path) = &self.project_path else {
            return Vec::new();
        };
        let task_path = project_path.child("dependencyInsight");
        vec![format!(
            "Run with {} --configuration {} --dependency {} to get more insight on how to solve the conflict.",
            task_path, self.configuration_name, module
        )]
    }
}

/// The configuration as seen by code that turns resolver failures into
/// user-facing errors.
#[derive(Clone)]
pub struct ResolutionHost {
    display_name: String,
    problems: Arc<dyn ProblemReporter>,
    failure_resolutions: FailureResolutions,
}

impl ResolutionHost {
    pub fn new(
        display_name: impl Into<String>,
        problems: Arc<dyn ProblemReporter>,
        failure_resolutions: FailureResolutions,
    ) -> Self {
        Self {
            display_name: display_name.into(),
            problems,
            failure_resolutions,
        }
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn problems(&self) -> &Arc<dyn ProblemReporter> {
        &self.problems
    }

    pub fn failure_resolutions(&self) -> &FailureResolutions {
        &self.failure_resolutions
    }

    /// Fold `failures` into one error, or `None` when there are none.
    pub fn consolidate_failures(
        &self,
        resolution_type: &str,
        failures: &[ResolveFailure],
    ) -> Option<ConfigurationError> {
        if failures.is_empty() {
            return None;
        }
        let resolutions = failures
            .iter()
            .find_map(|failure| match failure.kind() {
                FailureKind::VersionConflict { module, .. } => {
                    Some(self.failure_resolutions.for_version_conflict(module))
                }
                _ => None,
            })
            .unwrap_or_default();
        Some(ConfigurationError::Resolve {
            resolution_type: resolution_type.to_string(),
            display_name: self.display_name.clone(),
            failures: failures.to_vec(),
            resolutions,
        })
    }

    /// Report and return the consolidated failure, if any.
    pub fn rethrow_failures(
        &self,
        resolution_type: &str,
        failures: &[ResolveFailure],
    ) -> ConfigurationResult<()> {
        match self.consolidate_failures(resolution_type, failures) {
            Some(error) => {
                self.problems.report(
                    Problem::error(format!(
                        "Could not resolve all {resolution_type} for {}",
                        self.display_name
                    ))
                    .with_cause(&error),
                );
                Err(error)
            }
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for ResolutionHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolutionHost")
            .field("display_name", &self.display_name)
            .finish_non_exhaustive()
    }
}
