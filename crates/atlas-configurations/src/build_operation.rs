//! Build operations wrap units of work, such as resolving a configuration,
//! in a tracing span and report them to an optional listener.

use crate::attributes::Attributes;
use crate::error::ConfigurationResult;
use crate::results::ResolveFailure;
use serde::Serialize;
use std::sync::Arc;

/// Details of a configuration resolution operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveConfigurationDetails {
    pub configuration_name: String,
    pub is_script_configuration: bool,
    pub configuration_description: Option<String>,
    pub build_path: String,
    pub project_path: Option<String>,
    pub is_configuration_visible: bool,
    pub is_configuration_transitive: bool,
    pub repositories: Vec<String>,
}

/// Result of a configuration resolution operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveConfigurationResult {
    pub root_component: String,
    pub requested_attributes: Attributes,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOperationDescriptor {
    pub display_name: String,
    pub progress_display_name: String,
    pub details: ResolveConfigurationDetails,
}

impl BuildOperationDescriptor {
    pub fn new(display_name: impl Into<String>, details: ResolveConfigurationDetails) -> Self {
        let display_name = display_name.into();
        Self {
            progress_display_name: display_name.clone(),
            display_name,
            details,
        }
    }
}

/// Handed to the work running inside an operation.
#[derive(Debug, Default)]
pub struct BuildOperationContext {
    result: Option<ResolveConfigurationResult>,
    failure: Option<String>,
}

impl BuildOperationContext {
    pub fn set_result(&mut self, result: ResolveConfigurationResult) {
        self.result = Some(result);
    }

    /// Mark the operation failed without failing the work itself.
    pub fn failed(&mut self, failure: &ResolveFailure) {
        self.failure = Some(failure.to_string());
    }

    pub fn result(&self) -> Option<&ResolveConfigurationResult> {
        self.result.as_ref()
    }

    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }
}

/// Observes build operations.
pub trait BuildOperationListener: Send + Sync {
    fn started(&self, descriptor: &BuildOperationDescriptor);

    fn finished(
        &self,
        descriptor: &BuildOperationDescriptor,
        result: Option<&ResolveConfigurationResult>,
        failure: Option<&str>,
    );
}

#[derive(Clone, Default)]
pub struct BuildOperationRunner {
    listener: Option<Arc<dyn BuildOperationListener>>,
}

impl BuildOperationRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_listener(listener: Arc<dyn BuildOperationListener>) -> Self {
        Self {
            listener: Some(listener),
        }
    }

    /// Run `work` as an operation described by `descriptor`.
    pub fn call<T>(
        &self,
        descriptor: BuildOperationDescriptor,
        work: impl FnOnce(&mut BuildOperationContext) -> ConfigurationResult<T>,
    ) -> ConfigurationResult<T> {
        let span = tracing::info_span!(
            "build_operation",
            name = %descriptor.display_name,
            configuration = %descriptor.details.configuration_name,
        );
        let _entered = span.enter();

        if let Some(listener) = &self.listener {
            listener.started(&descriptor);
        }

        let mut context = BuildOperationContext::default();
        let outcome = work(&mut context);
        let failure = match &outcome {
            Err(error) => Some(error.to_string()),
            Ok(_) => context.failure.clone(),
        };

        match &failure {
            Some(failure) => tracing::debug!(%failure, "build operation failed"),
            None => tracing::debug!("build operation finished"),
        }

        if let Some(listener) = &self.listener {
            listener.finished(&descriptor, context.result.as_ref(), failure.as_deref());
        }
        outcome
    }
}

impl std::fmt::Debug for BuildOperationRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildOperationRunner")
            .field("has_listener", &self.listener.is_some())
            .finish()
    }
}
