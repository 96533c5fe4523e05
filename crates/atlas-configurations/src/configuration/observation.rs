use super::Configuration;
use crate::error::{ConfigurationError, ConfigurationResult};
use crate::mutation::{MutationType, ObservationState};
use std::sync::atomic::Ordering;

const BEFORE_RESOLVE_HINT: &str =
    " Use 'defaultDependencies' instead of 'beforeResolve' to specify default dependencies for a configuration.";

impl Configuration {
    pub fn observation_state(&self) -> ObservationState {
        self.inner.observation.lock().clone()
    }

    pub fn is_observed(&self) -> bool {
        self.inner.observation.lock().is_observed()
    }

    /// Whether any further mutation of the declared state would be accepted.
    pub fn is_can_be_mutated(&self) -> bool {
        !self.is_observed() && self.inner.results.get().is_none()
    }

    /// Mark this configuration and all of its ancestors observed.
    ///
    /// Observing freezes attributes and outgoing publications and locks the
    /// usage. The first reason is kept; later calls do nothing.
    pub fn mark_as_observed(&self, reason: &str) {
        if self.is_observed() {
            return;
        }
        for configuration in self.hierarchy_breadth_first() {
            configuration.observe(reason);
        }
    }

    fn observe(&self, reason: &str) {
        let mut observation = self.inner.observation.lock();
        if observation.is_observed() {
            return;
        }
        {
            let mut state = self.inner.state.lock();
            state.attributes.freeze(reason);
            state.outgoing.prevent_from_further_mutation(reason);
            state.usage.mutable = false;
        }
        *observation = ObservationState::Observed {
            reason: reason.to_string(),
        };
        tracing::trace!(configuration = %self.identity_path(), reason, "configuration observed");
    }

    /// Allow the dependency categories to change again on an observed
    /// configuration.
    pub fn mark_dependencies_observed(&self) -> ConfigurationResult<()> {
        {
            let mut observation = self.inner.observation.lock();
            if let Some(reason) = observation.reason().map(str::to_string) {
                *observation = ObservationState::DependenciesObserved { reason };
                return Ok(());
            }
        }
        self.fail(
            format!("Marking dependencies of {} observed", self.display_name()),
            ConfigurationError::NotObserved {
                display_name: self.display_name().to_string(),
            },
        )
    }

    /// Check that a mutation of category `mutation` is still permitted, then
    /// let the children of this configuration check it too.
    pub fn validate_mutation(&self, mutation: MutationType) -> ConfigurationResult<()> {
        if matches!(
            mutation,
            MutationType::DependencyAttributes | MutationType::DependencyConstraintAttributes
        ) {
            self.assert_is_declarable(&format!("Changing {mutation}"))?;
        }

        let observation = self.observation_state();
        if !observation.allows(mutation, self.is_fully_resolved()) {
            let hint = if self.inner.inside_before_resolve.load(Ordering::SeqCst) {
                BEFORE_RESOLVE_HINT
            } else {
                ""
            };
            return self.fail(
                format!("Mutating the {mutation} of {} after it has been observed", self.display_name()),
                ConfigurationError::MutationAfterObservation {
                    mutation,
                    display_name: self.display_name().to_string(),
                    reason: observation.reason().unwrap_or("resolved").to_string(),
                    hint: hint.to_string(),
                },
            );
        }

        if mutation == MutationType::Usage {
            self.assert_usage_is_mutable()?;
        }
        self.notify_children(mutation)
    }

    fn validate_parent_mutation(&self, mutation: MutationType) -> ConfigurationResult<()> {
        // strategy changes of a parent never affect its children
        if mutation == MutationType::Strategy {
            return Ok(());
        }
        let attributes_only = matches!(
            mutation,
            MutationType::DependencyAttributes | MutationType::DependencyConstraintAttributes
        );
        if !attributes_only && self.is_fully_resolved() {
            return self.fail(
                format!("Mutating the {mutation} of a parent of {}", self.display_name()),
                ConfigurationError::ParentMutationAfterResolution {
                    mutation,
                    display_name: self.display_name().to_string(),
                },
            );
        }
        self.notify_children(mutation)
    }

    fn notify_children(&self, mutation: MutationType) -> ConfigurationResult<()> {
        for child in self.children() {
            child.validate_parent_mutation(mutation)?;
        }
        Ok(())
    }
}
