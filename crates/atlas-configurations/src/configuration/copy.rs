use super::Configuration;
use crate::dependency::{Dependency, DependencyConstraint};
use crate::error::ConfigurationResult;
use crate::role::{ConfigurationRole, ProperMethodUsage};
use std::sync::atomic::Ordering;

impl Configuration {
    /// Detached copy holding the own dependencies and constraints of this
    /// configuration. Artifacts, attributes and exclude rules are taken
    /// from the whole hierarchy.
    pub fn copy(&self) -> ConfigurationResult<Configuration> {
        self.check_proper_usage("copy()", false, &[ProperMethodUsage::Resolvable])?;
        self.create_copy(self.own_dependencies(), self.own_constraints())
    }

    /// Like [`copy`](Self::copy), with every inherited dependency and
    /// constraint too.
    pub fn copy_recursive(&self) -> ConfigurationResult<Configuration> {
        self.check_proper_usage("copyRecursive()", false, &[ProperMethodUsage::Resolvable])?;
        self.create_copy(self.all_dependencies().items(), self.all_dependency_constraints().items())
    }

    /// Like [`copy`](Self::copy), keeping only dependencies accepted by
    /// `filter`. Constraints are copied unfiltered.
    pub fn copy_filtered(&self, filter: impl Fn(&Dependency) -> bool) -> ConfigurationResult<Configuration> {
        self.check_proper_usage("copy(Predicate)", false, &[ProperMethodUsage::Resolvable])?;
        let dependencies = self.own_dependencies().into_iter().filter(|d| filter(d)).collect();
        self.create_copy(dependencies, self.own_constraints())
    }

    pub fn copy_recursive_filtered(
        &self,
        filter: impl Fn(&Dependency) -> bool,
    ) -> ConfigurationResult<Configuration> {
        self.check_proper_usage("copyRecursive(Predicate)", false, &[ProperMethodUsage::Resolvable])?;
        let dependencies = self.all_dependencies().iter().filter(|d| filter(d)).collect();
        self.create_copy(dependencies, self.all_dependency_constraints().items())
    }

    fn create_copy(
        &self,
        dependencies: Vec<Dependency>,
        constraints: Vec<DependencyConstraint>,
    ) -> ConfigurationResult<Configuration> {
        let copy = self.detached_copy();

        let artifacts = self.all_artifacts().items();
        let exclude_rules = self.all_exclude_rules();
        let attributes = self.attribute_values();
        let listeners = self.listeners_snapshot();
        {
            let source = self.inner.state.lock();
            let mut target = copy.inner.state.lock();
            target.visible = source.visible;
            target.transitive = source.transitive;
            target.description = source.description.clone();
            target.default_dependency_actions = source.default_dependency_actions.clone();
            target.with_dependency_actions = source.with_dependency_actions.clone();
            target.declaration_alternatives = source.declaration_alternatives.clone();
            target.resolution_alternatives = source.resolution_alternatives.clone();

            target.artifacts = artifacts.into_iter().collect();
            target.exclude_rules = exclude_rules.into_iter().collect();
            target.dependencies = dependencies.into_iter().collect();
            target.constraints = constraints.into_iter().collect();
            for (key, value) in attributes.iter() {
                target.attributes.attribute(key, value)?;
            }
        }
        *copy.inner.listeners.lock() = listeners;

        tracing::debug!(
            configuration = %self.identity_path(),
            copy = copy.name(),
            dependencies = copy.own_dependencies().len(),
            "copied configuration"
        );
        Ok(copy)
    }

    fn detached_copy(&self) -> Configuration {
        let count = self.inner.copy_count.fetch_add(1, Ordering::SeqCst) + 1;
        let name = if count == 1 {
            format!("{}Copy", self.name())
        } else {
            format!("{}Copy{count}", self.name())
        };
        self.factory().create(
            &name,
            self.context(),
            None,
            self.strategy_for_copy(),
            ConfigurationRole::for_copy_of(&self.usage_role()),
            false,
        )
    }
}
