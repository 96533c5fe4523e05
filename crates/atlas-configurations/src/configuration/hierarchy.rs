use super::{Configuration, ConfigurationInner};
use crate::dependency::ExcludeRule;
use crate::error::{ConfigurationError, ConfigurationResult};
use crate::mutation::MutationType;
use indexmap::IndexSet;
use std::collections::{HashSet, VecDeque};
use std::sync::Weak;

/// The kind of composite view a parent list belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CompositeKind {
    Dependencies,
    Constraints,
    Artifacts,
}

/// Parents feeding each inherited view. A slot stays `None` until its view
/// is first read, and is kept in step with `extends_from` afterwards.
#[derive(Default)]
pub(crate) struct CompositeSources {
    dependencies: Option<Vec<Configuration>>,
    constraints: Option<Vec<Configuration>>,
    artifacts: Option<Vec<Configuration>>,
}

impl CompositeSources {
    fn slot(&mut self, kind: CompositeKind) -> &mut Option<Vec<Configuration>> {
        match kind {
            CompositeKind::Dependencies => &mut self.dependencies,
            CompositeKind::Constraints => &mut self.constraints,
            CompositeKind::Artifacts => &mut self.artifacts,
        }
    }

    fn initialized(&mut self) -> impl Iterator<Item = &mut Vec<Configuration>> + '_ {
        [&mut self.dependencies, &mut self.constraints, &mut self.artifacts]
            .into_iter()
            .flatten()
    }
}

impl Configuration {
    /// Direct parents, in declaration order.
    pub fn extends_from_configurations(&self) -> Vec<Configuration> {
        self.inner.state.lock().parents.clone()
    }

    pub(crate) fn parents(&self) -> Vec<Configuration> {
        self.extends_from_configurations()
    }

    /// Add `parents` to the parents of this configuration.
    ///
    /// Every parent is checked before any of them is added: detached
    /// configurations take no part in hierarchies, parents must belong to
    /// the same context, and the result must stay acyclic.
    pub fn extends_from(&self, parents: &[&Configuration]) -> ConfigurationResult<()> {
        self.validate_mutation(MutationType::Hierarchy)?;
        self.check_parents(parents)?;

        for parent in parents {
            let added = {
                let mut state = self.inner.state.lock();
                if state.parents.contains(parent) {
                    false
                } else {
                    state.parents.push((*parent).clone());
                    true
                }
            };
            if added {
                for sources in self.inner.composites.lock().initialized() {
                    sources.push((*parent).clone());
                }
                parent.register_child(self);
                tracing::trace!(
                    configuration = %self.identity_path(),
                    parent = %parent.identity_path(),
                    "extends from"
                );
            }
        }
        Ok(())
    }

    /// Replace the parents of this configuration.
    pub fn set_extends_from(&self, parents: &[&Configuration]) -> ConfigurationResult<()> {
        self.validate_mutation(MutationType::Hierarchy)?;
        self.check_parents(parents)?;

        let mut replacement: Vec<Configuration> = Vec::new();
        for parent in parents {
            if !replacement.contains(parent) {
                replacement.push((*parent).clone());
            }
        }
        let previous = std::mem::replace(&mut self.inner.state.lock().parents, replacement.clone());
        for sources in self.inner.composites.lock().initialized() {
            *sources = replacement.clone();
        }
        for parent in &previous {
            parent.unregister_child(self);
        }
        for parent in &replacement {
            parent.register_child(self);
        }
        Ok(())
    }

    fn check_parents(&self, parents: &[&Configuration]) -> ConfigurationResult<()> {
        if self.is_detached() && !parents.is_empty() {
            let targets = parents
                .iter()
                .map(|parent| format!("'{}'", parent.name()))
                .collect::<Vec<_>>()
                .join(", ");
            return self.fail(
                format!("Calling extendsFrom on {}", self.display_name()),
                ConfigurationError::DetachedExtendsFrom {
                    display_name: self.display_name().to_string(),
                    targets,
                },
            );
        }

        for parent in parents {
            if parent.is_detached() {
                return self.fail(
                    format!("Extending detached {}", parent.display_name()),
                    ConfigurationError::ExtendsFromDetached {
                        display_name: self.display_name().to_string(),
                        detached: parent.name().to_string(),
                    },
                );
            }
            if parent.context() != self.context() {
                return self.fail(
                    format!("Extending a configuration of {}", parent.context()),
                    ConfigurationError::CrossContextExtension {
                        configuration: self.name().to_string(),
                        context: self.context().display_name().to_string(),
                        other: parent.name().to_string(),
                        other_context: parent.context().display_name().to_string(),
                    },
                );
            }
            let parent_hierarchy = parent.hierarchy();
            if parent_hierarchy.contains(self) {
                let hierarchy = parent_hierarchy
                    .iter()
                    .map(|configuration| configuration.name())
                    .collect::<Vec<_>>()
                    .join(", ");
                return self.fail(
                    format!("Cyclic extendsFrom on {}", self.display_name()),
                    ConfigurationError::CyclicExtendsFrom {
                        configuration: self.display_name().to_string(),
                        other: parent.display_name().to_string(),
                        hierarchy,
                    },
                );
            }
        }
        Ok(())
    }

    /// This configuration followed by all of its ancestors. An ancestor
    /// reachable along several paths appears once, at the position of its
    /// last visit.
    pub fn hierarchy(&self) -> Vec<Configuration> {
        let mut result = IndexSet::new();
        result.insert(self.clone());
        collect_super_configurations(self, &mut result);
        result.into_iter().collect()
    }

    /// Own exclude rules followed by those of every parent. Recomputed on
    /// each call.
    pub fn all_exclude_rules(&self) -> Vec<ExcludeRule> {
        let mut result: IndexSet<ExcludeRule> = self.exclude_rules().into_iter().collect();
        for parent in self.parents() {
            result.extend(parent.all_exclude_rules());
        }
        result.into_iter().collect()
    }

    /// Parents feeding the inherited view of `kind`, initialising them on
    /// first use.
    pub(crate) fn composite_sources(&self, kind: CompositeKind) -> Vec<Configuration> {
        let mut composites = self.inner.composites.lock();
        composites
            .slot(kind)
            .get_or_insert_with(|| self.inner.state.lock().parents.clone())
            .clone()
    }

    /// Run `action` on this configuration and then breadth first on every
    /// ancestor, once each. The hierarchy is read before the first action
    /// runs.
    pub(crate) fn run_in_hierarchy(
        &self,
        mut action: impl FnMut(&Configuration) -> ConfigurationResult<()>,
    ) -> ConfigurationResult<()> {
        for configuration in self.hierarchy_breadth_first() {
            action(&configuration)?;
        }
        Ok(())
    }

    /// This configuration, then its ancestors level by level, each once.
    pub(crate) fn hierarchy_breadth_first(&self) -> Vec<Configuration> {
        let mut seen: HashSet<Configuration> = HashSet::from([self.clone()]);
        let mut ordered = Vec::new();
        let mut remaining = VecDeque::from([self.clone()]);
        while let Some(current) = remaining.pop_front() {
            for parent in current.parents() {
                if seen.insert(parent.clone()) {
                    remaining.push_back(parent);
                }
            }
            ordered.push(current);
        }
        ordered
    }

    fn register_child(&self, child: &Configuration) {
        let mut children = self.inner.children.lock();
        children.retain(|existing| existing.strong_count() > 0);
        children.push(child.downgrade());
    }

    fn unregister_child(&self, child: &Configuration) {
        self.inner
            .children
            .lock()
            .retain(|existing| existing.strong_count() > 0 && !child.same_as(existing));
    }

    pub(crate) fn children(&self) -> Vec<Configuration> {
        self.inner
            .children
            .lock()
            .iter()
            .filter_map(Weak::upgrade)
            .map(|inner: std::sync::Arc<ConfigurationInner>| Configuration { inner })
            .collect()
    }
}

fn collect_super_configurations(configuration: &Configuration, result: &mut IndexSet<Configuration>) {
    for parent in configuration.parents() {
        result.shift_remove(&parent);
        result.insert(parent.clone());
        collect_super_configurations(&parent, result);
    }
}
