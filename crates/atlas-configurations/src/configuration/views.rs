//! Live views over the dependencies, constraints and artifacts of a
//! configuration.

use super::{CompositeKind, Configuration};
use crate::dependency::{Dependency, DependencyConstraint, PublishArtifact};
use crate::error::{ConfigurationError, ConfigurationResult};
use indexmap::IndexSet;
use std::fmt;
use std::hash::Hash;
use std::marker::PhantomData;

/// Something a configuration holds in a composite view.
pub trait ViewItem: Clone + Eq + Hash + Send + Sync + 'static {
    #[doc(hidden)]
    fn describe() -> &'static str;

    #[doc(hidden)]
    fn own_items(configuration: &Configuration) -> Vec<Self>;

    #[doc(hidden)]
    fn add_own(configuration: &Configuration, item: Self) -> ConfigurationResult<()>;

    #[doc(hidden)]
    fn remove_own(configuration: &Configuration, item: &Self) -> ConfigurationResult<bool>;

    #[doc(hidden)]
    fn inherited_from(configuration: &Configuration) -> Vec<Configuration>;
}

impl ViewItem for Dependency {
    fn describe() -> &'static str {
        "dependencies"
    }

    fn own_items(configuration: &Configuration) -> Vec<Self> {
        configuration.own_dependencies()
    }

    fn add_own(configuration: &Configuration, item: Self) -> ConfigurationResult<()> {
        configuration.add_dependency(item)
    }

    fn remove_own(configuration: &Configuration, item: &Self) -> ConfigurationResult<bool> {
        configuration.remove_dependency(item)
    }

    fn inherited_from(configuration: &Configuration) -> Vec<Configuration> {
        configuration.composite_sources(CompositeKind::Dependencies)
    }
}

impl ViewItem for DependencyConstraint {
    fn describe() -> &'static str {
        "dependency constraints"
    }

    fn own_items(configuration: &Configuration) -> Vec<Self> {
        configuration.own_constraints()
    }

    fn add_own(configuration: &Configuration, item: Self) -> ConfigurationResult<()> {
        configuration.add_dependency_constraint(item)
    }

    fn remove_own(configuration: &Configuration, item: &Self) -> ConfigurationResult<bool> {
        configuration.remove_dependency_constraint(item)
    }

    fn inherited_from(configuration: &Configuration) -> Vec<Configuration> {
        configuration.composite_sources(CompositeKind::Constraints)
    }
}

impl ViewItem for PublishArtifact {
    fn describe() -> &'static str {
        "artifacts"
    }

    fn own_items(configuration: &Configuration) -> Vec<Self> {
        configuration.own_artifacts()
    }

    fn add_own(configuration: &Configuration, item: Self) -> ConfigurationResult<()> {
        configuration.add_artifact(item)
    }

    fn remove_own(configuration: &Configuration, item: &Self) -> ConfigurationResult<bool> {
        configuration.remove_artifact(item)
    }

    fn inherited_from(configuration: &Configuration) -> Vec<Configuration> {
        configuration.composite_sources(CompositeKind::Artifacts)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    Own,
    Inherited,
}

/// A live view: every read reflects the current state of the configuration
/// and, for inherited views, of its parents.
///
/// Inherited views list own items first, then each parent's inherited
/// items in declaration order, keeping the first occurrence of duplicates.
/// They are read-only.
pub struct CompositeView<T> {
    configuration: Configuration,
    scope: Scope,
    _items: PhantomData<fn() -> T>,
}

pub type DependencySetView = CompositeView<Dependency>;
pub type DependencyConstraintSetView = CompositeView<DependencyConstraint>;
pub type ArtifactSetView = CompositeView<PublishArtifact>;

impl<T: ViewItem> CompositeView<T> {
    pub(crate) fn own(configuration: Configuration) -> Self {
        Self {
            configuration,
            scope: Scope::Own,
            _items: PhantomData,
        }
    }

    pub(crate) fn inherited(configuration: Configuration) -> Self {
        Self {
            configuration,
            scope: Scope::Inherited,
            _items: PhantomData,
        }
    }

    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    pub fn is_inherited(&self) -> bool {
        self.scope == Scope::Inherited
    }

    /// `all dependencies of configuration ':app:compileClasspath'`
    pub fn display_name(&self) -> String {
        match self.scope {
            Scope::Own => format!("{} of {}", T::describe(), self.configuration.display_name()),
            Scope::Inherited => format!("all {} of {}", T::describe(), self.configuration.display_name()),
        }
    }

    pub fn items(&self) -> Vec<T> {
        match self.scope {
            Scope::Own => T::own_items(&self.configuration),
            Scope::Inherited => {
                let mut items = IndexSet::new();
                collect_inherited(&self.configuration, &mut items);
                items.into_iter().collect()
            }
        }
    }

    pub fn iter(&self) -> std::vec::IntoIter<T> {
        self.items().into_iter()
    }

    pub fn len(&self) -> usize {
        self.items().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items().is_empty()
    }

    pub fn contains(&self, item: &T) -> bool {
        self.items().contains(item)
    }

    /// Add `item` to the configuration. Fails on inherited views.
    pub fn add(&self, item: T) -> ConfigurationResult<()> {
        self.assert_own()?;
        T::add_own(&self.configuration, item)
    }

    pub fn remove(&self, item: &T) -> ConfigurationResult<bool> {
        self.assert_own()?;
        T::remove_own(&self.configuration, item)
    }

    fn assert_own(&self) -> ConfigurationResult<()> {
        if self.is_inherited() {
            return self.configuration.fail(
                format!("Modifying the {}", self.display_name()),
                ConfigurationError::ReadOnlyView(self.display_name()),
            );
        }
        Ok(())
    }
}

fn collect_inherited<T: ViewItem>(configuration: &Configuration, items: &mut IndexSet<T>) {
    items.extend(T::own_items(configuration));
    for parent in T::inherited_from(configuration) {
        collect_inherited(&parent, items);
    }
}

impl<T> Clone for CompositeView<T> {
    fn clone(&self) -> Self {
        Self {
            configuration: self.configuration.clone(),
            scope: self.scope,
            _items: PhantomData,
        }
    }
}

impl<T: ViewItem> fmt::Debug for CompositeView<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CompositeView").field(&self.display_name()).finish()
    }
}
