//! Mutation categories and the observation gate that decides which of them
//! are still permitted.

use crate::error::ConfigurationResult;
use std::fmt;

/// Category of change applied to a configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationType {
    /// Declared dependencies, constraints, exclude rules, transitivity and visibility.
    Dependencies,
    /// Attributes of declared dependencies.
    DependencyAttributes,
    /// Attributes of declared dependency constraints.
    DependencyConstraintAttributes,
    /// Published artifacts.
    Artifacts,
    /// Resolution strategy settings.
    Strategy,
    /// Parent configurations.
    Hierarchy,
    /// Consumable / resolvable / declarable flags.
    Usage,
}

impl MutationType {
    /// The categories that stay mutable after `mark_dependencies_observed`.
    pub fn is_dependency_category(self) -> bool {
        matches!(
            self,
            MutationType::Dependencies
                | MutationType::DependencyAttributes
                | MutationType::DependencyConstraintAttributes
        )
    }
}

impl fmt::Display for MutationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            MutationType::Dependencies => "dependencies",
            MutationType::DependencyAttributes => "dependency attributes",
            MutationType::DependencyConstraintAttributes => "dependency constraint attributes",
            MutationType::Artifacts => "artifacts",
            MutationType::Strategy => "resolution strategy",
            MutationType::Hierarchy => "hierarchy",
            MutationType::Usage => "usage",
        };
        f.write_str(text)
    }
}

/// Where a configuration sits on the observation axis.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ObservationState {
    #[default]
    Unobserved,
    Observed { reason: String },
    DependenciesObserved { reason: String },
}

impl ObservationState {
    pub fn is_observed(&self) -> bool {
        !matches!(self, ObservationState::Unobserved)
    }

    /// Reason recorded by the first observation.
    pub fn reason(&self) -> Option<&str> {
        match self {
            ObservationState::Unobserved => None,
            ObservationState::Observed { reason }
            | ObservationState::DependenciesObserved { reason } => Some(reason),
        }
    }

    /// The mutation table.
    ///
    /// | state                  | mutation                 | fully resolved | allowed |
    /// |------------------------|--------------------------|----------------|---------|
    /// | unobserved             | any                      | any            | yes     |
    /// | observed               | strategy                 | no             | yes     |
    /// | dependencies observed  | dependency categories    | any            | yes     |
    /// | observed               | anything else            | any            | no      |
    pub fn allows(&self, mutation: MutationType, fully_resolved: bool) -> bool {
        match self {
            ObservationState::Unobserved => true,
            _ if mutation == MutationType::Strategy => !fully_resolved,
            ObservationState::DependenciesObserved { .. } => mutation.is_dependency_category(),
            ObservationState::Observed { .. } => false,
        }
    }
}

/// Something that must be consulted before a mutation of a given category.
pub trait MutationValidator: Send + Sync {
    fn validate_mutation(&self, mutation: MutationType) -> ConfigurationResult<()>;
}
