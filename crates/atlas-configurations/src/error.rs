/// Configuration error types
use crate::mutation::MutationType;
use crate::results::ResolveFailure;
use thiserror::Error;

pub type ConfigurationResult<T> = Result<T, ConfigurationError>;

/// Link handed out with resolution-safety failures.
pub const UNSAFE_RESOLUTION_DOCS: &str =
    "https://docs.atlas-lang.dev/build/dependencies#unsafe-configuration-resolution";

#[derive(Debug, Clone, Error)]
pub enum ConfigurationError {
    #[error(
        "Calling configuration method '{method}' is not allowed for configuration '{configuration}', which has permitted usage(s):\n{current_usage}\nThis method is only meant to be called on configurations which allow the usage(s): '{allowed_usage}'."
    )]
    InvalidUsage {
        method: String,
        configuration: String,
        current_usage: String,
        allowed_usage: String,
    },

    #[error(
        "Cannot mutate the {mutation} of {display_name} after the configuration was observed ({reason}). After a configuration has been resolved, consumed as a variant, or used for generating published metadata, it should not be modified.{hint}"
    )]
    MutationAfterObservation {
        mutation: MutationType,
        display_name: String,
        reason: String,
        hint: String,
    },

    #[error("Cannot change {mutation} of parent of {display_name} after it has been resolved")]
    ParentMutationAfterResolution {
        mutation: MutationType,
        display_name: String,
    },

    #[error(
        "Cannot change the allowed usage of {display_name}, as it was locked upon creation to the role: '{role}'.\nThis role permits the following usage:\n{usage}\nIdeally, each configuration should be used for a single purpose."
    )]
    UsageLocked {
        display_name: String,
        role: String,
        usage: String,
    },

    #[error(
        "Resolving dependency configuration '{name}' is not allowed as it is defined as 'canBeResolved=false'.\nInstead, a resolvable ('canBeResolved=true') dependency configuration that extends '{name}' should be resolved."
    )]
    NotResolvable { name: String },

    #[error("{action} is not allowed for configuration '{name}' as it is defined as 'canBeDeclared=false'.")]
    NotDeclarable { action: String, name: String },

    #[error("{0} is a read-only view. Add to the configuration's own set instead.")]
    ReadOnlyView(String),

    #[error(
        "Cannot mark the dependencies of {display_name} as observed before the configuration itself has been observed."
    )]
    NotObserved { display_name: String },

    #[error("Cyclic extendsFrom from {configuration} and {other} is not allowed. See existing hierarchy: [{hierarchy}]")]
    CyclicExtendsFrom {
        configuration: String,
        other: String,
        hierarchy: String,
    },

    #[error(
        "Configuration '{configuration}' in {context} extends configuration '{other}' in {other_context}. Configurations can only extend from configurations in the same project."
    )]
    CrossContextExtension {
        configuration: String,
        context: String,
        other: String,
        other_context: String,
    },

    #[error("Detached configurations should not extend other configurations, {display_name} was extending: {targets}.")]
    DetachedExtendsFrom { display_name: String, targets: String },

    #[error("{display_name} cannot extend from detached configuration '{detached}'.")]
    ExtendsFromDetached { display_name: String, detached: String },

    #[error(
        "The configuration {path} was resolved without holding the exclusive lock of its owning model. Acquire the model lock before resolving; see {documentation}"
    )]
    IllegalResolution { path: String, documentation: String },

    #[error("Could not resolve all {resolution_type} for {display_name}.{}", render_causes(.failures, .resolutions))]
    Resolve {
        resolution_type: String,
        display_name: String,
        failures: Vec<ResolveFailure>,
        resolutions: Vec<String>,
    },

    #[error("Could not resolve all dependencies for {display_name}.")]
    ResolverFailed {
        display_name: String,
        #[source]
        source: ResolveFailure,
    },

    #[error("Cycle detected in consistent resolution sources: {0}")]
    ConsistentResolutionCycle(String),

    #[error(
        "You can't use {source_name} as a consistent resolution source for {display_name} because it isn't a resolvable configuration."
    )]
    InvalidConsistentResolutionSource {
        source_name: String,
        display_name: String,
    },

    #[error("Cannot change attribute '{attribute}' of {owner}, as its attributes have been frozen ({reason}).")]
    AttributesFrozen {
        owner: String,
        attribute: String,
        reason: String,
    },

    #[error("Cannot add {what} to {owner} after it has been observed ({reason}).")]
    PublicationsFrozen { owner: String, what: String, reason: String },

    #[error("The configuration name '{0}' is reserved for detached configurations. Use a different name for the configuration.")]
    ReservedName(String),

    #[error("Cannot add a configuration with name '{0}' as a configuration with that name already exists.")]
    AlreadyExists(String),

    #[error("Configuration with name '{0}' not found.")]
    UnknownConfiguration(String),

    #[error("{0} directly to the configuration container is not allowed. Use a factory method instead.")]
    DirectAdd(String),

    #[error("Unknown migration role: {0}")]
    UnknownMigrationRole(String),

    #[error("Cannot maybe create invalid role: {0}")]
    InvalidMaybeCreateRole(String),

    #[error(
        "Configuration '{name}' already exists with permitted usage(s):\n{current_usage}\nYet it was requested with role '{requested_role}'."
    )]
    UnexpectedUsage {
        name: String,
        current_usage: String,
        requested_role: String,
    },

    #[error("Invalid dependency notation '{notation}': {reason}")]
    InvalidNotation { notation: String, reason: String },

    #[error("The complete results of {0} are no longer available")]
    ResultsUnavailable(String),
}

impl ConfigurationError {
    /// Create an invalid dependency notation error
    pub fn notation(notation: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidNotation {
            notation: notation.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a frozen attribute error
    pub fn attributes_frozen(
        owner: impl Into<String>,
        attribute: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::AttributesFrozen {
            owner: owner.into(),
            attribute: attribute.into(),
            reason: reason.into(),
        }
    }

    /// Create a frozen publications error
    pub fn publications_frozen(
        owner: impl Into<String>,
        what: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::PublicationsFrozen {
            owner: owner.into(),
            what: what.into(),
            reason: reason.into(),
        }
    }

    /// Failures stored in a deferred resolution error, if any.
    pub fn resolve_failures(&self) -> &[ResolveFailure] {
        match self {
            Self::Resolve { failures, .. } => failures,
            _ => &[],
        }
    }
}

fn render_causes(failures: &[ResolveFailure], resolutions: &[String]) -> String {
    let mut out = String::new();
    for failure in failures {
        out.push_str("\n   > ");
        out.push_str(&failure.to_string());
    }
    for resolution in resolutions {
        out.push_str("\n * ");
        out.push_str(resolution);
    }
    out
}
