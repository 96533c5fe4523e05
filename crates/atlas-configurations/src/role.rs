//! Usage roles a configuration is created with.

use std::fmt;

/// Permissions a configuration is created with, plus a deprecation flag per
/// permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConfigurationRole {
    name: &'static str,
    consumable: bool,
    resolvable: bool,
    declarable: bool,
    consumption_deprecated: bool,
    resolution_deprecated: bool,
    declaration_deprecated: bool,
}

impl ConfigurationRole {
    /// Permits every usage. Configurations created through `create` get this role.
    pub const LEGACY: ConfigurationRole = ConfigurationRole::new("Legacy", true, true, true);
    pub const CONSUMABLE: ConfigurationRole = ConfigurationRole::new("Consumable", true, false, false);
    pub const RESOLVABLE: ConfigurationRole = ConfigurationRole::new("Resolvable", false, true, false);
    pub const DEPENDENCY_SCOPE: ConfigurationRole =
        ConfigurationRole::new("Dependency Scope", false, false, true);
    pub const RESOLVABLE_DEPENDENCY_SCOPE: ConfigurationRole =
        ConfigurationRole::new("Resolvable Dependency Scope", false, true, true);
    pub const CONSUMABLE_DEPENDENCY_SCOPE: ConfigurationRole =
        ConfigurationRole::new("Consumable Dependency Scope", true, false, true);

    /// Migration role for configurations on their way to resolvable dependency scopes.
    pub const LEGACY_TO_RESOLVABLE_DEPENDENCY_SCOPE: ConfigurationRole = ConfigurationRole {
        name: "Legacy To Resolvable Dependency Scope",
        consumable: true,
        resolvable: true,
        declarable: true,
        consumption_deprecated: true,
        resolution_deprecated: false,
        declaration_deprecated: false,
    };
    /// Migration role for configurations on their way to consumable.
    pub const LEGACY_TO_CONSUMABLE: ConfigurationRole = ConfigurationRole {
        name: "Legacy To Consumable",
        consumable: true,
        resolvable: true,
        declarable: true,
        consumption_deprecated: false,
        resolution_deprecated: true,
        declaration_deprecated: true,
    };
    /// Migration role for configurations on their way to resolvable.
    pub const RESOLVABLE_DEPENDENCY_SCOPE_TO_RESOLVABLE: ConfigurationRole = ConfigurationRole {
        name: "Resolvable Dependency Scope To Resolvable",
        consumable: false,
        resolvable: true,
        declarable: true,
        consumption_deprecated: false,
        resolution_deprecated: false,
        declaration_deprecated: true,
    };
    /// Migration role for configurations on their way to dependency scopes.
    pub const LEGACY_TO_DEPENDENCY_SCOPE: ConfigurationRole = ConfigurationRole {
        name: "Legacy To Dependency Scope",
        consumable: true,
        resolvable: true,
        declarable: true,
        consumption_deprecated: true,
        resolution_deprecated: true,
        declaration_deprecated: false,
    };

    /// Roles accepted by `migrating_unlocked`.
    pub const MIGRATION_ROLES: [ConfigurationRole; 4] = [
        ConfigurationRole::LEGACY_TO_RESOLVABLE_DEPENDENCY_SCOPE,
        ConfigurationRole::LEGACY_TO_CONSUMABLE,
        ConfigurationRole::RESOLVABLE_DEPENDENCY_SCOPE_TO_RESOLVABLE,
        ConfigurationRole::LEGACY_TO_DEPENDENCY_SCOPE,
    ];

    /// Roles accepted by the `maybe_create_*` family.
    pub const MAYBE_CREATE_ROLES: [ConfigurationRole; 4] = [
        ConfigurationRole::CONSUMABLE,
        ConfigurationRole::RESOLVABLE,
        ConfigurationRole::DEPENDENCY_SCOPE,
        ConfigurationRole::RESOLVABLE_DEPENDENCY_SCOPE,
    ];

    const fn new(name: &'static str, consumable: bool, resolvable: bool, declarable: bool) -> Self {
        Self {
            name,
            consumable,
            resolvable,
            declarable,
            consumption_deprecated: false,
            resolution_deprecated: false,
            declaration_deprecated: false,
        }
    }

    /// Role given to copies: every usage permitted, but the ones `source`
    /// did not permit are deprecated.
    pub fn for_copy_of(source: &ConfigurationRole) -> Self {
        Self {
            name: "Copy",
            consumable: true,
            resolvable: true,
            declarable: true,
            consumption_deprecated: !source.consumable || source.consumption_deprecated,
            resolution_deprecated: !source.resolvable || source.resolution_deprecated,
            declaration_deprecated: !source.declarable || source.declaration_deprecated,
        }
    }

    /// Role describing an arbitrary usage combination.
    pub fn from_usage(
        consumable: bool,
        resolvable: bool,
        declarable: bool,
        consumption_deprecated: bool,
        resolution_deprecated: bool,
        declaration_deprecated: bool,
    ) -> Self {
        Self {
            name: "Custom",
            consumable,
            resolvable,
            declarable,
            consumption_deprecated,
            resolution_deprecated,
            declaration_deprecated,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_consumable(&self) -> bool {
        self.consumable
    }

    pub fn is_resolvable(&self) -> bool {
        self.resolvable
    }

    pub fn is_declarable(&self) -> bool {
        self.declarable
    }

    pub fn is_consumption_deprecated(&self) -> bool {
        self.consumption_deprecated
    }

    pub fn is_resolution_deprecated(&self) -> bool {
        self.resolution_deprecated
    }

    pub fn is_declaration_deprecated(&self) -> bool {
        self.declaration_deprecated
    }

    pub fn is_legacy(&self) -> bool {
        *self == ConfigurationRole::LEGACY
    }

    pub fn is_migration_role(&self) -> bool {
        Self::MIGRATION_ROLES.contains(self)
    }

    /// Whether the permitted usage matches `other`, ignoring names.
    pub fn has_same_usage(&self, other: &ConfigurationRole) -> bool {
        self.consumable == other.consumable
            && self.resolvable == other.resolvable
            && self.declarable == other.declarable
    }

    /// One line per permitted usage, tab indented.
    pub fn describe_usage(&self) -> String {
        describe_usage(
            self.consumable,
            self.resolvable,
            self.declarable,
            self.consumption_deprecated,
            self.resolution_deprecated,
            self.declaration_deprecated,
        )
    }
}

impl fmt::Display for ConfigurationRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

pub(crate) fn describe_usage(
    consumable: bool,
    resolvable: bool,
    declarable: bool,
    consumption_deprecated: bool,
    resolution_deprecated: bool,
    declaration_deprecated: bool,
) -> String {
    let mut lines = Vec::new();
    let mut push = |allowed: bool, deprecated: bool, text: &str| {
        if allowed {
            let suffix = if deprecated {
                " (but this behavior is marked deprecated)"
            } else {
                ""
            };
            lines.push(format!("\t{text}{suffix}"));
        }
    };
    push(
        consumable,
        consumption_deprecated,
        "Consumable - this configuration can be selected by another project as a dependency",
    );
    push(
        resolvable,
        resolution_deprecated,
        "Resolvable - this configuration can be resolved by this project to a set of files",
    );
    push(
        declarable,
        declaration_deprecated,
        "Declarable - this configuration can have dependencies added to it",
    );
    if lines.is_empty() {
        return "\tThis configuration does not allow any usage".to_string();
    }
    lines.join("\n")
}

/// Usage a method expects of the configuration it is called on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProperMethodUsage {
    Consumable,
    Resolvable,
    DeclarableAgainst,
}

impl ProperMethodUsage {
    pub fn display_name(self) -> &'static str {
        match self {
            ProperMethodUsage::Consumable => "Consumable",
            ProperMethodUsage::Resolvable => "Resolvable",
            ProperMethodUsage::DeclarableAgainst => "Declarable Against",
        }
    }

    pub fn summarize(usages: &[ProperMethodUsage]) -> String {
        usages
            .iter()
            .map(|usage| usage.display_name())
            .collect::<Vec<_>>()
            .join(", ")
    }
}
