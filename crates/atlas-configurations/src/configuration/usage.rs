use super::{Configuration, Usage};
use crate::error::{ConfigurationError, ConfigurationResult};
use crate::mutation::MutationType;
use crate::problems::Problem;
use crate::role::{ConfigurationRole, ProperMethodUsage};

#[derive(Debug, Clone, Copy)]
enum UsageFlag {
    Consumable,
    Resolvable,
    Declarable,
}

impl UsageFlag {
    fn setter(self) -> &'static str {
        match self {
            UsageFlag::Consumable => "setCanBeConsumed",
            UsageFlag::Resolvable => "setCanBeResolved",
            UsageFlag::Declarable => "setCanBeDeclared",
        }
    }

    fn get(self, usage: &Usage) -> bool {
        match self {
            UsageFlag::Consumable => usage.consumable,
            UsageFlag::Resolvable => usage.resolvable,
            UsageFlag::Declarable => usage.declarable,
        }
    }

    fn set(self, usage: &mut Usage, value: bool) {
        match self {
            UsageFlag::Consumable => usage.consumable = value,
            UsageFlag::Resolvable => usage.resolvable = value,
            UsageFlag::Declarable => usage.declarable = value,
        }
    }
}

impl Configuration {
    pub(crate) fn usage(&self) -> Usage {
        self.inner.state.lock().usage
    }

    pub fn is_can_be_consumed(&self) -> bool {
        self.usage().consumable
    }

    pub fn is_can_be_resolved(&self) -> bool {
        self.usage().resolvable
    }

    pub fn is_can_be_declared(&self) -> bool {
        self.usage().declarable
    }

    pub fn is_deprecated_for_consumption(&self) -> bool {
        self.usage().consumption_deprecated
    }

    pub fn is_deprecated_for_resolution(&self) -> bool {
        self.usage().resolution_deprecated
    }

    pub fn is_deprecated_for_declaration(&self) -> bool {
        self.usage().declaration_deprecated
    }

    pub fn usage_can_be_mutated(&self) -> bool {
        self.usage().mutable
    }

    /// Role matching the current usage flags.
    pub fn usage_role(&self) -> ConfigurationRole {
        let usage = self.usage();
        ConfigurationRole::from_usage(
            usage.consumable,
            usage.resolvable,
            usage.declarable,
            usage.consumption_deprecated,
            usage.resolution_deprecated,
            usage.declaration_deprecated,
        )
    }

    /// Tab-indented description of the current usage.
    pub fn describe_usage(&self) -> String {
        self.usage().describe()
    }

    pub fn set_can_be_consumed(&self, allowed: bool) -> ConfigurationResult<()> {
        self.change_usage(UsageFlag::Consumable, allowed)
    }

    pub fn set_can_be_resolved(&self, allowed: bool) -> ConfigurationResult<()> {
        self.change_usage(UsageFlag::Resolvable, allowed)
    }

    pub fn set_can_be_declared(&self, allowed: bool) -> ConfigurationResult<()> {
        self.change_usage(UsageFlag::Declarable, allowed)
    }

    /// Apply the usage of `role` without any of the warnings the public
    /// setters emit.
    pub fn set_allowed_usage_from_role(&self, role: &ConfigurationRole) -> ConfigurationResult<()> {
        self.apply_usage(UsageFlag::Consumable, role.is_consumable())?;
        self.apply_usage(UsageFlag::Resolvable, role.is_resolvable())?;
        self.apply_usage(UsageFlag::Declarable, role.is_declarable())?;
        let mut state = self.inner.state.lock();
        state.usage.consumption_deprecated = role.is_consumption_deprecated();
        state.usage.resolution_deprecated = role.is_resolution_deprecated();
        state.usage.declaration_deprecated = role.is_declaration_deprecated();
        Ok(())
    }

    /// Lock the usage for good.
    pub fn prevent_usage_mutation(&self) {
        self.inner.state.lock().usage.mutable = false;
    }

    fn change_usage(&self, flag: UsageFlag, allowed: bool) -> ConfigurationResult<()> {
        self.check_changing_usage(flag, allowed)?;
        self.apply_usage(flag, allowed)
    }

    fn apply_usage(&self, flag: UsageFlag, allowed: bool) -> ConfigurationResult<()> {
        if flag.get(&self.usage()) == allowed {
            return Ok(());
        }
        self.validate_mutation(MutationType::Usage)?;
        flag.set(&mut self.inner.state.lock().usage, allowed);
        Ok(())
    }

    fn check_changing_usage(&self, flag: UsageFlag, allowed: bool) -> ConfigurationResult<()> {
        if self.role_at_creation().is_legacy() {
            return Ok(());
        }
        let usage = self.usage();
        let current = flag.get(&usage);
        let call = format!("Calling {}({allowed}) on {}", flag.setter(), self.display_name());

        if !usage.mutable && current != allowed {
            return self.fail(call, self.usage_locked_error());
        }

        let redundant = current == allowed;
        let disabling_detached = self.is_detached() && !allowed;
        if (redundant || disabling_detached) && !self.services().settings.strict_usage_changes {
            return Ok(());
        }

        self.problems().report(
            Problem::warning(call)
                .with_details("This configuration's role was set upon creation and its usage should not be changed."),
        );
        Ok(())
    }

    pub(crate) fn assert_usage_is_mutable(&self) -> ConfigurationResult<()> {
        if self.usage_can_be_mutated() {
            return Ok(());
        }
        self.fail(
            format!("Changing the usage of {}", self.display_name()),
            self.usage_locked_error(),
        )
    }

    fn usage_locked_error(&self) -> ConfigurationError {
        let role = self.role_at_creation();
        ConfigurationError::UsageLocked {
            display_name: self.display_name().to_string(),
            role: role.name().to_string(),
            usage: role.describe_usage(),
        }
    }

    pub(crate) fn assert_is_resolvable(&self) -> ConfigurationResult<()> {
        if self.is_can_be_resolved() {
            return Ok(());
        }
        self.fail(
            format!("Resolving {}", self.display_name()),
            ConfigurationError::NotResolvable {
                name: self.name().to_string(),
            },
        )
    }

    pub(crate) fn assert_is_declarable(&self, action: &str) -> ConfigurationResult<()> {
        if self.is_can_be_declared() {
            return Ok(());
        }
        self.fail(
            format!("{action} on {}", self.display_name()),
            ConfigurationError::NotDeclarable {
                action: action.to_string(),
                name: self.name().to_string(),
            },
        )
    }

    /// Check that `method` suits the current usage.
    ///
    /// A method none of whose usages is permitted fails. A method whose
    /// permitted usages are all deprecated reports a warning, unless
    /// `allow_deprecated` is set for internal callers.
    pub(crate) fn check_proper_usage(
        &self,
        method: &str,
        allow_deprecated: bool,
        usages: &[ProperMethodUsage],
    ) -> ConfigurationResult<()> {
        let usage = self.usage();
        let permitted = usages.iter().any(|proper| usage.permits(*proper));
        if !permitted {
            return self.fail(
                format!("Calling configuration method '{method}' on {}", self.display_name()),
                ConfigurationError::InvalidUsage {
                    method: method.to_string(),
                    configuration: self.name().to_string(),
                    current_usage: usage.describe(),
                    allowed_usage: ProperMethodUsage::summarize(usages),
                },
            );
        }

        let proper = usages
            .iter()
            .any(|proper| usage.permits(*proper) && (allow_deprecated || !usage.deprecates(*proper)));
        if !proper {
            self.problems().report(
                Problem::warning(format!(
                    "Calling configuration method '{method}' is deprecated for configuration '{}'",
                    self.name()
                ))
                .with_details(format!(
                    "This configuration has permitted usage(s):\n{}\nThis method is only meant to be called on configurations which allow the (non-deprecated) usage(s): '{}'.",
                    usage.describe(),
                    ProperMethodUsage::summarize(usages)
                )),
            );
        }
        Ok(())
    }
}
