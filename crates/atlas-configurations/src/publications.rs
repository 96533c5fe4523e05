//! Outgoing side of a configuration: capabilities and secondary variants.

use crate::attributes::{AttributeContainer, Attributes};
use crate::dependency::{Capability, PublishArtifact};
use crate::error::{ConfigurationError, ConfigurationResult};
use indexmap::IndexMap;

/// A secondary variant published next to the configuration itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigurationVariant {
    name: String,
    owner: String,
    description: Option<String>,
    attributes: AttributeContainer,
    artifacts: Vec<PublishArtifact>,
    frozen: Option<String>,
}

impl ConfigurationVariant {
    fn new(owner: &str, name: &str) -> Self {
        let display_name = format!("variant '{name}' of {owner}");
        Self {
            name: name.to_string(),
            attributes: AttributeContainer::new(display_name.clone()),
            owner: display_name,
            description: None,
            artifacts: Vec::new(),
            frozen: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = Some(description.into());
    }

    pub fn attribute(&mut self, key: &str, value: &str) -> ConfigurationResult<&mut Self> {
        self.attributes.attribute(key, value)?;
        Ok(self)
    }

    pub fn attributes(&self) -> Attributes {
        self.attributes.as_immutable()
    }

    pub fn artifact(&mut self, artifact: PublishArtifact) -> ConfigurationResult<&mut Self> {
        if let Some(reason) = &self.frozen {
            return Err(ConfigurationError::publications_frozen(
                &self.owner,
                format!("artifact '{}'", artifact.name),
                reason,
            ));
        }
        self.artifacts.push(artifact);
        Ok(self)
    }

    pub fn artifacts(&self) -> &[PublishArtifact] {
        &self.artifacts
    }

    fn freeze(&mut self, reason: &str) {
        if self.frozen.is_none() {
            self.frozen = Some(reason.to_string());
        }
        self.attributes.freeze(reason);
    }
}

/// Outgoing publications of a configuration. Frozen once the configuration
/// is observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigurationPublications {
    owner: String,
    capabilities: Vec<Capability>,
    variants: IndexMap<String, ConfigurationVariant>,
    frozen: Option<String>,
}

impl ConfigurationPublications {
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            capabilities: Vec::new(),
            variants: IndexMap::new(),
            frozen: None,
        }
    }

    /// Declare a capability from `group:name[:version]`.
    pub fn capability(&mut self, notation: &str) -> ConfigurationResult<&mut Self> {
        self.assert_mutable(|| format!("capability '{notation}'"))?;
        let capability = Capability::parse(notation)?;
        if !self.capabilities.contains(&capability) {
            self.capabilities.push(capability);
        }
        Ok(self)
    }

    pub fn capabilities(&self) -> &[Capability] {
        &self.capabilities
    }

    /// Create the variant `name` if needed and configure it.
    pub fn variant(
        &mut self,
        name: &str,
        configure: impl FnOnce(&mut ConfigurationVariant) -> ConfigurationResult<()>,
    ) -> ConfigurationResult<()> {
        if !self.variants.contains_key(name) {
            self.assert_mutable(|| format!("variant '{name}'"))?;
        }
        let owner = self.owner.clone();
        let variant = self
            .variants
            .entry(name.to_string())
            .or_insert_with(|| ConfigurationVariant::new(&owner, name));
        configure(variant)
    }

    pub fn variants(&self) -> impl Iterator<Item = &ConfigurationVariant> {
        self.variants.values()
    }

    pub fn find_variant(&self, name: &str) -> Option<&ConfigurationVariant> {
        self.variants.get(name)
    }

    /// Freeze the publications and every variant. The first reason is kept.
    pub fn prevent_from_further_mutation(&mut self, reason: &str) {
        if self.frozen.is_none() {
            self.frozen = Some(reason.to_string());
        }
        for variant in self.variants.values_mut() {
            variant.freeze(reason);
        }
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen.is_some()
    }

    pub fn frozen_reason(&self) -> Option<&str> {
        self.frozen.as_deref()
    }

    fn assert_mutable(&self, what: impl FnOnce() -> String) -> ConfigurationResult<()> {
        if let Some(reason) = &self.frozen {
            return Err(ConfigurationError::publications_frozen(&self.owner, what(), reason));
        }
        Ok(())
    }
}
