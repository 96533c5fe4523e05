//! Attributes used for variant matching.

use crate::error::{ConfigurationError, ConfigurationResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Well known attribute keys.
pub mod keys {
    pub const USAGE: &str = "org.atlas.usage";
    pub const CATEGORY: &str = "org.atlas.category";
    pub const LIBRARY_ELEMENTS: &str = "org.atlas.libraryelements";
    pub const BUNDLING: &str = "org.atlas.dependency.bundling";
}

/// Immutable attribute snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attributes {
    values: BTreeMap<String, String>,
}

impl Attributes {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// Mutable attribute container that can be frozen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeContainer {
    owner: String,
    values: BTreeMap<String, String>,
    /// Why the container was frozen, if it was.
    frozen: Option<String>,
}

impl AttributeContainer {
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            values: BTreeMap::new(),
            frozen: None,
        }
    }

    /// Set `key` to `value`.
    pub fn attribute(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> ConfigurationResult<&mut Self> {
        let key = key.into();
        if let Some(reason) = &self.frozen {
            return Err(ConfigurationError::attributes_frozen(&self.owner, key, reason));
        }
        self.values.insert(key, value.into());
        Ok(self)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Reject any further change. The first reason is kept.
    pub fn freeze(&mut self, reason: &str) {
        if self.frozen.is_none() {
            self.frozen = Some(reason.to_string());
        }
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen.is_some()
    }

    pub fn frozen_reason(&self) -> Option<&str> {
        self.frozen.as_deref()
    }

    pub fn as_immutable(&self) -> Attributes {
        Attributes {
            values: self.values.clone(),
        }
    }
}
