//! Declared dependencies, constraints, exclude rules, artifacts and
//! capabilities, together with their string notations.

use crate::attributes::Attributes;
use crate::error::{ConfigurationError, ConfigurationResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// External module dependency.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModuleDependency {
    pub group: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default = "default_transitive")]
    pub transitive: bool,
    #[serde(default, skip_serializing_if = "Attributes::is_empty")]
    pub attributes: Attributes,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub excludes: Vec<ExcludeRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

fn default_transitive() -> bool {
    true
}

impl ModuleDependency {
    pub fn new(group: impl Into<String>, name: impl Into<String>, version: Option<&str>) -> Self {
        Self {
            group: group.into(),
            name: name.into(),
            version: version.map(str::to_string),
            transitive: true,
            attributes: Attributes::empty(),
            excludes: Vec::new(),
            reason: None,
        }
    }

    /// `group:name`
    pub fn module_id(&self) -> String {
        format!("{}:{}", self.group, self.name)
    }

    pub fn because(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn exclude(mut self, rule: ExcludeRule) -> Self {
        self.excludes.push(rule);
        self
    }

    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn non_transitive(mut self) -> Self {
        self.transitive = false;
        self
    }
}

impl fmt::Display for ModuleDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(version) => write!(f, "{}:{}:{}", self.group, self.name, version),
            None => write!(f, "{}:{}", self.group, self.name),
        }
    }
}

/// A declared dependency.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Dependency {
    /// External module such as `org.example:lib:1.0`
    Module(ModuleDependency),
    /// Another project of the build
    Project {
        path: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        configuration: Option<String>,
    },
    /// Local files
    Files { files: Vec<PathBuf> },
}

impl Dependency {
    /// Parse a string notation.
    ///
    /// Accepts `group:name`, `group:name:version` and `project(':path')`.
    pub fn parse(notation: &str) -> ConfigurationResult<Self> {
        let notation = notation.trim();
        if let Some(inner) = notation
            .strip_prefix("project(")
            .and_then(|rest| rest.strip_suffix(')'))
        {
            let path = inner.trim().trim_matches(|c: char| c == '\'' || c == '"');
            if !path.starts_with(':') {
                return Err(ConfigurationError::notation(
                    notation,
                    "project paths must be absolute",
                ));
            }
            return Ok(Dependency::project(path));
        }

        let (group, name, version) = split_coordinates(notation)?;
        Ok(Dependency::Module(ModuleDependency::new(group, name, version)))
    }

    pub fn module(group: impl Into<String>, name: impl Into<String>, version: &str) -> Self {
        Dependency::Module(ModuleDependency::new(group, name, Some(version)))
    }

    pub fn project(path: impl Into<String>) -> Self {
        Dependency::Project {
            path: path.into(),
            configuration: None,
        }
    }

    pub fn files<I, P>(files: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Dependency::Files {
            files: files.into_iter().map(Into::into).collect(),
        }
    }

    pub fn group(&self) -> Option<&str> {
        match self {
            Dependency::Module(module) => Some(&module.group),
            _ => None,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Dependency::Module(module) => &module.name,
            Dependency::Project { path, .. } => path.rsplit(':').next().unwrap_or(path),
            Dependency::Files { .. } => "unspecified",
        }
    }

    pub fn version(&self) -> Option<&str> {
        match self {
            Dependency::Module(module) => module.version.as_deref(),
            _ => None,
        }
    }

    pub fn as_module(&self) -> Option<&ModuleDependency> {
        match self {
            Dependency::Module(module) => Some(module),
            _ => None,
        }
    }

    pub(crate) fn as_module_mut(&mut self) -> Option<&mut ModuleDependency> {
        match self {
            Dependency::Module(module) => Some(module),
            _ => None,
        }
    }

    /// Whether this dependency has the given content, ignoring reasons and attributes.
    pub fn content_equals(&self, other: &Dependency) -> bool {
        match (self, other) {
            (Dependency::Module(a), Dependency::Module(b)) => {
                a.group == b.group && a.name == b.name && a.version == b.version
            }
            _ => self == other,
        }
    }
}

impl FromStr for Dependency {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Dependency::parse(s)
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dependency::Module(module) => write!(f, "{module}"),
            Dependency::Project { path, .. } => write!(f, "project '{path}'"),
            Dependency::Files { files } => write!(f, "files ({} entries)", files.len()),
        }
    }
}

/// Version constraint on a module that is not itself a dependency.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DependencyConstraint {
    pub group: String,
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub strict: bool,
    #[serde(default, skip_serializing_if = "Attributes::is_empty")]
    pub attributes: Attributes,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl DependencyConstraint {
    /// Parse `group:name:version`.
    pub fn parse(notation: &str) -> ConfigurationResult<Self> {
        match split_coordinates(notation.trim())? {
            (group, name, Some(version)) => Ok(Self::prefer(group, name, version)),
            _ => Err(ConfigurationError::notation(
                notation,
                "a constraint requires a version",
            )),
        }
    }

    pub fn prefer(group: impl Into<String>, name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            name: name.into(),
            version: version.into(),
            strict: false,
            attributes: Attributes::empty(),
            reason: None,
        }
    }

    pub fn strictly(group: impl Into<String>, name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            strict: true,
            ..Self::prefer(group, name, version)
        }
    }

    pub fn because(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn module_id(&self) -> String {
        format!("{}:{}", self.group, self.name)
    }
}

impl fmt::Display for DependencyConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.strict {
            write!(f, "{}:{}:{{strictly {}}}", self.group, self.name, self.version)
        } else {
            write!(f, "{}:{}:{}", self.group, self.name, self.version)
        }
    }
}

/// Excludes matching transitive modules from resolution.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExcludeRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
}

impl ExcludeRule {
    pub fn new(group: Option<&str>, module: Option<&str>) -> Self {
        Self {
            group: group.map(str::to_string),
            module: module.map(str::to_string),
        }
    }

    pub fn group(group: &str) -> Self {
        Self::new(Some(group), None)
    }

    pub fn module(group: &str, module: &str) -> Self {
        Self::new(Some(group), Some(module))
    }

    pub fn matches(&self, group: &str, name: &str) -> bool {
        self.group.as_deref().map_or(true, |g| g == group)
            && self.module.as_deref().map_or(true, |m| m == name)
    }
}

/// An artifact produced by a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PublishArtifact {
    pub name: String,
    pub extension: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classifier: Option<String>,
    pub file: PathBuf,
}

impl PublishArtifact {
    /// Artifact named after the file, e.g. `build/libs/app-1.0.jar`.
    pub fn from_file(file: impl Into<PathBuf>) -> Self {
        let file = file.into();
        let stem = file
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let extension = file
            .extension()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            name: stem,
            extension,
            classifier: None,
            file,
        }
    }

    pub fn with_classifier(mut self, classifier: impl Into<String>) -> Self {
        self.classifier = Some(classifier.into());
        self
    }
}

/// Something a component provides, `group:name:version`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Capability {
    pub group: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl Capability {
    pub fn parse(notation: &str) -> ConfigurationResult<Self> {
        let (group, name, version) = split_coordinates(notation.trim())?;
        Ok(Self {
            group: group.to_string(),
            name: name.to_string(),
            version: version.map(str::to_string),
        })
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(version) => write!(f, "{}:{}:{}", self.group, self.name, version),
            None => write!(f, "{}:{}", self.group, self.name),
        }
    }
}

fn split_coordinates(notation: &str) -> ConfigurationResult<(&str, &str, Option<&str>)> {
    let parts: Vec<&str> = notation.split(':').collect();
    if parts.iter().any(|part| part.trim().is_empty()) {
        return Err(ConfigurationError::notation(notation, "empty coordinate"));
    }
    match parts.as_slice() {
        [group, name] => Ok((*group, *name, None)),
        [group, name, version] => Ok((*group, *name, Some(*version))),
        _ => Err(ConfigurationError::notation(
            notation,
            "expected 'group:name' or 'group:name:version'",
        )),
    }
}
