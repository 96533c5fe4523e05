//! Dependency management settings
//!
//! Read from the `[dependency-management]` table of `atlas.toml`, then
//! overridden by `ATLAS_*` environment variables:
//! - `ATLAS_STRICT_USAGE_CHANGES`
//! - `ATLAS_FAIL_ON_VERSION_CONFLICT`
//! - `ATLAS_DEPENDENCY_LOCKING`
//! - `ATLAS_RESOLVE_GRAPH_FOR_TASK_DEPENDENCIES`
//! - `ATLAS_CACHE_DYNAMIC_VERSIONS_SECS`
//! - `ATLAS_CACHE_CHANGING_MODULES_SECS`

use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use thiserror::Error;

const DAY_SECS: u64 = 24 * 60 * 60;
const MAX_CACHE_SECS: u64 = 365 * DAY_SECS;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Settings file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read settings file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML syntax in {file}: {error}")]
    TomlParse {
        file: PathBuf,
        error: toml::de::Error,
    },

    #[error("Invalid settings: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

pub type SettingsResult<T> = Result<T, SettingsError>;

/// Settings shared by every configuration container of a build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct DependencyManagementSettings {
    /// Report redundant usage changes on configurations with a role as warnings
    pub strict_usage_changes: bool,

    /// Default time to cache dynamic versions (default: 24h)
    pub cache_dynamic_versions_secs: u64,

    /// Default time to cache changing modules (default: 24h)
    pub cache_changing_modules_secs: u64,

    /// New strategies fail on version conflicts
    pub fail_on_version_conflict: bool,

    /// New strategies have dependency locking enabled
    pub dependency_locking: bool,

    /// Build dependencies are computed from the full graph
    pub resolve_graph_for_task_dependencies: bool,
}

impl Default for DependencyManagementSettings {
    fn default() -> Self {
        Self {
            strict_usage_changes: false,
            cache_dynamic_versions_secs: DAY_SECS,
            cache_changing_modules_secs: DAY_SECS,
            fail_on_version_conflict: false,
            dependency_locking: false,
            resolve_graph_for_task_dependencies: false,
        }
    }
}

/// The part of `atlas.toml` these settings live in. Other tables are ignored.
#[derive(Debug, Default, Deserialize)]
struct ManifestSection {
    #[serde(default, rename = "dependency-management")]
    dependency_management: Option<DependencyManagementSettings>,
}

impl DependencyManagementSettings {
    /// Parse the settings table itself.
    pub fn from_toml_str(content: &str) -> SettingsResult<Self> {
        let settings: Self = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load the `[dependency-management]` table of a manifest. A manifest
    /// without the table yields the defaults.
    pub fn load_from_file(path: &Path) -> SettingsResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                SettingsError::NotFound(path.to_path_buf())
            } else {
                SettingsError::Io(e)
            }
        })?;

        let section: ManifestSection =
            toml::from_str(&content).map_err(|e| SettingsError::TomlParse {
                file: path.to_path_buf(),
                error: e,
            })?;

        let settings = section.dependency_management.unwrap_or_default();
        settings.validate()?;
        Ok(settings)
    }

    /// Load from `path` and apply environment overrides.
    pub fn load(path: &Path) -> SettingsResult<Self> {
        Self::load_from_file(path)?.apply_env_overrides()
    }

    /// Validate the settings
    pub fn validate(&self) -> SettingsResult<()> {
        validate_cache_secs("cache-dynamic-versions-secs", self.cache_dynamic_versions_secs)?;
        validate_cache_secs("cache-changing-modules-secs", self.cache_changing_modules_secs)?;
        Ok(())
    }

    /// Apply `ATLAS_*` environment variable overrides.
    pub fn apply_env_overrides(mut self) -> SettingsResult<Self> {
        if let Some(value) = env_flag("ATLAS_STRICT_USAGE_CHANGES") {
            self.strict_usage_changes = value;
        }
        if let Some(value) = env_flag("ATLAS_FAIL_ON_VERSION_CONFLICT") {
            self.fail_on_version_conflict = value;
        }
        if let Some(value) = env_flag("ATLAS_DEPENDENCY_LOCKING") {
            self.dependency_locking = value;
        }
        if let Some(value) = env_flag("ATLAS_RESOLVE_GRAPH_FOR_TASK_DEPENDENCIES") {
            self.resolve_graph_for_task_dependencies = value;
        }
        if let Some(value) = env_secs("ATLAS_CACHE_DYNAMIC_VERSIONS_SECS")? {
            self.cache_dynamic_versions_secs = value;
        }
        if let Some(value) = env_secs("ATLAS_CACHE_CHANGING_MODULES_SECS")? {
            self.cache_changing_modules_secs = value;
        }
        self.validate()?;
        Ok(self)
    }
}

fn env_flag(name: &str) -> Option<bool> {
    env::var(name)
        .ok()
        .map(|value| matches!(value.to_lowercase().as_str(), "true" | "1" | "yes"))
}

fn env_secs(name: &str) -> SettingsResult<Option<u64>> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|e| SettingsError::InvalidValue {
                field: name.to_string(),
                reason: e.to_string(),
            }),
        Err(_) => Ok(None),
    }
}

fn validate_cache_secs(field: &str, secs: u64) -> SettingsResult<()> {
    if secs > MAX_CACHE_SECS {
        return Err(SettingsError::InvalidValue {
            field: field.to_string(),
            reason: format!("must be at most {} seconds, got {}", MAX_CACHE_SECS, secs),
        });
    }
    Ok(())
}
