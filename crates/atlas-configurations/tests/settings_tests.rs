// Integration tests for dependency management settings

mod common;

use atlas_configurations::{ConflictResolution, DependencyManagementSettings, SettingsError};
use common::Fixture;
use pretty_assertions::assert_eq;
use serial_test::serial;
use std::env;
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

const ENV_VARS: &[&str] = &[
    "ATLAS_STRICT_USAGE_CHANGES",
    "ATLAS_FAIL_ON_VERSION_CONFLICT",
    "ATLAS_DEPENDENCY_LOCKING",
    "ATLAS_RESOLVE_GRAPH_FOR_TASK_DEPENDENCIES",
    "ATLAS_CACHE_DYNAMIC_VERSIONS_SECS",
    "ATLAS_CACHE_CHANGING_MODULES_SECS",
];

fn clear_env() {
    for name in ENV_VARS {
        env::remove_var(name);
    }
}

// ============================================================================
// Loading from atlas.toml
// ============================================================================

#[test]
fn test_load_dependency_management_table() {
    let temp_dir = TempDir::new().unwrap();
    let manifest = temp_dir.path().join("atlas.toml");
    fs::write(
        &manifest,
        r#"
[package]
name = "app"
version = "0.1.0"

[dependency-management]
strict-usage-changes = true
fail-on-version-conflict = true
cache-dynamic-versions-secs = 600
"#,
    )
    .unwrap();

    let settings = DependencyManagementSettings::load_from_file(&manifest).unwrap();

    assert!(settings.strict_usage_changes);
    assert!(settings.fail_on_version_conflict);
    assert!(!settings.dependency_locking);
    assert_eq!(settings.cache_dynamic_versions_secs, 600);
    assert_eq!(settings.cache_changing_modules_secs, 86_400);
}

#[test]
fn test_manifest_without_table_uses_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let manifest = temp_dir.path().join("atlas.toml");
    fs::write(&manifest, "[package]\nname = \"app\"\n").unwrap();

    let settings = DependencyManagementSettings::load_from_file(&manifest).unwrap();

    assert_eq!(settings, DependencyManagementSettings::default());
}

#[test]
fn test_missing_manifest() {
    let temp_dir = TempDir::new().unwrap();
    let manifest = temp_dir.path().join("atlas.toml");

    let result = DependencyManagementSettings::load_from_file(&manifest);

    match result {
        Err(SettingsError::NotFound(path)) => assert_eq!(path, manifest),
        other => panic!("expected not found, got {:?}", other),
    }
}

#[test]
fn test_invalid_manifest_syntax() {
    let temp_dir = TempDir::new().unwrap();
    let manifest = temp_dir.path().join("atlas.toml");
    fs::write(&manifest, "[dependency-management\nstrict-usage-changes = true").unwrap();

    let result = DependencyManagementSettings::load_from_file(&manifest);

    assert!(matches!(result, Err(SettingsError::TomlParse { .. })));
}

#[test]
fn test_unknown_key_in_table_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let manifest = temp_dir.path().join("atlas.toml");
    fs::write(&manifest, "[dependency-management]\nfail-fast = true\n").unwrap();

    let result = DependencyManagementSettings::load_from_file(&manifest);

    assert!(matches!(result, Err(SettingsError::TomlParse { .. })));
}

#[test]
fn test_settings_serialize_back_to_kebab_case() {
    let settings = DependencyManagementSettings {
        dependency_locking: true,
        ..Default::default()
    };

    let content = toml::to_string(&settings).unwrap();

    assert!(content.contains("dependency-locking = true"));
    assert_eq!(DependencyManagementSettings::from_toml_str(&content).unwrap(), settings);
}

// ============================================================================
// Environment overrides
// ============================================================================

#[test]
#[serial]
fn test_env_overrides_manifest() {
    clear_env();
    let temp_dir = TempDir::new().unwrap();
    let manifest = temp_dir.path().join("atlas.toml");
    fs::write(
        &manifest,
        "[dependency-management]\nstrict-usage-changes = true\ncache-changing-modules-secs = 60\n",
    )
    .unwrap();
    env::set_var("ATLAS_STRICT_USAGE_CHANGES", "false");
    env::set_var("ATLAS_DEPENDENCY_LOCKING", "yes");
    env::set_var("ATLAS_CACHE_CHANGING_MODULES_SECS", "120");

    let settings = DependencyManagementSettings::load(&manifest);
    clear_env();
    let settings = settings.unwrap();

    assert!(!settings.strict_usage_changes);
    assert!(settings.dependency_locking);
    assert_eq!(settings.cache_changing_modules_secs, 120);
}

#[test]
#[serial]
fn test_env_secs_must_be_a_number() {
    clear_env();
    env::set_var("ATLAS_CACHE_DYNAMIC_VERSIONS_SECS", "one day");

    let result = DependencyManagementSettings::default().apply_env_overrides();
    clear_env();

    match result {
        Err(SettingsError::InvalidValue { field, .. }) => {
            assert_eq!(field, "ATLAS_CACHE_DYNAMIC_VERSIONS_SECS")
        }
        other => panic!("expected invalid value, got {:?}", other),
    }
}

#[test]
#[serial]
fn test_env_secs_are_validated() {
    clear_env();
    env::set_var("ATLAS_CACHE_DYNAMIC_VERSIONS_SECS", "99999999999");

    let result = DependencyManagementSettings::default().apply_env_overrides();
    clear_env();

    assert!(matches!(result, Err(SettingsError::InvalidValue { .. })));
}

#[test]
#[serial]
fn test_no_env_keeps_settings() {
    clear_env();

    let settings = DependencyManagementSettings::default().apply_env_overrides().unwrap();

    assert_eq!(settings, DependencyManagementSettings::default());
}

// ============================================================================
// Settings reach new configurations
// ============================================================================

#[test]
fn test_settings_initialise_strategies() {
    let fx = Fixture::with_settings(DependencyManagementSettings {
        fail_on_version_conflict: true,
        dependency_locking: true,
        cache_dynamic_versions_secs: 600,
        ..Default::default()
    });

    let strategy = fx.legacy("conf").resolution_strategy();

    assert_eq!(strategy.conflict_resolution(), ConflictResolution::Strict);
    assert!(strategy.is_dependency_locking_enabled());
    assert_eq!(strategy.dynamic_versions_cache_duration(), Duration::from_secs(600));
    assert_eq!(strategy.changing_modules_cache_duration(), Duration::from_secs(86_400));
}
