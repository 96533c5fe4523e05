// Integration tests for resolving configurations through a resolver

mod common;

use atlas_configurations::{
    ComponentIdentifier, ConfigurationError, ConfigurationState, DependencyConstraint, DependencyManagementSettings,
    FailureKind, LockState, LockedModule,
};
use common::{FixedLocking, Fixture, RecordingListener};
use pretty_assertions::assert_eq;
use rstest::rstest;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::thread;

fn jar(group: &str, name: &str, version: &str) -> PathBuf {
    PathBuf::from(format!("/repo/{group}/{name}-{version}.jar"))
}

// ============================================================================
// Memoization and safety
// ============================================================================

#[test]
fn test_resolution_runs_once() {
    let fx = Fixture::new();
    let conf = fx.legacy("conf");
    conf.dependency("org.example:lib:1.0").unwrap();
    let _lock = fx.context.model().lock();

    let first = conf.resolve_graph_if_required().unwrap();
    let files = conf.files().unwrap();
    let second = conf.resolve_graph_if_required().unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(files, vec![jar("org.example", "lib", "1.0")]);
    assert_eq!(fx.resolver.graph_calls(), 1);
    assert_eq!(conf.state(), ConfigurationState::Resolved);
}

#[test]
fn test_resolution_without_model_lock_fails() {
    let fx = Fixture::new();
    let conf = fx.legacy("conf");

    let error = conf.files().unwrap_err();

    assert_eq!(
        error.to_string(),
        "The configuration :app:conf was resolved without holding the exclusive lock of its owning model. Acquire the model lock before resolving; see https://docs.atlas-lang.dev/build/dependencies#unsafe-configuration-resolution"
    );
    assert_eq!(fx.resolver.graph_calls(), 0);
    assert_eq!(conf.state(), ConfigurationState::Unresolved);
    assert_eq!(
        fx.error_labels(),
        vec!["Resolving configuration ':app:conf' without the model lock".to_string()]
    );
}

#[test]
fn test_resolving_a_non_resolvable_configuration_fails() {
    let fx = Fixture::new();
    let scope = fx.container.dependency_scope("implementation").unwrap().get().unwrap();
    let _lock = fx.context.model().lock();

    let error = scope.incoming().resolution_result().unwrap_err();

    assert!(matches!(error, ConfigurationError::NotResolvable { ref name } if name == "implementation"));
    assert_eq!(fx.resolver.graph_calls(), 0);
}

#[test]
fn test_concurrent_resolution_calls_resolver_once() {
    let fx = Fixture::new();
    let conf = fx.legacy("conf");
    conf.dependency("org.example:lib:1.0").unwrap();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let conf = conf.clone();
            let context = fx.context.clone();
            thread::spawn(move || {
                let _lock = context.model().lock();
                conf.files().unwrap()
            })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), vec![jar("org.example", "lib", "1.0")]);
    }

    assert_eq!(fx.resolver.graph_calls(), 1);
}

#[test]
fn test_resolver_error_is_not_memoized() {
    let fx = Fixture::new();
    let conf = fx.legacy("conf");
    fx.resolver.refuse();
    let _lock = fx.context.model().lock();

    let first = conf.files().unwrap_err();
    let second = conf.files().unwrap_err();

    assert_eq!(
        first.to_string(),
        "Could not resolve all dependencies for configuration ':app:conf'."
    );
    assert!(matches!(second, ConfigurationError::ResolverFailed { .. }));
    assert_eq!(fx.resolver.graph_calls(), 2);
    assert!(conf.resolver_results().is_none());
    assert_eq!(conf.state(), ConfigurationState::Unresolved);
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn test_unresolved_dependencies_fail_strict_views_only() {
    let fx = Fixture::new();
    let conf = fx.legacy("conf");
    conf.dependency("org.example:lib:1.0").unwrap();
    conf.dependency("org.missing:gone:1.0").unwrap();
    let _lock = fx.context.model().lock();

    let error = conf.files().unwrap_err();
    let lenient = conf.incoming().artifact_view(true);

    assert_eq!(
        error.to_string(),
        "Could not resolve all files for configuration ':app:conf'.\n   > Could not find org.missing:gone:1.0."
    );
    assert_eq!(lenient.files().unwrap(), vec![jar("org.example", "lib", "1.0")]);
    assert_eq!(lenient.failures().unwrap().len(), 1);
    assert_eq!(conf.state(), ConfigurationState::ResolvedWithFailures);
    // the graph itself did resolve
    assert!(conf.incoming().resolution_result().is_ok());
    assert_eq!(fx.resolver.graph_calls(), 1);
}

#[test]
fn test_resolved_configuration_reports_failures() {
    let fx = Fixture::new();
    let conf = fx.legacy("conf");
    conf.dependency("org.example:lib:1.0").unwrap();
    conf.dependency("org.missing:gone:1.0").unwrap();
    let _lock = fx.context.model().lock();

    let resolved = conf.resolved_configuration().unwrap();

    assert!(resolved.has_error());
    assert!(resolved.rethrow_failure().is_err());
    assert_eq!(resolved.lenient_files(), vec![jar("org.example", "lib", "1.0")]);
    assert!(matches!(
        resolved.unresolved_failures()[0].kind(),
        FailureKind::ModuleNotFound { .. }
    ));
}

#[test]
fn test_whole_graph_failure_fails_resolution_result() {
    let fx = Fixture::new();
    let conf = fx.legacy("conf");
    let listener = RecordingListener::new();
    conf.add_resolution_listener(listener.clone());
    fx.resolver.fail_whole_graph();
    let _lock = fx.context.model().lock();

    let error = conf.incoming().resolution_result().unwrap_err();

    assert!(error.to_string().starts_with("Could not resolve all dependencies for configuration ':app:conf'."));
    assert_eq!(listener.events(), vec!["before:conf".to_string()]);
    let finished = fx.operations.finished();
    assert_eq!(finished.len(), 1);
    assert_eq!(finished[0].failure.as_deref(), Some("Resolution of the graph was aborted."));
}

#[rstest]
#[case(false, "2.0")]
#[case(true, "")]
fn test_version_conflicts(#[case] fail_on_conflict: bool, #[case] selected: &str) {
    let fx = Fixture::new();
    let api = fx.legacy("api");
    let conf = fx.legacy("conf");
    conf.extends_from(&[&api]).unwrap();
    api.dependency("org.example:lib:1.0").unwrap();
    conf.dependency("org.example:lib:2.0").unwrap();
    if fail_on_conflict {
        conf.resolution_strategy().fail_on_version_conflict().unwrap();
    }
    let _lock = fx.context.model().lock();

    let result = conf.files();

    if fail_on_conflict {
        let message = result.unwrap_err().to_string();
        assert!(message.contains("Conflict found for module 'org.example:lib': versions 1.0, 2.0"));
        assert!(message.contains(
            " * Run with :app:dependencyInsight --configuration conf --dependency org.example:lib to get more insight on how to solve the conflict."
        ));
    } else {
        assert_eq!(result.unwrap(), vec![jar("org.example", "lib", selected)]);
    }
}

// ============================================================================
// Listeners and build operations
// ============================================================================

#[test]
fn test_listeners_fire_around_resolution_once() {
    let fx = Fixture::new();
    let conf = fx.legacy("conf");
    let listener = RecordingListener::new();
    let seen = Arc::new(Mutex::new(Vec::new()));
    conf.add_resolution_listener(listener.clone());
    {
        let seen = seen.clone();
        conf.incoming().after_resolve(move |incoming| {
            let files = incoming.artifact_view(true).files().unwrap();
            seen.lock().unwrap().push(files.len());
        });
    }
    conf.dependency("org.example:lib:1.0").unwrap();
    let _lock = fx.context.model().lock();

    conf.files().unwrap();
    conf.call_and_reset_resolution_state(|| ()).unwrap();
    conf.files().unwrap();

    assert_eq!(listener.events(), vec!["before:conf".to_string(), "after:conf".to_string()]);
    assert_eq!(*seen.lock().unwrap(), vec![1]);
    assert_eq!(conf.pending_listener_count(), 0);
    assert_eq!(fx.resolver.graph_calls(), 2);
}

#[test]
fn test_before_resolve_may_declare_dependencies() {
    let fx = Fixture::new();
    let conf = fx.legacy("conf");
    conf.incoming().before_resolve(|incoming| {
        incoming
            .configuration()
            .dependency("org.example:late:1.0")
            .unwrap();
    });
    let _lock = fx.context.model().lock();

    assert_eq!(conf.files().unwrap(), vec![jar("org.example", "late", "1.0")]);
}

#[test]
fn test_resolution_is_reported_as_build_operation() {
    let fx = Fixture::new();
    let conf = fx.legacy("conf");
    conf.set_description("Runtime classpath");
    conf.attributes(|attributes| attributes.attribute("usage", "java-runtime").map(|_| ()))
        .unwrap();
    let _lock = fx.context.model().lock();

    conf.files().unwrap();
    conf.files().unwrap();

    assert_eq!(fx.operations.started(), 1);
    let finished = fx.operations.finished();
    assert_eq!(finished.len(), 1);
    let operation = &finished[0];
    assert_eq!(operation.display_name, "Resolve dependencies of :app:conf");
    assert_eq!(operation.details.configuration_name, "conf");
    assert_eq!(operation.details.configuration_description.as_deref(), Some("Runtime classpath"));
    assert_eq!(operation.details.build_path, ":");
    assert_eq!(operation.details.project_path.as_deref(), Some(":app"));
    assert!(!operation.details.is_script_configuration);
    assert_eq!(operation.details.repositories, vec!["stub".to_string()]);
    assert_eq!(operation.failure, None);
    let result = operation.result.as_ref().unwrap();
    assert_eq!(result.root_component, "root :app:conf");
    assert_eq!(result.requested_attributes.get("usage"), Some("java-runtime"));
}

#[test]
fn test_resolution_freezes_requested_attributes() {
    let fx = Fixture::new();
    let conf = fx.legacy("conf");
    let _lock = fx.context.model().lock();
    conf.files().unwrap();

    let error = conf
        .attributes(|attributes| attributes.attribute("usage", "java-api").map(|_| ()))
        .unwrap_err();

    assert!(matches!(error, ConfigurationError::AttributesFrozen { .. }));
}

// ============================================================================
// Resetting
// ============================================================================

#[test]
fn test_call_and_reset_resolution_state_forgets_results() {
    let fx = Fixture::new();
    let conf = fx.legacy("conf");
    conf.dependency("org.example:lib:1.0").unwrap();
    let _lock = fx.context.model().lock();
    conf.files().unwrap();
    let strategy = conf.resolution_strategy();

    let kept = conf
        .call_and_reset_resolution_state(|| strategy.keeps_state_required_for_graph_resolution())
        .unwrap();

    assert!(kept);
    assert!(!strategy.keeps_state_required_for_graph_resolution());
    assert!(conf.resolver_results().is_none());
    assert_eq!(conf.state(), ConfigurationState::Unresolved);
    conf.files().unwrap();
    assert_eq!(fx.resolver.graph_calls(), 2);
    // observation survives the reset
    assert!(conf.is_observed());
}

#[test]
fn test_call_and_reset_resolution_state_resets_when_factory_panics() {
    let fx = Fixture::new();
    let conf = fx.legacy("conf");
    conf.dependency("org.example:lib:1.0").unwrap();
    let strategy = conf.resolution_strategy();
    let _lock = fx.context.model().lock();

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        conf.call_and_reset_resolution_state(|| {
            conf.files().unwrap();
            assert_eq!(conf.state(), ConfigurationState::Resolved);
            panic!("factory failed");
        })
    }));

    assert!(outcome.is_err());
    assert_eq!(conf.state(), ConfigurationState::Unresolved);
    assert!(conf.resolver_results().is_none());
    assert!(!strategy.keeps_state_required_for_graph_resolution());
}

#[test]
fn test_call_and_reset_resolution_state_requires_resolvable_usage() {
    let fx = Fixture::new();
    let elements = fx.container.consumable_unlocked("apiElements").unwrap();

    let error = elements.call_and_reset_resolution_state(|| ()).unwrap_err();

    assert!(matches!(
        error,
        ConfigurationError::InvalidUsage { ref method, .. } if method == "callAndResetResolutionState()"
    ));
    assert_eq!(
        fx.error_labels(),
        vec!["Calling configuration method 'callAndResetResolutionState()' on configuration ':app:apiElements'"]
    );
}

// ============================================================================
// Build dependencies
// ============================================================================

#[test]
fn test_build_dependencies_use_partial_results() {
    let fx = Fixture::new();
    let conf = fx.legacy("conf");
    conf.dependency("project(':lib')").unwrap();
    conf.dependency("org.example:lib:1.0").unwrap();

    let projects = conf.build_dependencies().unwrap();

    assert_eq!(projects, vec![ComponentIdentifier::Project { path: ":lib".to_string() }]);
    assert_eq!(fx.resolver.build_calls(), 1);
    assert_eq!(fx.resolver.graph_calls(), 0);
    assert_eq!(conf.state(), ConfigurationState::Unresolved);
    assert!(!conf.resolver_results().unwrap().is_fully_resolved());

    // partial results are reused, then replaced by the full graph
    conf.build_dependencies().unwrap();
    assert_eq!(fx.resolver.build_calls(), 1);
    let _lock = fx.context.model().lock();
    conf.files().unwrap();
    assert_eq!(fx.resolver.graph_calls(), 1);
    assert_eq!(conf.state(), ConfigurationState::Resolved);
    assert_eq!(conf.build_dependencies().unwrap().len(), 1);
    assert_eq!(fx.resolver.build_calls(), 1);
}

#[test]
fn test_build_dependencies_keep_full_results_requested_by_resolver() {
    let fx = Fixture::new();
    let conf = fx.legacy("conf");
    conf.dependency("project(':lib')").unwrap();
    fx.resolver.evaluate_future();

    conf.build_dependencies().unwrap();

    assert_eq!(fx.resolver.build_calls(), 1);
    assert_eq!(fx.resolver.graph_calls(), 1);
    assert!(conf.resolver_results().unwrap().is_fully_resolved());
    assert_eq!(conf.state(), ConfigurationState::Resolved);
}

#[test]
fn test_build_dependencies_from_full_graph_when_configured() {
    let fx = Fixture::with_settings(DependencyManagementSettings {
        resolve_graph_for_task_dependencies: true,
        ..Default::default()
    });
    let conf = fx.legacy("conf");
    conf.dependency("project(':lib')").unwrap();
    let _lock = fx.context.model().lock();

    let projects = conf.build_dependencies().unwrap();

    assert_eq!(projects.len(), 1);
    assert_eq!(fx.resolver.build_calls(), 0);
    assert_eq!(fx.resolver.graph_calls(), 1);
}

// ============================================================================
// Consistent resolution
// ============================================================================

#[test]
fn test_consistent_resolution_pins_versions_of_source() {
    let fx = Fixture::new();
    let runtime = fx.legacy("runtimeClasspath");
    let compile = fx.legacy("compileClasspath");
    runtime.dependency("org.example:lib:2.0").unwrap();
    compile.dependency("org.example:lib:1.0").unwrap();
    compile.should_resolve_consistently_with(&runtime).unwrap();
    let _lock = fx.context.model().lock();

    let files = compile.files().unwrap();

    assert_eq!(files, vec![jar("org.example", "lib", "2.0")]);
    assert_eq!(fx.resolver.resolved(), vec!["compileClasspath", "runtimeClasspath"]);
    assert_eq!(
        fx.resolver.seen_constraints(),
        vec![DependencyConstraint::strictly("org.example", "lib", "2.0")
            .because("version resolved in configuration ':app:runtimeClasspath' by consistent resolution")]
    );
}

#[test]
fn test_disable_consistent_resolution() {
    let fx = Fixture::new();
    let runtime = fx.legacy("runtimeClasspath");
    let compile = fx.legacy("compileClasspath");
    compile.should_resolve_consistently_with(&runtime).unwrap();

    compile.disable_consistent_resolution().unwrap();

    assert_eq!(compile.consistent_resolution_source(), None);
}

#[test]
fn test_consistent_resolution_cycle_fails() {
    let fx = Fixture::new();
    let a = fx.legacy("a");
    let b = fx.legacy("b");
    a.should_resolve_consistently_with(&b).unwrap();
    b.should_resolve_consistently_with(&a).unwrap();
    let _lock = fx.context.model().lock();

    let error = a.files().unwrap_err();

    assert!(matches!(error, ConfigurationError::ResolverFailed { .. }));
    let cycle = &fx.problems.errors()[0];
    assert_eq!(cycle.label, "Resolving configuration ':app:a' consistently");
    assert_eq!(
        cycle.cause.as_deref(),
        Some("Cycle detected in consistent resolution sources: a -> b -> a")
    );
}

#[test]
fn test_consistent_resolution_source_must_be_resolvable() {
    let fx = Fixture::new();
    let scope = fx.container.dependency_scope_unlocked("implementation").unwrap();
    let classpath = fx.legacy("classpath");
    classpath.should_resolve_consistently_with(&scope).unwrap();

    let error = classpath.synthetic_dependencies().unwrap_err();

    assert_eq!(
        error.to_string(),
        "You can't use configuration ':app:implementation' as a consistent resolution source for configuration ':app:classpath' because it isn't a resolvable configuration."
    );
}

// ============================================================================
// Dependency locking
// ============================================================================

fn locked(must_validate: bool) -> Arc<FixedLocking> {
    Arc::new(FixedLocking {
        state: LockState {
            must_validate,
            locked: vec![LockedModule::new("org.example", "lib", "1.5")],
        },
    })
}

#[test]
fn test_strict_lock_state_pins_versions() {
    let fx = Fixture::with_services(|services| services.with_locking(locked(true)));
    let conf = fx.legacy("conf");
    conf.dependency("org.example:lib:1.0").unwrap();
    conf.resolution_strategy().activate_dependency_locking().unwrap();
    let _lock = fx.context.model().lock();

    let files = conf.files().unwrap();

    assert_eq!(files, vec![jar("org.example", "lib", "1.5")]);
    assert_eq!(
        fx.resolver.seen_constraints(),
        vec![DependencyConstraint::strictly("org.example", "lib", "1.5")
            .because("dependency was locked to version '1.5'")]
    );
}

#[test]
fn test_lenient_lock_state_prefers_versions() {
    let fx = Fixture::with_services(|services| {
        services
            .with_settings(DependencyManagementSettings {
                dependency_locking: true,
                ..Default::default()
            })
            .with_locking(locked(false))
    });
    let conf = fx.legacy("conf");
    conf.dependency("org.example:lib:1.0").unwrap();
    let _lock = fx.context.model().lock();

    let files = conf.files().unwrap();

    assert_eq!(files, vec![jar("org.example", "lib", "1.0")]);
    assert_eq!(
        fx.resolver.seen_constraints(),
        vec![DependencyConstraint::prefer("org.example", "lib", "1.5")
            .because("dependency was locked to version '1.5' (update/lenient mode)")]
    );
}

#[test]
fn test_locking_is_ignored_unless_activated() {
    let fx = Fixture::with_services(|services| services.with_locking(locked(true)));
    let conf = fx.legacy("conf");

    assert!(conf.synthetic_dependencies().unwrap().is_empty());
}
