//! Owning contexts of configurations: identity paths, the owning project and
//! the project model lock that guards resolution.

use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::sync::Arc;
use std::thread::{self, ThreadId};

/// Colon separated path such as `:app:compileClasspath`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IdentityPath {
    segments: Vec<String>,
}

impl IdentityPath {
    pub fn root() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    /// Parse `:a:b`. Empty segments are dropped.
    pub fn parse(path: &str) -> Self {
        Self {
            segments: path
                .split(':')
                .filter(|segment| !segment.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }

    pub fn child(&self, name: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(name.to_string());
        Self { segments }
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Last segment, if any.
    pub fn name(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    pub fn path(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for IdentityPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str(":");
        }
        for segment in &self.segments {
            write!(f, ":{segment}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
struct LockState {
    owner: Option<ThreadId>,
    depth: usize,
}

#[derive(Debug, Default)]
struct ModelInner {
    state: Mutex<LockState>,
    released: Condvar,
}

/// Mutable model of a project. Only the thread holding its exclusive lock may
/// resolve configurations owned by the project.
#[derive(Debug, Clone, Default)]
pub struct ProjectModel {
    inner: Arc<ModelInner>,
}

impl ProjectModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the exclusive lock, blocking while another thread holds it.
    /// Re-entrant for the owning thread.
    pub fn lock(&self) -> ModelLockGuard {
        let current = thread::current().id();
        let mut state = self.inner.state.lock();
        while matches!(state.owner, Some(owner) if owner != current) {
            self.inner.released.wait(&mut state);
        }
        state.owner = Some(current);
        state.depth += 1;
        ModelLockGuard {
            model: self.clone(),
        }
    }

    /// Whether the calling thread holds the exclusive lock.
    pub fn has_mutable_state(&self) -> bool {
        self.inner.state.lock().owner == Some(thread::current().id())
    }

    /// Run `f` while holding the exclusive lock.
    pub fn from_mutable_state<T>(&self, f: impl FnOnce() -> T) -> T {
        let _guard = self.lock();
        f()
    }

    fn release(&self) {
        let mut state = self.inner.state.lock();
        state.depth = state.depth.saturating_sub(1);
        if state.depth == 0 {
            state.owner = None;
            self.inner.released.notify_all();
        }
    }
}

/// Held while the project model is locked. Releases on drop.
#[must_use = "the model is unlocked as soon as the guard is dropped"]
#[derive(Debug)]
pub struct ModelLockGuard {
    model: ProjectModel,
}

impl Drop for ModelLockGuard {
    fn drop(&mut self) {
        self.model.release();
    }
}

#[derive(Debug)]
struct ContextInner {
    display_name: String,
    build_path: IdentityPath,
    project_path: Option<IdentityPath>,
    identity_path: IdentityPath,
    script: bool,
    model: ProjectModel,
}

/// The project, build script or settings that owns a set of configurations.
/// Equality is identity.
#[derive(Debug, Clone)]
pub struct DomainObjectContext {
    inner: Arc<ContextInner>,
}

impl DomainObjectContext {
    /// Context of the project at `path` in the root build.
    pub fn project(path: &str) -> Self {
        let project_path = IdentityPath::parse(path);
        let display_name = if project_path.is_root() {
            "root project".to_string()
        } else {
            format!("project '{project_path}'")
        };
        Self {
            inner: Arc::new(ContextInner {
                display_name,
                build_path: IdentityPath::root(),
                identity_path: project_path.clone(),
                project_path: Some(project_path),
                script: false,
                model: ProjectModel::new(),
            }),
        }
    }

    /// Context of a build script that does not belong to a project.
    pub fn script(name: &str) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                display_name: format!("script '{name}'"),
                build_path: IdentityPath::root(),
                project_path: None,
                identity_path: IdentityPath::root(),
                script: true,
                model: ProjectModel::new(),
            }),
        }
    }

    pub fn display_name(&self) -> &str {
        &self.inner.display_name
    }

    pub fn build_path(&self) -> &IdentityPath {
        &self.inner.build_path
    }

    pub fn project_path(&self) -> Option<&IdentityPath> {
        self.inner.project_path.as_ref()
    }

    pub fn is_script(&self) -> bool {
        self.inner.script
    }

    /// Identity path of a domain object called `name` in this context.
    pub fn identity_path(&self, name: &str) -> IdentityPath {
        self.inner.identity_path.child(name)
    }

    pub fn model(&self) -> &ProjectModel {
        &self.inner.model
    }
}

impl PartialEq for DomainObjectContext {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for DomainObjectContext {}

impl fmt::Display for DomainObjectContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inner.display_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn test_identity_paths() {
        assert_eq!(IdentityPath::root().to_string(), ":");
        assert_eq!(IdentityPath::parse(":app:lib").to_string(), ":app:lib");
        assert_eq!(IdentityPath::root().child("api").to_string(), ":api");

        let context = DomainObjectContext::project(":app");
        assert_eq!(context.identity_path("compileClasspath").to_string(), ":app:compileClasspath");
        assert_eq!(context.display_name(), "project ':app'");
    }

    #[test]
    fn test_context_equality_is_identity() {
        let a = DomainObjectContext::project(":app");
        let b = DomainObjectContext::project(":app");
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }

    #[test]
    fn test_script_context_has_no_project() {
        let context = DomainObjectContext::script("init.atlas");
        assert!(context.is_script());
        assert!(context.project_path().is_none());
        assert_eq!(context.identity_path("classpath").to_string(), ":classpath");
    }

    #[test]
    fn test_lock_is_reentrant() {
        let model = ProjectModel::new();
        assert!(!model.has_mutable_state());
        let outer = model.lock();
        {
            let _inner = model.lock();
            assert!(model.has_mutable_state());
        }
        assert!(model.has_mutable_state());
        drop(outer);
        assert!(!model.has_mutable_state());
    }

    #[test]
    fn test_lock_excludes_other_threads() {
        let model = ProjectModel::new();
        let guard = model.lock();
        let acquired = Arc::new(AtomicBool::new(false));

        let handle = {
            let model = model.clone();
            let acquired = acquired.clone();
            thread::spawn(move || {
                assert!(!model.has_mutable_state());
                let _guard = model.lock();
                acquired.store(true, Ordering::SeqCst);
            })
        };

        thread::sleep(std::time::Duration::from_millis(50));
        assert!(!acquired.load(Ordering::SeqCst));
        drop(guard);
        handle.join().unwrap();
        assert!(acquired.load(Ordering::SeqCst));
    }

    #[test]
    fn test_from_mutable_state() {
        let model = ProjectModel::new();
        assert!(model.from_mutable_state(|| model.has_mutable_state()));
        assert!(!model.has_mutable_state());
    }
}
