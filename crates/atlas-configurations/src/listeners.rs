use crate::configuration::ResolvableDependencies;
use std::sync::Arc;

/// Notified around the resolution of a configuration.
pub trait DependencyResolutionListener: Send + Sync {
    fn before_resolve(&self, _dependencies: &ResolvableDependencies) {}

    fn after_resolve(&self, _dependencies: &ResolvableDependencies) {}
}

type Hook = Arc<dyn Fn(&ResolvableDependencies) + Send + Sync>;

struct BeforeResolve(Hook);

impl DependencyResolutionListener for BeforeResolve {
    fn before_resolve(&self, dependencies: &ResolvableDependencies) {
        (self.0)(dependencies)
    }
}

struct AfterResolve(Hook);

impl DependencyResolutionListener for AfterResolve {
    fn after_resolve(&self, dependencies: &ResolvableDependencies) {
        (self.0)(dependencies)
    }
}

/// Fans events out to every registered listener, in registration order.
#[derive(Clone, Default)]
pub struct ListenerBroadcast {
    listeners: Vec<Arc<dyn DependencyResolutionListener>>,
}

impl ListenerBroadcast {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, listener: Arc<dyn DependencyResolutionListener>) {
        self.listeners.push(listener);
    }

    pub fn add_before_resolve(&mut self, hook: impl Fn(&ResolvableDependencies) + Send + Sync + 'static) {
        self.add(Arc::new(BeforeResolve(Arc::new(hook))));
    }

    pub fn add_after_resolve(&mut self, hook: impl Fn(&ResolvableDependencies) + Send + Sync + 'static) {
        self.add(Arc::new(AfterResolve(Arc::new(hook))));
    }

    pub fn before_resolve(&self, dependencies: &ResolvableDependencies) {
        for listener in &self.listeners {
            listener.before_resolve(dependencies);
        }
    }

    pub fn after_resolve(&self, dependencies: &ResolvableDependencies) {
        for listener in &self.listeners {
            listener.after_resolve(dependencies);
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl std::fmt::Debug for ListenerBroadcast {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerBroadcast")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
