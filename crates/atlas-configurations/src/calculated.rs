use parking_lot::{Mutex, ReentrantMutex};

/// A value owned by the project model, read freely and updated serially.
///
/// `update` holds a re-entrant lock for the whole computation so a second
/// caller waits for the first instead of computing the value again, while
/// the computing thread may itself read, `set` or nest `update` calls.
pub struct CalculatedModelValue<T> {
    display_name: String,
    value: Mutex<T>,
    update_lock: ReentrantMutex<()>,
}

impl<T: Clone> CalculatedModelValue<T> {
    pub fn new(display_name: impl Into<String>, initial: T) -> Self {
        Self {
            display_name: display_name.into(),
            value: Mutex::new(initial),
            update_lock: ReentrantMutex::new(()),
        }
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn get(&self) -> T {
        self.value.lock().clone()
    }

    pub fn set(&self, value: T) {
        *self.value.lock() = value;
    }

    /// Replace the value with the result of `f`. On error the value is left
    /// as `f` found it (or as `f` itself `set` it).
    pub fn update<E>(&self, f: impl FnOnce(T) -> Result<T, E>) -> Result<T, E> {
        let _serial = self.update_lock.lock();
        let current = self.get();
        let next = f(current)?;
        self.set(next.clone());
        Ok(next)
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for CalculatedModelValue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CalculatedModelValue")
            .field("display_name", &self.display_name)
            .field("value", &*self.value.lock())
            .finish()
    }
}
