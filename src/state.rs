use crate::gateway::IoGateway;
use crate::plugin::PluginRegistry;
use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// Mutable key-value store shared by a root shell and every shell nested in it.
///
/// Cloning a `SharedState` clones the handle, not the contents: all clones see
/// each other's writes. Values may be of any `'static` type; readers ask for
/// the type they expect and get `None` on a mismatch.
#[derive(Clone, Default)]
pub struct SharedState {
    vars: Rc<RefCell<HashMap<String, Box<dyn Any>>>>,
}

impl SharedState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set or override a value.
    pub fn set<T: Any>(&self, key: impl Into<String>, value: T) {
        self.vars.borrow_mut().insert(key.into(), Box::new(value));
    }

    /// Get a copy of a value, if it exists and has type `T`.
    pub fn get<T: Any + Clone>(&self, key: &str) -> Option<T> {
        self.vars
            .borrow()
            .get(key)
            .and_then(|v| v.downcast_ref::<T>())
            .cloned()
    }

    /// Run `f` against a value in place, if it exists and has type `T`.
    pub fn update<T: Any, R>(&self, key: &str, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        let mut vars = self.vars.borrow_mut();
        vars.get_mut(key).and_then(|v| v.downcast_mut::<T>()).map(f)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.vars.borrow().contains_key(key)
    }

    /// Remove a value. Returns whether the key was present.
    pub fn remove(&self, key: &str) -> bool {
        self.vars.borrow_mut().remove(key).is_some()
    }

    /// All keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.vars.borrow().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.vars.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.borrow().is_empty()
    }

    /// Whether both handles point at the same store.
    pub fn ptr_eq(&self, other: &SharedState) -> bool {
        Rc::ptr_eq(&self.vars, &other.vars)
    }
}

impl fmt::Debug for SharedState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedState").field("keys", &self.keys()).finish()
    }
}

/// Everything a shell inherits from the shell that created it.
///
/// A root shell builds a fresh context; a nested shell is handed its parent's
/// context and shares the state, the I/O endpoints and the plugin registry by
/// reference.
#[derive(Clone)]
pub struct ShellContext {
    shared: SharedState,
    io: Rc<IoGateway>,
    plugins: Rc<PluginRegistry>,
}

impl ShellContext {
    /// Fresh root context: empty state, console endpoints, bundled plugins.
    pub fn new() -> Self {
        Self::with_parts(
            SharedState::new(),
            IoGateway::console(),
            PluginRegistry::with_bundled(),
        )
    }

    pub fn with_parts(shared: SharedState, io: IoGateway, plugins: PluginRegistry) -> Self {
        Self {
            shared,
            io: Rc::new(io),
            plugins: Rc::new(plugins),
        }
    }

    pub fn shared(&self) -> &SharedState {
        &self.shared
    }

    pub fn io(&self) -> &Rc<IoGateway> {
        &self.io
    }

    pub fn plugins(&self) -> &Rc<PluginRegistry> {
        &self.plugins
    }

    /// Whether both contexts route through the same state and endpoints.
    pub fn shares_with(&self, other: &ShellContext) -> bool {
        self.shared.ptr_eq(&other.shared) && Rc::ptr_eq(&self.io, &other.io)
    }
}

impl Default for ShellContext {
    fn default() -> Self {
        Self::new()
    }
}
