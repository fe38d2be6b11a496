//! The transient per-invocation scope (spec §5: "An execution creates a
//! transient Argument Source and a transient scope; both are released when
//! the pipeline terminates").
//!
//! `Scope` is released via `Drop`, not a manually-called cleanup function,
//! so resources are freed on every exit path — including a command body
//! panicking under `Discard` mode — rather than only on the happy path.

use std::sync::Mutex;

use crate::context::Services;

pub struct Scope {
    pub services: Services,
    release_hooks: Mutex<Vec<Box<dyn FnOnce() + Send>>>,
}

impl Scope {
    pub fn new(services: Services) -> Self {
        Self {
            services,
            release_hooks: Mutex::new(Vec::new()),
        }
    }

    /// Registers a callback to run when this scope is dropped — e.g. an
    /// instance factory that needs to dispose a resource it opened.
    pub fn on_release(&self, hook: impl FnOnce() + Send + 'static) {
        self.release_hooks
            .lock()
            .expect("scope lock poisoned")
            .push(Box::new(hook));
    }
}

impl Drop for Scope {
    fn drop(&mut self) {
        let hooks = std::mem::take(&mut *self.release_hooks.lock().expect("scope lock poisoned"));
        for hook in hooks {
            hook();
        }
    }
}
