//! Per-application virtual global
//!
//! A [`Sandbox`] reads through to the real [`Window`], keeps every write to
//! itself, and records the global listeners application code installs so
//! [`Sandbox::stop`] can take them all back.

mod effect;
pub mod window;

pub use window::{Event, Listener, Window};

use crate::js_engine::{JsValue, ScopedScript};
use effect::GlobalEffect;
use indexmap::IndexMap;
use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

struct SandboxState {
    active: bool,
    window: Window,
    proxy_window: IndexMap<String, JsValue>,
    injected_keys: HashSet<String>,
    effect: GlobalEffect,
}

/// Shared handle to one application's virtual global
#[derive(Clone)]
pub struct Sandbox {
    inner: Rc<RefCell<SandboxState>>,
}

impl Sandbox {
    /// Sandbox over the current thread's host window
    pub fn new() -> Self {
        Self::with_window(Window::global())
    }

    pub fn with_window(window: Window) -> Self {
        Self {
            inner: Rc::new(RefCell::new(SandboxState {
                active: false,
                window,
                proxy_window: IndexMap::new(),
                injected_keys: HashSet::new(),
                effect: GlobalEffect::default(),
            })),
        }
    }

    pub fn start(&self) {
        let mut state = self.inner.borrow_mut();
        if !state.active {
            log::debug!("sandbox started");
            state.active = true;
        }
    }

    /// Deactivate, dropping every injected key and releasing every global
    /// listener registered through this sandbox
    pub fn stop(&self) {
        let mut state = self.inner.borrow_mut();
        state.active = false;

        let SandboxState {
            window,
            proxy_window,
            injected_keys,
            effect,
            ..
        } = &mut *state;
        for key in injected_keys.drain() {
            proxy_window.shift_remove(&key);
        }
        let released = effect.release(window);
        log::debug!("sandbox stopped, released {released} global listener(s)");
    }

    pub fn is_active(&self) -> bool {
        self.inner.borrow().active
    }

    pub fn window(&self) -> Window {
        self.inner.borrow().window.clone()
    }

    /// Read with fallback to the real global.
    ///
    /// Plain functions read from the real global come back bound to it;
    /// constructors are returned as they are.
    pub fn get(&self, key: &str) -> JsValue {
        let state = self.inner.borrow();
        if let Some(value) = state.proxy_window.get(key) {
            return value.clone();
        }
        match state.window.get(key) {
            JsValue::Function(f) if !f.is_constructor() => JsValue::Function(f.bind(&state.window)),
            value => value,
        }
    }

    /// Write to the virtual global. Always reports success; ignored while
    /// inactive.
    pub fn set(&self, key: &str, value: JsValue) -> bool {
        let mut state = self.inner.borrow_mut();
        if state.active {
            state.injected_keys.insert(key.to_string());
            state.proxy_window.insert(key.to_string(), value);
        }
        true
    }

    /// Delete an own property. Missing keys report success.
    pub fn delete_property(&self, key: &str) -> bool {
        let mut state = self.inner.borrow_mut();
        if state.proxy_window.shift_remove(key).is_some() {
            state.injected_keys.remove(key);
        }
        true
    }

    /// Whether `key` resolves on the virtual global or the real one
    pub fn has(&self, key: &str) -> bool {
        let state = self.inner.borrow();
        state.proxy_window.contains_key(key) || state.window.has(key)
    }

    /// Whether `key` is an own property of the virtual global
    pub fn has_own(&self, key: &str) -> bool {
        self.inner.borrow().proxy_window.contains_key(key)
    }

    pub fn add_event_listener(&self, event_type: &str, listener: &Listener) {
        let mut state = self.inner.borrow_mut();
        let SandboxState { window, effect, .. } = &mut *state;
        effect.add_event_listener(window, event_type, listener);
    }

    pub fn remove_event_listener(&self, event_type: &str, listener: &Listener) {
        let mut state = self.inner.borrow_mut();
        let SandboxState { window, effect, .. } = &mut *state;
        effect.remove_event_listener(window, event_type, listener);
    }

    /// Keys written since the last start, in no particular order
    pub fn injected_keys(&self) -> Vec<String> {
        self.inner.borrow().injected_keys.iter().cloned().collect()
    }

    /// Global listeners still registered through this sandbox
    pub fn listener_count(&self) -> usize {
        self.inner.borrow().effect.len()
    }

    /// Wrap `code` so its free identifiers resolve against this sandbox
    pub fn bind_scope(&self, code: &str) -> ScopedScript {
        ScopedScript::bound(code, self.clone())
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Default for Sandbox {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Sandbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.borrow();
        f.debug_struct("Sandbox")
            .field("active", &state.active)
            .field("own_keys", &state.proxy_window.len())
            .field("listeners", &state.effect.len())
            .finish()
    }
}
