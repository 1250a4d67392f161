//! The host page's real global object

use crate::js_engine::JsValue;
use indexmap::IndexMap;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_LISTENER_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static GLOBAL_WINDOW: Window = Window::new();
}

/// An event delivered to global listeners
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    event_type: String,
    detail: JsValue,
}

impl Event {
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            detail: JsValue::Undefined,
        }
    }

    pub fn with_detail(mut self, detail: JsValue) -> Self {
        self.detail = detail;
        self
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn detail(&self) -> &JsValue {
        &self.detail
    }
}

/// A listener reference. Clones share identity; equality is identity.
#[derive(Clone)]
pub struct Listener {
    id: u64,
    callback: Rc<dyn Fn(&Event)>,
}

impl Listener {
    pub fn new(callback: impl Fn(&Event) + 'static) -> Self {
        Self {
            id: NEXT_LISTENER_ID.fetch_add(1, Ordering::Relaxed),
            callback: Rc::new(callback),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn handle_event(&self, event: &Event) {
        (self.callback)(event);
    }
}

impl PartialEq for Listener {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Listener {}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Listener").field(&self.id).finish()
    }
}

#[derive(Default)]
struct WindowState {
    properties: HashMap<String, JsValue>,
    listeners: IndexMap<String, Vec<Listener>>,
}

/// Shared handle to the real global object
#[derive(Clone, Default)]
pub struct Window {
    inner: Rc<RefCell<WindowState>>,
}

impl Window {
    /// A fresh, empty global
    pub fn new() -> Self {
        Self::default()
    }

    /// The host window of the current thread
    pub fn global() -> Self {
        GLOBAL_WINDOW.with(Clone::clone)
    }

    pub fn get(&self, key: &str) -> JsValue {
        self.inner
            .borrow()
            .properties
            .get(key)
            .cloned()
            .unwrap_or_default()
    }

    pub fn has(&self, key: &str) -> bool {
        self.inner.borrow().properties.contains_key(key)
    }

    /// Host-side property write
    pub fn set(&self, key: impl Into<String>, value: JsValue) {
        self.inner.borrow_mut().properties.insert(key.into(), value);
    }

    /// Register a listener; registering the same listener twice is a no-op
    pub fn add_event_listener(&self, event_type: &str, listener: &Listener) {
        let mut state = self.inner.borrow_mut();
        let listeners = state.listeners.entry(event_type.to_string()).or_default();
        if !listeners.contains(listener) {
            listeners.push(listener.clone());
        }
    }

    pub fn remove_event_listener(&self, event_type: &str, listener: &Listener) {
        let mut state = self.inner.borrow_mut();
        if let Some(listeners) = state.listeners.get_mut(event_type) {
            listeners.retain(|l| l != listener);
            if listeners.is_empty() {
                state.listeners.shift_remove(event_type);
            }
        }
    }

    /// Deliver `event` to its listeners and return how many received it
    pub fn dispatch_event(&self, event: &Event) -> usize {
        // Listeners may register or remove listeners while running
        let listeners = self
            .inner
            .borrow()
            .listeners
            .get(event.event_type())
            .cloned()
            .unwrap_or_default();
        for listener in &listeners {
            listener.handle_event(event);
        }
        listeners.len()
    }

    pub fn listener_count(&self, event_type: &str) -> usize {
        self.inner
            .borrow()
            .listeners
            .get(event_type)
            .map_or(0, Vec::len)
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl PartialEq for Window {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.borrow();
        f.debug_struct("Window")
            .field("properties", &state.properties.len())
            .field("event_types", &state.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_dispatch_reaches_each_listener_once() {
        let window = Window::new();
        let hits = Rc::new(Cell::new(0));
        let counter = Rc::clone(&hits);
        let listener = Listener::new(move |_| counter.set(counter.get() + 1));

        window.add_event_listener("resize", &listener);
        window.add_event_listener("resize", &listener);
        assert_eq!(window.listener_count("resize"), 1);

        assert_eq!(window.dispatch_event(&Event::new("resize")), 1);
        assert_eq!(window.dispatch_event(&Event::new("scroll")), 0);
        assert_eq!(hits.get(), 1);

        window.remove_event_listener("resize", &listener);
        assert_eq!(window.dispatch_event(&Event::new("resize")), 0);
    }

    #[test]
    fn test_listener_may_remove_itself_during_dispatch() {
        let window = Window::new();
        let slot: Rc<RefCell<Option<Listener>>> = Rc::default();
        let inner_window = window.clone();
        let inner_slot = Rc::clone(&slot);
        let listener = Listener::new(move |event| {
            if let Some(me) = inner_slot.borrow().as_ref() {
                inner_window.remove_event_listener(event.event_type(), me);
            }
        });
        *slot.borrow_mut() = Some(listener.clone());

        window.add_event_listener("once", &listener);
        assert_eq!(window.dispatch_event(&Event::new("once")), 1);
        assert_eq!(window.listener_count("once"), 0);
    }

    #[test]
    fn test_global_window_is_shared_per_thread() {
        Window::global().set("shared", JsValue::from(1.0));
        assert_eq!(Window::global().get("shared"), JsValue::Number(1.0));
        assert!(Window::global().ptr_eq(&Window::global()));
    }
}
