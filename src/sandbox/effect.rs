//! Reversible global event registration

use super::window::{Listener, Window};
use indexmap::IndexMap;

/// Listeners an application registered on the real global through its sandbox
#[derive(Debug, Default)]
pub(crate) struct GlobalEffect {
    listeners: IndexMap<String, Vec<Listener>>,
}

impl GlobalEffect {
    /// Record, then register on the real global
    pub(crate) fn add_event_listener(&mut self, window: &Window, event_type: &str, listener: &Listener) {
        let listeners = self.listeners.entry(event_type.to_string()).or_default();
        if !listeners.contains(listener) {
            listeners.push(listener.clone());
        }
        window.add_event_listener(event_type, listener);
    }

    /// Forget, then unregister from the real global
    pub(crate) fn remove_event_listener(&mut self, window: &Window, event_type: &str, listener: &Listener) {
        if let Some(listeners) = self.listeners.get_mut(event_type) {
            listeners.retain(|l| l != listener);
        }
        window.remove_event_listener(event_type, listener);
    }

    /// Remove every recorded listener from the real global
    pub(crate) fn release(&mut self, window: &Window) -> usize {
        let mut released = 0;
        for (event_type, listeners) in self.listeners.drain(..) {
            for listener in &listeners {
                window.remove_event_listener(&event_type, listener);
                released += 1;
            }
        }
        released
    }

    pub(crate) fn len(&self) -> usize {
        self.listeners.values().map(Vec::len).sum()
    }
}
