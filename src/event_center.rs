//! Publish/subscribe channel between the host and its applications

use crate::js_engine::JsValue;
use crate::sandbox::{Event, Listener};
use indexmap::IndexMap;

#[derive(Debug, Default)]
struct Channel {
    data: JsValue,
    listeners: Vec<Listener>,
}

/// Named channels, each with its latest data and a listener set
#[derive(Debug, Default)]
pub struct EventCenter {
    channels: IndexMap<String, Channel>,
}

impl EventCenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe `listener` to `name`; subscribing twice has no effect
    pub fn on(&mut self, name: &str, listener: &Listener) {
        let channel = self.channels.entry(name.to_string()).or_default();
        if !channel.listeners.contains(listener) {
            channel.listeners.push(listener.clone());
        }
    }

    pub fn off(&mut self, name: &str, listener: &Listener) {
        if let Some(channel) = self.channels.get_mut(name) {
            channel.listeners.retain(|l| l != listener);
        }
    }

    /// Store `data` as the latest value of `name` and deliver it to every
    /// subscriber. Returns how many were notified.
    pub fn dispatch(&mut self, name: &str, data: JsValue) -> usize {
        let channel = self.channels.entry(name.to_string()).or_default();
        channel.data = data.clone();
        let event = Event::new(name).with_detail(data);
        for listener in &channel.listeners {
            listener.handle_event(&event);
        }
        log::debug!("dispatched {name} to {} listener(s)", channel.listeners.len());
        channel.listeners.len()
    }

    /// Latest data dispatched on `name`
    pub fn data(&self, name: &str) -> JsValue {
        self.channels
            .get(name)
            .map(|c| c.data.clone())
            .unwrap_or_default()
    }

    pub fn listener_count(&self, name: &str) -> usize {
        self.channels.get(name).map_or(0, |c| c.listeners.len())
    }
}
