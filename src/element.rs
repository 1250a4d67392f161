//! Custom element surface mapping insertion and removal onto the lifecycle

use crate::config::ContainerConfig;
use crate::engine::{AppHandle, AppParams, ContainerEngine};
use crate::renderer::{Node, NodeRef};
use std::cell::RefCell;
use std::collections::HashSet;

thread_local! {
    static DEFINED_ELEMENTS: RefCell<HashSet<String>> = RefCell::new(HashSet::new());
}

/// Attributes whose changes the element reacts to
pub const OBSERVED_ATTRIBUTES: [&str; 2] = ["name", "url"];

/// Register the container element tag. Returns true only for the first
/// registration of a tag.
pub fn start(config: &ContainerConfig) -> bool {
    let tag = config.tag_name().to_string();
    let defined = DEFINED_ELEMENTS.with(|defined| defined.borrow_mut().insert(tag));
    if defined {
        log::debug!("defined <{}>", config.tag_name());
    } else {
        log::debug!("<{}> already defined", config.tag_name());
    }
    defined
}

/// Whether `tag` has been registered on this thread
pub fn is_defined(tag: &str) -> bool {
    DEFINED_ELEMENTS.with(|defined| defined.borrow().contains(&tag.to_ascii_lowercase()))
}

/// A container element hosting one application
#[derive(Debug)]
pub struct MicroAppElement {
    node: NodeRef,
    app_name: String,
    app_url: String,
}

impl MicroAppElement {
    pub fn new(config: &ContainerConfig) -> Self {
        Self {
            node: Node::element(config.tag_name()).into_ref(),
            app_name: String::new(),
            app_url: String::new(),
        }
    }

    pub fn observed_attributes() -> &'static [&'static str] {
        &OBSERVED_ATTRIBUTES
    }

    /// Set an attribute and run the change callback for observed ones
    pub fn set_attribute(&mut self, name: &str, value: &str) {
        let old = self.node.borrow().attribute(name).map(str::to_string);
        if let Some(element) = self.node.borrow_mut().as_element_mut() {
            element.set_attribute(name, value);
        }
        if OBSERVED_ATTRIBUTES.contains(&name) {
            self.attribute_changed(name, old.as_deref(), value);
        }
    }

    /// `name` and `url` are only taken while still unset
    pub fn attribute_changed(&mut self, name: &str, old: Option<&str>, value: &str) {
        log::debug!("attribute {name}: {old:?} -> {value}");
        let slot = match name {
            "name" => &mut self.app_name,
            "url" => &mut self.app_url,
            _ => return,
        };
        if slot.is_empty() {
            *slot = value.to_string();
        }
    }

    /// Inserted into the page: create (or reuse) the application and load
    /// it on the current `LocalSet`
    pub fn connected(&self, engine: &ContainerEngine) -> AppHandle {
        let tag = engine.config().tag_name();
        if !is_defined(tag) {
            log::warn!("<{tag}> connected before the element was defined");
        }
        log::debug!("<{tag}> connected");
        let app = engine.create_app(
            AppParams::new(self.app_name.as_str(), self.app_url.as_str())
                .with_container(self.node.clone()),
        );

        let engine = engine.clone();
        let loading = app.clone();
        tokio::task::spawn_local(async move {
            engine.load_app(&loading).await;
        });
        app
    }

    /// Removed from the page: unmount, destroying when the element carries
    /// the `destroy` attribute
    pub fn disconnected(&self, engine: &ContainerEngine) -> bool {
        log::debug!("<{}> disconnected", engine.config().tag_name());
        let destroy = self.node.borrow().as_element().is_some_and(|e| e.has_attribute("destroy"));
        engine.unmount_app(&self.app_name, destroy)
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    pub fn app_url(&self) -> &str {
        &self.app_url
    }

    /// The element node applications render into
    pub fn node(&self) -> &NodeRef {
        &self.node
    }
}
