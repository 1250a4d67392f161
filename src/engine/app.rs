//! One embedded application and its lifecycle state

use super::Host;
use crate::config::AppOptions;
use crate::js_engine::{ScopedScript, ScriptEngine};
use crate::renderer::{Node, NodeRef, scoped_css};
use crate::sandbox::Sandbox;
use crate::utils::{PicoError, Result, error::RenderError};
use indexmap::IndexMap;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Shared handle to a registered application
pub type AppHandle = Rc<RefCell<Application>>;

/// Lifecycle status. Applications enter `Loading` as soon as they are
/// created or re-attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppStatus {
    Created,
    Loading,
    Mounted,
    Unmount,
}

impl fmt::Display for AppStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Created => "created",
            Self::Loading => "loading",
            Self::Mounted => "mounted",
            Self::Unmount => "unmount",
        })
    }
}

/// A stylesheet referenced by `<link rel="stylesheet">`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinkSource {
    pub code: Option<String>,
}

/// A script, either inline or referenced by `src`
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptSource {
    pub code: Option<String>,
    pub is_external: bool,
}

impl ScriptSource {
    pub fn external() -> Self {
        Self {
            code: None,
            is_external: true,
        }
    }

    pub fn inline(code: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            is_external: false,
        }
    }
}

/// Resource catalog plus the resource-stripped document
#[derive(Debug, Clone, Default)]
pub struct AppSource {
    /// Stylesheets keyed by `href`, in declaration order
    pub links: IndexMap<String, LinkSource>,
    /// Scripts keyed by `src` or a generated id, in declaration order
    pub scripts: IndexMap<String, ScriptSource>,
    /// Document with links and scripts removed
    pub html: Option<Node>,
}

/// An embedded application
pub struct Application {
    pub(crate) name: String,
    pub(crate) url: String,
    pub(crate) container: Option<NodeRef>,
    pub(crate) status: AppStatus,
    pub(crate) load_count: u8,
    /// Bumped on every re-attach so joins of an earlier attach can tell
    /// they are stale
    pub(crate) generation: u64,
    pub(crate) source: AppSource,
    pub(crate) options: AppOptions,
    pub(crate) host: Host,
    sandbox: Sandbox,
    engine: Box<dyn ScriptEngine>,
}

impl Application {
    pub(crate) fn new(
        name: &str,
        url: &str,
        container: Option<NodeRef>,
        options: AppOptions,
        host: Host,
        engine: Box<dyn ScriptEngine>,
    ) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
            container,
            status: AppStatus::Loading,
            load_count: 0,
            generation: 0,
            source: AppSource::default(),
            options,
            sandbox: Sandbox::with_window(host.window.clone()),
            host,
            engine,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn status(&self) -> AppStatus {
        self.status
    }

    pub fn load_count(&self) -> u8 {
        self.load_count
    }

    pub fn options(&self) -> AppOptions {
        self.options
    }

    pub fn source(&self) -> &AppSource {
        &self.source
    }

    pub fn sandbox(&self) -> &Sandbox {
        &self.sandbox
    }

    pub fn container(&self) -> Option<&NodeRef> {
        self.container.as_ref()
    }

    /// Run handlers for global events delivered to this application
    pub fn run_pending_events(&mut self) -> Result<usize> {
        self.engine.run_pending_events()
    }

    /// Selector prefix for this application's stylesheets, when scoping is on
    pub(crate) fn scope_prefix(&self) -> Option<String> {
        self.options
            .scoped_css
            .then(|| self.host.config.scope_prefix(&self.name))
    }

    /// Put a freshly prepared container back into play for a re-attach
    pub(crate) fn reattach(&mut self, container: Option<NodeRef>) {
        self.container = container;
        self.status = AppStatus::Loading;
        self.load_count = 0;
        self.generation += 1;
    }

    /// Append fetched stylesheets to the head placeholder and cache them
    pub(crate) fn attach_styles(&mut self, fetched: Vec<(String, String)>) {
        let prefix = self.scope_prefix();
        let head_tag = self.host.config.head_tag();
        let html = self.source.html.get_or_insert_with(|| Node::element("div"));

        for (href, code) in fetched {
            let mut style = Node::element("style");
            style.add_child(Node::text(code.as_str()));
            if let Some(prefix) = &prefix {
                scoped_css(&mut style, prefix);
            }
            match html.find_element_mut(&head_tag) {
                Some(head) => head.add_child(style),
                None => html.add_child(style),
            }
            if let Some(link) = self.source.links.get_mut(&href) {
                link.code = Some(code);
            }
        }
    }

    /// Write fetched script bodies back into the catalog
    pub(crate) fn cache_scripts(&mut self, fetched: Vec<(String, String)>) {
        for (key, code) in fetched {
            if let Some(script) = self.source.scripts.get_mut(&key) {
                script.code = Some(code);
            }
        }
    }

    /// Count one finished resource group. Returns true when this was the
    /// second signal and mounting is still wanted.
    pub(crate) fn on_load(&mut self) -> bool {
        self.load_count = self.load_count.saturating_add(1);
        log::debug!("{} resource group loaded ({}/2)", self.name, self.load_count);
        self.load_count == 2 && self.status != AppStatus::Unmount
    }

    /// Render the retained document into the container and run every script
    /// in catalog order. Script failures are collected, not fatal.
    pub(crate) fn mount(&mut self) -> Result<Vec<PicoError>> {
        let container = self
            .container
            .clone()
            .ok_or_else(|| RenderError::MissingContainer(self.name.clone()))?;

        if let Some(template) = self.source.html.clone() {
            container.borrow_mut().children.extend(template.children);
        }

        if self.options.use_sandbox {
            self.sandbox.start();
        }

        let mut failures = Vec::new();
        for (key, script) in &self.source.scripts {
            let Some(code) = script.code.as_deref() else {
                continue;
            };
            let unit = if self.options.use_sandbox {
                self.sandbox.bind_scope(code)
            } else {
                ScopedScript::global(code)
            };
            if let Err(err) = self.engine.execute(&unit) {
                log::error!("script {key} of {} failed: {err}", self.name);
                failures.push(err);
            }
        }

        self.status = AppStatus::Mounted;
        log::info!("{} mounted", self.name);
        Ok(failures)
    }

    /// Stop the application and release its container. A destroying unmount
    /// also drops it from the registry.
    pub(crate) fn unmount(&mut self, destroy: bool) {
        self.status = AppStatus::Unmount;
        self.container = None;
        self.sandbox.stop();
        if destroy {
            self.host.registry.remove(&self.name);
        }
        log::info!("{} unmounted{}", self.name, if destroy { " and destroyed" } else { "" });
    }
}

impl fmt::Debug for Application {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Application")
            .field("name", &self.name)
            .field("url", &self.url)
            .field("status", &self.status)
            .field("load_count", &self.load_count)
            .field("links", &self.source.links.len())
            .field("scripts", &self.source.scripts.len())
            .finish()
    }
}
