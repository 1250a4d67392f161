//! Application controller coordinating every embedded application
//!
//! The ContainerEngine drives each application through its lifecycle:
//! 1. Fetch the application document via a [`ResourceFetcher`]
//! 2. Strip stylesheets and scripts into the resource catalog
//! 3. Fetch stylesheets and scripts in two independent joins
//! 4. Mount once both joins have signalled, unless unmounted meanwhile

mod app;
mod registry;
mod source;

pub use app::{AppHandle, AppSource, AppStatus, Application, LinkSource, ScriptSource};
pub use registry::AppRegistry;

use crate::config::{AppOptions, ContainerConfig};
use crate::event_center::EventCenter;
use crate::js_engine::{BoaScriptEngine, ScriptEngine};
use crate::network::{NetworkStack, ResourceFetcher};
use crate::renderer::NodeRef;
use crate::sandbox::Window;
use crate::utils::Result;
use std::cell::RefCell;
use std::rc::Rc;

/// Lifecycle notifications delivered to the host hook
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    Created,
    BeforeMount,
    Mounted,
    Unmount,
    Error,
}

type LifecycleHook = Rc<dyn Fn(&str, LifecycleEvent)>;
type EngineFactory = Rc<dyn Fn() -> Box<dyn ScriptEngine>>;

/// Collaborators every application of one engine shares
#[derive(Clone)]
pub(crate) struct Host {
    pub(crate) config: Rc<ContainerConfig>,
    pub(crate) fetcher: Rc<dyn ResourceFetcher>,
    pub(crate) registry: AppRegistry,
    pub(crate) window: Window,
    hook: Option<LifecycleHook>,
}

impl Host {
    fn emit(&self, name: &str, event: LifecycleEvent) {
        log::debug!("{name}: {event:?}");
        if let Some(hook) = &self.hook {
            hook(name, event);
        }
    }
}

/// Emit without holding a borrow of the application, so hooks may call back
/// into the engine
pub(crate) fn emit(app: &AppHandle, event: LifecycleEvent) {
    let (host, name) = {
        let a = app.borrow();
        (a.host.clone(), a.name.clone())
    };
    host.emit(&name, event);
}

/// Record one finished resource group and mount on the second
pub(crate) fn signal_loaded(app: &AppHandle) {
    if !app.borrow_mut().on_load() {
        let a = app.borrow();
        if a.status == AppStatus::Unmount && a.load_count >= 2 {
            log::debug!("{} was unmounted while loading, not mounting", a.name);
        }
        return;
    }

    emit(app, LifecycleEvent::BeforeMount);
    let mounted = app.borrow_mut().mount();
    match mounted {
        Ok(failures) => {
            for _ in failures {
                emit(app, LifecycleEvent::Error);
            }
            emit(app, LifecycleEvent::Mounted);
        }
        Err(err) => {
            log::error!("failed to mount {}: {err}", app.borrow().name);
            emit(app, LifecycleEvent::Error);
        }
    }
}

/// What the host supplies to create an application
#[derive(Debug, Clone)]
pub struct AppParams {
    pub name: String,
    pub url: String,
    pub container: Option<NodeRef>,
    pub options: Option<AppOptions>,
}

impl AppParams {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            container: None,
            options: None,
        }
    }

    pub fn with_container(mut self, container: NodeRef) -> Self {
        self.container = Some(container);
        self
    }

    pub fn with_options(mut self, options: AppOptions) -> Self {
        self.options = Some(options);
        self
    }
}

/// The application controller shared by every container element of a host
#[derive(Clone)]
pub struct ContainerEngine {
    host: Host,
    engine_factory: EngineFactory,
    event_center: Rc<RefCell<EventCenter>>,
}

impl ContainerEngine {
    /// Create an engine fetching over HTTP
    pub fn new(config: ContainerConfig) -> Result<Self> {
        Ok(Self::with_fetcher(config, Rc::new(NetworkStack::new()?)))
    }

    /// Create an engine with a custom resource fetcher
    pub fn with_fetcher(config: ContainerConfig, fetcher: Rc<dyn ResourceFetcher>) -> Self {
        Self {
            host: Host {
                config: Rc::new(config),
                fetcher,
                registry: AppRegistry::new(),
                window: Window::global(),
                hook: None,
            },
            engine_factory: Rc::new(|| Box::new(BoaScriptEngine::new())),
            event_center: Rc::default(),
        }
    }

    /// Use a different script engine for applications created from now on
    pub fn with_engine_factory(
        mut self,
        factory: impl Fn() -> Box<dyn ScriptEngine> + 'static,
    ) -> Self {
        self.engine_factory = Rc::new(factory);
        self
    }

    /// Use `window` as the real global instead of the thread's host window
    pub fn with_window(mut self, window: Window) -> Self {
        self.host.window = window;
        self
    }

    /// Observe lifecycle events of every application
    pub fn on_lifecycle(mut self, hook: impl Fn(&str, LifecycleEvent) + 'static) -> Self {
        self.host.hook = Some(Rc::new(hook));
        self
    }

    pub fn config(&self) -> &ContainerConfig {
        &self.host.config
    }

    pub fn registry(&self) -> &AppRegistry {
        &self.host.registry
    }

    pub fn window(&self) -> &Window {
        &self.host.window
    }

    /// Host/application message bus
    pub fn event_center(&self) -> Rc<RefCell<EventCenter>> {
        Rc::clone(&self.event_center)
    }

    pub fn app(&self, name: &str) -> Option<AppHandle> {
        self.host.registry.get(name)
    }

    /// Create an application, or reuse a registered unmounted one of the
    /// same name. A registered application that is still loading or mounted
    /// is unmounted and replaced.
    pub fn create_app(&self, params: AppParams) -> AppHandle {
        let AppParams {
            name,
            url,
            container,
            options,
        } = params;

        if let Some(existing) = self.host.registry.get(&name) {
            let reusable = existing.borrow().status == AppStatus::Unmount;
            if reusable {
                log::debug!("reusing cached sources of {name}");
                existing.borrow_mut().reattach(container);
                emit(&existing, LifecycleEvent::Created);
                return existing;
            }
            log::warn!("{name} is already registered, replacing it");
            existing.borrow_mut().unmount(false);
            emit(&existing, LifecycleEvent::Unmount);
        }

        let options = options.unwrap_or_else(|| self.host.config.defaults());
        let app = Rc::new(RefCell::new(Application::new(
            &name,
            &url,
            container,
            options,
            self.host.clone(),
            (self.engine_factory)(),
        )));
        self.host.registry.insert(&name, Rc::clone(&app));
        emit(&app, LifecycleEvent::Created);
        app
    }

    /// Fetch, extract and (when both joins finish) mount `app`
    pub async fn load_app(&self, app: &AppHandle) {
        source::load_app(app).await;
    }

    /// Create and fully load an application
    pub async fn start_app(&self, params: AppParams) -> AppHandle {
        let app = self.create_app(params);
        self.load_app(&app).await;
        app
    }

    /// Unmount a registered application. Returns false for unknown names.
    pub fn unmount_app(&self, name: &str, destroy: bool) -> bool {
        let Some(app) = self.host.registry.get(name) else {
            log::warn!("cannot unmount unknown application {name}");
            return false;
        };
        app.borrow_mut().unmount(destroy);
        emit(&app, LifecycleEvent::Unmount);
        true
    }
}
