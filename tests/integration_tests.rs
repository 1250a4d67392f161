//! Integration tests for the picocontainer host
//!
//! These tests drive whole applications through the public API with an
//! in-memory fetcher and the default script engine.

use async_trait::async_trait;
use picocontainer::engine::AppRegistry;
use picocontainer::js_engine::JsValue;
use picocontainer::network::ResourceFetcher;
use picocontainer::renderer::{Node, scope_css_text, scope_selector};
use picocontainer::sandbox::{Event, Window};
use picocontainer::utils::error::NetworkError;
use picocontainer::{
    AppOptions, AppParams, AppStatus, ContainerConfig, ContainerEngine, LifecycleEvent, Result,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

const APP_URL: &str = "https://shop.test/app/";

/// Serves fixed bodies and counts requests
#[derive(Default)]
struct StaticFetcher {
    bodies: HashMap<String, String>,
    requests: RefCell<Vec<String>>,
}

impl StaticFetcher {
    fn serve(mut self, url: &str, body: &str) -> Self {
        self.bodies.insert(url.to_string(), body.to_string());
        self
    }
}

#[async_trait(?Send)]
impl ResourceFetcher for StaticFetcher {
    async fn fetch_source(&self, url: &str) -> Result<String> {
        self.requests.borrow_mut().push(url.to_string());
        self.bodies
            .get(url)
            .cloned()
            .ok_or_else(|| NetworkError::Http(404, url.to_string()).into())
    }
}

fn shop_fetcher() -> Rc<StaticFetcher> {
    Rc::new(
        StaticFetcher::default()
            .serve(
                APP_URL,
                r#"<!DOCTYPE html>
                <html>
                  <head>
                    <link rel="stylesheet" href="theme.css">
                    <style>.title { font-weight: bold; }</style>
                  </head>
                  <body>
                    <h1 class="title">Shop</h1>
                    <script>window.cart = []; cartSize = 0;</script>
                    <script src="/static/main.js"></script>
                  </body>
                </html>"#,
            )
            .serve("https://shop.test/app/theme.css", "body { color: navy; }")
            .serve(
                "https://shop.test/static/main.js",
                "window.cart.push('apple'); cartSize = window.cart.length;",
            ),
    )
}

fn engine_for(fetcher: Rc<StaticFetcher>, window: &Window) -> ContainerEngine {
    ContainerEngine::with_fetcher(ContainerConfig::new(), fetcher).with_window(window.clone())
}

fn container() -> picocontainer::renderer::NodeRef {
    Node::element("picocontainer-app")
        .with_attribute("name", "shop")
        .into_ref()
}

#[tokio::test]
async fn test_application_mounts_with_scoped_styles_and_sandboxed_scripts() {
    let window = Window::new();
    let fetcher = shop_fetcher();
    let engine = engine_for(Rc::clone(&fetcher), &window);
    let root = container();

    let app = engine
        .start_app(AppParams::new("shop", APP_URL).with_container(root.clone()))
        .await;

    assert_eq!(app.borrow().status(), AppStatus::Mounted);

    let html = root.borrow().inner_html();
    assert!(html.contains(r#"<h1 class="title">Shop</h1>"#));
    assert!(html.contains(r#"picocontainer-app[name="shop"] .title { font-weight: bold; }"#));
    assert!(html.contains(r#"picocontainer-app[name="shop"] { color: navy; }"#));
    assert!(!html.contains("<script"));
    assert!(!html.contains("<link"));

    let app = app.borrow();
    let sandbox = app.sandbox();
    assert_eq!(sandbox.get("cartSize"), JsValue::Number(1.0));
    assert!(!window.has("cart"));
    assert!(!window.has("cartSize"));
    assert_eq!(
        *fetcher.requests.borrow(),
        vec![
            APP_URL.to_string(),
            "https://shop.test/app/theme.css".to_string(),
            "https://shop.test/static/main.js".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_unscoped_application_keeps_styles_verbatim() {
    let window = Window::new();
    let engine = engine_for(shop_fetcher(), &window);
    let root = container();

    engine
        .start_app(
            AppParams::new("shop", APP_URL)
                .with_container(root.clone())
                .with_options(AppOptions {
                    scoped_css: false,
                    use_sandbox: false,
                }),
        )
        .await;

    let html = root.borrow().inner_html();
    assert!(html.contains(".title { font-weight: bold; }"));
    assert!(!html.contains("picocontainer-app[name="));
}

#[tokio::test]
async fn test_remount_reuses_cached_sources() {
    let window = Window::new();
    let fetcher = shop_fetcher();
    let engine = engine_for(Rc::clone(&fetcher), &window);

    engine
        .start_app(AppParams::new("shop", APP_URL).with_container(container()))
        .await;
    assert!(engine.unmount_app("shop", false));
    assert_eq!(engine.app("shop").unwrap().borrow().status(), AppStatus::Unmount);

    let second = container();
    let app = engine
        .start_app(AppParams::new("shop", APP_URL).with_container(second.clone()))
        .await;

    assert_eq!(app.borrow().status(), AppStatus::Mounted);
    assert_eq!(fetcher.requests.borrow().len(), 3);
    assert_eq!(second.borrow().inner_html().matches("<style>").count(), 2);
}

#[tokio::test]
async fn test_global_listeners_released_on_unmount() {
    let window = Window::new();
    let fetcher = Rc::new(StaticFetcher::default().serve(
        APP_URL,
        "<script>addEventListener('theme', function (e) { window.theme = e.detail; });</script>",
    ));
    let engine = engine_for(fetcher, &window);
    let app = engine
        .start_app(AppParams::new("themed", APP_URL).with_container(container()))
        .await;

    assert_eq!(window.listener_count("theme"), 1);
    window.dispatch_event(&Event::new("theme").with_detail(JsValue::from("dark")));
    assert_eq!(app.borrow_mut().run_pending_events().unwrap(), 1);
    assert_eq!(app.borrow().sandbox().get("theme"), JsValue::from("dark"));

    assert!(engine.unmount_app("themed", true));
    assert_eq!(window.listener_count("theme"), 0);
    assert!(engine.app("themed").is_none());
}

#[tokio::test]
async fn test_missing_stylesheet_reports_error_and_stays_loading() {
    let window = Window::new();
    let fetcher = Rc::new(
        StaticFetcher::default().serve(APP_URL, r#"<link rel="stylesheet" href="gone.css"><p>x</p>"#),
    );
    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&events);
    let engine = engine_for(fetcher, &window)
        .on_lifecycle(move |name, event| sink.borrow_mut().push((name.to_string(), event)));
    let root = container();

    let app = engine
        .start_app(AppParams::new("broken", APP_URL).with_container(root.clone()))
        .await;

    assert_eq!(app.borrow().status(), AppStatus::Loading);
    assert_eq!(app.borrow().load_count(), 1);
    assert!(root.borrow().children.is_empty());
    assert_eq!(
        *events.borrow(),
        vec![
            ("broken".to_string(), LifecycleEvent::Created),
            ("broken".to_string(), LifecycleEvent::Error),
        ]
    );
}

#[test]
fn test_registry_is_per_engine() {
    let window = Window::new();
    let first = engine_for(shop_fetcher(), &window);
    let second = engine_for(shop_fetcher(), &window);

    first.create_app(AppParams::new("shop", APP_URL));
    let registry: &AppRegistry = second.registry();
    assert!(first.registry().contains("shop"));
    assert!(registry.is_empty());
}

#[test]
fn test_stylesheet_scoping_from_public_api() {
    assert_eq!(
        scope_css_text("html, .a > .b { margin: 0; }", "my-app[name=x]"),
        "my-app[name=x], my-app[name=x] .a > .b { margin: 0; }"
    );
    assert_eq!(scope_selector(":root", "my-app[name=x]"), "my-app[name=x]");
}

proptest! {
    /// Every rewritten selector starts with the prefix
    #[test]
    fn test_scoped_class_selectors_start_with_prefix(class in "[a-z][a-z0-9-]{0,12}") {
        let selector = format!(".{class}");
        let scoped = scope_selector(&selector, "my-app[name=x]");
        prop_assert_eq!(scoped, format!("my-app[name=x] .{class}"));
    }
}
