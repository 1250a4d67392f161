//! Document fetch, resource extraction and the two resource joins
//!
//! No `RefCell` borrow of the application is held across an await.

use super::app::{AppHandle, AppSource, AppStatus, LinkSource, ScriptSource};
use super::{LifecycleEvent, emit, signal_loaded};
use crate::network::{ResourceFetcher, resolve_url};
use crate::renderer::{HtmlParser, Node, scoped_css};
use crate::utils::Result;
use futures::future::join_all;
use std::rc::Rc;
use uuid::Uuid;

/// Fetch and prepare the application's document, then run both resource
/// joins to completion
pub(crate) async fn load_app(app: &AppHandle) {
    let (name, url, fetcher, cached, generation) = {
        let a = app.borrow();
        if a.status == AppStatus::Unmount {
            log::debug!("{} is unmounted, not loading", a.name);
            return;
        }
        (
            a.name.clone(),
            a.url.clone(),
            Rc::clone(&a.host.fetcher),
            a.source.html.is_some(),
            a.generation,
        )
    };
    log::debug!("loading {name} from {url}");

    if !cached {
        let html = match fetcher.fetch_source(&url).await {
            Ok(html) => html,
            Err(err) => {
                log::error!("failed to load document of {name}: {err}");
                emit(app, LifecycleEvent::Error);
                return;
            }
        };
        if is_stale(app, generation) {
            return;
        }
        prepare_document(app, &html);
    }

    futures::join!(load_links(app, generation), load_scripts(app, generation));
}

/// Whether `app` was re-attached since a join captured `generation`
fn is_stale(app: &AppHandle, generation: u64) -> bool {
    let a = app.borrow();
    let stale = a.generation != generation;
    if stale {
        log::debug!("discarding results of an earlier attach of {}", a.name);
    }
    stale
}

/// Parse, rename head/body and extract resources into the catalog
fn prepare_document(app: &AppHandle, html: &str) {
    let mut a = app.borrow_mut();
    let config = Rc::clone(&a.host.config);
    let mut fragment =
        HtmlParser::new().parse_fragment(html, &config.head_tag(), &config.body_tag());
    let prefix = a.scope_prefix();
    extract_source_dom(&mut fragment, &mut a.source, prefix.as_deref());
    log::debug!(
        "{} declares {} stylesheet(s) and {} script(s)",
        a.name,
        a.source.links.len(),
        a.source.scripts.len()
    );
    a.source.html = Some(fragment);
}

/// Post-order walk: children are handled before their parent decides
/// whether to keep each of them
pub(crate) fn extract_source_dom(parent: &mut Node, source: &mut AppSource, prefix: Option<&str>) {
    let children = std::mem::take(&mut parent.children);
    for mut child in children {
        extract_source_dom(&mut child, source, prefix);
        if keep_node(&mut child, source, prefix) {
            parent.children.push(child);
        }
    }
}

fn keep_node(node: &mut Node, source: &mut AppSource, prefix: Option<&str>) -> bool {
    if node.is_tag("link") {
        let is_stylesheet = node
            .attribute("rel")
            .is_some_and(|rel| rel.eq_ignore_ascii_case("stylesheet"));
        match node.attribute("href") {
            Some(href) if is_stylesheet => {
                source.links.insert(href.to_string(), LinkSource::default());
            }
            _ => log::debug!("dropping link without stylesheet href"),
        }
        return false;
    }

    if node.is_tag("script") {
        if let Some(src) = node.attribute("src") {
            source.scripts.insert(src.to_string(), ScriptSource::external());
        } else {
            let code = node.text_content();
            if !code.is_empty() {
                source
                    .scripts
                    .insert(Uuid::new_v4().simple().to_string(), ScriptSource::inline(code));
            }
        }
        return false;
    }

    if node.is_tag("style") {
        if let Some(prefix) = prefix {
            scoped_css(node, prefix);
        }
    }
    true
}

/// Fetch each locator concurrently; results keep declaration order
async fn fetch_all(
    fetcher: &dyn ResourceFetcher,
    base: &str,
    locators: Vec<String>,
) -> Result<Vec<(String, String)>> {
    let fetches = locators.iter().map(|locator| async move {
        let url = resolve_url(base, locator)?;
        fetcher.fetch_source(&url).await
    });
    let bodies = join_all(fetches).await.into_iter().collect::<Result<Vec<_>>>()?;
    Ok(locators.into_iter().zip(bodies).collect())
}

/// CSS join: stylesheets without a cached body are fetched, appended to the
/// head placeholder and cached
async fn load_links(app: &AppHandle, generation: u64) {
    let (name, url, fetcher, pending) = {
        let a = app.borrow();
        let pending: Vec<String> = a
            .source
            .links
            .iter()
            .filter(|(_, link)| link.code.is_none())
            .map(|(href, _)| href.clone())
            .collect();
        (a.name.clone(), a.url.clone(), Rc::clone(&a.host.fetcher), pending)
    };

    if !pending.is_empty() {
        let fetched = fetch_all(fetcher.as_ref(), &url, pending).await;
        if is_stale(app, generation) {
            return;
        }
        match fetched {
            Ok(fetched) => app.borrow_mut().attach_styles(fetched),
            Err(err) => {
                log::error!("failed to load stylesheets of {name}: {err}");
                emit(app, LifecycleEvent::Error);
                return;
            }
        }
    }
    signal_loaded(app);
}

/// JS join: external scripts without a cached body are fetched and cached;
/// inline scripts already carry theirs
async fn load_scripts(app: &AppHandle, generation: u64) {
    let (name, url, fetcher, pending) = {
        let a = app.borrow();
        let pending: Vec<String> = a
            .source
            .scripts
            .iter()
            .filter(|(_, script)| script.code.is_none())
            .map(|(key, _)| key.clone())
            .collect();
        (a.name.clone(), a.url.clone(), Rc::clone(&a.host.fetcher), pending)
    };

    if !pending.is_empty() {
        let fetched = fetch_all(fetcher.as_ref(), &url, pending).await;
        if is_stale(app, generation) {
            return;
        }
        match fetched {
            Ok(fetched) => app.borrow_mut().cache_scripts(fetched),
            Err(err) => {
                log::error!("failed to load scripts of {name}: {err}");
                emit(app, LifecycleEvent::Error);
                return;
            }
        }
    }
    signal_loaded(app);
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn extract(html: &str, prefix: Option<&str>) -> (Node, AppSource) {
        let mut fragment = HtmlParser::new()
            .parse_fragment(html, "picocontainer-app-head", "picocontainer-app-body");
        let mut source = AppSource::default();
        extract_source_dom(&mut fragment, &mut source, prefix);
        (fragment, source)
    }

    #[test]
    fn test_extracts_links_and_scripts_in_order() {
        let (fragment, source) = extract(
            r#"<html><head>
                <link rel="stylesheet" href="a.css">
                <link rel="icon" href="favicon.ico">
                <link rel="stylesheet">
                <script src="vendor.js"></script>
            </head><body>
                <div id="root"><script>window.inline = 1;</script></div>
                <script src="main.js"></script>
                <script></script>
            </body></html>"#,
            None,
        );

        assert_eq!(source.links.keys().collect::<Vec<_>>(), vec!["a.css"]);
        assert_eq!(source.links["a.css"], LinkSource { code: None });

        let scripts: Vec<_> = source.scripts.values().cloned().collect();
        assert_eq!(scripts.len(), 3);
        assert_eq!(scripts[0], ScriptSource::external());
        assert_eq!(scripts[1], ScriptSource::inline("window.inline = 1;"));
        assert_eq!(scripts[2], ScriptSource::external());
        assert_eq!(source.scripts.get_index(0).map(|(k, _)| k.as_str()), Some("vendor.js"));
        assert_eq!(source.scripts.get_index(2).map(|(k, _)| k.as_str()), Some("main.js"));

        let html = fragment.inner_html();
        assert!(!html.contains("<link"));
        assert!(!html.contains("<script"));
        assert!(html.contains("<picocontainer-app-head>"));
        assert!(html.contains(r#"<div id="root"></div>"#));
    }

    #[test]
    fn test_inline_scripts_get_distinct_ids() {
        let (_, source) = extract("<script>a()</script><script>a()</script>", None);
        assert_eq!(source.scripts.len(), 2);
        assert!(source.scripts.values().all(|s| !s.is_external));
    }

    #[test]
    fn test_style_scoped_in_place() {
        let (fragment, _) = extract(
            "<head><style>body { margin: 0; } .a { color: red; }</style></head>",
            Some("picocontainer-app[name=demo]"),
        );
        let style = fragment.find_element("style").unwrap();
        assert_eq!(
            style.text_content(),
            "picocontainer-app[name=demo] { margin: 0; }\npicocontainer-app[name=demo] .a { color: red; }"
        );
    }

    #[test]
    fn test_style_untouched_without_prefix() {
        let (fragment, _) = extract("<style>.a { color: red; }</style>", None);
        assert_eq!(fragment.find_element("style").unwrap().text_content(), ".a { color: red; }");
    }
}
