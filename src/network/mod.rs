//! Resource fetching for application documents, stylesheets and scripts
//!
//! The lifecycle only depends on [`ResourceFetcher`]. [`NetworkStack`] is the
//! HTTP implementation used by the binary.

mod client;
mod request;
mod response;

pub use client::NetworkClient;
pub use request::Request;
pub use response::Response;

use crate::utils::{Result, error::NetworkError};
use async_trait::async_trait;
use url::Url;

const ACCEPT_SOURCES: &str = "text/html,text/css,application/javascript;q=0.9,*/*;q=0.8";

/// Returns the textual body behind a locator, or fails
#[async_trait(?Send)]
pub trait ResourceFetcher {
    async fn fetch_source(&self, url: &str) -> Result<String>;
}

/// Network stack handling all HTTP communications
pub struct NetworkStack {
    client: NetworkClient,
}

impl NetworkStack {
    /// Create a new network stack
    pub fn new() -> Result<Self> {
        Ok(Self {
            client: NetworkClient::new()?,
        })
    }

    /// Fetch a resource from the given URL
    pub async fn fetch(&self, url: &str) -> Result<Response> {
        self.client.execute(source_request(url)?).await
    }
}

#[async_trait(?Send)]
impl ResourceFetcher for NetworkStack {
    async fn fetch_source(&self, url: &str) -> Result<String> {
        log::debug!("fetching {url}");
        self.fetch(url).await?.into_text()
    }
}

/// GET request for an application document, stylesheet or script
fn source_request(url: &str) -> Result<Request> {
    Ok(Request::get(url)?.header("Accept", ACCEPT_SOURCES))
}

/// Resolve a resource locator against the url of the document declaring it
pub fn resolve_url(base: &str, locator: &str) -> Result<String> {
    if let Ok(absolute) = Url::parse(locator) {
        return Ok(absolute.into());
    }
    let base = Url::parse(base).map_err(|_| NetworkError::InvalidUrl(base.to_string()))?;
    base.join(locator)
        .map(String::from)
        .map_err(|_| NetworkError::InvalidUrl(locator.to_string()).into())
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_relative_locators() {
        let base = "https://app.test/apps/one/index.html";
        assert_eq!(resolve_url(base, "main.js").unwrap(), "https://app.test/apps/one/main.js");
        assert_eq!(resolve_url(base, "/static/a.css").unwrap(), "https://app.test/static/a.css");
        assert_eq!(
            resolve_url(base, "https://cdn.test/lib.js").unwrap(),
            "https://cdn.test/lib.js"
        );
    }

    #[test]
    fn test_resolve_needs_absolute_base() {
        assert!(resolve_url("not a url", "main.js").is_err());
        assert_eq!(
            resolve_url("not a url", "http://cdn.test/x.js").unwrap(),
            "http://cdn.test/x.js"
        );
    }

    #[test]
    fn test_source_request_accepts_text_sources() {
        let request = source_request("https://app.test/demo/").unwrap();
        let accept = request.headers().get("Accept").map(String::as_str).unwrap();
        assert!(accept.starts_with("text/html,text/css"));
        assert!(source_request("file:///etc/passwd").is_err());
    }

    #[tokio::test]
    async fn test_fake_fetcher_counts_and_statuses() {
        let fetcher = fake::FakeFetcher::new()
            .with_body("https://app.test/a.js", "1")
            .with_status("https://app.test/b.js", 500);
        assert_eq!(fetcher.fetch_source("https://app.test/a.js").await.unwrap(), "1");
        assert!(fetcher.fetch_source("https://app.test/b.js").await.is_err());
        assert!(fetcher.fetch_source("https://app.test/c.js").await.is_err());
        assert_eq!(fetcher.fetch_count("https://app.test/a.js"), 1);
        assert_eq!(fetcher.total_fetches(), 3);
    }
}
