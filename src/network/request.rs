//! HTTP request types

use crate::utils::{Result, error::NetworkError};
use std::collections::HashMap;
use url::Url;

/// HTTP request
#[derive(Debug, Clone)]
pub struct Request {
    url: Url,
    headers: HashMap<String, String>,
}

impl Request {
    /// Create a GET request; only http(s) urls are fetchable
    pub fn get(url: &str) -> Result<Self> {
        let parsed = Url::parse(url).map_err(|_| NetworkError::InvalidUrl(url.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(NetworkError::InvalidUrl(url.to_string()).into());
        }
        Ok(Self {
            url: parsed,
            headers: HashMap::new(),
        })
    }

    /// Add a header
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Get the URL
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Get headers
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_accepts_http_only() {
        assert!(Request::get("https://app.test/index.html").is_ok());
        assert!(Request::get("http://localhost:8080/").is_ok());
        assert!(Request::get("ftp://app.test/a.js").is_err());
        assert!(Request::get("/relative/a.js").is_err());
    }

    #[test]
    fn test_headers_accumulate() {
        let request = Request::get("https://app.test/")
            .unwrap()
            .header("Accept", "text/html")
            .header("Accept", "text/css");
        assert_eq!(request.url().host_str(), Some("app.test"));
        assert_eq!(request.headers().get("Accept").map(String::as_str), Some("text/css"));
    }
}
