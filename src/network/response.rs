//! HTTP response types

use crate::utils::{Result, error::NetworkError};

/// HTTP response
#[derive(Debug, Clone)]
pub struct Response {
    status: u16,
    url: String,
    body: String,
}

impl Response {
    /// Create a new response
    pub fn new(status: u16, url: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            status,
            url: url.into(),
            body: body.into(),
        }
    }

    /// Get the status code
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Check if the response was successful (2xx)
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body of a successful response; other statuses become errors
    pub fn into_text(self) -> Result<String> {
        if self.is_success() {
            Ok(self.body)
        } else {
            Err(NetworkError::Http(self.status, self.url).into())
        }
    }
}
