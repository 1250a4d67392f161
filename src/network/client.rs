//! HTTP client implementation

use super::{Request, Response};
use crate::utils::{Result, error::NetworkError};
use std::time::Duration;

const USER_AGENT: &str = concat!("picocontainer/", env!("CARGO_PKG_VERSION"));

/// HTTP client with connection pooling
pub struct NetworkClient {
    client: reqwest::Client,
}

impl NetworkClient {
    /// Create a new HTTP client
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| NetworkError::Request(e.to_string()))?;
        Ok(Self { client })
    }

    /// Execute an HTTP request
    pub async fn execute(&self, request: Request) -> Result<Response> {
        let mut builder = self.client.get(request.url().as_str());
        for (name, value) in request.headers() {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| NetworkError::Request(e.to_string()))?;

        let status = response.status().as_u16();
        let url = response.url().to_string();
        let body = response
            .text()
            .await
            .map_err(|e| NetworkError::Request(e.to_string()))?;

        Ok(Response::new(status, url, body))
    }
}
