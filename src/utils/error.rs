//! Error types for picocontainer

use thiserror::Error;

/// Main error type for picocontainer operations
#[derive(Debug, Error)]
pub enum PicoError {
    /// Resource fetch errors
    #[error("network error: {0}")]
    Network(#[from] NetworkError),
    /// HTML/CSS handling errors
    #[error("render error: {0}")]
    Render(#[from] RenderError),
    /// Script execution errors
    #[error("script error: {0}")]
    Script(#[from] JsError),
}

/// Resource fetch errors
#[derive(Debug, Error)]
pub enum NetworkError {
    /// Locator could not be resolved against the application url
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    /// Non-success HTTP status
    #[error("HTTP {0} for {1}")]
    Http(u16, String),
    /// Transport failure or abandoned request
    #[error("request failed: {0}")]
    Request(String),
}

/// Rendering-specific errors
#[derive(Debug, Error)]
pub enum RenderError {
    /// Mount attempted without a container
    #[error("application {0} has no container")]
    MissingContainer(String),
}

/// Script-specific errors
#[derive(Debug, Error)]
pub enum JsError {
    /// Script threw or failed to compile
    #[error("execution failed: {0}")]
    Execution(String),
    /// Engine-level failure while bridging values
    #[error("runtime failure: {0}")]
    Runtime(String),
}

/// Convenience Result type for picocontainer operations
pub type Result<T> = std::result::Result<T, PicoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_errors_convert() {
        let err: PicoError = NetworkError::Http(404, "https://app.test/a.js".into()).into();
        assert_eq!(err.to_string(), "network error: HTTP 404 for https://app.test/a.js");

        let err: PicoError = JsError::Execution("boom".into()).into();
        assert!(matches!(err, PicoError::Script(JsError::Execution(_))));
    }
}
