//! # picocontainer - micro frontend host
//!
//! Embeds independently authored HTML/CSS/JS applications into container
//! elements of one host page, isolating their globals, global event
//! listeners and stylesheets from each other and from the host.
//!
//! ## Architecture
//!
//! - **engine**: Application controller, lifecycle state machine and registry
//! - **renderer**: HTML parsing, owned DOM, selector and stylesheet scoping
//! - **sandbox**: Per-application virtual global over the real window
//! - **js_engine**: Script execution against a sandbox (Boa)
//! - **network**: Resource fetching over HTTP
//! - **element**: Custom element surface mapping attach/detach to the lifecycle
//! - **event_center**: Host/application publish-subscribe
//! - **config**: Container tag name and per-application options
//! - **utils**: Shared utilities and error types

pub mod config;
pub mod element;
pub mod engine;
pub mod event_center;
pub mod js_engine;
pub mod network;
pub mod renderer;
pub mod sandbox;
pub mod utils;

// Re-export main types for convenience
pub use config::{AppOptions, ContainerConfig};
pub use element::{MicroAppElement, start};
pub use engine::{AppParams, AppStatus, ContainerEngine, LifecycleEvent};
pub use utils::error::{PicoError, Result};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = "picocontainer";
