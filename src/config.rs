//! Container configuration

/// Tag the custom element is registered under by default
pub const DEFAULT_TAG_NAME: &str = "picocontainer-app";

/// Per-application switches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppOptions {
    /// Namespace application stylesheets under the container selector
    pub scoped_css: bool,
    /// Run application scripts against a sandboxed global
    pub use_sandbox: bool,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            scoped_css: true,
            use_sandbox: true,
        }
    }
}

/// Host-wide configuration shared by every application
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerConfig {
    tag_name: String,
    defaults: AppOptions,
}

impl ContainerConfig {
    /// Create a configuration using the default tag name
    pub fn new() -> Self {
        Self {
            tag_name: DEFAULT_TAG_NAME.to_string(),
            defaults: AppOptions::default(),
        }
    }

    /// Use a different custom element tag
    pub fn with_tag_name(mut self, tag_name: impl Into<String>) -> Self {
        self.tag_name = tag_name.into().to_ascii_lowercase();
        self
    }

    /// Replace the options applied to new applications
    pub fn with_defaults(mut self, defaults: AppOptions) -> Self {
        self.defaults = defaults;
        self
    }

    /// Custom element tag name
    pub fn tag_name(&self) -> &str {
        &self.tag_name
    }

    /// Options applied to new applications
    pub fn defaults(&self) -> AppOptions {
        self.defaults
    }

    /// Private tag replacing an application's `<head>`
    pub fn head_tag(&self) -> String {
        format!("{}-head", self.tag_name)
    }

    /// Private tag replacing an application's `<body>`
    pub fn body_tag(&self) -> String {
        format!("{}-body", self.tag_name)
    }

    /// Selector identifying the container of `app_name`. The name is
    /// written as a quoted CSS string so any name yields a valid selector.
    pub fn scope_prefix(&self, app_name: &str) -> String {
        let mut quoted = String::with_capacity(app_name.len() + 2);
        quoted.push('"');
        for c in app_name.chars() {
            match c {
                '"' | '\\' => {
                    quoted.push('\\');
                    quoted.push(c);
                }
                '\n' => quoted.push_str("\\a "),
                _ => quoted.push(c),
            }
        }
        quoted.push('"');
        format!("{}[name={quoted}]", self.tag_name)
    }
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_names() {
        let config = ContainerConfig::new();
        assert_eq!(config.head_tag(), "picocontainer-app-head");
        assert_eq!(config.body_tag(), "picocontainer-app-body");
        assert_eq!(config.scope_prefix("app1"), r#"picocontainer-app[name="app1"]"#);
    }

    #[test]
    fn test_custom_tag_is_lowercased() {
        let config = ContainerConfig::new().with_tag_name("Micro-App");
        assert_eq!(config.tag_name(), "micro-app");
        assert_eq!(config.scope_prefix("x"), r#"micro-app[name="x"]"#);
    }

    #[test]
    fn test_scope_prefix_quotes_special_names() {
        let config = ContainerConfig::new();
        assert_eq!(
            config.scope_prefix("my shop"),
            r#"picocontainer-app[name="my shop"]"#
        );
        assert_eq!(
            config.scope_prefix(r#"a"b\c"#),
            r#"picocontainer-app[name="a\"b\\c"]"#
        );
    }

    #[test]
    fn test_default_options_enable_isolation() {
        let options = ContainerConfig::default().defaults();
        assert!(options.scoped_css);
        assert!(options.use_sandbox);
    }
}
