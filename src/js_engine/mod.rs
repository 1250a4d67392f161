//! Script execution for application code
//!
//! Application scripts never run against the host global directly. The
//! sandbox wraps each script into a [`ScopedScript`] bound to its virtual
//! global, and a [`ScriptEngine`] executes that unit. [`BoaScriptEngine`]
//! is the default engine.

mod runtime;

pub use runtime::BoaScriptEngine;

use crate::sandbox::{Sandbox, Window};
use crate::utils::Result;
use std::any::Any;
use std::fmt;
use std::rc::Rc;

/// Global binding under which a sandbox's proxy window is published
pub const PROXY_WINDOW_BINDING: &str = "__PICOCONTAINER_PROXY_WINDOW__";

/// Executes scoped application scripts
#[cfg_attr(test, mockall::automock)]
pub trait ScriptEngine {
    /// Execute one script unit and return its completion value
    fn execute(&mut self, script: &ScopedScript) -> Result<JsValue>;

    /// Run handlers for events delivered since the last call
    fn run_pending_events(&mut self) -> Result<usize>;
}

/// An executable unit: script text plus the virtual global it resolves against
#[derive(Debug, Clone)]
pub struct ScopedScript {
    source: String,
    scope: Option<Sandbox>,
}

impl ScopedScript {
    /// Wrap `code` so free identifiers resolve against `sandbox` first
    pub fn bound(code: &str, sandbox: Sandbox) -> Self {
        let source = format!(
            ";(function (window, self) {{\n  with (window) {{\n    ;{code}\n  }}\n}}).call({binding}, {binding}, {binding});",
            binding = PROXY_WINDOW_BINDING,
        );
        Self {
            source,
            scope: Some(sandbox),
        }
    }

    /// Unwrapped unit for applications running without a sandbox
    pub fn global(code: &str) -> Self {
        Self {
            source: code.to_string(),
            scope: None,
        }
    }

    /// Text handed to the engine
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Sandbox the unit is bound to
    pub fn scope(&self) -> Option<&Sandbox> {
        self.scope.as_ref()
    }
}

/// JavaScript value types
#[derive(Debug, Clone, PartialEq, Default)]
pub enum JsValue {
    #[default]
    Undefined,
    Null,
    Boolean(bool),
    Number(f64),
    String(String),
    Function(Function),
    /// Engine-owned object
    Object(HostObject),
}

impl JsValue {
    /// Check if the value is truthy
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Undefined | Self::Null => false,
            Self::Boolean(b) => *b,
            Self::Number(n) => *n != 0.0 && !n.is_nan(),
            Self::String(s) => !s.is_empty(),
            Self::Function(_) | Self::Object(_) => true,
        }
    }

    /// Convert to string representation
    pub fn to_js_string(&self) -> String {
        match self {
            Self::Undefined => "undefined".to_string(),
            Self::Null => "null".to_string(),
            Self::Boolean(b) => b.to_string(),
            Self::Number(n) => n.to_string(),
            Self::String(s) => s.clone(),
            Self::Function(f) => format!("function {}() {{ [native code] }}", f.name()),
            Self::Object(_) => "[object Object]".to_string(),
        }
    }

    /// Function payload, if any
    pub fn as_function(&self) -> Option<&Function> {
        match self {
            Self::Function(f) => Some(f),
            _ => None,
        }
    }
}

impl From<&str> for JsValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<f64> for JsValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<bool> for JsValue {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

/// Whether a callable is meant to be invoked with `new`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    Plain,
    Constructor,
}

impl FunctionKind {
    /// Classify a callable from its source text: a capitalised named
    /// function declaration or a class is a constructor.
    pub fn classify(source: &str) -> Self {
        let source = source.trim_start();
        if let Some(rest) = source.strip_prefix("class") {
            if rest.starts_with(char::is_whitespace) {
                return Self::Constructor;
            }
        }
        if let Some(rest) = source.strip_prefix("function") {
            let name = rest.trim_start();
            if name.len() < rest.len() && name.starts_with(|c: char| c.is_ascii_uppercase()) {
                return Self::Constructor;
            }
        }
        Self::Plain
    }
}

type NativeFn = Rc<dyn Fn(Option<&Window>, &[JsValue]) -> JsValue>;

/// Host-native callable exposed on a global object
#[derive(Clone)]
pub struct Function {
    name: Rc<str>,
    kind: FunctionKind,
    this: Option<Window>,
    body: NativeFn,
}

impl Function {
    /// Plain native function
    pub fn native(
        name: &str,
        body: impl Fn(Option<&Window>, &[JsValue]) -> JsValue + 'static,
    ) -> Self {
        Self::with_kind(name, FunctionKind::Plain, body)
    }

    /// Native constructor; never rebound by the sandbox
    pub fn constructor(
        name: &str,
        body: impl Fn(Option<&Window>, &[JsValue]) -> JsValue + 'static,
    ) -> Self {
        Self::with_kind(name, FunctionKind::Constructor, body)
    }

    fn with_kind(
        name: &str,
        kind: FunctionKind,
        body: impl Fn(Option<&Window>, &[JsValue]) -> JsValue + 'static,
    ) -> Self {
        Self {
            name: Rc::from(name),
            kind,
            this: None,
            body: Rc::new(body),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> FunctionKind {
        self.kind
    }

    pub fn is_constructor(&self) -> bool {
        self.kind == FunctionKind::Constructor
    }

    /// Copy of this function whose receiver is always `window`
    pub fn bind(&self, window: &Window) -> Self {
        Self {
            this: Some(window.clone()),
            ..self.clone()
        }
    }

    /// Receiver fixed by [`Function::bind`]
    pub fn bound_this(&self) -> Option<&Window> {
        self.this.as_ref()
    }

    /// Invoke with the bound receiver, if any
    pub fn call(&self, args: &[JsValue]) -> JsValue {
        (self.body)(self.this.as_ref(), args)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("bound", &self.this.is_some())
            .finish()
    }
}

impl PartialEq for Function {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.body, &other.body) && self.this == other.this
    }
}

/// Opaque object owned by a script engine, compared by identity
#[derive(Clone)]
pub struct HostObject(Rc<dyn Any>);

impl HostObject {
    pub fn new<T: Any>(value: T) -> Self {
        Self(Rc::new(value))
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }
}

impl fmt::Debug for HostObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("HostObject")
    }
}

impl PartialEq for HostObject {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_constructors() {
        assert_eq!(FunctionKind::classify("function Foo() {}"), FunctionKind::Constructor);
        assert_eq!(FunctionKind::classify("class Bar {}"), FunctionKind::Constructor);
        assert_eq!(FunctionKind::classify("function alert() {}"), FunctionKind::Plain);
        assert_eq!(FunctionKind::classify("function() {}"), FunctionKind::Plain);
        assert_eq!(FunctionKind::classify("classy => 1"), FunctionKind::Plain);
        assert_eq!(FunctionKind::classify("functionFoo"), FunctionKind::Plain);
    }

    #[test]
    fn test_bound_function_receives_window() {
        let window = Window::new();
        let f = Function::native("whoami", |this, _| JsValue::Boolean(this.is_some()));
        assert_eq!(f.call(&[]), JsValue::Boolean(false));
        assert_eq!(f.bind(&window).call(&[]), JsValue::Boolean(true));
        assert_ne!(f, f.bind(&window));
    }

    #[test]
    fn test_scoped_script_wraps_with_binding() {
        let unit = ScopedScript::bound("foo = 1", Sandbox::with_window(Window::new()));
        assert!(unit.source().contains("with (window)"));
        assert!(unit.source().contains(";foo = 1\n"));
        assert!(unit
            .source()
            .ends_with(".call(__PICOCONTAINER_PROXY_WINDOW__, __PICOCONTAINER_PROXY_WINDOW__, __PICOCONTAINER_PROXY_WINDOW__);"));
        assert!(unit.scope().is_some());

        let raw = ScopedScript::global("foo = 1");
        assert_eq!(raw.source(), "foo = 1");
        assert!(raw.scope().is_none());
    }

    #[test]
    fn test_truthiness() {
        assert!(!JsValue::Undefined.is_truthy());
        assert!(!JsValue::from("").is_truthy());
        assert!(JsValue::from(1.0).is_truthy());
        assert!(JsValue::Function(Function::native("f", |_, _| JsValue::Null)).is_truthy());
    }
}
