//! JavaScript runtime implementation using Boa engine
//!
//! A bound script resolves free identifiers against a JS `Proxy` whose traps
//! call back into the script's [`Sandbox`]. Boa native functions here are
//! plain function pointers, so the state they need is reached through a
//! thread-local stack of active bridges, pushed for the duration of each
//! evaluation.

use super::{Function, HostObject, JsValue, PROXY_WINDOW_BINDING, ScopedScript, ScriptEngine};
use crate::sandbox::{Event, Listener, Sandbox};
use crate::utils::{Result, error::JsError};
use boa_engine::object::ObjectInitializer;
use boa_engine::property::Attribute;
use boa_engine::{
    Context, JsArgs, JsObject, JsResult, JsString, JsValue as BoaJsValue, NativeFunction, Source,
    js_string,
};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

/// Hidden global holding the proxy trap handler
const TRAPS_BINDING: &str = "__picocontainer_traps__";

const ADD_EVENT_LISTENER: &str = "addEventListener";
const REMOVE_EVENT_LISTENER: &str = "removeEventListener";

/// Names that resolve to the proxy itself inside a bound script
const SELF_NAMES: [&str; 3] = ["window", "self", "globalThis"];

thread_local! {
    static ACTIVE_BRIDGES: RefCell<Vec<Rc<Bridge>>> = const { RefCell::new(Vec::new()) };
}

/// A JS handler registered on the real global through the sandbox
struct Registration {
    event_type: String,
    handler: usize,
    listener: Listener,
}

/// Host state shared between an engine and its proxy traps
#[derive(Default)]
struct Bridge {
    sandbox: RefCell<Option<Sandbox>>,
    handlers: RefCell<Vec<JsObject>>,
    registrations: RefCell<Vec<Registration>>,
    host_functions: RefCell<Vec<Function>>,
    queue: Rc<RefCell<VecDeque<(usize, Event)>>>,
}

impl Bridge {
    fn sandbox(&self) -> JsResult<Sandbox> {
        self.sandbox
            .borrow()
            .clone()
            .ok_or_else(|| throw("no sandbox bound to this engine"))
    }

    fn handler_index(&self, handler: &JsObject) -> usize {
        let candidate = BoaJsValue::from(handler.clone());
        let mut handlers = self.handlers.borrow_mut();
        if let Some(index) = handlers
            .iter()
            .position(|h| BoaJsValue::from(h.clone()).strict_equals(&candidate))
        {
            return index;
        }
        handlers.push(handler.clone());
        handlers.len() - 1
    }

    fn host_function_index(&self, function: &Function) -> usize {
        let mut functions = self.host_functions.borrow_mut();
        if let Some(index) = functions.iter().position(|f| f == function) {
            return index;
        }
        functions.push(function.clone());
        functions.len() - 1
    }

    fn add_listener(&self, event_type: String, handler: &JsObject) -> JsResult<()> {
        let sandbox = self.sandbox()?;
        let handler = self.handler_index(handler);
        let mut registrations = self.registrations.borrow_mut();
        if registrations
            .iter()
            .any(|r| r.event_type == event_type && r.handler == handler)
        {
            return Ok(());
        }

        let queue = Rc::clone(&self.queue);
        let listener = Listener::new(move |event| {
            queue.borrow_mut().push_back((handler, event.clone()));
        });
        sandbox.add_event_listener(&event_type, &listener);
        registrations.push(Registration {
            event_type,
            handler,
            listener,
        });
        Ok(())
    }

    fn remove_listener(&self, event_type: &str, handler: &JsObject) -> JsResult<()> {
        let sandbox = self.sandbox()?;
        let handler = self.handler_index(handler);
        let mut registrations = self.registrations.borrow_mut();
        if let Some(pos) = registrations
            .iter()
            .position(|r| r.event_type == event_type && r.handler == handler)
        {
            let registration = registrations.remove(pos);
            sandbox.remove_event_listener(event_type, &registration.listener);
        }
        Ok(())
    }
}

/// Keeps a bridge on the active stack while the engine runs JS
struct ActiveBridge;

impl ActiveBridge {
    fn enter(bridge: &Rc<Bridge>) -> Self {
        ACTIVE_BRIDGES.with(|active| active.borrow_mut().push(Rc::clone(bridge)));
        ActiveBridge
    }
}

impl Drop for ActiveBridge {
    fn drop(&mut self) {
        ACTIVE_BRIDGES.with(|active| {
            active.borrow_mut().pop();
        });
    }
}

fn current_bridge() -> JsResult<Rc<Bridge>> {
    ACTIVE_BRIDGES
        .with(|active| active.borrow().last().cloned())
        .ok_or_else(|| throw("sandbox accessed outside of script execution"))
}

fn throw(message: &str) -> boa_engine::JsError {
    boa_engine::JsError::from_opaque(BoaJsValue::from(JsString::from(message)))
}

/// String property key; symbols yield `None`
fn property_name(key: &BoaJsValue) -> Option<String> {
    key.as_string().map(|s| s.to_std_string_escaped())
}

/// Script engine backed by one Boa context
pub struct BoaScriptEngine {
    context: Context,
    bridge: Rc<Bridge>,
    traps_installed: bool,
}

impl BoaScriptEngine {
    pub fn new() -> Self {
        Self {
            context: Context::default(),
            bridge: Rc::default(),
            traps_installed: false,
        }
    }

    /// Publish a proxy for `sandbox` under the fixed binding, unless it is
    /// already the bound one. An engine serves one sandbox at a time.
    fn bind(&mut self, sandbox: &Sandbox) -> Result<()> {
        if self
            .bridge
            .sandbox
            .borrow()
            .as_ref()
            .is_some_and(|bound| bound.ptr_eq(sandbox))
        {
            return Ok(());
        }

        if !self.traps_installed {
            let traps = ObjectInitializer::new(&mut self.context)
                .function(NativeFunction::from_fn_ptr(get_trap), js_string!("get"), 3)
                .function(NativeFunction::from_fn_ptr(set_trap), js_string!("set"), 4)
                .function(NativeFunction::from_fn_ptr(has_trap), js_string!("has"), 2)
                .function(
                    NativeFunction::from_fn_ptr(delete_trap),
                    js_string!("deleteProperty"),
                    2,
                )
                .build();
            self.context
                .register_global_property(JsString::from(TRAPS_BINDING), traps, Attribute::all())
                .map_err(|e| JsError::Runtime(e.to_string()))?;
            self.traps_installed = true;
        }

        *self.bridge.sandbox.borrow_mut() = Some(sandbox.clone());
        self.bridge.registrations.borrow_mut().clear();
        let publish = format!("globalThis.{PROXY_WINDOW_BINDING} = new Proxy({{}}, {TRAPS_BINDING});");
        self.context
            .eval(Source::from_bytes(publish.as_bytes()))
            .map_err(|e| JsError::Runtime(e.to_string()))?;
        log::debug!("published proxy window for {sandbox:?}");
        Ok(())
    }

    fn pending_events(&self) -> Vec<(usize, Event)> {
        self.bridge.queue.borrow_mut().drain(..).collect()
    }
}

impl Default for BoaScriptEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptEngine for BoaScriptEngine {
    fn execute(&mut self, script: &ScopedScript) -> Result<JsValue> {
        if script.source().trim().is_empty() {
            return Ok(JsValue::Undefined);
        }
        if let Some(sandbox) = script.scope() {
            self.bind(sandbox)?;
            // Listeners released by a stop cannot be removed again
            if sandbox.listener_count() == 0 {
                self.bridge.registrations.borrow_mut().clear();
            }
        }

        let _active = ActiveBridge::enter(&self.bridge);
        match self.context.eval(Source::from_bytes(script.source())) {
            Ok(result) => Ok(from_boa(&result)),
            Err(e) => Err(JsError::Execution(e.to_string()).into()),
        }
    }

    fn run_pending_events(&mut self) -> Result<usize> {
        let released = self
            .bridge
            .sandbox
            .borrow()
            .as_ref()
            .is_some_and(|sandbox| sandbox.listener_count() == 0);
        if released {
            // Events queued before a stop are dropped with their listeners
            let dropped = self.pending_events().len();
            self.bridge.registrations.borrow_mut().clear();
            if dropped > 0 {
                log::debug!("dropped {dropped} event(s) queued for released listeners");
            }
            return Ok(0);
        }

        let pending = self.pending_events();
        if pending.is_empty() {
            return Ok(0);
        }

        let _active = ActiveBridge::enter(&self.bridge);
        let mut delivered = 0;
        for (index, event) in pending {
            let Some(handler) = self.bridge.handlers.borrow().get(index).cloned() else {
                continue;
            };
            let detail = to_boa(event.detail(), &self.bridge, &mut self.context);
            let event_object = ObjectInitializer::new(&mut self.context)
                .property(js_string!("type"), JsString::from(event.event_type()), Attribute::all())
                .property(js_string!("detail"), detail, Attribute::all())
                .build();
            match handler.call(&BoaJsValue::undefined(), &[event_object.into()], &mut self.context) {
                Ok(_) => delivered += 1,
                Err(e) => log::error!("{} handler failed: {e}", event.event_type()),
            }
        }
        Ok(delivered)
    }
}

/// Convert a Boa value into a host value
fn from_boa(value: &BoaJsValue) -> JsValue {
    if value.is_undefined() {
        JsValue::Undefined
    } else if value.is_null() {
        JsValue::Null
    } else if let Some(b) = value.as_boolean() {
        JsValue::Boolean(b)
    } else if let Some(n) = value.as_number() {
        JsValue::Number(n)
    } else if let Some(s) = value.as_string() {
        JsValue::String(s.to_std_string_escaped())
    } else if let Some(object) = value.as_object() {
        JsValue::Object(HostObject::new(object.clone()))
    } else {
        JsValue::Undefined
    }
}

/// Convert a host value into a Boa value
fn to_boa(value: &JsValue, bridge: &Bridge, context: &mut Context) -> BoaJsValue {
    match value {
        JsValue::Undefined => BoaJsValue::undefined(),
        JsValue::Null => BoaJsValue::null(),
        JsValue::Boolean(b) => BoaJsValue::from(*b),
        JsValue::Number(n) => BoaJsValue::from(*n),
        JsValue::String(s) => BoaJsValue::from(JsString::from(s.as_str())),
        JsValue::Function(function) => {
            let index = bridge.host_function_index(function);
            NativeFunction::from_copy_closure(move |_this, args, ctx| {
                call_host_function(index, args, ctx)
            })
            .to_js_function(context.realm())
            .into()
        }
        JsValue::Object(object) => object
            .downcast_ref::<JsObject>()
            .map_or_else(BoaJsValue::undefined, |o| o.clone().into()),
    }
}

fn call_host_function(index: usize, args: &[BoaJsValue], ctx: &mut Context) -> JsResult<BoaJsValue> {
    let bridge = current_bridge()?;
    let function = bridge
        .host_functions
        .borrow()
        .get(index)
        .cloned()
        .ok_or_else(|| throw("host function is gone"))?;
    let args: Vec<JsValue> = args.iter().map(from_boa).collect();
    let result = function.call(&args);
    Ok(to_boa(&result, &bridge, ctx))
}

fn listener_api(name: &str, ctx: &mut Context) -> BoaJsValue {
    let body = if name == ADD_EVENT_LISTENER {
        add_event_listener
    } else {
        remove_event_listener
    };
    NativeFunction::from_fn_ptr(body).to_js_function(ctx.realm()).into()
}

fn listener_args(args: &[BoaJsValue], ctx: &mut Context) -> JsResult<Option<(String, JsObject)>> {
    let event_type = args.get_or_undefined(0).to_string(ctx)?.to_std_string_escaped();
    let handler = args.get_or_undefined(1).as_object().map(|o| o.clone());
    Ok(handler
        .filter(JsObject::is_callable)
        .map(|handler| (event_type, handler)))
}

fn add_event_listener(_this: &BoaJsValue, args: &[BoaJsValue], ctx: &mut Context) -> JsResult<BoaJsValue> {
    if let Some((event_type, handler)) = listener_args(args, ctx)? {
        current_bridge()?.add_listener(event_type, &handler)?;
    }
    Ok(BoaJsValue::undefined())
}

fn remove_event_listener(_this: &BoaJsValue, args: &[BoaJsValue], ctx: &mut Context) -> JsResult<BoaJsValue> {
    if let Some((event_type, handler)) = listener_args(args, ctx)? {
        current_bridge()?.remove_listener(&event_type, &handler)?;
    }
    Ok(BoaJsValue::undefined())
}

/// `get(target, key, receiver)`
fn get_trap(_this: &BoaJsValue, args: &[BoaJsValue], ctx: &mut Context) -> JsResult<BoaJsValue> {
    let Some(key) = property_name(args.get_or_undefined(1)) else {
        return Ok(BoaJsValue::undefined());
    };
    if SELF_NAMES.contains(&key.as_str()) {
        return Ok(args.get_or_undefined(2).clone());
    }
    if key == ADD_EVENT_LISTENER || key == REMOVE_EVENT_LISTENER {
        return Ok(listener_api(&key, ctx));
    }

    let bridge = current_bridge()?;
    let sandbox = bridge.sandbox()?;
    if !sandbox.has(&key) {
        // Engine builtins such as Math or JSON
        return ctx.global_object().get(JsString::from(key.as_str()), ctx);
    }
    let value = sandbox.get(&key);
    Ok(to_boa(&value, &bridge, ctx))
}

/// `set(target, key, value, receiver)`
fn set_trap(_this: &BoaJsValue, args: &[BoaJsValue], _ctx: &mut Context) -> JsResult<BoaJsValue> {
    if let Some(key) = property_name(args.get_or_undefined(1)) {
        let value = from_boa(args.get_or_undefined(2));
        current_bridge()?.sandbox()?.set(&key, value);
    }
    Ok(BoaJsValue::from(true))
}

/// `has(target, key)`: identifiers the engine does not provide itself
/// resolve against the sandbox, so undeclared assignments stay inside it
fn has_trap(_this: &BoaJsValue, args: &[BoaJsValue], ctx: &mut Context) -> JsResult<BoaJsValue> {
    let Some(key) = property_name(args.get_or_undefined(1)) else {
        return Ok(BoaJsValue::from(false));
    };
    if SELF_NAMES.contains(&key.as_str()) || key == ADD_EVENT_LISTENER || key == REMOVE_EVENT_LISTENER {
        return Ok(BoaJsValue::from(true));
    }
    if current_bridge()?.sandbox()?.has(&key) {
        return Ok(BoaJsValue::from(true));
    }
    let builtin = ctx
        .global_object()
        .has_property(JsString::from(key.as_str()), ctx)?;
    Ok(BoaJsValue::from(!builtin))
}

/// `deleteProperty(target, key)`
fn delete_trap(_this: &BoaJsValue, args: &[BoaJsValue], _ctx: &mut Context) -> JsResult<BoaJsValue> {
    let deleted = match property_name(args.get_or_undefined(1)) {
        Some(key) => current_bridge()?.sandbox()?.delete_property(&key),
        None => true,
    };
    Ok(BoaJsValue::from(deleted))
}
