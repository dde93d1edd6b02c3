//! The capability interface a realm needs from its script engine.
//!
//! Everything the trust-boundary core knows about the engine goes through
//! [`Engine`]: isolated realm creation, privilege tokens, boundary-crossing
//! callables, script compilation and creation-context lookup, plus the small
//! object model the core reads and writes.

use core_types::{JsResult, ObjectId, SecurityToken, Value};
use std::any::Any;
use std::fmt;
use std::rc::Rc;
use thiserror::Error;

/// Largest accepted function `length`.
pub const MAX_FUNCTION_LENGTH: u32 = 0x7FFF_FFFF;

/// Errors raised by the engine itself, outside of guest semantics.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The handle does not name an object of this engine
    #[error("unknown object {0}")]
    UnknownObject(ObjectId),
    /// The handle does not name the global object of a realm
    #[error("object {0} is not a realm global")]
    NotARealm(ObjectId),
    /// Function length outside `0..=MAX_FUNCTION_LENGTH`
    #[error("function length {0} is out of range [0; {max}]", max = MAX_FUNCTION_LENGTH)]
    InvalidLength(u64),
    /// Unknown compiled script handle
    #[error("unknown script {0:?}")]
    UnknownScript(ScriptId),
    /// The object is not an error object
    #[error("object {0} is not an error")]
    NotAnError(ObjectId),
}

/// Parameters of a new isolated realm.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RealmInit {
    /// Human readable realm name, used in stack traces
    pub name: String,
    /// Serialized origin of the realm, if any
    pub origin: Option<String>,
}

/// An own property of an object.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertySlot {
    /// Plain value
    Data(Value),
    /// Getter/setter pair
    Accessor {
        /// Getter function
        get: Option<ObjectId>,
        /// Setter function
        set: Option<ObjectId>,
    },
}

/// Arguments of a native call.
#[derive(Debug, Clone)]
pub struct CallInfo {
    /// The function being invoked
    pub callee: ObjectId,
    /// Receiver
    pub this: Value,
    /// Positional arguments
    pub args: Vec<Value>,
    /// `new.target` for construct calls
    pub new_target: Option<ObjectId>,
}

impl CallInfo {
    /// Argument at `index`, `undefined` when absent.
    pub fn arg(&self, index: usize) -> Value {
        self.args.get(index).cloned().unwrap_or_default()
    }

    /// Whether this call came from `new`.
    pub fn is_construct_call(&self) -> bool {
        self.new_target.is_some()
    }
}

/// Host callback behind a native function.
pub type NativeCallback = Rc<dyn Fn(&dyn Engine, &CallInfo) -> JsResult>;

/// Shape of a new native function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionOptions {
    /// `name` property; empty means anonymous
    pub name: String,
    /// `length` property
    pub length: u32,
    /// Whether the function may be used with `new`
    pub constructor: bool,
    /// Global of the realm the function is bound to
    pub realm: ObjectId,
}

impl FunctionOptions {
    /// A non-constructor function with the given name bound to `realm`.
    pub fn new(realm: ObjectId, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            length: 0,
            constructor: false,
            realm,
        }
    }

    /// Set the `length` property.
    pub fn with_length(mut self, length: u32) -> Self {
        self.length = length;
        self
    }

    /// Allow `new`.
    pub fn constructor(mut self, constructor: bool) -> Self {
        self.constructor = constructor;
        self
    }
}

/// Contents of a new error object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorInit {
    /// `message` property
    pub message: String,
    /// `cause` property, only defined when present
    pub cause: Option<Value>,
    /// Nested errors of an aggregate error
    pub errors: Vec<Value>,
}

impl ErrorInit {
    /// An error carrying only a message.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }
}

/// Handle of a compiled script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScriptId(pub(crate) u32);

/// Capabilities supplied by the script engine.
///
/// All methods take `&self`: callbacks re-enter the engine while it is
/// executing, so implementations keep their mutable state behind short-lived
/// interior borrows.
pub trait Engine {
    /// Global object of the trusted host realm.
    fn host_global(&self) -> ObjectId;

    /// Create an isolated realm and return its global object.
    fn create_realm(&self, init: &RealmInit) -> Result<ObjectId, EngineError>;

    /// Name the realm was created with.
    fn realm_name(&self, global: ObjectId) -> Result<String, EngineError>;

    /// Current privilege token of a realm.
    fn security_token(&self, global: ObjectId) -> Result<SecurityToken, EngineError>;

    /// Replace the privilege token of a realm, returning the previous one.
    fn set_security_token(
        &self,
        global: ObjectId,
        token: SecurityToken,
    ) -> Result<SecurityToken, EngineError>;

    /// Global object of the realm that created `object`.
    fn global_of(&self, object: ObjectId) -> Option<ObjectId>;

    /// Allocate an ordinary object inside `global`'s realm.
    fn create_object(
        &self,
        global: ObjectId,
        prototype: Option<ObjectId>,
    ) -> Result<ObjectId, EngineError>;

    /// `[[Prototype]]` of an object.
    fn prototype_of(&self, object: ObjectId) -> Option<ObjectId>;

    /// Replace `[[Prototype]]`; refuses cycles.
    fn set_prototype_of(
        &self,
        object: ObjectId,
        prototype: Option<ObjectId>,
    ) -> Result<bool, EngineError>;

    /// Own property names in insertion order.
    fn own_keys(&self, object: ObjectId) -> Vec<String>;

    /// Own property by name.
    fn get_own_property(&self, object: ObjectId, key: &str) -> Option<PropertySlot>;

    /// Define or replace an own property.
    fn define_property(
        &self,
        object: ObjectId,
        key: &str,
        slot: PropertySlot,
    ) -> Result<(), EngineError>;

    /// Property lookup along the prototype chain, invoking getters.
    fn get(&self, object: ObjectId, key: &str) -> JsResult;

    /// Property assignment, invoking setters found on the chain.
    fn set(&self, object: ObjectId, key: &str, value: Value) -> JsResult<()>;

    /// Attach host data to an object.
    fn set_internal(&self, object: ObjectId, data: Rc<dyn Any>) -> Result<(), EngineError>;

    /// Host data attached to an object.
    fn internal(&self, object: ObjectId) -> Option<Rc<dyn Any>>;

    /// Create a boundary-crossing native function.
    fn create_function(
        &self,
        options: FunctionOptions,
        callback: NativeCallback,
    ) -> Result<ObjectId, EngineError>;

    /// Whether the value is a function object.
    fn is_callable(&self, value: &Value) -> bool;

    /// Whether the value is a constructor.
    fn is_constructor(&self, value: &Value) -> bool;

    /// `function.call(this, ...args)`
    fn call(&self, function: ObjectId, this: Value, args: &[Value]) -> JsResult;

    /// `new function(...args)` with an optional distinct `new.target`.
    fn construct(
        &self,
        function: ObjectId,
        args: &[Value],
        new_target: Option<ObjectId>,
    ) -> JsResult;

    /// Allocate an error object whose prototype is `prototype`.
    ///
    /// The error belongs to the realm that created `prototype`.
    fn create_error(&self, prototype: ObjectId, init: ErrorInit) -> Result<ObjectId, EngineError>;

    /// Nested errors of an error object, `None` for non-errors.
    fn aggregated_errors(&self, object: ObjectId) -> Option<Vec<Value>>;

    /// Replace the nested errors of an error object.
    fn set_aggregated_errors(
        &self,
        object: ObjectId,
        errors: Vec<Value>,
    ) -> Result<(), EngineError>;

    /// Write a `stack` property made of the frames of `object`'s own realm,
    /// omitting `constructor` and every frame above it.
    fn capture_stack_trace(
        &self,
        object: ObjectId,
        constructor: Option<ObjectId>,
    ) -> Result<(), EngineError>;

    /// Compile top-level script source for `global`'s realm.
    fn compile_script(&self, global: ObjectId, source: &str) -> JsResult<ScriptId>;

    /// Compile a function body with named parameters for `global`'s realm.
    fn compile_function(
        &self,
        global: ObjectId,
        name: &str,
        params: &[String],
        body: &str,
    ) -> JsResult<ObjectId>;

    /// Run a compiled script inside the realm it was compiled for.
    fn run_script(&self, script: ScriptId) -> JsResult;
}

impl fmt::Debug for dyn Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("host_global", &self.host_global())
            .finish_non_exhaustive()
    }
}
