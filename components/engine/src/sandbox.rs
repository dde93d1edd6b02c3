//! In-process reference implementation of [`Engine`].

use crate::capability::{
    CallInfo, Engine, EngineError, ErrorInit, FunctionOptions, NativeCallback, PropertySlot,
    RealmInit, ScriptId, MAX_FUNCTION_LENGTH,
};
use crate::heap::{FunctionBody, FunctionData, Heap, ObjectKind};
use crate::interpreter::Interpreter;
use crate::parser::{Parser, Program};
use core_types::{ErrorKind, JsResult, ObjectId, SecurityToken, StackFrame, Thrown, Value};
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::atomic::{AtomicU32, Ordering};
use tracing::{debug, trace};

/// Maximum nesting of function activations.
pub const MAX_CALL_DEPTH: usize = 128;

static NEXT_HEAP_ID: AtomicU32 = AtomicU32::new(1);

/// Built-in objects of one realm, captured when the realm is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Intrinsics {
    /// `Object.prototype`
    pub object_prototype: ObjectId,
    /// `Function.prototype`
    pub function_prototype: ObjectId,
    error_prototypes: [ObjectId; 8],
}

impl Intrinsics {
    /// `<kind>.prototype` of this realm.
    pub fn error_prototype(&self, kind: ErrorKind) -> ObjectId {
        let index = ErrorKind::ALL
            .iter()
            .position(|k| *k == kind)
            .unwrap_or_default();
        self.error_prototypes[index]
    }
}

#[derive(Debug, Clone)]
struct RealmRecord {
    name: String,
    origin: Option<String>,
    token: SecurityToken,
    intrinsics: Intrinsics,
}

#[derive(Debug, Clone)]
struct Frame {
    global: ObjectId,
    function: Option<ObjectId>,
    name: Option<String>,
}

#[derive(Debug)]
struct CompiledScript {
    global: ObjectId,
    program: Rc<Program>,
}

/// Pops the frame it pushed, on every exit path.
struct FrameGuard<'a> {
    frames: &'a RefCell<Vec<Frame>>,
}

impl<'a> FrameGuard<'a> {
    fn push(frames: &'a RefCell<Vec<Frame>>, frame: Frame) -> Self {
        frames.borrow_mut().push(frame);
        Self { frames }
    }
}

impl Drop for FrameGuard<'_> {
    fn drop(&mut self) {
        self.frames.borrow_mut().pop();
    }
}

/// A single-threaded engine whose realms share one object arena.
///
/// The host realm is created together with the engine; guest realms are
/// created through [`Engine::create_realm`]. Each realm starts with its own
/// fresh security token.
///
/// # Example
///
/// ```
/// use engine::{Engine, RealmInit, SandboxEngine};
/// use core_types::Value;
///
/// let engine = SandboxEngine::new();
/// let global = engine.create_realm(&RealmInit::default()).unwrap();
/// let script = engine.compile_script(global, "let x = 40; x").unwrap();
/// assert_eq!(engine.run_script(script).unwrap(), Value::Number(40.0));
/// ```
pub struct SandboxEngine {
    heap: RefCell<Heap>,
    realms: RefCell<HashMap<ObjectId, RealmRecord>>,
    scripts: RefCell<Vec<CompiledScript>>,
    frames: RefCell<Vec<Frame>>,
    next_token: Cell<u64>,
    host: ObjectId,
}

impl Default for SandboxEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SandboxEngine {
    /// Create an engine together with its host realm.
    pub fn new() -> Self {
        let id = NEXT_HEAP_ID.fetch_add(1, Ordering::SeqCst);
        let mut engine = Self {
            heap: RefCell::new(Heap::new(id)),
            realms: RefCell::new(HashMap::new()),
            scripts: RefCell::new(Vec::new()),
            frames: RefCell::new(Vec::new()),
            next_token: Cell::new(1),
            host: ObjectId::new(id, 0),
        };
        engine.host = engine.install_realm(RealmInit {
            name: "host".to_string(),
            origin: None,
        });
        engine
    }

    /// Built-ins of a realm.
    pub fn intrinsics(&self, global: ObjectId) -> Result<Intrinsics, EngineError> {
        self.realms
            .borrow()
            .get(&global)
            .map(|record| record.intrinsics)
            .ok_or(EngineError::NotARealm(global))
    }

    /// Origin the realm was created with.
    pub fn realm_origin(&self, global: ObjectId) -> Option<String> {
        self.realms.borrow().get(&global)?.origin.clone()
    }

    /// Number of allocated objects.
    pub fn heap_size(&self) -> usize {
        self.heap.borrow().len()
    }

    /// Current nesting of function activations.
    pub fn call_depth(&self) -> usize {
        self.frames.borrow().len()
    }

    /// Whether code running in `accessor`'s realm may touch `target`.
    ///
    /// Objects of the same realm are always reachable; objects of another
    /// realm only while both realms hold equal security tokens.
    pub fn may_access(&self, accessor: ObjectId, target: ObjectId) -> bool {
        let Some(target_global) = self.global_of(target) else {
            return false;
        };
        if target_global == accessor {
            return true;
        }
        let realms = self.realms.borrow();
        match (realms.get(&accessor), realms.get(&target_global)) {
            (Some(a), Some(b)) => a.token == b.token,
            _ => false,
        }
    }

    /// Whether `key` is found anywhere on the prototype chain.
    pub fn has_property(&self, object: ObjectId, key: &str) -> bool {
        self.heap.borrow().lookup(object, key).is_some()
    }

    /// Create an error of `kind` in `global`'s realm, ready to be thrown.
    pub fn throw_error(
        &self,
        global: ObjectId,
        kind: ErrorKind,
        message: impl Into<String>,
    ) -> Thrown {
        let message = message.into();
        let Ok(intrinsics) = self.intrinsics(global) else {
            return Thrown(Value::String(message));
        };
        let prototype = intrinsics.error_prototype(kind);
        match self.create_error(prototype, ErrorInit::message(message.clone())) {
            Ok(error) => {
                // the error is freshly allocated, capture cannot fail
                let _ = self.capture_stack_trace(error, None);
                Thrown(Value::Object(error))
            }
            Err(_) => Thrown(Value::String(message)),
        }
    }

    fn fresh_token(&self) -> SecurityToken {
        let raw = self.next_token.get();
        self.next_token.set(raw + 1);
        SecurityToken::from_raw(raw)
    }

    fn current_global(&self) -> ObjectId {
        self.frames
            .borrow()
            .last()
            .map(|frame| frame.global)
            .unwrap_or(self.host)
    }

    fn fault(&self, err: EngineError) -> Thrown {
        self.throw_error(self.current_global(), ErrorKind::Error, err.to_string())
    }

    fn define(&self, object: ObjectId, key: &str, value: Value) {
        if let Ok(target) = self.heap.borrow_mut().get_mut(object) {
            target.put(key, PropertySlot::Data(value));
        }
    }

    fn alloc_function(
        &self,
        global: ObjectId,
        function_prototype: ObjectId,
        data: FunctionData,
        length: u32,
    ) -> ObjectId {
        let name = data.name.clone();
        let function = self.heap.borrow_mut().alloc(
            global,
            Some(function_prototype),
            ObjectKind::Function(data),
        );
        self.define(function, "name", Value::String(name));
        self.define(function, "length", Value::Number(f64::from(length)));
        function
    }

    fn native(name: &str, constructor: bool, callback: NativeCallback) -> FunctionData {
        FunctionData {
            name: name.to_string(),
            constructor,
            body: FunctionBody::Native(callback),
        }
    }

    fn install_realm(&self, init: RealmInit) -> ObjectId {
        let token = self.fresh_token();
        let (global, object_prototype, function_prototype, error_prototype) = {
            let mut heap = self.heap.borrow_mut();
            let global = heap.next_id();
            heap.alloc(global, None, ObjectKind::Ordinary);
            let object_prototype = heap.alloc(global, None, ObjectKind::Ordinary);
            if let Ok(object) = heap.get_mut(global) {
                object.prototype = Some(object_prototype);
            }
            let function_prototype =
                heap.alloc(global, Some(object_prototype), ObjectKind::Ordinary);
            let error_prototype = heap.alloc(global, Some(object_prototype), ObjectKind::Ordinary);
            (global, object_prototype, function_prototype, error_prototype)
        };

        let object_constructor = self.alloc_function(
            global,
            function_prototype,
            Self::native("Object", true, object_constructor(object_prototype)),
            1,
        );
        self.define(object_constructor, "prototype", Value::Object(object_prototype));
        self.define(object_prototype, "constructor", Value::Object(object_constructor));
        self.define(global, "Object", Value::Object(object_constructor));

        let function_constructor = self.alloc_function(
            global,
            function_prototype,
            Self::native("Function", true, Rc::new(code_generation_disallowed)),
            1,
        );
        self.define(function_constructor, "prototype", Value::Object(function_prototype));
        self.define(function_prototype, "constructor", Value::Object(function_constructor));
        self.define(global, "Function", Value::Object(function_constructor));

        let mut error_prototypes = [error_prototype; 8];
        for (index, kind) in ErrorKind::ALL.into_iter().enumerate() {
            let prototype = if kind == ErrorKind::Error {
                error_prototype
            } else {
                self.heap
                    .borrow_mut()
                    .alloc(global, Some(error_prototype), ObjectKind::Ordinary)
            };
            error_prototypes[index] = prototype;
            let length = if kind == ErrorKind::AggregateError { 2 } else { 1 };
            let constructor = self.alloc_function(
                global,
                function_prototype,
                Self::native(kind.name(), true, error_constructor(kind, prototype)),
                length,
            );
            self.define(constructor, "prototype", Value::Object(prototype));
            self.define(prototype, "constructor", Value::Object(constructor));
            self.define(prototype, "name", Value::string(kind.name()));
            self.define(prototype, "message", Value::string(""));
            self.define(global, kind.name(), Value::Object(constructor));
        }
        self.define(global, "globalThis", Value::Object(global));

        debug!(realm = %init.name, %global, token = token.to_raw(), "created realm");
        self.realms.borrow_mut().insert(
            global,
            RealmRecord {
                name: init.name,
                origin: init.origin,
                token,
                intrinsics: Intrinsics {
                    object_prototype,
                    function_prototype,
                    error_prototypes,
                },
            },
        );
        global
    }

    fn function_data(&self, function: ObjectId) -> Option<(ObjectId, FunctionData)> {
        let heap = self.heap.borrow();
        let object = heap.get(function).ok()?;
        Some((object.global, object.function()?.clone()))
    }

    fn invoke(&self, global: ObjectId, data: FunctionData, info: CallInfo) -> JsResult {
        if self.call_depth() >= MAX_CALL_DEPTH {
            return Err(self.throw_error(
                self.current_global(),
                ErrorKind::RangeError,
                "Maximum call stack size exceeded",
            ));
        }
        let name = (!data.name.is_empty()).then(|| data.name.clone());
        trace!(function = %info.callee, name = ?name, "invoke");
        let _frame = FrameGuard::push(
            &self.frames,
            Frame {
                global,
                function: Some(info.callee),
                name,
            },
        );
        match data.body {
            FunctionBody::Native(callback) => {
                let engine: &dyn Engine = self;
                callback(engine, &info)
            }
            FunctionBody::Script { program, params } => {
                let mut interpreter = Interpreter::new(self, global, info.this.clone());
                for (index, param) in params.iter().enumerate() {
                    interpreter.bind(param, info.arg(index));
                }
                interpreter.run(&program)
            }
        }
    }

    fn parse(&self, global: ObjectId, source: &str) -> JsResult<Program> {
        Parser::parse(source).map_err(|err| {
            trace!(position = %err.position, message = %err.message, "syntax error");
            self.throw_error(global, ErrorKind::SyntaxError, err.message)
        })
    }
}

fn object_constructor(object_prototype: ObjectId) -> NativeCallback {
    Rc::new(move |engine: &dyn Engine, info: &CallInfo| {
        let Some(global) = engine.global_of(info.callee) else {
            return Ok(Value::Undefined);
        };
        if let Value::Object(existing) = info.arg(0) {
            return Ok(Value::Object(existing));
        }
        if let (Some(_), Value::Object(this)) = (info.new_target, &info.this) {
            return Ok(Value::Object(*this));
        }
        engine
            .create_object(global, Some(object_prototype))
            .map(Value::Object)
            .map_err(|err| Thrown(Value::String(err.to_string())))
    })
}

fn code_generation_disallowed(engine: &dyn Engine, info: &CallInfo) -> JsResult {
    let Some(global) = engine.global_of(info.callee) else {
        return Ok(Value::Undefined);
    };
    let prototype = match engine.get(global, "EvalError")? {
        Value::Object(constructor) => engine.get(constructor, "prototype")?,
        _ => Value::Undefined,
    };
    let Value::Object(prototype) = prototype else {
        return Err(Thrown(Value::string("Code generation from strings disallowed")));
    };
    let error = engine
        .create_error(
            prototype,
            ErrorInit::message("Code generation from strings disallowed for this context"),
        )
        .map_err(|err| Thrown(Value::String(err.to_string())))?;
    Err(Thrown(Value::Object(error)))
}

/// Behaviour of the built-in error constructors.
///
/// `AggregateError(message, ...errors)` takes its nested errors as trailing
/// arguments since the guest language has no array literals; every other
/// kind reads `cause` from an options object in the second argument.
fn error_constructor(kind: ErrorKind, default_prototype: ObjectId) -> NativeCallback {
    Rc::new(move |engine: &dyn Engine, info: &CallInfo| {
        let prototype = match info.new_target {
            Some(target) => match engine.get(target, "prototype")? {
                Value::Object(prototype) => prototype,
                _ => default_prototype,
            },
            None => default_prototype,
        };
        let message = match info.arg(0) {
            Value::Undefined => String::new(),
            other => other.to_string(),
        };
        let mut init = ErrorInit::message(message);
        if kind == ErrorKind::AggregateError {
            init.errors = info.args.iter().skip(1).cloned().collect();
        } else if let Value::Object(options) = info.arg(1) {
            if let Some(PropertySlot::Data(cause)) = engine.get_own_property(options, "cause") {
                init.cause = Some(cause);
            }
        }
        let to_thrown = |err: EngineError| Thrown(Value::String(err.to_string()));
        let error = engine.create_error(prototype, init).map_err(to_thrown)?;
        engine
            .capture_stack_trace(error, Some(info.callee))
            .map_err(to_thrown)?;
        Ok(Value::Object(error))
    })
}

impl Engine for SandboxEngine {
    fn host_global(&self) -> ObjectId {
        self.host
    }

    fn create_realm(&self, init: &RealmInit) -> Result<ObjectId, EngineError> {
        Ok(self.install_realm(init.clone()))
    }

    fn realm_name(&self, global: ObjectId) -> Result<String, EngineError> {
        self.realms
            .borrow()
            .get(&global)
            .map(|record| record.name.clone())
            .ok_or(EngineError::NotARealm(global))
    }

    fn security_token(&self, global: ObjectId) -> Result<SecurityToken, EngineError> {
        self.realms
            .borrow()
            .get(&global)
            .map(|record| record.token)
            .ok_or(EngineError::NotARealm(global))
    }

    fn set_security_token(
        &self,
        global: ObjectId,
        token: SecurityToken,
    ) -> Result<SecurityToken, EngineError> {
        let mut realms = self.realms.borrow_mut();
        let record = realms.get_mut(&global).ok_or(EngineError::NotARealm(global))?;
        trace!(%global, from = record.token.to_raw(), to = token.to_raw(), "security token");
        Ok(std::mem::replace(&mut record.token, token))
    }

    fn global_of(&self, object: ObjectId) -> Option<ObjectId> {
        self.heap.borrow().get(object).ok().map(|o| o.global)
    }

    fn create_object(
        &self,
        global: ObjectId,
        prototype: Option<ObjectId>,
    ) -> Result<ObjectId, EngineError> {
        if !self.realms.borrow().contains_key(&global) {
            return Err(EngineError::NotARealm(global));
        }
        let mut heap = self.heap.borrow_mut();
        if let Some(prototype) = prototype {
            heap.get(prototype)?;
        }
        Ok(heap.alloc(global, prototype, ObjectKind::Ordinary))
    }

    fn prototype_of(&self, object: ObjectId) -> Option<ObjectId> {
        self.heap.borrow().get(object).ok()?.prototype
    }

    fn set_prototype_of(
        &self,
        object: ObjectId,
        prototype: Option<ObjectId>,
    ) -> Result<bool, EngineError> {
        let mut heap = self.heap.borrow_mut();
        heap.get(object)?;
        if let Some(prototype) = prototype {
            heap.get(prototype)?;
            if heap.chain(prototype).any(|id| id == object) {
                return Ok(false);
            }
        }
        heap.get_mut(object)?.prototype = prototype;
        Ok(true)
    }

    fn own_keys(&self, object: ObjectId) -> Vec<String> {
        self.heap
            .borrow()
            .get(object)
            .map(|o| o.properties.iter().map(|(key, _)| key.clone()).collect())
            .unwrap_or_default()
    }

    fn get_own_property(&self, object: ObjectId, key: &str) -> Option<PropertySlot> {
        self.heap.borrow().get(object).ok()?.property(key).cloned()
    }

    fn define_property(
        &self,
        object: ObjectId,
        key: &str,
        slot: PropertySlot,
    ) -> Result<(), EngineError> {
        self.heap.borrow_mut().get_mut(object)?.put(key, slot);
        Ok(())
    }

    fn get(&self, object: ObjectId, key: &str) -> JsResult {
        let found = {
            let heap = self.heap.borrow();
            heap.get(object).map(|_| heap.lookup(object, key))
        };
        let slot = found.map_err(|err| self.fault(err))?;
        match slot {
            None | Some(PropertySlot::Accessor { get: None, .. }) => Ok(Value::Undefined),
            Some(PropertySlot::Data(value)) => Ok(value),
            Some(PropertySlot::Accessor {
                get: Some(getter), ..
            }) => self.call(getter, Value::Object(object), &[]),
        }
    }

    fn set(&self, object: ObjectId, key: &str, value: Value) -> JsResult<()> {
        let slot = self.heap.borrow().lookup(object, key);
        match slot {
            Some(PropertySlot::Accessor {
                set: Some(setter), ..
            }) => self.call(setter, Value::Object(object), &[value]).map(|_| ()),
            Some(PropertySlot::Accessor { set: None, .. }) => Ok(()),
            _ => self
                .define_property(object, key, PropertySlot::Data(value))
                .map_err(|err| self.fault(err)),
        }
    }

    fn set_internal(&self, object: ObjectId, data: Rc<dyn Any>) -> Result<(), EngineError> {
        self.heap.borrow_mut().get_mut(object)?.internal = Some(data);
        Ok(())
    }

    fn internal(&self, object: ObjectId) -> Option<Rc<dyn Any>> {
        self.heap.borrow().get(object).ok()?.internal.clone()
    }

    fn create_function(
        &self,
        options: FunctionOptions,
        callback: NativeCallback,
    ) -> Result<ObjectId, EngineError> {
        if options.length > MAX_FUNCTION_LENGTH {
            return Err(EngineError::InvalidLength(u64::from(options.length)));
        }
        let intrinsics = self.intrinsics(options.realm)?;
        let function = self.alloc_function(
            options.realm,
            intrinsics.function_prototype,
            Self::native(&options.name, options.constructor, callback),
            options.length,
        );
        if options.constructor {
            let prototype = self.heap.borrow_mut().alloc(
                options.realm,
                Some(intrinsics.object_prototype),
                ObjectKind::Ordinary,
            );
            self.define(prototype, "constructor", Value::Object(function));
            self.define(function, "prototype", Value::Object(prototype));
        }
        Ok(function)
    }

    fn is_callable(&self, value: &Value) -> bool {
        let Value::Object(id) = value else {
            return false;
        };
        self.heap
            .borrow()
            .get(*id)
            .map(|o| o.function().is_some())
            .unwrap_or(false)
    }

    fn is_constructor(&self, value: &Value) -> bool {
        let Value::Object(id) = value else {
            return false;
        };
        self.heap
            .borrow()
            .get(*id)
            .ok()
            .and_then(|o| o.function().map(|f| f.constructor))
            .unwrap_or(false)
    }

    fn call(&self, function: ObjectId, this: Value, args: &[Value]) -> JsResult {
        let Some((global, data)) = self.function_data(function) else {
            return Err(self.throw_error(
                self.current_global(),
                ErrorKind::TypeError,
                "object is not a function",
            ));
        };
        let info = CallInfo {
            callee: function,
            this,
            args: args.to_vec(),
            new_target: None,
        };
        self.invoke(global, data, info)
    }

    fn construct(
        &self,
        function: ObjectId,
        args: &[Value],
        new_target: Option<ObjectId>,
    ) -> JsResult {
        let data = match self.function_data(function) {
            Some((global, data)) if data.constructor => (global, data),
            Some((_, data)) => {
                return Err(self.throw_error(
                    self.current_global(),
                    ErrorKind::TypeError,
                    format!("{} is not a constructor", data.name),
                ))
            }
            None => {
                return Err(self.throw_error(
                    self.current_global(),
                    ErrorKind::TypeError,
                    "object is not a constructor",
                ))
            }
        };
        let (global, data) = data;
        let target = new_target.unwrap_or(function);
        let prototype = match self.get(target, "prototype")? {
            Value::Object(prototype) => prototype,
            _ => self
                .intrinsics(self.global_of(target).unwrap_or(global))
                .map_err(|err| self.fault(err))?
                .object_prototype,
        };
        let this = self.heap.borrow_mut().alloc(global, Some(prototype), ObjectKind::Ordinary);
        let info = CallInfo {
            callee: function,
            this: Value::Object(this),
            args: args.to_vec(),
            new_target: Some(target),
        };
        match self.invoke(global, data, info)? {
            Value::Object(result) => Ok(Value::Object(result)),
            _ => Ok(Value::Object(this)),
        }
    }

    fn create_error(&self, prototype: ObjectId, init: ErrorInit) -> Result<ObjectId, EngineError> {
        let mut heap = self.heap.borrow_mut();
        let global = heap.get(prototype)?.global;
        let error = heap.alloc(
            global,
            Some(prototype),
            ObjectKind::Error {
                errors: init.errors,
            },
        );
        let object = heap.get_mut(error)?;
        object.put("message", PropertySlot::Data(Value::String(init.message)));
        if let Some(cause) = init.cause {
            object.put("cause", PropertySlot::Data(cause));
        }
        Ok(error)
    }

    fn aggregated_errors(&self, object: ObjectId) -> Option<Vec<Value>> {
        match &self.heap.borrow().get(object).ok()?.kind {
            ObjectKind::Error { errors } => Some(errors.clone()),
            _ => None,
        }
    }

    fn set_aggregated_errors(
        &self,
        object: ObjectId,
        errors: Vec<Value>,
    ) -> Result<(), EngineError> {
        match &mut self.heap.borrow_mut().get_mut(object)?.kind {
            ObjectKind::Error { errors: slot } => {
                *slot = errors;
                Ok(())
            }
            _ => Err(EngineError::NotAnError(object)),
        }
    }

    fn capture_stack_trace(
        &self,
        object: ObjectId,
        constructor: Option<ObjectId>,
    ) -> Result<(), EngineError> {
        let global = self.heap.borrow().get(object)?.global;
        let source = self.realm_name(global).unwrap_or_default();
        let frames = self.frames.borrow().clone();
        let mut visible: Vec<&Frame> = frames.iter().rev().collect();
        if let Some(constructor) = constructor {
            if let Some(index) = visible.iter().position(|f| f.function == Some(constructor)) {
                visible.drain(..=index);
            }
        }
        let (name, message) = {
            let heap = self.heap.borrow();
            (
                heap.lookup_data(object, "name"),
                heap.lookup_data(object, "message"),
            )
        };
        let name = match name {
            Some(Value::String(name)) => name,
            _ => ErrorKind::Error.name().to_string(),
        };
        let mut stack = match message {
            Some(Value::String(message)) if !message.is_empty() => format!("{}: {}", name, message),
            _ => name,
        };
        for frame in visible.into_iter().filter(|f| f.global == global) {
            let frame = StackFrame {
                function_name: frame.name.clone(),
                source: source.clone(),
            };
            stack.push('\n');
            stack.push_str(&frame.to_string());
        }
        self.define_property(object, "stack", PropertySlot::Data(Value::String(stack)))
    }

    fn compile_script(&self, global: ObjectId, source: &str) -> JsResult<ScriptId> {
        self.intrinsics(global).map_err(|err| self.fault(err))?;
        let program = self.parse(global, source)?;
        let mut scripts = self.scripts.borrow_mut();
        let id = ScriptId(scripts.len() as u32);
        scripts.push(CompiledScript {
            global,
            program: Rc::new(program),
        });
        Ok(id)
    }

    fn compile_function(
        &self,
        global: ObjectId,
        name: &str,
        params: &[String],
        body: &str,
    ) -> JsResult<ObjectId> {
        let intrinsics = self.intrinsics(global).map_err(|err| self.fault(err))?;
        let program = self.parse(global, body)?;
        let data = FunctionData {
            name: name.to_string(),
            constructor: false,
            body: FunctionBody::Script {
                program: Rc::new(program),
                params: params.into(),
            },
        };
        Ok(self.alloc_function(
            global,
            intrinsics.function_prototype,
            data,
            params.len() as u32,
        ))
    }

    fn run_script(&self, script: ScriptId) -> JsResult {
        let (global, program) = {
            let scripts = self.scripts.borrow();
            let compiled = scripts
                .get(script.0 as usize)
                .ok_or(EngineError::UnknownScript(script))
                .map_err(|err| self.fault(err))?;
            (compiled.global, Rc::clone(&compiled.program))
        };
        let _frame = FrameGuard::push(
            &self.frames,
            Frame {
                global,
                function: None,
                name: None,
            },
        );
        Interpreter::new(self, global, Value::Object(global)).run(&program)
    }
}
