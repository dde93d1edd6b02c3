//! Realm: one isolated execution environment and its trust-boundary state.

use crate::callable::{boundary_callback, Callee, CallableOptions};
use crate::dispatch::Dispatch;
use crate::error::{BoundaryError, BoundaryResult};
use crate::extensions::Extensions;
use crate::options::RealmOptions;
use crate::primordials::{ErrorCatalog, Primordials};
use crate::registry::{Linkable, Registry};
use crate::stack::{self, LockFrame, LockScope, LockStack, RealmScope, UnlockScope};
use core_types::{ErrorKind, JsResult, ObjectId, SecurityToken, Thrown, Value};
use engine::{Engine, ErrorInit, FunctionOptions, PropertySlot, RealmInit, ScriptId};
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::{Rc, Weak};
use tracing::{debug, error, trace};

thread_local! {
    static GLOBALS: RefCell<HashMap<ObjectId, Weak<RealmInner>>> = RefCell::new(HashMap::new());
}

pub(crate) struct RealmInner {
    options: RealmOptions,
    engine: Rc<dyn Engine>,
    global: ObjectId,
    namespace: ObjectId,
    primordials: Primordials,
    registry: RefCell<Registry>,
    unlocked_token: SecurityToken,
    locked_token: SecurityToken,
    lock_stack: RefCell<LockStack>,
    dispatch: Cell<Dispatch>,
    thrown: RefCell<HashSet<ObjectId>>,
    catalogs: RefCell<HashMap<ObjectId, Rc<ErrorCatalog>>>,
    extensions: Extensions,
}

impl Drop for RealmInner {
    fn drop(&mut self) {
        let global = self.global;
        // the thread may already be tearing down its locals
        let _ = GLOBALS.try_with(|globals| globals.borrow_mut().remove(&global));
        debug!(realm = %self.options.name, %global, "realm dropped");
    }
}

/// Handle of a realm.
///
/// Cloning is cheap and every clone names the same realm; equality is
/// identity.
#[derive(Clone)]
pub struct Realm {
    inner: Rc<RealmInner>,
}

impl PartialEq for Realm {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Realm {}

impl fmt::Debug for Realm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Realm")
            .field("name", &self.inner.options.name)
            .field("global", &self.inner.global)
            .field("locked", &self.is_locked())
            .finish()
    }
}

impl Realm {
    /// Create a realm backed by a fresh isolated environment of `engine`.
    ///
    /// The realm starts unlocked: its environment carries the host's token
    /// and a fresh token is kept aside for locking.
    pub fn new(engine: Rc<dyn Engine>, options: RealmOptions) -> BoundaryResult<Realm> {
        let options = options.normalized()?;
        let global = engine.create_realm(&RealmInit {
            name: options.name.clone(),
            origin: options.origin.clone(),
        })?;
        let locked_token = engine.security_token(global)?;
        let unlocked_token = engine.security_token(engine.host_global())?;
        engine.set_security_token(global, unlocked_token)?;
        let primordials = Primordials::capture(engine.as_ref(), global);
        let namespace = engine.create_object(global, None)?;

        let mut registry = Registry::new();
        for object in [global, namespace] {
            let implementation = engine.create_object(engine.host_global(), None)?;
            registry.set_implementation(object, implementation)?;
        }

        let inner = Rc::new(RealmInner {
            options,
            engine,
            global,
            namespace,
            primordials,
            registry: RefCell::new(registry),
            unlocked_token,
            locked_token,
            lock_stack: RefCell::new(LockStack::new()),
            dispatch: Cell::new(Dispatch::Direct),
            thrown: RefCell::new(HashSet::new()),
            catalogs: RefCell::new(HashMap::new()),
            extensions: Extensions::new(),
        });
        GLOBALS.with(|globals| {
            globals
                .borrow_mut()
                .insert(global, Rc::downgrade(&inner))
        });
        debug!(
            realm = %inner.options.name,
            origin = ?inner.options.origin,
            %global,
            primordials = inner.primordials.len(),
            "created realm"
        );
        Ok(Realm { inner })
    }

    pub(crate) fn upgrade(inner: &Weak<RealmInner>) -> Option<Realm> {
        inner.upgrade().map(|inner| Realm { inner })
    }

    /// Realm on top of the realm stack.
    pub fn current() -> BoundaryResult<Realm> {
        stack::top_realm().ok_or(BoundaryError::NoActiveRealm)
    }

    /// Realm whose environment created `object`.
    ///
    /// Primitives and objects of environments without a realm resolve to
    /// nothing.
    pub fn from_object(engine: &dyn Engine, object: impl Linkable) -> Option<Realm> {
        Self::from_global(engine.global_of(object.object_id()?)?)
    }

    /// Realm owning the environment whose global object is `global`.
    pub fn from_global(global: ObjectId) -> Option<Realm> {
        GLOBALS
            .with(|globals| globals.borrow().get(&global).cloned())
            .and_then(|inner| Self::upgrade(&inner))
    }

    /// Configured name.
    pub fn name(&self) -> &str {
        &self.inner.options.name
    }

    /// Serialized origin, if configured.
    pub fn origin(&self) -> Option<&str> {
        self.inner.options.origin.as_deref()
    }

    /// Options the realm was created with, normalized.
    pub fn options(&self) -> &RealmOptions {
        &self.inner.options
    }

    /// The engine backing this realm.
    pub fn engine(&self) -> &dyn Engine {
        self.inner.engine.as_ref()
    }

    /// Global object of the realm's environment.
    pub fn global(&self) -> ObjectId {
        self.inner.global
    }

    /// Guest-visible namespace object collaborators hang interfaces on.
    pub fn namespace(&self) -> ObjectId {
        self.inner.namespace
    }

    /// Intrinsics captured at creation.
    pub fn primordials(&self) -> &Primordials {
        &self.inner.primordials
    }

    /// Whether an optional capability is enabled.
    pub fn is(&self, capability: &str) -> bool {
        self.inner.options.has_capability(capability)
    }

    /// Realm-private extension state.
    pub fn get_realm(&self) -> &Extensions {
        &self.inner.extensions
    }

    // ------------------------------------------------------------------
    // Linkage
    // ------------------------------------------------------------------

    /// See [`Registry::own_interface_of`].
    pub fn own_interface_of(&self, object: impl Linkable) -> Option<ObjectId> {
        self.inner.registry.borrow().own_interface_of(object)
    }

    /// See [`Registry::own_implementation_of`].
    pub fn own_implementation_of(&self, object: impl Linkable) -> Option<ObjectId> {
        self.inner.registry.borrow().own_implementation_of(object)
    }

    /// See [`Registry::interface_of`].
    pub fn interface_of(&self, object: impl Linkable) -> Option<ObjectId> {
        self.inner.registry.borrow().interface_of(object)
    }

    /// See [`Registry::implementation_of`].
    pub fn implementation_of(&self, object: impl Linkable) -> Option<ObjectId> {
        self.inner
            .registry
            .borrow()
            .implementation_of(self.engine(), object)
    }

    /// See [`Registry::has_own_interface`].
    pub fn has_own_interface(&self, object: impl Linkable) -> bool {
        self.inner.registry.borrow().has_own_interface(object)
    }

    /// See [`Registry::has_own_implementation`].
    pub fn has_own_implementation(&self, object: impl Linkable) -> bool {
        self.inner.registry.borrow().has_own_implementation(object)
    }

    /// See [`Registry::has_interface`].
    pub fn has_interface(&self, object: impl Linkable) -> bool {
        self.inner.registry.borrow().has_interface(object)
    }

    /// See [`Registry::has_implementation`].
    pub fn has_implementation(&self, object: impl Linkable) -> bool {
        self.inner
            .registry
            .borrow()
            .has_implementation(self.engine(), object)
    }

    /// See [`Registry::set_implementation`].
    pub fn set_implementation(
        &self,
        interface: impl Linkable,
        implementation: impl Linkable,
    ) -> BoundaryResult<()> {
        self.inner
            .registry
            .borrow_mut()
            .set_implementation(interface, implementation)
    }

    /// See [`Registry::remove_implementation_of`].
    pub fn remove_implementation_of(&self, object: impl Linkable) -> Option<ObjectId> {
        self.inner.registry.borrow_mut().remove_implementation_of(object)
    }

    /// See [`Registry::remove_interface_of`].
    pub fn remove_interface_of(&self, object: impl Linkable) -> Option<ObjectId> {
        self.inner.registry.borrow_mut().remove_interface_of(object)
    }

    // ------------------------------------------------------------------
    // Realm stack
    // ------------------------------------------------------------------

    /// Push this realm on the realm stack.
    pub fn enter(&self) {
        stack::push_realm(self);
    }

    /// Pop this realm from the realm stack; it must be on top.
    pub fn leave(&self) -> BoundaryResult<()> {
        stack::pop_realm(self)
    }

    /// Enter this realm until the returned scope is dropped.
    pub fn scope(&self) -> RealmScope {
        RealmScope::new(self)
    }

    // ------------------------------------------------------------------
    // Lock stack
    // ------------------------------------------------------------------

    /// Revoke guest access to host references.
    pub fn enter_lock(&self) {
        self.push_lock_state(true);
    }

    /// Undo one [`Realm::enter_lock`].
    pub fn leave_lock(&self) -> BoundaryResult<()> {
        self.pop_lock_state(true)
    }

    /// Restore host access for trusted code.
    pub fn enter_unlock(&self) {
        self.push_lock_state(false);
    }

    /// Undo one [`Realm::enter_unlock`].
    pub fn leave_unlock(&self) -> BoundaryResult<()> {
        self.pop_lock_state(false)
    }

    /// Lock until the returned scope is dropped.
    pub fn lock_scope(&self) -> LockScope {
        LockScope::new(self)
    }

    /// Unlock until the returned scope is dropped.
    pub fn unlock_scope(&self) -> UnlockScope {
        UnlockScope::new(self)
    }

    /// Current privilege state.
    pub fn is_locked(&self) -> bool {
        self.inner.lock_stack.borrow().is_locked()
    }

    /// Frames of the lock stack, bottom first.
    pub fn lock_frames(&self) -> Vec<LockFrame> {
        self.inner.lock_stack.borrow().frames().to_vec()
    }

    /// Current execution strategy of this realm's callables.
    pub fn dispatch(&self) -> Dispatch {
        self.inner.dispatch.get()
    }

    fn push_lock_state(&self, locked: bool) {
        self.inner.lock_stack.borrow_mut().push(locked);
        self.apply_lock_state();
    }

    fn pop_lock_state(&self, locked: bool) -> BoundaryResult<()> {
        let result = self.inner.lock_stack.borrow_mut().pop(locked);
        if let Err(err) = &result {
            error!(realm = %self.name(), locked, %err, "lock stack violation");
            return result;
        }
        self.apply_lock_state();
        result
    }

    fn apply_lock_state(&self) {
        let (locked, depth) = {
            let stack = self.inner.lock_stack.borrow();
            (stack.is_locked(), stack.depth())
        };
        let (token, dispatch) = if locked {
            (self.inner.locked_token, Dispatch::Locked)
        } else {
            (self.inner.unlocked_token, Dispatch::Direct)
        };
        if let Err(err) = self.engine().set_security_token(self.inner.global, token) {
            error!(realm = %self.name(), locked, %err, "failed to swap security token");
            // dispatch must never disagree with the token guest code runs under
            if !std::thread::panicking() {
                panic!("failed to swap security token of realm {}: {}", self.name(), err);
            }
            return;
        }
        self.inner.dispatch.set(dispatch);
        trace!(realm = %self.name(), locked, depth, "privilege state");
    }

    // ------------------------------------------------------------------
    // Callables and objects
    // ------------------------------------------------------------------

    /// Create a boundary-crossing callable bound to this realm.
    pub fn create_native_function(
        &self,
        options: CallableOptions,
        callee: Callee,
    ) -> BoundaryResult<ObjectId> {
        let function = self.engine().create_function(
            FunctionOptions {
                name: options.name,
                length: options.length,
                constructor: options.constructor,
                realm: self.inner.global,
            },
            boundary_callback(
                Rc::downgrade(&self.inner),
                self.primordials().error_prototype(ErrorKind::TypeError),
                callee,
            ),
        )?;
        Ok(function)
    }

    /// Create a guest-visible constructor for the trusted class
    /// `implementation`.
    ///
    /// The constructor is linked to `implementation` and its `prototype` to
    /// `implementation.prototype`.
    pub fn create_interface(
        &self,
        implementation: ObjectId,
        options: CallableOptions,
        callee: Callee,
    ) -> BoundaryResult<ObjectId> {
        if !self.engine().is_callable(&Value::Object(implementation)) {
            return Err(BoundaryError::IllegalConstructor);
        }
        let implementation_prototype = self.own_data(implementation, "prototype");
        let interface = self.create_native_function(options.constructor(true), callee)?;
        let interface_prototype = self.own_data(interface, "prototype");
        self.set_implementation(interface, implementation)?;
        if let Err(err) = self.set_implementation(&interface_prototype, &implementation_prototype) {
            self.remove_implementation_of(interface);
            return Err(err);
        }
        Ok(interface)
    }

    /// Create an implementation object inheriting from `prototype`.
    ///
    /// When `prototype` has an interface, a guest-visible object inheriting
    /// from that interface is created and linked to the new implementation.
    pub fn create_object(&self, prototype: ObjectId) -> BoundaryResult<ObjectId> {
        let engine = self.engine();
        let home = engine.global_of(prototype).unwrap_or(engine.host_global());
        let object = engine.create_object(home, Some(prototype))?;
        if let Some(interface_prototype) = self.interface_of(prototype) {
            let interface = engine.create_object(self.inner.global, Some(interface_prototype))?;
            self.set_implementation(interface, object)?;
        }
        Ok(object)
    }

    fn own_data(&self, object: ObjectId, key: &str) -> Value {
        match self.engine().get_own_property(object, key) {
            Some(PropertySlot::Data(value)) => value,
            _ => Value::Undefined,
        }
    }

    // ------------------------------------------------------------------
    // Scripts
    // ------------------------------------------------------------------

    /// Compile top-level source for this realm.
    pub fn compile_script(&self, source: &str) -> JsResult<ScriptId> {
        self.engine().compile_script(self.inner.global, source)
    }

    /// Compile a guest function for this realm.
    pub fn compile_function(&self, name: &str, params: &[&str], body: &str) -> JsResult<ObjectId> {
        let params: Vec<String> = params.iter().map(|p| p.to_string()).collect();
        self.engine()
            .compile_function(self.inner.global, name, &params, body)
    }

    /// Run untrusted source inside this realm, entered and locked.
    pub fn run_user_script(&self, source: &str) -> JsResult {
        let _scope = self.scope();
        let _lock = self.lock_scope();
        let script = self.compile_script(source)?;
        self.engine().run_script(script)
    }

    /// Call guest code from trusted code, locked for the duration of the call.
    pub fn call_user_function(&self, target: ObjectId, this: Value, args: &[Value]) -> JsResult {
        let _lock = self.lock_scope();
        self.engine().call(target, this, args)
    }

    /// Attach a `stack` to `object`, omitting `constructor` and the frames
    /// above it.
    pub fn capture_stack_trace(
        &self,
        object: ObjectId,
        constructor: Option<ObjectId>,
    ) -> BoundaryResult<()> {
        let _unlock = self.unlock_scope();
        self.engine().capture_stack_trace(object, constructor)?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Errors
    // ------------------------------------------------------------------

    /// Create a host-side error of `kind` tagged as raised by this realm.
    pub fn throw(&self, kind: ErrorKind, message: impl Into<String>) -> Thrown {
        let message = message.into();
        let engine = self.engine();
        let catalog = self.error_catalog(engine.host_global());
        let Some(prototype) = catalog
            .prototype(kind)
            .or_else(|| catalog.prototype(ErrorKind::Error))
        else {
            return Thrown(Value::String(message));
        };
        match engine.create_error(prototype, ErrorInit::message(message.clone())) {
            Ok(error) => {
                if let Err(err) = engine.capture_stack_trace(error, None) {
                    debug!(%err, "stack capture failed");
                }
                self.throw_value(Value::Object(error))
            }
            Err(err) => {
                error!(%err, "failed to create host error");
                Thrown(Value::String(message))
            }
        }
    }

    /// Tag an error built by trusted code as raised by this realm and throw
    /// it.
    ///
    /// Primitives are thrown untagged.
    pub fn throw_value(&self, error: Value) -> Thrown {
        if let Value::Object(object) = error {
            self.inner.thrown.borrow_mut().insert(object);
        }
        Thrown(error)
    }

    /// Forget the tag of a thrown object once guest code can no longer
    /// observe it.
    pub(crate) fn untag_thrown(&self, object: ObjectId) {
        self.inner.thrown.borrow_mut().remove(&object);
    }

    /// Throw a boundary failure as a realm-raised error.
    pub fn raise(&self, err: BoundaryError) -> Thrown {
        let kind = match err {
            BoundaryError::NotAnObject
            | BoundaryError::IllegalConstructor
            | BoundaryError::IllegalInvocation => ErrorKind::TypeError,
            BoundaryError::LinkageConflict { .. } | BoundaryError::StackViolation(_) => {
                ErrorKind::ReferenceError
            }
            _ => ErrorKind::Error,
        };
        self.throw(kind, err.to_string())
    }

    /// Whether `value` was raised through [`Realm::throw`] or
    /// [`Realm::throw_value`] and not yet remapped.
    pub fn is_thrown(&self, value: &Value) -> bool {
        value
            .as_object()
            .is_some_and(|object| self.inner.thrown.borrow().contains(&object))
    }

    /// Built-in error prototypes of the environment whose global is
    /// `global`.
    ///
    /// Realm environments answer from their primordials; other environments
    /// are captured once and cached.
    pub fn error_catalog(&self, global: ObjectId) -> Rc<ErrorCatalog> {
        if let Some(catalog) = self.inner.catalogs.borrow().get(&global) {
            return Rc::clone(catalog);
        }
        let catalog = match Realm::from_global(global) {
            Some(owner) => ErrorCatalog::from_primordials(owner.primordials()),
            None => ErrorCatalog::from_primordials(&Primordials::capture(self.engine(), global)),
        };
        let catalog = Rc::new(catalog);
        self.inner
            .catalogs
            .borrow_mut()
            .insert(global, Rc::clone(&catalog));
        catalog
    }
}
