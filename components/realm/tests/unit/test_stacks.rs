use super::{expose, setup};
use core_types::{JsResult, ObjectId, SecurityToken, Value};
use engine::{
    Engine, EngineError, ErrorInit, FunctionOptions, NativeCallback, PropertySlot, RealmInit,
    SandboxEngine, ScriptId,
};
use realm::{
    callee, realm_stack, BoundaryError, CallableOptions, Dispatch, LockFrame, Realm, RealmOptions,
    StackKind,
};
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

#[test]
fn test_current_without_active_realm_fails() {
    assert_eq!(Realm::current(), Err(BoundaryError::NoActiveRealm));
}

#[test]
fn test_reentering_same_realm_coalesces() {
    let (_engine, realm) = setup("page");
    realm.enter();
    realm.enter();
    assert_eq!(realm_stack(), vec![(realm.clone(), 2)]);
    assert_eq!(Realm::current().unwrap(), realm);
    realm.leave().unwrap();
    realm.leave().unwrap();
    assert!(realm_stack().is_empty());
}

#[test]
fn test_nested_realms_stack_in_order() {
    let (engine, a) = setup("a");
    let b = Realm::new(engine.clone(), RealmOptions::new("b")).unwrap();
    a.enter();
    b.enter();
    a.enter();
    assert_eq!(
        realm_stack(),
        vec![(a.clone(), 1), (b.clone(), 1), (a.clone(), 1)]
    );
    a.leave().unwrap();
    assert_eq!(Realm::current().unwrap(), b);
    b.leave().unwrap();
    a.leave().unwrap();
}

#[test]
fn test_leave_of_non_top_realm_is_a_violation() {
    let (engine, a) = setup("a");
    let b = Realm::new(engine.clone(), RealmOptions::new("b")).unwrap();
    assert_eq!(
        a.leave(),
        Err(BoundaryError::StackViolation(StackKind::Realm))
    );
    a.enter();
    b.enter();
    assert_eq!(
        a.leave(),
        Err(BoundaryError::StackViolation(StackKind::Realm))
    );
    assert_eq!(realm_stack(), vec![(a.clone(), 1), (b.clone(), 1)]);
    b.leave().unwrap();
    a.leave().unwrap();
}

#[test]
fn test_lock_swaps_token_and_dispatch() {
    let (engine, realm) = setup("page");
    let host_token = engine.security_token(engine.host_global()).unwrap();
    assert_eq!(engine.security_token(realm.global()).unwrap(), host_token);
    assert_eq!(realm.dispatch(), Dispatch::Direct);

    realm.enter_lock();
    assert!(realm.is_locked());
    assert_ne!(engine.security_token(realm.global()).unwrap(), host_token);
    assert_eq!(realm.dispatch(), Dispatch::Locked);

    realm.enter_unlock();
    assert!(!realm.is_locked());
    assert_eq!(engine.security_token(realm.global()).unwrap(), host_token);
    assert_eq!(realm.dispatch(), Dispatch::Direct);
    assert_eq!(
        realm.lock_frames(),
        vec![
            LockFrame { locked: true, refs: 1 },
            LockFrame { locked: false, refs: 1 }
        ]
    );

    realm.leave_unlock().unwrap();
    assert_eq!(realm.dispatch(), Dispatch::Locked);
    realm.leave_lock().unwrap();
    assert_eq!(engine.security_token(realm.global()).unwrap(), host_token);
}

#[test]
fn test_unmatched_lock_leave_is_a_violation() {
    let (_engine, realm) = setup("page");
    assert_eq!(
        realm.leave_lock(),
        Err(BoundaryError::StackViolation(StackKind::Lock))
    );
    realm.enter_lock();
    assert_eq!(
        realm.leave_unlock(),
        Err(BoundaryError::StackViolation(StackKind::Lock))
    );
    assert!(realm.is_locked());
    realm.leave_lock().unwrap();
}

#[test]
fn test_balanced_nesting_restores_state() {
    let (engine, realm) = setup("page");
    let token_before = engine.security_token(realm.global()).unwrap();
    for depth in 1..=6 {
        for _ in 0..depth {
            realm.enter();
            realm.enter_lock();
        }
        assert_eq!(realm_stack(), vec![(realm.clone(), depth)]);
        assert_eq!(realm.lock_frames(), vec![LockFrame { locked: true, refs: depth }]);
        for _ in 0..depth {
            realm.leave_lock().unwrap();
            realm.leave().unwrap();
        }
        assert!(realm_stack().is_empty());
        assert!(realm.lock_frames().is_empty());
        assert_eq!(engine.security_token(realm.global()).unwrap(), token_before);
        assert_eq!(realm.dispatch(), Dispatch::Direct);
    }
}

#[test]
fn test_scopes_release_on_early_return() {
    let (_engine, realm) = setup("page");
    let run = |realm: &Realm| -> Result<(), &'static str> {
        let _scope = realm.scope();
        let _lock = realm.lock_scope();
        Err("bail out")
    };
    assert!(run(&realm).is_err());
    assert!(realm_stack().is_empty());
    assert!(!realm.is_locked());
}

#[test]
#[should_panic(expected = "Realm stack violation")]
fn test_out_of_order_scope_drop_panics() {
    let (engine, a) = setup("a");
    let b = Realm::new(engine.clone(), RealmOptions::new("b")).unwrap();
    let outer = a.scope();
    b.enter();
    drop(outer);
}

#[test]
fn test_recursive_callable_restores_stacks() {
    let (_engine, realm) = setup("page");
    let observed: Rc<RefCell<Vec<(usize, usize)>>> = Rc::default();
    let bounce = realm
        .compile_function("bounce", &["n"], "return recurse(n)")
        .unwrap();

    let log = observed.clone();
    let recurse = realm
        .create_native_function(
            CallableOptions::new("recurse").with_length(1),
            callee(move |realm, invocation| {
                let frames = realm_stack();
                assert_eq!(frames.len(), 1);
                log.borrow_mut().push((frames[0].1, realm.lock_frames().len()));
                match invocation.arg(0) {
                    Value::Number(n) if n > 0.0 => realm.call_user_function(
                        bounce,
                        Value::Undefined,
                        &[Value::Number(n - 1.0)],
                    ),
                    other => Ok(other),
                }
            }),
        )
        .unwrap();
    expose(&realm, "recurse", Value::Object(recurse));

    let result = realm.run_user_script("recurse(5)").unwrap();
    assert_eq!(result, Value::Number(0.0));

    let observed = observed.borrow();
    assert_eq!(observed.len(), 6);
    for (level, (refs, lock_depth)) in observed.iter().enumerate() {
        assert_eq!(*refs, level + 2);
        assert_eq!(*lock_depth, 2 * level + 2);
    }
    assert!(realm_stack().is_empty());
    assert!(realm.lock_frames().is_empty());
    assert_eq!(realm.dispatch(), Dispatch::Direct);
}

/// Sandbox engine whose token swaps can be made to fail.
struct FaultyTokens {
    inner: SandboxEngine,
    fail: Cell<bool>,
}

impl Engine for FaultyTokens {
    fn host_global(&self) -> ObjectId {
        self.inner.host_global()
    }
    fn create_realm(&self, init: &RealmInit) -> Result<ObjectId, EngineError> {
        self.inner.create_realm(init)
    }
    fn realm_name(&self, global: ObjectId) -> Result<String, EngineError> {
        self.inner.realm_name(global)
    }
    fn security_token(&self, global: ObjectId) -> Result<SecurityToken, EngineError> {
        self.inner.security_token(global)
    }
    fn set_security_token(
        &self,
        global: ObjectId,
        token: SecurityToken,
    ) -> Result<SecurityToken, EngineError> {
        if self.fail.get() {
            return Err(EngineError::NotARealm(global));
        }
        self.inner.set_security_token(global, token)
    }
    fn global_of(&self, object: ObjectId) -> Option<ObjectId> {
        self.inner.global_of(object)
    }
    fn create_object(
        &self,
        global: ObjectId,
        prototype: Option<ObjectId>,
    ) -> Result<ObjectId, EngineError> {
        self.inner.create_object(global, prototype)
    }
    fn prototype_of(&self, object: ObjectId) -> Option<ObjectId> {
        self.inner.prototype_of(object)
    }
    fn set_prototype_of(
        &self,
        object: ObjectId,
        prototype: Option<ObjectId>,
    ) -> Result<bool, EngineError> {
        self.inner.set_prototype_of(object, prototype)
    }
    fn own_keys(&self, object: ObjectId) -> Vec<String> {
        self.inner.own_keys(object)
    }
    fn get_own_property(&self, object: ObjectId, key: &str) -> Option<PropertySlot> {
        self.inner.get_own_property(object, key)
    }
    fn define_property(
        &self,
        object: ObjectId,
        key: &str,
        slot: PropertySlot,
    ) -> Result<(), EngineError> {
        self.inner.define_property(object, key, slot)
    }
    fn get(&self, object: ObjectId, key: &str) -> JsResult {
        self.inner.get(object, key)
    }
    fn set(&self, object: ObjectId, key: &str, value: Value) -> JsResult<()> {
        self.inner.set(object, key, value)
    }
    fn set_internal(&self, object: ObjectId, data: Rc<dyn Any>) -> Result<(), EngineError> {
        self.inner.set_internal(object, data)
    }
    fn internal(&self, object: ObjectId) -> Option<Rc<dyn Any>> {
        self.inner.internal(object)
    }
    fn create_function(
        &self,
        options: FunctionOptions,
        callback: NativeCallback,
    ) -> Result<ObjectId, EngineError> {
        self.inner.create_function(options, callback)
    }
    fn is_callable(&self, value: &Value) -> bool {
        self.inner.is_callable(value)
    }
    fn is_constructor(&self, value: &Value) -> bool {
        self.inner.is_constructor(value)
    }
    fn call(&self, function: ObjectId, this: Value, args: &[Value]) -> JsResult {
        self.inner.call(function, this, args)
    }
    fn construct(
        &self,
        function: ObjectId,
        args: &[Value],
        new_target: Option<ObjectId>,
    ) -> JsResult {
        self.inner.construct(function, args, new_target)
    }
    fn create_error(&self, prototype: ObjectId, init: ErrorInit) -> Result<ObjectId, EngineError> {
        self.inner.create_error(prototype, init)
    }
    fn aggregated_errors(&self, object: ObjectId) -> Option<Vec<Value>> {
        self.inner.aggregated_errors(object)
    }
    fn set_aggregated_errors(
        &self,
        object: ObjectId,
        errors: Vec<Value>,
    ) -> Result<(), EngineError> {
        self.inner.set_aggregated_errors(object, errors)
    }
    fn capture_stack_trace(
        &self,
        object: ObjectId,
        constructor: Option<ObjectId>,
    ) -> Result<(), EngineError> {
        self.inner.capture_stack_trace(object, constructor)
    }
    fn compile_script(&self, global: ObjectId, source: &str) -> JsResult<ScriptId> {
        self.inner.compile_script(global, source)
    }
    fn compile_function(
        &self,
        global: ObjectId,
        name: &str,
        params: &[String],
        body: &str,
    ) -> JsResult<ObjectId> {
        self.inner.compile_function(global, name, params, body)
    }
    fn run_script(&self, script: ScriptId) -> JsResult {
        self.inner.run_script(script)
    }
}

#[test]
fn test_failed_token_swap_is_fatal_and_keeps_dispatch() {
    let engine = Rc::new(FaultyTokens {
        inner: SandboxEngine::new(),
        fail: Cell::new(false),
    });
    let realm = Realm::new(engine.clone(), RealmOptions::new("page")).unwrap();
    let token = engine.security_token(realm.global()).unwrap();

    engine.fail.set(true);
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| realm.enter_lock()));
    assert!(outcome.is_err());
    assert_eq!(realm.dispatch(), Dispatch::Direct);
    assert_eq!(engine.security_token(realm.global()).unwrap(), token);
}
