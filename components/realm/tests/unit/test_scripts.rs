use super::{expose, property, setup};
use core_types::{ErrorKind, Value};
use engine::{Engine, ErrorInit, PropertySlot};
use realm::{callee, realm_stack, CallableOptions, Dispatch, Realm, RealmOptions};
use std::cell::RefCell;
use std::rc::Rc;

fn expose_secret(realm: &Realm) {
    let engine = realm.engine();
    let leak = engine.create_object(engine.host_global(), None).unwrap();
    engine
        .define_property(leak, "secret", PropertySlot::Data(Value::Number(1.0)))
        .unwrap();
    expose(realm, "leak", Value::Object(leak));
}

fn assert_idle(realm: &Realm) {
    assert!(realm_stack().is_empty());
    assert!(realm.lock_frames().is_empty());
    assert_eq!(realm.dispatch(), Dispatch::Direct);
}

#[test]
fn test_user_script_completion_value() {
    let (_engine, realm) = setup("page");
    let value = realm.run_user_script("let x = 'done'; x").unwrap();
    assert_eq!(value, Value::string("done"));
    assert_idle(&realm);
}

#[test]
fn test_user_script_restores_state_after_throw() {
    let (_engine, realm) = setup("page");
    let thrown = realm
        .run_user_script("throw new RangeError('stop')")
        .unwrap_err();
    assert_eq!(property(&realm, &thrown, "message"), Value::string("stop"));
    assert_idle(&realm);
}

#[test]
fn test_syntax_error_leaves_stacks_balanced() {
    let (_engine, realm) = setup("page");
    let thrown = realm.run_user_script("let = 1").unwrap_err();
    assert_eq!(property(&realm, &thrown, "name"), Value::string("SyntaxError"));
    assert_eq!(
        realm.engine().global_of(thrown.value().as_object().unwrap()),
        Some(realm.global())
    );
    assert_idle(&realm);
}

#[test]
fn test_locked_guest_cannot_reach_host_objects() {
    let (engine, realm) = setup("page");
    expose_secret(&realm);

    let thrown = realm.run_user_script("leak.secret").unwrap_err();
    assert_eq!(property(&realm, &thrown, "name"), Value::string("TypeError"));
    assert_eq!(
        property(&realm, &thrown, "message"),
        Value::string("Permission denied to access property 'secret'")
    );

    // unlocked, the realm shares the host's token
    let script = engine.compile_script(realm.global(), "leak.secret").unwrap();
    assert_eq!(engine.run_script(script).unwrap(), Value::Number(1.0));
}

#[test]
fn test_call_user_function_runs_locked() {
    let (engine, realm) = setup("page");
    expose_secret(&realm);
    let read = realm
        .compile_function("read", &[], "return leak.secret")
        .unwrap();

    assert!(realm
        .call_user_function(read, Value::Undefined, &[])
        .is_err());
    assert_idle(&realm);
    assert_eq!(
        engine.call(read, Value::Undefined, &[]).unwrap(),
        Value::Number(1.0)
    );
}

#[test]
fn test_host_callee_runs_unlocked_inside_realm() {
    let (_engine, realm) = setup("page");
    let observed: Rc<RefCell<Vec<(bool, Option<Realm>)>>> = Rc::default();
    let log = observed.clone();
    let observe = realm
        .create_native_function(
            CallableOptions::new("observe"),
            callee(move |realm, _| {
                log.borrow_mut()
                    .push((realm.is_locked(), Realm::current().ok()));
                Ok(Value::Undefined)
            }),
        )
        .unwrap();
    expose(&realm, "observe", Value::Object(observe));

    realm.run_user_script("observe()").unwrap();
    assert_eq!(*observed.borrow(), vec![(false, Some(realm.clone()))]);
}

#[test]
fn test_primordials_survive_guest_tampering() {
    let (_engine, realm) = setup("page");
    let fail = realm
        .create_native_function(
            CallableOptions::new("fail"),
            callee(|realm, _| Err(realm.throw(ErrorKind::TypeError, "still typed"))),
        )
        .unwrap();
    expose(&realm, "fail", Value::Object(fail));

    let thrown = realm
        .run_user_script("TypeError = null; Error = null; fail()")
        .unwrap_err();
    assert_eq!(property(&realm, &thrown, "name"), Value::string("TypeError"));
    assert_eq!(
        realm.engine().prototype_of(thrown.value().as_object().unwrap()),
        realm.primordials().error_prototype(ErrorKind::TypeError)
    );
    assert_eq!(
        realm.engine().get(realm.global(), "TypeError").unwrap(),
        Value::Null
    );
}

#[test]
fn test_function_constructor_is_disabled() {
    let (_engine, realm) = setup("page");
    let thrown = realm.run_user_script("Function('return 1')").unwrap_err();
    assert_eq!(property(&realm, &thrown, "name"), Value::string("EvalError"));
    assert_idle(&realm);
}

#[test]
fn test_from_object_resolves_owning_realm() {
    let (engine, realm) = setup("page");
    let other = Realm::new(engine.clone(), RealmOptions::new("frame")).unwrap();
    let object = realm
        .run_user_script("new Object()")
        .unwrap()
        .as_object()
        .unwrap();

    assert_eq!(Realm::from_object(engine.as_ref(), object), Some(realm.clone()));
    assert_eq!(Realm::from_object(engine.as_ref(), other.global()), Some(other));
    assert_eq!(Realm::from_object(engine.as_ref(), engine.host_global()), None);
    assert_eq!(Realm::from_object(engine.as_ref(), Value::Number(1.0)), None);
    assert_eq!(Realm::from_global(realm.global()), Some(realm));
}

#[test]
fn test_capabilities_and_extensions() {
    #[derive(Debug, PartialEq)]
    struct Counter(u32);

    let engine = Rc::new(engine::SandboxEngine::new());
    let realm = Realm::new(
        engine,
        RealmOptions::new("worker").with_capability("structured-clone"),
    )
    .unwrap();
    assert!(realm.is("structured-clone"));
    assert!(!realm.is("shared-memory"));

    assert!(realm.get_realm().get::<Counter>().is_none());
    realm.get_realm().insert(Counter(3));
    assert_eq!(realm.get_realm().get::<Counter>().as_deref(), Some(&Counter(3)));
}

#[test]
fn test_origin_is_normalized() {
    let engine = Rc::new(engine::SandboxEngine::new());
    let options = RealmOptions::new("page")
        .with_origin("HTTPS://Example.COM:443/index.html")
        .unwrap();
    let realm = Realm::new(engine.clone(), options).unwrap();
    assert_eq!(realm.origin(), Some("https://example.com"));
    assert_eq!(
        engine.realm_origin(realm.global()).as_deref(),
        Some("https://example.com")
    );
}

#[test]
fn test_dropped_realm_callable_is_illegal_invocation() {
    let (engine, realm) = setup("page");
    let function = realm
        .create_native_function(
            CallableOptions::new("ping"),
            callee(|_, _| Ok(Value::string("pong"))),
        )
        .unwrap();
    assert_eq!(
        engine.call(function, Value::Undefined, &[]).unwrap(),
        Value::string("pong")
    );
    let global = realm.global();
    drop(realm);
    assert_eq!(Realm::from_global(global), None);

    let thrown = engine.call(function, Value::Undefined, &[]).unwrap_err();
    let error = thrown.value().as_object().unwrap();
    assert_eq!(engine.global_of(error), Some(global));
    assert_eq!(engine.get(error, "name").unwrap(), Value::string("TypeError"));
    assert_eq!(
        engine.get(error, "message").unwrap(),
        Value::string("Illegal invocation")
    );
}

#[test]
fn test_dropped_realm_error_ignores_tampered_bindings() {
    let (engine, realm) = setup("page");
    let function = realm
        .create_native_function(
            CallableOptions::new("ping"),
            callee(|_, _| Ok(Value::Undefined)),
        )
        .unwrap();
    let type_error = realm
        .primordials()
        .error_prototype(ErrorKind::TypeError)
        .unwrap();
    realm.run_user_script("TypeError = Object").unwrap();
    drop(realm);

    let thrown = engine.call(function, Value::Undefined, &[]).unwrap_err();
    let error = thrown.value().as_object().unwrap();
    assert_eq!(engine.prototype_of(error), Some(type_error));
    assert_eq!(engine.get(error, "name").unwrap(), Value::string("TypeError"));
    assert_eq!(
        engine.get(error, "message").unwrap(),
        Value::string("Illegal invocation")
    );
}

#[test]
fn test_throw_value_tags_collaborator_errors() {
    let (engine, realm) = setup("page");
    let prototype = realm
        .error_catalog(engine.host_global())
        .prototype(ErrorKind::RangeError)
        .unwrap();
    let error = engine
        .create_error(prototype, ErrorInit::message("built"))
        .unwrap();
    assert!(!realm.is_thrown(&Value::Object(error)));

    let thrown = realm.throw_value(Value::Object(error));
    assert_eq!(thrown.value(), &Value::Object(error));
    assert!(realm.is_thrown(thrown.value()));

    let primitive = realm.throw_value(Value::string("plain"));
    assert!(!realm.is_thrown(primitive.value()));
}
