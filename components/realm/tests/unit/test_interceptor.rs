use super::{expose, host_class, property, setup};
use core_types::{ErrorKind, ObjectId, Thrown, Value};
use engine::{Engine, ErrorInit, PropertySlot, SandboxEngine};
use realm::interceptor::{
    constructor_error_message, default_constructor, function_interceptor, getter,
    is_instance_of, minimum_arguments, new_target_own_implementation, require_new_target,
    require_this_implementation, return_value_interface, return_value_own_interface, setter,
    validate_this_implementation,
};
use realm::{callee, CallableOptions, Callee, Realm};
use std::cell::Cell;
use std::rc::Rc;

/// Guest-visible constructor for a fresh host class named `name`.
fn expose_class(engine: &SandboxEngine, realm: &Realm, name: &str) -> (ObjectId, ObjectId) {
    let class = host_class(engine, name);
    let interface = realm
        .create_interface(
            class,
            CallableOptions::new(name),
            return_value_interface(constructor_error_message(
                name,
                require_new_target(default_constructor()),
            )),
        )
        .unwrap();
    expose(realm, name, Value::Object(interface));
    (class, interface)
}

fn define_method(realm: &Realm, interface: ObjectId, name: &str, member: Callee) {
    let engine = realm.engine();
    let Some(PropertySlot::Data(Value::Object(prototype))) =
        engine.get_own_property(interface, "prototype")
    else {
        panic!("interface without prototype");
    };
    let method = realm
        .create_native_function(CallableOptions::new(name), member)
        .unwrap();
    engine
        .define_property(prototype, name, PropertySlot::Data(Value::Object(method)))
        .unwrap();
}

#[test]
fn test_interface_constructs_linked_instances() {
    let (engine, realm) = setup("page");
    let (class, interface) = expose_class(&engine, &realm, "Widget");
    define_method(&realm, interface, "label", require_this_implementation(getter("label")));

    let widget = realm.run_user_script("new Widget()").unwrap();
    let guest = widget.as_object().unwrap();
    assert_eq!(engine.global_of(guest), Some(realm.global()));
    let implementation = realm.own_implementation_of(guest).unwrap();
    assert_eq!(engine.global_of(implementation), Some(engine.host_global()));
    assert!(is_instance_of(&realm, implementation, class));

    assert_eq!(
        realm.run_user_script("new Widget().label()").unwrap(),
        Value::string("widget")
    );
}

#[test]
fn test_interface_requires_new() {
    let (engine, realm) = setup("page");
    expose_class(&engine, &realm, "Widget");

    let thrown = realm.run_user_script("Widget()").unwrap_err();
    assert_eq!(property(&realm, &thrown, "name"), Value::string("TypeError"));
    assert_eq!(
        property(&realm, &thrown, "message"),
        Value::string(
            "Failed to construct 'Widget': Please use the 'new' operator, \
             this DOM object constructor cannot be called as a function."
        )
    );
}

#[test]
fn test_method_on_foreign_receiver_is_illegal_invocation() {
    let (engine, realm) = setup("page");
    let (_, interface) = expose_class(&engine, &realm, "Widget");
    define_method(&realm, interface, "label", require_this_implementation(getter("label")));

    let thrown = realm
        .run_user_script("let o = new Object(); o.label = new Widget().label; o.label()")
        .unwrap_err();
    assert_eq!(property(&realm, &thrown, "name"), Value::string("TypeError"));
    assert_eq!(
        property(&realm, &thrown, "message"),
        Value::string("Illegal invocation")
    );
}

#[test]
fn test_validate_this_rejects_other_classes() {
    let (engine, realm) = setup("page");
    let (widget_class, widget) = expose_class(&engine, &realm, "Widget");
    expose_class(&engine, &realm, "Gadget");
    define_method(
        &realm,
        widget,
        "describe",
        validate_this_implementation(
            move |realm, implementation| is_instance_of(realm, implementation, widget_class),
            getter("label"),
        ),
    );

    assert_eq!(
        realm.run_user_script("new Widget().describe()").unwrap(),
        Value::string("widget")
    );
    let thrown = realm
        .run_user_script("let g = new Gadget(); g.describe = new Widget().describe; g.describe()")
        .unwrap_err();
    assert_eq!(
        property(&realm, &thrown, "message"),
        Value::string("Illegal invocation")
    );
}

#[test]
fn test_setter_writes_through_to_implementation() {
    let (engine, realm) = setup("page");
    let (_, interface) = expose_class(&engine, &realm, "Widget");
    define_method(&realm, interface, "label", require_this_implementation(getter("label")));
    define_method(&realm, interface, "rename", require_this_implementation(setter("label")));

    let value = realm
        .run_user_script("let w = new Widget(); w.rename('renamed'); w.label()")
        .unwrap();
    assert_eq!(value, Value::string("renamed"));
}

#[test]
fn test_getter_on_primitive_receiver() {
    let (_engine, realm) = setup("page");
    let read = realm
        .create_native_function(CallableOptions::new("read"), getter("label"))
        .unwrap();
    expose(&realm, "read", Value::Object(read));

    let thrown = realm.run_user_script("read()").unwrap_err();
    assert_eq!(
        property(&realm, &thrown, "message"),
        Value::string("Illegal invocation")
    );
}

#[test]
fn test_minimum_arguments() {
    let (_engine, realm) = setup("page");
    let second = realm
        .create_native_function(
            CallableOptions::new("second").with_length(2),
            minimum_arguments(
                2,
                function_interceptor(|_, _, args: &[Value]| Ok(args[1].clone())),
            ),
        )
        .unwrap();
    expose(&realm, "second", Value::Object(second));

    assert_eq!(
        realm.run_user_script("second(1, 'b')").unwrap(),
        Value::string("b")
    );
    let thrown = realm.run_user_script("second(1)").unwrap_err();
    assert_eq!(property(&realm, &thrown, "name"), Value::string("TypeError"));
    assert_eq!(
        property(&realm, &thrown, "message"),
        Value::string("2 argument required, but only 1 present.")
    );
}

#[test]
fn test_default_constructor_without_link_is_illegal() {
    let (_engine, realm) = setup("page");
    let orphan = realm
        .create_native_function(
            CallableOptions::new("Orphan").constructor(true),
            default_constructor(),
        )
        .unwrap();
    expose(&realm, "Orphan", Value::Object(orphan));

    let thrown = realm.run_user_script("new Orphan()").unwrap_err();
    assert_eq!(property(&realm, &thrown, "name"), Value::string("TypeError"));
    assert_eq!(
        property(&realm, &thrown, "message"),
        Value::string("Illegal constructor")
    );
}

#[test]
fn test_new_target_resolves_to_implementation() {
    let (engine, realm) = setup("page");
    let class = host_class(&engine, "Probe");
    let seen: Rc<Cell<Option<ObjectId>>> = Rc::default();
    let record = seen.clone();
    let interface = realm
        .create_interface(
            class,
            CallableOptions::new("Probe"),
            new_target_own_implementation(callee(move |_, invocation| {
                record.set(invocation.new_target);
                Ok(Value::Undefined)
            })),
        )
        .unwrap();
    expose(&realm, "Probe", Value::Object(interface));

    realm.run_user_script("new Probe()").unwrap();
    assert_eq!(seen.get(), Some(class));
}

#[test]
fn test_return_value_own_interface() {
    let (_engine, realm) = setup("page");
    let namespace_implementation = realm.own_implementation_of(realm.namespace()).unwrap();
    let fetch = realm
        .create_native_function(
            CallableOptions::new("namespace"),
            return_value_own_interface(callee(move |_, _| {
                Ok(Value::Object(namespace_implementation))
            })),
        )
        .unwrap();
    expose(&realm, "namespace", Value::Object(fetch));

    assert_eq!(
        realm.run_user_script("namespace()").unwrap(),
        Value::Object(realm.namespace())
    );
}

#[test]
fn test_constructor_message_prefixes_collaborator_errors() {
    let (_engine, realm) = setup("page");
    let build = |realm: &Realm, message: &str| {
        let engine = realm.engine();
        let prototype = realm
            .error_catalog(engine.host_global())
            .prototype(ErrorKind::RangeError)
            .unwrap();
        Value::Object(
            engine
                .create_error(prototype, ErrorInit::message(message))
                .unwrap(),
        )
    };
    let tagged = realm
        .create_native_function(
            CallableOptions::new("Gizmo").constructor(true),
            constructor_error_message(
                "Gizmo",
                callee(move |realm, _| Err(realm.throw_value(build(realm, "bad size")))),
            ),
        )
        .unwrap();
    expose(&realm, "Gizmo", Value::Object(tagged));
    let untagged = realm
        .create_native_function(
            CallableOptions::new("Gadget").constructor(true),
            constructor_error_message(
                "Gadget",
                callee(move |realm, _| Err(Thrown(build(realm, "left alone")))),
            ),
        )
        .unwrap();
    expose(&realm, "Gadget", Value::Object(untagged));

    let thrown = realm.run_user_script("new Gizmo()").unwrap_err();
    assert_eq!(property(&realm, &thrown, "name"), Value::string("RangeError"));
    assert_eq!(
        property(&realm, &thrown, "message"),
        Value::string("Failed to construct 'Gizmo': bad size")
    );

    let thrown = realm.run_user_script("new Gadget()").unwrap_err();
    assert_eq!(
        property(&realm, &thrown, "message"),
        Value::string("left alone")
    );
}
