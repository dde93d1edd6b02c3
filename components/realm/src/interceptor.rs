//! Composable wrappers around trusted callees.
//!
//! Interface members are usually built by stacking several of these, e.g. a
//! constructor:
//!
//! ```text
//! return_value_interface(
//!     constructor_error_message("Event",
//!         require_new_target(default_constructor())))
//! ```

use crate::callable::{callee, Callee, Invocation};
use crate::error::BoundaryError;
use crate::messages;
use crate::realm::Realm;
use core_types::{ErrorKind, JsResult, ObjectId, Value};
use engine::PropertySlot;
use tracing::warn;

/// Replace an object result by its interface, when it has one.
pub fn return_value_interface(inner: Callee) -> Callee {
    callee(move |realm, invocation| {
        let value = inner(realm, invocation)?;
        Ok(match realm.interface_of(&value) {
            Some(interface) => Value::Object(interface),
            None => value,
        })
    })
}

/// Replace an object result by its own interface, when it has one.
pub fn return_value_own_interface(inner: Callee) -> Callee {
    callee(move |realm, invocation| {
        let value = inner(realm, invocation)?;
        Ok(match realm.own_interface_of(&value) {
            Some(interface) => Value::Object(interface),
            None => value,
        })
    })
}

/// Resolve `new.target` to its implementation, inherited links included.
pub fn new_target_implementation(inner: Callee) -> Callee {
    callee(move |realm, mut invocation| {
        invocation.new_target = realm.implementation_of(invocation.new_target);
        inner(realm, invocation)
    })
}

/// Resolve `new.target` to its own implementation.
pub fn new_target_own_implementation(inner: Callee) -> Callee {
    callee(move |realm, mut invocation| {
        invocation.new_target = realm.own_implementation_of(invocation.new_target);
        inner(realm, invocation)
    })
}

/// Replace the receiver by its implementation; receivers without one are an
/// illegal invocation.
pub fn require_this_implementation(inner: Callee) -> Callee {
    callee(move |realm, mut invocation| {
        let implementation = realm
            .implementation_of(&invocation.this)
            .ok_or_else(|| realm.raise(BoundaryError::IllegalInvocation))?;
        invocation.this = Value::Object(implementation);
        inner(realm, invocation)
    })
}

/// Like [`require_this_implementation`] without inherited links.
pub fn require_this_own_implementation(inner: Callee) -> Callee {
    callee(move |realm, mut invocation| {
        let implementation = realm
            .own_implementation_of(&invocation.this)
            .ok_or_else(|| realm.raise(BoundaryError::IllegalInvocation))?;
        invocation.this = Value::Object(implementation);
        inner(realm, invocation)
    })
}

/// Like [`require_this_implementation`], also requiring the implementation
/// to satisfy `accept`.
pub fn validate_this_implementation<P>(accept: P, inner: Callee) -> Callee
where
    P: Fn(&Realm, ObjectId) -> bool + 'static,
{
    callee(move |realm, mut invocation| {
        let implementation = realm
            .implementation_of(&invocation.this)
            .filter(|implementation| accept(realm, *implementation))
            .ok_or_else(|| realm.raise(BoundaryError::IllegalInvocation))?;
        invocation.this = Value::Object(implementation);
        inner(realm, invocation)
    })
}

/// Whether `class.prototype` is on the prototype chain of `object`.
pub fn is_instance_of(realm: &Realm, object: ObjectId, class: ObjectId) -> bool {
    let engine = realm.engine();
    let Some(PropertySlot::Data(Value::Object(prototype))) =
        engine.get_own_property(class, "prototype")
    else {
        return false;
    };
    std::iter::successors(engine.prototype_of(object), |current| {
        engine.prototype_of(*current)
    })
    .take(engine::heap::MAX_PROTOTYPE_CHAIN)
    .any(|candidate| candidate == prototype)
}

/// Call a plain trusted function with the receiver and arguments.
pub fn function_interceptor<F>(f: F) -> Callee
where
    F: Fn(&Realm, &Value, &[Value]) -> JsResult + 'static,
{
    callee(move |realm, invocation| f(realm, &invocation.this, &invocation.args))
}

/// Read `name` from the receiver.
pub fn getter(name: impl Into<String>) -> Callee {
    let name = name.into();
    callee(move |realm, invocation| match invocation.this {
        Value::Object(this) => realm.engine().get(this, &name),
        _ => Err(realm.raise(BoundaryError::IllegalInvocation)),
    })
}

/// Write the first argument to `name` on the receiver.
pub fn setter(name: impl Into<String>) -> Callee {
    let name = name.into();
    callee(move |realm, invocation| match invocation.this {
        Value::Object(this) => {
            realm.engine().set(this, &name, invocation.arg(0))?;
            Ok(Value::Undefined)
        }
        _ => Err(realm.raise(BoundaryError::IllegalInvocation)),
    })
}

/// Construct the implementation class linked to `new.target` and link the
/// new instance to a fresh guest object.
///
/// Returns the implementation; wrap with [`return_value_interface`] to hand
/// the guest object back.
pub fn default_constructor() -> Callee {
    callee(|realm, invocation| {
        let engine = realm.engine();
        let class = realm
            .implementation_of(invocation.new_target)
            .filter(|class| engine.is_constructor(&Value::Object(*class)))
            .ok_or_else(|| realm.raise(BoundaryError::IllegalConstructor))?;
        let instance = engine.construct(class, &invocation.args, None)?;
        let Value::Object(instance) = instance else {
            return Err(realm.raise(BoundaryError::IllegalConstructor));
        };
        let Some(PropertySlot::Data(class_prototype)) = engine.get_own_property(class, "prototype")
        else {
            return Err(realm.raise(BoundaryError::IllegalConstructor));
        };
        let interface_prototype = realm
            .interface_of(&class_prototype)
            .ok_or_else(|| realm.raise(BoundaryError::IllegalConstructor))?;
        let interface = engine
            .create_object(realm.global(), Some(interface_prototype))
            .map_err(|err| realm.raise(err.into()))?;
        realm
            .set_implementation(interface, instance)
            .map_err(|err| realm.raise(err))?;
        Ok(Value::Object(instance))
    })
}

/// Require at least `length` arguments.
pub fn minimum_arguments(length: usize, inner: Callee) -> Callee {
    callee(move |realm, invocation| {
        if invocation.args.len() < length {
            return Err(realm.throw(
                ErrorKind::TypeError,
                messages::insufficient_arguments(invocation.args.len(), length),
            ));
        }
        inner(realm, invocation)
    })
}

/// Prefix errors raised by the realm with `Failed to construct 'X'`.
pub fn constructor_error_message(class_name: impl Into<String>, inner: Callee) -> Callee {
    let prefix = messages::constructor_failed(&class_name.into());
    callee(move |realm, invocation| {
        inner(realm, invocation).map_err(|thrown| {
            if let Value::Object(error) = thrown.value() {
                if realm.is_thrown(thrown.value()) {
                    let engine = realm.engine();
                    let message = match engine.get(*error, "message") {
                        Ok(Value::Undefined) | Err(_) => String::new(),
                        Ok(message) => message.to_string(),
                    };
                    let message = Value::String(messages::prefixed(&prefix, &message));
                    if let Err(err) =
                        engine.define_property(*error, "message", PropertySlot::Data(message))
                    {
                        warn!(realm = %realm.name(), %err, "failed to prefix error message");
                    }
                }
            }
            thrown
        })
    })
}

/// Reject calls made without `new`.
pub fn require_new_target(inner: Callee) -> Callee {
    callee(move |realm, invocation: Invocation| {
        if invocation.new_target.is_none() {
            return Err(realm.throw(ErrorKind::TypeError, messages::new_operator_required()));
        }
        inner(realm, invocation)
    })
}
