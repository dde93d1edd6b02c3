//! Exception remapping at the trust boundary.
//!
//! Whatever trusted code throws while serving a locked call is replaced by an
//! error native to the calling realm before guest code can observe it. The
//! original value stays behind as the implementation of its replacement, so
//! remapping the same value again yields the same guest error.

use crate::realm::Realm;
use core_types::{ErrorKind, ObjectId, Thrown, Value};
use engine::{ErrorInit, PropertySlot};
use tracing::{debug, warn};

/// Remap a thrown value for guest code of `realm`.
pub fn remap(realm: &Realm, thrown: Thrown) -> Thrown {
    Thrown(remap_value(realm, thrown.into_value()))
}

/// Remap a single value; primitives and values of `realm` itself pass
/// through unchanged.
pub fn remap_value(realm: &Realm, value: Value) -> Value {
    let Value::Object(object) = value else {
        return value;
    };
    let engine = realm.engine();
    let Some(source) = engine.global_of(object) else {
        return value;
    };
    if source == realm.global() {
        return value;
    }
    if let Some(interface) = realm.own_interface_of(object) {
        return Value::Object(interface);
    }

    let kind = realm.error_catalog(source).classify(engine, object);
    let message = message_of(realm, object);
    let prototype = realm
        .primordials()
        .error_prototype(kind)
        .or_else(|| realm.primordials().error_prototype(ErrorKind::Error));
    let Some(prototype) = prototype else {
        warn!(realm = %realm.name(), "no error prototype to remap into");
        return Value::String(message);
    };
    let error = match engine.create_error(prototype, ErrorInit::message(message.clone())) {
        Ok(error) => error,
        Err(err) => {
            warn!(realm = %realm.name(), %err, "failed to create remapped error");
            return Value::String(message);
        }
    };

    // link before following nested errors or `cause` so a cycle through
    // either resolves to `error`
    if let Err(err) = realm.set_implementation(error, object) {
        warn!(realm = %realm.name(), %err, "failed to link remapped error");
    }
    realm.untag_thrown(object);
    if kind == ErrorKind::AggregateError {
        let errors = engine
            .aggregated_errors(object)
            .unwrap_or_default()
            .into_iter()
            .map(|nested| remap_value(realm, nested))
            .collect();
        if let Err(err) = engine.set_aggregated_errors(error, errors) {
            warn!(%err, "failed to set aggregated errors");
        }
    }
    if let Some(PropertySlot::Data(cause)) = engine.get_own_property(object, "cause") {
        let cause = remap_value(realm, cause);
        if let Err(err) = engine.define_property(error, "cause", PropertySlot::Data(cause)) {
            warn!(%err, "failed to define cause");
        }
    }
    if let Err(err) = realm.capture_stack_trace(error, None) {
        warn!(%err, "failed to capture remapped stack");
    }
    debug!(realm = %realm.name(), %object, %error, kind = %kind, "remapped error");
    Value::Object(error)
}

fn message_of(realm: &Realm, object: ObjectId) -> String {
    match realm.engine().get(object, "message") {
        Ok(Value::Undefined) | Err(_) => String::new(),
        Ok(message) => message.to_string(),
    }
}
