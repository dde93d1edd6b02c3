//! Unit tests for the trust-boundary core

mod test_interceptor;
mod test_scripts;
mod test_stacks;

use core_types::{ObjectId, Thrown, Value};
use engine::{CallInfo, Engine, FunctionOptions, PropertySlot, SandboxEngine};
use realm::{Realm, RealmOptions};
use std::rc::Rc;

/// Engine plus one realm named `name`.
pub fn setup(name: &str) -> (Rc<SandboxEngine>, Realm) {
    let engine = Rc::new(SandboxEngine::new());
    let realm = Realm::new(engine.clone(), RealmOptions::new(name)).unwrap();
    (engine, realm)
}

/// Define a data property on the realm's global.
pub fn expose(realm: &Realm, name: &str, value: Value) {
    realm
        .engine()
        .define_property(realm.global(), name, PropertySlot::Data(value))
        .unwrap();
}

/// Read a property of a thrown object.
pub fn property(realm: &Realm, thrown: &Thrown, key: &str) -> Value {
    let object = thrown.value().as_object().expect("thrown value is an object");
    realm.engine().get(object, key).unwrap()
}

/// A host constructor whose instances carry `label = name.to_lowercase()`.
pub fn host_class(engine: &SandboxEngine, name: &str) -> ObjectId {
    let label = Value::string(name.to_lowercase());
    engine
        .create_function(
            FunctionOptions::new(engine.host_global(), name).constructor(true),
            Rc::new(move |engine: &dyn Engine, info: &CallInfo| {
                if let Value::Object(this) = info.this {
                    engine
                        .define_property(this, "label", PropertySlot::Data(label.clone()))
                        .map_err(|err| Thrown(Value::String(err.to_string())))?;
                }
                Ok(Value::Undefined)
            }),
        )
        .unwrap()
}
