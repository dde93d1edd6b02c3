//! Boundary-crossing callables.

use crate::realm::{Realm, RealmInner};
use core_types::{JsResult, ObjectId, Thrown, Value};
use engine::{CallInfo, Engine, ErrorInit, NativeCallback};
use std::fmt;
use std::rc::{Rc, Weak};
use tracing::warn;

/// One call of a boundary-crossing callable, as seen by its trusted callee.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    /// The guest-visible function being called
    pub callee: ObjectId,
    /// Receiver
    pub this: Value,
    /// Positional arguments
    pub args: Vec<Value>,
    /// `new.target`, present for construct calls
    pub new_target: Option<ObjectId>,
}

impl Invocation {
    /// Argument at `index`, `undefined` when absent.
    pub fn arg(&self, index: usize) -> Value {
        self.args.get(index).cloned().unwrap_or_default()
    }
}

impl From<&CallInfo> for Invocation {
    fn from(info: &CallInfo) -> Self {
        Self {
            callee: info.callee,
            this: info.this.clone(),
            args: info.args.clone(),
            new_target: info.new_target,
        }
    }
}

/// Trusted code behind a boundary-crossing callable.
pub type Callee = Rc<dyn Fn(&Realm, Invocation) -> JsResult>;

/// Wrap a closure as a [`Callee`].
pub fn callee<F>(f: F) -> Callee
where
    F: Fn(&Realm, Invocation) -> JsResult + 'static,
{
    Rc::new(f)
}

/// Shape of a boundary-crossing callable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallableOptions {
    /// `name` property; empty means anonymous
    pub name: String,
    /// `length` property
    pub length: u32,
    /// Whether the callable may be used with `new`
    pub constructor: bool,
}

impl CallableOptions {
    /// A non-constructor callable with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
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

struct Boundary {
    realm: Weak<RealmInner>,
    /// `TypeError.prototype` of the realm as captured at creation
    type_error: Option<ObjectId>,
    callee: Callee,
}

impl fmt::Debug for Boundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Boundary")
            .field("alive", &(self.realm.strong_count() > 0))
            .finish_non_exhaustive()
    }
}

impl Boundary {
    fn invoke(&self, engine: &dyn Engine, info: &CallInfo) -> JsResult {
        let Some(realm) = Realm::upgrade(&self.realm) else {
            warn!(callee = %info.callee, "call into a dropped realm");
            return Err(detached_error(engine, self.type_error));
        };
        let _scope = realm.scope();
        realm
            .dispatch()
            .execute(&realm, &self.callee, Invocation::from(info))
    }
}

/// Engine callback that re-enters `realm` and dispatches to `callee`.
pub(crate) fn boundary_callback(
    realm: Weak<RealmInner>,
    type_error: Option<ObjectId>,
    callee: Callee,
) -> NativeCallback {
    let boundary = Boundary {
        realm,
        type_error,
        callee,
    };
    Rc::new(move |engine: &dyn Engine, info: &CallInfo| boundary.invoke(engine, info))
}

/// `TypeError: Illegal invocation` built from the primordial `TypeError`
/// of the callee's realm.
fn detached_error(engine: &dyn Engine, type_error: Option<ObjectId>) -> Thrown {
    let message = crate::messages::illegal_invocation();
    let Some(prototype) = type_error else {
        return Thrown(Value::string(message));
    };
    match engine.create_error(prototype, ErrorInit::message(message)) {
        Ok(error) => {
            if let Err(err) = engine.capture_stack_trace(error, None) {
                warn!(%err, "stack capture failed");
            }
            Thrown(Value::Object(error))
        }
        Err(err) => {
            warn!(%err, "failed to create detached call error");
            Thrown(Value::string(message))
        }
    }
}
