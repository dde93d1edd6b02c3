//! Trust-boundary core for sandboxed script execution
//!
//! This crate provides:
//! - [`Registry`]: exclusive 1:1 linkage between guest-visible interface
//!   objects and trusted implementation objects
//! - [`Realm`]: an isolated environment with its primordials, the
//!   process-wide realm stack and a per-realm lock stack that swaps the
//!   environment's security token
//! - [`Dispatch`]: the per-realm strategy boundary-crossing callables use
//! - [`remap`]: translation of host failures into realm-native errors
//! - [`interceptor`]: composable wrappers for building interface members
//!
//! # Example
//!
//! ```
//! use std::rc::Rc;
//! use core_types::{ErrorKind, Value};
//! use engine::SandboxEngine;
//! use realm::{callee, CallableOptions, Realm, RealmOptions};
//!
//! let engine = Rc::new(SandboxEngine::new());
//! let realm = Realm::new(engine, RealmOptions::new("page")).unwrap();
//!
//! let fail = realm
//!     .create_native_function(
//!         CallableOptions::new("fail"),
//!         callee(|realm, _| Err(realm.throw(ErrorKind::RangeError, "out of range"))),
//!     )
//!     .unwrap();
//! realm.engine().set(realm.global(), "fail", Value::Object(fail)).unwrap();
//!
//! let thrown = realm.run_user_script("fail()").unwrap_err();
//! let error = thrown.value().as_object().unwrap();
//! assert_eq!(realm.engine().global_of(error), Some(realm.global()));
//! assert_eq!(realm.engine().get(error, "name").unwrap(), Value::string("RangeError"));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod callable;
pub mod dispatch;
pub mod error;
pub mod extensions;
pub mod interceptor;
pub mod messages;
pub mod options;
pub mod origin;
pub mod primordials;
pub mod realm;
pub mod registry;
pub mod remap;
pub mod stack;

// Re-export main types at crate root
pub use callable::{callee, Callee, CallableOptions, Invocation};
pub use dispatch::Dispatch;
pub use error::{BoundaryError, BoundaryResult, LinkSide, StackKind};
pub use extensions::Extensions;
pub use options::RealmOptions;
pub use origin::{Origin, OriginError};
pub use primordials::{ErrorCatalog, Primordials};
pub use realm::Realm;
pub use registry::{Linkable, Registry};
pub use stack::{realm_stack, LockFrame, LockScope, LockStack, RealmScope, UnlockScope};
