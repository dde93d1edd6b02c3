//! Core value types shared by the sandbox engine and the realm boundary.
//!
//! This crate provides the foundational types that cross the trust boundary
//! between guest script and trusted host code.
//!
//! # Overview
//!
//! - [`Value`] - Tagged representation of guest-visible values
//! - [`ObjectId`] - Arena handle of a heap object
//! - [`SecurityToken`] - Opaque privilege token compared on cross-realm access
//! - [`Thrown`] / [`JsResult`] - A thrown guest value as an explicit result
//! - [`ErrorKind`] - The built-in error kinds every realm provides
//! - [`SourcePosition`] / [`StackFrame`] - Source and call stack locations
//!
//! # Examples
//!
//! ```
//! use core_types::{ErrorKind, ObjectId, Value};
//!
//! let object = Value::Object(ObjectId::new(1, 7));
//! assert!(object.is_object());
//! assert_eq!(object.type_of(), "object");
//!
//! assert_eq!(ErrorKind::from_name("RangeError"), Some(ErrorKind::RangeError));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

mod error;
mod source;
mod value;

pub use error::{ErrorKind, JsResult, Thrown};
pub use source::{SourcePosition, StackFrame};
pub use value::{ObjectId, SecurityToken, Value};
