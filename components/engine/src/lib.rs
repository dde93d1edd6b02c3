//! Script engine capability interface and the in-process sandbox engine
//!
//! This crate provides:
//! - The [`Engine`] trait: realm creation, security tokens, native
//!   functions, error construction, stack capture and script compilation
//! - [`SandboxEngine`], a single-threaded engine with an object arena and a
//!   small guest language used to drive untrusted code in tests and tools
//!
//! # Example
//!
//! ```
//! use engine::{Engine, RealmInit, SandboxEngine};
//! use core_types::Value;
//!
//! let engine = SandboxEngine::new();
//! let guest = engine.create_realm(&RealmInit::default()).unwrap();
//! let script = engine.compile_script(guest, "new TypeError('x').message").unwrap();
//! assert_eq!(engine.run_script(script).unwrap(), Value::string("x"));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod capability;
pub mod heap;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod sandbox;

// Re-export main types at crate root
pub use capability::{
    CallInfo, Engine, EngineError, ErrorInit, FunctionOptions, NativeCallback, PropertySlot,
    RealmInit, ScriptId, MAX_FUNCTION_LENGTH,
};
pub use lexer::SyntaxError;
pub use parser::{Parser, Program};
pub use sandbox::{Intrinsics, SandboxEngine, MAX_CALL_DEPTH};
