//! Built-in error kinds and the thrown-value result type.

use crate::Value;
use std::fmt;

/// The kind of a built-in error.
///
/// These correspond to the error constructors every realm exposes. A value
/// whose prototype chain matches none of them is classified as [`ErrorKind::Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Generic Error
    Error,
    /// TypeError - type mismatch errors
    TypeError,
    /// RangeError - numeric range violations
    RangeError,
    /// ReferenceError - undefined variable access
    ReferenceError,
    /// SyntaxError - parse/syntax errors
    SyntaxError,
    /// URIError - malformed URI
    URIError,
    /// EvalError - eval failures (legacy)
    EvalError,
    /// AggregateError - multiple errors combined
    AggregateError,
}

impl ErrorKind {
    /// Every kind, generic `Error` first.
    pub const ALL: [ErrorKind; 8] = [
        ErrorKind::Error,
        ErrorKind::TypeError,
        ErrorKind::RangeError,
        ErrorKind::ReferenceError,
        ErrorKind::SyntaxError,
        ErrorKind::URIError,
        ErrorKind::EvalError,
        ErrorKind::AggregateError,
    ];

    /// Get the constructor name of this kind.
    pub fn name(&self) -> &'static str {
        match self {
            ErrorKind::Error => "Error",
            ErrorKind::TypeError => "TypeError",
            ErrorKind::RangeError => "RangeError",
            ErrorKind::ReferenceError => "ReferenceError",
            ErrorKind::SyntaxError => "SyntaxError",
            ErrorKind::URIError => "URIError",
            ErrorKind::EvalError => "EvalError",
            ErrorKind::AggregateError => "AggregateError",
        }
    }

    /// Look up a kind by constructor name.
    pub fn from_name(name: &str) -> Option<ErrorKind> {
        ErrorKind::ALL.into_iter().find(|kind| kind.name() == name)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A value thrown by script or by a trusted callee.
///
/// Any value may be thrown; primitives are never boxed.
#[derive(Debug, Clone, PartialEq)]
pub struct Thrown(pub Value);

impl Thrown {
    /// The thrown value.
    pub fn value(&self) -> &Value {
        &self.0
    }

    /// Consume into the thrown value.
    pub fn into_value(self) -> Value {
        self.0
    }
}

impl From<Value> for Thrown {
    fn from(value: Value) -> Self {
        Thrown(value)
    }
}

impl fmt::Display for Thrown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Uncaught {}", self.0)
    }
}

impl std::error::Error for Thrown {}

/// Either a completion value or a thrown value.
pub type JsResult<T = Value> = Result<T, Thrown>;
