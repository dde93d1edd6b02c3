//! Guest-visible value representation.
//!
//! Primitive values are stored inline. Objects live in an engine heap and are
//! referenced by [`ObjectId`], so identity comparison is handle comparison.

use std::fmt;

/// Handle of an object in an engine heap.
///
/// The `heap` half identifies the engine instance that allocated the object,
/// which keeps handles from two engines from ever comparing equal.
///
/// # Examples
///
/// ```
/// use core_types::ObjectId;
///
/// let id = ObjectId::new(3, 14);
/// assert_eq!(id.heap(), 3);
/// assert_eq!(id.index(), 14);
/// assert_ne!(id, ObjectId::new(4, 14));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId {
    heap: u32,
    index: u32,
}

impl ObjectId {
    /// Create a handle from a heap id and a slot index.
    #[inline]
    pub const fn new(heap: u32, index: u32) -> Self {
        Self { heap, index }
    }

    /// The engine instance that owns this object.
    #[inline]
    pub const fn heap(self) -> u32 {
        self.heap
    }

    /// Slot index inside the owning heap.
    #[inline]
    pub const fn index(self) -> u32 {
        self.index
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}:{}", self.heap, self.index)
    }
}

/// Opaque privilege token attached to a realm's global.
///
/// Two realms may touch each other's objects only while their tokens compare
/// equal. Swapping a realm's token to a fresh value revokes that access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct SecurityToken(u64);

impl SecurityToken {
    /// Create a token from an opaque numeric value.
    #[inline]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the underlying opaque numeric representation.
    #[inline]
    pub const fn to_raw(self) -> u64 {
        self.0
    }
}

/// Represents any guest-visible value.
///
/// # Examples
///
/// ```
/// use core_types::Value;
///
/// let undefined = Value::Undefined;
/// let number = Value::Number(42.0);
///
/// assert!(!undefined.is_truthy());
/// assert!(number.is_truthy());
/// assert_eq!(number.type_of(), "number");
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// The undefined value
    #[default]
    Undefined,
    /// The null value
    Null,
    /// A boolean
    Boolean(bool),
    /// IEEE 754 double-precision number
    Number(f64),
    /// A string
    String(String),
    /// Heap object (including functions and errors)
    Object(ObjectId),
}

impl Value {
    /// Build a string value.
    pub fn string(s: impl Into<String>) -> Self {
        Value::String(s.into())
    }

    /// Returns true for object values.
    ///
    /// Only object-like values may take part in a linkage.
    pub fn is_object(&self) -> bool {
        matches!(self, Value::Object(_))
    }

    /// Returns the object handle for object values.
    pub fn as_object(&self) -> Option<ObjectId> {
        match self {
            Value::Object(id) => Some(*id),
            _ => None,
        }
    }

    /// Returns the string contents for string values.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns true for `undefined` and `null`.
    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    /// Returns whether this value is truthy in script semantics.
    ///
    /// ```
    /// use core_types::{ObjectId, Value};
    ///
    /// assert!(!Value::Null.is_truthy());
    /// assert!(!Value::Number(f64::NAN).is_truthy());
    /// assert!(!Value::string("").is_truthy());
    /// assert!(Value::Object(ObjectId::new(0, 0)).is_truthy());
    /// ```
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Boolean(b) => *b,
            Value::Number(n) => !n.is_nan() && *n != 0.0,
            Value::String(s) => !s.is_empty(),
            Value::Object(_) => true,
        }
    }

    /// Returns the `typeof` result, treating every object as `"object"`.
    ///
    /// Telling functions apart requires the heap, see the engine crate.
    pub fn type_of(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "object",
            Value::Boolean(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Object(_) => "object",
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<ObjectId> for Value {
    fn from(id: ObjectId) -> Self {
        Value::Object(id)
    }
}

/// String conversion following script `String()` rules for primitives.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Number(n) => {
                if n.is_nan() {
                    write!(f, "NaN")
                } else if n.is_infinite() {
                    if n.is_sign_positive() {
                        write!(f, "Infinity")
                    } else {
                        write!(f, "-Infinity")
                    }
                } else if n.fract() == 0.0 && n.abs() < 1e15 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }
            Value::String(s) => write!(f, "{}", s),
            Value::Object(_) => write!(f, "[object Object]"),
        }
    }
}
