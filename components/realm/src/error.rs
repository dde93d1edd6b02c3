//! Rust-level failures of the trust-boundary core.

use engine::EngineError;
use std::fmt;
use thiserror::Error;

/// Which side of a linkage already holds a different counterpart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkSide {
    /// The interface object already owns another implementation
    Interface,
    /// The implementation object already owns another interface
    Implementation,
}

impl fmt::Display for LinkSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkSide::Interface => write!(f, "interface object already has an implementation"),
            LinkSide::Implementation => {
                write!(f, "implementation object already has an interface")
            }
        }
    }
}

/// Errors raised by the registry, the realm stacks and callable creation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BoundaryError {
    /// One side of a link operation is not an object
    #[error("Only objects can be linked.")]
    NotAnObject,
    /// Relinking to a different counterpart
    #[error("{side}")]
    LinkageConflict {
        /// Side holding the existing link
        side: LinkSide,
    },
    /// A callable or interface was built from a non-callable value
    #[error("Illegal constructor")]
    IllegalConstructor,
    /// A callable was invoked with a receiver that has no implementation
    #[error("Illegal invocation")]
    IllegalInvocation,
    /// Mismatched enter/leave or lock/unlock
    #[error("{0} stack violation")]
    StackViolation(StackKind),
    /// `Realm::current` with an empty realm stack
    #[error("Current execution context is not in a realm")]
    NoActiveRealm,
    /// The engine rejected an operation
    #[error(transparent)]
    Engine(#[from] EngineError),
    /// Malformed realm options
    #[error("invalid realm options: {0}")]
    InvalidOptions(String),
}

/// The stack a structural violation was detected on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackKind {
    /// Process-wide realm stack
    Realm,
    /// Per-realm lock stack
    Lock,
}

impl fmt::Display for StackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StackKind::Realm => write!(f, "Realm"),
            StackKind::Lock => write!(f, "Lock"),
        }
    }
}

/// Result alias for boundary operations.
pub type BoundaryResult<T> = Result<T, BoundaryError>;
