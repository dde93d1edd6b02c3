//! Source position and stack frame types.

use std::fmt;

/// Represents a position in guest source code.
///
/// # Examples
///
/// ```
/// use core_types::SourcePosition;
///
/// let pos = SourcePosition { line: 1, column: 5, offset: 4 };
/// assert_eq!(pos.to_string(), "1:5");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourcePosition {
    /// Line number (1-indexed)
    pub line: u32,
    /// Column number (1-indexed)
    pub column: u32,
    /// Character offset from the start of the source
    pub offset: usize,
}

impl fmt::Display for SourcePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A single frame of a captured call stack.
///
/// # Examples
///
/// ```
/// use core_types::StackFrame;
///
/// let frame = StackFrame {
///     function_name: Some("dispatch".to_string()),
///     source: "sandbox".to_string(),
/// };
/// assert_eq!(frame.to_string(), "    at dispatch (sandbox)");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackFrame {
    /// Name of the function, or None for top-level script code
    pub function_name: Option<String>,
    /// Name of the realm the frame executed in
    pub source: String,
}

impl fmt::Display for StackFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.function_name.as_deref().unwrap_or("<anonymous>");
        write!(f, "    at {} ({})", name, self.source)
    }
}
