//! Messages of platform-generated errors.

/// `Illegal constructor`
pub fn illegal_constructor() -> &'static str {
    "Illegal constructor"
}

/// `Illegal invocation`
pub fn illegal_invocation() -> &'static str {
    "Illegal invocation"
}

/// Prefix of errors raised while constructing an interface object.
pub fn constructor_failed(class_name: &str) -> String {
    format!("Failed to construct '{}'", class_name)
}

/// Prefix of errors raised by an interface method.
pub fn method_failed(class_name: &str, method_name: &str) -> String {
    format!("Failed to execute '{}' on '{}'", method_name, class_name)
}

/// `index` is zero-based.
pub fn invalid_argument_type(index: usize, required_type: &str) -> String {
    format!("parameter {} is not of type '{}'.", index + 1, required_type)
}

/// Fewer arguments than an operation requires.
pub fn insufficient_arguments(count: usize, required: usize) -> String {
    format!("{} argument required, but only {} present.", required, count)
}

/// An interface constructor called without `new`.
pub fn new_operator_required() -> &'static str {
    "Please use the 'new' operator, this DOM object constructor cannot be called as a function."
}

/// Join a prefix and an inner message the way platform errors do.
pub fn prefixed(prefix: &str, message: &str) -> String {
    if message.is_empty() {
        prefix.to_string()
    } else {
        format!("{}: {}", prefix, message)
    }
}
