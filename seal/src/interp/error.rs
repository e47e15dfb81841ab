//! Runtime errors for the interpreter

use std::fmt;

/// Runtime error during interpretation
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeError {
    pub kind: ErrorKind,
    pub message: String,
}

/// Kinds of runtime errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Undefined variable
    UndefinedVariable,
    /// Undefined function, class or method
    UndefinedFunction,
    /// Type mismatch
    TypeError,
    /// Division or remainder by zero
    DivisionByZero,
    /// Checked arithmetic overflowed
    IntegerOverflow,
    /// Argument count mismatch
    ArityMismatch,
    /// No `when` arm matched the scrutinee
    NoMatchingArm,
    /// Abstract method reached by dynamic dispatch
    AbstractCall,
    /// Stack overflow (deep recursion)
    StackOverflow,
}

impl RuntimeError {
    fn new(kind: ErrorKind, message: String) -> Self {
        RuntimeError { kind, message }
    }

    pub fn undefined_variable(name: &str) -> Self {
        Self::new(ErrorKind::UndefinedVariable, format!("undefined variable: {name}"))
    }

    pub fn undefined_function(name: &str) -> Self {
        Self::new(ErrorKind::UndefinedFunction, format!("undefined function: {name}"))
    }

    pub fn undefined_method(class: &str, method: &str) -> Self {
        Self::new(
            ErrorKind::UndefinedFunction,
            format!("undefined method: {class}.{method}"),
        )
    }

    pub fn type_error(expected: &str, got: &str) -> Self {
        Self::new(ErrorKind::TypeError, format!("type error: expected {expected}, got {got}"))
    }

    pub fn not_instantiable(class: &str) -> Self {
        Self::new(ErrorKind::TypeError, format!("type error: {class} cannot be instantiated"))
    }

    pub fn division_by_zero() -> Self {
        Self::new(ErrorKind::DivisionByZero, "division by zero".to_string())
    }

    pub fn integer_overflow(op: &str) -> Self {
        Self::new(ErrorKind::IntegerOverflow, format!("integer overflow in `{op}`"))
    }

    pub fn arity_mismatch(name: &str, expected: usize, got: usize) -> Self {
        Self::new(
            ErrorKind::ArityMismatch,
            format!("{name} expects {expected} argument(s), got {got}"),
        )
    }

    pub fn no_matching_arm(value: &str) -> Self {
        Self::new(ErrorKind::NoMatchingArm, format!("no `when` arm matches {value}"))
    }

    pub fn abstract_call(class: &str, method: &str) -> Self {
        Self::new(
            ErrorKind::AbstractCall,
            format!("abstract method {method} called on {class}"),
        )
    }

    pub fn stack_overflow() -> Self {
        Self::new(ErrorKind::StackOverflow, "stack overflow: too deep recursion".to_string())
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Runtime error: {}", self.message)
    }
}

impl std::error::Error for RuntimeError {}

/// Result type for interpreter operations
pub type InterpResult<T> = Result<T, RuntimeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_undefined_variable() {
        let err = RuntimeError::undefined_variable("foo");
        assert_eq!(err.kind, ErrorKind::UndefinedVariable);
        assert!(err.message.contains("foo"));
    }

    #[test]
    fn test_type_error() {
        let err = RuntimeError::type_error("Int", "Bool");
        assert_eq!(err.kind, ErrorKind::TypeError);
        assert_eq!(err.message, "type error: expected Int, got Bool");
    }

    #[test]
    fn test_no_matching_arm() {
        let err = RuntimeError::no_matching_arm("Dog(name=Rex)");
        assert_eq!(err.kind, ErrorKind::NoMatchingArm);
        assert!(err.message.contains("Dog(name=Rex)"));
    }

    #[test]
    fn test_display() {
        let err = RuntimeError::division_by_zero();
        assert_eq!(err.to_string(), "Runtime error: division by zero");
    }

    #[test]
    fn test_arity_mismatch() {
        let err = RuntimeError::arity_mismatch("greet", 1, 2);
        assert_eq!(err.kind, ErrorKind::ArityMismatch);
        assert_eq!(err.message, "greet expects 1 argument(s), got 2");
    }
}
