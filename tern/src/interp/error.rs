//! Runtime errors for the interpreter

use super::frame::TraceFrame;
use std::fmt;

/// Runtime error during interpretation
///
/// Renders as the offending call expression (when known), the message, then
/// one `[module "m", line L] in <context>` line per frame, innermost first.
#[derive(Debug, Clone)]
pub struct RuntimeError {
    pub kind: ErrorKind,
    pub message: String,
    /// Call expression that raised the error, e.g. `super.foo()`
    pub expression: Option<String>,
    /// Frames collected while unwinding, innermost first
    pub trace: Vec<TraceFrame>,
}

/// Kinds of runtime errors
#[derive(Debug, Clone)]
pub enum ErrorKind {
    /// Argument count mismatch at a call site
    Arity {
        expected: usize,
        found: usize,
        /// Name of the callee
        callable: String,
        /// Declaring class, or the module for plain functions
        owner: String,
        /// Line of the call site
        line: u32,
    },
    /// Constructor arguments passed to a class with no `__init__`
    ConstructorArity,
    /// Method or property lookup exhausted the parent chain
    NoSuchMethod,
    UndefinedVariable,
    TypeError,
    NotCallable,
    IndexError,
    /// Frame stack exceeded its configured depth
    StackOverflow,
    /// Writing to the output sink failed
    IoError,
}

impl PartialEq for ErrorKind {
    fn eq(&self, other: &Self) -> bool {
        // Compare discriminants only; Arity carries diagnostics, not identity
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

impl RuntimeError {
    fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        RuntimeError {
            kind,
            message: message.into(),
            expression: None,
            trace: Vec::new(),
        }
    }

    /// Attach the rendered call expression
    pub fn with_expression(mut self, expression: impl Into<String>) -> Self {
        self.expression = Some(expression.into());
        self
    }

    pub fn arity(callable: &str, owner: &str, expected: usize, found: usize, line: u32) -> Self {
        RuntimeError::new(
            ErrorKind::Arity {
                expected,
                found,
                callable: callable.to_string(),
                owner: owner.to_string(),
                line,
            },
            format!("Expected {expected} arguments but found {found}."),
        )
        .with_expression(format!("{callable}()"))
    }

    pub fn constructor_arity(class: &str, found: usize) -> Self {
        RuntimeError::new(
            ErrorKind::ConstructorArity,
            format!("Expected 0 arguments but found {found}."),
        )
        .with_expression(format!("{class}()"))
    }

    pub fn no_such_method(name: &str) -> Self {
        RuntimeError::new(ErrorKind::NoSuchMethod, format!("Undefined property '{name}'."))
            .with_expression(format!("{name}()"))
    }

    /// Missing field or method on a plain property read
    pub fn undefined_property(name: &str) -> Self {
        RuntimeError::new(ErrorKind::NoSuchMethod, format!("Undefined property '{name}'."))
    }

    pub fn undefined_variable(name: &str) -> Self {
        RuntimeError::new(
            ErrorKind::UndefinedVariable,
            format!("Undefined variable '{name}'."),
        )
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        RuntimeError::new(ErrorKind::TypeError, message)
    }

    pub fn not_callable() -> Self {
        RuntimeError::new(ErrorKind::NotCallable, "Can only call functions and classes.")
    }

    pub fn index_out_of_range(index: i64, len: usize) -> Self {
        RuntimeError::new(
            ErrorKind::IndexError,
            format!("Index {index} out of range for Vec of length {len}."),
        )
    }

    pub fn stack_overflow() -> Self {
        RuntimeError::new(ErrorKind::StackOverflow, "Stack overflow.")
    }

    pub fn io_error(msg: &str) -> Self {
        RuntimeError::new(ErrorKind::IoError, format!("IO error: {msg}"))
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(expression) = &self.expression {
            writeln!(f, "{expression}")?;
        }
        write!(f, "{}", self.message)?;
        for frame in &self.trace {
            write!(f, "\n{frame}")?;
        }
        Ok(())
    }
}

impl std::error::Error for RuntimeError {}

/// Result type for interpreter operations
pub type InterpResult<T> = Result<T, RuntimeError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interp::frame::FrameContext;
    use std::rc::Rc;

    #[test]
    fn test_arity_message() {
        let err = RuntimeError::arity("foo", "Base", 2, 4, 7);
        assert_eq!(err.message, "Expected 2 arguments but found 4.");
        assert_eq!(err.expression.as_deref(), Some("foo()"));
        match err.kind {
            ErrorKind::Arity {
                expected,
                found,
                ref callable,
                ref owner,
                line,
            } => {
                assert_eq!((expected, found, line), (2, 4, 7));
                assert_eq!(callable, "foo");
                assert_eq!(owner, "Base");
            }
            _ => panic!("expected arity error"),
        }
    }

    #[test]
    fn test_kind_compares_discriminant() {
        let a = RuntimeError::arity("f", "main", 1, 2, 1);
        let b = RuntimeError::arity("g", "main", 3, 0, 9);
        assert_eq!(a.kind, b.kind);
        assert_ne!(a.kind, ErrorKind::NoSuchMethod);
    }

    #[test]
    fn test_undefined_variable() {
        let err = RuntimeError::undefined_variable("foo");
        assert_eq!(err.kind, ErrorKind::UndefinedVariable);
        assert_eq!(err.message, "Undefined variable 'foo'.");
        assert!(err.expression.is_none());
    }

    #[test]
    fn test_no_such_method() {
        let err = RuntimeError::no_such_method("bar");
        assert_eq!(err.kind, ErrorKind::NoSuchMethod);
        assert_eq!(err.message, "Undefined property 'bar'.");
        assert_eq!(err.expression.as_deref(), Some("bar()"));
    }

    #[test]
    fn test_constructor_arity() {
        let err = RuntimeError::constructor_arity("Point", 2);
        assert_eq!(err.kind, ErrorKind::ConstructorArity);
        assert_eq!(err.to_string(), "Point()\nExpected 0 arguments but found 2.");
    }

    #[test]
    fn test_index_error() {
        let err = RuntimeError::index_out_of_range(5, 3);
        assert_eq!(err.kind, ErrorKind::IndexError);
        assert_eq!(err.message, "Index 5 out of range for Vec of length 3.");
    }

    #[test]
    fn test_display_with_trace() {
        let mut err = RuntimeError::arity("foo", "Base", 2, 4, 5).with_expression("super.foo()");
        let module: Rc<str> = Rc::from("main");
        err.trace.push(TraceFrame {
            module: module.clone(),
            line: 5,
            context: FrameContext::Call(Rc::from("foo")),
        });
        err.trace.push(TraceFrame {
            module,
            line: 9,
            context: FrameContext::Script,
        });
        assert_eq!(
            err.to_string(),
            "super.foo()\n\
             Expected 2 arguments but found 4.\n\
             [module \"main\", line 5] in foo()\n\
             [module \"main\", line 9] in script"
        );
    }

    #[test]
    fn test_display_without_expression() {
        let err = RuntimeError::stack_overflow();
        assert_eq!(err.to_string(), "Stack overflow.");
    }
}
