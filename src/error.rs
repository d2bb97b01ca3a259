//! The compiler's single error type.
//!
//! Every fallible stage (tokenizing, parsing, type checking, code
//! generation) returns `Result<T, CompileError>`. There is no recovery and
//! no error list: the first error found aborts compilation.

use std::fmt;

/// A single compile-time error, tagged with the taxonomy category it
/// belongs to (lexical/syntax, scope, type, or control-flow) and an
/// optional source line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    /// Unexpected token, or a token of the wrong kind where a specific kind
    /// was required.
    Syntax { line: usize, message: String },
    /// Redeclaration in the same scope, or use of an unbound name.
    Scope { line: usize, message: String },
    /// Operator used on incompatible kinds, narrowing assignment, bad
    /// index target/expression type, function call arity/type mismatch,
    /// chained comparison.
    Type { line: usize, message: String },
    /// `break`/`continue` outside a loop, a statement after a top-level
    /// `return`, or a function lacking a guaranteed return.
    ControlFlow { line: usize, message: String },
    /// The source file could not be opened or read. Carries no line number.
    Io { message: String },
}

impl CompileError {
    pub fn syntax(line: usize, message: impl Into<String>) -> Self {
        CompileError::Syntax {
            line,
            message: message.into(),
        }
    }

    pub fn scope(line: usize, message: impl Into<String>) -> Self {
        CompileError::Scope {
            line,
            message: message.into(),
        }
    }

    pub fn type_error(line: usize, message: impl Into<String>) -> Self {
        CompileError::Type {
            line,
            message: message.into(),
        }
    }

    pub fn control_flow(line: usize, message: impl Into<String>) -> Self {
        CompileError::ControlFlow {
            line,
            message: message.into(),
        }
    }

    pub fn io(message: impl Into<String>) -> Self {
        CompileError::Io {
            message: message.into(),
        }
    }

    /// The source line the error was raised at, 1-indexed for display.
    /// `Io` errors carry no line and report 0.
    pub fn line(&self) -> usize {
        match self {
            CompileError::Syntax { line, .. }
            | CompileError::Scope { line, .. }
            | CompileError::Type { line, .. }
            | CompileError::ControlFlow { line, .. } => *line,
            CompileError::Io { .. } => 0,
        }
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let CompileError::Io { message } = self {
            return write!(f, "{message}");
        }
        let (kind, line, message) = match self {
            CompileError::Syntax { line, message } => ("syntax error", line, message),
            CompileError::Scope { line, message } => ("scope error", line, message),
            CompileError::Type { line, message } => ("type error", line, message),
            CompileError::ControlFlow { line, message } => ("control-flow error", line, message),
            CompileError::Io { .. } => unreachable!(),
        };
        if *line > 0 {
            write!(f, "{kind} at line {line}: {message}")
        } else {
            write!(f, "{kind}: {message}")
        }
    }
}

impl std::error::Error for CompileError {}
