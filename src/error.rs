//! Error types for the title-formatting engine.
//!
//! Compile errors and evaluation errors are kept separate because they sit
//! on either side of the bytecode ABI boundary: a [`CompileError`] can only
//! happen once, at `compile()` time, while an [`EvalError`] can in principle
//! happen on every `evaluate()` call against hand-crafted or corrupted
//! bytecode.

use thiserror::Error;

/// Result alias for the compiler.
pub type CompileResult<T> = std::result::Result<T, CompileError>;

/// Result alias for the evaluator.
pub type EvalResult<T> = std::result::Result<T, EvalError>;

/// Why a script failed to compile.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    #[error("unterminated '(' starting at byte {0}")]
    UnterminatedCall(usize),

    #[error("unterminated '%' starting at byte {0}")]
    UnterminatedField(usize),

    #[error("unterminated '[' starting at byte {0}")]
    UnterminatedBlock(usize),

    #[error("unterminated quoted literal starting at byte {0}")]
    UnterminatedQuote(usize),

    #[error("argument compiled length {0} exceeds the 255-byte limit")]
    ArgumentTooLong(usize),

    #[error("field name length {0} exceeds the 255-byte limit")]
    FieldNameTooLong(usize),

    #[error("nesting depth exceeds the configured limit of {0}")]
    TooDeeplyNested(u32),
}

/// Why `evaluate()` failed outright (as opposed to an if-defined block
/// silently eliding, which is not an error).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("bytecode node kind {0:#04x} is not recognized")]
    UnknownNodeKind(u8),

    #[error("function index {0} is out of range for the registry")]
    UnknownFunctionIndex(u8),

    #[error("built-in '{name}' called with {got} argument(s), expected {expected}")]
    Arity { name: &'static str, expected: &'static str, got: usize },

    #[error("built-in '{0}' failed")]
    BuiltinFailed(&'static str),

    #[error("recursion depth exceeds the configured limit of {0}")]
    RecursionLimit(u32),

    #[error("bytecode is truncated: expected {expected} more byte(s) at offset {offset}")]
    Truncated { offset: usize, expected: usize },
}
