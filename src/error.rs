//! The compile error taxonomy.
//!
//! The front end has no recovery: every error aborts the translation unit,
//! and no partially lowered function is ever handed to the emitter.

use thiserror::Error;

use crate::Symbol;

/// Result type for all fallible front end operations.
pub type CResult<T> = Result<T, CompileError>;

/// Errors that abort compilation.
#[derive(Debug, Error)]
pub enum CompileError {
  /// An unexpected token at a point where the grammar admits exactly one.
  #[error("syntax error: expected {expected}, found {found}")]
  Syntax {
    /// What the grammar required here.
    expected: String,
    /// The offending token.
    found: String,
  },
  /// A declaration or statement with an invalid shape: missing type
  /// specifier, nested function definition, unnamed parameter at a function
  /// definition, trailing comma in a parameter list, or a stray
  /// `break`/`continue`.
  #[error("{0}")]
  Shape(String),
  /// An array dimension that does not reduce to a positive compile-time
  /// integer immediate.
  #[error("{0}")]
  Constant(String),
  /// A dereference of a non-pointer type.
  #[error("type error: {0}")]
  Type(String),
  /// A use of an undeclared identifier.
  #[error("`{0}` undeclared")]
  Name(Symbol),
  /// An emitter I/O failure.
  #[error(transparent)]
  Io(#[from] std::io::Error),
}
