//! Error types for value conversion and builtin calls

use crate::value::ValueKind;
use thiserror::Error;

/// Failure converting a dynamic value into a native type (or back).
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CoerceError {
    #[error("expected {expected}, got {got}")]
    TypeMismatch { expected: String, got: ValueKind },

    #[error("{value} does not fit in {target}")]
    OutOfRange { value: String, target: &'static str },

    #[error("expected {expected} elements, got {got}")]
    Length { expected: usize, got: usize },

    #[error("unknown key {key:?}")]
    UnknownKey { key: String },

    #[error("missing required key {key:?}")]
    MissingKey { key: String },

    #[error("capsule holds {got}, expected {expected}")]
    CapsuleMismatch {
        expected: &'static str,
        got: &'static str,
    },

    #[error("invalid {what} {text:?}")]
    InvalidText { what: &'static str, text: String },

    #[error("index {index}: {source}")]
    Element {
        index: usize,
        #[source]
        source: Box<CoerceError>,
    },

    #[error("key {key:?}: {source}")]
    Key {
        key: String,
        #[source]
        source: Box<CoerceError>,
    },

    #[error("{message}")]
    Custom { message: String },
}

impl CoerceError {
    pub fn mismatch(expected: impl Into<String>, got: ValueKind) -> Self {
        CoerceError::TypeMismatch {
            expected: expected.into(),
            got,
        }
    }

    pub fn at_index(self, index: usize) -> Self {
        CoerceError::Element {
            index,
            source: Box::new(self),
        }
    }

    pub fn at_key(self, key: impl Into<String>) -> Self {
        CoerceError::Key {
            key: key.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error once element/key context is stripped.
    pub fn root(&self) -> &CoerceError {
        match self {
            CoerceError::Element { source, .. } | CoerceError::Key { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Failure raised by a function value.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FunctionError {
    #[error("expected {expected} arguments, got {got}")]
    ArgumentCount { expected: usize, got: usize },

    #[error("expected at least {min} arguments, got {got}")]
    TooFewArguments { min: usize, got: usize },

    #[error("argument {index}: expected {expected}, got {got}")]
    ArgumentType {
        index: usize,
        expected: &'static str,
        got: ValueKind,
    },

    #[error("{message}")]
    Failed { message: String },
}
