//! Error types for BROOK parsing, evaluation and encoding

use crate::lexer::{LexError, Span};
use crate::parser::ParseError;
use brook_core::{CoerceError, FunctionError, ValueKind};
use thiserror::Error;

/// Invalid field registration for a native type.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("{owner}: name {name:?} is registered more than once")]
    DuplicateName { owner: &'static str, name: String },

    #[error("{owner}: {name:?} is not a valid {role} name")]
    InvalidName {
        owner: &'static str,
        name: String,
        role: &'static str,
    },

    #[error("{owner}: more than one label field")]
    DuplicateLabel { owner: &'static str },
}

/// Failure evaluating an expression.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EvalError {
    #[error("{span}: unresolved reference {name}")]
    UnresolvedReference { name: String, span: Span },

    #[error("{span}: duplicate object key {key:?}")]
    DuplicateKey { key: String, span: Span },

    #[error("{span}: cannot access field {field:?} on {kind}")]
    FieldAccess {
        field: String,
        kind: ValueKind,
        span: Span,
    },

    #[error("{span}: cannot index {base} with {index}")]
    InvalidIndex {
        base: ValueKind,
        index: ValueKind,
        span: Span,
    },

    #[error("{span}: index {index} out of range for array of length {len}")]
    IndexOutOfRange { index: String, len: usize, span: Span },

    #[error("{span}: unknown function {name}")]
    UnknownFunction { name: String, span: Span },

    #[error("{span}: {name} is a {kind}, not a function")]
    NotCallable {
        name: String,
        kind: ValueKind,
        span: Span,
    },

    #[error("{span}: call to {name} failed: {source}")]
    Call {
        name: String,
        #[source]
        source: FunctionError,
        span: Span,
    },

    #[error("{span}: operator {op} cannot be applied to {left} and {right}")]
    BinaryOperand {
        op: &'static str,
        left: ValueKind,
        right: ValueKind,
        span: Span,
    },

    #[error("{span}: operator {op} cannot be applied to {operand}")]
    UnaryOperand {
        op: &'static str,
        operand: ValueKind,
        span: Span,
    },

    #[error("{span}: integer overflow in {op}")]
    Overflow { op: &'static str, span: Span },

    #[error("{span}: division by zero")]
    DivisionByZero { span: Span },
}

/// Failure decoding a body into a native value.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DecodeError {
    #[error(transparent)]
    Eval(#[from] EvalError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("{span}: {name}: {source}")]
    TypeMismatch {
        name: String,
        #[source]
        source: CoerceError,
        span: Span,
    },

    #[error("{span}: unrecognized {kind} {name:?} in {owner}")]
    UnknownField {
        name: String,
        kind: &'static str,
        owner: &'static str,
        span: Span,
    },

    #[error("{span}: {name:?} must be written as {expected}")]
    WrongStatementKind {
        name: String,
        expected: &'static str,
        span: Span,
    },

    #[error("{span}: {name:?} may only be set once")]
    DuplicateField { name: String, span: Span },

    #[error("{span}: missing required {kind} {name:?}")]
    MissingRequiredField {
        name: String,
        kind: &'static str,
        span: Span,
    },

    #[error("{span}: block {block} requires a label")]
    MissingLabel { block: String, span: Span },

    #[error("{span}: block {block} does not accept a label, got {label:?}")]
    UnexpectedLabel {
        block: String,
        label: String,
        span: Span,
    },

    #[error("{span}: expected a single block statement, found {found}")]
    ExpectedSingleBlock { found: String, span: Span },
}

/// Failure turning a native value into syntax.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum BuildError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("{name}: {source}")]
    Convert {
        name: String,
        #[source]
        source: CoerceError,
    },

    #[error("function {name} has no textual representation")]
    Function { name: String },

    #[error("capsule {type_name} has no reference path to render")]
    Capsule { type_name: &'static str },

    #[error("number {value} cannot be written as a literal")]
    NonFiniteNumber { value: String },

    #[error("{name:?} is not a valid {role} name")]
    InvalidName { name: String, role: &'static str },

    #[error("{owner} has a label field and must be encoded as a block")]
    LabelOutsideBlock { owner: &'static str },
}

/// Master error type for BROOK operations.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum Error {
    #[error("{0}")]
    Lex(#[from] LexError),

    #[error("{0}")]
    Parse(#[from] ParseError),

    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("Eval error: {0}")]
    Eval(#[from] EvalError),

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Build error: {0}")]
    Build(#[from] BuildError),
}

/// Result type alias for BROOK operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

// =============================================================================
// TESTS
// =============================================================================
