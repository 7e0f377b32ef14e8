//! BROOK Core - Value Model
//!
//! Dynamic values shared by the evaluator, the builder and the scope that
//! supplies values exported by other blocks. This crate has no knowledge of
//! syntax; it only defines what a value is and how it converts into native
//! Rust types.
//!
//! ```text
//! Expr ──eval──► Value ──AttrValue::from_value──► native field
//! native field ──AttrValue::to_value──► Value ──render──► literal text
//! ```

pub mod capsule;
pub mod convert;
pub mod duration;
pub mod error;
pub mod number;
pub mod scope;
pub mod value;

pub use capsule::{Capsule, Function, Handle};
pub use convert::AttrValue;
pub use duration::{format_duration, parse_duration};
pub use error::{CoerceError, FunctionError};
pub use number::Number;
pub use scope::{EmptyScope, Scope, Variables};
pub use value::{Object, Value, ValueKind};
