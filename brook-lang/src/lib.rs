//! BROOK Language - Parser, Builder & VM
//!
//! Runtime of the BROOK configuration language: typed blocks, attributes
//! and expressions that may reference values exported by other blocks.
//!
//! Architecture:
//! ```text
//! source text
//!     ↓
//! Lexer (tokens with spans)
//!     ↓
//! Parser (AST: File / Stmt / Expr)
//!     ↓
//! VM + Scope ──► native value (defaults applied, values coerced)
//!
//! native value
//!     ↓
//! Builder (default-valued fields omitted)
//!     ↓
//! Printer ──► canonical text
//! ```
//!
//! ```
//! use brook_lang::{decode, encode, Block, EmptyScope, SchemaBuilder};
//!
//! #[derive(Debug, Clone, Default, PartialEq)]
//! struct Server {
//!     address: String,
//!     port: u16,
//! }
//!
//! impl Block for Server {
//!     fn schema(s: &mut SchemaBuilder<Self>) {
//!         s.attr("address", |v| &v.address, |v| &mut v.address);
//!         s.attr("port", |v| &v.port, |v| &mut v.port).optional();
//!     }
//!
//!     fn defaults() -> Option<Self> {
//!         Some(Server { address: String::new(), port: 8080 })
//!     }
//! }
//!
//! let server: Server = decode("address = \"0.0.0.0\"", &EmptyScope).unwrap();
//! assert_eq!(server.port, 8080);
//! assert_eq!(encode(&server).unwrap(), "address = \"0.0.0.0\"\n");
//! ```

pub mod builder;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod printer;
pub mod schema;
pub mod stdlib;
pub mod vm;

pub use parser::ast;

// Re-export key types for convenience
pub use brook_core::{
    AttrValue, Capsule, CoerceError, EmptyScope, Function, FunctionError, Handle, Number, Object,
    Scope, Value, ValueKind, Variables,
};
pub use error::{BuildError, DecodeError, Error, EvalError, Result, SchemaError};
pub use lexer::{LexError, Lexer, Span, Token, TokenKind};
pub use parser::{ParseError, Parser};
pub use printer::{Indent, PrintConfig};
pub use schema::{
    block_to_object, default_value, object_to_block, schema_of, Block, BlockObject, Cardinality,
    FieldInfo, FieldRole, Schema, SchemaBuilder,
};
pub use vm::{Evaluator, Vm};

// ============================================================================
// CONVENIENCE FUNCTIONS
// ============================================================================

/// Parse source text into a file AST.
pub fn parse(source: &str) -> Result<ast::File> {
    parse_file("", source)
}

/// Parse source text, recording `name` as the file name.
pub fn parse_file(name: &str, source: &str) -> Result<ast::File> {
    let tokens = Lexer::new(source).tokenize()?;
    Ok(Parser::new(tokens).parse_file(name)?)
}

/// Parse a standalone expression.
pub fn parse_expr(source: &str) -> Result<ast::Expr> {
    let tokens = Lexer::new(source).tokenize()?;
    Ok(Parser::new(tokens).parse_standalone_expr()?)
}

/// Parse `source` and decode its top-level statements into `T`.
///
/// A file has no block header, so a `T` with a label field fails with
/// `MissingLabel`; use [`decode_block`] for those.
pub fn decode<T: Block>(source: &str, scope: &dyn Scope) -> Result<T> {
    let file = parse(source)?;
    Ok(decode_body(&file.body, scope)?)
}

/// Decode already-parsed statements into `T`.
pub fn decode_body<T: Block>(body: &[ast::Stmt], scope: &dyn Scope) -> Result<T, DecodeError> {
    Vm::from_body(body).evaluate(scope)
}

/// Parse `source`, which must hold exactly one block statement, and decode
/// that block into `T`. The label, if any, goes to the label field.
pub fn decode_block<T: Block>(source: &str, scope: &dyn Scope) -> Result<T> {
    let file = parse(source)?;
    match file.body.as_slice() {
        [ast::Stmt::Block(block)] => Ok(Vm::new(block).evaluate(scope)?),
        body => Err(DecodeError::ExpectedSingleBlock {
            found: match body {
                [] => "no statements".to_string(),
                [ast::Stmt::Attribute(attr)] => format!("attribute {:?}", attr.name.name),
                _ => format!("{} statements", body.len()),
            },
            span: body.first().map(ast::Stmt::span).unwrap_or_default(),
        }
        .into()),
    }
}

/// Encode the fields of `value` as top-level statements.
///
/// Types with a label field are rejected, since a file has nowhere to put
/// the label; use [`encode_block`] for those.
pub fn encode<T: Block>(value: &T) -> Result<String, BuildError> {
    let schema = schema_of::<T>()?;
    if schema.has_label() {
        return Err(BuildError::LabelOutsideBlock {
            owner: schema.owner(),
        });
    }
    let mut file = builder::File::new();
    file.body_mut().append_from(value)?;
    Ok(file.to_string())
}

/// Encode `value` as a single block statement named `name`, labelled from
/// its label field. [`decode_block`] reads the result back.
pub fn encode_block<T: Block>(name: &str, value: &T) -> Result<String, BuildError> {
    let mut file = builder::File::new();
    file.body_mut()
        .append_block(builder::Block::from_value(name, value)?);
    Ok(file.to_string())
}

/// Reformat source text with the default layout.
pub fn format(source: &str) -> Result<String> {
    format_with(source, &PrintConfig::default())
}

/// Reformat source text. Comments are not preserved.
pub fn format_with(source: &str, config: &PrintConfig) -> Result<String> {
    let file = parse(source)?;
    Ok(printer::print_file(&file, config))
}
