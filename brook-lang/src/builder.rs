//! Builder: native values to BROOK syntax.
//!
//! Fields are walked in schema order. An optional field equal to the same
//! field of the enclosing type's default is left out, so encoded output
//! only carries what differs from a freshly defaulted value.

use crate::error::BuildError;
use crate::lexer::{is_identifier, Span};
use crate::parser::{self, AttributeStmt, BlockStmt, Expr, Ident, Literal, ObjectField, Stmt};
use crate::printer::{print_body, PrintConfig};
use crate::schema::{self, default_value, schema_of};
use brook_core::{AttrValue, Number, Value};
use std::fmt;
use std::io;

// ============================================================================
// VALUE RENDERING
// ============================================================================

/// Expression that evaluates back to `value`.
///
/// Functions, capsules without a reference path and non-finite floats
/// have no literal form.
pub fn expr_from_value(value: &Value) -> Result<Expr, BuildError> {
    let expr = match value {
        Value::Null => Expr::literal(Literal::Null),
        Value::Bool(b) => Expr::literal(Literal::Bool(*b)),
        Value::Number(Number::Float(f)) if !f.is_finite() => {
            return Err(BuildError::NonFiniteNumber {
                value: f.to_string(),
            })
        }
        Value::Number(n) => Expr::literal(Literal::Number(*n)),
        Value::String(s) => Expr::literal(Literal::String(s.clone())),
        Value::Array(items) => Expr::Array {
            elements: items
                .iter()
                .map(expr_from_value)
                .collect::<Result<_, _>>()?,
            span: Span::default(),
        },
        Value::Object(object) => Expr::Object {
            fields: object
                .iter()
                .map(|(key, item)| {
                    Ok(ObjectField {
                        name: Ident::new(key),
                        quoted: !is_identifier(key),
                        value: expr_from_value(item)?,
                    })
                })
                .collect::<Result<_, BuildError>>()?,
            span: Span::default(),
        },
        Value::Function(func) => {
            return Err(BuildError::Function {
                name: func.name().to_string(),
            })
        }
        Value::Capsule(capsule) => match capsule.reference() {
            Some(path) => Expr::path(path),
            None => {
                return Err(BuildError::Capsule {
                    type_name: capsule.type_name(),
                })
            }
        },
    };
    Ok(expr)
}

pub(crate) fn attribute_stmt(name: &str, value: Expr) -> Stmt {
    Stmt::Attribute(AttributeStmt {
        name: Ident::new(name),
        value,
    })
}

/// A nested block statement for `value`, labelled from its label field.
pub(crate) fn block_stmt<B: schema::Block>(name: &str, value: &B) -> Result<Stmt, BuildError> {
    let schema = schema_of::<B>()?;
    Ok(Stmt::Block(BlockStmt {
        name: split_name(name),
        name_span: Span::default(),
        label: schema.label_of(value).map(str::to_string),
        body: encode_fields(value)?,
        span: Span::default(),
    }))
}

/// Statements for every field of `value` that must be written.
///
/// Comparison is against the whole field of the default, so a cleared
/// field whose default is not empty is lossy: `None` for an optional block
/// and an empty list for repeated blocks both write nothing, and decoding
/// brings the default back.
pub fn encode_fields<T: schema::Block>(value: &T) -> Result<Vec<Stmt>, BuildError> {
    let schema = schema_of::<T>()?;
    let default = default_value::<T>();
    let mut stmts = Vec::new();

    for entry in schema.entries() {
        let info = &entry.info;
        if !info.required && entry.access.matches_default(value, &default) {
            tracing::trace!(
                target: "brook::builder",
                owner = info.owner,
                field = %info.name,
                "omitting field equal to default"
            );
            continue;
        }
        stmts.extend(entry.access.encode(value, &info.name)?);
    }
    Ok(stmts)
}

fn split_name(name: &str) -> Vec<String> {
    name.split('.').map(str::to_string).collect()
}

fn check_name(name: &str, role: &'static str) -> Result<(), BuildError> {
    let valid = match role {
        "block" => name.split('.').all(is_identifier),
        _ => is_identifier(name),
    };
    if valid {
        Ok(())
    } else {
        Err(BuildError::InvalidName {
            name: name.to_string(),
            role,
        })
    }
}

// ============================================================================
// DOCUMENT API
// ============================================================================

/// A document under construction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct File {
    body: Body,
}

impl File {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn body_mut(&mut self) -> &mut Body {
        &mut self.body
    }

    /// Syntax tree of the document.
    pub fn to_ast(&self, name: impl Into<String>) -> parser::File {
        parser::File {
            name: name.into(),
            body: self.body.stmts.clone(),
        }
    }

    pub fn to_string_with(&self, config: &PrintConfig) -> String {
        print_body(&self.body.stmts, config)
    }

    /// Write the formatted document with the default layout.
    pub fn write_to(&self, mut writer: impl io::Write) -> io::Result<()> {
        writer.write_all(self.to_string().as_bytes())
    }
}

impl fmt::Display for File {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_with(&PrintConfig::default()))
    }
}

/// Ordered statements of a file or block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Body {
    stmts: Vec<Stmt>,
}

impl Body {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stmts(&self) -> &[Stmt] {
        &self.stmts
    }

    pub fn is_empty(&self) -> bool {
        self.stmts.is_empty()
    }

    /// Append the non-default fields of `value`.
    pub fn append_from<T: schema::Block>(&mut self, value: &T) -> Result<(), BuildError> {
        let stmts = encode_fields(value)?;
        self.stmts.extend(stmts);
        Ok(())
    }

    pub fn append_block(&mut self, block: Block) {
        self.stmts.push(Stmt::Block(block.into_stmt()));
    }

    /// Set `name = value`, replacing an existing attribute of that name.
    pub fn set_attribute_value<V: AttrValue>(
        &mut self,
        name: &str,
        value: &V,
    ) -> Result<(), BuildError> {
        let dynamic = value.to_value().map_err(|source| BuildError::Convert {
            name: name.to_string(),
            source,
        })?;
        self.set_attribute_expr(name, expr_from_value(&dynamic)?)
    }

    /// Set `name = expr`, replacing an existing attribute of that name.
    /// `name` must be an identifier other than a keyword.
    pub fn set_attribute_expr(&mut self, name: &str, expr: Expr) -> Result<(), BuildError> {
        check_name(name, "attribute")?;
        let existing = self.stmts.iter_mut().find_map(|stmt| match stmt {
            Stmt::Attribute(attr) if attr.name.name == name => Some(attr),
            _ => None,
        });
        match existing {
            Some(attr) => attr.value = expr,
            None => self.stmts.push(attribute_stmt(name, expr)),
        }
        Ok(())
    }
}

/// A block under construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    name: Vec<String>,
    label: Option<String>,
    body: Body,
}

impl Block {
    /// `name` may be dotted, e.g. `loki.source.file`; each part must be an
    /// identifier.
    pub fn new(name: &str, label: Option<&str>) -> Result<Self, BuildError> {
        check_name(name, "block")?;
        Ok(Self {
            name: split_name(name),
            label: label.map(str::to_string),
            body: Body::new(),
        })
    }

    /// A block holding the encoded fields of `value`, labelled from its
    /// label field when it has one.
    pub fn from_value<T: schema::Block>(name: &str, value: &T) -> Result<Self, BuildError> {
        let schema = schema_of::<T>()?;
        let mut block = Block::new(name, schema.label_of(value))?;
        block.body.append_from(value)?;
        Ok(block)
    }

    pub fn name(&self) -> String {
        self.name.join(".")
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn body_mut(&mut self) -> &mut Body {
        &mut self.body
    }

    fn into_stmt(self) -> BlockStmt {
        BlockStmt {
            name: self.name,
            name_span: Span::default(),
            label: self.label,
            body: self.body.stmts,
            span: Span::default(),
        }
    }
}
