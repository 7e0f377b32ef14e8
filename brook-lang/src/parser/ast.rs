//! Abstract Syntax Tree types

use crate::lexer::Span;
use brook_core::Number;
use serde::{Deserialize, Serialize};

// ============================================================================
// STATEMENTS
// ============================================================================

/// A parsed source file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct File {
    pub name: String,
    pub body: Vec<Stmt>,
}

/// A statement inside a file or block body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Stmt {
    Attribute(AttributeStmt),
    Block(BlockStmt),
}

impl Stmt {
    /// Name as written in source; dotted for blocks.
    pub fn name(&self) -> String {
        match self {
            Stmt::Attribute(attr) => attr.name.name.clone(),
            Stmt::Block(block) => block.full_name(),
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Stmt::Attribute(attr) => attr.name.span.to(attr.value.span()),
            Stmt::Block(block) => block.span,
        }
    }
}

/// An identifier with its location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

impl Ident {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            span: Span::default(),
        }
    }
}

/// `name = value`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeStmt {
    pub name: Ident,
    pub value: Expr,
}

/// `a.b.c "label" { body }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockStmt {
    pub name: Vec<String>,
    pub name_span: Span,
    pub label: Option<String>,
    pub body: Vec<Stmt>,
    pub span: Span,
}

impl BlockStmt {
    pub fn full_name(&self) -> String {
        self.name.join(".")
    }
}

// ============================================================================
// EXPRESSIONS
// ============================================================================

/// Expression node. Every variant carries the span of its source text;
/// synthesized expressions use `Span::default()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Literal {
        value: Literal,
        span: Span,
    },
    Array {
        elements: Vec<Expr>,
        span: Span,
    },
    Object {
        fields: Vec<ObjectField>,
        span: Span,
    },
    Ident(Ident),
    Access {
        base: Box<Expr>,
        name: Ident,
        span: Span,
    },
    Index {
        base: Box<Expr>,
        index: Box<Expr>,
        span: Span,
    },
    /// Call of a named function; `callee` is the flattened dotted name.
    Call {
        callee: String,
        args: Vec<Expr>,
        span: Span,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
        span: Span,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
        span: Span,
    },
    Paren {
        inner: Box<Expr>,
        span: Span,
    },
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::Ident(ident) => ident.span,
            Expr::Literal { span, .. }
            | Expr::Array { span, .. }
            | Expr::Object { span, .. }
            | Expr::Access { span, .. }
            | Expr::Index { span, .. }
            | Expr::Call { span, .. }
            | Expr::Unary { span, .. }
            | Expr::Binary { span, .. }
            | Expr::Paren { span, .. } => *span,
        }
    }

    pub fn literal(value: Literal) -> Self {
        Expr::Literal {
            value,
            span: Span::default(),
        }
    }

    /// `a.b.c` as an identifier followed by field accesses.
    pub fn path(dotted: &str) -> Self {
        let mut parts = dotted.split('.');
        let first = parts.next().unwrap_or_default();
        parts.fold(Expr::Ident(Ident::new(first)), |base, name| Expr::Access {
            base: Box::new(base),
            name: Ident::new(name),
            span: Span::default(),
        })
    }

    /// The dotted name for pure identifier/access chains.
    pub fn as_path(&self) -> Option<String> {
        match self {
            Expr::Ident(ident) => Some(ident.name.clone()),
            Expr::Access { base, name, .. } => {
                let mut path = base.as_path()?;
                path.push('.');
                path.push_str(&name.name);
                Some(path)
            }
            _ => None,
        }
    }
}

/// One `key = value` entry of an object literal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectField {
    pub name: Ident,
    /// The key was written as a string literal.
    pub quoted: bool,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Not,
    Neg,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Not => "!",
            UnaryOp::Neg => "-",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Or => "||",
            BinaryOp::And => "&&",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Pow => "^",
        }
    }

    /// Binding strength, higher binds tighter.
    pub fn precedence(self) -> u8 {
        match self {
            BinaryOp::Or => 1,
            BinaryOp::And => 2,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => 3,
            BinaryOp::Add | BinaryOp::Sub => 4,
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => 5,
            BinaryOp::Pow => 6,
        }
    }

    pub fn is_right_assoc(self) -> bool {
        self == BinaryOp::Pow
    }
}
