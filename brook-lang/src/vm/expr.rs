//! Expression evaluation against a [`Scope`].

use super::ops;
use crate::error::EvalError;
use crate::lexer::Span;
use crate::parser::{BinaryOp, Expr, Literal};
use crate::stdlib;
use brook_core::{Object, Scope, Value};

/// Evaluates expressions. References are resolved through the scope at
/// the time of the call; nothing is cached between evaluations.
pub struct Evaluator<'s> {
    scope: &'s dyn Scope,
}

impl<'s> Evaluator<'s> {
    pub fn new(scope: &'s dyn Scope) -> Self {
        Self { scope }
    }

    pub fn eval(&self, expr: &Expr) -> Result<Value, EvalError> {
        if let Some(path) = expr.as_path() {
            return self.resolve(&path, expr.span());
        }

        match expr {
            Expr::Literal { value, .. } => Ok(literal(value)),
            Expr::Array { elements, .. } => elements
                .iter()
                .map(|e| self.eval(e))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            Expr::Object { fields, .. } => {
                let mut object = Object::new();
                for field in fields {
                    let value = self.eval(&field.value)?;
                    if object.insert(field.name.name.clone(), value).is_some() {
                        return Err(EvalError::DuplicateKey {
                            key: field.name.name.clone(),
                            span: field.name.span,
                        });
                    }
                }
                Ok(Value::Object(object))
            }
            // Plain identifiers and access chains are handled by `resolve`.
            Expr::Ident(ident) => self.resolve(&ident.name, ident.span),
            Expr::Access { base, name, span } => {
                let base = self.eval(base)?;
                field(base, &name.name, &name.name, *span)
            }
            Expr::Index { base, index, span } => {
                let base = self.eval(base)?;
                let index = self.eval(index)?;
                self.index(base, index, *span)
            }
            Expr::Call { callee, args, span } => self.call(callee, args, *span),
            Expr::Unary { op, operand, span } => ops::unary(*op, self.eval(operand)?, *span),
            Expr::Binary {
                op,
                left,
                right,
                span,
            } => self.binary(*op, left, right, *span),
            Expr::Paren { inner, .. } => self.eval(inner),
        }
    }

    /// Resolve a dotted reference: the longest prefix known to the scope
    /// wins, remaining names select object fields.
    fn lookup(&self, path: &str, span: Span) -> Result<Option<Value>, EvalError> {
        let parts: Vec<&str> = path.split('.').collect();
        for n in (1..=parts.len()).rev() {
            let prefix = parts[..n].join(".");
            if let Some(mut value) = self.scope.lookup(&prefix) {
                for name in &parts[n..] {
                    value = field(value, name, path, span)?;
                }
                return Ok(Some(value));
            }
        }
        Ok(None)
    }

    fn resolve(&self, path: &str, span: Span) -> Result<Value, EvalError> {
        if let Some(value) = self.lookup(path, span)? {
            return Ok(value);
        }
        if let Some(func) = stdlib::builtin(path) {
            return Ok(Value::Function(func));
        }
        tracing::debug!(target: "brook::vm", reference = path, %span, "scope miss");
        Err(EvalError::UnresolvedReference {
            name: path.to_string(),
            span,
        })
    }

    fn index(&self, base: Value, index: Value, span: Span) -> Result<Value, EvalError> {
        match (base, index) {
            (Value::Array(mut items), Value::Number(n)) => {
                let len = items.len();
                match n.as_i128() {
                    Some(i) if i >= 0 && (i as usize) < len => Ok(items.swap_remove(i as usize)),
                    _ => Err(EvalError::IndexOutOfRange {
                        index: n.to_string(),
                        len,
                        span,
                    }),
                }
            }
            (Value::Object(mut object), Value::String(key)) => {
                Ok(object.remove(&key).unwrap_or(Value::Null))
            }
            (base, index) => Err(EvalError::InvalidIndex {
                base: base.kind(),
                index: index.kind(),
                span,
            }),
        }
    }

    fn call(&self, callee: &str, args: &[Expr], span: Span) -> Result<Value, EvalError> {
        let func = match self.lookup(callee, span)? {
            Some(Value::Function(func)) => func,
            Some(other) => {
                return Err(EvalError::NotCallable {
                    name: callee.to_string(),
                    kind: other.kind(),
                    span,
                })
            }
            None => stdlib::builtin(callee).ok_or_else(|| EvalError::UnknownFunction {
                name: callee.to_string(),
                span,
            })?,
        };

        let args = args
            .iter()
            .map(|arg| self.eval(arg))
            .collect::<Result<Vec<_>, _>>()?;
        func.call(&args).map_err(|source| EvalError::Call {
            name: callee.to_string(),
            source,
            span,
        })
    }

    fn binary(&self, op: BinaryOp, left: &Expr, right: &Expr, span: Span) -> Result<Value, EvalError> {
        let left = self.eval(left)?;
        match (op, &left) {
            (BinaryOp::And, Value::Bool(false)) => return Ok(Value::Bool(false)),
            (BinaryOp::Or, Value::Bool(true)) => return Ok(Value::Bool(true)),
            _ => {}
        }
        let right = self.eval(right)?;
        ops::binary(op, left, right, span)
    }
}

fn literal(value: &Literal) -> Value {
    match value {
        Literal::Null => Value::Null,
        Literal::Bool(b) => Value::Bool(*b),
        Literal::Number(n) => Value::Number(*n),
        Literal::String(s) => Value::String(s.clone()),
    }
}

/// `base.name`; `path` names the whole reference for error messages.
fn field(base: Value, name: &str, path: &str, span: Span) -> Result<Value, EvalError> {
    match base {
        Value::Object(mut object) => {
            object
                .remove(name)
                .ok_or_else(|| EvalError::UnresolvedReference {
                    name: path.to_string(),
                    span,
                })
        }
        other => Err(EvalError::FieldAccess {
            field: name.to_string(),
            kind: other.kind(),
            span,
        }),
    }
}
