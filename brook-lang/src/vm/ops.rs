//! Operator semantics on dynamic values.
//!
//! Integer operands are combined in `i128` and narrowed back to `Int` or
//! `Uint`; any float operand switches the operation to `f64`.

use crate::error::EvalError;
use crate::lexer::Span;
use crate::parser::{BinaryOp, UnaryOp};
use brook_core::{Number, Value};
use std::cmp::Ordering;

/// Apply a non-short-circuit binary operator.
pub fn binary(op: BinaryOp, left: Value, right: Value, span: Span) -> Result<Value, EvalError> {
    match (op, left, right) {
        (BinaryOp::Eq, l, r) => Ok(Value::Bool(l == r)),
        (BinaryOp::Ne, l, r) => Ok(Value::Bool(l != r)),

        (BinaryOp::And, Value::Bool(a), Value::Bool(b)) => Ok(Value::Bool(a && b)),
        (BinaryOp::Or, Value::Bool(a), Value::Bool(b)) => Ok(Value::Bool(a || b)),

        (BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge, l, r) => {
            let ordering = match (&l, &r) {
                (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
                (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
                _ => return Err(operand_error(op, &l, &r, span)),
            };
            Ok(Value::Bool(compare(op, ordering)))
        }

        (BinaryOp::Add, Value::String(a), Value::String(b)) => Ok(Value::String(a + &b)),

        (
            BinaryOp::Add
            | BinaryOp::Sub
            | BinaryOp::Mul
            | BinaryOp::Div
            | BinaryOp::Mod
            | BinaryOp::Pow,
            Value::Number(a),
            Value::Number(b),
        ) => arithmetic(op, a, b, span).map(Value::Number),

        (op, l, r) => Err(operand_error(op, &l, &r, span)),
    }
}

/// Apply a unary operator.
pub fn unary(op: UnaryOp, operand: Value, span: Span) -> Result<Value, EvalError> {
    match (op, operand) {
        (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
        (UnaryOp::Neg, Value::Number(Number::Float(f))) => Ok(Value::from(-f)),
        (UnaryOp::Neg, Value::Number(n)) => n
            .as_i128()
            .and_then(|i| i.checked_neg())
            .and_then(Number::from_i128)
            .map(Value::Number)
            .ok_or(EvalError::Overflow {
                op: op.symbol(),
                span,
            }),
        (op, other) => Err(EvalError::UnaryOperand {
            op: op.symbol(),
            operand: other.kind(),
            span,
        }),
    }
}

fn compare(op: BinaryOp, ordering: Option<Ordering>) -> bool {
    match ordering {
        // NaN compares false against everything.
        None => false,
        Some(ord) => match op {
            BinaryOp::Lt => ord == Ordering::Less,
            BinaryOp::Le => ord != Ordering::Greater,
            BinaryOp::Gt => ord == Ordering::Greater,
            _ => ord != Ordering::Less,
        },
    }
}

fn integer(n: Number) -> Option<i128> {
    match n {
        Number::Float(_) => None,
        other => other.as_i128(),
    }
}

fn arithmetic(op: BinaryOp, a: Number, b: Number, span: Span) -> Result<Number, EvalError> {
    let overflow = EvalError::Overflow {
        op: op.symbol(),
        span,
    };

    if let (Some(x), Some(y)) = (integer(a), integer(b)) {
        let result = match op {
            BinaryOp::Add => x.checked_add(y),
            BinaryOp::Sub => x.checked_sub(y),
            BinaryOp::Mul => x.checked_mul(y),
            BinaryOp::Div | BinaryOp::Mod if y == 0 => {
                return Err(EvalError::DivisionByZero { span })
            }
            BinaryOp::Div => x.checked_div(y),
            BinaryOp::Mod => x.checked_rem(y),
            // A negative exponent has no integer result.
            BinaryOp::Pow if y < 0 => return Ok(Number::Float((x as f64).powf(y as f64))),
            BinaryOp::Pow => match x {
                1 => Some(1),
                0 if y > 0 => Some(0),
                -1 => Some(if y % 2 == 0 { 1 } else { -1 }),
                _ => u32::try_from(y).ok().and_then(|e| x.checked_pow(e)),
            },
            _ => None,
        };
        return result.and_then(Number::from_i128).ok_or(overflow);
    }

    let (x, y) = (a.as_f64(), b.as_f64());
    let result = match op {
        BinaryOp::Add => x + y,
        BinaryOp::Sub => x - y,
        BinaryOp::Mul => x * y,
        BinaryOp::Div | BinaryOp::Mod if y == 0.0 => {
            return Err(EvalError::DivisionByZero { span })
        }
        BinaryOp::Div => x / y,
        BinaryOp::Mod => x % y,
        BinaryOp::Pow => x.powf(y),
        _ => return Err(overflow),
    };
    Ok(Number::Float(result))
}

fn operand_error(op: BinaryOp, left: &Value, right: &Value, span: Span) -> EvalError {
    EvalError::BinaryOperand {
        op: op.symbol(),
        left: left.kind(),
        right: right.kind(),
        span,
    }
}
