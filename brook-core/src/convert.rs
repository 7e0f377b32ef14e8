//! Type coercion between dynamic values and native attribute types.
//!
//! Rules:
//! - numbers convert into any numeric type when the value is representable
//!   (integral and in range for integers, in range for `f32`);
//! - strings and bools only convert into matching kinds;
//! - arrays convert element-wise, objects key-wise;
//! - capsules only convert into [`Capsule`] or a [`Handle`] of the same type.

use crate::capsule::{Capsule, Handle};
use crate::duration::{format_duration, parse_duration};
use crate::error::CoerceError;
use crate::number::Number;
use crate::value::{Object, Value};
use std::any::{type_name, Any};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

/// A native type that can be assigned from, and rendered as, an attribute value.
pub trait AttrValue: Sized + Clone + PartialEq + Send + Sync + 'static {
    /// Convert a dynamic value into `Self`.
    fn from_value(value: Value) -> Result<Self, CoerceError>;

    /// Convert `self` into a dynamic value for encoding or export.
    fn to_value(&self) -> Result<Value, CoerceError>;
}

// ============================================================================
// SCALARS
// ============================================================================

impl AttrValue for Value {
    fn from_value(value: Value) -> Result<Self, CoerceError> {
        Ok(value)
    }

    fn to_value(&self) -> Result<Value, CoerceError> {
        Ok(self.clone())
    }
}

impl AttrValue for bool {
    fn from_value(value: Value) -> Result<Self, CoerceError> {
        match value {
            Value::Bool(b) => Ok(b),
            other => Err(CoerceError::mismatch("bool", other.kind())),
        }
    }

    fn to_value(&self) -> Result<Value, CoerceError> {
        Ok(Value::Bool(*self))
    }
}

impl AttrValue for String {
    fn from_value(value: Value) -> Result<Self, CoerceError> {
        match value {
            Value::String(s) => Ok(s),
            other => Err(CoerceError::mismatch("string", other.kind())),
        }
    }

    fn to_value(&self) -> Result<Value, CoerceError> {
        Ok(Value::String(self.clone()))
    }
}

fn expect_number(value: Value) -> Result<Number, CoerceError> {
    match value {
        Value::Number(n) => Ok(n),
        other => Err(CoerceError::mismatch("number", other.kind())),
    }
}

macro_rules! integer_attr {
    ($($t:ty),*) => {
        $(
            impl AttrValue for $t {
                fn from_value(value: Value) -> Result<Self, CoerceError> {
                    let n = expect_number(value)?;
                    n.as_i128()
                        .and_then(|i| <$t>::try_from(i).ok())
                        .ok_or_else(|| CoerceError::OutOfRange {
                            value: n.to_string(),
                            target: stringify!($t),
                        })
                }

                fn to_value(&self) -> Result<Value, CoerceError> {
                    Ok(Value::Number(Number::from(*self)))
                }
            }
        )*
    };
}

integer_attr!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl AttrValue for f64 {
    fn from_value(value: Value) -> Result<Self, CoerceError> {
        Ok(expect_number(value)?.as_f64())
    }

    fn to_value(&self) -> Result<Value, CoerceError> {
        Ok(Value::Number(Number::Float(*self)))
    }
}

impl AttrValue for f32 {
    fn from_value(value: Value) -> Result<Self, CoerceError> {
        let n = expect_number(value)?;
        let f = n.as_f64();
        if f.is_finite() && f.abs() > f32::MAX as f64 {
            return Err(CoerceError::OutOfRange {
                value: n.to_string(),
                target: "f32",
            });
        }
        Ok(f as f32)
    }

    fn to_value(&self) -> Result<Value, CoerceError> {
        Ok(Value::Number(Number::Float(*self as f64)))
    }
}

impl AttrValue for Duration {
    fn from_value(value: Value) -> Result<Self, CoerceError> {
        match value {
            Value::String(s) => parse_duration(&s),
            other => Err(CoerceError::mismatch("duration string", other.kind())),
        }
    }

    fn to_value(&self) -> Result<Value, CoerceError> {
        Ok(Value::String(format_duration(*self)))
    }
}

// ============================================================================
// CAPSULES
// ============================================================================

impl AttrValue for Capsule {
    fn from_value(value: Value) -> Result<Self, CoerceError> {
        match value {
            Value::Capsule(c) => Ok(c),
            other => Err(CoerceError::mismatch("capsule", other.kind())),
        }
    }

    fn to_value(&self) -> Result<Value, CoerceError> {
        Ok(Value::Capsule(self.clone()))
    }
}

impl<T: Any + Send + Sync> AttrValue for Handle<T> {
    fn from_value(value: Value) -> Result<Self, CoerceError> {
        match value {
            Value::Capsule(c) => {
                let reference = c.reference().map(str::to_string);
                let arc = c.downcast::<T>().ok_or(CoerceError::CapsuleMismatch {
                    expected: type_name::<T>(),
                    got: c.type_name(),
                })?;
                Ok(match reference {
                    Some(path) => Handle::from_arc(arc).with_reference(path),
                    None => Handle::from_arc(arc),
                })
            }
            other => Err(CoerceError::mismatch(
                format!("capsule({})", type_name::<T>()),
                other.kind(),
            )),
        }
    }

    fn to_value(&self) -> Result<Value, CoerceError> {
        Ok(Value::Capsule(self.to_capsule()))
    }
}

// ============================================================================
// CONTAINERS
// ============================================================================

impl<T: AttrValue> AttrValue for Option<T> {
    fn from_value(value: Value) -> Result<Self, CoerceError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }

    fn to_value(&self) -> Result<Value, CoerceError> {
        match self {
            Some(v) => v.to_value(),
            None => Ok(Value::Null),
        }
    }
}

fn expect_array(value: Value) -> Result<Vec<Value>, CoerceError> {
    match value {
        Value::Array(items) => Ok(items),
        other => Err(CoerceError::mismatch("array", other.kind())),
    }
}

fn expect_object(value: Value) -> Result<Object, CoerceError> {
    match value {
        Value::Object(obj) => Ok(obj),
        other => Err(CoerceError::mismatch("object", other.kind())),
    }
}

impl<T: AttrValue> AttrValue for Vec<T> {
    fn from_value(value: Value) -> Result<Self, CoerceError> {
        expect_array(value)?
            .into_iter()
            .enumerate()
            .map(|(i, item)| T::from_value(item).map_err(|e| e.at_index(i)))
            .collect()
    }

    fn to_value(&self) -> Result<Value, CoerceError> {
        self.iter()
            .enumerate()
            .map(|(i, item)| item.to_value().map_err(|e| e.at_index(i)))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array)
    }
}

impl<T: AttrValue, const N: usize> AttrValue for [T; N] {
    fn from_value(value: Value) -> Result<Self, CoerceError> {
        let items = expect_array(value)?;
        if items.len() != N {
            return Err(CoerceError::Length {
                expected: N,
                got: items.len(),
            });
        }
        let converted = Vec::<T>::from_value(Value::Array(items))?;
        converted.try_into().map_err(|v: Vec<T>| CoerceError::Length {
            expected: N,
            got: v.len(),
        })
    }

    fn to_value(&self) -> Result<Value, CoerceError> {
        self.iter()
            .enumerate()
            .map(|(i, item)| item.to_value().map_err(|e| e.at_index(i)))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array)
    }
}

impl<T: AttrValue> AttrValue for BTreeMap<String, T> {
    fn from_value(value: Value) -> Result<Self, CoerceError> {
        expect_object(value)?
            .into_iter()
            .map(|(k, v)| match T::from_value(v) {
                Ok(v) => Ok((k, v)),
                Err(e) => Err(e.at_key(k)),
            })
            .collect()
    }

    fn to_value(&self) -> Result<Value, CoerceError> {
        let mut obj = Object::new();
        for (k, v) in self {
            obj.insert(k.clone(), v.to_value().map_err(|e| e.at_key(k.clone()))?);
        }
        Ok(Value::Object(obj))
    }
}

impl<T: AttrValue> AttrValue for HashMap<String, T> {
    fn from_value(value: Value) -> Result<Self, CoerceError> {
        expect_object(value)?
            .into_iter()
            .map(|(k, v)| match T::from_value(v) {
                Ok(v) => Ok((k, v)),
                Err(e) => Err(e.at_key(k)),
            })
            .collect()
    }

    fn to_value(&self) -> Result<Value, CoerceError> {
        // Sorted so that encoding is deterministic.
        let mut keys: Vec<&String> = self.keys().collect();
        keys.sort();
        let mut obj = Object::new();
        for k in keys {
            let v = &self[k];
            obj.insert(k.clone(), v.to_value().map_err(|e| e.at_key(k.clone()))?);
        }
        Ok(Value::Object(obj))
    }
}
