//! Numeric values carried by [`Value::Number`](crate::Value::Number).

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A tagged number. Comparisons are numeric: `Int(3) == Uint(3) == Float(3.0)`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Number {
    Int(i64),
    Uint(u64),
    Float(f64),
}

impl Number {
    /// Build the narrowest integer tag able to hold `value`.
    pub fn from_i128(value: i128) -> Option<Self> {
        if let Ok(i) = i64::try_from(value) {
            Some(Number::Int(i))
        } else if let Ok(u) = u64::try_from(value) {
            Some(Number::Uint(u))
        } else {
            None
        }
    }

    pub fn is_float(&self) -> bool {
        matches!(self, Number::Float(_))
    }

    /// The exact integral value, if there is one. Floats qualify when they
    /// are finite and have no fractional part.
    pub fn as_i128(&self) -> Option<i128> {
        match *self {
            Number::Int(i) => Some(i as i128),
            Number::Uint(u) => Some(u as i128),
            Number::Float(f) => {
                if f.is_finite() && f.fract() == 0.0 && f.abs() < 1.0e38 {
                    Some(f as i128)
                } else {
                    None
                }
            }
        }
    }

    pub fn as_f64(&self) -> f64 {
        match *self {
            Number::Int(i) => i as f64,
            Number::Uint(u) => u as f64,
            Number::Float(f) => f,
        }
    }

    /// Integer view that ignores floats entirely, used where float
    /// semantics must win (arithmetic, ordering).
    fn integer(&self) -> Option<i128> {
        match *self {
            Number::Int(i) => Some(i as i128),
            Number::Uint(u) => Some(u as i128),
            Number::Float(_) => None,
        }
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        self.partial_cmp(other) == Some(Ordering::Equal)
    }
}

impl PartialOrd for Number {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self.integer(), other.integer()) {
            (Some(a), Some(b)) => Some(a.cmp(&b)),
            _ => self.as_f64().partial_cmp(&other.as_f64()),
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(i) => write!(f, "{}", i),
            Number::Uint(u) => write!(f, "{}", u),
            // Debug keeps the fractional part (`3.0`) and uses exponents for
            // very large or small magnitudes, both of which lex back as floats.
            Number::Float(x) => write!(f, "{:?}", x),
        }
    }
}

macro_rules! number_from {
    ($variant:ident as $repr:ty: $($t:ty),*) => {
        $(
            impl From<$t> for Number {
                fn from(value: $t) -> Self {
                    Number::$variant(value as $repr)
                }
            }
        )*
    };
}

number_from!(Int as i64: i8, i16, i32, i64, isize);
number_from!(Uint as u64: u8, u16, u32, u64, usize);
number_from!(Float as f64: f32, f64);
