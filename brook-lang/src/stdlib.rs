//! Builtin functions available to every expression.
//!
//! All builtins are pure: they only look at their arguments.

use crate::printer::escape_string;
use brook_core::{Function, FunctionError, Number, Object, Value};
use once_cell::sync::Lazy;
use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use std::collections::HashMap;
use std::fmt;

type Builtin = fn(&[Value]) -> Result<Value, FunctionError>;

static BUILTINS: Lazy<HashMap<&'static str, Function>> = Lazy::new(|| {
    let table: [(&'static str, Builtin); 13] = [
        ("concat", concat),
        ("coalesce", coalesce),
        ("format", format),
        ("join", join),
        ("split", split),
        ("replace", replace),
        ("to_lower", to_lower),
        ("to_upper", to_upper),
        ("trim", trim),
        ("trim_prefix", trim_prefix),
        ("trim_suffix", trim_suffix),
        ("trim_space", trim_space),
        ("json_decode", json_decode),
    ];
    table
        .into_iter()
        .map(|(name, f)| (name, Function::new(name, f)))
        .collect()
});

/// The builtin called `name`, if any.
pub fn builtin(name: &str) -> Option<Function> {
    BUILTINS.get(name).cloned()
}

/// Names of all builtins, sorted.
pub fn names() -> Vec<&'static str> {
    let mut names: Vec<_> = BUILTINS.keys().copied().collect();
    names.sort_unstable();
    names
}

// ============================================================================
// ARGUMENT HELPERS
// ============================================================================

fn arity(args: &[Value], expected: usize) -> Result<(), FunctionError> {
    if args.len() != expected {
        return Err(FunctionError::ArgumentCount {
            expected,
            got: args.len(),
        });
    }
    Ok(())
}

fn string_arg(args: &[Value], index: usize) -> Result<&str, FunctionError> {
    match &args[index] {
        Value::String(s) => Ok(s),
        other => Err(FunctionError::ArgumentType {
            index,
            expected: "string",
            got: other.kind(),
        }),
    }
}

fn array_arg(args: &[Value], index: usize) -> Result<&[Value], FunctionError> {
    match &args[index] {
        Value::Array(items) => Ok(items),
        other => Err(FunctionError::ArgumentType {
            index,
            expected: "array",
            got: other.kind(),
        }),
    }
}

fn failed(message: impl Into<String>) -> FunctionError {
    FunctionError::Failed {
        message: message.into(),
    }
}

/// Unary string function.
fn map_string(args: &[Value], f: impl Fn(&str) -> String) -> Result<Value, FunctionError> {
    arity(args, 1)?;
    Ok(Value::String(f(string_arg(args, 0)?)))
}

// ============================================================================
// BUILTINS
// ============================================================================

fn concat(args: &[Value]) -> Result<Value, FunctionError> {
    let mut out = Vec::new();
    for index in 0..args.len() {
        out.extend_from_slice(array_arg(args, index)?);
    }
    Ok(Value::Array(out))
}

/// First argument that is not a zero value, else the last argument.
fn coalesce(args: &[Value]) -> Result<Value, FunctionError> {
    Ok(args
        .iter()
        .find(|v| !v.is_zero())
        .or_else(|| args.last())
        .cloned()
        .unwrap_or(Value::Null))
}

fn format(args: &[Value]) -> Result<Value, FunctionError> {
    if args.is_empty() {
        return Err(FunctionError::TooFewArguments { min: 1, got: 0 });
    }
    let pattern = string_arg(args, 0)?;
    let mut rest = args[1..].iter();
    let mut out = String::with_capacity(pattern.len());
    let mut chars = pattern.chars();

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        let verb = chars
            .next()
            .ok_or_else(|| failed("format string ends with a bare %"))?;
        if verb == '%' {
            out.push('%');
            continue;
        }
        let arg = rest
            .next()
            .ok_or_else(|| failed(format!("missing argument for %{}", verb)))?;

        match (verb, arg) {
            ('s' | 'v', Value::String(s)) => out.push_str(s),
            ('s' | 'v', other) => out.push_str(&other.to_string()),
            ('d', Value::Number(n)) => match n.as_i128() {
                Some(i) => out.push_str(&i.to_string()),
                None => return Err(failed(format!("%d expects an integer, got {}", n))),
            },
            ('f', Value::Number(n)) => out.push_str(&format!("{:.6}", n.as_f64())),
            ('q', Value::String(s)) => out.push_str(&format!("\"{}\"", escape_string(s))),
            ('d' | 'f' | 'q', other) => {
                return Err(failed(format!(
                    "%{} cannot format a {}",
                    verb,
                    other.kind()
                )))
            }
            (verb, _) => return Err(failed(format!("unknown verb %{}", verb))),
        }
    }

    if rest.next().is_some() {
        return Err(failed("too many arguments for format string"));
    }
    Ok(Value::String(out))
}

fn join(args: &[Value]) -> Result<Value, FunctionError> {
    arity(args, 2)?;
    let items = array_arg(args, 0)?;
    let separator = string_arg(args, 1)?;
    let parts = items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            item.as_str().ok_or_else(|| {
                failed(format!("element {} is a {}, expected string", i, item.kind()))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Value::String(parts.join(separator)))
}

fn split(args: &[Value]) -> Result<Value, FunctionError> {
    arity(args, 2)?;
    let text = string_arg(args, 0)?;
    let separator = string_arg(args, 1)?;
    let parts: Vec<Value> = if separator.is_empty() {
        text.chars().map(|c| Value::String(c.to_string())).collect()
    } else {
        text.split(separator).map(Value::from).collect()
    };
    Ok(Value::Array(parts))
}

fn replace(args: &[Value]) -> Result<Value, FunctionError> {
    arity(args, 3)?;
    let text = string_arg(args, 0)?;
    let from = string_arg(args, 1)?;
    let to = string_arg(args, 2)?;
    Ok(Value::String(text.replace(from, to)))
}

fn to_lower(args: &[Value]) -> Result<Value, FunctionError> {
    map_string(args, str::to_lowercase)
}

fn to_upper(args: &[Value]) -> Result<Value, FunctionError> {
    map_string(args, str::to_uppercase)
}

fn trim_space(args: &[Value]) -> Result<Value, FunctionError> {
    map_string(args, |s| s.trim().to_string())
}

/// Strip any characters in the cutset from both ends.
fn trim(args: &[Value]) -> Result<Value, FunctionError> {
    arity(args, 2)?;
    let text = string_arg(args, 0)?;
    let cutset = string_arg(args, 1)?;
    Ok(Value::from(text.trim_matches(|c: char| cutset.contains(c))))
}

fn trim_prefix(args: &[Value]) -> Result<Value, FunctionError> {
    arity(args, 2)?;
    let text = string_arg(args, 0)?;
    let prefix = string_arg(args, 1)?;
    Ok(Value::from(text.strip_prefix(prefix).unwrap_or(text)))
}

fn trim_suffix(args: &[Value]) -> Result<Value, FunctionError> {
    arity(args, 2)?;
    let text = string_arg(args, 0)?;
    let suffix = string_arg(args, 1)?;
    Ok(Value::from(text.strip_suffix(suffix).unwrap_or(text)))
}

fn json_decode(args: &[Value]) -> Result<Value, FunctionError> {
    arity(args, 1)?;
    let text = string_arg(args, 0)?;
    serde_json::from_str::<JsonValue>(text)
        .map(|json| json.0)
        .map_err(|e| failed(format!("invalid JSON: {}", e)))
}

/// A JSON document read straight into a [`Value`]. Object keys keep their
/// source order and a repeated key is an error.
struct JsonValue(Value);

impl<'de> Deserialize<'de> for JsonValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(JsonVisitor).map(JsonValue)
    }
}

struct JsonVisitor;

impl<'de> Visitor<'de> for JsonVisitor {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a JSON value")
    }

    fn visit_unit<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Value, E> {
        Ok(Value::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Value, E> {
        Ok(Value::Number(Number::Int(v)))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Value, E> {
        Ok(Value::Number(match i64::try_from(v) {
            Ok(i) => Number::Int(i),
            Err(_) => Number::Uint(v),
        }))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Value, E> {
        Ok(Value::Number(Number::Float(v)))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Value, E> {
        Ok(Value::from(v))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Value, E> {
        Ok(Value::String(v))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Value, A::Error> {
        let mut items = Vec::new();
        while let Some(JsonValue(item)) = seq.next_element()? {
            items.push(item);
        }
        Ok(Value::Array(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Value, A::Error> {
        let mut object = Object::new();
        while let Some(key) = map.next_key::<String>()? {
            if object.contains_key(&key) {
                return Err(de::Error::custom(format!("duplicate key {:?}", key)));
            }
            let JsonValue(item) = map.next_value()?;
            object.insert(key, item);
        }
        Ok(Value::Object(object))
    }
}
