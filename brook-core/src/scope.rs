//! Read-only resolver for values exported by other blocks.

use crate::value::Value;
use std::collections::{BTreeMap, HashMap};

/// Resolves dotted reference paths such as `prometheus.remote_write.default.receiver`.
///
/// The evaluator only performs point-in-time lookups and copies out what it
/// needs; implementations own and mutate their storage independently.
pub trait Scope {
    fn lookup(&self, path: &str) -> Option<Value>;
}

/// A scope with nothing in it.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyScope;

impl Scope for EmptyScope {
    fn lookup(&self, _path: &str) -> Option<Value> {
        None
    }
}

impl Scope for HashMap<String, Value> {
    fn lookup(&self, path: &str) -> Option<Value> {
        self.get(path).cloned()
    }
}

impl Scope for BTreeMap<String, Value> {
    fn lookup(&self, path: &str) -> Option<Value> {
        self.get(path).cloned()
    }
}

impl<S: Scope + ?Sized> Scope for &S {
    fn lookup(&self, path: &str) -> Option<Value> {
        (**self).lookup(path)
    }
}

/// Layered scope: lookups try `self` first, then the parent.
#[derive(Debug, Clone, Default)]
pub struct Variables {
    values: HashMap<String, Value>,
    parent: Option<Box<Variables>>,
}

impl Variables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parent(parent: Variables) -> Self {
        Self {
            values: HashMap::new(),
            parent: Some(Box::new(parent)),
        }
    }

    pub fn set(&mut self, path: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.values.insert(path.into(), value.into());
        self
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Scope for Variables {
    fn lookup(&self, path: &str) -> Option<Value> {
        match self.values.get(path) {
            Some(value) => Some(value.clone()),
            None => self.parent.as_ref().and_then(|p| p.lookup(path)),
        }
    }
}
