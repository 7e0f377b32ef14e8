//! Opaque native handles and function values.
//!
//! Both are compared by identity and are never decomposed by the runtime.

use crate::error::FunctionError;
use crate::value::Value;
use std::any::{type_name, Any};
use std::fmt;
use std::sync::Arc;

// ============================================================================
// CAPSULE
// ============================================================================

/// A native value carried through the language by identity.
///
/// A capsule may remember the dotted path it was exported under; the
/// builder renders such capsules as a reference to that path instead of
/// failing.
#[derive(Clone)]
pub struct Capsule {
    inner: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
    reference: Option<String>,
}

impl Capsule {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self::from_arc(Arc::new(value))
    }

    pub fn from_arc<T: Any + Send + Sync>(value: Arc<T>) -> Self {
        Self {
            inner: value,
            type_name: type_name::<T>(),
            reference: None,
        }
    }

    /// Attach the dotted path this capsule is exported under.
    pub fn with_reference(mut self, path: impl Into<String>) -> Self {
        self.reference = Some(path.into());
        self
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn reference(&self) -> Option<&str> {
        self.reference.as_deref()
    }

    pub fn is<T: Any + Send + Sync>(&self) -> bool {
        self.inner.is::<T>()
    }

    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.inner).downcast::<T>().ok()
    }

    fn addr(&self) -> *const () {
        Arc::as_ptr(&self.inner) as *const ()
    }
}

impl PartialEq for Capsule {
    fn eq(&self, other: &Self) -> bool {
        self.addr() == other.addr()
    }
}

impl fmt::Debug for Capsule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capsule")
            .field("type_name", &self.type_name)
            .field("reference", &self.reference)
            .finish()
    }
}

// ============================================================================
// HANDLE
// ============================================================================

/// Typed view of a capsule, used as a native field type.
///
/// Decoding accepts only capsules holding a `T`; two handles are equal when
/// they point at the same allocation.
pub struct Handle<T> {
    value: Arc<T>,
    reference: Option<String>,
}

impl<T: Any + Send + Sync> Handle<T> {
    pub fn new(value: T) -> Self {
        Self {
            value: Arc::new(value),
            reference: None,
        }
    }

    /// A handle the builder renders as a reference to `path`.
    pub fn referenced(path: impl Into<String>, value: T) -> Self {
        Self {
            value: Arc::new(value),
            reference: Some(path.into()),
        }
    }

    pub fn from_arc(value: Arc<T>) -> Self {
        Self {
            value,
            reference: None,
        }
    }

    pub fn with_reference(mut self, path: impl Into<String>) -> Self {
        self.reference = Some(path.into());
        self
    }

    pub fn get(&self) -> &T {
        &self.value
    }

    pub fn arc(&self) -> &Arc<T> {
        &self.value
    }

    pub fn reference(&self) -> Option<&str> {
        self.reference.as_deref()
    }

    pub fn to_capsule(&self) -> Capsule {
        let capsule = Capsule::from_arc(Arc::clone(&self.value));
        match &self.reference {
            Some(path) => capsule.with_reference(path.clone()),
            None => capsule,
        }
    }
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        Self {
            value: Arc::clone(&self.value),
            reference: self.reference.clone(),
        }
    }
}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.value, &other.value)
    }
}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("type_name", &type_name::<T>())
            .field("reference", &self.reference)
            .finish()
    }
}

// ============================================================================
// FUNCTION
// ============================================================================

type NativeFn = dyn Fn(&[Value]) -> Result<Value, FunctionError> + Send + Sync;

/// A callable value. Builtins live in the evaluator's standard library;
/// scopes may export additional functions.
#[derive(Clone)]
pub struct Function {
    name: String,
    func: Arc<NativeFn>,
}

impl Function {
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, FunctionError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call(&self, args: &[Value]) -> Result<Value, FunctionError> {
        (self.func)(args)
    }
}

impl PartialEq for Function {
    fn eq(&self, other: &Self) -> bool {
        Arc::as_ptr(&self.func) as *const () == Arc::as_ptr(&other.func) as *const ()
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function").field("name", &self.name).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Receiver(u32);

    #[test]
    fn test_capsule_identity() {
        let a = Capsule::new(Receiver(1));
        let b = Capsule::new(Receiver(1));
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }

    #[test]
    fn test_capsule_downcast() {
        let capsule = Capsule::new(Receiver(7));
        assert!(capsule.is::<Receiver>());
        assert_eq!(capsule.downcast::<Receiver>().map(|r| r.0), Some(7));
        assert!(capsule.downcast::<String>().is_none());
    }

    #[test]
    fn test_handle_round_trips_through_capsule() {
        let handle = Handle::referenced("loki.write.default.receiver", Receiver(3));
        let capsule = handle.to_capsule();
        assert_eq!(capsule.reference(), Some("loki.write.default.receiver"));

        let back = capsule.downcast::<Receiver>().map(Handle::from_arc);
        assert_eq!(back.as_ref(), Some(&handle));
    }

    #[test]
    fn test_function_call() {
        let double = Function::new("double", |args: &[Value]| match args {
            [Value::Number(n)] => Ok(Value::from(n.as_f64() * 2.0)),
            _ => Err(FunctionError::ArgumentCount {
                expected: 1,
                got: args.len(),
            }),
        });
        assert_eq!(double.call(&[Value::from(2)]), Ok(Value::from(4.0)));
        assert!(double.call(&[]).is_err());
    }
}
