//! Field-descriptor tables for native block types.
//!
//! A type describes its language-visible fields once, through
//! [`SchemaBuilder`]. The resulting [`Schema`] drives both decoding (the VM
//! assigns fields by name) and encoding (the builder walks fields in
//! registration order). Schemas are reflected lazily and cached per type.

use crate::builder;
use crate::error::{BuildError, DecodeError, SchemaError};
use crate::lexer::is_identifier;
use crate::parser::{BlockStmt, Stmt};
use crate::vm;
use brook_core::{AttrValue, CoerceError, Object, Scope, Value};
use once_cell::sync::Lazy;
use std::any::{type_name, Any, TypeId};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock};

// ============================================================================
// DEFAULTING PROTOCOL
// ============================================================================

/// A native type that can be decoded from, and encoded as, a block body.
///
/// ```
/// use brook_lang::{Block, SchemaBuilder};
///
/// #[derive(Debug, Clone, Default, PartialEq)]
/// struct Endpoint {
///     url: String,
///     retries: u32,
/// }
///
/// impl Block for Endpoint {
///     fn schema(s: &mut SchemaBuilder<Self>) {
///         s.attr("url", |e| &e.url, |e| &mut e.url);
///         s.attr("retries", |e| &e.retries, |e| &mut e.retries).optional();
///     }
///
///     fn defaults() -> Option<Self> {
///         Some(Endpoint { url: String::new(), retries: 3 })
///     }
/// }
/// ```
pub trait Block: Default + Clone + PartialEq + Send + Sync + 'static {
    /// Register the fields of this type.
    fn schema(s: &mut SchemaBuilder<Self>);

    /// The default-initialised value. `None` means the zero value
    /// (`Default::default()`).
    fn defaults() -> Option<Self> {
        None
    }
}

/// The value a freshly created `T` starts from.
pub fn default_value<T: Block>() -> T {
    T::defaults().unwrap_or_default()
}

// ============================================================================
// FIELD DESCRIPTORS
// ============================================================================

/// Whether a field is written as `name = value` or as `name { ... }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldRole {
    Attribute,
    Block,
}

impl FieldRole {
    pub fn as_str(self) -> &'static str {
        match self {
            FieldRole::Attribute => "attribute",
            FieldRole::Block => "block",
        }
    }
}

/// How many statements a field accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cardinality {
    Single,
    /// `Option<B>`; absent means `None`.
    OptionalSingle,
    /// `Vec<B>`; one statement per element.
    Repeated,
}

/// Descriptor of one language-visible field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldInfo {
    pub owner: &'static str,
    pub name: String,
    pub role: FieldRole,
    pub cardinality: Cardinality,
    pub required: bool,
    /// The field's block type supplies its own defaults.
    pub defaulted: bool,
}

/// Type-erased operations on one field of `T`.
pub(crate) trait FieldAccess<T>: Send + Sync {
    fn matches_default(&self, value: &T, default: &T) -> bool;

    /// Statements for the field's current value.
    fn encode(&self, value: &T, name: &str) -> Result<Vec<Stmt>, BuildError>;

    /// Assign a dynamic value (attribute value or object entry).
    fn assign(&self, target: &mut T, value: Value) -> Result<(), CoerceError>;

    /// The field's value in dynamic form.
    fn export(&self, value: &T) -> Result<Value, CoerceError>;

    /// Decode a block statement into the field. `first` is true for the
    /// first statement naming a repeated field.
    fn decode_block(
        &self,
        _target: &mut T,
        _block: &BlockStmt,
        _first: bool,
        _scope: &dyn Scope,
    ) -> Result<(), DecodeError> {
        Ok(())
    }
}

type Getter<T, F> = Box<dyn Fn(&T) -> &F + Send + Sync>;
type Setter<T, F> = Box<dyn Fn(&mut T) -> &mut F + Send + Sync>;

struct AttrField<T, F> {
    get: Getter<T, F>,
    get_mut: Setter<T, F>,
}

impl<T, F: AttrValue> FieldAccess<T> for AttrField<T, F> {
    fn matches_default(&self, value: &T, default: &T) -> bool {
        (self.get)(value) == (self.get)(default)
    }

    fn encode(&self, value: &T, name: &str) -> Result<Vec<Stmt>, BuildError> {
        let dynamic = self.export(value).map_err(|source| BuildError::Convert {
            name: name.to_string(),
            source,
        })?;
        Ok(vec![builder::attribute_stmt(name, builder::expr_from_value(&dynamic)?)])
    }

    fn assign(&self, target: &mut T, value: Value) -> Result<(), CoerceError> {
        *(self.get_mut)(target) = F::from_value(value)?;
        Ok(())
    }

    fn export(&self, value: &T) -> Result<Value, CoerceError> {
        (self.get)(value).to_value()
    }
}

struct BlockField<T, B> {
    get: Getter<T, B>,
    get_mut: Setter<T, B>,
}

impl<T, B: Block> FieldAccess<T> for BlockField<T, B> {
    fn matches_default(&self, value: &T, default: &T) -> bool {
        (self.get)(value) == (self.get)(default)
    }

    fn encode(&self, value: &T, name: &str) -> Result<Vec<Stmt>, BuildError> {
        Ok(vec![builder::block_stmt(name, (self.get)(value))?])
    }

    fn assign(&self, target: &mut T, value: Value) -> Result<(), CoerceError> {
        *(self.get_mut)(target) = object_to_block(value)?;
        Ok(())
    }

    fn export(&self, value: &T) -> Result<Value, CoerceError> {
        block_to_object((self.get)(value))
    }

    fn decode_block(
        &self,
        target: &mut T,
        block: &BlockStmt,
        _first: bool,
        scope: &dyn Scope,
    ) -> Result<(), DecodeError> {
        *(self.get_mut)(target) = vm::decode_block::<B>(block, scope)?;
        Ok(())
    }
}

struct OptionalBlockField<T, B> {
    get: Getter<T, Option<B>>,
    get_mut: Setter<T, Option<B>>,
}

impl<T, B: Block> FieldAccess<T> for OptionalBlockField<T, B> {
    fn matches_default(&self, value: &T, default: &T) -> bool {
        (self.get)(value) == (self.get)(default)
    }

    fn encode(&self, value: &T, name: &str) -> Result<Vec<Stmt>, BuildError> {
        match (self.get)(value) {
            Some(inner) => Ok(vec![builder::block_stmt(name, inner)?]),
            None => Ok(Vec::new()),
        }
    }

    fn assign(&self, target: &mut T, value: Value) -> Result<(), CoerceError> {
        *(self.get_mut)(target) = match value {
            Value::Null => None,
            other => Some(object_to_block(other)?),
        };
        Ok(())
    }

    fn export(&self, value: &T) -> Result<Value, CoerceError> {
        match (self.get)(value) {
            Some(inner) => block_to_object(inner),
            None => Ok(Value::Null),
        }
    }

    fn decode_block(
        &self,
        target: &mut T,
        block: &BlockStmt,
        _first: bool,
        scope: &dyn Scope,
    ) -> Result<(), DecodeError> {
        *(self.get_mut)(target) = Some(vm::decode_block::<B>(block, scope)?);
        Ok(())
    }
}

struct RepeatedBlockField<T, B> {
    get: Getter<T, Vec<B>>,
    get_mut: Setter<T, Vec<B>>,
}

impl<T, B: Block> FieldAccess<T> for RepeatedBlockField<T, B> {
    fn matches_default(&self, value: &T, default: &T) -> bool {
        (self.get)(value) == (self.get)(default)
    }

    fn encode(&self, value: &T, name: &str) -> Result<Vec<Stmt>, BuildError> {
        (self.get)(value)
            .iter()
            .map(|inner| builder::block_stmt(name, inner))
            .collect()
    }

    fn assign(&self, target: &mut T, value: Value) -> Result<(), CoerceError> {
        let items = match value {
            Value::Array(items) => items,
            other => return Err(CoerceError::mismatch("array of objects", other.kind())),
        };
        let blocks = items
            .into_iter()
            .enumerate()
            .map(|(i, item)| object_to_block(item).map_err(|e| e.at_index(i)))
            .collect::<Result<Vec<B>, _>>()?;
        *(self.get_mut)(target) = blocks;
        Ok(())
    }

    fn export(&self, value: &T) -> Result<Value, CoerceError> {
        (self.get)(value)
            .iter()
            .map(block_to_object)
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array)
    }

    fn decode_block(
        &self,
        target: &mut T,
        block: &BlockStmt,
        first: bool,
        scope: &dyn Scope,
    ) -> Result<(), DecodeError> {
        let decoded = vm::decode_block::<B>(block, scope)?;
        let items = (self.get_mut)(target);
        if first {
            items.clear();
        }
        items.push(decoded);
        Ok(())
    }
}

pub(crate) struct FieldEntry<T> {
    pub(crate) info: FieldInfo,
    pub(crate) access: Box<dyn FieldAccess<T>>,
}

struct LabelAccess<T> {
    get: Getter<T, String>,
    get_mut: Setter<T, String>,
}

// ============================================================================
// SCHEMA BUILDER
// ============================================================================

/// Collects field registrations for `T`. See [`Block::schema`].
pub struct SchemaBuilder<T> {
    owner: &'static str,
    fields: Vec<FieldEntry<T>>,
    labels: Vec<LabelAccess<T>>,
}

/// Returned by each registration; marks the field optional.
pub struct FieldHandle<'a> {
    info: &'a mut FieldInfo,
}

impl FieldHandle<'_> {
    /// The field may be absent from the source, and is omitted on encode
    /// while it equals the enclosing type's default.
    pub fn optional(self) -> Self {
        self.info.required = false;
        self
    }
}

impl<T: Block> SchemaBuilder<T> {
    fn new() -> Self {
        Self {
            owner: short_type_name::<T>(),
            fields: Vec::new(),
            labels: Vec::new(),
        }
    }

    fn push(
        &mut self,
        name: &str,
        role: FieldRole,
        cardinality: Cardinality,
        defaulted: bool,
        access: Box<dyn FieldAccess<T>>,
    ) -> FieldHandle<'_> {
        self.fields.push(FieldEntry {
            info: FieldInfo {
                owner: self.owner,
                name: name.to_string(),
                role,
                cardinality,
                required: true,
                defaulted,
            },
            access,
        });
        let last = self.fields.len() - 1;
        FieldHandle {
            info: &mut self.fields[last].info,
        }
    }

    /// Register an attribute: `name = value`.
    pub fn attr<F, G, M>(&mut self, name: &str, get: G, get_mut: M) -> FieldHandle<'_>
    where
        F: AttrValue,
        G: Fn(&T) -> &F + Send + Sync + 'static,
        M: Fn(&mut T) -> &mut F + Send + Sync + 'static,
    {
        let access = AttrField {
            get: Box::new(get),
            get_mut: Box::new(get_mut),
        };
        self.push(
            name,
            FieldRole::Attribute,
            Cardinality::Single,
            false,
            Box::new(access),
        )
    }

    /// Register a nested block that appears at most once.
    pub fn block<B, G, M>(&mut self, name: &str, get: G, get_mut: M) -> FieldHandle<'_>
    where
        B: Block,
        G: Fn(&T) -> &B + Send + Sync + 'static,
        M: Fn(&mut T) -> &mut B + Send + Sync + 'static,
    {
        let access = BlockField {
            get: Box::new(get),
            get_mut: Box::new(get_mut),
        };
        self.push(
            name,
            FieldRole::Block,
            Cardinality::Single,
            B::defaults().is_some(),
            Box::new(access),
        )
    }

    /// Register an `Option<B>` block; absent source leaves it `None`
    /// unless the enclosing default says otherwise.
    pub fn block_opt<B, G, M>(&mut self, name: &str, get: G, get_mut: M) -> FieldHandle<'_>
    where
        B: Block,
        G: Fn(&T) -> &Option<B> + Send + Sync + 'static,
        M: Fn(&mut T) -> &mut Option<B> + Send + Sync + 'static,
    {
        let access = OptionalBlockField {
            get: Box::new(get),
            get_mut: Box::new(get_mut),
        };
        self.push(
            name,
            FieldRole::Block,
            Cardinality::OptionalSingle,
            B::defaults().is_some(),
            Box::new(access),
        )
    }

    /// Register a repeated block, one statement per `Vec` element.
    pub fn blocks<B, G, M>(&mut self, name: &str, get: G, get_mut: M) -> FieldHandle<'_>
    where
        B: Block,
        G: Fn(&T) -> &Vec<B> + Send + Sync + 'static,
        M: Fn(&mut T) -> &mut Vec<B> + Send + Sync + 'static,
    {
        let access = RepeatedBlockField {
            get: Box::new(get),
            get_mut: Box::new(get_mut),
        };
        self.push(
            name,
            FieldRole::Block,
            Cardinality::Repeated,
            B::defaults().is_some(),
            Box::new(access),
        )
    }

    /// Bind the block label to a `String` field.
    pub fn label<G, M>(&mut self, get: G, get_mut: M)
    where
        G: Fn(&T) -> &String + Send + Sync + 'static,
        M: Fn(&mut T) -> &mut String + Send + Sync + 'static,
    {
        self.labels.push(LabelAccess {
            get: Box::new(get),
            get_mut: Box::new(get_mut),
        });
    }

    fn finish(self) -> Result<Schema<T>, SchemaError> {
        self.validate()?;

        let index = self
            .fields
            .iter()
            .enumerate()
            .map(|(i, entry)| (entry.info.name.clone(), i))
            .collect();

        Ok(Schema {
            owner: self.owner,
            fields: self.fields,
            index,
            label: self.labels.into_iter().next(),
        })
    }

    fn validate(&self) -> Result<(), SchemaError> {
        let mut seen = HashSet::new();
        for entry in &self.fields {
            let name = &entry.info.name;
            let valid = match entry.info.role {
                FieldRole::Attribute => is_identifier(name),
                FieldRole::Block => name.split('.').all(is_identifier),
            };
            if !valid {
                return Err(SchemaError::InvalidName {
                    owner: self.owner,
                    name: name.clone(),
                    role: entry.info.role.as_str(),
                });
            }
            if !seen.insert(name.as_str()) {
                return Err(SchemaError::DuplicateName {
                    owner: self.owner,
                    name: name.clone(),
                });
            }
        }

        if self.labels.len() > 1 {
            return Err(SchemaError::DuplicateLabel { owner: self.owner });
        }
        Ok(())
    }
}

// ============================================================================
// SCHEMA
// ============================================================================

/// Reflected field table of `T`, in registration order.
pub struct Schema<T> {
    owner: &'static str,
    fields: Vec<FieldEntry<T>>,
    index: HashMap<String, usize>,
    label: Option<LabelAccess<T>>,
}

impl<T: Block> Schema<T> {
    /// Short name of the described type, used in messages.
    pub fn owner(&self) -> &'static str {
        self.owner
    }

    pub fn fields(&self) -> impl Iterator<Item = &FieldInfo> {
        self.fields.iter().map(|entry| &entry.info)
    }

    pub fn field(&self, name: &str) -> Option<&FieldInfo> {
        self.entry(name).map(|entry| &entry.info)
    }

    pub fn has_label(&self) -> bool {
        self.label.is_some()
    }

    pub fn label_of<'v>(&self, value: &'v T) -> Option<&'v str> {
        self.label.as_ref().map(|label| (label.get)(value).as_str())
    }

    pub(crate) fn set_label(&self, target: &mut T, label: String) {
        if let Some(access) = &self.label {
            *(access.get_mut)(target) = label;
        }
    }

    pub(crate) fn entries(&self) -> &[FieldEntry<T>] {
        &self.fields
    }

    pub(crate) fn entry(&self, name: &str) -> Option<&FieldEntry<T>> {
        self.index.get(name).map(|&i| &self.fields[i])
    }
}

type SchemaCache = RwLock<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>;

static SCHEMAS: Lazy<SchemaCache> = Lazy::new(|| RwLock::new(HashMap::new()));

/// The cached schema of `T`, reflecting it on first use.
pub fn schema_of<T: Block>() -> Result<Arc<Schema<T>>, SchemaError> {
    let id = TypeId::of::<T>();

    let cached = {
        let cache = SCHEMAS.read().unwrap_or_else(PoisonError::into_inner);
        cache.get(&id).cloned()
    };
    if let Some(schema) = cached.and_then(|any| any.downcast::<Schema<T>>().ok()) {
        return Ok(schema);
    }

    let mut builder = SchemaBuilder::<T>::new();
    T::schema(&mut builder);
    let schema = Arc::new(builder.finish()?);
    tracing::debug!(
        target: "brook::schema",
        owner = schema.owner,
        fields = schema.fields.len(),
        label = schema.has_label(),
        "reflected schema"
    );

    let mut cache = SCHEMAS.write().unwrap_or_else(PoisonError::into_inner);
    let stored = cache
        .entry(id)
        .or_insert_with(|| Arc::clone(&schema) as Arc<dyn Any + Send + Sync>);
    Ok(Arc::clone(stored).downcast::<Schema<T>>().unwrap_or(schema))
}

fn short_type_name<T>() -> &'static str {
    let full = type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    match base.rfind("::") {
        Some(i) => &full[i + 2..],
        None => full,
    }
}

// ============================================================================
// OBJECT FORM
// ============================================================================

/// Build a block value from an object, key by key, starting from the
/// type's default. Unknown keys and missing required keys are errors.
pub fn object_to_block<B: Block>(value: Value) -> Result<B, CoerceError> {
    let object = match value {
        Value::Object(object) => object,
        other => return Err(CoerceError::mismatch("object", other.kind())),
    };
    let schema = schema_of::<B>().map_err(|e| CoerceError::Custom {
        message: e.to_string(),
    })?;

    let mut target = default_value::<B>();
    let mut assigned = HashSet::new();
    for (key, item) in object {
        let entry = schema
            .entry(&key)
            .ok_or_else(|| CoerceError::UnknownKey { key: key.clone() })?;
        entry
            .access
            .assign(&mut target, item)
            .map_err(|e| e.at_key(key.clone()))?;
        assigned.insert(key);
    }

    if let Some(missing) = schema
        .fields()
        .find(|info| info.required && !assigned.contains(&info.name))
    {
        return Err(CoerceError::MissingKey {
            key: missing.name.clone(),
        });
    }
    Ok(target)
}

/// Object form of a block value, one key per field in registration order.
pub fn block_to_object<B: Block>(value: &B) -> Result<Value, CoerceError> {
    let schema = schema_of::<B>().map_err(|e| CoerceError::Custom {
        message: e.to_string(),
    })?;
    let mut object = Object::new();
    for entry in schema.entries() {
        let item = entry
            .access
            .export(value)
            .map_err(|e| e.at_key(entry.info.name.clone()))?;
        object.insert(entry.info.name.clone(), item);
    }
    Ok(Value::Object(object))
}

/// Adapter that lets a block type be used as an object-valued attribute.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlockObject<B>(pub B);

impl<B: Block> AttrValue for BlockObject<B> {
    fn from_value(value: Value) -> Result<Self, CoerceError> {
        object_to_block(value).map(BlockObject)
    }

    fn to_value(&self) -> Result<Value, CoerceError> {
        block_to_object(&self.0)
    }
}
