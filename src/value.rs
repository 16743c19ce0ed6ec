use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use crate::errors::{Result, UsageError};
use crate::matcher::Operator;
use crate::types::{RecordType, Type};

/// Dynamic value compared by the engine.
///
/// Both sides of a comparison are `Value`s. Only the expected side gives
/// meaning to [`Value::Operator`] nodes.
#[derive(Clone)]
pub enum Value {
    /// Untyped nil: a dynamic slot holding no concrete value.
    Nil,
    Bool(bool),
    Int(i64),
    Uint(u64),
    Byte(u8),
    Float(f64),
    Char(char),
    Str(String),
    /// Non-nil error, carrying its message. A nil error is untyped
    /// [`Value::Nil`], as for any other interface slot.
    Error(String),
    Seq(Seq),
    Map(Map),
    Ptr(Ptr),
    Record(Record),
    /// Concrete value stored in an `any` slot.
    Dyn(Box<Value>),
    Handle(Handle),
    Operator(Operator),
}

/// Shape categories reported by [`Value::shape`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Shape {
    Nil,
    Scalar,
    Seq,
    Map,
    Ptr,
    Record,
    Dyn,
    Handle,
    Operator,
}

/// Dereferencing a nil (or never filled) pointer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NilDereference;

#[derive(Clone)]
pub struct Seq {
    pub elem: Type,
    /// `None` is a nil sequence, distinct from an empty one.
    pub items: Option<Vec<Value>>,
}

impl Seq {
    pub fn new(elem: Type, items: Vec<Value>) -> Self {
        Self { elem, items: Some(items) }
    }

    pub fn nil(elem: Type) -> Self {
        Self { elem, items: None }
    }

    pub fn items(&self) -> &[Value] {
        self.items.as_deref().unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.items().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items().is_empty()
    }
}

/// Map key. Only scalars can be keys, which keeps entries totally ordered.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Key {
    Bool(bool),
    Int(i64),
    Uint(u64),
    Byte(u8),
    Char(char),
    Str(String),
}

impl Key {
    pub fn to_value(&self) -> Value {
        match self {
            Key::Bool(b) => Value::Bool(*b),
            Key::Int(i) => Value::Int(*i),
            Key::Uint(u) => Value::Uint(*u),
            Key::Byte(b) => Value::Byte(*b),
            Key::Char(c) => Value::Char(*c),
            Key::Str(s) => Value::Str(s.clone()),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Bool(b) => write!(f, "{b}"),
            Key::Int(i) => write!(f, "{i}"),
            Key::Uint(u) => write!(f, "{u}"),
            Key::Byte(b) => write!(f, "{b}"),
            Key::Char(c) => write!(f, "{c:?}"),
            Key::Str(s) => write!(f, "{s:?}"),
        }
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::Str(s.to_string())
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key::Str(s)
    }
}

impl From<i64> for Key {
    fn from(i: i64) -> Self {
        Key::Int(i)
    }
}

#[derive(Clone)]
pub struct Map {
    pub key: Type,
    pub value: Type,
    /// `None` is a nil map.
    pub entries: Option<BTreeMap<Key, Value>>,
}

impl Map {
    pub fn new(key: Type, value: Type, entries: BTreeMap<Key, Value>) -> Self {
        Self { key, value, entries: Some(entries) }
    }

    pub fn nil(key: Type, value: Type) -> Self {
        Self { key, value, entries: None }
    }

    /// Entries in ascending key order.
    pub fn iter(&self) -> impl Iterator<Item = (&Key, &Value)> {
        self.entries.iter().flat_map(|e| e.iter())
    }

    pub fn get(&self, key: &Key) -> Option<&Value> {
        self.entries.as_ref().and_then(|e| e.get(key))
    }

    pub fn len(&self) -> usize {
        self.entries.as_ref().map_or(0, BTreeMap::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Pointer to a shared, set-once cell.
///
/// Cells are filled once and never change afterwards, which is what makes
/// building cyclic data possible without interior mutability at compare time.
#[derive(Clone)]
pub struct Ptr {
    pub elem: Type,
    target: Option<Arc<OnceLock<Value>>>,
}

/// Write end of a pointer created with [`Ptr::pending`].
pub struct Slot(Arc<OnceLock<Value>>);

impl Slot {
    /// Fills the cell. Filling twice keeps the first value.
    pub fn fill(self, value: Value) {
        let _ = self.0.set(value);
    }
}

impl Ptr {
    pub fn new(elem: Type, value: Value) -> Self {
        let cell = OnceLock::new();
        let _ = cell.set(value);
        Self { elem, target: Some(Arc::new(cell)) }
    }

    pub fn nil(elem: Type) -> Self {
        Self { elem, target: None }
    }

    /// Pointer whose target is provided later through the returned slot.
    pub fn pending(elem: Type) -> (Ptr, Slot) {
        let cell = Arc::new(OnceLock::new());
        (Self { elem, target: Some(cell.clone()) }, Slot(cell))
    }

    pub fn is_nil(&self) -> bool {
        self.target.is_none()
    }

    pub fn deref(&self) -> std::result::Result<&Value, NilDereference> {
        self.target
            .as_ref()
            .and_then(|cell| cell.get())
            .ok_or(NilDereference)
    }

    /// Address of the target cell, `None` for nil.
    pub fn identity(&self) -> Option<usize> {
        self.target.as_ref().map(|cell| Arc::as_ptr(cell) as usize)
    }
}

impl Drop for Ptr {
    // Releases chains hop by hop; a plain drop nests one call per hop.
    fn drop(&mut self) {
        let mut cells: Vec<_> = self.target.take().into_iter().collect();
        while let Some(cell) = cells.pop() {
            if let Some(mut value) = Arc::into_inner(cell).and_then(OnceLock::into_inner) {
                value.detach_targets(&mut cells);
            }
        }
    }
}

#[derive(Clone)]
pub struct Record {
    ty: Arc<RecordType>,
    values: Vec<Value>,
}

impl Record {
    /// Builds a record from its declared fields' values, embedded records
    /// being given as nested [`Value::Record`]s.
    pub fn new(ty: &Arc<RecordType>, values: Vec<Value>) -> Result<Self> {
        let expected = ty.fields().len();
        if values.len() != expected {
            return Err(UsageError::FieldCount {
                record: ty.name().to_string(),
                expected,
                got: values.len(),
            });
        }
        Ok(Self { ty: ty.clone(), values })
    }

    pub fn zero(ty: &Arc<RecordType>) -> Self {
        let values = ty.fields().iter().map(|f| f.ty.zero_value()).collect();
        Self { ty: ty.clone(), values }
    }

    pub fn record_type(&self) -> &Arc<RecordType> {
        &self.ty
    }

    /// Declared (non flattened) field values.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Field by promoted name, looking through embedded records.
    pub fn get(&self, name: &str) -> Option<&Value> {
        let flat = self.ty.lookup(name)?;
        self.at(&flat.index)
    }

    pub fn at(&self, index: &[usize]) -> Option<&Value> {
        let (first, rest) = index.split_first()?;
        let value = self.values.get(*first)?;
        if rest.is_empty() {
            return Some(value);
        }
        match value {
            Value::Record(inner) => inner.at(rest),
            _ => None,
        }
    }
}

static NEXT_HANDLE: AtomicU64 = AtomicU64::new(1);

/// Opaque nilable handle, equal only to itself.
#[derive(Clone)]
pub struct Handle {
    pub ty: String,
    id: Option<u64>,
}

impl Handle {
    pub fn new(ty: impl Into<String>) -> Self {
        Self {
            ty: ty.into(),
            id: Some(NEXT_HANDLE.fetch_add(1, Ordering::Relaxed)),
        }
    }

    pub fn nil(ty: impl Into<String>) -> Self {
        Self { ty: ty.into(), id: None }
    }

    pub fn id(&self) -> Option<u64> {
        self.id
    }
}

impl Value {
    /// Wraps a concrete value into an `any` slot. Nil stays untyped nil.
    pub fn dynamic(v: impl Into<Value>) -> Value {
        match v.into() {
            Value::Nil => Value::Nil,
            v @ (Value::Dyn(_) | Value::Operator(_)) => v,
            v => Value::Dyn(Box::new(v)),
        }
    }

    pub fn seq(elem: Type, items: impl IntoIterator<Item = impl Into<Value>>) -> Value {
        Value::Seq(Seq::new(elem, items.into_iter().map(Into::into).collect()))
    }

    /// `[]any` holding the given values.
    pub fn list(items: impl IntoIterator<Item = impl Into<Value>>) -> Value {
        Value::Seq(Seq::new(Type::Any, items.into_iter().map(Value::dynamic).collect()))
    }

    pub fn map<K: Into<Key>, V: Into<Value>>(
        key: Type,
        value: Type,
        entries: impl IntoIterator<Item = (K, V)>,
    ) -> Value {
        let entries = entries.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        Value::Map(Map::new(key, value, entries))
    }

    pub fn ptr(elem: Type, target: impl Into<Value>) -> Value {
        Value::Ptr(Ptr::new(elem, target.into()))
    }

    pub fn shape(&self) -> Shape {
        match self {
            Value::Nil => Shape::Nil,
            Value::Bool(_)
            | Value::Int(_)
            | Value::Uint(_)
            | Value::Byte(_)
            | Value::Float(_)
            | Value::Char(_)
            | Value::Str(_)
            | Value::Error(_) => Shape::Scalar,
            Value::Seq(_) => Shape::Seq,
            Value::Map(_) => Shape::Map,
            Value::Ptr(_) => Shape::Ptr,
            Value::Record(_) => Shape::Record,
            Value::Dyn(_) => Shape::Dyn,
            Value::Handle(_) => Shape::Handle,
            Value::Operator(_) => Shape::Operator,
        }
    }

    /// Concrete type, `None` for untyped nil.
    pub fn ty(&self) -> Option<Type> {
        Some(match self {
            Value::Nil => return None,
            Value::Bool(_) => Type::Bool,
            Value::Int(_) => Type::Int,
            Value::Uint(_) => Type::Uint,
            Value::Byte(_) => Type::Byte,
            Value::Float(_) => Type::Float,
            Value::Char(_) => Type::Char,
            Value::Str(_) => Type::Str,
            Value::Error(_) => Type::Error,
            Value::Seq(s) => Type::seq(s.elem.clone()),
            Value::Map(m) => Type::map(m.key.clone(), m.value.clone()),
            Value::Ptr(p) => Type::ptr(p.elem.clone()),
            Value::Record(r) => Type::Record(r.ty.clone()),
            Value::Dyn(inner) => return inner.ty(),
            Value::Handle(h) => Type::Handle(h.ty.clone()),
            Value::Operator(op) => op.type_behind().unwrap_or(Type::Any),
        })
    }

    /// Type name for reports, `nil` for untyped nil.
    pub fn type_name(&self) -> String {
        self.ty().map_or_else(|| "nil".to_string(), |t| t.to_string())
    }

    /// Moves out the targets of the pointers reachable without crossing
    /// another pointer.
    fn detach_targets(&mut self, out: &mut Vec<Arc<OnceLock<Value>>>) {
        match self {
            Value::Ptr(p) => out.extend(p.target.take()),
            Value::Seq(s) => s.items.iter_mut().flatten().for_each(|v| v.detach_targets(out)),
            Value::Map(m) => m
                .entries
                .iter_mut()
                .flat_map(BTreeMap::values_mut)
                .for_each(|v| v.detach_targets(out)),
            Value::Record(r) => r.values.iter_mut().for_each(|v| v.detach_targets(out)),
            Value::Dyn(inner) => inner.detach_targets(out),
            _ => {}
        }
    }

    /// Strips any dynamic wrapping.
    pub fn unwrap_dyn(&self) -> &Value {
        match self {
            Value::Dyn(inner) => inner.unwrap_dyn(),
            v => v,
        }
    }

    /// Untyped nil, or a nil of a nilable type.
    pub fn is_nil(&self) -> bool {
        match self.unwrap_dyn() {
            Value::Nil => true,
            Value::Seq(s) => s.items.is_none(),
            Value::Map(m) => m.entries.is_none(),
            Value::Ptr(p) => p.is_nil(),
            Value::Handle(h) => h.id.is_none(),
            _ => false,
        }
    }

    pub fn as_operator(&self) -> Option<&Operator> {
        match self {
            Value::Operator(op) => Some(op),
            _ => None,
        }
    }

    /// String form of strings, errors and records with a stringer.
    pub fn string_form(&self) -> Option<String> {
        match self.unwrap_dyn() {
            Value::Str(s) | Value::Error(s) => Some(s.clone()),
            Value::Record(r) => r.ty.stringer().map(|f| f(r)),
            _ => None,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&crate::render::Renderer::default().value(self))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<u64> for Value {
    fn from(u: u64) -> Self {
        Value::Uint(u)
    }
}

impl From<u8> for Value {
    fn from(b: u8) -> Self {
        Value::Byte(b)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<char> for Value {
    fn from(c: char) -> Self {
        Value::Char(c)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<Record> for Value {
    fn from(r: Record) -> Self {
        Value::Record(r)
    }
}

impl From<Operator> for Value {
    fn from(op: Operator) -> Self {
        Value::Operator(op)
    }
}

impl From<Ptr> for Value {
    fn from(p: Ptr) -> Self {
        Value::Ptr(p)
    }
}

impl<T: Into<Value> + FromValue> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::seq(T::param_type(), items)
    }
}

/// Conversion back from a [`Value`] into a Rust type, used to feed
/// predicates. `param_type` is the type a value must be assignable to.
pub trait FromValue: Sized {
    fn param_type() -> Type;
    fn from_value(v: &Value) -> Option<Self>;
}

macro_rules! scalar_from_value {
    ($t:ty, $variant:ident, $ty:expr) => {
        impl FromValue for $t {
            fn param_type() -> Type {
                $ty
            }

            fn from_value(v: &Value) -> Option<Self> {
                match v.unwrap_dyn() {
                    Value::$variant(x) => Some(x.clone()),
                    _ => None,
                }
            }
        }
    };
}

scalar_from_value!(bool, Bool, Type::Bool);
scalar_from_value!(i64, Int, Type::Int);
scalar_from_value!(u64, Uint, Type::Uint);
scalar_from_value!(u8, Byte, Type::Byte);
scalar_from_value!(f64, Float, Type::Float);
scalar_from_value!(char, Char, Type::Char);
scalar_from_value!(String, Str, Type::Str);

impl FromValue for Value {
    fn param_type() -> Type {
        Type::Any
    }

    fn from_value(v: &Value) -> Option<Self> {
        Some(v.clone())
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn param_type() -> Type {
        Type::seq(T::param_type())
    }

    fn from_value(v: &Value) -> Option<Self> {
        match v.unwrap_dyn() {
            Value::Seq(s) => s.items().iter().map(T::from_value).collect(),
            _ => None,
        }
    }
}
