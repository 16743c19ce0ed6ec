use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, OnceLock};

use itertools::Itertools;

use crate::errors::{Result, UsageError};
use crate::value::{Map, Ptr, Record, Seq, Value};

/// Type descriptor of a [`Value`].
///
/// Records compare by identity of their [`RecordType`]: two record types
/// declared separately are different types even when they share a name.
#[derive(Clone, PartialEq)]
pub enum Type {
    Bool,
    Int,
    Uint,
    Byte,
    Float,
    Char,
    Str,
    /// Error interface: holds a [`Value::Error`] or untyped nil.
    Error,
    /// Dynamic slot accepting any concrete value (or nil).
    Any,
    Seq(Box<Type>),
    Map(Box<Type>, Box<Type>),
    Ptr(Box<Type>),
    Record(Arc<RecordType>),
    /// Opaque nilable handle such as a function or a channel.
    Handle(String),
}

impl Type {
    pub fn seq(elem: Type) -> Type {
        Type::Seq(Box::new(elem))
    }

    pub fn map(key: Type, value: Type) -> Type {
        Type::Map(Box::new(key), Box::new(value))
    }

    pub fn ptr(elem: Type) -> Type {
        Type::Ptr(Box::new(elem))
    }

    /// Whether a nil of this type exists.
    pub fn is_nilable(&self) -> bool {
        matches!(
            self,
            Type::Any
                | Type::Error
                | Type::Seq(_)
                | Type::Map(..)
                | Type::Ptr(_)
                | Type::Handle(_)
        )
    }

    /// A value of type `self` can be stored in a slot of type `target`.
    pub fn assignable_to(&self, target: &Type) -> bool {
        target == &Type::Any || self == target
    }

    /// Nil typed as `self`, or `None` when the type has no nil.
    pub fn typed_nil(&self) -> Option<Value> {
        Some(match self {
            // interface slots hold untyped nil
            Type::Any | Type::Error => Value::Nil,
            Type::Seq(elem) => Value::Seq(Seq::nil((**elem).clone())),
            Type::Map(k, v) => Value::Map(Map::nil((**k).clone(), (**v).clone())),
            Type::Ptr(elem) => Value::Ptr(Ptr::nil((**elem).clone())),
            Type::Handle(name) => Value::Handle(crate::value::Handle::nil(name.clone())),
            _ => return None,
        })
    }

    pub fn zero_value(&self) -> Value {
        if let Some(nil) = self.typed_nil() {
            return nil;
        }
        match self {
            Type::Bool => Value::Bool(false),
            Type::Int => Value::Int(0),
            Type::Uint => Value::Uint(0),
            Type::Byte => Value::Byte(0),
            Type::Float => Value::Float(0.0),
            Type::Char => Value::Char('\0'),
            Type::Str => Value::Str(String::new()),
            Type::Record(rt) => Value::Record(Record::zero(rt)),
            // nilable types were handled above
            _ => Value::Nil,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Bool => f.write_str("bool"),
            Type::Int => f.write_str("int"),
            Type::Uint => f.write_str("uint"),
            Type::Byte => f.write_str("byte"),
            Type::Float => f.write_str("float"),
            Type::Char => f.write_str("char"),
            Type::Str => f.write_str("string"),
            Type::Error => f.write_str("error"),
            Type::Any => f.write_str("any"),
            Type::Seq(elem) => write!(f, "[]{elem}"),
            Type::Map(k, v) => write!(f, "map[{k}]{v}"),
            Type::Ptr(elem) => write!(f, "*{elem}"),
            Type::Record(rt) => f.write_str(rt.name()),
            Type::Handle(name) => f.write_str(name),
        }
    }
}

impl fmt::Debug for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl FromStr for Type {
    type Err = UsageError;

    /// Parses the names produced by `Display`, records and handles excepted.
    fn from_str(s: &str) -> Result<Type> {
        let s = s.trim();
        let unknown = || UsageError::UnknownType(s.to_string());
        if let Some(rest) = s.strip_prefix("[]") {
            return Ok(Type::seq(rest.parse()?));
        }
        if let Some(rest) = s.strip_prefix('*') {
            return Ok(Type::ptr(rest.parse()?));
        }
        if let Some(rest) = s.strip_prefix("map[") {
            // keys are never composite, so the first `]` closes them
            let (key, value) = rest.split_once(']').ok_or_else(unknown)?;
            return Ok(Type::map(key.parse()?, value.parse()?));
        }
        Ok(match s {
            "bool" => Type::Bool,
            "int" => Type::Int,
            "uint" => Type::Uint,
            "byte" => Type::Byte,
            "float" => Type::Float,
            "char" => Type::Char,
            "string" => Type::Str,
            "error" => Type::Error,
            "any" => Type::Any,
            _ => return Err(unknown()),
        })
    }
}

/// A declared field of a record type.
#[derive(Clone, Debug)]
pub struct FieldDef {
    pub name: String,
    pub ty: Type,
    /// Embedded fields contribute their own fields to the outer namespace.
    pub embedded: bool,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self { name: name.into(), ty, embedded: false }
    }

    /// Embeds `rt`; the field is named after the record type.
    pub fn embed(rt: &Arc<RecordType>) -> Self {
        Self {
            name: rt.name().to_string(),
            ty: Type::Record(rt.clone()),
            embedded: true,
        }
    }
}

/// Leaf of the flattened field list.
#[derive(Clone, Debug)]
pub struct FlatField {
    /// Promoted name, or `Outer.Inner` when shadowed or ambiguous.
    pub name: String,
    /// Field indexes from the outermost record down to the leaf.
    pub index: Vec<usize>,
    pub depth: usize,
}

pub type Stringer = fn(&Record) -> String;

/// Named record (struct) type.
pub struct RecordType {
    name: String,
    fields: OnceLock<Vec<FieldDef>>,
    flat: OnceLock<Vec<FlatField>>,
    stringer: OnceLock<Stringer>,
}

impl RecordType {
    pub fn new(name: impl Into<String>, fields: Vec<FieldDef>) -> Arc<RecordType> {
        let rt = Self::declare(name);
        let _ = rt.fields.set(fields);
        rt
    }

    /// Declares a record without fields yet, so that its fields can refer
    /// to it (through a pointer).
    pub fn declare(name: impl Into<String>) -> Arc<RecordType> {
        Arc::new(RecordType {
            name: name.into(),
            fields: OnceLock::new(),
            flat: OnceLock::new(),
            stringer: OnceLock::new(),
        })
    }

    pub fn define(&self, fields: Vec<FieldDef>) -> Result<()> {
        self.fields
            .set(fields)
            .map_err(|_| UsageError::AlreadyDefined(self.name.clone()))
    }

    /// Gives values of this type a string form, used by `Contains`.
    pub fn set_stringer(&self, f: Stringer) -> Result<()> {
        self.stringer
            .set(f)
            .map_err(|_| UsageError::AlreadyDefined(format!("{}.stringer", self.name)))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[FieldDef] {
        self.fields.get().map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn stringer(&self) -> Option<Stringer> {
        self.stringer.get().copied()
    }

    /// Flattened leaf fields in depth-first declaration order.
    pub fn flat_fields(&self) -> &[FlatField] {
        self.flat.get_or_init(|| self.flatten())
    }

    /// Display name of the (possibly nested) field at `index`.
    pub fn field_name(&self, index: &[usize]) -> Option<&str> {
        self.flat_fields()
            .iter()
            .find(|f| f.index == index)
            .map(|f| f.name.as_str())
    }

    /// Looks up a promoted field by name.
    pub fn lookup(&self, name: &str) -> Option<&FlatField> {
        self.flat_fields().iter().find(|f| f.name == name)
    }

    fn flatten(&self) -> Vec<FlatField> {
        let mut leaves = Vec::new();
        let mut seen = Vec::new();
        collect_leaves(self, &mut Vec::new(), &mut Vec::new(), &mut seen, &mut leaves);

        // shallowest wins; two leaves at the same shallowest depth cancel out
        let mut best: HashMap<&str, (usize, usize)> = HashMap::new();
        for (names, _) in &leaves {
            let (leaf, depth) = (names[names.len() - 1].as_str(), names.len() - 1);
            let entry = best.entry(leaf).or_insert((depth, 0));
            if depth < entry.0 {
                *entry = (depth, 1);
            } else if depth == entry.0 {
                entry.1 += 1;
            }
        }

        leaves
            .iter()
            .map(|(names, index)| {
                let depth = names.len() - 1;
                let leaf = names[depth].as_str();
                let promoted = best.get(leaf).is_some_and(|&(d, n)| d == depth && n == 1);
                FlatField {
                    name: if promoted { leaf.to_string() } else { names.iter().join(".") },
                    index: index.clone(),
                    depth,
                }
            })
            .collect()
    }
}

fn collect_leaves(
    rt: &RecordType,
    names: &mut Vec<String>,
    index: &mut Vec<usize>,
    seen: &mut Vec<*const RecordType>,
    out: &mut Vec<(Vec<String>, Vec<usize>)>,
) {
    // embedding a record in itself can only happen through a broken
    // definition, stop instead of recursing forever
    if seen.contains(&(rt as *const RecordType)) {
        return;
    }
    seen.push(rt);
    for (i, field) in rt.fields().iter().enumerate() {
        names.push(field.name.clone());
        index.push(i);
        match (&field.ty, field.embedded) {
            (Type::Record(inner), true) => collect_leaves(inner, names, index, seen, out),
            _ => out.push((names.clone(), index.clone())),
        }
        names.pop();
        index.pop();
    }
    seen.pop();
}

impl PartialEq for RecordType {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self, other)
    }
}

impl fmt::Debug for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordType").field("name", &self.name).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn nested() -> Arc<RecordType> {
        let base = RecordType::new("Base", vec![FieldDef::new("Flag", Type::Bool)]);
        let mid = RecordType::new(
            "Mid",
            vec![FieldDef::embed(&base), FieldDef::new("Name", Type::Str)],
        );
        RecordType::new(
            "Outer",
            vec![
                FieldDef::embed(&mid),
                FieldDef::new("Count", Type::Int),
                FieldDef::new("Name", Type::Int),
            ],
        )
    }

    #[test]
    fn flattening_keeps_declaration_order_and_shadows_deeper_fields() {
        let outer = nested();
        let names: Vec<_> = outer.flat_fields().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["Flag", "Mid.Name", "Count", "Name"]);
        assert_eq!(outer.lookup("Flag").map(|f| f.index.clone()), Some(vec![0, 0, 0]));
        assert_eq!(outer.field_name(&[2]), Some("Name"));
    }

    #[test]
    fn same_depth_collision_is_ambiguous() {
        let a = RecordType::new("A", vec![FieldDef::new("X", Type::Int)]);
        let b = RecordType::new("B", vec![FieldDef::new("X", Type::Int)]);
        let both = RecordType::new("Both", vec![FieldDef::embed(&a), FieldDef::embed(&b)]);
        let names: Vec<_> = both.flat_fields().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["A.X", "B.X"]);
        assert!(both.lookup("X").is_none());
    }

    #[test]
    fn type_names_round_trip() {
        for name in ["int", "[]string", "map[string][]*int", "*any", "map[int]map[char]float"] {
            let ty: Type = name.parse().unwrap();
            assert_eq!(ty.to_string(), name);
        }
        assert_eq!(
            "[]nope".parse::<Type>(),
            Err(UsageError::UnknownType("nope".into()))
        );
    }

    #[test]
    fn record_types_compare_by_identity() {
        let a = RecordType::new("Same", vec![]);
        let b = RecordType::new("Same", vec![]);
        assert!(Type::Record(a.clone()) == Type::Record(a.clone()));
        assert!(Type::Record(a) != Type::Record(b));
    }

    #[test]
    fn nilable_types() {
        assert!(Type::ptr(Type::Int).is_nilable());
        assert!(Type::Handle("func()".into()).is_nilable());
        assert!(!Type::Str.is_nilable());
        assert!(Type::Int.typed_nil().is_none());

        assert!(Type::Error.is_nilable());
        assert!(matches!(Type::Error.typed_nil(), Some(Value::Nil)));
        assert!(Type::Error.zero_value().is_nil());
    }
}
