//! Runtime value representation for instances under test.
//!
//! [`Value`] is the dynamic counterpart of a field or an argument. It owns
//! everything it contains (no shared references), so `clone()` is a full
//! value-semantics copy: mutating the original afterwards can never be
//! observed through the copy. Old-state snapshots rely on this.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::id::TypeId;

/// A field value, argument, or return value.
///
/// `Null` is the absence marker and is a first-class candidate in
/// finitization domains.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Instance(Box<Instance>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Numeric view: integers widen to `f64`.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_instance(&self) -> Option<&Instance> {
        match self {
            Value::Instance(inst) => Some(inst),
            _ => None,
        }
    }

    pub fn as_instance_mut(&mut self) -> Option<&mut Instance> {
        match self {
            Value::Instance(inst) => Some(inst),
            _ => None,
        }
    }

    /// Returns a human-readable description of the value's kind.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::Bool(_) => "Bool",
            Value::Int(_) => "Int",
            Value::Float(_) => "Float",
            Value::Str(_) => "Str",
            Value::List(_) => "List",
            Value::Instance(_) => "Instance",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(v) => write!(f, "{v}"),
            // Debug keeps the fractional part ("1.0") and spells NaN/inf.
            Value::Float(v) => write!(f, "{v:?}"),
            Value::Str(s) => write!(f, "{s}"),
            Value::List(items) => write!(f, "[{}]", display_values(items)),
            Value::Instance(inst) => write!(f, "{inst}"),
        }
    }
}

/// Joins values with `", "` for violation and log messages.
pub fn display_values(values: &[Value]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
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

impl From<Instance> for Value {
    fn from(inst: Instance) -> Self {
        Value::Instance(Box::new(inst))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// Expected shape of an argument, used by argument-type preconditions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueKind {
    Any,
    Bool,
    Int,
    Float,
    /// Int or Float.
    Number,
    Str,
    List,
    /// An instance of the named type or any of its subtypes.
    InstanceOf { type_id: TypeId, name: String },
}

impl ValueKind {
    pub fn instance_of(type_id: TypeId, name: impl Into<String>) -> Self {
        ValueKind::InstanceOf {
            type_id,
            name: name.into(),
        }
    }

    /// Whether `value` has this shape. `Null` only matches `Any`.
    pub fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (ValueKind::Any, _) => true,
            (ValueKind::Bool, Value::Bool(_)) => true,
            (ValueKind::Int, Value::Int(_)) => true,
            (ValueKind::Float, Value::Float(_)) => true,
            (ValueKind::Number, Value::Int(_) | Value::Float(_)) => true,
            (ValueKind::Str, Value::Str(_)) => true,
            (ValueKind::List, Value::List(_)) => true,
            (ValueKind::InstanceOf { type_id, .. }, Value::Instance(inst)) => inst.is_a(*type_id),
            _ => false,
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::Any => write!(f, "any"),
            ValueKind::Bool => write!(f, "bool"),
            ValueKind::Int => write!(f, "int"),
            ValueKind::Float => write!(f, "float"),
            ValueKind::Number => write!(f, "number"),
            ValueKind::Str => write!(f, "string"),
            ValueKind::List => write!(f, "list"),
            ValueKind::InstanceOf { name, .. } => write!(f, "{name}"),
        }
    }
}

/// The state of one object: its runtime type, type lineage, and fields in
/// insertion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    type_id: TypeId,
    type_name: String,
    /// The runtime type first, then every ancestor.
    lineage: SmallVec<[TypeId; 4]>,
    fields: IndexMap<String, Value>,
}

impl Instance {
    /// Creates an instance with no fields. `lineage` lists the ancestors of
    /// `type_id`; the type itself is prepended if missing.
    pub fn new(
        type_id: TypeId,
        type_name: impl Into<String>,
        lineage: impl IntoIterator<Item = TypeId>,
    ) -> Self {
        let mut chain: SmallVec<[TypeId; 4]> = SmallVec::new();
        chain.push(type_id);
        for ancestor in lineage {
            if !chain.contains(&ancestor) {
                chain.push(ancestor);
            }
        }
        Instance {
            type_id,
            type_name: type_name.into(),
            lineage: chain,
            fields: IndexMap::new(),
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn lineage(&self) -> &[TypeId] {
        &self.lineage
    }

    /// True if this instance's type is `type_id` or one of its subtypes.
    pub fn is_a(&self, type_id: TypeId) -> bool {
        self.lineage.contains(&type_id)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.fields.get_mut(name)
    }

    pub fn get_int(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(Value::as_int)
    }

    pub fn get_float(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(Value::as_float)
    }

    pub fn has(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Sets a field, returning the previous value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(name.into(), value.into())
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.fields.shift_remove(name)
    }

    pub fn fields(&self) -> &IndexMap<String, Value> {
        &self.fields
    }
}

impl fmt::Display for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{{", self.type_name)?;
        for (i, (name, value)) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{name}: {value}")?;
        }
        write!(f, "}}")
    }
}
