// ============================================================================
// spark-observe - Dynamic Values
// The value substrate observed by the engine: scalars, maps, sequences
// ============================================================================

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use thiserror::Error;

use crate::observer::Observer;

pub mod arr;
pub mod obj;

pub use arr::Arr;
pub use obj::Obj;

// =============================================================================
// VALUE
// =============================================================================

/// A dynamic value in an observable state graph.
///
/// Scalars are stored inline; strings, maps, sequences and render nodes are
/// handles over shared storage, so cloning a `Value` is always cheap and never
/// copies a container. Two clones of a container value refer to the same
/// storage and the same observer.
///
/// Only maps ([`Obj`]) and sequences ([`Arr`]) can be observed. Render nodes
/// are opaque pass-through handles for render-output trees; the engine never
/// descends into them.
#[derive(Clone, Debug)]
pub enum Value {
    /// The absent value
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    Obj(Obj),
    Arr(Arr),
    /// Opaque render-output handle, never observed
    Node(RenderNode),
}

impl Value {
    /// Write-short-circuit equality: value equality for scalars, pointer
    /// identity for containers and nodes.
    ///
    /// Two NaN floats are `same` (re-writing NaN over NaN is not a change).
    /// `Int` and `Float` are distinct variants and never `same`, even when
    /// numerically equal.
    pub fn same(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Obj(a), Value::Obj(b)) => a.ptr_eq(b),
            (Value::Arr(a), Value::Arr(b)) => a.ptr_eq(b),
            (Value::Node(a), Value::Node(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    /// Variant name, used in diagnostics and conversion errors.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Obj(_) => "object",
            Value::Arr(_) => "array",
            Value::Node(_) => "node",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Whether this value is a map or a sequence (the observable kinds).
    pub fn is_container(&self) -> bool {
        matches!(self, Value::Obj(_) | Value::Arr(_))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric view: ints widen to floats.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_obj(&self) -> Option<&Obj> {
        match self {
            Value::Obj(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_arr(&self) -> Option<&Arr> {
        match self {
            Value::Arr(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_node(&self) -> Option<&RenderNode> {
        match self {
            Value::Node(n) => Some(n),
            _ => None,
        }
    }

    /// The observer carried by this value's container, if any.
    pub(crate) fn observer(&self) -> Option<Rc<Observer>> {
        match self {
            Value::Obj(o) => o.observer(),
            Value::Arr(a) => a.observer(),
            _ => None,
        }
    }

    /// Whether new properties/elements may be defined on this container.
    pub(crate) fn is_extensible(&self) -> bool {
        match self {
            Value::Obj(o) => o.is_extensible(),
            Value::Arr(a) => a.is_extensible(),
            _ => false,
        }
    }

    /// Whether this is a component-instance root map.
    pub(crate) fn is_instance_root(&self) -> bool {
        match self {
            Value::Obj(o) => o.is_instance_root(),
            _ => false,
        }
    }
}

// =============================================================================
// CONVERSIONS
// =============================================================================

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
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

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v as f64)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(Rc::from(v))
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(Rc::from(v.as_str()))
    }
}

impl From<Rc<str>> for Value {
    fn from(v: Rc<str>) -> Self {
        Value::Str(v)
    }
}

impl From<Obj> for Value {
    fn from(v: Obj) -> Self {
        Value::Obj(v)
    }
}

impl From<Arr> for Value {
    fn from(v: Arr) -> Self {
        Value::Arr(v)
    }
}

impl From<RenderNode> for Value {
    fn from(v: RenderNode) -> Self {
        Value::Node(v)
    }
}

/// Error from the strict [`TryFrom<Value>`] conversions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueTypeError {
    #[error("expected {expected}, found {found}")]
    Mismatch {
        expected: &'static str,
        found: &'static str,
    },
}

impl ValueTypeError {
    fn mismatch(expected: &'static str, value: &Value) -> Self {
        ValueTypeError::Mismatch {
            expected,
            found: value.type_name(),
        }
    }
}

impl TryFrom<Value> for i64 {
    type Error = ValueTypeError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        value
            .as_i64()
            .ok_or_else(|| ValueTypeError::mismatch("int", &value))
    }
}

impl TryFrom<Value> for f64 {
    type Error = ValueTypeError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        value
            .as_f64()
            .ok_or_else(|| ValueTypeError::mismatch("float", &value))
    }
}

impl TryFrom<Value> for bool {
    type Error = ValueTypeError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        value
            .as_bool()
            .ok_or_else(|| ValueTypeError::mismatch("bool", &value))
    }
}

impl TryFrom<Value> for Rc<str> {
    type Error = ValueTypeError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Str(s) => Ok(s),
            other => Err(ValueTypeError::mismatch("string", &other)),
        }
    }
}

// =============================================================================
// RENDER NODE
// =============================================================================

/// Opaque handle to render output (a virtual tree node, a widget, anything the
/// render layer produces). The engine recognizes it structurally and refuses
/// to observe it; the payload is only reachable by downcasting.
#[derive(Clone)]
pub struct RenderNode {
    payload: Rc<dyn Any>,
}

impl RenderNode {
    pub fn new<T: Any>(payload: T) -> Self {
        Self {
            payload: Rc::new(payload),
        }
    }

    /// Downcast the payload.
    pub fn payload<T: Any>(&self) -> Option<&T> {
        (*self.payload).downcast_ref::<T>()
    }

    /// Identity comparison (same allocation).
    pub fn ptr_eq(&self, other: &RenderNode) -> bool {
        Rc::as_ptr(&self.payload) as *const () == Rc::as_ptr(&other.payload) as *const ()
    }
}

impl fmt::Debug for RenderNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RenderNode")
    }
}

// =============================================================================
// SERDE (plain snapshots)
// =============================================================================

#[cfg(feature = "serde")]
mod serde_impls {
    use super::*;
    use serde::de::{MapAccess, SeqAccess, Visitor};
    use serde::ser::{SerializeMap, SerializeSeq};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serializes the current plain snapshot of the tree, read raw (no
    /// dependency registration, accessor pairs honored). Render nodes
    /// serialize as null. Cyclic graphs are not supported.
    impl Serialize for Value {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            match self {
                Value::Null => serializer.serialize_unit(),
                Value::Bool(b) => serializer.serialize_bool(*b),
                Value::Int(i) => serializer.serialize_i64(*i),
                Value::Float(f) => serializer.serialize_f64(*f),
                Value::Str(s) => serializer.serialize_str(s),
                Value::Obj(o) => {
                    let pairs = o.entries_snapshot();
                    let mut map = serializer.serialize_map(Some(pairs.len()))?;
                    for (key, value) in pairs {
                        map.serialize_entry(key.as_ref(), &value)?;
                    }
                    map.end()
                }
                Value::Arr(a) => {
                    let items = a.snapshot();
                    let mut seq = serializer.serialize_seq(Some(items.len()))?;
                    for item in items {
                        seq.serialize_element(&item)?;
                    }
                    seq.end()
                }
                Value::Node(_) => serializer.serialize_unit(),
            }
        }
    }

    /// Deserializes into plain (unobserved) values; run the result through
    /// [`observe`](crate::observe) to make it reactive.
    impl<'de> Deserialize<'de> for Value {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            struct ValueVisitor;

            impl<'de> Visitor<'de> for ValueVisitor {
                type Value = Value;

                fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str("any plain value")
                }

                fn visit_unit<E>(self) -> Result<Value, E> {
                    Ok(Value::Null)
                }

                fn visit_none<E>(self) -> Result<Value, E> {
                    Ok(Value::Null)
                }

                fn visit_some<D: Deserializer<'de>>(self, d: D) -> Result<Value, D::Error> {
                    d.deserialize_any(ValueVisitor)
                }

                fn visit_bool<E>(self, v: bool) -> Result<Value, E> {
                    Ok(Value::Bool(v))
                }

                fn visit_i64<E>(self, v: i64) -> Result<Value, E> {
                    Ok(Value::Int(v))
                }

                fn visit_u64<E>(self, v: u64) -> Result<Value, E> {
                    if v <= i64::MAX as u64 {
                        Ok(Value::Int(v as i64))
                    } else {
                        Ok(Value::Float(v as f64))
                    }
                }

                fn visit_f64<E>(self, v: f64) -> Result<Value, E> {
                    Ok(Value::Float(v))
                }

                fn visit_str<E>(self, v: &str) -> Result<Value, E> {
                    Ok(Value::from(v))
                }

                fn visit_string<E>(self, v: String) -> Result<Value, E> {
                    Ok(Value::from(v))
                }

                fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Value, A::Error> {
                    let mut items = Vec::new();
                    while let Some(item) = seq.next_element::<Value>()? {
                        items.push(item);
                    }
                    Ok(Value::Arr(Arr::from_values(items)))
                }

                fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Value, A::Error> {
                    let map = Obj::new();
                    while let Some((key, value)) = access.next_entry::<String, Value>()? {
                        map.set(&key, value);
                    }
                    Ok(Value::Obj(map))
                }
            }

            deserializer.deserialize_any(ValueVisitor)
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
