//! Dynamic value shapes that cross the parser boundary.
//!
//! Spec §9 models host input as a tagged value `{ String(s), Object(opaque) }`;
//! [`RawValue`] is that tag on the way *in* to a [`crate::parser::Parser`],
//! and [`Value`] is the native, typed shape a parser produces on the way
//! *out*. Parsers operate primarily on `RawValue::Text`; `RawValue::Object`
//! passes through transparently to typed parsers that accept it.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Raw, unparsed input handed to a [`crate::parser::Parser`].
#[derive(Clone)]
pub enum RawValue {
    /// A bare string token — the common case for positional/named CLI-style input.
    Text(String),
    /// An opaque host value that a typed parser may downcast and accept
    /// without going through text at all.
    Object(Arc<dyn Any + Send + Sync>),
    /// An object sequence, as produced for array/list/set parameters.
    Sequence(Vec<RawValue>),
}

impl fmt::Debug for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Text(s) => f.debug_tuple("Text").field(s).finish(),
            RawValue::Object(_) => write!(f, "Object(..)"),
            RawValue::Sequence(items) => f.debug_tuple("Sequence").field(items).finish(),
        }
    }
}

impl RawValue {
    pub fn text(s: impl Into<String>) -> Self {
        RawValue::Text(s.into())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            RawValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[RawValue]> {
        match self {
            RawValue::Sequence(items) => Some(items.as_slice()),
            _ => None,
        }
    }
}

/// An opaque value produced by a constructible parameter's activator, or
/// passed straight through from a [`RawValue::Object`].
#[derive(Clone)]
pub struct ObjectValue(pub Arc<dyn Any + Send + Sync>);

impl fmt::Debug for ObjectValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Object(..)")
    }
}

impl PartialEq for ObjectValue {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// The ordinal/name pair an enum parser resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumValue {
    pub name: String,
    pub ordinal: i64,
}

/// The native, typed result of parsing — what reaches a command body as a
/// parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Enum(EnumValue),
    /// `T[]` — a fixed array shape.
    Array(Vec<Value>),
    /// list-of-T — an ordered, duplicate-preserving collection.
    List(Vec<Value>),
    /// set-of-T — stored as an insertion-ordered, deduplicated `Vec` so
    /// equality and ordering stay deterministic without requiring `Value`
    /// to implement `Hash`/`Ord`.
    Set(Vec<Value>),
    Object(ObjectValue),
    /// The placeholder substituted for an optional parameter that was not
    /// supplied; the invoker is responsible for substituting the declared
    /// default (spec §4.4).
    Missing,
    /// The value of a command body that returned nothing.
    Void,
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::String(s) => write!(f, "{s}"),
            Value::Enum(e) => write!(f, "{}", e.name),
            Value::Array(items) | Value::List(items) | Value::Set(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::Object(_) => write!(f, "<object>"),
            Value::Missing => write!(f, "<missing>"),
            Value::Void => write!(f, "<void>"),
        }
    }
}
