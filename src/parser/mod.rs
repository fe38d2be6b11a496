//! The Parser Registry (spec §4.1).

pub mod composite;
pub mod registry;
pub mod scalar;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::context::{Caller, Services};
use crate::error::ParseFailure;
use crate::value::{RawValue, Value};

pub use registry::ParserRegistry;

/// Per-parse contextual information (spec §6's parser contract:
/// `parse(caller, parameter_info, raw_value, services, cancel)`).
pub struct ParseContext<'a> {
    pub caller: &'a dyn Caller,
    pub parameter_name: &'a str,
    pub services: &'a Services,
    pub cancel: &'a CancellationToken,
}

/// Converts a single raw value into a native [`Value`]. Implementations
/// must be side-effect-free and idempotent over `(raw, context)` (spec §3:
/// "pure over (raw, context)").
#[async_trait]
pub trait Parser: Send + Sync {
    /// A human-readable name for the type this parser targets, used in
    /// `BuildError::UnsupportedType` and debug output.
    fn target_type_name(&self) -> &'static str;

    async fn parse(&self, raw: &RawValue, ctx: &ParseContext<'_>) -> Result<Value, ParseFailure>;
}

/// A shape descriptor for a parameter's target type — the Rust stand-in for
/// spec §4.1's "target type", since this is a statically typed language
/// rather than one with runtime reflection. Built once at registration time
/// and handed to [`ParserRegistry::resolve`], whose steps mirror spec
/// §4.1's resolution order one-to-one.
#[derive(Clone)]
pub enum TypeDescriptor {
    /// An exact hit in the registry (step 1).
    Scalar {
        type_id: std::any::TypeId,
        type_name: &'static str,
    },
    /// An enum type, resolved via case-insensitive name or ordinal text
    /// (step 2).
    Enum(std::sync::Arc<EnumDescriptor>),
    /// `T[]` (step 3).
    Array(Box<TypeDescriptor>),
    /// list-of-T (step 4).
    List(Box<TypeDescriptor>),
    /// set-of-T (step 4).
    Set(Box<TypeDescriptor>),
}

impl TypeDescriptor {
    pub fn scalar<T: 'static>() -> Self {
        TypeDescriptor::Scalar {
            type_id: std::any::TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
        }
    }

    pub fn array(element: TypeDescriptor) -> Self {
        TypeDescriptor::Array(Box::new(element))
    }

    pub fn list(element: TypeDescriptor) -> Self {
        TypeDescriptor::List(Box::new(element))
    }

    pub fn set(element: TypeDescriptor) -> Self {
        TypeDescriptor::Set(Box::new(element))
    }

    pub fn is_collection(&self) -> bool {
        matches!(
            self,
            TypeDescriptor::Array(_) | TypeDescriptor::List(_) | TypeDescriptor::Set(_)
        )
    }

    fn shape_name(&self) -> &'static str {
        match self {
            TypeDescriptor::Scalar { .. } => "scalar",
            TypeDescriptor::Enum(_) => "enum",
            TypeDescriptor::Array(_) => "array",
            TypeDescriptor::List(_) => "list",
            TypeDescriptor::Set(_) => "set",
        }
    }

    /// A stable cache key for memoization (spec §4.1: "synthesized parsers
    /// are memoized per element type").
    fn cache_key(&self) -> String {
        match self {
            TypeDescriptor::Scalar { type_name, .. } => format!("scalar:{type_name}"),
            TypeDescriptor::Enum(d) => format!("enum:{}", d.type_name),
            TypeDescriptor::Array(inner) => format!("array:{}", inner.cache_key()),
            TypeDescriptor::List(inner) => format!("list:{}", inner.cache_key()),
            TypeDescriptor::Set(inner) => format!("set:{}", inner.cache_key()),
        }
    }
}

/// The case-insensitive-name/ordinal descriptor a synthesized enum parser
/// resolves against.
pub struct EnumDescriptor {
    pub type_name: &'static str,
    pub variants: Vec<(&'static str, i64)>,
}

impl EnumDescriptor {
    pub fn new(type_name: &'static str, variants: Vec<(&'static str, i64)>) -> Self {
        Self {
            type_name,
            variants,
        }
    }
}
