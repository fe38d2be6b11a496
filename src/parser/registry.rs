//! `ParserRegistry::resolve` implements spec §4.1's resolution order:
//!
//! 1. Exact type hit in the map.
//! 2. Enum type → synthesize an Enum Parser.
//! 3. Array type `T[]` → synthesize an Array Parser wrapping `get_parser(T)`.
//! 4. Recognized collection shapes (list-of-T, set-of-T) → List/Set Parser
//!    wrapping `get_parser(T)`; nested collections are rejected.
//! 5. Otherwise, `UnsupportedType`.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::composite::{ArrayParser, EnumParser, ListParser, SetParser};
use super::scalar::{BoolParser, FloatParser, IntParser, StringParser};
use super::{Parser, TypeDescriptor};
use crate::error::BuildError;

pub struct ParserRegistry {
    scalars: RwLock<HashMap<TypeId, Arc<dyn Parser>>>,
    synthesized: RwLock<HashMap<String, Arc<dyn Parser>>>,
}

impl ParserRegistry {
    /// A registry with the built-in scalar parsers pre-registered.
    pub fn new() -> Self {
        let registry = Self {
            scalars: RwLock::new(HashMap::new()),
            synthesized: RwLock::new(HashMap::new()),
        };
        registry.register_scalar::<bool>(Arc::new(BoolParser));
        registry.register_scalar::<i64>(Arc::new(IntParser));
        registry.register_scalar::<f64>(Arc::new(FloatParser));
        registry.register_scalar::<String>(Arc::new(StringParser));
        registry
    }

    /// An empty registry with no built-ins — for hosts that want to supply
    /// every scalar parser themselves.
    pub fn empty() -> Self {
        Self {
            scalars: RwLock::new(HashMap::new()),
            synthesized: RwLock::new(HashMap::new()),
        }
    }

    pub fn register_scalar<T: 'static>(&self, parser: Arc<dyn Parser>) {
        self.scalars
            .write()
            .expect("parser registry lock poisoned")
            .insert(TypeId::of::<T>(), parser);
    }

    /// Resolves a [`TypeDescriptor`] to a parser, synthesizing and
    /// memoizing composite parsers on demand. Idempotent per descriptor
    /// (spec §8: "`get_parser(T)` is idempotent per T").
    pub fn resolve(&self, descriptor: &TypeDescriptor) -> Result<Arc<dyn Parser>, BuildError> {
        match descriptor {
            TypeDescriptor::Scalar { type_id, type_name } => self
                .scalars
                .read()
                .expect("parser registry lock poisoned")
                .get(type_id)
                .cloned()
                .ok_or(BuildError::UnsupportedType { type_name }),

            TypeDescriptor::Enum(enum_descriptor) => {
                let key = descriptor.cache_key();
                if let Some(cached) = self.synthesized_get(&key) {
                    return Ok(cached);
                }
                let parser: Arc<dyn Parser> = Arc::new(EnumParser {
                    descriptor: enum_descriptor.clone(),
                });
                self.synthesized_put(key, parser.clone());
                Ok(parser)
            }

            TypeDescriptor::Array(inner) => self.resolve_collection(
                descriptor,
                inner,
                "array",
                |inner| Arc::new(ArrayParser { inner }),
            ),
            TypeDescriptor::List(inner) => self.resolve_collection(
                descriptor,
                inner,
                "list",
                |inner| Arc::new(ListParser { inner }),
            ),
            TypeDescriptor::Set(inner) => self.resolve_collection(
                descriptor,
                inner,
                "set",
                |inner| Arc::new(SetParser { inner }),
            ),
        }
    }

    fn resolve_collection(
        &self,
        descriptor: &TypeDescriptor,
        inner: &TypeDescriptor,
        shape: &'static str,
        wrap: impl FnOnce(Arc<dyn Parser>) -> Arc<dyn Parser>,
    ) -> Result<Arc<dyn Parser>, BuildError> {
        if inner.is_collection() {
            return Err(BuildError::NestedCollection {
                shape,
                inner_shape: inner.shape_name(),
            });
        }

        let key = descriptor.cache_key();
        if let Some(cached) = self.synthesized_get(&key) {
            return Ok(cached);
        }

        let inner_parser = self.resolve(inner)?;
        let parser = wrap(inner_parser);
        self.synthesized_put(key, parser.clone());
        Ok(parser)
    }

    fn synthesized_get(&self, key: &str) -> Option<Arc<dyn Parser>> {
        self.synthesized
            .read()
            .expect("parser registry lock poisoned")
            .get(key)
            .cloned()
    }

    fn synthesized_put(&self, key: String, parser: Arc<dyn Parser>) {
        self.synthesized
            .write()
            .expect("parser registry lock poisoned")
            .insert(key, parser);
    }
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_is_idempotent_and_memoized() {
        let registry = ParserRegistry::new();
        let descriptor = TypeDescriptor::array(TypeDescriptor::scalar::<i64>());
        let a = registry.resolve(&descriptor).unwrap();
        let b = registry.resolve(&descriptor).unwrap();
        assert!(Arc::ptr_eq(&a, &b), "synthesized parser should be memoized");
    }

    #[test]
    fn unsupported_scalar_type_errors() {
        struct NoParser;
        let registry = ParserRegistry::new();
        let descriptor = TypeDescriptor::scalar::<NoParser>();
        assert!(matches!(
            registry.resolve(&descriptor),
            Err(BuildError::UnsupportedType { .. })
        ));
    }

    #[test]
    fn nested_collections_are_rejected() {
        let registry = ParserRegistry::new();
        let descriptor = TypeDescriptor::list(TypeDescriptor::array(TypeDescriptor::scalar::<i64>()));
        assert!(matches!(
            registry.resolve(&descriptor),
            Err(BuildError::NestedCollection { .. })
        ));
    }
}
