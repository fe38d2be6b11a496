//! A hierarchical command dispatch framework.
//!
//! A [`catalog::Catalog`] of groups and commands is searched against an
//! [`source::ArgumentSource`], the winning candidate's parameters are parsed
//! through a [`parser::ParserRegistry`], its pre/post [`condition::Condition`]s
//! are evaluated, and its body is invoked — all behind the
//! [`manager::Manager`] entry point built by [`manager::ManagerBuilder`].

pub mod catalog;
pub mod condition;
pub mod context;
pub mod error;
pub mod manager;
pub mod parse;
pub mod parser;
pub mod pipeline;
pub mod result;
pub mod scope;
pub mod source;
pub mod tokenizer;
pub mod value;

pub use catalog::builder::{CatalogBuilder, CommandBuilder, GroupBuilder, ParameterBuilder};
pub use catalog::Catalog;
pub use condition::Condition;
pub use context::{Caller, Reply, Services, SimpleCaller};
pub use error::{BuildError, DispatchError};
pub use manager::{Manager, ManagerBuilder, ResultHandler};
pub use parser::{Parser, ParserRegistry, TypeDescriptor};
pub use pipeline::{AsyncMode, ExecuteOptions};
pub use result::DispatchResult;
pub use source::{ArgumentSource, NameComparer};
pub use tokenizer::{DefaultTokenizer, Tokenizer};
pub use value::{RawValue, Value};
