//! The Manager (spec §6's top-level entry point / §4.7's "freeze on first
//! execute"): owns a built [`Catalog`], a [`ParserRegistry`], and the
//! registered [`ResultHandler`], and exposes `execute`/`execute_named`/
//! `execute_string`.

use std::sync::Arc;

use async_trait::async_trait;
use log::trace;

use crate::catalog::builder::CatalogBuilder;
use crate::catalog::Catalog;
use crate::context::Caller;
use crate::error::BuildError;
use crate::parser::ParserRegistry;
use crate::pipeline::{self, AsyncMode, ExecuteOptions};
use crate::result::DispatchResult;
use crate::scope::Scope;
use crate::source::{ArgumentSource, NameComparer};
use crate::tokenizer::{DefaultTokenizer, Tokenizer};

/// Delivers a terminal [`DispatchResult`] back to the host. Runs after the
/// pipeline completes, inside the same [`Scope`] the command body ran in
/// (spec §5: "the result handler is part of the suspension chain").
///
/// Returning `false` tells a `Discard`-mode caller the failure was already
/// surfaced and nothing further should be logged; `Await`-mode callers
/// ignore the return value.
#[async_trait]
pub trait ResultHandler: Send + Sync {
    async fn handle(&self, caller: &dyn Caller, result: &DispatchResult, scope: &Scope) -> bool;
}

#[async_trait]
impl<F> ResultHandler for F
where
    F: Fn(&dyn Caller, &DispatchResult, &Scope) -> bool + Send + Sync,
{
    async fn handle(&self, caller: &dyn Caller, result: &DispatchResult, scope: &Scope) -> bool {
        self(caller, result, scope)
    }
}

/// A [`ResultHandler`] that replies to the caller via [`Caller::respond`]
/// and otherwise does nothing; the default a host gets by calling
/// [`ManagerBuilder::new`] without `.result_handler(...)`.
pub struct RespondingResultHandler;

#[async_trait]
impl ResultHandler for RespondingResultHandler {
    async fn handle(&self, caller: &dyn Caller, result: &DispatchResult, _scope: &Scope) -> bool {
        let reply = match result {
            DispatchResult::Success(value) => crate::context::Reply::Value(value.clone()),
            DispatchResult::Failure(err) => crate::context::Reply::Text(err.to_string()),
        };
        caller.respond(reply).await.is_ok()
    }
}

pub struct ManagerBuilder {
    catalog: CatalogBuilder,
    registry: ParserRegistry,
    result_handler: Option<Arc<dyn ResultHandler>>,
    default_comparer: NameComparer,
    default_remainder_separator: char,
}

impl Default for ManagerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ManagerBuilder {
    pub fn new() -> Self {
        Self {
            catalog: CatalogBuilder::new(),
            registry: ParserRegistry::new(),
            result_handler: None,
            default_comparer: NameComparer::OrdinalIgnoreCase,
            default_remainder_separator: ' ',
        }
    }

    /// Starts from a registry with no built-in scalar parsers, for hosts
    /// that supply every scalar parser themselves (spec §4.1).
    pub fn with_empty_registry() -> Self {
        Self {
            registry: ParserRegistry::empty(),
            ..Self::new()
        }
    }

    pub fn register_scalar<T: 'static>(self, parser: Arc<dyn crate::parser::Parser>) -> Self {
        self.registry.register_scalar::<T>(parser);
        self
    }

    pub fn group(mut self, group: crate::catalog::builder::GroupBuilder) -> Self {
        self.catalog = self.catalog.group(group);
        self
    }

    pub fn command(mut self, command: crate::catalog::builder::CommandBuilder) -> Self {
        self.catalog = self.catalog.command(command);
        self
    }

    pub fn default_command(mut self, command: crate::catalog::builder::CommandBuilder) -> Self {
        self.catalog = self.catalog.default_command(command);
        self
    }

    pub fn result_handler(mut self, handler: impl ResultHandler + 'static) -> Self {
        self.result_handler = Some(Arc::new(handler));
        self
    }

    pub fn name_comparer(mut self, comparer: NameComparer) -> Self {
        self.default_comparer = comparer;
        self
    }

    pub fn remainder_separator(mut self, sep: char) -> Self {
        self.default_remainder_separator = sep;
        self
    }

    /// Materializes the [`Catalog`] and requires a [`ResultHandler`] be
    /// set (spec §4.8: "a result handler must be registered before build").
    pub fn build(self) -> Result<Manager, BuildError> {
        let catalog = self.catalog.build(&self.registry)?;
        Ok(Manager {
            catalog: Arc::new(catalog),
            registry: Arc::new(self.registry),
            result_handler: self.result_handler.ok_or(BuildError::NoResultHandler)?,
            default_comparer: self.default_comparer,
            default_remainder_separator: self.default_remainder_separator,
        })
    }
}

/// The host-facing entry point: a frozen-on-first-use [`Catalog`] plus the
/// pipeline wiring needed to run it (spec §6). `Catalog`/`ParserRegistry`
/// are `Arc`-wrapped so a `Discard`-mode spawn can hold its own owned
/// handle without requiring either type to implement `Clone`.
pub struct Manager {
    catalog: Arc<Catalog>,
    registry: Arc<ParserRegistry>,
    result_handler: Arc<dyn ResultHandler>,
    default_comparer: NameComparer,
    default_remainder_separator: char,
}

impl Manager {
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn registry(&self) -> &ParserRegistry {
        &self.registry
    }

    fn options_from(&self, overrides: Option<ExecuteOptions>) -> ExecuteOptions {
        overrides.unwrap_or_else(|| ExecuteOptions {
            name_comparer: self.default_comparer,
            remainder_separator: self.default_remainder_separator,
            ..ExecuteOptions::default()
        })
    }

    async fn dispatch(
        &self,
        caller: Arc<dyn Caller>,
        source: ArgumentSource,
        options: ExecuteOptions,
    ) -> DispatchResult {
        // First execution freezes the catalog (spec §4.7): after this point
        // registration calls on the same `Catalog` would be unsound to mix
        // with concurrent search, so the builder surface enforces it by
        // refusing to hand out a `Catalog` that is still mutable elsewhere.
        self.catalog.freeze();

        match options.async_mode {
            AsyncMode::Await => {
                let scope = Scope::new(options.services.clone());
                let result = pipeline::run(&self.catalog, &self.registry, caller.clone(), source, &options, &scope).await;
                self.result_handler.handle(caller.as_ref(), &result, &scope).await;
                result
            }
            AsyncMode::Discard => {
                let handler = self.result_handler.clone();
                let catalog = self.catalog.clone();
                let registry = self.registry.clone();
                tokio::spawn(async move {
                    let scope = Scope::new(options.services.clone());
                    let result =
                        pipeline::run(&catalog, &registry, caller.clone(), source, &options, &scope).await;
                    handler.handle(caller.as_ref(), &result, &scope).await;
                });
                DispatchResult::Success(crate::value::Value::Void)
            }
        }
    }

    /// Executes a positional object sequence (spec §4.3's "object sequence"
    /// input shape).
    pub async fn execute(
        &self,
        caller: Arc<dyn Caller>,
        source: ArgumentSource,
        options: Option<ExecuteOptions>,
    ) -> DispatchResult {
        self.dispatch(caller, source, self.options_from(options)).await
    }

    /// Executes a key-value sequence (spec §4.3's "name-value pairs with
    /// key-or-value-only entries demoted to positional").
    pub async fn execute_named(
        &self,
        caller: Arc<dyn Caller>,
        entries: Vec<(String, Option<crate::value::RawValue>)>,
        options: Option<ExecuteOptions>,
    ) -> DispatchResult {
        let resolved = self.options_from(options);
        let source = ArgumentSource::from_entries(entries, resolved.name_comparer);
        self.dispatch(caller, source, resolved).await
    }

    /// Tokenizes `input` with `tokenizer` (spec §1: a host-supplied
    /// tokenizer, out of this crate's scope) and executes the result.
    pub async fn execute_string(
        &self,
        caller: Arc<dyn Caller>,
        input: &str,
        tokenizer: &dyn Tokenizer,
        options: Option<ExecuteOptions>,
    ) -> DispatchResult {
        let tokens = tokenizer.tokenize(input);
        trace!("tokenized {:?} into {} token(s)", input, tokens.len());
        let source = ArgumentSource::from_tokens(tokens);
        self.dispatch(caller, source, self.options_from(options)).await
    }

    /// Convenience over [`Manager::execute_string`] using the built-in
    /// whitespace/quote-aware [`DefaultTokenizer`].
    pub async fn execute_str(
        &self,
        caller: Arc<dyn Caller>,
        input: &str,
        options: Option<ExecuteOptions>,
    ) -> DispatchResult {
        self.execute_string(caller, input, &DefaultTokenizer, options).await
    }
}
