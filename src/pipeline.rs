//! The Pipeline (spec §4.6): Search → Parse → Pre-condition → Invoke →
//! Post-condition → Finalize.

use std::sync::Arc;

use log::{debug, trace, warn};
use tokio_util::sync::CancellationToken;

use crate::catalog::component::{CommandShape, Invocation};
use crate::catalog::Catalog;
use crate::condition::{evaluate_conditions, ConditionContext, ConditionSubject};
use crate::context::{Caller, Services};
use crate::error::{ConditionPhase, DispatchError};
use crate::parse::ParsePlumbing;
use crate::parser::ParserRegistry;
use crate::result::DispatchResult;
use crate::scope::Scope;
use crate::source::{ArgumentSource, NameComparer};

/// Which path the caller takes: `Await` blocks on the Result Handler;
/// `Discard` detaches and returns immediately while delivery still occurs
/// (spec §4.6, §5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AsyncMode {
    Await,
    Discard,
}

/// Options threaded through one `execute` call (spec §6).
#[derive(Clone)]
pub struct ExecuteOptions {
    pub async_mode: AsyncMode,
    pub skip_preconditions: bool,
    pub skip_postconditions: bool,
    pub remainder_separator: char,
    pub name_comparer: NameComparer,
    pub services: Services,
    pub cancel: CancellationToken,
    /// spec §9 open question (2): default to no fallback on `InvokeFailure`.
    pub fallback_on_invoke_failure: bool,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            async_mode: AsyncMode::Await,
            skip_preconditions: false,
            skip_postconditions: false,
            remainder_separator: ' ',
            name_comparer: NameComparer::OrdinalIgnoreCase,
            services: crate::context::empty_services(),
            cancel: CancellationToken::new(),
            fallback_on_invoke_failure: false,
        }
    }
}

async fn invoke(
    body: &CommandShape,
    invocation: Invocation,
    scope: &Scope,
) -> Result<crate::value::Value, String> {
    match body {
        CommandShape::Static(body) => body(invocation).await,
        CommandShape::Instance { factory, method } => {
            let mut instance = factory(scope);
            method(instance.as_mut(), invocation).await
        }
    }
}

/// Runs one execution to completion: Search → (per candidate) Parse →
/// Pre-condition → Invoke → Post-condition. Delivers exactly one
/// [`DispatchResult`].
pub async fn run(
    catalog: &Catalog,
    _registry: &ParserRegistry,
    caller: Arc<dyn Caller>,
    source: ArgumentSource,
    options: &ExecuteOptions,
    scope: &Scope,
) -> DispatchResult {
    let candidates = catalog.search(&source, options.name_comparer);
    if candidates.is_empty() {
        trace!("search produced no candidates");
        return DispatchResult::Failure(DispatchError::SearchFailure);
    }

    let mut best_failure: Option<DispatchError> = None;

    for candidate in candidates {
        if options.cancel.is_cancelled() {
            return DispatchResult::Failure(DispatchError::Canceled);
        }

        let command = catalog
            .command(candidate.command)
            .expect("search candidate must reference a command node");

        let mut attempt = source.clone();
        attempt.set_size(candidate.search_height);

        let plumbing = ParsePlumbing {
            caller: caller.as_ref(),
            services: &options.services,
            cancel: &options.cancel,
            remainder_separator: options.remainder_separator,
        };

        let (parsed, body) = match plumbing.parse_command(command, &mut attempt).await {
            Ok(result) => result,
            Err(DispatchError::Canceled) => return DispatchResult::Failure(DispatchError::Canceled),
            Err(e) => {
                trace!("candidate {:?} failed to parse: {e}", candidate.command);
                DispatchError::record_if_better(&mut best_failure, e);
                continue;
            }
        };

        if !options.skip_preconditions {
            let conditions = catalog.conditions_for(candidate.command, ConditionPhase::Pre);
            let full_name = catalog.full_name(candidate.command);
            let ctx = ConditionContext {
                caller: caller.as_ref(),
                services: &options.services,
                cancel: &options.cancel,
                subject: ConditionSubject::Command {
                    full_name: &full_name,
                },
            };
            if let Err(reason) = evaluate_conditions(conditions.iter(), &ctx).await {
                let err = DispatchError::ConditionFailure {
                    phase: ConditionPhase::Pre,
                    reason,
                };
                warn!("pre-condition rejected candidate {}: {err}", full_name);
                DispatchError::record_if_better(&mut best_failure, err);
                continue;
            }
        }

        if options.cancel.is_cancelled() {
            return DispatchResult::Failure(DispatchError::Canceled);
        }

        debug!("invoking candidate {:?}", candidate.command);
        let invocation = Invocation {
            caller: caller.clone(),
            args: parsed,
            services: options.services.clone(),
            cancel: options.cancel.clone(),
        };

        match invoke(&body, invocation, scope).await {
            Ok(value) => {
                if !options.skip_postconditions {
                    let conditions = catalog.conditions_for(candidate.command, ConditionPhase::Post);
                    let ctx = ConditionContext {
                        caller: caller.as_ref(),
                        services: &options.services,
                        cancel: &options.cancel,
                        subject: ConditionSubject::Result(&value),
                    };
                    if let Err(reason) = evaluate_conditions(conditions.iter(), &ctx).await {
                        // Post-condition failures are terminal — the command
                        // already ran, so there is no fallback (spec §7).
                        return DispatchResult::Failure(DispatchError::ConditionFailure {
                            phase: ConditionPhase::Post,
                            reason,
                        });
                    }
                }
                return DispatchResult::Success(value);
            }
            Err(reason) => {
                let err = DispatchError::InvokeFailure { reason };
                if options.fallback_on_invoke_failure {
                    DispatchError::record_if_better(&mut best_failure, err);
                    continue;
                }
                return DispatchResult::Failure(err);
            }
        }
    }

    DispatchResult::Failure(best_failure.unwrap_or(DispatchError::SearchFailure))
}
