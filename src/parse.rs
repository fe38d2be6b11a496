//! Parser plumbing (spec §4.4): converts a command's remaining argument
//! source into a native argument vector, respecting remainder, constructible,
//! and optional/required semantics, plus the length gate.
//!
//! A command may carry several [`Overload`]s (spec §8 scenario 2); they are
//! tried most-specific-score-first, each against its own clone of the
//! source, and the first to both pass the length gate and parse completely
//! wins. [`DispatchError::rank`] picks the most informative failure to
//! report if every overload fails.

use tokio_util::sync::CancellationToken;

use crate::catalog::component::{CommandNode, CommandShape, Overload, Parameter, ParameterKind};
use crate::context::{Caller, Services};
use crate::error::{DispatchError, LengthDirection};
use crate::parser::ParseContext;
use crate::source::ArgumentSource;
use crate::value::{RawValue, Value};

/// The length gate from spec §4.4: let `L = length`, `mn = min_length`,
/// `mx = max_length`. Parse if `mn <= L <= mx` or `(has_remainder && L >=
/// mn)`; otherwise `LengthMismatch`.
pub fn length_gate(
    min_length: usize,
    max_length: Option<usize>,
    has_remainder: bool,
    length: usize,
) -> Result<(), DispatchError> {
    let in_range = length >= min_length && max_length.map_or(true, |max| length <= max);
    let remainder_ok = has_remainder && length >= min_length;

    if in_range || remainder_ok {
        return Ok(());
    }

    let direction = if length < min_length {
        LengthDirection::TooShort
    } else {
        LengthDirection::TooLong
    };
    Err(DispatchError::length_mismatch(direction, min_length, max_length))
}

pub struct ParsePlumbing<'a> {
    pub caller: &'a dyn Caller,
    pub services: &'a Services,
    pub cancel: &'a CancellationToken,
    pub remainder_separator: char,
}

impl<'a> ParsePlumbing<'a> {
    fn ctx(&self, parameter_name: &'a str) -> ParseContext<'a> {
        ParseContext {
            caller: self.caller,
            parameter_name,
            services: self.services,
            cancel: self.cancel,
        }
    }

    /// Tries each of `command`'s overloads, most-specific-score-first,
    /// against its own clone of `source`. The first to pass the length gate
    /// and parse completely wins; `source` is advanced to match only on
    /// success. Returns the parsed arguments plus the matched overload's
    /// body to invoke.
    pub async fn parse_command(
        &self,
        command: &CommandNode,
        source: &mut ArgumentSource,
    ) -> Result<(Vec<Value>, CommandShape), DispatchError> {
        let mut overloads: Vec<&Overload> = command.overloads.iter().collect();
        overloads.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then_with(|| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal))
        });

        let mut best_failure: Option<DispatchError> = None;
        for overload in overloads {
            if self.cancel.is_cancelled() {
                return Err(DispatchError::Canceled);
            }

            let mut attempt = source.clone();
            match self.parse_overload(overload, &mut attempt).await {
                Ok(values) => {
                    *source = attempt;
                    return Ok((values, overload.body.clone()));
                }
                Err(DispatchError::Canceled) => return Err(DispatchError::Canceled),
                Err(e) => DispatchError::record_if_better(&mut best_failure, e),
            }
        }

        Err(best_failure.unwrap_or(DispatchError::SearchFailure))
    }

    async fn parse_overload(
        &self,
        overload: &Overload,
        source: &mut ArgumentSource,
    ) -> Result<Vec<Value>, DispatchError> {
        length_gate(
            overload.min_length,
            overload.max_length,
            overload.has_remainder,
            source.length(),
        )?;

        let mut values = Vec::with_capacity(overload.parameters.len());
        for parameter in &overload.parameters {
            if self.cancel.is_cancelled() {
                return Err(DispatchError::Canceled);
            }
            values.push(self.parse_parameter(parameter, source).await?);
        }
        Ok(values)
    }

    #[async_recursion::async_recursion]
    async fn parse_parameter(
        &self,
        parameter: &Parameter,
        source: &mut ArgumentSource,
    ) -> Result<Value, DispatchError> {
        if self.cancel.is_cancelled() {
            return Err(DispatchError::Canceled);
        }

        if parameter.is_remainder {
            if let ParameterKind::Leaf { parser } = &parameter.kind {
                let raw = if parameter.is_collection {
                    RawValue::Sequence(source.take_remaining())
                } else {
                    RawValue::Text(source.join_remaining(self.remainder_separator))
                };
                let ctx = self.ctx(&parameter.name);
                return parser.parse(&raw, &ctx).await.map_err(|e| {
                    DispatchError::ParseError {
                        parameter: parameter.name.clone(),
                        reason: e.reason,
                    }
                });
            }
            // A constructible parameter marked as remainder falls back to
            // ordinary constructible parsing — the data model (spec §3)
            // only documents `is-remainder` on leaf parameters.
        }

        match &parameter.kind {
            ParameterKind::Leaf { parser } => {
                match source.try_next(&parameter.name) {
                    Some(raw) => {
                        let ctx = self.ctx(&parameter.name);
                        parser.parse(&raw, &ctx).await.map_err(|e| {
                            DispatchError::ParseError {
                                parameter: parameter.name.clone(),
                                reason: e.reason,
                            }
                        })
                    }
                    None if parameter.is_optional => Ok(Value::Missing),
                    None => Err(DispatchError::MissingArgument {
                        parameter: parameter.name.clone(),
                    }),
                }
            }
            ParameterKind::Constructible { children, activator } => {
                // Snapshot before attempting: if this constructible is
                // optional and a later child fails, the tokens earlier
                // children already consumed via `try_next` must go back to
                // the source rather than being lost to the next parameter.
                let checkpoint = source.clone();

                let mut child_values = Vec::with_capacity(children.len());
                let mut first_error: Option<DispatchError> = None;
                for child in children {
                    match self.parse_parameter(child, source).await {
                        Ok(value) => child_values.push(value),
                        Err(e) => {
                            first_error = Some(e);
                            break;
                        }
                    }
                }

                match first_error {
                    None => activator(child_values).map_err(|e| DispatchError::ParseError {
                        parameter: parameter.name.clone(),
                        reason: e.reason,
                    }),
                    Some(e) if parameter.is_optional => {
                        if matches!(e, DispatchError::Canceled) {
                            Err(e)
                        } else {
                            *source = checkpoint;
                            Ok(Value::Missing)
                        }
                    }
                    Some(e) => Err(e),
                }
            }
        }
    }
}
