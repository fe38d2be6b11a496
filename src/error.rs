//! Error taxonomy for the dispatch pipeline (spec §7).
//!
//! `BuildError` is raised only from the registration surface (`catalog::builder`,
//! `parser::registry`) and never seen by the execution path. `DispatchError`
//! is the terminal, per-`execute` failure delivered to a [`crate::manager::ResultHandler`]
//! when no candidate produced a `Success`.

use thiserror::Error;

/// Errors raised while building a [`crate::catalog::Catalog`] or
/// [`crate::parser::registry::ParserRegistry`].
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BuildError {
    #[error("alias {alias:?} is already registered under the same parent")]
    DuplicateAlias { alias: String },

    #[error("component must declare at least one alias unless it is a default command")]
    EmptyAliases,

    #[error("command has more than one remainder parameter, or its remainder parameter is not last")]
    InvalidRemainderPlacement,

    #[error("constructible parameter {name:?} must have at least one child parameter")]
    EmptyConstructible { name: String },

    #[error("constructible parameter nesting exceeds the configured depth of {max_depth}")]
    ConstructibleTooDeep { max_depth: usize },

    #[error("min_length {min} exceeds max_length {max}")]
    InvalidLengthRange { min: usize, max: usize },

    #[error("no parser is registered for type {type_name}")]
    UnsupportedType { type_name: &'static str },

    #[error("{shape} cannot wrap another collection type ({inner_shape})")]
    NestedCollection {
        shape: &'static str,
        inner_shape: &'static str,
    },

    #[error("the catalog is frozen; registration after the first execute() is not permitted")]
    CatalogFrozen,

    #[error("a result handler must be registered before build()")]
    NoResultHandler,

    #[error("command {aliases:?} has no invoker; call .body(...) or .instance(...) before build()")]
    MissingInvoker { aliases: Vec<String> },
}

/// The reason a single [`crate::parser::Parser`] rejected a raw value.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("{reason}")]
pub struct ParseFailure {
    pub reason: String,
}

impl ParseFailure {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    /// Tag this failure with the index of the array/list/set element that
    /// produced it, per spec §4.1's "index-tagged error" requirement.
    pub fn at_index(self, index: usize) -> Self {
        Self {
            reason: format!("index {index}: {}", self.reason),
        }
    }
}

/// Whether an argument count fell short of or exceeded the command's range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthDirection {
    TooShort,
    TooLong,
}

/// Which phase a condition was evaluated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionPhase {
    Pre,
    Post,
}

impl std::fmt::Display for ConditionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConditionPhase::Pre => write!(f, "pre"),
            ConditionPhase::Post => write!(f, "post"),
        }
    }
}

/// The terminal error taxonomy carried inside [`crate::result::DispatchResult`].
///
/// Exactly one variant is ever populated per `execute` call (spec §7's
/// "exactly one `Result` delivered").
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DispatchError {
    #[error("no registered command matched the given arguments")]
    SearchFailure,

    #[error("argument count mismatch ({direction:?}): expected [{min}, {max_display}]")]
    LengthMismatch {
        direction: LengthDirection,
        min: usize,
        /// `None` represents the unbounded max a remainder parameter allows.
        max: Option<usize>,
        max_display: String,
    },

    #[error("failed to parse parameter {parameter:?}: {reason}")]
    ParseError { parameter: String, reason: String },

    #[error("missing required argument {parameter:?}")]
    MissingArgument { parameter: String },

    #[error("{phase} condition failed: {reason}")]
    ConditionFailure {
        phase: ConditionPhase,
        reason: String,
    },

    #[error("command body failed: {reason}")]
    InvokeFailure { reason: String },

    #[error("execution was canceled")]
    Canceled,

    #[error("internal failure: {0}")]
    InternalFailure(String),
}

impl DispatchError {
    pub fn length_mismatch(direction: LengthDirection, min: usize, max: Option<usize>) -> Self {
        let max_display = match max {
            Some(m) => m.to_string(),
            None => "∞".to_string(),
        };
        Self::LengthMismatch {
            direction,
            min,
            max,
            max_display,
        }
    }

    /// The precedence used when no candidate succeeds (spec §4.6 step 3):
    /// condition failure > parse failure > length mismatch > search-miss.
    pub fn rank(&self) -> FailureRank {
        match self {
            DispatchError::ConditionFailure { .. } => FailureRank::Condition,
            DispatchError::ParseError { .. } | DispatchError::MissingArgument { .. } => {
                FailureRank::Parse
            }
            DispatchError::LengthMismatch { .. } => FailureRank::Length,
            DispatchError::SearchFailure => FailureRank::Search,
            DispatchError::InvokeFailure { .. } => FailureRank::Invoke,
            DispatchError::Canceled => FailureRank::Canceled,
            DispatchError::InternalFailure(_) => FailureRank::Internal,
        }
    }

    /// Replaces `*best` with `candidate` if the latter ranks higher, per
    /// [`DispatchError::rank`]. Shared by the cross-candidate loop in
    /// `pipeline::run` and the cross-overload loop in `parse::ParsePlumbing`.
    pub fn record_if_better(best: &mut Option<DispatchError>, candidate: DispatchError) {
        let replace = match best {
            None => true,
            Some(current) => candidate.rank() > current.rank(),
        };
        if replace {
            *best = Some(candidate);
        }
    }
}

/// Total order over failure kinds used to pick the "most informative" local
/// failure once every search candidate has been exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FailureRank {
    Search,
    Length,
    Parse,
    Condition,
    Invoke,
    Canceled,
    Internal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_rank_orders_condition_above_parse_above_length_above_search() {
        assert!(FailureRank::Condition > FailureRank::Parse);
        assert!(FailureRank::Parse > FailureRank::Length);
        assert!(FailureRank::Length > FailureRank::Search);
    }

    #[test]
    fn parse_failure_tags_index() {
        let f = ParseFailure::new("not a number").at_index(2);
        assert_eq!(f.reason, "index 2: not a number");
    }
}
