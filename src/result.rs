//! The Result Model (spec §3, §7): the sum type of results carried through
//! the pipeline. Exactly one variant is ever populated per execution.

use crate::error::DispatchError;
use crate::value::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum DispatchResult {
    Success(Value),
    Failure(DispatchError),
}

impl DispatchResult {
    pub fn is_success(&self) -> bool {
        matches!(self, DispatchResult::Success(_))
    }

    pub fn success_value(&self) -> Option<&Value> {
        match self {
            DispatchResult::Success(v) => Some(v),
            DispatchResult::Failure(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&DispatchError> {
        match self {
            DispatchResult::Failure(e) => Some(e),
            DispatchResult::Success(_) => None,
        }
    }
}
