//! The two-phase condition evaluator (spec §4.5).
//!
//! Conditions attached to a command are the union of its own and every
//! ancestor group's (assembled by [`crate::catalog::Catalog::conditions_for`]).
//! Conditions sharing a group key are OR-combined; distinct group keys are
//! AND-combined. Evaluation is sequential in registration order and
//! short-circuits on the first decisive (whole-group) failure.

use async_trait::async_trait;
use indexmap::IndexMap;
use tokio_util::sync::CancellationToken;

use crate::context::{Caller, Services};
use crate::error::ConditionPhase;
use crate::value::Value;

/// What a condition is being evaluated against: the about-to-run command
/// (pre-phase) or its result (post-phase).
pub enum ConditionSubject<'a> {
    Command { full_name: &'a str },
    Result(&'a Value),
}

pub struct ConditionContext<'a> {
    pub caller: &'a dyn Caller,
    pub services: &'a Services,
    pub cancel: &'a CancellationToken,
    pub subject: ConditionSubject<'a>,
}

/// spec §6's condition contract:
/// `evaluate(caller, command_or_result, services, cancel) -> Result<unit, error>`.
#[async_trait]
pub trait Condition: Send + Sync {
    /// Conditions sharing a group key are OR-combined.
    fn group_key(&self) -> &str;

    fn phase(&self) -> ConditionPhase;

    async fn evaluate(&self, ctx: &ConditionContext<'_>) -> Result<(), String>;
}

/// Evaluates an ordered list of conditions already filtered to a single
/// phase, applying the group-key OR/AND semantics.
///
/// Returns `Ok(())` if every group has at least one satisfied condition, or
/// `Err(reason)` from the first group whose conditions all failed — the
/// reason of the *last* condition tried in that group, since that is the
/// most recent decisive evidence against it.
pub async fn evaluate_conditions<'a>(
    conditions: impl IntoIterator<Item = &'a std::sync::Arc<dyn Condition>>,
    ctx: &ConditionContext<'_>,
) -> Result<(), String> {
    // Preserve first-seen group order, and within each group the
    // registration order of its members.
    let mut groups: IndexMap<String, Vec<&std::sync::Arc<dyn Condition>>> = IndexMap::new();
    for condition in conditions {
        groups
            .entry(condition.group_key().to_string())
            .or_default()
            .push(condition);
    }

    for (_, members) in groups {
        let mut last_error: Option<String> = None;
        let mut satisfied = false;
        for condition in members {
            match condition.evaluate(ctx).await {
                Ok(()) => {
                    satisfied = true;
                    break;
                }
                Err(reason) => last_error = Some(reason),
            }
        }
        if !satisfied {
            return Err(last_error.unwrap_or_else(|| "condition group had no members".to_string()));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{empty_services, SimpleCaller};
    use std::sync::Arc;

    struct Always {
        group: &'static str,
        phase: ConditionPhase,
        ok: bool,
        reason: &'static str,
    }

    #[async_trait]
    impl Condition for Always {
        fn group_key(&self) -> &str {
            self.group
        }
        fn phase(&self) -> ConditionPhase {
            self.phase
        }
        async fn evaluate(&self, _ctx: &ConditionContext<'_>) -> Result<(), String> {
            if self.ok {
                Ok(())
            } else {
                Err(self.reason.to_string())
            }
        }
    }

    fn ctx<'a>(caller: &'a SimpleCaller, services: &'a Services, cancel: &'a CancellationToken) -> ConditionContext<'a> {
        ConditionContext {
            caller,
            services,
            cancel,
            subject: ConditionSubject::Command { full_name: "cmd" },
        }
    }

    #[tokio::test]
    async fn or_within_group_succeeds_if_any_member_succeeds() {
        let caller = SimpleCaller::new("1", "t");
        let services = empty_services();
        let cancel = CancellationToken::new();
        let conditions: Vec<Arc<dyn Condition>> = vec![
            Arc::new(Always {
                group: "role",
                phase: ConditionPhase::Pre,
                ok: false,
                reason: "not admin",
            }),
            Arc::new(Always {
                group: "role",
                phase: ConditionPhase::Pre,
                ok: true,
                reason: "",
            }),
        ];
        let refs: Vec<_> = conditions.iter().collect();
        assert!(evaluate_conditions(refs, &ctx(&caller, &services, &cancel))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn and_across_groups_fails_if_any_group_fails() {
        let caller = SimpleCaller::new("1", "t");
        let services = empty_services();
        let cancel = CancellationToken::new();
        let conditions: Vec<Arc<dyn Condition>> = vec![
            Arc::new(Always {
                group: "role",
                phase: ConditionPhase::Pre,
                ok: true,
                reason: "",
            }),
            Arc::new(Always {
                group: "quota",
                phase: ConditionPhase::Pre,
                ok: false,
                reason: "over quota",
            }),
        ];
        let refs: Vec<_> = conditions.iter().collect();
        let err = evaluate_conditions(refs, &ctx(&caller, &services, &cancel))
            .await
            .unwrap_err();
        assert_eq!(err, "over quota");
    }
}
