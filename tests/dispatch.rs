//! End-to-end coverage of the dispatch pipeline through the public
//! [`commandry::Manager`] surface.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use commandry::catalog::component::{InvokeOutcome, Invocation};
use commandry::{
    CatalogBuilder, CommandBuilder, Condition, DispatchError, DispatchResult, GroupBuilder,
    ManagerBuilder, ParameterBuilder, RawValue, SimpleCaller, TypeDescriptor, Value,
};
use futures::future::BoxFuture;

fn body(
    f: impl Fn(&Invocation) -> InvokeOutcome + Send + Sync + 'static,
) -> impl Fn(Invocation) -> BoxFuture<'static, InvokeOutcome> + Send + Sync + 'static {
    move |inv: Invocation| {
        let result = f(&inv);
        Box::pin(async move { result })
    }
}

#[tokio::test]
async fn scenario_1_math_sum() {
    let manager = ManagerBuilder::new()
        .group(
            GroupBuilder::new(["math"]).command(
                CommandBuilder::new(["sum"])
                    .parameter(ParameterBuilder::new("a", TypeDescriptor::scalar::<f64>()))
                    .parameter(ParameterBuilder::new("b", TypeDescriptor::scalar::<i64>()))
                    .body(body(|inv| {
                        let a = inv.args[0].as_float().unwrap();
                        let b = inv.args[1].as_int().unwrap();
                        Ok(Value::Float(a + b as f64))
                    })),
            ),
        )
        .result_handler(commandry::manager::RespondingResultHandler)
        .build()
        .unwrap();

    let caller = Arc::new(SimpleCaller::new("1", "tester"));
    let source = commandry::ArgumentSource::from_tokens(
        ["math", "sum", "2.5", "3"].map(String::from).to_vec(),
    );
    let result = manager.execute(caller, source, None).await;
    assert_eq!(result, DispatchResult::Success(Value::Float(5.5)));
}

#[tokio::test]
async fn scenario_2_overload_disambiguated_by_parse_success() {
    let manager = ManagerBuilder::new()
        .command(
            CommandBuilder::new(["multi"])
                .parameter(ParameterBuilder::new("a", TypeDescriptor::scalar::<bool>()))
                .parameter(ParameterBuilder::new("b", TypeDescriptor::scalar::<bool>()))
                .body(body(|_inv| Ok(Value::String("bool,bool".into())))),
        )
        .command(
            CommandBuilder::new(["multi"])
                .parameter(ParameterBuilder::new("a", TypeDescriptor::scalar::<i64>()))
                .parameter(ParameterBuilder::new("b", TypeDescriptor::scalar::<i64>()))
                .body(body(|_inv| Ok(Value::String("int,int".into())))),
        )
        .result_handler(commandry::manager::RespondingResultHandler)
        .build()
        .unwrap();

    let caller = Arc::new(SimpleCaller::new("1", "tester"));
    let source = commandry::ArgumentSource::from_tokens(["multi", "1", "2"].map(String::from).to_vec());
    let result = manager.execute(caller, source, None).await;
    // "2" fails the bool overload ("2" isn't a recognized spelling), so only
    // the int,int overload produces a successful parse.
    assert_eq!(result, DispatchResult::Success(Value::String("int,int".into())));
}

#[tokio::test]
async fn scenario_3_optional_parameter_substitutes_default() {
    let manager = ManagerBuilder::new()
        .command(
            CommandBuilder::new(["greet"])
                .parameter(
                    ParameterBuilder::new("name", TypeDescriptor::scalar::<String>())
                        .optional(Value::String("default".into())),
                )
                .body(body(|inv| {
                    let name = match &inv.args[0] {
                        Value::Missing => "default".to_string(),
                        Value::String(s) => s.clone(),
                        _ => unreachable!(),
                    };
                    Ok(Value::String(format!("Hello, {name}")))
                })),
        )
        .result_handler(commandry::manager::RespondingResultHandler)
        .build()
        .unwrap();

    let caller = Arc::new(SimpleCaller::new("1", "tester"));
    let source = commandry::ArgumentSource::from_tokens(vec!["greet".into()]);
    let result = manager.execute(caller, source, None).await;
    assert_eq!(
        result,
        DispatchResult::Success(Value::String("Hello, default".to_string()))
    );
}

#[tokio::test]
async fn scenario_4_remainder_parameter_joins_trailing_tokens() {
    let manager = ManagerBuilder::new()
        .command(
            CommandBuilder::new(["echo"])
                .parameter(
                    ParameterBuilder::new("text", TypeDescriptor::scalar::<String>()).remainder(),
                )
                .body(body(|inv| Ok(inv.args[0].clone()))),
        )
        .result_handler(commandry::manager::RespondingResultHandler)
        .build()
        .unwrap();

    let caller = Arc::new(SimpleCaller::new("1", "tester"));
    let source =
        commandry::ArgumentSource::from_tokens(["echo", "hello", "world"].map(String::from).to_vec());
    let result = manager.execute(caller, source, None).await;
    assert_eq!(
        result,
        DispatchResult::Success(Value::String("hello world".to_string()))
    );
}

struct RequireRole {
    role: &'static str,
}

#[async_trait]
impl Condition for RequireRole {
    fn group_key(&self) -> &str {
        "role"
    }

    fn phase(&self) -> commandry::error::ConditionPhase {
        commandry::error::ConditionPhase::Pre
    }

    async fn evaluate(&self, ctx: &commandry::condition::ConditionContext<'_>) -> Result<(), String> {
        if ctx.caller.id() == self.role {
            Ok(())
        } else {
            Err(format!("caller lacks required role {}", self.role))
        }
    }
}

#[tokio::test]
async fn scenario_5_precondition_rejects_unauthorized_caller() {
    let manager = ManagerBuilder::new()
        .command(
            CommandBuilder::new(["admin"])
                .pre_condition(Arc::new(RequireRole { role: "admin" }))
                .body(body(|_inv| Ok(Value::Void))),
        )
        .result_handler(commandry::manager::RespondingResultHandler)
        .build()
        .unwrap();

    let caller = Arc::new(SimpleCaller::new("guest", "tester"));
    let source = commandry::ArgumentSource::from_tokens(vec!["admin".into()]);
    let result = manager.execute(caller, source, None).await;
    assert!(matches!(
        result,
        DispatchResult::Failure(DispatchError::ConditionFailure {
            phase: commandry::error::ConditionPhase::Pre,
            ..
        })
    ));
}

#[tokio::test]
async fn group_precondition_is_inherited_by_every_descendant_command() {
    let manager = ManagerBuilder::new()
        .group(
            GroupBuilder::new(["admin"])
                .pre_condition(Arc::new(RequireRole { role: "admin" }))
                .command(CommandBuilder::new(["ban"]).body(body(|_inv| Ok(Value::Void))))
                .command(CommandBuilder::new(["kick"]).body(body(|_inv| Ok(Value::Void)))),
        )
        .result_handler(commandry::manager::RespondingResultHandler)
        .build()
        .unwrap();

    let guest = Arc::new(SimpleCaller::new("guest", "tester"));
    let source = commandry::ArgumentSource::from_tokens(vec!["admin".into(), "kick".into()]);
    let result = manager.execute(guest, source, None).await;
    assert!(matches!(
        result,
        DispatchResult::Failure(DispatchError::ConditionFailure {
            phase: commandry::error::ConditionPhase::Pre,
            ..
        })
    ));

    let admin = Arc::new(SimpleCaller::new("admin", "tester"));
    let source = commandry::ArgumentSource::from_tokens(vec!["admin".into(), "ban".into()]);
    let result = manager.execute(admin, source, None).await;
    assert_eq!(result, DispatchResult::Success(Value::Void));
}

#[tokio::test]
async fn scenario_6_cancellation_before_invoke_short_circuits() {
    let invoked = Arc::new(AtomicBool::new(false));
    let invoked_clone = invoked.clone();
    let manager = ManagerBuilder::new()
        .command(
            CommandBuilder::new(["slowcmd"])
                .parameter(ParameterBuilder::new("x", TypeDescriptor::scalar::<String>()))
                .body(move |_inv: Invocation| {
                    let invoked = invoked_clone.clone();
                    let fut: BoxFuture<'static, InvokeOutcome> = Box::pin(async move {
                        invoked.store(true, Ordering::SeqCst);
                        Ok(Value::Void)
                    });
                    fut
                }),
        )
        .result_handler(commandry::manager::RespondingResultHandler)
        .build()
        .unwrap();

    let caller = Arc::new(SimpleCaller::new("1", "tester"));
    let source = commandry::ArgumentSource::from_tokens(vec!["slowcmd".into(), "x".into()]);
    let mut options = commandry::ExecuteOptions::default();
    options.cancel.cancel();
    let result = manager.execute(caller, source, Some(options)).await;
    assert_eq!(result, DispatchResult::Failure(DispatchError::Canceled));
    assert!(!invoked.load(Ordering::SeqCst));
}

#[tokio::test]
async fn empty_arguments_yield_search_failure() {
    let manager = ManagerBuilder::new()
        .command(CommandBuilder::new(["ping"]).body(body(|_inv| Ok(Value::Void))))
        .result_handler(commandry::manager::RespondingResultHandler)
        .build()
        .unwrap();

    let caller = Arc::new(SimpleCaller::new("1", "tester"));
    let source = commandry::ArgumentSource::from_tokens(vec![]);
    let result = manager.execute(caller, source, None).await;
    assert_eq!(result, DispatchResult::Failure(DispatchError::SearchFailure));
}

#[tokio::test]
async fn default_command_resolves_without_a_trailing_token() {
    let manager = ManagerBuilder::new()
        .group(
            GroupBuilder::new(["status"]).default_command(
                CommandBuilder::new(["unused"]).body(body(|_inv| Ok(Value::String("ok".into())))),
            ),
        )
        .result_handler(commandry::manager::RespondingResultHandler)
        .build()
        .unwrap();

    let caller = Arc::new(SimpleCaller::new("1", "tester"));
    let source = commandry::ArgumentSource::from_tokens(vec!["status".into()]);
    let result = manager.execute(caller, source, None).await;
    assert_eq!(result, DispatchResult::Success(Value::String("ok".to_string())));
}

#[tokio::test]
async fn higher_priority_candidate_wins_over_higher_score() {
    let manager = ManagerBuilder::new()
        .command(
            CommandBuilder::new(["thing"])
                .parameter(ParameterBuilder::new("a", TypeDescriptor::scalar::<String>()))
                .parameter(
                    ParameterBuilder::new("b", TypeDescriptor::scalar::<String>())
                        .optional(Value::String("b".into())),
                )
                .body(body(|_inv| Ok(Value::String("high-score".into())))),
        )
        .command(
            CommandBuilder::new(["thing"])
                .parameter(ParameterBuilder::new("a", TypeDescriptor::scalar::<String>()))
                .priority(10)
                .body(body(|_inv| Ok(Value::String("high-priority".into())))),
        )
        .result_handler(commandry::manager::RespondingResultHandler)
        .build()
        .unwrap();

    let caller = Arc::new(SimpleCaller::new("1", "tester"));
    let source = commandry::ArgumentSource::from_tokens(vec!["thing".into(), "x".into()]);
    let result = manager.execute(caller, source, None).await;
    assert_eq!(
        result,
        DispatchResult::Success(Value::String("high-priority".to_string()))
    );
}

#[tokio::test]
async fn named_entries_resolve_out_of_declared_order() {
    let manager = ManagerBuilder::new()
        .command(
            CommandBuilder::new(["connect"])
                .parameter(ParameterBuilder::new("host", TypeDescriptor::scalar::<String>()))
                .parameter(ParameterBuilder::new("port", TypeDescriptor::scalar::<i64>()))
                .body(body(|inv| {
                    Ok(Value::String(format!(
                        "{}:{}",
                        inv.args[0].as_str().unwrap(),
                        inv.args[1].as_int().unwrap()
                    )))
                })),
        )
        .result_handler(commandry::manager::RespondingResultHandler)
        .build()
        .unwrap();

    let caller = Arc::new(SimpleCaller::new("1", "tester"));
    let entries = vec![
        ("connect".to_string(), None),
        ("port".to_string(), Some(RawValue::text("8080"))),
        ("host".to_string(), Some(RawValue::text("localhost"))),
    ];
    let result = manager.execute_named(caller, entries, None).await;
    assert_eq!(
        result,
        DispatchResult::Success(Value::String("localhost:8080".to_string()))
    );
}

#[tokio::test]
async fn execute_str_tokenizes_quoted_segments() {
    let manager = ManagerBuilder::new()
        .command(
            CommandBuilder::new(["say"])
                .parameter(
                    ParameterBuilder::new("text", TypeDescriptor::scalar::<String>()).remainder(),
                )
                .body(body(|inv| Ok(inv.args[0].clone()))),
        )
        .result_handler(commandry::manager::RespondingResultHandler)
        .build()
        .unwrap();

    let caller = Arc::new(SimpleCaller::new("1", "tester"));
    let result = manager
        .execute_str(caller, r#"say "hello world""#, None)
        .await;
    assert_eq!(
        result,
        DispatchResult::Success(Value::String("hello world".to_string()))
    );
}

#[tokio::test]
async fn constructible_parameter_parses_child_parameters_in_place() {
    let manager = ManagerBuilder::new()
        .command(
            CommandBuilder::new(["draw"])
                .parameter(ParameterBuilder::constructible(
                    "point",
                    vec![
                        ParameterBuilder::new("x", TypeDescriptor::scalar::<i64>()),
                        ParameterBuilder::new("y", TypeDescriptor::scalar::<i64>()),
                    ],
                    |mut children| {
                        let y = children.pop().unwrap();
                        let x = children.pop().unwrap();
                        Ok(Value::String(format!(
                            "({},{})",
                            x.as_int().unwrap(),
                            y.as_int().unwrap()
                        )))
                    },
                ))
                .body(body(|inv| Ok(inv.args[0].clone()))),
        )
        .result_handler(commandry::manager::RespondingResultHandler)
        .build()
        .unwrap();

    let caller = Arc::new(SimpleCaller::new("1", "tester"));
    let source = commandry::ArgumentSource::from_tokens(
        ["draw", "3", "4"].map(String::from).to_vec(),
    );
    let result = manager.execute(caller, source, None).await;
    assert_eq!(
        result,
        DispatchResult::Success(Value::String("(3,4)".to_string()))
    );
}

#[tokio::test]
async fn optional_constructible_missing_entirely_substitutes_placeholder() {
    let manager = ManagerBuilder::new()
        .command(
            CommandBuilder::new(["draw"])
                .parameter(
                    ParameterBuilder::constructible(
                        "point",
                        vec![
                            ParameterBuilder::new("x", TypeDescriptor::scalar::<i64>()),
                            ParameterBuilder::new("y", TypeDescriptor::scalar::<i64>()),
                        ],
                        |mut children| {
                            let y = children.pop().unwrap();
                            let x = children.pop().unwrap();
                            Ok(Value::String(format!(
                                "({},{})",
                                x.as_int().unwrap(),
                                y.as_int().unwrap()
                            )))
                        },
                    )
                    .optional(Value::String("origin".into())),
                )
                .body(body(|inv| {
                    let point = match &inv.args[0] {
                        Value::Missing => "origin".to_string(),
                        Value::String(s) => s.clone(),
                        _ => unreachable!(),
                    };
                    Ok(Value::String(point))
                })),
        )
        .result_handler(commandry::manager::RespondingResultHandler)
        .build()
        .unwrap();

    let caller = Arc::new(SimpleCaller::new("1", "tester"));
    let source = commandry::ArgumentSource::from_tokens(vec!["draw".into()]);
    let result = manager.execute(caller, source, None).await;
    assert_eq!(
        result,
        DispatchResult::Success(Value::String("origin".to_string()))
    );
}

#[test]
fn catalog_builder_rejects_invoker_less_commands() {
    let registry = commandry::ParserRegistry::new();
    let result = CatalogBuilder::new()
        .command(CommandBuilder::new(["noop"]))
        .build(&registry);
    assert!(matches!(
        result,
        Err(commandry::error::BuildError::MissingInvoker { .. })
    ));
}
