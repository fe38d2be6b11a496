//! The Component/Group/Command/Parameter data model (spec §3).

use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::condition::Condition;
use crate::context::{Caller, Services};
use crate::error::ParseFailure;
use crate::parser::Parser;
use crate::scope::Scope;
use crate::value::Value;

/// An index into [`super::Catalog`]'s node arena. Parent references are
/// by-index rather than `Weak`/`Rc`, which keeps the catalog plainly
/// `Send + Sync` and avoids a strong ownership cycle (spec §9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

/// Attributes/aliases/score shared by groups and commands.
#[derive(Debug, Clone)]
pub struct ComponentMeta {
    pub aliases: Vec<String>,
    pub score: f64,
    pub attributes: Vec<String>,
    pub is_default: bool,
}

impl ComponentMeta {
    pub fn has_alias(&self, token: &str, ignore_case: bool) -> bool {
        self.aliases.iter().any(|a| {
            if ignore_case {
                a.eq_ignore_ascii_case(token)
            } else {
                a == token
            }
        })
    }
}

pub struct GroupNode {
    pub children: Vec<NodeId>,
    /// Conditions attached directly to this group, inherited by every
    /// descendant command (spec §4.5: "the union of its own and every
    /// ancestor group's").
    pub pre_conditions: Vec<Arc<dyn Condition>>,
    pub post_conditions: Vec<Arc<dyn Condition>>,
}

/// The outcome of a command body: a parsed return [`Value`], or a reason
/// string the pipeline wraps as `InvokeFailure` (spec §7).
pub type InvokeOutcome = Result<Value, String>;

/// The bundle of per-invocation state a command body receives.
pub struct Invocation {
    pub caller: Arc<dyn Caller>,
    pub args: Vec<Value>,
    pub services: Services,
    pub cancel: tokio_util::sync::CancellationToken,
}

/// The two invocation shapes from spec §4.6: a free callable with the
/// caller context injected, or an instance constructed from a factory and
/// then populated/called. The instance factory is handed the execution's
/// [`Scope`] so it can resolve dependencies out of `Scope::services` and
/// register release hooks that fire when the scope is dropped at the end of
/// the invocation (spec §9: "module instance creation via container maps to
/// a factory callback... the framework calls the factory before invocation
/// and disposes the scope afterward").
#[derive(Clone)]
pub enum CommandShape {
    Static(Arc<dyn Fn(Invocation) -> BoxFuture<'static, InvokeOutcome> + Send + Sync>),
    Instance {
        factory: Arc<dyn Fn(&Scope) -> Box<dyn std::any::Any + Send> + Send + Sync>,
        method: Arc<
            dyn Fn(&mut (dyn std::any::Any + Send), Invocation) -> BoxFuture<'static, InvokeOutcome>
                + Send
                + Sync,
        >,
    },
}

impl fmt::Debug for CommandShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandShape::Static(_) => write!(f, "CommandShape::Static(..)"),
            CommandShape::Instance { .. } => write!(f, "CommandShape::Instance(..)"),
        }
    }
}

/// A parameter's target-value kind: a parser-backed leaf, or an aggregate
/// built by recursively parsing child parameters (spec's "constructible
/// parameter").
pub enum ParameterKind {
    Leaf {
        parser: Arc<dyn Parser>,
    },
    Constructible {
        children: Vec<Parameter>,
        activator: Arc<dyn Fn(Vec<Value>) -> Result<Value, ParseFailure> + Send + Sync>,
    },
}

impl fmt::Debug for ParameterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterKind::Leaf { parser } => f
                .debug_struct("Leaf")
                .field("parser", &parser.target_type_name())
                .finish(),
            ParameterKind::Constructible { children, .. } => f
                .debug_struct("Constructible")
                .field("children", children)
                .finish(),
        }
    }
}

#[derive(Debug)]
pub struct Parameter {
    pub name: String,
    pub is_optional: bool,
    pub is_nullable: bool,
    pub is_collection: bool,
    pub is_remainder: bool,
    pub default: Option<Value>,
    pub kind: ParameterKind,
}

impl Parameter {
    /// spec §4.2's per-parameter score contribution, recursive over
    /// constructible children.
    pub fn score(&self) -> f64 {
        let mut s = 1.0;
        if self.is_optional {
            s -= 0.5;
        }
        if self.is_nullable {
            s -= 0.25;
        }
        if let ParameterKind::Constructible { children, .. } = &self.kind {
            s += children.iter().map(Parameter::score).sum::<f64>();
        }
        s
    }

    /// The (min, max) count of argument-source slots this parameter
    /// consumes; `max = None` means unbounded (a remainder).
    pub fn length_range(&self) -> (usize, Option<usize>) {
        if self.is_remainder {
            return (usize::from(!self.is_optional), None);
        }
        match &self.kind {
            ParameterKind::Leaf { .. } => {
                if self.is_optional {
                    (0, Some(1))
                } else {
                    (1, Some(1))
                }
            }
            ParameterKind::Constructible { children, .. } => {
                let (cmin, cmax) = parameters_length_range(children);
                if self.is_optional {
                    (0, cmax)
                } else {
                    (cmin, cmax)
                }
            }
        }
    }
}

pub fn parameters_length_range(params: &[Parameter]) -> (usize, Option<usize>) {
    let mut min = 0usize;
    let mut max = Some(0usize);
    for p in params {
        let (pmin, pmax) = p.length_range();
        min += pmin;
        max = match (max, pmax) {
            (Some(a), Some(b)) => Some(a + b),
            _ => None,
        };
    }
    (min, max)
}

/// One callable signature of a (possibly overloaded) command — a source
/// registering several methods under the same name collapses them into one
/// [`CommandNode`] with one `Overload` each, rather than several sibling
/// nodes, so alias sets stay pairwise-disjoint among siblings while still
/// supporting overload resolution (spec §8 scenario 2, invariant 1).
pub struct Overload {
    pub parameters: Vec<Parameter>,
    pub min_length: usize,
    pub max_length: Option<usize>,
    pub has_remainder: bool,
    pub body: CommandShape,
    /// base 1.0 + per-parameter contribution (spec §4.2); used as the
    /// secondary sort key when trying overloads during parsing.
    pub score: f64,
    /// Priority is per-overload (spec §8 scenario 2: "overload with higher
    /// priority chosen first; if it fails length/parse, the lower-priority
    /// overload runs") — overloads of the same alias can rank differently
    /// from each other independent of their parameter score.
    pub priority: i32,
}

pub struct CommandNode {
    pub overloads: Vec<Overload>,
    pub pre_conditions: Vec<Arc<dyn Condition>>,
    pub post_conditions: Vec<Arc<dyn Condition>>,
    /// Stable tiebreaker for candidates of equal priority and score.
    pub registration_order: u64,
}

impl CommandNode {
    /// The best score across overloads — what [`super::search`] ranks this
    /// command against its siblings with; individual overload selection
    /// happens later, during parsing.
    pub fn best_score(&self) -> f64 {
        self.overloads
            .iter()
            .map(|o| o.score)
            .fold(0.0, f64::max)
    }

    /// The best priority across overloads — used the same way as
    /// `best_score` for cross-command search ranking.
    pub fn best_priority(&self) -> i32 {
        self.overloads
            .iter()
            .map(|o| o.priority)
            .max()
            .unwrap_or(0)
    }
}

pub enum ComponentKind {
    Group(GroupNode),
    Command(CommandNode),
}

pub struct Node {
    pub meta: ComponentMeta,
    pub parent: Option<NodeId>,
    pub kind: ComponentKind,
}

impl Node {
    pub fn as_group(&self) -> Option<&GroupNode> {
        match &self.kind {
            ComponentKind::Group(g) => Some(g),
            _ => None,
        }
    }

    pub fn as_group_mut(&mut self) -> Option<&mut GroupNode> {
        match &mut self.kind {
            ComponentKind::Group(g) => Some(g),
            _ => None,
        }
    }

    pub fn as_command(&self) -> Option<&CommandNode> {
        match &self.kind {
            ComponentKind::Command(c) => Some(c),
            _ => None,
        }
    }
}
