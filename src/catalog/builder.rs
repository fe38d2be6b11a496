//! The Registration API (spec §4.8 / §6's "Registration API").
//!
//! A thin, fluent builder surface over the Catalog's arena: intermediate
//! specs are plain data, materialized into the arena only at `build()`, so
//! duplicate-alias and remainder-placement checks run once, in one place.

use std::sync::Arc;

use super::component::{
    CommandNode, CommandShape, ComponentKind, ComponentMeta, GroupNode, Node, NodeId, Parameter,
    ParameterKind, parameters_length_range,
};
use super::Catalog;
use crate::condition::Condition;
use crate::error::{BuildError, ParseFailure};
use crate::parser::{ParserRegistry, TypeDescriptor};
use crate::value::Value;

/// Constructible parameters may nest up to this many levels deep (spec §3:
/// "no nested constructibles beyond configured depth").
pub const MAX_CONSTRUCTIBLE_DEPTH: usize = 4;

fn to_aliases<I, S>(aliases: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    aliases.into_iter().map(Into::into).collect()
}

enum ParameterSpecKind {
    Leaf(TypeDescriptor),
    Constructible {
        children: Vec<ParameterBuilder>,
        activator: Arc<dyn Fn(Vec<Value>) -> Result<Value, ParseFailure> + Send + Sync>,
    },
}

/// Fluent builder for a single [`Parameter`] (leaf or constructible).
pub struct ParameterBuilder {
    name: String,
    kind: ParameterSpecKind,
    is_optional: bool,
    is_nullable: bool,
    is_remainder: bool,
    default: Option<Value>,
}

impl ParameterBuilder {
    pub fn new(name: impl Into<String>, descriptor: TypeDescriptor) -> Self {
        Self {
            name: name.into(),
            kind: ParameterSpecKind::Leaf(descriptor),
            is_optional: false,
            is_nullable: false,
            is_remainder: false,
            default: None,
        }
    }

    pub fn constructible(
        name: impl Into<String>,
        children: Vec<ParameterBuilder>,
        activator: impl Fn(Vec<Value>) -> Result<Value, ParseFailure> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            kind: ParameterSpecKind::Constructible {
                children,
                activator: Arc::new(activator),
            },
            is_optional: false,
            is_nullable: false,
            is_remainder: false,
            default: None,
        }
    }

    pub fn optional(mut self, default: Value) -> Self {
        self.is_optional = true;
        self.default = Some(default);
        self
    }

    pub fn nullable(mut self) -> Self {
        self.is_nullable = true;
        self
    }

    pub fn remainder(mut self) -> Self {
        self.is_remainder = true;
        self
    }

    fn build(
        self,
        registry: &ParserRegistry,
        depth: usize,
    ) -> Result<Parameter, BuildError> {
        if depth > MAX_CONSTRUCTIBLE_DEPTH {
            return Err(BuildError::ConstructibleTooDeep {
                max_depth: MAX_CONSTRUCTIBLE_DEPTH,
            });
        }

        let (kind, is_collection) = match self.kind {
            ParameterSpecKind::Leaf(descriptor) => {
                let is_collection = descriptor.is_collection();
                let parser = registry.resolve(&descriptor)?;
                (ParameterKind::Leaf { parser }, is_collection)
            }
            ParameterSpecKind::Constructible { children, activator } => {
                if children.is_empty() {
                    return Err(BuildError::EmptyConstructible { name: self.name });
                }
                let built = children
                    .into_iter()
                    .map(|c| c.build(registry, depth + 1))
                    .collect::<Result<Vec<_>, _>>()?;
                (
                    ParameterKind::Constructible {
                        children: built,
                        activator,
                    },
                    false,
                )
            }
        };

        Ok(Parameter {
            name: self.name,
            is_optional: self.is_optional,
            is_nullable: self.is_nullable,
            is_collection,
            is_remainder: self.is_remainder,
            default: self.default,
            kind,
        })
    }
}

struct CommandSpec {
    aliases: Vec<String>,
    is_default: bool,
    attributes: Vec<String>,
    parameters: Vec<ParameterBuilder>,
    priority: i32,
    pre_conditions: Vec<Arc<dyn Condition>>,
    post_conditions: Vec<Arc<dyn Condition>>,
    body: Option<CommandShape>,
}

/// Fluent builder for a [`crate::catalog::component::CommandNode`].
pub struct CommandBuilder {
    spec: CommandSpec,
}

impl CommandBuilder {
    pub fn new<I, S>(aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            spec: CommandSpec {
                aliases: to_aliases(aliases),
                is_default: false,
                attributes: Vec::new(),
                parameters: Vec::new(),
                priority: 0,
                pre_conditions: Vec::new(),
                post_conditions: Vec::new(),
                body: None,
            },
        }
    }

    pub fn parameter(mut self, parameter: ParameterBuilder) -> Self {
        self.spec.parameters.push(parameter);
        self
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.spec.priority = priority;
        self
    }

    pub fn attribute(mut self, tag: impl Into<String>) -> Self {
        self.spec.attributes.push(tag.into());
        self
    }

    pub fn pre_condition(mut self, condition: Arc<dyn Condition>) -> Self {
        self.spec.pre_conditions.push(condition);
        self
    }

    pub fn post_condition(mut self, condition: Arc<dyn Condition>) -> Self {
        self.spec.post_conditions.push(condition);
        self
    }

    /// A static/closure-shaped body with the caller context injected (spec
    /// §4.6).
    pub fn body(
        mut self,
        body: impl Fn(crate::catalog::component::Invocation) -> futures::future::BoxFuture<'static, crate::catalog::component::InvokeOutcome>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        self.spec.body = Some(CommandShape::Static(Arc::new(body)));
        self
    }

    /// An instance-shaped body: a module instance is constructed from
    /// `factory` (given the execution's [`crate::scope::Scope`] to resolve
    /// dependencies from), then `method` is called with it (spec §4.6).
    pub fn instance(
        mut self,
        factory: impl Fn(&crate::scope::Scope) -> Box<dyn std::any::Any + Send> + Send + Sync + 'static,
        method: impl Fn(&mut (dyn std::any::Any + Send), crate::catalog::component::Invocation) -> futures::future::BoxFuture<'static, crate::catalog::component::InvokeOutcome>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        self.spec.body = Some(CommandShape::Instance {
            factory: Arc::new(factory),
            method: Arc::new(method),
        });
        self
    }

    fn finish(self) -> CommandSpec {
        self.spec
    }
}

struct GroupSpec {
    aliases: Vec<String>,
    attributes: Vec<String>,
    children: Vec<ComponentSpec>,
    pre_conditions: Vec<Arc<dyn Condition>>,
    post_conditions: Vec<Arc<dyn Condition>>,
}

enum ComponentSpec {
    Group(GroupSpec),
    Command(CommandSpec),
}

/// Fluent builder for a [`crate::catalog::component::GroupNode`].
pub struct GroupBuilder {
    spec: GroupSpec,
}

impl GroupBuilder {
    pub fn new<I, S>(aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            spec: GroupSpec {
                aliases: to_aliases(aliases),
                attributes: Vec::new(),
                children: Vec::new(),
                pre_conditions: Vec::new(),
                post_conditions: Vec::new(),
            },
        }
    }

    pub fn attribute(mut self, tag: impl Into<String>) -> Self {
        self.spec.attributes.push(tag.into());
        self
    }

    /// Attaches a pre-condition inherited by every descendant command (spec
    /// §4.5).
    pub fn pre_condition(mut self, condition: Arc<dyn Condition>) -> Self {
        self.spec.pre_conditions.push(condition);
        self
    }

    /// Attaches a post-condition inherited by every descendant command (spec
    /// §4.5).
    pub fn post_condition(mut self, condition: Arc<dyn Condition>) -> Self {
        self.spec.post_conditions.push(condition);
        self
    }

    pub fn group(mut self, group: GroupBuilder) -> Self {
        self.spec.children.push(ComponentSpec::Group(group.spec));
        self
    }

    pub fn command(mut self, command: CommandBuilder) -> Self {
        self.spec
            .children
            .push(ComponentSpec::Command(command.finish()));
        self
    }

    /// Registers `command` as this group's default command (spec glossary:
    /// "invoked when the group's own name ends the path"). Any aliases set
    /// on `command` are discarded, since a default command has none.
    pub fn default_command(mut self, command: CommandBuilder) -> Self {
        let mut built = command.finish();
        built.aliases.clear();
        built.is_default = true;
        self.spec.children.push(ComponentSpec::Command(built));
        self
    }

    fn finish(self) -> GroupSpec {
        self.spec
    }
}

/// The top-level Registration API: populates the [`Catalog`] (spec §2
/// item 8).
pub struct CatalogBuilder {
    children: Vec<ComponentSpec>,
}

impl Default for CatalogBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogBuilder {
    pub fn new() -> Self {
        Self {
            children: Vec::new(),
        }
    }

    pub fn group(mut self, group: GroupBuilder) -> Self {
        self.children.push(ComponentSpec::Group(group.finish()));
        self
    }

    pub fn command(mut self, command: CommandBuilder) -> Self {
        self.children
            .push(ComponentSpec::Command(command.finish()));
        self
    }

    pub fn default_command(mut self, command: CommandBuilder) -> Self {
        let mut built = command.finish();
        built.aliases.clear();
        built.is_default = true;
        self.children.push(ComponentSpec::Command(built));
        self
    }

    pub fn build(self, registry: &ParserRegistry) -> Result<Catalog, BuildError> {
        let mut catalog = Catalog::new();
        for child in self.children {
            materialize(&mut catalog, child, None, registry)?;
        }
        Ok(catalog)
    }
}

fn materialize(
    catalog: &mut Catalog,
    spec: ComponentSpec,
    parent: Option<NodeId>,
    registry: &ParserRegistry,
) -> Result<NodeId, BuildError> {
    match spec {
        ComponentSpec::Group(group) => {
            if group.aliases.is_empty() {
                return Err(BuildError::EmptyAliases);
            }
            let meta = ComponentMeta {
                aliases: group.aliases,
                score: 0.0,
                attributes: group.attributes,
                is_default: false,
            };
            let node = Node {
                meta,
                parent,
                kind: ComponentKind::Group(GroupNode {
                    children: Vec::new(),
                    pre_conditions: group.pre_conditions,
                    post_conditions: group.post_conditions,
                }),
            };
            let id = catalog.push_node(node, parent)?;
            for child in group.children {
                materialize(catalog, child, Some(id), registry)?;
            }
            Ok(id)
        }
        ComponentSpec::Command(command) => {
            if !command.is_default && command.aliases.is_empty() {
                return Err(BuildError::EmptyAliases);
            }

            let aliases = command.aliases.clone();
            let body = command
                .body
                .ok_or(BuildError::MissingInvoker { aliases })?;

            let parameters = command
                .parameters
                .into_iter()
                .map(|p| p.build(registry, 0))
                .collect::<Result<Vec<_>, _>>()?;

            let remainder_count = parameters.iter().filter(|p| p.is_remainder).count();
            let last_is_remainder = parameters.last().map(|p| p.is_remainder).unwrap_or(false);
            if remainder_count > 1 || (remainder_count == 1 && !last_is_remainder) {
                return Err(BuildError::InvalidRemainderPlacement);
            }

            let (min_length, max_length) = parameters_length_range(&parameters);
            if let Some(max) = max_length {
                if min_length > max {
                    return Err(BuildError::InvalidLengthRange {
                        min: min_length,
                        max,
                    });
                }
            }

            let score = 1.0 + parameters.iter().map(Parameter::score).sum::<f64>();
            let overload = super::component::Overload {
                parameters,
                min_length,
                max_length,
                has_remainder: remainder_count == 1,
                body,
                score,
                priority: command.priority,
            };

            // A command sharing an existing sibling command's exact alias
            // set is an overload of it (spec §8 scenario 2), not a
            // conflicting registration — invariant 1's "pairwise disjoint"
            // aliases holds at the Catalog-node level, where overloads of
            // one name still occupy a single node.
            if !command.is_default {
                if let Some(existing) = catalog.find_command_sibling(parent, &command.aliases) {
                    catalog.push_overload(existing, overload);
                    return Ok(existing);
                }
            }

            let registration_order = catalog.next_registration_order();
            let meta = ComponentMeta {
                aliases: command.aliases,
                score,
                attributes: command.attributes,
                is_default: command.is_default,
            };
            let node = Node {
                meta,
                parent,
                kind: ComponentKind::Command(CommandNode {
                    overloads: vec![overload],
                    pre_conditions: command.pre_conditions,
                    post_conditions: command.post_conditions,
                    registration_order,
                }),
            };
            catalog.push_node(node, parent)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ParserRegistry;

    fn noop_body(
        _inv: crate::catalog::component::Invocation,
    ) -> futures::future::BoxFuture<'static, crate::catalog::component::InvokeOutcome> {
        Box::pin(async { Ok(Value::Void) })
    }

    #[test]
    fn duplicate_group_alias_among_siblings_is_rejected() {
        let registry = ParserRegistry::new();
        let result = CatalogBuilder::new()
            .group(GroupBuilder::new(["math"]))
            .group(GroupBuilder::new(["math"]))
            .build(&registry);
        assert!(matches!(result, Err(BuildError::DuplicateAlias { .. })));
    }

    #[test]
    fn group_and_command_sharing_an_alias_is_rejected() {
        let registry = ParserRegistry::new();
        let result = CatalogBuilder::new()
            .group(GroupBuilder::new(["math"]))
            .command(CommandBuilder::new(["math"]).body(noop_body))
            .build(&registry);
        assert!(matches!(result, Err(BuildError::DuplicateAlias { .. })));
    }

    #[test]
    fn commands_may_overload_the_same_alias() {
        let registry = ParserRegistry::new();
        let catalog = CatalogBuilder::new()
            .command(
                CommandBuilder::new(["multi"])
                    .parameter(ParameterBuilder::new("a", TypeDescriptor::scalar::<bool>()))
                    .parameter(ParameterBuilder::new("b", TypeDescriptor::scalar::<bool>()))
                    .body(noop_body),
            )
            .command(
                CommandBuilder::new(["multi"])
                    .parameter(ParameterBuilder::new("a", TypeDescriptor::scalar::<i64>()))
                    .parameter(ParameterBuilder::new("b", TypeDescriptor::scalar::<i64>()))
                    .body(noop_body),
            )
            .build(&registry)
            .unwrap();
        assert_eq!(catalog.root_children().len(), 1);
        let id = catalog.root_children()[0];
        assert_eq!(catalog.command(id).unwrap().overloads.len(), 2);
    }

    #[test]
    fn remainder_must_be_last() {
        let registry = ParserRegistry::new();
        let result = CatalogBuilder::new()
            .command(
                CommandBuilder::new(["echo"])
                    .parameter(
                        ParameterBuilder::new("text", TypeDescriptor::scalar::<String>())
                            .remainder(),
                    )
                    .parameter(ParameterBuilder::new("trailing", TypeDescriptor::scalar::<i64>()))
                    .body(noop_body),
            )
            .build(&registry);
        assert!(matches!(
            result,
            Err(BuildError::InvalidRemainderPlacement)
        ));
    }

    #[test]
    fn missing_invoker_is_rejected() {
        let registry = ParserRegistry::new();
        let result = CatalogBuilder::new()
            .command(CommandBuilder::new(["noop"]))
            .build(&registry);
        assert!(matches!(result, Err(BuildError::MissingInvoker { .. })));
    }

    #[test]
    fn score_reflects_required_and_optional_parameters() {
        let registry = ParserRegistry::new();
        let catalog = CatalogBuilder::new()
            .command(
                CommandBuilder::new(["sum"])
                    .parameter(ParameterBuilder::new("a", TypeDescriptor::scalar::<f64>()))
                    .parameter(
                        ParameterBuilder::new("b", TypeDescriptor::scalar::<i64>())
                            .optional(Value::Int(0)),
                    )
                    .body(noop_body),
            )
            .build(&registry)
            .unwrap();
        let id = catalog.root_children()[0];
        let score = catalog.node(id).meta.score;
        // base 1.0 + required(1.0) + optional(1.0 - 0.5) = 2.5
        assert!((score - 2.5).abs() < f64::EPSILON);
    }
}
