//! The Component Catalog (spec §4.2): the registered hierarchy of groups
//! and commands, searchable by alias path and ranked by score.

pub mod builder;
pub mod component;
pub mod search;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use component::{CommandNode, ComponentKind, Node, NodeId};

use crate::condition::Condition;
use crate::error::{BuildError, ConditionPhase};
use crate::source::NameComparer;

pub use search::SearchCandidate;

/// The Catalog exclusively owns Groups and Commands (spec §3). Parent
/// references are arena indices rather than `Weak`/`Rc` (spec §9).
pub struct Catalog {
    nodes: Vec<Node>,
    root_children: Vec<NodeId>,
    frozen: AtomicBool,
    next_registration_order: std::sync::atomic::AtomicU64,
}

impl Catalog {
    pub(crate) fn new() -> Self {
        Self {
            nodes: Vec::new(),
            root_children: Vec::new(),
            frozen: AtomicBool::new(false),
            next_registration_order: std::sync::atomic::AtomicU64::new(0),
        }
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen.load(Ordering::Acquire)
    }

    /// Freezes the catalog so it can be shared lock-free across concurrent
    /// invocations (spec §5: "freeze the catalog on first execution").
    pub fn freeze(&self) {
        self.frozen.store(true, Ordering::Release);
    }

    pub(crate) fn next_registration_order(&self) -> u64 {
        self.next_registration_order.fetch_add(1, Ordering::Relaxed)
    }

    pub(crate) fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0 as usize]
    }

    /// An existing sibling Command whose alias set is exactly `aliases`, if
    /// any — used by `builder::materialize` to merge a newly-registered
    /// command into it as an overload rather than rejecting it outright.
    pub(crate) fn find_command_sibling(
        &self,
        parent: Option<NodeId>,
        aliases: &[String],
    ) -> Option<NodeId> {
        let siblings: &[NodeId] = match parent {
            Some(parent_id) => &self.node(parent_id).as_group()?.children,
            None => &self.root_children,
        };
        siblings.iter().copied().find(|&id| {
            let node = self.node(id);
            node.as_command().is_some() && node.meta.aliases == aliases
        })
    }

    /// Appends `overload` to an existing Command node, widening `meta.score`
    /// to the new best across its overloads.
    pub(crate) fn push_overload(&mut self, id: NodeId, overload: component::Overload) {
        let node = &mut self.nodes[id.0 as usize];
        if let ComponentKind::Command(command) = &mut node.kind {
            command.overloads.push(overload);
            node.meta.score = command.best_score();
        }
    }

    pub(crate) fn push_node(&mut self, node: Node, parent: Option<NodeId>) -> Result<NodeId, BuildError> {
        let id = NodeId(self.nodes.len() as u32);

        let siblings: &[NodeId] = match parent {
            Some(parent_id) => {
                let group = self
                    .nodes
                    .get(parent_id.0 as usize)
                    .and_then(|n| n.as_group())
                    .expect("parent must be a registered group");
                &group.children
            }
            None => &self.root_children,
        };

        // A command sharing an existing sibling command's exact alias set is
        // merged as an overload before reaching this point (see
        // `builder::materialize`), so any collision seen here — Group vs
        // Group, Group vs Command, or a partial alias overlap between two
        // Commands — is a genuine ambiguity (invariant 1: sibling alias sets
        // are pairwise disjoint).
        for sibling in siblings {
            let sibling_meta = &self.node(*sibling).meta;
            for alias in &node.meta.aliases {
                if sibling_meta.has_alias(alias, false) {
                    return Err(BuildError::DuplicateAlias {
                        alias: alias.clone(),
                    });
                }
            }
        }

        self.nodes.push(node);

        match parent {
            Some(parent_id) => {
                self.nodes[parent_id.0 as usize]
                    .as_group_mut()
                    .expect("parent must be a registered group")
                    .children
                    .push(id);
            }
            None => self.root_children.push(id),
        }

        Ok(id)
    }

    pub fn root_children(&self) -> &[NodeId] {
        &self.root_children
    }

    pub fn command(&self, id: NodeId) -> Option<&CommandNode> {
        self.node(id).as_command()
    }

    /// Every condition attached to a command or inherited from an ancestor
    /// group, for a given phase, ordered root-to-leaf then by the command's
    /// own registration order (spec §4.5: "the union of its own and every
    /// ancestor group's").
    pub fn conditions_for(&self, id: NodeId, phase: ConditionPhase) -> Vec<Arc<dyn Condition>> {
        let mut chain = Vec::new();
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            chain.push(current);
            cursor = self.node(current).parent;
        }
        chain.reverse();

        let mut conditions = Vec::new();
        for node_id in chain {
            let node = self.node(node_id);
            let source = match (&node.kind, phase) {
                (ComponentKind::Group(g), ConditionPhase::Pre) => &g.pre_conditions,
                (ComponentKind::Group(g), ConditionPhase::Post) => &g.post_conditions,
                (ComponentKind::Command(c), ConditionPhase::Pre) => &c.pre_conditions,
                (ComponentKind::Command(c), ConditionPhase::Post) => &c.post_conditions,
            };
            conditions.extend(source.iter().cloned());
        }
        conditions
    }

    /// The full alias path from the root to this component, joined by
    /// spaces — used for diagnostics and condition subjects.
    pub fn full_name(&self, id: NodeId) -> String {
        let mut chain = Vec::new();
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let node = self.node(current);
            if !node.meta.is_default {
                if let Some(first_alias) = node.meta.aliases.first() {
                    chain.push(first_alias.clone());
                }
            }
            cursor = node.parent;
        }
        chain.reverse();
        chain.join(" ")
    }

    pub fn search<'a>(
        &'a self,
        args: &crate::source::ArgumentSource,
        comparer: NameComparer,
    ) -> Vec<SearchCandidate> {
        search::search(self, args, comparer)
    }
}
