//! The Search algorithm (spec §4.2).

use super::component::{ComponentKind, NodeId};
use super::Catalog;
use crate::source::{ArgumentSource, NameComparer};

/// One candidate yielded by [`Catalog::search`]: a command and the count of
/// leading positional tokens consumed as its name path ("search height").
#[derive(Debug, Clone, Copy)]
pub struct SearchCandidate {
    pub command: NodeId,
    pub search_height: usize,
    priority: i32,
    score: f64,
    registration_order: u64,
}

/// Starting at the root, for each positional token at index `i`: recurse
/// into matching Groups, yield matching Commands, and also yield each
/// Group's default command at the current index (spec §4.2).
pub fn search(
    catalog: &Catalog,
    args: &ArgumentSource,
    comparer: NameComparer,
) -> Vec<SearchCandidate> {
    let mut candidates = Vec::new();
    visit(catalog, catalog.root_children(), 0, args, comparer, &mut candidates);

    // Priority descending, then score descending, then registration order
    // ascending (stable tiebreak) — spec §4.2.
    candidates.sort_by(|a, b| {
        b.priority
            .cmp(&a.priority)
            .then_with(|| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal))
            .then_with(|| a.registration_order.cmp(&b.registration_order))
    });
    candidates
}

fn visit(
    catalog: &Catalog,
    children: &[NodeId],
    index: usize,
    args: &ArgumentSource,
    comparer: NameComparer,
    out: &mut Vec<SearchCandidate>,
) {
    // Yield every default command at this level, regardless of whether a
    // token remains at `index` (spec: "support no-subcommand invocation at
    // that level").
    for &child_id in children {
        let node = catalog.node(child_id);
        if node.meta.is_default {
            if let Some(command) = node.as_command() {
                out.push(SearchCandidate {
                    command: child_id,
                    search_height: index,
                    priority: command.best_priority(),
                    score: node.meta.score,
                    registration_order: command.registration_order,
                });
            }
        }
    }

    let Some(token) = args.try_peek_positional(index) else {
        return;
    };
    let ignore_case = matches!(comparer, NameComparer::OrdinalIgnoreCase);

    for &child_id in children {
        let node = catalog.node(child_id);
        if !node.meta.has_alias(token, ignore_case) {
            continue;
        }
        match &node.kind {
            ComponentKind::Group(group) => {
                visit(catalog, &group.children, index + 1, args, comparer, out);
            }
            ComponentKind::Command(command) => {
                out.push(SearchCandidate {
                    command: child_id,
                    search_height: index + 1,
                    priority: command.best_priority(),
                    score: node.meta.score,
                    registration_order: command.registration_order,
                });
            }
        }
    }
}
