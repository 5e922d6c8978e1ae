//! Structural checks between passes.
//!
//! These walk the whole tree, so the pipeline only runs them in debug
//! builds. They are public so tests and tools can report on a tree
//! directly.

use flint_ir::{NodeId, NodeKind, Tree};

/// Expressions reachable from `root` that have no type.
pub fn untyped_expressions(tree: &Tree, root: NodeId) -> Vec<NodeId> {
    tree.descendants(root)
        .into_iter()
        .filter(|&id| tree.kind(id).is_expression() && tree.ty(id).is_none())
        .collect()
}

/// Nodes reachable from `root` that lowering should have removed, with
/// their kind names.
pub fn unlowered_nodes(tree: &Tree, root: NodeId) -> Vec<(NodeId, &'static str)> {
    tree.descendants(root)
        .into_iter()
        .filter(|&id| match tree.kind(id) {
            NodeKind::Deref { .. }
            | NodeKind::AddressOf { .. }
            | NodeKind::Cast { .. }
            | NodeKind::Sizeof { .. }
            | NodeKind::New { .. }
            | NodeKind::Delete { .. }
            | NodeKind::StackAddress { .. }
            | NodeKind::TypeAlias { .. }
            | NodeKind::StructDecl { .. }
            | NodeKind::Extern { .. } => true,
            // Field access on a struct value is an offset computation.
            NodeKind::Member { object, .. } => {
                let ty = tree.ty(*object);
                !ty.is_none() && !ty.is_dyn()
            }
            _ => false,
        })
        .map(|id| (id, tree.kind(id).name()))
        .collect()
}

/// Debug check: every expression has been typed.
pub fn assert_typed(tree: &Tree, root: NodeId) {
    let missing = untyped_expressions(tree, root);
    debug_assert!(
        missing.is_empty(),
        "untyped expressions after transform: {:?}",
        missing
            .iter()
            .map(|&id| (id, tree.kind(id).name()))
            .collect::<Vec<_>>(),
    );
}

/// Debug check: no high-level memory operation survived lowering.
pub fn assert_lowered(tree: &Tree, root: NodeId) {
    let left = unlowered_nodes(tree, root);
    debug_assert!(left.is_empty(), "unlowered nodes: {left:?}");
}
