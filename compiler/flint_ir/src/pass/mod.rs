//! Bottom-up tree rewriting.
//!
//! A [`Pass`] supplies per-node hooks. The driver visits children before
//! their parent, lets the hook decide what the node becomes, and splices the
//! answer back into the parent's child slot:
//!
//! - [`Rewrite::Keep`] leaves the node where it is (it may have been mutated
//!   in place),
//! - [`Rewrite::Replace`] substitutes another node,
//! - [`Rewrite::Delete`] removes the node from a list slot, clears an
//!   optional slot, or leaves an `Empty` statement in a required slot.
//!
//! Nodes flagged `fixed` are skipped together with their subtrees, which is
//! what keeps a pass idempotent over output it synthesized itself.
//!
//! Replacement nodes returned by a hook are not revisited by the same pass.

use crate::stack::ensure_sufficient_stack;
use crate::{NodeId, NodeKind, SlotMut, Tree};

/// What a hook decided for the node it was handed.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Rewrite {
    Keep,
    Replace(NodeId),
    Delete,
}

pub trait Pass {
    type Error;

    /// Called before the node's children are visited.
    fn enter(&mut self, _tree: &mut Tree, _id: NodeId) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Called after the children have been rewritten.
    fn hook(&mut self, tree: &mut Tree, id: NodeId) -> Result<Rewrite, Self::Error>;

    /// Called after [`Pass::hook`], also when the hook failed.
    fn leave(&mut self, _tree: &mut Tree, _id: NodeId) {}
}

/// Run `pass` over the subtree rooted at `id`.
pub fn rewrite<P: Pass>(pass: &mut P, tree: &mut Tree, id: NodeId) -> Result<Rewrite, P::Error> {
    if tree.is_fixed(id) {
        return Ok(Rewrite::Keep);
    }
    ensure_sufficient_stack(|| {
        pass.enter(tree, id)?;
        let mut kind = tree.take_kind(id);
        let children = rewrite_children(pass, tree, &mut kind);
        tree.restore_kind(id, kind);
        let result = children.and_then(|()| pass.hook(tree, id));
        pass.leave(tree, id);
        result
    })
}

/// Run `pass` over a root node and return the (possibly replaced) root.
/// A deleted root becomes an `Empty` node.
pub fn rewrite_root<P: Pass>(pass: &mut P, tree: &mut Tree, root: NodeId) -> Result<NodeId, P::Error> {
    Ok(match rewrite(pass, tree, root)? {
        Rewrite::Keep => root,
        Rewrite::Replace(new) => new,
        Rewrite::Delete => {
            let span = tree.span(root);
            tree.alloc(NodeKind::Empty, span)
        }
    })
}

fn rewrite_children<P: Pass>(
    pass: &mut P,
    tree: &mut Tree,
    kind: &mut NodeKind,
) -> Result<(), P::Error> {
    for slot in kind.slots_mut() {
        match slot {
            SlotMut::One(child) => match rewrite(pass, tree, *child)? {
                Rewrite::Keep => {}
                Rewrite::Replace(new) => *child = new,
                Rewrite::Delete => {
                    let span = tree.span(*child);
                    *child = tree.alloc(NodeKind::Empty, span);
                }
            },
            SlotMut::Opt(slot) => {
                if let Some(child) = *slot {
                    match rewrite(pass, tree, child)? {
                        Rewrite::Keep => {}
                        Rewrite::Replace(new) => *slot = Some(new),
                        Rewrite::Delete => *slot = None,
                    }
                }
            }
            SlotMut::List(children) => {
                let old = std::mem::take(children);
                let mut kept = Vec::with_capacity(old.len());
                for child in old {
                    match rewrite(pass, tree, child)? {
                        Rewrite::Keep => kept.push(child),
                        Rewrite::Replace(new) => kept.push(new),
                        Rewrite::Delete => {}
                    }
                }
                *children = kept;
            }
        }
    }
    Ok(())
}
