//! Node arena.
//!
//! The tree owns every node of a compile job. Nodes are addressed by
//! [`NodeId`]; the static type of each node lives in a side-table parallel to
//! the node storage so passes can decorate nodes without touching their kind.

use std::mem;

use crate::{Node, NodeId, NodeKind, Span, TypeId};

#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tree {
    nodes: Vec<Node>,
    types: Vec<TypeId>,
}

impl Tree {
    pub fn new() -> Self {
        Tree::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Tree {
            nodes: Vec::with_capacity(capacity),
            types: Vec::with_capacity(capacity),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Allocate an untyped node.
    pub fn alloc(&mut self, kind: NodeKind, span: Span) -> NodeId {
        self.push(kind, span, TypeId::NONE, false)
    }

    /// Allocate a node with its type already known.
    pub fn alloc_typed(&mut self, kind: NodeKind, span: Span, ty: TypeId) -> NodeId {
        self.push(kind, span, ty, false)
    }

    /// Allocate a finalised node that later passes will not revisit.
    pub fn alloc_fixed(&mut self, kind: NodeKind, span: Span, ty: TypeId) -> NodeId {
        self.push(kind, span, ty, true)
    }

    fn push(&mut self, kind: NodeKind, span: Span, ty: TypeId, fixed: bool) -> NodeId {
        let id = NodeId::new(self.nodes.len() as u32);
        self.nodes.push(Node { kind, span, fixed });
        self.types.push(ty);
        id
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    #[inline]
    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.index()].kind
    }

    #[inline]
    pub fn kind_mut(&mut self, id: NodeId) -> &mut NodeKind {
        &mut self.nodes[id.index()].kind
    }

    #[inline]
    pub fn span(&self, id: NodeId) -> Span {
        self.nodes[id.index()].span
    }

    #[inline]
    pub fn ty(&self, id: NodeId) -> TypeId {
        self.types[id.index()]
    }

    #[inline]
    pub fn set_ty(&mut self, id: NodeId, ty: TypeId) {
        self.types[id.index()] = ty;
    }

    #[inline]
    pub fn is_fixed(&self, id: NodeId) -> bool {
        self.nodes[id.index()].fixed
    }

    #[inline]
    pub fn set_fixed(&mut self, id: NodeId) {
        self.nodes[id.index()].fixed = true;
    }

    /// Replace a node's kind in place, keeping its span and type.
    pub fn replace_kind(&mut self, id: NodeId, kind: NodeKind) -> NodeKind {
        mem::replace(&mut self.nodes[id.index()].kind, kind)
    }

    /// Move the kind out for child rewriting. Must be paired with
    /// [`Tree::restore_kind`].
    pub(crate) fn take_kind(&mut self, id: NodeId) -> NodeKind {
        mem::take(&mut self.nodes[id.index()].kind)
    }

    pub(crate) fn restore_kind(&mut self, id: NodeId, kind: NodeKind) {
        self.nodes[id.index()].kind = kind;
    }

    /// Name of an identifier node.
    pub fn ident_name(&self, id: NodeId) -> Option<&str> {
        match self.kind(id) {
            NodeKind::Ident { name } => Some(name),
            _ => None,
        }
    }

    /// Deep copy of a subtree. Types, spans and `fixed` flags are preserved.
    pub fn deep_clone(&mut self, id: NodeId) -> NodeId {
        let mut kind = self.kind(id).clone();
        for slot in kind.slots_mut() {
            match slot {
                crate::SlotMut::One(child) => *child = self.deep_clone(*child),
                crate::SlotMut::Opt(child) => {
                    if let Some(child) = child {
                        *child = self.deep_clone(*child);
                    }
                }
                crate::SlotMut::List(children) => {
                    for child in children.iter_mut() {
                        *child = self.deep_clone(*child);
                    }
                }
            }
        }
        let node = self.node(id);
        let (span, fixed) = (node.span, node.fixed);
        self.push(kind, span, self.ty(id), fixed)
    }

    /// Every node reachable from `root`, in pre-order.
    pub fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            out.push(id);
            let children = self.kind(id).children();
            stack.extend(children.into_iter().rev());
        }
        out
    }
}
