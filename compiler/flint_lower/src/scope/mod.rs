//! Scopes, frames and variables.
//!
//! A [`Frame`] is the unit of stack allocation: the program and every
//! function get one. Frames contain a tree of [`Scope`]s (blocks and loop
//! bodies), and every variable is owned by exactly one frame, whose
//! insertion-ordered mangle table decides both its output name and, once the
//! frame is closed, its stack slot.
//!
//! Everything lives in arenas inside [`ScopeTree`] and is referred to by
//! index, so passes can hold ids across tree rewrites.

use flint_diagnostic::{Diagnostic, DiagnosticQueue, ErrorCode};
use flint_ir::{NodeId, NodeKind, Span, Tree, TypeId};
use flint_types::layout::align_to;
use flint_types::{TypePool, ViewKind, WORD_SIZE};
use rustc_hash::FxHashMap;

use crate::CompileError;

macro_rules! arena_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u32);

        impl $name {
            #[inline]
            pub const fn index(self) -> usize {
                self.0 as usize
            }

            fn next(len: usize) -> Self {
                $name(u32::try_from(len).unwrap_or(u32::MAX))
            }
        }
    };
}

arena_id!(ScopeId);
arena_id!(FrameId);
arena_id!(
    /// Index of a [`Variable`] in its [`ScopeTree`].
    VarId
);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum VarKind {
    Local,
    Param,
    Function,
    Temp,
    /// Provided by the environment; never mangled.
    External,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Variable {
    pub name: String,
    /// Name in the emitted tree.
    pub output_name: String,
    pub ty: TypeId,
    pub kind: VarKind,
    pub is_stack_allocated: bool,
    /// Offset from the frame's stack pointer, set when the frame closes.
    pub word_offset: Option<u32>,
    pub frame: FrameId,
    pub span: Span,
}

impl Variable {
    pub fn is_external(&self) -> bool {
        self.kind == VarKind::External
    }
}

/// What a caller asks [`ScopeTree::add_variable`] to declare.
#[derive(Clone, Debug)]
pub struct NewVariable {
    pub name: String,
    pub ty: TypeId,
    pub kind: VarKind,
    pub span: Span,
}

impl NewVariable {
    pub fn new(name: impl Into<String>, ty: TypeId, kind: VarKind, span: Span) -> Self {
        NewVariable {
            name: name.into(),
            ty,
            kind,
            span,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Scope {
    pub parent: Option<ScopeId>,
    pub frame: FrameId,
    names: FxHashMap<String, VarId>,
}

/// A runtime binding a frame imports once and refers to by a local name.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum CachedLocal {
    View(ViewKind),
    Malloc,
    Free,
    /// Bulk copy in `n`-byte units.
    Memcpy(u32),
    /// Bulk fill in `n`-byte units.
    Memset(u32),
}

impl CachedLocal {
    /// Member of the runtime module this local is bound to.
    pub fn member(self) -> String {
        match self {
            CachedLocal::View(view) => view.name().to_owned(),
            CachedLocal::Malloc => "malloc".to_owned(),
            CachedLocal::Free => "free".to_owned(),
            CachedLocal::Memcpy(n) => format!("memcpy{n}"),
            CachedLocal::Memset(n) => format!("memset{n}"),
        }
    }

    pub fn output_name(self) -> String {
        format!("${}", self.member())
    }
}

#[derive(Clone, Debug)]
pub struct Frame {
    pub name: String,
    pub parent: Option<FrameId>,
    pub root_scope: ScopeId,
    pub return_type: TypeId,
    pub params: Vec<VarId>,
    pub span: Span,
    mangled: Vec<VarId>,
    by_output: FxHashMap<String, VarId>,
    cached: Vec<CachedLocal>,
    temps: Vec<VarId>,
    frame_size_in_words: Option<u32>,
}

impl Frame {
    /// Variables in declaration order.
    pub fn variables(&self) -> &[VarId] {
        &self.mangled
    }

    pub fn cached_locals(&self) -> &[CachedLocal] {
        &self.cached
    }

    pub fn temps(&self) -> &[VarId] {
        &self.temps
    }

    /// Stack words the frame reserves; `None` until it is closed.
    pub fn frame_size_in_words(&self) -> Option<u32> {
        self.frame_size_in_words
    }

    pub fn is_closed(&self) -> bool {
        self.frame_size_in_words.is_some()
    }
}

/// An lvalue split so it can be read and then written without evaluating
/// its base twice.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CachedReference {
    /// First occurrence; evaluates and stashes the base.
    pub def: NodeId,
    /// Later occurrence; reads the stashed base.
    pub use_: NodeId,
}

#[derive(Clone, Debug)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
    frames: Vec<Frame>,
    vars: Vec<Variable>,
}

impl Default for ScopeTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeTree {
    /// A tree holding only the program frame.
    pub fn new() -> Self {
        let mut tree = ScopeTree {
            scopes: Vec::new(),
            frames: Vec::new(),
            vars: Vec::new(),
        };
        tree.push_frame(None, None, "<program>", TypeId::DYN, Span::DUMMY);
        tree
    }

    pub fn root_frame(&self) -> FrameId {
        FrameId(0)
    }

    pub fn root_scope(&self) -> ScopeId {
        ScopeId(0)
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.index()]
    }

    pub fn frame(&self, id: FrameId) -> &Frame {
        &self.frames[id.index()]
    }

    pub fn frame_mut(&mut self, id: FrameId) -> &mut Frame {
        &mut self.frames[id.index()]
    }

    pub fn variable(&self, id: VarId) -> &Variable {
        &self.vars[id.index()]
    }

    pub fn frame_of(&self, scope: ScopeId) -> FrameId {
        self.scope(scope).frame
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Every frame, the program's first.
    pub fn frames(&self) -> impl Iterator<Item = (FrameId, &Frame)> {
        self.frames
            .iter()
            .enumerate()
            .map(|(index, frame)| (FrameId::next(index), frame))
    }

    /// A block scope nested in `parent`, in the same frame.
    pub fn new_scope(&mut self, parent: ScopeId) -> ScopeId {
        let id = ScopeId::next(self.scopes.len());
        let frame = self.frame_of(parent);
        self.scopes.push(Scope {
            parent: Some(parent),
            frame,
            names: FxHashMap::default(),
        });
        id
    }

    /// A function frame whose root scope is nested in `parent`. Returns the
    /// new root scope.
    pub fn new_frame(&mut self, parent: ScopeId, name: &str, return_type: TypeId, span: Span) -> ScopeId {
        let parent_frame = self.frame_of(parent);
        let frame = self.push_frame(Some(parent), Some(parent_frame), name, return_type, span);
        self.frame(frame).root_scope
    }

    fn push_frame(
        &mut self,
        parent_scope: Option<ScopeId>,
        parent: Option<FrameId>,
        name: &str,
        return_type: TypeId,
        span: Span,
    ) -> FrameId {
        let frame = FrameId::next(self.frames.len());
        let root_scope = ScopeId::next(self.scopes.len());
        self.scopes.push(Scope {
            parent: parent_scope,
            frame,
            names: FxHashMap::default(),
        });
        self.frames.push(Frame {
            name: name.to_owned(),
            parent,
            root_scope,
            return_type,
            params: Vec::new(),
            span,
            mangled: Vec::new(),
            by_output: FxHashMap::default(),
            cached: Vec::new(),
            temps: Vec::new(),
            frame_size_in_words: None,
        });
        frame
    }

    /// Look `name` up in `scope`, then (unless `local_only`) outward
    /// through enclosing scopes and frames.
    pub fn get_variable(&self, scope: ScopeId, name: &str, local_only: bool) -> Option<VarId> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let scope = self.scope(id);
            if let Some(&var) = scope.names.get(name) {
                return Some(var);
            }
            if local_only {
                return None;
            }
            current = scope.parent;
        }
        None
    }

    /// Variable with output name `output` owned by `frame`.
    pub fn lookup_output(&self, frame: FrameId, output: &str) -> Option<VarId> {
        self.frame(frame).by_output.get(output).copied()
    }

    /// Declare a variable in `scope` and give it a frame-unique output name.
    pub fn add_variable(&mut self, scope: ScopeId, new: NewVariable) -> Result<VarId, CompileError> {
        if let Some(previous) = self.get_variable(scope, &new.name, true) {
            return Err(CompileError::Redeclaration {
                name: new.name,
                span: new.span,
                previous: self.variable(previous).span,
            });
        }
        let frame = self.frame_of(scope);
        let output_name = if new.kind == VarKind::External {
            // Non-external holders of the name are renamed by
            // `assign_output_names`.
            if let Some(&previous) = self
                .frame(frame)
                .by_output
                .get(&new.name)
                .filter(|&&previous| self.variable(previous).is_external())
            {
                return Err(CompileError::Redeclaration {
                    name: new.name,
                    span: new.span,
                    previous: self.variable(previous).span,
                });
            }
            new.name.clone()
        } else {
            self.mangle(frame, &new.name)
        };

        let id = VarId::next(self.vars.len());
        tracing::trace!(name = %new.name, output = %output_name, "declare");
        self.vars.push(Variable {
            name: new.name.clone(),
            output_name: output_name.clone(),
            ty: new.ty,
            kind: new.kind,
            is_stack_allocated: false,
            word_offset: None,
            frame,
            span: new.span,
        });
        self.scopes[scope.index()].names.insert(new.name, id);
        let frame = &mut self.frames[frame.index()];
        frame.mangled.push(id);
        frame.by_output.insert(output_name, id);
        if new.kind == VarKind::Param {
            frame.params.push(id);
        }
        Ok(id)
    }

    /// Settle every output name once all declarations are known.
    ///
    /// Names handed out by [`ScopeTree::add_variable`] only avoid outer
    /// names declared earlier in the source; a frame may still refer to an
    /// outer variable declared after it. Frames are renamed outermost
    /// first, each against the complete tables of its enclosing frames.
    /// Externals keep their names and are placed before everything else.
    pub fn assign_output_names(&mut self) {
        for index in 0..self.frames.len() {
            let frame = FrameId::next(index);
            let vars = std::mem::take(&mut self.frames[index].mangled);
            self.frames[index].by_output.clear();
            let (externals, mangled): (Vec<VarId>, Vec<VarId>) = vars
                .iter()
                .partition(|&&var| self.variable(var).kind == VarKind::External);
            for var in externals.into_iter().chain(mangled) {
                let variable = self.variable(var);
                let output = if variable.kind == VarKind::External {
                    variable.name.clone()
                } else {
                    self.mangle(frame, &variable.name)
                };
                if output != variable.output_name {
                    tracing::trace!(name = %variable.name, output = %output, "renamed");
                }
                self.frames[index].by_output.insert(output.clone(), var);
                self.vars[var.index()].output_name = output;
            }
            self.frames[index].mangled = vars;
        }
    }

    /// `name`, or `name$1`, `name$2`, … avoiding every output name visible
    /// from `frame`.
    fn mangle(&self, frame: FrameId, name: &str) -> String {
        let mut candidate = name.to_owned();
        let mut n = 1;
        while self.is_taken(frame, &candidate) {
            candidate = format!("{name}${n}");
            n += 1;
        }
        candidate
    }

    fn is_taken(&self, frame: FrameId, output: &str) -> bool {
        let mut current = Some(frame);
        while let Some(id) = current {
            let frame = self.frame(id);
            if frame.by_output.contains_key(output) {
                return true;
            }
            current = frame.parent;
        }
        false
    }

    /// Move a variable into the stack frame.
    pub fn promote(&mut self, var: VarId) {
        let var = &mut self.vars[var.index()];
        if !var.is_stack_allocated {
            tracing::trace!(name = %var.name, "promoted to stack");
        }
        var.is_stack_allocated = true;
    }

    /// An anonymous temporary, declared by the frame's prologue.
    pub fn fresh_temp(&mut self, frame: FrameId, ty: TypeId, span: Span) -> VarId {
        let name = format!("$t{}", self.frame(frame).temps.len());
        let output_name = self.mangle(frame, &name);
        let id = VarId::next(self.vars.len());
        self.vars.push(Variable {
            name,
            output_name: output_name.clone(),
            ty,
            kind: VarKind::Temp,
            is_stack_allocated: false,
            word_offset: None,
            frame,
            span,
        });
        let frame = &mut self.frames[frame.index()];
        frame.mangled.push(id);
        frame.by_output.insert(output_name, id);
        frame.temps.push(id);
        id
    }

    /// Local name of a runtime binding in `frame`, requesting it on first
    /// use.
    pub fn cached_local(&mut self, frame: FrameId, local: CachedLocal) -> String {
        let frame = &mut self.frames[frame.index()];
        if !frame.cached.contains(&local) {
            frame.cached.push(local);
        }
        local.output_name()
    }

    /// Assign stack slots in declaration order and fix the frame size.
    /// Later calls return the size computed by the first.
    pub fn close_frame(
        &mut self,
        frame: FrameId,
        pool: &TypePool,
        diagnostics: &mut DiagnosticQueue,
    ) -> u32 {
        if let Some(size) = self.frame(frame).frame_size_in_words {
            return size;
        }
        let mut running = 0;
        for &var in &self.frames[frame.index()].mangled {
            let var = &mut self.vars[var.index()];
            if var.is_stack_allocated {
                var.word_offset = Some(running);
                running += align_to(pool.size(var.ty), 2 * WORD_SIZE) / WORD_SIZE;
            }
        }
        let frame = &mut self.frames[frame.index()];
        frame.frame_size_in_words = Some(running);
        tracing::debug!(frame = %frame.name, words = running, "closed frame");
        diagnostics.add(
            Diagnostic::info(ErrorCode::I0001)
                .with_message(format!(
                    "frame `{}` reserves {running} stack word(s)",
                    frame.name
                ))
                .with_label(frame.span, "frame declared here"),
        );
        running
    }

    /// Split the lvalue `expr` into a first and a repeat occurrence.
    ///
    /// A pointer or object base that may have side effects is stashed in a
    /// fresh temporary by `def` and re-read by `use_`; otherwise `use_` is a
    /// copy of `expr`.
    pub fn cache_reference(&mut self, tree: &mut Tree, frame: FrameId, expr: NodeId) -> CachedReference {
        let ty = tree.ty(expr);
        let span = tree.span(expr);
        match tree.kind(expr).clone() {
            NodeKind::Deref { arg } if !is_pure(tree, arg) => {
                let (stash, read) = self.stash(tree, frame, arg);
                CachedReference {
                    def: tree.alloc_typed(NodeKind::Deref { arg: stash }, span, ty),
                    use_: tree.alloc_typed(NodeKind::Deref { arg: read }, span, ty),
                }
            }
            NodeKind::Member {
                object,
                property,
                arrow,
            } if !is_pure(tree, object) => {
                let object_ty = tree.ty(object);
                let object_span = tree.span(object);
                let (first, second) = match tree.kind(object).clone() {
                    NodeKind::Deref { arg } => {
                        let (stash, read) = self.stash(tree, frame, arg);
                        (
                            tree.alloc_typed(NodeKind::Deref { arg: stash }, object_span, object_ty),
                            tree.alloc_typed(NodeKind::Deref { arg: read }, object_span, object_ty),
                        )
                    }
                    _ => self.stash(tree, frame, object),
                };
                let member = |object| NodeKind::Member {
                    object,
                    property: property.clone(),
                    arrow,
                };
                CachedReference {
                    def: tree.alloc_typed(member(first), span, ty),
                    use_: tree.alloc_typed(member(second), span, ty),
                }
            }
            NodeKind::Index { object, index } if !is_pure(tree, object) || !is_pure(tree, index) => {
                let (object_def, object_use) = self.stash_if_impure(tree, frame, object);
                let (index_def, index_use) = self.stash_if_impure(tree, frame, index);
                CachedReference {
                    def: tree.alloc_typed(
                        NodeKind::Index {
                            object: object_def,
                            index: index_def,
                        },
                        span,
                        ty,
                    ),
                    use_: tree.alloc_typed(
                        NodeKind::Index {
                            object: object_use,
                            index: index_use,
                        },
                        span,
                        ty,
                    ),
                }
            }
            _ => CachedReference {
                def: expr,
                use_: tree.deep_clone(expr),
            },
        }
    }

    fn stash_if_impure(&mut self, tree: &mut Tree, frame: FrameId, expr: NodeId) -> (NodeId, NodeId) {
        if is_pure(tree, expr) {
            (expr, tree.deep_clone(expr))
        } else {
            self.stash(tree, frame, expr)
        }
    }

    /// `($t = expr)` and a later read of `$t`.
    fn stash(&mut self, tree: &mut Tree, frame: FrameId, expr: NodeId) -> (NodeId, NodeId) {
        let ty = tree.ty(expr);
        let span = tree.span(expr);
        let temp = self.fresh_temp(frame, ty, span);
        let name = self.variable(temp).output_name.clone();
        let target = tree.alloc_typed(NodeKind::Ident { name: name.clone() }, span, ty);
        let stash = tree.alloc_typed(
            NodeKind::Assign {
                op: None,
                target,
                value: expr,
            },
            span,
            ty,
        );
        let read = tree.alloc_typed(NodeKind::Ident { name }, span, ty);
        (stash, read)
    }
}

/// Expressions that can be evaluated twice with the same result and no
/// side effects.
pub fn is_pure(tree: &Tree, expr: NodeId) -> bool {
    match tree.kind(expr) {
        NodeKind::Ident { .. } | NodeKind::Literal(_) | NodeKind::StackAddress { .. } => true,
        NodeKind::Unary { arg, .. } | NodeKind::Deref { arg } => is_pure(tree, *arg),
        NodeKind::Member { object, .. } => is_pure(tree, *object),
        NodeKind::Binary { left, right, .. } | NodeKind::Index {
            object: left,
            index: right,
        } => is_pure(tree, *left) && is_pure(tree, *right),
        _ => false,
    }
}
