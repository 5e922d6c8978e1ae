//! Type checking and memory lowering for the Flint compiler.
//!
//! This crate takes a parsed [`Tree`] and rewrites it in place until every
//! low-level operation is spelled out in terms the target understands:
//! numbers, property access, and reads and writes through the runtime's
//! numeric views.
//!
//! # Pipeline
//!
//! ```text
//! Parse → **Resolve types → Scan → Transform → Lower** → Render
//! ```
//!
//! 1. **Resolve** (`passes::resolve`): type declarations are pulled out of
//!    the tree, resolved and laid out.
//! 2. **Scan** (`passes::scan`): builds the scope and frame tree, declares
//!    every variable, and moves address-taken variables onto the stack.
//! 3. **Transform** (`passes::transform`): types every expression, checks
//!    assignments and calls, inserts conversions, and desugars compound
//!    assignment, increments, `new`/`delete`, casts and member access.
//! 4. **Lower** (`passes::lower`): assigns stack slots, turns dereferences
//!    into view reads, and adds frame prologues and epilogues.
//!
//! Each pass is a [`flint_ir::Pass`] driven bottom-up by
//! [`flint_ir::pass::rewrite`]. Nodes a pass synthesizes are usually marked
//! `fixed` so later passes leave them alone.

mod error;
mod options;
mod passes;
pub mod scope;
pub mod validate;

use std::sync::Once;

use flint_diagnostic::{Diagnostic, DiagnosticQueue, ErrorGuaranteed};
use flint_ir::{NodeId, Tree};
use flint_types::TypePool;
use rustc_hash::FxHashMap;

pub use error::CompileError;
pub use options::CompileOptions;
pub use scope::{ScopeTree, VarId};

use scope::ScopeId;

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for debug output.
///
/// The library never calls this itself; embedding drivers and tests do.
/// Safe to call more than once. Enable with `RUST_LOG=flint_lower=debug`
/// or `RUST_LOG=flint_lower=trace`.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        // Only initialize if RUST_LOG is set
        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            let _ = tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(filter)
                .try_init();
        }
    });
}

/// State shared by the passes of one compile job.
pub struct Compilation {
    pub pool: TypePool,
    pub scopes: ScopeTree,
    pub diagnostics: DiagnosticQueue,
    pub options: CompileOptions,
    /// Scope opened by a node (program, function, block, loop).
    pub(crate) scope_of: FxHashMap<NodeId, ScopeId>,
    /// Variable declared by a node (declarator, function).
    pub(crate) var_of: FxHashMap<NodeId, VarId>,
}

impl Compilation {
    pub fn new(options: CompileOptions) -> Self {
        Compilation {
            pool: TypePool::new(),
            scopes: ScopeTree::new(),
            diagnostics: DiagnosticQueue::with_config(options.diagnostic_config()),
            options,
            scope_of: FxHashMap::default(),
            var_of: FxHashMap::default(),
        }
    }

    /// Variable declared by a declarator or function node.
    pub fn declared_by(&self, node: NodeId) -> Option<VarId> {
        self.var_of.get(&node).copied()
    }

    /// Run all passes over `root` and return the lowered root.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn run(&mut self, tree: &mut Tree, root: NodeId) -> Result<NodeId, CompileError> {
        let root = self.resolve_types(tree, root)?;
        let root = self.scan(tree, root)?;
        let root = self.transform(tree, root)?;
        #[cfg(debug_assertions)]
        validate::assert_typed(tree, root);
        let root = self.lower(tree, root)?;
        #[cfg(debug_assertions)]
        validate::assert_lowered(tree, root);
        Ok(root)
    }

    pub fn resolve_types(&mut self, tree: &mut Tree, root: NodeId) -> Result<NodeId, CompileError> {
        passes::resolve::run(self, tree, root)
    }

    pub fn scan(&mut self, tree: &mut Tree, root: NodeId) -> Result<NodeId, CompileError> {
        passes::scan::run(self, tree, root)
    }

    pub fn transform(&mut self, tree: &mut Tree, root: NodeId) -> Result<NodeId, CompileError> {
        passes::transform::run(self, tree, root)
    }

    pub fn lower(&mut self, tree: &mut Tree, root: NodeId) -> Result<NodeId, CompileError> {
        passes::lower::run(self, tree, root)
    }
}

/// A successful compile.
pub struct CompileOutput {
    /// Root of the lowered tree.
    pub root: NodeId,
    pub pool: TypePool,
    pub scopes: ScopeTree,
    /// Warnings and notes, sorted by location.
    pub diagnostics: Vec<Diagnostic>,
}

/// A failed compile. Nothing of the tree is usable.
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct CompileFailure {
    pub error: CompileError,
    /// Everything recorded before the failure, the error included.
    pub diagnostics: Vec<Diagnostic>,
    pub guarantee: ErrorGuaranteed,
}

/// Type check and lower the program rooted at `root`, in place.
pub fn compile(
    tree: &mut Tree,
    root: NodeId,
    options: &CompileOptions,
) -> Result<CompileOutput, CompileFailure> {
    let mut cx = Compilation::new(options.clone());
    match cx.run(tree, root) {
        Ok(root) => Ok(CompileOutput {
            root,
            diagnostics: cx.diagnostics.flush(),
            pool: cx.pool,
            scopes: cx.scopes,
        }),
        Err(error) => {
            tracing::debug!(%error, "compile failed");
            let guarantee = cx.diagnostics.emit_error(error.to_diagnostic());
            Err(CompileFailure {
                error,
                diagnostics: cx.diagnostics.flush(),
                guarantee,
            })
        }
    }
}
