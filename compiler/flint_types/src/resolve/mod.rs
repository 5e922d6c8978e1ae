//! Type declarations and type syntax reflection.
//!
//! Declarations are processed in three steps so that declaration order does
//! not matter: every struct and alias name is registered first, then aliases
//! are resolved (following names recursively, which is where cycles are
//! caught), then struct fields are filled in and every struct is linted.

use flint_ir::{FieldSyntax, Span, TypeExpr, TypeId};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::data::{Field, TypeData};
use crate::{layout, TypeError, TypePool};

/// A top-level `typedef` or `struct` declaration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeDecl {
    pub name: String,
    pub kind: TypeDeclKind,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypeDeclKind {
    Alias(TypeExpr),
    Struct(Vec<FieldSyntax>),
}

/// Register, resolve and lint a set of declarations.
#[tracing::instrument(level = "debug", skip_all, fields(count = decls.len()))]
pub fn resolve_declarations(pool: &mut TypePool, decls: &[TypeDecl]) -> Result<(), TypeError> {
    let mut pending = FxHashMap::default();
    let mut struct_ids = Vec::new();
    for decl in decls {
        if pool.lookup_name(&decl.name).is_some() {
            return Err(TypeError::Duplicate {
                name: decl.name.clone(),
                span: decl.span,
            });
        }
        match &decl.kind {
            TypeDeclKind::Struct(fields) => {
                let id = pool.new_struct(&decl.name);
                pool.bind_name(&decl.name, id);
                struct_ids.push((id, fields, decl.span));
            }
            TypeDeclKind::Alias(ty) => {
                let id = pool.new_alias(&decl.name);
                pool.bind_name(&decl.name, id);
                pending.insert(decl.name.clone(), (ty.clone(), decl.span));
            }
        }
    }

    let mut resolver = Resolver {
        pool,
        pending,
        in_progress: FxHashSet::default(),
    };
    for decl in decls {
        if matches!(decl.kind, TypeDeclKind::Alias(_)) {
            resolver.resolve_name(&decl.name, decl.span)?;
        }
    }
    for &(id, fields, _) in &struct_ids {
        let fields = resolver.reflect_fields(fields)?;
        if let Some(s) = resolver.pool.struct_type_mut(id) {
            s.fields = fields;
        }
    }
    for &(id, _, span) in &struct_ids {
        layout::lint(resolver.pool, id, span)?;
    }
    Ok(())
}

/// Turns type syntax into interned types.
pub struct Resolver<'p> {
    pool: &'p mut TypePool,
    pending: FxHashMap<String, (TypeExpr, Span)>,
    in_progress: FxHashSet<String>,
}

impl<'p> Resolver<'p> {
    /// A resolver for use after all declarations have been resolved.
    pub fn new(pool: &'p mut TypePool) -> Self {
        Resolver {
            pool,
            pending: FxHashMap::default(),
            in_progress: FxHashSet::default(),
        }
    }

    /// Construct, resolve and lint the type `expr` denotes.
    pub fn reflect(&mut self, expr: &TypeExpr, span: Span) -> Result<TypeId, TypeError> {
        let id = self.construct(expr, span)?;
        layout::lint(self.pool, id, span)?;
        Ok(id)
    }

    fn construct(&mut self, expr: &TypeExpr, span: Span) -> Result<TypeId, TypeError> {
        match expr {
            TypeExpr::Named(name) => self.resolve_name(name, span),
            TypeExpr::Pointer(base) => {
                let base = self.construct(base, span)?;
                Ok(self.pool.pointer(base))
            }
            TypeExpr::Array(base, length) => {
                let base = self.construct(base, span)?;
                Ok(self.pool.array(base, *length))
            }
            TypeExpr::Struct(fields) => {
                let fields = self.reflect_fields(fields)?;
                let id = self.pool.new_struct("<anonymous struct>");
                if let Some(s) = self.pool.struct_type_mut(id) {
                    s.fields = fields;
                }
                Ok(id)
            }
            TypeExpr::Arrow(params, ret) => {
                let params = params
                    .iter()
                    .map(|p| self.construct(p, span))
                    .collect::<Result<Vec<_>, _>>()?;
                let ret = self.construct(ret, span)?;
                Ok(self.pool.arrow(&params, ret))
            }
        }
    }

    fn reflect_fields(&mut self, fields: &[FieldSyntax]) -> Result<Vec<Field>, TypeError> {
        let mut seen = FxHashSet::default();
        fields
            .iter()
            .map(|f| {
                if !seen.insert(f.name.as_str()) {
                    return Err(TypeError::Layout {
                        ty: "struct".to_owned(),
                        reason: format!("field `{}` is declared more than once", f.name),
                        span: f.span,
                    });
                }
                Ok(Field {
                    name: f.name.clone(),
                    ty: self.construct(&f.ty, f.span)?,
                    offset: 0,
                })
            })
            .collect()
    }

    fn resolve_name(&mut self, name: &str, span: Span) -> Result<TypeId, TypeError> {
        let Some(id) = self.pool.lookup_name(name) else {
            return Err(TypeError::Unresolved {
                name: name.to_owned(),
                span,
            });
        };
        if !matches!(self.pool.get(id), TypeData::Alias { .. }) {
            return Ok(id);
        }
        let pending = self.pending.get(name).cloned();
        let Some((expr, decl_span)) = pending else {
            return Err(TypeError::Infinite {
                name: name.to_owned(),
                span,
            });
        };
        if !self.in_progress.insert(name.to_owned()) {
            return Err(TypeError::Infinite {
                name: name.to_owned(),
                span: decl_span,
            });
        }
        let target = self.construct(&expr, decl_span)?;
        self.in_progress.remove(name);
        self.pending.remove(name);
        self.pool.bind_name(name, target);
        tracing::trace!(alias = name, target = %self.pool.display(target), "alias resolved");
        Ok(target)
    }
}
