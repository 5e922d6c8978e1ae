use super::*;
use crate::resolve::{resolve_declarations, TypeDecl, TypeDeclKind};
use flint_ir::{ty, FieldSyntax, TypeExpr};
use pretty_assertions::assert_eq;

fn declare(pool: &mut TypePool, name: &str, fields: &[(&str, TypeExpr)]) -> Result<TypeId, TypeError> {
    let decl = TypeDecl {
        name: name.to_owned(),
        kind: TypeDeclKind::Struct(
            fields
                .iter()
                .map(|(n, t)| FieldSyntax::new(*n, t.clone(), Span::on_line(1, 1, 1)))
                .collect(),
        ),
        span: Span::on_line(1, 1, 1),
    };
    resolve_declarations(pool, &[decl])?;
    Ok(pool.lookup_name(name).unwrap_or(TypeId::NONE))
}

fn offsets(pool: &TypePool, id: TypeId) -> Vec<u32> {
    pool.struct_type(id)
        .map(|s| s.fields.iter().map(|f| f.offset).collect())
        .unwrap_or_default()
}

#[test]
fn test_align_to() {
    assert_eq!(align_to(0, 4), 0);
    assert_eq!(align_to(5, 4), 8);
    assert_eq!(align_to(8, 4), 8);
    assert_eq!(align_to(13, 12), 24);
    assert_eq!(align_to(7, 0), 7);
}

#[test]
fn test_padding_between_fields() {
    let mut pool = TypePool::new();
    let id = declare(&mut pool, "S", &[("x", ty("i32")), ("y", ty("i8")), ("z", ty("i32"))]).unwrap();
    assert_eq!(offsets(&pool, id), vec![0, 4, 8]);
    assert_eq!(pool.size(id), 12);
    assert_eq!(pool.align(id), 4);
}

#[test]
fn test_trailing_padding() {
    let mut pool = TypePool::new();
    let id = declare(&mut pool, "T", &[("d", ty("f64")), ("b", ty("u8"))]).unwrap();
    assert_eq!(offsets(&pool, id), vec![0, 8]);
    assert_eq!(pool.size(id), 16);
    assert_eq!(pool.align(id), 8);
}

#[test]
fn test_empty_struct() {
    let mut pool = TypePool::new();
    let id = declare(&mut pool, "E", &[]).unwrap();
    assert_eq!(pool.size(id), 0);
    assert_eq!(pool.align(id), 1);
}

#[test]
fn test_nested_struct_by_value() {
    let mut pool = TypePool::new();
    let inner = declare(&mut pool, "Inner", &[("a", ty("i16")), ("b", ty("i16"))]).unwrap();
    let outer = declare(&mut pool, "Outer", &[("c", ty("u8")), ("i", ty("Inner"))]).unwrap();
    assert_eq!(pool.size(inner), 4);
    assert_eq!(offsets(&pool, outer), vec![0, 4]);
    assert_eq!(pool.size(outer), 8);
    assert_eq!(pool.align(outer), 2);
}

#[test]
fn test_zero_size_field_is_an_error() {
    let mut pool = TypePool::new();
    let err = declare(&mut pool, "V", &[("v", ty("void"))]).unwrap_err();
    assert!(matches!(err, TypeError::Layout { .. }));
}

#[test]
fn test_recursive_by_value_is_an_error() {
    let mut pool = TypePool::new();
    let err = declare(&mut pool, "R", &[("r", ty("R"))]).unwrap_err();
    assert!(matches!(err, TypeError::Layout { ref reason, .. } if reason.contains("itself")));
}

#[test]
fn test_recursive_through_pointer_is_fine() {
    let mut pool = TypePool::new();
    let id = declare(&mut pool, "Node", &[("value", ty("i32")), ("next", ty("Node").pointer())]).unwrap();
    assert_eq!(offsets(&pool, id), vec![0, 4]);
    assert_eq!(pool.size(id), 8);
}
