use super::*;
use pretty_assertions::assert_eq;

fn span() -> Span {
    Span::on_line(1, 1, 1)
}

fn ident(tree: &mut Tree, name: &str) -> NodeId {
    tree.alloc_typed(NodeKind::Ident { name: name.to_owned() }, span(), TypeId::U32)
}

fn shape(tree: &Tree, id: NodeId) -> String {
    match tree.kind(id) {
        NodeKind::Ident { name } => name.clone(),
        NodeKind::Literal(Literal::Int(v)) => v.to_string(),
        NodeKind::Binary { op, left, right } => {
            format!("({} {} {})", shape(tree, *left), op.as_symbol(), shape(tree, *right))
        }
        NodeKind::Index { object, index } => format!("{}[{}]", shape(tree, *object), shape(tree, *index)),
        other => format!("{other:?}"),
    }
}

#[test]
fn test_view_for_type() {
    let mut pool = TypePool::new();
    let p = pool.pointer(TypeId::F64);
    assert_eq!(ViewKind::for_type(&pool, TypeId::I8), Some(ViewKind::I8));
    assert_eq!(ViewKind::for_type(&pool, TypeId::U16), Some(ViewKind::U16));
    assert_eq!(ViewKind::for_type(&pool, TypeId::F32), Some(ViewKind::F32));
    assert_eq!(ViewKind::for_type(&pool, p), Some(ViewKind::U32));
    assert_eq!(ViewKind::for_type(&pool, TypeId::DYN), None);
    for view in ViewKind::ALL {
        assert!(view.elem_size().is_power_of_two());
    }
}

#[test]
fn test_realign_directions() {
    let mut tree = Tree::new();
    let p = ident(&mut tree, "p");
    assert_eq!(realign(&mut tree, p, 4, 4, TypeId::U32), p);

    let wider = realign(&mut tree, p, 1, 4, TypeId::U32);
    assert_eq!(shape(&tree, wider), "(p >> 2)");

    let q = ident(&mut tree, "q");
    let narrower = realign(&mut tree, q, 8, 2, TypeId::U32);
    assert_eq!(shape(&tree, narrower), "(q << 2)");
}

#[test]
fn test_element_address_with_offset() {
    let pool = TypePool::new();
    let mut tree = Tree::new();
    let base = ident(&mut tree, "s");
    let access = MemoryAccess {
        address: base,
        unit: 4,
        byte_offset: 8,
        elem: TypeId::I16,
        span: span(),
    };
    let addr = element_address(&mut tree, &pool, &access).unwrap();
    assert_eq!(shape(&tree, addr), "((s << 1) + 4)");
    assert_eq!(tree.ty(addr), TypeId::U32);
}

#[test]
fn test_element_address_at_zero() {
    let pool = TypePool::new();
    let mut tree = Tree::new();
    let base = ident(&mut tree, "p");
    let access = MemoryAccess {
        address: base,
        unit: 4,
        byte_offset: 0,
        elem: TypeId::I32,
        span: span(),
    };
    assert_eq!(element_address(&mut tree, &pool, &access).unwrap(), base);
}

#[test]
fn test_misaligned_access() {
    let pool = TypePool::new();
    let mut tree = Tree::new();
    let base = ident(&mut tree, "p");
    let access = MemoryAccess {
        address: base,
        unit: 1,
        byte_offset: 2,
        elem: TypeId::I32,
        span: span(),
    };
    assert_eq!(
        element_address(&mut tree, &pool, &access),
        Err(TypeError::Alignment {
            offset: 2,
            align: 4,
            span: span()
        })
    );
}

#[test]
fn test_view_index() {
    let mut tree = Tree::new();
    let view = ident(&mut tree, "$I32");
    let index = ident(&mut tree, "p");
    let read = view_index(&mut tree, view, index, TypeId::I32, span());
    assert_eq!(shape(&tree, read), "$I32[p]");
    assert_eq!(tree.ty(read), TypeId::I32);
}
