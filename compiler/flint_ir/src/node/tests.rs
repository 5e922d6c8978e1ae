use super::*;
use pretty_assertions::assert_eq;

#[test]
fn test_node_id_sentinel() {
    assert!(!NodeId::INVALID.is_valid());
    assert!(NodeId::new(0).is_valid());
    assert_eq!(NodeId::default(), NodeId::INVALID);
    assert_eq!(format!("{:?}", NodeId::new(7)), "NodeId(7)");
}

#[test]
fn test_children_in_evaluation_order() {
    let kind = NodeKind::For {
        init: Some(NodeId::new(1)),
        test: None,
        update: Some(NodeId::new(3)),
        body: NodeId::new(4),
    };
    assert_eq!(kind.children(), vec![NodeId::new(1), NodeId::new(3), NodeId::new(4)]);

    let call = NodeKind::Call {
        callee: NodeId::new(0),
        args: vec![NodeId::new(5), NodeId::new(6)],
    };
    assert_eq!(call.children(), vec![NodeId::new(0), NodeId::new(5), NodeId::new(6)]);
}

#[test]
fn test_children_match_slots() {
    let mut kind = NodeKind::If {
        test: NodeId::new(1),
        consequent: NodeId::new(2),
        alternate: Some(NodeId::new(3)),
    };
    let expected = kind.children();
    let mut from_slots = Vec::new();
    for slot in kind.slots_mut() {
        match slot {
            SlotMut::One(id) => from_slots.push(*id),
            SlotMut::Opt(id) => from_slots.extend(id.iter().copied()),
            SlotMut::List(ids) => from_slots.extend(ids.iter().copied()),
        }
    }
    assert_eq!(from_slots, expected);
}

#[test]
fn test_expression_classification() {
    assert!(NodeKind::Ident { name: "x".into() }.is_expression());
    assert!(NodeKind::StackAddress { name: "x".into() }.is_expression());
    assert!(!NodeKind::Empty.is_expression());
    assert!(!NodeKind::Return { arg: None }.is_expression());
}

#[test]
fn test_operator_groups() {
    assert!(BinaryOp::Add.is_arithmetic());
    assert!(BinaryOp::UShr.is_bitwise());
    assert!(BinaryOp::LtEq.is_comparison());
    assert!(BinaryOp::Or.is_logical());
    assert_eq!(BinaryOp::UShr.as_symbol(), ">>>");
    assert_eq!(UpdateOp::Decrement.binary_op(), BinaryOp::Sub);
}

#[test]
fn test_literal_as_number() {
    assert_eq!(Literal::Int(3).as_number(), Some(3.0));
    assert_eq!(Literal::Float(2.5).as_number(), Some(2.5));
    assert_eq!(Literal::Null.as_number(), None);
}
