use super::*;

#[test]
fn test_position_ordering_is_line_then_column() {
    assert!(Position::new(1, 9) < Position::new(2, 1));
    assert!(Position::new(3, 2) < Position::new(3, 4));
}

#[test]
fn test_merge_covers_both() {
    let a = Span::on_line(2, 5, 3);
    let b = Span::new(Position::new(1, 1), Position::new(2, 6));
    let merged = a.merge(b);
    assert_eq!(merged.start, Position::new(1, 1));
    assert_eq!(merged.end, Position::new(2, 8));
}

#[test]
fn test_merge_ignores_dummy() {
    let a = Span::on_line(4, 1, 2);
    assert_eq!(a.merge(Span::DUMMY), a);
    assert_eq!(Span::DUMMY.merge(a), a);
}

#[test]
fn test_display() {
    assert_eq!(Span::on_line(3, 7, 2).to_string(), "3:7");
    assert_eq!(format!("{:?}", Span::on_line(3, 7, 2)), "3:7-3:9");
    assert_eq!(format!("{:?}", Span::DUMMY), "<dummy>");
}
