use super::*;

#[test]
fn test_as_str_roundtrips_through_from_str() {
    for code in ErrorCode::ALL {
        assert_eq!(code.as_str().parse::<ErrorCode>(), Ok(code));
    }
    assert_eq!("E9999".parse::<ErrorCode>(), Err(()));
}

#[test]
fn test_categories_are_disjoint() {
    for code in ErrorCode::ALL {
        let classes = [
            code.is_type_resolution_error(),
            code.is_semantic_error(),
            code.is_warning(),
            code.is_info(),
        ];
        assert_eq!(classes.iter().filter(|&&c| c).count(), 1, "{code}");
    }
}

#[test]
fn test_every_code_has_a_description() {
    for code in ErrorCode::ALL {
        assert!(!code.description().is_empty());
    }
}
