use super::*;
use pretty_assertions::assert_eq;

#[test]
fn test_builtins_at_fixed_ids() {
    let pool = TypePool::new();
    assert_eq!(pool.lookup_name("i32"), Some(TypeId::I32));
    assert_eq!(pool.lookup_name("int"), Some(TypeId::I32));
    assert_eq!(pool.lookup_name("byte"), Some(TypeId::U8));
    assert_eq!(pool.lookup_name("double"), Some(TypeId::F64));
    assert_eq!(pool.len(), TypeId::FIRST_DYNAMIC as usize);
    assert!(pool.is_builtin_name("uint"));
    assert!(!pool.is_builtin_name("Point"));
}

#[test]
fn test_pointer_interning() {
    let mut pool = TypePool::new();
    let a = pool.pointer(TypeId::I32);
    let b = pool.pointer(TypeId::I32);
    assert_eq!(a, b);
    assert_eq!(pool.pointer(TypeId::VOID), TypeId::VOID_PTR);
    assert_eq!(pool.pointer(TypeId::U8), TypeId::BYTE_PTR);
    let pp = pool.pointer(a);
    assert_ne!(pp, a);
    assert_eq!(pool.display(pp), "**i32");
}

#[test]
fn test_arrow_interning() {
    let mut pool = TypePool::new();
    let a = pool.arrow(&[TypeId::I32, TypeId::U8], TypeId::VOID);
    let b = pool.arrow(&[TypeId::I32, TypeId::U8], TypeId::VOID);
    let c = pool.arrow(&[TypeId::I32], TypeId::VOID);
    assert_eq!(a, b);
    assert_ne!(a, c);
    assert_eq!(pool.display(a), "(i32, u8) -> void");
}

#[test]
fn test_sizes_and_alignment() {
    let mut pool = TypePool::new();
    assert_eq!(pool.size(TypeId::VOID), 0);
    assert_eq!(pool.size(TypeId::I16), 2);
    assert_eq!(pool.size(TypeId::F64), 8);
    assert_eq!(pool.align(TypeId::F64), 8);
    let p = pool.pointer(TypeId::F64);
    assert_eq!(pool.size(p), 4);
    assert_eq!(pool.align(p), 4);
    assert_eq!(pool.unit(p), 8);
    let arr = pool.array(TypeId::I16, Some(5));
    assert_eq!(pool.size(arr), 10);
    assert_eq!(pool.align(arr), 2);
    assert_eq!(pool.unit(arr), 2);
    assert!(pool.is_aggregate(arr));
    assert_eq!(pool.display(arr), "i16[5]");
    assert_eq!(pool.unit(TypeId::VOID_PTR), 1);
}

#[test]
fn test_classification() {
    let pool = TypePool::new();
    assert!(pool.is_integral(TypeId::U16));
    assert!(!pool.is_integral(TypeId::F32));
    assert!(!pool.is_integral(TypeId::VOID));
    assert!(pool.is_float(TypeId::F32));
    assert!(pool.is_signed(TypeId::I8));
    assert!(!pool.is_signed(TypeId::U32));
    assert!(pool.is_dyn(TypeId::DYN));
    assert!(pool.is_dyn(TypeId::NONE));
    assert_eq!(pool.bit_width(TypeId::U8), 8);
    assert_eq!(pool.bit_width(TypeId::VOID_PTR), 32);
    assert_eq!(pool.bit_width(TypeId::DYN), 32);
}

#[test]
fn test_pointer_scale() {
    let mut pool = TypePool::new();
    let s = pool.new_struct("S");
    if let Some(st) = pool.struct_type_mut(s) {
        st.size = 12;
        st.align = 4;
        st.linted = true;
    }
    let ps = pool.pointer(s);
    assert_eq!(pool.pointer_scale(ps), 3);
    let pi = pool.pointer(TypeId::I32);
    assert_eq!(pool.pointer_scale(pi), 1);
    assert_eq!(pool.pointer_scale(TypeId::VOID_PTR), 1);
}
