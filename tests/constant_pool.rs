extern crate classfile_codec;

use classfile_codec::constant_info::ConstantInfo;
use classfile_codec::{ClassError, ClassMap, ConstPool};

#[test]
fn interns_utf8_and_class_entries() {
    let mut cp = ConstPool::new("p.A");
    let a = cp.add_utf8("hello");
    let b = cp.add_utf8("hello");
    assert_eq!(a, b);

    let dotted = cp.add_class_info("java.lang.Object");
    let internal = cp.add_class_info("java/lang/Object");
    assert_eq!(dotted, internal);
    assert_eq!(cp.class_name(dotted).unwrap(), "java.lang.Object");

    // The seeded this-class entry resolves too.
    assert_eq!(cp.class_name(cp.this_class_info()).unwrap(), "p.A");
}

#[test]
fn rejects_bad_indices() {
    let mut cp = ConstPool::new("p.A");
    let class = cp.add_class_info("p.B");

    assert!(matches!(
        cp.entry(0),
        Err(ClassError::InvalidIndex { index: 0, .. })
    ));
    assert!(matches!(
        cp.utf8(200),
        Err(ClassError::InvalidIndex { index: 200, .. })
    ));
    // Right range, wrong tag.
    assert!(matches!(cp.utf8(class), Err(ClassError::InvalidIndex { .. })));
    assert!(matches!(
        cp.class_name(cp.this_class_info() - 1),
        Err(ClassError::InvalidIndex { .. })
    ));
}

#[test]
fn wide_constants_occupy_two_slots() {
    let mut cp = ConstPool::new("p.A");
    let before = cp.size();
    let long = cp.add_long(1 << 40);
    assert_eq!(cp.size(), before + 2);
    assert_eq!(long, before);

    // The phantom slot exists but is never a valid copy source.
    assert_eq!(cp.entry(long + 1).unwrap(), &ConstantInfo::Unusable);
    let mut target = ConstPool::new("p.B");
    assert!(matches!(
        cp.copy(long + 1, &mut target, None),
        Err(ClassError::InvalidIndex { .. })
    ));

    let int = cp.add_integer(3);
    assert_eq!(int, long + 2);
}

#[test]
fn rename_class_rewrites_names_and_descriptors() {
    let mut cp = ConstPool::new("p.Target");
    let this = cp.this_class_info();
    let nt = cp.add_name_and_type("m", "(Lp/Target;I)Lp/Target;");

    cp.rename_class("p/Target", "q/Renamed");

    assert_eq!(cp.class_name(this).unwrap(), "q.Renamed");
    let ConstantInfo::NameAndType(nt_entry) = cp.entry(nt).unwrap() else {
        panic!("NameAndType entry changed tag");
    };
    assert_eq!(
        cp.utf8(nt_entry.descriptor_index).unwrap(),
        "(Lq/Renamed;I)Lq/Renamed;"
    );

    // The old name is gone, so re-adding it must mint fresh entries.
    let size = cp.size();
    let reborn = cp.add_class_info("p.Target");
    assert!(reborn >= size);
    assert_eq!(cp.class_name(reborn).unwrap(), "p.Target");
}

#[test]
fn copy_remaps_references_recursively() {
    let mut src = ConstPool::new("a.A");
    let class = src.add_class_info("p.Target");
    let nt = src.add_name_and_type("m", "(Lp/Target;)Lp/Target;");
    let mref = src.add_method_ref(class, nt);

    let mut dst = ConstPool::new("b.B");
    let mut map = ClassMap::new();
    map.insert("p/Target".to_string(), "q/Renamed".to_string());

    let copied = src.copy(mref, &mut dst, Some(&map)).unwrap();
    let ConstantInfo::MethodRef(m) = dst.entry(copied).unwrap() else {
        panic!("copied entry is not a MethodRef");
    };
    assert_eq!(dst.class_name(m.class_index).unwrap(), "q.Renamed");
    let ConstantInfo::NameAndType(n) = dst.entry(m.name_and_type_index).unwrap() else {
        panic!("copied entry is not a NameAndType");
    };
    assert_eq!(dst.utf8(n.name_index).unwrap(), "m");
    assert_eq!(dst.utf8(n.descriptor_index).unwrap(), "(Lq/Renamed;)Lq/Renamed;");

    // Without a rename map the original names are carried over.
    let mut plain = ConstPool::new("c.C");
    let copied = src.copy(class, &mut plain, None).unwrap();
    assert_eq!(plain.class_name(copied).unwrap(), "p.Target");
}

#[test]
fn copy_renames_array_class_names() {
    let mut src = ConstPool::new("a.A");
    let class = src.add_class_info("[Lp/Target;");

    let mut dst = ConstPool::new("b.B");
    let mut map = ClassMap::new();
    map.insert("p/Target".to_string(), "q/Renamed".to_string());

    let copied = src.copy(class, &mut dst, Some(&map)).unwrap();
    assert_eq!(dst.class_name(copied).unwrap(), "[Lq.Renamed;");
}

#[test]
fn copy_shares_interned_entries() {
    let mut src = ConstPool::new("a.A");
    let class = src.add_class_info("p.Target");

    let mut dst = ConstPool::new("b.B");
    let first = src.copy(class, &mut dst, None).unwrap();
    let second = src.copy(class, &mut dst, None).unwrap();
    assert_eq!(first, second);
}
