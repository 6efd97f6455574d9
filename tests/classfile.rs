extern crate classfile_codec;

use classfile_codec::attribute_info::AttributeInfo;
use classfile_codec::constant_info::ConstantInfo;
use classfile_codec::field_info::{FieldAccessFlags, FieldInfo};
use classfile_codec::{ClassError, ClassFile, JAVA_5};

/// A hand-assembled minimal interface: `interface Foo` with only a
/// SourceFile attribute.
fn minimal_interface_bytes() -> Vec<u8> {
    let mut b: Vec<u8> = Vec::new();
    b.extend_from_slice(&[0xCA, 0xFE, 0xBA, 0xBE]); // magic
    b.extend_from_slice(&[0x00, 0x00, 0x00, 0x31]); // minor 0, major 49
    b.extend_from_slice(&[0x00, 0x07]); // constant pool count
    b.extend_from_slice(&[0x01, 0x00, 0x03]); // [1] Utf8 "Foo"
    b.extend_from_slice(b"Foo");
    b.extend_from_slice(&[0x07, 0x00, 0x01]); // [2] Class -> [1]
    b.extend_from_slice(&[0x01, 0x00, 0x10]); // [3] Utf8 "java/lang/Object"
    b.extend_from_slice(b"java/lang/Object");
    b.extend_from_slice(&[0x07, 0x00, 0x03]); // [4] Class -> [3]
    b.extend_from_slice(&[0x01, 0x00, 0x0A]); // [5] Utf8 "SourceFile"
    b.extend_from_slice(b"SourceFile");
    b.extend_from_slice(&[0x01, 0x00, 0x08]); // [6] Utf8 "Foo.java"
    b.extend_from_slice(b"Foo.java");
    b.extend_from_slice(&[0x06, 0x00]); // ACC_INTERFACE | ACC_ABSTRACT
    b.extend_from_slice(&[0x00, 0x02]); // this_class
    b.extend_from_slice(&[0x00, 0x04]); // super_class
    b.extend_from_slice(&[0x00, 0x00]); // interfaces
    b.extend_from_slice(&[0x00, 0x00]); // fields
    b.extend_from_slice(&[0x00, 0x00]); // methods
    b.extend_from_slice(&[0x00, 0x01]); // attributes
    b.extend_from_slice(&[0x00, 0x05, 0x00, 0x00, 0x00, 0x02, 0x00, 0x06]); // SourceFile -> [6]
    b
}

#[test]
fn decodes_minimal_interface() {
    let class = ClassFile::from_bytes(&minimal_interface_bytes()).unwrap();
    assert_eq!(class.name(), "Foo");
    assert!(class.is_interface());
    assert!(class.is_abstract());
    assert_eq!(class.major_version, JAVA_5);
    assert_eq!(
        class.superclass_name().unwrap(),
        Some("java.lang.Object".to_string())
    );
    assert_eq!(class.source_file(), Some("Foo.java".to_string()));
    assert_eq!(class.const_pool.size(), 7);
    assert!(class.fields.is_empty());
    assert!(class.methods.is_empty());
}

#[test]
fn round_trip_is_byte_identical() {
    let bytes = minimal_interface_bytes();
    let class = ClassFile::from_bytes(&bytes).unwrap();
    assert_eq!(class.to_bytes().unwrap(), bytes);
}

#[test]
fn rejects_bad_magic() {
    let mut bytes = minimal_interface_bytes();
    bytes[0] = 0xCB;
    assert!(matches!(
        ClassFile::from_bytes(&bytes),
        Err(ClassError::BadMagicNumber(0xCBFE_BABE))
    ));
}

#[test]
fn rejects_truncated_input() {
    let bytes = minimal_interface_bytes();
    assert!(matches!(
        ClassFile::from_bytes(&bytes[..3]),
        Err(ClassError::TruncatedClassFile)
    ));
    assert!(matches!(
        ClassFile::from_bytes(&bytes[..20]),
        Err(ClassError::TruncatedClassFile)
    ));
}

#[test]
fn rejects_unknown_constant_pool_tag() {
    let mut bytes = minimal_interface_bytes();
    bytes[10] = 99; // tag byte of entry [1]
    assert!(matches!(
        ClassFile::from_bytes(&bytes),
        Err(ClassError::MalformedConstantPool(_))
    ));
}

#[test]
fn rejects_zero_constant_pool_count() {
    let mut bytes = minimal_interface_bytes();
    bytes[8] = 0;
    bytes[9] = 0; // constant pool count
    assert!(matches!(
        ClassFile::from_bytes(&bytes),
        Err(ClassError::MalformedConstantPool(_))
    ));
}

#[test]
fn fresh_class_has_expected_shape() {
    let class = ClassFile::new(false, "com.example.Point", None);
    assert_eq!(class.name(), "com.example.Point");
    assert!(!class.is_interface());
    assert_eq!(
        class.superclass_name().unwrap(),
        Some("java.lang.Object".to_string())
    );
    assert_eq!(class.source_file(), Some("Point.java".to_string()));
    // this/super class entries (2 each), SourceFile name and file name.
    assert_eq!(class.const_pool.size(), 7);

    let bytes = class.to_bytes().unwrap();
    let reread = ClassFile::from_bytes(&bytes).unwrap();
    assert_eq!(reread.name(), "com.example.Point");
}

#[test]
fn compact_discards_unreferenced_entries_and_is_idempotent() {
    let mut class = ClassFile::new(false, "com.example.Point", None);
    let baseline = class.const_pool.size();
    class.const_pool.add_utf8("never referenced");
    class.const_pool.add_long(42);
    class.const_pool.add_class_info("com.example.Unused");
    assert!(class.const_pool.size() > baseline);

    class.compact().unwrap();
    assert_eq!(class.const_pool.size(), baseline);
    assert_eq!(class.source_file(), Some("Point.java".to_string()));

    let once = class.to_bytes().unwrap();
    class.compact().unwrap();
    assert_eq!(class.to_bytes().unwrap(), once);
}

#[test]
fn compact_refuses_opaque_payloads() {
    let mut class = ClassFile::new(false, "com.example.Point", None);
    let name_index = class.const_pool.add_utf8("Custom");
    class
        .add_attribute(AttributeInfo {
            name_index,
            info: vec![0, 1, 2],
        })
        .unwrap();
    assert!(matches!(
        class.compact(),
        Err(ClassError::UnsupportedAttributeCopy(name)) if name == "Custom"
    ));
}

#[test]
fn rename_leaves_no_trace_of_the_old_name() {
    let mut class = ClassFile::new(false, "com.example.Point", None);
    let field = FieldInfo::new(
        &mut class.const_pool,
        FieldAccessFlags::PRIVATE,
        "next",
        "Lcom/example/Point;",
    );
    class.add_field(field).unwrap();

    class.rename("com.example.Point", "org.other.Vec").unwrap();
    assert_eq!(class.name(), "org.other.Vec");
    assert_eq!(
        class.const_pool.class_name(class.this_class).unwrap(),
        "org.other.Vec"
    );
    assert_eq!(
        class.fields[0].descriptor(&class.const_pool).unwrap(),
        "Lorg/other/Vec;"
    );
    for entry in class.const_pool.entries() {
        if let ConstantInfo::Utf8(u) = entry {
            if let Some(s) = u.as_str() {
                assert!(!s.contains("com/example/Point"), "old name survives in {s:?}");
            }
        }
    }
}

#[test]
fn prune_keeps_only_structural_attributes() {
    let mut class = ClassFile::new(false, "com.example.Point", None);
    let value = class.const_pool.add_integer(7);
    let mut constant = FieldInfo::new(
        &mut class.const_pool,
        FieldAccessFlags::PUBLIC | FieldAccessFlags::STATIC | FieldAccessFlags::FINAL,
        "X",
        "I",
    );
    constant.add_attribute(AttributeInfo::constant_value(&mut class.const_pool, value));
    class.add_field(constant).unwrap();

    let mut generic = FieldInfo::new(
        &mut class.const_pool,
        FieldAccessFlags::PRIVATE,
        "items",
        "Ljava/util/List;",
    );
    let signature = AttributeInfo::signature(
        &mut class.const_pool,
        "Ljava/util/List<Ljava/lang/String;>;",
    );
    generic.add_attribute(signature);
    class.add_field(generic).unwrap();

    class.prune().unwrap();

    assert!(class.fields[0].attributes.is_empty());
    assert_eq!(class.fields[1].attributes.len(), 1);
    assert_eq!(
        class.fields[1].attributes[0]
            .signature_string(&class.const_pool)
            .unwrap(),
        "Ljava/util/List<Ljava/lang/String;>;"
    );
    assert_eq!(class.source_file(), Some("Point.java".to_string()));
}

#[test]
fn frozen_class_rejects_edits() {
    let mut class = ClassFile::new(false, "com.example.Point", None);
    class.freeze();
    assert!(class.is_frozen());
    assert!(matches!(
        class.add_interface("java.io.Serializable"),
        Err(ClassError::FrozenClass(name)) if name == "com.example.Point"
    ));
    assert!(matches!(class.compact(), Err(ClassError::FrozenClass(_))));
    assert!(matches!(
        class.rename("com.example.Point", "x.Y"),
        Err(ClassError::FrozenClass(_))
    ));
}

#[test]
fn interface_list_edits() {
    let mut class = ClassFile::new(false, "com.example.Point", None);
    class.add_interface("java.io.Serializable").unwrap();
    class.add_interface("java.lang.Cloneable").unwrap();
    class.add_interface("java.io.Serializable").unwrap(); // duplicate, ignored
    assert_eq!(
        class.interface_names().unwrap(),
        vec!["java.io.Serializable", "java.lang.Cloneable"]
    );
    class.set_interfaces(&["java.lang.Runnable"]).unwrap();
    assert_eq!(class.interface_names().unwrap(), vec!["java.lang.Runnable"]);
}
