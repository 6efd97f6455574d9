//! Wire-level constant pool entries: the tagged, variable-length records of
//! the `constant_pool` table.

mod types;

pub use types::*;

use binrw::{BinRead, BinResult, BinWrite, Endian};
use binrw::io::{Read, Seek, Write};

pub const TAG_UTF8: u8 = 1;
pub const TAG_INTEGER: u8 = 3;
pub const TAG_FLOAT: u8 = 4;
pub const TAG_LONG: u8 = 5;
pub const TAG_DOUBLE: u8 = 6;
pub const TAG_CLASS: u8 = 7;
pub const TAG_STRING: u8 = 8;
pub const TAG_FIELD_REF: u8 = 9;
pub const TAG_METHOD_REF: u8 = 10;
pub const TAG_INTERFACE_METHOD_REF: u8 = 11;
pub const TAG_NAME_AND_TYPE: u8 = 12;
pub const TAG_METHOD_HANDLE: u8 = 15;
pub const TAG_METHOD_TYPE: u8 = 16;
pub const TAG_INVOKE_DYNAMIC: u8 = 18;

// The codec is written by hand rather than derived: decode dispatches on the
// tag byte and must distinguish an unrecognized tag (malformed pool) from a
// short read (truncated file).
impl BinRead for ConstantInfo {
    type Args<'a> = ();

    fn read_options<R: Read + Seek>(
        reader: &mut R,
        endian: Endian,
        _args: Self::Args<'_>,
    ) -> BinResult<Self> {
        let pos = reader.stream_position().unwrap_or_default();
        let tag = u8::read_options(reader, endian, ())?;
        let entry = match tag {
            TAG_UTF8 => {
                let length = u16::read_options(reader, endian, ())?;
                let mut bytes = vec![0u8; length as usize];
                reader.read_exact(&mut bytes)?;
                ConstantInfo::Utf8(Utf8Constant { bytes })
            }
            TAG_INTEGER => ConstantInfo::Integer(IntegerConstant {
                value: i32::read_options(reader, endian, ())?,
            }),
            TAG_FLOAT => ConstantInfo::Float(FloatConstant {
                value: f32::read_options(reader, endian, ())?,
            }),
            TAG_LONG => ConstantInfo::Long(LongConstant {
                value: i64::read_options(reader, endian, ())?,
            }),
            TAG_DOUBLE => ConstantInfo::Double(DoubleConstant {
                value: f64::read_options(reader, endian, ())?,
            }),
            TAG_CLASS => ConstantInfo::Class(ClassConstant {
                name_index: u16::read_options(reader, endian, ())?,
            }),
            TAG_STRING => ConstantInfo::String(StringConstant {
                string_index: u16::read_options(reader, endian, ())?,
            }),
            TAG_FIELD_REF => ConstantInfo::FieldRef(FieldRefConstant {
                class_index: u16::read_options(reader, endian, ())?,
                name_and_type_index: u16::read_options(reader, endian, ())?,
            }),
            TAG_METHOD_REF => ConstantInfo::MethodRef(MethodRefConstant {
                class_index: u16::read_options(reader, endian, ())?,
                name_and_type_index: u16::read_options(reader, endian, ())?,
            }),
            TAG_INTERFACE_METHOD_REF => {
                ConstantInfo::InterfaceMethodRef(InterfaceMethodRefConstant {
                    class_index: u16::read_options(reader, endian, ())?,
                    name_and_type_index: u16::read_options(reader, endian, ())?,
                })
            }
            TAG_NAME_AND_TYPE => ConstantInfo::NameAndType(NameAndTypeConstant {
                name_index: u16::read_options(reader, endian, ())?,
                descriptor_index: u16::read_options(reader, endian, ())?,
            }),
            TAG_METHOD_HANDLE => ConstantInfo::MethodHandle(MethodHandleConstant {
                reference_kind: u8::read_options(reader, endian, ())?,
                reference_index: u16::read_options(reader, endian, ())?,
            }),
            TAG_METHOD_TYPE => ConstantInfo::MethodType(MethodTypeConstant {
                descriptor_index: u16::read_options(reader, endian, ())?,
            }),
            TAG_INVOKE_DYNAMIC => ConstantInfo::InvokeDynamic(InvokeDynamicConstant {
                bootstrap_method_attr_index: u16::read_options(reader, endian, ())?,
                name_and_type_index: u16::read_options(reader, endian, ())?,
            }),
            t => {
                return Err(crate::error::malformed_pool(
                    pos,
                    format_args!("unrecognized tag byte {t}"),
                ))
            }
        };
        Ok(entry)
    }
}

impl BinWrite for ConstantInfo {
    type Args<'a> = ();

    fn write_options<W: Write + Seek>(
        &self,
        writer: &mut W,
        endian: Endian,
        _args: Self::Args<'_>,
    ) -> BinResult<()> {
        match self {
            ConstantInfo::Utf8(u) => {
                TAG_UTF8.write_options(writer, endian, ())?;
                (u.bytes.len() as u16).write_options(writer, endian, ())?;
                writer.write_all(&u.bytes)?;
            }
            ConstantInfo::Integer(c) => {
                TAG_INTEGER.write_options(writer, endian, ())?;
                c.value.write_options(writer, endian, ())?;
            }
            ConstantInfo::Float(c) => {
                TAG_FLOAT.write_options(writer, endian, ())?;
                c.value.write_options(writer, endian, ())?;
            }
            ConstantInfo::Long(c) => {
                TAG_LONG.write_options(writer, endian, ())?;
                c.value.write_options(writer, endian, ())?;
            }
            ConstantInfo::Double(c) => {
                TAG_DOUBLE.write_options(writer, endian, ())?;
                c.value.write_options(writer, endian, ())?;
            }
            ConstantInfo::Class(c) => {
                TAG_CLASS.write_options(writer, endian, ())?;
                c.name_index.write_options(writer, endian, ())?;
            }
            ConstantInfo::String(c) => {
                TAG_STRING.write_options(writer, endian, ())?;
                c.string_index.write_options(writer, endian, ())?;
            }
            ConstantInfo::FieldRef(c) => {
                TAG_FIELD_REF.write_options(writer, endian, ())?;
                c.class_index.write_options(writer, endian, ())?;
                c.name_and_type_index.write_options(writer, endian, ())?;
            }
            ConstantInfo::MethodRef(c) => {
                TAG_METHOD_REF.write_options(writer, endian, ())?;
                c.class_index.write_options(writer, endian, ())?;
                c.name_and_type_index.write_options(writer, endian, ())?;
            }
            ConstantInfo::InterfaceMethodRef(c) => {
                TAG_INTERFACE_METHOD_REF.write_options(writer, endian, ())?;
                c.class_index.write_options(writer, endian, ())?;
                c.name_and_type_index.write_options(writer, endian, ())?;
            }
            ConstantInfo::NameAndType(c) => {
                TAG_NAME_AND_TYPE.write_options(writer, endian, ())?;
                c.name_index.write_options(writer, endian, ())?;
                c.descriptor_index.write_options(writer, endian, ())?;
            }
            ConstantInfo::MethodHandle(c) => {
                TAG_METHOD_HANDLE.write_options(writer, endian, ())?;
                c.reference_kind.write_options(writer, endian, ())?;
                c.reference_index.write_options(writer, endian, ())?;
            }
            ConstantInfo::MethodType(c) => {
                TAG_METHOD_TYPE.write_options(writer, endian, ())?;
                c.descriptor_index.write_options(writer, endian, ())?;
            }
            ConstantInfo::InvokeDynamic(c) => {
                TAG_INVOKE_DYNAMIC.write_options(writer, endian, ())?;
                c.bootstrap_method_attr_index.write_options(writer, endian, ())?;
                c.name_and_type_index.write_options(writer, endian, ())?;
            }
            // The phantom second slot of an 8-byte constant has no wire form.
            ConstantInfo::Unusable => {}
        }
        Ok(())
    }
}
