//! The top-level class file structure and its mutation operations.

use binrw::io::Cursor;
use binrw::{BinRead, BinResult, BinWrite, Endian};

use crate::attribute_info::{self, AttributeInfo};
use crate::constant_pool::ConstPool;
use crate::descriptor;
use crate::error::{ClassError, Result};
use crate::field_info::FieldInfo;
use crate::method_info::MethodInfo;

pub const MAGIC: u32 = 0xCAFE_BABE;

/// Major version numbers.
pub const JAVA_1: u16 = 45;
pub const JAVA_2: u16 = 46;
pub const JAVA_3: u16 = 47;
pub const JAVA_4: u16 = 48;
pub const JAVA_5: u16 = 49;
pub const JAVA_6: u16 = 50;
pub const JAVA_7: u16 = 51;

/// A decoded class file.
///
/// Section order and counts are fixed by the format; the counts themselves
/// are derived from the vector lengths at write time, so editing the tables
/// never leaves a stale count behind.
#[derive(Clone, Debug)]
pub struct ClassFile {
    pub minor_version: u16,
    pub major_version: u16,
    pub const_pool: ConstPool,
    pub access_flags: ClassAccessFlags,
    pub this_class: u16,
    pub super_class: u16,
    pub interfaces: Vec<u16>,
    pub fields: Vec<FieldInfo>,
    pub methods: Vec<MethodInfo>,
    pub attributes: Vec<AttributeInfo>,
    /// Dotted name, cached at decode/rename time.
    name: String,
    frozen: bool,
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[binrw::binrw]
pub struct ClassAccessFlags(u16);

bitflags! {
    impl ClassAccessFlags: u16 {
        const PUBLIC = 0x0001;     //	Declared public; may be accessed from outside its package.
        const FINAL = 0x0010;      //	Declared final; no subclasses allowed.
        const SUPER = 0x0020;      //	Treat superclass methods specially when invoked by the invokespecial instruction.
        const INTERFACE = 0x0200;  //	Is an interface, not a class.
        const ABSTRACT = 0x0400;   //	Declared abstract; must not be instantiated.
        const SYNTHETIC = 0x1000;  //	Declared synthetic; not present in the source code.
        const ANNOTATION = 0x2000; //	Declared as an annotation type.
        const ENUM = 0x4000;       //	Declared as an enum type.
        const MODULE = 0x8000;     //	Declared as a module type.
    }
}

impl ClassFile {
    /// Creates an empty class (or interface) with a freshly seeded pool.
    /// The superclass defaults to `java.lang.Object`, and a `SourceFile`
    /// attribute is derived from the simple name.
    pub fn new(is_interface: bool, name: &str, superclass: Option<&str>) -> Self {
        let mut const_pool = ConstPool::new(name);
        let this_class = const_pool.this_class_info();
        let super_class = const_pool.add_class_info(superclass.unwrap_or("java.lang.Object"));
        let access_flags = if is_interface {
            ClassAccessFlags::INTERFACE | ClassAccessFlags::ABSTRACT
        } else {
            ClassAccessFlags::SUPER
        };
        let source_file =
            AttributeInfo::source_file(&mut const_pool, &descriptor::source_file_name(name));
        ClassFile {
            minor_version: 0,
            major_version: JAVA_5,
            const_pool,
            access_flags,
            this_class,
            super_class,
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            attributes: vec![source_file],
            name: descriptor::to_java_name(name),
            frozen: false,
        }
    }

    /// Decodes a class file from a byte slice.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < 4 {
            return Err(ClassError::TruncatedClassFile);
        }
        let magic = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        if magic != MAGIC {
            return Err(ClassError::BadMagicNumber(magic));
        }
        Ok(ClassFile::read_be(&mut Cursor::new(bytes))?)
    }

    /// Decodes a class file from a reader, buffering it fully first.
    pub fn from_reader<R: std::io::Read>(reader: &mut R) -> Result<Self> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        ClassFile::from_bytes(&bytes)
    }

    /// Encodes this class to bytes. Unmutated input round-trips byte-exactly.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut cursor = Cursor::new(Vec::new());
        self.write_be(&mut cursor)?;
        Ok(cursor.into_inner())
    }

    pub fn write_to<W: std::io::Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&self.to_bytes()?)?;
        Ok(())
    }

    /// Dotted fully-qualified name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Dotted superclass name, or `None` for `java.lang.Object` itself.
    pub fn superclass_name(&self) -> Result<Option<String>> {
        if self.super_class == 0 {
            return Ok(None);
        }
        Ok(Some(self.const_pool.class_name(self.super_class)?))
    }

    pub fn set_superclass(&mut self, name: &str) -> Result<()> {
        self.check_modify()?;
        self.super_class = self.const_pool.add_class_info(name);
        Ok(())
    }

    pub fn interface_names(&self) -> Result<Vec<String>> {
        self.interfaces
            .iter()
            .map(|&i| self.const_pool.class_name(i))
            .collect()
    }

    pub fn set_interfaces(&mut self, names: &[&str]) -> Result<()> {
        self.check_modify()?;
        self.interfaces = names
            .iter()
            .map(|n| self.const_pool.add_class_info(n))
            .collect();
        Ok(())
    }

    pub fn add_interface(&mut self, name: &str) -> Result<()> {
        self.check_modify()?;
        let index = self.const_pool.add_class_info(name);
        if !self.interfaces.contains(&index) {
            self.interfaces.push(index);
        }
        Ok(())
    }

    pub fn is_interface(&self) -> bool {
        self.access_flags.contains(ClassAccessFlags::INTERFACE)
    }

    pub fn is_final(&self) -> bool {
        self.access_flags.contains(ClassAccessFlags::FINAL)
    }

    pub fn is_abstract(&self) -> bool {
        self.access_flags.contains(ClassAccessFlags::ABSTRACT)
    }

    /// Replaces the access flags. Non-interface classes always carry SUPER
    /// in the encoded form.
    pub fn set_access_flags(&mut self, mut flags: ClassAccessFlags) -> Result<()> {
        self.check_modify()?;
        if !flags.contains(ClassAccessFlags::INTERFACE) {
            flags |= ClassAccessFlags::SUPER;
        }
        self.access_flags = flags;
        Ok(())
    }

    pub fn add_field(&mut self, field: FieldInfo) -> Result<()> {
        self.check_modify()?;
        self.fields.push(field);
        Ok(())
    }

    pub fn add_method(&mut self, method: MethodInfo) -> Result<()> {
        self.check_modify()?;
        self.methods.push(method);
        Ok(())
    }

    /// Finds the first method with the given name.
    pub fn method(&self, name: &str) -> Option<&MethodInfo> {
        self.methods
            .iter()
            .find(|m| m.name(&self.const_pool).is_ok_and(|n| n == name))
    }

    /// Finds the first class-level attribute with the given name.
    pub fn attribute(&self, name: &str) -> Option<&AttributeInfo> {
        self.attributes
            .iter()
            .find(|a| a.name(&self.const_pool).is_ok_and(|n| n == name))
    }

    /// Adds a class-level attribute, replacing an existing one of the same
    /// name.
    pub fn add_attribute(&mut self, attribute: AttributeInfo) -> Result<()> {
        self.check_modify()?;
        let name = self.const_pool.utf8(attribute.name_index)?.to_string();
        self.attributes
            .retain(|a| !a.name(&self.const_pool).is_ok_and(|n| n == name));
        self.attributes.push(attribute);
        Ok(())
    }

    /// The file name recorded in the `SourceFile` attribute, if present and
    /// well formed.
    pub fn source_file(&self) -> Option<String> {
        self.attribute(attribute_info::SOURCE_FILE)?
            .source_file_name(&self.const_pool)
            .ok()
    }

    /// This class's access flags as recorded in the enclosing
    /// `InnerClasses` attribute, if it is a registered inner class.
    pub fn inner_access_flags(&self) -> Option<u16> {
        let attr = self.attribute(attribute_info::INNER_CLASSES)?;
        for record in attr.inner_classes().ok()? {
            if record.inner_class_info_index == 0 {
                continue;
            }
            let name = self
                .const_pool
                .class_name(record.inner_class_info_index)
                .ok()?;
            if name == self.name {
                return Some(record.inner_class_access_flags);
            }
        }
        None
    }

    /// Substitutes `new` for `old` everywhere the class name appears: the
    /// pool's Class entries, every descriptor and signature string, and the
    /// cached name. Names may be given in either dotted or internal form.
    pub fn rename(&mut self, old: &str, new: &str) -> Result<()> {
        self.check_modify()?;
        let old_jvm = descriptor::to_jvm_name(old);
        let new_jvm = descriptor::to_jvm_name(new);
        if old_jvm == new_jvm {
            return Ok(());
        }
        self.const_pool.rename_class(&old_jvm, &new_jvm);
        // Member descriptors normally share the pool's Utf8 entries and are
        // already rewritten; re-derive them anyway so members pointing at
        // entries the pool-level pass could not touch still get renamed.
        for i in 0..self.fields.len() {
            let desc = self.const_pool.utf8(self.fields[i].descriptor_index)?.to_string();
            if let Some(renamed) = descriptor::rename(&desc, &old_jvm, &new_jvm) {
                self.fields[i].descriptor_index = self.const_pool.add_utf8(&renamed);
            }
        }
        for i in 0..self.methods.len() {
            let desc = self.const_pool.utf8(self.methods[i].descriptor_index)?.to_string();
            if let Some(renamed) = descriptor::rename(&desc, &old_jvm, &new_jvm) {
                self.methods[i].descriptor_index = self.const_pool.add_utf8(&renamed);
            }
        }
        if descriptor::to_jvm_name(&self.name) == old_jvm {
            self.name = descriptor::to_java_name(&new_jvm);
        }
        Ok(())
    }

    /// Rebuilds the constant pool from scratch, keeping only entries still
    /// referenced by the class. Idempotent.
    ///
    /// Fails with [`ClassError::UnsupportedAttributeCopy`] when an attribute
    /// with an unrecognized, non-empty payload is present, leaving the class
    /// unchanged.
    pub fn compact(&mut self) -> Result<()> {
        self.check_modify()?;
        let mut new_cp = ConstPool::new(&self.name);
        let this_class = new_cp.this_class_info();
        let super_class = match self.superclass_name()? {
            Some(name) => new_cp.add_class_info(&name),
            None => 0,
        };
        let interfaces = self
            .interface_names()?
            .iter()
            .map(|n| new_cp.add_class_info(n))
            .collect();

        let mut fields = self.fields.clone();
        for field in &mut fields {
            field.compact(&self.const_pool, &mut new_cp)?;
        }
        let mut methods = self.methods.clone();
        for method in &mut methods {
            method.compact(&self.const_pool, &mut new_cp)?;
        }
        let attributes = attribute_info::copy_all(&self.attributes, &self.const_pool, &mut new_cp)?;

        self.const_pool = new_cp;
        self.this_class = this_class;
        self.super_class = super_class;
        self.interfaces = interfaces;
        self.fields = fields;
        self.methods = methods;
        self.attributes = attributes;
        Ok(())
    }

    /// Discards everything but the class's shape: like
    /// [`compact`](Self::compact), but class attributes are reduced to annotations,
    /// signature, and source file, and member attributes to signature and
    /// exceptions. Irreversible.
    pub fn prune(&mut self) -> Result<()> {
        self.check_modify()?;
        let mut new_cp = ConstPool::new(&self.name);
        let this_class = new_cp.this_class_info();
        let super_class = match self.superclass_name()? {
            Some(name) => new_cp.add_class_info(&name),
            None => 0,
        };
        let interfaces = self
            .interface_names()?
            .iter()
            .map(|n| new_cp.add_class_info(n))
            .collect();

        let mut fields = self.fields.clone();
        for field in &mut fields {
            field.prune(&self.const_pool, &mut new_cp)?;
        }
        let mut methods = self.methods.clone();
        for method in &mut methods {
            method.prune(&self.const_pool, &mut new_cp)?;
        }
        let mut attributes = Vec::new();
        for attr in &self.attributes {
            let name = attr.name(&self.const_pool)?;
            if matches!(
                name,
                attribute_info::RUNTIME_VISIBLE_ANNOTATIONS
                    | attribute_info::RUNTIME_INVISIBLE_ANNOTATIONS
                    | attribute_info::SIGNATURE
                    | attribute_info::SOURCE_FILE
            ) {
                attributes.push(attr.copy(&self.const_pool, &mut new_cp, None)?);
            }
        }

        self.const_pool = new_cp;
        self.this_class = this_class;
        self.super_class = super_class;
        self.interfaces = interfaces;
        self.fields = fields;
        self.methods = methods;
        self.attributes = attributes;
        Ok(())
    }

    /// Marks the class read-only. There is no thaw.
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    fn check_modify(&self) -> Result<()> {
        if self.frozen {
            return Err(ClassError::FrozenClass(self.name.clone()));
        }
        Ok(())
    }
}

impl BinRead for ClassFile {
    type Args<'a> = ();

    fn read_options<R: binrw::io::Read + binrw::io::Seek>(
        reader: &mut R,
        endian: Endian,
        _args: Self::Args<'_>,
    ) -> BinResult<Self> {
        let pos = reader.stream_position().unwrap_or_default();
        let magic = u32::read_options(reader, endian, ())?;
        if magic != MAGIC {
            return Err(binrw::Error::AssertFail {
                pos,
                message: format!("bad magic number: {magic:#010x}"),
            });
        }
        let minor_version = u16::read_options(reader, endian, ())?;
        let major_version = u16::read_options(reader, endian, ())?;
        let mut const_pool = ConstPool::read_options(reader, endian, ())?;
        let access_flags = ClassAccessFlags::read_options(reader, endian, ())?;
        let this_class = u16::read_options(reader, endian, ())?;
        let super_class = u16::read_options(reader, endian, ())?;

        let interfaces_count = u16::read_options(reader, endian, ())?;
        let mut interfaces = Vec::with_capacity(interfaces_count as usize);
        for _ in 0..interfaces_count {
            interfaces.push(u16::read_options(reader, endian, ())?);
        }
        let fields_count = u16::read_options(reader, endian, ())?;
        let mut fields = Vec::with_capacity(fields_count as usize);
        for _ in 0..fields_count {
            fields.push(FieldInfo::read_options(reader, endian, ())?);
        }
        let methods_count = u16::read_options(reader, endian, ())?;
        let mut methods = Vec::with_capacity(methods_count as usize);
        for _ in 0..methods_count {
            methods.push(MethodInfo::read_options(reader, endian, ())?);
        }
        let attributes_count = u16::read_options(reader, endian, ())?;
        let mut attributes = Vec::with_capacity(attributes_count as usize);
        for _ in 0..attributes_count {
            attributes.push(AttributeInfo::read_options(reader, endian, ())?);
        }

        const_pool.set_this_class_info(this_class);
        let name = const_pool.class_name(this_class).map_err(|e| {
            crate::error::malformed_pool(pos, format_args!("cannot resolve this_class: {e}"))
        })?;

        Ok(ClassFile {
            minor_version,
            major_version,
            const_pool,
            access_flags,
            this_class,
            super_class,
            interfaces,
            fields,
            methods,
            attributes,
            name,
            frozen: false,
        })
    }
}

impl BinWrite for ClassFile {
    type Args<'a> = ();

    fn write_options<W: binrw::io::Write + binrw::io::Seek>(
        &self,
        writer: &mut W,
        endian: Endian,
        _args: Self::Args<'_>,
    ) -> BinResult<()> {
        MAGIC.write_options(writer, endian, ())?;
        self.minor_version.write_options(writer, endian, ())?;
        self.major_version.write_options(writer, endian, ())?;
        self.const_pool.write_options(writer, endian, ())?;
        self.access_flags.write_options(writer, endian, ())?;
        self.this_class.write_options(writer, endian, ())?;
        self.super_class.write_options(writer, endian, ())?;
        (self.interfaces.len() as u16).write_options(writer, endian, ())?;
        for interface in &self.interfaces {
            interface.write_options(writer, endian, ())?;
        }
        (self.fields.len() as u16).write_options(writer, endian, ())?;
        for field in &self.fields {
            field.write_options(writer, endian, ())?;
        }
        (self.methods.len() as u16).write_options(writer, endian, ())?;
        for method in &self.methods {
            method.write_options(writer, endian, ())?;
        }
        (self.attributes.len() as u16).write_options(writer, endian, ())?;
        for attribute in &self.attributes {
            attribute.write_options(writer, endian, ())?;
        }
        Ok(())
    }
}
