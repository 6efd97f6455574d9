//! The constant pool: an arena of interned strings, class references, and
//! literal constants addressed by 1-based integer handles.
//!
//! The wire format is index-based, so indices are kept as explicit `u16`
//! handles into the entry list rather than being resolved into references.
//! Index 0 is reserved/invalid, and 8-byte constants occupy two slots.

use std::collections::{HashMap, HashSet};

use binrw::{BinRead, BinResult, BinWrite, Endian};
use binrw::io::{Read, Seek, Write};

use crate::constant_info::*;
use crate::descriptor;
use crate::error::{ClassError, Result};

pub use crate::descriptor::ClassMap;

#[derive(Clone, Debug, Default)]
pub struct ConstPool {
    entries: Vec<ConstantInfo>,
    this_class_info: u16,
    // Interning caches; rebuilt wholesale after in-place renames.
    utf8_cache: HashMap<Vec<u8>, u16>,
    class_cache: HashMap<u16, u16>,
}

impl ConstPool {
    /// Creates a fresh pool seeded with the class's own `Class` entry.
    pub fn new(this_class_name: &str) -> Self {
        let mut pool = ConstPool::default();
        pool.this_class_info = pool.add_class_info(this_class_name);
        pool
    }

    /// Pool size in the wire-format sense: number of slots including the
    /// reserved index 0.
    pub fn size(&self) -> u16 {
        self.entries.len() as u16 + 1
    }

    /// All entries in index order (slot `i` holds index `i + 1`).
    pub fn entries(&self) -> &[ConstantInfo] {
        &self.entries
    }

    /// Index of the `Class` entry naming the class that owns this pool.
    pub fn this_class_info(&self) -> u16 {
        self.this_class_info
    }

    pub(crate) fn set_this_class_info(&mut self, index: u16) {
        self.this_class_info = index;
    }

    /// Resolves an index, failing with `InvalidIndex` when it is zero or out
    /// of range. Tag mismatches are reported by the typed accessors.
    pub fn entry(&self, index: u16) -> Result<&ConstantInfo> {
        self.entry_expecting(index, "a constant pool entry")
    }

    fn entry_expecting(&self, index: u16, expected: &'static str) -> Result<&ConstantInfo> {
        if index == 0 || index as usize > self.entries.len() {
            return Err(ClassError::InvalidIndex { index, expected });
        }
        Ok(&self.entries[index as usize - 1])
    }

    /// Resolves a `Utf8` entry to a string view.
    pub fn utf8(&self, index: u16) -> Result<&str> {
        match self.entry_expecting(index, "Utf8")? {
            ConstantInfo::Utf8(u) => u.as_str().ok_or_else(|| {
                ClassError::MalformedConstantPool(format!(
                    "constant pool: entry {index} is not valid UTF-8"
                ))
            }),
            _ => Err(ClassError::InvalidIndex {
                index,
                expected: "Utf8",
            }),
        }
    }

    /// Resolves a `Class` entry to the dotted class name.
    pub fn class_name(&self, index: u16) -> Result<String> {
        match self.entry_expecting(index, "Class")? {
            ConstantInfo::Class(c) => Ok(descriptor::to_java_name(self.utf8(c.name_index)?)),
            _ => Err(ClassError::InvalidIndex {
                index,
                expected: "Class",
            }),
        }
    }

    /// Interns a UTF-8 string, returning the existing index when the exact
    /// string is already present. Indices of existing entries never move.
    pub fn add_utf8(&mut self, s: &str) -> u16 {
        self.add_utf8_bytes(s.as_bytes())
    }

    fn add_utf8_bytes(&mut self, bytes: &[u8]) -> u16 {
        if let Some(&index) = self.utf8_cache.get(bytes) {
            return index;
        }
        self.push(ConstantInfo::Utf8(Utf8Constant {
            bytes: bytes.to_vec(),
        }))
    }

    /// Interns a `Class` entry for the given name (dotted or internal form),
    /// deduplicated by name.
    pub fn add_class_info(&mut self, name: &str) -> u16 {
        let jvm = descriptor::to_jvm_name(name);
        let name_index = self.add_utf8(&jvm);
        if let Some(&index) = self.class_cache.get(&name_index) {
            return index;
        }
        self.push(ConstantInfo::Class(ClassConstant { name_index }))
    }

    pub fn add_integer(&mut self, value: i32) -> u16 {
        self.push(ConstantInfo::Integer(IntegerConstant { value }))
    }

    pub fn add_float(&mut self, value: f32) -> u16 {
        self.push(ConstantInfo::Float(FloatConstant { value }))
    }

    pub fn add_long(&mut self, value: i64) -> u16 {
        self.push(ConstantInfo::Long(LongConstant { value }))
    }

    pub fn add_double(&mut self, value: f64) -> u16 {
        self.push(ConstantInfo::Double(DoubleConstant { value }))
    }

    pub fn add_string(&mut self, s: &str) -> u16 {
        let string_index = self.add_utf8(s);
        self.push(ConstantInfo::String(StringConstant { string_index }))
    }

    pub fn add_name_and_type(&mut self, name: &str, desc: &str) -> u16 {
        let name_index = self.add_utf8(name);
        let descriptor_index = self.add_utf8(desc);
        self.push(ConstantInfo::NameAndType(NameAndTypeConstant {
            name_index,
            descriptor_index,
        }))
    }

    pub fn add_field_ref(&mut self, class_index: u16, name_and_type_index: u16) -> u16 {
        self.push(ConstantInfo::FieldRef(FieldRefConstant {
            class_index,
            name_and_type_index,
        }))
    }

    pub fn add_method_ref(&mut self, class_index: u16, name_and_type_index: u16) -> u16 {
        self.push(ConstantInfo::MethodRef(MethodRefConstant {
            class_index,
            name_and_type_index,
        }))
    }

    pub fn add_interface_method_ref(&mut self, class_index: u16, name_and_type_index: u16) -> u16 {
        self.push(ConstantInfo::InterfaceMethodRef(InterfaceMethodRefConstant {
            class_index,
            name_and_type_index,
        }))
    }

    pub(crate) fn push(&mut self, entry: ConstantInfo) -> u16 {
        let wide = entry.is_wide();
        self.entries.push(entry);
        let index = self.entries.len() as u16;
        self.register(index);
        if wide {
            self.entries.push(ConstantInfo::Unusable);
        }
        index
    }

    fn register(&mut self, index: u16) {
        match &self.entries[index as usize - 1] {
            ConstantInfo::Utf8(u) => {
                self.utf8_cache.entry(u.bytes.clone()).or_insert(index);
            }
            ConstantInfo::Class(c) => {
                self.class_cache.entry(c.name_index).or_insert(index);
            }
            _ => {}
        }
    }

    fn rebuild_caches(&mut self) {
        self.utf8_cache.clear();
        self.class_cache.clear();
        for i in 1..=self.entries.len() as u16 {
            self.register(i);
        }
    }

    /// Substitutes `new` for `old` (both internal form) throughout the pool:
    /// `Class` entries naming `old` now name `new`, and every UTF-8 entry has
    /// `L<old>;` descriptor occurrences rewritten in place. Entries that are
    /// not valid UTF-8 cannot encode a class name and are left untouched.
    pub fn rename_class(&mut self, old: &str, new: &str) {
        if old == new {
            return;
        }
        let class_utf8s: HashSet<u16> = self
            .entries
            .iter()
            .filter_map(|e| match e {
                ConstantInfo::Class(c) => Some(c.name_index),
                _ => None,
            })
            .collect();

        let mut changed = false;
        for i in 0..self.entries.len() {
            let index = (i + 1) as u16;
            let s = match &self.entries[i] {
                ConstantInfo::Utf8(u) => match u.as_str() {
                    Some(s) => s.to_string(),
                    None => continue,
                },
                _ => continue,
            };
            let replacement = if class_utf8s.contains(&index) && s == old {
                Some(new.to_string())
            } else {
                descriptor::rename(&s, old, new)
            };
            if let Some(r) = replacement {
                self.entries[i] = ConstantInfo::Utf8(Utf8Constant::from_str(&r));
                changed = true;
            }
        }
        if changed {
            self.rebuild_caches();
        }
    }

    /// Copies the entry at `index` (and, recursively, every entry it
    /// references) into `target`, substituting class names per `classnames`.
    /// Already-copied entries are memoized so shared references resolve to a
    /// single target entry.
    pub fn copy(
        &self,
        index: u16,
        target: &mut ConstPool,
        classnames: Option<&ClassMap>,
    ) -> Result<u16> {
        Copier {
            src: self,
            dst: target,
            classnames,
            memo: HashMap::new(),
        }
        .copy(index)
    }
}

struct Copier<'a> {
    src: &'a ConstPool,
    dst: &'a mut ConstPool,
    classnames: Option<&'a ClassMap>,
    memo: HashMap<u16, u16>,
}

impl Copier<'_> {
    fn copy(&mut self, index: u16) -> Result<u16> {
        if let Some(&target) = self.memo.get(&index) {
            return Ok(target);
        }
        let entry = self.src.entry(index)?.clone();
        let target = match entry {
            ConstantInfo::Utf8(u) => self.dst.add_utf8_bytes(&u.bytes),
            ConstantInfo::Integer(c) => self.dst.add_integer(c.value),
            ConstantInfo::Float(c) => self.dst.add_float(c.value),
            ConstantInfo::Long(c) => self.dst.add_long(c.value),
            ConstantInfo::Double(c) => self.dst.add_double(c.value),
            ConstantInfo::Class(c) => {
                let name = self.src.utf8(c.name_index)?;
                let renamed = self.renamed_class(name);
                self.dst.add_class_info(&renamed)
            }
            ConstantInfo::String(c) => {
                let string_index = self.copy(c.string_index)?;
                self.dst
                    .push(ConstantInfo::String(StringConstant { string_index }))
            }
            ConstantInfo::FieldRef(c) => {
                let class_index = self.copy(c.class_index)?;
                let name_and_type_index = self.copy(c.name_and_type_index)?;
                self.dst.push(ConstantInfo::FieldRef(FieldRefConstant {
                    class_index,
                    name_and_type_index,
                }))
            }
            ConstantInfo::MethodRef(c) => {
                let class_index = self.copy(c.class_index)?;
                let name_and_type_index = self.copy(c.name_and_type_index)?;
                self.dst.push(ConstantInfo::MethodRef(MethodRefConstant {
                    class_index,
                    name_and_type_index,
                }))
            }
            ConstantInfo::InterfaceMethodRef(c) => {
                let class_index = self.copy(c.class_index)?;
                let name_and_type_index = self.copy(c.name_and_type_index)?;
                self.dst
                    .push(ConstantInfo::InterfaceMethodRef(InterfaceMethodRefConstant {
                        class_index,
                        name_and_type_index,
                    }))
            }
            ConstantInfo::NameAndType(c) => {
                let name_index = self.copy(c.name_index)?;
                let descriptor_index = self.copy_descriptor(c.descriptor_index)?;
                self.dst
                    .push(ConstantInfo::NameAndType(NameAndTypeConstant {
                        name_index,
                        descriptor_index,
                    }))
            }
            ConstantInfo::MethodHandle(c) => {
                let reference_index = self.copy(c.reference_index)?;
                self.dst
                    .push(ConstantInfo::MethodHandle(MethodHandleConstant {
                        reference_kind: c.reference_kind,
                        reference_index,
                    }))
            }
            ConstantInfo::MethodType(c) => {
                let descriptor_index = self.copy_descriptor(c.descriptor_index)?;
                self.dst
                    .push(ConstantInfo::MethodType(MethodTypeConstant {
                        descriptor_index,
                    }))
            }
            ConstantInfo::InvokeDynamic(c) => {
                // The bootstrap index points into the class-level
                // BootstrapMethods attribute, not this pool; carried verbatim.
                let name_and_type_index = self.copy(c.name_and_type_index)?;
                self.dst
                    .push(ConstantInfo::InvokeDynamic(InvokeDynamicConstant {
                        bootstrap_method_attr_index: c.bootstrap_method_attr_index,
                        name_and_type_index,
                    }))
            }
            ConstantInfo::Unusable => {
                return Err(ClassError::InvalidIndex {
                    index,
                    expected: "a usable entry (not the second slot of an 8-byte constant)",
                })
            }
        };
        self.memo.insert(index, target);
        Ok(target)
    }

    fn renamed_class(&self, name: &str) -> String {
        let Some(map) = self.classnames else {
            return name.to_string();
        };
        if name.starts_with('[') {
            // Array classes are stored in descriptor form.
            descriptor::rename_with_map(name, map).unwrap_or_else(|| name.to_string())
        } else {
            map.get(name).cloned().unwrap_or_else(|| name.to_string())
        }
    }

    fn copy_descriptor(&mut self, index: u16) -> Result<u16> {
        let desc = self.src.utf8(index)?;
        let renamed = self
            .classnames
            .and_then(|map| descriptor::rename_with_map(desc, map));
        Ok(match renamed {
            Some(r) => self.dst.add_utf8(&r),
            None => self.dst.add_utf8(desc),
        })
    }
}

impl BinRead for ConstPool {
    type Args<'a> = ();

    fn read_options<R: Read + Seek>(
        reader: &mut R,
        endian: Endian,
        _args: Self::Args<'_>,
    ) -> BinResult<Self> {
        let pos = reader.stream_position().unwrap_or_default();
        let count = u16::read_options(reader, endian, ())?;
        if count == 0 {
            return Err(crate::error::malformed_pool(pos, "zero entry count"));
        }
        let mut pool = ConstPool::default();
        let mut slots = 1usize; // index 0 is reserved
        while slots < count as usize {
            let entry = ConstantInfo::read_options(reader, endian, ())?;
            let wide = entry.is_wide();
            if wide && slots + 2 > count as usize {
                return Err(crate::error::malformed_pool(
                    pos,
                    "8-byte constant overruns the entry count",
                ));
            }
            slots += if wide { 2 } else { 1 };
            pool.push(entry);
        }
        Ok(pool)
    }
}

impl BinWrite for ConstPool {
    type Args<'a> = ();

    fn write_options<W: Write + Seek>(
        &self,
        writer: &mut W,
        endian: Endian,
        _args: Self::Args<'_>,
    ) -> BinResult<()> {
        (self.entries.len() as u16 + 1).write_options(writer, endian, ())?;
        for entry in &self.entries {
            entry.write_options(writer, endian, ())?;
        }
        Ok(())
    }
}
