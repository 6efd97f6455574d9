//! Field declarations and their attribute tables.

mod types;

pub use types::*;

use crate::attribute_info::{self, AttributeInfo, SIGNATURE};
use crate::constant_pool::ConstPool;
use crate::error::Result;

impl FieldInfo {
    /// Declares a new field, interning its name and descriptor in `cp`.
    pub fn new(
        cp: &mut ConstPool,
        access_flags: FieldAccessFlags,
        name: &str,
        descriptor: &str,
    ) -> Self {
        FieldInfo {
            access_flags,
            name_index: cp.add_utf8(name),
            descriptor_index: cp.add_utf8(descriptor),
            attributes: Vec::new(),
        }
    }

    pub fn name<'a>(&self, cp: &'a ConstPool) -> Result<&'a str> {
        cp.utf8(self.name_index)
    }

    pub fn descriptor<'a>(&self, cp: &'a ConstPool) -> Result<&'a str> {
        cp.utf8(self.descriptor_index)
    }

    /// Finds the first attribute with the given name.
    pub fn attribute(&self, cp: &ConstPool, name: &str) -> Option<&AttributeInfo> {
        self.attributes
            .iter()
            .find(|a| a.name(cp).is_ok_and(|n| n == name))
    }

    pub fn add_attribute(&mut self, attribute: AttributeInfo) {
        self.attributes.push(attribute);
    }

    /// Re-interns this field's name, descriptor, and attributes into a fresh
    /// pool during compaction.
    pub(crate) fn compact(&mut self, cp: &ConstPool, new_cp: &mut ConstPool) -> Result<()> {
        self.name_index = new_cp.add_utf8(cp.utf8(self.name_index)?);
        self.descriptor_index = new_cp.add_utf8(cp.utf8(self.descriptor_index)?);
        self.attributes = attribute_info::copy_all(&self.attributes, cp, new_cp)?;
        Ok(())
    }

    /// Like [`compact`](Self::compact), but drops every attribute except the
    /// generic signature.
    pub(crate) fn prune(&mut self, cp: &ConstPool, new_cp: &mut ConstPool) -> Result<()> {
        self.name_index = new_cp.add_utf8(cp.utf8(self.name_index)?);
        self.descriptor_index = new_cp.add_utf8(cp.utf8(self.descriptor_index)?);
        let mut kept = Vec::new();
        for attr in &self.attributes {
            if attr.name(cp)? == SIGNATURE {
                kept.push(attr.copy(cp, new_cp, None)?);
            }
        }
        self.attributes = kept;
        Ok(())
    }
}
