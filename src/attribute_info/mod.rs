//! The attribute table family shared by classes, fields, and methods.
//!
//! Attributes are carried as raw payloads keyed by an interned name. The
//! handful of attribute kinds the library interprets get typed accessors and
//! constructors here; copying between pools dispatches on the name so every
//! embedded pool index lands in the target pool.

pub mod annotation;
mod types;

pub use annotation::{Annotation, ElementValue, ElementValuePair};
pub use types::*;

use crate::constant_pool::{ClassMap, ConstPool};
use crate::descriptor;
use crate::error::{ClassError, Result};

pub const SOURCE_FILE: &str = "SourceFile";
pub const CONSTANT_VALUE: &str = "ConstantValue";
pub const SIGNATURE: &str = "Signature";
pub const EXCEPTIONS: &str = "Exceptions";
pub const INNER_CLASSES: &str = "InnerClasses";
pub const RUNTIME_VISIBLE_ANNOTATIONS: &str = "RuntimeVisibleAnnotations";
pub const RUNTIME_INVISIBLE_ANNOTATIONS: &str = "RuntimeInvisibleAnnotations";
pub const RUNTIME_VISIBLE_PARAMETER_ANNOTATIONS: &str = "RuntimeVisibleParameterAnnotations";
pub const RUNTIME_INVISIBLE_PARAMETER_ANNOTATIONS: &str = "RuntimeInvisibleParameterAnnotations";

impl AttributeInfo {
    /// Builds a `SourceFile` attribute naming `file_name`.
    pub fn source_file(cp: &mut ConstPool, file_name: &str) -> Self {
        let name_index = cp.add_utf8(SOURCE_FILE);
        let file_index = cp.add_utf8(file_name);
        AttributeInfo {
            name_index,
            info: file_index.to_be_bytes().to_vec(),
        }
    }

    /// Builds a `ConstantValue` attribute referencing the literal at
    /// `value_index`.
    pub fn constant_value(cp: &mut ConstPool, value_index: u16) -> Self {
        AttributeInfo {
            name_index: cp.add_utf8(CONSTANT_VALUE),
            info: value_index.to_be_bytes().to_vec(),
        }
    }

    /// Builds a `Signature` attribute carrying the generic signature string.
    pub fn signature(cp: &mut ConstPool, sig: &str) -> Self {
        let name_index = cp.add_utf8(SIGNATURE);
        let sig_index = cp.add_utf8(sig);
        AttributeInfo {
            name_index,
            info: sig_index.to_be_bytes().to_vec(),
        }
    }

    pub fn name<'a>(&self, cp: &'a ConstPool) -> Result<&'a str> {
        cp.utf8(self.name_index)
    }

    /// The file name carried by a `SourceFile` attribute.
    pub fn source_file_name(&self, cp: &ConstPool) -> Result<String> {
        Ok(cp.utf8(self.payload_index(SOURCE_FILE)?)?.to_string())
    }

    /// The pool index carried by a `ConstantValue` attribute.
    pub fn constant_value_index(&self) -> Result<u16> {
        self.payload_index(CONSTANT_VALUE)
    }

    /// The signature string carried by a `Signature` attribute.
    pub fn signature_string(&self, cp: &ConstPool) -> Result<String> {
        Ok(cp.utf8(self.payload_index(SIGNATURE)?)?.to_string())
    }

    /// The thrown-class indices of an `Exceptions` attribute.
    pub fn exception_indexes(&self) -> Result<Vec<u16>> {
        let mut walker = self.info.as_slice();
        let count = take_u16(&mut walker, EXCEPTIONS)?;
        let mut indexes = Vec::with_capacity(count as usize);
        for _ in 0..count {
            indexes.push(take_u16(&mut walker, EXCEPTIONS)?);
        }
        expect_consumed(walker, EXCEPTIONS)?;
        Ok(indexes)
    }

    /// The records of an `InnerClasses` attribute.
    pub fn inner_classes(&self) -> Result<Vec<InnerClassInfo>> {
        let mut walker = self.info.as_slice();
        let count = take_u16(&mut walker, INNER_CLASSES)?;
        let mut classes = Vec::with_capacity(count as usize);
        for _ in 0..count {
            classes.push(InnerClassInfo {
                inner_class_info_index: take_u16(&mut walker, INNER_CLASSES)?,
                outer_class_info_index: take_u16(&mut walker, INNER_CLASSES)?,
                inner_name_index: take_u16(&mut walker, INNER_CLASSES)?,
                inner_class_access_flags: take_u16(&mut walker, INNER_CLASSES)?,
            });
        }
        expect_consumed(walker, INNER_CLASSES)?;
        Ok(classes)
    }

    /// Parses an annotation attribute payload (either runtime visibility).
    pub fn annotations(&self, cp: &ConstPool) -> Result<Vec<Annotation>> {
        annotation::parse_annotations(self.name(cp)?, &self.info)
    }

    pub fn set_annotations(&mut self, annotations: &[Annotation]) {
        self.info = annotation::write_annotations(annotations);
    }

    /// Parses a parameter annotation attribute payload: one list per
    /// declared parameter.
    pub fn parameter_annotations(&self, cp: &ConstPool) -> Result<Vec<Vec<Annotation>>> {
        annotation::parse_parameter_annotations(self.name(cp)?, &self.info)
    }

    pub fn set_parameter_annotations(&mut self, parameters: &[Vec<Annotation>]) {
        self.info = annotation::write_parameter_annotations(parameters);
    }

    /// Declared parameter count of a parameter annotation attribute.
    pub fn num_parameters(&self) -> Result<u8> {
        self.info
            .first()
            .copied()
            .ok_or_else(|| ClassError::MalformedAttribute("ParameterAnnotations".to_string()))
    }

    /// Copies this attribute into `new_cp`, re-interning the name and every
    /// pool index embedded in the payload, with class names substituted per
    /// `classnames`.
    ///
    /// Attributes with an unrecognized name copy only when their payload is
    /// empty; a non-empty unknown payload may embed indices into the source
    /// pool and is rejected rather than silently corrupted.
    pub fn copy(
        &self,
        cp: &ConstPool,
        new_cp: &mut ConstPool,
        classnames: Option<&ClassMap>,
    ) -> Result<AttributeInfo> {
        let name = self.name(cp)?;
        let info = match name {
            SOURCE_FILE => {
                let file = cp.utf8(self.payload_index(SOURCE_FILE)?)?;
                new_cp.add_utf8(file).to_be_bytes().to_vec()
            }
            CONSTANT_VALUE => {
                let index = cp.copy(self.constant_value_index()?, new_cp, classnames)?;
                index.to_be_bytes().to_vec()
            }
            SIGNATURE => {
                let sig = cp.utf8(self.payload_index(SIGNATURE)?)?;
                let renamed = classnames.and_then(|map| descriptor::rename_with_map(sig, map));
                let index = match renamed {
                    Some(r) => new_cp.add_utf8(&r),
                    None => new_cp.add_utf8(sig),
                };
                index.to_be_bytes().to_vec()
            }
            EXCEPTIONS => {
                let indexes = self.exception_indexes()?;
                let mut out = Vec::with_capacity(2 + indexes.len() * 2);
                out.extend_from_slice(&(indexes.len() as u16).to_be_bytes());
                for index in indexes {
                    let copied = cp.copy(index, new_cp, classnames)?;
                    out.extend_from_slice(&copied.to_be_bytes());
                }
                out
            }
            INNER_CLASSES => {
                let classes = self.inner_classes()?;
                let mut out = Vec::with_capacity(2 + classes.len() * 8);
                out.extend_from_slice(&(classes.len() as u16).to_be_bytes());
                for c in classes {
                    // Zero means "absent" for the optional record fields.
                    for index in [c.inner_class_info_index, c.outer_class_info_index] {
                        let copied = if index == 0 {
                            0
                        } else {
                            cp.copy(index, new_cp, classnames)?
                        };
                        out.extend_from_slice(&copied.to_be_bytes());
                    }
                    let name_index = if c.inner_name_index == 0 {
                        0
                    } else {
                        new_cp.add_utf8(cp.utf8(c.inner_name_index)?)
                    };
                    out.extend_from_slice(&name_index.to_be_bytes());
                    out.extend_from_slice(&c.inner_class_access_flags.to_be_bytes());
                }
                out
            }
            RUNTIME_VISIBLE_ANNOTATIONS | RUNTIME_INVISIBLE_ANNOTATIONS => {
                let annotations = annotation::parse_annotations(name, &self.info)?;
                let copied =
                    annotation::copy_annotations(&annotations, cp, new_cp, classnames)?;
                annotation::write_annotations(&copied)
            }
            RUNTIME_VISIBLE_PARAMETER_ANNOTATIONS | RUNTIME_INVISIBLE_PARAMETER_ANNOTATIONS => {
                let parameters = annotation::parse_parameter_annotations(name, &self.info)?;
                let copied = parameters
                    .iter()
                    .map(|p| annotation::copy_annotations(p, cp, new_cp, classnames))
                    .collect::<Result<Vec<_>>>()?;
                annotation::write_parameter_annotations(&copied)
            }
            other => {
                if !self.info.is_empty() {
                    return Err(ClassError::UnsupportedAttributeCopy(other.to_string()));
                }
                Vec::new()
            }
        };
        Ok(AttributeInfo {
            name_index: new_cp.add_utf8(name),
            info,
        })
    }

    fn payload_index(&self, attr_name: &str) -> Result<u16> {
        let mut walker = self.info.as_slice();
        let index = take_u16(&mut walker, attr_name)?;
        expect_consumed(walker, attr_name)?;
        Ok(index)
    }
}

/// Copies every attribute in `attrs` into `new_cp`.
pub fn copy_all(
    attrs: &[AttributeInfo],
    cp: &ConstPool,
    new_cp: &mut ConstPool,
) -> Result<Vec<AttributeInfo>> {
    attrs.iter().map(|a| a.copy(cp, new_cp, None)).collect()
}

fn take_u16(bytes: &mut &[u8], attr_name: &str) -> Result<u16> {
    match bytes {
        [a, b, rest @ ..] => {
            let v = u16::from_be_bytes([*a, *b]);
            *bytes = rest;
            Ok(v)
        }
        _ => Err(ClassError::MalformedAttribute(attr_name.to_string())),
    }
}

fn expect_consumed(bytes: &[u8], attr_name: &str) -> Result<()> {
    if bytes.is_empty() {
        Ok(())
    } else {
        Err(ClassError::MalformedAttribute(attr_name.to_string()))
    }
}
