//! Structured view of the runtime annotation attributes.
//!
//! Annotation payloads nest arbitrarily (annotations inside arrays inside
//! annotations), so they are parsed with a hand-rolled byte walker rather
//! than a binrw derive, and serialized back with a mirror-image writer.

use crate::constant_pool::{ClassMap, ConstPool};
use crate::descriptor;
use crate::error::{ClassError, Result};

#[derive(Clone, Debug, PartialEq)]
pub struct Annotation {
    /// `Utf8` index of the annotation type, in descriptor form (`Lpkg/Anno;`).
    pub type_index: u16,
    pub element_value_pairs: Vec<ElementValuePair>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ElementValuePair {
    pub element_name_index: u16,
    pub value: ElementValue,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ElementValue {
    /// Primitive or string constant; `tag` is one of `BCDFIJSZs`.
    Const { tag: u8, const_value_index: u16 },
    EnumConst {
        type_name_index: u16,
        const_name_index: u16,
    },
    ClassInfo { class_info_index: u16 },
    Annotation(Box<Annotation>),
    Array(Vec<ElementValue>),
}

/// Parses a `Runtime(In)VisibleAnnotations` payload.
pub fn parse_annotations(attr_name: &str, info: &[u8]) -> Result<Vec<Annotation>> {
    let mut walker = Walker::new(attr_name, info);
    let annotations = walker.annotation_list()?;
    walker.finish()?;
    Ok(annotations)
}

/// Parses a `Runtime(In)VisibleParameterAnnotations` payload: one annotation
/// list per declared parameter.
pub fn parse_parameter_annotations(attr_name: &str, info: &[u8]) -> Result<Vec<Vec<Annotation>>> {
    let mut walker = Walker::new(attr_name, info);
    let num_parameters = walker.u8()?;
    let mut parameters = Vec::with_capacity(num_parameters as usize);
    for _ in 0..num_parameters {
        parameters.push(walker.annotation_list()?);
    }
    walker.finish()?;
    Ok(parameters)
}

pub fn write_annotations(annotations: &[Annotation]) -> Vec<u8> {
    let mut out = Vec::new();
    put_u16(&mut out, annotations.len() as u16);
    for a in annotations {
        write_annotation(&mut out, a);
    }
    out
}

pub fn write_parameter_annotations(parameters: &[Vec<Annotation>]) -> Vec<u8> {
    let mut out = vec![parameters.len() as u8];
    for annotations in parameters {
        put_u16(&mut out, annotations.len() as u16);
        for a in annotations {
            write_annotation(&mut out, a);
        }
    }
    out
}

fn write_annotation(out: &mut Vec<u8>, a: &Annotation) {
    put_u16(out, a.type_index);
    put_u16(out, a.element_value_pairs.len() as u16);
    for pair in &a.element_value_pairs {
        put_u16(out, pair.element_name_index);
        write_element_value(out, &pair.value);
    }
}

fn write_element_value(out: &mut Vec<u8>, value: &ElementValue) {
    match value {
        ElementValue::Const {
            tag,
            const_value_index,
        } => {
            out.push(*tag);
            put_u16(out, *const_value_index);
        }
        ElementValue::EnumConst {
            type_name_index,
            const_name_index,
        } => {
            out.push(b'e');
            put_u16(out, *type_name_index);
            put_u16(out, *const_name_index);
        }
        ElementValue::ClassInfo { class_info_index } => {
            out.push(b'c');
            put_u16(out, *class_info_index);
        }
        ElementValue::Annotation(a) => {
            out.push(b'@');
            write_annotation(out, a);
        }
        ElementValue::Array(values) => {
            out.push(b'[');
            put_u16(out, values.len() as u16);
            for v in values {
                write_element_value(out, v);
            }
        }
    }
}

fn put_u16(out: &mut Vec<u8>, v: u16) {
    out.extend_from_slice(&v.to_be_bytes());
}

/// Copies a list of annotations into another pool, re-interning every index
/// and substituting class names per `classnames`.
pub fn copy_annotations(
    annotations: &[Annotation],
    cp: &ConstPool,
    new_cp: &mut ConstPool,
    classnames: Option<&ClassMap>,
) -> Result<Vec<Annotation>> {
    annotations
        .iter()
        .map(|a| copy_annotation(a, cp, new_cp, classnames))
        .collect()
}

fn copy_annotation(
    a: &Annotation,
    cp: &ConstPool,
    new_cp: &mut ConstPool,
    classnames: Option<&ClassMap>,
) -> Result<Annotation> {
    let type_index = copy_descriptor_utf8(a.type_index, cp, new_cp, classnames)?;
    let element_value_pairs = a
        .element_value_pairs
        .iter()
        .map(|pair| {
            Ok(ElementValuePair {
                element_name_index: cp.copy(pair.element_name_index, new_cp, classnames)?,
                value: copy_element_value(&pair.value, cp, new_cp, classnames)?,
            })
        })
        .collect::<Result<_>>()?;
    Ok(Annotation {
        type_index,
        element_value_pairs,
    })
}

fn copy_element_value(
    value: &ElementValue,
    cp: &ConstPool,
    new_cp: &mut ConstPool,
    classnames: Option<&ClassMap>,
) -> Result<ElementValue> {
    Ok(match value {
        ElementValue::Const {
            tag,
            const_value_index,
        } => ElementValue::Const {
            tag: *tag,
            const_value_index: cp.copy(*const_value_index, new_cp, classnames)?,
        },
        ElementValue::EnumConst {
            type_name_index,
            const_name_index,
        } => ElementValue::EnumConst {
            type_name_index: copy_descriptor_utf8(*type_name_index, cp, new_cp, classnames)?,
            const_name_index: cp.copy(*const_name_index, new_cp, classnames)?,
        },
        ElementValue::ClassInfo { class_info_index } => ElementValue::ClassInfo {
            class_info_index: copy_descriptor_utf8(*class_info_index, cp, new_cp, classnames)?,
        },
        ElementValue::Annotation(a) => {
            ElementValue::Annotation(Box::new(copy_annotation(a, cp, new_cp, classnames)?))
        }
        ElementValue::Array(values) => ElementValue::Array(
            values
                .iter()
                .map(|v| copy_element_value(v, cp, new_cp, classnames))
                .collect::<Result<_>>()?,
        ),
    })
}

// Annotation type references are descriptor-form Utf8 entries, so the
// rename map applies to the embedded class names, not the whole string.
fn copy_descriptor_utf8(
    index: u16,
    cp: &ConstPool,
    new_cp: &mut ConstPool,
    classnames: Option<&ClassMap>,
) -> Result<u16> {
    let desc = cp.utf8(index)?;
    let renamed = classnames.and_then(|map| descriptor::rename_with_map(desc, map));
    Ok(match renamed {
        Some(r) => new_cp.add_utf8(&r),
        None => new_cp.add_utf8(desc),
    })
}

struct Walker<'a> {
    attr_name: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Walker<'a> {
    fn new(attr_name: &'a str, bytes: &'a [u8]) -> Self {
        Walker {
            attr_name,
            bytes,
            pos: 0,
        }
    }

    fn malformed(&self) -> ClassError {
        ClassError::MalformedAttribute(self.attr_name.to_string())
    }

    fn u8(&mut self) -> Result<u8> {
        let b = *self.bytes.get(self.pos).ok_or_else(|| self.malformed())?;
        self.pos += 1;
        Ok(b)
    }

    fn u16(&mut self) -> Result<u16> {
        Ok(u16::from_be_bytes([self.u8()?, self.u8()?]))
    }

    fn annotation_list(&mut self) -> Result<Vec<Annotation>> {
        let count = self.u16()?;
        let mut annotations = Vec::with_capacity(count as usize);
        for _ in 0..count {
            annotations.push(self.annotation()?);
        }
        Ok(annotations)
    }

    fn annotation(&mut self) -> Result<Annotation> {
        let type_index = self.u16()?;
        let num_pairs = self.u16()?;
        let mut element_value_pairs = Vec::with_capacity(num_pairs as usize);
        for _ in 0..num_pairs {
            element_value_pairs.push(ElementValuePair {
                element_name_index: self.u16()?,
                value: self.element_value()?,
            });
        }
        Ok(Annotation {
            type_index,
            element_value_pairs,
        })
    }

    fn element_value(&mut self) -> Result<ElementValue> {
        let tag = self.u8()?;
        Ok(match tag {
            b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z' | b's' => ElementValue::Const {
                tag,
                const_value_index: self.u16()?,
            },
            b'e' => ElementValue::EnumConst {
                type_name_index: self.u16()?,
                const_name_index: self.u16()?,
            },
            b'c' => ElementValue::ClassInfo {
                class_info_index: self.u16()?,
            },
            b'@' => ElementValue::Annotation(Box::new(self.annotation()?)),
            b'[' => {
                let count = self.u16()?;
                let mut values = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    values.push(self.element_value()?);
                }
                ElementValue::Array(values)
            }
            _ => return Err(self.malformed()),
        })
    }

    fn finish(self) -> Result<()> {
        if self.pos == self.bytes.len() {
            Ok(())
        } else {
            Err(self.malformed())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_values_round_trip() {
        let annotation = Annotation {
            type_index: 7,
            element_value_pairs: vec![ElementValuePair {
                element_name_index: 8,
                value: ElementValue::Array(vec![
                    ElementValue::Const {
                        tag: b's',
                        const_value_index: 9,
                    },
                    ElementValue::Annotation(Box::new(Annotation {
                        type_index: 10,
                        element_value_pairs: Vec::new(),
                    })),
                ]),
            }],
        };
        let bytes = write_annotations(std::slice::from_ref(&annotation));
        let reread = parse_annotations("RuntimeVisibleAnnotations", &bytes).unwrap();
        assert_eq!(reread, vec![annotation]);
    }

    #[test]
    fn trailing_bytes_are_rejected() {
        let mut bytes = write_annotations(&[]);
        bytes.push(0);
        assert!(parse_annotations("RuntimeVisibleAnnotations", &bytes).is_err());
    }

    #[test]
    fn unknown_value_tag_is_rejected() {
        let annotation = Annotation {
            type_index: 1,
            element_value_pairs: vec![ElementValuePair {
                element_name_index: 2,
                value: ElementValue::Const {
                    tag: b'I',
                    const_value_index: 3,
                },
            }],
        };
        let mut bytes = write_annotations(&[annotation]);
        bytes[8] = b'x'; // the element value tag
        assert!(parse_annotations("RuntimeInvisibleAnnotations", &bytes).is_err());
    }
}
