use binrw::binrw;

/// A raw attribute: a name reference plus an opaque payload.
///
/// Attributes the library understands (`SourceFile`, `Signature`, the
/// annotation family, ...) are interpreted lazily from `info` by the
/// accessors in this module; everything else round-trips untouched.
#[binrw]
#[brw(big)]
#[derive(Clone, Debug, PartialEq)]
pub struct AttributeInfo {
    pub name_index: u16,
    #[br(temp)]
    #[bw(try_calc = u32::try_from(info.len()))]
    attribute_length: u32,
    #[br(count = attribute_length)]
    pub info: Vec<u8>,
}

/// One record of an `InnerClasses` attribute.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InnerClassInfo {
    pub inner_class_info_index: u16,
    pub outer_class_info_index: u16,
    pub inner_name_index: u16,
    pub inner_class_access_flags: u16,
}
