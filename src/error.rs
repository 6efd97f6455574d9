use thiserror::Error;

/// Errors produced while decoding, mutating, or resolving class files.
#[derive(Error, Debug)]
pub enum ClassError {
    #[error("bad magic number: {0:#010x}")]
    BadMagicNumber(u32),

    #[error("truncated class file")]
    TruncatedClassFile,

    #[error("malformed constant pool: {0}")]
    MalformedConstantPool(String),

    /// A constant pool reference was zero, out of range, or resolved to an
    /// entry of the wrong tag. Raised at the point of dereference.
    #[error("invalid constant pool index {index}: expected {expected}")]
    InvalidIndex { index: u16, expected: &'static str },

    #[error("malformed {0} attribute payload")]
    MalformedAttribute(String),

    /// A generic attribute with a non-empty payload cannot be carried into
    /// another constant pool: its layout is unknown, so any embedded indices
    /// would dangle.
    #[error("cannot copy attribute {0:?}: unrecognized payload may embed constant pool indices")]
    UnsupportedAttributeCopy(String),

    #[error("class not found: {0}")]
    ClassNotFound(String),

    #[error("{0}: frozen class (cannot edit)")]
    FrozenClass(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("class decode error: {0}")]
    Decode(binrw::Error),
}

const MALFORMED_POOL: &str = "constant pool";

/// Builds the codec-level error for a constant pool violation. Every such
/// error goes through this constructor, and `From<binrw::Error>` recognizes
/// exactly what it builds, so the two cannot drift apart.
pub(crate) fn malformed_pool(pos: u64, message: impl std::fmt::Display) -> binrw::Error {
    binrw::Error::AssertFail {
        pos,
        message: format!("{MALFORMED_POOL}: {message}"),
    }
}

impl From<binrw::Error> for ClassError {
    fn from(e: binrw::Error) -> Self {
        match e {
            binrw::Error::Io(io) if io.kind() == std::io::ErrorKind::UnexpectedEof => {
                ClassError::TruncatedClassFile
            }
            binrw::Error::Io(io) => ClassError::Io(io),
            binrw::Error::AssertFail { ref message, .. }
                if message.starts_with(MALFORMED_POOL) =>
            {
                ClassError::MalformedConstantPool(message.clone())
            }
            other => ClassError::Decode(other),
        }
    }
}

pub type Result<T, E = ClassError> = std::result::Result<T, E>;
