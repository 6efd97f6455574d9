//! A reader/writer for the [Java class file format](https://docs.oracle.com/javase/specs/jvms/se7/html/jvms-4.html)
//! with constant pool editing, pool compaction, and a layered class lookup
//! cache.
//!
//! Decode a class, edit it, and write it back:
//!
//! ```rust
//! use classfile_codec::ClassFile;
//!
//! let mut class = ClassFile::new(false, "com.example.Generated", None);
//! class.add_interface("java.io.Serializable")?;
//! let bytes = class.to_bytes()?;
//! assert_eq!(ClassFile::from_bytes(&bytes)?.name(), "com.example.Generated");
//! # Ok::<(), classfile_codec::ClassError>(())
//! ```

use std::fs;
use std::path::Path;

#[macro_use]
extern crate bitflags;

pub mod attribute_info;
pub mod constant_info;
pub mod constant_pool;
pub mod field_info;
pub mod method_info;

pub mod class_path;
pub mod class_pool;
pub mod descriptor;
pub mod error;
pub mod types;

pub use class_path::{
    ByteArrayClassPath, ClassPath, ClassPathHandle, DirClassPath, JarClassPath,
};
pub use class_pool::ClassPool;
pub use constant_pool::{ClassMap, ConstPool};
pub use error::{ClassError, Result};
pub use types::*;

/// Reads and decodes the class file at `path`.
pub fn parse_class<P: AsRef<Path>>(path: P) -> Result<ClassFile> {
    let bytes = fs::read(path)?;
    ClassFile::from_bytes(&bytes)
}
