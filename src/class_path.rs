//! Class byte providers and the ordered search list a pool consults.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::io::Read;
use std::path::PathBuf;

use log::debug;

use crate::error::Result;

/// A source of raw class bytes, looked up by dotted class name.
///
/// `find_class` is a pure lookup: absence and unreadable entries both report
/// as `None`, and the reason is only interesting at debug level.
pub trait ClassPath: Send + Sync {
    fn find_class(&self, name: &str) -> Option<Vec<u8>>;
}

/// Serves `pkg.Foo` from `<root>/pkg/Foo.class`.
pub struct DirClassPath {
    root: PathBuf,
}

impl DirClassPath {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        DirClassPath { root: root.into() }
    }
}

impl ClassPath for DirClassPath {
    fn find_class(&self, name: &str) -> Option<Vec<u8>> {
        let path = self.root.join(name.replace('.', "/") + ".class");
        match fs::read(&path) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                debug!("no {} under {}: {}", name, self.root.display(), e);
                None
            }
        }
    }
}

/// Serves classes out of a jar (or any zip) archive.
///
/// The archive is slurped into memory at construction so lookups never touch
/// the file again; only `.class` entries are kept.
pub struct JarClassPath {
    source: String,
    classes: BTreeMap<String, Vec<u8>>,
}

impl JarClassPath {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file = fs::File::open(&path)?;
        let mut archive = zip::ZipArchive::new(file)?;
        let mut classes = BTreeMap::new();
        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            if !entry.name().ends_with(".class") {
                continue;
            }
            let mut bytes = Vec::with_capacity(entry.size() as usize);
            entry.read_to_end(&mut bytes)?;
            classes.insert(entry.name().to_string(), bytes);
        }
        Ok(JarClassPath {
            source: path.display().to_string(),
            classes,
        })
    }
}

impl ClassPath for JarClassPath {
    fn find_class(&self, name: &str) -> Option<Vec<u8>> {
        let entry = name.replace('.', "/") + ".class";
        match self.classes.get(&entry) {
            Some(bytes) => Some(bytes.clone()),
            None => {
                debug!("no {} in {}", entry, self.source);
                None
            }
        }
    }
}

/// Serves exactly one class from an in-memory byte buffer.
pub struct ByteArrayClassPath {
    name: String,
    bytes: Vec<u8>,
}

impl ByteArrayClassPath {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        ByteArrayClassPath {
            name: name.into(),
            bytes,
        }
    }
}

impl ClassPath for ByteArrayClassPath {
    fn find_class(&self, name: &str) -> Option<Vec<u8>> {
        (name == self.name).then(|| self.bytes.clone())
    }
}

/// Identifies a registered provider so it can be removed later.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct ClassPathHandle(usize);

/// An ordered list of providers searched head to tail, with a memo of names
/// known not to resolve anywhere.
#[derive(Default)]
pub(crate) struct ClassPathList {
    paths: Vec<(usize, Box<dyn ClassPath>)>,
    next_handle: usize,
    invalid_names: HashSet<String>,
}

impl ClassPathList {
    /// Registers a provider at the front of the search order.
    pub fn insert(&mut self, path: Box<dyn ClassPath>) -> ClassPathHandle {
        let handle = self.take_handle();
        self.paths.insert(0, (handle.0, path));
        handle
    }

    /// Registers a provider at the back of the search order.
    pub fn append(&mut self, path: Box<dyn ClassPath>) -> ClassPathHandle {
        let handle = self.take_handle();
        self.paths.push((handle.0, path));
        handle
    }

    /// Unregisters a provider. Returns false when the handle is unknown.
    pub fn remove(&mut self, handle: ClassPathHandle) -> bool {
        let before = self.paths.len();
        self.paths.retain(|(h, _)| *h != handle.0);
        let removed = self.paths.len() != before;
        if removed {
            // A shrunk search space cannot invalidate the memo, but keeping
            // the rule uniform with insert/append is simpler to reason about.
            self.invalid_names.clear();
        }
        removed
    }

    fn take_handle(&mut self) -> ClassPathHandle {
        let handle = ClassPathHandle(self.next_handle);
        self.next_handle += 1;
        // New providers may resolve names previously memoized as absent.
        self.invalid_names.clear();
        handle
    }

    /// Memoizes `name` as known-absent so future searches skip the providers.
    pub fn record_invalid_class_name(&mut self, name: &str) {
        self.invalid_names.insert(name.to_string());
    }

    /// Searches the providers in order, consulting and feeding the
    /// known-absent memo.
    pub fn find(&mut self, name: &str) -> Option<Vec<u8>> {
        if self.invalid_names.contains(name) {
            return None;
        }
        for (_, path) in &self.paths {
            if let Some(bytes) = path.find_class(name) {
                return Some(bytes);
            }
        }
        debug!("class {} not found on any of {} paths", name, self.paths.len());
        self.invalid_names.insert(name.to_string());
        None
    }
}
