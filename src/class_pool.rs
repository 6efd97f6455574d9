//! A layered, thread-safe cache of decoded class files.
//!
//! Lookups resolve against an ordered provider list and an optional parent
//! pool; resolved classes are cached and shared, so repeated lookups of the
//! same name yield the same handle.
//!
//! Locking: one coarse mutex guards the pool state, and each cached class
//! carries its own mutex. Pools only ever take their own lock and then a
//! parent's (never the reverse), and class locks are taken with no pool lock
//! held.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::debug;

use crate::class_path::{ClassPath, ClassPathHandle, ClassPathList};
use crate::error::{ClassError, Result};
use crate::types::ClassFile;

/// Cached lookups between pool-wide compaction sweeps.
const COMPRESS_THRESHOLD: u32 = 100;

pub struct ClassPool {
    parent: Option<Arc<ClassPool>>,
    inner: Mutex<PoolInner>,
}

#[derive(Default)]
struct PoolInner {
    classes: HashMap<String, Arc<Mutex<ClassFile>>>,
    source: ClassPathList,
    child_first_lookup: bool,
    compress_count: u32,
}

impl Default for ClassPool {
    fn default() -> Self {
        ClassPool::new()
    }
}

impl ClassPool {
    pub fn new() -> Self {
        ClassPool {
            parent: None,
            inner: Mutex::new(PoolInner::default()),
        }
    }

    /// Creates a pool that delegates to `parent`. Parents are shared and
    /// outlive their children's interest in them.
    pub fn with_parent(parent: Arc<ClassPool>) -> Self {
        ClassPool {
            parent: Some(parent),
            inner: Mutex::new(PoolInner::default()),
        }
    }

    /// When set, this pool's own cache and providers are consulted before
    /// the parent. Default is parent-first, mirroring classloader delegation.
    pub fn set_child_first_lookup(&self, child_first: bool) {
        self.lock().child_first_lookup = child_first;
    }

    // A poisoned pool lock only means a panic elsewhere mid-lookup; the
    // cache itself is still structurally sound.
    fn lock(&self) -> MutexGuard<'_, PoolInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Resolves `name` to its shared cached class, loading it on first use.
    pub fn get(&self, name: &str) -> Result<Arc<Mutex<ClassFile>>> {
        match self.get0(name, true)? {
            Some(entry) => {
                self.bump_compress();
                Ok(entry)
            }
            None => Err(ClassError::ClassNotFound(name.to_string())),
        }
    }

    /// Like [`get`](Self::get), but absence and load failures both report as
    /// `None` (failures at debug level only).
    pub fn get_or_null(&self, name: &str) -> Option<Arc<Mutex<ClassFile>>> {
        match self.get0(name, true) {
            Ok(Some(entry)) => {
                self.bump_compress();
                Some(entry)
            }
            Ok(None) => None,
            Err(e) => {
                debug!("lookup of {name} failed: {e}");
                None
            }
        }
    }

    fn get0(&self, name: &str, use_cache: bool) -> Result<Option<Arc<Mutex<ClassFile>>>> {
        // The own cache always wins; only the provider search order depends
        // on the child_first flag. A class registered here must never be
        // shadowed by a same-named class the parent can resolve.
        let child_first = {
            let inner = self.lock();
            if use_cache {
                if let Some(entry) = inner.classes.get(name) {
                    return Ok(Some(Arc::clone(entry)));
                }
            }
            inner.child_first_lookup
        };
        if !child_first {
            if let Some(parent) = &self.parent {
                if let Some(found) = parent.get0(name, use_cache)? {
                    return Ok(Some(found));
                }
            }
        }
        {
            let mut inner = self.lock();
            if let Some(bytes) = inner.source.find(name) {
                let class = ClassFile::from_bytes(&bytes)?;
                let entry = Arc::new(Mutex::new(class));
                inner.classes.insert(name.to_string(), Arc::clone(&entry));
                return Ok(Some(entry));
            }
        }
        if child_first {
            if let Some(parent) = &self.parent {
                return parent.get0(name, use_cache);
            }
        }
        Ok(None)
    }

    /// Loads `old` afresh (bypassing and never touching the cache), renames
    /// it to `new`, and hands the result to the caller. Use
    /// [`register`](Self::register) to cache it afterwards.
    pub fn get_and_rename(&self, old: &str, new: &str) -> Result<ClassFile> {
        let bytes = self
            .find_class_bytes(old)
            .ok_or_else(|| ClassError::ClassNotFound(old.to_string()))?;
        let mut class = ClassFile::from_bytes(&bytes)?;
        class.rename(old, new)?;
        Ok(class)
    }

    fn find_class_bytes(&self, name: &str) -> Option<Vec<u8>> {
        let child_first = self.lock().child_first_lookup;
        if !child_first {
            if let Some(parent) = &self.parent {
                if let Some(bytes) = parent.find_class_bytes(name) {
                    return Some(bytes);
                }
            }
        }
        if let Some(bytes) = self.lock().source.find(name) {
            return Some(bytes);
        }
        if child_first {
            if let Some(parent) = &self.parent {
                return parent.find_class_bytes(name);
            }
        }
        None
    }

    /// Decodes `bytes` and caches the class under its own name.
    pub fn make_class(&self, bytes: &[u8]) -> Result<Arc<Mutex<ClassFile>>> {
        self.register(ClassFile::from_bytes(bytes)?)
    }

    /// Caches `class` under its name, replacing any unfrozen entry of the
    /// same name. A frozen entry cannot be displaced.
    pub fn register(&self, class: ClassFile) -> Result<Arc<Mutex<ClassFile>>> {
        let name = class.name().to_string();
        let mut inner = self.lock();
        if let Some(existing) = inner.classes.get(&name) {
            let frozen = existing
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .is_frozen();
            if frozen {
                return Err(ClassError::FrozenClass(name));
            }
        }
        let entry = Arc::new(Mutex::new(class));
        inner.classes.insert(name, Arc::clone(&entry));
        Ok(entry)
    }

    /// Drops the cached entry for `name`. Outstanding handles stay valid.
    pub fn evict(&self, name: &str) -> bool {
        self.lock().classes.remove(name).is_some()
    }

    /// Freezes the cached class of that name.
    pub fn freeze(&self, name: &str) -> Result<()> {
        let entry = self
            .get0(name, true)?
            .ok_or_else(|| ClassError::ClassNotFound(name.to_string()))?;
        entry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .freeze();
        Ok(())
    }

    /// Memoizes `name` as unresolvable without consulting the providers.
    pub fn record_invalid_class_name(&self, name: &str) {
        self.lock().source.record_invalid_class_name(name);
    }

    /// Registers a provider ahead of the existing ones.
    pub fn insert_class_path(&self, path: Box<dyn ClassPath>) -> ClassPathHandle {
        self.lock().source.insert(path)
    }

    /// Registers a provider behind the existing ones.
    pub fn append_class_path(&self, path: Box<dyn ClassPath>) -> ClassPathHandle {
        self.lock().source.append(path)
    }

    pub fn remove_class_path(&self, handle: ClassPathHandle) -> bool {
        self.lock().source.remove(handle)
    }

    // Every COMPRESS_THRESHOLD successful lookups, compact all unfrozen
    // cached classes. The entry list is snapshotted so no pool lock is held
    // while class locks are taken.
    fn bump_compress(&self) {
        let entries: Vec<(String, Arc<Mutex<ClassFile>>)> = {
            let mut inner = self.lock();
            inner.compress_count += 1;
            if inner.compress_count < COMPRESS_THRESHOLD {
                return;
            }
            inner.compress_count = 0;
            inner
                .classes
                .iter()
                .map(|(name, entry)| (name.clone(), Arc::clone(entry)))
                .collect()
        };
        for (name, entry) in entries {
            let mut class = entry.lock().unwrap_or_else(PoisonError::into_inner);
            if class.is_frozen() {
                debug!("not compressing frozen class {name}");
                continue;
            }
            if let Err(e) = class.compact() {
                debug!("compression of {name} skipped: {e}");
            }
        }
    }
}
