//! Content-addressed incremental writes.
//!
//! Every file the build produces goes through [`ContentWriter::write_if_changed`].
//! A write is skipped when the bytes already on disk have the same SHA-256
//! fingerprint as the new content, so an unchanged site rebuilds without
//! touching a single output file (mtimes stay put, rsync/CDN uploads stay
//! small).
//!
//! ## The valid file set
//!
//! The writer also records every path it was asked about in the pass's
//! [`ValidFileSet`], *before* comparing and whether or not it wrote. A file
//! that was considered and found unchanged is just as much part of the site
//! as one that was rewritten; the orphan reconciler deletes everything else.
//!
//! The set is append-only for the duration of a pass and is shared by the
//! page, data and asset stages running on different threads, so it sits
//! behind a `Mutex`.
//!
//! ## Collisions
//!
//! Pages, data documents and assets own disjoint parts of the output tree.
//! If a second producer registers a path already claimed in the same pass,
//! the write is refused with [`WriteError::Collision`] and the first
//! producer's content stands.

use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;

use crate::fs::Fs;

#[derive(Error, Debug)]
pub enum WriteError {
    #[error("failed to write {}: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },
    #[error("{} is produced more than once in this build", .0.display())]
    Collision(PathBuf),
}

/// SHA-256 of a byte slice, returned as a hex string.
pub fn fingerprint(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// SHA-256 of a file's contents, returned as a hex string.
pub fn fingerprint_file(fs: &dyn Fs, path: &Path) -> io::Result<String> {
    Ok(fingerprint(&fs.read(path)?))
}

/// Every output path this pass produced or confirmed.
#[derive(Debug, Default)]
pub struct ValidFileSet {
    files: Mutex<HashSet<PathBuf>>,
    dirs: Mutex<HashSet<PathBuf>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ValidFileSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a file. Returns `false` if it was already registered.
    pub fn insert(&self, path: impl Into<PathBuf>) -> bool {
        lock(&self.files).insert(path.into())
    }

    pub fn contains(&self, path: &Path) -> bool {
        lock(&self.files).contains(path)
    }

    /// Register a directory that must survive reconciliation even if empty.
    pub fn keep_dir(&self, dir: impl Into<PathBuf>) {
        lock(&self.dirs).insert(dir.into());
    }

    pub fn is_kept_dir(&self, dir: &Path) -> bool {
        lock(&self.dirs).contains(dir)
    }

    pub fn len(&self) -> usize {
        lock(&self.files).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Writes files only when their content changed.
#[derive(Clone, Copy)]
pub struct ContentWriter<'a> {
    fs: &'a dyn Fs,
    valid: &'a ValidFileSet,
}

impl<'a> ContentWriter<'a> {
    pub fn new(fs: &'a dyn Fs, valid: &'a ValidFileSet) -> Self {
        Self { fs, valid }
    }

    /// Write `content` to `path` unless identical bytes are already there.
    ///
    /// Returns `Ok(true)` if the file was (re)written, `Ok(false)` if it was
    /// already up to date. The path is registered as valid in both cases.
    pub fn write_if_changed(&self, path: &Path, content: &[u8]) -> Result<bool, WriteError> {
        if !self.valid.insert(path) {
            return Err(WriteError::Collision(path.to_path_buf()));
        }

        // An unreadable existing file is treated as stale and overwritten.
        if let Ok(existing) = self.fs.read(path)
            && fingerprint(&existing) == fingerprint(content)
        {
            return Ok(false);
        }

        let io_err = |source| WriteError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            self.fs.create_dir_all(parent).map_err(io_err)?;
        }
        self.fs.write(path, content).map_err(io_err)?;
        Ok(true)
    }
}
