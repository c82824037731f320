//! Filesystem capability used by every pipeline stage.
//!
//! Stages never call `std::fs` directly. They go through the [`Fs`] trait,
//! which exposes only what an incremental build needs: list a directory,
//! stat, read, write, create directories, delete. Two implementations ship:
//!
//! - [`DiskFs`]: the real filesystem.
//! - [`MemoryFs`]: a tree held in memory, used by the test suite so whole
//!   build passes can run without touching disk.
//!
//! Implementations must be `Sync`: pages, data documents and assets are
//! written from rayon worker threads.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Dir,
    /// A symbolic link to a directory. Walks never descend into one, so a
    /// link can neither lead a pass outside its tree nor loop back into it.
    /// Links to files are listed as [`EntryKind::File`].
    Symlink,
}

/// One child of a listed directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub path: PathBuf,
    pub kind: EntryKind,
}

impl DirEntry {
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Dir
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStat {
    pub kind: EntryKind,
    pub len: u64,
    pub modified: Option<SystemTime>,
}

pub trait Fs: Sync {
    /// Children of `dir`, sorted by name.
    fn read_dir(&self, dir: &Path) -> io::Result<Vec<DirEntry>>;

    /// Fails with [`io::ErrorKind::NotFound`] when nothing exists at `path`.
    fn stat(&self, path: &Path) -> io::Result<FileStat>;

    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Replace the file's contents. The parent directory must exist.
    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()>;

    fn create_dir_all(&self, dir: &Path) -> io::Result<()>;

    fn remove_file(&self, path: &Path) -> io::Result<()>;

    /// Remove an empty directory.
    fn remove_dir(&self, dir: &Path) -> io::Result<()>;

    /// Remove a directory and everything below it.
    fn remove_dir_all(&self, dir: &Path) -> io::Result<()>;

    fn copy(&self, from: &Path, to: &Path) -> io::Result<()> {
        let bytes = self.read(from)?;
        self.write(to, &bytes)
    }

    fn exists(&self, path: &Path) -> bool {
        self.stat(path).is_ok()
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.stat(path).is_ok_and(|s| s.kind == EntryKind::Dir)
    }
}

// ============================================================================
// Disk
// ============================================================================

/// The real filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiskFs;

impl Fs for DiskFs {
    fn read_dir(&self, dir: &Path) -> io::Result<Vec<DirEntry>> {
        let mut entries = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            let file_type = entry.file_type()?;
            let kind = if file_type.is_symlink() {
                // Only the target's kind is looked up; the link is never followed.
                if path.is_dir() {
                    EntryKind::Symlink
                } else {
                    EntryKind::File
                }
            } else if file_type.is_dir() {
                EntryKind::Dir
            } else {
                EntryKind::File
            };
            entries.push(DirEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                path,
                kind,
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    fn stat(&self, path: &Path) -> io::Result<FileStat> {
        let meta = std::fs::metadata(path)?;
        Ok(FileStat {
            kind: if meta.is_dir() {
                EntryKind::Dir
            } else {
                EntryKind::File
            },
            len: meta.len(),
            modified: meta.modified().ok(),
        })
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(path)
    }

    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        std::fs::write(path, contents)
    }

    fn create_dir_all(&self, dir: &Path) -> io::Result<()> {
        std::fs::create_dir_all(dir)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        std::fs::remove_file(path)
    }

    fn remove_dir(&self, dir: &Path) -> io::Result<()> {
        std::fs::remove_dir(dir)
    }

    fn remove_dir_all(&self, dir: &Path) -> io::Result<()> {
        std::fs::remove_dir_all(dir)
    }

    fn copy(&self, from: &Path, to: &Path) -> io::Result<()> {
        std::fs::copy(from, to).map(|_| ())
    }
}

// ============================================================================
// Memory
// ============================================================================

#[derive(Debug, Clone)]
enum Node {
    Dir,
    File { data: Vec<u8>, modified: SystemTime },
}

#[derive(Debug, Default)]
struct MemoryState {
    nodes: BTreeMap<PathBuf, Node>,
    /// Logical clock: every write gets a strictly later mtime, so
    /// newer-than comparisons are deterministic in tests.
    clock: u64,
}

impl MemoryState {
    fn tick(&mut self) -> SystemTime {
        self.clock += 1;
        SystemTime::UNIX_EPOCH + Duration::from_secs(self.clock)
    }

    fn ensure_dirs(&mut self, dir: &Path) -> io::Result<()> {
        for ancestor in dir.ancestors() {
            if ancestor.as_os_str().is_empty() {
                continue;
            }
            match self.nodes.get(ancestor) {
                Some(Node::Dir) => {}
                Some(Node::File { .. }) => {
                    return Err(io::Error::new(
                        io::ErrorKind::AlreadyExists,
                        format!("{} is a file", ancestor.display()),
                    ));
                }
                None => {
                    self.nodes.insert(ancestor.to_path_buf(), Node::Dir);
                }
            }
        }
        Ok(())
    }

    fn children<'a>(&'a self, dir: &'a Path) -> impl Iterator<Item = (&'a PathBuf, &'a Node)> {
        self.nodes
            .range(dir.to_path_buf()..)
            .skip_while(move |(p, _)| p.as_path() == dir)
            .take_while(move |(p, _)| p.starts_with(dir))
            .filter(move |(p, _)| p.parent() == Some(dir))
    }
}

fn not_found(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("{}: no such file or directory", path.display()),
    )
}

/// An in-memory tree. Paths are used verbatim as keys, so callers should
/// stick to one spelling of the root (`/site`, not `/site/.`).
#[derive(Debug, Default)]
pub struct MemoryFs {
    state: Mutex<MemoryState>,
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create a file (and its parent directories) in one step.
    pub fn insert_file(&self, path: impl AsRef<Path>, contents: impl AsRef<[u8]>) {
        let path = path.as_ref();
        let mut state = self.lock();
        if let Some(parent) = path.parent() {
            // Only fails when an ancestor is a file; fixture setup never does that.
            let _ = state.ensure_dirs(parent);
        }
        let modified = state.tick();
        state.nodes.insert(
            path.to_path_buf(),
            Node::File {
                data: contents.as_ref().to_vec(),
                modified,
            },
        );
    }

    /// Load a real directory into memory under `mount`.
    pub fn snapshot(source: &Path, mount: &Path) -> io::Result<Self> {
        let fs = Self::new();
        fs.create_dir_all(mount)?;
        for entry in walkdir::WalkDir::new(source).min_depth(1) {
            let entry = entry.map_err(io::Error::other)?;
            let relative = entry
                .path()
                .strip_prefix(source)
                .map_err(io::Error::other)?;
            let target = mount.join(relative);
            if entry.file_type().is_dir() {
                fs.create_dir_all(&target)?;
            } else {
                fs.insert_file(&target, std::fs::read(entry.path())?);
            }
        }
        Ok(fs)
    }

    /// All file paths currently held, sorted.
    pub fn files(&self) -> Vec<PathBuf> {
        self.lock()
            .nodes
            .iter()
            .filter(|(_, n)| matches!(n, Node::File { .. }))
            .map(|(p, _)| p.clone())
            .collect()
    }

    pub fn read_to_string(&self, path: impl AsRef<Path>) -> io::Result<String> {
        let bytes = self.read(path.as_ref())?;
        String::from_utf8(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}

impl Fs for MemoryFs {
    fn read_dir(&self, dir: &Path) -> io::Result<Vec<DirEntry>> {
        let state = self.lock();
        match state.nodes.get(dir) {
            Some(Node::Dir) => {}
            Some(Node::File { .. }) => {
                return Err(io::Error::new(
                    io::ErrorKind::NotADirectory,
                    format!("{} is not a directory", dir.display()),
                ));
            }
            None => return Err(not_found(dir)),
        }
        let mut entries: Vec<DirEntry> = state
            .children(dir)
            .map(|(path, node)| DirEntry {
                name: path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                path: path.clone(),
                kind: match node {
                    Node::Dir => EntryKind::Dir,
                    Node::File { .. } => EntryKind::File,
                },
            })
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    fn stat(&self, path: &Path) -> io::Result<FileStat> {
        match self.lock().nodes.get(path) {
            Some(Node::Dir) => Ok(FileStat {
                kind: EntryKind::Dir,
                len: 0,
                modified: None,
            }),
            Some(Node::File { data, modified }) => Ok(FileStat {
                kind: EntryKind::File,
                len: data.len() as u64,
                modified: Some(*modified),
            }),
            None => Err(not_found(path)),
        }
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        match self.lock().nodes.get(path) {
            Some(Node::File { data, .. }) => Ok(data.clone()),
            Some(Node::Dir) => Err(io::Error::new(
                io::ErrorKind::IsADirectory,
                format!("{} is a directory", path.display()),
            )),
            None => Err(not_found(path)),
        }
    }

    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        let mut state = self.lock();
        let parent_ok = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => matches!(state.nodes.get(p), Some(Node::Dir)),
            _ => true,
        };
        if !parent_ok {
            return Err(not_found(path));
        }
        if matches!(state.nodes.get(path), Some(Node::Dir)) {
            return Err(io::Error::new(
                io::ErrorKind::IsADirectory,
                format!("{} is a directory", path.display()),
            ));
        }
        let modified = state.tick();
        state.nodes.insert(
            path.to_path_buf(),
            Node::File {
                data: contents.to_vec(),
                modified,
            },
        );
        Ok(())
    }

    fn create_dir_all(&self, dir: &Path) -> io::Result<()> {
        self.lock().ensure_dirs(dir)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        let mut state = self.lock();
        match state.nodes.get(path) {
            Some(Node::File { .. }) => {
                state.nodes.remove(path);
                Ok(())
            }
            Some(Node::Dir) => Err(io::Error::new(
                io::ErrorKind::IsADirectory,
                format!("{} is a directory", path.display()),
            )),
            None => Err(not_found(path)),
        }
    }

    fn remove_dir(&self, dir: &Path) -> io::Result<()> {
        let mut state = self.lock();
        match state.nodes.get(dir) {
            Some(Node::Dir) => {}
            Some(Node::File { .. }) => {
                return Err(io::Error::new(
                    io::ErrorKind::NotADirectory,
                    format!("{} is not a directory", dir.display()),
                ));
            }
            None => return Err(not_found(dir)),
        }
        if state.children(dir).next().is_some() {
            return Err(io::Error::new(
                io::ErrorKind::DirectoryNotEmpty,
                format!("{} is not empty", dir.display()),
            ));
        }
        state.nodes.remove(dir);
        Ok(())
    }

    fn remove_dir_all(&self, dir: &Path) -> io::Result<()> {
        let mut state = self.lock();
        if !matches!(state.nodes.get(dir), Some(Node::Dir)) {
            return Err(not_found(dir));
        }
        state.nodes.retain(|p, _| !p.starts_with(dir));
        Ok(())
    }
}
