//! Static asset mirroring.
//!
//! Copies the public directory into the output tree file for file. A file is
//! only copied when the destination is missing or stale; staleness is decided
//! by [`AssetCompare`]:
//!
//! - **`hash`** (default): SHA-256 of source and destination differ. Survives
//!   `git checkout`, which resets modification times.
//! - **`mtime`**: the source is newer than the destination.
//!
//! Every destination considered, copied or not, is registered in the pass's
//! valid file set. A mirrored directory with no entries is registered as a
//! kept directory so the orphan reconciler leaves it in place.

use rayon::prelude::*;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::AssetCompare;
use crate::context::{BuildContext, BuildEvent, Outcome, Stage};
use crate::fs::{EntryKind, Fs};
use crate::types::{AssetEntry, ComparisonKey};
use crate::writer::fingerprint_file;

/// Finder metadata; never mirrored.
const IGNORED_FILES: &[&str] = &[".DS_Store"];

#[derive(Error, Debug)]
pub enum AssetError {
    #[error("cannot read {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("cannot create {}: {source}", .path.display())]
    CreateDir { path: PathBuf, source: io::Error },
    #[error("cannot copy to {}: {source}", .path.display())]
    Copy { path: PathBuf, source: io::Error },
    #[error("{} is produced more than once in this build", .0.display())]
    Collision(PathBuf),
}

#[derive(Debug)]
pub struct SyncedAsset {
    pub entry: AssetEntry,
    pub outcome: Outcome,
}

#[derive(Debug, Default)]
pub struct AssetReport {
    pub synced: Vec<SyncedAsset>,
    pub failures: Vec<AssetError>,
}

impl AssetReport {
    pub fn count(&self, outcome: Outcome) -> usize {
        self.synced.iter().filter(|s| s.outcome == outcome).count()
    }
}

/// Mirror `src_root` into `dest_root`.
///
/// A missing source root is not an error: there is simply nothing to sync.
pub fn sync(ctx: &BuildContext<'_>, src_root: &Path, dest_root: &Path, compare: AssetCompare) -> AssetReport {
    let mut report = AssetReport::default();
    if !ctx.fs.is_dir(src_root) {
        return report;
    }

    let mut files = Vec::new();
    mirror_dirs(ctx, src_root, dest_root, &mut files, &mut report.failures);

    let results: Vec<Result<SyncedAsset, AssetError>> = files
        .into_par_iter()
        .map(|(source, dest)| {
            let synced = sync_file(ctx, &source, &dest, compare)?;
            let subject = source
                .strip_prefix(src_root)
                .unwrap_or(&source)
                .to_string_lossy()
                .replace('\\', "/");
            ctx.emit(BuildEvent::Produced {
                stage: Stage::Asset,
                subject,
                path: synced.entry.dest.clone(),
                outcome: synced.outcome,
            });
            Ok(synced)
        })
        .collect();

    for result in results {
        match result {
            Ok(synced) => report.synced.push(synced),
            Err(e) => report.failures.push(e),
        }
    }
    report
}

/// Create the destination directory tree and collect file pairs.
fn mirror_dirs(
    ctx: &BuildContext<'_>,
    src: &Path,
    dest: &Path,
    files: &mut Vec<(PathBuf, PathBuf)>,
    failures: &mut Vec<AssetError>,
) {
    let entries = match ctx.fs.read_dir(src) {
        Ok(entries) => entries,
        Err(source) => {
            failures.push(AssetError::Read {
                path: src.to_path_buf(),
                source,
            });
            return;
        }
    };
    if let Err(source) = ctx.fs.create_dir_all(dest) {
        failures.push(AssetError::CreateDir {
            path: dest.to_path_buf(),
            source,
        });
        return;
    }

    let entries: Vec<_> = entries
        .into_iter()
        .filter(|e| e.kind != EntryKind::Symlink && !IGNORED_FILES.contains(&e.name.as_str()))
        .collect();
    if entries.is_empty() {
        ctx.valid.keep_dir(dest);
        return;
    }

    for entry in entries {
        let target = dest.join(&entry.name);
        if entry.is_dir() {
            mirror_dirs(ctx, &entry.path, &target, files, failures);
        } else {
            files.push((entry.path, target));
        }
    }
}

fn comparison_key(fs: &dyn Fs, path: &Path, compare: AssetCompare) -> io::Result<ComparisonKey> {
    Ok(match compare {
        AssetCompare::Hash => ComparisonKey::Fingerprint(fingerprint_file(fs, path)?),
        AssetCompare::Mtime => ComparisonKey::Modified(fs.stat(path)?.modified),
    })
}

/// Whether a destination with `dest_key` must be replaced by a source with `src_key`.
fn is_stale(src_key: &ComparisonKey, dest_key: &ComparisonKey) -> bool {
    match (src_key, dest_key) {
        (ComparisonKey::Fingerprint(a), ComparisonKey::Fingerprint(b)) => a != b,
        (ComparisonKey::Modified(Some(src)), ComparisonKey::Modified(Some(dest))) => src > dest,
        _ => true,
    }
}

fn sync_file(
    ctx: &BuildContext<'_>,
    source: &Path,
    dest: &Path,
    compare: AssetCompare,
) -> Result<SyncedAsset, AssetError> {
    let fs = ctx.fs;
    if !ctx.valid.insert(dest) {
        return Err(AssetError::Collision(dest.to_path_buf()));
    }

    let key = comparison_key(fs, source, compare).map_err(|source_err| AssetError::Read {
        path: source.to_path_buf(),
        source: source_err,
    })?;

    // A destination that cannot be inspected is treated as missing.
    let stale = match comparison_key(fs, dest, compare) {
        Ok(dest_key) => is_stale(&key, &dest_key),
        Err(_) => true,
    };

    if stale {
        fs.copy(source, dest).map_err(|e| AssetError::Copy {
            path: dest.to_path_buf(),
            source: e,
        })?;
    }

    Ok(SyncedAsset {
        entry: AssetEntry {
            source: source.to_path_buf(),
            dest: dest.to_path_buf(),
            key,
        },
        outcome: if stale { Outcome::Written } else { Outcome::Skipped },
    })
}
