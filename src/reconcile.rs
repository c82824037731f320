//! Orphan reconciliation.
//!
//! Runs after every writer has finished. Anything in the output tree that
//! this pass did not produce or confirm is stale: a page whose template was
//! deleted, a data document whose key disappeared, an asset removed from
//! the public directory.
//!
//! The walk is bottom-up. Files not in the valid set are deleted; each
//! directory is cleaned first and then removed if it ended up empty, unless
//! the asset syncer registered it as a kept (intentionally empty) directory.
//! The output root itself is never removed, and top-level names listed in
//! `output.keep` (`.git` by default) are never visited.
//!
//! Deletion failures are collected, never fatal: a file that cannot be
//! removed this pass is simply tried again next pass.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::context::{BuildContext, BuildEvent};
use crate::fs::EntryKind;

#[derive(Error, Debug)]
pub enum CleanupError {
    #[error("cannot list {}: {source}", .path.display())]
    List { path: PathBuf, source: io::Error },
    #[error("cannot remove {}: {source}", .path.display())]
    Remove { path: PathBuf, source: io::Error },
}

#[derive(Debug, Default)]
pub struct CleanupReport {
    pub removed_files: Vec<PathBuf>,
    pub removed_dirs: Vec<PathBuf>,
    pub errors: Vec<CleanupError>,
}

impl CleanupReport {
    pub fn deleted(&self) -> usize {
        self.removed_files.len() + self.removed_dirs.len()
    }
}

/// Delete everything under `output_root` the pass did not register.
pub fn reconcile(ctx: &BuildContext<'_>, output_root: &Path, keep: &[String]) -> CleanupReport {
    let mut report = CleanupReport::default();
    if !ctx.fs.is_dir(output_root) {
        return report;
    }
    let reconciler = Reconciler { ctx, keep };
    reconciler.clean_dir(output_root, true, &mut report);
    report
}

struct Reconciler<'a, 'b> {
    ctx: &'a BuildContext<'b>,
    keep: &'a [String],
}

impl Reconciler<'_, '_> {
    fn clean_dir(&self, dir: &Path, is_root: bool, report: &mut CleanupReport) {
        let entries = match self.ctx.fs.read_dir(dir) {
            Ok(entries) => entries,
            Err(source) => {
                report.errors.push(CleanupError::List {
                    path: dir.to_path_buf(),
                    source,
                });
                return;
            }
        };

        for entry in entries {
            if is_root && self.keep.iter().any(|k| *k == entry.name) {
                continue;
            }
            if entry.is_dir() {
                self.clean_dir(&entry.path, false, report);
                self.remove_if_empty(&entry.path, report);
            } else if !self.ctx.valid.contains(&entry.path) {
                // Files and directory links alike: only the entry itself goes.
                match self.ctx.fs.remove_file(&entry.path) {
                    Ok(()) => {
                        self.ctx.emit(BuildEvent::Removed {
                            path: entry.path.clone(),
                            kind: entry.kind,
                        });
                        report.removed_files.push(entry.path);
                    }
                    Err(source) => report.errors.push(CleanupError::Remove {
                        path: entry.path,
                        source,
                    }),
                }
            }
        }
    }

    fn remove_if_empty(&self, dir: &Path, report: &mut CleanupReport) {
        if self.ctx.valid.is_kept_dir(dir) {
            return;
        }
        // Still populated, or unlistable (already reported by clean_dir).
        match self.ctx.fs.read_dir(dir) {
            Ok(entries) if entries.is_empty() => {}
            _ => return,
        }
        match self.ctx.fs.remove_dir(dir) {
            Ok(()) => {
                self.ctx.emit(BuildEvent::Removed {
                    path: dir.to_path_buf(),
                    kind: EntryKind::Dir,
                });
                report.removed_dirs.push(dir.to_path_buf());
            }
            Err(source) => report.errors.push(CleanupError::Remove {
                path: dir.to_path_buf(),
                source,
            }),
        }
    }
}
