//! Per-pass build state.
//!
//! A [`BuildContext`] is created at the start of a build pass and dropped at
//! the end. It owns the pass's [`ValidFileSet`] and the optional progress
//! channel, and borrows the filesystem. Every stage receives it by reference;
//! nothing about a pass lives in globals, so two passes (or two sites) never
//! see each other's state.

use std::path::PathBuf;
use std::sync::mpsc::Sender;

use crate::fs::{EntryKind, Fs};
use crate::writer::{ContentWriter, ValidFileSet};

/// Which stage produced an output entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Page,
    Api,
    Asset,
}

/// What happened to one output entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Written or copied: the bytes on disk changed.
    Written,
    /// Content writer found identical bytes already in place.
    Unchanged,
    /// Asset copy skipped because the destination is current.
    Skipped,
}

/// Progress notification sent while a pass runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildEvent {
    Produced {
        stage: Stage,
        /// Route for pages and data documents, source-relative path for assets.
        subject: String,
        path: PathBuf,
        outcome: Outcome,
    },
    Removed {
        path: PathBuf,
        kind: EntryKind,
    },
}

pub struct BuildContext<'a> {
    pub fs: &'a dyn Fs,
    pub valid: ValidFileSet,
    events: Option<Sender<BuildEvent>>,
}

impl<'a> BuildContext<'a> {
    pub fn new(fs: &'a dyn Fs, events: Option<Sender<BuildEvent>>) -> Self {
        Self {
            fs,
            valid: ValidFileSet::new(),
            events,
        }
    }

    pub fn writer(&self) -> ContentWriter<'_> {
        ContentWriter::new(self.fs, &self.valid)
    }

    /// Send a progress event. A closed receiver is ignored: progress output
    /// is optional and must never fail a build.
    pub fn emit(&self, event: BuildEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }
}
