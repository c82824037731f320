//! # Sitegen
//!
//! An incremental static site builder. Page templates become HTML pages,
//! data files become a browsable tree of JSON documents, and a public
//! directory is mirrored into the output. Every pass leaves the output
//! directory holding exactly what the current sources produce, and rewrites
//! only the files whose bytes actually changed.
//!
//! # Architecture: One Pass, Three Writers, One Sweep
//!
//! ```text
//! 1. Discover   views/pages/ → page routes     api/ → data tree
//! 2. Write      pages ┐
//!               data  ├─ in parallel, each through the content writer
//!               assets┘
//! 3. Reconcile  delete whatever in dist/ the pass did not register
//! ```
//!
//! Every writer registers each path it produces (or confirms) in a shared
//! valid-file set. Reconciliation runs only after all writers finish and
//! treats anything outside that set as an orphan. This is what makes a
//! pass idempotent: running it twice with no source change writes nothing
//! and deletes nothing.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`scan`] | Route discovery: template files under the pages directory become routes |
//! | [`api`] | Data loading and expansion into a route-addressable tree of documents |
//! | [`provider`] | Executable data units: run a command, parse its stdout as JSON |
//! | [`render`] | Template rendering with Tera, behind the [`render::Renderer`] seam |
//! | [`assets`] | Mirror of the public directory with hash or mtime comparison |
//! | [`writer`] | Content writer: fingerprint compare, write only on change, register path |
//! | [`reconcile`] | Orphan sweep: bottom-up removal of unregistered files and empty dirs |
//! | [`generate`] | The build pass: ties discovery, writers and reconciliation together |
//! | [`context`] | Per-pass shared state: filesystem, valid-file set, progress events |
//! | [`config`] | `sitegen.toml` loading, stock defaults, merging and validation |
//! | [`fs`] | Filesystem seam: real disk and an in-memory tree for tests |
//! | [`naming`] | Route normalization and route → output path mapping |
//! | [`types`] | Shared value types: page routes, data nodes, asset entries |
//! | [`output`] | CLI output formatting for progress, summaries and route tables |
//!
//! # Design Decisions
//!
//! ## Fingerprint Before Write
//!
//! The content writer hashes the candidate bytes and the existing file with
//! SHA-256 and skips the write on a match. File watchers, rsync and CDN
//! uploads downstream of `dist/` only ever see files that really changed.
//!
//! ## Registration Is the Source of Truth
//!
//! Nothing is deleted because a source disappeared; things are deleted
//! because no writer claimed them this pass. A page whose template fails to
//! render still claims its path, so the last good version stays online
//! until the template is fixed.
//!
//! ## Data Documents Sit Beside Their Directories
//!
//! `/api/posts` is written to `api/posts.json` and its children to
//! `api/posts/1.json`, so a document and the directory of its children can
//! coexist. The namespace root itself goes to `api/index.json`.
//!
//! ## Seams for Testing
//!
//! The filesystem ([`fs::Fs`]), template engine ([`render::Renderer`]) and
//! provider execution ([`provider::ProviderRunner`]) are traits. Pipeline
//! tests run whole passes against [`fs::MemoryFs`] with scripted stand-ins
//! and never touch the disk or spawn a process.

pub mod api;
pub mod assets;
pub mod config;
pub mod context;
pub mod fs;
pub mod generate;
pub mod naming;
pub mod output;
pub mod provider;
pub mod reconcile;
pub mod render;
pub mod scan;
pub mod types;
pub mod writer;

#[cfg(test)]
pub(crate) mod test_helpers;
