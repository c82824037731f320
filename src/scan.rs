//! Page discovery: template tree → route table.
//!
//! Walks the pages directory and turns each template file into a
//! [`PageRoute`]. The directory structure *is* the URL structure:
//!
//! ```text
//! views/
//! ├── pages/
//! │   ├── index.html          → /
//! │   ├── about.html          → /about
//! │   ├── blog/
//! │   │   ├── index.html      → /blog
//! │   │   └── first-post.html → /blog/first-post
//! │   └── partials/           (excluded, never routed)
//! └── partials/
//!     └── header.html         (included by pages, never routed)
//! ```
//!
//! ## Rules
//!
//! - Only files with the configured template extension are routes.
//! - Directories whose name is in the exclusion list are skipped along with
//!   everything below them.
//! - Hidden entries (`.name`) are ignored.
//! - `index.<ext>` takes its directory's route.
//! - Two templates may not resolve to the same route; `about.html` next to
//!   `about/index.html` is a [`DiscoveryError::DuplicateRoute`].

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::fs::{EntryKind, Fs};
use crate::naming::{entry_route, join_route};
use crate::types::PageRoute;

#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("cannot read {}: {source}", .path.display())]
    Unreadable { path: PathBuf, source: io::Error },
    #[error("route {route} is produced by both {first} and {second}")]
    DuplicateRoute {
        route: String,
        first: String,
        second: String,
    },
}

/// Walks a template tree and produces its routes.
pub struct RouteDiscoverer<'a> {
    fs: &'a dyn Fs,
    extension: &'a str,
    exclude: &'a [String],
    /// Template identifiers are relative to this directory.
    views_root: &'a Path,
}

impl<'a> RouteDiscoverer<'a> {
    pub fn new(fs: &'a dyn Fs, extension: &'a str, exclude: &'a [String], views_root: &'a Path) -> Self {
        Self {
            fs,
            extension,
            exclude,
            views_root,
        }
    }

    /// Discover every page under `root`, sorted by route.
    pub fn discover(&self, root: &Path) -> Result<Vec<PageRoute>, DiscoveryError> {
        let mut found = Vec::new();
        self.walk(root, root, "/", &mut found)?;

        let mut by_route: BTreeMap<String, PageRoute> = BTreeMap::new();
        for page in found {
            if let Some(existing) = by_route.get(&page.route) {
                return Err(DiscoveryError::DuplicateRoute {
                    route: page.route,
                    first: existing.template.clone(),
                    second: page.template,
                });
            }
            by_route.insert(page.route.clone(), page);
        }
        Ok(by_route.into_values().collect())
    }

    fn walk(
        &self,
        root: &Path,
        dir: &Path,
        base_route: &str,
        found: &mut Vec<PageRoute>,
    ) -> Result<(), DiscoveryError> {
        let entries = self
            .fs
            .read_dir(dir)
            .map_err(|source| DiscoveryError::Unreadable {
                path: dir.to_path_buf(),
                source,
            })?;

        for entry in entries {
            if entry.name.starts_with('.') || entry.kind == EntryKind::Symlink {
                continue;
            }
            if entry.is_dir() {
                if self.exclude.iter().any(|x| *x == entry.name) {
                    continue;
                }
                let route = join_route(base_route, &entry.name);
                self.walk(root, &entry.path, &route, found)?;
            } else if let Some(stem) = template_stem(&entry.name, self.extension) {
                found.push(PageRoute {
                    route: entry_route(base_route, stem),
                    template: self.template_ref(root, &entry.path),
                });
            }
        }
        Ok(())
    }

    /// Identifier the renderer knows this template by.
    fn template_ref(&self, pages_root: &Path, path: &Path) -> String {
        let relative = path
            .strip_prefix(self.views_root)
            .or_else(|_| path.strip_prefix(pages_root))
            .unwrap_or(path);
        relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// File name without the template extension, if it has it.
fn template_stem<'n>(name: &'n str, extension: &str) -> Option<&'n str> {
    let stem = name.strip_suffix(extension)?.strip_suffix('.')?;
    (!stem.is_empty()).then_some(stem)
}
