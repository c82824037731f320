//! Shared test utilities for the sitegen test suite.
//!
//! Provides site fixtures (in memory and on disk), scripted stand-ins for
//! the renderer and provider runner, and lookups that panic with a useful
//! message on miss.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let fs = memory_site();
//! let config = SiteConfig::default();
//! let paths = site_paths(&config);
//! let renderer = MockRenderer::new().failing("pages/about.html");
//! let runner = ScriptedRunner::new().with("/site/api/posts.js", "[]");
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tempfile::TempDir;

use crate::config::{SitePaths, SiteConfig};
use crate::fs::MemoryFs;
use crate::provider::{ProviderError, ProviderRunner};
use crate::render::{RenderContext, RenderError, Renderer};
use crate::types::PageRoute;

// =========================================================================
// Fixture setup
// =========================================================================

/// Root every in-memory fixture is mounted at.
pub const SITE_ROOT: &str = "/site";

/// A small site held in memory:
///
/// ```text
/// /site/views/pages/index.html        → /
/// /site/views/pages/about.html        → /about
/// /site/views/pages/blog/index.html   → /blog
/// /site/views/partials/header.html
/// /site/api/config.json               {"a": 1, "b": 2}
/// /site/public/css/site.css
/// ```
pub fn memory_site() -> MemoryFs {
    let fs = MemoryFs::new();
    fs.insert_file(
        "/site/views/pages/index.html",
        "{% include \"partials/header.html\" %}<main>Home</main>",
    );
    fs.insert_file("/site/views/pages/about.html", "About");
    fs.insert_file("/site/views/pages/blog/index.html", "Blog");
    fs.insert_file("/site/views/partials/header.html", "<header>Fixture</header>");
    fs.insert_file("/site/api/config.json", r#"{"a": 1, "b": 2}"#);
    fs.insert_file("/site/public/css/site.css", "body { margin: 0 }");
    fs
}

/// Resolve `config`'s directories against [`SITE_ROOT`].
pub fn site_paths(config: &SiteConfig) -> SitePaths {
    config.paths(Path::new(SITE_ROOT), None)
}

fn fixtures_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/site")
}

/// Copy `fixtures/site/` to a temp directory and return it.
///
/// Tests get an isolated copy they can mutate without affecting other tests
/// or the source fixtures.
pub fn setup_fixtures() -> TempDir {
    let tmp = TempDir::new().unwrap();
    copy_dir_recursive(&fixtures_dir(), tmp.path()).unwrap();
    tmp
}

/// Load `fixtures/site/` into memory under [`SITE_ROOT`].
pub fn fixture_fs() -> MemoryFs {
    MemoryFs::snapshot(&fixtures_dir(), Path::new(SITE_ROOT)).unwrap()
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    for entry in walkdir::WalkDir::new(src).min_depth(1) {
        let entry = entry?;
        let target = dst.join(entry.path().strip_prefix(src).unwrap());
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target)?;
        } else {
            std::fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

// =========================================================================
// Collaborator stand-ins
// =========================================================================

/// One call seen by [`MockRenderer`].
#[derive(Debug, Clone)]
pub struct RenderCall {
    pub template: String,
    pub route: String,
    pub api_keys: Vec<String>,
}

/// Renders `template` and `route` into a fixed string and records each call.
/// Templates registered with [`failing`](Self::failing) return an error.
#[derive(Debug, Default)]
pub struct MockRenderer {
    failing: BTreeSet<String>,
    calls: Mutex<Vec<RenderCall>>,
}

impl MockRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(mut self, template: &str) -> Self {
        self.failing.insert(template.to_string());
        self
    }

    pub fn calls(&self) -> Vec<RenderCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Every `api` key any render call could see.
    pub fn api_keys_seen(&self) -> Vec<String> {
        let keys: BTreeSet<String> = self
            .calls()
            .into_iter()
            .flat_map(|c| c.api_keys)
            .collect();
        keys.into_iter().collect()
    }
}

impl Renderer for MockRenderer {
    fn render(&self, template: &str, context: &RenderContext<'_>) -> Result<String, RenderError> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RenderCall {
                template: template.to_string(),
                route: context.route.to_string(),
                api_keys: context.api.keys().cloned().collect(),
            });
        if self.failing.contains(template) {
            return Err(RenderError::Template {
                template: template.to_string(),
                message: "scripted failure".to_string(),
            });
        }
        Ok(format!("<!-- {template} -->\n<p>{}</p>\n", context.route))
    }
}

/// Returns canned stdout per unit path. Units without a script fail.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    outputs: BTreeMap<PathBuf, String>,
    calls: Mutex<Vec<PathBuf>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, unit: impl Into<PathBuf>, stdout: &str) -> Self {
        self.outputs.insert(unit.into(), stdout.to_string());
        self
    }

    /// Units run so far, in call order.
    pub fn calls(&self) -> Vec<PathBuf> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ProviderRunner for ScriptedRunner {
    fn run(&self, unit: &Path, _command: &[String]) -> Result<Vec<u8>, ProviderError> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(unit.to_path_buf());
        match self.outputs.get(unit) {
            Some(stdout) => Ok(stdout.clone().into_bytes()),
            None => Err(ProviderError::Failed {
                status: "exit status: 1".to_string(),
                stderr: format!("no script for {}", unit.display()),
            }),
        }
    }
}

// =========================================================================
// Lookups: panic with a clear message on miss
// =========================================================================

/// Find a page by route. Panics if not found.
pub fn find_page<'a>(pages: &'a [PageRoute], route: &str) -> &'a PageRoute {
    pages.iter().find(|p| p.route == route).unwrap_or_else(|| {
        let routes: Vec<&str> = pages.iter().map(|p| p.route.as_str()).collect();
        panic!("page '{route}' not found. Available: {routes:?}")
    })
}

/// Every file under `root`, relative and `/`-separated, sorted.
pub fn relative_files(fs: &MemoryFs, root: &str) -> Vec<String> {
    let root = Path::new(root);
    fs.files()
        .iter()
        .filter_map(|p| p.strip_prefix(root).ok())
        .map(|p| p.to_string_lossy().replace('\\', "/"))
        .collect()
}
