//! Project configuration.
//!
//! Handles loading, validating, and merging `sitegen.toml`. Stock defaults
//! are the base layer; the user file overrides any subset of keys.
//!
//! ## Config File Location
//!
//! ```text
//! project/
//! ├── sitegen.toml        # Optional. Every key has a default.
//! ├── views/
//! │   ├── pages/          # Page templates → routes
//! │   └── partials/       # Shared includes (never routed)
//! ├── api/                # Data documents and provider units
//! └── public/             # Static assets, mirrored verbatim
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! views_dir = "views"
//! pages_dir = "views/pages"
//! api_dir = "api"
//! public_dir = "public"
//! output_dir = "dist"
//!
//! [pages]
//! extension = "html"
//! exclude = ["partials"]
//!
//! [api]
//! prefix = "api"
//! id_field = "id"
//!
//! [api.providers]       # unit must print one JSON document on stdout,
//! js = ["node"]         # e.g. console.log(JSON.stringify(data))
//! py = ["python3"]
//! sh = ["sh"]
//!
//! [assets]
//! subpath = ""
//! compare = "hash"      # or "mtime"
//!
//! [output]
//! keep = [".git"]
//!
//! [processing]
//! max_processes = 4     # omit for auto = CPU cores
//!
//! [site]
//! title = "Anything here is passed to templates as `site`"
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Name of the project config file.
pub const CONFIG_FILENAME: &str = "sitegen.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Project configuration loaded from `sitegen.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Root of every template the renderer may load, pages and partials alike.
    pub views_dir: String,
    /// Page templates. Usually inside `views_dir`.
    pub pages_dir: String,
    /// Data documents and provider units.
    pub api_dir: String,
    /// Static assets.
    pub public_dir: String,
    /// Build output.
    pub output_dir: String,
    pub pages: PagesConfig,
    pub api: ApiConfig,
    pub assets: AssetsConfig,
    pub output: OutputConfig,
    pub processing: ProcessingConfig,
    /// Free-form values exposed to templates as `site`.
    pub site: toml::Table,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            views_dir: "views".to_string(),
            pages_dir: "views/pages".to_string(),
            api_dir: "api".to_string(),
            public_dir: "public".to_string(),
            output_dir: "dist".to_string(),
            pages: PagesConfig::default(),
            api: ApiConfig::default(),
            assets: AssetsConfig::default(),
            output: OutputConfig::default(),
            processing: ProcessingConfig::default(),
            site: toml::Table::new(),
        }
    }
}

impl SiteConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ext = &self.pages.extension;
        if ext.is_empty() || ext.starts_with('.') {
            return Err(ConfigError::Validation(
                "pages.extension must be non-empty and given without a dot".into(),
            ));
        }
        if self.api.prefix.split('/').any(|s| s == "." || s == "..") {
            return Err(ConfigError::Validation(
                "api.prefix must not contain '.' or '..' segments".into(),
            ));
        }
        if self.api.prefix.trim_matches('/').is_empty() {
            return Err(ConfigError::Validation(
                "api.prefix must not be empty".into(),
            ));
        }
        if self.api.id_field.is_empty() {
            return Err(ConfigError::Validation(
                "api.id_field must not be empty".into(),
            ));
        }
        if let Some((ext, _)) = self.api.providers.iter().find(|(_, cmd)| cmd.is_empty()) {
            return Err(ConfigError::Validation(format!(
                "api.providers.{ext} must name a command"
            )));
        }
        let subpath = Path::new(&self.assets.subpath);
        if subpath.is_absolute()
            || subpath
                .components()
                .any(|c| matches!(c, Component::ParentDir))
        {
            return Err(ConfigError::Validation(
                "assets.subpath must be relative and stay inside the output directory".into(),
            ));
        }
        if self.output_dir.trim().is_empty() {
            return Err(ConfigError::Validation(
                "output_dir must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Resolve every configured directory against the project root.
    ///
    /// `output_override` (from the CLI) replaces `output_dir`.
    pub fn paths(&self, root: &Path, output_override: Option<&Path>) -> SitePaths {
        SitePaths {
            root: root.to_path_buf(),
            views: root.join(&self.views_dir),
            pages: root.join(&self.pages_dir),
            api: root.join(&self.api_dir),
            public: root.join(&self.public_dir),
            output: output_override
                .map(Path::to_path_buf)
                .unwrap_or_else(|| root.join(&self.output_dir)),
        }
    }
}

/// Concrete source and output directories for one build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SitePaths {
    pub root: PathBuf,
    pub views: PathBuf,
    pub pages: PathBuf,
    pub api: PathBuf,
    pub public: PathBuf,
    pub output: PathBuf,
}

impl SitePaths {
    /// The first source location the output directory overlaps, if any.
    ///
    /// The output may sit inside the project root but must not be the root,
    /// contain it, or share any part of a source directory: everything in
    /// it that a pass does not produce gets deleted.
    pub fn output_overlap(&self) -> Option<(&'static str, &Path)> {
        let output = lexical(&self.output);
        if lexical(&self.root).starts_with(&output) {
            return Some(("project root", &self.root));
        }
        [
            ("views", &self.views),
            ("pages", &self.pages),
            ("api", &self.api),
            ("public", &self.public),
        ]
        .into_iter()
        .find(|(_, dir)| {
            let dir = lexical(dir);
            dir.starts_with(&output) || output.starts_with(&dir)
        })
        .map(|(name, dir)| (name, dir.as_path()))
    }
}

/// Absolute form of `path` with `.` and `..` folded away, without touching
/// the filesystem.
fn lexical(path: &Path) -> PathBuf {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let mut folded = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                folded.pop();
            }
            other => folded.push(other),
        }
    }
    folded
}

/// Page discovery settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PagesConfig {
    /// Template file extension, without the dot.
    pub extension: String,
    /// Directory names never descended into (shared partials, layouts).
    pub exclude: Vec<String>,
}

impl Default for PagesConfig {
    fn default() -> Self {
        Self {
            extension: "html".to_string(),
            exclude: vec!["partials".to_string()],
        }
    }
}

/// Data tree settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ApiConfig {
    /// Route namespace and output subdirectory for data documents.
    pub prefix: String,
    /// Array elements carrying this field are keyed by it instead of index.
    pub id_field: String,
    /// File extension → interpreter command for provider units.
    ///
    /// The unit's stdout must be exactly one JSON document. A node unit
    /// ends with `console.log(JSON.stringify(data))`; stray `console.log`
    /// calls belong on stderr (`console.error`).
    pub providers: BTreeMap<String, Vec<String>>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        let providers = [("js", "node"), ("py", "python3"), ("sh", "sh")]
            .into_iter()
            .map(|(ext, cmd)| (ext.to_string(), vec![cmd.to_string()]))
            .collect();
        Self {
            prefix: "api".to_string(),
            id_field: "id".to_string(),
            providers,
        }
    }
}

impl ApiConfig {
    /// The prefix as a route (`api` → `/api`).
    pub fn base_route(&self) -> String {
        crate::naming::normalize_route(&self.prefix)
    }

    /// Prefix without surrounding slashes, as used in output paths.
    pub fn prefix_path(&self) -> &str {
        self.prefix.trim_matches('/')
    }
}

/// How the asset syncer detects stale copies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetCompare {
    /// SHA-256 of source and destination. Survives `git checkout`.
    #[default]
    Hash,
    /// Copy when the source is newer than the destination.
    Mtime,
}

/// Static asset settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AssetsConfig {
    /// Subdirectory of the output root that receives assets. Empty = root.
    pub subpath: String,
    pub compare: AssetCompare,
}

/// Output tree settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// Top-level names in the output directory the reconciler never touches.
    pub keep: Vec<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            keep: vec![".git".to_string()],
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

impl ProcessingConfig {
    /// Workers for the render and sync pools.
    ///
    /// `max_processes` may only lower the count below the machine's cores;
    /// zero is read as one.
    pub fn worker_count(&self) -> usize {
        let cores = std::thread::available_parallelism().map_or(1, |n| n.get());
        match self.max_processes {
            Some(requested) => requested.clamp(1, cores),
            None => cores,
        }
    }
}

// =============================================================================
// Loading: stock defaults, then sitegen.toml on top
// =============================================================================

/// Lay `user` over `stock`.
///
/// A table in `user` only replaces the keys it names, so `[api.providers]`
/// with one entry adds an interpreter without dropping the stock ones.
/// Anything else in `user` (arrays included) replaces the stock value whole:
/// `keep = []` really empties the keep list.
pub fn layer(stock: toml::Value, user: toml::Value) -> toml::Value {
    let (mut merged, user) = match (stock, user) {
        (toml::Value::Table(stock), toml::Value::Table(user)) => (stock, user),
        (_, user) => return user,
    };
    for (key, value) in user {
        let value = match merged.remove(&key) {
            Some(stock) => layer(stock, value),
            None => value,
        };
        merged.insert(key, value);
    }
    toml::Value::Table(merged)
}

/// The project's `sitegen.toml` as untyped TOML, if the project has one.
fn read_project_file(root: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let path = root.join(CONFIG_FILENAME);
    if !path.exists() {
        return Ok(None);
    }
    Ok(Some(toml::from_str(&fs::read_to_string(&path)?)?))
}

/// Type-check a layered value and run [`SiteConfig::validate`] on it.
fn settle(layered: toml::Value) -> Result<SiteConfig, ConfigError> {
    let config: SiteConfig = layered.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Config for the project at `root`.
///
/// Without a `sitegen.toml` this is [`SiteConfig::default`]. With one, its
/// keys are layered over the defaults (see [`layer`]); unknown keys and
/// invalid values are errors.
pub fn load_config(root: &Path) -> Result<SiteConfig, ConfigError> {
    let stock = toml::Value::try_from(SiteConfig::default())?;
    match read_project_file(root)? {
        Some(user) => settle(layer(stock, user)),
        None => settle(stock),
    }
}

/// Returns a fully-commented stock `sitegen.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# sitegen configuration
# =====================
# All settings are optional. Values shown below are the defaults.
# Unknown keys will cause an error.

# Root of every template the renderer may load (pages and partials).
views_dir = "views"

# Page templates. Each file becomes one route:
#   views/pages/index.html       -> /
#   views/pages/about.html       -> /about
#   views/pages/blog/index.html  -> /blog
pages_dir = "views/pages"

# Data documents (.json, .toml) and provider units (see [api.providers]).
api_dir = "api"

# Static assets, mirrored into the output tree.
public_dir = "public"

# Build output. Anything in here that the build did not produce is deleted.
output_dir = "dist"

# ---------------------------------------------------------------------------
# Pages
# ---------------------------------------------------------------------------
[pages]
# Template file extension (without the dot).
extension = "html"

# Directory names that are never turned into routes.
exclude = ["partials"]

# ---------------------------------------------------------------------------
# Data API
# ---------------------------------------------------------------------------
[api]
# Route namespace and output subdirectory: /api/posts -> dist/api/posts.json
prefix = "api"

# Array elements with this field are routed by it instead of by position.
id_field = "id"

# Provider units: files in api_dir with these extensions are run as
#   <command...> <path to unit>
# from the unit's own directory. A unit must exit 0 and print exactly one
# JSON document on stdout, nothing else:
#   js:  console.log(JSON.stringify(data))
#   py:  print(json.dumps(data))
#   sh:  echo '{"items": []}'
# Logging goes to stderr, which is shown only when the unit fails.
[api.providers]
js = ["node"]
py = ["python3"]
sh = ["sh"]

# ---------------------------------------------------------------------------
# Assets
# ---------------------------------------------------------------------------
[assets]
# Subdirectory of the output that receives assets ("" = output root).
subpath = ""

# "hash" compares file contents; "mtime" copies when the source is newer.
compare = "hash"

# ---------------------------------------------------------------------------
# Output
# ---------------------------------------------------------------------------
[output]
# Top-level entries in the output directory that are never cleaned up.
keep = [".git"]

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4

# ---------------------------------------------------------------------------
# Site values
# ---------------------------------------------------------------------------
# Everything in [site] is available to templates as `site`.
[site]
"##
}
