//! Data tree: source files → routed JSON documents.
//!
//! Two steps, mirroring page discovery:
//!
//! 1. **Load**: walk the data directory and read one root value per source.
//!    `index.*` takes its directory's route, anything else `base/<stem>`.
//!    Static `.json`/`.toml` documents are parsed; files whose extension has
//!    a configured interpreter are run as provider units (see
//!    [`provider`](crate::provider)).
//! 2. **Expand**: every container value gets one child per element or key,
//!    recursively, so each nested value becomes addressable:
//!
//! ```text
//! api/config.json  {"a": 1, "b": 2}
//!   /api/config    → dist/api/config.json    {"a": 1, "b": 2}
//!   /api/config/a  → dist/api/config/a.json  1
//!   /api/config/b  → dist/api/config/b.json  2
//! ```
//!
//! Array elements are keyed by their id field (a string or number) when
//! present, otherwise by position, so unchanged input always yields the same
//! routes. Keys are percent-encoded into a single segment; keys that cannot
//! name a file (empty, `.`, `..`) are skipped with a warning.
//!
//! ## Collisions
//!
//! Explicit sources are registered before anything derived from them, in
//! walk order. A derived child whose route is already taken, or a second
//! source for one route (`posts.json` next to `posts/index.json`), is dropped
//! and reported as a warning; the first claimant's document stands.
//!
//! The namespace root's own document is `<prefix>/index.json`, so the route
//! `<base>/index` is reserved and anything claiming it is dropped the same
//! way.

use rayon::prelude::*;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::ApiConfig;
use crate::fs::{EntryKind, Fs};
use crate::naming::{
    INDEX_STEM, api_output_path, entry_route, join_route, parent_route, route_segment,
};
use crate::provider::{ProviderError, ProviderRunner};
use crate::scan::DiscoveryError;
use crate::types::{ApiNode, OutputEntry};

/// Why one data source produced no value.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("read failed: {0}")]
    Read(#[from] io::Error),
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("provider failed: {0}")]
    Provider(#[from] ProviderError),
}

/// A data source that failed to load. The rest of the tree still builds.
#[derive(Debug)]
pub struct SourceFailure {
    pub path: PathBuf,
    pub route: String,
    pub error: SourceError,
}

#[derive(Debug, Clone, PartialEq)]
enum SourceKind {
    Json,
    Toml,
    Provider(Vec<String>),
}

#[derive(Debug, Clone)]
struct Source {
    route: String,
    path: PathBuf,
    kind: SourceKind,
}

/// Root values read from the data directory, in walk order.
#[derive(Debug, Default)]
pub struct LoadedData {
    pub roots: Vec<ApiNode>,
    pub failures: Vec<SourceFailure>,
}

/// Every addressable data node, keyed by route.
#[derive(Debug, Default)]
pub struct ApiTree {
    pub nodes: BTreeMap<String, ApiNode>,
    /// Routes of the explicit sources that made it into the tree.
    pub roots: Vec<String>,
    /// Dropped keys and collisions.
    pub warnings: Vec<String>,
}

impl ApiTree {
    pub fn get(&self, route: &str) -> Option<&ApiNode> {
        self.nodes.get(route)
    }

    /// The node one level up, if it is part of the tree.
    pub fn parent_of(&self, route: &str) -> Option<&ApiNode> {
        parent_route(route).and_then(|p| self.nodes.get(p))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Root values as exposed to templates: keyed by route relative to the
    /// data namespace, with the namespace root itself under `index`.
    pub fn template_data(&self, base_route: &str) -> Map<String, Value> {
        let mut data = Map::new();
        for route in &self.roots {
            let Some(node) = self.nodes.get(route) else {
                continue;
            };
            let key = route
                .strip_prefix(base_route)
                .unwrap_or(route)
                .trim_start_matches('/');
            let key = if key.is_empty() { "index" } else { key };
            data.insert(key.to_string(), node.value.clone());
        }
        data
    }
}

/// Loads and expands the data tree.
pub struct ApiTreeBuilder<'a> {
    fs: &'a dyn Fs,
    runner: &'a dyn ProviderRunner,
    config: &'a ApiConfig,
}

impl<'a> ApiTreeBuilder<'a> {
    pub fn new(fs: &'a dyn Fs, runner: &'a dyn ProviderRunner, config: &'a ApiConfig) -> Self {
        Self { fs, runner, config }
    }

    /// Read every data source under `root`.
    ///
    /// A missing root is an empty tree. An unreadable directory is fatal;
    /// a source that fails to parse or run is recorded and skipped.
    pub fn load(&self, root: &Path) -> Result<LoadedData, DiscoveryError> {
        if !self.fs.exists(root) {
            return Ok(LoadedData::default());
        }

        let mut sources = Vec::new();
        self.walk(root, &self.config.base_route(), &mut sources)?;

        // Provider units may be slow; run sources in parallel, keep walk order.
        let results: Vec<(Source, Result<Value, SourceError>)> = sources
            .into_par_iter()
            .map(|source| {
                let value = self.read_source(&source);
                (source, value)
            })
            .collect();

        let mut loaded = LoadedData::default();
        for (source, result) in results {
            match result {
                Ok(value) => loaded.roots.push(ApiNode::new(source.route, value)),
                Err(error) => loaded.failures.push(SourceFailure {
                    path: source.path,
                    route: source.route,
                    error,
                }),
            }
        }
        Ok(loaded)
    }

    /// Load then expand.
    pub fn build(&self, root: &Path) -> Result<(ApiTree, Vec<SourceFailure>), DiscoveryError> {
        let loaded = self.load(root)?;
        let tree = expand(loaded.roots, &self.config.base_route(), &self.config.id_field);
        Ok((tree, loaded.failures))
    }

    fn walk(&self, dir: &Path, base_route: &str, sources: &mut Vec<Source>) -> Result<(), DiscoveryError> {
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
                self.walk(&entry.path, &join_route(base_route, &entry.name), sources)?;
                continue;
            }
            let Some((stem, ext)) = entry.name.rsplit_once('.') else {
                continue;
            };
            if stem.is_empty() {
                continue;
            }
            let kind = match ext {
                "json" => SourceKind::Json,
                "toml" => SourceKind::Toml,
                other => match self.config.providers.get(other) {
                    Some(command) => SourceKind::Provider(command.clone()),
                    None => continue,
                },
            };
            sources.push(Source {
                route: entry_route(base_route, stem),
                path: entry.path,
                kind,
            });
        }
        Ok(())
    }

    fn read_source(&self, source: &Source) -> Result<Value, SourceError> {
        match &source.kind {
            SourceKind::Json => Ok(serde_json::from_slice(&self.fs.read(&source.path)?)?),
            SourceKind::Toml => {
                let text = String::from_utf8_lossy(&self.fs.read(&source.path)?).into_owned();
                let value: toml::Value = toml::from_str(&text)?;
                Ok(toml_to_json(value))
            }
            SourceKind::Provider(command) => Ok(self.runner.produce(&source.path, command)?),
        }
    }
}

/// Convert a TOML value to JSON. Datetimes become their RFC 3339 string.
pub(crate) fn toml_to_json(value: toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::from(i),
        toml::Value::Float(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(items) => Value::Array(items.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect(),
        ),
    }
}

/// Flatten root values into every addressable node.
///
/// `base_route` is the data namespace. Its `index` child is reserved: the
/// namespace root's own document is written to `<prefix>/index.json`.
pub fn expand(roots: Vec<ApiNode>, base_route: &str, id_field: &str) -> ApiTree {
    let mut tree = ApiTree::default();
    let reserved = join_route(base_route, INDEX_STEM);

    // Explicit sources first, so a derived child never shadows a real file.
    let mut accepted = Vec::new();
    for root in roots {
        if root.route == reserved {
            tree.warnings.push(reserved_warning(&reserved, base_route));
            continue;
        }
        if tree.nodes.contains_key(&root.route) {
            tree.warnings
                .push(format!("{} has more than one source; keeping the first", root.route));
            continue;
        }
        tree.roots.push(root.route.clone());
        tree.nodes.insert(root.route.clone(), root.clone());
        accepted.push(root);
    }

    let expansion = Expansion {
        base_route,
        reserved: &reserved,
        id_field,
    };
    for root in &accepted {
        expansion.children(&mut tree, &root.route, &root.value);
    }
    tree
}

fn reserved_warning(reserved: &str, base_route: &str) -> String {
    format!("{reserved} would overwrite the {base_route} document; skipping")
}

struct Expansion<'a> {
    base_route: &'a str,
    reserved: &'a str,
    id_field: &'a str,
}

impl Expansion<'_> {
    fn children(&self, tree: &mut ApiTree, route: &str, value: &Value) {
        let children: Vec<(String, &Value)> = match value {
            Value::Array(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| {
                    let key = element_key(item, self.id_field).unwrap_or_else(|| i.to_string());
                    (key, item)
                })
                .collect(),
            Value::Object(map) => map.iter().map(|(k, v)| (k.clone(), v)).collect(),
            _ => return,
        };

        for (key, child) in children {
            let Some(segment) = route_segment(&key) else {
                tree.warnings
                    .push(format!("{route}: key {key:?} cannot be used as a route segment"));
                continue;
            };
            let child_route = join_route(route, &segment);
            if child_route == self.reserved {
                tree.warnings
                    .push(reserved_warning(self.reserved, self.base_route));
                continue;
            }
            if tree.nodes.contains_key(&child_route) {
                tree.warnings
                    .push(format!("{child_route} is already defined; dropping duplicate"));
                continue;
            }
            tree.nodes
                .insert(child_route.clone(), ApiNode::new(child_route.clone(), child.clone()));
            self.children(tree, &child_route, child);
        }
    }
}

/// An array element's identifier: its id field, when that is a string or number.
fn element_key(item: &Value, id_field: &str) -> Option<String> {
    match item.as_object()?.get(id_field)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Where a node's document goes, relative to the output root.
pub fn output_entry(node: &ApiNode, prefix: &str) -> Option<OutputEntry> {
    api_output_path(&node.route, prefix).map(|path| OutputEntry {
        path,
        is_parent: node.is_container(),
    })
}

/// A node's serialized document: pretty JSON, two-space indent.
pub fn document(node: &ApiNode) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&node.value)
}
