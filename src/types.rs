//! Shared types passed between pipeline stages.
//!
//! Routes are plain `/`-delimited strings. Parent/child relations between
//! [`ApiNode`]s are never stored; they are recomputed from the route string
//! with [`parent_route`](crate::naming::parent_route).

use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;
use std::time::SystemTime;

/// A page discovered in the template tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageRoute {
    /// Normalized URL path, always starting with `/`.
    pub route: String,
    /// Template identifier handed to the renderer (path relative to the
    /// views root, `/`-separated, extension kept).
    pub template: String,
}

/// One addressable data document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiNode {
    pub route: String,
    pub value: Value,
}

impl ApiNode {
    pub fn new(route: impl Into<String>, value: Value) -> Self {
        Self {
            route: route.into(),
            value,
        }
    }

    /// Objects and arrays are containers: their children are addressable
    /// at sub-routes.
    pub fn is_container(&self) -> bool {
        matches!(self.value, Value::Object(_) | Value::Array(_))
    }
}

/// A file the pipeline wrote or confirmed during one pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputEntry {
    pub path: PathBuf,
    /// True when the entry is a container's summary document.
    pub is_parent: bool,
}

/// How the asset syncer decides whether a destination is stale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComparisonKey {
    Modified(Option<SystemTime>),
    Fingerprint(String),
}

/// A source/destination pair visited by the asset syncer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetEntry {
    pub source: PathBuf,
    pub dest: PathBuf,
    pub key: ComparisonKey,
}
