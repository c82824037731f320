//! CLI output formatting for build passes.
//!
//! # Output Format
//!
//! ## Progress (one line per changed entry)
//!
//! ```text
//! page   /about → about/index.html
//! api    /api/posts → api/posts.json
//! asset  css/site.css → css/site.css
//! remove blog/index.html
//! remove blog/
//! remove media@            (a directory link, removed without following it)
//! ```
//!
//! Entries found up to date are only shown with `--verbose`:
//!
//! ```text
//! page   /blog (unchanged)
//! asset  robots.txt (skipped)
//! ```
//!
//! ## Summary
//!
//! ```text
//! Built 3 pages, 13 data documents, 2 assets in 0.04s
//!     written 1, unchanged 15, skipped 2, deleted 2
//! Warnings
//!     /api/posts/1 is already defined; dropping duplicate
//! Errors
//!     render /about: template pages/about.html: Variable `x` not found
//! ```
//!
//! ## Route tables (`check`)
//!
//! ```text
//! Pages
//!     / ← pages/index.html
//!     /about ← pages/about.html
//!
//! Data
//!     /api/config (2 keys)
//!         /api/config/a
//!         /api/config/b
//! ```
//!
//! # Architecture
//!
//! Each `format_*` function returns `Vec<String>` for testability and has a
//! `print_*` wrapper that writes to stdout. Format functions are pure: no
//! I/O, no side effects.

use serde_json::Value;
use std::path::Path;

use crate::context::{BuildEvent, Outcome, Stage};
use crate::fs::EntryKind;
use crate::generate::{BuildSummary, Failure, RouteTables};

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// `1 page`, `2 pages`.
fn plural(n: usize, singular: &str, plural: &str) -> String {
    if n == 1 {
        format!("{n} {singular}")
    } else {
        format!("{n} {plural}")
    }
}

/// Display a path relative to the output root, `/`-separated.
fn relative(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

fn stage_label(stage: Stage) -> &'static str {
    match stage {
        Stage::Page => "page",
        Stage::Api => "api",
        Stage::Asset => "asset",
    }
}

// ============================================================================
// Progress events
// ============================================================================

/// Format one progress event. Up-to-date entries are hidden unless `verbose`.
pub fn format_event(event: &BuildEvent, output_root: &Path, verbose: bool) -> Vec<String> {
    match event {
        BuildEvent::Produced {
            stage,
            subject,
            path,
            outcome,
        } => {
            let label = stage_label(*stage);
            match outcome {
                Outcome::Written => vec![format!(
                    "{label:<6} {subject} → {}",
                    relative(path, output_root)
                )],
                Outcome::Unchanged if verbose => vec![format!("{label:<6} {subject} (unchanged)")],
                Outcome::Skipped if verbose => vec![format!("{label:<6} {subject} (skipped)")],
                _ => Vec::new(),
            }
        }
        BuildEvent::Removed { path, kind } => {
            let shown = relative(path, output_root);
            match kind {
                EntryKind::File => vec![format!("remove {shown}")],
                EntryKind::Dir => vec![format!("remove {shown}/")],
                EntryKind::Symlink => vec![format!("remove {shown}@")],
            }
        }
    }
}

// ============================================================================
// Summary
// ============================================================================

/// One-line description of a per-item failure.
pub fn format_failure(failure: &Failure) -> String {
    match failure {
        Failure::Render { route, error } => format!("render {route}: {error}"),
        Failure::Write { subject, error } => format!("write {subject}: {error}"),
        Failure::Serialize { route, error } => format!("serialize {route}: {error}"),
        Failure::Source(f) => format!("data {} ({}): {}", f.route, f.path.display(), f.error),
        Failure::Asset(error) => format!("asset: {error}"),
        Failure::Cleanup(error) => format!("cleanup: {error}"),
    }
}

pub fn format_summary(summary: &BuildSummary) -> Vec<String> {
    let mut lines = vec![
        format!(
            "Built {}, {}, {} in {:.2}s",
            plural(summary.pages, "page", "pages"),
            plural(summary.documents, "data document", "data documents"),
            plural(summary.assets, "asset", "assets"),
            summary.elapsed.as_secs_f64()
        ),
        format!(
            "{}written {}, unchanged {}, skipped {}, deleted {}",
            indent(1),
            summary.written,
            summary.unchanged,
            summary.skipped,
            summary.deleted
        ),
    ];

    if !summary.warnings.is_empty() {
        lines.push("Warnings".to_string());
        for warning in &summary.warnings {
            lines.push(format!("{}{}", indent(1), warning));
        }
    }
    if !summary.failures.is_empty() {
        lines.push("Errors".to_string());
        for failure in &summary.failures {
            lines.push(format!("{}{}", indent(1), format_failure(failure)));
        }
    }
    lines
}

pub fn print_summary(summary: &BuildSummary) {
    for line in format_summary(summary) {
        println!("{}", line);
    }
}

// ============================================================================
// Route tables
// ============================================================================

/// Short shape hint for a data node.
fn shape(value: &Value) -> Option<String> {
    match value {
        Value::Object(map) => Some(plural(map.len(), "key", "keys")),
        Value::Array(items) => Some(plural(items.len(), "item", "items")),
        _ => None,
    }
}

pub fn format_routes(tables: &RouteTables, namespace: &str) -> Vec<String> {
    let mut lines = vec!["Pages".to_string()];
    for page in &tables.pages {
        lines.push(format!("{}{} ← {}", indent(1), page.route, page.template));
    }

    lines.push(String::new());
    lines.push("Data".to_string());
    let base_depth = namespace.split('/').filter(|s| !s.is_empty()).count();
    // Depth of the shallowest node, so roots line up at one indent.
    let min_depth = tables
        .api
        .nodes
        .keys()
        .map(|r| r.split('/').filter(|s| !s.is_empty()).count())
        .min()
        .unwrap_or(base_depth);
    for (route, node) in &tables.api.nodes {
        let depth = route.split('/').filter(|s| !s.is_empty()).count() - min_depth + 1;
        match shape(&node.value) {
            Some(hint) => lines.push(format!("{}{} ({})", indent(depth), route, hint)),
            None => lines.push(format!("{}{}", indent(depth), route)),
        }
    }

    if !tables.source_failures.is_empty() {
        lines.push(String::new());
        lines.push("Errors".to_string());
        for f in &tables.source_failures {
            lines.push(format!(
                "{}data {} ({}): {}",
                indent(1),
                f.route,
                f.path.display(),
                f.error
            ));
        }
    }
    lines
}

pub fn print_routes(tables: &RouteTables, namespace: &str) {
    for line in format_routes(tables, namespace) {
        println!("{}", line);
    }
}
