//! Centralized route naming shared by pages and data documents.
//!
//! Every route in the system is derived from a filesystem entry or a data
//! key by the rules in this module, and every output path is derived from a
//! route. Keeping both directions here guarantees pages, API documents and
//! the reconciler agree on names.
//!
//! ## Routes
//!
//! - Separators are normalized to `/`, empty segments dropped:
//!   `blog\\post` → `/blog/post`, `` → `/`
//! - An entry named `index` takes its directory's route:
//!   `blog/index` → `/blog`, `index` → `/`
//! - Data keys are percent-encoded so they always form exactly one segment.
//!
//! ## Output paths
//!
//! | Route            | Output                      |
//! |------------------|-----------------------------|
//! | `/`              | `index.html`                |
//! | `/blog`          | `blog/index.html`           |
//! | `/api`           | `api/index.json`            |
//! | `/api/posts`     | `api/posts.json`            |
//! | `/api/posts/7`   | `api/posts/7.json`          |
//!
//! A container's document sits *beside* the directory holding its children
//! (`api/posts.json` next to `api/posts/`), never inside it.

use std::path::PathBuf;

/// Stem that collapses to the containing directory's route.
pub const INDEX_STEM: &str = "index";

/// Normalize a relative path (either separator) into a route.
pub fn normalize_route(relative: &str) -> String {
    let segments: Vec<&str> = relative
        .split(['/', '\\'])
        .filter(|s| !s.is_empty())
        .collect();
    format!("/{}", segments.join("/"))
}

/// Append one segment to a route.
pub fn join_route(base: &str, segment: &str) -> String {
    if base == "/" || base.is_empty() {
        format!("/{}", segment)
    } else {
        format!("{}/{}", base.trim_end_matches('/'), segment)
    }
}

/// Route for a named entry inside a directory whose route is `base`.
///
/// `index` collapses to `base` itself.
pub fn entry_route(base: &str, stem: &str) -> String {
    if stem == INDEX_STEM {
        normalize_route(base)
    } else {
        join_route(base, stem)
    }
}

/// The route one level up, recomputed from the string. `None` for `/`.
pub fn parent_route(route: &str) -> Option<&str> {
    if route == "/" {
        return None;
    }
    match route.rsplit_once('/') {
        Some(("", _)) => Some("/"),
        Some((parent, _)) => Some(parent),
        None => None,
    }
}

/// Whether `route` equals `base` or lies below it.
pub fn is_within(route: &str, base: &str) -> bool {
    if base == "/" {
        return true;
    }
    route == base
        || route
            .strip_prefix(base)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// Encode a data key as a single route segment.
///
/// Returns `None` for keys that cannot name a file: empty, `.` and `..`.
pub fn route_segment(key: &str) -> Option<String> {
    let encoded = urlencoding::encode(key).into_owned();
    match encoded.as_str() {
        "" | "." | ".." => None,
        _ => Some(encoded),
    }
}

/// Output path of a page, relative to the output root.
pub fn page_output_path(route: &str) -> PathBuf {
    let mut path = PathBuf::new();
    for segment in route.split('/').filter(|s| !s.is_empty()) {
        path.push(segment);
    }
    path.push("index.html");
    path
}

/// Output path of a data document, relative to the output root.
///
/// `prefix` is the data namespace without slashes (`api`). Returns `None`
/// when the route does not live under the namespace.
pub fn api_output_path(route: &str, prefix: &str) -> Option<PathBuf> {
    let base = normalize_route(prefix);
    if !is_within(route, &base) {
        return None;
    }
    let relative = route[base.len()..].trim_start_matches('/');

    let mut path = PathBuf::new();
    for segment in base.split('/').filter(|s| !s.is_empty()) {
        path.push(segment);
    }
    let mut segments: Vec<&str> = relative.split('/').filter(|s| !s.is_empty()).collect();
    let name = segments.pop().unwrap_or(INDEX_STEM);
    for segment in segments {
        path.push(segment);
    }
    path.push(format!("{}.json", name));
    Some(path)
}
