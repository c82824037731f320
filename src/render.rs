//! Template rendering boundary.
//!
//! The pipeline only knows "template identifier + context → text". The
//! [`Renderer`] trait is that seam; [`TeraRenderer`] is the production
//! implementation.
//!
//! Every file with the template extension under the views directory is
//! registered under its `/`-separated path relative to that directory, so
//! pages and partials can reference each other:
//!
//! ```text
//! views/pages/index.html       → "pages/index.html"
//! views/partials/header.html   → "partials/header.html"
//! ```
//!
//! ```jinja
//! {% include "partials/header.html" %}
//! <h1>{{ site.title }}</h1>
//! {% for post in api.posts %}<a href="/blog/{{ post.id }}">{{ post.title }}</a>{% endfor %}
//! ```

use serde::Serialize;
use serde_json::{Map, Value};
use std::error::Error as _;
use std::io;
use std::path::{Path, PathBuf};
use tera::Tera;
use thiserror::Error;

use crate::fs::{EntryKind, Fs};

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("cannot read templates in {}: {source}", .path.display())]
    Load { path: PathBuf, source: io::Error },
    #[error("template {template}: {message}")]
    Template { template: String, message: String },
}

/// Values a page template can see.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct RenderContext<'a> {
    /// The page's own route.
    pub route: &'a str,
    /// The `[site]` table from config.
    pub site: &'a Value,
    /// Root data values keyed by route relative to the data namespace.
    pub api: &'a Map<String, Value>,
}

pub trait Renderer: Sync {
    fn render(&self, template: &str, context: &RenderContext<'_>) -> Result<String, RenderError>;
}

/// Renders with a set of tera templates loaded up front.
pub struct TeraRenderer {
    tera: Tera,
}

impl TeraRenderer {
    /// Register every `*.<extension>` file below `views_root`.
    pub fn load(fs: &dyn Fs, views_root: &Path, extension: &str) -> Result<Self, RenderError> {
        let mut sources = Vec::new();
        collect_templates(fs, views_root, "", extension, &mut sources)?;
        Self::from_sources(sources)
    }

    /// Build from `(name, source)` pairs.
    pub fn from_sources(sources: Vec<(String, String)>) -> Result<Self, RenderError> {
        let mut tera = Tera::default();
        // All at once, so `extends` and `include` resolve regardless of order.
        tera.add_raw_templates(sources)
            .map_err(|e| template_error("<load>", &e))?;
        Ok(Self { tera })
    }

    pub fn template_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tera.get_template_names().collect();
        names.sort_unstable();
        names
    }
}

impl Renderer for TeraRenderer {
    fn render(&self, template: &str, context: &RenderContext<'_>) -> Result<String, RenderError> {
        let ctx = tera::Context::from_serialize(context).map_err(|e| template_error(template, &e))?;
        self.tera
            .render(template, &ctx)
            .map_err(|e| template_error(template, &e))
    }
}

/// Tera nests the useful message (undefined variable, parse position) in the
/// source chain; flatten it into one line.
fn template_error(template: &str, err: &tera::Error) -> RenderError {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    RenderError::Template {
        template: template.to_string(),
        message,
    }
}

fn collect_templates(
    fs: &dyn Fs,
    dir: &Path,
    prefix: &str,
    extension: &str,
    out: &mut Vec<(String, String)>,
) -> Result<(), RenderError> {
    let load_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source| RenderError::Load { path, source }
    };
    let entries = fs.read_dir(dir).map_err(load_err(dir))?;

    for entry in entries {
        if entry.name.starts_with('.') || entry.kind == EntryKind::Symlink {
            continue;
        }
        let name = if prefix.is_empty() {
            entry.name.clone()
        } else {
            format!("{prefix}/{}", entry.name)
        };
        if entry.is_dir() {
            collect_templates(fs, &entry.path, &name, extension, out)?;
        } else if entry
            .name
            .strip_suffix(extension)
            .is_some_and(|stem| stem.ends_with('.') && stem.len() > 1)
        {
            let bytes = fs.read(&entry.path).map_err(load_err(&entry.path))?;
            out.push((name, String::from_utf8_lossy(&bytes).into_owned()));
        }
    }
    Ok(())
}
