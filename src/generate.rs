//! Build pass orchestration.
//!
//! One call to [`Pipeline::build`] is one complete, incremental pass:
//!
//! ```text
//! 1. Discover     views/pages/**  → page routes
//!                 api/**          → data tree (providers run here)
//! 2. Check        no page route inside the data namespace
//! 3. Fan out      ┌ render pages      ─┐
//!    (rayon)      ├ write data docs    ├─ every path → ValidFileSet
//!                 └ mirror assets     ─┘
//! 4. Join
//! 5. Reconcile    delete whatever the pass did not register
//! 6. Summarize
//! ```
//!
//! Discovery failures and route conflicts abort before anything is written.
//! Everything after that is isolated per item: a page that fails to render,
//! a data unit that fails to run, or a file that cannot be written is
//! recorded as a [`Failure`] and the rest of the site still builds.
//!
//! A page whose template fails to render keeps its previous output: its
//! path is registered anyway, so the reconciler does not sweep the last
//! good version.

use rayon::prelude::*;
use serde_json::{Map, Value};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::api::{self, ApiTree, ApiTreeBuilder, SourceFailure, toml_to_json};
use crate::assets::{self, AssetError};
use crate::config::{SitePaths, SiteConfig};
use crate::context::{BuildContext, BuildEvent, Outcome, Stage};
use crate::fs::Fs;
use crate::naming::{is_within, page_output_path};
use crate::provider::ProviderRunner;
use crate::reconcile::{self, CleanupError};
use crate::render::{RenderContext, RenderError, Renderer};
use crate::scan::{DiscoveryError, RouteDiscoverer};
use crate::types::PageRoute;
use crate::writer::WriteError;

/// Errors that stop a pass before any output is written.
#[derive(Error, Debug)]
pub enum BuildError {
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
    #[error("page {route} ({template}) lies inside the data namespace {namespace}")]
    RouteConflict {
        route: String,
        template: String,
        namespace: String,
    },
    #[error("cannot prepare output directory {}: {source}", .path.display())]
    Output { path: PathBuf, source: io::Error },
    #[error("output directory {} overlaps the {name} directory {}", .output.display(), .source_dir.display())]
    OutputOverlap {
        output: PathBuf,
        name: &'static str,
        source_dir: PathBuf,
    },
}

/// A per-item problem recorded during a pass.
#[derive(Debug)]
pub enum Failure {
    Render { route: String, error: RenderError },
    Write { subject: String, error: WriteError },
    Serialize { route: String, error: serde_json::Error },
    Source(SourceFailure),
    Asset(AssetError),
    Cleanup(CleanupError),
}

impl Failure {
    /// Cleanup problems are reported but do not fail the pass.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Failure::Cleanup(_))
    }
}

/// Outcome of one pass.
#[derive(Debug, Default)]
pub struct BuildSummary {
    pub pages: usize,
    pub documents: usize,
    pub assets: usize,
    pub written: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub deleted: usize,
    pub failures: Vec<Failure>,
    pub warnings: Vec<String>,
    pub elapsed: Duration,
}

impl BuildSummary {
    pub fn is_success(&self) -> bool {
        !self.failures.iter().any(Failure::is_fatal)
    }
}

/// Everything discovery produced, before any write.
#[derive(Debug)]
pub struct RouteTables {
    pub pages: Vec<PageRoute>,
    pub api: ApiTree,
    pub source_failures: Vec<SourceFailure>,
}

/// Tallies from one fan-out stage.
#[derive(Debug, Default)]
struct StageReport {
    written: usize,
    unchanged: usize,
    failures: Vec<Failure>,
}

impl StageReport {
    fn record(&mut self, result: Result<Outcome, Failure>) {
        match result {
            Ok(Outcome::Written) => self.written += 1,
            Ok(Outcome::Unchanged | Outcome::Skipped) => self.unchanged += 1,
            Err(failure) => self.failures.push(failure),
        }
    }
}

/// A site's inputs and collaborators, ready to build.
pub struct Pipeline<'a> {
    pub fs: &'a dyn Fs,
    pub config: &'a SiteConfig,
    pub paths: &'a SitePaths,
    pub renderer: &'a dyn Renderer,
    pub runner: &'a dyn ProviderRunner,
}

impl Pipeline<'_> {
    /// Discover pages and load data without writing anything.
    pub fn collect_routes(&self) -> Result<RouteTables, BuildError> {
        let pages = RouteDiscoverer::new(
            self.fs,
            &self.config.pages.extension,
            &self.config.pages.exclude,
            &self.paths.views,
        )
        .discover(&self.paths.pages)?;

        let namespace = self.config.api.base_route();
        if let Some(page) = pages.iter().find(|p| is_within(&p.route, &namespace)) {
            return Err(BuildError::RouteConflict {
                route: page.route.clone(),
                template: page.template.clone(),
                namespace,
            });
        }

        let (api, source_failures) =
            ApiTreeBuilder::new(self.fs, self.runner, &self.config.api).build(&self.paths.api)?;

        Ok(RouteTables {
            pages,
            api,
            source_failures,
        })
    }

    /// Run one build pass.
    ///
    /// `clean` removes the output directory first, forcing every file to be
    /// rewritten.
    pub fn build(&self, events: Option<Sender<BuildEvent>>, clean: bool) -> Result<BuildSummary, BuildError> {
        let started = Instant::now();
        if let Some((name, dir)) = self.paths.output_overlap() {
            return Err(BuildError::OutputOverlap {
                output: self.paths.output.clone(),
                name,
                source_dir: dir.to_path_buf(),
            });
        }
        let tables = self.collect_routes()?;
        let output = &self.paths.output;
        self.prepare_output(output, clean)?;

        let ctx = BuildContext::new(self.fs, events);
        let site = toml_to_json(toml::Value::Table(self.config.site.clone()));
        let api_data = tables.api.template_data(&self.config.api.base_route());
        let asset_root = if self.config.assets.subpath.is_empty() {
            output.clone()
        } else {
            output.join(&self.config.assets.subpath)
        };

        let (pages, (docs, asset_report)) = rayon::join(
            || self.render_pages(&ctx, &tables.pages, &site, &api_data),
            || {
                rayon::join(
                    || self.write_documents(&ctx, &tables.api),
                    || assets::sync(&ctx, &self.paths.public, &asset_root, self.config.assets.compare),
                )
            },
        );

        let cleanup = reconcile::reconcile(&ctx, output, &self.config.output.keep);

        let mut summary = BuildSummary {
            pages: tables.pages.len(),
            documents: tables.api.len(),
            assets: asset_report.synced.len(),
            written: pages.written + docs.written + asset_report.count(Outcome::Written),
            unchanged: pages.unchanged + docs.unchanged,
            skipped: asset_report.count(Outcome::Skipped),
            deleted: cleanup.deleted(),
            warnings: tables.api.warnings,
            ..BuildSummary::default()
        };
        summary
            .failures
            .extend(tables.source_failures.into_iter().map(Failure::Source));
        summary.failures.extend(pages.failures);
        summary.failures.extend(docs.failures);
        summary
            .failures
            .extend(asset_report.failures.into_iter().map(Failure::Asset));
        summary
            .failures
            .extend(cleanup.errors.into_iter().map(Failure::Cleanup));
        summary.elapsed = started.elapsed();
        Ok(summary)
    }

    fn prepare_output(&self, output: &Path, clean: bool) -> Result<(), BuildError> {
        let io_err = |source| BuildError::Output {
            path: output.to_path_buf(),
            source,
        };
        if clean && self.fs.is_dir(output) {
            self.fs.remove_dir_all(output).map_err(io_err)?;
        }
        self.fs.create_dir_all(output).map_err(io_err)
    }

    fn render_pages(
        &self,
        ctx: &BuildContext<'_>,
        pages: &[PageRoute],
        site: &Value,
        api: &Map<String, Value>,
    ) -> StageReport {
        let results: Vec<Result<Outcome, Failure>> = pages
            .par_iter()
            .map(|page| {
                let path = self.paths.output.join(page_output_path(&page.route));
                let context = RenderContext {
                    route: &page.route,
                    site,
                    api,
                };
                let html = match self.renderer.render(&page.template, &context) {
                    Ok(html) => html,
                    Err(error) => {
                        ctx.valid.insert(path);
                        return Err(Failure::Render {
                            route: page.route.clone(),
                            error,
                        });
                    }
                };
                write(ctx, Stage::Page, &page.route, &path, html.as_bytes())
            })
            .collect();

        let mut report = StageReport::default();
        results.into_iter().for_each(|r| report.record(r));
        report
    }

    fn write_documents(&self, ctx: &BuildContext<'_>, tree: &ApiTree) -> StageReport {
        let prefix = self.config.api.prefix_path();
        let results: Vec<Result<Outcome, Failure>> = tree
            .nodes
            .par_iter()
            .filter_map(|(route, node)| {
                let entry = api::output_entry(node, prefix)?;
                let path = self.paths.output.join(entry.path);
                Some(match api::document(node) {
                    Ok(json) => write(ctx, Stage::Api, route, &path, json.as_bytes()),
                    Err(error) => Err(Failure::Serialize {
                        route: route.clone(),
                        error,
                    }),
                })
            })
            .collect();

        let mut report = StageReport::default();
        results.into_iter().for_each(|r| report.record(r));
        report
    }
}

/// Write through the content writer and report progress.
fn write(ctx: &BuildContext<'_>, stage: Stage, subject: &str, path: &Path, content: &[u8]) -> Result<Outcome, Failure> {
    let changed = ctx
        .writer()
        .write_if_changed(path, content)
        .map_err(|error| Failure::Write {
            subject: subject.to_string(),
            error,
        })?;
    let outcome = if changed {
        Outcome::Written
    } else {
        Outcome::Unchanged
    };
    ctx.emit(BuildEvent::Produced {
        stage,
        subject: subject.to_string(),
        path: path.to_path_buf(),
        outcome,
    });
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::{DiskFs, MemoryFs};
    use crate::provider::CommandRunner;
    use crate::render::TeraRenderer;
    use crate::test_helpers::{
        MockRenderer, ScriptedRunner, find_page, fixture_fs, memory_site, relative_files,
        setup_fixtures, site_paths,
    };
    use std::sync::mpsc;

    fn pass(
        fs: &MemoryFs,
        config: &SiteConfig,
        renderer: &dyn Renderer,
        runner: &ScriptedRunner,
        events: Option<Sender<BuildEvent>>,
        clean: bool,
    ) -> Result<BuildSummary, BuildError> {
        let paths = site_paths(config);
        Pipeline {
            fs,
            config,
            paths: &paths,
            renderer,
            runner,
        }
        .build(events, clean)
    }

    fn build(fs: &MemoryFs, renderer: &dyn Renderer, runner: &ScriptedRunner) -> BuildSummary {
        pass(fs, &SiteConfig::default(), renderer, runner, None, false).unwrap()
    }

    fn tera(fs: &MemoryFs) -> TeraRenderer {
        TeraRenderer::load(fs, Path::new("/site/views"), "html").unwrap()
    }

    #[test]
    fn first_pass_writes_pages_documents_and_assets() {
        let fs = memory_site();
        let summary = build(&fs, &MockRenderer::new(), &ScriptedRunner::new());

        assert!(summary.is_success(), "{:?}", summary.failures);
        assert_eq!(summary.pages, 3);
        assert_eq!(summary.documents, 3);
        assert!(fs.exists(Path::new("/site/dist/index.html")));
        assert!(fs.exists(Path::new("/site/dist/about/index.html")));
        assert!(fs.exists(Path::new("/site/dist/blog/index.html")));
        assert!(fs.exists(Path::new("/site/dist/api/config.json")));
        assert_eq!(fs.read_to_string("/site/dist/api/config/a.json").unwrap(), "1");
        assert_eq!(fs.read_to_string("/site/dist/api/config/b.json").unwrap(), "2");
        assert!(fs.exists(Path::new("/site/dist/css/site.css")));
        assert_eq!(summary.deleted, 0);
    }

    #[test]
    fn second_pass_changes_nothing() {
        let fs = memory_site();
        let renderer = MockRenderer::new();
        let runner = ScriptedRunner::new();
        build(&fs, &renderer, &runner);
        let summary = build(&fs, &renderer, &runner);

        assert_eq!(summary.written, 0);
        assert_eq!(summary.deleted, 0);
        assert_eq!(summary.unchanged, summary.pages + summary.documents);
        assert_eq!(summary.skipped, summary.assets);
    }

    #[test]
    fn editing_one_template_changes_one_output() {
        let fs = memory_site();
        let runner = ScriptedRunner::new();
        build(&fs, &tera(&fs), &runner);

        fs.insert_file("/site/views/pages/about.html", "About, revised");
        let (tx, rx) = mpsc::channel();
        pass(&fs, &SiteConfig::default(), &tera(&fs), &runner, Some(tx), false).unwrap();

        let written: Vec<PathBuf> = rx
            .iter()
            .filter_map(|e| match e {
                BuildEvent::Produced {
                    path,
                    outcome: Outcome::Written,
                    ..
                } => Some(path),
                _ => None,
            })
            .collect();
        assert_eq!(written, vec![PathBuf::from("/site/dist/about/index.html")]);
        assert_eq!(
            fs.read_to_string("/site/dist/about/index.html").unwrap(),
            "About, revised"
        );
    }

    #[test]
    fn partials_are_rendered_into_pages() {
        let fs = memory_site();
        build(&fs, &tera(&fs), &ScriptedRunner::new());
        let home = fs.read_to_string("/site/dist/index.html").unwrap();
        assert!(home.contains("<header>Fixture</header>"), "{home}");
        assert!(!fs.exists(Path::new("/site/dist/partials")));
    }

    #[test]
    fn removed_template_is_swept() {
        let fs = memory_site();
        let renderer = MockRenderer::new();
        let runner = ScriptedRunner::new();
        build(&fs, &renderer, &runner);

        fs.remove_file(Path::new("/site/views/pages/blog/index.html")).unwrap();
        let summary = build(&fs, &renderer, &runner);

        assert!(!fs.exists(Path::new("/site/dist/blog/index.html")));
        assert!(!fs.exists(Path::new("/site/dist/blog")));
        assert_eq!(summary.deleted, 2);
    }

    #[test]
    fn tampered_output_is_restored() {
        let fs = memory_site();
        let renderer = MockRenderer::new();
        let runner = ScriptedRunner::new();
        build(&fs, &renderer, &runner);
        let original = fs.read_to_string("/site/dist/api/config.json").unwrap();

        fs.remove_file(Path::new("/site/dist/api/config.json")).unwrap();
        let summary = build(&fs, &renderer, &runner);

        assert_eq!(summary.written, 1);
        assert_eq!(fs.read_to_string("/site/dist/api/config.json").unwrap(), original);
    }

    #[test]
    fn render_failure_keeps_last_good_page() {
        let fs = memory_site();
        let runner = ScriptedRunner::new();
        build(&fs, &MockRenderer::new(), &runner);

        let failing = MockRenderer::new().failing("pages/about.html");
        let summary = build(&fs, &failing, &runner);

        assert!(!summary.is_success());
        assert!(matches!(
            summary.failures.as_slice(),
            [Failure::Render { route, .. }] if route == "/about"
        ));
        assert!(fs.exists(Path::new("/site/dist/about/index.html")));
        assert_eq!(summary.deleted, 0);
    }

    #[test]
    fn provider_units_feed_documents_and_templates() {
        let fs = memory_site();
        fs.insert_file("/site/api/posts/index.js", "// provider");
        let runner = ScriptedRunner::new().with(
            "/site/api/posts/index.js",
            r#"[{"id": 1, "title": "First"}, {"id": 2, "title": "Second"}]"#,
        );
        let renderer = MockRenderer::new();
        let summary = build(&fs, &renderer, &runner);

        assert!(summary.is_success(), "{:?}", summary.failures);
        assert!(fs.exists(Path::new("/site/dist/api/posts.json")));
        assert_eq!(
            fs.read_to_string("/site/dist/api/posts/2/title.json").unwrap(),
            "\"Second\""
        );
        let seen = renderer.api_keys_seen();
        assert!(seen.contains(&"posts".to_string()));
        assert!(seen.contains(&"config".to_string()));
    }

    #[test]
    fn failing_provider_fails_pass_but_builds_the_rest() {
        let fs = memory_site();
        fs.insert_file("/site/api/broken.js", "throw new Error()");
        let summary = build(&fs, &MockRenderer::new(), &ScriptedRunner::new());

        assert!(!summary.is_success());
        assert!(matches!(summary.failures.as_slice(), [Failure::Source(_)]));
        assert!(fs.exists(Path::new("/site/dist/index.html")));
        assert!(fs.exists(Path::new("/site/dist/api/config.json")));
    }

    #[test]
    fn page_inside_data_namespace_is_rejected_before_writing() {
        let fs = memory_site();
        fs.insert_file("/site/views/pages/api/index.html", "oops");
        let result = pass(
            &fs,
            &SiteConfig::default(),
            &MockRenderer::new(),
            &ScriptedRunner::new(),
            None,
            false,
        );

        assert!(matches!(result, Err(BuildError::RouteConflict { route, .. }) if route == "/api"));
        assert!(!fs.exists(Path::new("/site/dist")));
    }

    #[test]
    fn asset_colliding_with_page_is_reported() {
        let fs = memory_site();
        fs.insert_file("/site/public/about/index.html", "static about");
        let summary = build(&fs, &MockRenderer::new(), &ScriptedRunner::new());

        assert!(!summary.is_success());
        let collisions = summary
            .failures
            .iter()
            .filter(|f| {
                matches!(
                    f,
                    Failure::Asset(AssetError::Collision(_))
                        | Failure::Write {
                            error: WriteError::Collision(_),
                            ..
                        }
                )
            })
            .count();
        assert_eq!(collisions, 1);
    }

    #[test]
    fn assets_can_live_under_a_subpath() {
        let fs = memory_site();
        let mut config = SiteConfig::default();
        config.assets.subpath = "static".into();
        pass(&fs, &config, &MockRenderer::new(), &ScriptedRunner::new(), None, false).unwrap();

        assert!(fs.exists(Path::new("/site/dist/static/css/site.css")));
        assert!(!fs.exists(Path::new("/site/dist/css/site.css")));
    }

    #[test]
    fn clean_build_rewrites_everything() {
        let fs = memory_site();
        let renderer = MockRenderer::new();
        let runner = ScriptedRunner::new();
        let first = build(&fs, &renderer, &runner);
        fs.insert_file("/site/dist/stray.txt", "junk");

        let summary = pass(&fs, &SiteConfig::default(), &renderer, &runner, None, true).unwrap();

        assert_eq!(summary.written, first.written);
        assert_eq!(summary.deleted, 0);
        assert!(!fs.exists(Path::new("/site/dist/stray.txt")));
    }

    #[test]
    fn git_directory_in_output_survives() {
        let fs = memory_site();
        fs.insert_file("/site/dist/.git/HEAD", "ref");
        build(&fs, &MockRenderer::new(), &ScriptedRunner::new());
        assert!(fs.exists(Path::new("/site/dist/.git/HEAD")));
    }

    #[test]
    fn collect_routes_writes_nothing() {
        let fs = memory_site();
        let config = SiteConfig::default();
        let paths = site_paths(&config);
        let tables = Pipeline {
            fs: &fs,
            config: &config,
            paths: &paths,
            renderer: &MockRenderer::new(),
            runner: &ScriptedRunner::new(),
        }
        .collect_routes()
        .unwrap();

        let routes: Vec<&str> = tables.pages.iter().map(|p| p.route.as_str()).collect();
        assert_eq!(routes, vec!["/", "/about", "/blog"]);
        assert!(tables.api.get("/api/config/a").is_some());
        assert!(!fs.exists(Path::new("/site/dist")));
    }

    fn pass_into(fs: &MemoryFs, output: &str, clean: bool) -> Result<BuildSummary, BuildError> {
        let config = SiteConfig::default();
        let paths = config.paths(Path::new("/site"), Some(Path::new(output)));
        Pipeline {
            fs,
            config: &config,
            paths: &paths,
            renderer: &MockRenderer::new(),
            runner: &ScriptedRunner::new(),
        }
        .build(None, clean)
    }

    #[test]
    fn output_at_project_root_is_refused_before_touching_anything() {
        let fs = memory_site();
        let before = fs.files();

        for clean in [false, true] {
            let result = pass_into(&fs, "/site", clean);
            assert!(
                matches!(result, Err(BuildError::OutputOverlap { name: "project root", .. })),
                "{result:?}"
            );
        }
        assert_eq!(fs.files(), before);
        assert_eq!(
            fs.read_to_string("/site/api/config.json").unwrap(),
            r#"{"a": 1, "b": 2}"#
        );
    }

    #[test]
    fn output_overlapping_a_source_directory_is_refused() {
        let fs = memory_site();
        let before = fs.files();
        for (output, expected) in [
            ("/site/public", "public"),
            ("/site/views/pages", "views"),
            ("/site/api/out", "api"),
            ("/", "project root"),
        ] {
            let result = pass_into(&fs, output, true);
            assert!(
                matches!(&result, Err(BuildError::OutputOverlap { name, .. }) if *name == expected),
                "{output}: {result:?}"
            );
        }
        assert_eq!(fs.files(), before);
    }

    #[test]
    fn index_key_at_data_root_does_not_collide_with_root_document() {
        let fs = memory_site();
        fs.insert_file("/site/api/index.json", r#"{"index": 1, "other": 2}"#);
        let summary = build(&fs, &MockRenderer::new(), &ScriptedRunner::new());

        assert!(summary.is_success(), "{:?}", summary.failures);
        assert_eq!(summary.warnings.len(), 1);
        let root = fs.read_to_string("/site/dist/api/index.json").unwrap();
        let root: Value = serde_json::from_str(&root).unwrap();
        assert_eq!(root, serde_json::json!({"index": 1, "other": 2}));
        assert_eq!(fs.read_to_string("/site/dist/api/other.json").unwrap(), "2");
    }

    #[test]
    fn each_page_renders_its_own_template() {
        let fs = memory_site();
        let renderer = MockRenderer::new();
        build(&fs, &renderer, &ScriptedRunner::new());

        let mut calls: Vec<(String, String)> = renderer
            .calls()
            .into_iter()
            .map(|c| (c.route, c.template))
            .collect();
        calls.sort();
        assert_eq!(
            calls,
            vec![
                ("/".to_string(), "pages/index.html".to_string()),
                ("/about".to_string(), "pages/about.html".to_string()),
                ("/blog".to_string(), "pages/blog/index.html".to_string()),
            ]
        );
    }

    // =========================================================================
    // Fixture site
    // =========================================================================

    fn fixture_config(fs: &MemoryFs) -> SiteConfig {
        let text = fs.read_to_string("/site/sitegen.toml").unwrap();
        let config: SiteConfig = toml::from_str(&text).unwrap();
        config.validate().unwrap();
        config
    }

    #[test]
    fn fixture_site_produces_expected_tree() {
        let fs = fixture_fs();
        let config = fixture_config(&fs);
        let renderer = tera(&fs);
        let summary = pass(&fs, &config, &renderer, &ScriptedRunner::new(), None, false).unwrap();
        assert!(summary.is_success(), "{:?}", summary.failures);

        let mut expected = vec![
            "index.html",
            "about/index.html",
            "blog/index.html",
            "api/config.json",
            "api/config/a.json",
            "api/config/b.json",
            "api/posts.json",
            "api/posts/1.json",
            "api/posts/1/id.json",
            "api/posts/1/title.json",
            "api/posts/2.json",
            "api/posts/2/id.json",
            "api/posts/2/title.json",
            "css/site.css",
            "robots.txt",
        ];
        expected.sort_unstable();
        let mut actual = relative_files(&fs, "/site/dist");
        actual.sort_unstable();
        assert_eq!(actual, expected);

        let home = fs.read_to_string("/site/dist/index.html").unwrap();
        assert!(home.contains("<h1>Fixture Site</h1>"), "{home}");
        assert!(home.contains("<li>World</li>"), "{home}");
        let blog = fs.read_to_string("/site/dist/blog/index.html").unwrap();
        assert!(blog.contains("Blog (1)"), "{blog}");
    }

    #[test]
    fn fixture_routes_use_views_relative_templates() {
        let fs = fixture_fs();
        let config = fixture_config(&fs);
        let paths = site_paths(&config);
        let tables = Pipeline {
            fs: &fs,
            config: &config,
            paths: &paths,
            renderer: &MockRenderer::new(),
            runner: &ScriptedRunner::new(),
        }
        .collect_routes()
        .unwrap();

        assert_eq!(find_page(&tables.pages, "/").template, "pages/index.html");
        assert_eq!(find_page(&tables.pages, "/blog").template, "pages/blog/index.html");
        assert_eq!(tables.api.roots, vec!["/api/config", "/api/posts"]);
    }

    #[test]
    fn fixture_site_is_idempotent_on_disk() {
        let tmp = setup_fixtures();
        let config = crate::config::load_config(tmp.path()).unwrap();
        let paths = config.paths(tmp.path(), None);
        let renderer = TeraRenderer::load(&DiskFs, &paths.views, &config.pages.extension).unwrap();
        let pipeline = Pipeline {
            fs: &DiskFs,
            config: &config,
            paths: &paths,
            renderer: &renderer,
            runner: &CommandRunner,
        };

        let first = pipeline.build(None, false).unwrap();
        assert!(first.is_success(), "{:?}", first.failures);
        assert_eq!(first.written, first.pages + first.documents + first.assets);

        let second = pipeline.build(None, false).unwrap();
        assert_eq!(second.written, 0);
        assert_eq!(second.deleted, 0);
    }
}
