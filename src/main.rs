use clap::{Parser, Subcommand};
use sitegen::config::{self, SiteConfig};
use sitegen::fs::DiskFs;
use sitegen::generate::Pipeline;
use sitegen::output;
use sitegen::provider::CommandRunner;
use sitegen::render::TeraRenderer;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "sitegen")]
#[command(about = "Incremental static site builder")]
#[command(long_about = "\
Incremental static site builder

Page templates become HTML pages, data files become JSON documents, and the
public directory is mirrored into the output. Only files whose content
changed are rewritten; anything no longer produced is removed.

Project structure:

  site/
  ├── sitegen.toml                 # Config (optional, overrides stock defaults)
  ├── views/
  │   ├── pages/                   # One template per route
  │   │   ├── index.html           # → /            → dist/index.html
  │   │   ├── about.html           # → /about       → dist/about/index.html
  │   │   └── blog/index.html      # → /blog        → dist/blog/index.html
  │   └── partials/                # Included by pages, never routed
  ├── api/                         # Data tree, served under /api
  │   ├── config.json              # → /api/config  → dist/api/config.json
  │   ├── posts/index.toml         # → /api/posts   → dist/api/posts.json
  │   └── feed.js                  # Provider: stdout JSON → /api/feed
  └── public/                      # Copied as-is → dist/

Run 'sitegen gen-config' to generate a documented sitegen.toml.")]
#[command(version)]
struct Cli {
    /// Project root containing sitegen.toml
    #[arg(long, default_value = ".", global = true)]
    root: PathBuf,

    /// Output directory (overrides output_dir from the config)
    #[arg(long, global = true)]
    output: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one build pass
    Build {
        /// Remove the output directory first and rewrite everything
        #[arg(long)]
        clean: bool,
        /// Also list entries that were already up to date
        #[arg(long, short)]
        verbose: bool,
    },
    /// Discover routes and load data without writing anything
    Check,
    /// Print a stock sitegen.toml with all options documented
    GenConfig,
}

fn main() -> ExitCode {
    match run(Cli::parse()) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

/// Returns whether the command succeeded.
fn run(cli: Cli) -> Result<bool, Box<dyn std::error::Error>> {
    if let Command::GenConfig = cli.command {
        print!("{}", config::stock_config_toml());
        return Ok(true);
    }

    let site_config = config::load_config(&cli.root)?;
    let paths = site_config.paths(&cli.root, cli.output.as_deref());
    init_thread_pool(&site_config);

    let renderer = TeraRenderer::load(&DiskFs, &paths.views, &site_config.pages.extension)?;
    let runner = CommandRunner;
    let pipeline = Pipeline {
        fs: &DiskFs,
        config: &site_config,
        paths: &paths,
        renderer: &renderer,
        runner: &runner,
    };

    match cli.command {
        Command::Build { clean, verbose } => {
            println!("==> Building {} → {}", cli.root.display(), paths.output.display());
            let output_root = paths.output.clone();
            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    for line in output::format_event(&event, &output_root, verbose) {
                        println!("{}", line);
                    }
                }
            });
            let result = pipeline.build(Some(tx), clean);
            if printer.join().is_err() {
                eprintln!("warning: progress printer stopped early");
            }
            let summary = result?;
            output::print_summary(&summary);
            Ok(summary.is_success())
        }
        Command::Check => {
            println!("==> Checking {}", cli.root.display());
            let tables = pipeline.collect_routes()?;
            output::print_routes(&tables, &site_config.api.base_route());
            if !tables.api.warnings.is_empty() {
                println!();
                println!("Warnings");
                for warning in &tables.api.warnings {
                    println!("    {}", warning);
                }
            }
            Ok(tables.source_failures.is_empty())
        }
        Command::GenConfig => Ok(true),
    }
}

/// Size the global rayon pool from `[processing]`.
fn init_thread_pool(config: &SiteConfig) {
    rayon::ThreadPoolBuilder::new()
        .num_threads(config.processing.worker_count())
        .build_global()
        .ok();
}
