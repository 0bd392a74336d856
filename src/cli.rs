//! Command-line interface for glref.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::*;

use crate::corpus::{self, Api};
use crate::refpage::{find_entry, Spec};
use crate::server;

/// Exit codes.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILED: i32 = 1;
pub const EXIT_ERROR: i32 = 2;

/// Local OpenGL documentation server.
///
/// glref parses the Khronos OpenGL reference pages into simplified
/// records and serves them as JSON over a local HTTP endpoint, keyed by
/// page name or by any function name a page documents.
#[derive(Parser)]
#[command(name = "glref")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch the sources if needed, load them, and serve requests
    Serve(ServeArgs),
    /// Download the reference page sources without serving
    Fetch(FetchArgs),
    /// Print a single entry as JSON and exit
    Show(ShowArgs),
}

/// Flags shared by every command that loads the corpus.
#[derive(Parser)]
pub struct SourceArgs {
    /// Target OpenGL API: "gl" or "gles"
    #[arg(long, default_value = "gl")]
    pub api: String,

    /// Target version for the API, or 0 for any/latest
    #[arg(long = "api-version", default_value_t = 0.0)]
    pub api_version: f32,

    /// Directory holding the reference page sources (default: per-user cache)
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,
}

/// Arguments for the serve command.
#[derive(Parser)]
pub struct ServeArgs {
    /// Address the server will handle requests on
    #[arg(long, default_value = "localhost")]
    pub host: String,

    /// Port the server will handle requests on
    #[arg(short, long, default_value_t = 8888)]
    pub port: u16,

    #[command(flatten)]
    pub source: SourceArgs,
}

/// Arguments for the fetch command.
#[derive(Parser)]
pub struct FetchArgs {
    /// Directory to place the sources in (default: per-user cache)
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,
}

/// Arguments for the show command.
#[derive(Parser)]
pub struct ShowArgs {
    /// Entry or function name to look up
    pub name: String,

    #[command(flatten)]
    pub source: SourceArgs,
}

/// Resolve the configured or default corpus location.
fn resolve_cache_dir(flag: &Option<PathBuf>) -> anyhow::Result<PathBuf> {
    match flag {
        Some(dir) => Ok(dir.clone()),
        None => Ok(corpus::cache_dir()?),
    }
}

/// Fetch (if needed) and load every subset selected by the flags.
///
/// Any subset failing to load aborts the whole startup; a partially
/// loaded server would silently answer 400 for valid names.
fn load_specs(args: &SourceArgs) -> anyhow::Result<Vec<Spec>> {
    let api: Api = args
        .api
        .parse()
        .map_err(|e: String| anyhow::anyhow!("{}, must be \"gl\" or \"gles\"", e))?;
    let base = resolve_cache_dir(&args.cache_dir)?;

    if corpus::ensure_refpages(&base)? {
        println!("Fetched reference pages into {}", base.display());
    }

    let mut specs = Vec::new();
    for name in corpus::dir_names(api, args.api_version) {
        let spec = Spec::load(&base, name)
            .with_context(|| format!("failed to load subset {:?}", name))?;
        println!(
            "Loaded {}: {} pages, {} names",
            spec.name.bold(),
            spec.len(),
            spec.alias_count()
        );
        specs.push(spec);
    }
    Ok(specs)
}

/// Run the serve command.
pub fn run_serve(args: &ServeArgs) -> anyhow::Result<i32> {
    let specs = load_specs(&args.source)?;

    let addr = format!("{}:{}", args.host, args.port);
    println!("Awaiting requests at {} (Ctrl+C to stop)", addr.bold());
    server::serve(&addr, &specs)?;
    Ok(EXIT_SUCCESS)
}

/// Run the fetch command.
pub fn run_fetch(args: &FetchArgs) -> anyhow::Result<i32> {
    let dir = resolve_cache_dir(&args.cache_dir)?;
    if corpus::ensure_refpages(&dir)? {
        println!("Fetched reference pages into {}", dir.display());
    } else {
        println!("Reference pages already present at {}", dir.display());
    }
    Ok(EXIT_SUCCESS)
}

/// Run the show command.
pub fn run_show(args: &ShowArgs) -> anyhow::Result<i32> {
    let specs = load_specs(&args.source)?;

    match find_entry(&specs, &args.name) {
        Some(entry) => {
            let json = serde_json::to_string_pretty(entry)?;
            println!("{}", json);
            Ok(EXIT_SUCCESS)
        }
        None => {
            eprintln!(
                "{}: no entry or function named {:?}",
                "error".red().bold(),
                args.name
            );
            Ok(EXIT_FAILED)
        }
    }
}
