//! ScopeGate CLI - offline tooling over scope files

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use scopegate_core::{
    load_scopes, token, trie, Action, Method, RegistrySnapshot, Scope, ScopeDefinition,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::debug;

#[derive(Parser)]
#[command(name = "scopegate")]
#[command(about = "ScopeGate - scope-based authorization for HTTP APIs")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a scope file (JSON array or TOML `[[scope]]` tables)
    Validate {
        /// Scope file path
        file: PathBuf,
    },

    /// Show which scopes govern a request
    Match {
        /// Scope file path
        #[arg(short, long)]
        scopes: PathBuf,

        /// HTTP method of the request
        #[arg(short, long)]
        method: String,

        /// Request URL
        #[arg(short, long)]
        url: String,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Measure route matching throughput
    Benchmark {
        /// Scope file to benchmark against; a synthetic set is used if omitted
        #[arg(short, long)]
        scopes: Option<PathBuf>,

        /// Number of requests to generate
        #[arg(short, long, default_value = "10000")]
        requests: usize,

        /// Number of parallel threads
        #[arg(short, long, default_value = "8")]
        threads: usize,
    },

    /// Print a freshly generated root-format token
    Token,
}

#[derive(Serialize)]
struct MatchOutput<'a> {
    method: Method,
    url: &'a str,
    public: bool,
    matched: Vec<&'a Scope>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("scopegate=debug")
            .init();
    }

    match cli.command {
        Commands::Validate { file } => validate_command(&file),
        Commands::Match {
            scopes,
            method,
            url,
            format,
        } => match_command(&scopes, &method, &url, format),
        Commands::Benchmark {
            scopes,
            requests,
            threads,
        } => benchmark_command(scopes.as_deref(), requests, threads),
        Commands::Token => {
            println!("{}", token::generate_token());
            Ok(())
        }
    }
}

fn build_snapshot(path: &Path) -> Result<RegistrySnapshot> {
    let definitions = load_scopes(path)
        .with_context(|| format!("Failed to load scope file: {}", path.display()))?;
    debug!("loaded {} scope definitions from {}", definitions.len(), path.display());

    let snapshot = RegistrySnapshot::build(definitions)
        .with_context(|| format!("Invalid scope file: {}", path.display()))?;
    debug!("built route trie with {} nodes", snapshot.trie().node_count());
    Ok(snapshot)
}

fn validate_command(file: &Path) -> Result<()> {
    println!("{} Validating {}...", "→".blue(), file.display());

    let snapshot = match load_scopes(file).and_then(RegistrySnapshot::build) {
        Ok(snapshot) => snapshot,
        Err(e) => {
            debug!("validation failed: {:?}", e);
            println!("{} Scope file is invalid:", "✗".red());
            println!("  {}", e);
            std::process::exit(1);
        }
    };

    println!("{} Scope file is valid!", "✓".green());
    println!("  Scopes: {}", snapshot.len());
    println!("  Routes: {}", snapshot.trie().route_count());
    for scope in snapshot.scopes() {
        println!(
            "  {} {:<7} {} {}",
            "▸".blue(),
            scope.method.as_str(),
            scope.uri,
            scope.name.bold()
        );
    }

    Ok(())
}

fn match_command(scopes: &Path, method: &str, url: &str, format: OutputFormat) -> Result<()> {
    let snapshot = build_snapshot(scopes)?;
    let action = Action::new(method, url).validate()?;

    let start = Instant::now();
    let indices = snapshot.matching_scopes(action.method, &action.uri);
    let elapsed = start.elapsed();
    debug!(
        "{} {} matched {} scopes in {:?}",
        action.method,
        action.uri,
        indices.len(),
        elapsed
    );

    let matched: Vec<&Scope> = indices.iter().filter_map(|&i| snapshot.scope(i)).collect();

    match format {
        OutputFormat::Json => {
            let output = MatchOutput {
                method: action.method,
                url: &action.uri,
                public: matched.is_empty(),
                matched,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Text => {
            println!("\n{} Match Result", "═".blue().bold());
            println!("{} Request: {} {}", "▸".blue(), action.method, action.uri);
            if matched.is_empty() {
                println!("{} Status: {}", "▸".blue(), "PUBLIC".yellow());
                println!("  No registered scope governs this route");
            } else {
                println!("{} Status: {}", "▸".blue(), "GOVERNED".green());
                println!("{} Matched scopes:", "▸".blue());
                for scope in &matched {
                    println!("  {} ({} {})", scope.name.bold(), scope.method, scope.uri);
                }
            }
            println!(
                "{} Match time: {:.3}µs",
                "▸".blue(),
                elapsed.as_secs_f64() * 1_000_000.0
            );
        }
    }

    Ok(())
}

/// Synthetic scope set: a read and a write scope per collection
fn synthetic_scopes(collections: usize) -> Vec<ScopeDefinition> {
    (0..collections)
        .flat_map(|i| {
            [
                ScopeDefinition::new(
                    format!("collection{}.read", i),
                    "GET",
                    format!("/api/collection{}/:id", i),
                    "",
                ),
                ScopeDefinition::new(
                    format!("collection{}.write", i),
                    "POST",
                    format!("/api/collection{}/*", i),
                    "",
                ),
            ]
        })
        .collect()
}

fn benchmark_command(scopes: Option<&Path>, requests: usize, threads: usize) -> Result<()> {
    use rayon::prelude::*;

    println!("{} Running benchmark...", "→".blue());
    println!("  Requests: {}", requests);
    println!("  Threads: {}", threads);

    let snapshot = match scopes {
        Some(path) => build_snapshot(path)?,
        None => {
            debug!("no scope file given, using synthetic scopes");
            RegistrySnapshot::build(synthetic_scopes(50))?
        }
    };
    if snapshot.is_empty() {
        anyhow::bail!("Scope file contains no scopes");
    }

    // Requests cycle over the registered routes with concrete segments
    // substituted for wildcards, plus one unregistered route in ten.
    let registered = snapshot.scopes();
    let test_requests: Vec<(Method, String)> = (0..requests)
        .map(|i| {
            if i % 10 == 9 {
                return (Method::Get, format!("/unregistered/{}", i));
            }
            let scope = &registered[i % registered.len()];
            (scope.method, concrete_url(&scope.uri, i))
        })
        .collect();

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .context("Failed to build thread pool")?;
    debug!(
        "generated {} requests over {} scopes",
        test_requests.len(),
        registered.len()
    );

    let start = Instant::now();
    let matched: usize = pool.install(|| {
        test_requests
            .par_iter()
            .map(|(method, url)| snapshot.matching_scopes(*method, url).len())
            .filter(|&n| n > 0)
            .count()
    });
    let duration = start.elapsed();

    let throughput = requests as f64 / duration.as_secs_f64();

    println!("\n{} Benchmark Results", "═".blue().bold());
    println!("{} Scopes: {}", "▸".blue(), snapshot.len());
    println!("{} Trie nodes: {}", "▸".blue(), snapshot.trie().node_count());
    println!("{} Total requests: {}", "▸".blue(), requests);
    println!("{} Governed: {}", "▸".blue(), matched);
    println!("{} Public: {}", "▸".blue(), requests - matched);
    println!("{} Duration: {:.3}s", "▸".blue(), duration.as_secs_f64());
    println!("{} Throughput: {:.0} req/sec", "▸".blue(), throughput);
    println!(
        "{} Avg latency: {:.3}µs",
        "▸".blue(),
        duration.as_secs_f64() * 1_000_000.0 / requests.max(1) as f64
    );

    Ok(())
}

/// Replace wildcard segments of a pattern with a concrete value
fn concrete_url(pattern: &str, i: usize) -> String {
    let segments: Vec<String> = trie::segments(pattern)
        .into_iter()
        .map(|s| {
            if trie::is_wildcard(s) {
                format!("v{}", i)
            } else {
                s.to_string()
            }
        })
        .collect();
    format!("/{}", segments.join("/"))
}
