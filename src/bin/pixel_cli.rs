//! Pixel QA CLI
//!
//! Usage:
//!   pixel_cli tokenize --defs pixel_definitions --out build/trie.json
//!   pixel_cli validate --defs pixel_definitions --trie build/trie.json \
//!     --csv export.csv --out results/
//!   pixel_cli check --defs pixel_definitions
//!
//! Set `RUST_LOG=pixel_qa=info,pixel_core=info` for progress logging.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use tracing::warn;

use pixel_core::{ExampleCap, LivePixelValidator, Outcome, ValidationReport, DEFAULT_EXAMPLE_CAP};
use pixel_qa::config::DefinitionsLoader;
use pixel_qa::live_run::{run_live_validation, LiveColumns};
use pixel_qa::results::write_results;
use pixel_qa::trie_store::{load_trie, save_trie};

#[derive(Parser)]
#[command(name = "pixel_cli")]
#[command(version = "0.1.0")]
#[command(about = "Compile pixel definitions and validate live pixel exports against them")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Suppress non-essential output
    #[arg(long, short, global = true)]
    quiet: bool,
}

#[derive(Args)]
struct DefsArgs {
    /// Definitions root (product.json, catalogs, definitions/)
    #[arg(long, short = 'd', env = "PIXEL_DEFS_DIR", default_value = "pixel_definitions")]
    defs: PathBuf,

    /// Extra ignore list combined with the product one
    #[arg(long)]
    global_ignore: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the definition trie and persist it
    Tokenize {
        #[command(flatten)]
        defs: DefsArgs,

        /// Where to write the trie artifact
        #[arg(long, short = 'o', default_value = "build/pixel_trie.json")]
        out: PathBuf,
    },

    /// Validate a live export against a persisted trie
    Validate {
        #[command(flatten)]
        defs: DefsArgs,

        /// Trie artifact written by `tokenize`
        #[arg(long, short = 't')]
        trie: PathBuf,

        /// CSV export with pixel and params columns
        #[arg(long, short = 'c')]
        csv: PathBuf,

        /// Directory for the result files
        #[arg(long, short = 'o', default_value = "results")]
        out: PathBuf,

        /// Examples kept per prefix and descriptor
        #[arg(long, default_value_t = DEFAULT_EXAMPLE_CAP)]
        example_cap: usize,

        /// Keep every distinct example
        #[arg(long, conflicts_with = "example_cap")]
        keep_all_examples: bool,

        /// Parameter carrying the app version (defaults to product target key)
        #[arg(long)]
        version_key: Option<String>,

        #[arg(long, default_value = "pixel")]
        pixel_column: String,

        #[arg(long, default_value = "params")]
        params_column: String,

        #[arg(long, default_value = "version")]
        version_column: String,
    },

    /// Load and compile definitions without writing anything
    Check {
        #[command(flatten)]
        defs: DefsArgs,
    },
}

// =============================================================================
// MAIN
// =============================================================================

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Tokenize { defs, out } => cmd_tokenize(&defs, &out, cli.quiet),
        Commands::Validate {
            defs,
            trie,
            csv,
            out,
            example_cap,
            keep_all_examples,
            version_key,
            pixel_column,
            params_column,
            version_column,
        } => {
            let cap = if keep_all_examples {
                ExampleCap::KeepAll
            } else {
                ExampleCap::Limit(example_cap)
            };
            let columns = LiveColumns {
                pixel: pixel_column,
                params: params_column,
                version: version_column,
            };
            cmd_validate(&defs, &trie, &csv, &out, cap, version_key, &columns, cli.quiet)
        }
        Commands::Check { defs } => cmd_check(&defs, cli.quiet),
    };

    match result {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}: {:#}", "error".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

// =============================================================================
// COMMAND IMPLEMENTATIONS
// =============================================================================

fn cmd_tokenize(defs: &DefsArgs, out: &Path, quiet: bool) -> Result<()> {
    let loaded = DefinitionsLoader::new(&defs.defs).load(defs.global_ignore.as_deref())?;

    // Surface compile-time conflicts before anything is persisted
    let compiled = loaded.tokenizer.compile(&loaded.context)?;
    let files = loaded.files.len();

    save_trie(out, &loaded.tokenizer.into_artifact())?;

    if !quiet {
        println!(
            "{} Tokenized {} pixel families from {} files into {}",
            "OK".green(),
            compiled.family_count(),
            files,
            out.display()
        );
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn cmd_validate(
    defs: &DefsArgs,
    trie_path: &Path,
    csv_path: &Path,
    out: &Path,
    cap: ExampleCap,
    version_key: Option<String>,
    columns: &LiveColumns,
    quiet: bool,
) -> Result<()> {
    let loader = DefinitionsLoader::new(&defs.defs);
    let (product, context) = loader.load_context(defs.global_ignore.as_deref())?;

    let artifact = load_trie(trie_path)?;
    let trie = artifact
        .compile(&context)
        .with_context(|| format!("Failed to compile {}", trie_path.display()))?;

    let mut validator = LivePixelValidator::new(&trie).with_example_cap(cap);
    match version_key.as_deref().or(product.version_key()) {
        Some(key) => validator = validator.with_version_key(key),
        None if context.min_version.is_some() => {
            warn!("Product has a target version but no version key; relying on the version column")
        }
        None => {}
    }

    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = Arc::clone(&cancel);
        ctrlc::set_handler(move || cancel.store(true, Ordering::Relaxed))
            .context("Failed to install interrupt handler")?;
    }

    let input = File::open(csv_path)
        .with_context(|| format!("Failed to open {}", csv_path.display()))?;
    let mut report = ValidationReport::new();
    let stats = run_live_validation(
        BufReader::new(input),
        columns,
        &mut validator,
        &mut report,
        &cancel,
    )?;

    let (undocumented, errors) = validator.into_results();
    let paths = write_results(out, &undocumented, &errors, &report, &stats, &artifact.trie)?;

    if !quiet {
        let status = if stats.aborted {
            "ABORTED".yellow()
        } else {
            "OK".green()
        };
        println!("{} Validated {} rows from {}", status, stats.rows, csv_path.display());
        println!(
            "  {} passed, {} failed, {} old app version, {} undocumented, {} malformed rows",
            report.count(Outcome::ValidationPassed).to_string().green(),
            report.count(Outcome::ValidationFailed).to_string().red(),
            report.count(Outcome::OldAppVersion),
            report.count(Outcome::Undocumented).to_string().yellow(),
            stats.malformed_rows
        );
        let owners = report.owners_with_failures();
        if !owners.is_empty() {
            let owners: Vec<&str> = owners.into_iter().collect();
            println!("  owners with failures: {}", owners.join(", "));
        }
        println!("  results: {}", paths.summary.parent().unwrap_or(out).display());
    }
    Ok(())
}

fn cmd_check(defs: &DefsArgs, quiet: bool) -> Result<()> {
    let loaded = DefinitionsLoader::new(&defs.defs).load(defs.global_ignore.as_deref())?;
    let compiled = loaded.tokenizer.compile(&loaded.context)?;

    if !quiet {
        println!(
            "{} {} pixel families in {} files under {}",
            "OK".green(),
            compiled.family_count(),
            loaded.files.len(),
            defs.defs.display()
        );
    }
    Ok(())
}
