//! Catalog Promotion CLI
//!
//! Lists the differences between `schema_version.json` and `catalog.json`
//! and merges the accepted ones into the catalog. Added columns are
//! accepted unless rejected; drops and type changes need `--accept`.
//!
//! Usage:
//!   catalog-promote --dir output/orders-daily list
//!   catalog-promote --dir output/orders-daily apply --accept type:amount --reject add:note

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use drift_catalog::store::{load_document, save_document, CATALOG_FILE, SCHEMA_VERSION_FILE};
use drift_catalog::{CatalogConfig, ChangeKey, PendingChanges, TableDocuments};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "catalog-promote")]
#[command(about = "Promote observed schema changes into the catalog")]
struct Cli {
    /// Table output directory holding both documents
    #[arg(short, long, default_value = ".")]
    dir: PathBuf,

    /// Catalog document (default: <dir>/catalog.json)
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Version document (default: <dir>/schema_version.json)
    #[arg(long)]
    version: Option<PathBuf>,

    /// Configuration file
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show pending changes and their default selection
    List {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Apply the selected changes to the catalog
    Apply {
        /// Change keys to accept (add:<col>, drop:<col>, type:<col>)
        #[arg(short, long)]
        accept: Vec<String>,

        /// Change keys to reject
        #[arg(short, long)]
        reject: Vec<String>,

        /// Accept every pending change
        #[arg(long)]
        all: bool,

        /// Show the result without writing the catalog
        #[arg(long)]
        dry_run: bool,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = CatalogConfig::load_from(cli.config.as_deref()).context("loading configuration")?;
    let catalog_path = cli.catalog.unwrap_or_else(|| cli.dir.join(CATALOG_FILE));
    let version_path = cli.version.unwrap_or_else(|| cli.dir.join(SCHEMA_VERSION_FILE));

    let mut catalog: TableDocuments = load_document(&catalog_path)?;
    let version: TableDocuments = load_document(&version_path)?;
    let mut pending = PendingChanges::from_documents(&catalog, &version, &version_path)?;

    match cli.command {
        Commands::List { format } => {
            if format == "json" {
                println!("{}", serde_json::to_string_pretty(&pending)?);
            } else {
                print_pending(&pending);
            }
        }
        Commands::Apply {
            accept,
            reject,
            all,
            dry_run,
        } => {
            if all {
                pending.accept_all();
            }
            for raw in &accept {
                let key: ChangeKey = raw.parse()?;
                pending.select(&key, true)?;
            }
            for raw in &reject {
                let key: ChangeKey = raw.parse()?;
                pending.select(&key, false)?;
            }

            if pending.is_empty() {
                println!("No schema changes found for {}", pending.table);
                return Ok(());
            }

            print_pending(&pending);
            let applied = pending.apply_to(&mut catalog)?;

            if dry_run {
                println!("\nDry run: {} change(s) would be applied", applied);
                if let Some(entry) = catalog.get(&pending.table) {
                    println!("{}", serde_json::to_string_pretty(&entry.columns)?);
                }
            } else {
                save_document(&catalog, &catalog_path, config.output.format)?;
                println!("\n{} change(s) applied to {}", applied, catalog_path.display());
            }
        }
    }

    Ok(())
}

fn print_pending(pending: &PendingChanges) {
    if pending.is_empty() {
        println!("No schema changes found for {}", pending.table);
        return;
    }

    println!("Schema differences for: {}", pending.table);
    for change in &pending.changes {
        let mark = if change.accepted { "[x]" } else { "[ ]" };
        println!("  {} {:<24} {}", mark, change.key.to_string(), change.describe());
    }
}
