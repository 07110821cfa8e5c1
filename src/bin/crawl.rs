//! Catalog Crawl CLI
//!
//! Infers the schema of every file landed for one date, records drift
//! against each file's baseline and refreshes the per-table documents.
//!
//! Usage:
//!   catalog-crawl --base /lake/raw --output /lake/catalog
//!   catalog-crawl --base /lake/raw --output /lake/catalog --date 2024-01-05 --format json

use std::path::PathBuf;

use anyhow::{bail, Context};
use chrono::{Local, NaiveDate};
use clap::Parser;
use drift_catalog::{CatalogConfig, CrawlSummary, Crawler, Status};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "catalog-crawl")]
#[command(about = "Detect schema drift in a date-partitioned data lake")]
struct Cli {
    /// Source root holding one directory per table
    #[arg(short, long)]
    base: Option<PathBuf>,

    /// Output root receiving one directory per unique table
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Partition date, YYYY-MM-DD (default: today)
    #[arg(short, long)]
    date: Option<NaiveDate>,

    /// Configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    format: String,

    /// Exit non-zero on warnings too
    #[arg(long)]
    strict: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<i32> {
    let config = CatalogConfig::load_from(cli.config.as_deref()).context("loading configuration")?;
    let problems = config.validate();
    if !problems.is_empty() {
        bail!("invalid configuration: {}", problems.join("; "));
    }

    let Some(base) = cli.base.clone().or_else(|| config.crawl.base_path.clone()) else {
        bail!("no base path: pass --base or set crawl.base_path");
    };
    let Some(output) = cli.output.clone().or_else(|| config.crawl.output_path.clone()) else {
        bail!("no output path: pass --output or set crawl.output_path");
    };
    let date = cli.date.unwrap_or_else(|| Local::now().date_naive());

    let crawler = Crawler::new(config);
    let summary = crawler
        .crawl(&base, date, &output)
        .with_context(|| format!("crawling {}", base.display()))?;

    match cli.format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&summary)?),
        _ => print_text_report(&summary),
    }

    let worst = summary.worst_status();
    let code = if worst == Status::Error {
        2
    } else if summary.has_failures() || (cli.strict && worst == Status::Warning) {
        1
    } else {
        0
    };
    Ok(code)
}

fn print_text_report(summary: &CrawlSummary) {
    if summary.files.is_empty() && summary.failures.is_empty() {
        println!("No files found for this date");
        return;
    }

    for outcome in &summary.files {
        println!("{} ({})", outcome.unique_table, outcome.file.display());
        println!("  columns: {}", outcome.columns);
        if let Some(failure) = &outcome.read_failure {
            println!("  read failure: {}", failure);
        }
        if let Some(failure) = &outcome.metadata_failure {
            println!("  metadata table failure: {}", failure);
        }
        println!("  drift: {}", outcome.drift_status);
        for message in &outcome.drift_messages {
            println!("    - {}", message);
        }
        match &outcome.catalog_status {
            Some(result) => {
                println!("  catalog: {}", result.status);
                for message in &result.messages {
                    println!("    - {}", message);
                }
            }
            None => println!("  catalog: created"),
        }
    }

    for failure in &summary.failures {
        println!("{} FAILED: {}", failure.unique_table, failure.error);
    }

    println!();
    println!(
        "{} file(s), {} failed table(s), worst status {}",
        summary.files.len(),
        summary.failures.len(),
        summary.worst_status()
    );
}
