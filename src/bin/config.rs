//! Catalog Configuration CLI
//!
//! Usage:
//!   catalog-config show
//!   catalog-config init --path catalog.toml
//!   catalog-config validate --config catalog.toml

use std::path::Path;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use drift_catalog::CatalogConfig;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "catalog-config")]
#[command(about = "Show, initialize or validate catalog configuration")]
struct Cli {
    /// Configuration file layered over the default locations
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the effective configuration as TOML
    Show,

    /// Write the default configuration to a file
    Init {
        #[arg(short, long, default_value = "catalog.toml")]
        path: String,

        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },

    /// Check the effective configuration
    Validate,
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
    match cli.command {
        Commands::Show => {
            let config = CatalogConfig::load_from(cli.config.as_deref()).context("loading configuration")?;
            print!("{}", toml::to_string_pretty(&config)?);
        }
        Commands::Init { path, force } => {
            if Path::new(&path).exists() && !force {
                bail!("{} already exists (use --force to replace it)", path);
            }
            CatalogConfig::default()
                .save(&path)
                .with_context(|| format!("writing {}", path))?;
            println!("Wrote default configuration to {}", path);
        }
        Commands::Validate => {
            let config = CatalogConfig::load_from(cli.config.as_deref()).context("loading configuration")?;
            let problems = config.validate();
            if !problems.is_empty() {
                for problem in &problems {
                    eprintln!("  - {}", problem);
                }
                bail!("{} configuration problem(s)", problems.len());
            }
            println!("Configuration is valid");
        }
    }

    Ok(())
}
