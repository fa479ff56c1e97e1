//! sheet_loader CLI - Export Google Spreadsheet sheets as CSV.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use sheet_loader::logging::init_tracing;
use sheet_loader::models::format_size;
use sheet_loader::presenter::{render_file, written_files};
use sheet_loader::{Config, SheetLoader, StdinConsent};

/// CLI tool for exporting every sheet of a Google Spreadsheet as CSV.
#[derive(Parser)]
#[command(name = "sheet_loader")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to a JSON configuration file.
    #[arg(long, short = 'c', global = true, env = "SHEET_LOADER_CONFIG")]
    config: Option<PathBuf>,

    /// Path to OAuth client credentials JSON file.
    #[arg(long, global = true, env = "SHEET_LOADER_CREDENTIALS")]
    credentials: Option<PathBuf>,

    /// Path of the cached token file.
    #[arg(long, global = true, env = "SHEET_LOADER_TOKEN")]
    token: Option<PathBuf>,

    /// Spreadsheet URL or ID.
    #[arg(long, short = 's', global = true, env = "SHEET_LOADER_SPREADSHEET")]
    spreadsheet: Option<String>,

    /// Enable debug logging.
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the sheets of the spreadsheet.
    List,

    /// Export every sheet to a CSV file.
    Export {
        /// Destination directory.
        #[arg(long, short = 't', env = "SHEET_LOADER_DOWNLOAD_DIR")]
        to: Option<PathBuf>,

        /// Save every sheet under this file name instead of the sheet title.
        #[arg(long, short = 'f')]
        file: Option<String>,

        /// Print each exported file as JSON.
        #[arg(long)]
        json: bool,

        /// Maximum number of simultaneous downloads.
        #[arg(long)]
        max_concurrent: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose).context("Failed to initialize logging")?;

    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("Failed to load config from {:?}", path))?,
        None => Config::default(),
    };

    if let Some(credentials) = cli.credentials {
        config.credentials_path = credentials;
    }
    if let Some(token) = cli.token {
        config.token_path = token;
    }
    if cli.spreadsheet.is_some() {
        config.spreadsheet_id = cli.spreadsheet;
    }

    match cli.command {
        Commands::List => {
            config.require_spreadsheet_id()?;
            let loader = build_loader(&config)?;

            let sheets = loader
                .list_sheets(&config)
                .await
                .context("Failed to list sheets")?;

            if sheets.is_empty() {
                println!("No sheets found.");
            } else {
                println!("{:<12} {}", "ID", "TITLE");
                println!("{}", "-".repeat(40));
                for sheet in sheets {
                    println!("{:<12} {}", sheet.id, sheet.title);
                }
            }
        }

        Commands::Export {
            to,
            file,
            json,
            max_concurrent,
        } => {
            if to.is_some() {
                config.destination_dir = to;
            }
            if file.is_some() {
                config.destination_file = file;
            }
            if let Some(max_concurrent) = max_concurrent {
                config.max_concurrent = max_concurrent;
            }
            config.print_json |= json;

            config.validate()?;
            let loader = build_loader(&config)?;

            let outcomes = loader
                .load_data(&config)
                .await
                .context("Failed to export spreadsheet")?;

            let total = outcomes.len();
            let mut exported = 0;
            for (idx, outcome) in outcomes.iter().enumerate() {
                match &outcome.error {
                    None => {
                        exported += 1;
                        eprintln!(
                            "[{}/{}] {} -> {:?} OK ({})",
                            idx + 1,
                            total,
                            outcome.sheet.title,
                            outcome.destination,
                            format_size(outcome.bytes_written)
                        );
                    }
                    Some(e) => {
                        eprintln!(
                            "[{}/{}] {} -> {:?} FAILED",
                            idx + 1,
                            total,
                            outcome.sheet.title,
                            outcome.destination
                        );
                        eprintln!("  Error: {}", e);
                    }
                }
            }

            if config.print_json {
                for path in written_files(&outcomes) {
                    match render_file(path) {
                        Ok(rendered) => println!("{}", rendered),
                        Err(e) => eprintln!("Error while printing {:?}: {}", path, e),
                    }
                }
            }

            if exported == 0 {
                anyhow::bail!("No sheets were exported");
            }
            eprintln!("Done. {}/{} sheet(s) exported.", exported, total);
        }
    }

    Ok(())
}

fn build_loader(config: &Config) -> Result<SheetLoader> {
    SheetLoader::from_config(config, Arc::new(StdinConsent)).with_context(|| {
        format!(
            "Failed to load credentials from {:?}",
            config.credentials_path
        )
    })
}
