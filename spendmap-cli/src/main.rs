//! spendmap CLI - enrich a bank export and explore it on a map

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use env_logger::Env;

mod commands;
mod output;
mod server;

use commands::{dashboard, preprocess};

/// spendmap - where does the money go?
#[derive(Parser)]
#[command(name = "spendmap", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Enrich a transaction export with running totals and coordinates
    Preprocess {
        /// Path to the exported CSV (`~` is expanded)
        file: PathBuf,
        /// Output the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Serve the interactive dashboard
    Dashboard {
        /// Enriched table to load (defaults to the configured output path)
        #[arg(long)]
        input: Option<PathBuf>,
        /// Port to listen on
        #[arg(long)]
        port: Option<u16>,
    },
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Preprocess { file, json } => preprocess::run(&file, json),
        Commands::Dashboard { input, port } => dashboard::run(input, port),
    }
}
