// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Protobench CLI
//!
//! Command-line interface for running protocol benchmarks and managing the
//! stored results.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use protobench_core::ExportFormat;
use tracing_subscriber::EnvFilter;

mod commands;
mod dashboard;
mod error;
mod metrics;

use commands::Context;
use error::CliResult;

/// Protobench - head-to-head latency benchmarks for protocol service pairs
#[derive(Parser)]
#[command(name = "protobench")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path (defaults to protobench.yaml, else built-in adapters)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Metrics database path (overrides storage.database)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Launch service pairs, benchmark them and store the results
    Run {
        /// Protocol to run (repeatable; default: all configured)
        #[arg(short, long = "protocol")]
        protocols: Vec<String>,

        /// Directory for benchmark artifacts
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },

    /// Import legacy artifact files or an exported JSON run document
    Import {
        /// Directory holding `<protocol>_out.txt` artifacts
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,

        /// Exported JSON document to import instead of scanning a directory
        #[arg(long)]
        run_file: Option<PathBuf>,
    },

    /// List stored runs, newest first
    List {
        /// Only runs of this protocol
        #[arg(short, long)]
        protocol: Option<String>,

        #[arg(short, long, default_value_t = 20)]
        limit: usize,

        #[arg(long, default_value_t = 0)]
        offset: usize,
    },

    /// Show store totals
    Stats,

    /// Export one run
    Export {
        run_id: String,

        /// csv, json, excel or html
        #[arg(short, long, default_value = "json")]
        format: ExportFormat,

        /// Output file (default: exports/<run_id>.<ext>)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Export the latest run of every protocol
    ExportAll {
        /// csv, json, excel or html
        #[arg(short, long, default_value = "excel")]
        format: ExportFormat,

        /// Output file (default: exports/all_benchmarks.<ext>)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Delete a run and its samples
    Delete { run_id: String },

    /// Serve the read API for the dashboard
    Dashboard {
        #[arg(long, default_value = "0.0.0.0")]
        host: String,

        #[arg(short, long, default_value_t = 8888)]
        port: u16,
    },

    /// List configured protocol adapters
    Protocols,

    /// Validate a configuration file
    Validate {
        /// Path to the configuration file (default: the discovered configuration)
        file: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = dispatch(cli).await {
        eprintln!("✗ {}", e);
        std::process::exit(1);
    }
}

async fn dispatch(cli: Cli) -> CliResult<()> {
    if let Commands::Validate { file } = &cli.command {
        return commands::validate::execute(file.as_deref().or(cli.config.as_deref()));
    }

    let ctx = Context::load(cli.config.as_deref(), cli.db)?;

    match cli.command {
        Commands::Run {
            protocols,
            output_dir,
        } => commands::run::execute(&ctx, &protocols, output_dir).await,
        Commands::Import { dir, run_file } => {
            commands::import::execute(&ctx, &dir, run_file.as_deref())
        }
        Commands::List {
            protocol,
            limit,
            offset,
        } => commands::list::execute(&ctx, protocol, limit, offset),
        Commands::Stats => commands::stats::execute(&ctx),
        Commands::Export {
            run_id,
            format,
            output,
        } => commands::export::execute(&ctx, &run_id, format, output),
        Commands::ExportAll { format, output } => {
            commands::export::execute_all(&ctx, format, output)
        }
        Commands::Delete { run_id } => commands::delete::execute(&ctx, &run_id),
        Commands::Dashboard { host, port } => commands::dashboard::execute(&ctx, &host, port).await,
        Commands::Protocols => commands::protocols::execute(&ctx),
        Commands::Validate { .. } => Ok(()),
    }
}
