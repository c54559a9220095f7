//! heapview CLI - drive a memory profiler session from the terminal.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod workload;

#[derive(Parser)]
#[command(name = "heapview")]
#[command(about = "Heap snapshots, growth detection and object inspection", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (defaults to ./heapview.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Output format (text, json)
    #[arg(long, global = true, default_value = "text")]
    format: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scripted leak hunt over a synthetic workload
    Demo {
        /// Workload rounds between the baseline and the second capture
        #[arg(long, default_value = "3")]
        rounds: usize,
        /// Requests served per round
        #[arg(long, default_value = "200")]
        requests: usize,
        /// Reference chain depth for the final graph
        #[arg(long, default_value = "3")]
        depth: usize,
    },
    /// Read panel actions from stdin against a live session
    Shell,
}

fn main() -> Result<()> {
    // Initialize tracing subscriber
    // Respects RUST_LOG environment variable (e.g., RUST_LOG=debug)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let format = commands::OutputFormat::parse(&cli.format)?;
    let config = commands::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Demo {
            rounds,
            requests,
            depth,
        } => commands::demo::run(config, format, rounds, requests, depth),
        Commands::Shell => commands::shell::run(config, format),
    }
}
