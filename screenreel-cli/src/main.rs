//! Screenreel CLI
//!
//! Record a screen or window of an X11 desktop to a WebM file.
//!
//! # Usage
//!
//! ```bash
//! # List available sources
//! screenreel list
//!
//! # Record the first screen until Ctrl+C
//! screenreel record
//!
//! # Record a window for 30 seconds without audio
//! screenreel record window:0x01e00003 --duration 30 --no-audio
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use screenreel_core::ConfigFile;
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Screenreel - screen and window recording to WebM
#[derive(Parser)]
#[command(name = "screenreel")]
#[command(author = "GhostKellz")]
#[command(version)]
#[command(about = "Record screens and windows to WebM", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Read configuration from this file instead of the default location
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Subcommand to run
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available capture sources
    #[command(alias = "ls")]
    List(commands::ListArgs),

    /// Record a source and save it as WebM
    Record(commands::RecordArgs),

    /// Show system information and backend status
    Info,

    /// Inspect configuration
    Config(commands::ConfigArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(format!("screenreel={}", level).parse()?),
        )
        .with_target(false)
        .init();

    let file = ConfigFile::load_or_default(cli.config.as_deref());

    // Run the appropriate command
    match cli.command {
        Commands::List(args) => commands::list(args, &file).await?,
        Commands::Record(args) => commands::record(args, &file).await?,
        Commands::Info => commands::info(&file).await?,
        Commands::Config(args) => commands::config(args, cli.config.as_deref(), &file)?,
    }

    Ok(())
}
