//! Config command - inspect configuration

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use screenreel_core::config::{sample_config, ConfigFile};
use std::path::Path;

use super::session_config;

/// Arguments for the config command
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show the path to the config file
    Path,

    /// Show the config file and the settings in effect
    Show,

    /// Print a sample configuration to stdout
    Sample,
}

/// Run config subcommand
pub fn config(args: ConfigArgs, explicit: Option<&Path>, file: &ConfigFile) -> Result<()> {
    let path = explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(ConfigFile::default_path);

    match args.command {
        ConfigCommand::Path => {
            println!("{}", path.display());
            if path.exists() {
                println!("(file exists)");
            } else {
                println!("(file does not exist)");
            }
        }
        ConfigCommand::Show => show(&path, file)?,
        ConfigCommand::Sample => {
            print!("{}", sample_config());
        }
    }

    Ok(())
}

fn show(path: &Path, file: &ConfigFile) -> Result<()> {
    if path.exists() {
        let content = std::fs::read_to_string(path).context("Failed to read config file")?;
        println!("Configuration file: {}\n", path.display());
        println!("{}", content);
    } else {
        println!("No configuration file found at: {}", path.display());
        println!();
        println!("Using default settings. To customize, save the sample:");
        println!("  screenreel config sample > {}", path.display());
    }

    let effective = session_config(file)?;
    println!();
    println!("Effective settings:");
    println!("{}", serde_json::to_string_pretty(&effective)?);

    Ok(())
}
