//! List sources command

use anyhow::Result;
use clap::Args;
use screenreel_core::{ConfigFile, Platform, SourceKind};
use serde::Serialize;

use super::{session_config, with_hint};

/// Arguments for the list command
#[derive(Args)]
pub struct ListArgs {
    /// Only list one kind of source (screen, window)
    #[arg(short, long)]
    kind: Option<SourceKind>,

    /// Print sources as JSON, thumbnails included as data URLs
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct SourceRow<'a> {
    index: usize,
    #[serde(flatten)]
    source: &'a screenreel_core::CaptureSource,
}

/// List available capture sources
pub async fn list(args: ListArgs, file: &ConfigFile) -> Result<()> {
    let mut config = session_config(file)?;
    if let Some(kind) = args.kind {
        config.directory.kinds = vec![kind];
    }

    let platform = Platform::x11(&config);
    let sources = platform
        .directory
        .list_sources(&config.directory)
        .await
        .map_err(with_hint)?;

    if args.json {
        let rows: Vec<_> = sources
            .iter()
            .enumerate()
            .map(|(i, source)| SourceRow {
                index: i + 1,
                source,
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    println!("Screenreel - Available Capture Sources\n");

    if sources.is_empty() {
        println!("No sources found.");
        return Ok(());
    }

    println!(
        "{:<4} {:<22} {:<36} {:<8} {}",
        "#", "ID", "Name", "Type", "Preview"
    );
    println!("{}", "-".repeat(80));

    for (i, source) in sources.iter().enumerate() {
        let preview = if source.thumbnail.is_empty() {
            "-".to_string()
        } else {
            format!("{}x{}", source.thumbnail.width, source.thumbnail.height)
        };

        println!(
            "{:<4} {:<22} {:<36} {:<8} {}",
            i + 1,
            source.id,
            truncate(&source.name, 34),
            source.kind,
            preview
        );
    }

    println!("\nRecord one with 'screenreel record <ID or #>'.");

    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max - 3).collect();
        format!("{}...", head)
    }
}
