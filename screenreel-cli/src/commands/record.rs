//! Record command - capture one source until stopped

use anyhow::{bail, Context, Result};
use clap::Args;
use screenreel_core::{
    CaptureController, CaptureSource, ConfigFile, ControllerHandle, ControllerState, Notice,
    Platform, ScreenreelError, SessionId, SourceKind,
};
use std::path::PathBuf;
use std::time::Duration;
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{info, warn};

use super::{session_config, with_hint};

/// Arguments for the record command
#[derive(Args)]
pub struct RecordArgs {
    /// Source ID or list number from 'screenreel list' (default: first screen)
    source: Option<String>,

    /// Stop automatically after this many seconds
    #[arg(short, long)]
    duration: Option<u64>,

    /// Directory to save the recording in (default: Downloads)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Record video only
    #[arg(long)]
    no_audio: bool,
}

/// Record a source and save it as WebM
pub async fn record(args: RecordArgs, file: &ConfigFile) -> Result<()> {
    let mut config = session_config(file)?;
    if let Some(dir) = args.output {
        config = config.with_export_dir(dir);
    }
    if args.no_audio {
        config = config.with_audio(false);
    }

    println!("Screenreel - Recording\n");

    let platform = Platform::x11(&config);
    let (handle, task) = CaptureController::spawn(platform, config.clone());
    let mut notices = handle.subscribe_notices();

    let state = wait_for_listing(&handle).await?;
    if state.sources.is_empty() {
        let reason = state
            .notice
            .as_ref()
            .map(|n| n.message())
            .unwrap_or_else(|| "No capture sources found.".to_string());
        handle.shutdown().await.ok();
        bail!(reason);
    }

    let source = resolve_source(&state.sources, args.source.as_deref()).map_err(with_hint)?;
    println!("Source:     {} ({})", source.name, source.id);
    println!("Audio:      {}", if config.audio { "yes" } else { "no" });
    println!("Format:     {}", config.profile);
    println!("Saving to:  {}", config.export_dir.display());
    println!();

    handle.select_source(source.id.clone())?;
    let session = match handle.start().await {
        Ok(Some(session)) => session,
        Ok(None) => {
            let refused = start_refused(&handle.snapshot(), &source.id);
            handle.shutdown().await.ok();
            return Err(with_hint(refused)).context("Recording did not start");
        }
        Err(e) => {
            handle.shutdown().await.ok();
            return Err(with_hint(e)).context("Failed to start recording");
        }
    };

    match args.duration {
        Some(secs) => println!("Recording for {} seconds (Ctrl+C to stop early)...", secs),
        None => println!("Recording... press Ctrl+C to stop."),
    }

    let limit = args.duration.map(Duration::from_secs);
    let interrupted = tokio::select! {
        _ = signal::ctrl_c() => {
            info!("Ctrl+C received");
            false
        }
        _ = sleep_for(limit) => {
            info!("Duration reached");
            false
        }
        ended = wait_for_interruption(&mut notices, session) => ended,
    };

    if interrupted {
        println!("\nRecording stopped unexpectedly, saving what was captured...");
    } else {
        println!("\nStopping...");
        handle.stop().await?;
    }

    let outcome = wait_for_export(&mut notices, session).await;
    handle.shutdown().await?;
    if let Err(e) = task.await {
        warn!("Controller task failed: {}", e);
    }

    match outcome {
        Some(Notice::Exported { path, bytes, .. }) => {
            println!("Saved {} ({} bytes)", path.display(), bytes);
            Ok(())
        }
        Some(notice) => bail!(notice.message()),
        None => Err(with_hint(ScreenreelError::NoActiveSession))
            .context("Recording ended without being saved"),
    }
}

/// Wait for the first directory listing to finish
async fn wait_for_listing(handle: &ControllerHandle) -> Result<ControllerState> {
    let mut rx = handle.watch();
    let state = rx
        .wait_for(|s| s.directory_epoch > 0 && !s.loading_sources)
        .await
        .context("Capture controller stopped")?;
    Ok(state.clone())
}

/// Pick a source by id or 1-based list number, defaulting to the first screen
fn resolve_source<'a>(
    sources: &'a [CaptureSource],
    wanted: Option<&str>,
) -> Result<&'a CaptureSource, ScreenreelError> {
    let found = match wanted {
        None => sources
            .iter()
            .find(|s| s.kind == SourceKind::Screen)
            .or_else(|| sources.first()),
        Some(wanted) => match wanted.parse::<usize>() {
            Ok(n) if n >= 1 => sources.get(n - 1),
            _ => sources.iter().find(|s| s.id == wanted),
        },
    };

    found.ok_or_else(|| ScreenreelError::SourceNotFound(wanted.unwrap_or("screen").to_string()))
}

/// Why the controller declined a start request
fn start_refused(state: &ControllerState, source_id: &str) -> ScreenreelError {
    if state.session.is_recording() {
        ScreenreelError::SessionAlreadyRunning
    } else {
        // The selection was cleared by a newer listing
        ScreenreelError::SourceNotFound(source_id.to_string())
    }
}

async fn sleep_for(limit: Option<Duration>) {
    match limit {
        Some(limit) => tokio::time::sleep(limit).await,
        None => std::future::pending().await,
    }
}

/// Resolves with `true` if the session ends on its own
async fn wait_for_interruption(
    notices: &mut broadcast::Receiver<Notice>,
    session: SessionId,
) -> bool {
    loop {
        match notices.recv().await {
            Ok(Notice::RecordingInterrupted { session: s }) if s == session => return true,
            Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
            Err(broadcast::error::RecvError::Closed) => std::future::pending::<()>().await,
        }
    }
}

/// Wait for the export outcome of a session
async fn wait_for_export(
    notices: &mut broadcast::Receiver<Notice>,
    session: SessionId,
) -> Option<Notice> {
    loop {
        match notices.recv().await {
            Ok(notice) => {
                let done = matches!(
                    &notice,
                    Notice::Exported { session: s, .. } | Notice::ExportFailed { session: s, .. }
                        if *s == session
                );
                if done {
                    return Some(notice);
                }
            }
            Err(broadcast::error::RecvError::Lagged(_)) => continue,
            Err(broadcast::error::RecvError::Closed) => return None,
        }
    }
}
