//! Info command - show system information and backend status

use anyhow::Result;
use screenreel_core::capture::ffmpeg::{available_encoders, video_encoder};
use screenreel_core::capture::x11::{list_monitors, tool_available};
use screenreel_core::ConfigFile;

use super::session_config;

/// Show system information and backend status
pub async fn info(file: &ConfigFile) -> Result<()> {
    let config = session_config(file)?;
    let ffmpeg = &config.ffmpeg;

    println!("Screenreel - System Information\n");

    // Display server
    println!("Display:");
    println!("  X11 display: {}", ffmpeg.display);
    match std::env::var("XDG_SESSION_TYPE") {
        Ok(session) if session == "wayland" => {
            println!("  Session:     wayland (only XWayland windows can be captured)");
        }
        Ok(session) => println!("  Session:     {}", session),
        Err(_) => println!("  Session:     unknown"),
    }

    println!();

    // External tools
    println!("Tools:");
    let tools = [
        (ffmpeg.binary.as_str(), "-version", "recording and thumbnails"),
        ("xrandr", "--version", "screen listing"),
        ("wmctrl", "-m", "window listing"),
    ];
    let mut missing = Vec::new();
    for (tool, version_arg, purpose) in tools {
        let ok = tool_available(tool, version_arg).await;
        let icon = if ok { "[OK]" } else { "[!!]" };
        println!("  {} {:<10} {}", icon, tool, purpose);
        if !ok {
            missing.push(tool);
        }
    }
    if !missing.is_empty() {
        println!();
        println!("  Install the missing tools with your package manager, e.g.:");
        println!("    sudo apt install ffmpeg x11-xserver-utils wmctrl");
    }

    println!();

    // Encoders
    println!("Encoding:");
    println!("  Profile:     {}", config.profile);
    let wanted = config.profile.video_codec().and_then(video_encoder);
    match (available_encoders(ffmpeg).await, wanted) {
        (Some(encoders), Some(wanted)) => {
            let has = |name: &str| encoders.iter().any(|e| e == name);
            println!(
                "  Video:       {} ({})",
                wanted,
                if has(wanted) { "available" } else { "missing" }
            );
            println!(
                "  Audio:       libopus ({})",
                if has("libopus") { "available" } else { "missing" }
            );
        }
        (None, _) => println!("  Could not query ffmpeg encoders"),
        (_, None) => println!("  Profile codec is not supported"),
    }

    println!();

    // Screens
    println!("Screens:");
    match list_monitors(&ffmpeg.display).await {
        Ok(monitors) if monitors.is_empty() => println!("  none found"),
        Ok(monitors) => {
            for monitor in monitors {
                println!(
                    "  {:<10} {} {}{}",
                    monitor.source_id(),
                    monitor.name,
                    monitor.region,
                    if monitor.primary { " (primary)" } else { "" }
                );
            }
        }
        Err(e) => println!("  {}", e),
    }

    println!();

    // Capture settings
    println!("Capture:");
    println!(
        "  Bounds:      {}x{} .. {}x{}",
        config.video.min_width,
        config.video.min_height,
        config.video.max_width,
        config.video.max_height
    );
    println!(
        "  Frame rate:  {} fps (max {})",
        config.video.frame_rate.ideal, config.video.frame_rate.max
    );
    println!(
        "  Audio:       {}",
        if config.audio {
            ffmpeg.audio_device.as_str()
        } else {
            "off"
        }
    );
    println!("  Saving to:   {}", config.export_dir.display());

    Ok(())
}
