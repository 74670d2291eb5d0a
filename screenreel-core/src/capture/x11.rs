//! X11 source directory and stream acquisition
//!
//! Screens are listed with `xrandr --listmonitors` and windows with
//! `wmctrl -lG`. Each source maps to a rectangle of the root window, which
//! is what ffmpeg's `x11grab` device captures.
//!
//! Source ids are `screen:<index>` and `window:<X11 window id>`.

use async_trait::async_trait;
use std::any::Any;
use std::process::Output;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::process::Command;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::ffmpeg::grab_thumbnail;
use super::{MediaStream, SourceDirectory, StreamAcquirer};
use crate::config::{DirectoryQuery, FfmpegSettings, StreamRequest};
use crate::error::{Result, ScreenreelError};
use crate::types::{CaptureSource, SourceKind, Thumbnail, TrackInfo, TrackKind};

/// Prefix of screen source ids
pub const SCREEN_PREFIX: &str = "screen:";

/// Prefix of window source ids
pub const WINDOW_PREFIX: &str = "window:";

/// How long a single thumbnail grab may take
const THUMBNAIL_TIMEOUT: Duration = Duration::from_secs(3);

static STREAM_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Rectangle on the X11 root window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    /// Smallest region covering both
    pub fn union(self, other: Region) -> Region {
        let left = self.x.min(other.x);
        let top = self.y.min(other.y);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        Region {
            x: left,
            y: top,
            width: (right - left as i64) as u32,
            height: (bottom - top as i64) as u32,
        }
    }

    /// Part of this region inside `bounds`, or `None` if they do not overlap
    pub fn clip_to(self, bounds: Region) -> Option<Region> {
        let left = self.x.max(bounds.x);
        let top = self.y.max(bounds.y);
        let right = self.right().min(bounds.right());
        let bottom = self.bottom().min(bounds.bottom());
        if right <= left as i64 || bottom <= top as i64 {
            return None;
        }
        Some(Region {
            x: left,
            y: top,
            width: (right - left as i64) as u32,
            height: (bottom - top as i64) as u32,
        })
    }

    fn right(&self) -> i64 {
        self.x as i64 + self.width as i64
    }

    fn bottom(&self) -> i64 {
        self.y as i64 + self.height as i64
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}+{}+{}", self.width, self.height, self.x, self.y)
    }
}

/// A monitor reported by xrandr
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Monitor {
    /// Index in xrandr's listing
    pub index: u32,
    /// Output name, e.g. `eDP-1`
    pub name: String,
    /// Whether this is the primary monitor
    pub primary: bool,
    /// Area on the root window
    pub region: Region,
}

impl Monitor {
    /// Source id for this monitor
    pub fn source_id(&self) -> String {
        format!("{}{}", SCREEN_PREFIX, self.index)
    }

    /// Display name, numbered from 1 like desktop pickers do
    pub fn display_name(&self) -> String {
        format!("Screen {} ({})", self.index + 1, self.name)
    }
}

/// A top-level window reported by wmctrl
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Window {
    /// X11 window id, e.g. `0x01e00003`
    pub xid: String,
    /// Window title
    pub title: String,
    /// Area on the root window
    pub region: Region,
}

impl Window {
    /// Source id for this window
    pub fn source_id(&self) -> String {
        format!("{}{}", WINDOW_PREFIX, self.xid)
    }
}

/// Parse the output of `xrandr --listmonitors`
///
/// ```text
/// Monitors: 2
///  0: +*eDP-1 1920/344x1080/193+0+0  eDP-1
///  1: +HDMI-1 2560/597x1440/336+1920+0  HDMI-1
/// ```
pub fn parse_monitors(output: &str) -> Vec<Monitor> {
    output
        .lines()
        .skip_while(|line| !line.trim_start().starts_with("Monitors:"))
        .skip(1)
        .filter_map(parse_monitor_line)
        .collect()
}

/// Visible part of the root window, covering every monitor
pub fn root_bounds(monitors: &[Monitor]) -> Option<Region> {
    monitors.iter().map(|m| m.region).reduce(Region::union)
}

fn parse_monitor_line(line: &str) -> Option<Monitor> {
    let (fields, _) = split_fields(line, 4)?;
    let index = fields[0].strip_suffix(':')?.parse().ok()?;
    let flags = fields[1];
    let region = parse_monitor_geometry(fields[2])?;

    Some(Monitor {
        index,
        name: fields[3].to_string(),
        primary: flags.contains('*'),
        region,
    })
}

/// Parse `W/mmWxH/mmH+X+Y`
fn parse_monitor_geometry(geometry: &str) -> Option<Region> {
    let (w_part, rest) = geometry.split_once('x')?;
    let width = w_part.split('/').next()?.parse().ok()?;

    let mut parts = rest.split('+');
    let height = parts.next()?.split('/').next()?.parse().ok()?;
    let x = parts.next()?.parse().ok()?;
    let y = parts.next()?.parse().ok()?;

    Some(Region {
        x,
        y,
        width,
        height,
    })
}

/// Parse the output of `wmctrl -lG`
///
/// ```text
/// 0x01e00003  0 64   48   1280 720  host Terminal - ~/src
/// ```
///
/// Sticky windows (desktop `-1`, e.g. panels and docks) are skipped, as are
/// windows with no area.
pub fn parse_windows(output: &str) -> Vec<Window> {
    output.lines().filter_map(parse_window_line).collect()
}

fn parse_window_line(line: &str) -> Option<Window> {
    let (fields, title) = split_fields(line, 7)?;
    let desktop: i32 = fields[1].parse().ok()?;
    if desktop < 0 {
        return None;
    }

    let region = Region {
        x: fields[2].parse().ok()?,
        y: fields[3].parse().ok()?,
        width: fields[4].parse().ok()?,
        height: fields[5].parse().ok()?,
    };
    if region.width == 0 || region.height == 0 {
        return None;
    }

    let title = if title.is_empty() {
        "Untitled window".to_string()
    } else {
        title.to_string()
    };

    Some(Window {
        xid: fields[0].to_string(),
        title,
        region,
    })
}

/// Take `n` whitespace-separated fields and return them with the remainder
fn split_fields(line: &str, n: usize) -> Option<(Vec<&str>, &str)> {
    let mut fields = Vec::with_capacity(n);
    let mut rest = line.trim_start();
    for _ in 0..n {
        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        if end == 0 {
            return None;
        }
        fields.push(&rest[..end]);
        rest = rest[end..].trim_start();
    }
    Some((fields, rest.trim_end()))
}

async fn run_tool(program: &str, args: &[&str]) -> std::io::Result<Output> {
    Command::new(program)
        .args(args)
        .kill_on_drop(true)
        .output()
        .await
}

/// Query monitors through xrandr
pub async fn list_monitors(display: &str) -> Result<Vec<Monitor>> {
    let output = run_tool("xrandr", &["--display", display, "--listmonitors"])
        .await
        .map_err(|e| ScreenreelError::directory(format!("Failed to run xrandr: {}", e)))?;

    if !output.status.success() {
        return Err(ScreenreelError::directory(format!(
            "xrandr failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    Ok(parse_monitors(&String::from_utf8_lossy(&output.stdout)))
}

/// Query top-level windows through wmctrl
pub async fn list_windows(display: &str) -> Result<Vec<Window>> {
    let output = Command::new("wmctrl")
        .arg("-lG")
        .env("DISPLAY", display)
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| ScreenreelError::directory(format!("Failed to run wmctrl: {}", e)))?;

    if !output.status.success() {
        return Err(ScreenreelError::directory(format!(
            "wmctrl failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    Ok(parse_windows(&String::from_utf8_lossy(&output.stdout)))
}

/// Check whether a program can be executed
pub async fn tool_available(program: &str, version_arg: &str) -> bool {
    run_tool(program, &[version_arg])
        .await
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Lists X11 screens and windows with thumbnails
pub struct X11SourceDirectory {
    settings: FfmpegSettings,
}

impl X11SourceDirectory {
    /// Create a directory for the configured display
    pub fn new(settings: FfmpegSettings) -> Self {
        Self { settings }
    }
}

async fn preview(settings: &FfmpegSettings, region: Region, bounds: (u32, u32)) -> Thumbnail {
    let grab = grab_thumbnail(settings, region, bounds);
    match tokio::time::timeout(THUMBNAIL_TIMEOUT, grab).await {
        Ok(Ok(thumbnail)) => thumbnail,
        Ok(Err(e)) => {
            debug!("No thumbnail for {}: {}", region, e);
            Thumbnail::default()
        }
        Err(_) => {
            debug!("Thumbnail grab for {} timed out", region);
            Thumbnail::default()
        }
    }
}

/// Grab thumbnails for all regions at once, in input order
///
/// Regions that are `None` (off screen) get an empty thumbnail.
async fn grab_previews(
    settings: &FfmpegSettings,
    regions: &[Option<Region>],
    bounds: (u32, u32),
) -> Vec<Thumbnail> {
    let mut thumbnails = vec![Thumbnail::default(); regions.len()];
    let mut grabs = JoinSet::new();

    for (index, region) in regions.iter().enumerate() {
        let Some(region) = *region else { continue };
        let settings = settings.clone();
        grabs.spawn(async move { (index, preview(&settings, region, bounds).await) });
    }

    while let Some(joined) = grabs.join_next().await {
        match joined {
            Ok((index, thumbnail)) => thumbnails[index] = thumbnail,
            Err(e) => warn!("Thumbnail task failed: {}", e),
        }
    }
    thumbnails
}

#[async_trait]
impl SourceDirectory for X11SourceDirectory {
    async fn list_sources(&self, query: &DirectoryQuery) -> Result<Vec<CaptureSource>> {
        let x_display = &self.settings.display;
        let monitors = if query.wants(SourceKind::Screen) {
            list_monitors(x_display).await?
        } else {
            // Only needed to clip windows
            list_monitors(x_display).await.unwrap_or_else(|e| {
                debug!("Screen bounds unavailable: {}", e);
                Vec::new()
            })
        };
        let root = root_bounds(&monitors);

        let mut sources = Vec::new();
        let mut regions = Vec::new();

        for kind in &query.kinds {
            match kind {
                SourceKind::Screen => {
                    for monitor in &monitors {
                        sources.push(CaptureSource::new(
                            monitor.source_id(),
                            monitor.display_name(),
                            SourceKind::Screen,
                        ));
                        regions.push(Some(monitor.region));
                    }
                }
                SourceKind::Window => {
                    let windows = match list_windows(x_display).await {
                        Ok(windows) => windows,
                        // Screens alone are still a usable listing
                        Err(e) if query.wants(SourceKind::Screen) => {
                            warn!("Window listing unavailable: {}", e);
                            Vec::new()
                        }
                        Err(e) => return Err(e),
                    };
                    for window in windows {
                        regions.push(visible(window.region, root));
                        sources.push(CaptureSource::new(
                            window.source_id(),
                            window.title,
                            SourceKind::Window,
                        ));
                    }
                }
            }
        }

        let thumbnails = grab_previews(&self.settings, &regions, query.preview_size).await;
        let sources: Vec<CaptureSource> = sources
            .into_iter()
            .zip(thumbnails)
            .map(|(source, thumbnail)| source.with_thumbnail(thumbnail))
            .collect();

        debug!("Listed {} sources on {}", sources.len(), x_display);
        Ok(sources)
    }
}

/// Clip a region to the root window
///
/// Without known screen bounds only the negative offsets are cut off.
fn visible(region: Region, root: Option<Region>) -> Option<Region> {
    let root = root.unwrap_or(Region {
        x: 0,
        y: 0,
        width: i32::MAX as u32,
        height: i32::MAX as u32,
    });
    region.clip_to(root)
}

/// Look up the capture rectangle of a source id
pub async fn resolve_region(display: &str, source_id: &str) -> Result<(Region, String)> {
    if let Some(index) = source_id.strip_prefix(SCREEN_PREFIX) {
        let index: u32 = index.parse().map_err(|_| {
            ScreenreelError::acquisition(format!("Invalid screen id: {}", source_id))
        })?;
        let monitors = list_monitors(display)
            .await
            .map_err(|e| ScreenreelError::acquisition(e.to_string()))?;
        return monitors
            .into_iter()
            .find(|m| m.index == index)
            .map(|m| (m.region, m.display_name()))
            .ok_or_else(|| {
                ScreenreelError::acquisition(format!("Screen {} is no longer available", source_id))
            });
    }

    if let Some(xid) = source_id.strip_prefix(WINDOW_PREFIX) {
        let windows = list_windows(display)
            .await
            .map_err(|e| ScreenreelError::acquisition(e.to_string()))?;
        let window = windows
            .into_iter()
            .find(|w| w.xid.eq_ignore_ascii_case(xid))
            .ok_or_else(|| {
                ScreenreelError::acquisition(format!("Window {} is no longer available", source_id))
            })?;

        // x11grab rejects rectangles that leave the root window
        let root = match list_monitors(display).await {
            Ok(monitors) => root_bounds(&monitors),
            Err(e) => {
                debug!("Screen bounds unavailable, not clipping {}: {}", source_id, e);
                None
            }
        };
        let region = visible(window.region, root).ok_or_else(|| {
            ScreenreelError::acquisition(format!("Window {} is off screen", source_id))
        })?;
        return Ok((region, window.title));
    }

    Err(ScreenreelError::acquisition(format!(
        "Unrecognized source id: {}",
        source_id
    )))
}

/// Grants streams over X11 regions, recorded by ffmpeg
pub struct X11StreamAcquirer {
    settings: FfmpegSettings,
}

impl X11StreamAcquirer {
    /// Create an acquirer for the configured display
    pub fn new(settings: FfmpegSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl StreamAcquirer for X11StreamAcquirer {
    async fn acquire(&self, request: &StreamRequest) -> Result<Box<dyn MediaStream>> {
        if !tool_available(&self.settings.binary, "-version").await {
            return Err(ScreenreelError::acquisition(format!(
                "{} is not installed or not executable",
                self.settings.binary
            )));
        }

        let (region, label) = resolve_region(&self.settings.display, &request.target_id).await?;
        let output_size = request.video.fit(region.width, region.height);
        let frame_rate = request.video.frame_rate.ideal.min(request.video.frame_rate.max);

        let audio_device = request.audio.then(|| self.settings.audio_device.clone());

        let stream = X11Stream::new(
            request.target_id.clone(),
            label,
            self.settings.display.clone(),
            region,
            output_size,
            frame_rate,
            audio_device,
        );

        info!(
            "Acquired {} for {}: {} -> {}x{} @ {}fps",
            stream.id(),
            request.target_id,
            region,
            output_size.0,
            output_size.1,
            frame_rate
        );

        Ok(Box::new(stream))
    }
}

/// A stream over one X11 region, with optional PulseAudio audio
///
/// No device is opened until a recorder starts ffmpeg; stopping the tracks
/// tells that ffmpeg process to terminate.
pub struct X11Stream {
    id: String,
    source_id: String,
    label: String,
    display: String,
    region: Region,
    output_size: (u32, u32),
    frame_rate: u32,
    audio_device: Option<String>,
    stopped: AtomicBool,
    release_tx: watch::Sender<bool>,
}

impl X11Stream {
    /// Create a stream description
    pub fn new(
        source_id: String,
        label: String,
        display: String,
        region: Region,
        output_size: (u32, u32),
        frame_rate: u32,
        audio_device: Option<String>,
    ) -> Self {
        let (release_tx, _) = watch::channel(false);
        Self {
            id: format!("x11-stream-{}", STREAM_COUNTER.fetch_add(1, Ordering::SeqCst)),
            source_id,
            label,
            display,
            region,
            output_size,
            frame_rate,
            audio_device,
            stopped: AtomicBool::new(false),
            release_tx,
        }
    }

    /// Source this stream is bound to
    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    /// X11 display
    pub fn display(&self) -> &str {
        &self.display
    }

    /// Captured rectangle
    pub fn region(&self) -> Region {
        self.region
    }

    /// Encoded frame size
    pub fn output_size(&self) -> (u32, u32) {
        self.output_size
    }

    /// Capture frame rate
    pub fn frame_rate(&self) -> u32 {
        self.frame_rate
    }

    /// PulseAudio source, if audio was requested
    pub fn audio_device(&self) -> Option<&str> {
        self.audio_device.as_deref()
    }

    /// Whether the tracks have been stopped
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Receiver that flips to `true` when the tracks are stopped
    pub fn release_signal(&self) -> watch::Receiver<bool> {
        self.release_tx.subscribe()
    }
}

impl MediaStream for X11Stream {
    fn id(&self) -> &str {
        &self.id
    }

    fn tracks(&self) -> Vec<TrackInfo> {
        let mut tracks = vec![TrackInfo::new(TrackKind::Video, self.label.clone())];
        if let Some(device) = &self.audio_device {
            tracks.push(TrackInfo::new(TrackKind::Audio, device.clone()));
        }
        tracks
    }

    fn stop_tracks(&self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        self.release_tx.send_replace(true);
        info!("Stopped tracks of {} ({})", self.id, self.source_id);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const XRANDR: &str = "Monitors: 2
 0: +*eDP-1 1920/344x1080/193+0+0  eDP-1
 1: +HDMI-1 2560/597x1440/336+1920+0  HDMI-1
";

    const WMCTRL: &str = "0x01e00003  0 64   48   1280 720  host Terminal - ~/src
0x02200007 -1 0    0    1920 32   host Top Panel
0x03a00001  1 100  100  801  601  host
0x03c00002  0 0    0    0    0    host Hidden
";

    #[test]
    fn test_parse_monitors() {
        let monitors = parse_monitors(XRANDR);
        assert_eq!(monitors.len(), 2);

        assert_eq!(monitors[0].index, 0);
        assert_eq!(monitors[0].name, "eDP-1");
        assert!(monitors[0].primary);
        assert_eq!(
            monitors[0].region,
            Region {
                x: 0,
                y: 0,
                width: 1920,
                height: 1080
            }
        );

        assert_eq!(monitors[1].source_id(), "screen:1");
        assert_eq!(monitors[1].display_name(), "Screen 2 (HDMI-1)");
        assert!(!monitors[1].primary);
        assert_eq!(monitors[1].region.x, 1920);
        assert_eq!(monitors[1].region.width, 2560);
    }

    #[test]
    fn test_parse_monitors_ignores_garbage() {
        assert!(parse_monitors("").is_empty());
        assert!(parse_monitors("Monitors: 1\n 0: broken\n").is_empty());
    }

    #[test]
    fn test_parse_windows() {
        let windows = parse_windows(WMCTRL);
        assert_eq!(windows.len(), 2);

        assert_eq!(windows[0].xid, "0x01e00003");
        assert_eq!(windows[0].title, "Terminal - ~/src");
        assert_eq!(windows[0].source_id(), "window:0x01e00003");
        assert_eq!(
            windows[0].region,
            Region {
                x: 64,
                y: 48,
                width: 1280,
                height: 720
            }
        );

        assert_eq!(windows[1].title, "Untitled window");
        assert_eq!(windows[1].region.width, 801);
    }

    #[test]
    fn test_split_fields_keeps_remainder() {
        let (fields, rest) = split_fields("  a  b   c d e ", 2).unwrap();
        assert_eq!(fields, vec!["a", "b"]);
        assert_eq!(rest, "c d e");
        assert!(split_fields("a", 2).is_none());
    }

    #[test]
    fn test_stream_tracks_and_release() {
        let stream = X11Stream::new(
            "screen:0".into(),
            "Screen 1 (eDP-1)".into(),
            ":0".into(),
            Region {
                x: 0,
                y: 0,
                width: 1920,
                height: 1080,
            },
            (1920, 1080),
            30,
            Some("default".into()),
        );
        let tracks = stream.tracks();
        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].kind, TrackKind::Video);
        assert_eq!(tracks[1].kind, TrackKind::Audio);

        let signal = stream.release_signal();
        assert!(!*signal.borrow());
        stream.stop_tracks();
        stream.stop_tracks();
        assert!(stream.is_stopped());
        assert!(*signal.borrow());
    }

    fn region(x: i32, y: i32, width: u32, height: u32) -> Region {
        Region {
            x,
            y,
            width,
            height,
        }
    }

    #[test]
    fn test_root_bounds_covers_all_monitors() {
        let monitors = parse_monitors(XRANDR);
        assert_eq!(root_bounds(&monitors), Some(region(0, 0, 4480, 1440)));
        assert_eq!(root_bounds(&[]), None);
    }

    #[test]
    fn test_window_past_right_edge_is_clipped() {
        let root = region(0, 0, 1920, 1080);
        assert_eq!(
            visible(region(1000, 0, 1280, 720), Some(root)),
            Some(region(1000, 0, 920, 720))
        );
        assert_eq!(
            visible(region(1800, 900, 400, 400), Some(root)),
            Some(region(1800, 900, 120, 180))
        );
    }

    #[test]
    fn test_window_at_negative_offset_is_clipped() {
        let root = region(0, 0, 1920, 1080);
        assert_eq!(
            visible(region(-100, -20, 800, 600), Some(root)),
            Some(region(0, 0, 700, 580))
        );
        // Unknown bounds still drop the off-screen part
        assert_eq!(
            visible(region(-100, 50, 800, 600), None),
            Some(region(0, 50, 700, 600))
        );
    }

    #[test]
    fn test_window_off_screen_has_no_region() {
        let root = region(0, 0, 1920, 1080);
        assert_eq!(visible(region(1920, 0, 640, 480), Some(root)), None);
        assert_eq!(visible(region(-700, 0, 640, 480), Some(root)), None);
    }

    #[test]
    fn test_window_inside_screen_is_unchanged() {
        let root = root_bounds(&parse_monitors(XRANDR)).unwrap();
        let window = region(64, 48, 1280, 720);
        assert_eq!(visible(window, Some(root)), Some(window));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_thumbnails_grabbed_concurrently_in_order() {
        use std::io::Write;
        use std::os::unix::fs::PermissionsExt;

        // Stand-in ffmpeg: waits, then echoes the x11grab input it was given
        let temp = tempfile::tempdir().unwrap();
        let script = temp.path().join("fake-ffmpeg");
        {
            let mut file = std::fs::File::create(&script).unwrap();
            file.write_all(b"#!/bin/sh\nsleep 1\nprintf '%s' \"$9\"\n").unwrap();
            file.sync_all().unwrap();
        }
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let settings = FfmpegSettings {
            binary: script.to_string_lossy().into_owned(),
            display: ":9".into(),
            ..FfmpegSettings::default()
        };
        let regions = [
            Some(region(0, 0, 1920, 1080)),
            None,
            Some(region(64, 48, 1280, 720)),
            Some(region(100, 100, 800, 600)),
            Some(region(1920, 0, 2560, 1440)),
        ];

        let started = std::time::Instant::now();
        let thumbnails = grab_previews(&settings, &regions, (300, 200)).await;
        let elapsed = started.elapsed();

        let grabbed: Vec<String> = thumbnails
            .iter()
            .map(|t| String::from_utf8_lossy(&t.png).into_owned())
            .collect();
        assert_eq!(
            grabbed,
            vec![":9+0,0", "", ":9+64,48", ":9+100,100", ":9+1920,0"]
        );
        assert!(thumbnails[1].is_empty());
        assert!(elapsed < THUMBNAIL_TIMEOUT, "took {:?}", elapsed);
    }

    #[tokio::test]
    async fn test_resolve_rejects_unknown_prefix() {
        let err = resolve_region(":0", "tab:1").await.unwrap_err();
        assert!(matches!(err, ScreenreelError::StreamAcquisition(_)));
    }

    #[tokio::test]
    #[ignore = "Requires an X11 session with xrandr"]
    async fn test_list_monitors_live() {
        let display = std::env::var("DISPLAY").unwrap_or_else(|_| ":0".into());
        let monitors = list_monitors(&display).await.unwrap();
        assert!(!monitors.is_empty());
    }
}
