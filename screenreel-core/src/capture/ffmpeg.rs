//! ffmpeg-backed recorder and thumbnail grabber
//!
//! The recorder runs one ffmpeg process per session. ffmpeg reads the X11
//! region through `x11grab` (plus PulseAudio when audio was granted),
//! encodes WebM to stdout, and the pump task cuts stdout into chunks.
//!
//! ```text
//! x11grab ─┐
//!          ├─► ffmpeg ─► stdout ─► pump ─► ChunkProduced … RecordingStopped
//! pulse ───┘     ▲
//!                └── 'q' on stdin (stop) / kill (tracks stopped)
//! ```

use bytes::BytesMut;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};
use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::x11::{Region, X11Stream};
use super::{MediaStream, Recorder, RecorderEventSink, RecorderFactory};
use crate::config::{FfmpegSettings, RecorderProfile};
use crate::error::{Result, ScreenreelError};
use crate::types::Thumbnail;

/// How long ffmpeg gets to finalize the file after a stop request
const STOP_GRACE: Duration = Duration::from_secs(5);

/// Map a WebM codec name to an ffmpeg encoder
pub fn video_encoder(codec: &str) -> Option<&'static str> {
    match codec.to_ascii_lowercase().as_str() {
        "vp9" | "vp09" => Some("libvpx-vp9"),
        "vp8" => Some("libvpx"),
        "av1" | "av01" => Some("libaom-av1"),
        _ => None,
    }
}

/// Parse `ffmpeg -encoders` output into encoder names
///
/// ```text
///  V....D libvpx-vp9           libvpx VP9 (codec vp9)
///  A....D libopus              libopus Opus (codec opus)
/// ```
pub fn parse_encoders(output: &str) -> Vec<String> {
    output
        .lines()
        .skip_while(|line| !line.trim_start().starts_with("------"))
        .skip(1)
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let flags = fields.next()?;
            let name = fields.next()?;
            (flags.len() == 6).then(|| name.to_string())
        })
        .collect()
}

/// Encoders compiled into the configured ffmpeg
pub async fn available_encoders(settings: &FfmpegSettings) -> Option<Vec<String>> {
    let output = Command::new(&settings.binary)
        .args(["-hide_banner", "-encoders"])
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await
        .ok()?;

    if !output.status.success() {
        return None;
    }
    Some(parse_encoders(&String::from_utf8_lossy(&output.stdout)))
}

/// x11grab input for a region of `display`
///
/// The region must already lie inside the root window.
fn grab_input(display: &str, region: Region) -> String {
    format!("{}+{},{}", display, region.x, region.y)
}

/// Build the ffmpeg command line for recording `stream`
pub fn recorder_args(stream: &X11Stream, profile: &RecorderProfile) -> Result<Vec<String>> {
    if profile.container() != "webm" {
        return Err(ScreenreelError::Unsupported(format!(
            "Container {} (only webm is supported)",
            profile.container()
        )));
    }

    let codec = profile.video_codec().unwrap_or("vp9");
    let encoder = video_encoder(codec).ok_or_else(|| {
        ScreenreelError::Unsupported(format!("Video codec {} in {}", codec, profile))
    })?;

    let region = stream.region();
    let (out_w, out_h) = stream.output_size();

    let mut args: Vec<String> = vec![
        "-hide_banner".into(),
        "-loglevel".into(),
        "error".into(),
        "-f".into(),
        "x11grab".into(),
        "-framerate".into(),
        stream.frame_rate().to_string(),
        "-video_size".into(),
        format!("{}x{}", region.width, region.height),
        "-i".into(),
        grab_input(stream.display(), region),
    ];

    if let Some(device) = stream.audio_device() {
        args.extend(["-f".into(), "pulse".into(), "-i".into(), device.to_string()]);
    }

    args.extend([
        "-vf".into(),
        format!("scale={}:{}", out_w, out_h),
        "-c:v".into(),
        encoder.into(),
    ]);

    if encoder.starts_with("libvpx") {
        args.extend([
            "-deadline".into(),
            "realtime".into(),
            "-cpu-used".into(),
            "8".into(),
        ]);
    }

    if stream.audio_device().is_some() {
        args.extend(["-c:a".into(), "libopus".into()]);
    }

    args.extend(["-f".into(), "webm".into(), "pipe:1".into()]);
    Ok(args)
}

/// Largest even size with the region's aspect ratio that fits in `bounds`
pub fn preview_size(region: Region, bounds: (u32, u32)) -> (u32, u32) {
    if region.width == 0 || region.height == 0 {
        return (0, 0);
    }
    let (w, h) = (region.width as u64, region.height as u64);
    let (bw, bh) = (bounds.0 as u64, bounds.1 as u64);
    let even = |v: u64| ((v as u32) & !1).max(2);

    if w * bh >= h * bw {
        (even(bw), even(h * bw / w))
    } else {
        (even(w * bh / h), even(bh))
    }
}

/// ffmpeg command line grabbing one PNG frame of a region
pub fn thumbnail_args(display: &str, region: Region, size: (u32, u32)) -> Vec<String> {
    vec![
        "-hide_banner".into(),
        "-loglevel".into(),
        "error".into(),
        "-f".into(),
        "x11grab".into(),
        "-video_size".into(),
        format!("{}x{}", region.width, region.height),
        "-i".into(),
        grab_input(display, region),
        "-frames:v".into(),
        "1".into(),
        "-vf".into(),
        format!("scale={}:{}", size.0, size.1),
        "-f".into(),
        "image2pipe".into(),
        "-c:v".into(),
        "png".into(),
        "pipe:1".into(),
    ]
}

/// Grab a PNG thumbnail of a region, scaled to fit `bounds`
pub async fn grab_thumbnail(
    settings: &FfmpegSettings,
    region: Region,
    bounds: (u32, u32),
) -> Result<Thumbnail> {
    let (width, height) = preview_size(region, bounds);
    if width == 0 || height == 0 {
        return Ok(Thumbnail::default());
    }

    let output = Command::new(&settings.binary)
        .args(thumbnail_args(&settings.display, region, (width, height)))
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| {
            ScreenreelError::directory(format!("Failed to run {}: {}", settings.binary, e))
        })?;

    if !output.status.success() {
        return Err(ScreenreelError::directory(format!(
            "Thumbnail grab failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    Ok(Thumbnail::new(width, height, output.stdout))
}

/// Builds [`FfmpegRecorder`]s for [`X11Stream`]s
pub struct FfmpegRecorderFactory {
    settings: FfmpegSettings,
}

impl FfmpegRecorderFactory {
    /// Create a factory with the given ffmpeg settings
    pub fn new(settings: FfmpegSettings) -> Self {
        Self { settings }
    }
}

impl RecorderFactory for FfmpegRecorderFactory {
    fn create(
        &self,
        stream: &dyn MediaStream,
        profile: &RecorderProfile,
        sink: RecorderEventSink,
    ) -> Result<Box<dyn Recorder>> {
        let x11 = stream
            .as_any()
            .downcast_ref::<X11Stream>()
            .ok_or_else(|| {
                ScreenreelError::recorder(format!(
                    "Stream {} is not an X11 stream",
                    stream.id()
                ))
            })?;

        let args = recorder_args(x11, profile)?;
        debug!("{} ffmpeg args: {}", sink.session(), args.join(" "));

        Ok(Box::new(FfmpegRecorder {
            binary: self.settings.binary.clone(),
            chunk_size: self.settings.chunk_size.max(1),
            args,
            release: x11.release_signal(),
            sink,
            stdin: None,
            stop_requested: Arc::new(Notify::new()),
            pump: None,
        }))
    }
}

/// Records one stream through an ffmpeg child process
pub struct FfmpegRecorder {
    binary: String,
    chunk_size: usize,
    args: Vec<String>,
    release: watch::Receiver<bool>,
    sink: RecorderEventSink,
    stdin: Option<ChildStdin>,
    stop_requested: Arc<Notify>,
    pump: Option<JoinHandle<()>>,
}

#[async_trait::async_trait]
impl Recorder for FfmpegRecorder {
    async fn start(&mut self) -> Result<()> {
        if self.pump.is_some() {
            return Err(ScreenreelError::recorder("Recorder already started"));
        }

        let mut child = Command::new(&self.binary)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                ScreenreelError::recorder(format!("Failed to spawn {}: {}", self.binary, e))
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ScreenreelError::recorder("ffmpeg stdout not captured"))?;
        self.stdin = child.stdin.take();
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(log_stderr(stderr));
        }

        info!(
            "{} recording started (ffmpeg pid {:?})",
            self.sink.session(),
            child.id()
        );

        self.pump = Some(tokio::spawn(pump(
            child,
            stdout,
            self.release.clone(),
            self.stop_requested.clone(),
            self.sink.clone(),
            self.chunk_size,
        )));
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        if self.pump.is_none() {
            return Err(ScreenreelError::recorder("Recorder was never started"));
        }

        let Some(mut stdin) = self.stdin.take() else {
            debug!("{} stop already requested", self.sink.session());
            return Ok(());
        };

        self.stop_requested.notify_one();
        if let Err(e) = stdin.write_all(b"q").await {
            // ffmpeg already exited; the pump reports the end
            debug!("{} could not signal ffmpeg: {}", self.sink.session(), e);
        }
        drop(stdin);
        Ok(())
    }
}

async fn log_stderr(stderr: ChildStderr) {
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        warn!("ffmpeg: {}", line);
    }
}

async fn released(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            return;
        }
    }
}

async fn deadline(at: Option<Instant>) {
    match at {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

/// Read ffmpeg's stdout into chunks until it closes, then signal the end
async fn pump(
    mut child: Child,
    mut stdout: ChildStdout,
    mut release: watch::Receiver<bool>,
    stop_requested: Arc<Notify>,
    sink: RecorderEventSink,
    chunk_size: usize,
) {
    let mut buf = BytesMut::with_capacity(chunk_size);
    let mut killed = false;
    let mut kill_at: Option<Instant> = None;

    loop {
        tokio::select! {
            read = stdout.read_buf(&mut buf) => match read {
                Ok(0) => break,
                Ok(_) => {
                    if buf.len() >= chunk_size {
                        sink.chunk(buf.split().freeze());
                        buf.reserve(chunk_size);
                    }
                }
                Err(e) => {
                    warn!("{} failed reading ffmpeg output: {}", sink.session(), e);
                    break;
                }
            },
            _ = released(&mut release), if !killed => {
                info!("{} tracks stopped, terminating ffmpeg", sink.session());
                killed = true;
                let _ = child.start_kill();
            }
            _ = stop_requested.notified(), if kill_at.is_none() => {
                kill_at = Some(Instant::now() + STOP_GRACE);
            }
            _ = deadline(kill_at), if kill_at.is_some() && !killed => {
                warn!("{} ffmpeg ignored stop request, killing", sink.session());
                killed = true;
                let _ = child.start_kill();
            }
        }
    }

    if !buf.is_empty() {
        sink.chunk(buf.freeze());
    }

    if !killed {
        let _ = child.start_kill();
    }
    match child.wait().await {
        Ok(status) => debug!("{} ffmpeg exited: {}", sink.session(), status),
        Err(e) => warn!("{} failed waiting for ffmpeg: {}", sink.session(), e),
    }

    sink.stopped();
}
