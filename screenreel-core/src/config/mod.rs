//! Configuration types for screenreel
//!
//! Provides the directory query, stream constraints and recorder profile the
//! capture controller hands to its capabilities, plus the runtime
//! configuration that bundles them.

mod file;

pub use file::{sample_config, ConfigFile};

use crate::types::SourceKind;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default preview size for source thumbnails
pub const DEFAULT_PREVIEW_SIZE: (u32, u32) = (300, 200);

/// Default recorder MIME type
pub const DEFAULT_MIME_TYPE: &str = "video/webm; codecs=vp9";

/// MIME type of the exported artifact
pub const ARTIFACT_MIME_TYPE: &str = "video/webm";

/// Parameters of one source directory listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryQuery {
    /// Which kinds of sources to list
    pub kinds: Vec<SourceKind>,
    /// Bounding size of preview thumbnails (width, height)
    pub preview_size: (u32, u32),
}

impl DirectoryQuery {
    /// Whether this query asks for the given kind
    pub fn wants(&self, kind: SourceKind) -> bool {
        self.kinds.contains(&kind)
    }
}

impl Default for DirectoryQuery {
    fn default() -> Self {
        Self {
            kinds: vec![SourceKind::Window, SourceKind::Screen],
            preview_size: DEFAULT_PREVIEW_SIZE,
        }
    }
}

/// Frame rate target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameRate {
    /// Preferred frame rate
    pub ideal: u32,
    /// Ceiling
    pub max: u32,
}

impl Default for FrameRate {
    fn default() -> Self {
        Self { ideal: 30, max: 60 }
    }
}

/// Bounds on the captured video
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoConstraints {
    /// Minimum width in pixels
    pub min_width: u32,
    /// Maximum width in pixels
    pub max_width: u32,
    /// Minimum height in pixels
    pub min_height: u32,
    /// Maximum height in pixels
    pub max_height: u32,
    /// Frame rate target
    pub frame_rate: FrameRate,
}

impl Default for VideoConstraints {
    fn default() -> Self {
        Self {
            min_width: 1280,
            max_width: 1920,
            min_height: 720,
            max_height: 1080,
            frame_rate: FrameRate::default(),
        }
    }
}

impl VideoConstraints {
    /// Fit a native size into the bounds, preserving aspect ratio where possible
    ///
    /// Sizes above the maximum are scaled down; sizes below the minimum are
    /// scaled up. Results are rounded down to even numbers for the encoder.
    pub fn fit(&self, width: u32, height: u32) -> (u32, u32) {
        if width == 0 || height == 0 {
            return (self.min_width, self.min_height);
        }

        let (w, h) = (width as f64, height as f64);
        let down = (self.max_width as f64 / w).min(self.max_height as f64 / h);
        let up = (self.min_width as f64 / w).max(self.min_height as f64 / h);
        let scale = if down < 1.0 {
            down
        } else if up > 1.0 {
            up
        } else {
            1.0
        };

        let fit_w = ((w * scale).round() as u32).clamp(self.min_width, self.max_width);
        let fit_h = ((h * scale).round() as u32).clamp(self.min_height, self.max_height);
        (fit_w & !1, fit_h & !1)
    }

    /// Check that the bounds are consistent
    pub fn validate(&self) -> Result<(), String> {
        if self.min_width > self.max_width {
            return Err(format!(
                "min_width {} exceeds max_width {}",
                self.min_width, self.max_width
            ));
        }
        if self.min_height > self.max_height {
            return Err(format!(
                "min_height {} exceeds max_height {}",
                self.min_height, self.max_height
            ));
        }
        if self.frame_rate.ideal == 0 || self.frame_rate.ideal > self.frame_rate.max {
            return Err(format!(
                "frame rate ideal {} must be between 1 and max {}",
                self.frame_rate.ideal, self.frame_rate.max
            ));
        }
        Ok(())
    }
}

/// Request for a live stream bound to one source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamRequest {
    /// Source identifier from the last directory listing
    pub target_id: String,
    /// Whether desktop audio is requested
    pub audio: bool,
    /// Video bounds
    pub video: VideoConstraints,
}

/// Encoding profile handed to the recorder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecorderProfile {
    /// Full MIME type, e.g. `video/webm; codecs=vp9`
    pub mime_type: String,
}

impl RecorderProfile {
    /// Create a profile from a MIME type string
    pub fn new(mime_type: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
        }
    }

    /// Container part of the MIME type (`webm`)
    pub fn container(&self) -> &str {
        let essence = self.mime_type.split(';').next().unwrap_or_default().trim();
        essence.split('/').nth(1).unwrap_or(essence)
    }

    /// Video codec from the `codecs=` parameter (`vp9`)
    pub fn video_codec(&self) -> Option<&str> {
        self.mime_type
            .split(';')
            .skip(1)
            .filter_map(|param| param.trim().strip_prefix("codecs="))
            .flat_map(|codecs| codecs.trim_matches('"').split(','))
            .map(str::trim)
            .find(|codec| !codec.is_empty())
    }
}

impl Default for RecorderProfile {
    fn default() -> Self {
        Self::new(DEFAULT_MIME_TYPE)
    }
}

impl std::fmt::Display for RecorderProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.mime_type)
    }
}

/// Largest recorder chunk, in bytes
pub const MAX_CHUNK_SIZE: usize = 16 * 1024 * 1024;

/// Settings for the ffmpeg-based X11 backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FfmpegSettings {
    /// ffmpeg executable name or path
    pub binary: String,
    /// X11 display to grab from (e.g. `:0`)
    pub display: String,
    /// PulseAudio source used for desktop audio
    pub audio_device: String,
    /// Read size for recorder output chunks, in bytes
    pub chunk_size: usize,
}

impl Default for FfmpegSettings {
    fn default() -> Self {
        Self {
            binary: "ffmpeg".to_string(),
            display: std::env::var("DISPLAY").unwrap_or_else(|_| ":0".to_string()),
            audio_device: "default".to_string(),
            chunk_size: 64 * 1024,
        }
    }
}

/// Complete runtime configuration for a capture controller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Directory listing parameters
    pub directory: DirectoryQuery,
    /// Video bounds for stream requests
    pub video: VideoConstraints,
    /// Whether to request desktop audio
    pub audio: bool,
    /// Recorder encoding profile
    pub profile: RecorderProfile,
    /// Where exported recordings are written
    pub export_dir: PathBuf,
    /// Backend settings
    pub ffmpeg: FfmpegSettings,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            directory: DirectoryQuery::default(),
            video: VideoConstraints::default(),
            audio: true,
            profile: RecorderProfile::default(),
            export_dir: default_export_dir(),
            ffmpeg: FfmpegSettings::default(),
        }
    }
}

impl SessionConfig {
    /// Build the stream request for a source
    pub fn stream_request(&self, target_id: impl Into<String>) -> StreamRequest {
        StreamRequest {
            target_id: target_id.into(),
            audio: self.audio,
            video: self.video,
        }
    }

    /// Set the export directory
    pub fn with_export_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.export_dir = dir.into();
        self
    }

    /// Enable or disable audio capture
    pub fn with_audio(mut self, audio: bool) -> Self {
        self.audio = audio;
        self
    }

    /// Validate configuration, returning a list of problems
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();

        if let Err(e) = self.video.validate() {
            problems.push(e);
        }
        if self.directory.kinds.is_empty() {
            problems.push("directory.kinds must list at least one source kind".to_string());
        }
        let (pw, ph) = self.directory.preview_size;
        if pw == 0 || ph == 0 {
            problems.push("preview size must be non-zero".to_string());
        }
        if self.profile.container() != "webm" {
            problems.push(format!(
                "recording container '{}' is not supported, only webm",
                self.profile.container()
            ));
        }
        if self.ffmpeg.chunk_size == 0 {
            problems.push("chunk size must be non-zero".to_string());
        } else if self.ffmpeg.chunk_size > MAX_CHUNK_SIZE {
            problems.push(format!(
                "chunk size {} KiB exceeds the {} KiB limit",
                self.ffmpeg.chunk_size / 1024,
                MAX_CHUNK_SIZE / 1024
            ));
        }

        problems
    }
}

/// User download directory, falling back to the current directory
pub fn default_export_dir() -> PathBuf {
    dirs::download_dir()
        .or_else(dirs::video_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}
