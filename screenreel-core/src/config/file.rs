//! Configuration file loading
//!
//! Loads user configuration from `~/.config/screenreel/config.toml`.
//! The file is only ever read; screenreel never writes it.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::{
    default_export_dir, DirectoryQuery, FfmpegSettings, FrameRate, RecorderProfile, SessionConfig,
    VideoConstraints, DEFAULT_MIME_TYPE, DEFAULT_PREVIEW_SIZE,
};
use crate::error::{Result, ResultExt, ScreenreelError};
use crate::types::SourceKind;

/// Configuration file structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Source directory settings
    #[serde(default)]
    pub directory: DirectorySettings,

    /// Stream constraint settings
    #[serde(default)]
    pub capture: CaptureSettings,

    /// Recorder settings
    #[serde(default)]
    pub recording: RecordingSettings,

    /// Export settings
    #[serde(default)]
    pub export: ExportSettings,

    /// ffmpeg backend settings
    #[serde(default)]
    pub ffmpeg: FfmpegFileSettings,
}

/// Source directory settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectorySettings {
    /// Source kinds to list (window, screen)
    #[serde(default = "default_kinds")]
    pub kinds: Vec<String>,

    /// Thumbnail width in pixels
    #[serde(default = "default_preview_width")]
    pub preview_width: u32,

    /// Thumbnail height in pixels
    #[serde(default = "default_preview_height")]
    pub preview_height: u32,
}

/// Stream constraint settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureSettings {
    #[serde(default = "default_min_width")]
    pub min_width: u32,
    #[serde(default = "default_max_width")]
    pub max_width: u32,
    #[serde(default = "default_min_height")]
    pub min_height: u32,
    #[serde(default = "default_max_height")]
    pub max_height: u32,
    #[serde(default = "default_ideal_fps")]
    pub ideal_fps: u32,
    #[serde(default = "default_max_fps")]
    pub max_fps: u32,

    /// Record desktop audio
    #[serde(default = "default_true")]
    pub audio: bool,

    /// PulseAudio source for desktop audio
    #[serde(default = "default_audio_device")]
    pub audio_device: String,
}

/// Recorder settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingSettings {
    /// Recorder MIME type
    #[serde(default = "default_mime_type")]
    pub mime_type: String,

    /// Size of each emitted chunk in KiB
    #[serde(default = "default_chunk_size_kib")]
    pub chunk_size_kib: usize,
}

/// Export settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportSettings {
    /// Directory for saved recordings (default: Downloads)
    #[serde(default)]
    pub directory: Option<PathBuf>,
}

/// ffmpeg backend settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FfmpegFileSettings {
    /// ffmpeg executable (default: "ffmpeg" from PATH)
    #[serde(default)]
    pub binary: Option<String>,

    /// X11 display (default: $DISPLAY)
    #[serde(default)]
    pub display: Option<String>,
}

// Default value functions
fn default_kinds() -> Vec<String> {
    vec!["window".to_string(), "screen".to_string()]
}

fn default_preview_width() -> u32 {
    DEFAULT_PREVIEW_SIZE.0
}

fn default_preview_height() -> u32 {
    DEFAULT_PREVIEW_SIZE.1
}

fn default_min_width() -> u32 {
    1280
}

fn default_max_width() -> u32 {
    1920
}

fn default_min_height() -> u32 {
    720
}

fn default_max_height() -> u32 {
    1080
}

fn default_ideal_fps() -> u32 {
    30
}

fn default_max_fps() -> u32 {
    60
}

fn default_true() -> bool {
    true
}

fn default_audio_device() -> String {
    "default".to_string()
}

fn default_mime_type() -> String {
    DEFAULT_MIME_TYPE.to_string()
}

fn default_chunk_size_kib() -> usize {
    64
}

impl Default for DirectorySettings {
    fn default() -> Self {
        Self {
            kinds: default_kinds(),
            preview_width: default_preview_width(),
            preview_height: default_preview_height(),
        }
    }
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            min_width: default_min_width(),
            max_width: default_max_width(),
            min_height: default_min_height(),
            max_height: default_max_height(),
            ideal_fps: default_ideal_fps(),
            max_fps: default_max_fps(),
            audio: true,
            audio_device: default_audio_device(),
        }
    }
}

impl Default for RecordingSettings {
    fn default() -> Self {
        Self {
            mime_type: default_mime_type(),
            chunk_size_kib: default_chunk_size_kib(),
        }
    }
}

impl ConfigFile {
    /// Get the default config file path
    pub fn default_path() -> PathBuf {
        if let Some(config_dir) = dirs::config_dir() {
            config_dir.join("screenreel").join("config.toml")
        } else if let Ok(home) = std::env::var("HOME") {
            PathBuf::from(home)
                .join(".config")
                .join("screenreel")
                .join("config.toml")
        } else {
            PathBuf::from("/etc/screenreel/config.toml")
        }
    }

    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        Self::load_from(Self::default_path())
    }

    /// Load configuration from a specific path
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| ScreenreelError::Config(format!("Failed to read config file: {}", e)))?;

        let config = Self::parse(&content)?;

        info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| ScreenreelError::Config(format!("Failed to parse config file: {}", e)))
    }

    /// Load configuration, logging warnings but returning defaults on error
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let result = match path {
            Some(path) => Self::load_from(path),
            None => Self::load(),
        };
        match result {
            Ok(config) => config,
            Err(e) => {
                warn!("Failed to load config file: {}, using defaults", e);
                Self::default()
            }
        }
    }

    /// Convert into the runtime configuration
    pub fn to_session_config(&self) -> Result<SessionConfig> {
        let kinds = self
            .directory
            .kinds
            .iter()
            .map(|k| k.parse::<SourceKind>().map_err(ScreenreelError::config))
            .collect::<Result<Vec<_>>>()
            .context("[directory] kinds")?;

        let chunk_size = self.recording.chunk_size_kib.checked_mul(1024).ok_or_else(|| {
            ScreenreelError::config(format!(
                "recording.chunk_size_kib {} is too large",
                self.recording.chunk_size_kib
            ))
        })?;

        let mut ffmpeg = FfmpegSettings {
            audio_device: self.capture.audio_device.clone(),
            chunk_size,
            ..FfmpegSettings::default()
        };
        if let Some(binary) = &self.ffmpeg.binary {
            ffmpeg.binary = binary.clone();
        }
        if let Some(display) = &self.ffmpeg.display {
            ffmpeg.display = display.clone();
        }

        let config = SessionConfig {
            directory: DirectoryQuery {
                kinds,
                preview_size: (self.directory.preview_width, self.directory.preview_height),
            },
            video: VideoConstraints {
                min_width: self.capture.min_width,
                max_width: self.capture.max_width,
                min_height: self.capture.min_height,
                max_height: self.capture.max_height,
                frame_rate: FrameRate {
                    ideal: self.capture.ideal_fps,
                    max: self.capture.max_fps,
                },
            },
            audio: self.capture.audio,
            profile: RecorderProfile::new(self.recording.mime_type.clone()),
            export_dir: self
                .export
                .directory
                .clone()
                .unwrap_or_else(default_export_dir),
            ffmpeg,
        };

        let problems = config.validate();
        if !problems.is_empty() {
            return Err(ScreenreelError::config(problems.join("; ")));
        }

        Ok(config)
    }
}

/// Generate a sample configuration file
pub fn sample_config() -> String {
    r#"# screenreel configuration
# Location: ~/.config/screenreel/config.toml

[directory]
# Source kinds to list: window, screen
kinds = ["window", "screen"]

# Thumbnail bounding box in pixels
preview_width = 300
preview_height = 200

[capture]
# Recorded video is scaled to fit inside these bounds
min_width = 1280
max_width = 1920
min_height = 720
max_height = 1080

# Frame rate target and ceiling
ideal_fps = 30
max_fps = 60

# Record desktop audio alongside video
audio = true

# PulseAudio source used for desktop audio
audio_device = "default"

[recording]
# Only WebM output is supported
mime_type = "video/webm; codecs=vp9"

# Recorder output is delivered in chunks of this size (KiB)
chunk_size_kib = 64

[export]
# Where recordings are saved (default: your Downloads folder)
# directory = "/home/me/Videos"

[ffmpeg]
# binary = "ffmpeg"
# display = ":0"
"#
    .to_string()
}
