//! Screenreel Core Library
//!
//! Screen and window recording to WebM for Linux desktops.
//!
//! This library provides:
//! - Source listing for screens and windows, with thumbnails
//! - A capture controller owning the session lifecycle
//! - Chunk buffering and export of the finished recording
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐    ┌──────────────────┐    ┌──────────────┐    ┌────────────┐
//! │ Source Directory │───▶│ Stream Acquirer  │───▶│   Recorder   │───▶│ Export Sink│
//! │ (xrandr/wmctrl)  │    │ (x11grab region) │    │ (ffmpeg/WebM)│    │ (Downloads)│
//! └──────────────────┘    └──────────────────┘    └──────────────┘    └────────────┘
//!            ▲                       ▲                    │ chunks
//!            └────────── CaptureController (single event loop) ◀──┘
//! ```

pub mod capture;
pub mod config;
pub mod controller;
pub mod error;
pub mod export;
pub mod recording;
pub mod state;
pub mod types;

pub use capture::Platform;
pub use config::{ConfigFile, SessionConfig};
pub use controller::{CaptureController, ControllerHandle};
pub use error::{Result, ScreenreelError};
pub use export::{DirectoryExportSink, ExportReceipt, ExportSink};
pub use recording::{ChunkBuffer, ExportedArtifact, artifact_filename};
pub use state::{ControllerState, Notice, SessionState};
pub use types::{CaptureSource, SessionId, SourceKind, Thumbnail};
