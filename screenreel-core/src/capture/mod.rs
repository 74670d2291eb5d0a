//! Capture capabilities
//!
//! The controller never talks to the platform directly. It drives four
//! capabilities defined here:
//! - [`SourceDirectory`] lists screens and windows
//! - [`StreamAcquirer`] binds a live stream to one source
//! - [`RecorderFactory`] wraps a stream in a [`Recorder`] emitting WebM chunks
//! - [`ExportSink`](crate::export::ExportSink) saves the finished artifact
//!
//! The [`x11`] and [`ffmpeg`] modules implement them for Linux X11 sessions.

pub mod ffmpeg;
pub mod x11;

pub use ffmpeg::{FfmpegRecorder, FfmpegRecorderFactory};
pub use x11::{X11SourceDirectory, X11Stream, X11StreamAcquirer};

use async_trait::async_trait;
use bytes::Bytes;
use std::any::Any;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

use crate::config::{DirectoryQuery, RecorderProfile, SessionConfig, StreamRequest};
use crate::error::Result;
use crate::export::{DirectoryExportSink, ExportSink};
use crate::types::{CaptureSource, SessionId, TrackInfo};

/// Lists capturable screens and windows
#[async_trait]
pub trait SourceDirectory: Send + Sync {
    /// List sources matching the query, in the platform's order
    async fn list_sources(&self, query: &DirectoryQuery) -> Result<Vec<CaptureSource>>;
}

/// Grants live streams bound to a source
#[async_trait]
pub trait StreamAcquirer: Send + Sync {
    /// Acquire an audio/video stream for the requested source
    async fn acquire(&self, request: &StreamRequest) -> Result<Box<dyn MediaStream>>;
}

/// A live stream made of audio and video tracks
pub trait MediaStream: Send + Sync {
    /// Stream identifier
    fn id(&self) -> &str;

    /// Tracks carried by this stream
    fn tracks(&self) -> Vec<TrackInfo>;

    /// Stop every track and release the capture devices
    fn stop_tracks(&self);

    /// Access to the concrete type, for recorders bound to one backend
    fn as_any(&self) -> &dyn Any;
}

/// Event emitted by a recorder
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecorderEvent {
    /// One fragment of encoded media
    ChunkProduced(Bytes),
    /// Terminal signal; no chunks follow
    RecordingStopped,
}

/// Where a recorder delivers its events
///
/// Events are tagged with the session they belong to and delivered in the
/// order they are emitted.
#[derive(Clone)]
pub struct RecorderEventSink {
    session: SessionId,
    deliver: Arc<dyn Fn(SessionId, RecorderEvent) -> bool + Send + Sync>,
}

impl RecorderEventSink {
    /// Create a sink from a delivery function
    ///
    /// The function returns `false` once the receiving side has gone away.
    pub fn new(
        session: SessionId,
        deliver: impl Fn(SessionId, RecorderEvent) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            session,
            deliver: Arc::new(deliver),
        }
    }

    /// Create a sink backed by a fresh unbounded channel
    pub fn channel(
        session: SessionId,
    ) -> (Self, mpsc::UnboundedReceiver<(SessionId, RecorderEvent)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let sink = Self::new(session, move |session, event| {
            tx.send((session, event)).is_ok()
        });
        (sink, rx)
    }

    /// Session this sink belongs to
    pub fn session(&self) -> SessionId {
        self.session
    }

    /// Deliver an encoded chunk
    pub fn chunk(&self, data: Bytes) -> bool {
        if data.is_empty() {
            return true;
        }
        (self.deliver)(self.session, RecorderEvent::ChunkProduced(data))
    }

    /// Deliver the terminal stopped signal
    pub fn stopped(&self) -> bool {
        debug!("{} recorder stopped", self.session);
        (self.deliver)(self.session, RecorderEvent::RecordingStopped)
    }
}

impl std::fmt::Debug for RecorderEventSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecorderEventSink")
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

/// Encodes a live stream into chunks
#[async_trait]
pub trait Recorder: Send {
    /// Begin recording
    async fn start(&mut self) -> Result<()>;

    /// Ask the recorder to finalize
    ///
    /// Remaining chunks are delivered, followed by exactly one
    /// [`RecorderEvent::RecordingStopped`].
    async fn stop(&mut self) -> Result<()>;
}

/// Builds recorders for acquired streams
pub trait RecorderFactory: Send + Sync {
    /// Create a recorder bound to `stream` with the given encoding profile
    fn create(
        &self,
        stream: &dyn MediaStream,
        profile: &RecorderProfile,
        sink: RecorderEventSink,
    ) -> Result<Box<dyn Recorder>>;
}

/// Owns a stream and stops its tracks exactly once
///
/// Tracks are stopped by [`StreamGuard::release`] or, failing that, when the
/// guard is dropped.
pub struct StreamGuard {
    stream: Option<Box<dyn MediaStream>>,
}

impl StreamGuard {
    /// Take ownership of a stream
    pub fn new(stream: Box<dyn MediaStream>) -> Self {
        Self {
            stream: Some(stream),
        }
    }

    /// The guarded stream, unless already released
    pub fn stream(&self) -> Option<&dyn MediaStream> {
        self.stream.as_deref()
    }

    /// Stop all tracks now; later calls do nothing
    pub fn release(&mut self) {
        if let Some(stream) = self.stream.take() {
            debug!("Releasing stream {}", stream.id());
            stream.stop_tracks();
        }
    }

    /// Whether the tracks have been stopped
    pub fn is_released(&self) -> bool {
        self.stream.is_none()
    }
}

impl Drop for StreamGuard {
    fn drop(&mut self) {
        self.release();
    }
}

/// The set of capabilities a controller runs against
#[derive(Clone)]
pub struct Platform {
    /// Source listing
    pub directory: Arc<dyn SourceDirectory>,
    /// Stream acquisition
    pub acquirer: Arc<dyn StreamAcquirer>,
    /// Recorder construction
    pub recorders: Arc<dyn RecorderFactory>,
    /// Artifact export
    pub export: Arc<dyn ExportSink>,
}

impl Platform {
    /// X11 + ffmpeg backend, exporting into the configured directory
    pub fn x11(config: &SessionConfig) -> Self {
        Self {
            directory: Arc::new(X11SourceDirectory::new(config.ffmpeg.clone())),
            acquirer: Arc::new(X11StreamAcquirer::new(config.ffmpeg.clone())),
            recorders: Arc::new(FfmpegRecorderFactory::new(config.ffmpeg.clone())),
            export: Arc::new(DirectoryExportSink::new(config.export_dir.clone())),
        }
    }
}
