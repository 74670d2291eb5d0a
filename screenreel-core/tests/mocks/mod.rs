//! Mock infrastructure for testing
//!
//! Scriptable stand-ins for every platform capability, so the controller can
//! be driven without an X server or ffmpeg.

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use screenreel_core::capture::{
    MediaStream, Platform, Recorder, RecorderEventSink, RecorderFactory, SourceDirectory,
    StreamAcquirer,
};
use screenreel_core::config::{DirectoryQuery, RecorderProfile, StreamRequest};
use screenreel_core::error::{Result, ScreenreelError};
use screenreel_core::export::{ExportReceipt, ExportSink};
use screenreel_core::recording::ExportedArtifact;
use screenreel_core::state::{ControllerState, Notice};
use screenreel_core::types::{CaptureSource, SourceKind, Thumbnail, TrackInfo, TrackKind};
use std::any::Any;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{broadcast, oneshot, watch};

/// Upper bound for anything a test waits on
pub const TIMEOUT: Duration = Duration::from_secs(2);

/// A screen and two windows
pub fn test_sources() -> Vec<CaptureSource> {
    vec![
        CaptureSource::new("screen:0", "Screen 1 (eDP-1)", SourceKind::Screen)
            .with_thumbnail(Thumbnail::new(300, 168, Bytes::from_static(b"\x89PNG"))),
        CaptureSource::new("window:0x01e00003", "Terminal", SourceKind::Window),
        CaptureSource::new("window:0x02200007", "Browser", SourceKind::Window),
    ]
}

struct Scripted<T> {
    result: std::result::Result<T, String>,
    gate: Option<oneshot::Receiver<()>>,
}

/// Source directory answering from a script, then from a default listing
pub struct MockDirectory {
    script: Mutex<VecDeque<Scripted<Vec<CaptureSource>>>>,
    default: Vec<CaptureSource>,
    calls: AtomicUsize,
}

impl MockDirectory {
    /// Directory that always lists `sources`
    pub fn new(sources: Vec<CaptureSource>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(VecDeque::new()),
            default: sources,
            calls: AtomicUsize::new(0),
        })
    }

    /// Queue a successful listing
    pub fn push_ok(&self, sources: Vec<CaptureSource>) {
        self.script.lock().push_back(Scripted {
            result: Ok(sources),
            gate: None,
        });
    }

    /// Queue a failing listing
    pub fn push_err(&self, msg: &str) {
        self.script.lock().push_back(Scripted {
            result: Err(msg.to_string()),
            gate: None,
        });
    }

    /// Queue a listing that only returns once the sender fires
    pub fn push_gated(&self, sources: Vec<CaptureSource>) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.script.lock().push_back(Scripted {
            result: Ok(sources),
            gate: Some(rx),
        });
        tx
    }

    /// Number of queries made
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceDirectory for MockDirectory {
    async fn list_sources(&self, query: &DirectoryQuery) -> Result<Vec<CaptureSource>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().pop_front();
        let Some(Scripted { result, gate }) = next else {
            return Ok(self
                .default
                .iter()
                .filter(|s| query.wants(s.kind))
                .cloned()
                .collect());
        };

        if let Some(gate) = gate {
            let _ = gate.await;
        }
        result.map_err(ScreenreelError::directory)
    }
}

/// What a test can observe about a granted stream
#[derive(Debug)]
pub struct StreamSpy {
    pub id: String,
    pub source_id: String,
    pub audio: bool,
    stops: AtomicUsize,
}

impl StreamSpy {
    /// How many times the tracks were stopped
    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

/// Stream with one video track and an optional audio track
pub struct MockStream {
    spy: Arc<StreamSpy>,
}

impl MediaStream for MockStream {
    fn id(&self) -> &str {
        &self.spy.id
    }

    fn tracks(&self) -> Vec<TrackInfo> {
        let mut tracks = vec![TrackInfo::new(TrackKind::Video, self.spy.source_id.clone())];
        if self.spy.audio {
            tracks.push(TrackInfo::new(TrackKind::Audio, "desktop"));
        }
        tracks
    }

    fn stop_tracks(&self) {
        self.spy.stops.fetch_add(1, Ordering::SeqCst);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Stream acquirer granting [`MockStream`]s
#[derive(Default)]
pub struct MockAcquirer {
    script: Mutex<VecDeque<Scripted<()>>>,
    requests: Mutex<Vec<StreamRequest>>,
    streams: Mutex<Vec<Arc<StreamSpy>>>,
}

impl MockAcquirer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make the next request fail
    pub fn push_err(&self, msg: &str) {
        self.script.lock().push_back(Scripted {
            result: Err(msg.to_string()),
            gate: None,
        });
    }

    /// Hold the next request until the sender fires
    pub fn push_gated(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.script.lock().push_back(Scripted {
            result: Ok(()),
            gate: Some(rx),
        });
        tx
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<StreamRequest> {
        self.requests.lock().clone()
    }

    /// Spies on every stream granted so far
    pub fn streams(&self) -> Vec<Arc<StreamSpy>> {
        self.streams.lock().clone()
    }
}

#[async_trait]
impl StreamAcquirer for MockAcquirer {
    async fn acquire(&self, request: &StreamRequest) -> Result<Box<dyn MediaStream>> {
        self.requests.lock().push(request.clone());
        let next = self.script.lock().pop_front();

        if let Some(Scripted { result, gate }) = next {
            if let Some(gate) = gate {
                let _ = gate.await;
            }
            result.map_err(ScreenreelError::acquisition)?;
        }

        let mut streams = self.streams.lock();
        let spy = Arc::new(StreamSpy {
            id: format!("mock-stream-{}", streams.len() + 1),
            source_id: request.target_id.clone(),
            audio: request.audio,
            stops: AtomicUsize::new(0),
        });
        streams.push(spy.clone());
        Ok(Box::new(MockStream { spy }))
    }
}

/// What a test can observe about a created recorder
pub struct RecorderSpy {
    pub stream_id: String,
    pub profile: RecorderProfile,
    pub sink: RecorderEventSink,
    started: AtomicBool,
    stops: AtomicUsize,
}

impl RecorderSpy {
    pub fn started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    /// Emit a chunk as if the encoder produced it
    pub fn emit(&self, data: &'static [u8]) {
        self.sink.chunk(Bytes::from_static(data));
    }

    /// Emit the stopped signal without a stop request
    pub fn end(&self) {
        self.sink.stopped();
    }
}

/// Recorder that flushes a tail chunk and signals stopped when asked
pub struct MockRecorder {
    spy: Arc<RecorderSpy>,
    tail: Option<Bytes>,
    fail_start: bool,
    fail_stop: bool,
}

#[async_trait]
impl Recorder for MockRecorder {
    async fn start(&mut self) -> Result<()> {
        if self.fail_start {
            return Err(ScreenreelError::recorder("mock start failure"));
        }
        self.spy.started.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        self.spy.stops.fetch_add(1, Ordering::SeqCst);
        if self.fail_stop {
            return Err(ScreenreelError::recorder("mock stop failure"));
        }
        if let Some(tail) = self.tail.take() {
            self.spy.sink.chunk(tail);
        }
        self.spy.sink.stopped();
        Ok(())
    }
}

/// Factory for [`MockRecorder`]s
#[derive(Default)]
pub struct MockRecorderFactory {
    recorders: Mutex<Vec<Arc<RecorderSpy>>>,
    tail: Mutex<Option<Bytes>>,
    pub fail_create: AtomicBool,
    pub fail_start: AtomicBool,
    pub fail_stop: AtomicBool,
}

impl MockRecorderFactory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Chunk every recorder emits when stopped
    pub fn set_tail(&self, data: &'static [u8]) {
        *self.tail.lock() = Some(Bytes::from_static(data));
    }

    /// Recorders created so far
    pub fn recorders(&self) -> Vec<Arc<RecorderSpy>> {
        self.recorders.lock().clone()
    }

    /// The most recently created recorder
    pub fn last(&self) -> Arc<RecorderSpy> {
        self.recorders
            .lock()
            .last()
            .cloned()
            .expect("no recorder created")
    }
}

impl RecorderFactory for MockRecorderFactory {
    fn create(
        &self,
        stream: &dyn MediaStream,
        profile: &RecorderProfile,
        sink: RecorderEventSink,
    ) -> Result<Box<dyn Recorder>> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(ScreenreelError::recorder("mock create failure"));
        }

        let spy = Arc::new(RecorderSpy {
            stream_id: stream.id().to_string(),
            profile: profile.clone(),
            sink,
            started: AtomicBool::new(false),
            stops: AtomicUsize::new(0),
        });
        self.recorders.lock().push(spy.clone());

        Ok(Box::new(MockRecorder {
            spy,
            tail: self.tail.lock().clone(),
            fail_start: self.fail_start.load(Ordering::SeqCst),
            fail_stop: self.fail_stop.load(Ordering::SeqCst),
        }))
    }
}

/// Export sink keeping artifacts in memory
#[derive(Default)]
pub struct MockExportSink {
    saved: Mutex<Vec<ExportedArtifact>>,
    pub fail: AtomicBool,
}

impl MockExportSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Artifacts saved so far
    pub fn saved(&self) -> Vec<ExportedArtifact> {
        self.saved.lock().clone()
    }
}

#[async_trait]
impl ExportSink for MockExportSink {
    async fn save(&self, artifact: &ExportedArtifact) -> Result<ExportReceipt> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(ScreenreelError::export("disk full"));
        }
        self.saved.lock().push(artifact.clone());
        Ok(ExportReceipt {
            path: PathBuf::from("/downloads").join(&artifact.filename),
            bytes: artifact.len(),
        })
    }
}

/// All mocks wired into one platform
pub struct MockPlatform {
    pub directory: Arc<MockDirectory>,
    pub acquirer: Arc<MockAcquirer>,
    pub recorders: Arc<MockRecorderFactory>,
    pub export: Arc<MockExportSink>,
}

impl MockPlatform {
    pub fn new() -> Self {
        Self {
            directory: MockDirectory::new(test_sources()),
            acquirer: MockAcquirer::new(),
            recorders: MockRecorderFactory::new(),
            export: MockExportSink::new(),
        }
    }

    pub fn platform(&self) -> Platform {
        Platform {
            directory: self.directory.clone(),
            acquirer: self.acquirer.clone(),
            recorders: self.recorders.clone(),
            export: self.export.clone(),
        }
    }
}

/// Wait until a snapshot satisfies `pred`
pub async fn wait_for_state(
    rx: &mut watch::Receiver<ControllerState>,
    pred: impl FnMut(&ControllerState) -> bool,
) -> ControllerState {
    tokio::time::timeout(TIMEOUT, rx.wait_for(pred))
        .await
        .expect("timed out waiting for state")
        .expect("controller dropped")
        .clone()
}

/// Next notice, failing the test after [`TIMEOUT`]
pub async fn next_notice(rx: &mut broadcast::Receiver<Notice>) -> Notice {
    tokio::time::timeout(TIMEOUT, rx.recv())
        .await
        .expect("timed out waiting for notice")
        .expect("notice channel closed")
}

/// Poll a condition until it holds, failing the test after [`TIMEOUT`]
pub async fn eventually(mut cond: impl FnMut() -> bool) {
    tokio::time::timeout(TIMEOUT, async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition never held");
}
