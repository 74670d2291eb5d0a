//! Capture session controller
//!
//! Runs the discovery → selection → record → export lifecycle as a single
//! tokio task. User commands, results of platform calls and recorder events
//! all arrive on one ordered channel and are applied one at a time, so the
//! order in which chunks are appended is the order in which they were
//! emitted.
//!
//! ```text
//! ControllerHandle ──┐
//! directory task  ───┼──▶ inbox ──▶ reduce(state, event) ──▶ watch / notices
//! stream task     ───┤
//! recorder sink   ───┘
//! ```

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

use crate::capture::{Platform, Recorder, RecorderEvent, RecorderEventSink, StreamGuard};
use crate::config::SessionConfig;
use crate::error::{Result, ScreenreelError};
use crate::export::ExportReceipt;
use crate::recording::ChunkBuffer;
use crate::state::{ControllerState, Event, Notice};
use crate::types::{CaptureSource, SessionId};

/// Messages processed by the controller task
enum Inbox {
    Refresh {
        reply: Option<oneshot::Sender<Result<usize>>>,
    },
    Select {
        id: String,
    },
    Start {
        reply: oneshot::Sender<Result<Option<SessionId>>>,
    },
    Stop {
        reply: oneshot::Sender<Option<SessionId>>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
    DirectoryResult {
        epoch: u64,
        result: Result<Vec<CaptureSource>>,
    },
    StreamResult {
        attempt: u64,
        source_id: String,
        result: Result<StreamGuard>,
    },
    Recorder {
        session: SessionId,
        event: RecorderEvent,
    },
    ExportResult {
        session: SessionId,
        filename: String,
        result: Result<ExportReceipt>,
    },
}

/// One recording owned by the controller, from start until export completes
struct ActiveSession {
    source_id: String,
    recorder: Box<dyn Recorder>,
    stream: StreamGuard,
    chunks: ChunkBuffer,
    stopped_at: Option<DateTime<Utc>>,
}

/// Handle for driving a running controller
///
/// Cheap to clone. All methods are safe to call in any state: requests that
/// do not apply (start without a selection, stop while idle) are ignored.
#[derive(Clone)]
pub struct ControllerHandle {
    tx: mpsc::UnboundedSender<Inbox>,
    state_rx: watch::Receiver<ControllerState>,
    notices: broadcast::Sender<Notice>,
}

impl ControllerHandle {
    /// Current state snapshot
    pub fn snapshot(&self) -> ControllerState {
        self.state_rx.borrow().clone()
    }

    /// Receiver that observes every new snapshot
    pub fn watch(&self) -> watch::Receiver<ControllerState> {
        self.state_rx.clone()
    }

    /// Subscribe to user-visible notifications
    pub fn subscribe_notices(&self) -> broadcast::Receiver<Notice> {
        self.notices.subscribe()
    }

    /// Query the source directory again
    ///
    /// Resolves with the number of sources listed. A query overtaken by a
    /// newer one resolves with [`ScreenreelError::Superseded`].
    pub async fn refresh_sources(&self) -> Result<usize> {
        let (reply, rx) = oneshot::channel();
        self.send(Inbox::Refresh { reply: Some(reply) })?;
        rx.await.map_err(|_| ScreenreelError::ControllerClosed)?
    }

    /// Pick the source to record
    pub fn select_source(&self, id: impl Into<String>) -> Result<()> {
        self.send(Inbox::Select { id: id.into() })
    }

    /// Start recording the selected source
    ///
    /// Resolves once the stream request has completed: `Ok(Some(session))`
    /// when recording began, `Ok(None)` when the request did not apply.
    pub async fn start(&self) -> Result<Option<SessionId>> {
        let (reply, rx) = oneshot::channel();
        self.send(Inbox::Start { reply })?;
        rx.await.map_err(|_| ScreenreelError::ControllerClosed)?
    }

    /// Stop the current recording
    ///
    /// Returns the stopped session, or `None` if nothing was recording. The
    /// export outcome is reported later as a [`Notice`].
    pub async fn stop(&self) -> Result<Option<SessionId>> {
        let (reply, rx) = oneshot::channel();
        self.send(Inbox::Stop { reply })?;
        rx.await.map_err(|_| ScreenreelError::ControllerClosed)
    }

    /// Stop any recording, wait for its export, and end the controller task
    pub async fn shutdown(&self) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.send(Inbox::Shutdown { reply })?;
        rx.await.map_err(|_| ScreenreelError::ControllerClosed)
    }

    fn send(&self, msg: Inbox) -> Result<()> {
        self.tx
            .send(msg)
            .map_err(|_| ScreenreelError::ControllerClosed)
    }
}

/// The capture session controller task
pub struct CaptureController {
    platform: Platform,
    config: SessionConfig,
    state: ControllerState,
    state_tx: watch::Sender<ControllerState>,
    notices: broadcast::Sender<Notice>,
    inbox: mpsc::UnboundedReceiver<Inbox>,
    self_tx: mpsc::WeakUnboundedSender<Inbox>,
    sessions: HashMap<SessionId, ActiveSession>,
    pending_refresh: Vec<(u64, oneshot::Sender<Result<usize>>)>,
    pending_start: Option<(u64, oneshot::Sender<Result<Option<SessionId>>>)>,
    pending_shutdown: Vec<oneshot::Sender<()>>,
    exports_in_flight: usize,
    next_epoch: u64,
}

impl CaptureController {
    /// Spawn a controller on the current tokio runtime
    ///
    /// The source directory is queried once immediately.
    pub fn spawn(platform: Platform, config: SessionConfig) -> (ControllerHandle, JoinHandle<()>) {
        let (tx, inbox) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ControllerState::new());
        let (notices, _) = broadcast::channel(32);

        let controller = Self {
            platform,
            config,
            state: ControllerState::new(),
            state_tx,
            notices: notices.clone(),
            inbox,
            self_tx: tx.downgrade(),
            sessions: HashMap::new(),
            pending_refresh: Vec::new(),
            pending_start: None,
            pending_shutdown: Vec::new(),
            exports_in_flight: 0,
            next_epoch: 1,
        };

        // Initial listing, queued ahead of anything the caller sends
        let _ = tx.send(Inbox::Refresh { reply: None });

        let handle = ControllerHandle {
            tx,
            state_rx,
            notices,
        };

        (handle, tokio::spawn(controller.run()))
    }

    async fn run(mut self) {
        info!("Capture controller started");

        while let Some(msg) = self.inbox.recv().await {
            self.handle(msg).await;

            if self.state.closed && self.sessions.is_empty() && self.exports_in_flight == 0 {
                break;
            }
        }

        for reply in self.pending_shutdown.drain(..) {
            let _ = reply.send(());
        }
        info!("Capture controller stopped");
    }

    async fn handle(&mut self, msg: Inbox) {
        match msg {
            Inbox::Refresh { reply } => self.refresh(reply),
            Inbox::Select { id } => {
                if self.state.session.is_recording() {
                    debug!("Ignoring selection of {} while recording", id);
                }
                self.apply(Event::SourceSelected { id });
            }
            Inbox::Start { reply } => self.start(reply),
            Inbox::Stop { reply } => {
                let stopped = self.stop().await;
                let _ = reply.send(stopped);
            }
            Inbox::Shutdown { reply } => self.shutdown(reply).await,
            Inbox::DirectoryResult { epoch, result } => self.on_directory(epoch, result),
            Inbox::StreamResult {
                attempt,
                source_id,
                result,
            } => self.on_stream(attempt, source_id, result).await,
            Inbox::Recorder { session, event } => self.on_recorder(session, event),
            Inbox::ExportResult {
                session,
                filename,
                result,
            } => self.on_export(session, filename, result),
        }
    }

    fn apply(&mut self, event: Event) {
        trace!("Applying {:?}", event);
        let next = self.state.reduce(&event);
        if next == self.state {
            return;
        }

        if next.notice_seq != self.state.notice_seq {
            if let Some(notice) = &next.notice {
                self.publish(notice.clone());
            }
        }

        self.state = next;
        self.state_tx.send_replace(self.state.clone());
    }

    fn publish(&self, notice: Notice) {
        if notice.is_error() {
            warn!("{}", notice);
        } else {
            info!("{}", notice);
        }
        let _ = self.notices.send(notice);
    }

    fn next_epoch(&mut self) -> u64 {
        let epoch = self.next_epoch;
        self.next_epoch += 1;
        epoch
    }

    fn sender(&self) -> Option<mpsc::UnboundedSender<Inbox>> {
        self.self_tx.upgrade()
    }

    fn refresh(&mut self, reply: Option<oneshot::Sender<Result<usize>>>) {
        if self.state.closed {
            if let Some(reply) = reply {
                let _ = reply.send(Err(ScreenreelError::ControllerClosed));
            }
            return;
        }
        let Some(tx) = self.sender() else {
            return;
        };

        let epoch = self.next_epoch();
        self.apply(Event::DirectoryRequested { epoch });

        // Only the newest query can still resolve its caller
        for (_, stale) in self.pending_refresh.drain(..) {
            let _ = stale.send(Err(ScreenreelError::Superseded));
        }
        if let Some(reply) = reply {
            self.pending_refresh.push((epoch, reply));
        }

        debug!("Querying source directory (epoch {})", epoch);
        let directory = self.platform.directory.clone();
        let query = self.config.directory.clone();
        tokio::spawn(async move {
            let result = directory.list_sources(&query).await;
            let _ = tx.send(Inbox::DirectoryResult { epoch, result });
        });
    }

    fn on_directory(&mut self, epoch: u64, result: Result<Vec<CaptureSource>>) {
        if !self.state.accepts_directory(epoch) {
            warn!("Discarding stale source listing (epoch {})", epoch);
            return;
        }

        let reply = self
            .pending_refresh
            .iter()
            .position(|(e, _)| *e == epoch)
            .map(|i| self.pending_refresh.remove(i).1);

        match result {
            Ok(sources) => {
                let count = sources.len();
                info!("Found {} capture sources", count);
                self.apply(Event::DirectoryLoaded { epoch, sources });
                if let Some(reply) = reply {
                    let _ = reply.send(Ok(count));
                }
            }
            Err(e) => {
                error!("Error getting sources: {}", e);
                self.apply(Event::DirectoryFailed {
                    epoch,
                    detail: e.to_string(),
                });
                if let Some(reply) = reply {
                    let _ = reply.send(Err(e));
                }
            }
        }
    }

    fn start(&mut self, reply: oneshot::Sender<Result<Option<SessionId>>>) {
        if !self.state.can_start() {
            debug!(
                "Ignoring start request (selected: {:?}, session: {:?}, starting: {})",
                self.state.selected, self.state.session, self.state.starting
            );
            let _ = reply.send(Ok(None));
            return;
        }
        let (Some(tx), Some(source_id)) = (self.sender(), self.state.selected.clone()) else {
            let _ = reply.send(Ok(None));
            return;
        };

        let attempt = self.next_epoch();
        self.apply(Event::StartRequested { attempt });
        self.pending_start = Some((attempt, reply));

        let request = self.config.stream_request(source_id.clone());
        info!(
            "Requesting stream for {} ({}x{}..{}x{} @ {}fps, audio: {})",
            source_id,
            request.video.min_width,
            request.video.min_height,
            request.video.max_width,
            request.video.max_height,
            request.video.frame_rate.ideal,
            request.audio
        );

        let acquirer = self.platform.acquirer.clone();
        tokio::spawn(async move {
            // Guarded before it crosses the channel so a dropped message still stops the tracks
            let result = acquirer.acquire(&request).await.map(StreamGuard::new);
            let _ = tx.send(Inbox::StreamResult {
                attempt,
                source_id,
                result,
            });
        });
    }

    async fn on_stream(
        &mut self,
        attempt: u64,
        source_id: String,
        result: Result<StreamGuard>,
    ) {
        let reply = match self.pending_start.take() {
            Some((a, reply)) if a == attempt => Some(reply),
            other => {
                self.pending_start = other;
                None
            }
        };

        if !self.state.accepts_start(attempt) {
            warn!("Discarding stale stream for {} (attempt {})", source_id, attempt);
            // Dropping the guard stops the tracks
            drop(result);
            if let Some(reply) = reply {
                let _ = reply.send(Err(ScreenreelError::Superseded));
            }
            return;
        }

        let outcome = match result {
            Ok(guard) => self.begin_session(&source_id, guard).await,
            Err(e) => Err(e),
        };

        match outcome {
            Ok(session) => {
                info!("Recording {} as {}", source_id, session);
                self.apply(Event::CaptureStarted {
                    attempt,
                    session,
                    source_id,
                });
                if let Some(reply) = reply {
                    let _ = reply.send(Ok(Some(session)));
                }
            }
            Err(e) => {
                error!("Error starting capture: {}", e);
                self.apply(Event::CaptureFailed {
                    attempt,
                    detail: e.to_string(),
                });
                if let Some(reply) = reply {
                    let _ = reply.send(Err(e));
                }
            }
        }
    }

    /// Wrap a fresh stream in a started recorder
    ///
    /// On any failure the stream's tracks are stopped before returning.
    async fn begin_session(&mut self, source_id: &str, guard: StreamGuard) -> Result<SessionId> {
        let session = SessionId::new();
        let Some(tx) = self.sender() else {
            return Err(ScreenreelError::ControllerClosed);
        };

        let Some(stream) = guard.stream() else {
            return Err(ScreenreelError::acquisition("stream was already released"));
        };
        debug!(
            "Stream {} for {} has tracks: {:?}",
            stream.id(),
            source_id,
            stream.tracks()
        );

        let sink = RecorderEventSink::new(session, move |session, event| {
            tx.send(Inbox::Recorder { session, event }).is_ok()
        });
        let mut recorder = self
            .platform
            .recorders
            .create(stream, &self.config.profile, sink)?;
        recorder.start().await?;

        self.sessions.insert(
            session,
            ActiveSession {
                source_id: source_id.to_string(),
                recorder,
                stream: guard,
                chunks: ChunkBuffer::new(),
                stopped_at: None,
            },
        );

        Ok(session)
    }

    async fn stop(&mut self) -> Option<SessionId> {
        let session = self.state.session.session()?;
        self.apply(Event::StopRequested);

        let Some(active) = self.sessions.get_mut(&session) else {
            warn!("{} has no recorder to stop", session);
            return Some(session);
        };

        active.stopped_at = Some(Utc::now());
        info!(
            "Stopping {} ({} chunks, {} bytes so far)",
            session,
            active.chunks.len(),
            active.chunks.byte_len()
        );

        if let Err(e) = active.recorder.stop().await {
            // The recorder will not signal completion; finalize with what we have
            error!("Failed to stop recorder for {}: {}", session, e);
            self.finalize(session);
        }

        Some(session)
    }

    async fn shutdown(&mut self, reply: oneshot::Sender<()>) {
        info!("Shutting down capture controller");
        self.pending_shutdown.push(reply);
        if self.state.closed {
            return;
        }

        self.stop().await;
        self.apply(Event::Shutdown);

        for (_, reply) in self.pending_refresh.drain(..) {
            let _ = reply.send(Err(ScreenreelError::ControllerClosed));
        }
        if let Some((_, reply)) = self.pending_start.take() {
            let _ = reply.send(Err(ScreenreelError::ControllerClosed));
        }
    }

    fn on_recorder(&mut self, session: SessionId, event: RecorderEvent) {
        match event {
            RecorderEvent::ChunkProduced(chunk) => match self.sessions.get_mut(&session) {
                Some(active) => {
                    trace!("{} chunk of {} bytes", session, chunk.len());
                    active.chunks.push(chunk);
                }
                None => debug!("Dropping chunk for finished {}", session),
            },
            RecorderEvent::RecordingStopped => {
                if self.state.session.session() == Some(session) {
                    warn!("{} ended without a stop request", session);
                    self.apply(Event::RecordingEnded { session });
                }
                self.finalize(session);
            }
        }
    }

    /// Assemble the artifact, export it, then release the stream
    fn finalize(&mut self, session: SessionId) {
        let Some(active) = self.sessions.remove(&session) else {
            debug!("{} already finalized", session);
            return;
        };

        let ActiveSession {
            source_id,
            recorder,
            mut stream,
            chunks,
            stopped_at,
        } = active;
        drop(recorder);

        let chunk_count = chunks.len();
        let artifact = chunks.into_artifact(stopped_at.unwrap_or_else(Utc::now));
        info!(
            "Finalizing {} from {}: {} chunks, {} bytes -> {}",
            session,
            source_id,
            chunk_count,
            artifact.len(),
            artifact.filename
        );

        let export = self.platform.export.clone();
        let tx = self.sender();
        self.exports_in_flight += 1;
        tokio::spawn(async move {
            let result = export.save(&artifact).await;
            let filename = artifact.filename.clone();
            drop(artifact);
            // Tracks are stopped whether or not the save worked
            stream.release();
            if let Some(tx) = tx {
                let _ = tx.send(Inbox::ExportResult {
                    session,
                    filename,
                    result,
                });
            }
        });
    }

    fn on_export(&mut self, session: SessionId, filename: String, result: Result<ExportReceipt>) {
        self.exports_in_flight = self.exports_in_flight.saturating_sub(1);
        let notice = match result {
            Ok(receipt) => Notice::Exported {
                session,
                filename,
                path: receipt.path,
                bytes: receipt.bytes,
            },
            Err(e) => {
                error!("Failed to export {}: {}", filename, e);
                Notice::ExportFailed {
                    session,
                    filename,
                    detail: e.to_string(),
                }
            }
        };
        self.apply(Event::Notify(notice));
    }
}
