//! Capture session state machine
//!
//! [`ControllerState`] is an immutable snapshot. Every change goes through
//! [`ControllerState::reduce`], a pure function of the previous snapshot and
//! one [`Event`]. The controller task owns the current snapshot and publishes
//! each new one to observers.
//!
//! Asynchronous requests are tagged with an epoch. Results carrying an epoch
//! that is no longer current are ignored by the reducer, which is how late
//! directory listings and stream grants are kept from touching newer state.

use std::sync::Arc;

use crate::types::{CaptureSource, SessionId};

/// User-visible message shown when listing sources fails
pub const DIRECTORY_FAILED_MESSAGE: &str =
    "Failed to get screen capture sources. Please try again.";

/// User-visible message shown when a recording cannot be started
pub const CAPTURE_FAILED_MESSAGE: &str =
    "Failed to start recording. Please make sure you have granted the necessary permissions.";

/// Whether a recording is in progress
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionState {
    /// Not recording
    #[default]
    Idle,
    /// Recording one source
    Recording {
        /// Session being recorded
        session: SessionId,
        /// Source bound to the session's stream
        source_id: String,
    },
}

impl SessionState {
    /// Whether this is the recording state
    pub fn is_recording(&self) -> bool {
        matches!(self, Self::Recording { .. })
    }

    /// Session being recorded, if any
    pub fn session(&self) -> Option<SessionId> {
        match self {
            Self::Recording { session, .. } => Some(*session),
            Self::Idle => None,
        }
    }
}

/// Notification surfaced to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// Listing sources failed
    DirectoryFailed {
        /// Underlying error
        detail: String,
    },
    /// Starting a recording failed
    CaptureFailed {
        /// Underlying error
        detail: String,
    },
    /// Recording ended without being asked to (stream or encoder died)
    RecordingInterrupted {
        /// Session that ended
        session: SessionId,
    },
    /// A recording was saved
    Exported {
        /// Session that produced the file
        session: SessionId,
        /// File name
        filename: String,
        /// Where it was written
        path: std::path::PathBuf,
        /// Size in bytes
        bytes: usize,
    },
    /// Saving a recording failed
    ExportFailed {
        /// Session that produced the data
        session: SessionId,
        /// File name that could not be saved
        filename: String,
        /// Underlying error
        detail: String,
    },
}

impl Notice {
    /// Text to show the user
    pub fn message(&self) -> String {
        match self {
            Self::DirectoryFailed { .. } => DIRECTORY_FAILED_MESSAGE.to_string(),
            Self::CaptureFailed { .. } => CAPTURE_FAILED_MESSAGE.to_string(),
            Self::RecordingInterrupted { .. } => {
                "Recording stopped unexpectedly. The captured part will be saved.".to_string()
            }
            Self::Exported { path, .. } => format!("Recording saved to {}", path.display()),
            Self::ExportFailed { filename, detail, .. } => {
                format!("Failed to save {}: {}", filename, detail)
            }
        }
    }

    /// Whether this notice reports a failure
    pub fn is_error(&self) -> bool {
        !matches!(self, Self::Exported { .. })
    }
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

/// Input to the state machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A directory query was issued
    DirectoryRequested {
        /// Epoch tag of the query
        epoch: u64,
    },
    /// A directory query returned sources
    DirectoryLoaded {
        /// Epoch tag of the query
        epoch: u64,
        /// Sources in platform order
        sources: Vec<CaptureSource>,
    },
    /// A directory query failed
    DirectoryFailed {
        /// Epoch tag of the query
        epoch: u64,
        /// Error description
        detail: String,
    },
    /// The user picked a source
    SourceSelected {
        /// Source identifier
        id: String,
    },
    /// A stream was requested for the selected source
    StartRequested {
        /// Epoch tag of the attempt
        attempt: u64,
    },
    /// Stream and recorder are up; recording has begun
    CaptureStarted {
        /// Epoch tag of the attempt
        attempt: u64,
        /// New session
        session: SessionId,
        /// Source the stream is bound to
        source_id: String,
    },
    /// Stream acquisition or recorder setup failed
    CaptureFailed {
        /// Epoch tag of the attempt
        attempt: u64,
        /// Error description
        detail: String,
    },
    /// The user stopped the recording
    StopRequested,
    /// The recorder finished on its own while still recording
    RecordingEnded {
        /// Session that ended
        session: SessionId,
    },
    /// A notice to surface that is not tied to a transition
    Notify(Notice),
    /// The controller is being torn down; outstanding requests become stale
    Shutdown,
}

/// Immutable snapshot of the capture controller
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControllerState {
    /// Sources from the last successful listing
    pub sources: Arc<[CaptureSource]>,
    /// Source the user picked, if any
    pub selected: Option<String>,
    /// Recording state
    pub session: SessionState,
    /// Epoch of the most recent directory query
    pub directory_epoch: u64,
    /// Whether the most recent directory query is still in flight
    pub loading_sources: bool,
    /// Epoch of the most recent start attempt
    pub start_epoch: u64,
    /// Whether a start attempt is waiting on its stream
    pub starting: bool,
    /// Most recent notification
    pub notice: Option<Notice>,
    /// Number of notifications raised so far
    pub notice_seq: u64,
    /// Set once the controller is shutting down
    pub closed: bool,
}

impl ControllerState {
    /// Initial state: idle, no sources, nothing selected
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a start request would do anything
    pub fn can_start(&self) -> bool {
        !self.closed && !self.starting && !self.session.is_recording() && self.selected.is_some()
    }

    /// Whether a stop request would do anything
    pub fn can_stop(&self) -> bool {
        self.session.is_recording()
    }

    /// Whether a directory result with this epoch would be applied
    pub fn accepts_directory(&self, epoch: u64) -> bool {
        !self.closed && self.loading_sources && epoch == self.directory_epoch
    }

    /// Whether a start result with this attempt would be applied
    pub fn accepts_start(&self, attempt: u64) -> bool {
        !self.closed && self.starting && attempt == self.start_epoch
    }

    /// Look up a source from the last listing
    pub fn source(&self, id: &str) -> Option<&CaptureSource> {
        self.sources.iter().find(|s| s.id == id)
    }

    /// The selected source, if it is in the last listing
    pub fn selected_source(&self) -> Option<&CaptureSource> {
        self.selected.as_deref().and_then(|id| self.source(id))
    }

    fn raise(&mut self, notice: Notice) {
        self.notice = Some(notice);
        self.notice_seq += 1;
    }

    /// Apply one event, returning the next snapshot
    pub fn reduce(&self, event: &Event) -> ControllerState {
        let mut next = self.clone();

        match event {
            Event::DirectoryRequested { epoch } => {
                if self.closed || *epoch <= self.directory_epoch {
                    return next;
                }
                next.directory_epoch = *epoch;
                next.loading_sources = true;
            }
            Event::DirectoryLoaded { epoch, sources } => {
                if !self.accepts_directory(*epoch) {
                    return next;
                }
                next.loading_sources = false;
                next.sources = sources.clone().into();
                // A fresh listing invalidates whatever was picked from the old one
                next.selected = None;
            }
            Event::DirectoryFailed { epoch, detail } => {
                if !self.accepts_directory(*epoch) {
                    return next;
                }
                next.loading_sources = false;
                next.sources = Arc::from(Vec::new());
                next.raise(Notice::DirectoryFailed {
                    detail: detail.clone(),
                });
            }
            Event::SourceSelected { id } => {
                if self.closed || self.session.is_recording() {
                    return next;
                }
                next.selected = Some(id.clone());
            }
            Event::StartRequested { attempt } => {
                if !self.can_start() || *attempt <= self.start_epoch {
                    return next;
                }
                next.start_epoch = *attempt;
                next.starting = true;
            }
            Event::CaptureStarted {
                attempt,
                session,
                source_id,
            } => {
                if !self.accepts_start(*attempt) {
                    return next;
                }
                next.starting = false;
                next.session = SessionState::Recording {
                    session: *session,
                    source_id: source_id.clone(),
                };
            }
            Event::CaptureFailed { attempt, detail } => {
                if !self.accepts_start(*attempt) {
                    return next;
                }
                next.starting = false;
                next.raise(Notice::CaptureFailed {
                    detail: detail.clone(),
                });
            }
            Event::StopRequested => {
                next.session = SessionState::Idle;
            }
            Event::RecordingEnded { session } => {
                if self.session.session() == Some(*session) {
                    next.session = SessionState::Idle;
                    next.raise(Notice::RecordingInterrupted { session: *session });
                }
            }
            Event::Notify(notice) => {
                next.raise(notice.clone());
            }
            Event::Shutdown => {
                next.closed = true;
                next.loading_sources = false;
                next.starting = false;
            }
        }

        next
    }
}
