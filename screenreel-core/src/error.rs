//! Error types for screenreel

use thiserror::Error;

/// Result type alias using ScreenreelError
pub type Result<T> = std::result::Result<T, ScreenreelError>;

/// Main error type for screenreel operations
#[derive(Debug, Error)]
pub enum ScreenreelError {
    /// Listing capture sources failed (permission denied, platform unavailable)
    #[error("Source directory error: {0}")]
    DirectoryQuery(String),

    /// Acquiring a live stream failed (permission denied, stale id, device busy)
    #[error("Stream acquisition error: {0}")]
    StreamAcquisition(String),

    /// Recorder construction or runtime error
    #[error("Recorder error: {0}")]
    Recorder(String),

    /// Saving the finished recording failed
    #[error("Export error: {0}")]
    Export(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Source not found
    #[error("Source not found: {0}")]
    SourceNotFound(String),

    /// Capture session not active
    #[error("No active capture session")]
    NoActiveSession,

    /// Session already running
    #[error("Capture session already running")]
    SessionAlreadyRunning,

    /// The controller task has shut down
    #[error("Capture controller is not running")]
    ControllerClosed,

    /// The request was overtaken by a newer one before its result arrived
    #[error("Request superseded by a newer one")]
    Superseded,

    /// Unsupported operation
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<ScreenreelError>,
    },
}

impl ScreenreelError {
    /// Create a source directory error
    pub fn directory(msg: impl Into<String>) -> Self {
        Self::DirectoryQuery(msg.into())
    }

    /// Create a stream acquisition error
    pub fn acquisition(msg: impl Into<String>) -> Self {
        Self::StreamAcquisition(msg.into())
    }

    /// Create a recorder error
    pub fn recorder(msg: impl Into<String>) -> Self {
        Self::Recorder(msg.into())
    }

    /// Create an export error
    pub fn export(msg: impl Into<String>) -> Self {
        Self::Export(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Innermost error, skipping any context wrappers
    pub fn root(&self) -> &ScreenreelError {
        match self {
            Self::WithContext { source, .. } => source.root(),
            other => other,
        }
    }

    /// A short suggestion for the user on how to fix the problem
    pub fn user_hint(&self) -> Option<&'static str> {
        match self.root() {
            Self::DirectoryQuery(_) => {
                Some("Make sure an X11 session is running and xrandr/wmctrl are installed")
            }
            Self::StreamAcquisition(_) => Some(
                "Make sure ffmpeg is installed and the source still exists (run `screenreel list`)",
            ),
            Self::Recorder(_) => Some("Check that your ffmpeg build includes libvpx-vp9"),
            Self::Export(_) => Some("Check that the export directory exists and is writable"),
            Self::Config(_) => {
                Some("Check ~/.config/screenreel/config.toml (see `screenreel config sample`)")
            }
            Self::SourceNotFound(_) => Some("Run `screenreel list` to see available sources"),
            Self::NoActiveSession => Some("Start a recording with `screenreel record`"),
            Self::SessionAlreadyRunning => Some("Stop the current recording first"),
            _ => None,
        }
    }

    /// Whether the user can resolve this error without code changes
    pub fn is_user_recoverable(&self) -> bool {
        matches!(
            self.root(),
            Self::DirectoryQuery(_)
                | Self::StreamAcquisition(_)
                | Self::Export(_)
                | Self::Config(_)
                | Self::SourceNotFound(_)
                | Self::NoActiveSession
                | Self::SessionAlreadyRunning
        )
    }
}

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

// Conversions from external error types

impl From<toml::de::Error> for ScreenreelError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<serde_json::Error> for ScreenreelError {
    fn from(err: serde_json::Error) -> Self {
        Self::Config(format!("JSON error: {}", err))
    }
}
