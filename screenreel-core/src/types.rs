//! Core types for screenreel
//!
//! These types describe what can be captured and identify the pieces of a
//! capture session as they move through the controller.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Global counter for unique session IDs
static SESSION_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Opaque identifier for one recording session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(u64);

impl SessionId {
    /// Create a new unique session ID
    pub fn new() -> Self {
        Self(SESSION_COUNTER.fetch_add(1, Ordering::SeqCst))
    }

    /// Get the raw value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Session({})", self.0)
    }
}

/// Kind of capture source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Individual window capture
    Window,
    /// Full screen/monitor capture
    Screen,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceKind::Window => write!(f, "Window"),
            SourceKind::Screen => write!(f, "Screen"),
        }
    }
}

impl std::str::FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "window" => Ok(Self::Window),
            "screen" | "monitor" => Ok(Self::Screen),
            _ => Err(format!("Unknown source kind: {}", s)),
        }
    }
}

/// PNG-encoded preview image of a source
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Thumbnail {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// PNG bytes (empty if no preview could be taken)
    pub png: Bytes,
}

impl Thumbnail {
    /// Create a thumbnail from PNG bytes
    pub fn new(width: u32, height: u32, png: impl Into<Bytes>) -> Self {
        Self {
            width,
            height,
            png: png.into(),
        }
    }

    /// Whether a preview image is present
    pub fn is_empty(&self) -> bool {
        self.png.is_empty()
    }

    /// Render as a `data:` URL suitable for an `<img src>`
    pub fn to_data_url(&self) -> String {
        if self.png.is_empty() {
            return "data:,".to_string();
        }
        format!("data:image/png;base64,{}", BASE64.encode(&self.png))
    }
}

impl Serialize for Thumbnail {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut s = serializer.serialize_struct("Thumbnail", 3)?;
        s.serialize_field("width", &self.width)?;
        s.serialize_field("height", &self.height)?;
        s.serialize_field("data_url", &self.to_data_url())?;
        s.end()
    }
}

/// A capturable screen or window, as returned by one directory listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaptureSource {
    /// Opaque identifier understood by the stream acquirer
    pub id: String,
    /// Human-readable name
    pub name: String,
    /// What kind of source this is
    pub kind: SourceKind,
    /// Preview image
    pub thumbnail: Thumbnail,
}

impl CaptureSource {
    /// Create a new source without a preview
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: SourceKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            thumbnail: Thumbnail::default(),
        }
    }

    /// Attach a preview image
    pub fn with_thumbnail(mut self, thumbnail: Thumbnail) -> Self {
        self.thumbnail = thumbnail;
        self
    }
}

impl std::fmt::Display for CaptureSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} - {} ({})", self.id, self.name, self.kind)
    }
}

/// Kind of media carried by a stream track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    /// Audio track
    Audio,
    /// Video track
    Video,
}

impl std::fmt::Display for TrackKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackKind::Audio => write!(f, "audio"),
            TrackKind::Video => write!(f, "video"),
        }
    }
}

/// Description of one track in a live stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackInfo {
    /// Track kind
    pub kind: TrackKind,
    /// Device or source label
    pub label: String,
}

impl TrackInfo {
    /// Create a new track description
    pub fn new(kind: TrackKind, label: impl Into<String>) -> Self {
        Self {
            kind,
            label: label.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_ids_are_unique() {
        let a = SessionId::new();
        let b = SessionId::new();
        assert_ne!(a, b);
        assert!(b.as_u64() > a.as_u64());
    }

    #[test]
    fn test_source_kind_parse() {
        assert_eq!("window".parse::<SourceKind>().ok(), Some(SourceKind::Window));
        assert_eq!("Screen".parse::<SourceKind>().ok(), Some(SourceKind::Screen));
        assert_eq!("monitor".parse::<SourceKind>().ok(), Some(SourceKind::Screen));
        assert!("tab".parse::<SourceKind>().is_err());
    }

    #[test]
    fn test_thumbnail_data_url() {
        let thumb = Thumbnail::new(2, 1, vec![0x89, b'P', b'N', b'G']);
        assert_eq!(thumb.to_data_url(), "data:image/png;base64,iVBORw==");
        assert_eq!(Thumbnail::default().to_data_url(), "data:,");
    }

    #[test]
    fn test_source_serializes_thumbnail_as_data_url() {
        let source = CaptureSource::new("screen:0", "Screen 1", SourceKind::Screen)
            .with_thumbnail(Thumbnail::new(300, 200, vec![1, 2, 3]));
        let json = serde_json::to_value(&source).unwrap();
        assert_eq!(json["kind"], "screen");
        assert_eq!(json["thumbnail"]["data_url"], "data:image/png;base64,AQID");
    }
}
