//! Chunk buffering and artifact assembly
//!
//! A [`ChunkBuffer`] collects a session's encoded chunks in arrival order.
//! When the session finalizes it is turned into one [`ExportedArtifact`]
//! named after the stop time.

use bytes::{Bytes, BytesMut};
use chrono::{DateTime, SecondsFormat, Utc};

use crate::config::ARTIFACT_MIME_TYPE;

/// Filename prefix of exported recordings
pub const FILENAME_PREFIX: &str = "screen-recording-";

/// Filename extension of exported recordings
pub const FILENAME_EXTENSION: &str = "webm";

/// Build the export filename for a recording stopped at `stopped_at`
///
/// The timestamp is rendered as `YYYY-MM-DDTHH:MM:SS.sssZ` with every `:`
/// and `.` replaced by `-`, so existing tooling that globs on these names
/// keeps matching.
pub fn artifact_filename(stopped_at: DateTime<Utc>) -> String {
    let timestamp = stopped_at
        .to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-");
    format!("{}{}.{}", FILENAME_PREFIX, timestamp, FILENAME_EXTENSION)
}

/// Append-only, ordered buffer of encoded chunks for one session
#[derive(Debug, Default)]
pub struct ChunkBuffer {
    chunks: Vec<Bytes>,
    byte_len: usize,
}

impl ChunkBuffer {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk
    pub fn push(&mut self, chunk: Bytes) {
        self.byte_len += chunk.len();
        self.chunks.push(chunk);
    }

    /// Number of chunks received
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Whether no chunks have been received
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Total bytes buffered
    pub fn byte_len(&self) -> usize {
        self.byte_len
    }

    /// Concatenate all chunks into the final artifact
    pub fn into_artifact(self, stopped_at: DateTime<Utc>) -> ExportedArtifact {
        let data = match self.chunks.len() {
            0 => Bytes::new(),
            1 => self.chunks.into_iter().next().unwrap_or_default(),
            _ => {
                let mut data = BytesMut::with_capacity(self.byte_len);
                for chunk in &self.chunks {
                    data.extend_from_slice(chunk);
                }
                data.freeze()
            }
        };

        ExportedArtifact {
            filename: artifact_filename(stopped_at),
            mime_type: ARTIFACT_MIME_TYPE,
            data,
        }
    }
}

/// The assembled recording, handed to an export sink and then dropped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedArtifact {
    /// File name, e.g. `screen-recording-2024-01-02T03-04-05-678Z.webm`
    pub filename: String,
    /// Blob MIME type
    pub mime_type: &'static str,
    /// File contents
    pub data: Bytes,
}

impl ExportedArtifact {
    /// Size in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the recording produced no data
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(ms).single().unwrap()
    }

    #[test]
    fn test_filename_replaces_colons_and_dots() {
        let stopped = DateTime::parse_from_rfc3339("2024-01-02T03:04:05.678Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(
            artifact_filename(stopped),
            "screen-recording-2024-01-02T03-04-05-678Z.webm"
        );
    }

    #[test]
    fn test_filename_keeps_zero_millis() {
        let stopped = Utc.with_ymd_and_hms(2025, 12, 31, 23, 59, 59).unwrap();
        assert_eq!(
            artifact_filename(stopped),
            "screen-recording-2025-12-31T23-59-59-000Z.webm"
        );
    }

    #[test]
    fn test_artifact_concatenates_in_order() {
        let mut buffer = ChunkBuffer::new();
        buffer.push(Bytes::from_static(b"\x1a\x45\xdf\xa3"));
        buffer.push(Bytes::from_static(b"cluster-1"));
        buffer.push(Bytes::from_static(b"cluster-2"));
        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.byte_len(), 22);

        let artifact = buffer.into_artifact(at(0));
        assert_eq!(&artifact.data[..], b"\x1a\x45\xdf\xa3cluster-1cluster-2");
        assert_eq!(artifact.mime_type, "video/webm");
        assert_eq!(
            artifact.filename,
            "screen-recording-1970-01-01T00-00-00-000Z.webm"
        );
    }

    #[test]
    fn test_empty_buffer_gives_empty_artifact() {
        let artifact = ChunkBuffer::new().into_artifact(at(1_500));
        assert!(artifact.is_empty());
        assert_eq!(
            artifact.filename,
            "screen-recording-1970-01-01T00-00-01-500Z.webm"
        );
    }
}
