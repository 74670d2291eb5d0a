//! Artifact export
//!
//! Saves a finished recording somewhere the user can find it.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{Result, ScreenreelError};
use crate::recording::ExportedArtifact;

/// Result of a successful export
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportReceipt {
    /// Where the artifact ended up
    pub path: PathBuf,
    /// Bytes written
    pub bytes: usize,
}

/// Accepts one artifact and saves it
#[async_trait]
pub trait ExportSink: Send + Sync {
    /// Save the artifact under its filename
    async fn save(&self, artifact: &ExportedArtifact) -> Result<ExportReceipt>;
}

/// Writes artifacts into a directory on the local filesystem
#[derive(Debug, Clone)]
pub struct DirectoryExportSink {
    dir: PathBuf,
}

impl DirectoryExportSink {
    /// Create a sink writing into `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Target directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl ExportSink for DirectoryExportSink {
    async fn save(&self, artifact: &ExportedArtifact) -> Result<ExportReceipt> {
        if artifact.filename.contains(['/', '\\']) {
            return Err(ScreenreelError::export(format!(
                "Refusing to write outside the export directory: {}",
                artifact.filename
            )));
        }

        if !self.dir.exists() {
            debug!("Creating export directory {:?}", self.dir);
            tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
                ScreenreelError::export(format!(
                    "Failed to create export directory {:?}: {}",
                    self.dir, e
                ))
            })?;
        }

        let path = self.dir.join(&artifact.filename);
        tokio::fs::write(&path, &artifact.data)
            .await
            .map_err(|e| ScreenreelError::export(format!("Failed to write {:?}: {}", path, e)))?;

        info!("Saved {} ({} bytes) to {:?}", artifact.filename, artifact.len(), path);

        Ok(ExportReceipt {
            path,
            bytes: artifact.len(),
        })
    }
}
