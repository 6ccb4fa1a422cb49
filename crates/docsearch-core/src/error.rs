use std::path::PathBuf;
use thiserror::Error;

/// Per-file extraction failure. Never fatal to a batch.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed {format} document: {message}")]
    Malformed { format: &'static str, message: String },

    #[error("External tool '{tool}' is not available")]
    ToolMissing { tool: String },

    #[error("External tool '{tool}' failed: {message}")]
    ToolFailed { tool: String, message: String },
}

impl ExtractionError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }

    /// Content-level failures keep the document (indexed by filename with
    /// empty content); the rest drop the file from the run.
    #[must_use]
    pub fn degrades_to_empty(&self) -> bool {
        matches!(
            self,
            Self::Malformed { .. } | Self::ToolMissing { .. } | Self::ToolFailed { .. }
        )
    }
}

/// Raised when a mode string does not name a known variant.
#[derive(Debug, Error)]
#[error("Invalid {kind}: '{value}'")]
pub struct ParseModeError {
    pub kind: &'static str,
    pub value: String,
}
