//! Error types for canvas access and project I/O.

use std::path::PathBuf;
use thiserror::Error;

/// Guards on pixel-buffer access. These indicate a caller bug and are never
/// shown to the user; tools bounds-check before mutating.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CanvasError {
    #[error("pixel ({x}, {y}) is outside the {width}x{height} canvas")]
    OutOfBounds {
        x: i64,
        y: i64,
        width: u32,
        height: u32,
    },

    #[error("invalid canvas size {width}x{height}")]
    InvalidSize { width: u32, height: u32 },

    #[error("pixel data has {actual} bytes, expected {expected}")]
    DataLength { expected: usize, actual: usize },
}

/// Errors at the project file boundary (load, save, export).
#[derive(Error, Debug)]
pub enum ProjectError {
    #[error("file does not exist: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("location is not writable: {}", .0.display())]
    PermissionDenied(PathBuf),

    /// The file exists but its structure is not a valid project.
    #[error("project file is corrupt: {0}")]
    CorruptData(String),

    #[error("could not read {}: {source}", path.display())]
    ReadFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not write {}: {reason}", path.display())]
    WriteFailure { path: PathBuf, reason: String },

    /// A new-project request or CLI argument failed validation.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl From<CanvasError> for ProjectError {
    fn from(e: CanvasError) -> Self {
        ProjectError::CorruptData(e.to_string())
    }
}

/// Non-fatal conditions surfaced alongside a successful load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadWarning {
    /// The file was written by a different format version and may display incorrectly.
    VersionMismatch { found: String, expected: String },
}

impl std::fmt::Display for LoadWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadWarning::VersionMismatch { found, expected } => write!(
                f,
                "project was saved with format {} (current {}); it may display incorrectly",
                found, expected
            ),
        }
    }
}
