//! Unified error types for audioprint
//!
//! Error strategy:
//! - Per-file errors (read, decode, tags, features): Recoverable, recorded
//!   in the output document as error records, batch continues
//! - Cache errors: Degraded mode, fall back to recomputation
//! - System errors (output, schema violation): Fatal, abort the run
//!
//! All errors include actionable suggestions where possible.

use std::path::PathBuf;
use thiserror::Error;

/// Supported audio formats for helpful error messages
pub const SUPPORTED_FORMATS: &str = "MP3, FLAC, WAV";

/// Top-level error type for audioprint operations
#[derive(Debug, Error)]
pub enum AudioprintError {
    // =========================================================================
    // Recoverable errors - recorded per file, continue batch
    // =========================================================================
    #[error("Failed to read '{path}': {reason}\n  Tip: Check the file exists and is readable")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to decode audio file '{path}': {reason}\n  Supported formats: {SUPPORTED_FORMATS}\n  Tip: If the file plays in other apps, it may be corrupted or use an unsupported codec")]
    DecodeError { path: PathBuf, reason: String },

    #[error("Failed to read tags from '{path}': {reason}")]
    TagError { path: PathBuf, reason: String },

    #[error("Feature extraction failed for '{path}': {reason}")]
    FeatureError { path: PathBuf, reason: String },

    // =========================================================================
    // Degraded mode - falls back to recomputation, never fails a file
    // =========================================================================
    #[error("Cache error: {0}")]
    CacheError(String),

    // =========================================================================
    // Fatal errors - abort entire run
    // =========================================================================
    #[error("File not found: '{0}'\n  Tip: Check the path exists and is accessible")]
    FileNotFound(PathBuf),

    #[error("Unsupported audio format for '{path}': {format}\n  Supported formats: {SUPPORTED_FORMATS}")]
    UnsupportedFormat { path: PathBuf, format: String },

    #[error("Cannot write output to '{path}': {reason}\n  Tip: Check write permissions for the output location")]
    OutputError { path: PathBuf, reason: String },

    #[error("Assembled document violates the output schema: {0}")]
    SchemaViolation(String),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for audioprint operations
pub type Result<T> = std::result::Result<T, AudioprintError>;

impl AudioprintError {
    /// Returns true if this error is file-level (record it, continue the batch)
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AudioprintError::ReadError { .. }
                | AudioprintError::DecodeError { .. }
                | AudioprintError::TagError { .. }
                | AudioprintError::FeatureError { .. }
        )
    }

    /// Returns true if this error only degrades caching
    pub fn is_cache_error(&self) -> bool {
        matches!(self, AudioprintError::CacheError(_))
    }

    /// Create a decode error with context about the issue
    pub fn decode_error(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        AudioprintError::DecodeError {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a read error from an underlying I/O failure
    pub fn read_error(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        let path = path.into();
        let reason = match err.kind() {
            std::io::ErrorKind::PermissionDenied => {
                format!(
                    "Permission denied. Check that you have read access to {}",
                    path.display()
                )
            }
            std::io::ErrorKind::NotFound => "File disappeared during processing".to_string(),
            _ => err.to_string(),
        };
        AudioprintError::ReadError { path, reason }
    }

    /// Create an output error, checking for common issues
    pub fn output_error(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        let path = path.into();
        let reason = match err.kind() {
            std::io::ErrorKind::PermissionDenied => {
                format!(
                    "Permission denied. Check that you have write access to {}",
                    path.display()
                )
            }
            std::io::ErrorKind::NotFound => {
                format!(
                    "Directory does not exist: {}",
                    path.parent()
                        .map(|p| p.display().to_string())
                        .unwrap_or_default()
                )
            }
            _ => err.to_string(),
        };
        AudioprintError::OutputError { path, reason }
    }
}
