//! Upload errors

use thiserror::Error;

/// Errors from object store operations
#[derive(Error, Debug)]
pub enum UploadError {
    /// Upload target cannot be constructed
    #[error("invalid upload target: {0}")]
    InvalidTarget(String),

    /// Backend not compiled in
    #[error("unsupported backend: {0}")]
    UnsupportedBackend(String),

    /// Upload failed
    #[error("upload to {location} failed: {message}")]
    UploadFailed { location: String, message: String },

    /// Provider error
    #[error("provider error: {0}")]
    Provider(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
