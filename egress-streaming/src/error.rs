//! Playlist errors

use thiserror::Error;

/// Errors from playlist authoring
#[derive(Error, Debug)]
pub enum PlaylistError {
    /// A fragment-closed event arrived for a segment that was never opened.
    #[error("segment '{0}' was never started")]
    SegmentNotStarted(String),

    /// A fragment-opened event arrived for a segment that is already open.
    #[error("segment '{0}' is already open")]
    SegmentAlreadyOpen(String),

    /// Segment end time precedes its start time.
    #[error("segment '{path}' has non-positive duration ({duration_nanos} ns)")]
    InvalidDuration { path: String, duration_nanos: i64 },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
