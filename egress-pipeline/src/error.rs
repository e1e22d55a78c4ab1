//! Pipeline errors

use thiserror::Error;

/// Errors from the session controller and its collaborators.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The request is not valid for this session.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A stream output URL is malformed or uses an unsupported scheme.
    #[error("invalid stream url: {0}")]
    InvalidUrl(String),

    /// The media graph rejected an operation.
    #[error("graph error: {0}")]
    Graph(String),

    /// One or more per-URL stream mutations failed. Successful mutations
    /// in the same request have already committed.
    #[error("stream update failed: {0}")]
    StreamUpdate(String),

    /// An artifact could not be uploaded.
    #[error("upload of {location} failed: {message}")]
    UploadFailed { location: String, message: String },

    /// A bus element message did not carry the expected fields.
    #[error("malformed bus message: {0}")]
    MalformedMessage(String),

    #[error(transparent)]
    Core(#[from] egress_core::CoreError),

    #[error(transparent)]
    Upload(#[from] egress_cloud::UploadError),
}
