//! Media egress pipeline controller
//!
//! The controller drives one egress session over an already-built media
//! graph: it sequences startup and teardown, translates the graph's bus
//! messages into session transitions, mutates streaming sinks while the
//! graph is live, uploads produced segments in order, and emits a
//! terminal [`EgressResult`](egress_core::EgressResult).
//!
//! Collaborators (the graph, the media source, the object store, the
//! playlist writer) are consumed through opaque handles; see [`graph`],
//! [`source`], and the `egress-cloud` / `egress-streaming` crates.

use std::time::Duration;

mod bus;
mod controller;
mod dispatch;
mod error;
mod graph;
mod segments;
mod source;
mod timers;
mod update;

pub use bus::*;
pub use controller::*;
pub use error::*;
pub use graph::*;
pub use segments::SegmentUpdate;
pub use source::*;
pub use update::verify_stream_url;

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Bus-message source name of the graph root.
pub const PIPELINE_SOURCE: &str = "pipeline";

/// Structure name of the splitting muxer's fragment-opened notification.
pub const FRAGMENT_OPENED_MESSAGE: &str = "splitmuxsink-fragment-opened";
/// Structure name of the splitting muxer's fragment-closed notification.
pub const FRAGMENT_CLOSED_MESSAGE: &str = "splitmuxsink-fragment-closed";
/// Fragment structure field holding the segment's local path.
pub const FRAGMENT_LOCATION: &str = "location";
/// Fragment structure field holding the running time in nanoseconds.
pub const FRAGMENT_RUNNING_TIME: &str = "running-time";

/// Element class whose failures are recoverable per-sink once playing.
pub const ELEMENT_RTMP_SINK: &str = "GstRtmp2Sink";

/// Sentinel start-time key for sessions producing a single artifact.
pub(crate) const FILE_KEY: &str = "file";

/// Upper bound on queued segment uploads before enqueueing fails fast.
pub(crate) const MAX_PENDING_UPLOADS: usize = 100;

/// Handshake window during which a newly attached stream sink may still
/// surface a connection failure on the bus.
pub(crate) const SINK_ADD_GRACE: Duration = Duration::from_secs(1);
