//! Handles onto the external media source feeding the graph.
//!
//! The controller only observes lifecycle signals: readiness, the end of
//! the room, and (for SDK sources) the source's own clock. Everything
//! else about capture is the source's business.

use std::sync::Arc;

use tokio::sync::watch;

/// Bus source name of the audio app source element.
pub const AUDIO_APP_SOURCE: &str = "audio_src";
/// Bus source name of the video app source element.
pub const VIDEO_APP_SOURCE: &str = "video_src";

/// Lifecycle hooks shared by every source kind.
pub trait SourceEvents: Send + Sync {
    /// Begin recording. Returns a readiness signal to wait on, or `None`
    /// when the source is ready immediately.
    fn start_recording(&self) -> Option<watch::Receiver<bool>>;

    /// Signal observed when the room or capture ends.
    fn end_recording(&self) -> watch::Receiver<bool>;

    /// Release the source.
    fn close(&self);
}

/// A source driven through the SDK, feeding app source elements and
/// keeping its own clock.
pub trait SdkSource: SourceEvents {
    /// Dispatch EOS through the SDK so track buffers flush.
    fn send_eos(&self);

    /// Notify the source that one of its app source elements reached
    /// PLAYING and may be fed.
    fn playing(&self, app_source: &str);

    /// Capture start per the source's clock, UNIX nanoseconds.
    fn start_time(&self) -> i64;

    /// Capture end per the source's clock, UNIX nanoseconds.
    fn end_time(&self) -> i64;
}

/// A source rendered by the embedded web view; EOS is injected at the
/// graph root and timing follows the wall clock.
pub trait WebSource: SourceEvents {}

/// Tagged source variant, dispatched by tag at each use site.
#[derive(Clone)]
pub enum SourceHandle {
    Sdk(Arc<dyn SdkSource>),
    Web(Arc<dyn WebSource>),
}

impl SourceHandle {
    /// The lifecycle hooks common to both variants.
    pub fn events(&self) -> &dyn SourceEvents {
        match self {
            Self::Sdk(s) => s.as_ref(),
            Self::Web(s) => s.as_ref(),
        }
    }

    pub fn is_web(&self) -> bool {
        matches!(self, Self::Web(_))
    }
}

impl std::fmt::Debug for SourceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sdk(_) => f.write_str("SourceHandle::Sdk"),
            Self::Web(_) => f.write_str("SourceHandle::Web"),
        }
    }
}

/// Wait until a lifecycle signal flips true, or its sender goes away.
pub(crate) async fn signalled(mut rx: watch::Receiver<bool>) {
    if *rx.borrow() {
        return;
    }
    while rx.changed().await.is_ok() {
        if *rx.borrow() {
            return;
        }
    }
}
