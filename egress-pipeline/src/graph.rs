//! Handles onto the already-built media graph.
//!
//! Graph construction (capture elements, encoders, muxers, sinks) happens
//! before the controller starts; the controller only drives state
//! transitions, injects EOS, watches the bus, and asks the output bin to
//! attach or detach streaming sinks.

use tokio::sync::mpsc;

use crate::bus::BusMessage;
use crate::update::verify_stream_url;
use crate::Result;

/// Target state of the media graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphState {
    Null,
    Ready,
    Paused,
    Playing,
}

impl std::fmt::Display for GraphState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Ready => write!(f, "ready"),
            Self::Paused => write!(f, "paused"),
            Self::Playing => write!(f, "playing"),
        }
    }
}

/// Handle onto the media graph root.
pub trait MediaGraph: Send + Sync {
    /// Request a state transition. Asynchronous: a successful return does
    /// not mean the graph has reached the state; completion is observed
    /// on the bus.
    fn set_state(&self, state: GraphState) -> Result<()>;

    /// Transition and wait for the graph to settle. The NULL transition
    /// may block until the graph drains.
    fn block_set_state(&self, state: GraphState) -> Result<()>;

    /// Inject an end-of-stream event at the graph root.
    fn send_eos_event(&self);

    /// Take the graph's message bus. Yields `None` after the first call.
    fn take_bus(&self) -> Option<mpsc::UnboundedReceiver<BusMessage>>;
}

/// Handle onto the output bin of a streaming session.
pub trait StreamOutput: Send + Sync {
    /// Check that a URL is acceptable before any graph mutation.
    fn verify_url(&self, url: &str) -> Result<()> {
        verify_stream_url(url)
    }

    /// Attach a new streaming sink for `url`.
    fn add_sink(&self, url: &str) -> Result<()>;

    /// Detach the sink streaming to `url`.
    fn remove_sink(&self, url: &str) -> Result<()>;

    /// Detach a sink by its element instance name, returning the URL it
    /// was streaming to.
    fn remove_sink_by_name(&self, name: &str) -> Result<String>;
}
