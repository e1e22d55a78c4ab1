//! The terminal result record emitted by an egress session.

use serde::{Deserialize, Serialize};

use crate::{EgressType, SessionConfig};

/// Session lifecycle status.
///
/// Transitions move strictly forward: Starting → Active → Ending →
/// Complete/Failed, with Starting → Aborted permitted before the session
/// ever becomes active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EgressStatus {
    Starting,
    Active,
    Ending,
    Complete,
    Failed,
    Aborted,
}

impl EgressStatus {
    /// True for states no session ever leaves.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Failed | Self::Aborted)
    }
}

impl std::fmt::Display for EgressStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Starting => write!(f, "starting"),
            Self::Active => write!(f, "active"),
            Self::Ending => write!(f, "ending"),
            Self::Complete => write!(f, "complete"),
            Self::Failed => write!(f, "failed"),
            Self::Aborted => write!(f, "aborted"),
        }
    }
}

/// Result payload for a single-file egress.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileResult {
    /// Where the file ended up (remote URL, or local path without an
    /// upload target).
    pub location: String,
    /// Size in bytes.
    pub size: u64,
    /// Recorded duration in nanoseconds.
    pub duration: i64,
}

/// Result payload for a segmented egress.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SegmentsResult {
    /// Number of segments the upload worker dequeued.
    pub segment_count: u64,
    /// Total uploaded segment bytes.
    pub size: u64,
    /// Location of the finalized playlist, when one was produced.
    pub playlist_location: Option<String>,
    /// Recorded duration in nanoseconds.
    pub duration: i64,
}

/// Result payload for one stream sink.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamResult {
    pub url: String,
    /// Time the sink spent active, in nanoseconds. Written exactly once,
    /// when the sink is removed or the session terminates.
    pub duration: i64,
}

/// The per-session result record.
///
/// Exactly one of `file`, `segments`, or `streams` carries data,
/// consistent with `egress_type`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EgressResult {
    pub egress_id: String,
    pub egress_type: EgressType,
    pub status: EgressStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Wall-clock UNIX nanoseconds at `run()` entry.
    pub started_at: i64,
    /// Wall-clock UNIX nanoseconds at terminal transition.
    pub ended_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<FileResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub segments: Option<SegmentsResult>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub streams: Vec<StreamResult>,
}

impl EgressResult {
    /// Create the initial record for a session, with the payload slot
    /// matching the egress type pre-populated.
    pub fn new(config: &SessionConfig) -> Self {
        let mut result = Self {
            egress_id: config.egress_id.clone(),
            egress_type: config.egress_type,
            status: EgressStatus::Starting,
            error: None,
            started_at: 0,
            ended_at: 0,
            file: None,
            segments: None,
            streams: Vec::new(),
        };

        match config.egress_type {
            EgressType::File => result.file = Some(FileResult::default()),
            EgressType::SegmentedFile => result.segments = Some(SegmentsResult::default()),
            EgressType::Stream | EgressType::Websocket => {
                result.streams = config
                    .stream_urls
                    .iter()
                    .map(|url| StreamResult {
                        url: url.clone(),
                        duration: 0,
                    })
                    .collect();
            }
        }

        result
    }

    /// Mutable access to the record for one stream URL.
    pub fn stream_mut(&mut self, url: &str) -> Option<&mut StreamResult> {
        self.streams.iter_mut().find(|s| s.url == url)
    }
}
