//! HLS media playlist authoring.
//!
//! The writer tracks segments through an open → closed lifecycle driven
//! by the splitting muxer's fragment events, and renders an EVENT-style
//! media playlist that is rewritten after every closed segment. `eos`
//! finalizes the playlist with an end marker.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::{PlaylistError, Result};

const NANOS_PER_SEC: f64 = 1_000_000_000.0;

/// A closed playlist entry.
#[derive(Debug, Clone)]
struct PlaylistSegment {
    /// Segment URI relative to the playlist.
    name: String,
    /// Duration in seconds.
    duration: f64,
}

/// Writer for one session's media playlist.
#[derive(Debug)]
pub struct PlaylistWriter {
    path: PathBuf,
    target_duration: u32,
    /// Open segments: local path → start running-time (nanoseconds).
    open: HashMap<String, i64>,
    segments: Vec<PlaylistSegment>,
    ended: bool,
}

impl PlaylistWriter {
    /// Create a writer that renders to `path`.
    pub fn new(path: impl Into<PathBuf>, target_duration: u32) -> Self {
        Self {
            path: path.into(),
            target_duration: target_duration.max(1),
            open: HashMap::new(),
            segments: Vec::new(),
            ended: false,
        }
    }

    /// Local path the playlist is written to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of closed segments.
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Record a fragment-opened event.
    pub fn start_segment(&mut self, segment_path: &str, running_time: i64) -> Result<()> {
        if self.open.contains_key(segment_path) {
            return Err(PlaylistError::SegmentAlreadyOpen(segment_path.into()));
        }
        self.open.insert(segment_path.into(), running_time);
        Ok(())
    }

    /// Record a fragment-closed event, moving the segment into the
    /// playlist body.
    pub fn end_segment(&mut self, segment_path: &str, end_time: i64) -> Result<()> {
        let started_at = self
            .open
            .remove(segment_path)
            .ok_or_else(|| PlaylistError::SegmentNotStarted(segment_path.into()))?;

        let duration_nanos = end_time - started_at;
        if duration_nanos <= 0 {
            return Err(PlaylistError::InvalidDuration {
                path: segment_path.into(),
                duration_nanos,
            });
        }

        let name = Path::new(segment_path)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| segment_path.into());

        self.segments.push(PlaylistSegment {
            name,
            duration: duration_nanos as f64 / NANOS_PER_SEC,
        });
        Ok(())
    }

    /// Generate playlist content as M3U8 format.
    pub fn render(&self) -> String {
        let mut lines = vec![
            "#EXTM3U".to_string(),
            "#EXT-X-VERSION:4".to_string(),
            format!("#EXT-X-TARGETDURATION:{}", self.target_duration),
            "#EXT-X-MEDIA-SEQUENCE:0".to_string(),
            "#EXT-X-PLAYLIST-TYPE:EVENT".to_string(),
        ];

        for segment in &self.segments {
            lines.push(format!("#EXTINF:{:.6},", segment.duration));
            lines.push(segment.name.clone());
        }

        if self.ended {
            lines.push("#EXT-X-ENDLIST".to_string());
        }

        lines.push(String::new());
        lines.join("\n")
    }

    /// Write the current playlist to its local path.
    pub fn write(&self) -> Result<()> {
        std::fs::write(&self.path, self.render())?;
        Ok(())
    }

    /// Finalize the playlist: mark it ended and write it out.
    pub fn eos(&mut self) -> Result<()> {
        self.ended = true;
        self.write()
    }
}
