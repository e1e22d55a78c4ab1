//! Request surface: egress types, output containers, upload targets, and
//! the per-session configuration consumed by the controller.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{CoreError, Result};

/// Kind of artifact an egress session produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EgressType {
    /// A single local media file, uploaded after the session ends.
    File,
    /// Fixed-duration media segments plus an index playlist.
    SegmentedFile,
    /// One or more live stream sinks (RTMP).
    Stream,
    /// A websocket media feed.
    Websocket,
}

impl EgressType {
    pub fn name(&self) -> &'static str {
        match self {
            Self::File => "file",
            Self::SegmentedFile => "segmented_file",
            Self::Stream => "stream",
            Self::Websocket => "websocket",
        }
    }
}

impl std::fmt::Display for EgressType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Container-level output tag, carrying the mime type used for uploads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputType {
    Mp4,
    Ogg,
    WebM,
    Ts,
    Hls,
    Raw,
}

impl OutputType {
    /// Mime type reported to the object store on upload.
    pub fn mime(&self) -> &'static str {
        match self {
            Self::Mp4 => "video/mp4",
            Self::Ogg => "audio/ogg",
            Self::WebM => "video/webm",
            Self::Ts => "video/mp2t",
            Self::Hls => "application/x-mpegurl",
            Self::Raw => "audio/x-raw",
        }
    }

    /// Output type of individual segments. HLS playlists index MPEG-TS
    /// fragments; every other container segments as itself.
    pub fn segment_output(&self) -> OutputType {
        match self {
            Self::Hls => Self::Ts,
            other => *other,
        }
    }
}

/// Where produced artifacts are uploaded.
///
/// `None` leaves artifacts on the local filesystem and reports their local
/// paths as locations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum UploadTarget {
    S3(S3Target),
    Gcs(GcsTarget),
    Azure(AzureTarget),
    #[default]
    None,
}

impl UploadTarget {
    /// True when artifacts leave the local filesystem.
    pub fn is_remote(&self) -> bool {
        !matches!(self, Self::None)
    }
}

/// Amazon S3 (or S3-compatible) upload target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3Target {
    pub bucket: String,
    pub region: String,
    /// Custom endpoint for S3-compatible services (MinIO, etc.).
    pub endpoint: Option<String>,
    pub force_path_style: bool,
}

/// Google Cloud Storage upload target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GcsTarget {
    pub bucket: String,
}

/// Azure Blob Storage upload target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AzureTarget {
    pub account_name: String,
    pub container_name: String,
}

/// Per-session configuration consumed by the controller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Unique session identifier.
    pub egress_id: String,
    pub egress_type: EgressType,
    pub output_type: OutputType,
    /// The session's primary local artifact: the media file for file
    /// egress, the index playlist for segmented egress.
    pub local_path: PathBuf,
    /// Remote key prefix for uploaded artifacts.
    pub storage_prefix: String,
    /// Stream sinks attached at startup (stream/websocket egress).
    pub stream_urls: Vec<String>,
    /// Maximum session duration in seconds; 0 disables the cap.
    pub max_duration_secs: u64,
    /// How long to wait for the graph to flush after EOS is requested
    /// before declaring it frozen.
    #[serde(default = "default_eos_timeout_secs")]
    pub eos_timeout_secs: u64,
    pub upload: UploadTarget,
}

fn default_eos_timeout_secs() -> u64 {
    15
}

impl SessionConfig {
    /// Create a configuration with a generated session id and defaults.
    pub fn new(egress_type: EgressType, output_type: OutputType) -> Self {
        Self {
            egress_id: format!("eg_{}", Uuid::new_v4()),
            egress_type,
            output_type,
            local_path: PathBuf::new(),
            storage_prefix: String::new(),
            stream_urls: Vec::new(),
            max_duration_secs: 0,
            eos_timeout_secs: default_eos_timeout_secs(),
            upload: UploadTarget::None,
        }
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if a file-producing egress has no local path, or
    /// the session id is empty.
    pub fn validate(&self) -> Result<()> {
        if self.egress_id.is_empty() {
            return Err(CoreError::InvalidConfig("egress_id must not be empty".into()));
        }

        match self.egress_type {
            EgressType::File | EgressType::SegmentedFile => {
                if self.local_path.as_os_str().is_empty() {
                    return Err(CoreError::InvalidConfig(format!(
                        "{} egress requires a local path",
                        self.egress_type
                    )));
                }
            }
            EgressType::Stream | EgressType::Websocket => {}
        }

        Ok(())
    }

    /// Session duration cap, when one is configured.
    pub fn session_timeout(&self) -> Option<Duration> {
        (self.max_duration_secs > 0).then(|| Duration::from_secs(self.max_duration_secs))
    }

    /// EOS flush deadline.
    pub fn eos_timeout(&self) -> Duration {
        Duration::from_secs(self.eos_timeout_secs)
    }

    /// Remote storage key for a local artifact, under the configured
    /// prefix.
    pub fn storage_path(&self, local: &Path) -> String {
        let name = local
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| local.to_string_lossy().into_owned());

        let prefix = self.storage_prefix.trim_end_matches('/');
        if prefix.is_empty() {
            name
        } else {
            format!("{}/{}", prefix, name)
        }
    }
}
