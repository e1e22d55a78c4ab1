//! The segment upload worker.
//!
//! A single consumer drains a bounded queue of closed segments, so
//! uploads — and the playlist rewrites that follow them — reach the
//! store in the order the muxer closed the fragments.

use std::path::PathBuf;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, error};

use egress_core::EgressType;

use crate::controller::Controller;
use crate::{PipelineError, MAX_PENDING_UPLOADS};

/// One closed segment awaiting upload.
#[derive(Debug, Clone)]
pub struct SegmentUpdate {
    pub local_path: String,
    /// Running time at fragment close, nanoseconds.
    pub end_time: i64,
}

impl Controller {
    pub(crate) fn start_segment_worker(&self) {
        let (tx, mut rx) = mpsc::channel::<SegmentUpdate>(MAX_PENDING_UPLOADS);

        let ctrl = self.clone();
        let worker = tokio::spawn(async move {
            while let Some(update) = rx.recv().await {
                ctrl.process_segment(update).await;
            }
        });

        let mut state = self.inner.state.lock();
        state.segments_tx = Some(tx);
        state.segment_worker = Some(worker);
    }

    /// Queue a closed segment for upload. Never blocks: when the queue is
    /// full the segment is abandoned and the failure logged.
    pub(crate) fn on_segment_ended(&self, local_path: String, end_time: i64) {
        if self.inner.config.egress_type != EgressType::SegmentedFile {
            return;
        }

        let state = self.inner.state.lock();
        let Some(tx) = &state.segments_tx else {
            return;
        };

        match tx.try_send(SegmentUpdate { local_path, end_time }) {
            Ok(()) => {}
            Err(TrySendError::Full(update)) => {
                let err = PipelineError::UploadFailed {
                    location: update.local_path,
                    message: "segment upload queue is full".into(),
                };
                error!(error = %err, "failed to queue segment upload");
            }
            Err(TrySendError::Closed(update)) => {
                debug!(path = %update.local_path, "segment queue already closed");
            }
        }
    }

    /// Upload one segment, then rewrite and re-upload the playlist.
    async fn process_segment(&self, update: SegmentUpdate) {
        {
            let mut state = self.inner.state.lock();
            if let Some(segments) = &mut state.result.segments {
                segments.segment_count += 1;
            }
        }

        let local = PathBuf::from(&update.local_path);
        let mime = self.inner.config.output_type.segment_output().mime();
        // upload errors are logged by store_file and otherwise swallowed
        if let Ok(object) = self.store_file(&local, mime).await {
            let mut state = self.inner.state.lock();
            if let Some(segments) = &mut state.result.segments {
                segments.size += object.size;
            }
        }

        let Some(playlist) = &self.inner.playlist else {
            return;
        };

        let local = {
            let mut playlist = playlist.lock();
            if let Err(e) = playlist.end_segment(&update.local_path, update.end_time) {
                error!(error = %e, path = %update.local_path, "failed to end segment");
                return;
            }
            if let Err(e) = playlist.write() {
                error!(error = %e, "failed to rewrite playlist");
                return;
            }
            playlist.path().to_path_buf()
        };

        // enqueue order guarantees a newer playlist is never overwritten
        // by an older one
        let mime = self.inner.config.output_type.mime();
        if let Ok(object) = self.store_file(&local, mime).await {
            let mut state = self.inner.state.lock();
            if let Some(segments) = &mut state.result.segments {
                segments.playlist_location = Some(object.location);
            }
        }
    }
}
