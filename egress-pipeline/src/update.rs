//! In-flight mutation of streaming sinks.

use tokio::sync::oneshot;
use tracing::{info, warn};

use egress_core::{epoch_nanos, EgressType, StreamResult};

use crate::controller::Controller;
use crate::{PipelineError, Result, SINK_ADD_GRACE};

/// Check that a stream URL is well-formed and uses a streamable scheme.
pub fn verify_stream_url(url: &str) -> Result<()> {
    let parsed =
        url::Url::parse(url).map_err(|e| PipelineError::InvalidUrl(format!("{}: {}", url, e)))?;

    match parsed.scheme() {
        "rtmp" | "rtmps" => {}
        scheme => {
            return Err(PipelineError::InvalidUrl(format!(
                "{}: unsupported scheme '{}'",
                url, scheme
            )));
        }
    }

    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(PipelineError::InvalidUrl(format!("{}: missing host", url)));
    }

    Ok(())
}

impl Controller {
    /// Add and remove streaming sinks while the session runs.
    ///
    /// Validation failures reject the whole request before any mutation.
    /// Past validation, per-URL operations succeed or fail independently;
    /// the error aggregates every failure while successful operations
    /// stay committed.
    pub async fn update_stream(&self, add: Vec<String>, remove: Vec<String>) -> Result<()> {
        if self.inner.config.egress_type != EgressType::Stream {
            return Err(PipelineError::InvalidRequest(
                "stream updates are only valid for stream egress".into(),
            ));
        }
        let Some(output) = self.inner.output.clone() else {
            return Err(PipelineError::InvalidRequest(
                "session has no stream output".into(),
            ));
        };

        for url in &add {
            output.verify_url(url)?;
        }

        let mut errors: Vec<String> = Vec::new();
        let mut watchers = Vec::new();
        let now = epoch_nanos();

        for url in add {
            if let Err(e) = output.add_sink(&url) {
                errors.push(e.to_string());
                continue;
            }

            let (tx, rx) = oneshot::channel();
            self.inner.state.lock().stream_errors.insert(url.clone(), tx);

            let ctrl = self.clone();
            watchers.push(tokio::spawn(
                async move { ctrl.watch_new_sink(url, rx, now).await },
            ));
        }

        for url in remove {
            // removing the last output ends the session instead
            let last = self.inner.state.lock().started_at.len() == 1;
            if last {
                self.send_eos();
                continue;
            }

            if let Err(e) = output.remove_sink(&url) {
                errors.push(e.to_string());
                continue;
            }

            let mut guard = self.inner.state.lock();
            let state = &mut *guard;
            let started = state.started_at.remove(&url).unwrap_or(now);
            if let Some(stream) = state.result.stream_mut(&url) {
                stream.duration = now - started;
            }
            info!(url = %url, "stream output removed");
        }

        for watcher in watchers {
            match watcher.await {
                Ok(Some(message)) => errors.push(message),
                Ok(None) => {}
                Err(e) => errors.push(e.to_string()),
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(PipelineError::StreamUpdate(errors.join("\n")))
        }
    }

    /// Race a new sink's error channel against the handshake grace
    /// window. Returns the error message when the sink failed.
    async fn watch_new_sink(
        &self,
        url: String,
        errors: oneshot::Receiver<String>,
        started_at: i64,
    ) -> Option<String> {
        tokio::select! {
            received = errors => match received {
                Ok(message) => {
                    // the error handler already detached the sink
                    warn!(url = %url, message = %message, "new stream output failed");
                    Some(message)
                }
                Err(_) => None,
            },
            _ = tokio::time::sleep(SINK_ADD_GRACE) => {
                let mut guard = self.inner.state.lock();
                let state = &mut *guard;
                state.stream_errors.remove(&url);
                state.started_at.insert(url.clone(), started_at);
                state.result.streams.push(StreamResult { url: url.clone(), duration: 0 });
                drop(guard);

                info!(url = %url, "stream output active");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_stream_url() {
        assert!(verify_stream_url("rtmp://live.example.com/app/key").is_ok());
        assert!(verify_stream_url("rtmps://live.example.com/app/key").is_ok());
        assert!(verify_stream_url("http://example.com/stream").is_err());
        assert!(verify_stream_url("not a url").is_err());
        assert!(verify_stream_url("rtmp://").is_err());
    }
}
