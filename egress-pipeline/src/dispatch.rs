//! The event dispatcher: one bus message in, one session transition out.
//!
//! Runs on the main event loop. Returning `false` from
//! [`Controller::on_bus_message`] terminates the loop.

use std::sync::atomic::Ordering;

use tracing::{debug, error};

use egress_core::epoch_nanos;

use crate::bus::{parse_debug_info, segment_params, BusMessage, ErrorMessage};
use crate::controller::Controller;
use crate::graph::GraphState;
use crate::source::{SourceHandle, AUDIO_APP_SOURCE, VIDEO_APP_SOURCE};
use crate::{ELEMENT_RTMP_SINK, FRAGMENT_CLOSED_MESSAGE, FRAGMENT_OPENED_MESSAGE, PIPELINE_SOURCE};

/// What the error handler decided about a bus error.
enum Disposition {
    /// The session absorbs the failure and continues.
    Handled,
    /// The failure is fatal; the loop must quit.
    Fatal(String),
}

impl Controller {
    /// Dispatch one bus message. Returns `false` to terminate the main
    /// loop.
    pub(crate) fn on_bus_message(&self, msg: BusMessage) -> bool {
        match msg {
            BusMessage::Eos => {
                if let Some(timer) = self.inner.state.lock().eos_timer.take() {
                    timer.cancel();
                }

                debug!("EOS received, stopping pipeline");
                self.stop();
                false
            }

            BusMessage::Error(err) => match self.handle_error(&err) {
                Disposition::Handled => true,
                Disposition::Fatal(message) => {
                    self.set_error(message);
                    false
                }
            },

            BusMessage::StateChanged { source, new_state } => {
                // only the transition that latches `playing` matters
                if self.inner.playing.load(Ordering::SeqCst) {
                    return true;
                }
                if new_state != GraphState::Playing {
                    return true;
                }

                match source.as_str() {
                    AUDIO_APP_SOURCE | VIDEO_APP_SOURCE => {
                        if let SourceHandle::Sdk(s) = &self.inner.source {
                            s.playing(&source);
                        }
                    }
                    PIPELINE_SOURCE => {
                        self.inner.playing.store(true, Ordering::SeqCst);
                        let started_at = match &self.inner.source {
                            SourceHandle::Sdk(s) => s.start_time(),
                            SourceHandle::Web(_) => epoch_nanos(),
                        };
                        self.update_start_time(started_at);
                    }
                    _ => {}
                }
                true
            }

            BusMessage::Element(element) => {
                match element.name.as_str() {
                    FRAGMENT_OPENED_MESSAGE => match segment_params(&element) {
                        Ok((location, running_time)) => {
                            debug!(location = %location, running_time, "fragment opened");
                            if let Some(playlist) = &self.inner.playlist {
                                if let Err(e) =
                                    playlist.lock().start_segment(&location, running_time)
                                {
                                    error!(
                                        error = %e,
                                        location = %location,
                                        "failed to register new segment"
                                    );
                                }
                            }
                        }
                        Err(e) => {
                            error!(error = %e, "bad fragment-opened structure");
                        }
                    },

                    FRAGMENT_CLOSED_MESSAGE => match segment_params(&element) {
                        Ok((location, running_time)) => {
                            debug!(location = %location, running_time, "fragment closed");
                            self.on_segment_ended(location, running_time);
                        }
                        Err(e) => {
                            error!(error = %e, "bad fragment-closed structure");
                        }
                    },

                    _ => {}
                }
                true
            }

            BusMessage::Other(message) => {
                debug!(message = %message, "bus message");
                true
            }
        }
    }

    /// Decide whether a bus error ends the session.
    fn handle_error(&self, err: &ErrorMessage) -> Disposition {
        let Some((element, name, _)) = parse_debug_info(&err.debug) else {
            error!(
                source = %err.source,
                debug = %err.debug,
                message = %err.message,
                "pipeline error"
            );
            return Disposition::Fatal(err.message.clone());
        };

        if element != ELEMENT_RTMP_SINK {
            // input failure or file write failure
            error!(
                source = %err.source,
                debug = %err.debug,
                message = %err.message,
                "pipeline error"
            );
            return Disposition::Fatal(err.message.clone());
        }

        if !self.inner.playing.load(Ordering::SeqCst) {
            // the initial connect failed
            error!(message = %err.message, "could not connect to rtmp output");
            return Disposition::Fatal(err.message.clone());
        }

        // bad URI or lost connection: drop this output, keep the rest
        let Some(output) = &self.inner.output else {
            return Disposition::Fatal(err.message.clone());
        };
        let url = match output.remove_sink_by_name(&name) {
            Ok(url) => url,
            Err(e) => {
                error!(error = %e, sink = %name, "failed to remove sink");
                return Disposition::Fatal(e.to_string());
            }
        };

        let mut guard = self.inner.state.lock();
        let state = &mut *guard;
        if let Some(pending) = state.stream_errors.remove(&url) {
            // the add watcher is still inside its handshake window
            let _ = pending.send(err.message.clone());
        } else if let Some(started) = state.started_at.remove(&url) {
            if let Some(stream) = state.result.stream_mut(&url) {
                stream.duration = epoch_nanos() - started;
            }
        }

        error!(url = %url, message = %err.message, "stream output removed after error");
        Disposition::Handled
    }
}
