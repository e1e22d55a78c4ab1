//! The session controller.
//!
//! One controller drives one egress session from construction through a
//! terminal result: it waits for the source, brings the graph to
//! PLAYING, reacts to bus messages until a shutdown trigger wins, drives
//! the graph back to NULL, and uploads whatever was produced.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use egress_cloud::{ObjectStore, UploadedObject};
use egress_core::{epoch_nanos, EgressResult, EgressStatus, EgressType, SessionConfig};
use egress_streaming::PlaylistWriter;

use crate::graph::{GraphState, MediaGraph, StreamOutput};
use crate::segments::SegmentUpdate;
use crate::source::{signalled, SourceHandle};
use crate::timers::OneShot;
use crate::{PipelineError, Result, FILE_KEY};

/// Callback invoked when the session enters Active or Ending.
pub type StatusCallback = Arc<dyn Fn(&EgressResult) + Send + Sync>;

/// Mutable session state, all behind one mutex.
pub(crate) struct SessionState {
    pub result: EgressResult,
    /// Activation time per stream URL, plus the sentinel key for
    /// file-producing sessions.
    pub started_at: HashMap<String, i64>,
    /// Pending error channels for sinks still inside their handshake
    /// window.
    pub stream_errors: HashMap<String, oneshot::Sender<String>>,
    /// True while the main event loop may still be running.
    pub loop_alive: bool,
    pub eos_timer: Option<OneShot>,
    pub session_timer: Option<OneShot>,
    pub segments_tx: Option<mpsc::Sender<SegmentUpdate>>,
    pub segment_worker: Option<JoinHandle<()>>,
}

pub(crate) struct Inner {
    pub config: SessionConfig,
    pub graph: Arc<dyn MediaGraph>,
    pub output: Option<Arc<dyn StreamOutput>>,
    pub source: SourceHandle,
    pub store: Arc<dyn ObjectStore>,
    pub playlist: Option<Mutex<PlaylistWriter>>,

    pub state: Mutex<SessionState>,
    /// Latched once, on the first PLAYING observation at the graph root.
    pub playing: AtomicBool,
    pub timed_out: AtomicBool,
    /// One-shot latch guarding `send_eos`.
    closed: AtomicBool,
    /// One-shot latch guarding `run`.
    started: AtomicBool,

    pub closed_tx: watch::Sender<bool>,
    pub quit_tx: watch::Sender<bool>,

    on_status: Option<StatusCallback>,
}

/// Handle onto a session controller. Clones share the session.
#[derive(Clone)]
pub struct Controller {
    pub(crate) inner: Arc<Inner>,
}

impl Controller {
    /// Start building a controller for one session.
    pub fn builder(config: SessionConfig) -> ControllerBuilder {
        ControllerBuilder::new(config)
    }

    /// Snapshot of the session's result record.
    pub fn result(&self) -> EgressResult {
        self.inner.state.lock().result.clone()
    }

    /// Drive the session to its terminal state. Must be called exactly
    /// once; resolves with the terminal result.
    pub async fn run(&self) -> EgressResult {
        if self.inner.started.swap(true, Ordering::SeqCst) {
            error!("run called more than once");
            return self.result();
        }

        self.inner.state.lock().result.started_at = epoch_nanos();

        self.run_session().await;

        let result = {
            let mut state = self.inner.state.lock();
            state.result.ended_at = epoch_nanos();
            if state.result.error.is_some() {
                state.result.status = EgressStatus::Failed;
            } else if state.result.status != EgressStatus::Aborted {
                state.result.status = EgressStatus::Complete;
            }
            state.result.clone()
        };

        // temp files go away even on failure
        self.delete_temp_dir();

        info!(
            egress_id = %self.inner.config.egress_id,
            status = %result.status,
            "session finished"
        );
        result
    }

    async fn run_session(&self) {
        // wait until the source is ready
        if let Some(ready) = self.inner.source.events().start_recording() {
            let closed = self.inner.closed_tx.subscribe();
            tokio::select! {
                _ = signalled(closed) => {
                    self.inner.source.events().close();
                    self.inner.state.lock().result.status = EgressStatus::Aborted;
                    return;
                }
                _ = signalled(ready) => {}
            }
        }

        // end the session when the room ends
        let ended = self.inner.source.events().end_recording();
        let ctrl = self.clone();
        tokio::spawn(async move {
            signalled(ended).await;
            ctrl.send_eos();
        });

        self.start_session_timer();

        let Some(mut bus) = self.inner.graph.take_bus() else {
            self.set_error("graph bus unavailable");
            return;
        };

        self.inner.state.lock().loop_alive = true;

        // asynchronous: the graph reports PLAYING on the bus
        if let Err(e) = self.inner.graph.set_state(GraphState::Playing) {
            error!(error = %e, "failed to set graph state");
            self.set_error(e.to_string());
            return;
        }

        if self.inner.config.egress_type == EgressType::SegmentedFile {
            self.start_segment_worker();
        }

        info!(egress_id = %self.inner.config.egress_id, "session started");

        let mut quit = self.inner.quit_tx.subscribe();
        loop {
            tokio::select! {
                msg = bus.recv() => match msg {
                    Some(msg) => {
                        if !self.on_bus_message(msg) {
                            break;
                        }
                    }
                    None => break,
                },
                _ = quit.changed() => break,
            }
        }

        self.inner.source.events().close();

        let timed_out = self.stop_session_timer();

        // the SDK source keeps its own clock
        if let SourceHandle::Sdk(s) = &self.inner.source {
            self.update_duration(s.end_time());
        }

        // a failed session uploads nothing, unless it failed by timing out
        let failed = self.inner.state.lock().result.error.is_some();
        if failed && !timed_out {
            return;
        }

        self.finish_uploads().await;
    }

    /// Request graceful shutdown. Idempotent; safe to call from any task.
    pub fn send_eos(&self) {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        self.inner.closed_tx.send_replace(true);

        let snapshot = {
            let mut state = self.inner.state.lock();
            if state.result.status.is_terminal() {
                None
            } else {
                state.result.status = EgressStatus::Ending;
                Some(state.result.clone())
            }
        };
        if let Some(snapshot) = snapshot {
            self.notify_status(&snapshot);
        }

        let ctrl = self.clone();
        tokio::spawn(async move {
            debug!("sending EOS to pipeline");
            let watchdog = ctrl.eos_watchdog();
            ctrl.inner.state.lock().eos_timer = Some(watchdog);

            match &ctrl.inner.source {
                SourceHandle::Sdk(s) => s.send_eos(),
                SourceHandle::Web(_) => ctrl.inner.graph.send_eos_event(),
            }
        });
    }

    fn eos_watchdog(&self) -> OneShot {
        let ctrl = self.clone();
        OneShot::after(self.inner.config.eos_timeout(), move || {
            if ctrl.inner.state.lock().result.status.is_terminal() {
                return;
            }
            error!("pipeline frozen");
            ctrl.set_error("pipeline frozen");
            ctrl.stop();
        })
    }

    /// Hard shutdown: drive the graph to NULL and quit the main loop.
    pub(crate) fn stop(&self) {
        let mut state = self.inner.state.lock();
        if !state.loop_alive {
            return;
        }

        if let Err(e) = self.inner.graph.block_set_state(GraphState::Null) {
            error!(error = %e, "failed to drive graph to null");
        }
        let ended_at = epoch_nanos();
        debug!("pipeline stopped");

        state.loop_alive = false;
        drop(state);

        self.inner.quit_tx.send_replace(true);

        // the web source has no clock of its own
        if self.inner.source.is_web() {
            self.update_duration(ended_at);
        }
    }

    fn start_session_timer(&self) {
        let Some(timeout) = self.inner.config.session_timeout() else {
            return;
        };

        let ctrl = self.clone();
        let timer = OneShot::after(timeout, move || {
            if ctrl.inner.state.lock().result.status.is_terminal() {
                return;
            }
            warn!("max egress duration reached, ending session");
            ctrl.inner.timed_out.store(true, Ordering::SeqCst);
            ctrl.send_eos();
            ctrl.set_error("max egress duration reached");
        });
        self.inner.state.lock().session_timer = Some(timer);
    }

    fn stop_session_timer(&self) -> bool {
        let timer = self.inner.state.lock().session_timer.take();
        match timer {
            Some(timer) => {
                timer.cancel();
                self.inner.timed_out.load(Ordering::SeqCst)
            }
            None => false,
        }
    }

    /// Record the first error; later writers lose.
    pub(crate) fn set_error(&self, message: impl Into<String>) {
        let mut state = self.inner.state.lock();
        if state.result.error.is_none() {
            state.result.error = Some(message.into());
        }
    }

    pub(crate) fn notify_status(&self, result: &EgressResult) {
        if let Some(callback) = &self.inner.on_status {
            callback(result);
        }
    }

    /// Resolve the session's effective start time once the graph root
    /// reaches PLAYING.
    pub(crate) fn update_start_time(&self, started_at: i64) {
        let snapshot = {
            let mut state = self.inner.state.lock();
            match self.inner.config.egress_type {
                EgressType::Stream | EgressType::Websocket => {
                    let urls: Vec<String> =
                        state.result.streams.iter().map(|s| s.url.clone()).collect();
                    for url in urls {
                        state.started_at.insert(url, started_at);
                    }
                }
                EgressType::File | EgressType::SegmentedFile => {
                    state.started_at.insert(FILE_KEY.into(), started_at);
                }
            }
            state.result.status = EgressStatus::Active;
            state.result.clone()
        };
        self.notify_status(&snapshot);
    }

    /// Finalize durations against a session end time.
    pub(crate) fn update_duration(&self, ended_at: i64) {
        let mut guard = self.inner.state.lock();
        let state = &mut *guard;

        match self.inner.config.egress_type {
            EgressType::Stream | EgressType::Websocket => {
                // only streams still active; removed ones were finalized
                // when they were detached
                let urls: Vec<String> = state.started_at.keys().cloned().collect();
                for url in urls {
                    let duration = duration_for(&state.started_at, &url, ended_at);
                    if duration > 0 {
                        if let Some(stream) = state.result.stream_mut(&url) {
                            stream.duration = duration;
                        }
                    }
                }
            }
            EgressType::File => {
                let duration = duration_for(&state.started_at, FILE_KEY, ended_at);
                if duration > 0 {
                    if let Some(file) = &mut state.result.file {
                        file.duration = duration;
                    }
                }
            }
            EgressType::SegmentedFile => {
                let duration = duration_for(&state.started_at, FILE_KEY, ended_at);
                if duration > 0 {
                    if let Some(segments) = &mut state.result.segments {
                        segments.duration = duration;
                    }
                }
            }
        }
    }

    async fn finish_uploads(&self) {
        match self.inner.config.egress_type {
            EgressType::File => {
                let local = self.inner.config.local_path.clone();
                let mime = self.inner.config.output_type.mime();
                match self.store_file(&local, mime).await {
                    Ok(object) => {
                        let mut state = self.inner.state.lock();
                        if let Some(file) = &mut state.result.file {
                            file.location = object.location;
                            file.size = object.size;
                        }
                    }
                    Err(e) => self.set_error(e.to_string()),
                }
            }

            EgressType::SegmentedFile => {
                // let queued segment uploads drain
                let (tx, worker) = {
                    let mut state = self.inner.state.lock();
                    (state.segments_tx.take(), state.segment_worker.take())
                };
                drop(tx);
                if let Some(worker) = worker {
                    if let Err(e) = worker.await {
                        error!(error = %e, "segment worker exited abnormally");
                    }
                }

                if let Some(playlist) = &self.inner.playlist {
                    let local = {
                        let mut playlist = playlist.lock();
                        if let Err(e) = playlist.eos() {
                            error!(error = %e, "failed to finalize playlist");
                        }
                        playlist.path().to_path_buf()
                    };

                    let mime = self.inner.config.output_type.mime();
                    if let Ok(object) = self.store_file(&local, mime).await {
                        let mut state = self.inner.state.lock();
                        if let Some(segments) = &mut state.result.segments {
                            segments.playlist_location = Some(object.location);
                        }
                    }
                }
            }

            EgressType::Stream | EgressType::Websocket => {}
        }
    }

    /// Upload one artifact to its derived storage path.
    pub(crate) async fn store_file(&self, local: &Path, mime: &str) -> Result<UploadedObject> {
        let remote = self.inner.config.storage_path(local);
        debug!(local = %local.display(), remote = %remote, "uploading artifact");

        self.inner.store.upload(local, &remote, mime).await.map_err(|e| {
            error!(error = %e, remote = %remote, "could not upload file");
            PipelineError::UploadFailed {
                location: remote,
                message: e.to_string(),
            }
        })
    }

    fn delete_temp_dir(&self) {
        if !self.inner.config.upload.is_remote() {
            return;
        }

        let dir = match self.inner.config.egress_type {
            EgressType::File | EgressType::SegmentedFile => self.inner.config.local_path.parent(),
            EgressType::Stream | EgressType::Websocket => None,
        };

        if let Some(dir) = dir.filter(|d| !d.as_os_str().is_empty()) {
            debug!(path = %dir.display(), "removing temporary directory");
            if let Err(e) = std::fs::remove_dir_all(dir) {
                error!(error = %e, "could not delete temp dir");
            }
        }
    }
}

fn duration_for(started_at: &HashMap<String, i64>, key: &str, ended_at: i64) -> i64 {
    let Some(started) = started_at.get(key).copied() else {
        warn!(key, "no start time recorded");
        return 0;
    };

    let duration = ended_at - started;
    if duration <= 0 {
        warn!(key, started, ended_at, "non-positive duration");
    }
    duration
}

/// Builder for session controllers.
pub struct ControllerBuilder {
    config: SessionConfig,
    graph: Option<Arc<dyn MediaGraph>>,
    output: Option<Arc<dyn StreamOutput>>,
    source: Option<SourceHandle>,
    store: Option<Arc<dyn ObjectStore>>,
    playlist: Option<PlaylistWriter>,
    on_status: Option<StatusCallback>,
}

impl ControllerBuilder {
    fn new(config: SessionConfig) -> Self {
        Self {
            config,
            graph: None,
            output: None,
            source: None,
            store: None,
            playlist: None,
            on_status: None,
        }
    }

    /// Set the media graph handle.
    pub fn graph(mut self, graph: Arc<dyn MediaGraph>) -> Self {
        self.graph = Some(graph);
        self
    }

    /// Set the output bin handle (stream egress).
    pub fn output(mut self, output: Arc<dyn StreamOutput>) -> Self {
        self.output = Some(output);
        self
    }

    /// Set the media source.
    pub fn source(mut self, source: SourceHandle) -> Self {
        self.source = Some(source);
        self
    }

    /// Override the object store. Defaults to the store selected by the
    /// configured upload target.
    pub fn store(mut self, store: Arc<dyn ObjectStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Attach a playlist writer (segmented egress with an index).
    pub fn playlist(mut self, playlist: PlaylistWriter) -> Self {
        self.playlist = Some(playlist);
        self
    }

    /// Invoke `callback` on entry to Active and Ending.
    pub fn on_status_update<F>(mut self, callback: F) -> Self
    where
        F: Fn(&EgressResult) + Send + Sync + 'static,
    {
        self.on_status = Some(Arc::new(callback));
        self
    }

    /// Build the controller.
    pub fn build(self) -> Result<Controller> {
        self.config.validate()?;

        let graph = self
            .graph
            .ok_or_else(|| PipelineError::InvalidRequest("a media graph is required".into()))?;
        let source = self
            .source
            .ok_or_else(|| PipelineError::InvalidRequest("a media source is required".into()))?;

        if self.config.egress_type == EgressType::Stream && self.output.is_none() {
            return Err(PipelineError::InvalidRequest(
                "stream egress requires an output handle".into(),
            ));
        }

        let store = match self.store {
            Some(store) => store,
            None => egress_cloud::from_target(&self.config.upload)?,
        };

        let result = EgressResult::new(&self.config);

        Ok(Controller {
            inner: Arc::new(Inner {
                config: self.config,
                graph,
                output: self.output,
                source,
                store,
                playlist: self.playlist.map(Mutex::new),
                state: Mutex::new(SessionState {
                    result,
                    started_at: HashMap::new(),
                    stream_errors: HashMap::new(),
                    loop_alive: false,
                    eos_timer: None,
                    session_timer: None,
                    segments_tx: None,
                    segment_worker: None,
                }),
                playing: AtomicBool::new(false),
                timed_out: AtomicBool::new(false),
                closed: AtomicBool::new(false),
                started: AtomicBool::new(false),
                closed_tx: watch::channel(false).0,
                quit_tx: watch::channel(false).0,
                on_status: self.on_status,
            }),
        })
    }
}
