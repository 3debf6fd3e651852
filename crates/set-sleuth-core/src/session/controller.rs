//! Session state machine.
//!
//! The controller runs as a single task that owns every piece of mutable
//! session state. Commands from [`SessionHandle`]s and completions from the
//! work it spawns arrive as messages and are applied one at a time. Each
//! completion is tagged with the cycle that started it; once a cycle has been
//! superseded (cancel, retry, restart) its completions are discarded on
//! arrival, so a late network reply can never move the state.

use crate::{
    AudioCapture, ClipRef, ContinuousSession, CoreError, CoreResult, FailureKind, Identification,
    IdentifiedTrack, Identifier, ListenMode, MicrophoneAccess, PermissionGate, PlaybackControl,
    Recorder, RecordingHandle, RestartScheduler, RestartToken, SessionHandle, SessionRegistry,
    SessionSnapshot, SessionState,
    audio::DEFAULT_MAX_DURATION_MS,
    session::{Command, DEFAULT_MATCHED_RESTART_MS, DEFAULT_NO_MATCH_RESTART_MS},
};

use std::{future::Future, sync::Arc, time::Duration};

use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

const COMMAND_CHANNEL_CAPACITY: usize = 32;
const EVENT_CHANNEL_CAPACITY: usize = 32;

/// Platform and remote collaborators driven by the controller.
#[derive(Clone)]
pub struct SessionDeps {
    /// Microphone permission capability.
    pub access: Arc<dyn MicrophoneAccess>,
    /// Recording capability.
    pub recorder: Arc<dyn Recorder>,
    /// Identify endpoint client.
    pub identifier: Arc<dyn Identifier>,
    /// Remote session bookkeeping.
    pub registry: Arc<dyn SessionRegistry>,
    /// Other in-app audio producers.
    pub playback: Arc<dyn PlaybackControl>,
}

/// Timing and identity settings for a controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    /// Hard upper bound for one recording.
    pub max_duration: Duration,
    /// Pause before the next capture after a match (continuous mode).
    pub matched_restart_delay: Duration,
    /// Pause before the next capture after a no-match (continuous mode).
    pub no_match_restart_delay: Duration,
    /// Owner of remote sessions.
    pub user_id: String,
    /// Title given to remote sessions.
    pub session_title: String,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            max_duration: Duration::from_millis(DEFAULT_MAX_DURATION_MS),
            matched_restart_delay: Duration::from_millis(DEFAULT_MATCHED_RESTART_MS),
            no_match_restart_delay: Duration::from_millis(DEFAULT_NO_MATCH_RESTART_MS),
            user_id: String::new(),
            session_title: "Live Session".to_string(),
        }
    }
}

/// Completions posted back by spawned work.
enum Event {
    Started {
        cycle: u64,
        result: CoreResult<RecordingHandle>,
    },
    DeadlineElapsed {
        cycle: u64,
    },
    Captured {
        cycle: u64,
        result: CoreResult<ClipRef>,
    },
    Identified {
        cycle: u64,
        result: CoreResult<Identification>,
    },
    RestartDue {
        token: RestartToken,
    },
    SessionOpened {
        local_id: Uuid,
        result: CoreResult<String>,
    },
    Released,
}

/// Where the current cycle is, including the in-flight steps that have no
/// user-visible state of their own.
enum Phase {
    Idle,
    Starting,
    Recording(RecordingHandle),
    Finishing,
    Analyzing,
    Settled,
}

/// Owns the identification state machine.
pub struct SessionController {
    gate: Arc<PermissionGate>,
    capture: Arc<AudioCapture>,
    identifier: Arc<dyn Identifier>,
    registry: Arc<dyn SessionRegistry>,
    playback: Arc<dyn PlaybackControl>,
    settings: SessionSettings,
    scheduler: RestartScheduler,
    mode: ListenMode,
    phase: Phase,
    state: SessionState,
    cycle: u64,
    deadline_task: Option<JoinHandle<()>>,
    /// Spawned start, finish and abort tasks that may still hold the capture slot.
    capture_holders: usize,
    /// A cycle is waiting for `capture_holders` to drain before starting.
    deferred_start: bool,
    continuous: Option<ContinuousSession>,
    command_rx: mpsc::Receiver<Command>,
    event_tx: mpsc::Sender<Event>,
    event_rx: mpsc::Receiver<Event>,
    snapshot_tx: watch::Sender<SessionSnapshot>,
}

impl SessionController {
    /// Spawns a controller task and returns a handle to drive it.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(deps: SessionDeps, settings: SessionSettings) -> (SessionHandle, JoinHandle<()>) {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (snapshot_tx, snapshot_rx) = watch::channel(SessionSnapshot::default());

        let controller = Self {
            gate: Arc::new(PermissionGate::new(deps.access)),
            capture: Arc::new(AudioCapture::new(deps.recorder, settings.max_duration)),
            identifier: deps.identifier,
            registry: deps.registry,
            playback: deps.playback,
            settings,
            scheduler: RestartScheduler::new(),
            mode: ListenMode::default(),
            phase: Phase::Idle,
            state: SessionState::Idle,
            cycle: 0,
            deadline_task: None,
            capture_holders: 0,
            deferred_start: false,
            continuous: None,
            command_rx,
            event_tx,
            event_rx,
            snapshot_tx,
        };

        let task = tokio::spawn(controller.run());
        (SessionHandle::new(command_tx, snapshot_rx), task)
    }

    async fn run(mut self) {
        info!("Session controller started");

        loop {
            tokio::select! {
                biased;

                command = self.command_rx.recv() => match command {
                    Some(Command::Shutdown) | None => {
                        self.teardown("shutdown");
                        self.publish();
                        break;
                    }
                    Some(command) => self.handle_command(command),
                },

                Some(event) = self.event_rx.recv() => self.handle_event(event),
            }

            self.publish();
        }

        info!("Session controller stopped");
    }

    fn handle_command(&mut self, command: Command) {
        debug!(?command, state = self.state.name(), "Command received");

        match command {
            Command::Begin(mode) => {
                if !matches!(self.phase, Phase::Idle) {
                    debug!(state = self.state.name(), "Begin ignored, cycle in progress");
                    return;
                }
                self.mode = mode;
                if mode == ListenMode::Continuous && self.continuous.is_none() {
                    self.open_continuous();
                }
                self.begin_cycle();
            }
            Command::Stop => self.finish_recording("manual"),
            Command::Retry => {
                if !matches!(self.phase, Phase::Settled) {
                    debug!(state = self.state.name(), "Retry ignored, nothing to retry");
                    return;
                }
                if matches!(
                    self.state,
                    SessionState::Failed {
                        kind: FailureKind::PermissionDenied
                    }
                ) {
                    self.gate.reset();
                }
                self.begin_cycle();
            }
            Command::Cancel => self.teardown("cancel"),
            Command::EndSession => self.teardown("end_session"),
            Command::Shutdown => self.teardown("shutdown"),
        }
    }

    fn handle_event(&mut self, event: Event) {
        match event {
            Event::Started { cycle, result } => self.on_started(cycle, result),
            Event::DeadlineElapsed { cycle } => {
                if cycle == self.cycle {
                    self.finish_recording("deadline");
                }
            }
            Event::Captured { cycle, result } => self.on_captured(cycle, result),
            Event::Identified { cycle, result } => self.on_identified(cycle, result),
            Event::RestartDue { token } => self.on_restart_due(token),
            Event::SessionOpened { local_id, result } => self.on_session_opened(local_id, result),
            Event::Released => self.capture_holders = self.capture_holders.saturating_sub(1),
        }

        self.resume_deferred_start();
    }

    /// Enters a new cycle: permission, silence playback, start capture.
    ///
    /// If work from a superseded cycle may still hold the microphone, the
    /// start waits until that work has released it.
    fn begin_cycle(&mut self) {
        self.scheduler.cancel_all();
        self.cycle += 1;
        self.phase = Phase::Starting;
        self.state = SessionState::Idle;

        info!(cycle = self.cycle, mode = ?self.mode, "Cycle starting");

        if self.capture_holders > 0 {
            debug!(
                cycle = self.cycle,
                holders = self.capture_holders,
                "Waiting for the previous capture to release the microphone"
            );
            self.deferred_start = true;
            return;
        }

        self.spawn_start();
    }

    fn resume_deferred_start(&mut self) {
        if self.deferred_start
            && self.capture_holders == 0
            && matches!(self.phase, Phase::Starting)
        {
            self.deferred_start = false;
            debug!(cycle = self.cycle, "Microphone released, starting deferred capture");
            self.spawn_start();
        }
    }

    fn spawn_start(&mut self) {
        self.capture_holders += 1;

        let cycle = self.cycle;
        let gate = Arc::clone(&self.gate);
        let capture = Arc::clone(&self.capture);
        let playback = Arc::clone(&self.playback);
        let event_tx = self.event_tx.clone();

        tokio::spawn(async move {
            let result = async {
                gate.check().await?;
                playback.silence_others();
                capture.start().await
            }
            .await;

            // Controller gone: nobody else will release the microphone.
            if let Err(mpsc::error::SendError(Event::Started {
                result: Ok(handle), ..
            })) = event_tx.send(Event::Started { cycle, result }).await
            {
                capture.abort(handle).await;
            }
        });
    }

    /// Stops and deletes a recording nobody will finish.
    fn spawn_abort(&mut self, handle: RecordingHandle) {
        self.capture_holders += 1;

        let capture = Arc::clone(&self.capture);
        let event_tx = self.event_tx.clone();

        tokio::spawn(async move {
            capture.abort(handle).await;
            let _ = event_tx.send(Event::Released).await;
        });
    }

    fn on_started(&mut self, cycle: u64, result: CoreResult<RecordingHandle>) {
        self.capture_holders = self.capture_holders.saturating_sub(1);

        if cycle != self.cycle || !matches!(self.phase, Phase::Starting) {
            if let Ok(handle) = result {
                debug!(cycle, "Capture started for a stale cycle, aborting");
                self.spawn_abort(handle);
            }
            return;
        }

        match result {
            Ok(handle) => {
                let deadline = handle.deadline();
                self.state = SessionState::Recording {
                    started_at: handle.started_at(),
                    deadline,
                };
                self.phase = Phase::Recording(handle);

                let event_tx = self.event_tx.clone();
                self.deadline_task = Some(tokio::spawn(async move {
                    tokio::time::sleep_until(deadline).await;
                    let _ = event_tx.send(Event::DeadlineElapsed { cycle }).await;
                }));

                info!(cycle, "Recording");
            }
            Err(e) => self.fail(e),
        }
    }

    /// Leaves `Recording` by either trigger. The handle is moved out, so the
    /// second trigger to arrive finds nothing to finish.
    fn finish_recording(&mut self, trigger: &'static str) {
        let handle = match std::mem::replace(&mut self.phase, Phase::Finishing) {
            Phase::Recording(handle) => handle,
            other => {
                self.phase = other;
                debug!(trigger, state = self.state.name(), "Stop ignored, not recording");
                return;
            }
        };

        if let Some(task) = self.deadline_task.take() {
            task.abort();
        }

        let cycle = self.cycle;
        let capture = Arc::clone(&self.capture);
        let event_tx = self.event_tx.clone();

        info!(cycle, trigger, "Finishing recording");

        self.capture_holders += 1;
        tokio::spawn(async move {
            let result = capture.finish(handle).await;
            let _ = event_tx.send(Event::Captured { cycle, result }).await;
        });
    }

    fn on_captured(&mut self, cycle: u64, result: CoreResult<ClipRef>) {
        self.capture_holders = self.capture_holders.saturating_sub(1);

        if cycle != self.cycle || !matches!(self.phase, Phase::Finishing) {
            // A stale clip is dropped here, which deletes its file.
            debug!(cycle, "Discarding capture result for a stale cycle");
            return;
        }

        let clip = match result {
            Ok(clip) => clip,
            Err(e) => return self.fail(e),
        };

        self.state = SessionState::Analyzing { clip: clip.info() };
        self.phase = Phase::Analyzing;

        let identifier = Arc::clone(&self.identifier);
        let event_tx = self.event_tx.clone();

        tokio::spawn(async move {
            let result = identifier.submit(&clip).await;
            drop(clip);
            let _ = event_tx.send(Event::Identified { cycle, result }).await;
        });
    }

    fn on_identified(&mut self, cycle: u64, result: CoreResult<Identification>) {
        if cycle != self.cycle || !matches!(self.phase, Phase::Analyzing) {
            debug!(cycle, "Discarding identify result for a stale cycle");
            return;
        }

        self.phase = Phase::Settled;

        match result {
            Ok(Identification::Match(track)) => {
                info!(
                    cycle,
                    title = track.title(),
                    artist = track.artist(),
                    confidence = track.confidence(),
                    "Matched"
                );
                self.record_match(&track);
                self.state = SessionState::Matched { track };
                self.schedule_restart(self.settings.matched_restart_delay);
            }
            Ok(Identification::NoMatch) => {
                info!(cycle, "No match");
                self.state = SessionState::NoMatch;
                self.schedule_restart(self.settings.no_match_restart_delay);
            }
            Err(e) => self.fail(e),
        }
    }

    fn fail(&mut self, error: CoreError) {
        let kind = error.kind().unwrap_or(FailureKind::RecordingFailure);
        warn!(cycle = self.cycle, %kind, error = ?error, "Cycle failed");

        self.phase = Phase::Settled;
        self.state = SessionState::Failed { kind };
    }

    fn schedule_restart(&mut self, delay: Duration) {
        if self.mode != ListenMode::Continuous {
            return;
        }

        let event_tx = self.event_tx.clone();
        self.scheduler.arm(delay, move |token| async move {
            let _ = event_tx.send(Event::RestartDue { token }).await;
        });
    }

    fn on_restart_due(&mut self, token: RestartToken) {
        if !self.scheduler.take_fired(token) {
            debug!("Ignoring stale restart");
            return;
        }

        let resumable = matches!(self.phase, Phase::Settled)
            && self.mode == ListenMode::Continuous
            && matches!(
                self.state,
                SessionState::Matched { .. } | SessionState::NoMatch
            );
        if resumable {
            self.begin_cycle();
        }
    }

    fn open_continuous(&mut self) {
        let session = ContinuousSession::new();
        let local_id = session.local_id();
        self.continuous = Some(session);

        let registry = Arc::clone(&self.registry);
        let user_id = self.settings.user_id.clone();
        let title = self.settings.session_title.clone();
        let event_tx = self.event_tx.clone();

        info!(%local_id, "Continuous session opened");

        tokio::spawn(async move {
            let result = registry.create(&user_id, &title).await;
            let _ = event_tx
                .send(Event::SessionOpened { local_id, result })
                .await;
        });
    }

    fn on_session_opened(&mut self, local_id: Uuid, result: CoreResult<String>) {
        let current = self
            .continuous
            .as_mut()
            .filter(|session| session.local_id() == local_id);

        match (current, result) {
            (Some(session), Ok(id)) => {
                info!(%local_id, session_id = %id, "Remote session attached");
                session.attach_server_id(id);
            }
            (None, Ok(id)) => {
                // The local session closed before the registry answered.
                debug!(%local_id, session_id = %id, "Ending orphaned remote session");
                let registry = Arc::clone(&self.registry);
                Self::detach_registry_call("end", async move { registry.end(&id).await });
            }
            (_, Err(e)) => {
                warn!(%local_id, error = ?e, "Remote session unavailable, keeping history locally");
            }
        }
    }

    fn record_match(&mut self, track: &IdentifiedTrack) {
        let Some(session) = self.continuous.as_mut() else {
            return;
        };
        if self.mode != ListenMode::Continuous {
            return;
        }

        session.record(track.clone());
        debug!(history_len = session.len(), "Track added to session history");

        if let Some(id) = session.server_id().map(str::to_string) {
            let registry = Arc::clone(&self.registry);
            let track = track.clone();
            Self::detach_registry_call("append", async move { registry.append(&id, &track).await });
        }
    }

    /// Single exit path for cancel, close, end of session and shutdown.
    fn teardown(&mut self, reason: &'static str) {
        self.cycle += 1;
        self.scheduler.cancel_all();

        if let Some(task) = self.deadline_task.take() {
            task.abort();
        }

        self.deferred_start = false;
        if let Phase::Recording(handle) = std::mem::replace(&mut self.phase, Phase::Idle) {
            self.spawn_abort(handle);
        }

        if let Some(session) = self.continuous.take() {
            info!(
                local_id = %session.local_id(),
                tracks = session.len(),
                "Continuous session closed"
            );
            if let Some(id) = session.server_id() {
                let registry = Arc::clone(&self.registry);
                let id = id.to_string();
                Self::detach_registry_call("end", async move { registry.end(&id).await });
            }
        }

        self.gate.reset();
        self.state = SessionState::Idle;

        info!(reason, "Session torn down");
    }

    /// Fire-and-forget registry call; failures are logged and swallowed.
    fn detach_registry_call<F>(call: &'static str, future: F)
    where
        F: Future<Output = CoreResult<()>> + Send + 'static,
    {
        tokio::spawn(async move {
            if let Err(e) = future.await {
                warn!(call, error = ?e, "Session registry call failed");
            }
        });
    }

    fn publish(&self) {
        let snapshot = SessionSnapshot {
            state: self.state.clone(),
            mode: self.mode,
            continuous: self.continuous.clone(),
            restart_pending: self.scheduler.is_armed(),
        };

        self.snapshot_tx.send_if_modified(|current| {
            if *current == snapshot {
                false
            } else {
                *current = snapshot;
                true
            }
        });
    }
}
