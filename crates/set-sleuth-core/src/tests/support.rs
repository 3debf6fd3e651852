//! Fake collaborators shared by the controller and capture tests.

#![allow(clippy::unwrap_used)]

use crate::{
    ClipRef, CoreError, CoreResult, IdentifiedTrack, Identification, Identifier, ListenMode,
    MicrophoneAccess, NoPlayback, Permission, RecordedFile, Recorder, SessionController,
    SessionDeps, SessionHandle, SessionRegistry, SessionSettings, SessionSnapshot,
    audio::AudioFormat,
};

use std::{
    collections::{HashSet, VecDeque},
    panic::Location,
    path::PathBuf,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use error_location::ErrorLocation;
use tokio::{sync::Semaphore, time::Instant};

pub(crate) const WAIT_LIMIT: Duration = Duration::from_secs(600);

/// Permission capability with a fixed answer.
pub(crate) struct ScriptedAccess {
    supported: bool,
    permission: Permission,
    pub(crate) requests: AtomicUsize,
}

impl ScriptedAccess {
    pub(crate) fn granted() -> Arc<Self> {
        Arc::new(Self {
            supported: true,
            permission: Permission::Granted,
            requests: AtomicUsize::new(0),
        })
    }

    pub(crate) fn denied() -> Arc<Self> {
        Arc::new(Self {
            supported: true,
            permission: Permission::Denied,
            requests: AtomicUsize::new(0),
        })
    }

    pub(crate) fn unsupported() -> Arc<Self> {
        Arc::new(Self {
            supported: false,
            permission: Permission::Granted,
            requests: AtomicUsize::new(0),
        })
    }

    pub(crate) fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MicrophoneAccess for ScriptedAccess {
    fn is_supported(&self) -> bool {
        self.supported
    }

    async fn request(&self) -> Permission {
        self.requests.fetch_add(1, Ordering::SeqCst);
        self.permission
    }
}

/// Recorder that counts every call and never touches the filesystem.
#[derive(Default)]
pub(crate) struct FakeRecorder {
    fail_start: bool,
    recording: Mutex<bool>,
    last: Mutex<Option<RecordedFile>>,
    next_clip: AtomicUsize,
    pub(crate) starts: Mutex<Vec<Instant>>,
    pub(crate) stops: Mutex<Vec<Instant>>,
    pub(crate) stop_calls: AtomicUsize,
    pub(crate) discarded: Mutex<Vec<PathBuf>>,
}

impl FakeRecorder {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail_start: true,
            ..Self::default()
        })
    }

    pub(crate) fn start_count(&self) -> usize {
        self.starts.lock().unwrap().len()
    }

    pub(crate) fn start_times(&self) -> Vec<Instant> {
        self.starts.lock().unwrap().clone()
    }

    pub(crate) fn stop_times(&self) -> Vec<Instant> {
        self.stops.lock().unwrap().clone()
    }

    pub(crate) fn stop_count(&self) -> usize {
        self.stop_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn discard_count(&self) -> usize {
        self.discarded.lock().unwrap().len()
    }

    /// Number of distinct clips deleted; equal to `discard_count` unless a
    /// clip was deleted twice.
    pub(crate) fn distinct_discards(&self) -> usize {
        self.discarded
            .lock()
            .unwrap()
            .iter()
            .collect::<HashSet<_>>()
            .len()
    }
}

#[async_trait]
impl Recorder for FakeRecorder {
    async fn start(&self) -> CoreResult<()> {
        if self.fail_start {
            return Err(CoreError::RecordingFailed {
                reason: "fake start failure".to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        }
        let n = self.next_clip.fetch_add(1, Ordering::SeqCst);
        *self.recording.lock().unwrap() = true;
        *self.last.lock().unwrap() = Some(RecordedFile {
            path: PathBuf::from(format!("/fake/clip-{}.m4a", n)),
            format: AudioFormat::M4a,
        });
        self.starts.lock().unwrap().push(Instant::now());
        Ok(())
    }

    async fn stop(&self) -> CoreResult<RecordedFile> {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
        let mut recording = self.recording.lock().unwrap();
        if *recording {
            *recording = false;
            self.stops.lock().unwrap().push(Instant::now());
        }
        self.last
            .lock()
            .unwrap()
            .clone()
            .ok_or(CoreError::RecordingFailed {
                reason: "never started".to_string(),
                location: ErrorLocation::from(Location::caller()),
            })
    }

    async fn read(&self, _file: &RecordedFile) -> CoreResult<Vec<u8>> {
        Ok(vec![0x00, 0x00, 0x00, 0x20, 0x66, 0x74, 0x79, 0x70])
    }

    fn discard(&self, file: &RecordedFile) -> CoreResult<()> {
        self.discarded.lock().unwrap().push(file.path.clone());
        Ok(())
    }
}

/// Outcome an identifier fake replays.
#[derive(Debug, Clone)]
pub(crate) enum Scripted {
    Match(IdentifiedTrack),
    NoMatch,
    ServerError,
    NetworkError,
}

/// Identifier that replays scripted outcomes, then repeats `fallback`.
pub(crate) struct ScriptedIdentifier {
    script: Mutex<VecDeque<Scripted>>,
    fallback: Scripted,
    gate: Option<Arc<Semaphore>>,
    pub(crate) calls: AtomicUsize,
}

impl ScriptedIdentifier {
    pub(crate) fn always(outcome: Scripted) -> Arc<Self> {
        Self::sequence(Vec::new(), outcome)
    }

    pub(crate) fn sequence(script: Vec<Scripted>, fallback: Scripted) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            fallback,
            gate: None,
            calls: AtomicUsize::new(0),
        })
    }

    /// Every submit waits for a permit on `gate` before answering.
    pub(crate) fn gated(outcome: Scripted, gate: Arc<Semaphore>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(VecDeque::new()),
            fallback: outcome,
            gate: Some(gate),
            calls: AtomicUsize::new(0),
        })
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Identifier for ScriptedIdentifier {
    async fn submit(&self, _clip: &ClipRef) -> CoreResult<Identification> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }

        let next = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());

        match next {
            Scripted::Match(track) => Ok(Identification::Match(track)),
            Scripted::NoMatch => Ok(Identification::NoMatch),
            Scripted::ServerError => Err(CoreError::ServerError {
                status: Some(500),
                reason: "fake server error".to_string(),
                location: ErrorLocation::from(Location::caller()),
            }),
            Scripted::NetworkError => Err(CoreError::NetworkError {
                reason: "fake connection reset".to_string(),
                location: ErrorLocation::from(Location::caller()),
            }),
        }
    }
}

/// Registry call as observed by [`RecordingRegistry`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RegistryCall {
    Create { user_id: String, title: String },
    Append { id: String, title: String },
    End { id: String },
}

/// Registry that records calls and hands out `sess-1`.
#[derive(Default)]
pub(crate) struct RecordingRegistry {
    fail_create: bool,
    create_delay: Option<Duration>,
    pub(crate) calls: Mutex<Vec<RegistryCall>>,
}

impl RecordingRegistry {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn unavailable() -> Arc<Self> {
        Arc::new(Self {
            fail_create: true,
            ..Self::default()
        })
    }

    /// `create` answers only after `delay` has elapsed.
    pub(crate) fn delayed(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            create_delay: Some(delay),
            ..Self::default()
        })
    }

    pub(crate) fn calls(&self) -> Vec<RegistryCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SessionRegistry for RecordingRegistry {
    async fn create(&self, user_id: &str, title: &str) -> CoreResult<String> {
        self.calls.lock().unwrap().push(RegistryCall::Create {
            user_id: user_id.to_string(),
            title: title.to_string(),
        });
        if let Some(delay) = self.create_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_create {
            return Err(CoreError::RegistryError {
                reason: "fake registry down".to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        }
        Ok("sess-1".to_string())
    }

    async fn append(&self, id: &str, track: &IdentifiedTrack) -> CoreResult<()> {
        self.calls.lock().unwrap().push(RegistryCall::Append {
            id: id.to_string(),
            title: track.title().to_string(),
        });
        Ok(())
    }

    async fn end(&self, id: &str) -> CoreResult<()> {
        self.calls
            .lock()
            .unwrap()
            .push(RegistryCall::End { id: id.to_string() });
        Ok(())
    }
}

/// A running controller wired to fakes.
pub(crate) struct Harness {
    pub(crate) handle: SessionHandle,
    pub(crate) access: Arc<ScriptedAccess>,
    pub(crate) recorder: Arc<FakeRecorder>,
    pub(crate) identifier: Arc<ScriptedIdentifier>,
    pub(crate) registry: Arc<RecordingRegistry>,
}

impl Harness {
    pub(crate) fn spawn(
        access: Arc<ScriptedAccess>,
        recorder: Arc<FakeRecorder>,
        identifier: Arc<ScriptedIdentifier>,
        registry: Arc<RecordingRegistry>,
    ) -> Self {
        let deps = SessionDeps {
            access: access.clone(),
            recorder: recorder.clone(),
            identifier: identifier.clone(),
            registry: registry.clone(),
            playback: Arc::new(NoPlayback),
        };
        let settings = SessionSettings {
            user_id: "user-42".to_string(),
            ..SessionSettings::default()
        };
        let (handle, _task) = SessionController::spawn(deps, settings);

        Self {
            handle,
            access,
            recorder,
            identifier,
            registry,
        }
    }

    /// Controller with granted permission and a working registry.
    pub(crate) fn with_identifier(identifier: Arc<ScriptedIdentifier>) -> Self {
        Self::spawn(
            ScriptedAccess::granted(),
            FakeRecorder::new(),
            identifier,
            RecordingRegistry::new(),
        )
    }

    pub(crate) async fn begin(&self, mode: ListenMode) {
        self.handle.begin(mode).await.unwrap();
    }

    /// Waits (in paused time) until a published snapshot satisfies `predicate`.
    pub(crate) async fn wait_for<F>(&self, predicate: F) -> SessionSnapshot
    where
        F: FnMut(&SessionSnapshot) -> bool,
    {
        let mut rx = self.handle.subscribe();
        let snapshot = tokio::time::timeout(WAIT_LIMIT, rx.wait_for(predicate))
            .await
            .unwrap()
            .unwrap()
            .clone();
        snapshot
    }
}

pub(crate) fn track(title: &str, confidence: u8) -> IdentifiedTrack {
    IdentifiedTrack::new(title, "Luke Dean", confidence)
}
