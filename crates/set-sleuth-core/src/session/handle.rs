use crate::{CoreError, CoreResult, ListenMode, SessionSnapshot, SessionState};

use std::panic::Location;

use error_location::ErrorLocation;
use tokio::sync::{mpsc, watch};

/// Commands accepted by the controller task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Command {
    Begin(ListenMode),
    Stop,
    Cancel,
    Retry,
    EndSession,
    Shutdown,
}

/// Cloneable entry point into a running [`SessionController`](crate::SessionController).
///
/// Commands are queued and applied in order by the controller task; the
/// resulting state is observed through [`subscribe`](Self::subscribe).
#[derive(Debug, Clone)]
pub struct SessionHandle {
    command_tx: mpsc::Sender<Command>,
    snapshot_rx: watch::Receiver<SessionSnapshot>,
}

impl SessionHandle {
    pub(crate) fn new(
        command_tx: mpsc::Sender<Command>,
        snapshot_rx: watch::Receiver<SessionSnapshot>,
    ) -> Self {
        Self {
            command_tx,
            snapshot_rx,
        }
    }

    /// Start a capture/identify cycle. Ignored unless the controller is idle.
    pub async fn begin(&self, mode: ListenMode) -> CoreResult<()> {
        self.send(Command::Begin(mode)).await
    }

    /// Stop recording early and submit what was captured.
    pub async fn stop(&self) -> CoreResult<()> {
        self.send(Command::Stop).await
    }

    /// Abandon whatever is in progress and return to idle.
    pub async fn cancel(&self) -> CoreResult<()> {
        self.send(Command::Cancel).await
    }

    /// Same as [`cancel`](Self::cancel); used when the presentation closes.
    pub async fn close(&self) -> CoreResult<()> {
        self.send(Command::Cancel).await
    }

    /// Start a new cycle after a result or failure.
    pub async fn retry(&self) -> CoreResult<()> {
        self.send(Command::Retry).await
    }

    /// Close the continuous session and return to idle.
    pub async fn end_session(&self) -> CoreResult<()> {
        self.send(Command::EndSession).await
    }

    /// Tear down and stop the controller task.
    pub async fn shutdown(&self) -> CoreResult<()> {
        self.send(Command::Shutdown).await
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot_rx.borrow().clone()
    }

    /// Latest published state.
    pub fn state(&self) -> SessionState {
        self.snapshot_rx.borrow().state.clone()
    }

    /// Receiver notified on every snapshot change.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot_rx.clone()
    }

    async fn send(&self, command: Command) -> CoreResult<()> {
        self.command_tx
            .send(command)
            .await
            .map_err(|_| CoreError::ChannelClosed {
                location: ErrorLocation::from(Location::caller()),
            })
    }
}
