use std::{
    future::Future,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use tokio::task::JoinHandle;
use tracing::debug;

/// A scheduled re-entry into capture.
///
/// Only the most recently armed token is ever current; any cancel or re-arm
/// moves the generation on and the old token can no longer fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestartToken {
    generation: u64,
}

/// Arms at most one delayed restart at a time.
pub struct RestartScheduler {
    generation: Arc<AtomicU64>,
    pending: Option<(RestartToken, JoinHandle<()>)>,
}

impl Default for RestartScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl RestartScheduler {
    /// Creates a scheduler with nothing armed.
    pub fn new() -> Self {
        Self {
            generation: Arc::new(AtomicU64::new(0)),
            pending: None,
        }
    }

    /// Runs `resume` after `delay` unless cancelled first.
    ///
    /// Any previously armed restart is cancelled.
    pub fn arm<F, Fut>(&mut self, delay: Duration, resume: F) -> RestartToken
    where
        F: FnOnce(RestartToken) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.cancel_all();

        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let token = RestartToken { generation };
        let current = Arc::clone(&self.generation);

        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if current.load(Ordering::Acquire) == generation {
                resume(token).await;
            } else {
                debug!(generation, "Stale restart dropped");
            }
        });

        debug!(generation, delay_ms = delay.as_millis(), "Restart armed");
        self.pending = Some((token, task));
        token
    }

    /// Cancels `token` if it is still outstanding. Idempotent.
    ///
    /// Returns `true` if a pending restart was cancelled.
    pub fn cancel(&mut self, token: RestartToken) -> bool {
        match &self.pending {
            Some((pending, _)) if *pending == token => {
                self.cancel_all();
                true
            }
            _ => false,
        }
    }

    /// Cancels whatever is armed. Idempotent.
    pub fn cancel_all(&mut self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        if let Some((token, task)) = self.pending.take() {
            task.abort();
            debug!(generation = token.generation, "Restart cancelled");
        }
    }

    /// Whether `token` is the armed, uncancelled restart.
    pub fn is_current(&self, token: RestartToken) -> bool {
        self.generation.load(Ordering::Acquire) == token.generation
            && matches!(&self.pending, Some((pending, _)) if *pending == token)
    }

    /// Whether a restart is armed.
    pub fn is_armed(&self) -> bool {
        self.pending.is_some()
    }

    /// Claims a fired restart. Returns `false` for stale tokens.
    pub fn take_fired(&mut self, token: RestartToken) -> bool {
        if !self.is_current(token) {
            return false;
        }
        self.pending = None;
        true
    }
}

impl Drop for RestartScheduler {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
