//! Cancellable one-shot timer that clears a success notice.

use std::time::Duration;

use tokio::task::JoinHandle;

/// Owns at most one pending notice-clear task.
///
/// Every [`NoticeTimer::schedule`] bumps a generation counter and hands the
/// new generation to the callback; a callback only acts if
/// [`NoticeTimer::fire`] confirms its generation is still current. Scheduling
/// again, cancelling, or dropping the timer aborts the pending task.
#[derive(Debug, Default)]
pub struct NoticeTimer {
    handle: Option<JoinHandle<()>>,
    generation: u64,
}

impl NoticeTimer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces any pending task with one that runs `on_fire` after `after`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn schedule<F>(&mut self, after: Duration, on_fire: F)
    where
        F: FnOnce(u64) + Send + 'static,
    {
        self.cancel();
        let generation = self.generation;
        self.handle = Some(tokio::spawn(async move {
            tokio::time::sleep(after).await;
            on_fire(generation);
        }));
    }

    /// Aborts the pending task, if any. Later firings of older generations
    /// are refused by [`NoticeTimer::fire`].
    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
        self.generation += 1;
    }

    /// Claims a firing. Returns `true` only for the current generation, and
    /// at most once per schedule.
    pub fn fire(&mut self, generation: u64) -> bool {
        if generation != self.generation || self.handle.is_none() {
            return false;
        }
        self.handle = None;
        true
    }

    /// Returns `true` while a scheduled task has not fired or been cancelled.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.handle.is_some()
    }
}

impl Drop for NoticeTimer {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
