//! Cancellable debounce timer

use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

/// Handle to one scheduled callback
#[derive(Debug)]
pub struct TimerHandle {
    task: JoinHandle<()>,
}

impl TimerHandle {
    pub fn cancel(&self) {
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Holds at most one pending callback. Scheduling replaces the previous one.
#[derive(Debug, Default)]
pub struct DebounceTimer {
    pending: Option<TimerHandle>,
}

impl DebounceTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `task` after `delay`, cancelling anything still pending
    pub fn schedule<F>(&mut self, delay: Duration, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.cancel();
        debug!(delay_ms = delay.as_millis() as u64, "Scheduling debounced task");
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            task.await;
        });
        self.pending = Some(TimerHandle { task });
    }

    /// Like [`schedule`](Self::schedule), but once `delay` elapses `task` runs
    /// on its own and is no longer cancelled by this timer
    pub fn schedule_detached<F>(&mut self, delay: Duration, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.schedule(delay, async move {
            tokio::spawn(task);
        });
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.cancel();
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.as_ref().map_or(false, |h| !h.is_finished())
    }
}

impl Drop for DebounceTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}
