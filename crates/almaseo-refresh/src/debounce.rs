//! Trailing-edge debounce on top of a tokio runtime handle.

use std::future::Future;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Collapses bursts of calls into one, fired `delay` after the last call.
///
/// Each `schedule` cancels the previously armed timer, so only the most
/// recent action ever runs.
#[derive(Debug)]
pub struct TrailingDebounce {
    delay: Duration,
    runtime: Handle,
    armed: Option<JoinHandle<()>>,
}

impl TrailingDebounce {
    pub fn new(delay: Duration, runtime: Handle) -> Self {
        Self {
            delay,
            runtime,
            armed: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Arm (or re-arm) the timer with `action`.
    pub fn schedule<F>(&mut self, action: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.cancel();
        let delay = self.delay;
        self.armed = Some(self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            action.await;
        }));
    }

    /// Drop the armed action, if any. Returns whether one was armed.
    pub fn cancel(&mut self) -> bool {
        match self.armed.take() {
            Some(handle) => {
                let was_pending = !handle.is_finished();
                handle.abort();
                was_pending
            }
            None => false,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.armed.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for TrailingDebounce {
    fn drop(&mut self) {
        self.cancel();
    }
}
