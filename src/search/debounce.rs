// Debouncing for search-as-you-type
// At most one scheduled invocation is pending; scheduling again cancels it

use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::debug;

/// Single-shot, cancellable delayed task
pub struct Debouncer {
    delay: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Debouncer {
            delay,
            pending: Mutex::new(None),
        }
    }

    /// Run `task` once the delay elapses, superseding any pending task
    ///
    /// Outside a tokio runtime there is nothing to schedule on, so the task
    /// runs immediately on the caller's thread.
    pub fn schedule<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut pending = self.pending.lock();
        if let Some(previous) = pending.take() {
            if !previous.is_finished() {
                debug!("Superseding pending debounced task, waiting another {:?}", self.delay);
            }
            previous.abort();
        }

        let runtime = match Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                drop(pending);
                debug!("No async runtime, running debounced task immediately");
                task();
                return;
            }
        };

        let delay = self.delay;
        *pending = Some(runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            task();
        }));
    }

    /// Cancel the pending task; returns whether one was still waiting
    pub fn cancel(&self) -> bool {
        match self.pending.lock().take() {
            Some(handle) => {
                let was_pending = !handle.is_finished();
                handle.abort();
                was_pending
            }
            None => false,
        }
    }

    /// Whether a scheduled task has not run yet
    pub fn is_pending(&self) -> bool {
        self.pending
            .lock()
            .as_ref()
            .map_or(false, |handle| !handle.is_finished())
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        if let Some(handle) = self.pending.get_mut().take() {
            handle.abort();
        }
    }
}
