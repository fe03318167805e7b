use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;

struct Pending {
    handle: JoinHandle<()>,
    fired: Arc<AtomicBool>,
}

/// Runs the most recently scheduled task once its delay passes without a
/// newer `schedule` call.
///
/// Rescheduling cancels a task that is still waiting. A task whose delay has
/// already elapsed is left to finish, so an in-flight write is never cut off.
#[derive(Default)]
pub struct Debouncer {
    pending: Mutex<Option<Pending>>,
}

impl Debouncer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace any waiting task with `task`, to run after `delay`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn schedule<F>(&self, delay: Duration, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut guard = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = guard.take() {
            cancel_if_waiting(previous);
        }

        let fired = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&fired);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            flag.store(true, Ordering::SeqCst);
            task.await;
        });
        *guard = Some(Pending { handle, fired });
    }

    /// Drop the waiting task, if any. Returns whether one was cancelled.
    pub fn cancel(&self) -> bool {
        let mut guard = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        guard.take().is_some_and(cancel_if_waiting)
    }

    /// True while a scheduled task is still waiting for its delay.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        let guard = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        guard
            .as_ref()
            .is_some_and(|p| !p.fired.load(Ordering::SeqCst) && !p.handle.is_finished())
    }
}

fn cancel_if_waiting(pending: Pending) -> bool {
    if pending.fired.load(Ordering::SeqCst) {
        return false;
    }
    pending.handle.abort();
    true
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        let pending = self
            .pending
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(pending) = pending {
            cancel_if_waiting(pending);
        }
    }
}
