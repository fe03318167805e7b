use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use quiz_core::{Clock, ProgressPatch, UserProgress};
use storage::remote::{
    RemoteDocument, RemoteDocumentStore, RemoteError, RemoteErrorCode, SHARED_USER_KEY,
};
use tokio::sync::{Mutex, watch};
use tracing::{debug, info, warn};

use super::debounce::Debouncer;
use crate::progress_store::ProgressStore;

/// Default quiet period before a remote push.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(1500);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    pub user_key: String,
    pub debounce: Duration,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            user_key: SHARED_USER_KEY.to_owned(),
            debounce: DEFAULT_DEBOUNCE,
        }
    }
}

/// Observable state of remote synchronisation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncStatus {
    pub in_flight: bool,
    /// Advisory shown to the user; cleared by the next successful write.
    pub error: Option<String>,
    pub last_synced_at: Option<DateTime<Utc>>,
}

/// Result of the startup pull.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullOutcome {
    Merged,
    /// Remote progress was merged in memory but could not be saved locally.
    MergedNotSaved,
    NotFound,
    Failed(RemoteErrorCode),
}

/// Best-effort propagation of progress to and from the remote document.
///
/// Failures never touch local state; they only show up in `SyncStatus`.
pub struct SyncCoordinator {
    remote: Arc<dyn RemoteDocumentStore>,
    user_key: Arc<str>,
    debounce: Duration,
    debouncer: Debouncer,
    status: Arc<watch::Sender<SyncStatus>>,
    clock: Clock,
    write_turn: Arc<Mutex<()>>,
    pushes: Arc<AtomicUsize>,
}

impl SyncCoordinator {
    #[must_use]
    pub fn new(remote: Arc<dyn RemoteDocumentStore>, options: SyncOptions, clock: Clock) -> Self {
        let (status, _) = watch::channel(SyncStatus::default());
        Self {
            remote,
            user_key: Arc::from(options.user_key),
            debounce: options.debounce,
            debouncer: Debouncer::new(),
            status: Arc::new(status),
            clock,
            write_turn: Arc::new(Mutex::new(())),
            pushes: Arc::new(AtomicUsize::new(0)),
        }
    }

    #[must_use]
    pub fn status(&self) -> SyncStatus {
        self.status.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SyncStatus> {
        self.status.subscribe()
    }

    /// True while a push is waiting out its debounce delay.
    #[must_use]
    pub fn has_pending_push(&self) -> bool {
        self.debouncer.is_pending()
    }

    /// Read the remote document once and overlay it on `store`.
    ///
    /// Run before the store accepts user input. A missing document is silent;
    /// read failures leave `store` untouched and set the advisory.
    pub async fn pull(&self, store: &mut ProgressStore) -> PullOutcome {
        self.status.send_modify(|s| s.in_flight = true);

        match self.remote.read(&self.user_key).await {
            Ok(Some(document)) => {
                let saved = store.adopt_remote(&document.progress).await;
                let now = self.clock.now();
                self.status.send_modify(|s| {
                    s.in_flight = false;
                    s.last_synced_at = Some(now);
                });
                match saved {
                    Ok(()) => {
                        info!(key = %self.user_key, "merged remote progress");
                        PullOutcome::Merged
                    }
                    Err(err) => {
                        warn!(error = %err, "merged remote progress could not be saved locally");
                        PullOutcome::MergedNotSaved
                    }
                }
            }
            Ok(None) => {
                debug!(key = %self.user_key, "no remote progress yet");
                self.status.send_modify(|s| s.in_flight = false);
                PullOutcome::NotFound
            }
            Err(err) => {
                warn!(key = %self.user_key, error = %err, "remote pull failed");
                let code = err.code;
                record_failure(&self.status, &err, false);
                PullOutcome::Failed(code)
            }
        }
    }

    /// Queue `progress` for a merge-write after the debounce delay.
    ///
    /// A newer call before the delay elapses replaces this one, so a burst of
    /// mutations produces a single write of the last snapshot.
    pub fn schedule_push(&self, progress: &UserProgress) {
        let job = self.push_job(progress);
        self.debouncer.schedule(self.debounce, job.run());
    }

    /// Cancel any waiting push and write `progress` now.
    ///
    /// Used on shutdown so the last edits are not left waiting.
    pub async fn flush(&self, progress: &UserProgress) {
        self.debouncer.cancel();
        self.push_job(progress).run().await;
    }

    fn push_job(&self, progress: &UserProgress) -> PushJob {
        PushJob {
            remote: Arc::clone(&self.remote),
            user_key: Arc::clone(&self.user_key),
            status: Arc::clone(&self.status),
            clock: self.clock,
            write_turn: Arc::clone(&self.write_turn),
            pushes: Arc::clone(&self.pushes),
            progress: ProgressPatch::from(progress),
        }
    }
}

impl std::fmt::Debug for SyncCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncCoordinator")
            .field("user_key", &self.user_key)
            .field("debounce", &self.debounce)
            .field("status", &*self.status.borrow())
            .finish_non_exhaustive()
    }
}

struct PushJob {
    remote: Arc<dyn RemoteDocumentStore>,
    user_key: Arc<str>,
    status: Arc<watch::Sender<SyncStatus>>,
    clock: Clock,
    write_turn: Arc<Mutex<()>>,
    pushes: Arc<AtomicUsize>,
    progress: ProgressPatch,
}

impl PushJob {
    /// Writes run one at a time in firing order; `in_flight` stays set until
    /// the last queued write finishes.
    async fn run(self) {
        self.pushes.fetch_add(1, Ordering::SeqCst);
        self.status.send_modify(|s| s.in_flight = true);
        let turn = self.write_turn.lock().await;

        let now = self.clock.now();
        let document = RemoteDocument {
            progress: self.progress,
            updated_at: Some(now),
        };

        let written = self.remote.write(&self.user_key, &document, true).await;
        let others_queued = self.pushes.fetch_sub(1, Ordering::SeqCst) > 1;
        drop(turn);

        match written {
            Ok(()) => {
                debug!(key = %self.user_key, "progress pushed");
                self.status.send_modify(|s| {
                    s.in_flight = others_queued;
                    s.error = None;
                    s.last_synced_at = Some(now);
                });
            }
            Err(err) => {
                warn!(key = %self.user_key, error = %err, "progress push failed");
                record_failure(&self.status, &err, others_queued);
            }
        }
    }
}

fn record_failure(status: &watch::Sender<SyncStatus>, err: &RemoteError, in_flight: bool) {
    let message = advisory(err);
    status.send_modify(|s| {
        s.in_flight = in_flight;
        s.error = Some(message);
    });
}

/// User-facing text for a sync failure.
#[must_use]
pub fn advisory(err: &RemoteError) -> String {
    match err.code {
        RemoteErrorCode::PermissionDenied => {
            "Cloud sync permission denied. Progress is saved on this device only.".to_owned()
        }
        code => format!("Cloud sync unavailable ({code}). Progress is saved on this device only."),
    }
}
