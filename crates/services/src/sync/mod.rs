mod coordinator;
mod debounce;

pub use coordinator::{
    DEFAULT_DEBOUNCE, PullOutcome, SyncCoordinator, SyncOptions, SyncStatus, advisory,
};
pub use debounce::Debouncer;
