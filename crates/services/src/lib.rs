#![forbid(unsafe_code)]

pub mod app_services;
pub mod error;
pub mod explain_service;
pub mod preferences_service;
pub mod progress_store;
pub mod sessions;
pub mod sync;

pub use quiz_core::Clock;

pub use app_services::AppServices;
pub use error::{AppServicesError, ExplainError, ProgressStoreError};
pub use explain_service::{ExplanationConfig, ExplanationService, Explainer};
pub use preferences_service::PreferencesService;
pub use progress_store::ProgressStore;
pub use sessions::{DashboardEntry, QuizSession, SessionPosition};
pub use sync::{Debouncer, PullOutcome, SyncCoordinator, SyncOptions, SyncStatus};
