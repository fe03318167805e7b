mod controller;
mod progress;
mod view;

// Public API of the quiz session subsystem.
pub use controller::QuizSession;
pub use progress::SessionPosition;
pub use view::DashboardEntry;
