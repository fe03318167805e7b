//! Tracing initialization.
//!
//! - `QUIZ_LOG` controls the filter (e.g. "debug" or "info,services=debug").
//! - `QUIZ_LOG_FORMAT` selects "pretty" (default) or "json" output.
//!
//! Logs go to stderr so they never interleave with the quiz prompts.

use tracing_subscriber::EnvFilter;

pub fn init_tracing() {
    let filter = EnvFilter::try_from_env("QUIZ_LOG").unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true);

    match std::env::var("QUIZ_LOG_FORMAT").as_deref() {
        Ok("json") => {
            builder.json().init();
        }
        _ => {
            builder.init();
        }
    }
}
