use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use services::SyncOptions;
use storage::remote::SHARED_USER_KEY;

const DEFAULT_DB_URL: &str = "sqlite:quiz.sqlite3?mode=rwc";
const DEFAULT_CATALOG_PATH: &str = "data/catalog.json";
const DEFAULT_DEBOUNCE_MS: u64 = 1500;
const REMOTE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug)]
pub enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidUserKey { raw: String },
    InvalidDebounce { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidUserKey { raw } => write!(f, "invalid --user-key value: {raw:?}"),
            ArgsError::InvalidDebounce { raw } => write!(f, "invalid --debounce-ms value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

/// Where the binary keeps progress and how it reaches the remote copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub db_url: String,
    pub catalog_path: PathBuf,
    /// `None` keeps the remote document in-process.
    pub remote_url: Option<String>,
    pub remote_token: Option<String>,
    pub remote_timeout: Duration,
    pub user_key: String,
    pub debounce: Duration,
}

impl AppConfig {
    /// Resolve flags, falling back to `QUIZ_*` environment variables.
    ///
    /// Returns `Ok(None)` when help was requested.
    pub fn parse(
        args: impl IntoIterator<Item = String>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Option<Self>, ArgsError> {
        let mut db_url = env("QUIZ_DB_URL").unwrap_or_else(|| DEFAULT_DB_URL.into());
        let mut catalog_path = env("QUIZ_CATALOG_PATH")
            .map_or_else(|| PathBuf::from(DEFAULT_CATALOG_PATH), PathBuf::from);
        let mut remote_url = env("QUIZ_REMOTE_URL").filter(|url| !url.trim().is_empty());
        let remote_token = env("QUIZ_REMOTE_TOKEN").filter(|token| !token.trim().is_empty());
        let mut user_key = env("QUIZ_USER_KEY").unwrap_or_else(|| SHARED_USER_KEY.into());
        let mut debounce_ms = match env("QUIZ_SYNC_DEBOUNCE_MS") {
            Some(raw) => parse_debounce(raw)?,
            None => DEFAULT_DEBOUNCE_MS,
        };

        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--catalog" => {
                    catalog_path = PathBuf::from(require_value(&mut args, "--catalog")?);
                }
                "--remote" => {
                    remote_url = Some(require_value(&mut args, "--remote")?);
                }
                "--user-key" => {
                    user_key = require_value(&mut args, "--user-key")?;
                }
                "--debounce-ms" => {
                    debounce_ms = parse_debounce(require_value(&mut args, "--debounce-ms")?)?;
                }
                "--help" | "-h" => return Ok(None),
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        if user_key.trim().is_empty() || user_key.contains('/') {
            return Err(ArgsError::InvalidUserKey { raw: user_key });
        }

        Ok(Some(Self {
            db_url,
            catalog_path,
            remote_url,
            remote_token,
            remote_timeout: REMOTE_TIMEOUT,
            user_key,
            debounce: Duration::from_millis(debounce_ms),
        }))
    }

    #[must_use]
    pub fn sync_options(&self) -> SyncOptions {
        SyncOptions {
            user_key: self.user_key.clone(),
            debounce: self.debounce,
        }
    }
}

fn parse_debounce(raw: String) -> Result<u64, ArgsError> {
    raw.trim()
        .parse::<u64>()
        .map_err(|_| ArgsError::InvalidDebounce { raw })
}

pub fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         Local progress store (default: {DEFAULT_DB_URL})");
    eprintln!("  --catalog <path>          Question bank JSON (default: {DEFAULT_CATALOG_PATH})");
    eprintln!("  --remote <base_url>       Remote document service (default: in-process)");
    eprintln!("  --user-key <key>          Remote document key (default: {SHARED_USER_KEY})");
    eprintln!("  --debounce-ms <n>         Quiet period before a remote push (default: 1500)");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!(
        "  QUIZ_DB_URL, QUIZ_CATALOG_PATH, QUIZ_REMOTE_URL, QUIZ_USER_KEY, QUIZ_SYNC_DEBOUNCE_MS"
    );
    eprintln!("  QUIZ_REMOTE_TOKEN, QUIZ_AI_API_KEY, QUIZ_AI_BASE_URL, QUIZ_AI_MODEL");
    eprintln!("  QUIZ_LOG, QUIZ_LOG_FORMAT");
}
