mod config;
mod driver;
mod telemetry;

use std::sync::Arc;

use quiz_core::{Clock, QuestionCatalog};
use services::{AppServices, ExplanationService, SyncStatus};
use storage::catalog_file::load_catalog;
use storage::remote::{HttpDocumentStore, InMemoryDocumentStore, RemoteDocumentStore};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

use config::{AppConfig, print_usage};
use driver::Driver;

fn remote_store(
    config: &AppConfig,
) -> Result<Arc<dyn RemoteDocumentStore>, Box<dyn std::error::Error>> {
    match &config.remote_url {
        Some(url) => {
            info!(%url, "using remote document service");
            let store = HttpDocumentStore::new(
                url.clone(),
                config.remote_token.clone(),
                config.remote_timeout,
            )?;
            Ok(Arc::new(store))
        }
        None => {
            info!("no remote configured; progress is synced in-process only");
            Ok(Arc::new(InMemoryDocumentStore::new()))
        }
    }
}

/// Print each new sync advisory once, as it appears.
fn watch_sync_status(mut status: watch::Receiver<SyncStatus>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut last_error = status.borrow_and_update().error.clone();
        while status.changed().await.is_ok() {
            let error = status.borrow_and_update().error.clone();
            if error != last_error {
                if let Some(message) = &error {
                    eprintln!("\n! {message}");
                }
                last_error = error;
            }
        }
    })
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let parsed = AppConfig::parse(std::env::args().skip(1), |name| std::env::var(name).ok())
        .map_err(|e| {
            eprintln!("{e}");
            print_usage();
            e
        })?;
    let Some(config) = parsed else {
        print_usage();
        return Ok(());
    };

    telemetry::init_tracing();

    let catalog: Arc<dyn QuestionCatalog> = Arc::new(load_catalog(&config.catalog_path)?);
    let remote = remote_store(&config)?;
    let explainer = ExplanationService::from_env();
    info!(enabled = explainer.enabled(), "explanation service configured");

    let services = AppServices::new_sqlite(
        &config.db_url,
        catalog,
        remote,
        config.sync_options(),
        Arc::new(explainer),
        Clock::default(),
    )
    .await?;

    let watcher = watch_sync_status(services.sync().subscribe());
    let mut driver = Driver::new(services);
    driver.run_stdin().await?;
    watcher.abort();
    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
