//! Replaces the food catalog with a fresh import of the four source datasets.
//!
//! Configured through the environment, see [`nutriload::Config`]. Exits non-zero if the run
//! fails; skipped lines and rejected documents do not affect the exit status.
use std::process::ExitCode;

use anyhow::Result;
use nutriload::{
    Config,
    ingest::{RunReport, store_decorators::StoreWithBackOff},
    integrations::duckdb::Duckdb,
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match import().await {
        Ok(report) => {
            tracing::info!(
                catalog_size = report.catalog_size,
                inserted = report.load.inserted,
                rejected = report.load.rejected,
                "Import succeeded"
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::error!(error = %format!("{err:#}"), "Import failed");
            ExitCode::FAILURE
        }
    }
}

async fn import() -> Result<RunReport> {
    let config = Config::from_env()?;
    tracing::debug!(?config, "Loaded config");

    let store = Duckdb::open(&config.database)?
        .table_name(config.table.clone())
        .batch_size(config.batch_size)
        .build()?;
    let store = StoreWithBackOff::new(store, config.backoff());

    let cancellation_token = CancellationToken::new();
    tokio::spawn({
        let cancellation_token = cancellation_token.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupted, stopping before the next batch");
                cancellation_token.cancel();
            }
        }
    });

    let report = config
        .pipeline(store)?
        .with_cancellation_token(cancellation_token)
        .run()
        .await?;

    Ok(report)
}
