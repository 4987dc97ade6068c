use anyhow::{Context, Result};
use statsync::{config::Config, descriptor, dest::MySqlDestination, pipeline::execute};
use std::{env, path::PathBuf, sync::Arc};
use tokio::time::Instant;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();
    info!("startup");

    // ─── 2) configuration ────────────────────────────────────────────
    let config_path = env::var("STATSYNC_CONFIG").ok().map(PathBuf::from);
    let config = Config::load(config_path.as_deref())?;
    info!(
        api = %config.api_base_url,
        metadata = %config.metadata_dir.display(),
        "configured"
    );

    // ─── 3) table descriptors ────────────────────────────────────────
    let descriptors = descriptor::load_all(&config.metadata_dir)?;
    if descriptors.is_empty() {
        info!("no table descriptors; exit");
        return Ok(());
    }
    info!("{} tables to sync", descriptors.len());

    // ─── 4) shared resources ─────────────────────────────────────────
    let destination = Arc::new(
        MySqlDestination::connect(&config.database)
            .await
            .context("connecting to destination database")?,
    );

    // ─── 5) sync every table; the pool is closed on every exit ───────
    let start = Instant::now();
    let outcome = execute(config, destination, &descriptors).await;

    match outcome {
        Ok(summary) => {
            info!(
                synced = summary.synced.len(),
                skipped = summary.skipped.len(),
                elapsed = ?start.elapsed(),
                "all done"
            );
            Ok(())
        }
        Err(e) => {
            error!("run aborted: {:#}", e);
            Err(e)
        }
    }
}
