// src/pipeline.rs

use anyhow::{Context, Result};
use futures::{stream, StreamExt};
use std::{sync::Arc, time::Duration};
use tracing::{info, instrument, warn};

use crate::{
    catalog::Catalog,
    config::Config,
    descriptor::TableDescriptor,
    dest::{Destination, TableRef},
    error::{LoadError, TableError},
    fetch::{StatBankClient, TransportVerb},
    filter,
    load::load,
    schema::{ensure_table, infer_schema, Provisioned},
    window::{plan_window, read_prior_state},
};

/// Everything one run needs, built once and handed to every table.
pub struct RunContext {
    pub config: Config,
    pub api: StatBankClient,
    pub destination: Arc<dyn Destination>,
}

impl RunContext {
    pub fn new(config: Config, destination: Arc<dyn Destination>) -> Result<Self> {
        let api = StatBankClient::new(
            &config.api_base_url,
            Duration::from_secs(config.request_timeout_secs),
        )?;
        Ok(Self {
            config,
            api,
            destination,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableReport {
    pub table: TableRef,
    /// Time filter that was requested, e.g. `>2021K1`.
    pub window: String,
    pub verb: TransportVerb,
    pub fetched: usize,
    pub loaded: usize,
    pub provisioned: Provisioned,
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub synced: Vec<TableReport>,
    /// `(table_id, error kind)` of every skipped table.
    pub skipped: Vec<(String, &'static str)>,
}

/// Bring one destination table up to date with the API.
#[instrument(level = "info", skip_all, fields(table = %descriptor.table_id))]
pub async fn sync_table(ctx: &RunContext, descriptor: &TableDescriptor) -> Result<TableReport> {
    let cfg = &ctx.config;
    let dest = ctx.destination.as_ref();
    let table = TableRef::new(
        &cfg.database.target_schema,
        descriptor.destination_name(&cfg.table_prefix),
    );

    // 1) incremental window from what is already loaded
    let prior = read_prior_state(dest, &table, &cfg.time_column).await?;
    let time_filter = descriptor
        .variables
        .get(&cfg.time_variable)
        .and_then(|v| v.first())
        .map(String::as_str)
        .unwrap_or_default();
    let window = plan_window(&prior, time_filter, &table.to_string())?;
    info!(%table, ?prior, %window, "planned window");

    let mut requested = descriptor.variables.clone();
    requested.insert(cfg.time_variable.clone(), vec![window.clone()]);

    // 2) catalog + validation
    let info = ctx.api.table_info(&descriptor.table_id).await?;
    let catalog = Catalog::from_variables(&info.variables, &cfg.materialized_variables);
    filter::validate(&catalog, &requested, &cfg.time_variable)?;
    let resolved = filter::resolve(&catalog, &requested)
        .with_context(|| format!("resolving filters for {}", descriptor.table_id))?;

    // 3) fetch
    let verb = descriptor
        .request_type
        .unwrap_or_else(|| TransportVerb::choose(&resolved, cfg.get_max_values));
    let batch = ctx
        .api
        .fetch_dataset(
            &descriptor.table_id,
            &resolved,
            &descriptor.format,
            verb,
            &catalog.column_labels(),
        )
        .await?;

    // 4) schema
    let schema = infer_schema(&batch.schema(), cfg.text_length)?;
    let provisioned = ensure_table(dest, &table, &schema, &descriptor.index_vars)
        .await
        .map_err(|source| LoadError::Provision {
            table: table.to_string(),
            source,
        })?;

    // 5) load
    let loaded = load(dest, &table, &batch, cfg.batch_size).await?;

    Ok(TableReport {
        table,
        window,
        verb,
        fetched: batch.num_rows(),
        loaded,
        provisioned,
    })
}

/// Sync every descriptor. Per-table failures are logged and skipped; anything
/// else aborts the run.
pub async fn run(ctx: &RunContext, descriptors: &[TableDescriptor]) -> Result<RunSummary> {
    let mut summary = RunSummary::default();
    let mut results = stream::iter(descriptors)
        .map(|d| async move { (d, sync_table(ctx, d).await) })
        .buffer_unordered(ctx.config.max_concurrent_tables);

    while let Some((descriptor, result)) = results.next().await {
        match result {
            Ok(report) => {
                info!(
                    table = %descriptor.table_id,
                    loaded = report.loaded,
                    window = %report.window,
                    "table synced"
                );
                summary.synced.push(report);
            }
            Err(err) => {
                let detail = format!("{:#}", err);
                match TableError::classify(err) {
                    Ok(table_err) => {
                        warn!(
                            table = %descriptor.table_id,
                            kind = table_err.kind(),
                            error = %detail,
                            "skipping table"
                        );
                        summary
                            .skipped
                            .push((descriptor.table_id.clone(), table_err.kind()));
                    }
                    Err(fatal) => {
                        return Err(fatal)
                            .with_context(|| format!("aborting run at {}", descriptor.table_id))
                    }
                }
            }
        }
    }

    info!(
        synced = summary.synced.len(),
        skipped = summary.skipped.len(),
        "run finished"
    );
    Ok(summary)
}

/// Build the run context, sync every table, then close `destination` whatever the outcome.
pub async fn execute(
    config: Config,
    destination: Arc<dyn Destination>,
    descriptors: &[TableDescriptor],
) -> Result<RunSummary> {
    let outcome = match RunContext::new(config, destination.clone()) {
        Ok(ctx) => run(&ctx, descriptors).await,
        Err(e) => Err(e),
    };
    destination.close().await;
    outcome
}
