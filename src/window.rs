// src/window.rs

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, instrument};

use crate::{
    dest::{Destination, TableRef},
    error::StateQueryError,
};

/// First year requested for a table with nothing loaded yet.
pub const EPOCH_YEAR: i32 = 2014;

/// Quarter (`K1`..`K4`) or month (`M01`..`M12`) marker in a time filter.
static SUB_PERIOD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(M|K)\d{1,2}").expect("sub-period regex is valid"));

/// What the destination table already holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PriorState {
    Empty,
    /// Maximum of the time column, e.g. `2021` or `2021K3`.
    Latest(String),
}

/// Build the strictly-greater-than time filter for the next fetch.
///
/// Granularity comes from the descriptor's own time filter, progress from the
/// persisted period: `Latest("2021")` with `2014K1` gives `>2021K1`.
pub fn plan_window(
    prior: &PriorState,
    time_filter: &str,
    table: &str,
) -> Result<String, StateQueryError> {
    let year = match prior {
        PriorState::Empty => EPOCH_YEAR,
        PriorState::Latest(period) => parse_year(period).ok_or_else(|| {
            StateQueryError::UnparseablePeriod {
                table: table.to_string(),
                period: period.clone(),
            }
        })?,
    };

    Ok(match SUB_PERIOD.find(time_filter) {
        Some(token) => format!(">{}{}", year, token.as_str()),
        None => format!(">{}", year),
    })
}

/// Leading four-digit year of a period token.
fn parse_year(period: &str) -> Option<i32> {
    let head = period.trim().get(..4)?;
    if !head.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    head.parse().ok()
}

/// Inspect the destination table to find how far it has been loaded.
#[instrument(level = "debug", skip(dest))]
pub async fn read_prior_state(
    dest: &dyn Destination,
    table: &TableRef,
    time_column: &str,
) -> Result<PriorState> {
    if !dest
        .table_exists(table)
        .await
        .with_context(|| format!("checking existence of {}", table))?
    {
        debug!(%table, "destination table absent");
        return Ok(PriorState::Empty);
    }
    if !dest
        .table_has_rows(table)
        .await
        .with_context(|| format!("checking rows of {}", table))?
    {
        debug!(%table, "destination table empty");
        return Ok(PriorState::Empty);
    }

    let latest = dest
        .max_value(table, time_column)
        .await
        .with_context(|| format!("reading MAX({}) of {}", time_column, table))?;
    match latest {
        Some(period) => {
            info!(%table, %period, "resuming after latest period");
            Ok(PriorState::Latest(period))
        }
        None => Err(StateQueryError::NoRows {
            table: table.to_string(),
            column: time_column.to_string(),
        }
        .into()),
    }
}
