// src/load.rs

use arrow::{array::Array, record_batch::RecordBatch, util::display::array_value_to_string};
use tracing::{debug, info, instrument};

use crate::{
    dest::{Destination, TableRef, TextRow},
    error::LoadError,
};

/// Text forms of a missing value that must land as SQL NULL.
pub const NULL_MARKERS: [&str; 2] = ["nan", "<NA>"];

/// Render `batch` as text rows. Nulls and [`NULL_MARKERS`] become `None`.
pub fn render_rows(batch: &RecordBatch) -> Result<Vec<TextRow>, arrow::error::ArrowError> {
    let mut rows = Vec::with_capacity(batch.num_rows());
    for row in 0..batch.num_rows() {
        let mut out = Vec::with_capacity(batch.num_columns());
        for col in batch.columns() {
            if col.is_null(row) {
                out.push(None);
                continue;
            }
            let value = array_value_to_string(col, row)?;
            if NULL_MARKERS.contains(&value.as_str()) {
                out.push(None);
            } else {
                out.push(Some(value));
            }
        }
        rows.push(out);
    }
    Ok(rows)
}

/// Insert `batch` in sequential chunks of `batch_size` rows.
///
/// Stops at the first failing chunk; chunks written before it stay committed.
#[instrument(level = "info", skip(dest, batch), fields(%table, rows = batch.num_rows()))]
pub async fn load(
    dest: &dyn Destination,
    table: &TableRef,
    batch: &RecordBatch,
    batch_size: usize,
) -> Result<usize, LoadError> {
    let columns: Vec<String> = batch
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let batch_size = batch_size.max(1);
    let total = batch.num_rows();

    let mut committed = 0;
    let mut offset = 0;
    let mut index = 0;
    while offset < total {
        let len = batch_size.min(total - offset);
        let rows = render_rows(&batch.slice(offset, len)).map_err(|source| LoadError::Render {
            table: table.to_string(),
            batch: index,
            source,
        })?;
        let written = dest
            .insert_rows(table, &columns, rows)
            .await
            .map_err(|source| LoadError::Batch {
                table: table.to_string(),
                batch: index,
                committed,
                source,
            })?;
        debug!(batch = index, written, "batch inserted");
        committed += len;
        offset += len;
        index += 1;
    }

    info!(%table, rows = committed, batches = index, "loaded");
    Ok(committed)
}
