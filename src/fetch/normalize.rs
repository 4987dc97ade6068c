// src/fetch/normalize.rs

use arrow::{
    array::{Array, ArrayRef, BooleanArray, StringArray},
    compute::filter_record_batch,
    datatypes::{Field, Schema},
    error::ArrowError,
    record_batch::RecordBatch,
};
use csv::ReaderBuilder;
use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};
use tracing::debug;

use crate::{
    error::SchemaInferenceError,
    schema::{build_array, derive_kind},
};

/// Substring marking an aggregate row; such rows double count their detail rows.
pub const TOTAL_MARKER: &str = ", total";

/// Parse, rename and de-aggregate one API payload.
pub fn normalize(
    text: &str,
    labels: &HashMap<String, String>,
) -> Result<RecordBatch, SchemaInferenceError> {
    let batch = parse_table(text)?;
    let batch = rename_columns(&batch, labels)?;
    let before = batch.num_rows();
    let batch = drop_total_rows(&batch)?;
    debug!(
        rows = batch.num_rows(),
        dropped = before - batch.num_rows(),
        "normalized payload"
    );
    Ok(batch)
}

/// Parse `;`-separated text with a header row into a typed batch.
pub fn parse_table(text: &str) -> Result<RecordBatch, SchemaInferenceError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut rdr = ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.trim().to_string()).collect();
    if headers.iter().all(|h| h.is_empty()) {
        return Err(SchemaInferenceError::MissingHeader);
    }
    let records = rdr.records().collect::<Result<Vec<_>, _>>()?;

    let mut fields = Vec::with_capacity(headers.len());
    let mut columns: Vec<ArrayRef> = Vec::with_capacity(headers.len());
    for (idx, name) in headers.iter().enumerate() {
        let cells: Vec<&str> = records.iter().map(|r| r.get(idx).unwrap_or("")).collect();
        let kind = derive_kind(name, cells.iter().copied());
        fields.push(Field::new(name, kind.data_type(), true));
        columns.push(build_array(kind, &cells));
    }

    Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?)
}

/// Uppercase every header and rename the ones that are catalog codes. Names that
/// already are labels pass through, so renaming twice with the same map is a no-op.
pub fn rename_columns(
    batch: &RecordBatch,
    labels: &HashMap<String, String>,
) -> Result<RecordBatch, ArrowError> {
    let known: HashSet<&str> = labels.values().map(String::as_str).collect();
    let fields: Vec<Field> = batch
        .schema()
        .fields()
        .iter()
        .map(|f| {
            let name = f.name();
            let renamed = if known.contains(name.as_str()) {
                name.clone()
            } else {
                let upper = name.to_uppercase();
                labels.get(&upper).cloned().unwrap_or(upper)
            };
            f.as_ref().clone().with_name(renamed)
        })
        .collect();
    RecordBatch::try_new(Arc::new(Schema::new(fields)), batch.columns().to_vec())
}

/// Drop every row where a text column contains [`TOTAL_MARKER`]. Order is kept.
pub fn drop_total_rows(batch: &RecordBatch) -> Result<RecordBatch, ArrowError> {
    let text_columns: Vec<&StringArray> = batch
        .columns()
        .iter()
        .filter_map(|c| c.as_any().downcast_ref::<StringArray>())
        .collect();
    if text_columns.is_empty() {
        return Ok(batch.clone());
    }

    let keep: BooleanArray = (0..batch.num_rows())
        .map(|row| {
            Some(
                !text_columns
                    .iter()
                    .any(|c| c.is_valid(row) && c.value(row).contains(TOTAL_MARKER)),
            )
        })
        .collect();
    filter_record_batch(batch, &keep)
}
