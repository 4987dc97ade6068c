// src/error.rs

use thiserror::Error;

/// Failures that skip a single table but let the run continue.
///
/// Anything that is not one of these is treated as an environment or
/// programming defect and aborts the whole run.
#[derive(Debug, Error)]
pub enum TableError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    RemoteRequest(#[from] RemoteRequestError),

    #[error(transparent)]
    SchemaInference(#[from] SchemaInferenceError),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    StateQuery(#[from] StateQueryError),
}

impl TableError {
    /// Pull a per-table failure out of `err`, or hand `err` back if it is not one.
    pub fn classify(err: anyhow::Error) -> Result<TableError, anyhow::Error> {
        let err = match err.downcast::<TableError>() {
            Ok(e) => return Ok(e),
            Err(e) => e,
        };
        let err = match err.downcast::<ValidationError>() {
            Ok(e) => return Ok(e.into()),
            Err(e) => e,
        };
        let err = match err.downcast::<RemoteRequestError>() {
            Ok(e) => return Ok(e.into()),
            Err(e) => e,
        };
        let err = match err.downcast::<SchemaInferenceError>() {
            Ok(e) => return Ok(e.into()),
            Err(e) => e,
        };
        let err = match err.downcast::<LoadError>() {
            Ok(e) => return Ok(e.into()),
            Err(e) => e,
        };
        match err.downcast::<StateQueryError>() {
            Ok(e) => Ok(e.into()),
            Err(e) => Err(e),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            TableError::Validation(_) => "validation",
            TableError::RemoteRequest(_) => "remote_request",
            TableError::SchemaInference(_) => "schema_inference",
            TableError::Load(_) => "load",
            TableError::StateQuery(_) => "state_query",
        }
    }
}

/// Requested filters that the table's variable catalog does not allow.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("variable `{variable}` is not available in this table")]
    UnknownVariable { variable: String },

    #[error("code values {values:?} are not available for variable `{variable}`")]
    UnknownValues {
        variable: String,
        values: Vec<String>,
    },

    #[error("no value of `{variable}` satisfies `{filter}`")]
    NoComparisonMatch { variable: String, filter: String },

    #[error("comparison `{filter}` on `{variable}` has a non-numeric operand")]
    InvalidOperand { variable: String, filter: String },
}

/// Non-success response from the statistics API.
#[derive(Debug, Error, PartialEq)]
#[error("Status for request is {status} with reason {reason} and message: {message}")]
pub struct RemoteRequestError {
    pub status: u16,
    pub reason: String,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum SchemaInferenceError {
    #[error("column `{column}` has unsupported type {data_type}")]
    Unsupported { column: String, data_type: String },

    #[error("malformed tabular payload: {0}")]
    MalformedPayload(#[from] csv::Error),

    #[error("building record batch: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("payload has no header row")]
    MissingHeader,
}

/// A destination write failed; `committed` rows from earlier batches stay in place.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("creating `{table}` failed: {source}")]
    Provision {
        table: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("batch {batch} into `{table}` failed after {committed} rows: {source}")]
    Batch {
        table: String,
        batch: usize,
        committed: usize,
        #[source]
        source: sqlx::Error,
    },

    #[error("rendering batch {batch} for `{table}`: {source}")]
    Render {
        table: String,
        batch: usize,
        #[source]
        source: arrow::error::ArrowError,
    },
}

/// The incremental window cannot be established from the destination table.
#[derive(Debug, Error, PartialEq)]
pub enum StateQueryError {
    #[error("No data in variable `{column}` in table `{table}`")]
    NoRows { table: String, column: String },

    #[error("latest period `{period}` in `{table}` does not start with a year")]
    UnparseablePeriod { table: String, period: String },
}
