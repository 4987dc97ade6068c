// src/schema/mod.rs

pub mod arrow;
pub mod derive;

use ::arrow::datatypes::Schema;
use std::fmt;
use tracing::{info, instrument};

pub use self::arrow::{build_array, map_to_sql_type};
pub use derive::{derive_kind, ColumnKind};

use crate::{
    dest::{Destination, TableRef},
    error::SchemaInferenceError,
};

/// Destination column types the job creates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    Varchar(u32),
    Int,
    Decimal { precision: u8, scale: u8 },
    Date,
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlType::Varchar(n) => write!(f, "VARCHAR({})", n),
            SqlType::Int => f.write_str("INT"),
            SqlType::Decimal { precision, scale } => write!(f, "DECIMAL({}, {})", precision, scale),
            SqlType::Date => f.write_str("DATE"),
        }
    }
}

/// Ordered column name → type.
pub type TableSchema = Vec<(String, SqlType)>;

/// Map every field of `schema` to a destination type.
pub fn infer_schema(
    schema: &Schema,
    text_length: u32,
) -> Result<TableSchema, SchemaInferenceError> {
    schema
        .fields()
        .iter()
        .map(|field| {
            map_to_sql_type(field.data_type(), text_length)
                .map(|ty| (field.name().clone(), ty))
                .ok_or_else(|| SchemaInferenceError::Unsupported {
                    column: field.name().clone(),
                    data_type: field.data_type().to_string(),
                })
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provisioned {
    Created,
    AlreadyExists,
}

/// Create `table` with `schema` and indexes unless it already exists. Never alters.
#[instrument(level = "debug", skip(dest, schema), fields(%table))]
pub async fn ensure_table(
    dest: &dyn Destination,
    table: &TableRef,
    schema: &TableSchema,
    index_columns: &[String],
) -> Result<Provisioned, sqlx::Error> {
    if dest.table_exists(table).await? {
        return Ok(Provisioned::AlreadyExists);
    }
    dest.create_table(table, schema, index_columns).await?;
    info!(%table, columns = schema.len(), indexes = index_columns.len(), "created table");
    Ok(Provisioned::Created)
}
