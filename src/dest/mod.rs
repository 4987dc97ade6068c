// src/dest/mod.rs

use async_trait::async_trait;
use std::fmt;

use crate::schema::TableSchema;

#[cfg(test)]
pub mod memory;
pub mod mysql;

pub use mysql::MySqlDestination;

/// A row ready for insertion. `None` is SQL NULL.
pub type TextRow = Vec<Option<String>>;

/// `schema.table` in the destination database.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableRef {
    pub schema: String,
    pub name: String,
}

impl TableRef {
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.name)
    }
}

/// The relational store the job loads into.
#[async_trait]
pub trait Destination: Send + Sync {
    async fn table_exists(&self, table: &TableRef) -> Result<bool, sqlx::Error>;

    async fn table_has_rows(&self, table: &TableRef) -> Result<bool, sqlx::Error>;

    /// `CREATE TABLE IF NOT EXISTS` with a non-unique index per entry of `index_columns`.
    async fn create_table(
        &self,
        table: &TableRef,
        schema: &TableSchema,
        index_columns: &[String],
    ) -> Result<(), sqlx::Error>;

    /// Largest value of `column` rendered as text, `None` when every row is NULL.
    async fn max_value(&self, table: &TableRef, column: &str)
        -> Result<Option<String>, sqlx::Error>;

    /// One multi-row insert. Returns the number of rows written.
    async fn insert_rows(
        &self,
        table: &TableRef,
        columns: &[String],
        rows: Vec<TextRow>,
    ) -> Result<u64, sqlx::Error>;

    /// Release held connections. Called once when a run ends, whatever its outcome.
    async fn close(&self);
}
