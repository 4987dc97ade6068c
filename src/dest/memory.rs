// src/dest/memory.rs

use async_trait::async_trait;
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Mutex, MutexGuard,
    },
};

use super::{Destination, TableRef, TextRow};
use crate::schema::TableSchema;

#[derive(Debug, Clone, Default)]
pub struct MemoryTable {
    pub schema: TableSchema,
    pub indexes: Vec<String>,
    pub columns: Vec<String>,
    pub rows: Vec<TextRow>,
    pub insert_calls: usize,
}

/// In-process destination with optional failure injection on inserts.
#[derive(Debug, Default)]
pub struct MemoryDestination {
    tables: Mutex<HashMap<TableRef, MemoryTable>>,
    /// Zero-based insert call (across all tables) that fails.
    fail_insert_at: Option<usize>,
    inserts: Mutex<usize>,
    closed: AtomicBool,
}

impl MemoryDestination {
    pub fn failing_insert_at(call: usize) -> Self {
        Self {
            fail_insert_at: Some(call),
            ..Self::default()
        }
    }

    pub fn table(&self, table: &TableRef) -> Option<MemoryTable> {
        self.lock().get(table).cloned()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<TableRef, MemoryTable>> {
        self.tables.lock().unwrap()
    }
}

fn missing(table: &TableRef) -> sqlx::Error {
    sqlx::Error::Protocol(format!("table {} doesn't exist", table))
}

#[async_trait]
impl Destination for MemoryDestination {
    async fn table_exists(&self, table: &TableRef) -> Result<bool, sqlx::Error> {
        Ok(self.lock().contains_key(table))
    }

    async fn table_has_rows(&self, table: &TableRef) -> Result<bool, sqlx::Error> {
        self.lock()
            .get(table)
            .map(|t| !t.rows.is_empty())
            .ok_or_else(|| missing(table))
    }

    async fn create_table(
        &self,
        table: &TableRef,
        schema: &TableSchema,
        index_columns: &[String],
    ) -> Result<(), sqlx::Error> {
        self.lock().entry(table.clone()).or_insert_with(|| MemoryTable {
            schema: schema.clone(),
            indexes: index_columns.to_vec(),
            columns: schema.iter().map(|(name, _)| name.clone()).collect(),
            ..MemoryTable::default()
        });
        Ok(())
    }

    async fn max_value(
        &self,
        table: &TableRef,
        column: &str,
    ) -> Result<Option<String>, sqlx::Error> {
        let tables = self.lock();
        let t = tables.get(table).ok_or_else(|| missing(table))?;
        let idx = t
            .columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(column))
            .ok_or_else(|| sqlx::Error::ColumnNotFound(column.to_string()))?;
        Ok(t.rows.iter().filter_map(|r| r[idx].clone()).max())
    }

    async fn insert_rows(
        &self,
        table: &TableRef,
        columns: &[String],
        rows: Vec<TextRow>,
    ) -> Result<u64, sqlx::Error> {
        {
            let mut n = self.inserts.lock().unwrap();
            let call = *n;
            *n += 1;
            if self.fail_insert_at == Some(call) {
                return Err(sqlx::Error::Protocol(format!("injected failure on insert {}", call)));
            }
        }

        let mut tables = self.lock();
        let t = tables.get_mut(table).ok_or_else(|| missing(table))?;
        if t.columns != columns {
            return Err(sqlx::Error::Protocol(format!(
                "column mismatch: table has {:?}, insert names {:?}",
                t.columns, columns
            )));
        }
        let n = rows.len() as u64;
        t.rows.extend(rows);
        t.insert_calls += 1;
        Ok(n)
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}
