// src/dest/mysql.rs

use async_trait::async_trait;
use sqlx::{
    mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions},
    MySql, QueryBuilder,
};
use std::time::Duration;
use tracing::{debug, instrument};

use super::{Destination, TableRef, TextRow};
use crate::{config::DatabaseConfig, schema::TableSchema};

/// MariaDB/MySQL destination over a shared connection pool.
#[derive(Debug, Clone)]
pub struct MySqlDestination {
    pool: MySqlPool,
}

impl MySqlDestination {
    #[instrument(skip_all, fields(host = %cfg.host, database = %cfg.database), err)]
    pub async fn connect(cfg: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let opts = MySqlConnectOptions::new()
            .host(&cfg.host)
            .port(cfg.port)
            .username(&cfg.user)
            .password(&cfg.password)
            .database(&cfg.database);
        let pool = MySqlPoolOptions::new()
            .max_connections(cfg.max_connections)
            .acquire_timeout(Duration::from_secs(30))
            .connect_with(opts)
            .await?;
        Ok(Self { pool })
    }
}

/// Backtick-quote an identifier.
pub fn quote_ident(ident: &str) -> String {
    format!("`{}`", ident.replace('`', "``"))
}

fn qualified(table: &TableRef) -> String {
    format!("{}.{}", quote_ident(&table.schema), quote_ident(&table.name))
}

/// DDL for `create_table`.
pub fn create_table_sql(
    table: &TableRef,
    schema: &TableSchema,
    index_columns: &[String],
) -> String {
    let mut defs: Vec<String> = schema
        .iter()
        .map(|(name, ty)| format!("{} {}", quote_ident(name), ty))
        .collect();
    defs.extend(
        index_columns
            .iter()
            .map(|c| format!("INDEX ({})", quote_ident(c))),
    );
    format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        qualified(table),
        defs.join(", ")
    )
}

#[async_trait]
impl Destination for MySqlDestination {
    async fn table_exists(&self, table: &TableRef) -> Result<bool, sqlx::Error> {
        let exists: i64 = sqlx::query_scalar(
            "SELECT EXISTS (SELECT * FROM INFORMATION_SCHEMA.TABLES \
             WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ?)",
        )
        .bind(&table.schema)
        .bind(&table.name)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists == 1)
    }

    async fn table_has_rows(&self, table: &TableRef) -> Result<bool, sqlx::Error> {
        let sql = format!("SELECT EXISTS (SELECT 1 FROM {})", qualified(table));
        let has_rows: i64 = sqlx::query_scalar(&sql).fetch_one(&self.pool).await?;
        Ok(has_rows == 1)
    }

    #[instrument(level = "debug", skip(self, schema), fields(%table))]
    async fn create_table(
        &self,
        table: &TableRef,
        schema: &TableSchema,
        index_columns: &[String],
    ) -> Result<(), sqlx::Error> {
        let sql = create_table_sql(table, schema, index_columns);
        debug!(%sql, "creating table");
        sqlx::query(&sql).execute(&self.pool).await?;
        Ok(())
    }

    async fn max_value(
        &self,
        table: &TableRef,
        column: &str,
    ) -> Result<Option<String>, sqlx::Error> {
        let sql = format!(
            "SELECT CAST(MAX({}) AS CHAR) FROM {}",
            quote_ident(column),
            qualified(table)
        );
        sqlx::query_scalar::<_, Option<String>>(&sql)
            .fetch_one(&self.pool)
            .await
    }

    async fn insert_rows(
        &self,
        table: &TableRef,
        columns: &[String],
        rows: Vec<TextRow>,
    ) -> Result<u64, sqlx::Error> {
        if rows.is_empty() {
            return Ok(0);
        }
        let column_list = columns
            .iter()
            .map(|c| quote_ident(c))
            .collect::<Vec<_>>()
            .join(", ");
        let mut qb: QueryBuilder<MySql> =
            QueryBuilder::new(format!("INSERT INTO {} ({}) ", qualified(table), column_list));
        qb.push_values(rows, |mut b, row| {
            for value in row {
                b.push_bind(value);
            }
        });
        let done = qb.build().execute(&self.pool).await?;
        Ok(done.rows_affected())
    }

    async fn close(&self) {
        self.pool.close().await;
        debug!("connection pool closed");
    }
}
