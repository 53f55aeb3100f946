//! # Table Repository
//!
//! Persisted dining-table configuration. Occupancy is not stored here; open
//! table sessions travel as a draft blob.

use chrono::Utc;
use sqlx::{FromRow, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use till_core::TableConfig;

/// Repository for dining-table configuration.
#[derive(Debug, Clone)]
pub struct TableRepository {
    pool: SqlitePool,
}

impl TableRepository {
    /// Creates a new TableRepository.
    pub fn new(pool: SqlitePool) -> Self {
        TableRepository { pool }
    }

    /// All configured tables.
    pub async fn list(&self) -> DbResult<Vec<TableConfig>> {
        let rows: Vec<TableRow> =
            sqlx::query_as("SELECT id, number, description FROM dining_tables ORDER BY created_at, rowid")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(TableConfig::from).collect())
    }

    /// Inserts a table.
    ///
    /// ## Errors
    /// `UniqueViolation` if the number is already configured.
    pub async fn insert(&self, table: &TableConfig) -> DbResult<()> {
        debug!(id = %table.id, number = %table.number, "Inserting table");

        sqlx::query(
            r#"
            INSERT INTO dining_tables (id, number, description, created_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(&table.id)
        .bind(&table.number)
        .bind(&table.description)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| with_number(e.into(), &table.number))?;

        Ok(())
    }

    /// Updates a table's number and description.
    pub async fn update(&self, table: &TableConfig) -> DbResult<()> {
        let result = sqlx::query("UPDATE dining_tables SET number = ?2, description = ?3 WHERE id = ?1")
            .bind(&table.id)
            .bind(&table.number)
            .bind(&table.description)
            .execute(&self.pool)
            .await
            .map_err(|e| with_number(e.into(), &table.number))?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Table", &table.id));
        }
        Ok(())
    }

    /// Deletes a table.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM dining_tables WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Table", id));
        }
        Ok(())
    }

    /// Number of configured tables.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM dining_tables")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

/// Fills in the offending number on a unique violation.
fn with_number(err: DbError, number: &str) -> DbError {
    match err {
        DbError::UniqueViolation { .. } => DbError::duplicate("table number", number),
        other => other,
    }
}

#[derive(Debug, FromRow)]
struct TableRow {
    id: String,
    number: String,
    description: String,
}

impl From<TableRow> for TableConfig {
    fn from(row: TableRow) -> Self {
        TableConfig {
            id: row.id,
            number: row.number,
            description: row.description,
        }
    }
}
