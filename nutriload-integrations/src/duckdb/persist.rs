use anyhow::{Context as _, Result};
use async_trait::async_trait;
use duckdb::{Statement, params};
use nutriload_core::{BatchReport, CatalogStore, Food, RejectedDocument};

use super::Duckdb;

impl Duckdb {
    fn insert_sql(&self) -> String {
        format!(
            "INSERT INTO {} (id, description, brand_owner, ingredients, document) VALUES (?, ?, ?, ?, ?)",
            self.table_name
        )
    }

    fn insert_food(stmt: &mut Statement<'_>, food: &Food, document: &str) -> duckdb::Result<()> {
        stmt.execute(params![
            food.id,
            food.description,
            food.brand_owner,
            food.ingredients,
            document
        ])?;

        Ok(())
    }

    /// All or nothing
    fn insert_in_transaction(
        conn: &mut duckdb::Connection,
        sql: &str,
        rows: &[(&Food, String)],
    ) -> duckdb::Result<()> {
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(sql)?;
            for (food, document) in rows {
                Self::insert_food(&mut stmt, food, document)?;
            }
        }
        tx.commit()
    }

    /// Every document on its own, rejecting the ones that violate a constraint
    ///
    /// Any other failure is a failure of the store and aborts the batch.
    fn insert_one_by_one(
        conn: &duckdb::Connection,
        sql: &str,
        rows: &[(&Food, String)],
    ) -> Result<BatchReport> {
        let mut stmt = conn.prepare(sql).context("Failed to prepare insert")?;
        let mut report = BatchReport {
            attempted: rows.len(),
            ..Default::default()
        };

        for (food, document) in rows {
            match Self::insert_food(&mut stmt, food, document) {
                Ok(()) => report.inserted += 1,
                Err(err) if is_constraint_violation(&err) => {
                    report.rejected.push(RejectedDocument {
                        id: food.id,
                        reason: err.to_string(),
                    });
                }
                Err(err) => {
                    return Err(err).with_context(|| format!("Failed to insert food {}", food.id));
                }
            }
        }

        Ok(report)
    }
}

/// Constraint violations concern a single document, everything else concerns the store
fn is_constraint_violation(err: &duckdb::Error) -> bool {
    match err {
        duckdb::Error::DuckDBFailure(failure, message) => {
            failure.code == duckdb::ffi::ErrorCode::ConstraintViolation
                || message
                    .as_deref()
                    .is_some_and(|message| message.starts_with("Constraint Error"))
        }
        _ => false,
    }
}

#[async_trait]
impl CatalogStore for Duckdb {
    async fn connect(&self) -> Result<()> {
        tracing::debug!("Setting up duckdb schema");
        let schema = self.schema()?;

        let conn = self.connection.lock().await;
        conn.execute_batch(&schema)
            .context("Failed to create catalog table")?;

        tracing::debug!(schema = &schema, "Catalog table ready");
        Ok(())
    }

    async fn clear(&self) -> Result<u64> {
        let conn = self.connection.lock().await;
        let removed = conn
            .execute(&format!("DELETE FROM {}", self.table_name), [])
            .context("Failed to delete catalog")?;

        Ok(removed as u64)
    }

    /// Inserts the batch in a single transaction. If a document violates a constraint, the
    /// documents are inserted one by one so that only the offending ones are rejected.
    async fn insert_batch(&self, foods: Vec<Food>) -> Result<BatchReport> {
        let sql = self.insert_sql();
        let rows = foods
            .iter()
            .map(|food| {
                serde_json::to_string(food)
                    .map(|document| (food, document))
                    .with_context(|| format!("Failed to serialize food {}", food.id))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut conn = self.connection.lock().await;

        match Self::insert_in_transaction(&mut conn, &sql, &rows) {
            Ok(()) => Ok(BatchReport::all_inserted(rows.len())),
            Err(err) if is_constraint_violation(&err) => {
                tracing::debug!(
                    error = %err,
                    "Batch violates a constraint, inserting documents one by one"
                );
                Self::insert_one_by_one(&conn, &sql, &rows)
            }
            Err(err) => Err(err).context("Failed to insert batch"),
        }
    }

    async fn disconnect(&self) -> Result<()> {
        let conn = self.connection.lock().await;
        conn.execute_batch("CHECKPOINT")
            .context("Failed to checkpoint database")
    }

    fn batch_size(&self) -> Option<usize> {
        Some(self.batch_size)
    }
}
