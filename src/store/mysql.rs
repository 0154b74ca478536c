use super::{InvoiceRecord, InvoiceStore, NewInvoice};
use crate::error::ApiError;
use async_trait::async_trait;
use sqlx::{Connection, MySqlConnection};
use tracing::info;

/// Networked MySQL backend. Mirrors the SQLite backend's shape: one
/// connection per operation, `?` placeholders, id from AUTO_INCREMENT.
pub struct MysqlStore {
    url: String,
}

impl MysqlStore {
    /// Verify connectivity and apply the schema (idempotent).
    pub async fn connect(url: &str) -> Result<Self, ApiError> {
        let store = Self {
            url: url.to_string(),
        };

        let mut conn = store.open().await?;
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS invoices (
                id BIGINT AUTO_INCREMENT PRIMARY KEY,
                vendor_name TEXT,
                customer_name TEXT,
                invoice_total TEXT
            )",
        )
        .execute(&mut conn)
        .await?;
        conn.close().await?;

        info!("MySQL store initialized");
        Ok(store)
    }

    async fn open(&self) -> Result<MySqlConnection, ApiError> {
        Ok(MySqlConnection::connect(&self.url).await?)
    }
}

#[async_trait]
impl InvoiceStore for MysqlStore {
    async fn insert(&self, invoice: &NewInvoice) -> Result<i64, ApiError> {
        let mut conn = self.open().await?;
        let result = sqlx::query(
            "INSERT INTO invoices (vendor_name, customer_name, invoice_total)
             VALUES (?, ?, ?)",
        )
        .bind(invoice.vendor_name.as_deref())
        .bind(invoice.customer_name.as_deref())
        .bind(invoice.invoice_total.as_deref())
        .execute(&mut conn)
        .await?;
        conn.close().await?;

        let id = result.last_insert_id() as i64;
        info!(id, "Invoice stored");
        Ok(id)
    }

    async fn list(&self) -> Result<Vec<InvoiceRecord>, ApiError> {
        let mut conn = self.open().await?;
        let rows: Vec<(i64, Option<String>, Option<String>, Option<String>)> = sqlx::query_as(
            "SELECT id, vendor_name, customer_name, invoice_total
             FROM invoices
             ORDER BY id",
        )
        .fetch_all(&mut conn)
        .await?;
        conn.close().await?;

        Ok(rows
            .into_iter()
            .map(
                |(id, vendor_name, customer_name, invoice_total)| InvoiceRecord {
                    id,
                    vendor_name,
                    customer_name,
                    invoice_total,
                },
            )
            .collect())
    }

    async fn update(&self, id: i64, invoice: &NewInvoice) -> Result<(), ApiError> {
        let mut conn = self.open().await?;
        let result = sqlx::query(
            "UPDATE invoices
             SET vendor_name = ?, customer_name = ?, invoice_total = ?
             WHERE id = ?",
        )
        .bind(invoice.vendor_name.as_deref())
        .bind(invoice.customer_name.as_deref())
        .bind(invoice.invoice_total.as_deref())
        .bind(id)
        .execute(&mut conn)
        .await?;
        conn.close().await?;

        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound(id));
        }
        info!(id, "Invoice updated");
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<(), ApiError> {
        let mut conn = self.open().await?;
        // Idempotent: zero affected rows is still success.
        let result = sqlx::query("DELETE FROM invoices WHERE id = ?")
            .bind(id)
            .execute(&mut conn)
            .await?;
        conn.close().await?;

        info!(id, affected = result.rows_affected(), "Invoice delete");
        Ok(())
    }
}
