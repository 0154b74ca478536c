use super::{InvoiceRecord, InvoiceStore, NewInvoice};
use crate::error::ApiError;
use async_trait::async_trait;
use rusqlite::{Connection, params};
use std::path::{Path, PathBuf};
use tracing::info;

/// Embedded file-database backend. Every operation opens the database file,
/// runs one parameterized statement, and drops the connection.
pub struct SqliteStore {
    path: PathBuf,
}

impl SqliteStore {
    /// Open (creating the file and schema if needed) and verify the store.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ApiError> {
        let store = Self {
            path: path.as_ref().to_path_buf(),
        };

        let conn = store.connect()?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS invoices (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                vendor_name TEXT,
                customer_name TEXT,
                invoice_total TEXT
            )",
            [],
        )?;

        info!(path = %store.path.display(), "SQLite store initialized");
        Ok(store)
    }

    fn connect(&self) -> Result<Connection, ApiError> {
        Ok(Connection::open(&self.path)?)
    }
}

#[async_trait]
impl InvoiceStore for SqliteStore {
    async fn insert(&self, invoice: &NewInvoice) -> Result<i64, ApiError> {
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO invoices (vendor_name, customer_name, invoice_total)
             VALUES (?1, ?2, ?3)",
            params![
                invoice.vendor_name,
                invoice.customer_name,
                invoice.invoice_total
            ],
        )?;
        let id = conn.last_insert_rowid();
        info!(id, "Invoice stored");
        Ok(id)
    }

    async fn list(&self) -> Result<Vec<InvoiceRecord>, ApiError> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT id, vendor_name, customer_name, invoice_total
             FROM invoices
             ORDER BY id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(InvoiceRecord {
                id: row.get(0)?,
                vendor_name: row.get(1)?,
                customer_name: row.get(2)?,
                invoice_total: row.get(3)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    async fn update(&self, id: i64, invoice: &NewInvoice) -> Result<(), ApiError> {
        let conn = self.connect()?;
        let affected = conn.execute(
            "UPDATE invoices
             SET vendor_name = ?1, customer_name = ?2, invoice_total = ?3
             WHERE id = ?4",
            params![
                invoice.vendor_name,
                invoice.customer_name,
                invoice.invoice_total,
                id
            ],
        )?;
        if affected == 0 {
            return Err(ApiError::NotFound(id));
        }
        info!(id, "Invoice updated");
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<(), ApiError> {
        let conn = self.connect()?;
        // Idempotent: zero affected rows is still success.
        let affected = conn.execute("DELETE FROM invoices WHERE id = ?1", params![id])?;
        info!(id, affected, "Invoice delete");
        Ok(())
    }
}
