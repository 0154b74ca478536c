pub mod mysql;
pub mod sqlite;

use crate::error::ApiError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One persisted invoice row. `id` is assigned by the store on insert and
/// never changes afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceRecord {
    pub id: i64,
    pub vendor_name: Option<String>,
    pub customer_name: Option<String>,
    pub invoice_total: Option<String>,
}

/// The editable fields of a record, as they arrive in save/update bodies.
/// A field the document did not carry stays None.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewInvoice {
    pub vendor_name: Option<String>,
    pub customer_name: Option<String>,
    pub invoice_total: Option<String>,
}

/// CRUD over the `invoices` table. Implementations open one connection per
/// call and close it on return; there is no shared connection state.
#[async_trait]
pub trait InvoiceStore: Send + Sync {
    /// Insert a record and return the id the store assigned.
    async fn insert(&self, invoice: &NewInvoice) -> Result<i64, ApiError>;

    /// All records in id order.
    async fn list(&self) -> Result<Vec<InvoiceRecord>, ApiError>;

    /// Overwrite the three fields of an existing record.
    /// Fails with `NotFound` when the id does not exist.
    async fn update(&self, id: i64, invoice: &NewInvoice) -> Result<(), ApiError>;

    /// Delete by id. Deleting an id that is already gone is a no-op.
    async fn delete(&self, id: i64) -> Result<(), ApiError>;
}
