use crate::error::ApiError;
use crate::http::AppState;
use crate::store::InvoiceRecord;
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use std::fs;
use std::path::Path;
use tracing::info;

const EXPORT_FILENAME: &str = "invoices_export.csv";

/// Tabular dump of the records, one row per invoice, empty cells for
/// fields the document did not carry.
pub fn write_csv(path: &Path, records: &[InvoiceRecord]) -> Result<(), ApiError> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(["id", "vendor_name", "customer_name", "invoice_total"])?;
    for record in records {
        wtr.write_record([
            record.id.to_string().as_str(),
            record.vendor_name.as_deref().unwrap_or(""),
            record.customer_name.as_deref().unwrap_or(""),
            record.invoice_total.as_deref().unwrap_or(""),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// GET /export: write the spreadsheet under the export directory and
/// stream it back as a download.
pub async fn export_records(State(state): State<AppState>) -> Result<Response, ApiError> {
    let records = state.store.list().await?;

    fs::create_dir_all(&state.export_dir)?;
    let path = state.export_dir.join(EXPORT_FILENAME);
    write_csv(&path, &records)?;
    let body = fs::read(&path)?;

    info!(rows = records.len(), path = %path.display(), "Records exported");
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"invoices_export.csv\"",
            ),
        ],
        body,
    )
        .into_response())
}
