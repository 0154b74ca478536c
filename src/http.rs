use crate::error::ApiError;
use crate::export;
use crate::extract::DocumentExtractor;
use crate::store::{InvoiceStore, NewInvoice};
use crate::upload;
use axum::extract::{DefaultBodyLimit, Path, State};
use axum::response::Html;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Shared handler dependencies, all constructed in main (or by a test) and
/// injected; there are no process-level globals.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn InvoiceStore>,
    pub extractor: Arc<dyn DocumentExtractor>,
    pub upload_dir: PathBuf,
    pub export_dir: PathBuf,
    pub max_upload_bytes: usize,
}

pub fn router(state: AppState) -> Router {
    let max_upload = state.max_upload_bytes;
    Router::new()
        .route("/", get(index))
        .route(
            "/analyze-upload",
            post(upload::analyze_upload).layer(DefaultBodyLimit::max(max_upload)),
        )
        .route("/save", post(save_invoice))
        .route("/records", get(list_records))
        .route("/update/{id}", post(update_invoice))
        .route("/delete/{id}", post(delete_invoice))
        .route("/export", get(export::export_records))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /, the upload and review page.
async fn index() -> Html<&'static str> {
    Html(include_str!("../static/index.html"))
}

/// POST /save
pub async fn save_invoice(
    State(state): State<AppState>,
    Json(body): Json<NewInvoice>,
) -> Result<Json<Value>, ApiError> {
    state.store.insert(&body).await?;
    Ok(Json(json!({
        "status": "success",
        "message": "Saved successfully!",
    })))
}

/// GET /records
pub async fn list_records(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let records = state.store.list().await?;
    Ok(Json(json!({ "records": records })))
}

/// POST /update/{id}
pub async fn update_invoice(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<NewInvoice>,
) -> Result<Json<Value>, ApiError> {
    state.store.update(id, &body).await?;
    Ok(Json(json!({ "status": "success" })))
}

/// POST /delete/{id}
pub async fn delete_invoice(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    state.store.delete(id).await?;
    Ok(Json(json!({ "status": "success" })))
}
