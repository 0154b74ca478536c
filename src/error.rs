use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Everything a handler can fail with, mapped onto an HTTP status and a
/// `{status, message}` JSON body.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Bad upload input or request body. The message is shown to the caller.
    #[error("{0}")]
    Validation(String),

    /// A record id that does not exist in the store.
    #[error("record {0} not found")]
    NotFound(i64),

    /// The external document-analysis service failed or returned garbage.
    #[error("extraction failed: {0}")]
    Extraction(String),

    /// Database connectivity or statement failure.
    #[error("persistence failed: {0}")]
    Persistence(String),

    /// Spreadsheet serialization failure.
    #[error("export failed: {0}")]
    Export(String),

    #[error("io failure: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rusqlite::Error> for ApiError {
    fn from(e: rusqlite::Error) -> Self {
        ApiError::Persistence(e.to_string())
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(e: sqlx::Error) -> Self {
        ApiError::Persistence(e.to_string())
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        ApiError::Extraction(e.to_string())
    }
}

impl From<csv::Error> for ApiError {
    fn from(e: csv::Error) -> Self {
        ApiError::Export(e.to_string())
    }
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Extraction(_) => StatusCode::BAD_GATEWAY,
            ApiError::Persistence(_) | ApiError::Export(_) | ApiError::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message sent to the client. Server-side failures get a generic line;
    /// the detail only goes to the log.
    fn public_message(&self) -> String {
        match self {
            ApiError::Validation(msg) => msg.clone(),
            ApiError::NotFound(id) => format!("Record {id} not found"),
            ApiError::Extraction(_) => "Document analysis service failed".to_string(),
            ApiError::Persistence(_) => "Database operation failed".to_string(),
            ApiError::Export(_) => "Export failed".to_string(),
            ApiError::Io(_) => "Internal error".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self, "Request failed");
        }
        let body = Json(json!({
            "status": "error",
            "message": self.public_message(),
        }));
        (status, body).into_response()
    }
}
