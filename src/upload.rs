use crate::error::ApiError;
use crate::extract::ExtractedInvoice;
use crate::http::AppState;
use axum::Json;
use axum::extract::{Multipart, State};
use regex::Regex;
use serde_json::{Value, json};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// The one file field of an analyze-upload request. A browser submitting an
/// empty picker still sends the field, with an empty filename.
pub struct FilePart {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Uploaded PDF written to disk for the duration of one extraction call.
/// Dropping the guard removes the file, on every exit path.
pub struct TempUpload {
    path: PathBuf,
}

impl TempUpload {
    pub fn write(dir: &Path, filename: &str, bytes: &[u8]) -> std::io::Result<Self> {
        let path = dir.join(filename);
        fs::write(&path, bytes)?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempUpload {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %e, "Failed to remove temp upload");
        }
    }
}

fn is_pdf(filename: &str) -> bool {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
}

/// Reduce a client-supplied filename to a safe basename: path separators
/// and anything outside [A-Za-z0-9_.-] become underscores.
pub fn sanitize_filename(filename: &str) -> String {
    let basename = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename)
        .trim_matches('.');
    let re = Regex::new(r"[^A-Za-z0-9_.-]").expect("static pattern");
    let cleaned = re.replace_all(basename, "_").to_string();
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}

/// Temp name: short content digest + sanitized original, so two uploads of
/// the same filename cannot clobber each other.
fn stored_name(filename: &str, bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = format!("{:x}", hasher.finalize());
    format!("{}_{}", &digest[..16], sanitize_filename(filename))
}

/// Validate the upload, stage it on disk, and run one extraction call.
/// The temp file is removed whether extraction succeeds or fails.
pub async fn run_extraction(
    state: &AppState,
    part: Option<FilePart>,
) -> Result<Vec<ExtractedInvoice>, ApiError> {
    let Some(part) = part else {
        return Err(ApiError::Validation("No file part".to_string()));
    };
    if part.filename.is_empty() {
        return Err(ApiError::Validation("No selected file".to_string()));
    }
    if !is_pdf(&part.filename) {
        return Err(ApiError::Validation("Invalid file format".to_string()));
    }

    let staged = TempUpload::write(
        &state.upload_dir,
        &stored_name(&part.filename, &part.bytes),
        &part.bytes,
    )?;
    let pdf_bytes = fs::read(staged.path())?;

    let invoices = state.extractor.analyze_invoice(&pdf_bytes).await?;
    info!(
        file = %part.filename,
        documents = invoices.len(),
        "Upload analyzed"
    );
    Ok(invoices)
}

async fn read_file_part(mut multipart: Multipart) -> Result<Option<FilePart>, ApiError> {
    let mut part = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(format!("Multipart error: {e}")))?
    {
        if field.name() == Some("file") {
            let filename = field.file_name().unwrap_or_default().to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::Validation(format!("Read error: {e}")))?
                .to_vec();
            part = Some(FilePart { filename, bytes });
        }
    }
    Ok(part)
}

/// POST /analyze-upload
pub async fn analyze_upload(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let part = read_file_part(multipart).await?;
    let data = run_extraction(&state, part).await?;
    Ok(Json(json!({ "status": "success", "data": data })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pdf_extension_is_case_insensitive() {
        assert!(is_pdf("invoice.pdf"));
        assert!(is_pdf("INVOICE.PDF"));
        assert!(!is_pdf("invoice.txt"));
        assert!(!is_pdf("invoice"));
        assert!(!is_pdf("invoice.pdf.exe"));
    }

    #[test]
    fn sanitize_strips_paths_and_odd_characters() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename(r"C:\temp\inv oice.pdf"), "inv_oice.pdf");
        assert_eq!(sanitize_filename("fa ktúra#1.pdf"), "fa_kt_ra_1.pdf");
        assert_eq!(sanitize_filename("invoice.pdf"), "invoice.pdf");
        assert_eq!(sanitize_filename("..."), "upload");
    }

    #[test]
    fn stored_name_differs_for_different_content() {
        let a = stored_name("invoice.pdf", b"aaa");
        let b = stored_name("invoice.pdf", b"bbb");
        assert_ne!(a, b);
        assert!(a.ends_with("_invoice.pdf"));
    }

    #[test]
    fn temp_upload_is_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = {
            let staged = TempUpload::write(dir.path(), "x.pdf", b"%PDF-1.4").unwrap();
            assert!(staged.path().exists());
            staged.path().to_path_buf()
        };
        assert!(!path.exists());
    }
}
