use crate::config::ExtractorConfig;
use crate::error::ApiError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info};

const ANALYZE_PATH: &str = "formrecognizer/documentModels/prebuilt-invoice:analyze";
const API_VERSION: &str = "2023-07-31";

/// The fields we keep from one analyzed invoice document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractedInvoice {
    pub vendor_name: Option<String>,
    pub customer_name: Option<String>,
    /// Display string, currency unit glued to the amount (e.g. "$123.45").
    pub invoice_total: Option<String>,
}

/// Anything that can turn PDF bytes into invoice fields. Handlers hold this
/// behind `Arc<dyn DocumentExtractor>` so tests can substitute a fake.
#[async_trait]
pub trait DocumentExtractor: Send + Sync {
    async fn analyze_invoice(&self, pdf_bytes: &[u8]) -> Result<Vec<ExtractedInvoice>, ApiError>;
}

// --- wire format of the analysis service ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeOperation {
    status: String,
    analyze_result: Option<AnalyzeResult>,
    error: Option<ServiceError>,
}

#[derive(Debug, Deserialize)]
struct ServiceError {
    code: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnalyzeResult {
    #[serde(default)]
    documents: Vec<AnalyzedDocument>,
}

#[derive(Debug, Deserialize)]
struct AnalyzedDocument {
    #[serde(default)]
    fields: HashMap<String, DocumentField>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DocumentField {
    content: Option<String>,
    value_string: Option<String>,
    value_currency: Option<CurrencyValue>,
}

/// Structured monetary value as the service reports it. The concatenated
/// display form is derived, not stored.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrencyValue {
    pub amount: f64,
    pub currency_symbol: Option<String>,
    pub currency_code: Option<String>,
}

impl CurrencyValue {
    /// `<symbol><amount>`; falls back to the ISO code, then to the bare
    /// amount, when the service did not recognize a symbol.
    pub fn display(&self) -> String {
        let unit = self
            .currency_symbol
            .as_deref()
            .or(self.currency_code.as_deref())
            .unwrap_or("");
        format!("{}{}", unit, self.amount)
    }
}

/// Client for an Azure-style prebuilt-invoice analysis endpoint.
///
/// The analyze call is asynchronous on the service side: the POST returns
/// 202 with an Operation-Location header, which is then polled until the
/// analysis settles. No retries; a failed call surfaces as `Extraction`.
pub struct FormRecognizerClient {
    http: Client,
    endpoint: String,
    api_key: String,
    locale: String,
    poll_interval: Duration,
    max_polls: u32,
}

impl FormRecognizerClient {
    pub fn new(cfg: &ExtractorConfig) -> Result<Self, ApiError> {
        let api_key = cfg.resolved_api_key().ok_or_else(|| {
            ApiError::Extraction(
                "no API key configured (set extractor.api_key or EXTRACTOR_API_KEY)".to_string(),
            )
        })?;

        let http = Client::builder()
            .timeout(Duration::from_secs(cfg.request_timeout_secs))
            .build()?;

        info!(endpoint = %cfg.endpoint, locale = %cfg.locale, "Extraction client ready");
        Ok(Self {
            http,
            endpoint: cfg.endpoint.trim_end_matches('/').to_string(),
            api_key,
            locale: cfg.locale.clone(),
            poll_interval: Duration::from_millis(cfg.poll_interval_ms),
            max_polls: cfg.max_polls,
        })
    }
}

#[async_trait]
impl DocumentExtractor for FormRecognizerClient {
    async fn analyze_invoice(&self, pdf_bytes: &[u8]) -> Result<Vec<ExtractedInvoice>, ApiError> {
        let url = format!(
            "{}/{}?api-version={}&locale={}",
            self.endpoint, ANALYZE_PATH, API_VERSION, self.locale
        );

        let response = self
            .http
            .post(&url)
            .header("Ocp-Apim-Subscription-Key", &self.api_key)
            .header(reqwest::header::CONTENT_TYPE, "application/pdf")
            .body(pdf_bytes.to_vec())
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Extraction(format!(
                "analyze request rejected: {status}: {body}"
            )));
        }

        let operation_url = response
            .headers()
            .get("operation-location")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| {
                ApiError::Extraction("service response missing Operation-Location".to_string())
            })?;

        for attempt in 0..self.max_polls {
            tokio::time::sleep(self.poll_interval).await;

            let operation: AnalyzeOperation = self
                .http
                .get(&operation_url)
                .header("Ocp-Apim-Subscription-Key", &self.api_key)
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;

            match operation.status.as_str() {
                "succeeded" => {
                    let result = operation.analyze_result.ok_or_else(|| {
                        ApiError::Extraction("succeeded without analyzeResult".to_string())
                    })?;
                    let invoices = map_documents(result);
                    info!(documents = invoices.len(), "Invoice analysis succeeded");
                    return Ok(invoices);
                }
                "failed" => {
                    let detail = operation
                        .error
                        .map(|e| {
                            format!(
                                "{}: {}",
                                e.code.unwrap_or_default(),
                                e.message.unwrap_or_default()
                            )
                        })
                        .unwrap_or_else(|| "no error detail".to_string());
                    return Err(ApiError::Extraction(format!("analysis failed: {detail}")));
                }
                other => {
                    debug!(status = %other, attempt, "Analysis still running");
                }
            }
        }

        Err(ApiError::Extraction(format!(
            "analysis did not settle within {} polls",
            self.max_polls
        )))
    }
}

/// Reduce the service's field bag to the three fields we persist.
/// A field the service did not recognize becomes None, never an error.
fn map_documents(result: AnalyzeResult) -> Vec<ExtractedInvoice> {
    result
        .documents
        .into_iter()
        .map(|doc| {
            let mut fields = doc.fields;
            let vendor_name = take_string(&mut fields, "VendorName");
            let customer_name = take_string(&mut fields, "CustomerName");
            let invoice_total = fields
                .remove("InvoiceTotal")
                .and_then(|f| f.value_currency)
                .map(|c| c.display());
            ExtractedInvoice {
                vendor_name,
                customer_name,
                invoice_total,
            }
        })
        .collect()
}

fn take_string(fields: &mut HashMap<String, DocumentField>, key: &str) -> Option<String> {
    fields.remove(key).and_then(|f| f.value_string.or(f.content))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUCCEEDED_BODY: &str = r#"{
        "status": "succeeded",
        "analyzeResult": {
            "documents": [
                {
                    "fields": {
                        "VendorName": { "type": "string", "valueString": "Contoso Ltd.", "content": "Contoso Ltd." },
                        "CustomerName": { "type": "string", "valueString": "Microsoft Corp" },
                        "InvoiceTotal": {
                            "type": "currency",
                            "content": "$123.45",
                            "valueCurrency": { "amount": 123.45, "currencySymbol": "$", "currencyCode": "USD" }
                        }
                    }
                }
            ]
        }
    }"#;

    #[test]
    fn maps_recognized_fields() {
        let op: AnalyzeOperation = serde_json::from_str(SUCCEEDED_BODY).unwrap();
        let invoices = map_documents(op.analyze_result.unwrap());

        assert_eq!(invoices.len(), 1);
        assert_eq!(invoices[0].vendor_name.as_deref(), Some("Contoso Ltd."));
        assert_eq!(invoices[0].customer_name.as_deref(), Some("Microsoft Corp"));
        assert_eq!(invoices[0].invoice_total.as_deref(), Some("$123.45"));
    }

    #[test]
    fn missing_fields_become_none() {
        let body = r#"{
            "status": "succeeded",
            "analyzeResult": {
                "documents": [
                    { "fields": { "CustomerName": { "type": "string", "valueString": "Bob" } } }
                ]
            }
        }"#;
        let op: AnalyzeOperation = serde_json::from_str(body).unwrap();
        let invoices = map_documents(op.analyze_result.unwrap());

        assert_eq!(invoices[0].vendor_name, None);
        assert_eq!(invoices[0].customer_name.as_deref(), Some("Bob"));
        assert_eq!(invoices[0].invoice_total, None);
    }

    #[test]
    fn currency_display_concatenates_symbol_and_amount() {
        let value = CurrencyValue {
            amount: 123.45,
            currency_symbol: Some("$".to_string()),
            currency_code: Some("USD".to_string()),
        };
        assert_eq!(value.display(), "$123.45");
    }

    #[test]
    fn currency_display_falls_back_to_code() {
        let value = CurrencyValue {
            amount: 99.9,
            currency_symbol: None,
            currency_code: Some("EUR".to_string()),
        };
        assert_eq!(value.display(), "EUR99.9");

        let bare = CurrencyValue {
            amount: 5.0,
            currency_symbol: None,
            currency_code: None,
        };
        assert_eq!(bare.display(), "5");
    }

    #[test]
    fn field_content_backs_up_value_string() {
        let body = r#"{
            "status": "succeeded",
            "analyzeResult": {
                "documents": [
                    { "fields": { "VendorName": { "type": "string", "content": "Acme Corp" } } }
                ]
            }
        }"#;
        let op: AnalyzeOperation = serde_json::from_str(body).unwrap();
        let invoices = map_documents(op.analyze_result.unwrap());
        assert_eq!(invoices[0].vendor_name.as_deref(), Some("Acme Corp"));
    }
}
