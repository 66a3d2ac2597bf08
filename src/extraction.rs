//! Server-side PDF text extraction for admin review.
//!
//! Fetches a stored bill, runs the extraction library on the blocking pool and
//! reshapes the text into numbered pages. Pages come from splitting the text on
//! form feeds or blank lines, so their count can differ from `numPages`, which
//! is the document's own page count.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use lopdf::{Dictionary, Object};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

use crate::storage::BlobStore;

/// Shown instead of a blank page.
pub const EMPTY_PAGE_PLACEHOLDER: &str = "[No text content found]";

fn page_break() -> &'static Regex {
    static PAGE_BREAK: OnceLock<Regex> = OnceLock::new();
    PAGE_BREAK.get_or_init(|| Regex::new(r"\f|\n\n+").expect("page break pattern is valid"))
}

/// Body of an extraction request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsePdfRequest {
    #[serde(default)]
    pub pdf_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedPage {
    pub page_number: usize,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PdfMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    pub page_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    pub pages: Vec<ExtractedPage>,
    pub metadata: PdfMetadata,
    /// Raw document information dictionary.
    pub info: BTreeMap<String, String>,
    pub num_pages: usize,
    pub version: String,
}

/// Error panel content for the admin dashboard. Never carries pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractionFailure {
    pub error: bool,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Output of the extraction library before page splitting.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawExtraction {
    pub text: String,
    pub num_pages: usize,
    pub info: BTreeMap<String, String>,
    pub version: String,
}

/// Library boundary: raw document bytes in, text and document facts out.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, bytes: &[u8]) -> Result<RawExtraction, String>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionError {
    pub status: StatusCode,
    pub error: String,
    pub details: String,
}

impl ExtractionError {
    fn new(status: StatusCode, error: &str, details: impl Into<String>) -> Self {
        Self {
            status,
            error: error.to_string(),
            details: details.into(),
        }
    }

    pub fn missing_path() -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            "No PDF path provided",
            "The request must include a PDF path",
        )
    }

    pub fn invalid_body() -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            "Invalid request body",
            "Request body must be valid JSON with a pdfPath property",
        )
    }

    pub fn configuration(details: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Server configuration error",
            details,
        )
    }

    /// Converts into the envelope the dashboard renders in place of results.
    pub fn into_failure(self) -> ExtractionFailure {
        ExtractionFailure {
            error: true,
            message: format!("{}: {}", self.error, self.details),
            timestamp: Utc::now(),
        }
    }
}

impl IntoResponse for ExtractionError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(json!({
                "error": self.error,
                "details": self.details,
            })),
        )
            .into_response()
    }
}

/// Splits extracted text into 1-based pages on form feeds or blank-line runs.
pub fn split_pages(text: &str) -> Vec<ExtractedPage> {
    page_break()
        .split(text)
        .enumerate()
        .map(|(index, segment)| {
            let content = segment.trim();
            ExtractedPage {
                page_number: index + 1,
                content: if content.is_empty() {
                    EMPTY_PAGE_PLACEHOLDER.to_string()
                } else {
                    content.to_string()
                },
            }
        })
        .collect()
}

/// Fetches stored bills and turns them into page-indexed text.
#[derive(Clone)]
pub struct PdfExtractor {
    blobs: Arc<dyn BlobStore>,
    extractor: Arc<dyn TextExtractor>,
}

impl PdfExtractor {
    pub fn new(blobs: Arc<dyn BlobStore>, extractor: Arc<dyn TextExtractor>) -> Self {
        Self { blobs, extractor }
    }

    pub async fn extract(&self, pdf_path: &str) -> Result<ExtractionResult, ExtractionError> {
        let pdf_path = pdf_path.trim();
        if pdf_path.is_empty() {
            tracing::error!("No PDF path provided");
            return Err(ExtractionError::missing_path());
        }

        tracing::info!("Downloading PDF from path: {}", pdf_path);
        let bytes = self.blobs.download(pdf_path).await.map_err(|e| {
            tracing::error!("Error downloading PDF: {}", e);
            ExtractionError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to download PDF",
                e.to_string(),
            )
        })?;

        if bytes.is_empty() {
            return Err(ExtractionError::new(
                StatusCode::NOT_FOUND,
                "No PDF data received",
                "The file may be empty or not accessible",
            ));
        }
        tracing::info!("PDF downloaded successfully: {} bytes", bytes.len());

        let extractor = Arc::clone(&self.extractor);
        let raw = tokio::task::spawn_blocking(move || extractor.extract(&bytes))
            .await
            .map_err(|e| {
                tracing::error!("PDF extraction task aborted: {}", e);
                ExtractionError::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to parse PDF",
                    "PDF extraction aborted unexpectedly",
                )
            })?
            .map_err(|details| {
                tracing::error!("Error parsing PDF: {}", details);
                ExtractionError::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to parse PDF",
                    details,
                )
            })?;

        let pages = split_pages(&raw.text);
        tracing::info!(
            "PDF parsed: {} pages reported, {} text segments",
            raw.num_pages,
            pages.len()
        );

        Ok(ExtractionResult {
            pages,
            metadata: PdfMetadata {
                title: raw.info.get("Title").cloned(),
                author: raw.info.get("Author").cloned(),
                page_count: raw.num_pages,
            },
            info: raw.info,
            num_pages: raw.num_pages,
            version: raw.version,
        })
    }
}

/// Extraction backed by `pdf-extract` for text and `lopdf` for document facts.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfTextExtractor;

impl TextExtractor for PdfTextExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<RawExtraction, String> {
        let document = lopdf::Document::load_mem(bytes)
            .map_err(|e| format!("Unable to load PDF: {}", e))?;

        let text = pdf_extract::extract_text_from_mem(bytes)
            .map_err(|e| format!("Unable to extract text: {:?}", e))?;

        let info = info_dictionary(&document)
            .map(info_to_map)
            .unwrap_or_default();

        Ok(RawExtraction {
            text,
            num_pages: document.get_pages().len(),
            info,
            version: document.version.clone(),
        })
    }
}

fn info_dictionary(document: &lopdf::Document) -> Option<&Dictionary> {
    match document.trailer.get(b"Info").ok()? {
        Object::Reference(id) => document.get_dictionary(*id).ok(),
        Object::Dictionary(dict) => Some(dict),
        _ => None,
    }
}

fn info_to_map(dict: &Dictionary) -> BTreeMap<String, String> {
    dict.iter()
        .filter_map(|(key, value)| {
            let value = match value {
                Object::String(bytes, _) => decode_pdf_string(bytes),
                Object::Name(name) => String::from_utf8_lossy(name).into_owned(),
                Object::Integer(i) => i.to_string(),
                Object::Real(r) => r.to_string(),
                Object::Boolean(b) => b.to_string(),
                _ => return None,
            };
            Some((String::from_utf8_lossy(key).into_owned(), value))
        })
        .collect()
}

/// Text strings are UTF-16BE when they start with a BOM, otherwise single-byte.
fn decode_pdf_string(bytes: &[u8]) -> String {
    match bytes {
        [0xFE, 0xFF, rest @ ..] => {
            let units: Vec<u16> = rest
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect();
            String::from_utf16_lossy(&units)
        }
        _ => bytes.iter().map(|&b| b as char).collect(),
    }
}

/// Admin-facing view state of one extraction request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ExtractionOutcome {
    Parsed(ExtractionResult),
    Failed(ExtractionFailure),
}

impl From<Result<ExtractionResult, ExtractionError>> for ExtractionOutcome {
    fn from(result: Result<ExtractionResult, ExtractionError>) -> Self {
        match result {
            Ok(parsed) => ExtractionOutcome::Parsed(parsed),
            Err(e) => ExtractionOutcome::Failed(e.into_failure()),
        }
    }
}
