//! Input checks shared by the submission wizard and the submit route.
//!
//! Everything here is pure: no I/O happens before these pass.

use bigdecimal::{BigDecimal, Zero};
use std::fmt;
use std::str::FromStr;

use crate::rate_schedule;

/// Media type every uploaded bill must declare.
pub const PDF_MEDIA_TYPE: &str = "application/pdf";

/// Largest accepted upload, 10 MiB.
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

pub const NOT_A_PDF: &str = "Please upload a PDF file";
pub const FILE_TOO_LARGE: &str = "File size should be less than 10MB";

/// A rejected field together with the message shown next to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Checks the declared media type and size of a selected file.
pub fn validate_pdf_file(declared_type: Option<&str>, size: u64) -> Result<(), ValidationError> {
    let is_pdf = declared_type
        .map(|t| t.trim().eq_ignore_ascii_case(PDF_MEDIA_TYPE))
        .unwrap_or(false);
    if !is_pdf {
        return Err(ValidationError::new("file", NOT_A_PDF));
    }
    if size > MAX_UPLOAD_BYTES {
        return Err(ValidationError::new("file", FILE_TOO_LARGE));
    }
    Ok(())
}

/// Returns the trimmed value or a "required" error.
pub fn require<'a>(field: &str, value: &'a str) -> Result<&'a str, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::new(
            field,
            format!("{} is required", field),
        ));
    }
    Ok(trimmed)
}

/// Parses a kWh reading into an exact, non-negative decimal.
pub fn parse_kwh(field: &str, raw: &str) -> Result<BigDecimal, ValidationError> {
    let value = require(field, raw)?;
    let parsed = BigDecimal::from_str(value).map_err(|_| {
        ValidationError::new(field, format!("{} must be a number", field))
    })?;
    if parsed < BigDecimal::zero() {
        return Err(ValidationError::new(
            field,
            format!("{} cannot be negative", field),
        ));
    }
    Ok(parsed.normalized())
}

/// Accepts only ids from the static rate schedule catalog.
pub fn parse_rate_schedule(raw: &str) -> Result<&'static str, ValidationError> {
    let value = require("rate_schedule", raw)?;
    rate_schedule::find(value)
        .map(|schedule| schedule.id)
        .ok_or_else(|| {
            ValidationError::new(
                "rate_schedule",
                format!("Unknown rate schedule: {}", value),
            )
        })
}

/// Extension of the uploaded file name, lowercased; `pdf` when missing.
pub fn file_extension(file_name: &str) -> String {
    file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.trim().to_lowercase())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or_else(|| "pdf".to_string())
}
