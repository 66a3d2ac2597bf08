use axum::body::Bytes;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::rate_schedule::{self, MISSING};

// ============ Service Boundary Models ============

/// Identity fields collected on the first wizard step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub name: String,
    pub email: String,
}

/// A bill file as received from the browser.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadedFile {
    /// Original file name, used for the storage key extension and the mail attachment.
    pub file_name: String,
    /// Media type declared by the client.
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

impl UploadedFile {
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Structured energy usage typed in by hand.
#[derive(Debug, Clone, PartialEq)]
pub struct ManualEntry {
    pub rate_schedule: String,
    pub peak_kwh: BigDecimal,
    pub offpeak_kwh: BigDecimal,
    /// Every manual field as posted, in form order, for the admin notification.
    pub fields: Vec<(String, String)>,
}

/// What the user handed over on step two.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionPayload {
    Upload(UploadedFile),
    Manual(ManualEntry),
}

impl SubmissionPayload {
    pub fn mode(&self) -> &'static str {
        match self {
            SubmissionPayload::Upload(_) => "upload",
            SubmissionPayload::Manual(_) => "manual",
        }
    }
}

/// A validated submission ready for the submission service.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionRequest {
    pub contact: Contact,
    pub payload: SubmissionPayload,
}

/// The persisted half of a submission's input. Exactly one variant per record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SubmissionInput {
    Uploaded {
        blob_key: String,
    },
    Manual {
        rate_schedule: String,
        peak_kwh: BigDecimal,
        offpeak_kwh: BigDecimal,
    },
}

/// Row to insert into `submissions`; id and timestamp come from the database.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSubmission {
    pub contact: Contact,
    pub input: SubmissionInput,
}

// ============ Database Models ============

/// A stored submission in its flat column layout.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct SubmissionRecord {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub name: String,
    pub email: String,
    pub pdf_path: Option<String>,
    pub rate_schedule: Option<String>,
    pub peak_kwh: Option<BigDecimal>,
    pub offpeak_kwh: Option<BigDecimal>,
}

// ============ Admin Views ============

/// Two decimals, or `-` when the reading is missing.
pub fn format_kwh(value: Option<&BigDecimal>) -> String {
    value
        .map(|v| format!("{:.2}", v.round(2)))
        .unwrap_or_else(|| MISSING.to_string())
}

/// A submission as shown on the admin dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmissionView {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub name: String,
    pub email: String,
    pub pdf_path: Option<String>,
    pub rate_schedule: Option<String>,
    /// Resolved catalog text or `-`.
    pub rate_schedule_display: String,
    pub peak_kwh: String,
    pub offpeak_kwh: String,
}

impl From<&SubmissionRecord> for SubmissionView {
    fn from(record: &SubmissionRecord) -> Self {
        Self {
            id: record.id,
            created_at: record.created_at,
            name: record.name.clone(),
            email: record.email.clone(),
            pdf_path: record.pdf_path.clone(),
            rate_schedule: record.rate_schedule.clone(),
            rate_schedule_display: rate_schedule::display_for(record.rate_schedule.as_deref()),
            peak_kwh: format_kwh(record.peak_kwh.as_ref()),
            offpeak_kwh: format_kwh(record.offpeak_kwh.as_ref()),
        }
    }
}

// ============ API Response Models ============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}
