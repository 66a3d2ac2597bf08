//! Submission orchestration: store the bill, record the submission, tell the admin.
//!
//! Steps run strictly in order. The blob write and the record insert are
//! durable and fatal on failure; the admin notification is best-effort and its
//! outcome is reported next to the record rather than as an error.

use serde::Serialize;
use std::sync::Arc;

use crate::db_storage::RecordStore;
use crate::errors::{AppError, ResultExt};
use crate::models::{
    NewSubmission, SubmissionInput, SubmissionPayload, SubmissionRecord, SubmissionRequest,
};
use crate::notifier::{Notification, Notifier};
use crate::storage::{self, BlobStore};
use crate::validation::PDF_MEDIA_TYPE;

/// Result of the best-effort notification step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum NotificationOutcome {
    Sent,
    Failed(String),
}

/// Primary result plus the secondary effect's outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmissionOutcome {
    pub record: SubmissionRecord,
    pub notification: NotificationOutcome,
}

pub struct SubmissionService {
    blobs: Arc<dyn BlobStore>,
    records: Arc<dyn RecordStore>,
    notifier: Arc<dyn Notifier>,
}

impl SubmissionService {
    pub fn new(
        blobs: Arc<dyn BlobStore>,
        records: Arc<dyn RecordStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            blobs,
            records,
            notifier,
        }
    }

    pub async fn submit(&self, request: SubmissionRequest) -> Result<SubmissionOutcome, AppError> {
        tracing::info!(
            "Processing {} submission for {}",
            request.payload.mode(),
            request.contact.email
        );

        // Step 1: store the bill (upload mode only)
        let input = match &request.payload {
            SubmissionPayload::Upload(file) => {
                let key = storage::storage_key(&file.file_name);
                let content_type = file.content_type.as_deref().unwrap_or(PDF_MEDIA_TYPE);
                self.blobs
                    .upload(&key, file.bytes.clone(), content_type)
                    .await
                    .context("Failed to store uploaded bill")?;
                SubmissionInput::Uploaded { blob_key: key }
            }
            SubmissionPayload::Manual(entry) => SubmissionInput::Manual {
                rate_schedule: entry.rate_schedule.clone(),
                peak_kwh: entry.peak_kwh.clone(),
                offpeak_kwh: entry.offpeak_kwh.clone(),
            },
        };

        // Step 2: record the submission. A stored blob is not rolled back on failure.
        let record = self
            .records
            .insert(&NewSubmission {
                contact: request.contact.clone(),
                input,
            })
            .await
            .context("Failed to record submission")?;

        // Step 3: notify the admin, never failing the submission
        let notification = Notification::for_submission(&request);
        let notification = match self.notifier.send(&notification).await {
            Ok(()) => NotificationOutcome::Sent,
            Err(e) => {
                tracing::warn!(
                    "⚠️  Admin notification for submission {} failed: {}",
                    record.id,
                    e
                );
                NotificationOutcome::Failed(e.to_string())
            }
        };

        tracing::info!("✅ Submission {} accepted", record.id);
        Ok(SubmissionOutcome {
            record,
            notification,
        })
    }
}
