use async_trait::async_trait;
use bigdecimal::BigDecimal;
use sqlx::PgPool;

use crate::errors::{AppError, ResultExt};
use crate::models::{NewSubmission, SubmissionInput, SubmissionRecord};

/// Structured row storage for submissions.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Inserts one submission; id and `created_at` are assigned by the store.
    async fn insert(&self, submission: &NewSubmission) -> Result<SubmissionRecord, AppError>;

    /// All submissions, newest first.
    async fn list_recent(&self) -> Result<Vec<SubmissionRecord>, AppError>;
}

/// Nullable column values for one submission input.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FlatColumns {
    pub pdf_path: Option<String>,
    pub rate_schedule: Option<String>,
    pub peak_kwh: Option<BigDecimal>,
    pub offpeak_kwh: Option<BigDecimal>,
}

impl From<&SubmissionInput> for FlatColumns {
    fn from(input: &SubmissionInput) -> Self {
        match input {
            SubmissionInput::Uploaded { blob_key } => Self {
                pdf_path: Some(blob_key.clone()),
                ..Self::default()
            },
            SubmissionInput::Manual {
                rate_schedule,
                peak_kwh,
                offpeak_kwh,
            } => Self {
                pdf_path: None,
                rate_schedule: Some(rate_schedule.clone()),
                peak_kwh: Some(peak_kwh.clone()),
                offpeak_kwh: Some(offpeak_kwh.clone()),
            },
        }
    }
}

impl From<&SubmissionRecord> for FlatColumns {
    fn from(record: &SubmissionRecord) -> Self {
        Self {
            pdf_path: record.pdf_path.clone(),
            rate_schedule: record.rate_schedule.clone(),
            peak_kwh: record.peak_kwh.clone(),
            offpeak_kwh: record.offpeak_kwh.clone(),
        }
    }
}

impl FlatColumns {
    /// Rebuilds the tagged input; `None` for rows that match neither mode.
    pub fn into_input(self) -> Option<SubmissionInput> {
        if let Some(blob_key) = self.pdf_path {
            return Some(SubmissionInput::Uploaded { blob_key });
        }
        match (self.rate_schedule, self.peak_kwh, self.offpeak_kwh) {
            (Some(rate_schedule), Some(peak_kwh), Some(offpeak_kwh)) => {
                Some(SubmissionInput::Manual {
                    rate_schedule,
                    peak_kwh,
                    offpeak_kwh,
                })
            }
            _ => None,
        }
    }
}

/// Postgres-backed submission storage.
pub struct SubmissionStorage {
    pool: PgPool,
}

impl SubmissionStorage {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecordStore for SubmissionStorage {
    async fn insert(&self, submission: &NewSubmission) -> Result<SubmissionRecord, AppError> {
        let columns = FlatColumns::from(&submission.input);

        let record = sqlx::query_as::<_, SubmissionRecord>(
            r#"
            INSERT INTO submissions (
                name,
                email,
                pdf_path,
                rate_schedule,
                peak_kwh,
                offpeak_kwh
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, created_at, name, email, pdf_path, rate_schedule, peak_kwh, offpeak_kwh
            "#,
        )
        .bind(&submission.contact.name)
        .bind(&submission.contact.email)
        .bind(&columns.pdf_path)
        .bind(&columns.rate_schedule)
        .bind(&columns.peak_kwh)
        .bind(&columns.offpeak_kwh)
        .fetch_one(&self.pool)
        .await
        .context("Failed to insert submission")?;

        tracing::info!("✓ Submission {} stored", record.id);
        Ok(record)
    }

    async fn list_recent(&self) -> Result<Vec<SubmissionRecord>, AppError> {
        let records = sqlx::query_as::<_, SubmissionRecord>(
            r#"
            SELECT id, created_at, name, email, pdf_path, rate_schedule, peak_kwh, offpeak_kwh
            FROM submissions
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list submissions")?;

        for record in &records {
            if FlatColumns::from(record).into_input().is_none() {
                tracing::warn!("Submission {} has neither a file nor manual readings", record.id);
            }
        }

        tracing::debug!("Loaded {} submissions", records.len());
        Ok(records)
    }
}
