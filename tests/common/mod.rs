//! In-memory collaborators for exercising services and routes without I/O.
#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Bytes;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use bill_intake::auth::{AdminAuth, AdminUser, SignedIn};
use bill_intake::db_storage::{FlatColumns, RecordStore};
use bill_intake::errors::AppError;
use bill_intake::extraction::{RawExtraction, TextExtractor};
use bill_intake::handlers::AppState;
use bill_intake::models::{NewSubmission, SubmissionRecord};
use bill_intake::notifier::{Notification, Notifier};
use bill_intake::storage::BlobStore;

pub const VALID_TOKEN: &str = "valid-token";

#[derive(Default)]
pub struct MemoryBlobStore {
    pub objects: Mutex<HashMap<String, Bytes>>,
    pub fail_uploads: bool,
}

impl MemoryBlobStore {
    pub fn with_object(key: &str, bytes: &'static [u8]) -> Self {
        let store = Self::default();
        store
            .objects
            .lock()
            .unwrap()
            .insert(key.to_string(), Bytes::from_static(bytes));
        store
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn upload(&self, key: &str, bytes: Bytes, _content_type: &str) -> Result<(), AppError> {
        if self.fail_uploads {
            return Err(AppError::ExternalApiError("storage unavailable".to_string()));
        }
        self.objects.lock().unwrap().insert(key.to_string(), bytes);
        Ok(())
    }

    async fn download(&self, key: &str) -> Result<Bytes, AppError> {
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Object not found: {}", key)))
    }
}

#[derive(Default)]
pub struct MemoryRecordStore {
    pub records: Mutex<Vec<SubmissionRecord>>,
    pub fail_inserts: bool,
}

impl MemoryRecordStore {
    pub fn all(&self) -> Vec<SubmissionRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn insert(&self, submission: &NewSubmission) -> Result<SubmissionRecord, AppError> {
        if self.fail_inserts {
            return Err(AppError::ExternalApiError("database unavailable".to_string()));
        }
        let columns = FlatColumns::from(&submission.input);
        let record = SubmissionRecord {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            name: submission.contact.name.clone(),
            email: submission.contact.email.clone(),
            pdf_path: columns.pdf_path,
            rate_schedule: columns.rate_schedule,
            peak_kwh: columns.peak_kwh,
            offpeak_kwh: columns.offpeak_kwh,
        };
        self.records.lock().unwrap().push(record.clone());
        Ok(record)
    }

    async fn list_recent(&self) -> Result<Vec<SubmissionRecord>, AppError> {
        let mut records = self.all();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<Notification>>,
    pub fail: bool,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), AppError> {
        if self.fail {
            return Err(AppError::ExternalApiError("relay refused".to_string()));
        }
        self.sent.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

/// Accepts exactly one token and one password.
pub struct StaticAuth;

#[async_trait]
impl AdminAuth for StaticAuth {
    async fn current_user(&self, access_token: &str) -> Result<AdminUser, AppError> {
        if access_token == VALID_TOKEN {
            Ok(admin())
        } else {
            Err(AppError::Unauthorized("Invalid or expired session".to_string()))
        }
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<SignedIn, AppError> {
        if email == "admin@example.com" && password == "hunter2" {
            Ok(SignedIn {
                access_token: VALID_TOKEN.to_string(),
                expires_in: Some(3600),
                user: admin(),
            })
        } else {
            Err(AppError::Unauthorized("Invalid login credentials".to_string()))
        }
    }
}

pub fn admin() -> AdminUser {
    AdminUser {
        id: "admin-1".to_string(),
        email: Some("admin@example.com".to_string()),
    }
}

/// Returns fixed text regardless of the bytes.
pub struct FixedTextExtractor(pub String);

impl TextExtractor for FixedTextExtractor {
    fn extract(&self, _bytes: &[u8]) -> Result<RawExtraction, String> {
        let mut info = BTreeMap::new();
        info.insert("Title".to_string(), "Energy Statement".to_string());
        Ok(RawExtraction {
            text: self.0.clone(),
            num_pages: 1,
            info,
            version: "1.4".to_string(),
        })
    }
}

pub struct Harness {
    pub blobs: Arc<MemoryBlobStore>,
    pub records: Arc<MemoryRecordStore>,
    pub notifier: Arc<RecordingNotifier>,
}

impl Harness {
    pub fn new(blobs: MemoryBlobStore, records: MemoryRecordStore, notifier: RecordingNotifier) -> Self {
        Self {
            blobs: Arc::new(blobs),
            records: Arc::new(records),
            notifier: Arc::new(notifier),
        }
    }

    pub fn healthy() -> Self {
        Self::new(
            MemoryBlobStore::default(),
            MemoryRecordStore::default(),
            RecordingNotifier::default(),
        )
    }

    pub fn state(&self) -> AppState {
        let blobs: Arc<dyn BlobStore> = self.blobs.clone();
        let records: Arc<dyn RecordStore> = self.records.clone();
        let notifier: Arc<dyn Notifier> = self.notifier.clone();
        AppState {
            blobs: Some(blobs),
            records: Some(records),
            notifier: Some(notifier),
            auth: Some(Arc::new(StaticAuth)),
            text_extractor: Arc::new(FixedTextExtractor(
                "Account summary\n\n\nUsage details".to_string(),
            )),
            ..AppState::default()
        }
    }
}
