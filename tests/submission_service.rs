/// Submission service tests against in-memory collaborators.
/// Covers ordering, persisted shape and best-effort notification.
mod common;

use axum::body::Bytes;
use bigdecimal::BigDecimal;
use std::str::FromStr;

use bill_intake::errors::AppError;
use bill_intake::models::{
    Contact, ManualEntry, SubmissionPayload, SubmissionRequest, SubmissionView, UploadedFile,
};
use bill_intake::submission::{NotificationOutcome, SubmissionService};
use bill_intake::wizard::{Effect, InputMode, WizardMsg, WizardState};
use common::{Harness, MemoryBlobStore, MemoryRecordStore, RecordingNotifier};

fn service(harness: &Harness) -> SubmissionService {
    SubmissionService::new(
        harness.blobs.clone(),
        harness.records.clone(),
        harness.notifier.clone(),
    )
}

fn jane() -> Contact {
    Contact {
        name: "Jane".to_string(),
        email: "jane@x.com".to_string(),
    }
}

fn upload_request() -> SubmissionRequest {
    SubmissionRequest {
        contact: jane(),
        payload: SubmissionPayload::Upload(UploadedFile {
            file_name: "March Bill.pdf".to_string(),
            content_type: Some("application/pdf".to_string()),
            bytes: Bytes::from_static(b"%PDF-1.4 fake bill"),
        }),
    }
}

fn manual_request() -> SubmissionRequest {
    SubmissionRequest {
        contact: jane(),
        payload: SubmissionPayload::Manual(ManualEntry {
            rate_schedule: "E-TOU-C-W".to_string(),
            peak_kwh: BigDecimal::from_str("45.125").unwrap(),
            offpeak_kwh: BigDecimal::from_str("120").unwrap(),
            fields: vec![
                ("rate_schedule".to_string(), "E-TOU-C-W".to_string()),
                ("peak_kwh".to_string(), "45.125".to_string()),
                ("offpeak_kwh".to_string(), "120".to_string()),
            ],
        }),
    }
}

#[tokio::test]
async fn test_upload_submission_stores_blob_record_and_mail() {
    let harness = Harness::healthy();
    let outcome = service(&harness).submit(upload_request()).await.unwrap();

    assert_eq!(outcome.notification, NotificationOutcome::Sent);

    let keys = harness.blobs.keys();
    assert_eq!(keys.len(), 1);
    assert!(!keys[0].is_empty());
    assert!(keys[0].ends_with(".pdf"));

    let record = &harness.records.all()[0];
    assert_eq!(record.pdf_path.as_deref(), Some(keys[0].as_str()));
    assert_eq!(record.rate_schedule, None);
    assert_eq!(record.peak_kwh, None);
    assert_eq!(record.offpeak_kwh, None);

    let sent = harness.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].body.contains("File attached: March Bill.pdf"));
    assert!(sent[0].attachment.is_some());
}

#[tokio::test]
async fn test_manual_submission_keeps_exact_decimals_and_no_blob() {
    let harness = Harness::healthy();
    let outcome = service(&harness).submit(manual_request()).await.unwrap();

    assert!(harness.blobs.keys().is_empty());
    assert_eq!(outcome.record.pdf_path, None);
    assert_eq!(
        outcome.record.peak_kwh,
        Some(BigDecimal::from_str("45.125").unwrap())
    );
    assert_eq!(outcome.record.offpeak_kwh, Some(BigDecimal::from(120)));

    let sent = harness.notifier.sent();
    assert!(sent[0].body.contains("peak_kwh: 45.125"));
    assert!(sent[0].attachment.is_none());
}

#[tokio::test]
async fn test_notification_failure_still_confirms() {
    let harness = Harness::new(
        MemoryBlobStore::default(),
        MemoryRecordStore::default(),
        RecordingNotifier::failing(),
    );
    let outcome = service(&harness).submit(upload_request()).await.unwrap();

    assert!(matches!(outcome.notification, NotificationOutcome::Failed(_)));
    assert_eq!(harness.records.all().len(), 1);
}

#[tokio::test]
async fn test_record_failure_is_fatal_after_blob_write() {
    let harness = Harness::new(
        MemoryBlobStore::default(),
        MemoryRecordStore {
            fail_inserts: true,
            ..MemoryRecordStore::default()
        },
        RecordingNotifier::default(),
    );
    let err = service(&harness).submit(upload_request()).await.unwrap_err();

    assert!(err.to_string().starts_with("Failed to record submission"));
    // Blob is orphaned, not rolled back
    assert_eq!(harness.blobs.keys().len(), 1);
    assert!(harness.notifier.sent().is_empty());
}

#[tokio::test]
async fn test_blob_failure_writes_nothing() {
    let harness = Harness::new(
        MemoryBlobStore {
            fail_uploads: true,
            ..MemoryBlobStore::default()
        },
        MemoryRecordStore::default(),
        RecordingNotifier::default(),
    );
    let err = service(&harness).submit(upload_request()).await.unwrap_err();

    assert!(matches!(err, AppError::WithContext { .. }));
    assert!(harness.records.all().is_empty());
    assert!(harness.notifier.sent().is_empty());
}

#[tokio::test]
async fn test_jane_manual_scenario_end_to_end() {
    let harness = Harness::healthy();
    let field = |field: &str, value: &str| WizardMsg::ManualFieldChanged {
        field: field.to_string(),
        value: value.to_string(),
    };

    let (state, effect) = WizardState::new().run([
        WizardMsg::NameChanged("Jane".to_string()),
        WizardMsg::EmailChanged("jane@x.com".to_string()),
        WizardMsg::Next,
        WizardMsg::ModeSelected(InputMode::Manual),
        field("rate_schedule", "E-TOU-C-W"),
        field("peak_kwh", "45.5"),
        field("offpeak_kwh", "120.25"),
        WizardMsg::SubmitRequested,
    ]);
    assert!(state.submitting);
    let request = match effect {
        Effect::Submit(request) => request,
        other => panic!("expected submit effect, got {:?}", other),
    };

    service(&harness).submit(request).await.unwrap();

    let (_, effect) = state.update(WizardMsg::SubmissionSucceeded);
    assert!(matches!(effect, Effect::Navigate(route) if route.path() == "/confirmation"));

    let record = &harness.records.all()[0];
    assert_eq!(record.peak_kwh, Some(BigDecimal::from_str("45.5").unwrap()));
    assert_eq!(record.offpeak_kwh, Some(BigDecimal::from_str("120.25").unwrap()));

    let view = SubmissionView::from(record);
    assert_eq!(
        view.rate_schedule_display,
        "E-TOU-C — Time-of-Use (4-9pm Peak) — Winter"
    );
    assert_eq!(view.peak_kwh, "45.50");
    assert_eq!(view.offpeak_kwh, "120.25");
    assert_eq!(view.pdf_path, None);
}
