use bigdecimal::BigDecimal;
use std::env;
use std::str::FromStr;
use uuid::Uuid;

use bill_intake::db::Database;
use bill_intake::db_storage::{RecordStore, SubmissionStorage};
use bill_intake::models::{Contact, NewSubmission, SubmissionInput};

/// Integration smoke test for submission storage against a real Postgres.
/// Marked ignored to avoid running against production by accident; set TEST_DATABASE_URL to run.
#[tokio::test]
#[ignore]
async fn store_and_list_submissions_smoke_test() -> anyhow::Result<()> {
    let db_url = env::var("TEST_DATABASE_URL")
        .or_else(|_| env::var("DATABASE_URL"))
        .map_err(|_| anyhow::anyhow!("Set TEST_DATABASE_URL or DATABASE_URL to run this test"))?;

    let db = Database::new(&db_url).await?;
    let storage = SubmissionStorage::new(db.pool.clone());

    // Unique email to find our rows on repeated runs.
    let email = format!("smoke-{}@example.com", Uuid::new_v4().simple());
    let contact = Contact {
        name: "Smoke Test".to_string(),
        email: email.clone(),
    };

    let manual = storage
        .insert(&NewSubmission {
            contact: contact.clone(),
            input: SubmissionInput::Manual {
                rate_schedule: "E-TOU-C-W".to_string(),
                peak_kwh: BigDecimal::from_str("45.125")?,
                offpeak_kwh: BigDecimal::from_str("120")?,
            },
        })
        .await?;
    assert_eq!(manual.pdf_path, None);
    assert_eq!(manual.peak_kwh, Some(BigDecimal::from_str("45.125")?));

    let uploaded = storage
        .insert(&NewSubmission {
            contact,
            input: SubmissionInput::Uploaded {
                blob_key: format!("{}-smoke.pdf", Uuid::new_v4().simple()),
            },
        })
        .await?;
    assert!(uploaded.pdf_path.is_some());
    assert_eq!(uploaded.rate_schedule, None);
    assert_eq!(uploaded.peak_kwh, None);

    let ours: Vec<_> = storage
        .list_recent()
        .await?
        .into_iter()
        .filter(|record| record.email == email)
        .collect();
    assert_eq!(ours.len(), 2);
    assert!(ours[0].created_at >= ours[1].created_at);

    sqlx::query("DELETE FROM submissions WHERE email = $1")
        .bind(&email)
        .execute(&db.pool)
        .await?;
    Ok(())
}
