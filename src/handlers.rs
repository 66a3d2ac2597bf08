use axum::{
    extract::{rejection::JsonRejection, Multipart, Path, State},
    http::StatusCode,
    Json,
};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::AdminAuth;
use crate::db_storage::RecordStore;
use crate::errors::AppError;
use crate::extraction::{
    ExtractionError, ExtractionResult, ParsePdfRequest, PdfExtractor, PdfTextExtractor,
    TextExtractor,
};
use crate::models::{MessageResponse, SubmissionRequest, UploadedFile};
use crate::notifier::Notifier;
use crate::progress::{AnalysisReport, ProgressSnapshot, ProgressStore};
use crate::storage::BlobStore;
use crate::submission::{NotificationOutcome, SubmissionService};
use crate::wizard::{Effect, InputMode, WizardMsg, WizardState, WizardStep};

pub const SUBMISSION_RECEIVED: &str = "Submission received successfully";

/// Shared application state injected into handlers.
///
/// Collaborators are optional so the server starts with partial configuration;
/// handlers that need a missing one answer 500 before doing any I/O.
#[derive(Clone)]
pub struct AppState {
    /// Bill storage (Supabase Storage).
    pub blobs: Option<Arc<dyn BlobStore>>,
    /// Submission rows (Postgres).
    pub records: Option<Arc<dyn RecordStore>>,
    /// Admin mail (SMTP).
    pub notifier: Option<Arc<dyn Notifier>>,
    /// Admin identity provider (Supabase Auth).
    pub auth: Option<Arc<dyn AdminAuth>>,
    pub text_extractor: Arc<dyn TextExtractor>,
    /// Analysis progress sessions, keyed by session id.
    pub progress: ProgressStore,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            blobs: None,
            records: None,
            notifier: None,
            auth: None,
            text_extractor: Arc::new(PdfTextExtractor),
            progress: ProgressStore::default(),
        }
    }
}

impl AppState {
    pub fn blob_store(&self) -> Result<Arc<dyn BlobStore>, AppError> {
        self.blobs.clone().ok_or_else(|| {
            AppError::Configuration("SUPABASE_URL / SUPABASE_SERVICE_ROLE_KEY not set".to_string())
        })
    }

    pub fn record_store(&self) -> Result<Arc<dyn RecordStore>, AppError> {
        self.records
            .clone()
            .ok_or_else(|| AppError::Configuration("DATABASE_URL not set".to_string()))
    }

    pub fn notifier(&self) -> Result<Arc<dyn Notifier>, AppError> {
        self.notifier.clone().ok_or_else(|| {
            AppError::Configuration(
                "SMTP_HOST / SMTP_USER / SMTP_PASS / ADMIN_EMAIL not set".to_string(),
            )
        })
    }

    pub fn admin_auth(&self) -> Result<Arc<dyn AdminAuth>, AppError> {
        self.auth.clone().ok_or_else(|| {
            AppError::Configuration("SUPABASE_URL / SUPABASE_SERVICE_ROLE_KEY not set".to_string())
        })
    }

    pub fn submission_service(&self) -> Result<SubmissionService, AppError> {
        Ok(SubmissionService::new(
            self.blob_store()?,
            self.record_store()?,
            self.notifier()?,
        ))
    }

    pub fn pdf_extractor(&self) -> Result<PdfExtractor, AppError> {
        Ok(PdfExtractor::new(
            self.blob_store()?,
            Arc::clone(&self.text_extractor),
        ))
    }
}

/// Health check endpoint.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "bill-intake",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

/// The posted submission form, before validation.
#[derive(Debug, Default)]
pub struct SubmissionForm {
    pub name: String,
    pub email: String,
    pub file: Option<UploadedFile>,
    /// Every other text field, in posted order.
    pub fields: Vec<(String, String)>,
}

impl SubmissionForm {
    pub async fn read(multipart: &mut Multipart) -> Result<Self, AppError> {
        let mut form = SubmissionForm::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::BadRequest(format!("Invalid form data: {}", e)))?
        {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "file" => {
                    let file_name = field.file_name().unwrap_or_default().to_string();
                    let content_type = field.content_type().map(str::to_string);
                    let bytes = field
                        .bytes()
                        .await
                        .map_err(|e| AppError::BadRequest(format!("Invalid file upload: {}", e)))?;
                    // Browsers post an empty part when no file was picked
                    if !(file_name.is_empty() && bytes.is_empty()) {
                        form.file = Some(UploadedFile {
                            file_name,
                            content_type,
                            bytes,
                        });
                    }
                }
                _ => {
                    let value = field
                        .text()
                        .await
                        .map_err(|e| AppError::BadRequest(format!("Invalid form field: {}", e)))?;
                    match name.as_str() {
                        "name" => form.name = value,
                        "email" => form.email = value,
                        _ => form.fields.push((name, value)),
                    }
                }
            }
        }

        Ok(form)
    }

    /// Runs the form through the wizard, yielding the request it would submit.
    pub fn into_request(self) -> Result<SubmissionRequest, AppError> {
        let mut msgs = vec![
            WizardMsg::NameChanged(self.name),
            WizardMsg::EmailChanged(self.email),
            WizardMsg::Next,
        ];
        match self.file {
            Some(file) => {
                msgs.push(WizardMsg::ModeSelected(InputMode::Upload));
                msgs.push(WizardMsg::FileChosen(Some(file)));
            }
            None => {
                msgs.push(WizardMsg::ModeSelected(InputMode::Manual));
                msgs.extend(
                    self.fields
                        .into_iter()
                        .map(|(field, value)| WizardMsg::ManualFieldChanged { field, value }),
                );
            }
        }

        let (state, _) = WizardState::new().run(msgs);
        if state.step != WizardStep::Details {
            return Err(AppError::BadRequest(
                "name and email are required".to_string(),
            ));
        }
        if let Some(message) = state.file_error {
            return Err(AppError::BadRequest(message));
        }

        match state.update(WizardMsg::SubmitRequested) {
            (_, Effect::Submit(request)) => Ok(request),
            (state, _) => Err(AppError::BadRequest(
                state
                    .file_error
                    .or_else(|| state.field_error.map(|e| e.message))
                    .unwrap_or_else(|| "Invalid submission".to_string()),
            )),
        }
    }
}

/// POST /api/submit-bill
///
/// Accepts the wizard's multipart form: `name`, `email` and either a `file`
/// part (upload mode) or the manual usage fields.
pub async fn submit_bill(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<MessageResponse>, AppError> {
    let service = state.submission_service()?;

    let request = SubmissionForm::read(&mut multipart).await?.into_request()?;
    let outcome = service.submit(request).await?;

    if let NotificationOutcome::Failed(ref reason) = outcome.notification {
        tracing::warn!(
            "Submission {} stored without admin notification: {}",
            outcome.record.id,
            reason
        );
    }

    Ok(Json(MessageResponse {
        message: SUBMISSION_RECEIVED.to_string(),
    }))
}

/// POST /api/parse-pdf
pub async fn parse_pdf(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ParsePdfRequest>, JsonRejection>,
) -> Result<Json<ExtractionResult>, ExtractionError> {
    let extractor = state.pdf_extractor().map_err(|e| {
        tracing::error!("PDF extraction unavailable: {}", e);
        ExtractionError::configuration("Missing required environment variables")
    })?;

    let Json(request) = payload.map_err(|e| {
        tracing::error!("Error parsing request body: {}", e);
        ExtractionError::invalid_body()
    })?;

    let result = extractor
        .extract(request.pdf_path.as_deref().unwrap_or_default())
        .await?;
    Ok(Json(result))
}

/// OPTIONS /api/parse-pdf
pub async fn parse_pdf_preflight() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: "OK".to_string(),
    })
}

/// POST /api/analysis
pub async fn start_analysis(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<ProgressSnapshot>) {
    (StatusCode::CREATED, Json(state.progress.start().await))
}

/// POST /api/analysis/:id/tick
pub async fn tick_analysis(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ProgressSnapshot>, AppError> {
    Ok(Json(state.progress.tick(id).await?))
}

/// POST /api/analysis/:id/unlock
pub async fn unlock_analysis(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ProgressSnapshot>, AppError> {
    let snapshot = state.progress.unlock(id).await?;
    tracing::info!("Analysis session {} unlocked", id);
    Ok(Json(snapshot))
}

/// GET /api/analysis/:id/results
pub async fn analysis_results(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<AnalysisReport>, AppError> {
    Ok(Json(state.progress.get(id).await?.report()?))
}

/// DELETE /api/analysis/:id
pub async fn end_analysis(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.progress.remove(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
