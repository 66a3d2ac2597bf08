//! Two-step bill submission wizard.
//!
//! The wizard is an explicit state value driven by messages through
//! [`WizardState::update`], which returns the next state plus at most one
//! [`Effect`] for the caller to perform (submit, navigate). The browser form
//! and the `/api/submit-bill` route both run submissions through it, so a
//! posted form is accepted or rejected by exactly the rules the UI applies.

use serde::Serialize;

use crate::models::{
    Contact, ManualEntry, SubmissionPayload, SubmissionRequest, UploadedFile,
};
use crate::validation::{self, ValidationError};

/// Manual fields that must be present for a manual submission.
pub const REQUIRED_MANUAL_FIELDS: [&str; 3] = ["rate_schedule", "peak_kwh", "offpeak_kwh"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    /// Step 1: name and email.
    Identity,
    /// Step 2: bill upload or manual usage entry.
    Details,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InputMode {
    Upload,
    Manual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Confirmation,
}

impl Route {
    pub fn path(&self) -> &'static str {
        match self {
            Route::Confirmation => "/confirmation",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WizardMsg {
    NameChanged(String),
    EmailChanged(String),
    Next,
    Back,
    ModeSelected(InputMode),
    /// Picked through the file browser; `None` when the dialog was cancelled.
    FileChosen(Option<UploadedFile>),
    /// Dropped onto the upload area; `None` when the drop carried no file.
    FileDropped(Option<UploadedFile>),
    FileRemoved,
    ManualFieldChanged { field: String, value: String },
    SubmitRequested,
    SubmissionSucceeded,
    SubmissionFailed(String),
    ErrorDismissed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    None,
    Submit(SubmissionRequest),
    Navigate(Route),
}

#[derive(Debug, Clone, PartialEq)]
pub struct WizardState {
    pub step: WizardStep,
    pub mode: InputMode,
    pub name: String,
    pub email: String,
    pub file: Option<UploadedFile>,
    /// Inline error under the upload control.
    pub file_error: Option<String>,
    /// Manual fields in the order they were first entered.
    pub manual_fields: Vec<(String, String)>,
    /// Inline error for the offending manual field.
    pub field_error: Option<ValidationError>,
    /// Dismissable banner for service failures.
    pub submit_error: Option<String>,
    pub submitting: bool,
}

impl Default for WizardState {
    fn default() -> Self {
        Self {
            step: WizardStep::Identity,
            mode: InputMode::Upload,
            name: String::new(),
            email: String::new(),
            file: None,
            file_error: None,
            manual_fields: Vec::new(),
            field_error: None,
            submit_error: None,
            submitting: false,
        }
    }
}

impl WizardState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one message and reports what the caller should do next.
    pub fn update(mut self, msg: WizardMsg) -> (Self, Effect) {
        let effect = match msg {
            WizardMsg::NameChanged(name) => {
                self.name = name;
                Effect::None
            }
            WizardMsg::EmailChanged(email) => {
                self.email = email;
                Effect::None
            }
            WizardMsg::Next => {
                if self.step == WizardStep::Identity && self.identity_complete() {
                    self.step = WizardStep::Details;
                }
                Effect::None
            }
            WizardMsg::Back => {
                self.step = WizardStep::Identity;
                Effect::None
            }
            WizardMsg::ModeSelected(mode) => {
                self.mode = mode;
                Effect::None
            }
            WizardMsg::FileChosen(None) => {
                self.file_error = None;
                Effect::None
            }
            WizardMsg::FileChosen(Some(file)) | WizardMsg::FileDropped(Some(file)) => {
                self.select_file(file);
                Effect::None
            }
            WizardMsg::FileDropped(None) => {
                self.file_error = Some(validation::NOT_A_PDF.to_string());
                Effect::None
            }
            WizardMsg::FileRemoved => {
                self.file = None;
                self.file_error = None;
                Effect::None
            }
            WizardMsg::ManualFieldChanged { field, value } => {
                self.set_manual_field(field, value);
                Effect::None
            }
            WizardMsg::SubmitRequested => self.request_submit(),
            WizardMsg::SubmissionSucceeded => {
                self.submitting = false;
                Effect::Navigate(Route::Confirmation)
            }
            WizardMsg::SubmissionFailed(message) => {
                self.submitting = false;
                self.submit_error = Some(message);
                Effect::None
            }
            WizardMsg::ErrorDismissed => {
                self.submit_error = None;
                Effect::None
            }
        };
        (self, effect)
    }

    /// Feeds several messages, keeping only the last effect.
    pub fn run(self, msgs: impl IntoIterator<Item = WizardMsg>) -> (Self, Effect) {
        msgs.into_iter()
            .fold((self, Effect::None), |(state, _), msg| state.update(msg))
    }

    pub fn identity_complete(&self) -> bool {
        !self.name.trim().is_empty() && !self.email.trim().is_empty()
    }

    pub fn manual_field(&self, field: &str) -> Option<&str> {
        self.manual_fields
            .iter()
            .find(|(key, _)| key == field)
            .map(|(_, value)| value.as_str())
    }

    fn set_manual_field(&mut self, field: String, value: String) {
        match self.manual_fields.iter_mut().find(|(key, _)| *key == field) {
            Some(entry) => entry.1 = value,
            None => self.manual_fields.push((field, value)),
        }
    }

    fn select_file(&mut self, file: UploadedFile) {
        self.file_error = None;
        match validation::validate_pdf_file(file.content_type.as_deref(), file.size()) {
            Ok(()) => self.file = Some(file),
            Err(err) => {
                tracing::debug!("Rejected file selection {}: {}", file.file_name, err);
                self.file_error = Some(err.message);
            }
        }
    }

    fn request_submit(&mut self) -> Effect {
        if self.step != WizardStep::Details || self.submitting {
            return Effect::None;
        }
        self.submit_error = None;
        self.field_error = None;

        match self.validate() {
            Ok(request) => {
                self.submitting = true;
                Effect::Submit(request)
            }
            Err(err) => {
                if err.field == "file" {
                    self.file_error = Some(err.message);
                } else {
                    self.field_error = Some(err);
                }
                Effect::None
            }
        }
    }

    /// Submit-time validation for the active sub-mode.
    pub fn validate(&self) -> Result<SubmissionRequest, ValidationError> {
        let contact = Contact {
            name: validation::require("name", &self.name)?.to_string(),
            email: validation::require("email", &self.email)?.to_string(),
        };

        let payload = match self.mode {
            InputMode::Upload => {
                let file = self
                    .file
                    .as_ref()
                    .ok_or_else(|| ValidationError::new("file", validation::NOT_A_PDF))?;
                validation::validate_pdf_file(file.content_type.as_deref(), file.size())?;
                SubmissionPayload::Upload(file.clone())
            }
            InputMode::Manual => {
                for field in REQUIRED_MANUAL_FIELDS {
                    validation::require(field, self.manual_field(field).unwrap_or_default())?;
                }
                let rate_schedule =
                    validation::parse_rate_schedule(self.manual_field("rate_schedule").unwrap_or_default())?;
                let peak_kwh =
                    validation::parse_kwh("peak_kwh", self.manual_field("peak_kwh").unwrap_or_default())?;
                let offpeak_kwh = validation::parse_kwh(
                    "offpeak_kwh",
                    self.manual_field("offpeak_kwh").unwrap_or_default(),
                )?;
                SubmissionPayload::Manual(ManualEntry {
                    rate_schedule: rate_schedule.to_string(),
                    peak_kwh,
                    offpeak_kwh,
                    fields: self.manual_fields.clone(),
                })
            }
        };

        Ok(SubmissionRequest { contact, payload })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Bytes;
    use bigdecimal::BigDecimal;
    use std::str::FromStr;

    fn pdf(size: usize) -> UploadedFile {
        UploadedFile {
            file_name: "bill.pdf".to_string(),
            content_type: Some("application/pdf".to_string()),
            bytes: Bytes::from(vec![b'%'; size]),
        }
    }

    fn png() -> UploadedFile {
        UploadedFile {
            file_name: "bill.png".to_string(),
            content_type: Some("image/png".to_string()),
            bytes: Bytes::from_static(b"\x89PNG"),
        }
    }

    fn on_details() -> WizardState {
        let (state, _) = WizardState::new().run([
            WizardMsg::NameChanged("Jane".to_string()),
            WizardMsg::EmailChanged("jane@x.com".to_string()),
            WizardMsg::Next,
        ]);
        assert_eq!(state.step, WizardStep::Details);
        state
    }

    fn field(field: &str, value: &str) -> WizardMsg {
        WizardMsg::ManualFieldChanged {
            field: field.to_string(),
            value: value.to_string(),
        }
    }

    #[test]
    fn test_starts_on_identity_step() {
        let state = WizardState::new();
        assert_eq!(state.step, WizardStep::Identity);
        assert_eq!(state.mode, InputMode::Upload);
    }

    #[test]
    fn test_next_requires_name_and_email() {
        let (state, effect) = WizardState::new().run([
            WizardMsg::NameChanged("Jane".to_string()),
            WizardMsg::Next,
        ]);
        assert_eq!(state.step, WizardStep::Identity);
        assert_eq!(effect, Effect::None);

        let (state, _) = state.run([
            WizardMsg::EmailChanged("   ".to_string()),
            WizardMsg::Next,
        ]);
        assert_eq!(state.step, WizardStep::Identity);

        let (state, _) = state.run([
            WizardMsg::EmailChanged("jane@x.com".to_string()),
            WizardMsg::Next,
        ]);
        assert_eq!(state.step, WizardStep::Details);
    }

    #[test]
    fn test_back_is_unconditional_and_keeps_data() {
        let (state, _) = on_details().run([
            WizardMsg::FileChosen(Some(pdf(10))),
            WizardMsg::Back,
        ]);
        assert_eq!(state.step, WizardStep::Identity);
        assert!(state.file.is_some());
        assert_eq!(state.name, "Jane");
    }

    #[test]
    fn test_mode_switch_keeps_other_mode_data() {
        let (state, _) = on_details().run([
            WizardMsg::FileChosen(Some(pdf(10))),
            WizardMsg::ModeSelected(InputMode::Manual),
            field("peak_kwh", "12"),
            WizardMsg::ModeSelected(InputMode::Upload),
        ]);
        assert_eq!(state.step, WizardStep::Details);
        assert!(state.file.is_some());
        assert_eq!(state.manual_field("peak_kwh"), Some("12"));
    }

    #[test]
    fn test_non_pdf_selection_and_drop_set_same_error() {
        let (chosen, _) = on_details().update(WizardMsg::FileChosen(Some(png())));
        let (dropped, _) = on_details().update(WizardMsg::FileDropped(Some(png())));
        assert_eq!(chosen.file, None);
        assert_eq!(dropped.file, None);
        assert_eq!(chosen.file_error.as_deref(), Some(validation::NOT_A_PDF));
        assert_eq!(chosen.file_error, dropped.file_error);
    }

    #[test]
    fn test_empty_drop_sets_error() {
        let (state, _) = on_details().update(WizardMsg::FileDropped(None));
        assert_eq!(state.file_error.as_deref(), Some(validation::NOT_A_PDF));
    }

    #[test]
    fn test_oversized_pdf_is_rejected_on_selection() {
        let size = validation::MAX_UPLOAD_BYTES as usize + 1;
        let (state, _) = on_details().update(WizardMsg::FileDropped(Some(pdf(size))));
        assert_eq!(state.file, None);
        assert_eq!(state.file_error.as_deref(), Some(validation::FILE_TOO_LARGE));
    }

    #[test]
    fn test_oversized_pdf_blocks_submission() {
        let mut state = on_details();
        // Bypass selection checks to prove submit-time validation runs again.
        state.file = Some(pdf(validation::MAX_UPLOAD_BYTES as usize + 1));
        let (state, effect) = state.update(WizardMsg::SubmitRequested);
        assert_eq!(effect, Effect::None);
        assert!(!state.submitting);
        assert_eq!(state.file_error.as_deref(), Some(validation::FILE_TOO_LARGE));
    }

    #[test]
    fn test_upload_without_file_is_blocked() {
        let (state, effect) = on_details().update(WizardMsg::SubmitRequested);
        assert_eq!(effect, Effect::None);
        assert_eq!(state.file_error.as_deref(), Some(validation::NOT_A_PDF));
    }

    #[test]
    fn test_remove_file_clears_file_and_error() {
        let (state, _) = on_details().run([
            WizardMsg::FileChosen(Some(pdf(10))),
            WizardMsg::FileChosen(Some(png())),
            WizardMsg::FileRemoved,
        ]);
        assert_eq!(state.file, None);
        assert_eq!(state.file_error, None);
    }

    #[test]
    fn test_upload_submission_emits_request() {
        let (state, effect) = on_details().run([
            WizardMsg::FileChosen(Some(pdf(10))),
            WizardMsg::SubmitRequested,
        ]);
        assert!(state.submitting);
        match effect {
            Effect::Submit(request) => {
                assert_eq!(request.contact.name, "Jane");
                assert_eq!(request.payload.mode(), "upload");
            }
            other => panic!("expected submit effect, got {:?}", other),
        }
    }

    #[test]
    fn test_manual_submission_parses_values() {
        let (_, effect) = on_details().run([
            WizardMsg::ModeSelected(InputMode::Manual),
            field("rate_schedule", "E-TOU-C-W"),
            field("peak_kwh", "45.5"),
            field("offpeak_kwh", "120.25"),
            field("adu", "no"),
            WizardMsg::SubmitRequested,
        ]);
        let Effect::Submit(request) = effect else {
            panic!("expected submit effect");
        };
        let SubmissionPayload::Manual(entry) = request.payload else {
            panic!("expected manual payload");
        };
        assert_eq!(entry.rate_schedule, "E-TOU-C-W");
        assert_eq!(entry.peak_kwh, BigDecimal::from_str("45.5").unwrap());
        assert_eq!(entry.offpeak_kwh, BigDecimal::from_str("120.25").unwrap());
        assert_eq!(entry.fields.len(), 4);
    }

    #[test]
    fn test_manual_submission_requires_all_fields() {
        let (state, effect) = on_details().run([
            WizardMsg::ModeSelected(InputMode::Manual),
            field("rate_schedule", "E-1-ALL"),
            field("peak_kwh", "10"),
            WizardMsg::SubmitRequested,
        ]);
        assert_eq!(effect, Effect::None);
        let err = state.field_error.unwrap();
        assert_eq!(err.field, "offpeak_kwh");
    }

    #[test]
    fn test_submit_on_identity_step_is_ignored() {
        let (state, effect) = WizardState::new().update(WizardMsg::SubmitRequested);
        assert_eq!(effect, Effect::None);
        assert!(!state.submitting);
    }

    #[test]
    fn test_success_navigates_to_confirmation() {
        let (state, _) = on_details().run([
            WizardMsg::FileChosen(Some(pdf(10))),
            WizardMsg::SubmitRequested,
        ]);
        let (state, effect) = state.update(WizardMsg::SubmissionSucceeded);
        assert!(!state.submitting);
        assert_eq!(effect, Effect::Navigate(Route::Confirmation));
    }

    #[test]
    fn test_failure_shows_banner_and_stays_on_form() {
        let (state, _) = on_details().run([
            WizardMsg::FileChosen(Some(pdf(10))),
            WizardMsg::SubmitRequested,
            WizardMsg::SubmissionFailed("Database error".to_string()),
        ]);
        assert_eq!(state.step, WizardStep::Details);
        assert_eq!(state.submit_error.as_deref(), Some("Database error"));
        let (state, _) = state.update(WizardMsg::ErrorDismissed);
        assert_eq!(state.submit_error, None);
    }
}
