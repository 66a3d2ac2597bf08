use async_trait::async_trait;
use axum::body::Bytes;
use failsafe::futures::CircuitBreaker;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::fmt::Write as _;
use std::time::Duration;

use crate::circuit_breaker::{create_mail_circuit_breaker, MailCircuitBreaker};
use crate::config::SmtpConfig;
use crate::errors::AppError;
use crate::models::{SubmissionPayload, SubmissionRequest};
use crate::validation::PDF_MEDIA_TYPE;

pub const SUBMISSION_SUBJECT: &str = "New PG&E Bill Submission";

#[derive(Debug, Clone, PartialEq)]
pub struct MailAttachment {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

/// An outbound message to the administrator.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub subject: String,
    pub body: String,
    pub attachment: Option<MailAttachment>,
}

impl Notification {
    /// Admin notice for a new submission: identity plus the bill or the typed-in fields.
    pub fn for_submission(request: &SubmissionRequest) -> Self {
        let mut body = String::new();
        let _ = writeln!(body, "{}:", SUBMISSION_SUBJECT);
        let _ = writeln!(body, "Name: {}", request.contact.name);
        let _ = writeln!(body, "Email: {}", request.contact.email);

        let attachment = match &request.payload {
            SubmissionPayload::Upload(file) => {
                let _ = writeln!(body, "File attached: {}", file.file_name);
                Some(MailAttachment {
                    file_name: file.file_name.clone(),
                    content_type: file
                        .content_type
                        .clone()
                        .unwrap_or_else(|| PDF_MEDIA_TYPE.to_string()),
                    bytes: file.bytes.clone(),
                })
            }
            SubmissionPayload::Manual(entry) => {
                for (key, value) in &entry.fields {
                    let _ = writeln!(body, "{}: {}", key, value);
                }
                None
            }
        };

        Self {
            subject: SUBMISSION_SUBJECT.to_string(),
            body,
            attachment,
        }
    }
}

/// Outbound mail transport.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<(), AppError>;
}

/// SMTP relay client that mails every notification to the admin address.
pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
    breaker: MailCircuitBreaker,
}

impl SmtpNotifier {
    pub fn new(config: &SmtpConfig) -> Result<Self, AppError> {
        let builder = if config.secure {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
        }
        .map_err(|e| AppError::InternalError(format!("Invalid SMTP relay {}: {}", config.host, e)))?;

        let transport = builder
            .port(config.port)
            .credentials(Credentials::new(
                config.user.clone(),
                config.password.clone(),
            ))
            .timeout(Some(Duration::from_secs(30)))
            .build();

        let from = config
            .sender()
            .parse::<Mailbox>()
            .map_err(|e| AppError::InternalError(format!("Invalid sender address: {}", e)))?;
        let to = config
            .admin_email
            .parse::<Mailbox>()
            .map_err(|e| AppError::InternalError(format!("Invalid ADMIN_EMAIL: {}", e)))?;

        Ok(Self {
            transport,
            from,
            to,
            breaker: create_mail_circuit_breaker(),
        })
    }

    fn build_message(&self, notification: &Notification) -> Result<Message, AppError> {
        let builder = Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(notification.subject.clone());

        let message = match &notification.attachment {
            Some(attachment) => {
                let content_type = ContentType::parse(&attachment.content_type)
                    .or_else(|_| ContentType::parse(PDF_MEDIA_TYPE))
                    .map_err(|e| AppError::InternalError(format!("Bad content type: {}", e)))?;
                builder.multipart(
                    MultiPart::mixed()
                        .singlepart(SinglePart::plain(notification.body.clone()))
                        .singlepart(
                            Attachment::new(attachment.file_name.clone())
                                .body(attachment.bytes.to_vec(), content_type),
                        ),
                )
            }
            None => builder
                .header(ContentType::TEXT_PLAIN)
                .body(notification.body.clone()),
        };

        message.map_err(|e| AppError::InternalError(format!("Failed to build email: {}", e)))
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), AppError> {
        let message = self.build_message(notification)?;

        match self.breaker.call(self.transport.send(message)).await {
            Ok(_) => {
                tracing::info!("✓ Notification sent to {}", self.to);
                Ok(())
            }
            Err(failsafe::Error::Rejected) => Err(AppError::ExternalApiError(
                "Mail relay circuit open, dispatch skipped".to_string(),
            )),
            Err(failsafe::Error::Inner(e)) => Err(AppError::ExternalApiError(format!(
                "Error sending email: {}",
                e
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Contact, ManualEntry, UploadedFile};
    use bigdecimal::BigDecimal;

    fn contact() -> Contact {
        Contact {
            name: "Jane".to_string(),
            email: "jane@x.com".to_string(),
        }
    }

    #[test]
    fn test_upload_notification_attaches_bill() {
        let request = SubmissionRequest {
            contact: contact(),
            payload: SubmissionPayload::Upload(UploadedFile {
                file_name: "march.pdf".to_string(),
                content_type: Some("application/pdf".to_string()),
                bytes: Bytes::from_static(b"%PDF-1.4"),
            }),
        };
        let notification = Notification::for_submission(&request);
        assert_eq!(notification.subject, "New PG&E Bill Submission");
        assert!(notification.body.contains("Name: Jane"));
        assert!(notification.body.contains("Email: jane@x.com"));
        assert!(notification.body.contains("File attached: march.pdf"));
        let attachment = notification.attachment.unwrap();
        assert_eq!(attachment.file_name, "march.pdf");
        assert_eq!(attachment.bytes, Bytes::from_static(b"%PDF-1.4"));
    }

    #[test]
    fn test_manual_notification_lists_fields() {
        let request = SubmissionRequest {
            contact: contact(),
            payload: SubmissionPayload::Manual(ManualEntry {
                rate_schedule: "E-TOU-C-W".to_string(),
                peak_kwh: BigDecimal::from(45),
                offpeak_kwh: BigDecimal::from(120),
                fields: vec![
                    ("rate_schedule".to_string(), "E-TOU-C-W".to_string()),
                    ("peak_kwh".to_string(), "45".to_string()),
                    ("total_amount".to_string(), "$210.14".to_string()),
                ],
            }),
        };
        let notification = Notification::for_submission(&request);
        assert!(notification.attachment.is_none());
        assert!(notification.body.contains("rate_schedule: E-TOU-C-W"));
        assert!(notification.body.contains("total_amount: $210.14"));
        assert!(!notification.body.contains("File attached"));
    }

    #[tokio::test]
    async fn test_smtp_notifier_rejects_bad_admin_address() {
        let config = SmtpConfig {
            host: "smtp.example.com".to_string(),
            port: 587,
            user: "mailer@example.com".to_string(),
            password: "secret".to_string(),
            admin_email: "not an address".to_string(),
            from: None,
            secure: false,
        };
        assert!(SmtpNotifier::new(&config).is_err());
    }
}
