//! Outbound email collaborator.
//!
//! The core talks to `Mailer`; `EmailService` is the SMTP implementation
//! backed by `lettre`. Sends are never retried here: a failure is reported
//! to the caller, which decides whether the item counts as an error.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::NaiveDate;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor, message::header::ContentType,
    transport::smtp::authentication::Credentials,
};
use thiserror::Error;

use crate::config::EmailConfig;
use crate::types::Money;

/// Email service errors.
#[derive(Debug, Error)]
pub enum EmailError {
    /// Failed to build email message.
    #[error("Failed to build email: {0}")]
    BuildError(String),
    /// Failed to send email.
    #[error("Failed to send email: {0}")]
    SendError(String),
    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),
}

/// Kinds of message the billing core dispatches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailTemplate {
    /// A newly sent invoice.
    InvoiceSent,
    /// A newly sent offer.
    OfferSent,
    /// An invoice generated from a recurring template.
    RecurringInvoice,
    /// Scheduled reminder, `days` after the invoice was sent.
    AutoReminder {
        /// Offset that fired.
        days: u32,
    },
    /// Reminder triggered by the owner.
    ManualReminder,
}

impl EmailTemplate {
    /// Stable name used in logs and audit entries.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::InvoiceSent => "invoice_sent",
            Self::OfferSent => "offer_sent",
            Self::RecurringInvoice => "recurring_invoice",
            Self::AutoReminder { .. } => "auto_reminder",
            Self::ManualReminder => "manual_reminder",
        }
    }

    const fn share_path(&self) -> &'static str {
        match self {
            Self::OfferSent => "o",
            _ => "i",
        }
    }
}

/// Values interpolated into a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailParams {
    /// Owner's business display name.
    pub business_name: String,
    /// Client display name from the document snapshot.
    pub client_name: String,
    /// Human document number, e.g. `INV-0007`.
    pub document_number: String,
    /// Amount due.
    pub amount: Money,
    /// Optional due date.
    pub due_date: Option<NaiveDate>,
    /// Share-link token.
    pub public_id: String,
}

/// Outbound email port consumed by the billing core.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Sends one templated message.
    async fn send(
        &self,
        to: &str,
        template: EmailTemplate,
        params: &EmailParams,
    ) -> Result<(), EmailError>;
}

/// Renders subject and plain-text body for a template.
#[must_use]
pub fn render(template: EmailTemplate, params: &EmailParams, frontend_url: &str) -> (String, String) {
    let link = format!(
        "{}/{}/{}",
        frontend_url.trim_end_matches('/'),
        template.share_path(),
        params.public_id
    );
    let due = params
        .due_date
        .map(|d| format!("\nDue date: {}", d.format("%Y-%m-%d")))
        .unwrap_or_default();

    let (subject, lead) = match template {
        EmailTemplate::InvoiceSent | EmailTemplate::RecurringInvoice => (
            format!("Invoice {} from {}", params.document_number, params.business_name),
            format!("{} has sent you an invoice.", params.business_name),
        ),
        EmailTemplate::OfferSent => (
            format!("Offer {} from {}", params.document_number, params.business_name),
            format!(
                "{} has sent you an offer. You can accept or decline it online.",
                params.business_name
            ),
        ),
        EmailTemplate::AutoReminder { days } => (
            format!("Reminder: invoice {} is awaiting payment", params.document_number),
            format!(
                "This is a friendly reminder that the invoice sent {days} day(s) ago is still open."
            ),
        ),
        EmailTemplate::ManualReminder => (
            format!("Reminder: invoice {} is awaiting payment", params.document_number),
            format!("{} would like to remind you about an open invoice.", params.business_name),
        ),
    };

    let body = format!(
        "Hi {},\n\n{lead}\n\nNumber: {}\nAmount: {}{due}\n\nView it here: {link}\n\n{}",
        params.client_name, params.document_number, params.amount, params.business_name
    );

    (subject, body)
}

/// SMTP email service.
#[derive(Clone)]
pub struct EmailService {
    config: EmailConfig,
}

impl EmailService {
    /// Creates a new email service.
    #[must_use]
    pub const fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    /// Creates an SMTP transport.
    fn create_transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>, EmailError> {
        let creds = Credentials::new(
            self.config.smtp_username.clone(),
            self.config.smtp_password.clone(),
        );

        Ok(
            AsyncSmtpTransport::<Tokio1Executor>::relay(&self.config.smtp_host)
                .map_err(|e| EmailError::SendError(e.to_string()))?
                .port(self.config.smtp_port)
                .credentials(creds)
                .build(),
        )
    }

    /// Sends a plain-text email.
    ///
    /// # Errors
    ///
    /// Returns an error if the email cannot be built or sent.
    pub async fn send_email(
        &self,
        to_email: &str,
        subject: &str,
        body: &str,
    ) -> Result<(), EmailError> {
        let from = format!("{} <{}>", self.config.from_name, self.config.from_email);

        let email = Message::builder()
            .from(
                from.parse()
                    .map_err(|e| EmailError::InvalidAddress(format!("{e}")))?,
            )
            .to(to_email
                .parse()
                .map_err(|e| EmailError::InvalidAddress(format!("{e}")))?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| EmailError::BuildError(e.to_string()))?;

        let transport = self.create_transport()?;
        transport
            .send(email)
            .await
            .map_err(|e| EmailError::SendError(e.to_string()))?;

        Ok(())
    }
}

#[async_trait]
impl Mailer for EmailService {
    async fn send(
        &self,
        to: &str,
        template: EmailTemplate,
        params: &EmailParams,
    ) -> Result<(), EmailError> {
        let (subject, body) = render(template, params, &self.config.frontend_url);
        self.send_email(to, &subject, &body).await
    }
}

/// A message captured by `MockMailer`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentEmail {
    /// Recipient.
    pub to: String,
    /// Template used.
    pub template: EmailTemplate,
    /// Interpolated values.
    pub params: EmailParams,
}

/// In-process mailer that records messages instead of sending them.
#[derive(Debug, Default)]
pub struct MockMailer {
    failing: AtomicBool,
    sent: Mutex<Vec<SentEmail>>,
}

impl MockMailer {
    /// Creates a mailer that accepts every message.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every following send fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Messages accepted so far.
    #[must_use]
    pub fn sent(&self) -> Vec<SentEmail> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }

    /// Number of messages accepted so far.
    #[must_use]
    pub fn send_count(&self) -> usize {
        self.sent.lock().map(|sent| sent.len()).unwrap_or_default()
    }
}

#[async_trait]
impl Mailer for MockMailer {
    async fn send(
        &self,
        to: &str,
        template: EmailTemplate,
        params: &EmailParams,
    ) -> Result<(), EmailError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(EmailError::SendError("mock mailer is failing".to_string()));
        }
        tracing::info!(to = %to, template = template.name(), "[MOCK] Email would be sent");
        self.sent
            .lock()
            .map_err(|_| EmailError::SendError("mock mailer lock poisoned".to_string()))?
            .push(SentEmail {
                to: to.to_string(),
                template,
                params: params.clone(),
            });
        Ok(())
    }
}
