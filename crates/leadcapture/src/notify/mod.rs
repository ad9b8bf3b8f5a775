//! Email notifications.
//!
//! The [`Notifier`] turns an accepted submission into an email and hands it
//! to a [`MailTransport`]. Every failure is logged and reported as an
//! [`Outcome`]; nothing here ever returns an error to the intake path.

pub mod templates;
pub mod transport;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use crate::catalog::Resource;
use crate::config::MailConfig;
use crate::error::Result;
use crate::outcome::Outcome;
use crate::record::{Consultation, Download};

pub use transport::{MailTransport, OutgoingMail, SmtpMailer};

/// An event worth emailing about.
#[derive(Debug, Clone, Copy)]
pub enum Notification<'a> {
    /// Tell staff about a new consultation request.
    Consultation {
        /// The submitted fields.
        consultation: &'a Consultation,
        /// When the request was accepted.
        submitted_at: DateTime<Utc>,
    },
    /// Send the requester a link to the document they asked for.
    Download {
        /// The submitted fields.
        download: &'a Download,
        /// The requested catalog entry.
        resource: &'static Resource,
        /// Scheme and host the link should point at.
        base_url: &'a str,
    },
}

/// Sends notification emails through an injected transport.
#[derive(Debug, Clone)]
pub struct Notifier {
    transport: Option<Arc<dyn MailTransport>>,
    sender: Option<String>,
    staff_recipient: Option<String>,
    signature: String,
}

impl Notifier {
    /// Build a notifier from configuration.
    ///
    /// Without credentials the notifier is disabled and every call is a
    /// no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the SMTP transport cannot be constructed.
    pub fn from_config(config: &MailConfig) -> Result<Self> {
        if !config.is_configured() {
            return Ok(Self::disabled(config));
        }
        let mailer = SmtpMailer::new(config)?;
        Ok(Self::with_transport(Arc::new(mailer), config))
    }

    /// A notifier that never sends anything.
    #[must_use]
    pub fn disabled(config: &MailConfig) -> Self {
        Self {
            transport: None,
            sender: None,
            staff_recipient: None,
            signature: config.signature.clone(),
        }
    }

    /// A notifier over an arbitrary transport. Sender and staff recipient
    /// come from `config`.
    #[must_use]
    pub fn with_transport(transport: Arc<dyn MailTransport>, config: &MailConfig) -> Self {
        Self {
            transport: Some(transport),
            sender: config.username.clone().filter(|s| !s.is_empty()),
            staff_recipient: config.notification_recipient().map(str::to_string),
            signature: config.signature.clone(),
        }
    }

    /// Whether a transport is configured.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.transport.is_some()
    }

    /// Render and send the email for `notification`.
    pub async fn notify(&self, notification: Notification<'_>) -> Outcome {
        let Some(transport) = &self.transport else {
            warn!("SMTP credentials not configured, skipping email");
            return Outcome::skipped("SMTP credentials not configured");
        };
        let Some(sender) = &self.sender else {
            warn!("No sender address configured, skipping email");
            return Outcome::skipped("no sender address configured");
        };

        let mail = match self.render(sender, notification) {
            Ok(mail) => mail,
            Err(outcome) => return outcome,
        };

        debug!(
            from = %mail.from,
            to = %mail.to,
            subject = %mail.subject,
            "Attempting to send email"
        );
        match transport.send(mail).await {
            Ok(response) => {
                info!(response = %response, "Email sent successfully");
                Outcome::Completed
            }
            Err(e) => {
                error!(error = %e, "Error sending email");
                Outcome::failed(e.to_string())
            }
        }
    }

    /// Test the transport's connection. Used once at startup.
    pub async fn verify(&self) -> Outcome {
        let Some(transport) = &self.transport else {
            return Outcome::skipped("SMTP credentials not configured");
        };
        match transport.verify().await {
            Ok(true) => Outcome::Completed,
            Ok(false) => Outcome::failed("server did not accept the connection"),
            Err(e) => Outcome::failed(e.to_string()),
        }
    }

    fn render(
        &self,
        sender: &str,
        notification: Notification<'_>,
    ) -> std::result::Result<OutgoingMail, Outcome> {
        match notification {
            Notification::Consultation {
                consultation,
                submitted_at,
            } => {
                let Some(to) = &self.staff_recipient else {
                    return Err(Outcome::skipped("no notification recipient configured"));
                };
                Ok(OutgoingMail {
                    from: sender.to_string(),
                    to: to.clone(),
                    subject: templates::CONSULTATION_SUBJECT.to_string(),
                    html: templates::consultation_body(consultation, submitted_at),
                })
            }
            Notification::Download {
                download,
                resource,
                base_url,
            } => {
                let url = resource.url(base_url);
                Ok(OutgoingMail {
                    from: sender.to_string(),
                    to: download.email.clone(),
                    subject: templates::download_subject(resource),
                    html: templates::download_body(download, resource, &url, &self.signature),
                })
            }
        }
    }
}
