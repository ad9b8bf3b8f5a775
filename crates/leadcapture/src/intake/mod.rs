//! Submission intake.
//!
//! Each request moves through `Received -> Validated -> (Stored, Notified)`,
//! or `Received -> Rejected`. A rejected request is never stored or
//! notified. Once validated, storing and notifying run side by side and
//! neither can fail the request: their results come back as [`Outcome`]s in
//! the [`IntakeReport`].

pub mod schema;

use serde_json::{Map, Value};
use tracing::{debug, error, info, warn};

use crate::catalog;
use crate::config::ConsultationSchema;
use crate::notify::{Notification, Notifier};
use crate::outcome::Outcome;
use crate::record::{Consultation, Download, IdGenerator, Submission, SubmissionRecord};
use crate::storage::RecordStore;

pub use schema::{Fields, SubmissionSchema, ValidationError};

/// What happened to an accepted submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntakeReport {
    /// The record that was created.
    pub record: SubmissionRecord,
    /// Result of appending the record to the store.
    pub stored: Outcome,
    /// Result of sending the notification email.
    pub notified: Outcome,
}

/// Validates submissions and dispatches them to the store and notifier.
#[derive(Debug)]
pub struct IntakeHandler {
    store: RecordStore,
    notifier: Notifier,
    ids: IdGenerator,
    consultation_schema: &'static SubmissionSchema,
}

impl IntakeHandler {
    /// Create a handler.
    #[must_use]
    pub fn new(store: RecordStore, notifier: Notifier, consultation: ConsultationSchema) -> Self {
        Self {
            store,
            notifier,
            ids: IdGenerator::new(),
            consultation_schema: SubmissionSchema::consultation(consultation),
        }
    }

    /// The record store submissions are appended to.
    #[must_use]
    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// The notifier used for accepted submissions.
    #[must_use]
    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    /// Accept a consultation request.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] if a required field is missing.
    pub async fn submit_consultation(
        &self,
        body: &Map<String, Value>,
    ) -> Result<IntakeReport, ValidationError> {
        let fields = Self::validate(self.consultation_schema, body)?;

        let consultation = Consultation {
            name: fields.required("name"),
            email: fields.required("email"),
            company: fields.optional("company"),
            phone: fields.optional("phone"),
            country: fields.required("country"),
            employees: fields.required("employees"),
            notes: fields.optional("notes"),
        };
        let record = SubmissionRecord::new(
            self.ids.next_id(),
            Submission::Consultation(consultation.clone()),
        );

        let notification = Notification::Consultation {
            consultation: &consultation,
            submitted_at: record.submitted_at,
        };
        Ok(self.dispatch(record, notification).await)
    }

    /// Accept a download request. The link in the email points at
    /// `base_url`.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] if a required field is missing or the
    /// resource is not in the catalog.
    pub async fn submit_download(
        &self,
        body: &Map<String, Value>,
        base_url: &str,
    ) -> Result<IntakeReport, ValidationError> {
        let fields = Self::validate(&schema::DOWNLOAD, body)?;

        let key = fields.required("resource");
        let Some(resource) = catalog::lookup(&key) else {
            warn!(resource = %key, "Validation failed - invalid resource");
            return Err(ValidationError::UnknownResource(key));
        };

        let download = Download {
            name: fields.required("name"),
            email: fields.required("email"),
            resource: key,
        };
        let record =
            SubmissionRecord::new(self.ids.next_id(), Submission::Download(download.clone()));

        let notification = Notification::Download {
            download: &download,
            resource,
            base_url,
        };
        Ok(self.dispatch(record, notification).await)
    }

    fn validate(
        schema: &SubmissionSchema,
        body: &Map<String, Value>,
    ) -> Result<Fields, ValidationError> {
        info!(kind = %schema.kind, "Received submission");
        schema.validate(body).map_err(|e| {
            if let ValidationError::MissingFields { fields, .. } = &e {
                warn!(kind = %schema.kind, missing = ?fields, "Validation failed - missing fields");
            }
            e
        })
    }

    async fn dispatch(
        &self,
        record: SubmissionRecord,
        notification: Notification<'_>,
    ) -> IntakeReport {
        let (stored, notified) = tokio::join!(
            self.persist(&record),
            self.notifier.notify(notification)
        );

        info!(
            id = %record.id,
            kind = %record.kind(),
            stored = %stored,
            notified = %notified,
            "Submission processed"
        );
        IntakeReport {
            record,
            stored,
            notified,
        }
    }

    async fn persist(&self, record: &SubmissionRecord) -> Outcome {
        debug!(id = %record.id, path = %self.store.path().display(), "Saving submission");
        match self.store.append(record).await {
            Ok(total) => {
                debug!(id = %record.id, total, "Data saved successfully");
                Outcome::Completed
            }
            Err(e) => {
                error!(id = %record.id, error = %e, "Error saving to file");
                Outcome::failed(e.to_string())
            }
        }
    }
}
