//! Required-field schemas for each submission variant.
//!
//! A request body is accepted only when every required field is present and
//! truthy: `null`, `false`, `0` and `""` all count as missing.

use std::collections::HashMap;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::config::ConsultationSchema;
use crate::record::SubmissionKind;

/// Why an intake request was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// One or more required fields were absent or empty.
    #[error("{message}")]
    MissingFields {
        /// Message shown to the caller.
        message: &'static str,
        /// Names of the offending fields, in schema order.
        fields: Vec<&'static str>,
    },

    /// The requested download is not in the catalog.
    #[error("Invalid resource specified")]
    UnknownResource(String),
}

/// The fields one submission variant must and may carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionSchema {
    /// Variant this schema validates.
    pub kind: SubmissionKind,
    /// Fields that must be present and non-empty, in report order.
    pub required: &'static [&'static str],
    /// Fields copied into the record when present.
    pub optional: &'static [&'static str],
    /// Message returned when any required field is missing.
    pub missing_message: &'static str,
}

/// Consultation form that asks for a company.
pub const CONSULTATION_WITH_COMPANY: SubmissionSchema = SubmissionSchema {
    kind: SubmissionKind::Consultation,
    required: &["name", "email", "company", "country", "employees"],
    optional: &["notes", "phone"],
    missing_message: "All fields are required",
};

/// Consultation form that asks for a phone number.
pub const CONSULTATION_WITH_PHONE: SubmissionSchema = SubmissionSchema {
    kind: SubmissionKind::Consultation,
    required: &["name", "email", "phone", "country", "employees"],
    optional: &["company", "notes"],
    missing_message: "All fields are required",
};

/// Whitepaper download form.
pub const DOWNLOAD: SubmissionSchema = SubmissionSchema {
    kind: SubmissionKind::Download,
    required: &["name", "email", "resource"],
    optional: &[],
    missing_message: "Name, email, and resource are required",
};

impl SubmissionSchema {
    /// The consultation schema selected in configuration.
    #[must_use]
    pub fn consultation(variant: ConsultationSchema) -> &'static Self {
        match variant {
            ConsultationSchema::Company => &CONSULTATION_WITH_COMPANY,
            ConsultationSchema::Phone => &CONSULTATION_WITH_PHONE,
        }
    }

    /// Required fields that are absent or falsy in `body`.
    #[must_use]
    pub fn missing_fields(&self, body: &Map<String, Value>) -> Vec<&'static str> {
        self.required
            .iter()
            .copied()
            .filter(|field| !body.get(*field).is_some_and(is_truthy))
            .collect()
    }

    /// Check `body` and extract the schema's fields as text.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::MissingFields`] if any required field is
    /// absent or falsy.
    pub fn validate(&self, body: &Map<String, Value>) -> Result<Fields, ValidationError> {
        let missing = self.missing_fields(body);
        if !missing.is_empty() {
            return Err(ValidationError::MissingFields {
                message: self.missing_message,
                fields: missing,
            });
        }

        let values = self
            .required
            .iter()
            .chain(self.optional)
            .filter_map(|field| {
                body.get(*field)
                    .filter(|v| is_truthy(v))
                    .map(|v| (*field, field_text(v)))
            })
            .collect();
        Ok(Fields { values })
    }
}

/// Validated field values, keyed by field name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fields {
    values: HashMap<&'static str, String>,
}

impl Fields {
    /// Value of a field that passed validation, or empty if the schema does
    /// not list it as required.
    #[must_use]
    pub fn required(&self, name: &str) -> String {
        self.values.get(name).cloned().unwrap_or_default()
    }

    /// Value of an optional field, if it was supplied.
    #[must_use]
    pub fn optional(&self, name: &str) -> Option<String> {
        self.values.get(name).cloned()
    }
}

/// JavaScript-style truthiness for form values.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn field_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
