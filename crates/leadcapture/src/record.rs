//! Core submission types for leadcapture.
//!
//! This module defines the records persisted for every accepted form
//! submission, and the generator that assigns their ids.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The kind of form that produced a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionKind {
    /// A consultation or contact request.
    Consultation,
    /// A whitepaper download request.
    Download,
}

impl std::fmt::Display for SubmissionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Consultation => write!(f, "consultation"),
            Self::Download => write!(f, "download"),
        }
    }
}

impl std::str::FromStr for SubmissionKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "consultation" => Ok(Self::Consultation),
            "download" => Ok(Self::Download),
            other => Err(format!("unknown submission kind: {other}")),
        }
    }
}

/// Fields of a consultation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Consultation {
    /// Requester's name.
    pub name: String,
    /// Requester's email address.
    pub email: String,
    /// Requester's company.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    /// Requester's phone number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Country the team will be hired in.
    pub country: String,
    /// Number of employees to hire.
    pub employees: String,
    /// Free-text notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Fields of a download request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Download {
    /// Requester's name.
    pub name: String,
    /// Requester's email address.
    pub email: String,
    /// Resource Catalog key of the requested document.
    pub resource: String,
}

/// The variant-specific part of a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Submission {
    /// A consultation request.
    Consultation(Consultation),
    /// A download request.
    Download(Download),
}

impl Submission {
    /// The kind of this submission.
    #[must_use]
    pub fn kind(&self) -> SubmissionKind {
        match self {
            Self::Consultation(_) => SubmissionKind::Consultation,
            Self::Download(_) => SubmissionKind::Download,
        }
    }

    /// The requester's name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Consultation(c) => &c.name,
            Self::Download(d) => &d.name,
        }
    }

    /// The requester's email address.
    #[must_use]
    pub fn email(&self) -> &str {
        match self {
            Self::Consultation(c) => &c.email,
            Self::Download(d) => &d.email,
        }
    }
}

/// One persisted form submission.
///
/// Serialized flat, e.g.
/// `{"id": "...", "submittedAt": "...", "kind": "consultation", "name": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionRecord {
    /// Time-based unique identifier.
    pub id: String,

    /// When the submission was accepted.
    #[serde(rename = "submittedAt")]
    pub submitted_at: DateTime<Utc>,

    /// The submitted fields.
    #[serde(flatten)]
    pub submission: Submission,
}

impl SubmissionRecord {
    /// Create a record stamped with the current time.
    #[must_use]
    pub fn new(id: String, submission: Submission) -> Self {
        Self {
            id,
            submitted_at: Utc::now(),
            submission,
        }
    }

    /// The kind of this record.
    #[must_use]
    pub fn kind(&self) -> SubmissionKind {
        self.submission.kind()
    }
}

/// Issues millisecond-timestamp ids that never repeat within a process.
///
/// When two submissions arrive within the same millisecond the later one
/// gets the previous id plus one.
#[derive(Debug, Default)]
pub struct IdGenerator {
    last: AtomicU64,
}

impl IdGenerator {
    /// Create a generator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue the next id.
    pub fn next_id(&self) -> String {
        let now = u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0);
        let mut prev = self.last.load(Ordering::Relaxed);
        loop {
            let candidate = now.max(prev + 1);
            match self
                .last
                .compare_exchange_weak(prev, candidate, Ordering::SeqCst, Ordering::Relaxed)
            {
                Ok(_) => return candidate.to_string(),
                Err(actual) => prev = actual,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn consultation() -> Submission {
        Submission::Consultation(Consultation {
            name: "A".to_string(),
            email: "a@b.com".to_string(),
            company: Some("C".to_string()),
            phone: None,
            country: "US".to_string(),
            employees: "5".to_string(),
            notes: None,
        })
    }

    #[test]
    fn test_submission_kind_display() {
        assert_eq!(SubmissionKind::Consultation.to_string(), "consultation");
        assert_eq!(SubmissionKind::Download.to_string(), "download");
    }

    #[test]
    fn test_submission_kind_from_str() {
        assert_eq!(
            "download".parse::<SubmissionKind>(),
            Ok(SubmissionKind::Download)
        );
        assert!("webinar".parse::<SubmissionKind>().is_err());
    }

    #[test]
    fn test_record_serializes_flat() {
        let record = SubmissionRecord::new("1700000000000".to_string(), consultation());
        let value = serde_json::to_value(&record).unwrap();

        assert_eq!(value["id"], "1700000000000");
        assert_eq!(value["kind"], "consultation");
        assert_eq!(value["name"], "A");
        assert_eq!(value["company"], "C");
        assert!(value["submittedAt"].is_string());
        assert!(value.get("phone").is_none());
        assert!(value.get("notes").is_none());
    }

    #[test]
    fn test_submitted_at_is_iso8601() {
        let record = SubmissionRecord::new("1".to_string(), consultation());
        let value = serde_json::to_value(&record).unwrap();
        let stamp = value["submittedAt"].as_str().unwrap();

        assert!(DateTime::parse_from_rfc3339(stamp).is_ok());
    }

    #[test]
    fn test_download_record_from_json() {
        let json = r#"{
            "id": "1700000000001",
            "submittedAt": "2026-01-05T10:00:00Z",
            "kind": "download",
            "name": "B",
            "email": "b@c.com",
            "resource": "eor-vs-peo-guide"
        }"#;
        let record: SubmissionRecord = serde_json::from_str(json).unwrap();

        assert_eq!(record.kind(), SubmissionKind::Download);
        assert_eq!(record.submission.email(), "b@c.com");
        match record.submission {
            Submission::Download(d) => assert_eq!(d.resource, "eor-vs-peo-guide"),
            Submission::Consultation(_) => panic!("expected download"),
        }
    }

    #[test]
    fn test_submission_accessors() {
        let submission = consultation();
        assert_eq!(submission.kind(), SubmissionKind::Consultation);
        assert_eq!(submission.name(), "A");
        assert_eq!(submission.email(), "a@b.com");
    }

    #[test]
    fn test_id_generator_is_strictly_increasing() {
        let ids = IdGenerator::new();
        let mut prev: u64 = 0;
        for _ in 0..1000 {
            let id: u64 = ids.next_id().parse().unwrap();
            assert!(id > prev);
            prev = id;
        }
    }

    #[test]
    fn test_id_generator_unique_across_threads() {
        let ids = std::sync::Arc::new(IdGenerator::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let ids = ids.clone();
                std::thread::spawn(move || (0..250).map(|_| ids.next_id()).collect::<Vec<_>>())
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id), "duplicate id issued");
            }
        }
        assert_eq!(seen.len(), 1000);
    }

    #[test]
    fn test_id_tracks_wall_clock() {
        let before = u64::try_from(Utc::now().timestamp_millis()).unwrap();
        let id: u64 = IdGenerator::new().next_id().parse().unwrap();
        assert!(id >= before);
    }
}
