//! Result of a best-effort step.
//!
//! Storing a record and sending a notification must never fail an intake
//! request. Their results are reported as an [`Outcome`] instead of an error,
//! so the caller can log them without deciding anything from them.

use crate::error::Result;

/// What happened to a best-effort step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The step ran and succeeded.
    Completed,
    /// The step was not attempted.
    Skipped(String),
    /// The step ran and failed.
    Failed(String),
}

impl Outcome {
    /// Create a skipped outcome.
    #[must_use]
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self::Skipped(reason.into())
    }

    /// Create a failed outcome.
    #[must_use]
    pub fn failed(diagnostic: impl Into<String>) -> Self {
        Self::Failed(diagnostic.into())
    }

    /// Collapse a fallible step into an outcome.
    #[must_use]
    pub fn from_result<T>(result: Result<T>) -> Self {
        match result {
            Ok(_) => Self::Completed,
            Err(e) => Self::Failed(e.to_string()),
        }
    }

    /// Whether the step ran and succeeded.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// The skip reason or failure diagnostic, if any.
    #[must_use]
    pub fn diagnostic(&self) -> Option<&str> {
        match self {
            Self::Completed => None,
            Self::Skipped(s) | Self::Failed(s) => Some(s),
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Completed => write!(f, "completed"),
            Self::Skipped(reason) => write!(f, "skipped: {reason}"),
            Self::Failed(diagnostic) => write!(f, "failed: {diagnostic}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_completed() {
        let outcome = Outcome::Completed;
        assert!(outcome.succeeded());
        assert!(outcome.diagnostic().is_none());
        assert_eq!(outcome.to_string(), "completed");
    }

    #[test]
    fn test_skipped() {
        let outcome = Outcome::skipped("SMTP credentials not configured");
        assert!(!outcome.succeeded());
        assert_eq!(outcome.diagnostic(), Some("SMTP credentials not configured"));
        assert!(outcome.to_string().starts_with("skipped"));
    }

    #[test]
    fn test_from_result() {
        assert_eq!(Outcome::from_result(Ok::<_, Error>(3)), Outcome::Completed);

        let outcome = Outcome::from_result::<()>(Err(Error::internal("disk full")));
        assert!(!outcome.succeeded());
        assert_eq!(outcome.diagnostic(), Some("internal error: disk full"));
    }
}
