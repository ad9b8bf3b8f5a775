//! Storage layer for leadcapture.
//!
//! Submissions are kept in a single pretty-printed JSON array. Every append
//! reads the whole file, pushes the new record and writes the file back.
//! There is no locking: two concurrent appends may race and the last writer
//! wins.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::record::{SubmissionKind, SubmissionRecord};

/// Append-only flat-file record store.
#[derive(Debug, Clone)]
pub struct RecordStore {
    /// Path to the JSON record file.
    path: PathBuf,
}

impl RecordStore {
    /// Create a store backed by the given file. Nothing is touched on disk
    /// until the first append.
    #[must_use]
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Get the path to the record file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a record and return the new number of stored entries.
    ///
    /// A missing or unreadable file is treated as an empty store. Entries
    /// already in the file are kept as they are, even if they no longer match
    /// the record shape.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be serialized or the file
    /// cannot be written.
    pub async fn append(&self, record: &SubmissionRecord) -> Result<usize> {
        let mut entries = self.read_entries().await;
        entries.push(serde_json::to_value(record)?);

        let body = serde_json::to_string_pretty(&entries)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|source| Error::DirectoryCreate {
                        path: parent.to_path_buf(),
                        source,
                    })?;
            }
        }

        tokio::fs::write(&self.path, body)
            .await
            .map_err(|source| Error::RecordWrite {
                path: self.path.clone(),
                source,
            })?;

        debug!(id = %record.id, total = entries.len(), "Appended record");
        Ok(entries.len())
    }

    /// All stored entries that decode as submission records, in insertion
    /// order.
    ///
    /// Entries without a `kind` predate download storage and are read as
    /// consultations. The file itself is never rewritten.
    pub async fn records(&self) -> Vec<SubmissionRecord> {
        self.read_entries()
            .await
            .into_iter()
            .map(with_default_kind)
            .filter_map(|entry| match serde_json::from_value(entry) {
                Ok(record) => Some(record),
                Err(e) => {
                    debug!(error = %e, "Skipping entry that is not a submission record");
                    None
                }
            })
            .collect()
    }

    /// Number of entries in the file.
    pub async fn len(&self) -> usize {
        self.read_entries().await.len()
    }

    /// Whether the store holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Read the raw entry list, falling back to empty on any failure.
    async fn read_entries(&self) -> Vec<Value> {
        let data = match tokio::fs::read_to_string(&self.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Record file unreadable, starting empty"
                );
                return Vec::new();
            }
        };

        match serde_json::from_str::<Value>(&data) {
            Ok(Value::Array(entries)) => entries,
            Ok(_) => {
                warn!(
                    path = %self.path.display(),
                    "Record file is not a JSON array, starting empty"
                );
                Vec::new()
            }
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Record file is corrupt, starting empty"
                );
                Vec::new()
            }
        }
    }
}

fn with_default_kind(mut entry: Value) -> Value {
    if let Value::Object(fields) = &mut entry {
        fields
            .entry("kind")
            .or_insert_with(|| Value::String(SubmissionKind::Consultation.to_string()));
    }
    entry
}
