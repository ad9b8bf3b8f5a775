//! Error types for leadcapture.
//!
//! This module defines the crate-level error type. HTTP-facing failures are
//! mapped separately by [`crate::server::ApiError`].

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for leadcapture operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Storage Errors ===
    /// Writing the record file failed.
    #[error("failed to write records to {path}: {source}")]
    RecordWrite {
        /// Path to the record file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Mail Errors ===
    /// An email address could not be parsed.
    #[error("invalid email address '{address}': {source}")]
    MailAddress {
        /// The offending address.
        address: String,
        /// The underlying error.
        #[source]
        source: lettre::address::AddressError,
    },

    /// The message could not be assembled.
    #[error("failed to build email: {0}")]
    MailBuild(#[from] lettre::error::Error),

    /// The SMTP transport failed (connection, authentication, timeout).
    #[error("SMTP transport error: {0}")]
    MailTransport(#[from] lettre::transport::smtp::Error),

    // === Server Errors ===
    /// Failed to bind the listening socket.
    #[error("failed to bind {addr}: {source}")]
    ServerBind {
        /// The address that could not be bound.
        addr: String,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === I/O Errors ===
    /// File system or socket operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Generic Errors ===
    /// An operation timed out.
    #[error("operation timed out: {operation}")]
    Timeout {
        /// Description of the operation that timed out.
        operation: String,
    },

    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for leadcapture operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create a configuration validation error.
    #[must_use]
    pub fn config_validation(message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            message: message.into(),
        }
    }

    /// Create a mail address error.
    #[must_use]
    pub fn mail_address(address: impl Into<String>, source: lettre::address::AddressError) -> Self {
        Self::MailAddress {
            address: address.into(),
            source,
        }
    }

    /// Check if this error came from mail delivery.
    #[must_use]
    pub fn is_mail_error(&self) -> bool {
        matches!(
            self,
            Self::MailAddress { .. } | Self::MailBuild(_) | Self::MailTransport(_)
        )
    }
}
