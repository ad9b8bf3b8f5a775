//! `leadcapture` - backend for the marketing site's lead forms
//!
//! This library accepts consultation and whitepaper download requests,
//! appends each one to a JSON record file and sends the matching email.
//! Storage and email are best effort: once a request validates, it succeeds.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod intake;
pub mod logging;
pub mod notify;
pub mod outcome;
pub mod record;
pub mod server;
pub mod storage;

pub use config::Config;
pub use error::{Error, Result};
pub use intake::{IntakeHandler, IntakeReport, ValidationError};
pub use logging::init_logging;
pub use notify::Notifier;
pub use outcome::Outcome;
pub use record::{Submission, SubmissionKind, SubmissionRecord};
pub use storage::RecordStore;
