//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

use crate::record::SubmissionKind;

/// Serve command arguments.
#[derive(Debug, Args)]
pub struct ServeCommand {
    /// Interface to listen on (overrides `server.host`)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on (overrides `server.port`)
    #[arg(short, long)]
    pub port: Option<u16>,
}

/// Records command arguments.
#[derive(Debug, Args)]
pub struct RecordsCommand {
    /// Only show records of this kind
    #[arg(short, long, value_enum)]
    pub kind: Option<KindArg>,

    /// Show only the most recent N records
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// SMTP reachability check arguments.
#[derive(Debug, Args)]
pub struct CheckSmtpCommand {
    /// SMTP host to probe (overrides `mail.host`)
    #[arg(long)]
    pub host: Option<String>,

    /// SMTP port to probe (overrides `mail.port`)
    #[arg(short, long)]
    pub port: Option<u16>,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Submission kind argument for filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    /// Consultation requests
    Consultation,
    /// Download requests
    Download,
}

impl From<KindArg> for SubmissionKind {
    fn from(arg: KindArg) -> Self {
        match arg {
            KindArg::Consultation => Self::Consultation,
            KindArg::Download => Self::Download,
        }
    }
}
