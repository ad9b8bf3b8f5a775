//! Command-line interface for leadcapture.
//!
//! This module provides the CLI structure for the `leadcapture` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{CheckSmtpCommand, ConfigCommand, KindArg, RecordsCommand, ServeCommand};

/// leadcapture - Form backend for the marketing site
///
/// Accepts consultation and whitepaper download requests, keeps a copy of
/// each in a JSON file and emails the right people.
#[derive(Debug, Parser)]
#[command(name = "leadcapture")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP server
    Serve(ServeCommand),

    /// List stored submissions
    Records(RecordsCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Check that the SMTP server is reachable
    CheckSmtp(CheckSmtpCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        if self.quiet {
            crate::logging::Verbosity::Quiet
        } else {
            match self.verbose {
                0 => crate::logging::Verbosity::Normal,
                1 => crate::logging::Verbosity::Verbose,
                _ => crate::logging::Verbosity::Trace,
            }
        }
    }
}
