//! `leadcapture` - form backend for the marketing site
//!
//! This binary runs the HTTP server and provides a few maintenance commands
//! for inspecting stored submissions and checking the mail setup.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use leadcapture::cli::{
    CheckSmtpCommand, Cli, Command, ConfigCommand, RecordsCommand, ServeCommand,
};
use leadcapture::notify::transport::{probe, probe_hint};
use leadcapture::record::{SubmissionKind, SubmissionRecord};
use leadcapture::{catalog, init_logging, server, Config, RecordStore};

const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbosity());

    // `config path` and `config validate` must work with a broken configuration.
    match cli.command {
        Command::Serve(serve_cmd) => handle_serve(cli.config, serve_cmd).await,
        Command::Records(records_cmd) => handle_records(cli.config, &records_cmd).await,
        Command::Config(config_cmd) => handle_config(cli.config, config_cmd),
        Command::CheckSmtp(check_cmd) => handle_check_smtp(cli.config, check_cmd).await,
    }
}

async fn handle_serve(config_path: Option<PathBuf>, cmd: ServeCommand) -> anyhow::Result<()> {
    let mut config = Config::load_from(config_path)?;
    if let Some(host) = cmd.host {
        config.server.host = host;
    }
    if let Some(port) = cmd.port {
        config.server.port = port;
    }
    config.validate()?;
    server::serve(&config).await?;
    Ok(())
}

async fn handle_records(config_path: Option<PathBuf>, cmd: &RecordsCommand) -> anyhow::Result<()> {
    let config = Config::load_from(config_path)?;
    let store = RecordStore::new(config.data_file());
    let kind = cmd.kind.map(SubmissionKind::from);

    let mut records: Vec<SubmissionRecord> = store
        .records()
        .await
        .into_iter()
        .filter(|r| kind.map_or(true, |k| r.kind() == k))
        .collect();
    if let Some(limit) = cmd.limit {
        let skip = records.len().saturating_sub(limit);
        records.drain(..skip);
    }

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    if records.is_empty() {
        println!("No records in {}", store.path().display());
        return Ok(());
    }

    for record in &records {
        println!(
            "{}  {}  {:<12}  {} <{}>",
            record.id,
            record.submitted_at.format("%Y-%m-%d %H:%M:%S"),
            record.kind().to_string(),
            record.submission.name(),
            record.submission.email(),
        );
    }
    println!();
    println!("{} record(s) from {}", records.len(), store.path().display());
    Ok(())
}

fn handle_config(config_path: Option<PathBuf>, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            let config = Config::load_from(config_path)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Server]");
                println!("  Listen address:     {}", config.listen_addr());
                println!("  Environment:        {}", config.server.environment);
                println!(
                    "  Static directory:   {}",
                    config
                        .server
                        .static_dir
                        .as_ref()
                        .map_or_else(|| "Not set".to_string(), |p| p.display().to_string())
                );
                println!(
                    "  Public URL:         {}",
                    config.server.public_url.as_deref().unwrap_or("Not set")
                );
                println!();
                println!("[Storage]");
                println!("  Data file:          {}", config.data_file().display());
                println!();
                println!("[Mail]");
                println!("  SMTP server:        {}:{}", config.mail.host, config.mail.port);
                println!(
                    "  User:               {}",
                    config.mail.username.as_deref().unwrap_or("Not set")
                );
                println!("  Password:           {}", config.mail.masked_password());
                println!(
                    "  Notify:             {}",
                    config.mail.notification_recipient().unwrap_or("Not set")
                );
                println!("  Enabled:            {}", config.mail.is_configured());
                println!();
                println!("[Intake]");
                println!(
                    "  Consultation form:  {:?}",
                    config.intake.consultation_schema
                );
                println!("  Downloads:");
                for resource in catalog::all() {
                    println!("    {:<20} {}", resource.key, resource.path);
                }
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file
                .or(config_path)
                .unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => {
                    println!("Configuration error: {e}");
                    return Err(e.into());
                }
            }
        }
    }
    Ok(())
}

async fn handle_check_smtp(
    config_path: Option<PathBuf>,
    cmd: CheckSmtpCommand,
) -> anyhow::Result<()> {
    let config = Config::load_from(config_path)?;
    let host = cmd.host.unwrap_or_else(|| config.mail.host.clone());
    let port = cmd.port.unwrap_or(config.mail.port);

    println!("Testing connection to {host}:{port}...");
    match probe(&host, port, PROBE_TIMEOUT).await {
        Ok(()) => {
            println!("Connected to {host}:{port}");
            Ok(())
        }
        Err(e) => {
            println!("Connection failed: {e}");
            if let Some(hint) = probe_hint(&e) {
                println!("  {hint}");
            }
            Err(e.into())
        }
    }
}
