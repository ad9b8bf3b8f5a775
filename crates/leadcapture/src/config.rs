//! Configuration management for leadcapture.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Error, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "leadcapture";

/// Default record file name.
const DATA_FILE_NAME: &str = "consultations.json";

/// Deployment environment variables and the config keys they populate.
const DEPLOYMENT_ENV_KEYS: &[(&str, &str)] = &[
    ("PORT", "server.port"),
    ("NODE_ENV", "server.environment"),
    ("SMTP_HOST", "mail.host"),
    ("SMTP_PORT", "mail.port"),
    ("SMTP_USER", "mail.username"),
    ("SMTP_PASS", "mail.password"),
    ("NOTIFICATION_EMAIL", "mail.notification_email"),
];

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables prefixed with `LEADCAPTURE_` (sections split on `__`)
/// 2. Deployment variables (`PORT`, `SMTP_HOST`, `SMTP_USER`, ...)
/// 3. TOML config file at `~/.config/leadcapture/config.toml`
/// 4. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server configuration.
    pub server: ServerConfig,
    /// Record storage configuration.
    pub storage: StorageConfig,
    /// Mail notification configuration.
    pub mail: MailConfig,
    /// Intake validation configuration.
    pub intake: IntakeConfig,
}

/// Runtime mode of the deployment.
///
/// Only reported, never acted on, so any name is accepted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Lenient", into = "String")]
pub enum Environment {
    /// Local development.
    #[default]
    Development,
    /// Production deployment.
    Production,
    /// Automated tests.
    Test,
    /// Any other mode name, e.g. `staging`.
    Other(String),
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
            Self::Test => write!(f, "test"),
            Self::Other(name) => write!(f, "{name}"),
        }
    }
}

impl From<Lenient> for Environment {
    fn from(value: Lenient) -> Self {
        let name = String::from(value);
        match name.to_ascii_lowercase().as_str() {
            "" | "development" => Self::Development,
            "production" => Self::Production,
            "test" => Self::Test,
            _ => Self::Other(name),
        }
    }
}

impl From<Environment> for String {
    fn from(env: Environment) -> Self {
        env.to_string()
    }
}

/// A text setting as the environment layer may have typed it.
///
/// figment parses `SMTP_PASS=12345678` as an integer; these settings are
/// always text.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Lenient {
    Text(String),
    Unsigned(u64),
    Signed(i64),
    Float(f64),
    Bool(bool),
}

impl From<Lenient> for String {
    fn from(value: Lenient) -> Self {
        match value {
            Lenient::Text(s) => s,
            Lenient::Unsigned(n) => n.to_string(),
            Lenient::Signed(n) => n.to_string(),
            Lenient::Float(n) => n.to_string(),
            Lenient::Bool(b) => b.to_string(),
        }
    }
}

fn lenient_text<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Lenient>::deserialize(deserializer)?.map(String::from))
}

/// HTTP server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to listen on.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Directory of the marketing site to serve for non-API paths.
    pub static_dir: Option<PathBuf>,
    /// Base URL used for download links when the request carries
    /// neither an `Origin` nor a `Host` header.
    pub public_url: Option<String>,
    /// Runtime mode.
    pub environment: Environment,
}

/// Record storage configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the JSON record file.
    /// Defaults to `~/.local/share/leadcapture/consultations.json`
    pub data_file: Option<PathBuf>,
}

/// Mail notification configuration.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MailConfig {
    /// SMTP server host.
    pub host: String,
    /// SMTP server port.
    pub port: u16,
    /// SMTP username, also used as the sender address.
    #[serde(deserialize_with = "lenient_text")]
    pub username: Option<String>,
    /// SMTP password. Never serialized back out.
    #[serde(skip_serializing, deserialize_with = "lenient_text")]
    pub password: Option<String>,
    /// Recipient of staff notifications. Defaults to the username.
    #[serde(deserialize_with = "lenient_text")]
    pub notification_email: Option<String>,
    /// Connect with TLS from the start instead of upgrading via STARTTLS.
    pub implicit_tls: bool,
    /// Accept invalid or self-signed server certificates.
    pub accept_invalid_certs: bool,
    /// Connection and command timeout in seconds.
    pub timeout_secs: u64,
    /// Closing line of emails sent to requesters.
    pub signature: String,
}

/// Which consultation form the site deploys.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsultationSchema {
    /// Requires a company name; notes and phone are optional.
    #[default]
    Company,
    /// Requires a phone number; company and notes are optional.
    Phone,
}

/// Intake validation configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntakeConfig {
    /// Required-field schema for consultation requests.
    pub consultation_schema: ConsultationSchema,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            static_dir: None,
            public_url: None,
            environment: Environment::default(),
        }
    }
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            host: "smtp.gmail.com".to_string(),
            port: 587,
            username: None,
            password: None,
            notification_email: None,
            implicit_tls: false,
            accept_invalid_certs: true,
            timeout_secs: 10,
            signature: "The EmiliaTeams Team".to_string(),
        }
    }
}

impl std::fmt::Debug for MailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.masked_password())
            .field("notification_email", &self.notification_email)
            .field("implicit_tls", &self.implicit_tls)
            .field("accept_invalid_certs", &self.accept_invalid_certs)
            .field("timeout_secs", &self.timeout_secs)
            .field("signature", &self.signature)
            .finish()
    }
}

impl MailConfig {
    /// Username and password, if both are set and non-empty.
    #[must_use]
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (self.username.as_deref(), self.password.as_deref()) {
            (Some(user), Some(pass)) if !user.is_empty() && !pass.is_empty() => Some((user, pass)),
            _ => None,
        }
    }

    /// Whether notifications can be sent at all.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.credentials().is_some()
    }

    /// Recipient of staff notifications.
    #[must_use]
    pub fn notification_recipient(&self) -> Option<&str> {
        self.notification_email
            .as_deref()
            .filter(|s| !s.is_empty())
            .or(self.username.as_deref())
    }

    /// The transport timeout as a Duration.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Password suitable for logs: `***` plus the last four characters.
    #[must_use]
    pub fn masked_password(&self) -> String {
        match self.password.as_deref() {
            None | Some("") => "Not set".to_string(),
            Some(pass) => {
                let tail: String = pass
                    .chars()
                    .rev()
                    .take(4)
                    .collect::<Vec<_>>()
                    .into_iter()
                    .rev()
                    .collect();
                format!("***{tail}")
            }
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);
        let config: Config = Self::figment(&config_file).extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Build the layered figment for the given config file.
    #[must_use]
    pub fn figment(config_file: &std::path::Path) -> Figment {
        let deployment_keys: Vec<&str> = DEPLOYMENT_ENV_KEYS.iter().map(|(env, _)| *env).collect();

        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(config_file))
            .merge(Env::raw().only(&deployment_keys).map(|key| {
                DEPLOYMENT_ENV_KEYS
                    .iter()
                    .find(|(env, _)| key.as_str().eq_ignore_ascii_case(env))
                    .map_or(key.as_str(), |(_, path)| *path)
                    .to_string()
                    .into()
            }))
            .merge(Env::prefixed("LEADCAPTURE_").split("__"))
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(Error::config_validation("server.port must be greater than 0"));
        }

        if self.mail.host.trim().is_empty() {
            return Err(Error::config_validation("mail.host must not be empty"));
        }

        if self.mail.port == 0 {
            return Err(Error::config_validation("mail.port must be greater than 0"));
        }

        if self.mail.timeout_secs == 0 {
            return Err(Error::config_validation(
                "mail.timeout_secs must be greater than 0",
            ));
        }

        if let Some(url) = &self.server.public_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(Error::config_validation(format!(
                    "server.public_url must start with http:// or https://: {url}"
                )));
            }
        }

        Ok(())
    }

    /// Get the record file path, resolving defaults if not set.
    #[must_use]
    pub fn data_file(&self) -> PathBuf {
        self.storage
            .data_file
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATA_FILE_NAME))
    }

    /// The `host:port` address the server binds to.
    #[must_use]
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
