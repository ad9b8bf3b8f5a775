//! Mail transports.
//!
//! [`MailTransport`] is the seam between the notifier and the network.
//! [`SmtpMailer`] is the production implementation over lettre's async SMTP
//! client.

use std::time::Duration;

use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tokio::net::TcpStream;

use crate::config::MailConfig;
use crate::error::{Error, Result};

/// A fully rendered email ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    /// Sender address.
    pub from: String,
    /// Recipient address.
    pub to: String,
    /// Subject line.
    pub subject: String,
    /// HTML body.
    pub html: String,
}

/// Something that can deliver an [`OutgoingMail`].
#[async_trait::async_trait]
pub trait MailTransport: Send + Sync + std::fmt::Debug {
    /// Deliver the message and return the server's response text.
    ///
    /// # Errors
    ///
    /// Returns an error if the message is malformed or delivery fails.
    async fn send(&self, mail: OutgoingMail) -> Result<String>;

    /// Check that the server is reachable and accepts the credentials.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    async fn verify(&self) -> Result<bool>;
}

/// SMTP delivery through lettre.
#[derive(Debug)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    /// Build the transport from configuration.
    ///
    /// STARTTLS is attempted opportunistically unless `implicit_tls` is set.
    ///
    /// # Errors
    ///
    /// Returns an error if credentials are missing or TLS parameters cannot
    /// be built.
    pub fn new(config: &MailConfig) -> Result<Self> {
        let (user, pass) = config
            .credentials()
            .ok_or_else(|| Error::config_validation("SMTP credentials not configured"))?;

        let tls_parameters = TlsParameters::builder(config.host.clone())
            .dangerous_accept_invalid_certs(config.accept_invalid_certs)
            .build()?;
        let tls = if config.implicit_tls {
            Tls::Wrapper(tls_parameters)
        } else {
            Tls::Opportunistic(tls_parameters)
        };

        let transport = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
            .port(config.port)
            .tls(tls)
            .credentials(Credentials::new(user.to_string(), pass.to_string()))
            .timeout(Some(config.timeout()))
            .build();

        Ok(Self { transport })
    }
}

#[async_trait::async_trait]
impl MailTransport for SmtpMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<String> {
        let message = build_message(mail)?;
        let response = self.transport.send(message).await?;
        Ok(response.message().collect::<Vec<_>>().join(" "))
    }

    async fn verify(&self) -> Result<bool> {
        Ok(self.transport.test_connection().await?)
    }
}

/// Assemble a lettre message from rendered mail.
///
/// # Errors
///
/// Returns an error if either address does not parse.
pub fn build_message(mail: OutgoingMail) -> Result<Message> {
    let from: Mailbox = mail
        .from
        .parse()
        .map_err(|e| Error::mail_address(&mail.from, e))?;
    let to: Mailbox = mail
        .to
        .parse()
        .map_err(|e| Error::mail_address(&mail.to, e))?;

    Ok(Message::builder()
        .from(from)
        .to(to)
        .subject(mail.subject)
        .header(ContentType::TEXT_HTML)
        .body(mail.html)?)
}

/// Open and immediately close a TCP connection to the mail server.
///
/// # Errors
///
/// Returns [`Error::Timeout`] if the connection does not complete in time,
/// or [`Error::Io`] if it is refused or unreachable.
pub async fn probe(host: &str, port: u16, timeout: Duration) -> Result<()> {
    match tokio::time::timeout(timeout, TcpStream::connect((host, port))).await {
        Ok(Ok(_stream)) => Ok(()),
        Ok(Err(e)) => Err(Error::Io(e)),
        Err(_) => Err(Error::Timeout {
            operation: format!("connect to {host}:{port}"),
        }),
    }
}

/// A short troubleshooting hint for a failed probe.
#[must_use]
pub fn probe_hint(error: &Error) -> Option<&'static str> {
    match error {
        Error::Timeout { .. } => {
            Some("Connection timed out. Check firewall settings or network connectivity.")
        }
        Error::Io(e) => match e.kind() {
            std::io::ErrorKind::ConnectionRefused => {
                Some("Connection refused. The server may be down or the port may be blocked.")
            }
            std::io::ErrorKind::TimedOut => {
                Some("Connection timed out. Check firewall settings or network connectivity.")
            }
            _ if e.to_string().contains("failed to lookup address") => {
                Some("The hostname could not be resolved. Check your DNS settings.")
            }
            _ if e.raw_os_error() == Some(113) => Some("Host unreachable. Check network routing."),
            _ => None,
        },
        _ => None,
    }
}
