//! Contact form delivery
//!
//! Messages from the portfolio contact form are relayed to the site owner
//! over SMTP. The visitor's address goes in `Reply-To`; the relay only
//! accepts the authenticated account as sender.
//!
//! Author: hephaex@gmail.com

use async_trait::async_trait;
use folio_core::{FolioError, MailConfig, Result};
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

/// Subject used when the visitor leaves it blank
pub const DEFAULT_SUBJECT: &str = "New Contact Form Message";

/// A contact form submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactMessage {
    pub name: String,
    pub email: String,
    pub subject: Option<String>,
    pub message: String,
}

impl ContactMessage {
    /// Subject line, falling back to [`DEFAULT_SUBJECT`]
    pub fn subject_line(&self) -> &str {
        self.subject
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_SUBJECT)
    }

    /// Plain-text body
    pub fn body(&self) -> String {
        format!("From: {} <{}>\n\n{}", self.name, self.email, self.message)
    }
}

/// Trait for contact message delivery
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &ContactMessage) -> Result<()>;
}

/// SMTP mailer over an implicit-TLS relay
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    sender: Mailbox,
    recipient: Mailbox,
}

fn parse_address(value: &str, what: &str) -> Result<Address> {
    value
        .trim()
        .parse::<Address>()
        .map_err(|e| FolioError::Config(format!("Invalid {what} address '{value}': {e}")))
}

impl SmtpMailer {
    /// Create from config
    pub fn from_config(config: &MailConfig) -> Result<Self> {
        let username = config
            .smtp_username
            .clone()
            .ok_or_else(|| FolioError::Config("SMTP_USERNAME not set".to_string()))?;
        let password = config
            .smtp_password
            .clone()
            .ok_or_else(|| FolioError::Config("SMTP_PASSWORD not set".to_string()))?;
        let recipient = config
            .recipient
            .as_deref()
            .ok_or_else(|| FolioError::Config("CONTACT_RECIPIENT not set".to_string()))?;
        let sender = config.sender_address().unwrap_or(username.as_str());

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
            .map_err(|e| FolioError::Mail(format!("Invalid SMTP relay: {e}")))?
            .credentials(Credentials::new(username.clone(), password));
        if let Some(port) = config.smtp_port {
            builder = builder.port(port);
        }

        Ok(Self {
            transport: builder.build(),
            sender: Mailbox::new(None, parse_address(sender, "sender")?),
            recipient: Mailbox::new(None, parse_address(recipient, "recipient")?),
        })
    }

    /// Build the outgoing email for a submission
    pub fn compose(&self, message: &ContactMessage) -> Result<Message> {
        let reply_to = Mailbox::new(
            Some(message.name.clone()),
            message
                .email
                .trim()
                .parse::<Address>()
                .map_err(|e| FolioError::Validation(format!("Invalid email address: {e}")))?,
        );

        Message::builder()
            .from(self.sender.clone())
            .reply_to(reply_to)
            .to(self.recipient.clone())
            .subject(message.subject_line())
            .header(ContentType::TEXT_PLAIN)
            .body(message.body())
            .map_err(|e| FolioError::Mail(format!("Failed to build message: {e}")))
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, message: &ContactMessage) -> Result<()> {
        let email = self.compose(message)?;

        self.transport
            .send(email)
            .await
            .map_err(|e| FolioError::Mail(format!("SMTP send failed: {e}")))?;

        tracing::info!("Contact message from {} delivered", message.email);
        Ok(())
    }
}
