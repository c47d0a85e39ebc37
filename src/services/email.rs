//! Email delivery for loan notifications

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox, Message, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    SmtpTransport, Transport,
};
use std::{str::FromStr, time::Duration};

use crate::{
    config::EmailConfig,
    error::{AppError, AppResult},
};

/// A plain-text message addressed to one recipient
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Outbound mail transport
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Deliver one message; transport and addressing failures are `AppError::Delivery`
    async fn send(&self, email: &OutgoingEmail) -> AppResult<()>;
}

/// SMTP mailer
#[derive(Clone)]
pub struct EmailService {
    config: EmailConfig,
    transport: SmtpTransport,
}

impl EmailService {
    pub fn new(config: EmailConfig) -> AppResult<Self> {
        let transport_builder = if config.smtp_use_tls {
            SmtpTransport::starttls_relay(&config.smtp_host)
                .map_err(|e| AppError::Internal(format!("Failed to create SMTP transport: {}", e)))?
        } else {
            SmtpTransport::builder_dangerous(&config.smtp_host)
        }
        .port(config.smtp_port)
        .timeout(Some(Duration::from_secs(config.timeout_secs)));

        let transport_builder = if let (Some(username), Some(password)) =
            (&config.smtp_username, &config.smtp_password)
        {
            transport_builder.credentials(Credentials::new(username.clone(), password.clone()))
        } else {
            transport_builder
        };

        Ok(Self {
            transport: transport_builder.build(),
            config,
        })
    }

    fn build_message(&self, email: &OutgoingEmail) -> AppResult<Message> {
        let from_name = self.config.smtp_from_name.as_deref().unwrap_or("Library");
        let from_mailbox = Mailbox::from_str(&format!("{} <{}>", from_name, self.config.smtp_from))
            .map_err(|e| AppError::Internal(format!("Invalid from address: {}", e)))?;

        let to_mailbox = Mailbox::from_str(&email.to)
            .map_err(|e| AppError::Delivery(format!("Invalid recipient {}: {}", email.to, e)))?;

        Message::builder()
            .from(from_mailbox)
            .to(to_mailbox)
            .subject(email.subject.as_str())
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(email.body.clone()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body(&email.body)),
                    ),
            )
            .map_err(|e| AppError::Internal(format!("Failed to build email: {}", e)))
    }
}

/// HTML alternative of a plain-text body. Book titles and member names end
/// up in the text, so it is escaped before being wrapped.
fn html_body(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            '\n' => escaped.push_str("<br>"),
            c => escaped.push(c),
        }
    }
    format!("<html><body><pre>{}</pre></body></html>", escaped)
}

#[async_trait]
impl Mailer for EmailService {
    async fn send(&self, email: &OutgoingEmail) -> AppResult<()> {
        let message = self.build_message(email)?;
        let transport = self.transport.clone();

        // lettre's SmtpTransport blocks on network I/O
        tokio::task::spawn_blocking(move || transport.send(&message))
            .await
            .map_err(|e| AppError::Internal(format!("Email task panicked: {}", e)))?
            .map_err(|e| AppError::Delivery(format!("Failed to send email: {}", e)))?;

        tracing::debug!(to = %email.to, subject = %email.subject, "email sent");
        Ok(())
    }
}
