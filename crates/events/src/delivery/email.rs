//! Email delivery through Resend, SendGrid or SMTP.
//!
//! [`EmailConfig::from_env`] picks the provider from whichever credential is
//! set (Resend, then SendGrid, then SMTP) and returns `None` when none is,
//! in which case no mailer should be constructed. [`EmailDelivery`] sends
//! through an [`EmailTransport`] so the provider stays swappable.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lettre::message::Mailbox;

const RESEND_BASE_URL: &str = "https://api.resend.com";
const SENDGRID_BASE_URL: &str = "https://api.sendgrid.com";
const DEFAULT_SMTP_PORT: u16 = 587;
const DEFAULT_FROM_ADDRESS: &str = "Stepiva <nudges@stepiva.app>";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    /// SMTP transport-level failure (authentication, connection, etc.).
    #[error("SMTP transport error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    /// The recipient or sender address could not be parsed.
    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// The MIME message could not be assembled.
    #[error("Email build error: {0}")]
    Build(String),

    /// HTTP request to an email API failed.
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// An email API answered with a non-2xx status.
    #[error("{provider} returned HTTP {status}: {body}")]
    Provider {
        provider: &'static str,
        status: u16,
        body: String,
    },
}

// ---------------------------------------------------------------------------
// EmailConfig
// ---------------------------------------------------------------------------

/// Which backend sends the mail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmailProvider {
    Resend {
        api_key: String,
    },
    SendGrid {
        api_key: String,
    },
    Smtp {
        host: String,
        port: u16,
        user: Option<String>,
        password: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailConfig {
    pub provider: EmailProvider,
    /// RFC 5322 "From" mailbox, e.g. `Stepiva <nudges@stepiva.app>`.
    pub from_address: String,
}

impl EmailConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable           | Default                        |
    /// |--------------------|--------------------------------|
    /// | `RESEND_API_KEY`   | (selects Resend)               |
    /// | `SENDGRID_API_KEY` | (selects SendGrid)             |
    /// | `SMTP_HOST`        | (selects SMTP)                 |
    /// | `SMTP_PORT`        | `587`                          |
    /// | `SMTP_USER`        | (none)                         |
    /// | `SMTP_PASSWORD`    | (none)                         |
    /// | `EMAIL_FROM`       | `Stepiva <nudges@stepiva.app>` |
    pub fn from_env() -> Option<Self> {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());

        let provider = if let Some(api_key) = var("RESEND_API_KEY") {
            EmailProvider::Resend { api_key }
        } else if let Some(api_key) = var("SENDGRID_API_KEY") {
            EmailProvider::SendGrid { api_key }
        } else {
            EmailProvider::Smtp {
                host: var("SMTP_HOST")?,
                port: var("SMTP_PORT")
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(DEFAULT_SMTP_PORT),
                user: var("SMTP_USER"),
                password: var("SMTP_PASSWORD"),
            }
        };

        Some(Self {
            provider,
            from_address: var("EMAIL_FROM").unwrap_or_else(|| DEFAULT_FROM_ADDRESS.to_string()),
        })
    }
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// A plain-text email ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub text: String,
}

#[async_trait]
pub trait EmailTransport: Send + Sync {
    /// Provider name for logs.
    fn name(&self) -> &'static str;

    async fn send(&self, from: &Mailbox, message: &EmailMessage) -> Result<(), EmailError>;
}

/// Resend `POST /emails`.
pub struct ResendTransport {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl ResendTransport {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, RESEND_BASE_URL.to_string())
    }

    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self {
            client: http_client(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl EmailTransport for ResendTransport {
    fn name(&self) -> &'static str {
        "resend"
    }

    async fn send(&self, from: &Mailbox, message: &EmailMessage) -> Result<(), EmailError> {
        let body = serde_json::json!({
            "from": from.to_string(),
            "to": [message.to],
            "subject": message.subject,
            "text": message.text,
        });
        let response = self
            .client
            .post(format!("{}/emails", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;
        check_status(self.name(), response).await
    }
}

/// SendGrid `POST /v3/mail/send`.
pub struct SendGridTransport {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl SendGridTransport {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, SENDGRID_BASE_URL.to_string())
    }

    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self {
            client: http_client(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl EmailTransport for SendGridTransport {
    fn name(&self) -> &'static str {
        "sendgrid"
    }

    async fn send(&self, from: &Mailbox, message: &EmailMessage) -> Result<(), EmailError> {
        let mut sender = serde_json::json!({ "email": from.email.to_string() });
        if let Some(name) = &from.name {
            sender["name"] = serde_json::Value::String(name.clone());
        }
        let body = serde_json::json!({
            "personalizations": [{ "to": [{ "email": message.to }] }],
            "from": sender,
            "subject": message.subject,
            "content": [{ "type": "text/plain", "value": message.text }],
        });
        let response = self
            .client
            .post(format!("{}/v3/mail/send", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;
        check_status(self.name(), response).await
    }
}

/// SMTP with STARTTLS via `lettre`.
pub struct SmtpTransport {
    mailer: lettre::AsyncSmtpTransport<lettre::Tokio1Executor>,
}

impl SmtpTransport {
    pub fn new(
        host: &str,
        port: u16,
        user: Option<String>,
        password: Option<String>,
    ) -> Result<Self, EmailError> {
        use lettre::transport::smtp::authentication::Credentials;

        let mut builder =
            lettre::AsyncSmtpTransport::<lettre::Tokio1Executor>::starttls_relay(host)?.port(port);
        if let (Some(user), Some(pass)) = (user, password) {
            builder = builder.credentials(Credentials::new(user, pass));
        }
        Ok(Self {
            mailer: builder.build(),
        })
    }
}

#[async_trait]
impl EmailTransport for SmtpTransport {
    fn name(&self) -> &'static str {
        "smtp"
    }

    async fn send(&self, from: &Mailbox, message: &EmailMessage) -> Result<(), EmailError> {
        use lettre::{message::header::ContentType, AsyncTransport, Message};

        let email = Message::builder()
            .from(from.clone())
            .to(message.to.parse()?)
            .subject(message.subject.clone())
            .header(ContentType::TEXT_PLAIN)
            .body(message.text.clone())
            .map_err(|e| EmailError::Build(e.to_string()))?;

        self.mailer.send(email).await?;
        Ok(())
    }
}

fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .unwrap_or_default()
}

async fn check_status(provider: &'static str, response: reqwest::Response) -> Result<(), EmailError> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<unreadable body>".to_string());
    Err(EmailError::Provider {
        provider,
        status: status.as_u16(),
        body,
    })
}

// ---------------------------------------------------------------------------
// EmailDelivery
// ---------------------------------------------------------------------------

/// Sends plain-text notification emails from a fixed sender.
#[derive(Clone)]
pub struct EmailDelivery {
    transport: Arc<dyn EmailTransport>,
    from: Mailbox,
}

impl EmailDelivery {
    /// Build the transport selected by `config`.
    pub fn new(config: EmailConfig) -> Result<Self, EmailError> {
        let transport: Arc<dyn EmailTransport> = match config.provider {
            EmailProvider::Resend { api_key } => Arc::new(ResendTransport::new(api_key)),
            EmailProvider::SendGrid { api_key } => Arc::new(SendGridTransport::new(api_key)),
            EmailProvider::Smtp {
                host,
                port,
                user,
                password,
            } => Arc::new(SmtpTransport::new(&host, port, user, password)?),
        };
        Self::with_transport(transport, &config.from_address)
    }

    pub fn with_transport(
        transport: Arc<dyn EmailTransport>,
        from_address: &str,
    ) -> Result<Self, EmailError> {
        Ok(Self {
            transport,
            from: from_address.parse()?,
        })
    }

    pub fn provider(&self) -> &'static str {
        self.transport.name()
    }

    pub async fn send(&self, message: &EmailMessage) -> Result<(), EmailError> {
        self.transport.send(&self.from, message).await?;
        tracing::info!(provider = self.provider(), to = %message.to, "Notification email sent");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_error_display_provider() {
        let err = EmailError::Provider {
            provider: "resend",
            status: 422,
            body: "bad from".to_string(),
        };
        assert_eq!(err.to_string(), "resend returned HTTP 422: bad from");
    }

    #[test]
    fn invalid_sender_is_rejected() {
        let transport = Arc::new(ResendTransport::new("key".into()));
        assert!(EmailDelivery::with_transport(transport, "not-an-email").is_err());
    }

    #[test]
    fn display_name_sender_parses() {
        let transport = Arc::new(SendGridTransport::new("key".into()));
        let delivery = EmailDelivery::with_transport(transport, DEFAULT_FROM_ADDRESS).unwrap();
        assert_eq!(delivery.from.name.as_deref(), Some("Stepiva"));
        assert_eq!(delivery.provider(), "sendgrid");
    }
}
