use crate::config::MailConfig;
use crate::types::PriceAlert;

use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("Invalid SMTP URL: {0}")]
    InvalidSmtpUrl(String),
    #[error("Invalid mail address: {0}")]
    Address(#[from] lettre::address::AddressError),
    #[error("Failed to build message: {0}")]
    Message(#[from] lettre::error::Error),
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),
}

/// Delivers price alerts. A trait for the same reason as `PriceStore`:
/// the engine's alert path is exercised in tests without a mail server.
#[allow(async_fn_in_trait)]
pub trait Notifier {
    async fn notify(&self, alert: &PriceAlert) -> Result<(), MailError>;
}

pub struct SmtpNotifier {
    config: MailConfig,
}

impl SmtpNotifier {
    pub fn new(config: MailConfig) -> Self {
        Self { config }
    }

    /// Resolved per send so a malformed SMTP URL costs one dropped alert,
    /// not a startup failure.
    fn transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>, MailError> {
        if self.config.smtp_url_override.is_some() {
            log::info!("Using external SMTP service to send emails");
        } else {
            log::info!("Using Mailgun to send emails");
        }

        let raw = self.config.smtp_url();
        let url =
            Url::parse(&raw).map_err(|e| MailError::InvalidSmtpUrl(format!("{raw}: {e}")))?;
        let host = url
            .host_str()
            .ok_or_else(|| MailError::InvalidSmtpUrl(raw.clone()))?;
        let credentials = Credentials::new(
            url.username().to_string(),
            url.password().unwrap_or_default().to_string(),
        );

        let mut transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)?
            .credentials(credentials);
        if let Some(port) = url.port() {
            transport = transport.port(port);
        }

        Ok(transport.build())
    }

    fn message(&self, alert: &PriceAlert) -> Result<Message, MailError> {
        Ok(Message::builder()
            .to(self.config.to.parse()?)
            .from(self.config.from.parse()?)
            .subject(format!(
                "Energy Cost Scraper - {} market price getting lower!",
                alert.kind
            ))
            .header(ContentType::TEXT_PLAIN)
            .body(format!(
                "{} market price {} EUR is lower than your current bill price {} EUR \
                 with a discount of {:.2}%\nPlease, look for alternative energy providers!",
                alert.kind, alert.market_price, alert.reference_price, alert.discount_percent
            ))?)
    }
}

impl Notifier for SmtpNotifier {
    async fn notify(&self, alert: &PriceAlert) -> Result<(), MailError> {
        let transport = self.transport()?;
        let message = self.message(alert)?;

        log::info!(
            "market price [{} EUR] is lower than current paid price [{} EUR], \
             discount [{:.2}%], sending email alert ...",
            alert.market_price,
            alert.reference_price,
            alert.discount_percent
        );

        transport.send(message).await?;
        Ok(())
    }
}
