use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use thiserror::Error;
use tracing::info;

use crate::config::MailConfig;
use crate::orders::dto::OrderDetails;
use crate::orders::types::OrderStatus;

use super::templates;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    #[error("failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    #[error("invalid email address: {0}")]
    InvalidAddress(String),

    #[error("order has no recipient email")]
    MissingRecipient,

    #[error("{0}")]
    Failed(String),
}

/// Transactional mail dispatcher. Order/status callers treat every
/// failure as best-effort: log and move on.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_order_receipt(&self, order: &OrderDetails) -> Result<(), MailError>;
    async fn send_status_update(
        &self,
        order: &OrderDetails,
        status: OrderStatus,
    ) -> Result<(), MailError>;
    async fn send_test(&self, to: &str, subject: &str, message: &str) -> Result<(), MailError>;
}

/// SMTP mailer over lettre, STARTTLS with optional credentials.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &MailConfig) -> Result<Self, MailError> {
        let mut builder =
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?.port(config.port);
        if !config.username.is_empty() {
            builder = builder.credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ));
        }

        let from = format!("{} <{}>", config.from_name, config.from_address)
            .parse()
            .map_err(|_| MailError::InvalidAddress(config.from_address.clone()))?;

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }

    async fn send(
        &self,
        to: &str,
        subject: &str,
        text_body: String,
        html_body: String,
    ) -> Result<(), MailError> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(to
                .parse()
                .map_err(|_| MailError::InvalidAddress(to.to_string()))?)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text_body),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body),
                    ),
            )?;

        self.transport.send(message).await?;
        info!(to = %to, subject = %subject, "email sent");
        Ok(())
    }
}

fn recipient(order: &OrderDetails) -> Result<&str, MailError> {
    order
        .customer
        .as_ref()
        .map(|c| c.email.as_str())
        .filter(|e| !e.is_empty())
        .ok_or(MailError::MissingRecipient)
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_order_receipt(&self, order: &OrderDetails) -> Result<(), MailError> {
        let to = recipient(order)?;
        self.send(
            to,
            "Order Confirmation",
            templates::receipt_text(order),
            templates::receipt_html(order),
        )
        .await
    }

    async fn send_status_update(
        &self,
        order: &OrderDetails,
        status: OrderStatus,
    ) -> Result<(), MailError> {
        let to = recipient(order)?;
        self.send(
            to,
            "Order Status Change",
            templates::status_text(order, status),
            templates::status_html(order, status),
        )
        .await
    }

    async fn send_test(&self, to: &str, subject: &str, message: &str) -> Result<(), MailError> {
        self.send(
            to,
            subject,
            message.to_string(),
            templates::test_html(message),
        )
        .await
    }
}

/// Mailer that drops everything. Used by `AppState::fake()` and
/// deployments without an SMTP relay.
#[derive(Default)]
pub struct NoopMailer;

#[async_trait]
impl Mailer for NoopMailer {
    async fn send_order_receipt(&self, _order: &OrderDetails) -> Result<(), MailError> {
        Ok(())
    }

    async fn send_status_update(
        &self,
        _order: &OrderDetails,
        _status: OrderStatus,
    ) -> Result<(), MailError> {
        Ok(())
    }

    async fn send_test(&self, _to: &str, _subject: &str, _message: &str) -> Result<(), MailError> {
        Ok(())
    }
}
