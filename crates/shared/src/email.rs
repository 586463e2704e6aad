//! Email service for customer notifications.
//!
//! Uses `lettre` for SMTP transport. Delivery failures are reported to the
//! caller, which logs and continues; notification email is never allowed to
//! fail a payment or publish request.

use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::header::ContentType, transport::smtp::authentication::Credentials,
};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::config::EmailConfig;

/// Email service errors.
#[derive(Debug, Error)]
pub enum EmailError {
    /// Outbound email is disabled by configuration.
    #[error("Email delivery is disabled")]
    Disabled,
    /// Failed to build email message.
    #[error("Failed to build email: {0}")]
    BuildError(String),
    /// Failed to send email.
    #[error("Failed to send email: {0}")]
    SendError(String),
    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),
}

/// Email service for customer notifications.
#[derive(Clone)]
pub struct EmailService {
    config: EmailConfig,
}

impl EmailService {
    /// Creates a new email service.
    #[must_use]
    pub const fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    /// Creates an SMTP transport.
    fn create_transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>, EmailError> {
        let creds = Credentials::new(
            self.config.smtp_username.clone(),
            self.config.smtp_password.clone(),
        );

        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&self.config.smtp_host)
            .map_err(|e| EmailError::SendError(e.to_string()))?
            .port(self.config.smtp_port)
            .credentials(creds)
            .build();

        Ok(transport)
    }

    /// Sends the customer a link to their published invoice.
    ///
    /// # Errors
    ///
    /// Returns an error if email is disabled or the message cannot be sent.
    pub async fn send_invoice_email(
        &self,
        to_email: &str,
        customer_name: &str,
        company_name: &str,
        invoice_number: &str,
        amount_due: Decimal,
        currency: &str,
        portal_url: &str,
    ) -> Result<(), EmailError> {
        let subject = format!("Invoice {invoice_number} from {company_name}");
        let body = format!(
            r"Hi {customer_name},

{company_name} has sent you invoice {invoice_number} for {amount_due} {currency}.

View and pay it online here:

{portal_url}

No account or login is needed; the link above is unique to this invoice.

Thanks,
{company_name} (via Paylink)"
        );

        self.send_email(to_email, &subject, &body).await
    }

    /// Sends the customer a receipt for a recorded payment.
    ///
    /// # Errors
    ///
    /// Returns an error if email is disabled or the message cannot be sent.
    pub async fn send_receipt_email(
        &self,
        to_email: &str,
        customer_name: &str,
        company_name: &str,
        invoice_number: &str,
        amount: Decimal,
        currency: &str,
        reference_number: &str,
    ) -> Result<(), EmailError> {
        let subject = format!("Payment received for invoice {invoice_number}");
        let body = format!(
            r"Hi {customer_name},

We received your payment of {amount} {currency} toward invoice {invoice_number} from {company_name}.

Your payment reference is {reference_number}. Keep it for your records.

Thanks,
{company_name} (via Paylink)"
        );

        self.send_email(to_email, &subject, &body).await
    }

    /// Sends a generic plain-text email.
    ///
    /// # Errors
    ///
    /// Returns an error if email is disabled or the message cannot be sent.
    pub async fn send_email(
        &self,
        to_email: &str,
        subject: &str,
        body: &str,
    ) -> Result<(), EmailError> {
        if !self.config.enabled {
            return Err(EmailError::Disabled);
        }

        let from = format!("{} <{}>", self.config.from_name, self.config.from_email);

        let email = Message::builder()
            .from(
                from.parse()
                    .map_err(|e| EmailError::InvalidAddress(format!("{e}")))?,
            )
            .to(to_email
                .parse()
                .map_err(|e| EmailError::InvalidAddress(format!("{e}")))?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| EmailError::BuildError(e.to_string()))?;

        let transport = self.create_transport()?;
        transport
            .send(email)
            .await
            .map_err(|e| EmailError::SendError(e.to_string()))?;

        Ok(())
    }
}
