//! Outbound mail via SMTP.
//!
//! One transactional message today: the password-reset link. Delivery uses
//! lettre over STARTTLS with the relay configured in [`MailConfig`].

use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::header::ContentType,
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;

use thimble_core::Email;

use crate::config::MailConfig;

/// Errors that can occur when sending mail.
#[derive(Debug, Error)]
pub enum MailError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build the message.
    #[error("failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// An address the relay could not parse.
    #[error("invalid mail address: {0}")]
    InvalidAddress(String),
}

/// Mail service for transactional messages.
#[derive(Clone)]
pub struct Mailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl Mailer {
    /// Create a mailer from configuration.
    ///
    /// # Errors
    ///
    /// Returns `SmtpError` if the relay parameters are invalid.
    pub fn new(config: &MailConfig) -> Result<Self, SmtpError> {
        let credentials = Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.expose_secret().to_owned(),
        );

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self {
            transport,
            from_address: config.from_address.clone(),
        })
    }

    /// Send the password-reset message.
    ///
    /// The body carries only the link; the token inside it is the secret.
    ///
    /// # Errors
    ///
    /// Returns `MailError` if the message cannot be built or handed to the
    /// relay.
    pub async fn send_password_reset(&self, to: &Email, reset_url: &str) -> Result<(), MailError> {
        let body = reset_body(reset_url);

        let message = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| MailError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(to
                .as_str()
                .parse()
                .map_err(|_| MailError::InvalidAddress(to.to_string()))?)
            .subject("Your password reset link")
            .header(ContentType::TEXT_PLAIN)
            .body(body)?;

        self.transport.send(message).await?;

        tracing::info!(to = %to, "Password reset mail sent");
        Ok(())
    }
}

fn reset_body(reset_url: &str) -> String {
    format!(
        "Someone (hopefully you) requested a password reset.\n\n\
         Follow this link within the next hour to choose a new password:\n\n\
         {reset_url}\n\n\
         If you didn't ask for this, ignore this message; your password is unchanged.\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_body_contains_link() {
        let body = reset_body("https://shop.test/reset?resetToken=abc123");
        assert!(body.contains("https://shop.test/reset?resetToken=abc123"));
    }

    #[test]
    fn test_reset_body_mentions_expiry_window() {
        let body = reset_body("https://shop.test/reset?resetToken=abc123");
        assert!(body.contains("hour"));
    }
}
