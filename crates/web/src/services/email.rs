//! Email service for account verification.
//!
//! Uses SMTP via lettre for delivery with Askama HTML templates. Without
//! SMTP settings the service runs in development mode and logs the
//! verification link instead of sending anything.

use askama::Template;
use chrono::Datelike;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;

use metamorph_core::Email;

use crate::config::EmailConfig;

const VERIFY_SUBJECT: &str = "Vérifiez votre email - MetamorphUI";

/// HTML template for the verification email.
#[derive(Template)]
#[template(path = "email/verify_email.html")]
struct VerifyEmailHtml<'a> {
    name: Option<&'a str>,
    verify_url: &'a str,
    year: i32,
}

/// Plain text template for the verification email.
#[derive(Template)]
#[template(path = "email/verify_email.txt")]
struct VerifyEmailText<'a> {
    name: Option<&'a str>,
    verify_url: &'a str,
    year: i32,
}

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

/// Email service for sending transactional emails.
#[derive(Clone)]
pub struct EmailService {
    /// `None` in development mode.
    mailer: Option<AsyncSmtpTransport<Tokio1Executor>>,
    from_address: String,
    base_url: String,
}

impl EmailService {
    /// Create a new email service.
    ///
    /// # Errors
    ///
    /// Returns error if the SMTP transport cannot be configured.
    pub fn new(
        config: Option<&EmailConfig>,
        from_address: &str,
        base_url: &str,
    ) -> Result<Self, SmtpError> {
        let mailer = match config {
            Some(config) => {
                let credentials = Credentials::new(
                    config.smtp_username.clone(),
                    config.smtp_password.expose_secret().to_string(),
                );

                Some(
                    AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
                        .port(config.smtp_port)
                        .credentials(credentials)
                        .build(),
                )
            }
            None => {
                tracing::warn!("SMTP not configured, verification links will be logged");
                None
            }
        };

        Ok(Self {
            mailer,
            from_address: from_address.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// A service that never sends, for development and tests.
    #[must_use]
    pub fn log_only(from_address: &str, base_url: &str) -> Self {
        Self {
            mailer: None,
            from_address: from_address.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Link the user follows to confirm their address.
    #[must_use]
    pub fn verification_url(&self, token: &str) -> String {
        format!("{}/verify-email?token={token}", self.base_url)
    }

    /// Send the email-verification link for `token`.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    pub async fn send_verification_email(
        &self,
        to: &Email,
        token: &str,
        name: Option<&str>,
    ) -> Result<(), EmailError> {
        let verify_url = self.verification_url(token);

        let Some(mailer) = &self.mailer else {
            tracing::info!(
                to = %to,
                verify_url = %verify_url,
                "Verification email not sent (development mode)"
            );
            return Ok(());
        };

        let year = chrono::Utc::now().year();
        let html = VerifyEmailHtml {
            name,
            verify_url: &verify_url,
            year,
        }
        .render()?;
        let text = VerifyEmailText {
            name,
            verify_url: &verify_url,
            year,
        }
        .render()?;

        self.send_multipart_email(mailer, to.as_str(), VERIFY_SUBJECT, &text, &html)
            .await
    }

    /// Send a multipart email with both plain text and HTML versions.
    async fn send_multipart_email(
        &self,
        mailer: &AsyncSmtpTransport<Tokio1Executor>,
        to: &str,
        subject: &str,
        text_body: &str,
        html_body: &str,
    ) -> Result<(), EmailError> {
        let email = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| EmailError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(to
                .parse()
                .map_err(|_| EmailError::InvalidAddress(to.to_string()))?)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text_body.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body.to_string()),
                    ),
            )?;

        mailer.send(email).await?;

        tracing::info!(to = %to, subject = %subject, "Email sent successfully");
        Ok(())
    }
}
