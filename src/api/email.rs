//! Email delivery abstractions and message templates.
//!
//! Auth flows hand fully rendered messages to an [`EmailSender`]. The
//! sender decides how to deliver (SMTP, logging, a recording fake in
//! tests) and returns `Ok`/`Err`. Nothing here retries: a failed send
//! leaves the persisted OTP intact, and the user-triggered resend is
//! the retry path.

use anyhow::{Context, Result};
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use secrecy::{ExposeSecret, SecretString};
use tracing::info;

/// A rendered outbound email.
#[derive(Clone, Debug)]
pub struct EmailMessage {
    pub to_email: String,
    pub to_name: Option<String>,
    pub subject: String,
    pub html_body: String,
}

/// Email delivery abstraction used by the auth flows.
pub trait EmailSender: Send + Sync {
    /// Deliver a message or return an error so the caller can surface it.
    ///
    /// # Errors
    /// Returns an error if delivery fails.
    fn send(&self, message: &EmailMessage) -> Result<()>;
}

/// Local dev sender that logs the payload instead of sending real email.
#[derive(Clone, Debug)]
pub struct LogEmailSender;

impl EmailSender for LogEmailSender {
    fn send(&self, message: &EmailMessage) -> Result<()> {
        info!(
            to_email = %message.to_email,
            subject = %message.subject,
            body = %message.html_body,
            "email send stub"
        );
        Ok(())
    }
}

/// SMTP relay configuration.
#[derive(Clone, Debug)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: SecretString,
    pub from_email: String,
    pub from_name: String,
}

/// Production sender delivering through an SMTP relay.
#[derive(Clone)]
pub struct SmtpEmailSender {
    host: String,
    port: u16,
    credentials: Credentials,
    from_email: String,
    from_name: String,
}

impl SmtpEmailSender {
    #[must_use]
    pub fn new(config: &SmtpConfig) -> Self {
        let credentials = Credentials::new(
            config.username.clone(),
            config.password.expose_secret().to_string(),
        );
        Self {
            host: config.host.clone(),
            port: config.port,
            credentials,
            from_email: config.from_email.clone(),
            from_name: config.from_name.clone(),
        }
    }

    /// Build a transport per send to avoid pooled-connection staleness.
    fn build_transport(&self) -> Result<SmtpTransport> {
        Ok(SmtpTransport::relay(&self.host)
            .context("failed to build SMTP relay")?
            .port(self.port)
            .credentials(self.credentials.clone())
            .build())
    }

    fn from_header(&self) -> String {
        format!("{} <{}>", self.from_name, self.from_email)
    }
}

impl EmailSender for SmtpEmailSender {
    fn send(&self, message: &EmailMessage) -> Result<()> {
        let to_header = match &message.to_name {
            Some(name) => format!("{} <{}>", name, message.to_email),
            None => message.to_email.clone(),
        };

        let email = Message::builder()
            .from(self.from_header().parse().context("invalid from address")?)
            .to(to_header.parse().context("invalid to address")?)
            .subject(message.subject.clone())
            .header(ContentType::TEXT_HTML)
            .body(message.html_body.clone())
            .context("failed to build email")?;

        let mailer = self.build_transport()?;
        mailer.send(&email).context("failed to send email")?;
        Ok(())
    }
}

/// Render the verification-code message sent on signup and resend.
#[must_use]
pub fn verification_message(to_email: &str, to_name: Option<&str>, otp: &str) -> EmailMessage {
    let greeting = greeting_line(to_name);
    let html_body = format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto; padding: 20px;">
    <h2>Verify your email address</h2>
    <p>{greeting}</p>
    <p>Enter this code to verify your Folioforge account. It expires in 10 minutes.</p>
    <p style="font-size: 28px; letter-spacing: 6px; font-weight: bold; margin: 24px 0;">{otp}</p>
    <p style="color: #666; font-size: 14px;">If you didn't create an account, you can safely ignore this email.</p>
</div>"#
    );

    EmailMessage {
        to_email: to_email.to_string(),
        to_name: to_name.map(str::to_string),
        subject: "Your Folioforge verification code".to_string(),
        html_body,
    }
}

/// Render the reset-code message sent on forgot-password.
#[must_use]
pub fn reset_message(to_email: &str, to_name: Option<&str>, otp: &str) -> EmailMessage {
    let greeting = greeting_line(to_name);
    let html_body = format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto; padding: 20px;">
    <h2>Reset your password</h2>
    <p>{greeting}</p>
    <p>Enter this code to reset your Folioforge password. It expires in 10 minutes.</p>
    <p style="font-size: 28px; letter-spacing: 6px; font-weight: bold; margin: 24px 0;">{otp}</p>
    <p style="color: #666; font-size: 14px;">If you didn't request a reset, your password will not be changed.</p>
</div>"#
    );

    EmailMessage {
        to_email: to_email.to_string(),
        to_name: to_name.map(str::to_string),
        subject: "Your Folioforge password reset code".to_string(),
        html_body,
    }
}

fn greeting_line(to_name: Option<&str>) -> String {
    match to_name {
        Some(name) => format!("Hi {name},"),
        None => "Hi,".to_string(),
    }
}
