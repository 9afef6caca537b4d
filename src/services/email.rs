// ABOUTME: Transactional email for password setup, password reset and welcome messages
// ABOUTME: Renders HTML templates and delivers them through a pluggable sender backed by SMTP via lettre
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 CouponHub Contributors

//! # Email
//!
//! [`EmailService`] turns domain events into HTML messages and hands them to an
//! [`EmailSender`]. Production uses [`SmtpEmailSender`]; when SMTP credentials are not
//! configured the [`DisabledEmailSender`] is installed instead so every send fails
//! fast with an `ExternalServiceError`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{error, info, warn};

use crate::config::EmailConfig;
use crate::constants::auth::PASSWORD_TOKEN_EXPIRY_DAYS;
use crate::constants::defaults::SMTP_TIMEOUT_SECS;
use crate::errors::{AppError, AppResult};
use crate::models::User;

const SMTP_SERVICE: &str = "smtp";

/// A rendered message ready for delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    /// Recipient address
    pub to_email: String,
    /// Recipient display name
    pub to_name: String,
    /// Subject line
    pub subject: String,
    /// HTML body
    pub html_body: String,
}

/// Delivery backend for rendered messages
#[async_trait]
pub trait EmailSender: Send + Sync {
    /// Deliver one message
    async fn send(&self, message: EmailMessage) -> AppResult<()>;

    /// Whether this sender can actually deliver mail
    fn is_configured(&self) -> bool;
}

/// SMTP delivery over a STARTTLS relay
pub struct SmtpEmailSender {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpEmailSender {
    /// Build a sender from configuration
    ///
    /// # Errors
    ///
    /// Returns a config error when credentials are missing, the sender address is
    /// invalid or the relay host cannot be used
    pub fn new(config: &EmailConfig) -> AppResult<Self> {
        let (Some(username), Some(password)) =
            (config.smtp_username.clone(), config.smtp_password.clone())
        else {
            return Err(AppError::config("SMTP credentials are not configured"));
        };

        let address: Address = config
            .from_email
            .parse()
            .map_err(|e| AppError::config(format!("Invalid SMTP_FROM_EMAIL: {e}")))?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
            .map_err(|e| AppError::config(format!("Invalid SMTP relay {}: {e}", config.smtp_host)))?
            .port(config.smtp_port)
            .credentials(Credentials::new(username, password))
            .timeout(Some(Duration::from_secs(SMTP_TIMEOUT_SECS)))
            .build();

        Ok(Self {
            transport,
            from: Mailbox::new(Some(config.from_name.clone()), address),
        })
    }
}

#[async_trait]
impl EmailSender for SmtpEmailSender {
    async fn send(&self, message: EmailMessage) -> AppResult<()> {
        let to_address: Address = message.to_email.parse().map_err(|e| {
            AppError::invalid_input(format!("Invalid recipient {}: {e}", message.to_email))
        })?;

        let email = Message::builder()
            .from(self.from.clone())
            .to(Mailbox::new(Some(message.to_name), to_address))
            .subject(message.subject)
            .header(ContentType::TEXT_HTML)
            .body(message.html_body)
            .map_err(|e| AppError::internal(format!("Failed to build email: {e}")))?;

        self.transport
            .send(email)
            .await
            .map_err(|e| AppError::external_service(SMTP_SERVICE, e.to_string()))?;

        Ok(())
    }

    fn is_configured(&self) -> bool {
        true
    }
}

/// Sender used when SMTP is not configured
pub struct DisabledEmailSender;

#[async_trait]
impl EmailSender for DisabledEmailSender {
    async fn send(&self, message: EmailMessage) -> AppResult<()> {
        warn!(to = %message.to_email, subject = %message.subject, "SMTP credentials not configured, email not sent");
        Err(AppError::external_service(
            SMTP_SERVICE,
            "SMTP credentials not configured",
        ))
    }

    fn is_configured(&self) -> bool {
        false
    }
}

/// Build the sender matching the configuration
#[must_use]
pub fn sender_from_config(config: &EmailConfig) -> Arc<dyn EmailSender> {
    if !config.has_credentials() {
        return Arc::new(DisabledEmailSender);
    }
    match SmtpEmailSender::new(config) {
        Ok(sender) => Arc::new(sender),
        Err(e) => {
            error!(error = %e, "SMTP sender unavailable, emails disabled");
            Arc::new(DisabledEmailSender)
        }
    }
}

/// Composes and sends the application's emails
#[derive(Clone)]
pub struct EmailService {
    sender: Arc<dyn EmailSender>,
    frontend_base_url: String,
}

impl EmailService {
    /// Create the service over a sender
    #[must_use]
    pub fn new(sender: Arc<dyn EmailSender>, frontend_base_url: impl Into<String>) -> Self {
        Self {
            sender,
            frontend_base_url: frontend_base_url.into().trim_end_matches('/').to_owned(),
        }
    }

    /// Create the service from configuration
    #[must_use]
    pub fn from_config(config: &EmailConfig) -> Self {
        Self::new(sender_from_config(config), config.frontend_base_url.clone())
    }

    /// Whether emails can actually be delivered
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.sender.is_configured()
    }

    /// Invite a new user to choose a password
    pub async fn send_password_setup_email(&self, user: &User, token: &str) -> bool {
        let link = format!("{}/set-password?token={token}", self.frontend_base_url);
        let body = render_action_email(
            &user.first_name,
            "Welcome to CouponHub",
            "An account has been created for you. Click the button below to set your password and get started.",
            "Set Your Password",
            &link,
        );
        self.deliver(user, "Welcome to CouponHub - Set Your Password", body, "password_setup")
            .await
    }

    /// Send a password reset link
    pub async fn send_password_reset_email(&self, user: &User, token: &str) -> bool {
        let link = format!("{}/reset-password?token={token}", self.frontend_base_url);
        let body = render_action_email(
            &user.first_name,
            "Password Reset Request",
            "We received a request to reset your password. Click the button below to choose a new one. If you did not ask for this, you can ignore this email.",
            "Reset Password",
            &link,
        );
        self.deliver(user, "CouponHub - Password Reset Request", body, "password_reset")
            .await
    }

    /// Greet a user whose account is ready
    pub async fn send_welcome_email(&self, user: &User) -> bool {
        let body = render_welcome_email(&user.first_name);
        self.deliver(user, "Welcome to CouponHub!", body, "welcome")
            .await
    }

    async fn deliver(&self, user: &User, subject: &str, html_body: String, kind: &str) -> bool {
        let message = EmailMessage {
            to_email: user.email.clone(),
            to_name: user.full_name(),
            subject: subject.to_owned(),
            html_body,
        };
        match self.sender.send(message).await {
            Ok(()) => {
                info!(user_id = user.id, email.kind = kind, "Email sent");
                true
            }
            Err(e) => {
                error!(user_id = user.id, email.kind = kind, error = %e, "Failed to send email");
                false
            }
        }
    }
}

fn render_action_email(
    first_name: &str,
    heading: &str,
    intro: &str,
    button_label: &str,
    link: &str,
) -> String {
    let name = html_escape::encode_text(first_name);
    let href = html_escape::encode_double_quoted_attribute(link);
    let link_text = html_escape::encode_text(link);
    format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>{heading}</title></head>
<body style="font-family: Arial, sans-serif; color: #333; line-height: 1.6;">
  <div style="max-width: 600px; margin: 0 auto; padding: 20px;">
    <h1 style="color: #2c3e50;">{heading}</h1>
    <p>Hello {name}!</p>
    <p>{intro}</p>
    <p style="text-align: center; margin: 30px 0;">
      <a href="{href}" style="background-color: #3498db; color: #fff; padding: 12px 24px; text-decoration: none; border-radius: 4px;">{button_label}</a>
    </p>
    <p>If the button does not work, copy this link into your browser:</p>
    <p style="word-break: break-all;">{link_text}</p>
    <p><strong>Note:</strong> This link expires in {PASSWORD_TOKEN_EXPIRY_DAYS} days and can only be used once.</p>
    <p>Best regards,<br>The CouponHub Team</p>
  </div>
</body>
</html>"#
    )
}

fn render_welcome_email(first_name: &str) -> String {
    let name = html_escape::encode_text(first_name);
    format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>Welcome to CouponHub</title></head>
<body style="font-family: Arial, sans-serif; color: #333; line-height: 1.6;">
  <div style="max-width: 600px; margin: 0 auto; padding: 20px;">
    <h1 style="color: #2c3e50;">Welcome to CouponHub!</h1>
    <p>Hello {name}!</p>
    <p>Your account is ready. You can now sign in to manage customers, coupons and invoices.</p>
    <p>Best regards,<br>The CouponHub Team</p>
  </div>
</body>
</html>"#
    )
}
