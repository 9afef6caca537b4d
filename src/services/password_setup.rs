// ABOUTME: Password setup and reset flows built on single-use tokens
// ABOUTME: Validates tokens, sets bcrypt password hashes and issues reset emails without revealing unknown addresses
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 CouponHub Contributors

use serde::Serialize;
use tracing::info;

use crate::auth::hash_password;
use crate::constants::auth::MIN_PASSWORD_LENGTH;
use crate::database::Database;
use crate::errors::{AppError, AppResult};
use crate::logging::AppLogger;
use crate::services::email::EmailService;

/// Message for tokens that are unknown, used or expired
pub const INVALID_TOKEN: &str = "Invalid or expired token";

/// Reply to a forgot-password request for an address we do not know
pub const UNKNOWN_EMAIL_REPLY: &str = "If the email exists, a password reset link has been sent.";

/// Reply to a forgot-password request once the email went out
pub const RESET_SENT_REPLY: &str = "Password reset link has been sent to your email.";

/// Public view of the user a setup token belongs to
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenOwner {
    /// User id
    pub id: i64,
    /// Login email
    pub email: String,
    /// Given name
    pub first_name: String,
    /// Family name
    pub last_name: String,
}

/// Resolve the owner of a usable setup token
///
/// # Errors
///
/// Returns `InvalidInput` when the token is unknown, used or expired
pub async fn validate_setup_token(database: &Database, token: &str) -> AppResult<TokenOwner> {
    let tokens = database.password_reset_tokens();
    if !tokens.validate(token).await? {
        return Err(AppError::invalid_input(INVALID_TOKEN));
    }
    let user = tokens
        .get_user_by_token(token)
        .await?
        .ok_or_else(|| AppError::invalid_input(INVALID_TOKEN))?;

    Ok(TokenOwner {
        id: user.id,
        email: user.email,
        first_name: user.first_name,
        last_name: user.last_name,
    })
}

/// Consume a token, store the new password and send the welcome email
///
/// A failed welcome email is logged and does not undo the password change.
///
/// # Errors
///
/// Returns `InvalidInput` for a short password or an unusable token
pub async fn set_password(
    database: &Database,
    email: &EmailService,
    token: &str,
    password: &str,
) -> AppResult<()> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AppError::invalid_input(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters long"
        )));
    }

    let tokens = database.password_reset_tokens();
    let user = tokens
        .get_user_by_token(token)
        .await?
        .ok_or_else(|| AppError::invalid_input(INVALID_TOKEN))?;

    let password_hash = hash_password(password.to_owned()).await?;
    if !tokens.use_token(token, &password_hash).await? {
        return Err(AppError::invalid_input(INVALID_TOKEN));
    }
    info!(user_id = user.id, "Password set through token");

    email.send_welcome_email(&user).await;
    Ok(())
}

/// Issue a reset token and email it
///
/// Unknown or inactive addresses get the same reply as a successful send so the
/// endpoint does not reveal which emails are registered.
///
/// # Errors
///
/// Returns `ExternalServiceError` when the reset email could not be delivered
pub async fn forgot_password(
    database: &Database,
    email: &EmailService,
    address: &str,
) -> AppResult<&'static str> {
    let Some(user) = database
        .users()
        .get_by_email(address.trim())
        .await?
        .filter(|u| u.is_active)
    else {
        AppLogger::log_auth_event(address, "forgot_password_unknown", false);
        return Ok(UNKNOWN_EMAIL_REPLY);
    };

    let token = database.password_reset_tokens().generate(user.id).await?;
    if email.send_password_reset_email(&user, &token.token).await {
        AppLogger::log_auth_event(&user.email, "forgot_password", true);
        Ok(RESET_SENT_REPLY)
    } else {
        Err(AppError::external_service(
            "smtp",
            "Failed to send password reset email. Please try again later.",
        ))
    }
}
