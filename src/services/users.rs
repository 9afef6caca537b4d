// ABOUTME: Staff user business rules layered over the users table
// ABOUTME: Enforces role and service center consistency and sends the password setup invitation on creation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 CouponHub Contributors

use tracing::{info, warn};

use crate::auth::hash_password;
use crate::constants::auth::MIN_PASSWORD_LENGTH;
use crate::database::{CreateUserRequest, Database, UpdateUserRequest};
use crate::errors::{AppError, AppResult};
use crate::models::User;
use crate::permissions::{validate_role_assignment, UserRole};
use crate::services::email::EmailService;

/// A newly created user and whether their invitation went out
#[derive(Debug, Clone)]
pub struct CreatedUser {
    /// The stored user
    pub user: User,
    /// Whether the password setup email was delivered
    pub setup_email_sent: bool,
}

/// Create a staff user and email them a password setup link
///
/// A failed email is logged and reported through `setup_email_sent`; the user is
/// kept either way.
///
/// # Errors
///
/// Returns `InvalidInput` for inconsistent role assignments or unknown service
/// centers, and `ResourceAlreadyExists` for a duplicate email
pub async fn create_user(
    database: &Database,
    email: &EmailService,
    request: &CreateUserRequest,
) -> AppResult<CreatedUser> {
    check_profile(&request.first_name, &request.email)?;
    check_assignment(database, request.role, request.service_center_id).await?;

    let user = database.users().create(request).await?;
    info!(user_id = user.id, role = %user.role, "User created");

    let setup_email_sent = match database.password_reset_tokens().generate(user.id).await {
        Ok(token) => email.send_password_setup_email(&user, &token.token).await,
        Err(e) => {
            warn!(user_id = user.id, error = %e, "Could not issue password setup token");
            false
        }
    };

    Ok(CreatedUser {
        user,
        setup_email_sent,
    })
}

/// Update a staff user's profile, role and service center
///
/// # Errors
///
/// Returns `InvalidInput` for inconsistent role assignments or unknown service
/// centers, and `ResourceAlreadyExists` when the email belongs to another user
pub async fn update_user(
    database: &Database,
    id: i64,
    request: &UpdateUserRequest,
) -> AppResult<Option<User>> {
    check_profile(&request.first_name, &request.email)?;
    check_assignment(database, request.role, request.service_center_id).await?;
    database.users().update(id, request).await
}

fn check_profile(first_name: &str, email: &str) -> AppResult<()> {
    if first_name.trim().is_empty() {
        return Err(AppError::invalid_input("First name is required"));
    }
    if !is_plausible_email(email) {
        return Err(AppError::invalid_input(format!("Invalid email address: {email}")));
    }
    Ok(())
}

async fn check_assignment(
    database: &Database,
    role: UserRole,
    service_center_id: Option<i64>,
) -> AppResult<()> {
    validate_role_assignment(role, service_center_id)?;
    if let Some(id) = service_center_id {
        if database.service_centers().get_by_id(id).await?.is_none() {
            return Err(AppError::invalid_input(format!(
                "Service center with ID {id} does not exist"
            )));
        }
    }
    Ok(())
}

/// Create the first `SuperAdmin` with a password when no users exist yet
///
/// Returns `None` when the users table already has rows.
///
/// # Errors
///
/// Returns `InvalidInput` for a malformed email or a short password
pub async fn bootstrap_super_admin(
    database: &Database,
    email: &str,
    password: &str,
) -> AppResult<Option<User>> {
    if database.users().count().await? > 0 {
        return Ok(None);
    }
    check_profile("Super", email)?;
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AppError::invalid_input(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters long"
        )));
    }

    let request = CreateUserRequest {
        first_name: "Super".to_owned(),
        last_name: "Admin".to_owned(),
        email: email.trim().to_owned(),
        mobile_number: String::new(),
        role: UserRole::SuperAdmin,
        service_center_id: None,
    };
    let mut user = database.users().create(&request).await?;
    let password_hash = hash_password(password.to_owned()).await?;
    database.users().set_password_hash(user.id, &password_hash).await?;
    user.password_hash = Some(password_hash);

    info!(user_id = user.id, email = %user.email, "Bootstrapped first SuperAdmin");
    Ok(Some(user))
}

/// Minimal shape check: one `@` with text on both sides and a dot in the domain
#[must_use]
pub fn is_plausible_email(email: &str) -> bool {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}
