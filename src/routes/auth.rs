// ABOUTME: Authentication route handlers for staff login and password setup
// ABOUTME: Issues JWTs and drives the token-based set-password and forgot-password flows
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 CouponHub Contributors

//! Authentication routes
//!
//! These are the only `/api` endpoints that accept anonymous callers.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::auth::verify_password;
use crate::errors::{AppError, AppResult};
use crate::logging::AppLogger;
use crate::models::User;
use crate::resources::ServerResources;
use crate::routes::message_response;
use crate::services::password_setup::{self, TokenOwner};

const INVALID_CREDENTIALS: &str = "Invalid email or password";

/// Login request body
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    /// Account email
    pub email: String,
    /// Plain text password
    pub password: String,
}

/// Successful login
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    /// Bearer token for subsequent requests
    pub token: String,
    /// Token lifetime in seconds
    pub expires_in: i64,
    /// Authenticated user
    pub user: User,
}

/// Body carrying a setup or reset token
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRequest {
    /// Token from the emailed link
    pub token: String,
}

/// Token validation result
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenValidationResponse {
    /// Always true; invalid tokens answer 400
    pub is_valid: bool,
    /// Owner of the token
    pub user: TokenOwner,
}

/// Set-password request body
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetPasswordRequest {
    /// Token from the emailed link
    pub token: String,
    /// New password
    pub password: String,
}

/// Forgot-password request body
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForgotPasswordRequest {
    /// Account email
    pub email: String,
}

/// Authentication routes implementation
pub struct AuthRoutes;

impl AuthRoutes {
    /// Create all authentication routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/api/auth/login", post(Self::handle_login))
            .route(
                "/api/auth/validate-setup-token",
                post(Self::handle_validate_setup_token),
            )
            .route("/api/auth/set-password", post(Self::handle_set_password))
            .route(
                "/api/auth/forgot-password",
                post(Self::handle_forgot_password),
            )
            .with_state(resources)
    }

    /// Exchange email and password for a JWT
    async fn handle_login(
        State(resources): State<Arc<ServerResources>>,
        Json(request): Json<LoginRequest>,
    ) -> Result<Response, AppError> {
        let user = Self::check_credentials(&resources, &request).await?;
        let token = resources.auth_manager.generate_token(&user)?;
        AppLogger::log_auth_event(&user.email, "login", true);

        let response = LoginResponse {
            token,
            expires_in: resources.auth_manager.token_expiry().num_seconds(),
            user,
        };
        Ok((StatusCode::OK, Json(response)).into_response())
    }

    async fn check_credentials(
        resources: &ServerResources,
        request: &LoginRequest,
    ) -> AppResult<User> {
        let reject = || {
            AppLogger::log_auth_event(&request.email, "login", false);
            AppError::auth_invalid(INVALID_CREDENTIALS)
        };

        let user = resources
            .database
            .users()
            .get_by_email(request.email.trim())
            .await?
            .filter(|u| u.is_active)
            .ok_or_else(reject)?;
        let hash = user.password_hash.clone().ok_or_else(reject)?;

        if verify_password(request.password.clone(), hash).await? {
            Ok(user)
        } else {
            Err(reject())
        }
    }

    async fn handle_validate_setup_token(
        State(resources): State<Arc<ServerResources>>,
        Json(request): Json<TokenRequest>,
    ) -> Result<Response, AppError> {
        let user = password_setup::validate_setup_token(&resources.database, &request.token).await?;
        let response = TokenValidationResponse {
            is_valid: true,
            user,
        };
        Ok((StatusCode::OK, Json(response)).into_response())
    }

    async fn handle_set_password(
        State(resources): State<Arc<ServerResources>>,
        Json(request): Json<SetPasswordRequest>,
    ) -> Result<Response, AppError> {
        password_setup::set_password(
            &resources.database,
            &resources.email,
            &request.token,
            &request.password,
        )
        .await?;
        Ok(message_response(StatusCode::OK, "Password set successfully"))
    }

    async fn handle_forgot_password(
        State(resources): State<Arc<ServerResources>>,
        Json(request): Json<ForgotPasswordRequest>,
    ) -> Result<Response, AppError> {
        let reply =
            password_setup::forgot_password(&resources.database, &resources.email, &request.email)
                .await?;
        Ok(message_response(StatusCode::OK, reply))
    }
}
