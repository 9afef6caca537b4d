// ABOUTME: Staff user management route handlers
// ABOUTME: Lists and searches staff, and lets SuperAdmins create, edit, deactivate and remove them
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 CouponHub Contributors

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::database::{CreateUserRequest, UpdateUserRequest};
use crate::errors::AppError;
use crate::models::User;
use crate::resources::ServerResources;
use crate::routes::{authenticate_staff, authenticate_super_admin};
use crate::services::users as user_service;

/// Query parameters for listing users
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListUsersQuery {
    /// Include deactivated users
    #[serde(default)]
    pub all_users: bool,
}

/// Query parameters for searching users
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchUsersQuery {
    /// Matched against names, email and mobile number
    #[serde(default)]
    pub term: String,
    /// Include deactivated users
    #[serde(default)]
    pub all_users: bool,
}

/// Body for activating or deactivating a user
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStatusRequest {
    /// Desired state
    pub is_active: bool,
}

/// Response for a newly created user
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserResponse {
    /// Created user
    #[serde(flatten)]
    pub user: User,
    /// Whether the password setup email went out
    pub setup_email_sent: bool,
}

/// User routes implementation
pub struct UserRoutes;

impl UserRoutes {
    /// Create all user routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/api/users", get(Self::handle_list).post(Self::handle_create))
            .route("/api/users/search", get(Self::handle_search))
            .route("/api/users/mobile/:mobile", get(Self::handle_get_by_mobile))
            .route(
                "/api/users/:id",
                get(Self::handle_get)
                    .put(Self::handle_update)
                    .delete(Self::handle_delete),
            )
            .route("/api/users/:id/status", patch(Self::handle_set_status))
            .with_state(resources)
    }

    async fn handle_list(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Query(query): Query<ListUsersQuery>,
    ) -> Result<Response, AppError> {
        authenticate_staff(&resources, &headers)?;
        let users = resources.database.users().list(query.all_users).await?;
        Ok((StatusCode::OK, Json(users)).into_response())
    }

    async fn handle_search(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Query(query): Query<SearchUsersQuery>,
    ) -> Result<Response, AppError> {
        authenticate_staff(&resources, &headers)?;
        let users = resources
            .database
            .users()
            .search(query.term.trim(), query.all_users)
            .await?;
        Ok((StatusCode::OK, Json(users)).into_response())
    }

    async fn handle_get(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(id): Path<i64>,
    ) -> Result<Response, AppError> {
        authenticate_staff(&resources, &headers)?;
        let user = resources
            .database
            .users()
            .get_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("User with ID {id} not found")))?;
        Ok((StatusCode::OK, Json(user)).into_response())
    }

    async fn handle_get_by_mobile(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(mobile): Path<String>,
    ) -> Result<Response, AppError> {
        authenticate_staff(&resources, &headers)?;
        let user = resources
            .database
            .users()
            .get_by_mobile(&mobile)
            .await?
            .ok_or_else(|| {
                AppError::not_found(format!("User with mobile number {mobile} not found"))
            })?;
        Ok((StatusCode::OK, Json(user)).into_response())
    }

    async fn handle_create(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Json(request): Json<CreateUserRequest>,
    ) -> Result<Response, AppError> {
        let caller = authenticate_super_admin(&resources, &headers)?;
        let created =
            user_service::create_user(&resources.database, &resources.email, &request).await?;
        info!(
            created_by = caller.user_id,
            user_id = created.user.id,
            setup_email_sent = created.setup_email_sent,
            "Staff user invited"
        );

        let response = CreateUserResponse {
            user: created.user,
            setup_email_sent: created.setup_email_sent,
        };
        Ok((StatusCode::CREATED, Json(response)).into_response())
    }

    async fn handle_update(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(id): Path<i64>,
        Json(request): Json<UpdateUserRequest>,
    ) -> Result<Response, AppError> {
        authenticate_super_admin(&resources, &headers)?;
        let user = user_service::update_user(&resources.database, id, &request)
            .await?
            .ok_or_else(|| AppError::not_found(format!("User with ID {id} not found")))?;
        Ok((StatusCode::OK, Json(user)).into_response())
    }

    async fn handle_set_status(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(id): Path<i64>,
        Json(request): Json<UserStatusRequest>,
    ) -> Result<Response, AppError> {
        let caller = authenticate_super_admin(&resources, &headers)?;
        if caller.user_id == id && !request.is_active {
            return Err(AppError::invalid_input(
                "You cannot deactivate your own account",
            ));
        }

        let users = resources.database.users();
        if !users.set_status(id, request.is_active).await? {
            return Err(AppError::not_found(format!("User with ID {id} not found")));
        }
        let user = users
            .get_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("User with ID {id} not found")))?;
        Ok((StatusCode::OK, Json(user)).into_response())
    }

    async fn handle_delete(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(id): Path<i64>,
    ) -> Result<Response, AppError> {
        let caller = authenticate_super_admin(&resources, &headers)?;
        if caller.user_id == id {
            return Err(AppError::invalid_input("You cannot delete your own account"));
        }
        if !resources.database.users().delete(id).await? {
            return Err(AppError::not_found(format!("User with ID {id} not found")));
        }
        Ok(StatusCode::NO_CONTENT.into_response())
    }
}
