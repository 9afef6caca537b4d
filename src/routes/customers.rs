// ABOUTME: Customer route handlers for the staff back office
// ABOUTME: Creates, looks up, edits, soft-deletes and re-activates customers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 CouponHub Contributors

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::database::{CreateCustomerRequest, UpdateCustomerRequest};
use crate::errors::{AppError, AppResult};
use crate::resources::ServerResources;
use crate::routes::{authenticate_staff, message_response};

fn not_found(id: i64) -> AppError {
    AppError::not_found(format!("Customer with ID {id} not found"))
}

fn require_first_name(first_name: &str) -> AppResult<()> {
    if first_name.trim().is_empty() {
        return Err(AppError::invalid_input("First name is required"));
    }
    Ok(())
}

/// Customer routes implementation
pub struct CustomerRoutes;

impl CustomerRoutes {
    /// Create all customer routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route(
                "/api/customers",
                get(Self::handle_list).post(Self::handle_create),
            )
            .route(
                "/api/customers/mobile/:mobile",
                get(Self::handle_get_by_mobile),
            )
            .route("/api/customers/email/:email", get(Self::handle_get_by_email))
            .route(
                "/api/customers/:id",
                get(Self::handle_get)
                    .put(Self::handle_update)
                    .delete(Self::handle_delete),
            )
            .route("/api/customers/:id/activate", post(Self::handle_activate))
            .route(
                "/api/customers/:id/deactivate",
                post(Self::handle_deactivate),
            )
            .with_state(resources)
    }

    async fn handle_list(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
    ) -> Result<Response, AppError> {
        authenticate_staff(&resources, &headers)?;
        let customers = resources.database.customers().list().await?;
        Ok((StatusCode::OK, Json(customers)).into_response())
    }

    async fn handle_get(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(id): Path<i64>,
    ) -> Result<Response, AppError> {
        authenticate_staff(&resources, &headers)?;
        let customer = resources
            .database
            .customers()
            .get_by_id(id)
            .await?
            .ok_or_else(|| not_found(id))?;
        Ok((StatusCode::OK, Json(customer)).into_response())
    }

    async fn handle_get_by_mobile(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(mobile): Path<String>,
    ) -> Result<Response, AppError> {
        authenticate_staff(&resources, &headers)?;
        let customer = resources
            .database
            .customers()
            .get_by_mobile(&mobile)
            .await?
            .ok_or_else(|| {
                AppError::not_found(format!("Customer with mobile number {mobile} not found"))
            })?;
        Ok((StatusCode::OK, Json(customer)).into_response())
    }

    async fn handle_get_by_email(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(email): Path<String>,
    ) -> Result<Response, AppError> {
        authenticate_staff(&resources, &headers)?;
        let customer = resources
            .database
            .customers()
            .get_by_email(&email)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Customer with email {email} not found")))?;
        Ok((StatusCode::OK, Json(customer)).into_response())
    }

    async fn handle_create(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Json(request): Json<CreateCustomerRequest>,
    ) -> Result<Response, AppError> {
        authenticate_staff(&resources, &headers)?;
        require_first_name(&request.first_name)?;
        let customer = resources.database.customers().create(&request).await?;
        Ok((StatusCode::CREATED, Json(customer)).into_response())
    }

    async fn handle_update(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(id): Path<i64>,
        Json(request): Json<UpdateCustomerRequest>,
    ) -> Result<Response, AppError> {
        authenticate_staff(&resources, &headers)?;
        if request.id != id {
            return Err(AppError::invalid_input("ID mismatch"));
        }
        require_first_name(&request.first_name)?;
        let customer = resources
            .database
            .customers()
            .update(id, &request)
            .await?
            .ok_or_else(|| not_found(id))?;
        Ok((StatusCode::OK, Json(customer)).into_response())
    }

    async fn handle_delete(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(id): Path<i64>,
    ) -> Result<Response, AppError> {
        authenticate_staff(&resources, &headers)?;
        if !resources.database.customers().delete(id).await? {
            return Err(not_found(id));
        }
        Ok(StatusCode::NO_CONTENT.into_response())
    }

    async fn handle_activate(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(id): Path<i64>,
    ) -> Result<Response, AppError> {
        authenticate_staff(&resources, &headers)?;
        if !resources.database.customers().activate(id).await? {
            return Err(not_found(id));
        }
        Ok(message_response(StatusCode::OK, "Customer activated"))
    }

    async fn handle_deactivate(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(id): Path<i64>,
    ) -> Result<Response, AppError> {
        authenticate_staff(&resources, &headers)?;
        if !resources.database.customers().deactivate(id).await? {
            return Err(not_found(id));
        }
        Ok(message_response(StatusCode::OK, "Customer deactivated"))
    }
}
