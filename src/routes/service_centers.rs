// ABOUTME: Service center route handlers
// ABOUTME: Staff can read centers while only SuperAdmins create, rename or remove them
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 CouponHub Contributors

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use tracing::info;

use crate::database::ServiceCenterRequest;
use crate::errors::AppError;
use crate::resources::ServerResources;
use crate::routes::{authenticate_staff, authenticate_super_admin, ensure_matching_id};

fn not_found(id: i64) -> AppError {
    AppError::not_found(format!("Service center with ID {id} not found"))
}

/// Service center routes implementation
pub struct ServiceCenterRoutes;

impl ServiceCenterRoutes {
    /// Create all service center routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route(
                "/api/servicecenters",
                get(Self::handle_list).post(Self::handle_create),
            )
            .route(
                "/api/servicecenters/:id",
                get(Self::handle_get)
                    .put(Self::handle_update)
                    .delete(Self::handle_delete),
            )
            .with_state(resources)
    }

    async fn handle_list(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
    ) -> Result<Response, AppError> {
        authenticate_staff(&resources, &headers)?;
        let centers = resources.database.service_centers().list().await?;
        Ok((StatusCode::OK, Json(centers)).into_response())
    }

    async fn handle_get(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(id): Path<i64>,
    ) -> Result<Response, AppError> {
        authenticate_staff(&resources, &headers)?;
        let center = resources
            .database
            .service_centers()
            .get_by_id(id)
            .await?
            .ok_or_else(|| not_found(id))?;
        Ok((StatusCode::OK, Json(center)).into_response())
    }

    async fn handle_create(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Json(request): Json<ServiceCenterRequest>,
    ) -> Result<Response, AppError> {
        authenticate_super_admin(&resources, &headers)?;
        let center = resources
            .database
            .service_centers()
            .create(&request)
            .await?;
        info!(service_center_id = center.id, name = %center.name, "Service center created");
        Ok((StatusCode::CREATED, Json(center)).into_response())
    }

    async fn handle_update(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(id): Path<i64>,
        Json(request): Json<ServiceCenterRequest>,
    ) -> Result<Response, AppError> {
        authenticate_super_admin(&resources, &headers)?;
        ensure_matching_id(id, request.id)?;
        let center = resources
            .database
            .service_centers()
            .update(id, &request)
            .await?
            .ok_or_else(|| not_found(id))?;
        Ok((StatusCode::OK, Json(center)).into_response())
    }

    async fn handle_delete(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(id): Path<i64>,
    ) -> Result<Response, AppError> {
        authenticate_super_admin(&resources, &headers)?;
        if !resources.database.service_centers().delete(id).await? {
            return Err(not_found(id));
        }
        info!(service_center_id = id, "Service center deleted");
        Ok(StatusCode::NO_CONTENT.into_response())
    }
}
