// ABOUTME: Service redemption route handlers
// ABOUTME: Maintains redemption records and lists them by customer, center, coupon or invoice
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 CouponHub Contributors

//! Service redemption routes
//!
//! These edit the redemption log directly and never touch coupon usage; redeeming a
//! coupon goes through `POST /api/coupons/redeem`.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};

use crate::database::{CreateRedemptionRequest, UpdateRedemptionRequest};
use crate::errors::AppError;
use crate::resources::ServerResources;
use crate::routes::{authenticate_staff, ensure_matching_id};

fn not_found(id: i64) -> AppError {
    AppError::not_found(format!("Service redemption with ID {id} not found"))
}

/// Redemption routes implementation
pub struct RedemptionRoutes;

impl RedemptionRoutes {
    /// Create all service redemption routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route(
                "/api/serviceredemptions",
                get(Self::handle_list).post(Self::handle_create),
            )
            .route(
                "/api/serviceredemptions/customer/:id",
                get(Self::handle_list_by_customer),
            )
            .route(
                "/api/serviceredemptions/servicecenter/:id",
                get(Self::handle_list_by_service_center),
            )
            .route(
                "/api/serviceredemptions/coupon/:id",
                get(Self::handle_list_by_coupon),
            )
            .route(
                "/api/serviceredemptions/invoice/:id",
                get(Self::handle_list_by_invoice),
            )
            .route(
                "/api/serviceredemptions/:id",
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
        let redemptions = resources.database.redemptions().list_all().await?;
        Ok((StatusCode::OK, Json(redemptions)).into_response())
    }

    async fn handle_list_by_customer(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(id): Path<i64>,
    ) -> Result<Response, AppError> {
        authenticate_staff(&resources, &headers)?;
        let redemptions = resources.database.redemptions().list_by_customer(id).await?;
        Ok((StatusCode::OK, Json(redemptions)).into_response())
    }

    async fn handle_list_by_service_center(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(id): Path<i64>,
    ) -> Result<Response, AppError> {
        authenticate_staff(&resources, &headers)?;
        let redemptions = resources
            .database
            .redemptions()
            .list_by_service_center(id)
            .await?;
        Ok((StatusCode::OK, Json(redemptions)).into_response())
    }

    async fn handle_list_by_coupon(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(id): Path<i64>,
    ) -> Result<Response, AppError> {
        authenticate_staff(&resources, &headers)?;
        let redemptions = resources.database.redemptions().list_by_coupon(id).await?;
        Ok((StatusCode::OK, Json(redemptions)).into_response())
    }

    async fn handle_list_by_invoice(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(id): Path<i64>,
    ) -> Result<Response, AppError> {
        authenticate_staff(&resources, &headers)?;
        let redemptions = resources.database.redemptions().list_by_invoice(id).await?;
        Ok((StatusCode::OK, Json(redemptions)).into_response())
    }

    async fn handle_get(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(id): Path<i64>,
    ) -> Result<Response, AppError> {
        authenticate_staff(&resources, &headers)?;
        let redemption = resources
            .database
            .redemptions()
            .get_by_id(id)
            .await?
            .ok_or_else(|| not_found(id))?;
        Ok((StatusCode::OK, Json(redemption)).into_response())
    }

    async fn handle_create(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Json(request): Json<CreateRedemptionRequest>,
    ) -> Result<Response, AppError> {
        authenticate_staff(&resources, &headers)?;
        let redemption = resources.database.redemptions().create(&request).await?;
        Ok((StatusCode::CREATED, Json(redemption)).into_response())
    }

    async fn handle_update(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(id): Path<i64>,
        Json(request): Json<UpdateRedemptionRequest>,
    ) -> Result<Response, AppError> {
        authenticate_staff(&resources, &headers)?;
        ensure_matching_id(id, request.id)?;
        let redemption = resources
            .database
            .redemptions()
            .update(id, &request)
            .await?
            .ok_or_else(|| not_found(id))?;
        Ok((StatusCode::OK, Json(redemption)).into_response())
    }

    async fn handle_delete(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(id): Path<i64>,
    ) -> Result<Response, AppError> {
        authenticate_staff(&resources, &headers)?;
        if !resources.database.redemptions().delete(id).await? {
            return Err(not_found(id));
        }
        Ok(StatusCode::NO_CONTENT.into_response())
    }
}
