// ABOUTME: Coupon route handlers including redemption at a service center
// ABOUTME: Exposes coupon CRUD, status listings, validity checks and the atomic redeem endpoint
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 CouponHub Contributors

//! Coupon routes
//!
//! Responses carry the derived `remainingServices` and `isValid` fields next to the
//! stored coupon so the frontend never recomputes them.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::database::{CreateCouponRequest, RedemptionOutcome, UpdateCouponRequest};
use crate::errors::AppError;
use crate::models::Coupon;
use crate::resources::ServerResources;
use crate::routes::{authenticate_staff, ensure_matching_id};

fn not_found(id: i64) -> AppError {
    AppError::not_found(format!("Coupon with ID {id} not found"))
}

/// Coupon with derived fields
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponResponse {
    /// Stored coupon
    #[serde(flatten)]
    pub coupon: Coupon,
    /// Services still available
    pub remaining_services: i64,
    /// Whether the coupon can be redeemed right now
    pub is_valid: bool,
}

impl From<Coupon> for CouponResponse {
    fn from(coupon: Coupon) -> Self {
        Self {
            remaining_services: coupon.remaining_services(),
            is_valid: coupon.is_valid_at(Utc::now()),
            coupon,
        }
    }
}

fn to_responses(coupons: Vec<Coupon>) -> Vec<CouponResponse> {
    coupons.into_iter().map(CouponResponse::from).collect()
}

/// Redeem request body
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedeemCouponRequest {
    /// Coupon to redeem
    pub coupon_id: i64,
    /// Center performing the service; ignored for Admins
    #[serde(default)]
    pub service_center_id: Option<i64>,
    /// Customer using the service, defaults to the coupon owner
    #[serde(default)]
    pub customer_id: Option<i64>,
    /// Staff notes
    #[serde(default)]
    pub notes: String,
}

/// Redeem response body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RedeemCouponResponse {
    /// Human-readable outcome
    pub message: &'static str,
    /// Coupon state after redemption
    #[serde(flatten)]
    pub outcome: RedemptionOutcome,
}

/// Validity check response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponValidityResponse {
    /// Whether the coupon can be redeemed right now
    pub is_valid: bool,
}

/// Coupon routes implementation
pub struct CouponRoutes;

impl CouponRoutes {
    /// Create all coupon routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route(
                "/api/coupons",
                get(Self::handle_list).post(Self::handle_create),
            )
            .route("/api/coupons/active", get(Self::handle_list_active))
            .route("/api/coupons/unassigned", get(Self::handle_list_unassigned))
            .route("/api/coupons/expired", get(Self::handle_list_expired))
            .route("/api/coupons/redeem", post(Self::handle_redeem))
            .route("/api/coupons/code/:code", get(Self::handle_get_by_code))
            .route(
                "/api/coupons/customer/:customer_id",
                get(Self::handle_list_by_customer),
            )
            .route(
                "/api/coupons/:id",
                get(Self::handle_get)
                    .put(Self::handle_update)
                    .delete(Self::handle_delete),
            )
            .route("/api/coupons/:id/validate", get(Self::handle_validate))
            .with_state(resources)
    }

    async fn handle_list(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
    ) -> Result<Response, AppError> {
        authenticate_staff(&resources, &headers)?;
        let coupons = resources.database.coupons().list_all().await?;
        Ok((StatusCode::OK, Json(to_responses(coupons))).into_response())
    }

    async fn handle_list_active(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
    ) -> Result<Response, AppError> {
        authenticate_staff(&resources, &headers)?;
        let coupons = resources.database.coupons().list_active().await?;
        Ok((StatusCode::OK, Json(to_responses(coupons))).into_response())
    }

    async fn handle_list_unassigned(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
    ) -> Result<Response, AppError> {
        authenticate_staff(&resources, &headers)?;
        let coupons = resources.database.coupons().list_unassigned().await?;
        Ok((StatusCode::OK, Json(to_responses(coupons))).into_response())
    }

    async fn handle_list_expired(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
    ) -> Result<Response, AppError> {
        authenticate_staff(&resources, &headers)?;
        let coupons = resources.database.coupons().list_expired().await?;
        Ok((StatusCode::OK, Json(to_responses(coupons))).into_response())
    }

    async fn handle_list_by_customer(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(customer_id): Path<i64>,
    ) -> Result<Response, AppError> {
        authenticate_staff(&resources, &headers)?;
        let coupons = resources
            .database
            .coupons()
            .list_by_customer(customer_id)
            .await?;
        Ok((StatusCode::OK, Json(to_responses(coupons))).into_response())
    }

    async fn handle_get(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(id): Path<i64>,
    ) -> Result<Response, AppError> {
        authenticate_staff(&resources, &headers)?;
        let coupon = resources
            .database
            .coupons()
            .get_by_id(id)
            .await?
            .ok_or_else(|| not_found(id))?;
        Ok((StatusCode::OK, Json(CouponResponse::from(coupon))).into_response())
    }

    async fn handle_get_by_code(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(code): Path<String>,
    ) -> Result<Response, AppError> {
        authenticate_staff(&resources, &headers)?;
        let coupon = resources
            .database
            .coupons()
            .get_by_code(&code)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Coupon with code {code} not found")))?;
        Ok((StatusCode::OK, Json(CouponResponse::from(coupon))).into_response())
    }

    async fn handle_create(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Json(request): Json<CreateCouponRequest>,
    ) -> Result<Response, AppError> {
        authenticate_staff(&resources, &headers)?;
        let coupon = resources.database.coupons().create(&request).await?;
        Ok((StatusCode::CREATED, Json(CouponResponse::from(coupon))).into_response())
    }

    async fn handle_update(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(id): Path<i64>,
        Json(request): Json<UpdateCouponRequest>,
    ) -> Result<Response, AppError> {
        authenticate_staff(&resources, &headers)?;
        ensure_matching_id(id, request.id)?;
        let coupon = resources
            .database
            .coupons()
            .update(id, &request)
            .await?
            .ok_or_else(|| not_found(id))?;
        Ok((StatusCode::OK, Json(CouponResponse::from(coupon))).into_response())
    }

    async fn handle_delete(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(id): Path<i64>,
    ) -> Result<Response, AppError> {
        authenticate_staff(&resources, &headers)?;
        if !resources.database.coupons().delete(id).await? {
            return Err(not_found(id));
        }
        Ok(StatusCode::NO_CONTENT.into_response())
    }

    async fn handle_validate(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(id): Path<i64>,
    ) -> Result<Response, AppError> {
        authenticate_staff(&resources, &headers)?;
        let is_valid = resources.database.coupons().is_valid(id).await?;
        Ok((StatusCode::OK, Json(CouponValidityResponse { is_valid })).into_response())
    }

    /// Redeem one service from a coupon
    ///
    /// Admins always redeem at their own center; a `SuperAdmin` must name one.
    async fn handle_redeem(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Json(request): Json<RedeemCouponRequest>,
    ) -> Result<Response, AppError> {
        let caller = authenticate_staff(&resources, &headers)?;
        let service_center_id = caller
            .effective_service_center_id(request.service_center_id)?
            .ok_or_else(|| AppError::invalid_input("serviceCenterId is required"))?;

        let coupons = resources.database.coupons();
        let coupon = coupons
            .get_by_id(request.coupon_id)
            .await?
            .ok_or_else(|| not_found(request.coupon_id))?;
        let customer_id = match request.customer_id {
            Some(id) if id != coupon.customer_id => {
                return Err(AppError::invalid_input(format!(
                    "Coupon {} does not belong to customer {id}",
                    coupon.coupon_code
                )));
            }
            Some(id) => id,
            None => coupon.customer_id,
        };

        let outcome = coupons
            .redeem(coupon.id, service_center_id, customer_id, &request.notes)
            .await?;
        info!(
            redeemed_by = caller.user_id,
            coupon_id = outcome.coupon_id,
            redemption_id = outcome.redemption_id,
            "Coupon redeemed"
        );

        let response = RedeemCouponResponse {
            message: "Coupon redeemed successfully",
            outcome,
        };
        Ok((StatusCode::OK, Json(response)).into_response())
    }
}
