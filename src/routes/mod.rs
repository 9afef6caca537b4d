// ABOUTME: Route module organization for the CouponHub HTTP API
// ABOUTME: Groups handlers by domain and provides shared authentication and response helpers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 CouponHub Contributors

//! Route module for the CouponHub API
//!
//! Each domain module exposes a `XxxRoutes::routes(resources)` router with thin
//! handlers that authenticate, delegate to managers or services and map the result
//! to a JSON response.

/// Login and password setup routes
pub mod auth;
/// Coupon and redemption-by-coupon routes
pub mod coupons;
/// Customer routes
pub mod customers;
/// Dashboard statistics and widgets routes
pub mod dashboard;
/// Health, readiness and banner routes
pub mod health;
/// Invoice routes
pub mod invoices;
/// Service redemption routes
pub mod redemptions;
/// Service center routes
pub mod service_centers;
/// Staff user routes
pub mod users;

pub use auth::AuthRoutes;
pub use coupons::CouponRoutes;
pub use customers::CustomerRoutes;
pub use dashboard::DashboardRoutes;
pub use health::HealthRoutes;
pub use invoices::InvoiceRoutes;
pub use redemptions::RedemptionRoutes;
pub use service_centers::ServiceCenterRoutes;
pub use users::UserRoutes;

use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::auth::AuthUser;
use crate::errors::{AppError, AppResult};
use crate::resources::ServerResources;

/// Simple `{"message": "..."}` body
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    /// Human-readable outcome
    pub message: String,
}

/// Build a JSON message response
pub(crate) fn message_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(MessageResponse {
            message: message.into(),
        }),
    )
        .into_response()
}

/// Authenticate the bearer token and require a staff role
pub(crate) fn authenticate_staff(
    resources: &ServerResources,
    headers: &HeaderMap,
) -> AppResult<AuthUser> {
    let user = resources.auth_manager.authenticate(headers)?;
    user.require_staff()?;
    Ok(user)
}

/// Authenticate the bearer token and require the `SuperAdmin` role
pub(crate) fn authenticate_super_admin(
    resources: &ServerResources,
    headers: &HeaderMap,
) -> AppResult<AuthUser> {
    let user = resources.auth_manager.authenticate(headers)?;
    user.require_super_admin()?;
    Ok(user)
}

/// Reject an update whose body names a different record than its path
pub(crate) fn ensure_matching_id(path_id: i64, body_id: Option<i64>) -> AppResult<()> {
    match body_id {
        Some(body_id) if body_id != path_id => Err(AppError::invalid_input("ID mismatch")),
        _ => Ok(()),
    }
}
