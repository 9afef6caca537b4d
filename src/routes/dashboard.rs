// ABOUTME: Dashboard route handlers for headline statistics and chart widgets
// ABOUTME: Scopes every request through the caller's effective service center before aggregating
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 CouponHub Contributors

//! Dashboard routes
//!
//! Each handler loads one `DashboardSnapshot` for the effective service center and
//! runs the pure aggregations in `services::dashboard` over it.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use tracing::debug;

use crate::constants::dashboard::{DEFAULT_MONTHS, DEFAULT_USAGE_MONTHS};
use crate::errors::{AppError, AppResult};
use crate::resources::ServerResources;
use crate::services::dashboard::{self, clamp_months, DashboardSnapshot};

/// Query parameters shared by the dashboard endpoints
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardQuery {
    /// Narrow a `SuperAdmin` view to one center; ignored for Admins
    #[serde(default)]
    pub service_center_id: Option<i64>,
    /// Months of history, clamped to 1..=36
    #[serde(default)]
    pub months: Option<i64>,
}

/// Dashboard routes implementation
pub struct DashboardRoutes;

impl DashboardRoutes {
    /// Create all dashboard routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/api/dashboard/stats", get(Self::handle_stats))
            .route("/api/dashboard/widgets", get(Self::handle_widgets))
            .route("/api/dashboard/sales-trends", get(Self::handle_sales_trends))
            .route(
                "/api/dashboard/service-centers",
                get(Self::handle_service_centers),
            )
            .route("/api/dashboard/coupon-usage", get(Self::handle_coupon_usage))
            .with_state(resources)
    }

    /// Authenticate and load the rows visible to the caller
    async fn scoped_snapshot(
        resources: &ServerResources,
        headers: &HeaderMap,
        query: &DashboardQuery,
    ) -> AppResult<(Option<i64>, DashboardSnapshot)> {
        let caller = resources.auth_manager.authenticate(headers)?;
        let service_center_id = caller.effective_service_center_id(query.service_center_id)?;
        debug!(
            user_id = caller.user_id,
            service_center_id = ?service_center_id,
            "Loading dashboard snapshot"
        );
        let snapshot = DashboardSnapshot::load(&resources.database, service_center_id).await?;
        Ok((service_center_id, snapshot))
    }

    async fn handle_stats(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Query(query): Query<DashboardQuery>,
    ) -> Result<Response, AppError> {
        let (_, snapshot) = Self::scoped_snapshot(&resources, &headers, &query).await?;
        let stats = dashboard::stats(&snapshot, Utc::now());
        Ok((StatusCode::OK, Json(stats)).into_response())
    }

    async fn handle_widgets(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Query(query): Query<DashboardQuery>,
    ) -> Result<Response, AppError> {
        let (service_center_id, snapshot) =
            Self::scoped_snapshot(&resources, &headers, &query).await?;
        let months = clamp_months(query.months, DEFAULT_MONTHS);
        let widgets = dashboard::widgets(&snapshot, service_center_id, months, Utc::now());
        Ok((StatusCode::OK, Json(widgets)).into_response())
    }

    async fn handle_sales_trends(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Query(query): Query<DashboardQuery>,
    ) -> Result<Response, AppError> {
        let (_, snapshot) = Self::scoped_snapshot(&resources, &headers, &query).await?;
        let months = clamp_months(query.months, DEFAULT_MONTHS);
        let trends = dashboard::sales_trends(&snapshot, months, Utc::now());
        Ok((StatusCode::OK, Json(trends)).into_response())
    }

    async fn handle_service_centers(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Query(query): Query<DashboardQuery>,
    ) -> Result<Response, AppError> {
        let (_, snapshot) = Self::scoped_snapshot(&resources, &headers, &query).await?;
        let months = clamp_months(query.months, DEFAULT_MONTHS);
        let stats = dashboard::service_center_stats(&snapshot, months, Utc::now());
        Ok((StatusCode::OK, Json(stats)).into_response())
    }

    async fn handle_coupon_usage(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Query(query): Query<DashboardQuery>,
    ) -> Result<Response, AppError> {
        let (_, snapshot) = Self::scoped_snapshot(&resources, &headers, &query).await?;
        let months = clamp_months(query.months, DEFAULT_USAGE_MONTHS);
        let usage = dashboard::coupon_usage_monthly(&snapshot, months, Utc::now());
        Ok((StatusCode::OK, Json(usage)).into_response())
    }
}
