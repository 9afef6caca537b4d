// ABOUTME: Health check route handlers for service monitoring and status endpoints
// ABOUTME: Provides the service banner, liveness, database readiness and ping endpoints
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 CouponHub Contributors

//! Health check routes for service monitoring
//!
//! `/health` never touches the database; `/ready` answers 503 until the database
//! responds.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use tracing::warn;

use crate::constants::service_names::{COUPONHUB_API, SERVER_VERSION};
use crate::resources::ServerResources;

/// Health routes implementation
pub struct HealthRoutes;

impl HealthRoutes {
    /// Create all health check routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/", get(Self::handle_banner))
            .route("/health", get(Self::handle_health))
            .route("/ready", get(Self::handle_ready))
            .route("/api/health", get(Self::handle_health))
            .route("/api/health/ping", get(Self::handle_ping))
            .with_state(resources)
    }

    async fn handle_banner() -> Json<serde_json::Value> {
        Json(json!({
            "service": COUPONHUB_API,
            "version": SERVER_VERSION,
            "message": "CouponHub API is running",
        }))
    }

    async fn handle_health() -> Json<serde_json::Value> {
        Json(json!({
            "status": "healthy",
            "service": COUPONHUB_API,
            "version": SERVER_VERSION,
            "timestamp": chrono::Utc::now().to_rfc3339()
        }))
    }

    async fn handle_ping() -> Json<serde_json::Value> {
        Json(json!({
            "message": "pong",
            "timestamp": chrono::Utc::now().to_rfc3339()
        }))
    }

    async fn handle_ready(State(resources): State<Arc<ServerResources>>) -> Response {
        match resources.database.ping().await {
            Ok(()) => (
                StatusCode::OK,
                Json(json!({
                    "status": "ready",
                    "database": "connected",
                    "timestamp": chrono::Utc::now().to_rfc3339()
                })),
            )
                .into_response(),
            Err(e) => {
                warn!(error = %e, "Readiness check failed");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    Json(json!({
                        "status": "not_ready",
                        "database": "unavailable",
                        "timestamp": chrono::Utc::now().to_rfc3339()
                    })),
                )
                    .into_response()
            }
        }
    }
}
