// ABOUTME: HTTP server assembly for the CouponHub API
// ABOUTME: Merges every route group, applies the tower-http layer stack and serves with graceful shutdown
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 CouponHub Contributors

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::extract::Request;
use axum::http::StatusCode;
use axum::middleware::from_fn;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::constants::defaults::{MAX_REQUEST_BODY_BYTES, REQUEST_TIMEOUT_SECS};
use crate::middleware::{create_request_span, request_id_middleware, setup_cors};
use crate::resources::ServerResources;
use crate::routes::{
    AuthRoutes, CouponRoutes, CustomerRoutes, DashboardRoutes, HealthRoutes, InvoiceRoutes,
    RedemptionRoutes, ServiceCenterRoutes, UserRoutes,
};

/// Build the complete application router
///
/// Layers run outermost first: trace span, request id, CORS, timeout, body limit.
pub fn build_router(resources: Arc<ServerResources>) -> Router {
    let cors = setup_cors(&resources.config);

    Router::new()
        .merge(HealthRoutes::routes(resources.clone()))
        .merge(AuthRoutes::routes(resources.clone()))
        .merge(UserRoutes::routes(resources.clone()))
        .merge(CustomerRoutes::routes(resources.clone()))
        .merge(ServiceCenterRoutes::routes(resources.clone()))
        .merge(CouponRoutes::routes(resources.clone()))
        .merge(RedemptionRoutes::routes(resources.clone()))
        .merge(InvoiceRoutes::routes(resources.clone()))
        .merge(DashboardRoutes::routes(resources))
        .layer(RequestBodyLimitLayer::new(MAX_REQUEST_BODY_BYTES))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::GATEWAY_TIMEOUT,
            Duration::from_secs(REQUEST_TIMEOUT_SECS),
        ))
        .layer(cors)
        .layer(from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request| {
            create_request_span(request.method().as_str(), request.uri().path())
        }))
}

/// Bind `HOST:HTTP_PORT` and serve until Ctrl-C or SIGTERM
///
/// # Errors
///
/// Returns an error if the address is invalid, the port cannot be bound or the
/// server fails
pub async fn run(resources: Arc<ServerResources>) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", resources.config.host, resources.config.http_port)
        .parse()
        .with_context(|| {
            format!(
                "Invalid bind address {}:{}",
                resources.config.host, resources.config.http_port
            )
        })?;

    let router = build_router(resources);
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("HTTP server listening on {addr}");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("HTTP server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl-C, shutting down gracefully"),
        () = terminate => info!("Received SIGTERM, shutting down gracefully"),
    }
}
