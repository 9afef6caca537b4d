// ABOUTME: Invoice route handlers
// ABOUTME: Issues numbered invoices, tracks payment state and soft-deletes invoices
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 CouponHub Contributors

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};

use crate::database::{CreateInvoiceRequest, UpdateInvoiceRequest};
use crate::errors::AppError;
use crate::resources::ServerResources;
use crate::routes::{authenticate_staff, ensure_matching_id};

fn not_found(id: i64) -> AppError {
    AppError::not_found(format!("Invoice with ID {id} not found"))
}

/// Invoice routes implementation
pub struct InvoiceRoutes;

impl InvoiceRoutes {
    /// Create all invoice routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route(
                "/api/invoices",
                get(Self::handle_list).post(Self::handle_create),
            )
            .route("/api/invoices/number/:number", get(Self::handle_get_by_number))
            .route(
                "/api/invoices/customer/:id",
                get(Self::handle_list_by_customer),
            )
            .route(
                "/api/invoices/servicecenter/:id",
                get(Self::handle_list_by_service_center),
            )
            .route(
                "/api/invoices/:id",
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
        let invoices = resources.database.invoices().list_all().await?;
        Ok((StatusCode::OK, Json(invoices)).into_response())
    }

    async fn handle_list_by_customer(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(id): Path<i64>,
    ) -> Result<Response, AppError> {
        authenticate_staff(&resources, &headers)?;
        let invoices = resources.database.invoices().list_by_customer(id).await?;
        Ok((StatusCode::OK, Json(invoices)).into_response())
    }

    async fn handle_list_by_service_center(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(id): Path<i64>,
    ) -> Result<Response, AppError> {
        authenticate_staff(&resources, &headers)?;
        let invoices = resources
            .database
            .invoices()
            .list_by_service_center(id)
            .await?;
        Ok((StatusCode::OK, Json(invoices)).into_response())
    }

    async fn handle_get(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(id): Path<i64>,
    ) -> Result<Response, AppError> {
        authenticate_staff(&resources, &headers)?;
        let invoice = resources
            .database
            .invoices()
            .get_by_id(id)
            .await?
            .ok_or_else(|| not_found(id))?;
        Ok((StatusCode::OK, Json(invoice)).into_response())
    }

    async fn handle_get_by_number(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(number): Path<String>,
    ) -> Result<Response, AppError> {
        authenticate_staff(&resources, &headers)?;
        let invoice = resources
            .database
            .invoices()
            .get_by_number(&number)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Invoice with number {number} not found")))?;
        Ok((StatusCode::OK, Json(invoice)).into_response())
    }

    async fn handle_create(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Json(request): Json<CreateInvoiceRequest>,
    ) -> Result<Response, AppError> {
        authenticate_staff(&resources, &headers)?;
        let invoice = resources.database.invoices().create(&request).await?;
        Ok((StatusCode::CREATED, Json(invoice)).into_response())
    }

    async fn handle_update(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(id): Path<i64>,
        Json(request): Json<UpdateInvoiceRequest>,
    ) -> Result<Response, AppError> {
        authenticate_staff(&resources, &headers)?;
        ensure_matching_id(id, request.id)?;
        let invoice = resources
            .database
            .invoices()
            .update(id, &request)
            .await?
            .ok_or_else(|| not_found(id))?;
        Ok((StatusCode::OK, Json(invoice)).into_response())
    }

    async fn handle_delete(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(id): Path<i64>,
    ) -> Result<Response, AppError> {
        authenticate_staff(&resources, &headers)?;
        if !resources.database.invoices().delete(id).await? {
            return Err(not_found(id));
        }
        Ok(StatusCode::NO_CONTENT.into_response())
    }
}
