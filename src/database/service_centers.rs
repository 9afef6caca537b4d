// ABOUTME: Database operations for service centers
// ABOUTME: Plain CRUD; deletion is refused while invoices, redemptions or admins still reference the center
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 CouponHub Contributors

use serde::Deserialize;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};

use crate::errors::{AppError, AppResult, ErrorCode};
use crate::models::ServiceCenter;

/// Request body for creating or updating a service center
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceCenterRequest {
    /// Must match the path id when present on update; ignored on create
    #[serde(default)]
    pub id: Option<i64>,
    /// Display name
    pub name: String,
    /// Street address
    #[serde(default)]
    pub address: String,
    /// Phone number
    #[serde(default)]
    pub contact_number: String,
}

/// Service center database operations manager
pub struct ServiceCentersManager {
    pool: SqlitePool,
}

impl ServiceCentersManager {
    /// Create a new service centers manager
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a service center
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for a blank name, or a database error
    pub async fn create(&self, request: &ServiceCenterRequest) -> AppResult<ServiceCenter> {
        validate(request)?;

        let result = sqlx::query(
            "INSERT INTO service_centers (name, address, contact_number) VALUES ($1, $2, $3)",
        )
        .bind(request.name.trim())
        .bind(&request.address)
        .bind(&request.contact_number)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to create service center: {e}")))?;

        Ok(ServiceCenter {
            id: result.last_insert_rowid(),
            name: request.name.trim().to_owned(),
            address: request.address.clone(),
            contact_number: request.contact_number.clone(),
        })
    }

    /// Get a service center by id
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn get_by_id(&self, id: i64) -> AppResult<Option<ServiceCenter>> {
        let row = sqlx::query(
            "SELECT id, name, address, contact_number FROM service_centers WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to get service center: {e}")))?;

        Ok(row.as_ref().map(row_to_service_center))
    }

    /// List all service centers ordered by name
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn list(&self) -> AppResult<Vec<ServiceCenter>> {
        let rows = sqlx::query(
            "SELECT id, name, address, contact_number FROM service_centers ORDER BY name, id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to list service centers: {e}")))?;

        Ok(rows.iter().map(row_to_service_center).collect())
    }

    /// Update a service center
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for a blank name, or a database error
    pub async fn update(
        &self,
        id: i64,
        request: &ServiceCenterRequest,
    ) -> AppResult<Option<ServiceCenter>> {
        validate(request)?;

        let result = sqlx::query(
            "UPDATE service_centers SET name = $1, address = $2, contact_number = $3 WHERE id = $4",
        )
        .bind(request.name.trim())
        .bind(&request.address)
        .bind(&request.contact_number)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to update service center: {e}")))?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_by_id(id).await
    }

    /// Permanently delete a service center
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` while other records still reference the center
    pub async fn delete(&self, id: i64) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM service_centers WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                let err = AppError::from(e);
                if err.code == ErrorCode::InvalidInput {
                    AppError::invalid_input(format!(
                        "Service center {id} is still referenced by invoices, redemptions or users"
                    ))
                } else {
                    err
                }
            })?;

        Ok(result.rows_affected() > 0)
    }
}

fn validate(request: &ServiceCenterRequest) -> AppResult<()> {
    if request.name.trim().is_empty() {
        return Err(AppError::invalid_input("Service center name is required"));
    }
    Ok(())
}

fn row_to_service_center(row: &SqliteRow) -> ServiceCenter {
    ServiceCenter {
        id: row.get("id"),
        name: row.get("name"),
        address: row.get("address"),
        contact_number: row.get("contact_number"),
    }
}
