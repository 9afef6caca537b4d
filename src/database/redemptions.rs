// ABOUTME: Database operations for service redemption records
// ABOUTME: CRUD plus listings by customer, service center, coupon and invoice with display names joined in
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 CouponHub Contributors

use chrono::Utc;
use serde::Deserialize;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};

use super::{format_timestamp, join_name, parse_timestamp};
use crate::errors::{AppError, AppResult};
use crate::models::ServiceRedemption;

const REDEMPTION_SELECT: &str = r"
    SELECT r.id, r.coupon_id, r.service_center_id, r.customer_id, r.redemption_date,
           r.notes, r.invoice_id,
           cp.coupon_code,
           sc.name AS service_center_name,
           c.first_name AS customer_first_name, c.last_name AS customer_last_name,
           i.invoice_number
    FROM service_redemptions r
    LEFT JOIN coupons cp ON cp.id = r.coupon_id
    LEFT JOIN service_centers sc ON sc.id = r.service_center_id
    LEFT JOIN customers c ON c.id = r.customer_id
    LEFT JOIN invoices i ON i.id = r.invoice_id
";

/// Request to record a redemption directly, without touching coupon usage
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRedemptionRequest {
    /// Redeemed coupon
    pub coupon_id: i64,
    /// Service center where the service happened
    pub service_center_id: i64,
    /// Customer who used the service
    pub customer_id: i64,
    /// Free-form notes
    #[serde(default)]
    pub notes: String,
    /// Invoice covering the service
    #[serde(default)]
    pub invoice_id: Option<i64>,
}

/// Request to update a redemption; the redemption date is kept
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRedemptionRequest {
    /// Must match the path id when present
    #[serde(default)]
    pub id: Option<i64>,
    /// Redeemed coupon
    pub coupon_id: i64,
    /// Service center where the service happened
    pub service_center_id: i64,
    /// Customer who used the service
    pub customer_id: i64,
    /// Free-form notes
    #[serde(default)]
    pub notes: String,
    /// Invoice covering the service
    #[serde(default)]
    pub invoice_id: Option<i64>,
}

/// Service redemption database operations manager
pub struct RedemptionsManager {
    pool: SqlitePool,
}

impl RedemptionsManager {
    /// Create a new redemptions manager
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Record a redemption dated now
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` when a referenced record does not exist
    pub async fn create(&self, request: &CreateRedemptionRequest) -> AppResult<ServiceRedemption> {
        let result = sqlx::query(
            r"
            INSERT INTO service_redemptions (
                coupon_id, service_center_id, customer_id, redemption_date, notes, invoice_id
            ) VALUES ($1, $2, $3, $4, $5, $6)
            ",
        )
        .bind(request.coupon_id)
        .bind(request.service_center_id)
        .bind(request.customer_id)
        .bind(format_timestamp(Utc::now()))
        .bind(&request.notes)
        .bind(request.invoice_id)
        .execute(&self.pool)
        .await
        .map_err(AppError::from)?;

        let id = result.last_insert_rowid();
        self.get_by_id(id)
            .await?
            .ok_or_else(|| AppError::internal(format!("Redemption {id} vanished after insert")))
    }

    /// Get a redemption by id
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn get_by_id(&self, id: i64) -> AppResult<Option<ServiceRedemption>> {
        let sql = format!("{REDEMPTION_SELECT} WHERE r.id = $1");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to get redemption: {e}")))?;

        row.map(|r| row_to_redemption(&r)).transpose()
    }

    /// List every redemption, newest first
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn list_all(&self) -> AppResult<Vec<ServiceRedemption>> {
        self.list_where("1 = 1", None).await
    }

    /// List a customer's redemptions, newest first
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn list_by_customer(&self, customer_id: i64) -> AppResult<Vec<ServiceRedemption>> {
        self.list_where("r.customer_id = $1", Some(customer_id))
            .await
    }

    /// List redemptions fulfilled by a service center, newest first
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn list_by_service_center(
        &self,
        service_center_id: i64,
    ) -> AppResult<Vec<ServiceRedemption>> {
        self.list_where("r.service_center_id = $1", Some(service_center_id))
            .await
    }

    /// List redemptions of one coupon, newest first
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn list_by_coupon(&self, coupon_id: i64) -> AppResult<Vec<ServiceRedemption>> {
        self.list_where("r.coupon_id = $1", Some(coupon_id)).await
    }

    /// List redemptions billed on one invoice, newest first
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn list_by_invoice(&self, invoice_id: i64) -> AppResult<Vec<ServiceRedemption>> {
        self.list_where("r.invoice_id = $1", Some(invoice_id)).await
    }

    async fn list_where(
        &self,
        condition: &str,
        param: Option<i64>,
    ) -> AppResult<Vec<ServiceRedemption>> {
        let sql = format!(
            "{REDEMPTION_SELECT} WHERE {condition} ORDER BY r.redemption_date DESC, r.id DESC"
        );
        let mut query = sqlx::query(&sql);
        if let Some(value) = param {
            query = query.bind(value);
        }
        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to list redemptions: {e}")))?;

        rows.iter().map(row_to_redemption).collect()
    }

    /// Update a redemption's references and notes
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` when a referenced record does not exist
    pub async fn update(
        &self,
        id: i64,
        request: &UpdateRedemptionRequest,
    ) -> AppResult<Option<ServiceRedemption>> {
        let result = sqlx::query(
            r"
            UPDATE service_redemptions
            SET coupon_id = $1, service_center_id = $2, customer_id = $3, notes = $4,
                invoice_id = $5
            WHERE id = $6
            ",
        )
        .bind(request.coupon_id)
        .bind(request.service_center_id)
        .bind(request.customer_id)
        .bind(&request.notes)
        .bind(request.invoice_id)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(AppError::from)?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_by_id(id).await
    }

    /// Permanently delete a redemption
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn delete(&self, id: i64) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM service_redemptions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to delete redemption: {e}")))?;

        Ok(result.rows_affected() > 0)
    }
}

fn row_to_redemption(row: &SqliteRow) -> AppResult<ServiceRedemption> {
    let redemption_date_str: String = row.get("redemption_date");
    let coupon_code: Option<String> = row.get("coupon_code");
    let service_center_name: Option<String> = row.get("service_center_name");

    Ok(ServiceRedemption {
        id: row.get("id"),
        coupon_id: row.get("coupon_id"),
        coupon_code: coupon_code.unwrap_or_default(),
        service_center_id: row.get("service_center_id"),
        service_center_name: service_center_name.unwrap_or_default(),
        customer_id: row.get("customer_id"),
        customer_name: join_name(
            row.get("customer_first_name"),
            row.get("customer_last_name"),
        ),
        redemption_date: parse_timestamp(&redemption_date_str)?,
        notes: row.get("notes"),
        invoice_id: row.get("invoice_id"),
        invoice_number: row.get("invoice_number"),
    })
}
