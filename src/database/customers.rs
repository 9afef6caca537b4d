// ABOUTME: Database operations for customers who buy and redeem coupons
// ABOUTME: Handles CRUD, lookups by mobile/email and soft activation with coupon and invoice counts
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 CouponHub Contributors

use chrono::Utc;
use serde::Deserialize;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};

use super::{format_timestamp, parse_timestamp};
use crate::errors::{AppError, AppResult};
use crate::models::Customer;

const CUSTOMER_SELECT: &str = r"
    SELECT c.id, c.first_name, c.last_name, c.email, c.mobile_number, c.google_id,
           c.created_at, c.is_active,
           (SELECT COUNT(*) FROM coupons cp WHERE cp.customer_id = c.id) AS coupon_count,
           (SELECT COUNT(*) FROM invoices i
             WHERE i.customer_id = c.id AND i.is_deleted = 0) AS invoice_count
    FROM customers c
";

/// Request to create a customer
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCustomerRequest {
    /// Given name
    pub first_name: String,
    /// Family name
    #[serde(default)]
    pub last_name: String,
    /// Contact email
    #[serde(default)]
    pub email: String,
    /// Contact number
    #[serde(default)]
    pub mobile_number: String,
}

/// Request to update a customer; `id` must match the path
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCustomerRequest {
    /// Customer id, checked against the url
    pub id: i64,
    /// Given name
    pub first_name: String,
    /// Family name
    #[serde(default)]
    pub last_name: String,
    /// Contact email
    #[serde(default)]
    pub email: String,
    /// Contact number
    #[serde(default)]
    pub mobile_number: String,
}

/// Customer database operations manager
pub struct CustomersManager {
    pool: SqlitePool,
}

impl CustomersManager {
    /// Create a new customers manager
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create an active customer
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails
    pub async fn create(&self, request: &CreateCustomerRequest) -> AppResult<Customer> {
        let now = Utc::now();
        let result = sqlx::query(
            r"
            INSERT INTO customers (first_name, last_name, email, mobile_number, created_at, is_active)
            VALUES ($1, $2, $3, $4, $5, 1)
            ",
        )
        .bind(&request.first_name)
        .bind(&request.last_name)
        .bind(&request.email)
        .bind(&request.mobile_number)
        .bind(format_timestamp(now))
        .execute(&self.pool)
        .await
        .map_err(AppError::from)?;

        Ok(Customer {
            id: result.last_insert_rowid(),
            first_name: request.first_name.clone(),
            last_name: request.last_name.clone(),
            email: request.email.clone(),
            mobile_number: request.mobile_number.clone(),
            google_id: None,
            created_at: now,
            is_active: true,
            coupon_count: 0,
            invoice_count: 0,
        })
    }

    /// Get a customer by id, active or not
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn get_by_id(&self, id: i64) -> AppResult<Option<Customer>> {
        let sql = format!("{CUSTOMER_SELECT} WHERE c.id = $1");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to get customer: {e}")))?;

        row.map(|r| row_to_customer(&r)).transpose()
    }

    /// Get the earliest customer with this mobile number, active or not
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn get_by_mobile(&self, mobile_number: &str) -> AppResult<Option<Customer>> {
        let sql = format!(
            "{CUSTOMER_SELECT} WHERE c.mobile_number = $1 ORDER BY c.id LIMIT 1"
        );
        let row = sqlx::query(&sql)
            .bind(mobile_number)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to get customer by mobile: {e}")))?;

        row.map(|r| row_to_customer(&r)).transpose()
    }

    /// Get the earliest customer with this email ignoring case, active or not
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn get_by_email(&self, email: &str) -> AppResult<Option<Customer>> {
        let sql = format!(
            "{CUSTOMER_SELECT} WHERE lower(c.email) = lower($1) ORDER BY c.id LIMIT 1"
        );
        let row = sqlx::query(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to get customer by email: {e}")))?;

        row.map(|r| row_to_customer(&r)).transpose()
    }

    /// List active customers ordered by creation time
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn list(&self) -> AppResult<Vec<Customer>> {
        let sql = format!("{CUSTOMER_SELECT} WHERE c.is_active = 1 ORDER BY c.created_at, c.id");
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to list customers: {e}")))?;

        rows.iter().map(row_to_customer).collect()
    }

    /// Update contact details; creation time and activation state are kept
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn update(
        &self,
        id: i64,
        request: &UpdateCustomerRequest,
    ) -> AppResult<Option<Customer>> {
        let result = sqlx::query(
            r"
            UPDATE customers
            SET first_name = $1, last_name = $2, email = $3, mobile_number = $4
            WHERE id = $5
            ",
        )
        .bind(&request.first_name)
        .bind(&request.last_name)
        .bind(&request.email)
        .bind(&request.mobile_number)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to update customer: {e}")))?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_by_id(id).await
    }

    /// Soft-delete a customer
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn delete(&self, id: i64) -> AppResult<bool> {
        self.set_active(id, false).await
    }

    /// Mark a customer active
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn activate(&self, id: i64) -> AppResult<bool> {
        self.set_active(id, true).await
    }

    /// Mark a customer inactive
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn deactivate(&self, id: i64) -> AppResult<bool> {
        self.set_active(id, false).await
    }

    async fn set_active(&self, id: i64, is_active: bool) -> AppResult<bool> {
        let result = sqlx::query("UPDATE customers SET is_active = $1 WHERE id = $2")
            .bind(is_active)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to update customer status: {e}")))?;

        Ok(result.rows_affected() > 0)
    }
}

fn row_to_customer(row: &SqliteRow) -> AppResult<Customer> {
    let created_at_str: String = row.get("created_at");
    let is_active: i64 = row.get("is_active");

    Ok(Customer {
        id: row.get("id"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        email: row.get("email"),
        mobile_number: row.get("mobile_number"),
        google_id: row.get("google_id"),
        created_at: parse_timestamp(&created_at_str)?,
        is_active: is_active == 1,
        coupon_count: row.get("coupon_count"),
        invoice_count: row.get("invoice_count"),
    })
}
