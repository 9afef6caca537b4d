// ABOUTME: Database operations for invoices with yearly sequential numbering and soft deletion
// ABOUTME: Tracks payment status transitions and stamps paid_at when an invoice becomes Paid
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 CouponHub Contributors

use chrono::{DateTime, Datelike, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use tracing::{info, warn};

use super::{
    format_money, format_timestamp, join_name, parse_money, parse_optional_timestamp,
    parse_timestamp,
};
use crate::constants::business::{
    DEFAULT_CURRENCY, INVOICE_NUMBER_PREFIX, MAX_CODE_GENERATION_ATTEMPTS,
};
use crate::errors::{AppError, AppResult, ErrorCode};
use crate::models::{Invoice, PaymentStatus};

const INVOICE_SELECT: &str = r"
    SELECT i.id, i.invoice_number, i.customer_id, i.coupon_id, i.service_center_id,
           i.sub_total, i.tax_amount, i.discount_amount, i.total_amount, i.currency,
           i.payment_method, i.payment_status, i.paid_at, i.created_at, i.notes,
           c.first_name AS customer_first_name, c.last_name AS customer_last_name,
           sc.name AS service_center_name,
           cp.coupon_code
    FROM invoices i
    LEFT JOIN customers c ON c.id = i.customer_id
    LEFT JOIN service_centers sc ON sc.id = i.service_center_id
    LEFT JOIN coupons cp ON cp.id = i.coupon_id
";

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_owned()
}

/// Request to issue an invoice
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInvoiceRequest {
    /// Billed customer
    pub customer_id: i64,
    /// Issuing service center
    pub service_center_id: i64,
    /// Coupon sold with this invoice
    #[serde(default)]
    pub coupon_id: Option<i64>,
    /// Amount before tax and discount
    #[serde(default)]
    pub sub_total: Decimal,
    /// Tax charged
    #[serde(default)]
    pub tax_amount: Decimal,
    /// Discount granted
    #[serde(default)]
    pub discount_amount: Decimal,
    /// Amount charged
    #[serde(default)]
    pub total_amount: Decimal,
    /// ISO currency code, defaults to INR
    #[serde(default = "default_currency")]
    pub currency: String,
    /// How the customer paid
    #[serde(default)]
    pub payment_method: String,
    /// Initial payment status, defaults to Unpaid
    #[serde(default)]
    pub payment_status: PaymentStatus,
    /// Free-form notes
    #[serde(default)]
    pub notes: String,
}

/// Request to update an invoice; number and creation time are kept
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateInvoiceRequest {
    /// Must match the path id when present
    #[serde(default)]
    pub id: Option<i64>,
    /// Billed customer
    pub customer_id: i64,
    /// Issuing service center
    pub service_center_id: i64,
    /// Coupon sold with this invoice
    #[serde(default)]
    pub coupon_id: Option<i64>,
    /// Amount before tax and discount
    #[serde(default)]
    pub sub_total: Decimal,
    /// Tax charged
    #[serde(default)]
    pub tax_amount: Decimal,
    /// Discount granted
    #[serde(default)]
    pub discount_amount: Decimal,
    /// Amount charged
    #[serde(default)]
    pub total_amount: Decimal,
    /// ISO currency code
    #[serde(default = "default_currency")]
    pub currency: String,
    /// How the customer paid
    #[serde(default)]
    pub payment_method: String,
    /// New payment status
    pub payment_status: PaymentStatus,
    /// Free-form notes
    #[serde(default)]
    pub notes: String,
}

/// Invoice database operations manager
pub struct InvoicesManager {
    pool: SqlitePool,
}

impl InvoicesManager {
    /// Create a new invoices manager
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Issue an invoice numbered `INV-{year}-{sequence}`
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for negative amounts or unknown references
    pub async fn create(&self, request: &CreateInvoiceRequest) -> AppResult<Invoice> {
        validate_amounts(&[
            request.sub_total,
            request.tax_amount,
            request.discount_amount,
            request.total_amount,
        ])?;

        let now = Utc::now();
        let paid_at = (request.payment_status == PaymentStatus::Paid).then(|| format_timestamp(now));

        for attempt in 1..=MAX_CODE_GENERATION_ATTEMPTS {
            let year_count = self.count_numbered_in_year(now.year()).await?;
            let invoice_number = format_invoice_number(now, year_count + 1);

            let result = sqlx::query(
                r"
                INSERT INTO invoices (
                    invoice_number, customer_id, coupon_id, service_center_id,
                    sub_total, tax_amount, discount_amount, total_amount, currency,
                    payment_method, payment_status, paid_at, created_at, is_deleted, notes
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, 0, $14)
                ",
            )
            .bind(&invoice_number)
            .bind(request.customer_id)
            .bind(request.coupon_id)
            .bind(request.service_center_id)
            .bind(format_money(request.sub_total))
            .bind(format_money(request.tax_amount))
            .bind(format_money(request.discount_amount))
            .bind(format_money(request.total_amount))
            .bind(&request.currency)
            .bind(&request.payment_method)
            .bind(request.payment_status.as_str())
            .bind(&paid_at)
            .bind(format_timestamp(now))
            .bind(&request.notes)
            .execute(&self.pool)
            .await;

            match result {
                Ok(done) => {
                    let id = done.last_insert_rowid();
                    info!(invoice_id = id, invoice_number = %invoice_number, customer_id = request.customer_id, "Invoice created");
                    return self.get_by_id(id).await?.ok_or_else(|| {
                        AppError::internal(format!("Invoice {id} vanished after insert"))
                    });
                }
                Err(e) => {
                    let err = AppError::from(e);
                    if err.code != ErrorCode::ResourceAlreadyExists {
                        return Err(err);
                    }
                    warn!(invoice_number = %invoice_number, attempt, "Invoice number taken, retrying");
                }
            }
        }

        Err(AppError::internal("Could not allocate an invoice number"))
    }

    async fn count_numbered_in_year(&self, year: i32) -> AppResult<i64> {
        let pattern = format!("{INVOICE_NUMBER_PREFIX}-{year}-%");
        sqlx::query_scalar("SELECT COUNT(*) FROM invoices WHERE invoice_number LIKE $1")
            .bind(pattern)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to count invoices: {e}")))
    }

    /// Get a non-deleted invoice by id
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn get_by_id(&self, id: i64) -> AppResult<Option<Invoice>> {
        let sql = format!("{INVOICE_SELECT} WHERE i.id = $1 AND i.is_deleted = 0");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to get invoice: {e}")))?;

        row.map(|r| row_to_invoice(&r)).transpose()
    }

    /// Get a non-deleted invoice by number
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn get_by_number(&self, invoice_number: &str) -> AppResult<Option<Invoice>> {
        let sql = format!("{INVOICE_SELECT} WHERE i.invoice_number = $1 AND i.is_deleted = 0");
        let row = sqlx::query(&sql)
            .bind(invoice_number)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to get invoice by number: {e}")))?;

        row.map(|r| row_to_invoice(&r)).transpose()
    }

    /// List non-deleted invoices, newest first
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn list_all(&self) -> AppResult<Vec<Invoice>> {
        self.list_where("1 = 1", None).await
    }

    /// List a customer's non-deleted invoices, newest first
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn list_by_customer(&self, customer_id: i64) -> AppResult<Vec<Invoice>> {
        self.list_where("i.customer_id = $1", Some(customer_id))
            .await
    }

    /// List a service center's non-deleted invoices, newest first
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn list_by_service_center(&self, service_center_id: i64) -> AppResult<Vec<Invoice>> {
        self.list_where("i.service_center_id = $1", Some(service_center_id))
            .await
    }

    async fn list_where(&self, condition: &str, param: Option<i64>) -> AppResult<Vec<Invoice>> {
        let sql = format!(
            "{INVOICE_SELECT} WHERE i.is_deleted = 0 AND {condition} ORDER BY i.created_at DESC, i.id DESC"
        );
        let mut query = sqlx::query(&sql);
        if let Some(value) = param {
            query = query.bind(value);
        }
        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to list invoices: {e}")))?;

        rows.iter().map(row_to_invoice).collect()
    }

    /// Update an invoice
    ///
    /// `paid_at` is stamped when the invoice moves into Paid and cleared when it
    /// leaves Paid; otherwise it is kept.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for negative amounts or unknown references
    pub async fn update(
        &self,
        id: i64,
        request: &UpdateInvoiceRequest,
    ) -> AppResult<Option<Invoice>> {
        validate_amounts(&[
            request.sub_total,
            request.tax_amount,
            request.discount_amount,
            request.total_amount,
        ])?;

        let Some(existing) = self.get_by_id(id).await? else {
            return Ok(None);
        };
        let paid_at = next_paid_at(
            existing.payment_status,
            existing.paid_at,
            request.payment_status,
            Utc::now(),
        );

        sqlx::query(
            r"
            UPDATE invoices
            SET customer_id = $1, coupon_id = $2, service_center_id = $3,
                sub_total = $4, tax_amount = $5, discount_amount = $6, total_amount = $7,
                currency = $8, payment_method = $9, payment_status = $10, paid_at = $11,
                notes = $12
            WHERE id = $13 AND is_deleted = 0
            ",
        )
        .bind(request.customer_id)
        .bind(request.coupon_id)
        .bind(request.service_center_id)
        .bind(format_money(request.sub_total))
        .bind(format_money(request.tax_amount))
        .bind(format_money(request.discount_amount))
        .bind(format_money(request.total_amount))
        .bind(&request.currency)
        .bind(&request.payment_method)
        .bind(request.payment_status.as_str())
        .bind(paid_at.map(format_timestamp))
        .bind(&request.notes)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(AppError::from)?;

        self.get_by_id(id).await
    }

    /// Soft-delete an invoice
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn delete(&self, id: i64) -> AppResult<bool> {
        let result = sqlx::query("UPDATE invoices SET is_deleted = 1 WHERE id = $1 AND is_deleted = 0")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to delete invoice: {e}")))?;

        Ok(result.rows_affected() > 0)
    }
}

/// Build an invoice number such as `INV-2025-0042`
#[must_use]
pub fn format_invoice_number(now: DateTime<Utc>, sequence: i64) -> String {
    format!("{INVOICE_NUMBER_PREFIX}-{}-{sequence:04}", now.year())
}

/// Work out `paid_at` after a payment status change
#[must_use]
pub fn next_paid_at(
    previous: PaymentStatus,
    previous_paid_at: Option<DateTime<Utc>>,
    next: PaymentStatus,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    match (previous, next) {
        (PaymentStatus::Paid, PaymentStatus::Paid) => previous_paid_at.or(Some(now)),
        (_, PaymentStatus::Paid) => Some(now),
        _ => None,
    }
}

fn validate_amounts(amounts: &[Decimal]) -> AppResult<()> {
    if amounts.iter().any(Decimal::is_sign_negative) {
        return Err(AppError::invalid_input("Invoice amounts cannot be negative"));
    }
    Ok(())
}

fn row_to_invoice(row: &SqliteRow) -> AppResult<Invoice> {
    let sub_total: String = row.get("sub_total");
    let tax_amount: String = row.get("tax_amount");
    let discount_amount: String = row.get("discount_amount");
    let total_amount: String = row.get("total_amount");
    let payment_status: String = row.get("payment_status");
    let created_at: String = row.get("created_at");
    let service_center_name: Option<String> = row.get("service_center_name");

    Ok(Invoice {
        id: row.get("id"),
        invoice_number: row.get("invoice_number"),
        customer_id: row.get("customer_id"),
        customer_name: join_name(
            row.get("customer_first_name"),
            row.get("customer_last_name"),
        ),
        service_center_id: row.get("service_center_id"),
        service_center_name: service_center_name.unwrap_or_default(),
        coupon_id: row.get("coupon_id"),
        coupon_code: row.get("coupon_code"),
        sub_total: parse_money(&sub_total)?,
        tax_amount: parse_money(&tax_amount)?,
        discount_amount: parse_money(&discount_amount)?,
        total_amount: parse_money(&total_amount)?,
        currency: row.get("currency"),
        payment_method: row.get("payment_method"),
        payment_status: PaymentStatus::parse(&payment_status),
        paid_at: parse_optional_timestamp(row.get("paid_at"))?,
        created_at: parse_timestamp(&created_at)?,
        notes: row.get("notes"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_invoice_number_format() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        assert_eq!(format_invoice_number(now, 1), "INV-2025-0001");
        assert_eq!(format_invoice_number(now, 12345), "INV-2025-12345");
    }

    #[test]
    fn test_paid_at_transitions() {
        let now = Utc::now();
        let earlier = now - Duration::days(2);

        assert_eq!(
            next_paid_at(PaymentStatus::Unpaid, None, PaymentStatus::Paid, now),
            Some(now)
        );
        assert_eq!(
            next_paid_at(PaymentStatus::Paid, Some(earlier), PaymentStatus::Paid, now),
            Some(earlier)
        );
        assert_eq!(
            next_paid_at(PaymentStatus::Paid, Some(earlier), PaymentStatus::Refunded, now),
            None
        );
        assert_eq!(
            next_paid_at(PaymentStatus::Pending, None, PaymentStatus::Unpaid, now),
            None
        );
    }

    #[test]
    fn test_negative_amounts_rejected() {
        assert!(validate_amounts(&[Decimal::ZERO, Decimal::new(5, 0)]).is_ok());
        assert!(validate_amounts(&[Decimal::new(-1, 2)]).is_err());
    }
}
