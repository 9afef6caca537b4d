// ABOUTME: Database operations for coupons including code generation and atomic redemption
// ABOUTME: Redeeming validates the coupon, records the redemption and updates usage in one transaction
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 CouponHub Contributors

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use tracing::{debug, info};

use super::{format_timestamp, join_name, parse_timestamp};
use crate::constants::business::{
    COUPON_CODE_LENGTH, COUPON_CODE_PREFIX, DEFAULT_TOTAL_SERVICES, MAX_CODE_GENERATION_ATTEMPTS,
};
use crate::errors::{AppError, AppResult};
use crate::logging::AppLogger;
use crate::models::{Coupon, CouponStatus};

const COUPON_CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

const COUPON_SELECT: &str = r"
    SELECT cp.id, cp.coupon_code, cp.customer_id, cp.service_center_id, cp.total_services,
           cp.used_services, cp.purchase_date, cp.expiry_date, cp.status,
           c.first_name AS customer_first_name, c.last_name AS customer_last_name,
           (SELECT COUNT(*) FROM service_redemptions r WHERE r.coupon_id = cp.id)
               AS redemption_count
    FROM coupons cp
    LEFT JOIN customers c ON c.id = cp.customer_id
";

/// Request to issue a coupon to a customer
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCouponRequest {
    /// Owning customer
    pub customer_id: i64,
    /// Service center selling the coupon
    #[serde(default)]
    pub service_center_id: Option<i64>,
    /// Services included, defaults to 5
    #[serde(default)]
    pub total_services: Option<i64>,
    /// Last instant the coupon can be redeemed
    pub expiry_date: DateTime<Utc>,
    /// Initial status, defaults to Active
    #[serde(default)]
    pub status: Option<CouponStatus>,
}

/// Request to update a coupon; code, usage and purchase date are kept
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCouponRequest {
    /// Must match the path id when present
    #[serde(default)]
    pub id: Option<i64>,
    /// Owning customer
    pub customer_id: i64,
    /// Service center that sold the coupon
    #[serde(default)]
    pub service_center_id: Option<i64>,
    /// Services included
    pub total_services: i64,
    /// Last instant the coupon can be redeemed
    pub expiry_date: DateTime<Utc>,
    /// New status
    pub status: CouponStatus,
}

/// Result of a successful redemption
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RedemptionOutcome {
    /// Id of the redemption record created
    pub redemption_id: i64,
    /// Redeemed coupon
    pub coupon_id: i64,
    /// Usage after this redemption
    pub used_services: i64,
    /// Services included in the coupon
    pub total_services: i64,
    /// Services left after this redemption
    pub remaining_services: i64,
    /// Coupon status after this redemption
    pub status: CouponStatus,
}

/// Coupon database operations manager
pub struct CouponsManager {
    pool: SqlitePool,
}

impl CouponsManager {
    /// Create a new coupons manager
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Issue a coupon with a freshly generated unique code
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for a non-positive service count or unknown customer,
    /// or an internal error if no free code could be generated
    pub async fn create(&self, request: &CreateCouponRequest) -> AppResult<Coupon> {
        let total_services = request.total_services.unwrap_or(DEFAULT_TOTAL_SERVICES);
        if total_services < 1 {
            return Err(AppError::invalid_input(
                "Total services must be at least 1",
            ));
        }

        let coupon_code = self.unique_coupon_code().await?;
        let status = request.status.unwrap_or_default();
        let now = Utc::now();

        let result = sqlx::query(
            r"
            INSERT INTO coupons (
                coupon_code, customer_id, service_center_id, total_services,
                used_services, purchase_date, expiry_date, status
            ) VALUES ($1, $2, $3, $4, 0, $5, $6, $7)
            ",
        )
        .bind(&coupon_code)
        .bind(request.customer_id)
        .bind(request.service_center_id)
        .bind(total_services)
        .bind(format_timestamp(now))
        .bind(format_timestamp(request.expiry_date))
        .bind(status.as_str())
        .execute(&self.pool)
        .await
        .map_err(AppError::from)?;

        let id = result.last_insert_rowid();
        info!(coupon_id = id, coupon_code = %coupon_code, customer_id = request.customer_id, "Coupon issued");

        self.get_by_id(id)
            .await?
            .ok_or_else(|| AppError::internal(format!("Coupon {id} vanished after insert")))
    }

    async fn unique_coupon_code(&self) -> AppResult<String> {
        for _ in 0..MAX_CODE_GENERATION_ATTEMPTS {
            let candidate = generate_coupon_code();
            let taken: Option<i64> =
                sqlx::query_scalar("SELECT id FROM coupons WHERE coupon_code = $1")
                    .bind(&candidate)
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(|e| AppError::database(format!("Failed to check coupon code: {e}")))?;

            if taken.is_none() {
                return Ok(candidate);
            }
            debug!(coupon_code = %candidate, "Coupon code collision, retrying");
        }
        Err(AppError::internal("Could not generate a unique coupon code"))
    }

    /// Get a coupon by id
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn get_by_id(&self, id: i64) -> AppResult<Option<Coupon>> {
        let sql = format!("{COUPON_SELECT} WHERE cp.id = $1");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to get coupon: {e}")))?;

        row.map(|r| row_to_coupon(&r)).transpose()
    }

    /// Get a coupon by its code
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn get_by_code(&self, coupon_code: &str) -> AppResult<Option<Coupon>> {
        let sql = format!("{COUPON_SELECT} WHERE cp.coupon_code = $1");
        let row = sqlx::query(&sql)
            .bind(coupon_code)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to get coupon by code: {e}")))?;

        row.map(|r| row_to_coupon(&r)).transpose()
    }

    /// List every coupon, newest purchase first
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn list_all(&self) -> AppResult<Vec<Coupon>> {
        self.list_where("1 = 1", None).await
    }

    /// List a customer's coupons, newest purchase first
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn list_by_customer(&self, customer_id: i64) -> AppResult<Vec<Coupon>> {
        self.list_where("cp.customer_id = $1", Some(customer_id))
            .await
    }

    /// List coupons with status Active
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn list_active(&self) -> AppResult<Vec<Coupon>> {
        self.list_by_status(CouponStatus::Active).await
    }

    /// List coupons with status Unassigned
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn list_unassigned(&self) -> AppResult<Vec<Coupon>> {
        self.list_by_status(CouponStatus::Unassigned).await
    }

    /// List coupons with status Expired
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn list_expired(&self) -> AppResult<Vec<Coupon>> {
        self.list_by_status(CouponStatus::Expired).await
    }

    /// Load every coupon, optionally limited to those sold by one service center
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn list_for_service_center(
        &self,
        service_center_id: Option<i64>,
    ) -> AppResult<Vec<Coupon>> {
        match service_center_id {
            Some(id) => self.list_where("cp.service_center_id = $1", Some(id)).await,
            None => self.list_all().await,
        }
    }

    async fn list_by_status(&self, status: CouponStatus) -> AppResult<Vec<Coupon>> {
        let sql = format!("{COUPON_SELECT} WHERE cp.status = $1 ORDER BY cp.purchase_date DESC, cp.id DESC");
        let rows = sqlx::query(&sql)
            .bind(status.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to list coupons: {e}")))?;

        rows.iter().map(row_to_coupon).collect()
    }

    async fn list_where(&self, condition: &str, param: Option<i64>) -> AppResult<Vec<Coupon>> {
        let sql = format!(
            "{COUPON_SELECT} WHERE {condition} ORDER BY cp.purchase_date DESC, cp.id DESC"
        );
        let mut query = sqlx::query(&sql);
        if let Some(value) = param {
            query = query.bind(value);
        }
        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to list coupons: {e}")))?;

        rows.iter().map(row_to_coupon).collect()
    }

    /// Update a coupon's owner, center, allowance, expiry and status
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` when the new allowance is below the services already used
    pub async fn update(
        &self,
        id: i64,
        request: &UpdateCouponRequest,
    ) -> AppResult<Option<Coupon>> {
        let Some(existing) = self.get_by_id(id).await? else {
            return Ok(None);
        };
        if request.total_services < 1 || request.total_services < existing.used_services {
            return Err(AppError::invalid_input(format!(
                "Total services must be at least 1 and not below the {} already used",
                existing.used_services
            )));
        }

        sqlx::query(
            r"
            UPDATE coupons
            SET customer_id = $1, service_center_id = $2, total_services = $3,
                expiry_date = $4, status = $5
            WHERE id = $6
            ",
        )
        .bind(request.customer_id)
        .bind(request.service_center_id)
        .bind(request.total_services)
        .bind(format_timestamp(request.expiry_date))
        .bind(request.status.as_str())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(AppError::from)?;

        self.get_by_id(id).await
    }

    /// Permanently delete a coupon and its redemptions
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn delete(&self, id: i64) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM coupons WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to delete coupon: {e}")))?;

        Ok(result.rows_affected() > 0)
    }

    /// Whether the coupon exists and can be redeemed now
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn is_valid(&self, id: i64) -> AppResult<bool> {
        Ok(self
            .get_by_id(id)
            .await?
            .is_some_and(|coupon| coupon.is_valid_at(Utc::now())))
    }

    /// Redeem one service from a coupon
    ///
    /// The usage update is the first statement of the transaction, so the write lock
    /// is taken up front and concurrent redeems queue on the busy timeout instead of
    /// failing on a lock upgrade. The update only matches a coupon that is still
    /// redeemable, so concurrent redemptions cannot overdraw it. When it matches
    /// nothing the coupon is re-read to report why.
    ///
    /// # Errors
    ///
    /// Returns `ResourceNotFound` for an unknown coupon and `InvalidInput` when the
    /// coupon is not active, has expired or has no services left
    pub async fn redeem(
        &self,
        coupon_id: i64,
        service_center_id: i64,
        customer_id: i64,
        notes: &str,
    ) -> AppResult<RedemptionOutcome> {
        let now = Utc::now();
        let now_str = format_timestamp(now);

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::database(format!("Failed to begin transaction: {e}")))?;

        let updated = sqlx::query(
            r"
            UPDATE coupons
            SET used_services = used_services + 1,
                status = CASE WHEN used_services + 1 >= total_services
                              THEN 'Completed' ELSE status END
            WHERE id = $1 AND status = 'Active' AND expiry_date > $2
              AND used_services < total_services
            RETURNING used_services, total_services, status
            ",
        )
        .bind(coupon_id)
        .bind(&now_str)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| AppError::database(format!("Failed to update coupon usage: {e}")))?;

        let Some(row) = updated else {
            tx.rollback()
                .await
                .map_err(|e| AppError::database(format!("Failed to roll back redemption: {e}")))?;
            return Err(self.redeem_rejection(coupon_id, now).await);
        };

        let used_services: i64 = row.get("used_services");
        let total_services: i64 = row.get("total_services");
        let status = CouponStatus::parse(&row.get::<String, _>("status"));

        let inserted = sqlx::query(
            r"
            INSERT INTO service_redemptions (
                coupon_id, service_center_id, customer_id, redemption_date, notes, invoice_id
            ) VALUES ($1, $2, $3, $4, $5, NULL)
            ",
        )
        .bind(coupon_id)
        .bind(service_center_id)
        .bind(customer_id)
        .bind(&now_str)
        .bind(notes)
        .execute(&mut *tx)
        .await
        .map_err(AppError::from)?;

        tx.commit()
            .await
            .map_err(|e| AppError::database(format!("Failed to commit redemption: {e}")))?;

        AppLogger::log_redemption(coupon_id, service_center_id, used_services, total_services);

        Ok(RedemptionOutcome {
            redemption_id: inserted.last_insert_rowid(),
            coupon_id,
            used_services,
            total_services,
            remaining_services: total_services - used_services,
            status,
        })
    }

    /// Explain why a coupon could not be redeemed
    async fn redeem_rejection(&self, coupon_id: i64, now: DateTime<Utc>) -> AppError {
        let coupon = match self.get_by_id(coupon_id).await {
            Ok(Some(coupon)) => coupon,
            Ok(None) => return AppError::not_found(format!("Coupon with ID {coupon_id} not found")),
            Err(e) => return e,
        };

        check_redeemable(
            coupon.status,
            coupon.expiry_date,
            coupon.used_services,
            coupon.total_services,
            now,
        )
        .err()
        .unwrap_or_else(|| {
            AppError::invalid_input("Coupon redemption failed. Coupon may be invalid or expired.")
        })
    }
}

/// Reject redemption of a coupon that is not active, has expired or is used up
///
/// # Errors
///
/// Returns `InvalidInput` describing the first failed check
pub fn check_redeemable(
    status: CouponStatus,
    expiry_date: DateTime<Utc>,
    used_services: i64,
    total_services: i64,
    now: DateTime<Utc>,
) -> AppResult<()> {
    if status != CouponStatus::Active {
        return Err(AppError::invalid_input(format!(
            "Coupon is not active (status: {})",
            status.as_str()
        )));
    }
    if expiry_date <= now {
        return Err(AppError::invalid_input("Coupon has expired"));
    }
    if used_services >= total_services {
        return Err(AppError::invalid_input("Coupon has no remaining services"));
    }
    Ok(())
}

/// Generate a candidate coupon code such as `CPN-7KQ2ZD9A`
#[must_use]
pub fn generate_coupon_code() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..COUPON_CODE_LENGTH)
        .map(|_| char::from(COUPON_CODE_ALPHABET[rng.gen_range(0..COUPON_CODE_ALPHABET.len())]))
        .collect();
    format!("{COUPON_CODE_PREFIX}-{suffix}")
}

fn row_to_coupon(row: &SqliteRow) -> AppResult<Coupon> {
    let purchase_date_str: String = row.get("purchase_date");
    let expiry_date_str: String = row.get("expiry_date");
    let status_str: String = row.get("status");

    Ok(Coupon {
        id: row.get("id"),
        coupon_code: row.get("coupon_code"),
        customer_id: row.get("customer_id"),
        customer_name: join_name(
            row.get("customer_first_name"),
            row.get("customer_last_name"),
        ),
        service_center_id: row.get("service_center_id"),
        total_services: row.get("total_services"),
        used_services: row.get("used_services"),
        purchase_date: parse_timestamp(&purchase_date_str)?,
        expiry_date: parse_timestamp(&expiry_date_str)?,
        status: CouponStatus::parse(&status_str),
        redemption_count: row.get("redemption_count"),
    })
}
